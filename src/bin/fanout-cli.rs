use clap::{Parser, Subcommand};
use serde_json::Value;

use fanout_fetch::http::{HANDLE_URLS_PATH, STATUS_PATH};

#[derive(Parser)]
#[command(name = "fanout-cli")]
#[command(about = "Command-line client for the fan-out fetch service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch URLs through the service and print the bodies
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Show service status and admission usage
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Fetch { urls } => {
            client
                .post(format!("{base}{HANDLE_URLS_PATH}"))
                .json(&urls)
                .send()
                .await?
        }
        Commands::Status => client.get(format!("{base}{STATUS_PATH}")).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v["errorText"].as_str().map(str::to_string))
            .unwrap_or(text);
        eprintln!("Error: service returned status {}: {}", status, message);
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
