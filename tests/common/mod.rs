//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fanout_fetch::config::ServiceConfig;
use fanout_fetch::http::HttpServer;
use fanout_fetch::lifecycle::Shutdown;
use fanout_fetch::upstream::HttpFetcher;
use fanout_sdk::FanoutClient;

/// A running service bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> FanoutClient {
        FanoutClient::with_client(http_client(), &self.base_url())
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.handle.await;
    }
}

/// Defaults, bound to localhost.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Client that ignores proxy settings from the environment.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

pub fn fetcher(config: &ServiceConfig) -> HttpFetcher {
    let client = reqwest::Client::builder()
        .no_proxy()
        .connect_timeout(config.timeouts.connect())
        .build()
        .unwrap();
    HttpFetcher::from_client(client, config.upstream.max_body_bytes)
}

pub async fn spawn_server(config: ServiceConfig) -> TestServer {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let fetcher = Arc::new(fetcher(&config));
    let server = HttpServer::with_fetcher(config, fetcher);
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Serve `body` at `route`, optionally after a delay.
pub async fn mount_body(origin: &MockServer, route: &str, body: &str, delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200).set_body_string(body);
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(origin)
        .await;
}

pub async fn mount_status(origin: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(origin)
        .await;
}
