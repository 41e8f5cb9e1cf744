//! End-to-end tests: real server, real origins.

use std::time::{Duration, Instant};
use reqwest::StatusCode;
use wiremock::MockServer;

use fanout_fetch::http::HttpServer;
use fanout_fetch::lifecycle;
use fanout_sdk::ClientError;

mod common;

fn service_status(err: &ClientError) -> StatusCode {
    match err {
        ClientError::Service { status, .. } => *status,
        other => panic!("expected a service error, got {other}"),
    }
}

#[tokio::test]
async fn bodies_come_back_in_input_order() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/a", "alpha", Some(Duration::from_millis(150))).await;
    common::mount_body(&origin, "/b", "bravo", Some(Duration::from_millis(10))).await;
    common::mount_body(&origin, "/c", "charlie", Some(Duration::from_millis(80))).await;

    let server = common::spawn_server(common::test_config()).await;
    let urls: Vec<String> = ["/a", "/b", "/c"]
        .iter()
        .map(|p| format!("{}{}", origin.uri(), p))
        .collect();

    let data = server.client().handle_urls(&urls).await.unwrap();

    let got: Vec<(&str, &str)> = data.iter().map(|d| (d.url.as_str(), d.body.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (urls[0].as_str(), "alpha"),
            (urls[1].as_str(), "bravo"),
            (urls[2].as_str(), "charlie"),
        ]
    );
    server.stop().await;
}

#[tokio::test]
async fn duplicate_urls_are_each_fetched() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/same", "same", None).await;

    let server = common::spawn_server(common::test_config()).await;
    let url = format!("{}/same", origin.uri());

    let data = server.client().handle_urls(&[&url, &url]).await.unwrap();

    assert_eq!(data.len(), 2);
    assert_eq!(origin.received_requests().await.unwrap().len(), 2);
    server.stop().await;
}

#[tokio::test]
async fn fetches_run_concurrently() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/slow", "ok", Some(Duration::from_millis(300))).await;

    let server = common::spawn_server(common::test_config()).await;
    let urls: Vec<String> = (0..5).map(|i| format!("{}/slow?n={i}", origin.uri())).collect();

    let started = Instant::now();
    let data = server.client().handle_urls(&urls).await.unwrap();

    assert_eq!(data.len(), 5);
    assert!(started.elapsed() < Duration::from_millis(1200), "{:?}", started.elapsed());
    server.stop().await;
}

#[tokio::test]
async fn invalid_batches_never_reach_origins() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/x", "x", None).await;

    let server = common::spawn_server(common::test_config()).await;
    let client = server.client();
    let good = format!("{}/x", origin.uri());

    let empty: [&str; 0] = [];
    let err = client.handle_urls(&empty).await.unwrap_err();
    assert_eq!(service_status(&err), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains("zero"));

    let too_many: Vec<String> = (0..21).map(|_| good.clone()).collect();
    let err = client.handle_urls(&too_many).await.unwrap_err();
    assert_eq!(service_status(&err), StatusCode::BAD_REQUEST);

    let err = client.handle_urls(&[good.as_str(), "not a url"]).await.unwrap_err();
    assert_eq!(service_status(&err), StatusCode::BAD_REQUEST);

    let err = client.handle_urls(&["ftp://example.com/file"]).await.unwrap_err();
    assert_eq!(service_status(&err), StatusCode::BAD_REQUEST);

    assert!(origin.received_requests().await.unwrap().is_empty());
    server.stop().await;
}

#[tokio::test]
async fn exactly_max_urls_is_accepted() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/x", "x", None).await;

    let server = common::spawn_server(common::test_config()).await;
    let urls: Vec<String> = (0..20).map(|i| format!("{}/x?n={i}", origin.uri())).collect();

    let data = server.client().handle_urls(&urls).await.unwrap();
    assert_eq!(data.len(), 20);
    server.stop().await;
}

#[tokio::test]
async fn first_failure_fails_the_batch_fast() {
    let origin = MockServer::start().await;
    common::mount_status(&origin, "/broken", 404).await;
    common::mount_body(&origin, "/slow", "late", Some(Duration::from_secs(3))).await;

    let mut config = common::test_config();
    config.timeouts.fetch_ms = 5_000;
    let server = common::spawn_server(config).await;

    let broken = format!("{}/broken", origin.uri());
    let slow = format!("{}/slow", origin.uri());
    let started = Instant::now();
    let err = server.client().handle_urls(&[&slow, &broken]).await.unwrap_err();

    assert_eq!(service_status(&err), StatusCode::BAD_GATEWAY);
    assert!(err.to_string().contains(&broken));
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    server.stop().await;
}

#[tokio::test]
async fn request_deadline_yields_gateway_timeout() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/slow", "late", Some(Duration::from_secs(2))).await;

    let mut config = common::test_config();
    config.timeouts.request_ms = 300;
    config.timeouts.fetch_ms = 5_000;
    let server = common::spawn_server(config).await;

    let err = server
        .client()
        .handle_urls(&[format!("{}/slow", origin.uri())])
        .await
        .unwrap_err();

    assert_eq!(service_status(&err), StatusCode::GATEWAY_TIMEOUT);
    server.stop().await;
}

#[tokio::test]
async fn per_fetch_timeout_is_an_upstream_failure() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/slow", "late", Some(Duration::from_secs(2))).await;

    let mut config = common::test_config();
    config.timeouts.fetch_ms = 200;
    let server = common::spawn_server(config).await;

    let err = server
        .client()
        .handle_urls(&[format!("{}/slow", origin.uri())])
        .await
        .unwrap_err();

    assert_eq!(service_status(&err), StatusCode::BAD_GATEWAY);
    server.stop().await;
}

#[tokio::test]
async fn capacity_one_serialises_batches() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/slow", "ok", Some(Duration::from_millis(300))).await;

    let mut config = common::test_config();
    config.limits.admission_capacity = 1;
    let server = common::spawn_server(config).await;
    let client = server.client();
    let url = format!("{}/slow", origin.uri());

    let started = Instant::now();
    let urls_a = [&url];
    let urls_b = [&url];
    let (a, b) = tokio::join!(client.handle_urls(&urls_a), client.handle_urls(&urls_b));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(600), "{:?}", started.elapsed());
    server.stop().await;
}

#[tokio::test]
async fn status_reports_released_capacity_after_load() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/ok", "ok", None).await;
    common::mount_status(&origin, "/fail", 500).await;

    let mut config = common::test_config();
    config.limits.admission_capacity = 4;
    let server = common::spawn_server(config).await;
    let client = server.client();
    let ok = format!("{}/ok", origin.uri());
    let fail = format!("{}/fail", origin.uri());

    let empty: [&str; 0] = [];
    let urls1 = [&ok, &ok];
    let urls2 = [&ok, &fail];
    let urls4 = [&ok];
    let (r1, r2, r3, r4) = tokio::join!(
        client.handle_urls(&urls1),
        client.handle_urls(&urls2),
        client.handle_urls(&empty),
        client.handle_urls(&urls4),
    );
    assert!(r1.is_ok());
    assert!(r2.is_err());
    assert!(r3.is_err());
    assert!(r4.is_ok());

    let status = client.status().await.unwrap();
    assert_eq!(status.status, "operational");
    assert_eq!(status.admission.capacity, 4);
    assert_eq!(status.admission.available, 4);
    assert_eq!(status.admission.in_flight, 0);
    server.stop().await;
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let server = common::spawn_server(common::test_config()).await;

    let res = common::http_client()
        .post(format!("{}/api/v1/handle", server.base_url()))
        .header("content-type", "application/json")
        .body("{\"urls\": 1}")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], true);
    assert!(body["data"].is_null());
    server.stop().await;
}

#[tokio::test]
async fn shutdown_drains_in_flight_batches() {
    let origin = MockServer::start().await;
    common::mount_body(&origin, "/slow", "done", Some(Duration::from_millis(300))).await;

    let config = common::test_config();
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let fetcher = std::sync::Arc::new(common::fetcher(&config));
    let server = HttpServer::with_fetcher(config, fetcher);

    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let serving = tokio::spawn(lifecycle::serve(
        server,
        listener,
        async {
            let _ = signal_rx.await;
        },
        Duration::from_secs(5),
    ));

    let client = fanout_sdk::FanoutClient::with_client(common::http_client(), &base_url);
    let url = format!("{}/slow", origin.uri());
    let in_flight = tokio::spawn(async move { client.handle_urls(&[url]).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    signal_tx.send(()).unwrap();

    let data = in_flight.await.unwrap().unwrap();
    assert_eq!(data[0].body, "done");
    serving.await.unwrap().unwrap();
}
