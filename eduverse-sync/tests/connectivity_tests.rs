use eduverse_sync::{Connectivity, ProbeConfig, probe_once, spawn_probe};
use reqwest::Client;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn initial_reading() {
    assert!(Connectivity::new(true).is_online());
    assert!(!Connectivity::new(false).is_online());
}

#[test]
fn clones_share_the_signal() {
    let a = Connectivity::new(false);
    let b = a.clone();
    a.set_online(true);
    assert!(b.is_online());
}

#[tokio::test]
async fn receivers_wake_only_on_transitions() {
    let connectivity = Connectivity::new(false);
    let mut rx = connectivity.subscribe();

    connectivity.set_online(false);
    assert!(!rx.has_changed().unwrap());

    connectivity.set_online(true);
    assert!(rx.has_changed().unwrap());
    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());
}

#[test]
fn default_probe_config() {
    let config = ProbeConfig::default();
    assert_eq!(config.url, "http://localhost:9000/.json?shallow=true");
    assert_eq!(config.interval_ms, 10_000);
    assert_eq!(config.timeout_ms, 5_000);
}

#[tokio::test]
async fn any_response_counts_as_reachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(probe_once(&Client::new(), &server.uri()).await);
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let client = Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    assert!(!probe_once(&client, "http://127.0.0.1:1/").await);
}

#[tokio::test]
async fn probe_flips_signal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let connectivity = Connectivity::new(false);
    let mut rx = connectivity.subscribe();
    let probe = spawn_probe(
        connectivity.clone(),
        ProbeConfig {
            url: server.uri(),
            interval_ms: 20,
            timeout_ms: 1_000,
        },
    )
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(connectivity.is_online());
    probe.abort();
}

#[test]
fn probe_needs_a_runtime() {
    assert!(spawn_probe(Connectivity::new(false), ProbeConfig::default()).is_err());
}
