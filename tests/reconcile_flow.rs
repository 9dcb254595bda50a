//! End-to-end reconciliation against mocked Cloudflare and IP-echo services.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dyndns::config::Credentials;
use dyndns::daemon::{run_loop, CycleOutcome, Reconciler};
use dyndns::dns::{ClientOptions, CloudflareProvider};
use dyndns::ip::EchoResolver;
use dyndns::Error;

const ZONE: &str = "023e105f4ecef8ad9ca31a8372d0c353";

struct Harness {
    server: MockServer,
    provider: CloudflareProvider,
    resolver: EchoResolver,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;

        let credentials = Credentials {
            email: "admin@example.com".to_string(),
            api_key: "secret".to_string(),
            zone_id: ZONE.to_string(),
        };
        let options = ClientOptions {
            api_base: format!("{}/client/v4", server.uri()),
            timeout: Duration::from_secs(5),
            allow_empty_zone: false,
        };
        let provider = CloudflareProvider::new(&credentials, options).unwrap();
        let resolver = EchoResolver::new(
            format!("{}/?format=json", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        Self {
            server,
            provider,
            resolver,
        }
    }

    async fn mount_records(&self, records: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/client/v4/zones/{}/dns_records", ZONE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": records
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_echo(&self, ip: &str) {
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": ip })))
            .mount(&self.server)
            .await;
    }

    async fn expect_updates(&self, record_id: &str, times: u64) {
        Mock::given(method("PUT"))
            .and(path(format!(
                "/client/v4/zones/{}/dns_records/{}",
                ZONE, record_id
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": {}
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }
}

fn home_record(content: &str) -> serde_json::Value {
    json!([{
        "id": "r1",
        "type": "A",
        "name": "home.example.com",
        "content": content,
        "ttl": 1,
        "proxied": false
    }])
}

#[tokio::test]
async fn test_same_ip_as_last_observed_sends_no_update() {
    let harness = Harness::start().await;
    harness.mount_records(home_record("1.2.3.4")).await;
    harness.mount_echo("1.2.3.4").await;
    harness.expect_updates("r1", 0).await;

    let mut reconciler = Reconciler::with_last_ip(ZONE, Ipv4Addr::new(1, 2, 3, 4));
    let outcome = reconciler
        .reconcile_once(&harness.provider, &harness.resolver)
        .await
        .unwrap();

    assert_eq!(outcome, CycleOutcome::Unchanged(Ipv4Addr::new(1, 2, 3, 4)));
}

#[tokio::test]
async fn test_new_ip_updates_record_with_id_omitted() {
    let harness = Harness::start().await;
    harness.mount_records(home_record("1.2.3.4")).await;
    harness.mount_echo("5.6.7.8").await;

    Mock::given(method("PUT"))
        .and(path(format!("/client/v4/zones/{}/dns_records/r1", ZONE)))
        .and(body_json(json!({
            "type": "A",
            "name": "home.example.com",
            "content": "5.6.7.8",
            "ttl": 1,
            "proxied": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": {}
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let mut reconciler = Reconciler::with_last_ip(ZONE, Ipv4Addr::new(1, 2, 3, 4));
    reconciler
        .reconcile_once(&harness.provider, &harness.resolver)
        .await
        .unwrap();

    assert_eq!(reconciler.last_ip(), Some(Ipv4Addr::new(5, 6, 7, 8)));
}

#[tokio::test]
async fn test_empty_echo_ip_fails_cycle_without_updates() {
    let harness = Harness::start().await;
    harness.mount_records(home_record("1.2.3.4")).await;
    harness.mount_echo("").await;
    harness.expect_updates("r1", 0).await;

    let mut reconciler = Reconciler::new(ZONE);
    let err = reconciler
        .reconcile_once(&harness.provider, &harness.resolver)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
    assert_eq!(reconciler.last_ip(), None);
}

#[tokio::test]
async fn test_list_failure_skips_ip_lookup() {
    let harness = Harness::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/client/v4/zones/{}/dns_records", ZONE)))
        .respond_with(ResponseTemplate::new(502))
        .mount(&harness.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ip": "5.6.7.8"})))
        .expect(0)
        .mount(&harness.server)
        .await;

    let mut reconciler = Reconciler::new(ZONE);
    let err = reconciler
        .reconcile_once(&harness.provider, &harness.resolver)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { status: Some(502), .. }));
}

#[tokio::test]
async fn test_failed_update_does_not_block_later_records() {
    let harness = Harness::start().await;
    harness
        .mount_records(json!([
            {"id": "r1", "type": "A", "name": "a.example.com", "content": "1.1.1.1", "ttl": 1},
            {"id": "r2", "type": "A", "name": "b.example.com", "content": "1.1.1.1", "ttl": 1},
            {"id": "r3", "type": "A", "name": "c.example.com", "content": "1.1.1.1", "ttl": 1}
        ]))
        .await;
    harness.mount_echo("5.6.7.8").await;
    harness.expect_updates("r1", 1).await;
    harness.expect_updates("r3", 1).await;

    Mock::given(method("PUT"))
        .and(path(format!("/client/v4/zones/{}/dns_records/r2", ZONE)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&harness.server)
        .await;

    let mut reconciler = Reconciler::new(ZONE);
    let outcome = reconciler
        .reconcile_once(&harness.provider, &harness.resolver)
        .await
        .unwrap();

    match outcome {
        CycleOutcome::Changed { updated, failed, .. } => {
            assert_eq!(updated, vec!["a.example.com", "c.example.com"]);
            assert_eq!(failed, vec!["b.example.com"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_run_loop_repeats_until_shutdown() {
    let harness = Harness::start().await;
    harness.mount_echo("5.6.7.8").await;
    harness.expect_updates("r1", 1).await;

    Mock::given(method("GET"))
        .and(path(format!("/client/v4/zones/{}/dns_records", ZONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": home_record("1.2.3.4")
        })))
        .expect(2..)
        .mount(&harness.server)
        .await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut reconciler = Reconciler::new(ZONE);

    tokio::join!(
        run_loop(
            &mut reconciler,
            &harness.provider,
            &harness.resolver,
            Duration::from_millis(20),
            shutdown_rx,
        ),
        async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            shutdown_tx.send(true).unwrap();
        }
    );

    assert_eq!(reconciler.last_ip(), Some(Ipv4Addr::new(5, 6, 7, 8)));
}
