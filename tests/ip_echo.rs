//! IP-echo resolver behaviour against a mocked service.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dyndns::ip::{EchoResolver, IpResolver};
use dyndns::Error;

fn resolver(server: &MockServer) -> EchoResolver {
    EchoResolver::new(
        format!("{}/?format=json", server.uri()),
        Duration::from_secs(5),
    )
    .unwrap()
}

async fn mount_echo(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("format", "json"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_resolve_returns_ipv4() {
    let mock_server = MockServer::start().await;
    mount_echo(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"ip": "203.0.113.7"})),
    )
    .await;

    let ip = resolver(&mock_server).resolve().await.unwrap();

    assert_eq!(ip, Ipv4Addr::new(203, 0, 113, 7));
}

#[tokio::test]
async fn test_empty_ip_is_resolution_error() {
    let mock_server = MockServer::start().await;
    mount_echo(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"ip": ""})),
    )
    .await;

    let err = resolver(&mock_server).resolve().await.unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
}

#[tokio::test]
async fn test_missing_ip_field_is_resolution_error() {
    let mock_server = MockServer::start().await;
    mount_echo(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"address": "203.0.113.7"})),
    )
    .await;

    let err = resolver(&mock_server).resolve().await.unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
}

#[tokio::test]
async fn test_ipv6_answer_is_rejected() {
    let mock_server = MockServer::start().await;
    mount_echo(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({"ip": "2001:db8::1"})),
    )
    .await;

    let err = resolver(&mock_server).resolve().await.unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
}

#[tokio::test]
async fn test_unparseable_body_is_resolution_error() {
    let mock_server = MockServer::start().await;
    mount_echo(
        &mock_server,
        ResponseTemplate::new(200).set_body_string("203.0.113.7"),
    )
    .await;

    let err = resolver(&mock_server).resolve().await.unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
}

#[tokio::test]
async fn test_server_error_is_resolution_error() {
    let mock_server = MockServer::start().await;
    mount_echo(&mock_server, ResponseTemplate::new(503)).await;

    let err = resolver(&mock_server).resolve().await.unwrap_err();

    assert!(matches!(err, Error::Resolution(_)));
    assert!(!err.is_fatal());
}
