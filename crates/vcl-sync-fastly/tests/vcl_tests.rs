use std::sync::Arc;

use vcl_sync::{Fragment, ServiceError, ServiceVersion, SyncEngine, VersionService};
use vcl_sync_fastly::{FastlyClient, FastlyConfig};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> FastlyClient {
    FastlyClient::new(FastlyConfig {
        service_id: "svc-1".into(),
        token: "secret-token".into(),
        api_base_url: Some(server.uri()),
    })
}

fn vcl_body(name: &str, content: &str) -> String {
    format!(r#"{{"name": "{name}", "content": "{content}", "main": false}}"#)
}

#[tokio::test]
async fn create_posts_form_with_name_and_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/svc-1/version/11/vcl"))
        .and(header("Fastly-Key", "secret-token"))
        .and(body_string_contains("name=recv"))
        .and(body_string_contains("content=hello"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            include_str!("fixtures/vcl.json"),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let remote = client_for(&server)
        .create_fragment(11, "recv", "hello")
        .await
        .unwrap();

    assert_eq!(remote.name, "recv");
    assert_eq!(remote.content, "hello");
}

#[tokio::test]
async fn update_puts_to_named_path() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/service/svc-1/version/11/vcl/recv"))
        .and(body_string_contains("content=hello"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vcl_body("recv", "hello"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let remote = client_for(&server)
        .update_fragment(11, "recv", "hello")
        .await
        .unwrap();
    assert_eq!(remote.content, "hello");
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/service/svc-1/version/11/vcl"))
        .respond_with(ResponseTemplate::new(409).set_body_raw(
            include_str!("fixtures/error_duplicate.json"),
            "application/json",
        ))
        .mount(&server)
        .await;

    let result = client_for(&server).create_fragment(11, "recv", "x").await;
    match result {
        Err(ServiceError::Rejected { status, message }) => {
            assert_eq!(status, 409);
            assert!(message.starts_with("Duplicate record"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn engine_falls_back_to_update_over_http() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let recv_path = dir.path().join("recv.vcl");
    std::fs::write(&recv_path, "hello").unwrap();
    let fetch_path = dir.path().join("fetch.vcl");
    std::fs::write(&fetch_path, "world").unwrap();

    // recv already exists in the version, fetch does not.
    Mock::given(method("POST"))
        .and(path("/service/svc-1/version/11/vcl"))
        .and(body_string_contains("name=recv"))
        .respond_with(ResponseTemplate::new(409).set_body_raw(
            include_str!("fixtures/error_duplicate.json"),
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/service/svc-1/version/11/vcl"))
        .and(body_string_contains("name=fetch"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vcl_body("fetch", "world"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/service/svc-1/version/11/vcl/recv"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vcl_body("recv", "hello"), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(Arc::new(client_for(&server)));
    let report = engine
        .sync(
            ServiceVersion::new(11, false),
            vec![Fragment::from_path(recv_path), Fragment::from_path(fetch_path)],
        )
        .await;

    assert!(!report.has_failures());
    assert_eq!(report.results[0].name, "recv");
    assert_eq!(report.results[0].feedback.len(), 2);
    assert!(report.results[0].feedback[0].is_warning());
    assert_eq!(report.results[1].name, "fetch");
    assert!(report.results[1].feedback.is_empty());
}
