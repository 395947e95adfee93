// Secondary email-list fetch against a mocked provider API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use identity_link::{EmailResolver, IdentityEngine, LoginEvent};
use identity_link_memory::MemoryStore;

fn github_event(id: u64, token: &str) -> LoginEvent {
    LoginEvent {
        provider: "github".into(),
        attributes: json!({"id": id, "login": "octocat"})
            .as_object()
            .unwrap()
            .clone(),
        access_token: Some(token.into()),
    }
}

#[tokio::test]
async fn fetches_primary_verified_email() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .and(header("Accept", "application/json"))
        .and(header("Authorization", "Bearer gho_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "secondary@x.com", "primary": false, "verified": true},
            {"email": "primary@x.com", "primary": true, "verified": true}
        ])))
        .mount(&server)
        .await;

    let resolver = EmailResolver::new().with_github_api_base(server.uri());
    let resolved = resolver.resolve("github", None, "42", Some("gho_test")).await;

    assert_eq!(resolved.email, "primary@x.com");
    assert!(!resolved.synthesized);
}

#[tokio::test]
async fn unverified_primary_loses_to_verified_entry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "primary@x.com", "primary": true, "verified": false},
            {"email": "v@x.com", "primary": false, "verified": true}
        ])))
        .mount(&server)
        .await;

    let resolver = EmailResolver::new().with_github_api_base(server.uri());
    let resolved = resolver.resolve("github", None, "42", Some("gho_test")).await;

    assert_eq!(resolved.email, "v@x.com");
}

#[tokio::test]
async fn server_error_degrades_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let resolver = EmailResolver::new().with_github_api_base(server.uri());
    let resolved = resolver.resolve("github", None, "42", Some("gho_test")).await;

    assert_eq!(resolved.email, "github_42@no-email.local");
    assert!(resolved.synthesized);
}

#[tokio::test]
async fn malformed_payload_degrades_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let resolver = EmailResolver::new().with_github_api_base(server.uri());
    let resolved = resolver.resolve("github", None, "42", Some("gho_test")).await;

    assert!(resolved.synthesized);
}

#[tokio::test]
async fn slow_endpoint_times_out_and_degrades() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"email": "late@x.com", "primary": true, "verified": true}]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let resolver = EmailResolver::new()
        .with_github_api_base(server.uri())
        .with_timeout(Duration::from_millis(100));
    let resolved = resolver.resolve("github", None, "42", Some("gho_test")).await;

    assert!(resolved.synthesized);
}

#[tokio::test]
async fn full_login_uses_fetched_email_for_linking() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "octocat@x.com", "primary": true, "verified": true}
        ])))
        .mount(&server)
        .await;

    let store = MemoryStore::new();
    let engine = IdentityEngine::new(Arc::new(store.clone()))
        .with_email_resolver(EmailResolver::new().with_github_api_base(server.uri()));

    let principal = engine
        .handle_login(&github_event(42, "gho_test"))
        .await
        .unwrap();

    assert_eq!(principal.attributes["email"], "octocat@x.com");
    let users = store.users().await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "octocat@x.com");
    assert_eq!(store.links().await[0].provider_email, "octocat@x.com");
}
