//! Tests for the signed OVHcloud client.

use std::time::Duration;

use reqwest::Url;
use rstest::rstest;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::test_support::{client_for, test_credentials};

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct Me {
    nichandle: String,
}

fn client(server: &MockServer) -> OvhClient {
    client_for(&server.uri()).unwrap_or_else(|err| panic!("client should build: {err}"))
}

#[rstest]
#[case("/cloud/project/abc", "https://eu.api.ovh.com/1.0/cloud/project/abc")]
#[case("/v2/iam/policy", "https://eu.api.ovh.com/v2/iam/policy")]
fn routes_v1_and_v2_paths(#[case] api_path: &str, #[case] expected: &str) {
    let base = Url::parse("https://eu.api.ovh.com/1.0").expect("static URL");
    let client = OvhClient::new(&base, test_credentials(), Duration::from_secs(1))
        .expect("client should build");
    assert_eq!(client.url_for(api_path), expected);
}

#[test]
fn escape_encodes_reserved_characters() {
    assert_eq!(escape("192.0.2.0/24"), "192.0.2.0%2F24");
    assert_eq!(escape("plain"), "plain");
}

#[test]
fn credentials_debug_redacts_secrets() {
    let rendered = format!("{:?}", test_credentials());
    assert!(!rendered.contains("test-app-secret"));
    assert!(!rendered.contains("test-consumer-key"));
}

#[tokio::test]
async fn get_sends_signed_headers_and_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("X-Ovh-Application", "test-app-key"))
        .and(header("X-Ovh-Consumer", "test-consumer-key"))
        .and(header_exists("X-Ovh-Timestamp"))
        .and(header_exists("X-Ovh-Signature"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nichandle": "ab123-ovh"})))
        .expect(1)
        .mount(&server)
        .await;

    let me: Me = client(&server).get("/me").await.expect("GET should succeed");
    assert_eq!(me.nichandle, "ab123-ovh");
}

#[tokio::test]
async fn clock_delta_is_fetched_once_per_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1700000000"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nichandle": "ab123-ovh"})))
        .expect(2)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).expect("mock URI");
    let client = OvhClient::new(&base, test_credentials(), Duration::from_secs(5))
        .expect("client should build");
    let clone = client.clone();
    let _: Me = client.get("/me").await.expect("first GET");
    let _: Me = clone.get("/me").await.expect("second GET");
}

#[tokio::test]
async fn unsigned_requests_skip_clock_sync() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/time"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1700000000"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nichandle": "ab123-ovh"})))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).expect("mock URI");
    let credentials = Credentials {
        consumer_key: String::new(),
        ..test_credentials()
    };
    let client =
        OvhClient::new(&base, credentials, Duration::from_secs(5)).expect("client should build");
    let me: Me = client.get("/me").await.expect("GET should succeed");
    assert_eq!(me.nichandle, "ab123-ovh");
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vrack/pn-1/cloudProject"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"project": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42, "status": "init"})))
        .expect(1)
        .mount(&server)
        .await;

    let task: serde_json::Value = client(&server)
        .post("/vrack/pn-1/cloudProject", &json!({"project": "abc"}))
        .await
        .expect("POST should succeed");
    assert_eq!(task["id"], 42);
}

#[tokio::test]
async fn api_errors_carry_envelope_and_query_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/abc/database/postgresql/db-1"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Ovh-QueryID", "EU.ext-3.1234")
                .set_body_json(json!({
                    "class": "Client::NotFound",
                    "message": "This service does not exist"
                })),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .get::<serde_json::Value>("/cloud/project/abc/database/postgresql/db-1")
        .await
        .expect_err("GET should fail");
    assert!(err.is_not_found());
    let ClientError::Api(failure) = err else {
        panic!("expected API failure");
    };
    assert_eq!(failure.body.class.as_deref(), Some("Client::NotFound"));
    assert_eq!(failure.query_id.as_deref(), Some("EU.ext-3.1234"));
    assert_eq!(failure.method, "GET");
}

#[tokio::test]
async fn non_json_error_bodies_are_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/ip/192.0.2.1/reverse/192.0.2.1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_unit("/ip/192.0.2.1/reverse/192.0.2.1")
        .await
        .expect_err("DELETE should fail");
    assert!(err.is_transient());
    let ClientError::Api(failure) = err else {
        panic!("expected API failure");
    };
    assert_eq!(failure.body.message, "upstream unavailable");
}

#[tokio::test]
async fn mismatched_payloads_surface_decode_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = client(&server)
        .get::<Me>("/me")
        .await
        .expect_err("decode should fail");
    assert!(matches!(err, ClientError::Decode { .. }));
}

fn conflict(status: u16, class: Option<&str>, message: &str) -> ClientError {
    ClientError::Api(Box::new(ApiFailure {
        status,
        method: String::from("POST"),
        path: String::from("/cloud/project/pn/database/postgresql/db-1/user"),
        params: None,
        body: ApiErrorBody {
            class: class.map(str::to_owned),
            message: message.to_owned(),
        },
        query_id: None,
    }))
}

#[rstest]
#[case::busy_cluster(409, None, "cluster is being updated", true, false)]
#[case::forbidden_while_busy(403, Some("Client::Forbidden"), "locked", true, false)]
#[case::class_names_duplicate(409, Some("Client::Conflict::AlreadyExists"), "", false, true)]
#[case::message_names_duplicate(409, None, "User alice already exists", false, true)]
#[case::forbidden_duplicate_text(403, None, "already exists", true, false)]
fn lock_conflicts_are_told_apart_from_duplicates(
    #[case] status: u16,
    #[case] class: Option<&str>,
    #[case] message: &str,
    #[case] locked: bool,
    #[case] exists: bool,
) {
    let err = conflict(status, class, message);
    assert_eq!(err.is_locked(), locked);
    assert_eq!(err.is_already_exists(), exists);
}
