//! Resource lifecycles driven through the provider registry against a mock
//! OVHcloud API.

use std::time::Duration;

use ovh_provider::test_support::{client_for, fast_cadence};
use ovh_provider::{Provider, ProviderError, ResourceState};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

fn provider_for(server: &MockServer) -> Provider {
    let client = client_for(&server.uri()).expect("client should build");
    Provider::with_cadence(client, fast_cadence())
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404)
        .set_body_json(json!({"class": "Client::NotFound", "message": "not found"}))
}

fn attribute<'a>(state: &'a ResourceState, key: &str) -> &'a Value {
    state
        .attribute(key)
        .unwrap_or_else(|| panic!("attribute {key} missing from {state:?}"))
}

fn cluster(status: &str) -> Value {
    json!({
        "id": "db-1",
        "status": status,
        "description": "orders",
        "plan": "essential",
        "version": "15",
        "createdAt": "2024-01-01T00:00:00Z",
        "disk": {"size": 80},
        "endpoints": [{"component": "postgresql", "domain": "db-1.example", "port": 20184, "ssl": true}],
    })
}

async fn mount_cluster_nodes(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1/node"))
        .respond_with(ok(json!(["n-1"])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1/node/n-1"))
        .respond_with(ok(json!({"flavor": "db1-4", "region": "GRA"})))
        .mount(server)
        .await;
}

fn database_attributes() -> Value {
    json!({
        "service_name": "p1",
        "engine": "postgresql",
        "description": "orders",
        "plan": "essential",
        "version": "15",
        "flavor": "db1-4",
        "nodes": [{"region": "GRA"}],
    })
}

#[tokio::test]
async fn database_create_waits_for_ready_and_reimports_equal_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cloud/project/p1/database/postgresql"))
        .and(body_json(json!({
            "description": "orders",
            "plan": "essential",
            "version": "15",
            "nodesPattern": {"flavor": "db1-4", "number": 1, "region": "GRA"},
        })))
        .respond_with(ok(cluster("PENDING")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(ok(cluster("CREATING")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(ok(cluster("READY")))
        .mount(&server)
        .await;
    mount_cluster_nodes(&server).await;

    let provider = provider_for(&server);
    let state = provider
        .create("ovh_cloud_project_database", database_attributes(), TIMEOUT)
        .await
        .expect("create should succeed");

    assert_eq!(state.id, "p1/postgresql/db-1");
    assert_eq!(attribute(&state, "status"), "READY");
    assert_eq!(attribute(&state, "flavor"), "db1-4");
    assert_eq!(attribute(&state, "disk_size"), 80);

    let imported = provider
        .import("ovh_cloud_project_database", &state.id)
        .await
        .expect("import should succeed");
    assert_eq!(imported, state);
}

#[tokio::test]
async fn database_create_surfaces_failed_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cloud/project/p1/database/postgresql"))
        .respond_with(ok(cluster("PENDING")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(ok(cluster("ERROR")))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .create("ovh_cloud_project_database", database_attributes(), TIMEOUT)
        .await
        .expect_err("failed cluster should error");

    let ProviderError::Wait { id, message, .. } = &err else {
        panic!("expected a wait error, got {err}");
    };
    assert_eq!(id, "db-1");
    assert!(message.contains("ERROR"), "message: {message}");
}

#[tokio::test]
async fn database_delete_polls_until_gone() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(ok(cluster("DELETING")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = ResourceState {
        id: String::from("p1/postgresql/db-1"),
        attributes: serde_json::from_value(json!({
            "service_name": "p1",
            "engine": "postgresql",
            "id": "db-1",
            "description": "orders",
            "plan": "essential",
            "version": "15",
            "flavor": "db1-4",
            "nodes": [{"region": "GRA"}],
            "disk_size": null,
            "status": "READY",
            "created_at": "2024-01-01T00:00:00Z",
            "endpoints": [],
        }))
        .expect("attributes should parse"),
    };

    provider
        .delete("ovh_cloud_project_database", &state, TIMEOUT)
        .await
        .expect("delete should succeed");
    assert_eq!(
        provider
            .read("ovh_cloud_project_database", &state)
            .await
            .expect("read should succeed"),
        None
    );
}

#[tokio::test]
async fn database_user_create_retries_while_cluster_is_locked() {
    let server = MockServer::start().await;
    let users = "/cloud/project/p1/database/postgresql/db-1/user";
    Mock::given(method("POST"))
        .and(path(users))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            json!({"class": "Client::Conflict", "message": "cluster is updating"}),
        ))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(users))
        .respond_with(ok(json!({
            "id": "u-1",
            "username": "app",
            "status": "PENDING",
            "password": "s3cret",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/database/postgresql/db-1/user/u-1"))
        .respond_with(ok(json!({
            "id": "u-1",
            "username": "app",
            "status": "READY",
            "createdAt": "2024-01-01T00:00:00Z",
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_cloud_project_database_user",
            json!({
                "service_name": "p1",
                "engine": "postgresql",
                "cluster_id": "db-1",
                "name": "app",
            }),
            TIMEOUT,
        )
        .await
        .expect("create should succeed after the lock clears");

    assert_eq!(state.id, "p1/postgresql/db-1/u-1");
    assert_eq!(attribute(&state, "password"), "s3cret");

    let refreshed = provider
        .read("ovh_cloud_project_database_user", &state)
        .await
        .expect("read should succeed")
        .expect("user should exist");
    assert_eq!(attribute(&refreshed, "password"), "s3cret");
}

#[tokio::test]
async fn database_user_create_fails_fast_when_user_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cloud/project/p1/database/postgresql/db-1/user"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "class": "Client::Conflict::AlreadyExists",
            "message": "User app already exists",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider_for(&server)
        .create(
            "ovh_cloud_project_database_user",
            json!({
                "service_name": "p1",
                "engine": "postgresql",
                "cluster_id": "db-1",
                "name": "app",
            }),
            TIMEOUT,
        )
        .await
        .expect_err("a duplicate user should not be retried");

    let ProviderError::Wait { ref message, .. } = err else {
        panic!("expected wait error, got {err}");
    };
    assert!(message.contains("already exists"), "message: {message}");
    assert!(!message.contains("timed out"), "message: {message}");
}

#[tokio::test]
async fn database_user_is_replace_only() {
    let server = MockServer::start().await;
    let provider = provider_for(&server);
    let state = ResourceState::default();
    let err = provider
        .update(
            "ovh_cloud_project_database_user",
            &state,
            json!({}),
            TIMEOUT,
        )
        .await
        .expect_err("update should be refused");
    assert!(
        matches!(err, ProviderError::InvalidAttributes { .. } | ProviderError::UpdateNotSupported { .. }),
        "unexpected error: {err}"
    );
}

fn registry(status: &str, name: &str) -> Value {
    json!({
        "id": "reg-1",
        "name": name,
        "region": "GRA",
        "status": status,
        "url": "https://reg-1.gra7.container-registry.ovh.net",
        "version": "2.8",
        "createdAt": "2024-01-01T00:00:00Z",
    })
}

#[tokio::test]
async fn container_registry_rename_waits_for_ready() {
    let server = MockServer::start().await;
    let registry_path = "/cloud/project/p1/containerRegistry/reg-1";
    Mock::given(method("PUT"))
        .and(path(registry_path))
        .and(body_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(registry_path))
        .respond_with(ok(registry("UPDATING", "renamed")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(registry_path))
        .respond_with(ok(registry("READY", "renamed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloud/project/p1/containerRegistry/reg-1/capabilities/plan"))
        .respond_with(ok(json!({"id": "plan-s"})))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let current = ResourceState {
        id: String::from("p1/reg-1"),
        attributes: serde_json::from_value(json!({
            "service_name": "p1",
            "id": "reg-1",
            "name": "original",
            "region": "GRA",
            "plan_id": "plan-s",
            "status": "READY",
            "url": "https://reg-1.gra7.container-registry.ovh.net",
            "version": "2.8",
            "created_at": "2024-01-01T00:00:00Z",
        }))
        .expect("attributes should parse"),
    };
    let updated = provider
        .update(
            "ovh_cloud_project_containerregistry",
            &current,
            json!({"service_name": "p1", "name": "renamed", "region": "GRA", "plan_id": "plan-s"}),
            TIMEOUT,
        )
        .await
        .expect("update should succeed");

    assert_eq!(attribute(&updated, "name"), "renamed");
    assert_eq!(attribute(&updated, "status"), "READY");
    assert_eq!(attribute(&updated, "plan_id"), "plan-s");
}

#[tokio::test]
async fn vrack_attachment_treats_vanished_task_as_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vrack/pn-1/cloudProject"))
        .and(body_json(json!({"project": "proj-1"})))
        .respond_with(ok(json!({"id": 42, "status": "init", "function": "addCloudProject"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vrack/pn-1/task/42"))
        .respond_with(ok(json!({"id": 42, "status": "doing", "function": "addCloudProject"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vrack/pn-1/task/42"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_vrack_cloudproject",
            json!({"service_name": "pn-1", "project_id": "proj-1"}),
            TIMEOUT,
        )
        .await
        .expect("attach should succeed");
    assert_eq!(state.id, "pn-1/proj-1");
}

#[tokio::test]
async fn vrack_attachment_surfaces_task_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vrack/pn-1/cloudProject"))
        .respond_with(ok(json!({"id": 43, "status": "init", "function": "addCloudProject"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vrack/pn-1/task/43"))
        .respond_with(ok(json!({"id": 43, "status": "error", "function": "addCloudProject"})))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .create(
            "ovh_vrack_cloudproject",
            json!({"service_name": "pn-1", "project_id": "proj-1"}),
            TIMEOUT,
        )
        .await
        .expect_err("task error should fail the attach");
    assert!(matches!(err, ProviderError::Wait { .. }), "got {err}");
}

#[tokio::test]
async fn ip_reverse_is_created_synchronously() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/ip/[^/]+/reverse$"))
        .and(body_json(json!({"ipReverse": "192.0.2.5", "reverse": "mail.example.com."})))
        .respond_with(ok(json!({"ipReverse": "192.0.2.5", "reverse": "mail.example.com."})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_ip_reverse",
            json!({"ip_block": "192.0.2.0/28", "ip": "192.0.2.5", "reverse": "mail.example.com"}),
            TIMEOUT,
        )
        .await
        .expect("create should succeed");
    assert_eq!(state.id, "192.0.2.0/28|192.0.2.5");
    assert_eq!(attribute(&state, "reverse"), "mail.example.com.");
}

#[tokio::test]
async fn ip_reverse_rejects_address_outside_block_before_calling_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .create(
            "ovh_ip_reverse",
            json!({"ip_block": "192.0.2.0/28", "ip": "198.51.100.1", "reverse": "mail.example.com"}),
            TIMEOUT,
        )
        .await
        .expect_err("foreign address should be rejected");
    assert!(matches!(err, ProviderError::InvalidAttributes { .. }), "got {err}");
}

#[tokio::test]
async fn graylog_stream_id_comes_from_operation_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dbaas/logs/ldp-1/output/graylog/stream"))
        .respond_with(ok(json!({"operationId": "op-1", "state": "PENDING"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dbaas/logs/ldp-1/operation/op-1"))
        .respond_with(ok(json!({"operationId": "op-1", "state": "RUNNING"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dbaas/logs/ldp-1/operation/op-1"))
        .respond_with(ok(json!({"operationId": "op-1", "state": "SUCCESS", "streamId": "s-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dbaas/logs/ldp-1/output/graylog/stream/s-1"))
        .respond_with(ok(json!({
            "streamId": "s-1",
            "title": "app",
            "description": "application logs",
            "indexingEnabled": true,
            "writeToken": "token-1",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_dbaas_logs_output_graylog_stream",
            json!({"service_name": "ldp-1", "title": "app", "description": "application logs"}),
            TIMEOUT,
        )
        .await
        .expect("create should succeed");
    assert_eq!(state.id, "ldp-1/s-1");
    assert_eq!(attribute(&state, "write_token"), "token-1");
}

#[tokio::test]
async fn iam_policy_uses_api_v2_and_validates_import_ids() {
    let server = MockServer::start().await;
    let policy = json!({
        "id": "6f2f3f8e-0b7c-4d3a-9a57-1d1b0c6f2b11",
        "name": "ops",
        "identities": ["urn:v1:eu:identity:group:xx1-ovh/ops"],
        "resources": [{"urn": "urn:v1:eu:resource:vps:vps-1.ovh.net"}],
        "permissions": {"allow": [{"action": "vps:apiovh:reboot"}]},
        "owner": "xx1-ovh",
        "readOnly": false,
        "createdAt": "2024-01-01T00:00:00Z",
    });
    Mock::given(method("POST"))
        .and(path("/v2/iam/policy"))
        .respond_with(ok(policy.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/iam/policy/6f2f3f8e-0b7c-4d3a-9a57-1d1b0c6f2b11"))
        .respond_with(ok(policy))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_iam_policy",
            json!({
                "name": "ops",
                "identities": ["urn:v1:eu:identity:group:xx1-ovh/ops"],
                "resources": ["urn:v1:eu:resource:vps:vps-1.ovh.net"],
                "allow": ["vps:apiovh:reboot"],
            }),
            TIMEOUT,
        )
        .await
        .expect("create should succeed");
    assert_eq!(state.id, "6f2f3f8e-0b7c-4d3a-9a57-1d1b0c6f2b11");

    let imported = provider
        .import("ovh_iam_policy", &state.id)
        .await
        .expect("import should succeed");
    assert_eq!(imported, state);

    let err = provider
        .import("ovh_iam_policy", "not-a-uuid")
        .await
        .expect_err("malformed id should be rejected");
    assert!(matches!(err, ProviderError::InvalidImportId { .. }), "got {err}");
}

#[tokio::test]
async fn reboot_task_fails_on_provider_error_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dedicated/server/ns1/reboot"))
        .respond_with(ok(json!({"taskId": 7, "function": "hardReboot", "status": "todo"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns1/task/7"))
        .respond_with(ok(json!({"taskId": 7, "function": "hardReboot", "status": "ovhError"})))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider
        .create(
            "ovh_dedicated_server_reboot_task",
            json!({"service_name": "ns1"}),
            TIMEOUT,
        )
        .await
        .expect_err("ovhError should fail the reboot");
    let ProviderError::Wait { id, message, .. } = &err else {
        panic!("expected a wait error, got {err}");
    };
    assert_eq!(id, "7");
    assert!(message.contains("ovhError"), "message: {message}");
}

#[tokio::test]
async fn reboot_task_completes_and_delete_only_forgets_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dedicated/server/ns1/reboot"))
        .respond_with(ok(json!({"taskId": 8, "function": "hardReboot", "status": "init"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dedicated/server/ns1/task/8"))
        .respond_with(ok(json!({"taskId": 8, "function": "hardReboot", "status": "done"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let state = provider
        .create(
            "ovh_dedicated_server_reboot_task",
            json!({"service_name": "ns1", "keepers": ["v1"]}),
            TIMEOUT,
        )
        .await
        .expect("reboot should complete");
    assert_eq!(state.id, "ns1/8");
    assert_eq!(attribute(&state, "status"), "done");

    provider
        .delete("ovh_dedicated_server_reboot_task", &state, TIMEOUT)
        .await
        .expect("delete should succeed without API calls");
}

#[tokio::test]
async fn vracks_data_source_sorts_service_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vrack"))
        .respond_with(ok(json!(["pn-2", "pn-1"])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider
        .lookup("ovh_vracks", json!({}))
        .await
        .expect("lookup should succeed");
    assert_eq!(result.get("result"), Some(&json!(["pn-1", "pn-2"])));
}

#[tokio::test]
async fn unknown_types_are_rejected() {
    let server = MockServer::start().await;
    let provider = provider_for(&server);

    let err = provider
        .create("ovh_nope", json!({}), TIMEOUT)
        .await
        .expect_err("unknown resource should fail");
    assert!(matches!(err, ProviderError::UnknownResourceType(_)), "got {err}");

    let err = provider
        .lookup("ovh_nope", json!({}))
        .await
        .expect_err("unknown data source should fail");
    assert!(matches!(err, ProviderError::UnknownDataSource(_)), "got {err}");
}
