//! Live acceptance tests against the real OVHcloud API.
//!
//! These tests are ignored by default. Run them with `--ignored` after
//! exporting provider credentials (`OVH_ENDPOINT`, `OVH_APPLICATION_KEY`,
//! `OVH_APPLICATION_SECRET`, `OVH_CONSUMER_KEY`) and the service variables
//! named below. They create and delete real objects.

use std::env;

use ovh_provider::{OvhConfig, Provider};
use serde_json::json;

const CLOUD_PROJECT_VAR: &str = "OVH_CLOUD_PROJECT_SERVICE_TEST";
const VRACK_VAR: &str = "OVH_VRACK_SERVICE_TEST";

fn live_provider() -> Provider {
    let config = OvhConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("provider configuration: {err}"));
    Provider::new(&config).unwrap_or_else(|err| panic!("provider: {err}"))
}

fn required_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{name} must be set for acceptance tests"))
}

#[tokio::test]
#[ignore = "requires OVHcloud credentials"]
async fn me_data_source_returns_account() {
    let provider = live_provider();
    let account = provider
        .lookup("ovh_me", json!({}))
        .await
        .unwrap_or_else(|err| panic!("lookup ovh_me: {err}"));
    assert!(account.contains_key("nichandle"), "account: {account:?}");
}

#[tokio::test]
#[ignore = "requires OVHcloud credentials and a vrack"]
async fn vrack_is_listed() {
    let vrack = required_var(VRACK_VAR);
    let provider = live_provider();
    let vracks = provider
        .lookup("ovh_vracks", json!({}))
        .await
        .unwrap_or_else(|err| panic!("lookup ovh_vracks: {err}"));
    let listed = vracks
        .get("result")
        .and_then(|value| value.as_array())
        .is_some_and(|names| names.iter().any(|name| name == vrack.as_str()));
    assert!(listed, "{vrack} missing from {vracks:?}");
}

#[tokio::test]
#[ignore = "requires OVHcloud credentials, a vrack and a Public Cloud project"]
async fn cloud_project_attaches_to_and_detaches_from_vrack() {
    let vrack = required_var(VRACK_VAR);
    let project = required_var(CLOUD_PROJECT_VAR);
    let provider = live_provider();

    let state = provider
        .create(
            "ovh_vrack_cloudproject",
            json!({"service_name": vrack, "project_id": project}),
            None,
        )
        .await
        .unwrap_or_else(|err| panic!("attach: {err}"));
    assert_eq!(state.id, format!("{vrack}/{project}"));

    let imported = provider
        .import("ovh_vrack_cloudproject", &state.id)
        .await
        .unwrap_or_else(|err| panic!("import: {err}"));
    assert_eq!(imported, state);

    provider
        .delete("ovh_vrack_cloudproject", &state, None)
        .await
        .unwrap_or_else(|err| panic!("detach: {err}"));
    let after = provider
        .read("ovh_vrack_cloudproject", &state)
        .await
        .unwrap_or_else(|err| panic!("read after detach: {err}"));
    assert_eq!(after, None);
}
