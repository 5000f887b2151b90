//! `ovh_iam_policy`: IAM access policies (API v2).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::OvhClient;
use crate::provider::{ProviderError, ProviderFuture, Resource};

use super::{found, ignore_not_found};

const TYPE_NAME: &str = "ovh_iam_policy";
const POLICY_PATH: &str = "/v2/iam/policy";

/// Arguments of `ovh_iam_policy`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IamPolicyConfig {
    /// Policy name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// URNs of the identities the policy applies to.
    pub identities: Vec<String>,
    /// URNs of the resources the policy applies to.
    pub resources: Vec<String>,
    /// Allowed actions.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Actions excluded from `allow`.
    #[serde(default)]
    pub except: Vec<String>,
    /// Explicitly denied actions.
    #[serde(default)]
    pub deny: Vec<String>,
}

/// State of `ovh_iam_policy`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IamPolicyState {
    /// Policy id.
    pub id: Uuid,
    /// Policy name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// URNs of the identities the policy applies to.
    pub identities: Vec<String>,
    /// URNs of the resources the policy applies to.
    pub resources: Vec<String>,
    /// Allowed actions.
    pub allow: Vec<String>,
    /// Actions excluded from `allow`.
    pub except: Vec<String>,
    /// Explicitly denied actions.
    pub deny: Vec<String>,
    /// Account owning the policy.
    pub owner: String,
    /// Whether the policy is managed by OVHcloud.
    pub read_only: bool,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
struct Action {
    action: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
struct Permissions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    allow: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    except: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    deny: Vec<Action>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
struct ResourceUrn {
    urn: String,
}

#[derive(Debug, Serialize)]
struct PolicyBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    identities: &'a [String],
    resources: Vec<ResourceUrn>,
    permissions: Permissions,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyResponse {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    identities: Vec<String>,
    #[serde(default)]
    resources: Vec<ResourceUrn>,
    #[serde(default)]
    permissions: Permissions,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
}

fn actions(names: &[String]) -> Vec<Action> {
    names
        .iter()
        .map(|name| Action {
            action: name.clone(),
        })
        .collect()
}

fn action_names(actions: Vec<Action>) -> Vec<String> {
    actions.into_iter().map(|entry| entry.action).collect()
}

impl<'a> PolicyBody<'a> {
    fn from_config(config: &'a IamPolicyConfig) -> Self {
        Self {
            name: &config.name,
            description: config.description.as_deref(),
            identities: &config.identities,
            resources: config
                .resources
                .iter()
                .map(|urn| ResourceUrn { urn: urn.clone() })
                .collect(),
            permissions: Permissions {
                allow: actions(&config.allow),
                except: actions(&config.except),
                deny: actions(&config.deny),
            },
        }
    }
}

impl From<PolicyResponse> for IamPolicyState {
    fn from(policy: PolicyResponse) -> Self {
        Self {
            id: policy.id,
            name: policy.name,
            description: policy.description,
            identities: policy.identities,
            resources: policy
                .resources
                .into_iter()
                .map(|resource| resource.urn)
                .collect(),
            allow: action_names(policy.permissions.allow),
            except: action_names(policy.permissions.except),
            deny: action_names(policy.permissions.deny),
            owner: policy.owner,
            read_only: policy.read_only,
            created_at: policy.created_at,
            updated_at: policy.updated_at,
        }
    }
}

/// Handler for `ovh_iam_policy`. The v2 API applies policies synchronously.
#[derive(Clone, Debug)]
pub struct IamPolicy {
    client: OvhClient,
}

impl IamPolicy {
    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient) -> Self {
        Self { client }
    }

    fn policy_path(id: Uuid) -> String {
        format!("{POLICY_PATH}/{id}")
    }

    async fn read_policy(&self, id: Uuid) -> Result<Option<IamPolicyState>, ProviderError> {
        let policy = found(
            self.client
                .get::<PolicyResponse>(&Self::policy_path(id))
                .await,
        )?;
        Ok(policy.map(IamPolicyState::from))
    }
}

impl Resource for IamPolicy {
    type Config = IamPolicyConfig;
    type State = IamPolicyState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        state.id.to_string()
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        _timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let created: PolicyResponse = self
                .client
                .post(POLICY_PATH, &PolicyBody::from_config(config))
                .await?;
            Ok(created.into())
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move { self.read_policy(state.id).await })
    }

    fn update<'a>(
        &'a self,
        state: &'a Self::State,
        config: &'a Self::Config,
        _timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let updated: PolicyResponse = self
                .client
                .put(
                    &Self::policy_path(state.id),
                    &PolicyBody::from_config(config),
                )
                .await?;
            Ok(updated.into())
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, _timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            ignore_not_found(
                self.client
                    .delete_unit(&Self::policy_path(state.id))
                    .await,
            )?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let id = Uuid::parse_str(import_id.trim()).map_err(|_| {
                ProviderError::InvalidImportId {
                    id: import_id.to_owned(),
                    expected: String::from("id (a UUID)"),
                }
            })?;
            self.read_policy(id)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
