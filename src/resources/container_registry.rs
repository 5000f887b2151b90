//! `ovh_cloud_project_containerregistry`: managed private registries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, observe};

use super::{found, ignore_not_found};

const TYPE_NAME: &str = "ovh_cloud_project_containerregistry";
const PENDING: [&str; 3] = ["INSTALLING", "UPDATING", "RESTORING"];
const DELETE_PENDING: [&str; 3] = ["READY", "UPDATING", "DELETING"];
const FAILED: [&str; 1] = ["ERROR"];
const READY: &str = "READY";
const DELETED: &str = "DELETED";

/// Arguments of `ovh_cloud_project_containerregistry`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Public Cloud project id.
    pub service_name: String,
    /// Registry name.
    pub name: String,
    /// Region, for example `GRA`.
    pub region: String,
    /// Plan id; the API picks the smallest plan when omitted.
    #[serde(default)]
    pub plan_id: Option<String>,
}

/// State of `ovh_cloud_project_containerregistry`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RegistryState {
    /// Public Cloud project id.
    pub service_name: String,
    /// Registry id.
    pub id: String,
    /// Registry name.
    pub name: String,
    /// Region.
    pub region: String,
    /// Current plan id.
    pub plan_id: Option<String>,
    /// Status as reported by the API.
    pub status: String,
    /// Registry URL.
    pub url: String,
    /// Harbor version.
    pub version: String,
    /// Creation timestamp.
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryResponse {
    id: String,
    name: String,
    region: String,
    status: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PlanResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateRegistryBody<'a> {
    name: &'a str,
    region: &'a str,
    #[serde(rename = "planID", skip_serializing_if = "Option::is_none")]
    plan_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct PlanBody<'a> {
    #[serde(rename = "planID")]
    plan_id: &'a str,
}

/// Handler for `ovh_cloud_project_containerregistry`.
#[derive(Clone, Debug)]
pub struct ContainerRegistry {
    client: OvhClient,
    cadence: Cadence,
}

impl ContainerRegistry {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(10), Duration::from_secs(10));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    fn registry_path(service_name: &str, registry_id: &str) -> String {
        format!(
            "/cloud/project/{}/containerRegistry/{}",
            escape(service_name),
            escape(registry_id)
        )
    }

    async fn poll_registry(
        &self,
        path: &str,
    ) -> Result<Observation<RegistryResponse>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, false, |registry: &RegistryResponse| {
            registry.status.clone()
        })
    }

    async fn wait_ready(
        &self,
        service_name: &str,
        registry_id: &str,
        timeout: Duration,
    ) -> Result<RegistryResponse, ProviderError> {
        let path = Self::registry_path(service_name, registry_id);
        Waiter::new(format!("container registry {registry_id} to become ready"))
            .pending(PENDING)
            .target([READY])
            .failed(FAILED)
            .timeout(timeout)
            .cadence(self.cadence)
            .wait(|| self.poll_registry(&path))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, registry_id, &err))?
            .ok_or_else(|| ProviderError::not_found(TYPE_NAME, registry_id))
    }

    async fn state_from(
        &self,
        service_name: &str,
        registry: RegistryResponse,
    ) -> Result<RegistryState, ProviderError> {
        let plan_path = format!(
            "{}/capabilities/plan",
            Self::registry_path(service_name, &registry.id)
        );
        let plan = found(self.client.get::<PlanResponse>(&plan_path).await)?;
        Ok(RegistryState {
            service_name: service_name.to_owned(),
            id: registry.id,
            name: registry.name,
            region: registry.region,
            plan_id: plan.map(|current| current.id),
            status: registry.status,
            url: registry.url,
            version: registry.version,
            created_at: registry.created_at,
        })
    }

    async fn read_registry(
        &self,
        service_name: &str,
        registry_id: &str,
    ) -> Result<Option<RegistryState>, ProviderError> {
        let path = Self::registry_path(service_name, registry_id);
        let Some(registry) = found(self.client.get::<RegistryResponse>(&path).await)? else {
            return Ok(None);
        };
        Ok(Some(self.state_from(service_name, registry).await?))
    }
}

impl Resource for ContainerRegistry {
    type Config = RegistryConfig;
    type State = RegistryState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}/{}", state.service_name, state.id)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let path = format!(
                "/cloud/project/{}/containerRegistry",
                escape(&config.service_name)
            );
            let body = CreateRegistryBody {
                name: &config.name,
                region: &config.region,
                plan_id: config.plan_id.as_deref(),
            };
            let created: RegistryResponse = self.client.post(&path, &body).await?;
            let registry = self
                .wait_ready(&config.service_name, &created.id, timeout)
                .await?;
            self.state_from(&config.service_name, registry).await
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move { self.read_registry(&state.service_name, &state.id).await })
    }

    fn update<'a>(
        &'a self,
        state: &'a Self::State,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            if config.service_name != state.service_name || config.region != state.region {
                return Err(ProviderError::InvalidAttributes {
                    resource_type: TYPE_NAME.to_owned(),
                    message: String::from(
                        "service_name and region cannot change in place; recreate the registry",
                    ),
                });
            }
            let path = Self::registry_path(&state.service_name, &state.id);
            if config.name != state.name {
                self.client
                    .put_unit(&path, &RenameBody { name: &config.name })
                    .await?;
            }
            let plan_change = config
                .plan_id
                .as_deref()
                .filter(|plan| state.plan_id.as_deref() != Some(*plan));
            if let Some(plan_id) = plan_change {
                self.client
                    .put_unit(&format!("{path}/capabilities/plan"), &PlanBody { plan_id })
                    .await?;
            }
            let registry = self
                .wait_ready(&state.service_name, &state.id, timeout)
                .await?;
            self.state_from(&state.service_name, registry).await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::registry_path(&state.service_name, &state.id);
            ignore_not_found(self.client.delete_unit(&path).await)?;
            Waiter::new(format!("container registry {} to be deleted", state.id))
                .pending(DELETE_PENDING)
                .target([DELETED])
                .failed(FAILED)
                .until_gone()
                .timeout(timeout)
                .cadence(self.cadence)
                .wait(|| self.poll_registry(&path))
                .await
                .map_err(|err| ProviderError::wait(TYPE_NAME, &state.id, &err))?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, registry_id] = parse_import_id(import_id, ["service_name", "id"])?;
            self.read_registry(service_name, registry_id)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
