//! `ovh_cloud_project_database_user`: users of a managed database cluster.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, classify, observe};

use super::cloud_project_database::CloudProjectDatabase;
use super::{found, ignore_not_found};

const TYPE_NAME: &str = "ovh_cloud_project_database_user";
const PENDING: [&str; 2] = ["PENDING", "CREATING"];
const DELETE_PENDING: [&str; 4] = ["PENDING", "CREATING", "READY", "DELETING"];
const FAILED: [&str; 1] = ["ERROR"];
const READY: &str = "READY";

/// Arguments of `ovh_cloud_project_database_user`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseUserConfig {
    /// Public Cloud project id.
    pub service_name: String,
    /// Database engine of the cluster.
    pub engine: String,
    /// Cluster id.
    pub cluster_id: String,
    /// User name.
    pub name: String,
    /// Engine roles granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// State of `ovh_cloud_project_database_user`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseUserState {
    /// Public Cloud project id.
    pub service_name: String,
    /// Database engine of the cluster.
    pub engine: String,
    /// Cluster id.
    pub cluster_id: String,
    /// User id.
    pub id: String,
    /// User name.
    pub name: String,
    /// Engine roles granted to the user.
    pub roles: Vec<String>,
    /// Status as reported by the API.
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Password returned at creation. The API never returns it again, so it
    /// is carried over from previous state and is absent after an import.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: String,
    username: String,
    status: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    roles: Option<&'a [String]>,
}

/// Handler for `ovh_cloud_project_database_user`.
#[derive(Clone, Debug)]
pub struct CloudProjectDatabaseUser {
    client: OvhClient,
    cadence: Cadence,
}

impl CloudProjectDatabaseUser {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(5), Duration::from_secs(5));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    fn users_path(service_name: &str, engine: &str, cluster_id: &str) -> String {
        format!(
            "{}/user",
            CloudProjectDatabase::cluster_path(service_name, engine, cluster_id)
        )
    }

    fn user_path(service_name: &str, engine: &str, cluster_id: &str, user_id: &str) -> String {
        format!(
            "{}/{}",
            Self::users_path(service_name, engine, cluster_id),
            escape(user_id)
        )
    }

    async fn try_create(
        &self,
        path: &str,
        body: &CreateUserBody<'_>,
    ) -> Result<UserResponse, RefreshError<ClientError>> {
        self.client
            .post(path, body)
            .await
            .map_err(|err| classify(err, true))
    }

    async fn try_delete(&self, path: &str) -> Result<(), RefreshError<ClientError>> {
        ignore_not_found(self.client.delete_unit(path).await).map_err(|err| classify(err, true))
    }

    async fn poll_user(
        &self,
        path: &str,
    ) -> Result<Observation<UserResponse>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, true, |user: &UserResponse| {
            user.status.clone()
        })
    }

    fn state_from(
        config: &DatabaseUserConfig,
        user: UserResponse,
        password: Option<String>,
    ) -> DatabaseUserState {
        DatabaseUserState {
            service_name: config.service_name.clone(),
            engine: config.engine.clone(),
            cluster_id: config.cluster_id.clone(),
            id: user.id,
            name: user.username,
            roles: user.roles,
            status: user.status,
            created_at: user.created_at,
            password: user.password.or(password),
        }
    }

    async fn read_user(
        &self,
        service_name: &str,
        engine: &str,
        cluster_id: &str,
        user_id: &str,
        password: Option<String>,
    ) -> Result<Option<DatabaseUserState>, ProviderError> {
        let path = Self::user_path(service_name, engine, cluster_id, user_id);
        let Some(user) = found(self.client.get::<UserResponse>(&path).await)? else {
            return Ok(None);
        };
        Ok(Some(DatabaseUserState {
            service_name: service_name.to_owned(),
            engine: engine.to_owned(),
            cluster_id: cluster_id.to_owned(),
            id: user.id,
            name: user.username,
            roles: user.roles,
            status: user.status,
            created_at: user.created_at,
            password,
        }))
    }
}

impl Resource for CloudProjectDatabaseUser {
    type Config = DatabaseUserConfig;
    type State = DatabaseUserState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!(
            "{}/{}/{}/{}",
            state.service_name, state.engine, state.cluster_id, state.id
        )
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let users = Self::users_path(&config.service_name, &config.engine, &config.cluster_id);
            let body = CreateUserBody {
                name: &config.name,
                roles: (!config.roles.is_empty()).then_some(config.roles.as_slice()),
            };
            let created = Waiter::new(format!(
                "user {} creation on cluster {}",
                config.name, config.cluster_id
            ))
            .timeout(timeout)
            .cadence(self.cadence)
            .retry(|| self.try_create(&users, &body))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, &config.name, &err))?;

            let password = created.password.clone();
            let path = Self::user_path(
                &config.service_name,
                &config.engine,
                &config.cluster_id,
                &created.id,
            );
            let ready = Waiter::new(format!("user {} to become ready", created.id))
                .pending(PENDING)
                .target([READY])
                .failed(FAILED)
                .timeout(timeout)
                .cadence(self.cadence)
                .wait(|| self.poll_user(&path))
                .await
                .map_err(|err| ProviderError::wait(TYPE_NAME, &created.id, &err))?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, &created.id))?;

            Ok(Self::state_from(config, ready, password))
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move {
            self.read_user(
                &state.service_name,
                &state.engine,
                &state.cluster_id,
                &state.id,
                state.password.clone(),
            )
            .await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::user_path(
                &state.service_name,
                &state.engine,
                &state.cluster_id,
                &state.id,
            );
            let waiter = Waiter::new(format!("user {} deletion", state.id))
                .timeout(timeout)
                .cadence(self.cadence);
            waiter
                .retry(|| self.try_delete(&path))
                .await
                .map_err(|err| ProviderError::wait(TYPE_NAME, &state.id, &err))?;
            waiter
                .pending(DELETE_PENDING)
                .failed(FAILED)
                .until_gone()
                .wait(|| self.poll_user(&path))
                .await
                .map_err(|err| ProviderError::wait(TYPE_NAME, &state.id, &err))?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, engine, cluster_id, user_id] = parse_import_id(
                import_id,
                ["service_name", "engine", "cluster_id", "id"],
            )?;
            self.read_user(service_name, engine, cluster_id, user_id, None)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_body_omits_empty_roles() {
        let body = CreateUserBody {
            name: "app",
            roles: None,
        };
        assert_eq!(
            serde_json::to_value(&body).expect("body should serialise"),
            json!({"name": "app"})
        );
    }

    #[test]
    fn user_path_nests_under_cluster() {
        assert_eq!(
            CloudProjectDatabaseUser::user_path("abc", "postgresql", "db-1", "u-1"),
            "/cloud/project/abc/database/postgresql/db-1/user/u-1"
        );
    }
}
