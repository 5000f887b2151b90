//! `ovh_dedicated_server_reboot_task`: hard reboot of a dedicated server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, Timeouts, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, observe};

use super::found;

const TYPE_NAME: &str = "ovh_dedicated_server_reboot_task";
const TASK_PENDING: [&str; 3] = ["init", "todo", "doing"];
const TASK_FAILED: [&str; 3] = ["cancelled", "customerError", "ovhError"];
const TASK_DONE: &str = "done";

/// Arguments of `ovh_dedicated_server_reboot_task`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RebootTaskConfig {
    /// Dedicated server service name, for example `ns123.ip-203-0-113.eu`.
    pub service_name: String,
    /// Arbitrary values; changing any of them schedules a new reboot.
    #[serde(default)]
    pub keepers: Vec<String>,
}

/// State of `ovh_dedicated_server_reboot_task`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RebootTaskState {
    /// Dedicated server service name.
    pub service_name: String,
    /// Task id.
    pub task_id: i64,
    /// Task function, `hardReboot`.
    pub function: String,
    /// Final task status.
    pub status: String,
    /// Operator comment attached to the task.
    pub comment: Option<String>,
    /// Task start timestamp.
    pub start_date: Option<String>,
    /// Task completion timestamp.
    pub done_date: Option<String>,
    /// Values that triggered the reboot.
    #[serde(default)]
    pub keepers: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerTask {
    task_id: i64,
    #[serde(default)]
    function: String,
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    done_date: Option<String>,
}

impl ServerTask {
    fn into_state(self, service_name: &str, keepers: Vec<String>) -> RebootTaskState {
        RebootTaskState {
            service_name: service_name.to_owned(),
            task_id: self.task_id,
            function: self.function,
            status: self.status,
            comment: self.comment,
            start_date: self.start_date,
            done_date: self.done_date,
            keepers,
        }
    }
}

/// Handler for `ovh_dedicated_server_reboot_task`.
#[derive(Clone, Debug)]
pub struct DedicatedServerRebootTask {
    client: OvhClient,
    cadence: Cadence,
}

impl DedicatedServerRebootTask {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(10), Duration::from_secs(10));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    fn task_path(service_name: &str, task_id: i64) -> String {
        format!(
            "/dedicated/server/{}/task/{task_id}",
            escape(service_name)
        )
    }

    async fn poll_task(
        &self,
        path: &str,
    ) -> Result<Observation<ServerTask>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, false, |task: &ServerTask| {
            task.status.clone()
        })
    }
}

impl Resource for DedicatedServerRebootTask {
    type Config = RebootTaskConfig;
    type State = RebootTaskState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn default_timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(45 * 60),
            ..Timeouts::default()
        }
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}/{}", state.service_name, state.task_id)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let reboot = format!("/dedicated/server/{}/reboot", escape(&config.service_name));
            let task: ServerTask = self.client.post(&reboot, &serde_json::Map::new()).await?;
            let path = Self::task_path(&config.service_name, task.task_id);
            let id = task.task_id.to_string();
            let finished = Waiter::new(format!(
                "reboot of {} (task {id})",
                config.service_name
            ))
            .pending(TASK_PENDING)
            .target([TASK_DONE])
            .failed(TASK_FAILED)
            .timeout(timeout)
            .cadence(self.cadence)
            .wait(|| self.poll_task(&path))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, &id, &err))?
            .ok_or_else(|| ProviderError::not_found(TYPE_NAME, &id))?;
            Ok(finished.into_state(&config.service_name, config.keepers.clone()))
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move {
            let path = Self::task_path(&state.service_name, state.task_id);
            Ok(found(self.client.get::<ServerTask>(&path).await)?
                .map(|task| task.into_state(&state.service_name, state.keepers.clone())))
        })
    }

    /// Reboots cannot be undone; deletion only drops the task from state.
    fn delete<'a>(&'a self, _state: &'a Self::State, _timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, raw_task_id] =
                parse_import_id(import_id, ["service_name", "task_id"])?;
            let task_id = raw_task_id
                .parse::<i64>()
                .map_err(|_| ProviderError::InvalidImportId {
                    id: import_id.to_owned(),
                    expected: String::from("service_name/task_id (numeric task id)"),
                })?;
            let path = Self::task_path(service_name, task_id);
            found(self.client.get::<ServerTask>(&path).await)?
                .map(|task| task.into_state(service_name, Vec::new()))
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
