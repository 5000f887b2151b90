//! `ovh_vrack_cloudproject`: attachment of a Public Cloud project to a vrack.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, observe};

use super::found;

const TYPE_NAME: &str = "ovh_vrack_cloudproject";
const TASK_PENDING: [&str; 3] = ["init", "todo", "doing"];
const TASK_FAILED: [&str; 2] = ["error", "cancelled"];
const TASK_DONE: &str = "done";

/// Arguments and state of `ovh_vrack_cloudproject`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VrackCloudProject {
    /// Vrack service name, for example `pn-123456`.
    pub service_name: String,
    /// Public Cloud project id.
    pub project_id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VrackTask {
    id: i64,
    status: String,
    #[serde(default)]
    function: String,
}

#[derive(Clone, Debug, Deserialize)]
struct AttachmentResponse {
    vrack: String,
    project: String,
}

#[derive(Debug, Serialize)]
struct AttachBody<'a> {
    project: &'a str,
}

/// Handler for `ovh_vrack_cloudproject`.
#[derive(Clone, Debug)]
pub struct VrackCloudProjectAttachment {
    client: OvhClient,
    cadence: Cadence,
}

impl VrackCloudProjectAttachment {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(3), Duration::from_secs(10));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    fn attachment_path(service_name: &str, project_id: &str) -> String {
        format!(
            "/vrack/{}/cloudProject/{}",
            escape(service_name),
            escape(project_id)
        )
    }

    async fn poll_task(
        &self,
        path: &str,
    ) -> Result<Observation<VrackTask>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, false, |task: &VrackTask| {
            task.status.clone()
        })
    }

    /// Waits for a vrack task. The API drops finished tasks, so a `404`
    /// counts as completion.
    async fn wait_task(
        &self,
        service_name: &str,
        task: &VrackTask,
        timeout: Duration,
    ) -> Result<(), ProviderError> {
        let path = format!("/vrack/{}/task/{}", escape(service_name), task.id);
        Waiter::new(format!("vrack {service_name} task {} ({})", task.id, task.function))
            .pending(TASK_PENDING)
            .target([TASK_DONE])
            .failed(TASK_FAILED)
            .until_gone()
            .timeout(timeout)
            .cadence(self.cadence)
            .wait(|| self.poll_task(&path))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, &task.id.to_string(), &err))?;
        Ok(())
    }

    async fn read_attachment(
        &self,
        service_name: &str,
        project_id: &str,
    ) -> Result<Option<VrackCloudProject>, ProviderError> {
        let path = Self::attachment_path(service_name, project_id);
        Ok(found(self.client.get::<AttachmentResponse>(&path).await)?.map(
            |attachment| VrackCloudProject {
                service_name: attachment.vrack,
                project_id: attachment.project,
            },
        ))
    }
}

impl Resource for VrackCloudProjectAttachment {
    type Config = VrackCloudProject;
    type State = VrackCloudProject;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}/{}", state.service_name, state.project_id)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let path = format!("/vrack/{}/cloudProject", escape(&config.service_name));
            let task: VrackTask = self
                .client
                .post(
                    &path,
                    &AttachBody {
                        project: &config.project_id,
                    },
                )
                .await?;
            self.wait_task(&config.service_name, &task, timeout).await?;
            Ok(config.clone())
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move {
            self.read_attachment(&state.service_name, &state.project_id)
                .await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::attachment_path(&state.service_name, &state.project_id);
            let Some(task) = found(self.client.delete::<VrackTask>(&path).await)? else {
                return Ok(());
            };
            self.wait_task(&state.service_name, &task, timeout).await
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, project_id] =
                parse_import_id(import_id, ["service_name", "project_id"])?;
            self.read_attachment(service_name, project_id)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
