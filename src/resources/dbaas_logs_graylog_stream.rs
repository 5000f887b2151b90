//! `ovh_dbaas_logs_output_graylog_stream`: Graylog streams of a Logs Data
//! Platform service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, observe};

use super::found;

const TYPE_NAME: &str = "ovh_dbaas_logs_output_graylog_stream";
const OPERATION_PENDING: [&str; 5] = ["PENDING", "RECEIVED", "STARTED", "RUNNING", "RETRY"];
const OPERATION_FAILED: [&str; 2] = ["FAILURE", "REVOKED"];
const OPERATION_SUCCESS: &str = "SUCCESS";

/// Arguments of `ovh_dbaas_logs_output_graylog_stream`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GraylogStreamConfig {
    /// Logs Data Platform service name, for example `ldp-ab-12345`.
    pub service_name: String,
    /// Stream title.
    pub title: String,
    /// Stream description.
    pub description: String,
    /// Retention policy id; the service default applies when omitted.
    #[serde(default)]
    pub retention_id: Option<String>,
    /// Whether logs are archived to cold storage.
    #[serde(default)]
    pub cold_storage_enabled: bool,
    /// Whether logs are indexed for search.
    #[serde(default = "default_indexing")]
    pub indexing_enabled: bool,
}

const fn default_indexing() -> bool {
    true
}

/// State of `ovh_dbaas_logs_output_graylog_stream`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GraylogStreamState {
    /// Logs Data Platform service name.
    pub service_name: String,
    /// Stream id.
    pub stream_id: String,
    /// Stream title.
    pub title: String,
    /// Stream description.
    pub description: String,
    /// Retention policy id.
    pub retention_id: Option<String>,
    /// Whether logs are archived to cold storage.
    pub cold_storage_enabled: bool,
    /// Whether logs are indexed for search.
    pub indexing_enabled: bool,
    /// Write token used by log shippers.
    pub write_token: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsOperation {
    operation_id: String,
    state: String,
    #[serde(default)]
    stream_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamResponse {
    stream_id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    retention_id: Option<String>,
    #[serde(default)]
    cold_storage_enabled: bool,
    #[serde(default)]
    indexing_enabled: bool,
    #[serde(default)]
    write_token: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamBody<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retention_id: Option<&'a str>,
    cold_storage_enabled: bool,
    indexing_enabled: bool,
}

impl<'a> StreamBody<'a> {
    fn from_config(config: &'a GraylogStreamConfig) -> Self {
        Self {
            title: &config.title,
            description: &config.description,
            retention_id: config.retention_id.as_deref(),
            cold_storage_enabled: config.cold_storage_enabled,
            indexing_enabled: config.indexing_enabled,
        }
    }
}

/// Handler for `ovh_dbaas_logs_output_graylog_stream`.
#[derive(Clone, Debug)]
pub struct DbaasLogsGraylogStream {
    client: OvhClient,
    cadence: Cadence,
}

impl DbaasLogsGraylogStream {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(2), Duration::from_secs(5));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    fn streams_path(service_name: &str) -> String {
        format!(
            "/dbaas/logs/{}/output/graylog/stream",
            escape(service_name)
        )
    }

    fn stream_path(service_name: &str, stream_id: &str) -> String {
        format!("{}/{}", Self::streams_path(service_name), escape(stream_id))
    }

    async fn poll_operation(
        &self,
        path: &str,
    ) -> Result<Observation<LogsOperation>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, false, |operation: &LogsOperation| {
            operation.state.clone()
        })
    }

    /// Waits for an asynchronous operation and returns its final record.
    async fn wait_operation(
        &self,
        service_name: &str,
        operation: &LogsOperation,
        timeout: Duration,
    ) -> Result<LogsOperation, ProviderError> {
        let path = format!(
            "/dbaas/logs/{}/operation/{}",
            escape(service_name),
            escape(&operation.operation_id)
        );
        Waiter::new(format!("logs operation {}", operation.operation_id))
            .pending(OPERATION_PENDING)
            .target([OPERATION_SUCCESS])
            .failed(OPERATION_FAILED)
            .timeout(timeout)
            .cadence(self.cadence)
            .wait(|| self.poll_operation(&path))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, &operation.operation_id, &err))?
            .ok_or_else(|| ProviderError::not_found(TYPE_NAME, &operation.operation_id))
    }

    async fn read_stream(
        &self,
        service_name: &str,
        stream_id: &str,
    ) -> Result<Option<GraylogStreamState>, ProviderError> {
        let path = Self::stream_path(service_name, stream_id);
        Ok(found(self.client.get::<StreamResponse>(&path).await)?.map(|stream| {
            GraylogStreamState {
                service_name: service_name.to_owned(),
                stream_id: stream.stream_id,
                title: stream.title,
                description: stream.description,
                retention_id: stream.retention_id,
                cold_storage_enabled: stream.cold_storage_enabled,
                indexing_enabled: stream.indexing_enabled,
                write_token: stream.write_token,
                created_at: stream.created_at,
                updated_at: stream.updated_at,
            }
        }))
    }

    async fn read_existing(
        &self,
        service_name: &str,
        stream_id: &str,
    ) -> Result<GraylogStreamState, ProviderError> {
        self.read_stream(service_name, stream_id)
            .await?
            .ok_or_else(|| ProviderError::not_found(TYPE_NAME, stream_id))
    }
}

impl Resource for DbaasLogsGraylogStream {
    type Config = GraylogStreamConfig;
    type State = GraylogStreamState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}/{}", state.service_name, state.stream_id)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let operation: LogsOperation = self
                .client
                .post(
                    &Self::streams_path(&config.service_name),
                    &StreamBody::from_config(config),
                )
                .await?;
            let finished = self
                .wait_operation(&config.service_name, &operation, timeout)
                .await?;
            let stream_id = finished
                .stream_id
                .ok_or_else(|| ProviderError::missing_field(TYPE_NAME, "streamId"))?;
            self.read_existing(&config.service_name, &stream_id).await
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move {
            self.read_stream(&state.service_name, &state.stream_id)
                .await
        })
    }

    fn update<'a>(
        &'a self,
        state: &'a Self::State,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            if config.service_name != state.service_name {
                return Err(ProviderError::InvalidAttributes {
                    resource_type: TYPE_NAME.to_owned(),
                    message: String::from("service_name cannot change in place"),
                });
            }
            let operation: LogsOperation = self
                .client
                .put(
                    &Self::stream_path(&state.service_name, &state.stream_id),
                    &StreamBody::from_config(config),
                )
                .await?;
            self.wait_operation(&state.service_name, &operation, timeout)
                .await?;
            self.read_existing(&state.service_name, &state.stream_id)
                .await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::stream_path(&state.service_name, &state.stream_id);
            let Some(operation) = found(self.client.delete::<LogsOperation>(&path).await)? else {
                return Ok(());
            };
            self.wait_operation(&state.service_name, &operation, timeout)
                .await?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, stream_id] =
                parse_import_id(import_id, ["service_name", "stream_id"])?;
            self.read_stream(service_name, stream_id)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
