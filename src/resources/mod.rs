//! Resource handlers, one module per Terraform resource type.
//!
//! Each handler owns a clone of the shared [`OvhClient`] and, where the API
//! is asynchronous, a [`Cadence`] for its waits. Tests substitute a fast
//! cadence through [`Provider::with_cadence`].

mod cloud_project_database;
mod cloud_project_database_user;
mod container_registry;
mod dbaas_logs_graylog_stream;
mod dedicated_server_reboot_task;
mod iam_policy;
mod ip_reverse;
mod vrack_cloud_project;

pub use cloud_project_database::{
    CloudProjectDatabase, DatabaseConfig, DatabaseEndpoint, DatabaseNode, DatabaseState,
};
pub use cloud_project_database_user::{
    CloudProjectDatabaseUser, DatabaseUserConfig, DatabaseUserState,
};
pub use container_registry::{ContainerRegistry, RegistryConfig, RegistryState};
pub use dbaas_logs_graylog_stream::{
    DbaasLogsGraylogStream, GraylogStreamConfig, GraylogStreamState,
};
pub use dedicated_server_reboot_task::{
    DedicatedServerRebootTask, RebootTaskConfig, RebootTaskState,
};
pub use iam_policy::{IamPolicy, IamPolicyConfig, IamPolicyState};
pub use ip_reverse::{IpReverse, IpReverseConfig, IpReverseState};
pub use vrack_cloud_project::{VrackCloudProject, VrackCloudProjectAttachment};

use crate::client::{ClientError, OvhClient};
use crate::provider::Provider;
use crate::waiter::Cadence;

/// Type names of every built-in resource, sorted.
pub const RESOURCE_TYPES: [&str; 8] = [
    "ovh_cloud_project_containerregistry",
    "ovh_cloud_project_database",
    "ovh_cloud_project_database_user",
    "ovh_dbaas_logs_output_graylog_stream",
    "ovh_dedicated_server_reboot_task",
    "ovh_iam_policy",
    "ovh_ip_reverse",
    "ovh_vrack_cloudproject",
];

/// Registers every built-in resource. `cadence` overrides each handler's
/// live polling cadence when set.
pub(crate) fn register_builtin(
    provider: &mut Provider,
    client: &OvhClient,
    cadence: Option<Cadence>,
) {
    provider.register(CloudProjectDatabase::new(
        client.clone(),
        cadence.unwrap_or(CloudProjectDatabase::CADENCE),
    ));
    provider.register(CloudProjectDatabaseUser::new(
        client.clone(),
        cadence.unwrap_or(CloudProjectDatabaseUser::CADENCE),
    ));
    provider.register(ContainerRegistry::new(
        client.clone(),
        cadence.unwrap_or(ContainerRegistry::CADENCE),
    ));
    provider.register(DbaasLogsGraylogStream::new(
        client.clone(),
        cadence.unwrap_or(DbaasLogsGraylogStream::CADENCE),
    ));
    provider.register(DedicatedServerRebootTask::new(
        client.clone(),
        cadence.unwrap_or(DedicatedServerRebootTask::CADENCE),
    ));
    provider.register(IamPolicy::new(client.clone()));
    provider.register(IpReverse::new(client.clone()));
    provider.register(VrackCloudProjectAttachment::new(
        client.clone(),
        cadence.unwrap_or(VrackCloudProjectAttachment::CADENCE),
    ));
}

/// Maps a `404` onto `None`, leaving every other outcome untouched.
pub(crate) fn found<T>(result: Result<T, ClientError>) -> Result<Option<T>, ClientError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Treats a `404` on delete as already deleted.
pub(crate) fn ignore_not_found(result: Result<(), ClientError>) -> Result<(), ClientError> {
    found(result).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiErrorBody, ApiFailure};
    use crate::test_support::client_for;

    fn api_error(status: u16) -> ClientError {
        ClientError::Api(Box::new(ApiFailure {
            status,
            method: String::from("GET"),
            path: String::from("/vrack"),
            params: None,
            body: ApiErrorBody::default(),
            query_id: None,
        }))
    }

    #[test]
    fn found_maps_not_found_to_none() {
        assert!(matches!(found::<u8>(Err(api_error(404))), Ok(None)));
        assert!(matches!(found(Ok(7_u8)), Ok(Some(7))));
        assert!(matches!(found::<u8>(Err(api_error(500))), Err(_)));
    }

    #[test]
    fn ignore_not_found_keeps_other_errors() {
        assert!(ignore_not_found(Err(api_error(404))).is_ok());
        assert!(ignore_not_found(Err(api_error(403))).is_err());
    }

    #[test]
    fn registers_every_builtin_type() {
        let client = client_for("http://127.0.0.1:9").expect("client should build");
        let provider = Provider::with_client(client);
        assert_eq!(provider.resource_types(), RESOURCE_TYPES.to_vec());
    }
}
