//! Errors surfaced by the provider registry and resource handlers.

use std::error::Error as StdError;

use thiserror::Error;

use crate::client::ClientError;
use crate::config::ConfigError;
use crate::waiter::WaitError;

/// Errors raised while driving a resource or data source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider configuration is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An API call failed outside of a wait loop.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Waiting on an asynchronous operation failed or timed out.
    #[error("{resource_type} {id}: {message}")]
    Wait {
        /// Terraform type name of the resource.
        resource_type: String,
        /// Identifier of the object being waited on.
        id: String,
        /// Rendered waiter error, including the time waited on timeouts.
        message: String,
    },
    /// An import id does not match the resource's composite key format.
    #[error("invalid import id {id:?}: expected format {expected}")]
    InvalidImportId {
        /// Import id supplied by the user.
        id: String,
        /// Expected format, for example `service_name/engine/id`.
        expected: String,
    },
    /// Attributes could not be mapped onto the resource's typed schema.
    #[error("invalid attributes for {resource_type}: {message}")]
    InvalidAttributes {
        /// Terraform type name of the resource or data source.
        resource_type: String,
        /// Serializer message.
        message: String,
    },
    /// The object does not exist remotely.
    #[error("{resource_type} {id} not found")]
    NotFound {
        /// Terraform type name of the resource.
        resource_type: String,
        /// Identifier that was looked up.
        id: String,
    },
    /// The resource can only be replaced, never updated in place.
    #[error("{resource_type} does not support in-place updates")]
    UpdateNotSupported {
        /// Terraform type name of the resource.
        resource_type: String,
    },
    /// No resource is registered under the requested type name.
    #[error("unknown resource type {0}")]
    UnknownResourceType(String),
    /// No data source is registered under the requested type name.
    #[error("unknown data source {0}")]
    UnknownDataSource(String),
    /// The API response lacked a field the handler depends on.
    #[error("{resource_type}: API response is missing {field}")]
    MissingField {
        /// Terraform type name of the resource.
        resource_type: String,
        /// Name of the missing field.
        field: String,
    },
}

impl ProviderError {
    /// Wraps a waiter failure with the resource identity.
    pub fn wait<E>(resource_type: &str, id: &str, err: &WaitError<E>) -> Self
    where
        E: StdError + 'static,
    {
        Self::Wait {
            resource_type: resource_type.to_owned(),
            id: id.to_owned(),
            message: err.to_string(),
        }
    }

    /// Shorthand for [`ProviderError::NotFound`].
    #[must_use]
    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self::NotFound {
            resource_type: resource_type.to_owned(),
            id: id.to_owned(),
        }
    }

    /// Shorthand for [`ProviderError::MissingField`].
    #[must_use]
    pub fn missing_field(resource_type: &str, field: &str) -> Self {
        Self::MissingField {
            resource_type: resource_type.to_owned(),
            field: field.to_owned(),
        }
    }
}
