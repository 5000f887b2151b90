//! Resource and data-source contract.
//!
//! A [`Resource`] maps the declarative create/read/update/delete lifecycle
//! onto OVHcloud API calls using typed configuration and state. The
//! [`Provider`] registry erases those types behind JSON attribute maps so
//! that callers can address every handler by its Terraform type name.

mod error;
mod import;
mod registry;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::waiter::DEFAULT_TIMEOUT;

pub use error::ProviderError;
pub use import::{parse_import_id, split_import_id};
pub use registry::{Provider, ResourceState};

/// Future returned by resource and data-source operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Per-operation wait budgets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeouts {
    /// Budget for create.
    pub create: Duration,
    /// Budget for read.
    pub read: Duration,
    /// Budget for update.
    pub update: Duration,
    /// Budget for delete.
    pub delete: Duration,
}

impl Timeouts {
    /// Uses the same budget for every operation.
    #[must_use]
    pub const fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            read: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_TIMEOUT)
    }
}

/// A managed OVHcloud object with a create/read/update/delete lifecycle.
pub trait Resource: Send + Sync {
    /// User-supplied arguments.
    type Config: DeserializeOwned + Send + Sync;
    /// Persisted state, including computed attributes.
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// Terraform type name, for example `ovh_cloud_project_database`.
    fn type_name(&self) -> &'static str;

    /// Wait budgets applied when the caller supplies none.
    fn default_timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Durable identifier stored in state. Equal to the import id.
    fn resource_id(&self, state: &Self::State) -> String;

    /// Creates the object and waits until it is usable.
    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State>;

    /// Refreshes state. `None` means the object no longer exists.
    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>>;

    /// Applies changed arguments in place. Replace-only resources keep the
    /// default, which refuses.
    fn update<'a>(
        &'a self,
        _state: &'a Self::State,
        _config: &'a Self::Config,
        _timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        let resource_type = self.type_name();
        Box::pin(async move {
            Err(ProviderError::UpdateNotSupported {
                resource_type: resource_type.to_owned(),
            })
        })
    }

    /// Deletes the object and waits until it is gone.
    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()>;

    /// Reads an existing object addressed by its composite import id.
    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State>;
}

/// A read-only lookup of OVHcloud data.
pub trait DataSource: Send + Sync {
    /// Lookup arguments.
    type Query: DeserializeOwned + Send + Sync;
    /// Lookup result.
    type Output: Serialize + Send + Sync;

    /// Terraform type name, for example `ovh_vracks`.
    fn type_name(&self) -> &'static str;

    /// Fetches the data described by `query`.
    fn lookup<'a>(&'a self, query: &'a Self::Query) -> ProviderFuture<'a, Self::Output>;
}
