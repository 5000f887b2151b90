//! Core library for the OVHcloud provider.
//!
//! The crate exposes a signed REST client for the OVHcloud API, a generic
//! waiter that polls asynchronous operations until they settle, and a
//! registry of resource and data-source handlers addressed by their
//! Terraform type names (configure → create → wait → read back).

pub mod client;
pub mod config;
pub mod data_sources;
pub mod provider;
pub mod resources;
pub mod test_support;
pub mod waiter;

pub use client::{ClientError, Credentials, OvhClient};
pub use config::{ConfigError, OvhConfig};
pub use data_sources::DATA_SOURCE_TYPES;
pub use provider::{
    DataSource, Provider, ProviderError, ProviderFuture, Resource, ResourceState, Timeouts,
};
pub use resources::RESOURCE_TYPES;
pub use waiter::{Cadence, Observation, RefreshError, WaitError, Waiter};
