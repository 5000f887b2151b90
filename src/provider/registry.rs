//! Registry that addresses resources and data sources by type name.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::{DataSource, ProviderError, ProviderFuture, Resource, Timeouts};
use crate::client::OvhClient;
use crate::config::OvhConfig;
use crate::waiter::Cadence;

/// Resource state as persisted by the caller: the durable id plus a
/// string-keyed attribute map.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResourceState {
    /// Composite import id of the object.
    pub id: String,
    /// Typed state rendered as JSON attributes.
    pub attributes: Map<String, Value>,
}

impl ResourceState {
    /// Returns a single attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

trait ErasedResource: Send + Sync {
    fn default_timeouts(&self) -> Timeouts;
    fn create(&self, attributes: Value, timeout: Duration) -> ProviderFuture<'_, ResourceState>;
    fn read<'a>(&'a self, state: &'a ResourceState) -> ProviderFuture<'a, Option<ResourceState>>;
    fn update<'a>(
        &'a self,
        state: &'a ResourceState,
        attributes: Value,
        timeout: Duration,
    ) -> ProviderFuture<'a, ResourceState>;
    fn delete<'a>(&'a self, state: &'a ResourceState, timeout: Duration)
    -> ProviderFuture<'a, ()>;
    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, ResourceState>;
}

struct Erased<R>(R);

impl<R: Resource> Erased<R> {
    fn typed_state(&self, state: &ResourceState) -> Result<R::State, ProviderError> {
        from_attributes(self.0.type_name(), Value::Object(state.attributes.clone()))
    }

    fn erase_state(&self, state: &R::State) -> Result<ResourceState, ProviderError> {
        Ok(ResourceState {
            id: self.0.resource_id(state),
            attributes: to_attributes(self.0.type_name(), state)?,
        })
    }
}

impl<R: Resource> ErasedResource for Erased<R> {
    fn default_timeouts(&self) -> Timeouts {
        self.0.default_timeouts()
    }

    fn create(&self, attributes: Value, timeout: Duration) -> ProviderFuture<'_, ResourceState> {
        Box::pin(async move {
            let config: R::Config = from_attributes(self.0.type_name(), attributes)?;
            let state = self.0.create(&config, timeout).await?;
            self.erase_state(&state)
        })
    }

    fn read<'a>(&'a self, state: &'a ResourceState) -> ProviderFuture<'a, Option<ResourceState>> {
        Box::pin(async move {
            let typed = self.typed_state(state)?;
            let refreshed = self.0.read(&typed).await?;
            refreshed
                .map(|current| self.erase_state(&current))
                .transpose()
        })
    }

    fn update<'a>(
        &'a self,
        state: &'a ResourceState,
        attributes: Value,
        timeout: Duration,
    ) -> ProviderFuture<'a, ResourceState> {
        Box::pin(async move {
            let typed = self.typed_state(state)?;
            let config: R::Config = from_attributes(self.0.type_name(), attributes)?;
            let updated = self.0.update(&typed, &config, timeout).await?;
            self.erase_state(&updated)
        })
    }

    fn delete<'a>(
        &'a self,
        state: &'a ResourceState,
        timeout: Duration,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let typed = self.typed_state(state)?;
            self.0.delete(&typed, timeout).await
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, ResourceState> {
        Box::pin(async move {
            let state = self.0.import(import_id).await?;
            self.erase_state(&state)
        })
    }
}

trait ErasedDataSource: Send + Sync {
    fn lookup(&self, query: Value) -> ProviderFuture<'_, Map<String, Value>>;
}

struct ErasedLookup<D>(D);

impl<D: DataSource> ErasedDataSource for ErasedLookup<D> {
    fn lookup(&self, query: Value) -> ProviderFuture<'_, Map<String, Value>> {
        Box::pin(async move {
            let typed: D::Query = from_attributes(self.0.type_name(), query)?;
            let output = self.0.lookup(&typed).await?;
            to_attributes(self.0.type_name(), &output)
        })
    }
}

fn from_attributes<T>(resource_type: &str, attributes: Value) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(attributes).map_err(|err| ProviderError::InvalidAttributes {
        resource_type: resource_type.to_owned(),
        message: err.to_string(),
    })
}

fn to_attributes<T>(resource_type: &str, value: &T) -> Result<Map<String, Value>, ProviderError>
where
    T: Serialize + ?Sized,
{
    let invalid = |message: String| ProviderError::InvalidAttributes {
        resource_type: resource_type.to_owned(),
        message,
    };
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(invalid(format!("expected an object, got {other}"))),
        Err(err) => Err(invalid(err.to_string())),
    }
}

/// Registry of every resource and data source, sharing one API client.
pub struct Provider {
    client: OvhClient,
    resources: BTreeMap<&'static str, Box<dyn ErasedResource>>,
    data_sources: BTreeMap<&'static str, Box<dyn ErasedDataSource>>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("client", &self.client)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Validates `config`, builds the shared client, and registers every
    /// built-in resource and data source.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] for incomplete configuration and
    /// [`ProviderError::Client`] when the HTTP client cannot be built.
    pub fn new(config: &OvhConfig) -> Result<Self, ProviderError> {
        config.validate()?;
        let client = OvhClient::from_config(config)?;
        Ok(Self::with_client(client))
    }

    /// Registers the built-in handlers around an existing client.
    #[must_use]
    pub fn with_client(client: OvhClient) -> Self {
        Self::builtin(client, None)
    }

    /// Like [`Self::with_client`], overriding every handler's poll cadence.
    #[must_use]
    pub fn with_cadence(client: OvhClient, cadence: Cadence) -> Self {
        Self::builtin(client, Some(cadence))
    }

    /// Creates a registry with no handlers.
    #[must_use]
    pub const fn empty(client: OvhClient) -> Self {
        Self {
            client,
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        }
    }

    fn builtin(client: OvhClient, cadence: Option<Cadence>) -> Self {
        let mut provider = Self::empty(client.clone());
        crate::resources::register_builtin(&mut provider, &client, cadence);
        crate::data_sources::register_builtin(&mut provider, &client);
        provider
    }

    /// Registers a resource under its type name, replacing any previous one.
    pub fn register<R>(&mut self, resource: R)
    where
        R: Resource + 'static,
    {
        self.resources
            .insert(resource.type_name(), Box::new(Erased(resource)));
    }

    /// Registers a data source under its type name.
    pub fn register_data_source<D>(&mut self, data_source: D)
    where
        D: DataSource + 'static,
    {
        self.data_sources
            .insert(data_source.type_name(), Box::new(ErasedLookup(data_source)));
    }

    /// Returns the shared API client.
    #[must_use]
    pub const fn client(&self) -> &OvhClient {
        &self.client
    }

    /// Lists registered resource type names in sorted order.
    #[must_use]
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// Lists registered data-source type names in sorted order.
    #[must_use]
    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    /// Returns the default wait budgets of a resource type.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownResourceType`] for unregistered types.
    pub fn default_timeouts(&self, resource_type: &str) -> Result<Timeouts, ProviderError> {
        Ok(self.resource(resource_type)?.default_timeouts())
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn ErasedResource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|resource| &**resource)
            .ok_or_else(|| ProviderError::UnknownResourceType(resource_type.to_owned()))
    }

    /// Creates a resource from JSON attributes.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the type is unknown, the attributes do
    /// not match its schema, or the API calls or waits fail.
    pub async fn create(
        &self,
        resource_type: &str,
        attributes: Value,
        timeout: Option<Duration>,
    ) -> Result<ResourceState, ProviderError> {
        let resource = self.resource(resource_type)?;
        let budget = timeout.unwrap_or_else(|| resource.default_timeouts().create);
        let state = resource.create(attributes, budget).await?;
        info!(resource_type, id = %state.id, "created resource");
        Ok(state)
    }

    /// Refreshes persisted state. `None` means the object is gone and should
    /// be dropped from state.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] for unknown types, malformed state, or API
    /// failures other than `404`.
    pub async fn read(
        &self,
        resource_type: &str,
        state: &ResourceState,
    ) -> Result<Option<ResourceState>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let refreshed = resource.read(state).await?;
        if refreshed.is_none() {
            info!(resource_type, id = %state.id, "resource no longer exists");
        }
        Ok(refreshed)
    }

    /// Applies changed attributes in place.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UpdateNotSupported`] for replace-only types,
    /// and other [`ProviderError`] variants on failure.
    pub async fn update(
        &self,
        resource_type: &str,
        state: &ResourceState,
        attributes: Value,
        timeout: Option<Duration>,
    ) -> Result<ResourceState, ProviderError> {
        let resource = self.resource(resource_type)?;
        let budget = timeout.unwrap_or_else(|| resource.default_timeouts().update);
        let updated = resource.update(state, attributes, budget).await?;
        info!(resource_type, id = %updated.id, "updated resource");
        Ok(updated)
    }

    /// Deletes a resource and waits until it is gone.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API or wait failures.
    pub async fn delete(
        &self,
        resource_type: &str,
        state: &ResourceState,
        timeout: Option<Duration>,
    ) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let budget = timeout.unwrap_or_else(|| resource.default_timeouts().delete);
        resource.delete(state, budget).await?;
        info!(resource_type, id = %state.id, "deleted resource");
        Ok(())
    }

    /// Reads an existing object by composite import id.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidImportId`] for malformed ids and
    /// [`ProviderError::NotFound`] when the object does not exist.
    pub async fn import(
        &self,
        resource_type: &str,
        import_id: &str,
    ) -> Result<ResourceState, ProviderError> {
        self.resource(resource_type)?.import(import_id).await
    }

    /// Runs a data-source lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownDataSource`] for unregistered names and
    /// other [`ProviderError`] variants on failure.
    pub async fn lookup(
        &self,
        data_source: &str,
        query: Value,
    ) -> Result<Map<String, Value>, ProviderError> {
        let source = self
            .data_sources
            .get(data_source)
            .ok_or_else(|| ProviderError::UnknownDataSource(data_source.to_owned()))?;
        source.lookup(query).await
    }
}
