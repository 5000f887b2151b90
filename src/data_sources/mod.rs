//! Read-only data sources.

use serde::{Deserialize, Serialize};

use crate::client::OvhClient;
use crate::provider::{DataSource, Provider, ProviderError, ProviderFuture};
use crate::resources::{CloudProjectDatabase, DatabaseState};

/// Type names of every built-in data source, sorted.
pub const DATA_SOURCE_TYPES: [&str; 3] = ["ovh_cloud_project_database", "ovh_me", "ovh_vracks"];

/// Registers every built-in data source.
pub(crate) fn register_builtin(provider: &mut Provider, client: &OvhClient) {
    provider.register_data_source(CloudProjectDatabaseLookup::new(client.clone()));
    provider.register_data_source(Me::new(client.clone()));
    provider.register_data_source(Vracks::new(client.clone()));
}

/// Query of the `ovh_cloud_project_database` data source.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseQuery {
    /// Public Cloud project id.
    pub service_name: String,
    /// Database engine.
    pub engine: String,
    /// Cluster id.
    pub id: String,
}

/// `ovh_cloud_project_database` data source.
#[derive(Clone, Debug)]
pub struct CloudProjectDatabaseLookup {
    clusters: CloudProjectDatabase,
}

impl CloudProjectDatabaseLookup {
    /// Creates the data source.
    #[must_use]
    pub const fn new(client: OvhClient) -> Self {
        Self {
            clusters: CloudProjectDatabase::new(client, CloudProjectDatabase::CADENCE),
        }
    }
}

impl DataSource for CloudProjectDatabaseLookup {
    type Query = DatabaseQuery;
    type Output = DatabaseState;

    fn type_name(&self) -> &'static str {
        "ovh_cloud_project_database"
    }

    fn lookup<'a>(&'a self, query: &'a Self::Query) -> ProviderFuture<'a, Self::Output> {
        Box::pin(async move {
            self.clusters
                .read_cluster(&query.service_name, &query.engine, &query.id)
                .await?
                .ok_or_else(|| {
                    ProviderError::not_found(
                        self.type_name(),
                        &format!("{}/{}/{}", query.service_name, query.engine, query.id),
                    )
                })
        })
    }
}

/// Query of the `ovh_vracks` data source; it takes no arguments.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NoQuery {}

/// Output of the `ovh_vracks` data source.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VrackList {
    /// Vrack service names visible to the account, sorted.
    pub result: Vec<String>,
}

/// `ovh_vracks` data source.
#[derive(Clone, Debug)]
pub struct Vracks {
    client: OvhClient,
}

impl Vracks {
    /// Creates the data source.
    #[must_use]
    pub const fn new(client: OvhClient) -> Self {
        Self { client }
    }
}

impl DataSource for Vracks {
    type Query = NoQuery;
    type Output = VrackList;

    fn type_name(&self) -> &'static str {
        "ovh_vracks"
    }

    fn lookup<'a>(&'a self, _query: &'a Self::Query) -> ProviderFuture<'a, Self::Output> {
        Box::pin(async move {
            let mut result: Vec<String> = self.client.get("/vrack").await?;
            result.sort_unstable();
            Ok(VrackList { result })
        })
    }
}

/// Output of the `ovh_me` data source.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Account {
    /// Account identifier, for example `xx1111-ovh`.
    pub nichandle: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Country code.
    #[serde(default)]
    pub country: String,
    /// Billing currency.
    #[serde(default)]
    pub currency: Currency,
    /// Account state, such as `complete`.
    #[serde(default)]
    pub state: String,
}

/// Billing currency of an account.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Currency {
    /// ISO 4217 code.
    #[serde(default)]
    pub code: String,
    /// Display symbol.
    #[serde(default)]
    pub symbol: String,
}

/// `ovh_me` data source: the account owning the credentials.
#[derive(Clone, Debug)]
pub struct Me {
    client: OvhClient,
}

impl Me {
    /// Creates the data source.
    #[must_use]
    pub const fn new(client: OvhClient) -> Self {
        Self { client }
    }
}

impl DataSource for Me {
    type Query = NoQuery;
    type Output = Account;

    fn type_name(&self) -> &'static str {
        "ovh_me"
    }

    fn lookup<'a>(&'a self, _query: &'a Self::Query) -> ProviderFuture<'a, Self::Output> {
        Box::pin(async move { Ok(self.client.get("/me").await?) })
    }
}
