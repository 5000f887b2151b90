//! `ovh_cloud_project_database`: managed database clusters in a Public Cloud
//! project.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, parse_import_id};
use crate::waiter::{Cadence, Observation, RefreshError, Waiter, observe};

use super::{found, ignore_not_found};

const TYPE_NAME: &str = "ovh_cloud_project_database";
const PENDING: [&str; 3] = ["PENDING", "CREATING", "UPDATING"];
const DELETE_PENDING: [&str; 5] = ["PENDING", "CREATING", "UPDATING", "READY", "DELETING"];
const FAILED: [&str; 2] = ["ERROR", "ERROR_INCONSISTENT_SPEC"];
const READY: &str = "READY";

/// Node placement of a database cluster.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseNode {
    /// Public Cloud region, for example `GRA`.
    pub region: String,
    /// Private network id, when the node joins a vrack network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    /// Private subnet id, required with `network_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
}

/// Arguments of `ovh_cloud_project_database`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Public Cloud project id.
    pub service_name: String,
    /// Database engine, for example `postgresql` or `mongodb`.
    pub engine: String,
    /// Free-form cluster description.
    #[serde(default)]
    pub description: Option<String>,
    /// Commercial plan, for example `essential` or `business`.
    pub plan: String,
    /// Engine version.
    pub version: String,
    /// Node flavor, for example `db1-4`.
    pub flavor: String,
    /// Node placements; their count is the cluster size.
    pub nodes: Vec<DatabaseNode>,
    /// Disk size in GB, when the flavor allows it.
    #[serde(default)]
    pub disk_size: Option<u64>,
}

/// Connection endpoint exposed by a cluster.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEndpoint {
    /// Component served by the endpoint, for example `postgresql`.
    pub component: String,
    /// Host name.
    #[serde(default)]
    pub domain: String,
    /// TCP port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether TLS is required.
    #[serde(default)]
    pub ssl: bool,
    /// Connection URI without credentials.
    #[serde(default)]
    pub uri: Option<String>,
}

/// State of `ovh_cloud_project_database`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct DatabaseState {
    /// Public Cloud project id.
    pub service_name: String,
    /// Database engine.
    pub engine: String,
    /// Cluster id.
    pub id: String,
    /// Cluster description.
    pub description: String,
    /// Commercial plan.
    pub plan: String,
    /// Engine version.
    pub version: String,
    /// Node flavor.
    pub flavor: String,
    /// Node placements.
    pub nodes: Vec<DatabaseNode>,
    /// Disk size in GB.
    pub disk_size: Option<u64>,
    /// Cluster status as reported by the API.
    pub status: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Connection endpoints.
    pub endpoints: Vec<DatabaseEndpoint>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterResponse {
    id: String,
    status: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    plan: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    disk: Option<DiskResponse>,
    #[serde(default)]
    endpoints: Vec<DatabaseEndpoint>,
}

#[derive(Clone, Debug, Deserialize)]
struct DiskResponse {
    size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeResponse {
    flavor: String,
    region: String,
    #[serde(default)]
    network_id: Option<String>,
    #[serde(default)]
    subnet_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateClusterBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    plan: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    nodes_pattern: Option<NodesPattern<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nodes_list: Option<Vec<NodeSpec<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    disk: Option<DiskSpec>,
}

#[derive(Debug, Serialize)]
struct NodesPattern<'a> {
    flavor: &'a str,
    number: usize,
    region: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeSpec<'a> {
    flavor: &'a str,
    region: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnet_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DiskSpec {
    size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateClusterBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    plan: &'a str,
    version: &'a str,
    flavor: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    disk: Option<DiskSpec>,
}

impl<'a> CreateClusterBody<'a> {
    /// Uses the compact `nodesPattern` form when every node sits in the same
    /// region on the public network, and `nodesList` otherwise.
    fn from_config(config: &'a DatabaseConfig) -> Self {
        let uniform_public = config.nodes.first().filter(|first| {
            config.nodes.iter().all(|node| {
                node.region == first.region && node.network_id.is_none() && node.subnet_id.is_none()
            })
        });

        let (nodes_pattern, nodes_list) = match uniform_public {
            Some(first) => (
                Some(NodesPattern {
                    flavor: &config.flavor,
                    number: config.nodes.len(),
                    region: &first.region,
                }),
                None,
            ),
            None => (
                None,
                Some(
                    config
                        .nodes
                        .iter()
                        .map(|node| NodeSpec {
                            flavor: &config.flavor,
                            region: &node.region,
                            network_id: node.network_id.as_deref(),
                            subnet_id: node.subnet_id.as_deref(),
                        })
                        .collect(),
                ),
            ),
        };

        Self {
            description: config.description.as_deref(),
            plan: &config.plan,
            version: &config.version,
            nodes_pattern,
            nodes_list,
            disk: config.disk_size.map(|size| DiskSpec { size }),
        }
    }
}

/// Handler for `ovh_cloud_project_database`.
#[derive(Clone, Debug)]
pub struct CloudProjectDatabase {
    client: OvhClient,
    cadence: Cadence,
}

impl CloudProjectDatabase {
    /// Poll cadence used against the live API.
    pub const CADENCE: Cadence = Cadence::new(Duration::from_secs(30), Duration::from_secs(10));

    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient, cadence: Cadence) -> Self {
        Self { client, cadence }
    }

    pub(super) fn cluster_path(service_name: &str, engine: &str, cluster_id: &str) -> String {
        format!(
            "/cloud/project/{}/database/{}/{}",
            escape(service_name),
            escape(engine),
            escape(cluster_id)
        )
    }

    async fn poll_cluster(
        &self,
        path: &str,
    ) -> Result<Observation<ClusterResponse>, RefreshError<ClientError>> {
        observe(self.client.get(path).await, false, |cluster: &ClusterResponse| {
            cluster.status.clone()
        })
    }

    async fn wait_ready(
        &self,
        service_name: &str,
        engine: &str,
        cluster_id: &str,
        timeout: Duration,
    ) -> Result<ClusterResponse, ProviderError> {
        let path = Self::cluster_path(service_name, engine, cluster_id);
        let waiter = Waiter::new(format!("database cluster {cluster_id} to become ready"))
            .pending(PENDING)
            .target([READY])
            .failed(FAILED)
            .timeout(timeout)
            .cadence(self.cadence);
        let cluster = waiter
            .wait(|| self.poll_cluster(&path))
            .await
            .map_err(|err| ProviderError::wait(TYPE_NAME, cluster_id, &err))?;
        cluster.ok_or_else(|| ProviderError::not_found(TYPE_NAME, cluster_id))
    }

    async fn fetch_nodes(
        &self,
        service_name: &str,
        engine: &str,
        cluster_id: &str,
    ) -> Result<Vec<NodeResponse>, ClientError> {
        let base = format!("{}/node", Self::cluster_path(service_name, engine, cluster_id));
        let ids: Vec<String> = self.client.get(&base).await?;
        let mut nodes = Vec::with_capacity(ids.len());
        for node_id in ids {
            nodes.push(
                self.client
                    .get(&format!("{base}/{}", escape(&node_id)))
                    .await?,
            );
        }
        Ok(nodes)
    }

    async fn state_from(
        &self,
        service_name: &str,
        engine: &str,
        cluster: ClusterResponse,
    ) -> Result<DatabaseState, ProviderError> {
        let nodes = self.fetch_nodes(service_name, engine, &cluster.id).await?;
        let flavor = nodes
            .first()
            .map(|node| node.flavor.clone())
            .unwrap_or_default();
        Ok(DatabaseState {
            service_name: service_name.to_owned(),
            engine: engine.to_owned(),
            id: cluster.id,
            description: cluster.description,
            plan: cluster.plan,
            version: cluster.version,
            flavor,
            nodes: nodes
                .into_iter()
                .map(|node| DatabaseNode {
                    region: node.region,
                    network_id: node.network_id.filter(|value| !value.is_empty()),
                    subnet_id: node.subnet_id.filter(|value| !value.is_empty()),
                })
                .collect(),
            disk_size: cluster.disk.and_then(|disk| disk.size),
            status: cluster.status,
            created_at: cluster.created_at,
            endpoints: cluster.endpoints,
        })
    }

    pub(crate) async fn read_cluster(
        &self,
        service_name: &str,
        engine: &str,
        cluster_id: &str,
    ) -> Result<Option<DatabaseState>, ProviderError> {
        let path = Self::cluster_path(service_name, engine, cluster_id);
        let Some(cluster) = found(self.client.get::<ClusterResponse>(&path).await)? else {
            return Ok(None);
        };
        Ok(Some(self.state_from(service_name, engine, cluster).await?))
    }
}

impl Resource for CloudProjectDatabase {
    type Config = DatabaseConfig;
    type State = DatabaseState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}/{}/{}", state.service_name, state.engine, state.id)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            if config.nodes.is_empty() {
                return Err(ProviderError::InvalidAttributes {
                    resource_type: TYPE_NAME.to_owned(),
                    message: String::from("at least one node is required"),
                });
            }
            let path = format!(
                "/cloud/project/{}/database/{}",
                escape(&config.service_name),
                escape(&config.engine)
            );
            let created: ClusterResponse = self
                .client
                .post(&path, &CreateClusterBody::from_config(config))
                .await?;
            let cluster = self
                .wait_ready(&config.service_name, &config.engine, &created.id, timeout)
                .await?;
            self.state_from(&config.service_name, &config.engine, cluster)
                .await
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move {
            self.read_cluster(&state.service_name, &state.engine, &state.id)
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
            if config.service_name != state.service_name
                || config.engine != state.engine
                || config.nodes != state.nodes
            {
                return Err(ProviderError::InvalidAttributes {
                    resource_type: TYPE_NAME.to_owned(),
                    message: String::from(
                        "service_name, engine and nodes cannot change in place; recreate the cluster",
                    ),
                });
            }
            let path = Self::cluster_path(&state.service_name, &state.engine, &state.id);
            let body = UpdateClusterBody {
                description: config.description.as_deref(),
                plan: &config.plan,
                version: &config.version,
                flavor: &config.flavor,
                disk: config.disk_size.map(|size| DiskSpec { size }),
            };
            self.client.put_unit(&path, &body).await?;
            let cluster = self
                .wait_ready(&state.service_name, &state.engine, &state.id, timeout)
                .await?;
            self.state_from(&state.service_name, &state.engine, cluster)
                .await
        })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::cluster_path(&state.service_name, &state.engine, &state.id);
            ignore_not_found(self.client.delete_unit(&path).await)?;
            Waiter::new(format!("database cluster {} to be deleted", state.id))
                .pending(DELETE_PENDING)
                .failed(FAILED)
                .until_gone()
                .timeout(timeout)
                .cadence(self.cadence)
                .wait(|| self.poll_cluster(&path))
                .await
                .map_err(|err| ProviderError::wait(TYPE_NAME, &state.id, &err))?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [service_name, engine, cluster_id] =
                parse_import_id(import_id, ["service_name", "engine", "id"])?;
            self.read_cluster(service_name, engine, cluster_id)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
