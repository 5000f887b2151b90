//! `ovh_ip_reverse`: reverse DNS records of IPs in an OVHcloud block.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{OvhClient, escape};
use crate::provider::{ProviderError, ProviderFuture, Resource, split_import_id};

use super::{found, ignore_not_found};

const TYPE_NAME: &str = "ovh_ip_reverse";

/// Arguments of `ovh_ip_reverse`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IpReverseConfig {
    /// IP block in CIDR notation, for example `192.0.2.0/28`.
    pub ip_block: String,
    /// Address inside the block. Defaults to the block address for single
    /// addresses (`/32` and `/128`).
    #[serde(default)]
    pub ip: Option<String>,
    /// Reverse host name; a trailing dot is added when missing.
    pub reverse: String,
}

/// State of `ovh_ip_reverse`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct IpReverseState {
    /// IP block in CIDR notation.
    pub ip_block: String,
    /// Address carrying the reverse record.
    pub ip: String,
    /// Fully qualified reverse host name.
    pub reverse: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReverseRecord {
    ip_reverse: String,
    reverse: String,
}

/// Parsed CIDR block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct IpBlock {
    network: IpAddr,
    prefix: u8,
}

impl IpBlock {
    fn parse(block: &str) -> Result<Self, String> {
        let (address, prefix) = block
            .split_once('/')
            .map_or((block, None), |(address, prefix)| (address, Some(prefix)));
        let network: IpAddr = address
            .parse()
            .map_err(|err| format!("invalid address in {block:?}: {err}"))?;
        let max_prefix = if network.is_ipv4() { 32 } else { 128 };
        let parsed_prefix = match prefix {
            Some(raw) => raw
                .parse::<u8>()
                .map_err(|err| format!("invalid prefix in {block:?}: {err}"))?,
            None => max_prefix,
        };
        if parsed_prefix > max_prefix {
            return Err(format!("prefix of {block:?} exceeds {max_prefix}"));
        }
        Ok(Self {
            network,
            prefix: parsed_prefix,
        })
    }

    const fn is_single_address(self) -> bool {
        match self.network {
            IpAddr::V4(_) => self.prefix == 32,
            IpAddr::V6(_) => self.prefix == 128,
        }
    }

    fn contains(self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(network), IpAddr::V4(candidate)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix))
                    .unwrap_or(0);
                u32::from(network) & mask == u32::from(candidate) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(candidate)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix))
                    .unwrap_or(0);
                u128::from(network) & mask == u128::from(candidate) & mask
            }
            _ => false,
        }
    }
}

fn fully_qualified(reverse: &str) -> String {
    let trimmed = reverse.trim();
    if trimmed.ends_with('.') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}.")
    }
}

fn invalid(message: String) -> ProviderError {
    ProviderError::InvalidAttributes {
        resource_type: TYPE_NAME.to_owned(),
        message,
    }
}

/// Resolves the address to configure, checking it lies inside the block.
fn resolve_ip(config: &IpReverseConfig) -> Result<String, ProviderError> {
    let block = IpBlock::parse(&config.ip_block).map_err(invalid)?;
    let Some(raw) = config.ip.as_deref() else {
        if block.is_single_address() {
            return Ok(block.network.to_string());
        }
        return Err(invalid(format!(
            "ip is required when {} holds more than one address",
            config.ip_block
        )));
    };
    let ip: IpAddr = raw
        .parse()
        .map_err(|err| invalid(format!("invalid ip {raw:?}: {err}")))?;
    if !block.contains(ip) {
        return Err(invalid(format!(
            "ip {ip} is not part of block {}",
            config.ip_block
        )));
    }
    Ok(ip.to_string())
}

/// Handler for `ovh_ip_reverse`. Reverse records apply synchronously.
#[derive(Clone, Debug)]
pub struct IpReverse {
    client: OvhClient,
}

impl IpReverse {
    /// Creates the handler.
    #[must_use]
    pub const fn new(client: OvhClient) -> Self {
        Self { client }
    }

    fn record_path(ip_block: &str, ip: &str) -> String {
        format!("/ip/{}/reverse/{}", escape(ip_block), escape(ip))
    }

    async fn read_record(
        &self,
        ip_block: &str,
        ip: &str,
    ) -> Result<Option<IpReverseState>, ProviderError> {
        let path = Self::record_path(ip_block, ip);
        Ok(found(self.client.get::<ReverseRecord>(&path).await)?.map(|record| {
            IpReverseState {
                ip_block: ip_block.to_owned(),
                ip: record.ip_reverse,
                reverse: record.reverse,
            }
        }))
    }
}

impl Resource for IpReverse {
    type Config = IpReverseConfig;
    type State = IpReverseState;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn resource_id(&self, state: &Self::State) -> String {
        format!("{}|{}", state.ip_block, state.ip)
    }

    fn create<'a>(
        &'a self,
        config: &'a Self::Config,
        _timeout: Duration,
    ) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let ip = resolve_ip(config)?;
            let path = format!("/ip/{}/reverse", escape(&config.ip_block));
            let record: ReverseRecord = self
                .client
                .post(
                    &path,
                    &ReverseRecord {
                        ip_reverse: ip,
                        reverse: fully_qualified(&config.reverse),
                    },
                )
                .await?;
            Ok(IpReverseState {
                ip_block: config.ip_block.clone(),
                ip: record.ip_reverse,
                reverse: record.reverse,
            })
        })
    }

    fn read<'a>(&'a self, state: &'a Self::State) -> ProviderFuture<'a, Option<Self::State>> {
        Box::pin(async move { self.read_record(&state.ip_block, &state.ip).await })
    }

    fn delete<'a>(&'a self, state: &'a Self::State, _timeout: Duration) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let path = Self::record_path(&state.ip_block, &state.ip);
            ignore_not_found(self.client.delete_unit(&path).await)?;
            Ok(())
        })
    }

    fn import<'a>(&'a self, import_id: &'a str) -> ProviderFuture<'a, Self::State> {
        Box::pin(async move {
            let [ip_block, ip] = split_import_id(import_id, '|', ["ip_block", "ip"])?;
            self.read_record(ip_block, ip)
                .await?
                .ok_or_else(|| ProviderError::not_found(TYPE_NAME, import_id))
        })
    }
}
