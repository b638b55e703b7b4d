//! DNS provider client and the records it manages.

mod netlify;


pub use netlify::NetlifyClient;

use crate::config::Config;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::Deserialize;

/// TTL used for every record ipsync creates.
pub const DEFAULT_TTL: u32 = 3600;

/// A provider zone. Other metadata in the listing is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsZone {
    pub id: String,
    pub name: String,
}

/// A DNS record as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub hostname: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    pub value: String,
    #[serde(default)]
    pub ttl: u32,
}

/// Operations the reconciler needs from a DNS provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Find the zone owning `hostname` by its registrable domain.
    async fn find_zone(&self, hostname: &str) -> Result<DnsZone>;

    /// First A record in the zone whose hostname matches exactly.
    async fn find_record(&self, zone_id: &str, hostname: &str) -> Result<DnsRecord>;

    /// Delete a record. Only HTTP 204 counts as success.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()>;

    /// Create an A record with the default TTL. Only HTTP 201 counts as success.
    async fn create_a_record(&self, zone_id: &str, hostname: &str, ip: &str) -> Result<()>;
}

/// Create the provider client from configuration.
pub fn create_provider(config: &Config) -> Result<Box<dyn DnsProvider>> {
    Ok(Box::new(NetlifyClient::with_base_url(
        config.token.clone(),
        config.api_url.clone(),
        config.request_timeout(),
    )?))
}

/// Last two dot-separated labels of `hostname`.
pub fn registrable_domain(hostname: &str) -> Result<String> {
    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.len() < 2 || labels[labels.len() - 2..].iter().any(|l| l.is_empty()) {
        return Err(SyncError::InvalidHostname(hostname.to_string()));
    }

    Ok(labels[labels.len() - 2..].join("."))
}
