//! Netlify DNS provider.

use super::{registrable_domain, DnsProvider, DnsRecord, DnsZone, DEFAULT_TTL};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Netlify DNS API client.
pub struct NetlifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    hostname: &'a str,
    value: &'a str,
    ttl: u32,
}

impl NetlifyClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn with_base_url(token: String, base_url: String, timeout: Duration) -> Result<Self> {
        // The Netlify edge has been seen serving chains that fail strict
        // validation. Scoped to this client only.
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
    }

    /// GET `path` and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(SyncError::UpstreamStatus {
                service: format!("netlify {}", path),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SyncError::Protocol(format!("Unexpected response from {}: {}", path, e)))
    }

    async fn list_zones(&self) -> Result<Vec<DnsZone>> {
        self.get_json("/dns_zones").await
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.get_json(&format!("/dns_zones/{}/dns_records", zone_id))
            .await
    }
}

impl fmt::Debug for NetlifyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetlifyClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DnsProvider for NetlifyClient {
    async fn find_zone(&self, hostname: &str) -> Result<DnsZone> {
        let domain = registrable_domain(hostname)?;
        let zones = self.list_zones().await?;

        let mut matching = zones.into_iter().filter(|z| z.name == domain);
        let zone = matching
            .next()
            .ok_or_else(|| SyncError::ZoneNotFound(domain.clone()))?;

        if matching.next().is_some() {
            return Err(SyncError::Config(format!(
                "More than one DNS zone named {}",
                domain
            )));
        }

        tracing::debug!(zone_id = %zone.id, zone = %zone.name, "Matched DNS zone");
        Ok(zone)
    }

    async fn find_record(&self, zone_id: &str, hostname: &str) -> Result<DnsRecord> {
        let records = self.list_records(zone_id).await?;

        // Only A records are managed; other types sharing the name are left alone.
        let mut matching = records
            .into_iter()
            .filter(|r| r.hostname == hostname && r.record_type == "A");
        let record = matching.next().ok_or_else(|| SyncError::RecordNotFound {
            zone_id: zone_id.to_string(),
            hostname: hostname.to_string(),
        })?;

        let extra = matching.count();
        if extra > 0 {
            tracing::warn!(
                hostname,
                zone_id,
                extra,
                record_id = %record.id,
                "Several A records match hostname, using the first listed"
            );
        }

        Ok(record)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let path = format!("/dns_zones/{}/dns_records/{}", zone_id, record_id);
        let response = self.request(Method::DELETE, &path).send().await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(SyncError::DeleteFailed {
                record_id: record_id.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }

    async fn create_a_record(&self, zone_id: &str, hostname: &str, ip: &str) -> Result<()> {
        let path = format!("/dns_zones/{}/dns_records", zone_id);
        let request = CreateRecordRequest {
            record_type: "A",
            hostname,
            value: ip,
            ttl: DEFAULT_TTL,
        };

        let response = self
            .request(Method::POST, &path)
            .json(&request)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(SyncError::CreateFailed {
                hostname: hostname.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
