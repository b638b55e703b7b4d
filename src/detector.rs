//! Public IP detection.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// The caller's public address as seen at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIpSnapshot {
    pub address: String,
    pub observed_at: DateTime<Utc>,
}

/// Source of the current public IPv4 address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Query once. No retries; the caller decides what a failure means.
    async fn resolve(&self) -> Result<PublicIpSnapshot>;
}

#[derive(Debug, Deserialize)]
struct EchoResponse {
    ip: String,
}

/// IP detector backed by a single IP-echo service.
pub struct IpDetector {
    client: reqwest::Client,
    service: String,
}

impl IpDetector {
    /// Create a detector for `service` with a bounded request timeout.
    pub fn new(service: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            service: service.into(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl IpResolver for IpDetector {
    async fn resolve(&self) -> Result<PublicIpSnapshot> {
        let response = self.client.get(&self.service).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::UpstreamStatus {
                service: self.service.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let address = parse_ipv4_body(&body)?;
        tracing::debug!(service = %self.service, %address, "Resolved public IP");

        Ok(PublicIpSnapshot {
            address,
            observed_at: Utc::now(),
        })
    }
}

/// Decode an IP-echo body, either bare text or `{"ip": "..."}`.
pub fn parse_ipv4_body(body: &str) -> Result<String> {
    let body = body.trim();

    let candidate = if body.starts_with('{') {
        serde_json::from_str::<EchoResponse>(body)
            .map_err(|e| SyncError::Parse(format!("Invalid JSON response: {}", e)))?
            .ip
    } else {
        body.to_string()
    };

    let candidate = candidate.trim();
    candidate
        .parse::<Ipv4Addr>()
        .map_err(|_| SyncError::Parse(format!("Not an IPv4 address: {:?}", candidate)))?;

    Ok(candidate.to_string())
}
