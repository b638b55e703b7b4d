//! Error types for ipsync.

use thiserror::Error;

/// Result type alias for ipsync.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Sync error types.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure reaching an upstream.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status.
    #[error("Unexpected HTTP {status} from {service}")]
    UpstreamStatus { service: String, status: u16 },

    /// IP-echo body could not be decoded into an address.
    #[error("Could not parse public IP: {0}")]
    Parse(String),

    /// Provider answered, but the body was not what the API promises.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("No DNS zone named {0}")]
    ZoneNotFound(String),

    #[error("No DNS record for {hostname} in zone {zone_id}")]
    RecordNotFound { zone_id: String, hostname: String },

    /// Delete did not answer 204.
    #[error("Failed to delete record {record_id}: expected HTTP 204, got {status}")]
    DeleteFailed { record_id: String, status: u16 },

    /// Create did not answer 201.
    #[error("Failed to create record for {hostname}: expected HTTP 201, got {status}")]
    CreateFailed { hostname: String, status: u16 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether this error must stop the polling loop.
    ///
    /// Transient upstream trouble is survivable: the next tick simply tries
    /// again. Anything that leaves the cached record out of step with the
    /// provider is not.
    pub fn is_fatal_in_steady_state(&self) -> bool {
        !matches!(
            self,
            SyncError::Network(_)
                | SyncError::UpstreamStatus { .. }
                | SyncError::Parse(_)
                | SyncError::Protocol(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(e: toml::de::Error) -> Self {
        SyncError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_not_fatal() {
        assert!(!SyncError::Network("timed out".into()).is_fatal_in_steady_state());
        assert!(!SyncError::Parse("garbage".into()).is_fatal_in_steady_state());
        assert!(!SyncError::UpstreamStatus {
            service: "https://api.ipify.org".into(),
            status: 503,
        }
        .is_fatal_in_steady_state());
    }

    #[test]
    fn test_mutation_errors_are_fatal() {
        let err = SyncError::DeleteFailed {
            record_id: "r1".into(),
            status: 200,
        };
        assert!(err.is_fatal_in_steady_state());
        assert_eq!(
            err.to_string(),
            "Failed to delete record r1: expected HTTP 204, got 200"
        );

        let err = SyncError::CreateFailed {
            hostname: "home.example.com".into(),
            status: 422,
        };
        assert!(err.is_fatal_in_steady_state());
    }
}
