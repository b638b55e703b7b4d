//! # ipsync
//!
//! Keeps a single Netlify DNS A record pointed at the host's public IPv4
//! address.
//!
//! ## Behaviour
//!
//! - Resolves the zone for the target hostname once at startup
//! - Polls a public IP-echo service on a fixed interval
//! - Replaces the record (delete, then create) when the address changes
//!
//! ## Usage
//!
//! ```bash
//! export NETLIFY_TOKEN=...
//! export DNS_TARGET=home.example.com
//!
//! # Run the sync loop
//! ipsync
//!
//! # Show public IP and published record
//! ipsync status
//!
//! # One reconciliation pass
//! ipsync update --force
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod providers;
pub mod reconciler;

pub use config::Config;
pub use detector::{IpDetector, IpResolver, PublicIpSnapshot};
pub use error::{Result, SyncError};
pub use reconciler::{EventSink, PollOutcome, Reconciler, SyncEvent, TracingSink};
