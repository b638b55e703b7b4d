//! Poll-and-reconcile control loop.
//!
//! ```text
//! bootstrap:  find_zone(target) -> find_record(zone, target)
//! poll:       resolve IP -> compare with cached record
//!               -> on mismatch: delete, create, find_record
//!             sleep(interval), repeat
//! ```
//!
//! The cached record is the only mutable state. It is replaced wholesale
//! after every successful mutation, never patched in place.

use crate::detector::IpResolver;
use crate::error::{Result, SyncError};
use crate::providers::{DnsProvider, DnsRecord, DnsZone};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Events reported by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ZoneFound {
        zone_id: String,
        zone_name: String,
    },
    RecordFound {
        record_id: String,
        value: String,
    },
    /// No record exists yet; the first poll will create one.
    RecordMissing {
        hostname: String,
    },
    IpObserved {
        address: String,
    },
    MismatchDetected {
        published: String,
        observed: String,
    },
    RecordDeleted {
        record_id: String,
    },
    RecordCreated {
        hostname: String,
        value: String,
    },
    /// Public IP lookup failed; this tick is skipped.
    ResolveFailed {
        error: String,
    },
}

/// Receiver for [`SyncEvent`]s, supplied by whoever builds the reconciler.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: SyncEvent) {
        match event {
            SyncEvent::ZoneFound { zone_id, zone_name } => {
                tracing::info!(%zone_id, zone = %zone_name, "Zone found")
            }
            SyncEvent::RecordFound { record_id, value } => {
                tracing::info!(%record_id, %value, "Record found")
            }
            SyncEvent::RecordMissing { hostname } => {
                tracing::warn!(%hostname, "No record published yet, will create on first poll")
            }
            SyncEvent::IpObserved { address } => tracing::debug!(%address, "IP observed"),
            SyncEvent::MismatchDetected {
                published,
                observed,
            } => tracing::info!(%published, %observed, "IP mismatch detected"),
            SyncEvent::RecordDeleted { record_id } => {
                tracing::info!(%record_id, "Record deleted")
            }
            SyncEvent::RecordCreated { hostname, value } => {
                tracing::info!(%hostname, %value, "Record created")
            }
            SyncEvent::ResolveFailed { error } => {
                tracing::error!(%error, "Failed to resolve public IP")
            }
        }
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Replaced { previous: String, current: String },
    ResolveFailed,
}

/// Local view of what the provider publishes. `id` is `None` until a record exists.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CachedRecord {
    id: Option<String>,
    value: String,
}

impl From<DnsRecord> for CachedRecord {
    fn from(record: DnsRecord) -> Self {
        Self {
            id: Some(record.id),
            value: record.value,
        }
    }
}

/// Keeps one A record in step with the public IP.
pub struct Reconciler {
    provider: Box<dyn DnsProvider>,
    resolver: Box<dyn IpResolver>,
    sink: Arc<dyn EventSink>,
    target: String,
    zone: DnsZone,
    current: CachedRecord,
    interval: Duration,
}

impl Reconciler {
    /// Resolve the zone and baseline record. Any error here is fatal.
    pub async fn bootstrap(
        provider: Box<dyn DnsProvider>,
        resolver: Box<dyn IpResolver>,
        sink: Arc<dyn EventSink>,
        target: String,
        interval: Duration,
    ) -> Result<Self> {
        let zone = provider.find_zone(&target).await?;
        sink.emit(SyncEvent::ZoneFound {
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
        });

        let current = match provider.find_record(&zone.id, &target).await {
            Ok(record) => {
                sink.emit(SyncEvent::RecordFound {
                    record_id: record.id.clone(),
                    value: record.value.clone(),
                });
                CachedRecord::from(record)
            }
            Err(SyncError::RecordNotFound { .. }) => {
                sink.emit(SyncEvent::RecordMissing {
                    hostname: target.clone(),
                });
                CachedRecord {
                    id: None,
                    value: String::new(),
                }
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            provider,
            resolver,
            sink,
            target,
            zone,
            current,
            interval,
        })
    }

    pub fn zone(&self) -> &DnsZone {
        &self.zone
    }

    /// Last value seen published; empty when no record exists.
    pub fn published_value(&self) -> &str {
        &self.current.value
    }

    pub fn published_record_id(&self) -> Option<&str> {
        self.current.id.as_deref()
    }

    /// One tick: resolve, compare, replace on mismatch.
    ///
    /// Lookup failures are reported and swallowed. Mutation failures are
    /// returned, since the cache can no longer be trusted after them.
    pub async fn poll_once(&mut self) -> Result<PollOutcome> {
        let snapshot = match self.resolver.resolve().await {
            Ok(snapshot) => snapshot,
            Err(e) if !e.is_fatal_in_steady_state() => {
                self.sink.emit(SyncEvent::ResolveFailed {
                    error: e.to_string(),
                });
                return Ok(PollOutcome::ResolveFailed);
            }
            Err(e) => return Err(e),
        };

        self.sink.emit(SyncEvent::IpObserved {
            address: snapshot.address.clone(),
        });

        if snapshot.address == self.current.value {
            return Ok(PollOutcome::Unchanged);
        }

        self.sink.emit(SyncEvent::MismatchDetected {
            published: self.current.value.clone(),
            observed: snapshot.address.clone(),
        });

        let previous = self.replace(&snapshot.address).await?;
        Ok(PollOutcome::Replaced {
            previous,
            current: snapshot.address,
        })
    }

    /// Replace the record with the current public IP even if it already matches.
    pub async fn force_update(&mut self) -> Result<PollOutcome> {
        let snapshot = self.resolver.resolve().await?;
        self.sink.emit(SyncEvent::IpObserved {
            address: snapshot.address.clone(),
        });

        let previous = self.replace(&snapshot.address).await?;
        Ok(PollOutcome::Replaced {
            previous,
            current: snapshot.address,
        })
    }

    /// Poll until `shutdown` completes or a fatal error occurs.
    ///
    /// `shutdown` is only observed while sleeping, so a poll that has
    /// started (and in particular a delete that has gone through) always
    /// runs to completion.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            target_host = %self.target,
            interval_secs = self.interval.as_secs(),
            "Started monitoring IP address"
        );
        tokio::pin!(shutdown);

        loop {
            self.poll_once().await?;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Delete (if present), create, then re-read to pick up the new id.
    /// Returns the previously published value.
    async fn replace(&mut self, address: &str) -> Result<String> {
        let zone_id = self.zone.id.as_str();

        if let Some(record_id) = self.current.id.take() {
            self.provider.delete_record(zone_id, &record_id).await?;
            self.sink.emit(SyncEvent::RecordDeleted { record_id });
        }

        self.provider
            .create_a_record(zone_id, &self.target, address)
            .await?;
        self.sink.emit(SyncEvent::RecordCreated {
            hostname: self.target.clone(),
            value: address.to_string(),
        });

        let record = self.provider.find_record(zone_id, &self.target).await?;
        let previous = std::mem::replace(&mut self.current, CachedRecord::from(record));
        Ok(previous.value)
    }
}
