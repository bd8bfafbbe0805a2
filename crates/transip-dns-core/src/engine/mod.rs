//! Reconciliation engine
//!
//! The ReconciliationEngine converges declared records against the entries
//! an [`EntryStore`] holds:
//! - Validating each declaration before anything is sent
//! - Resolving the managed domain a record belongs to
//! - Planning the full write-back for that domain
//! - Writing it back in one call
//!
//! ## Architecture
//!
//! ```text
//!  DesiredRecord ──▶ validate ──▶ resolve domain ──▶ read ──▶ plan ──▶ write
//!                                        │            │                  │
//!                                        └────────────┴──── EntryStore ──┘
//! ```
//!
//! ## Concurrency
//!
//! Each apply holds a per-domain lock from read to write, so passes sharing
//! one engine never lose each other's updates. Nothing protects against a
//! second process (or a human in the control panel) writing the same domain
//! between our read and write: the registrar offers no compare-and-swap and
//! the write is a blind full-state replacement.

pub mod plan;

pub use plan::{Plan, plan};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::domain::resolve_domain;
use crate::error::Result;
use crate::record::{DesiredRecord, RecordKey, RecordState};
use crate::traits::EntryStore;

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A convergence pass started
    PassStarted { records: usize },

    /// A record was written back
    RecordApplied {
        record: String,
        domain: String,
        /// Whether the values at the record's key changed
        changed: bool,
        /// Entries written for the whole domain
        entries: usize,
    },

    /// A record could not be applied
    RecordFailed { record: String, error: String },

    /// A convergence pass finished
    PassFinished { applied: usize, failed: usize },
}

/// Result of applying one declared record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub key: RecordKey,
    pub domain: String,
    /// Reconciled state to report back to the host
    pub state: RecordState,
    /// Whether the values at the record's key changed
    pub changed: bool,
    /// Number of entries written for the domain
    pub written: usize,
}

/// Per-record results of one convergence pass
#[derive(Debug, Default)]
pub struct PassReport {
    pub outcomes: Vec<(RecordKey, Result<ApplyOutcome>)>,
}

impl PassReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.applied()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// One async lock per domain name
#[derive(Default)]
struct DomainLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DomainLocks {
    fn lock_for(&self, domain: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(domain.to_string()).or_default().clone()
    }
}

/// Convergence engine over an [`EntryStore`]
///
/// Stateless apart from the per-domain locks: every apply reads fresh
/// entries, and nothing is remembered between passes.
pub struct ReconciliationEngine {
    store: Arc<dyn EntryStore>,
    locks: DomainLocks,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconciliationEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        store: Arc<dyn EntryStore>,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let engine = Self {
            store,
            locks: DomainLocks::default(),
            event_tx: tx,
        };
        (engine, rx)
    }

    /// Compute what applying `desired` would write, without writing
    pub async fn plan(&self, desired: &DesiredRecord) -> Result<Plan> {
        desired.validate()?;
        let domain = self.resolve(desired).await?;
        let existing = self.store.read(&domain).await?;
        Ok(plan(desired, &domain, existing))
    }

    /// Converge one declared record
    ///
    /// Validation and domain resolution happen before any write, so an
    /// invalid declaration never partially applies.
    pub async fn apply(&self, desired: &DesiredRecord) -> Result<ApplyOutcome> {
        let key = desired.key();
        match self.apply_inner(desired).await {
            Ok(outcome) => {
                self.emit_event(EngineEvent::RecordApplied {
                    record: key.to_string(),
                    domain: outcome.domain.clone(),
                    changed: outcome.changed,
                    entries: outcome.written,
                });
                Ok(outcome)
            }
            Err(e) => {
                self.emit_event(EngineEvent::RecordFailed {
                    record: key.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn apply_inner(&self, desired: &DesiredRecord) -> Result<ApplyOutcome> {
        desired.validate()?;
        let key = desired.key();
        let domain = self.resolve(desired).await?;

        let lock = self.locks.lock_for(&domain);
        let _guard = lock.lock().await;

        let existing = self.store.read(&domain).await?;
        let plan = plan(desired, &domain, existing);
        let changed = plan.changes_key();

        debug!(
            "{}: {} entries at '{}' before, {} after",
            key,
            plan.previous.len(),
            plan.entry_name,
            plan.persisted.len()
        );

        self.store.write(&domain, &plan.entries).await?;

        info!(
            "Applied {} ({:?}, {:?}) to {}: {} entries written{}",
            key,
            desired.ensure,
            desired.content_handling,
            domain,
            plan.entries.len(),
            if changed { "" } else { " (unchanged)" }
        );

        Ok(ApplyOutcome {
            state: plan.state(desired),
            written: plan.entries.len(),
            key,
            domain,
            changed,
        })
    }

    /// Run one convergence pass over `records`
    ///
    /// Records are applied in order. A failing record is reported and the
    /// pass moves on; one bad declaration never blocks the others.
    pub async fn apply_all(&self, records: &[DesiredRecord]) -> PassReport {
        self.emit_event(EngineEvent::PassStarted {
            records: records.len(),
        });

        let mut report = PassReport::default();
        for desired in records {
            let result = self.apply(desired).await;
            if let Err(e) = &result {
                error!("Failed to apply {}: {}", desired.key(), e);
            }
            report.outcomes.push((desired.key(), result));
        }

        info!(
            "Convergence pass finished: {} applied, {} failed",
            report.applied(),
            report.failed()
        );
        self.emit_event(EngineEvent::PassFinished {
            applied: report.applied(),
            failed: report.failed(),
        });
        report
    }

    /// Every record currently present across all managed domains
    pub async fn instances(&self) -> Result<Vec<RecordState>> {
        let records = self.store.records().await?;
        debug!(
            "Discovered {} records via {} store",
            records.len(),
            self.store.store_name()
        );
        Ok(records.into_iter().map(|r| r.into_state()).collect())
    }

    async fn resolve(&self, desired: &DesiredRecord) -> Result<String> {
        let domains = self.store.domains().await?;
        Ok(resolve_domain(&desired.fqdn, &domains)?.name.clone())
    }

    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
