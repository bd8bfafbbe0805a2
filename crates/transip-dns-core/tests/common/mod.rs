//! Test doubles shared by the contract tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use transip_dns_core::error::{Error, Result};
use transip_dns_core::record::{Domain, RawEntry};
use transip_dns_core::store::MemoryEntryStore;
use transip_dns_core::traits::EntryStore;

/// An EntryStore that records every call made through it
///
/// Wraps a [`MemoryEntryStore`] and can be told to fail reads or writes, or
/// to pause between a read returning and the caller's write arriving.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryEntryStore,
    reads: Arc<AtomicUsize>,
    domain_lookups: Arc<AtomicUsize>,
    writes: Arc<std::sync::Mutex<Vec<(String, Vec<RawEntry>)>>>,
    fail_writes: Arc<AtomicBool>,
    read_delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new(inner: MemoryEntryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Sleep after every read, widening the read-to-write window
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn domain_lookup_count(&self) -> usize {
        self.domain_lookups.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<(String, Vec<RawEntry>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn last_write(&self) -> Option<(String, Vec<RawEntry>)> {
        self.writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EntryStore for RecordingStore {
    async fn domains(&self) -> Result<Vec<Domain>> {
        self.domain_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.domains().await
    }

    async fn read(&self, domain: &str) -> Result<Vec<RawEntry>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let entries = self.inner.read(domain).await?;
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(entries)
    }

    async fn write(&self, domain: &str, entries: &[RawEntry]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::transport(
                "set_dns_entries",
                Some(domain),
                "simulated outage",
            ));
        }
        self.writes
            .lock()
            .unwrap()
            .push((domain.to_string(), entries.to_vec()));
        self.inner.write(domain, entries).await
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}
