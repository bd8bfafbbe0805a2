// # Memory Entry Store
//
// In-memory implementation of EntryStore.
//
// ## Purpose
//
// Stands in for the registrar when embedding the engine, planning a pass
// without touching the remote, or testing. Writes replace a domain's entry
// list wholesale, exactly like the remote `set_dns_entries` call.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{Error, Result};
use crate::record::{Domain, RawEntry};
use crate::traits::EntryStore;

/// In-memory entry store
///
/// # Example
///
/// ```rust
/// use transip_dns_core::store::MemoryEntryStore;
/// use transip_dns_core::traits::EntryStore;
/// use transip_dns_core::record::{RawEntry, RecordType};
///
/// # tokio_test::block_on(async {
/// let store = MemoryEntryStore::new()
///     .with_domain("example.com", vec![RawEntry::new("www", RecordType::A, "192.0.2.1", 300)]);
///
/// assert_eq!(store.read("example.com").await.unwrap().len(), 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    inner: Arc<RwLock<IndexMap<String, Vec<RawEntry>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryEntryStore {
    /// Create a store with no domains
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a managed domain with initial entries
    ///
    /// Builder-style; call before sharing the store. Use
    /// [`insert_domain`](Self::insert_domain) once the store is in use.
    ///
    /// If a clone currently holds the lock the domain is not added and a
    /// warning is logged.
    pub fn with_domain(mut self, domain: impl Into<String>, entries: Vec<RawEntry>) -> Self {
        let domain = domain.into();
        if let Some(lock) = Arc::get_mut(&mut self.inner) {
            lock.get_mut().insert(domain, entries);
        } else if let Ok(mut guard) = self.inner.try_write() {
            guard.insert(domain, entries);
        } else {
            warn!(
                "Memory store is locked, domain {} not added; use insert_domain instead",
                domain
            );
        }
        self
    }

    /// Add or reset a managed domain
    pub async fn insert_domain(&self, domain: impl Into<String>, entries: Vec<RawEntry>) {
        self.inner.write().await.insert(domain.into(), entries);
    }

    /// Current entries of `domain`, if managed
    pub async fn entries(&self, domain: &str) -> Option<Vec<RawEntry>> {
        self.inner.read().await.get(domain).cloned()
    }

    /// Number of `write` calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn domains(&self) -> Result<Vec<Domain>> {
        let guard = self.inner.read().await;
        Ok(guard.keys().map(Domain::new).collect())
    }

    async fn read(&self, domain: &str) -> Result<Vec<RawEntry>> {
        let guard = self.inner.read().await;
        guard
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::domain_not_managed(domain))
    }

    async fn write(&self, domain: &str, entries: &[RawEntry]) -> Result<()> {
        let mut guard = self.inner.write().await;
        let slot = guard
            .get_mut(domain)
            .ok_or_else(|| Error::domain_not_managed(domain))?;
        *slot = entries.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;

    #[tokio::test]
    async fn write_replaces_whole_domain() {
        let store = MemoryEntryStore::new().with_domain(
            "example.com",
            vec![
                RawEntry::new("www", RecordType::A, "192.0.2.1", 300),
                RawEntry::new("mail", RecordType::A, "192.0.2.2", 300),
            ],
        );

        let replacement = vec![RawEntry::new("@", RecordType::Txt, "hello", 60)];
        store.write("example.com", &replacement).await.unwrap();

        assert_eq!(store.read("example.com").await.unwrap(), replacement);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn unknown_domain_is_not_managed() {
        let store = MemoryEntryStore::new();
        let err = store.read("example.com").await.unwrap_err();
        assert!(matches!(err, Error::DomainNotManaged { .. }));
        assert!(store.write("example.com", &[]).await.is_err());
    }

    #[tokio::test]
    async fn discovery_groups_across_domains() {
        let store = MemoryEntryStore::new()
            .with_domain(
                "example.com",
                vec![
                    RawEntry::new("@", RecordType::Txt, "text1", 3600),
                    RawEntry::new("@", RecordType::Txt, "text2", 3600),
                ],
            )
            .with_domain(
                "example.eu",
                vec![RawEntry::new("@", RecordType::Txt, "text1", 3600)],
            );

        let names: Vec<_> = store
            .records()
            .await
            .unwrap()
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(names, vec!["example.com/TXT", "example.eu/TXT"]);

        let domains = store.domains().await.unwrap();
        assert_eq!(domains, vec![Domain::new("example.com"), Domain::new("example.eu")]);
    }

    #[tokio::test]
    async fn builder_reaches_clones_made_earlier() {
        let store = MemoryEntryStore::new();
        let clone = store.clone();
        let _store = store.with_domain("example.com", vec![]);

        assert_eq!(clone.entries("example.com").await, Some(vec![]));
    }

    #[tokio::test]
    async fn builder_skips_domain_while_locked() {
        let store = MemoryEntryStore::new();
        let clone = store.clone();

        let guard = clone.inner.read().await;
        let store = store.with_domain("example.com", vec![]);
        drop(guard);

        assert_eq!(store.entries("example.com").await, None);
        store.insert_domain("example.com", vec![]).await;
        assert_eq!(store.entries("example.com").await, Some(vec![]));
    }
}
