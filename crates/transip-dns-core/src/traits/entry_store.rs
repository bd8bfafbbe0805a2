// # Entry Store Trait
//
// Defines the interface the reconciliation engine converges through.
//
// ## Implementations
//
// - SOAP registrar API: `transip_soap::RecordStore`
// - In-memory: `MemoryEntryStore` (tests, dry runs, embedding)
//
// ## Write semantics
//
// `write` is a blind full-state replacement of a domain's entry list. There
// is no compare-and-swap on the registrar side: anything that changed
// between `read` and `write` is overwritten. The engine serializes its own
// passes per domain, but two processes converging the same domain still
// race.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;
use crate::record::{Domain, LogicalRecord, RawEntry};

/// Read/replace access to the raw entries of managed domains
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Domains managed by the account
    ///
    /// Implementations backed by a remote service may cache this for the
    /// lifetime of the store.
    async fn domains(&self) -> Result<Vec<Domain>>;

    /// All raw entries for one domain, in registrar order
    async fn read(&self, domain: &str) -> Result<Vec<RawEntry>>;

    /// Replace the entire entry list of `domain`
    ///
    /// Callers must pass the complete desired state every time.
    async fn write(&self, domain: &str, entries: &[RawEntry]) -> Result<()>;

    /// Raw entries of every managed domain, keyed by domain name
    ///
    /// The default reads domains one by one; remote stores should override
    /// this with a batched call.
    async fn all_entries(&self) -> Result<IndexMap<String, Vec<RawEntry>>> {
        let mut all = IndexMap::new();
        for domain in self.domains().await? {
            let entries = self.read(&domain.name).await?;
            all.insert(domain.name, entries);
        }
        Ok(all)
    }

    /// Every logical record currently present across all managed domains
    ///
    /// This is the discovery surface used for drift detection.
    async fn records(&self) -> Result<Vec<LogicalRecord>> {
        let all = self.all_entries().await?;
        Ok(all
            .iter()
            .flat_map(|(domain, entries)| crate::store::group_into_records(domain, entries))
            .collect())
    }

    /// Store name (for logging)
    fn store_name(&self) -> &'static str;
}
