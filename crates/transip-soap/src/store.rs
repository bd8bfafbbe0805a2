//! Registrar-backed entry store
//!
//! Reads go through `getInfo` (one domain) or `batchGetInfo` (every domain
//! at once); writes replace a domain's whole entry list with
//! `setDnsEntries`. The managed domain list is fetched once per store and
//! reused for its lifetime.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use transip_dns_core::record::{Domain, RawEntry};
use transip_dns_core::traits::EntryStore;
use transip_dns_core::Result;

use crate::client::ServiceClient;

/// `EntryStore` over the TransIP domain API
#[derive(Debug)]
pub struct RecordStore {
    client: Arc<ServiceClient>,
    domains: OnceCell<Vec<Domain>>,
}

impl RecordStore {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self {
            client,
            domains: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }
}

#[async_trait]
impl EntryStore for RecordStore {
    /// Cached after the first successful lookup; a failed lookup is retried
    /// on the next call.
    async fn domains(&self) -> Result<Vec<Domain>> {
        let domains = self
            .domains
            .get_or_try_init(|| async {
                let domains = self.client.domain_names().await?;
                tracing::info!("Discovered {} managed domains", domains.len());
                Ok::<_, transip_dns_core::Error>(domains)
            })
            .await?;
        Ok(domains.clone())
    }

    async fn read(&self, domain: &str) -> Result<Vec<RawEntry>> {
        let entries = self.client.domain_entries(domain).await?;
        tracing::debug!("Read {} entries for {}", entries.len(), domain);
        Ok(entries)
    }

    async fn write(&self, domain: &str, entries: &[RawEntry]) -> Result<()> {
        tracing::debug!("Writing {} entries for {}", entries.len(), domain);
        self.client.set_dns_entries(domain, entries).await
    }

    async fn all_entries(&self) -> Result<IndexMap<String, Vec<RawEntry>>> {
        let domains = self.domains().await?;
        if domains.is_empty() {
            return Ok(IndexMap::new());
        }
        self.client.batch_domain_entries(&domains).await
    }

    fn store_name(&self) -> &'static str {
        "transip"
    }
}
