// # Entry Store Implementations
//
// Also home of the raw-entry → logical-record grouping shared by every
// store's discovery surface.

pub mod memory;

pub use memory::MemoryEntryStore;

use indexmap::{IndexMap, IndexSet};

use crate::record::{ContentHandling, LogicalRecord, RawEntry, RecordType};

/// Collapse raw entries of `domain` into one logical record per `(fqdn, type)`
///
/// Groups keep the order in which their key first appears, and contents keep
/// first-occurrence order with duplicates removed. A group takes its TTL
/// from the last member seen; the registrar does not guarantee members
/// agree, and nothing here tries to reconcile them.
pub fn group_into_records(domain: &str, entries: &[RawEntry]) -> Vec<LogicalRecord> {
    let mut groups: IndexMap<(String, RecordType), LogicalRecord> = IndexMap::new();

    for entry in entries {
        let fqdn = entry.fqdn(domain);
        groups
            .entry((fqdn.clone(), entry.record_type))
            .and_modify(|record| {
                record.contents.insert(entry.content.clone());
                record.ttl = entry.ttl;
            })
            .or_insert_with(|| LogicalRecord {
                fqdn,
                record_type: entry.record_type,
                contents: IndexSet::from([entry.content.clone()]),
                ttl: entry.ttl,
                content_handling: ContentHandling::default(),
            });
    }

    groups.into_values().collect()
}
