//! Write-back planning
//!
//! Pure computation of the entry list to send back for one declared record.
//! No I/O happens here, so a plan can be inspected and discarded without
//! touching the registrar.

use indexmap::IndexSet;

use crate::domain::entry_name;
use crate::record::{ContentHandling, DesiredRecord, EnsureState, RawEntry, RecordState};

/// The outcome of planning one declared record against a domain's entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Domain the record belongs to
    pub domain: String,
    /// Entry name of the record within the domain (`@` for the apex)
    pub entry_name: String,
    /// Complete entry list to write back for the domain
    pub entries: Vec<RawEntry>,
    /// Entries at the record's key before the write
    pub previous: Vec<RawEntry>,
    /// Entries at the record's key after the write
    pub persisted: Vec<RawEntry>,
}

impl Plan {
    /// Whether the write changes anything at the record's key
    ///
    /// Ordering is ignored; only the `(content, ttl)` pairs count.
    pub fn changes_key(&self) -> bool {
        fn pairs(entries: &[RawEntry]) -> Vec<(&str, u32)> {
            let mut pairs: Vec<_> = entries.iter().map(|e| (e.content.as_str(), e.ttl)).collect();
            pairs.sort_unstable();
            pairs
        }
        pairs(&self.previous) != pairs(&self.persisted)
    }

    /// State to report back to the host after the write
    ///
    /// The TTL is taken from the last persisted entry, the same way
    /// discovery groups entries, so a merged value that kept its old TTL is
    /// reported with it. With nothing persisted the declared TTL is used.
    pub fn state(&self, desired: &DesiredRecord) -> RecordState {
        RecordState {
            ensure: desired.ensure,
            fqdn: desired.fqdn.clone(),
            record_type: desired.record_type,
            contents: self.persisted.iter().map(|e| e.content.clone()).collect(),
            ttl: self.persisted.last().map_or(desired.ttl, |e| e.ttl),
        }
    }
}

/// Compute the write-back for `desired` given the current entries of `domain`
///
/// Entries at other keys are kept untouched and in order. Entries at the
/// record's key are replaced according to the ensure state and content
/// handling:
///
/// - absent: none are kept
/// - replace: exactly the declared values, each with the declared TTL
/// - merge: existing values keep their entries and TTLs, declared values not
///   yet present are appended with the declared TTL
///
/// Content values are never duplicated at the key, so planning the same
/// declaration against its own output yields the same entry list.
pub fn plan(desired: &DesiredRecord, domain: &str, existing: Vec<RawEntry>) -> Plan {
    let name = entry_name(&desired.fqdn, domain);
    let (previous, kept): (Vec<_>, Vec<_>) = existing
        .into_iter()
        .partition(|entry| entry.is_at(&name, desired.record_type));

    let new_entry = |content: String| RawEntry::new(&name, desired.record_type, content, desired.ttl);

    let persisted = match (desired.ensure, desired.content_handling) {
        (EnsureState::Absent, _) => Vec::new(),
        (EnsureState::Present, ContentHandling::Replace) => {
            desired.content_set().into_iter().map(new_entry).collect()
        }
        (EnsureState::Present, ContentHandling::Merge) => {
            let mut seen = IndexSet::new();
            let mut merged = Vec::new();
            for entry in &previous {
                if seen.insert(entry.content.clone()) {
                    merged.push(entry.clone());
                }
            }
            for content in desired.content_set() {
                if seen.insert(content.clone()) {
                    merged.push(new_entry(content));
                }
            }
            merged
        }
    };

    let mut entries = kept;
    entries.extend(persisted.iter().cloned());

    Plan {
        domain: domain.to_string(),
        entry_name: name,
        entries,
        previous,
        persisted,
    }
}
