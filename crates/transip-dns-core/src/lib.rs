// # transip-dns-core
//
// Record model and convergence engine for DNS records hosted at TransIP.
//
// ## Architecture Overview
//
// - **RawEntry / LogicalRecord**: registrar granularity (one value per entry)
//   versus declared granularity (many values per `(fqdn, type)` key)
// - **EntryStore**: trait for reading and replacing a domain's entries
// - **ReconciliationEngine**: validates, plans, and writes back one declared
//   record at a time
// - **MemoryEntryStore**: in-process EntryStore for tests and embedding
//
// The SOAP wire protocol, request signing, and the registrar-backed
// EntryStore live in the `transip-soap` crate.
//
// ## Design Principles
//
// 1. **Full-state writes**: every write carries the complete entry list of a
//    domain, so the plan must preserve every entry it does not own
// 2. **Validate first**: invalid declarations fail before any remote call
// 3. **Isolation**: one record failing never stops the rest of a pass
// 4. **Idempotency**: re-applying a declaration converges to the same entries

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod record;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{AccessMode, ClientConfig, EngineConfig};
pub use engine::{ApplyOutcome, EngineEvent, PassReport, Plan, ReconciliationEngine};
pub use error::{Error, Result};
pub use record::{
    ContentHandling, DesiredRecord, Domain, EnsureState, LogicalRecord, RawEntry, RecordKey,
    RecordState, RecordType,
};
pub use store::{MemoryEntryStore, group_into_records};
pub use traits::EntryStore;
