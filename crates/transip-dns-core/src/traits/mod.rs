//! Core traits
//!
//! - [`EntryStore`]: read and replace the raw entries of a managed domain

pub mod entry_store;

pub use entry_store::EntryStore;
