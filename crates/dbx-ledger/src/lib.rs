//! Append-only anchor ledger for Driftbox.
//!
//! An anchor durably binds a hashed name to a content address. Every record
//! is signed by the anchoring account and hash-linked to the record before
//! it, so the full binding history is tamper-evident. This crate provides:
//! - [`AnchorRecord`] with canonical payload encoding
//! - the [`AnchorLedger`] trait boundary
//! - [`InMemoryLedger`] for tests and embedding
//! - [`JournalLedger`], a JSON-lines file replayed and verified on open
//! - [`LedgerValidator`] for sequence, chain, and signature checks

pub mod error;
pub mod journal;
pub mod memory;
pub mod record;
pub mod traits;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
pub use journal::JournalLedger;
pub use memory::InMemoryLedger;
pub use record::AnchorRecord;
pub use traits::AnchorLedger;
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
