//! Naming for Driftbox.
//!
//! Names bind human-readable strings to content addresses. The
//! [`NameService`] trait is the boundary the sync engine consumes;
//! [`LedgerNameService`] implements it on top of a signed, hash-chained
//! anchor ledger, signing with an explicit [`Session`] that is created once
//! per process and injected.

pub mod error;
pub mod ledger;
pub mod names;
pub mod session;
pub mod traits;

pub use error::{NamingError, NamingResult};
pub use ledger::LedgerNameService;
pub use names::{validate_name, MAX_NAME_LEN};
pub use session::Session;
pub use traits::NameService;
