//! Foundation types for Driftbox.
//!
//! This crate provides the identity and temporal types shared by every other
//! Driftbox crate.
//!
//! # Key Types
//!
//! - [`Address`]: Content address of a blob or tree (BLAKE3 hash)
//! - [`ModifiedTime`]: Millisecond modification timestamp used as the sync tie-breaker
//! - [`AccountId`]: Identity of the account that anchors names

pub mod account;
pub mod address;
pub mod error;
pub mod time;

pub use account::AccountId;
pub use address::Address;
pub use error::TypeError;
pub use time::ModifiedTime;
