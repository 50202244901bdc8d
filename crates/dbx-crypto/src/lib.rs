//! Cryptographic primitives for Driftbox.
//!
//! Domain-separated BLAKE3 hashing for content addresses, name keys and
//! ledger records, plus Ed25519 keys for signing anchor records.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
