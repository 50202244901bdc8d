use async_trait::async_trait;
use dbx_types::Address;

use crate::error::NamingResult;

/// Naming collaborator: binds human-readable names to content addresses.
///
/// Two namespaces are exposed. `publish`/`resolve` manage the session
/// account's own mutable name. `anchor`/`lookup_binding` manage arbitrary
/// names recorded in the append-only ledger.
#[async_trait]
pub trait NameService: Send + Sync {
    /// Point the session account's name at `address`. Returns that name.
    async fn publish(&self, address: &Address) -> NamingResult<String>;

    /// Address currently published under `name`.
    async fn resolve(&self, name: &str) -> NamingResult<Address>;

    /// Durably bind `name` to `address`.
    ///
    /// Returns `false` when the ledger refuses the binding, e.g. because the
    /// name belongs to another account. Re-anchoring the current binding is
    /// a no-op that returns `true`.
    async fn anchor(&self, name: &str, address: &Address) -> NamingResult<bool>;

    /// Address currently anchored under `name`.
    async fn lookup_binding(&self, name: &str) -> NamingResult<Address>;
}
