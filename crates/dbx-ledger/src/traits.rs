use dbx_crypto::SigningKey;
use dbx_types::Address;

use crate::error::LedgerResult;
use crate::record::AnchorRecord;

/// Append/query boundary of the anchor ledger.
///
/// Records form one hash chain across all names. A name may only be rebound
/// by the account that first anchored it.
pub trait AnchorLedger: Send + Sync {
    /// Bind `name_key` to `address`, signed by `signer`.
    ///
    /// If the current binding already points at `address` for the same
    /// account, the existing record is returned and nothing is appended.
    fn append(
        &self,
        name_key: Address,
        address: Address,
        signer: &SigningKey,
    ) -> LedgerResult<AnchorRecord>;

    /// The current binding for a name key.
    fn latest(&self, name_key: &Address) -> LedgerResult<Option<AnchorRecord>>;

    /// Every binding ever recorded for a name key, oldest first.
    fn history(&self, name_key: &Address) -> LedgerResult<Vec<AnchorRecord>>;

    /// The whole chain, in sequence order.
    fn read_all(&self) -> LedgerResult<Vec<AnchorRecord>>;

    /// Number of records in the chain.
    fn len(&self) -> LedgerResult<u64>;

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}
