use dbx_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use dbx_types::{AccountId, Address, ModifiedTime};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

const RECORD: ContentHasher = ContentHasher::new("dbx-anchor-v1");

/// One name binding in the ledger.
///
/// `record_hash` covers the canonical payload and the previous record's
/// hash; `signature` is the signer's signature over `record_hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Position in the chain, starting at 1.
    pub seq: u64,
    /// Domain-separated hash of the anchored name.
    pub name_key: Address,
    /// Address the name is bound to.
    pub address: Address,
    pub account: AccountId,
    pub signer: VerifyingKey,
    pub anchored_at: ModifiedTime,
    pub prev_hash: Option<[u8; 32]>,
    pub record_hash: [u8; 32],
    pub signature: Signature,
}

#[derive(Serialize)]
struct CanonicalPayload<'a> {
    seq: u64,
    name_key: &'a Address,
    address: &'a Address,
    account: &'a AccountId,
    signer: &'a VerifyingKey,
    anchored_at: ModifiedTime,
}

impl AnchorRecord {
    /// Build and sign the record at `seq`, linked to `prev_hash`.
    pub fn create(
        seq: u64,
        name_key: Address,
        address: Address,
        signer: &SigningKey,
        anchored_at: ModifiedTime,
        prev_hash: Option<[u8; 32]>,
    ) -> LedgerResult<Self> {
        let verifying = signer.verifying_key();
        let account = verifying.to_account_id();
        let payload = encode_payload(&CanonicalPayload {
            seq,
            name_key: &name_key,
            address: &address,
            account: &account,
            signer: &verifying,
            anchored_at,
        })?;
        let record_hash = link_hash(&payload, prev_hash.as_ref());
        let signature = signer.sign(&record_hash);
        Ok(Self {
            seq,
            name_key,
            address,
            account,
            signer: verifying,
            anchored_at,
            prev_hash,
            record_hash,
            signature,
        })
    }

    /// Canonical bytes covered by `record_hash`.
    pub fn canonical_payload(&self) -> LedgerResult<Vec<u8>> {
        encode_payload(&CanonicalPayload {
            seq: self.seq,
            name_key: &self.name_key,
            address: &self.address,
            account: &self.account,
            signer: &self.signer,
            anchored_at: self.anchored_at,
        })
    }

    /// Recompute `record_hash` from the payload and `prev_hash`.
    pub fn compute_hash(&self) -> LedgerResult<[u8; 32]> {
        Ok(link_hash(&self.canonical_payload()?, self.prev_hash.as_ref()))
    }

    /// Whether `signature` is valid for `record_hash` and `signer` owns `account`.
    pub fn verify_signature(&self) -> bool {
        self.signer.to_account_id() == self.account
            && self.signer.verify(&self.record_hash, &self.signature).is_ok()
    }
}

/// The genesis record hashes its payload alone; every later record also
/// covers its predecessor's hash.
fn link_hash(payload: &[u8], prev_hash: Option<&[u8; 32]>) -> [u8; 32] {
    match prev_hash {
        Some(prev) => RECORD.digest(&[&prev[..], payload]),
        None => RECORD.digest(&[payload]),
    }
}

fn encode_payload(payload: &CanonicalPayload<'_>) -> LedgerResult<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| LedgerError::Serialization(e.to_string()))
}
