use std::collections::HashMap;
use std::sync::RwLock;

use dbx_crypto::SigningKey;
use dbx_types::{Address, ModifiedTime};

use crate::error::{LedgerError, LedgerResult};
use crate::record::AnchorRecord;
use crate::traits::AnchorLedger;

/// Chain contents plus a per-name index. Shared by every ledger backend.
#[derive(Default)]
pub(crate) struct ChainState {
    records: Vec<AnchorRecord>,
    by_name: HashMap<Address, Vec<usize>>,
}

/// Outcome of preparing an append.
pub(crate) enum Prepared {
    /// The name already points at the requested address.
    Existing(AnchorRecord),
    /// A new record, signed and linked, not yet pushed.
    New(AnchorRecord),
}

impl ChainState {
    pub(crate) fn latest(&self, name_key: &Address) -> Option<&AnchorRecord> {
        self.by_name
            .get(name_key)
            .and_then(|positions| positions.last())
            .map(|&index| &self.records[index])
    }

    pub(crate) fn history(&self, name_key: &Address) -> Vec<AnchorRecord> {
        self.by_name
            .get(name_key)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&index| self.records[index].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn records(&self) -> &[AnchorRecord] {
        &self.records
    }

    pub(crate) fn prepare(
        &self,
        name_key: Address,
        address: Address,
        signer: &SigningKey,
    ) -> LedgerResult<Prepared> {
        let account = signer.account_id();
        if let Some(current) = self.latest(&name_key) {
            if current.account != account {
                return Err(LedgerError::NameOwned {
                    name_key,
                    owner: current.account.clone(),
                });
            }
            if current.address == address {
                return Ok(Prepared::Existing(current.clone()));
            }
        }

        let last = self.records.last();
        let anchored_at = match last {
            Some(previous) => ModifiedTime::now().max(previous.anchored_at),
            None => ModifiedTime::now(),
        };
        let record = AnchorRecord::create(
            self.records.len() as u64 + 1,
            name_key,
            address,
            signer,
            anchored_at,
            last.map(|r| r.record_hash),
        )?;
        Ok(Prepared::New(record))
    }

    /// Append a record after checking sequence, link, hash, and signature.
    pub(crate) fn push(&mut self, record: AnchorRecord) -> LedgerResult<()> {
        let expected_seq = self.records.len() as u64 + 1;
        if record.seq != expected_seq {
            return Err(LedgerError::IntegrityViolation {
                seq: record.seq,
                reason: format!("expected seq {expected_seq}"),
            });
        }
        let expected_prev = self.records.last().map(|r| r.record_hash);
        if record.prev_hash != expected_prev {
            return Err(LedgerError::IntegrityViolation {
                seq: record.seq,
                reason: "previous hash link mismatch".into(),
            });
        }
        if record.compute_hash()? != record.record_hash {
            return Err(LedgerError::IntegrityViolation {
                seq: record.seq,
                reason: "record hash mismatch".into(),
            });
        }
        if !record.verify_signature() {
            return Err(LedgerError::IntegrityViolation {
                seq: record.seq,
                reason: "invalid signature".into(),
            });
        }

        self.by_name
            .entry(record.name_key)
            .or_default()
            .push(self.records.len());
        self.records.push(record);
        Ok(())
    }
}

/// In-memory anchor ledger for tests, local demos, and embedding.
#[derive(Default)]
pub struct InMemoryLedger {
    inner: RwLock<ChainState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> LedgerError {
    LedgerError::IntegrityViolation {
        seq: 0,
        reason: "ledger lock poisoned".into(),
    }
}

impl AnchorLedger for InMemoryLedger {
    fn append(
        &self,
        name_key: Address,
        address: Address,
        signer: &SigningKey,
    ) -> LedgerResult<AnchorRecord> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        match state.prepare(name_key, address, signer)? {
            Prepared::Existing(record) => Ok(record),
            Prepared::New(record) => {
                state.push(record.clone())?;
                tracing::debug!(seq = record.seq, %name_key, %address, "anchored");
                Ok(record)
            }
        }
    }

    fn latest(&self, name_key: &Address) -> LedgerResult<Option<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.latest(name_key).cloned())
    }

    fn history(&self, name_key: &Address) -> LedgerResult<Vec<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.history(name_key))
    }

    fn read_all(&self) -> LedgerResult<Vec<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.records().to_vec())
    }

    fn len(&self) -> LedgerResult<u64> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.records().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::LedgerValidator;

    fn key(name: &str) -> Address {
        Address::from_bytes(name.as_bytes())
    }

    #[test]
    fn append_and_latest() {
        let ledger = InMemoryLedger::new();
        let signer = SigningKey::generate();
        let a = Address::from_bytes(b"a");

        let record = ledger.append(key("docs"), a, &signer).unwrap();
        assert_eq!(record.seq, 1);
        assert_eq!(record.prev_hash, None);
        assert_eq!(ledger.latest(&key("docs")).unwrap(), Some(record));
        assert_eq!(ledger.latest(&key("other")).unwrap(), None);
    }

    #[test]
    fn rebinding_same_address_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let signer = SigningKey::generate();
        let a = Address::from_bytes(b"a");

        let first = ledger.append(key("docs"), a, &signer).unwrap();
        let second = ledger.append(key("docs"), a, &signer).unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn rebinding_new_address_extends_history() {
        let ledger = InMemoryLedger::new();
        let signer = SigningKey::generate();
        ledger.append(key("docs"), Address::from_bytes(b"v1"), &signer).unwrap();
        ledger.append(key("notes"), Address::from_bytes(b"n1"), &signer).unwrap();
        let latest = ledger.append(key("docs"), Address::from_bytes(b"v2"), &signer).unwrap();

        assert_eq!(latest.seq, 3);
        let history = ledger.history(&key("docs")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], latest);
        assert!(LedgerValidator::validate(&ledger.read_all().unwrap()).is_valid());
    }

    #[test]
    fn other_account_cannot_rebind() {
        let ledger = InMemoryLedger::new();
        let owner = SigningKey::generate();
        let intruder = SigningKey::generate();
        ledger.append(key("docs"), Address::from_bytes(b"v1"), &owner).unwrap();

        let err = ledger
            .append(key("docs"), Address::from_bytes(b"v2"), &intruder)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NameOwned { owner: o, .. } if o == owner.account_id()));
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let ledger = InMemoryLedger::new();
        let signer = SigningKey::generate();
        for i in 0..5u8 {
            ledger.append(key("t"), Address::from_bytes(&[i]), &signer).unwrap();
        }
        let records = ledger.read_all().unwrap();
        assert!(records.windows(2).all(|w| w[0].anchored_at <= w[1].anchored_at));
        assert!(!ledger.is_empty().unwrap());
    }

    #[test]
    fn push_rejects_out_of_order_record() {
        let mut state = ChainState::default();
        let signer = SigningKey::generate();
        let record = AnchorRecord::create(
            2,
            key("x"),
            Address::from_bytes(b"x"),
            &signer,
            ModifiedTime::EPOCH,
            None,
        )
        .unwrap();
        assert!(matches!(
            state.push(record),
            Err(LedgerError::IntegrityViolation { seq: 2, .. })
        ));
    }
}
