//! File-backed anchor ledger.
//!
//! The journal is a JSON-lines file with one [`AnchorRecord`] per line. On
//! open the whole file is replayed and every record re-verified against its
//! predecessor; a journal whose chain or signatures do not check out is
//! refused rather than repaired.
//!
//! The one exception is a torn tail: a final line that is unterminated or
//! does not parse was never acknowledged, so it is cut off and logged.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use dbx_crypto::SigningKey;
use dbx_types::Address;

use crate::error::{LedgerError, LedgerResult};
use crate::memory::{ChainState, Prepared};
use crate::record::AnchorRecord;
use crate::traits::AnchorLedger;

/// Anchor ledger persisted as an append-only JSON-lines journal.
pub struct JournalLedger {
    path: PathBuf,
    inner: RwLock<JournalState>,
}

struct JournalState {
    chain: ChainState,
    file: File,
}

impl JournalLedger {
    /// Open (creating if needed) the journal at `path` and replay it.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let records = Self::replay(&path)?;
        let mut chain = ChainState::default();
        for record in records {
            chain.push(record)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::info!(
            path = %path.display(),
            records = chain.records().len(),
            "anchor journal opened"
        );
        Ok(Self {
            path,
            inner: RwLock::new(JournalState { chain, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(path: &Path) -> LedgerResult<Vec<AnchorRecord>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut line = String::new();
        let mut offset = 0u64;
        let mut number = 0usize;
        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                return Ok(records);
            }
            number += 1;
            let start = offset;
            offset += read as u64;
            if line.trim().is_empty() {
                continue;
            }

            let parsed = if line.ends_with('\n') {
                serde_json::from_str::<AnchorRecord>(&line).map_err(|e| e.to_string())
            } else {
                Err("missing line terminator".to_string())
            };
            let reason = match parsed {
                Ok(record) => {
                    records.push(record);
                    continue;
                }
                Err(reason) => reason,
            };
            if !Self::at_end(&mut reader)? {
                return Err(LedgerError::Serialization(format!(
                    "{} line {number}: {reason}",
                    path.display()
                )));
            }
            tracing::warn!(
                path = %path.display(),
                line = number,
                %reason,
                "dropping torn journal tail"
            );
            OpenOptions::new().write(true).open(path)?.set_len(start)?;
            return Ok(records);
        }
    }

    /// Whether nothing but whitespace remains.
    fn at_end(reader: &mut BufReader<File>) -> LedgerResult<bool> {
        let mut rest = String::new();
        reader.read_line(&mut rest)?;
        loop {
            if !rest.trim().is_empty() {
                return Ok(false);
            }
            rest.clear();
            if reader.read_line(&mut rest)? == 0 {
                return Ok(true);
            }
        }
    }
}

fn poisoned() -> LedgerError {
    LedgerError::IntegrityViolation {
        seq: 0,
        reason: "journal lock poisoned".into(),
    }
}

fn write_durably(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.sync_data()
}

impl AnchorLedger for JournalLedger {
    fn append(
        &self,
        name_key: Address,
        address: Address,
        signer: &SigningKey,
    ) -> LedgerResult<AnchorRecord> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        let record = match state.chain.prepare(name_key, address, signer)? {
            Prepared::Existing(record) => return Ok(record),
            Prepared::New(record) => record,
        };

        let mut line = serde_json::to_vec(&record)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        line.push(b'\n');
        let committed = state.file.metadata()?.len();
        if let Err(e) = write_durably(&mut state.file, &line) {
            if let Err(trunc) = state.file.set_len(committed) {
                tracing::error!(error = %trunc, "failed to cut back partial journal append");
            }
            return Err(e.into());
        }
        state.chain.push(record.clone())?;
        tracing::info!(seq = record.seq, %name_key, %address, "anchor journaled");
        Ok(record)
    }

    fn latest(&self, name_key: &Address) -> LedgerResult<Option<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.chain.latest(name_key).cloned())
    }

    fn history(&self, name_key: &Address) -> LedgerResult<Vec<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.chain.history(name_key))
    }

    fn read_all(&self) -> LedgerResult<Vec<AnchorRecord>> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.chain.records().to_vec())
    }

    fn len(&self) -> LedgerResult<u64> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.chain.records().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        let signer = SigningKey::generate();
        let name = Address::from_bytes(b"docs");

        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger.append(name, Address::from_bytes(b"v1"), &signer).unwrap();
            ledger.append(name, Address::from_bytes(b"v2"), &signer).unwrap();
        }

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 2);
        assert_eq!(
            reopened.latest(&name).unwrap().unwrap().address,
            Address::from_bytes(b"v2")
        );
        let third = reopened.append(name, Address::from_bytes(b"v3"), &signer).unwrap();
        assert_eq!(third.seq, 3);
    }

    #[test]
    fn idempotent_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        let signer = SigningKey::generate();
        let ledger = JournalLedger::open(&path).unwrap();
        ledger.append(Address::from_bytes(b"n"), Address::from_bytes(b"a"), &signer).unwrap();
        let size = fs::metadata(&path).unwrap().len();
        ledger.append(Address::from_bytes(b"n"), Address::from_bytes(b"a"), &signer).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), size);
    }

    #[test]
    fn tampered_journal_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        let signer = SigningKey::generate();
        let original = Address::from_bytes(b"original");
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger.append(Address::from_bytes(b"n"), original, &signer).unwrap();
        }

        let text = fs::read_to_string(&path).unwrap();
        let forged = text.replace(&original.to_hex(), &Address::from_bytes(b"forged").to_hex());
        fs::write(&path, forged).unwrap();

        assert!(matches!(
            JournalLedger::open(&path),
            Err(LedgerError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn garbage_before_valid_records_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger
                .append(Address::from_bytes(b"n"), Address::from_bytes(b"a"), &SigningKey::generate())
                .unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, format!("not json\n{text}")).unwrap();

        let err = JournalLedger::open(&path).err().unwrap();
        assert!(matches!(err, LedgerError::Serialization(msg) if msg.contains("line 1")));
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("not json\n{text}"));
    }

    #[test]
    fn torn_tail_is_dropped_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        let signer = SigningKey::generate();
        let name = Address::from_bytes(b"docs");
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger.append(name, Address::from_bytes(b"v1"), &signer).unwrap();
        }
        let committed = fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"seq":2,"name_k"#).unwrap();
        drop(file);

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), committed);

        let next = reopened.append(name, Address::from_bytes(b"v2"), &signer).unwrap();
        assert_eq!(next.seq, 2);
        drop(reopened);
        let again = JournalLedger::open(&path).unwrap();
        assert_eq!(again.len().unwrap(), 2);
        assert_eq!(again.latest(&name).unwrap().unwrap(), next);
    }

    #[test]
    fn terminated_but_unparsable_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchors.jsonl");
        {
            let ledger = JournalLedger::open(&path).unwrap();
            ledger
                .append(Address::from_bytes(b"n"), Address::from_bytes(b"a"), &SigningKey::generate())
                .unwrap();
        }
        let committed = fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"seq\":2}\n\n").unwrap();
        drop(file);

        let reopened = JournalLedger::open(&path).unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), committed);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/anchors.jsonl");
        let ledger = JournalLedger::open(&path).unwrap();
        assert_eq!(ledger.path(), path.as_path());
        assert!(ledger.is_empty().unwrap());
    }
}
