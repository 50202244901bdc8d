use crate::error::LedgerResult;
use crate::record::AnchorRecord;
use crate::traits::AnchorLedger;

/// Result of validating an anchor chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub record_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    BadSignature,
}

/// Anchor chain validator.
///
/// Unlike replay, which stops at the first bad record, validation walks the
/// whole chain and reports every violation it finds.
pub struct LedgerValidator;

impl LedgerValidator {
    pub fn validate(records: &[AnchorRecord]) -> ValidationReport {
        let mut violations = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let expected_seq = index as u64 + 1;
            if record.seq != expected_seq {
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected seq {expected_seq}, got {}", record.seq),
                });
            }

            let expected_prev = index.checked_sub(1).map(|i| records[i].record_hash);
            if record.prev_hash != expected_prev {
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashChainBreak,
                    description: "previous hash link mismatch".into(),
                });
            }

            match record.compute_hash() {
                Ok(hash) if hash == record.record_hash => {}
                Ok(_) => violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashMismatch,
                    description: "record hash does not match computed".into(),
                }),
                Err(e) => violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashMismatch,
                    description: format!("payload could not be encoded: {e}"),
                }),
            }

            if !record.verify_signature() {
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::BadSignature,
                    description: format!("signature does not verify for {}", record.account),
                });
            }
        }

        ValidationReport {
            record_count: records.len() as u64,
            violations,
        }
    }

    /// Validate everything `ledger` currently holds.
    pub fn validate_ledger(ledger: &dyn AnchorLedger) -> LedgerResult<ValidationReport> {
        Ok(Self::validate(&ledger.read_all()?))
    }
}
