use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical bank-statement row shape shared by every bank adapter, the
/// Smart Mapper's bank-statement path, and the Rekening Koran exporter.
///
/// Invariant: `debit > 0 => credit == 0` and vice versa (a row is either a
/// debit or a credit, never both). Amounts are fixed-point `Decimal`, never
/// binary floats, so rupiah totals never drift under repeated summation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedTransaction {
    pub transaction_date: NaiveDate,
    pub posting_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub description: String,
    pub transaction_type: String,
    pub reference_number: String,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Signed running balance after this transaction.
    pub balance: Decimal,
    pub branch: String,
    pub additional_info: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
    /// Position of this row within its source (page/chunk), used to impose
    /// a deterministic order when chunk completion order is not guaranteed.
    pub source_sequence: u32,
}

impl StandardizedTransaction {
    /// `(date, debit, credit, balance)` — the dedup key used by the PDF
    /// Chunker's merge step and the Hybrid Bank Processor.
    pub fn fingerprint(&self) -> (NaiveDate, Decimal, Decimal, Decimal) {
        (self.transaction_date, self.debit, self.credit, self.balance)
    }

    /// True if this row obeys the debit-xor-credit invariant.
    pub fn is_valid(&self) -> bool {
        if self.debit > Decimal::ZERO && self.credit > Decimal::ZERO {
            return false;
        }
        self.debit >= Decimal::ZERO && self.credit >= Decimal::ZERO
    }
}

/// Deduplicate by fingerprint, then impose a deterministic order by
/// `(date, source_sequence)`.
pub fn dedupe_and_order(mut transactions: Vec<StandardizedTransaction>) -> Vec<StandardizedTransaction> {
    use std::collections::HashSet;

    let mut seen = HashSet::new();
    transactions.retain(|t| seen.insert(t.fingerprint()));
    transactions.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(a.source_sequence.cmp(&b.source_sequence))
    });
    transactions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(date: &str, debit: i64, credit: i64, balance: i64, seq: u32) -> StandardizedTransaction {
        StandardizedTransaction {
            transaction_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            posting_date: None,
            effective_date: None,
            description: "x".into(),
            transaction_type: "debit".into(),
            reference_number: "".into(),
            debit: Decimal::from(debit),
            credit: Decimal::from(credit),
            balance: Decimal::from(balance),
            branch: "".into(),
            additional_info: "".into(),
            bank_name: "".into(),
            account_number: "".into(),
            account_holder: "".into(),
            source_sequence: seq,
        }
    }

    #[test]
    fn dedupe_removes_identical_fingerprints() {
        let txs = vec![tx("2024-01-01", 100, 0, 900, 0), tx("2024-01-01", 100, 0, 900, 1)];
        let out = dedupe_and_order(txs);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn order_is_by_date_then_sequence() {
        let txs = vec![tx("2024-01-02", 0, 50, 950, 0), tx("2024-01-01", 100, 0, 900, 3)];
        let out = dedupe_and_order(txs);
        assert_eq!(out[0].transaction_date.to_string(), "2024-01-01");
    }

    #[test]
    fn debit_xor_credit_invariant() {
        let mut t = tx("2024-01-01", 100, 0, 900, 0);
        assert!(t.is_valid());
        t.credit = Decimal::from(50);
        assert!(!t.is_valid());
    }
}
