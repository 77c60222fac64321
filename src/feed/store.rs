//! Record Store and Gap Detection
//!
//! Records land here from both the primary stream and resend responses,
//! keyed by sequence number. Once the primary stream ends the store is
//! scanned for sequence gaps; after recovery it is frozen into the final
//! ascending record list.

use std::collections::HashMap;

use super::wire::Record;

/// Mapping from sequence number to the latest record seen for it.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<i32, Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Insert a record, replacing any earlier arrival for the same
    /// sequence number. Returns the replaced record, if any.
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.sequence, record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, sequence: i32) -> bool {
        self.records.contains_key(&sequence)
    }

    /// Sequence numbers strictly between the minimum and maximum observed
    /// keys that are absent from the store, in ascending order.
    ///
    /// Nothing can be said about records outside the observed range, so no
    /// gap is reported before the minimum or after the maximum. Fewer than
    /// two distinct keys means no detectable gap.
    pub fn missing_sequences(&self) -> Vec<i32> {
        let mut keys: Vec<i32> = self.records.keys().copied().collect();
        keys.sort_unstable();

        let mut missing = Vec::new();
        for pair in keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            for seq in a + 1..b {
                missing.push(seq);
            }
        }
        missing
    }

    /// Freeze the store into the final record list, ascending by sequence.
    pub fn into_sorted_records(self) -> Vec<Record> {
        let mut records: Vec<Record> = self.records.into_values().collect();
        records.sort_unstable_by_key(|r| r.sequence);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::wire::Side;

    fn rec(sequence: i32) -> Record {
        Record {
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: 10,
            price: 100,
            sequence,
        }
    }

    #[test]
    fn test_upsert_is_idempotent_per_sequence() {
        let mut store = RecordStore::new();
        assert!(store.is_empty());
        assert!(store.upsert(rec(1)).is_none());
        assert!(store.contains(1));

        let mut later = rec(1);
        later.quantity = 99;
        let replaced = store.upsert(later.clone()).unwrap();
        assert_eq!(replaced.quantity, 10);

        assert_eq!(store.len(), 1);
        let records = store.into_sorted_records();
        assert_eq!(records[0].quantity, 99);
    }

    #[test]
    fn test_missing_sequences_basic() {
        let mut store = RecordStore::new();
        for seq in [1, 2, 4, 5, 9] {
            store.upsert(rec(seq));
        }
        assert_eq!(store.missing_sequences(), vec![3, 6, 7, 8]);
    }

    #[test]
    fn test_missing_sequences_no_gaps() {
        let mut store = RecordStore::new();
        for seq in 1..=5 {
            store.upsert(rec(seq));
        }
        assert!(store.missing_sequences().is_empty());
    }

    #[test]
    fn test_missing_sequences_needs_two_distinct_keys() {
        let mut store = RecordStore::new();
        assert!(store.missing_sequences().is_empty());

        store.upsert(rec(42));
        assert!(store.missing_sequences().is_empty());
    }

    #[test]
    fn test_gap_completeness() {
        let observed = [3, 7, 8, 15];
        let mut store = RecordStore::new();
        for seq in observed {
            store.upsert(rec(seq));
        }

        let missing = store.missing_sequences();

        // Strictly ascending, no duplicates.
        assert!(missing.windows(2).all(|w| w[0] < w[1]));

        // Union with the observed set covers [min, max] contiguously.
        let mut union: Vec<i32> = observed.iter().copied().chain(missing).collect();
        union.sort_unstable();
        assert_eq!(union, (3..=15).collect::<Vec<i32>>());
    }

    #[test]
    fn test_into_sorted_records_orders_by_sequence() {
        let mut store = RecordStore::new();
        for seq in [5, 1, 3] {
            store.upsert(rec(seq));
        }
        let seqs: Vec<i32> = store
            .into_sorted_records()
            .iter()
            .map(|r| r.sequence)
            .collect();
        assert_eq!(seqs, vec![1, 3, 5]);
    }
}
