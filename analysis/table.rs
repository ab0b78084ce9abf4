//! # 2×2 Contingency Table
//!
//! Cross-tabulates boolean feature/outcome pairs into the four cells
//!
//! |              | outcome | no outcome |
//! |--------------|---------|------------|
//! | feature      | `a`     | `b`        |
//! | no feature   | `c`     | `d`        |
//!
//! A record is counted only when both attributes are known. Missing values
//! are never coerced to `false`; they are tallied separately as `dropped`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Feature present, outcome present.
    pub a: u64,
    /// Feature present, outcome absent.
    pub b: u64,
    /// Feature absent, outcome present.
    pub c: u64,
    /// Feature absent, outcome absent.
    pub d: u64,
}

/// The outcome of cross-tabulating an observation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub table: ContingencyTable,
    /// Records excluded because the feature or the outcome was missing.
    pub dropped: usize,
}

impl ContingencyTable {
    pub const fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// Partitions `(feature, outcome)` pairs into the four cells.
    ///
    /// Fails when nothing is left to count once incomplete records are removed.
    pub fn from_observations<I>(observations: I) -> Result<Tally, InvalidInputError>
    where
        I: IntoIterator<Item = (Option<bool>, Option<bool>)>,
    {
        let mut table = ContingencyTable::default();
        let mut dropped = 0usize;

        for pair in observations {
            match pair {
                (Some(true), Some(true)) => table.a += 1,
                (Some(true), Some(false)) => table.b += 1,
                (Some(false), Some(true)) => table.c += 1,
                (Some(false), Some(false)) => table.d += 1,
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Excluded {dropped} record(s) with a missing feature or outcome value");
        }
        if table.total() == 0 {
            return Err(InvalidInputError::EmptyAfterExclusion { dropped });
        }
        debug!(
            "Tabulated a={} b={} c={} d={} (dropped {dropped})",
            table.a, table.b, table.c, table.d
        );

        Ok(Tally { table, dropped })
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// Entities with the feature (`a + b`).
    pub fn feature_total(&self) -> u64 {
        self.a + self.b
    }

    /// Entities without the feature (`c + d`).
    pub fn no_feature_total(&self) -> u64 {
        self.c + self.d
    }

    /// Entities with the outcome (`a + c`).
    pub fn outcome_total(&self) -> u64 {
        self.a + self.c
    }

    /// Entities without the outcome (`b + d`).
    pub fn no_outcome_total(&self) -> u64 {
        self.b + self.d
    }

    /// True when any row or column total is zero.
    pub fn has_empty_margin(&self) -> bool {
        self.feature_total() == 0
            || self.no_feature_total() == 0
            || self.outcome_total() == 0
            || self.no_outcome_total() == 0
    }

    /// The table obtained by swapping which category counts as "positive" on
    /// both axes at once.
    pub fn swapped(&self) -> Self {
        Self::new(self.d, self.c, self.b, self.a)
    }
}

impl Default for ContingencyTable {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(counts: &[(Option<bool>, Option<bool>, usize)]) -> Vec<(Option<bool>, Option<bool>)> {
        counts
            .iter()
            .flat_map(|&(f, o, n)| std::iter::repeat_n((f, o), n))
            .collect()
    }

    #[test]
    fn cells_follow_boolean_equality() {
        let obs = pairs(&[
            (Some(true), Some(true), 30),
            (Some(true), Some(false), 18),
            (Some(false), Some(true), 16),
            (Some(false), Some(false), 65),
        ]);
        let tally = ContingencyTable::from_observations(obs).unwrap();
        assert_eq!(tally.table, ContingencyTable::new(30, 18, 16, 65));
        assert_eq!(tally.dropped, 0);
        assert_eq!(tally.table.total(), 129);
    }

    #[test]
    fn missing_values_are_dropped_not_coerced() {
        let obs = pairs(&[
            (Some(true), Some(true), 2),
            (None, Some(true), 3),
            (Some(false), None, 4),
            (None, None, 1),
            (Some(false), Some(false), 5),
        ]);
        let tally = ContingencyTable::from_observations(obs).unwrap();
        assert_eq!(tally.table, ContingencyTable::new(2, 0, 0, 5));
        assert_eq!(tally.dropped, 8);
        assert_eq!(tally.table.total() as usize + tally.dropped, 15);
    }

    #[test]
    fn order_of_records_is_irrelevant() {
        let mut obs = pairs(&[
            (Some(true), Some(false), 3),
            (Some(false), Some(true), 2),
            (None, Some(true), 1),
            (Some(true), Some(true), 4),
        ]);
        let forward = ContingencyTable::from_observations(obs.clone()).unwrap();
        obs.reverse();
        let backward = ContingencyTable::from_observations(obs).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_after_exclusion_is_invalid_input() {
        let obs = pairs(&[(None, Some(true), 2), (Some(true), None, 1)]);
        match ContingencyTable::from_observations(obs) {
            Err(InvalidInputError::EmptyAfterExclusion { dropped }) => assert_eq!(dropped, 3),
            other => panic!("expected EmptyAfterExclusion, got {other:?}"),
        }
        assert!(matches!(
            ContingencyTable::from_observations(Vec::new()),
            Err(InvalidInputError::EmptyAfterExclusion { dropped: 0 })
        ));
    }

    #[test]
    fn margins_and_symmetries() {
        let t = ContingencyTable::new(1, 2, 3, 4);
        assert_eq!(t.feature_total(), 3);
        assert_eq!(t.no_feature_total(), 7);
        assert_eq!(t.outcome_total(), 4);
        assert_eq!(t.no_outcome_total(), 6);
        assert_eq!(t.swapped(), ContingencyTable::new(4, 3, 2, 1));
        assert_eq!(t.swapped().swapped(), t);
        assert!(!t.has_empty_margin());
        assert!(ContingencyTable::new(0, 0, 5, 10).has_empty_margin());
    }
}
