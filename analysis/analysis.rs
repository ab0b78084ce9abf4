//! One analysis run: observations → table → odds ratio → exact test.

use log::info;
use serde::{Deserialize, Serialize};

use crate::data::Observation;
use crate::error::{AnalysisError, InvalidInputError};
use crate::exact::{Alternative, fisher_exact};
use crate::odds::{OddsRatio, odds_ratio};
use crate::table::ContingencyTable;

/// The structured outcome of one feature/outcome analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationResult {
    pub table: ContingencyTable,
    pub odds_ratio: OddsRatio,
    pub p_value: f64,
    pub alternative: Alternative,
    /// Records excluded before counting because a value was missing.
    pub dropped: usize,
}

/// Runs the full analysis over an observation set.
///
/// Pure: the same observations always give a bit-identical result.
pub fn analyze(
    observations: &[Observation],
    alternative: Alternative,
) -> Result<AssociationResult, AnalysisError> {
    let tally = ContingencyTable::from_observations(
        observations.iter().map(|o| (o.feature, o.outcome)),
    )?;
    analyze_table(tally.table, tally.dropped, alternative)
}

/// Runs the statistics over an already tallied table.
///
/// An empty table is invalid input, exactly as when every record was excluded.
pub fn analyze_table(
    table: ContingencyTable,
    dropped: usize,
    alternative: Alternative,
) -> Result<AssociationResult, AnalysisError> {
    if table.total() == 0 {
        return Err(InvalidInputError::EmptyAfterExclusion { dropped }.into());
    }
    let odds_ratio = odds_ratio(&table)?;
    let p_value = fisher_exact(&table, alternative);
    info!(
        "n={} odds ratio={odds_ratio:.4} p={p_value:.3e} ({alternative})",
        table.total()
    );

    Ok(AssociationResult {
        table,
        odds_ratio,
        p_value,
        alternative,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn observations(a: usize, b: usize, c: usize, d: usize, missing: usize) -> Vec<Observation> {
        let mut out = Vec::new();
        let mut push = |feature, outcome, n: usize| {
            for _ in 0..n {
                let id = format!("P{:05}", out.len());
                out.push(Observation::new(Some(id), feature, outcome));
            }
        };
        push(Some(true), Some(true), a);
        push(Some(true), Some(false), b);
        push(Some(false), Some(true), c);
        push(Some(false), Some(false), d);
        push(None, Some(true), missing);
        out
    }

    #[test]
    fn entanglement_misfolding_example() {
        let obs = observations(30, 18, 16, 65, 4);
        let result = analyze(&obs, Alternative::TwoSided).unwrap();
        assert_eq!(result.table, ContingencyTable::new(30, 18, 16, 65));
        assert_eq!(result.dropped, 4);
        assert_eq!(result.odds_ratio, OddsRatio::Finite(1950.0 / 288.0));
        assert_relative_eq!(result.p_value, 1.4289472976299936e-06, max_relative = 1e-6);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let obs = observations(7, 2, 3, 8, 1);
        let first = analyze(&obs, Alternative::TwoSided).unwrap();
        let second = analyze(&obs, Alternative::TwoSided).unwrap();
        assert_eq!(first.p_value.to_bits(), second.p_value.to_bits());
        assert_eq!(
            first.odds_ratio.as_f64().to_bits(),
            second.odds_ratio.as_f64().to_bits()
        );
        assert_eq!(first, second);
    }

    #[test]
    fn infinite_odds_ratio_is_a_result_not_an_error() {
        let result = analyze_table(ContingencyTable::new(10, 0, 5, 10), 0, Alternative::TwoSided)
            .unwrap();
        assert!(result.odds_ratio.is_infinite());
        assert_relative_eq!(result.p_value, 0.0009648918856079981, max_relative = 1e-9);
    }

    #[test]
    fn no_featured_entities_is_undefined_with_cells_exposed() {
        let obs = observations(0, 0, 5, 10, 2);
        let err = analyze(&obs, Alternative::TwoSided).unwrap_err();
        match &err {
            AnalysisError::UndefinedStatistic(inner) => {
                assert_eq!(inner.table, ContingencyTable::new(0, 0, 5, 10));
            }
            other => panic!("expected UndefinedStatistic, got {other:?}"),
        }
        assert_eq!(err.table(), Some(&ContingencyTable::new(0, 0, 5, 10)));
    }

    #[test]
    fn all_incomplete_is_invalid_input() {
        let obs = observations(0, 0, 0, 0, 3);
        let err = analyze(&obs, Alternative::TwoSided).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidInput(InvalidInputError::EmptyAfterExclusion { dropped: 3 })
        ));
        assert!(err.table().is_none());
    }

    #[test]
    fn empty_table_is_invalid_input_not_undefined() {
        let err = analyze_table(ContingencyTable::default(), 2, Alternative::Less).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidInput(InvalidInputError::EmptyAfterExclusion { dropped: 2 })
        ));
    }
}
