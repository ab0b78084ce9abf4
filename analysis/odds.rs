//! Odds ratio `(a·d) / (b·c)` with explicit handling of zero cells.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UndefinedStatisticError;
use crate::table::ContingencyTable;

/// A finite, non-negative odds ratio or the infinite sentinel.
///
/// `Infinite` arises when `b·c = 0` while `a·d > 0` and must be handled by
/// callers as its own case rather than as a very large number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OddsRatio {
    Finite(f64),
    Infinite,
}

impl OddsRatio {
    pub fn is_infinite(&self) -> bool {
        matches!(self, OddsRatio::Infinite)
    }

    /// The ratio as a float; the sentinel maps to `f64::INFINITY`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            OddsRatio::Finite(value) => value,
            OddsRatio::Infinite => f64::INFINITY,
        }
    }
}

impl fmt::Display for OddsRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddsRatio::Finite(value) => match f.precision() {
                Some(p) => write!(f, "{value:.p$}"),
                None => write!(f, "{value}"),
            },
            OddsRatio::Infinite => f.write_str("inf"),
        }
    }
}

/// Computes the odds ratio of `table`.
///
/// Products are formed exactly in `u128` before the single division.
pub fn odds_ratio(table: &ContingencyTable) -> Result<OddsRatio, UndefinedStatisticError> {
    let numerator = u128::from(table.a) * u128::from(table.d);
    let denominator = u128::from(table.b) * u128::from(table.c);
    ratio_of(numerator as f64, denominator as f64, table)
}

/// Shared zero-handling for any `numerator / denominator` odds ratio.
pub(crate) fn ratio_of(
    numerator: f64,
    denominator: f64,
    table: &ContingencyTable,
) -> Result<OddsRatio, UndefinedStatisticError> {
    match (numerator == 0.0, denominator == 0.0) {
        (true, true) => Err(UndefinedStatisticError {
            table: *table,
            reason: "both a·d and b·c are zero, so a row or column margin is empty",
        }),
        (false, true) => Ok(OddsRatio::Infinite),
        (true, false) => Ok(OddsRatio::Finite(0.0)),
        (false, false) => Ok(OddsRatio::Finite(numerator / denominator)),
    }
}
