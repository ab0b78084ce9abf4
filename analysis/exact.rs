//! # Exact Association Test
//!
//! Fisher's exact test for a 2×2 table. Conditioning on both margins, the
//! `a` cell follows a hypergeometric distribution:
//!
//! `P(X = x) = C(r1, x) · C(r2, c1 − x) / C(n, c1)` for
//! `x ∈ [max(0, c1 − r2), min(r1, c1)]`
//!
//! where `r1 = a + b`, `r2 = c + d`, `c1 = a + c`. The two-sided p-value is the
//! total probability of every support point that is no more likely than the
//! observed one. Tails are summed directly over the support, never doubled,
//! because skewed margins make them asymmetric.
//!
//! All terms are evaluated as log-probabilities and combined with
//! log-sum-exp, so margins in the tens of thousands neither overflow nor
//! underflow to a spurious zero.

use log::debug;
use serde::{Deserialize, Serialize};
use statrs::function::factorial::ln_binomial;
use std::fmt;

use crate::table::ContingencyTable;

/// Relative slack when comparing a support point against the observed
/// probability. Ties computed along different paths differ in the last bits.
const TIE_RELATIVE_TOLERANCE: f64 = 1e-7;

/// Alternative hypothesis of the exact test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Any departure from independence.
    #[default]
    TwoSided,
    /// Odds ratio below one (`P(X ≤ a)`).
    Less,
    /// Odds ratio above one (`P(X ≥ a)`).
    Greater,
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Less => "less",
            Alternative::Greater => "greater",
        })
    }
}

/// The hypergeometric law of the `a` cell given the table's margins.
struct ConditionalLaw {
    row_feature: u64,
    row_no_feature: u64,
    col_outcome: u64,
    low: u64,
    high: u64,
}

impl ConditionalLaw {
    fn of(table: &ContingencyTable) -> Self {
        let row_feature = table.feature_total();
        let row_no_feature = table.no_feature_total();
        let col_outcome = table.outcome_total();
        Self {
            row_feature,
            row_no_feature,
            col_outcome,
            low: col_outcome.saturating_sub(row_no_feature),
            high: row_feature.min(col_outcome),
        }
    }

    /// Log-probability up to the shared `−ln C(n, c1)` term.
    fn ln_weight(&self, x: u64) -> f64 {
        ln_binomial(self.row_feature, x) + ln_binomial(self.row_no_feature, self.col_outcome - x)
    }

    fn support(&self) -> impl Iterator<Item = u64> + '_ {
        self.low..=self.high
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Exact p-value for independence of feature and outcome in `table`.
///
/// Tables whose margins admit a single configuration give `1.0`.
pub fn fisher_exact(table: &ContingencyTable, alternative: Alternative) -> f64 {
    let law = ConditionalLaw::of(table);
    if law.low == law.high {
        return 1.0;
    }

    let observed = law.ln_weight(table.a);
    let weights: Vec<(u64, f64)> = law.support().map(|x| (x, law.ln_weight(x))).collect();
    let all: Vec<f64> = weights.iter().map(|&(_, w)| w).collect();

    let cutoff = observed + TIE_RELATIVE_TOLERANCE.ln_1p();
    let selected: Vec<f64> = weights
        .iter()
        .filter(|&&(x, w)| match alternative {
            Alternative::TwoSided => w <= cutoff,
            Alternative::Less => x <= table.a,
            Alternative::Greater => x >= table.a,
        })
        .map(|&(_, w)| w)
        .collect();

    let p_value = (log_sum_exp(&selected) - log_sum_exp(&all)).exp();
    debug!(
        "Exact test ({alternative}) over support [{}, {}]: {} of {} configurations selected, p = {p_value:e}",
        law.low,
        law.high,
        selected.len(),
        all.len()
    );

    p_value.clamp(0.0, 1.0)
}
