//! # Stratified Analysis
//!
//! Confounder control by stratification: entities are split on the value of a
//! third column (e.g. protein length bin or organism), each stratum gets its own
//! table and exact test, and the strata are pooled with the Mantel–Haenszel
//! odds ratio
//!
//! `OR_MH = Σ (aᵢ·dᵢ / nᵢ) / Σ (bᵢ·cᵢ / nᵢ)`
//!
//! A stratum that cannot be analysed (nothing left after exclusion, or a 0/0
//! odds ratio) is reported as such and still contributes whatever cells it has
//! to the pooled estimate.

use log::{info, warn};
use natord::compare;
use std::collections::HashMap;

use crate::analysis::{AssociationResult, analyze};
use crate::data::Observation;
use crate::error::{AnalysisError, UndefinedStatisticError};
use crate::exact::Alternative;
use crate::odds::{OddsRatio, ratio_of};
use crate::table::ContingencyTable;

/// Per-stratum outcome.
#[derive(Debug)]
pub struct StratumResult {
    pub label: String,
    /// Number of records carrying this stratum label, complete or not.
    pub records: usize,
    pub outcome: Result<AssociationResult, AnalysisError>,
}

impl StratumResult {
    /// The cells counted for this stratum, when counting succeeded.
    pub fn table(&self) -> Option<ContingencyTable> {
        match &self.outcome {
            Ok(result) => Some(result.table),
            Err(err) => err.table().copied(),
        }
    }
}

#[derive(Debug)]
pub struct StratifiedResult {
    /// The unstratified analysis over every record with a stratum label.
    pub crude: AssociationResult,
    pub strata: Vec<StratumResult>,
    pub mantel_haenszel: Result<OddsRatio, UndefinedStatisticError>,
    /// Records excluded because the stratum label itself was missing.
    pub unlabelled: usize,
}

/// Pools per-stratum tables into the Mantel–Haenszel odds ratio.
///
/// Empty strata carry no weight. The returned error holds the summed table.
pub fn mantel_haenszel(tables: &[ContingencyTable]) -> Result<OddsRatio, UndefinedStatisticError> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut pooled = ContingencyTable::default();
    for table in tables {
        pooled = ContingencyTable::new(
            pooled.a + table.a,
            pooled.b + table.b,
            pooled.c + table.c,
            pooled.d + table.d,
        );
        let n = table.total() as f64;
        if n == 0.0 {
            continue;
        }
        numerator += (table.a as f64) * (table.d as f64) / n;
        denominator += (table.b as f64) * (table.c as f64) / n;
    }
    ratio_of(numerator, denominator, &pooled)
}

/// Analyses `observations` within each stratum given by `labels`.
///
/// `labels` runs parallel to `observations`. Fails only when the crude
/// analysis over all labelled records fails.
pub fn analyze_stratified(
    observations: &[Observation],
    labels: &[Option<String>],
    alternative: Alternative,
) -> Result<StratifiedResult, AnalysisError> {
    let mut groups: HashMap<&str, Vec<Observation>> = HashMap::new();
    let mut unlabelled = 0usize;
    for (obs, label) in observations.iter().zip(labels) {
        match label {
            Some(label) => groups.entry(label.as_str()).or_default().push(obs.clone()),
            None => unlabelled += 1,
        }
    }
    if unlabelled > 0 {
        warn!("Excluded {unlabelled} record(s) with a missing stratum label");
    }

    let labelled: Vec<Observation> = groups.values().flatten().cloned().collect();
    let crude = analyze(&labelled, alternative)?;

    let mut ordered: Vec<(&str, Vec<Observation>)> = groups.into_iter().collect();
    ordered.sort_by(|(x, _), (y, _)| compare(x, y));

    let strata: Vec<StratumResult> = ordered
        .into_iter()
        .map(|(label, members)| {
            let outcome = analyze(&members, alternative);
            if let Err(err) = &outcome {
                warn!("Stratum '{label}' could not be analysed: {err}");
            }
            StratumResult {
                label: label.to_string(),
                records: members.len(),
                outcome,
            }
        })
        .collect();

    let tables: Vec<ContingencyTable> = strata.iter().filter_map(StratumResult::table).collect();
    let mantel_haenszel = mantel_haenszel(&tables);
    match &mantel_haenszel {
        Ok(or) => info!(
            "Mantel-Haenszel odds ratio over {} strata: {or:.4} (crude {:.4})",
            strata.len(),
            crude.odds_ratio
        ),
        Err(err) => warn!("{err}"),
    }

    Ok(StratifiedResult {
        crude,
        strata,
        mantel_haenszel,
        unlabelled,
    })
}
