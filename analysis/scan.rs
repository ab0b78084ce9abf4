//! # Feature Scan
//!
//! Tests many candidate feature columns against one outcome and controls the
//! false discovery rate across them with Benjamini–Hochberg q-values.
//! Features whose odds ratio is undefined stay in the report but are not part
//! of the multiple-testing family.

use itertools::Itertools;
use log::{info, warn};
use polars::prelude::DataFrame;
use std::cmp::Ordering;

use crate::analysis::{AssociationResult, analyze};
use crate::data::{Observation, extract_bool_column, extract_entity_ids};
use crate::error::{AnalysisError, InvalidInputError};
use crate::exact::Alternative;

#[derive(Debug)]
pub struct FeatureResult {
    pub feature: String,
    pub outcome: Result<AssociationResult, AnalysisError>,
    /// Benjamini–Hochberg adjusted p-value, when the feature was testable.
    pub q_value: Option<f64>,
}

impl FeatureResult {
    pub fn p_value(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|r| r.p_value)
    }
}

/// Benjamini–Hochberg step-up adjustment, returned in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let order: Vec<usize> = (0..m)
        .sorted_by(|&i, &j| {
            p_values[i]
                .partial_cmp(&p_values[j])
                .unwrap_or(Ordering::Equal)
        })
        .collect();

    let mut adjusted = vec![0.0; m];
    let mut running_min = 1.0f64;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let scaled = p_values[idx] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        adjusted[idx] = running_min;
    }
    adjusted
}

/// Runs the association analysis for every feature against `outcome`.
///
/// Input errors (missing or non-boolean columns, bad ids) abort the scan.
/// Results are sorted by ascending p-value; untestable features go last.
pub fn scan_features(
    df: &DataFrame,
    features: &[String],
    outcome: &str,
    id_column: Option<&str>,
    alternative: Alternative,
) -> Result<Vec<FeatureResult>, InvalidInputError> {
    let outcomes = extract_bool_column(df, outcome)?;
    let ids: Vec<Option<String>> = match id_column {
        Some(col) => extract_entity_ids(df, col)?.into_iter().map(Some).collect(),
        None => vec![None; df.height()],
    };

    let mut results = Vec::with_capacity(features.len());
    for feature in features {
        let flags = extract_bool_column(df, feature)?;
        let observations: Vec<Observation> = ids
            .iter()
            .zip(&flags)
            .zip(&outcomes)
            .map(|((id, &f), &o)| Observation::new(id.clone(), f, o))
            .collect();
        let outcome = analyze(&observations, alternative);
        if let Err(err) = &outcome {
            warn!("Feature '{feature}' could not be tested: {err}");
        }
        results.push(FeatureResult {
            feature: feature.clone(),
            outcome,
            q_value: None,
        });
    }

    let tested: Vec<usize> = (0..results.len())
        .filter(|&i| results[i].p_value().is_some())
        .collect();
    let p_values: Vec<f64> = tested.iter().filter_map(|&i| results[i].p_value()).collect();
    for (&i, q) in tested.iter().zip(benjamini_hochberg(&p_values)) {
        results[i].q_value = Some(q);
    }
    info!(
        "Scanned {} feature(s) against '{outcome}'; {} testable",
        results.len(),
        tested.len()
    );

    results.sort_by(|x, y| match (x.p_value(), y.p_value()) {
        (Some(px), Some(py)) => px
            .partial_cmp(&py)
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.feature.cmp(&y.feature)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => x.feature.cmp(&y.feature),
    });
    Ok(results)
}
