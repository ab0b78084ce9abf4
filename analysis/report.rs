//! Rendering of results for people (aligned text) and for scripts (TOML, TSV).
//!
//! Nothing here feeds back into the statistics.

use serde::Serialize;
use std::fmt;
use std::io::Write;
use thiserror::Error;

use crate::analysis::AssociationResult;
use crate::error::AnalysisError;
use crate::exact::Alternative;
use crate::scan::FeatureResult;
use crate::strata::{StratifiedResult, StratumResult};
use crate::table::ContingencyTable;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize results to TOML format: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Failed to write tabular results: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Toml,
    Tsv,
}

/// Column names used to label rows and columns of a rendered table.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    pub feature: &'a str,
    pub outcome: &'a str,
}

impl Default for Labels<'_> {
    fn default() -> Self {
        Self {
            feature: "feature",
            outcome: "outcome",
        }
    }
}

pub fn render_table(table: &ContingencyTable, labels: Labels<'_>) -> String {
    let no_feature = format!("not {}", labels.feature);
    let no_outcome = format!("not {}", labels.outcome);
    let width = labels.feature.len().max(no_feature.len()).max(5);
    let cell = labels.outcome.len().max(no_outcome.len()).max(8);

    let mut out = String::new();
    let rows = [
        ("", labels.outcome.to_string(), no_outcome, "total".to_string()),
        (
            labels.feature,
            table.a.to_string(),
            table.b.to_string(),
            table.feature_total().to_string(),
        ),
        (
            no_feature.as_str(),
            table.c.to_string(),
            table.d.to_string(),
            table.no_feature_total().to_string(),
        ),
        (
            "total",
            table.outcome_total().to_string(),
            table.no_outcome_total().to_string(),
            table.total().to_string(),
        ),
    ];
    for (head, x, y, total) in rows {
        out.push_str(&format!(
            "{head:<width$}  {x:>cell$}  {y:>cell$}  {total:>cell$}\n"
        ));
    }
    out
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_table(self, Labels::default()))
    }
}

fn summary_lines(result: &AssociationResult) -> String {
    format!(
        "odds ratio: {:.4}\np-value ({}): {:.4e}\ndropped records: {}\n",
        result.odds_ratio, result.alternative, result.p_value, result.dropped
    )
}

impl fmt::Display for AssociationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.table, summary_lines(self))
    }
}

pub fn render_association(result: &AssociationResult, labels: Labels<'_>) -> String {
    format!("{}{}", render_table(&result.table, labels), summary_lines(result))
}

pub fn render_stratified(result: &StratifiedResult, labels: Labels<'_>, stratum: &str) -> String {
    let mut out = format!(
        "crude (all strata pooled)\n{}",
        render_association(&result.crude, labels)
    );
    for s in &result.strata {
        out.push_str(&format!("\n{stratum} = {} ({} records)\n", s.label, s.records));
        match &s.outcome {
            Ok(r) => out.push_str(&render_association(r, labels)),
            Err(err) => {
                if let Some(table) = err.table() {
                    out.push_str(&render_table(table, labels));
                }
                out.push_str(&format!("not analysable: {err}\n"));
            }
        }
    }
    let pooled = match &result.mantel_haenszel {
        Ok(or) => format!("{or:.4}"),
        Err(err) => format!("undefined ({})", err.reason),
    };
    out.push_str(&format!("\nMantel-Haenszel odds ratio: {pooled}\n"));
    if result.unlabelled > 0 {
        out.push_str(&format!(
            "records without a {stratum} value: {}\n",
            result.unlabelled
        ));
    }
    out
}

pub fn render_scan(results: &[FeatureResult], outcome: &str) -> String {
    let width = results
        .iter()
        .map(|r| r.feature.len())
        .max()
        .unwrap_or(0)
        .max("feature".len());
    let mut out = format!("outcome: {outcome}\n");
    out.push_str(&format!(
        "{:<width$}  {:>6}  {:>6}  {:>6}  {:>6}  {:>10}  {:>10}  {:>10}\n",
        "feature", "a", "b", "c", "d", "odds ratio", "p-value", "q-value"
    ));
    for r in results {
        let record = ResultRecord::from_feature(r, outcome);
        let or = record
            .odds_ratio
            .map_or_else(|| "undefined".to_string(), |v| format!("{v:.4}"));
        let p = record.p_value.map_or_else(|| "-".to_string(), |v| format!("{v:.3e}"));
        let q = record.q_value.map_or_else(|| "-".to_string(), |v| format!("{v:.3e}"));
        out.push_str(&format!(
            "{:<width$}  {:>6}  {:>6}  {:>6}  {:>6}  {or:>10}  {p:>10}  {q:>10}\n",
            r.feature,
            cell_text(record.a),
            cell_text(record.b),
            cell_text(record.c),
            cell_text(record.d),
        ));
    }
    out
}

fn cell_text(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Flat, machine-readable view of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord<'a> {
    pub feature: &'a str,
    pub outcome: &'a str,
    pub stratum: Option<&'a str>,
    pub status: &'static str,
    pub a: Option<u64>,
    pub b: Option<u64>,
    pub c: Option<u64>,
    pub d: Option<u64>,
    /// `inf` for the infinite sentinel; absent when undefined.
    pub odds_ratio: Option<f64>,
    pub p_value: Option<f64>,
    pub q_value: Option<f64>,
    pub alternative: Option<Alternative>,
    pub dropped_record_count: Option<usize>,
    pub message: Option<String>,
}

impl<'a> ResultRecord<'a> {
    pub fn from_outcome(
        outcome: &Result<AssociationResult, AnalysisError>,
        labels: Labels<'a>,
    ) -> Self {
        let mut record = ResultRecord {
            feature: labels.feature,
            outcome: labels.outcome,
            stratum: None,
            status: "ok",
            a: None,
            b: None,
            c: None,
            d: None,
            odds_ratio: None,
            p_value: None,
            q_value: None,
            alternative: None,
            dropped_record_count: None,
            message: None,
        };
        let table = match outcome {
            Ok(result) => {
                record.odds_ratio = Some(result.odds_ratio.as_f64());
                record.p_value = Some(result.p_value);
                record.alternative = Some(result.alternative);
                record.dropped_record_count = Some(result.dropped);
                Some(result.table)
            }
            Err(err) => {
                record.status = match err {
                    AnalysisError::UndefinedStatistic(_) => "undefined",
                    AnalysisError::InvalidInput(_) => "invalid",
                };
                record.message = Some(err.to_string());
                err.table().copied()
            }
        };
        if let Some(t) = table {
            record.a = Some(t.a);
            record.b = Some(t.b);
            record.c = Some(t.c);
            record.d = Some(t.d);
        }
        record
    }

    fn from_feature(result: &'a FeatureResult, outcome: &'a str) -> Self {
        let mut record = Self::from_outcome(
            &result.outcome,
            Labels {
                feature: &result.feature,
                outcome,
            },
        );
        record.q_value = result.q_value;
        record
    }
}

#[derive(Serialize)]
struct AssociationDocument<'a> {
    result: ResultRecord<'a>,
}

#[derive(Serialize)]
struct StratumRecord<'a> {
    records: usize,
    result: ResultRecord<'a>,
}

#[derive(Serialize)]
struct StratifiedDocument<'a> {
    stratify_by: &'a str,
    mantel_haenszel_odds_ratio: Option<f64>,
    unlabelled_record_count: usize,
    crude: ResultRecord<'a>,
    strata: Vec<StratumRecord<'a>>,
}

#[derive(Serialize)]
struct ScanDocument<'a> {
    features: Vec<ResultRecord<'a>>,
}

pub fn association_toml(
    result: &AssociationResult,
    labels: Labels<'_>,
) -> Result<String, ReportError> {
    let document = AssociationDocument {
        result: ResultRecord::from_outcome(&Ok(*result), labels),
    };
    Ok(toml::to_string_pretty(&document)?)
}

pub fn stratified_toml(
    result: &StratifiedResult,
    labels: Labels<'_>,
    stratum: &str,
) -> Result<String, ReportError> {
    let document = StratifiedDocument {
        stratify_by: stratum,
        mantel_haenszel_odds_ratio: result.mantel_haenszel.as_ref().ok().map(|or| or.as_f64()),
        unlabelled_record_count: result.unlabelled,
        crude: ResultRecord::from_outcome(&Ok(result.crude), labels),
        strata: result
            .strata
            .iter()
            .map(|s| StratumRecord {
                records: s.records,
                result: stratum_record(s, labels),
            })
            .collect(),
    };
    Ok(toml::to_string_pretty(&document)?)
}

fn stratum_record<'a>(stratum: &'a StratumResult, labels: Labels<'a>) -> ResultRecord<'a> {
    let mut record = ResultRecord::from_outcome(&stratum.outcome, labels);
    record.stratum = Some(&stratum.label);
    record
}

pub fn scan_toml(results: &[FeatureResult], outcome: &str) -> Result<String, ReportError> {
    let document = ScanDocument {
        features: results
            .iter()
            .map(|r| ResultRecord::from_feature(r, outcome))
            .collect(),
    };
    Ok(toml::to_string_pretty(&document)?)
}

/// Writes records as tab-separated values with a header row.
pub fn write_tsv<'a, W, I>(writer: W, records: I) -> Result<(), ReportError>
where
    W: Write,
    I: IntoIterator<Item = ResultRecord<'a>>,
{
    let mut out = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for record in records {
        out.serialize(record)?;
    }
    out.flush()?;
    Ok(())
}

pub fn association_tsv<W: Write>(
    writer: W,
    result: &AssociationResult,
    labels: Labels<'_>,
) -> Result<(), ReportError> {
    write_tsv(writer, [ResultRecord::from_outcome(&Ok(*result), labels)])
}

/// The crude row (no stratum) followed by one row per stratum.
pub fn stratified_tsv<W: Write>(
    writer: W,
    result: &StratifiedResult,
    labels: Labels<'_>,
) -> Result<(), ReportError> {
    let crude = ResultRecord::from_outcome(&Ok(result.crude), labels);
    let strata = result.strata.iter().map(|s| stratum_record(s, labels));
    write_tsv(writer, std::iter::once(crude).chain(strata))
}

pub fn scan_tsv<W: Write>(
    writer: W,
    results: &[FeatureResult],
    outcome: &str,
) -> Result<(), ReportError> {
    write_tsv(writer, results.iter().map(|r| ResultRecord::from_feature(r, outcome)))
}
