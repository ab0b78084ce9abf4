//! # Data Loading and Validation Module
//!
//! Reads delimited tables (CSV/TSV) with `polars` and turns caller-named
//! columns into boolean observations.
//!
//! - Everything is read as text first, so "True", "yes" and "1" in one column
//!   do not depend on polars' type inference. Frames built in memory with
//!   native Boolean, integer or float columns are accepted as well.
//! - Missing cells stay missing. Whether to drop them is decided by the table
//!   builder, which counts every exclusion.
//! - Any value that is neither a recognised boolean nor a missing marker is a
//!   user-input error, reported with its column and 1-based data row.

use log::{debug, info};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::error::InvalidInputError;

/// One entity with its (possibly missing) feature and outcome flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub entity_id: Option<String>,
    pub feature: Option<bool>,
    pub outcome: Option<bool>,
}

impl Observation {
    pub fn new(entity_id: Option<String>, feature: Option<bool>, outcome: Option<bool>) -> Self {
        Self {
            entity_id,
            feature,
            outcome,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.feature.is_some() && self.outcome.is_some()
    }
}

const MISSING_MARKERS: [&str; 6] = ["", "na", "n/a", "nan", "null", "none"];

/// Parses one textual cell. `Ok(None)` means missing, `Err(())` means unrecognised.
fn parse_bool_cell(raw: &str) -> Result<Option<bool>, ()> {
    let text = raw.trim().to_ascii_lowercase();
    if MISSING_MARKERS.contains(&text.as_str()) {
        return Ok(None);
    }
    match text.as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(Some(true)),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Ok(Some(false)),
        _ => Err(()),
    }
}

/// Resolves the field separator: an explicit setting wins, otherwise
/// `.tsv`/`.tab`/`.txt` files are tab-separated and everything else uses commas.
pub fn resolve_separator(path: &Path, configured: Option<&str>) -> Result<u8, InvalidInputError> {
    if let Some(text) = configured {
        return match text {
            "\\t" | "\t" | "tab" => Ok(b'\t'),
            _ if text.len() == 1 && text.is_ascii() => Ok(text.as_bytes()[0]),
            _ => Err(InvalidInputError::InvalidSeparator(text.to_string())),
        };
    }
    let tabbed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tsv" | "tab" | "txt"));
    Ok(if tabbed { b'\t' } else { b',' })
}

/// Reads a delimited file with a header row, every column as text.
pub fn load_frame(path: &Path, separator: u8) -> Result<DataFrame, InvalidInputError> {
    info!("Loading data from '{}'", path.display());
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;
    info!("Loaded {} rows and {} columns", df.height(), df.width());
    Ok(df)
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, InvalidInputError> {
    if !df.get_column_names().iter().any(|c| c.as_str() == name) {
        return Err(InvalidInputError::ColumnNotFound(name.to_string()));
    }
    Ok(df.column(name)?.as_materialized_series())
}

/// Extracts a boolean column, keeping missing cells as `None`.
pub fn extract_bool_column(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<Option<bool>>, InvalidInputError> {
    let series = require_column(df, name)?;
    let dtype = series.dtype();
    let non_boolean = |row: usize, value: String| InvalidInputError::NonBooleanValue {
        column: name.to_string(),
        row: row + 1,
        value,
    };

    let values: Vec<Option<bool>> = match dtype {
        DataType::Boolean => series.bool()?.into_iter().collect(),
        DataType::String => series
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(text) => parse_bool_cell(text).map_err(|()| non_boolean(row, text.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?,
        dt if dt.is_integer() => series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                Some(other) => Err(non_boolean(row, other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?,
        dt if dt.is_float() => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                None => Ok(None),
                Some(v) if v.is_nan() => Ok(None),
                Some(v) if v == 0.0 => Ok(Some(false)),
                Some(v) if v == 1.0 => Ok(Some(true)),
                Some(other) => Err(non_boolean(row, other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(InvalidInputError::ColumnWrongType {
                column_name: name.to_string(),
                expected_type: "boolean",
                found_type: format!("{other:?}"),
            });
        }
    };

    debug!("Column '{name}' read as boolean from {dtype:?}");
    Ok(values)
}

/// Extracts a column as text labels; missing cells and blank strings are `None`.
pub fn extract_label_column(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<Option<String>>, InvalidInputError> {
    let series = require_column(df, name)?;
    let text = series.cast(&DataType::String)?;
    let labels = text
        .str()?
        .into_iter()
        .map(|cell| {
            cell.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(labels)
}

/// Extracts entity ids, requiring every row to have one and no id to repeat.
pub fn extract_entity_ids(df: &DataFrame, name: &str) -> Result<Vec<String>, InvalidInputError> {
    let labels = extract_label_column(df, name)?;
    let mut seen = HashSet::with_capacity(labels.len());
    let mut ids = Vec::with_capacity(labels.len());
    for (row, label) in labels.into_iter().enumerate() {
        let id = label.ok_or_else(|| InvalidInputError::MissingEntityId {
            column: name.to_string(),
            row: row + 1,
        })?;
        if !seen.insert(id.clone()) {
            return Err(InvalidInputError::DuplicateEntity {
                column: name.to_string(),
                id,
            });
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Builds the observation set for one feature/outcome column pair.
pub fn observations_from_frame(
    df: &DataFrame,
    feature: &str,
    outcome: &str,
    id_column: Option<&str>,
) -> Result<Vec<Observation>, InvalidInputError> {
    let features = extract_bool_column(df, feature)?;
    let outcomes = extract_bool_column(df, outcome)?;
    let ids: Vec<Option<String>> = match id_column {
        Some(col) => extract_entity_ids(df, col)?.into_iter().map(Some).collect(),
        None => vec![None; df.height()],
    };

    Ok(ids
        .into_iter()
        .zip(features)
        .zip(outcomes)
        .map(|((id, f), o)| Observation::new(id, f, o))
        .collect())
}

/// Reads `path` and builds the observation set for the named columns.
pub fn load_observations(
    path: &Path,
    separator: u8,
    feature: &str,
    outcome: &str,
    id_column: Option<&str>,
) -> Result<Vec<Observation>, InvalidInputError> {
    let df = load_frame(path, separator)?;
    observations_from_frame(&df, feature, outcome, id_column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn create_test_file(content: &str, suffix: &str) -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        write!(file, "{content}")?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn parses_boolean_spellings_and_missing_markers() {
        for text in ["true", "True", "T", "yes", "Y", "1", " 1.0 "] {
            assert_eq!(parse_bool_cell(text), Ok(Some(true)), "{text}");
        }
        for text in ["false", "FALSE", "f", "No", "n", "0", "0.0"] {
            assert_eq!(parse_bool_cell(text), Ok(Some(false)), "{text}");
        }
        for text in ["", "NA", "nan", "NULL", "None", "n/a"] {
            assert_eq!(parse_bool_cell(text), Ok(None), "{text}");
        }
        assert_eq!(parse_bool_cell("maybe"), Err(()));
        assert_eq!(parse_bool_cell("2"), Err(()));
    }

    #[test]
    fn separator_resolution() {
        assert_eq!(resolve_separator(Path::new("x.tsv"), None).unwrap(), b'\t');
        assert_eq!(resolve_separator(Path::new("x.TSV"), None).unwrap(), b'\t');
        assert_eq!(resolve_separator(Path::new("x.csv"), None).unwrap(), b',');
        assert_eq!(resolve_separator(Path::new("x.csv"), Some("tab")).unwrap(), b'\t');
        assert_eq!(resolve_separator(Path::new("x.tsv"), Some(";")).unwrap(), b';');
        assert!(matches!(
            resolve_separator(Path::new("x.csv"), Some("::")),
            Err(InvalidInputError::InvalidSeparator(_))
        ));
    }

    #[test]
    fn loads_csv_with_missing_values() {
        let content = "gene,entangled,misfolded\n\
                       g1,True,True\n\
                       g2,False,\n\
                       g3,,True\n\
                       g4,yes,0\n";
        let file = create_test_file(content, ".csv").unwrap();
        let obs = load_observations(file.path(), b',', "entangled", "misfolded", Some("gene"))
            .unwrap();
        assert_eq!(obs.len(), 4);
        assert_eq!(obs[0], Observation::new(Some("g1".into()), Some(true), Some(true)));
        assert_eq!(obs[1].outcome, None);
        assert_eq!(obs[2].feature, None);
        assert_eq!(obs[3], Observation::new(Some("g4".into()), Some(true), Some(false)));
        assert_eq!(obs.iter().filter(|o| o.is_complete()).count(), 2);
    }

    #[test]
    fn loads_tsv_without_id_column() {
        let content = "entangled\tmisfolded\n1\t1\n0\t1\n";
        let file = create_test_file(content, ".tsv").unwrap();
        let obs = load_observations(file.path(), b'\t', "entangled", "misfolded", None).unwrap();
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.entity_id.is_none()));
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let content = "entangled,misfolded\n1,0\n";
        let file = create_test_file(content, ".csv").unwrap();
        let err = load_observations(file.path(), b',', "entangled", "aggregates", None)
            .unwrap_err();
        match err {
            InvalidInputError::ColumnNotFound(col) => assert_eq!(col, "aggregates"),
            other => panic!("Expected ColumnNotFound(aggregates), got {other:?}"),
        }
    }

    #[test]
    fn non_boolean_value_is_rejected_with_row() {
        let content = "entangled,misfolded\n1,0\n0,1\nsometimes,1\n";
        let file = create_test_file(content, ".csv").unwrap();
        let err = load_observations(file.path(), b',', "entangled", "misfolded", None)
            .unwrap_err();
        match err {
            InvalidInputError::NonBooleanValue { column, row, value } => {
                assert_eq!(column, "entangled");
                assert_eq!(row, 3);
                assert_eq!(value, "sometimes");
            }
            other => panic!("Expected NonBooleanValue, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_and_missing_entity_ids_are_rejected() {
        let dup = "gene,entangled,misfolded\ng1,1,0\ng1,0,1\n";
        let file = create_test_file(dup, ".csv").unwrap();
        let err = load_observations(file.path(), b',', "entangled", "misfolded", Some("gene"))
            .unwrap_err();
        assert!(matches!(err, InvalidInputError::DuplicateEntity { ref id, .. } if id == "g1"));

        let blank = "gene,entangled,misfolded\ng1,1,0\n,0,1\n";
        let file = create_test_file(blank, ".csv").unwrap();
        let err = load_observations(file.path(), b',', "entangled", "misfolded", Some("gene"))
            .unwrap_err();
        assert!(matches!(err, InvalidInputError::MissingEntityId { row: 2, .. }));
    }

    #[test]
    fn native_typed_frames_are_accepted() {
        let df = df!(
            "entangled" => [Some(true), Some(false), None],
            "misfolded" => [Some(1i64), Some(0), Some(1)],
            "score" => [Some(1.0f64), Some(f64::NAN), Some(0.0)],
        )
        .unwrap();
        let obs = observations_from_frame(&df, "entangled", "misfolded", None).unwrap();
        assert_eq!(obs[0].feature, Some(true));
        assert_eq!(obs[1].outcome, Some(false));
        assert_eq!(obs[2].feature, None);

        let score = extract_bool_column(&df, "score").unwrap();
        assert_eq!(score, vec![Some(true), None, Some(false)]);

        let bad = df!("count" => [0i64, 1, 2]).unwrap();
        assert!(matches!(
            extract_bool_column(&bad, "count"),
            Err(InvalidInputError::NonBooleanValue { row: 3, .. })
        ));
    }

    #[test]
    fn labels_trim_and_treat_blank_as_missing() {
        let df = df!("stratum" => [Some(" short "), Some(""), None, Some("long")]).unwrap();
        let labels = extract_label_column(&df, "stratum").unwrap();
        assert_eq!(
            labels,
            vec![Some("short".to_string()), None, None, Some("long".to_string())]
        );
    }
}
