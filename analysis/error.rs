//! Error taxonomy shared by the table builder, the statistics and the loaders.
//!
//! Two conditions are fatal for an analysis run: the input cannot yield a
//! usable observation set (`InvalidInputError`), or the odds ratio is 0/0
//! because a whole margin is empty (`UndefinedStatisticError`). Records with a
//! missing feature or outcome are not errors; they are excluded and counted.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::table::ContingencyTable;

#[derive(Error, Debug)]
pub enum InvalidInputError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' cannot be read as '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Column '{column}' has the non-boolean value '{value}' at data row {row}. Accepted values are true/false, t/f, yes/no, y/n and 1/0."
    )]
    NonBooleanValue {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Entity id column '{column}' is empty at data row {row}.")]
    MissingEntityId { column: String, row: usize },
    #[error("Entity id '{id}' appears more than once in column '{column}'.")]
    DuplicateEntity { column: String, id: String },
    #[error(
        "No complete records remain after excluding {dropped} record(s) with a missing feature or outcome value."
    )]
    EmptyAfterExclusion { dropped: usize },
    #[error("The field separator must be a single ASCII character, got '{0}'.")]
    InvalidSeparator(String),
}

/// The odds ratio is 0/0: one row or column margin of the table is zero.
///
/// The offending table travels with the error so callers can still report
/// the cells that were counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Odds ratio is undefined for table {table:?}: {reason}")]
pub struct UndefinedStatisticError {
    pub table: ContingencyTable,
    pub reason: &'static str,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    UndefinedStatistic(#[from] UndefinedStatisticError),
}

impl AnalysisError {
    /// The computed table, when the failure happened after counting.
    pub fn table(&self) -> Option<&ContingencyTable> {
        match self {
            AnalysisError::UndefinedStatistic(err) => Some(&err.table),
            AnalysisError::InvalidInput(_) => None,
        }
    }
}
