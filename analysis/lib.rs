#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

//! Exact association testing for boolean feature/outcome observations.
//!
//! The pipeline is: tabular input, boolean extraction with missing-value
//! exclusion, 2×2 cross-tabulation, odds ratio, hypergeometric exact test.
//! Stratified (Mantel–Haenszel) analysis and multi-feature scans are built
//! from the same primitives.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod exact;
pub mod odds;
pub mod report;
pub mod scan;
pub mod strata;
pub mod table;

pub use analysis::{AssociationResult, analyze, analyze_table};
pub use error::{AnalysisError, InvalidInputError, UndefinedStatisticError};
pub use exact::{Alternative, fisher_exact};
pub use odds::{OddsRatio, odds_ratio};
pub use table::{ContingencyTable, Tally};
