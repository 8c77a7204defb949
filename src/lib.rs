//! churnprep: churn-model data preparation library
//!
//! Feature binning with learned state, per-family encoding (one-hot for
//! linear models, ordinal codes for tree models), stratified splitting,
//! class rebalancing (SMOTE, ADASYN and hybrids), sample weighting and
//! threshold-based evaluation.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
