//! Pipeline module - binning, encoding and imbalance handling for churn data

pub mod binning;
pub mod config;
pub mod encoding;
pub mod error;
pub mod evaluation;
pub mod experiment;
pub mod loader;
pub mod preprocess;
pub mod resampling;
pub mod schema;
pub mod split;
pub mod target;
pub mod weights;

pub use binning::{
    BalanceBoundaries, BinOutput, BinningState, CategoryCodes, FeatureBinner, FixedBins,
    AGE_BINS, CREDIT_SCORE_BINS, TENURE_BINS, UNKNOWN_CATEGORY_CODE,
};
pub use config::ExperimentConfig;
pub use encoding::OneHotEncoder;
pub use error::{PrepError, Result};
pub use evaluation::*;
pub use experiment::*;
pub use loader::*;
pub use preprocess::{FeatureMatrix, ModelFamily, PreprocessPipeline};
pub use resampling::{class_counts, ResampleResult, ResamplingMethod};
pub use split::*;
pub use target::*;
pub use weights::*;
