//! Behavioural detectors for transaction-risk scoring
//!
//! Five stateless analyses over per-customer transaction slices (weight for
//! anti-structuring, entropy, predictability, trust and statistical), plus
//! the shared data model. The scoring engine combines their results into a
//! suspicion score; nothing in this crate performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entropy;
pub mod predictability;
pub mod statistical;
pub mod stats;
pub mod trust;
pub mod types;
pub mod weight;

mod cluster;

pub use entropy::EntropyDetector;
pub use predictability::PredictabilityDetector;
pub use statistical::StatisticalAnalyzer;
pub use trust::TrustScoreCalculator;
pub use types::*;
pub use weight::WeightDetector;
