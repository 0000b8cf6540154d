//! Risk profiles and classification

use chrono::NaiveDateTime;
use detector_core::types::{
    EntropyAnalysis, PredictabilityAnalysis, StatisticalAnalysis, TrustScoreAnalysis,
    WeightAnalysis,
};
use serde::{Deserialize, Serialize};

/// Composite suspicion score in the TP/SP point space, never negative
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SuspicionScore(f64);

impl SuspicionScore {
    /// Create a score, flooring at zero
    pub fn new(value: f64) -> Self {
        Self(value.max(0.0))
    }

    /// Raw score value
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Discretised risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Unremarkable, below 150 points
    Green,
    /// Mild findings, 150 to below 300 points
    Yellow,
    /// Elevated risk, 300 to below 500 points
    Orange,
    /// Strong suspicion, 500 points and above
    Red,
}

impl From<SuspicionScore> for RiskLevel {
    fn from(score: SuspicionScore) -> Self {
        let value = score.value();
        if value < 150.0 {
            RiskLevel::Green
        } else if value < 300.0 {
            RiskLevel::Yellow
        } else if value < 500.0 {
            RiskLevel::Orange
        } else {
            RiskLevel::Red
        }
    }
}

/// Complete per-customer risk profile
///
/// Analyses are `None` only on the default profile substituted for customers
/// that could not be analysed in batch mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Customer identifier
    pub customer_id: String,

    /// Customer display name, empty when unknown
    pub customer_name: String,

    /// Number of transactions in the analysed recent window
    pub total_transactions: usize,

    /// Summed amount of the analysed recent window in EUR
    pub total_amount: f64,

    /// Anti-structuring analysis
    pub weight_analysis: Option<WeightAnalysis>,

    /// Entropy analysis
    pub entropy_analysis: Option<EntropyAnalysis>,

    /// Behavioural-stability analysis
    pub predictability_analysis: Option<PredictabilityAnalysis>,

    /// Trust-score analysis (after the aggregator's penalty adjustment)
    pub trust_score_analysis: Option<TrustScoreAnalysis>,

    /// Supplementary statistical analysis
    pub statistical_analysis: Option<StatisticalAnalysis>,

    /// Composite suspicion score
    pub suspicion_score: SuspicionScore,

    /// Discretised risk level
    pub risk_level: RiskLevel,

    /// Human-readable findings, deterministic order
    pub flags: Vec<String>,

    /// Recommended operational actions
    pub recommendations: Vec<String>,

    /// When the analysis ran (the engine's reference clock)
    pub analyzed_at: NaiveDateTime,
}

impl RiskProfile {
    /// Default GREEN profile for a customer that could not be analysed
    pub fn default_green(customer_id: &str, analyzed_at: NaiveDateTime) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            customer_name: String::new(),
            total_transactions: 0,
            total_amount: 0.0,
            weight_analysis: None,
            entropy_analysis: None,
            predictability_analysis: None,
            trust_score_analysis: None,
            statistical_analysis: None,
            suspicion_score: SuspicionScore::new(0.0),
            risk_level: RiskLevel::Green,
            flags: Vec::new(),
            recommendations: Vec::new(),
            analyzed_at,
        }
    }
}

/// Per-band counts over a batch result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Customers classified GREEN
    pub green: usize,
    /// Customers classified YELLOW
    pub yellow: usize,
    /// Customers classified ORANGE
    pub orange: usize,
    /// Customers classified RED
    pub red: usize,
}

impl AnalysisSummary {
    /// Tally the risk levels of a batch
    pub fn from_profiles(profiles: &[RiskProfile]) -> Self {
        let mut summary = Self::default();
        for profile in profiles {
            match profile.risk_level {
                RiskLevel::Green => summary.green += 1,
                RiskLevel::Yellow => summary.yellow += 1,
                RiskLevel::Orange => summary.orange += 1,
                RiskLevel::Red => summary.red += 1,
            }
        }
        summary
    }
}
