//! Core types shared by all detectors

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment rail used by a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash deposit or payout at a branch
    #[serde(rename = "Cash", alias = "Bar")]
    Cash,
    /// SEPA credit transfer
    #[serde(rename = "SEPA")]
    Sepa,
    /// Credit or debit card
    #[serde(rename = "Card", alias = "Kreditkarte")]
    Card,
}

impl PaymentMethod {
    /// Stable wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Sepa => "SEPA",
            PaymentMethod::Card => "Card",
        }
    }
}

/// Direction of a transaction from the customer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money flowing into the product
    #[serde(rename = "investment")]
    Investment,
    /// Money flowing out to the customer
    #[serde(rename = "withdrawal", alias = "auszahlung")]
    Withdrawal,
}

/// A single financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Customer identifier
    pub customer_id: String,

    /// Transaction identifier, unique within a customer
    pub transaction_id: String,

    /// Customer display name
    pub customer_name: String,

    /// Amount in EUR, non-negative
    pub amount: Decimal,

    /// Payment rail
    pub payment_method: PaymentMethod,

    /// Direction
    pub transaction_type: TransactionType,

    /// Local date-time; absent timestamps are treated as "now" where a
    /// calendar day is required and skipped by time-based analyses
    pub timestamp: Option<NaiveDateTime>,
}

impl Transaction {
    /// Amount in f64 feature space for the statistical math
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }

    /// Cash investment, the side that matters for structuring detection
    pub fn is_cash_investment(&self) -> bool {
        self.payment_method == PaymentMethod::Cash
            && self.transaction_type == TransactionType::Investment
    }

    /// SEPA or card withdrawal, the bank-rail exit side of layering
    pub fn is_electronic_withdrawal(&self) -> bool {
        self.transaction_type == TransactionType::Withdrawal
            && matches!(self.payment_method, PaymentMethod::Sepa | PaymentMethod::Card)
    }
}

/// Optional per-customer context supplied out of band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Customer identifier
    pub customer_id: String,

    /// Declared source-of-funds cap in EUR, if the customer filed one
    pub source_of_funds: Option<Decimal>,

    /// Monthly income in EUR, if known
    pub monthly_income: Option<Decimal>,
}

/// Result of the anti-structuring weight analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAnalysis {
    /// Weight over the 7-day view
    pub weight_7d: f64,
    /// Weight over the 30-day view
    pub weight_30d: f64,
    /// Weight over the 90-day view
    pub weight_90d: f64,
    /// Z-score against the 7-day rolling baseline
    pub z_score_7d: f64,
    /// Z-score against the 30-day rolling baseline
    pub z_score_30d: f64,
    /// Z-score against the 90-day rolling baseline
    pub z_score_90d: f64,
    /// Structuring verdict
    pub is_suspicious: bool,
    /// Fraction of recent transactions below 2,000 EUR
    pub small_transaction_ratio: f64,
    /// Fraction of cash investments just under the 10,000 EUR reporting limit
    pub threshold_avoidance_ratio: f64,
    /// Cumulative sum of those near-limit transactions
    pub cumulative_large_amount: f64,
    /// Transactions per week over the actual recent span
    pub temporal_density_weeks: f64,
    /// Cumulative investments exceeded the declared source of funds
    pub source_of_funds_exceeded: bool,
    /// Near-limit cash volume implausible relative to the declared income
    pub economic_plausibility_issue: bool,
}

/// Result of the Shannon-entropy complexity analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyAnalysis {
    /// Entropy of the binned amount profile
    pub entropy_amount: f64,
    /// Entropy of the payment-method mix
    pub entropy_payment_method: f64,
    /// Entropy of the transaction-type mix
    pub entropy_transaction_type: f64,
    /// Entropy of the time-of-day / weekday pattern
    pub entropy_time: f64,
    /// Weighted aggregate entropy
    pub entropy_aggregate: f64,
    /// Z-score of the aggregate against the rolling historical baseline
    pub z_score: f64,
    /// Unusual complexity verdict
    pub is_complex: bool,
}

/// Result of the behavioural-stability analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictabilityAnalysis {
    /// Regularity of inter-arrival intervals, 0-1
    pub temporal_stability: f64,
    /// Consistency of amounts, 0-1
    pub amount_consistency: f64,
    /// Continuity of payment channels, 0-1
    pub channel_continuity: f64,
    /// Weighted overall predictability, 0-1
    pub overall_predictability: f64,
    /// Deviation from the historical predictability baseline
    pub z_score: f64,
    /// Stable behaviour (overall >= 0.7)
    pub is_stable: bool,
}

/// Result of the dynamic trust-score analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScoreAnalysis {
    /// Smoothed trust score, 0-1, higher means more trustworthy
    pub current_score: f64,
    /// Time-series predictability component, 0-1
    pub predictability: f64,
    /// Deviation from the customer's own historical pattern, 0-1
    pub self_deviation: f64,
    /// Deviation from the peer group, 0-1 (0 when peers are unavailable)
    pub peer_deviation: f64,
}

/// Result of the supplementary statistical analyses, all scores 0-1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalAnalysis {
    /// First-digit deviation from Benford's law
    pub benford_score: f64,
    /// Transaction velocity against absolute expectations
    pub velocity_score: f64,
    /// Off-hours, weekend and burst anomalies
    pub time_anomaly_score: f64,
    /// Distance from the nearest behavioural cluster centroid
    pub clustering_score: f64,
    /// Cash-to-bank layering pattern strength
    pub layering_score: f64,
}
