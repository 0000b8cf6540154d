//! The scoring engine driver
//!
//! Owns the transaction store and the detectors, slices analysis windows,
//! fans out per customer and assembles risk profiles. Customers are
//! independent; the batch path analyses them in parallel and orders the
//! result by suspicion score.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info, warn};

use detector_core::types::{CustomerInfo, Transaction, TrustScoreAnalysis};
use detector_core::{
    EntropyDetector, PredictabilityDetector, StatisticalAnalyzer, TrustScoreCalculator,
    WeightDetector,
};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::flags;
use crate::profile::{RiskLevel, RiskProfile, SuspicionScore};
use crate::score;
use crate::store::TransactionStore;

/// Minimum number of peer transactions for the peer-deviation signal
const MIN_PEER_TRANSACTIONS: usize = 10;

/// Batch-oriented transaction-risk scoring engine
pub struct RiskEngine {
    config: EngineConfig,
    store: TransactionStore,
    weight_detector: WeightDetector,
    entropy_detector: EntropyDetector,
    predictability_detector: PredictabilityDetector,
    trust_calculator: TrustScoreCalculator,
    statistical_analyzer: StatisticalAnalyzer,
    reference_override: Option<NaiveDateTime>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default()).expect("default config is valid")
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: TransactionStore::new(),
            weight_detector: WeightDetector::new(),
            entropy_detector: EntropyDetector::new(),
            predictability_detector: PredictabilityDetector::new(),
            trust_calculator: TrustScoreCalculator::default(),
            statistical_analyzer: StatisticalAnalyzer::new(),
            reference_override: None,
        })
    }

    /// Pin the engine's clock, making analyses reproducible
    pub fn with_reference_time(mut self, now: NaiveDateTime) -> Self {
        self.reference_override = Some(now);
        self
    }

    /// Append transactions to the store, grouped by customer
    pub fn add_transactions(&mut self, transactions: Vec<Transaction>) {
        self.store.add_transactions(transactions);
    }

    /// Upsert per-customer context
    pub fn set_customer_info(&mut self, info: CustomerInfo) {
        self.store.set_customer_info(info);
    }

    /// Drop the trust-score history (start of a new analysis session)
    pub fn reset_session(&self) {
        self.trust_calculator.reset();
    }

    /// Analyse one customer over the given recent window
    ///
    /// `all_transactions` enables peer comparison and behavioural
    /// clustering; pass the full dataset for batch-equivalent results.
    /// Fails with [`Error::NoTransactionsInWindow`] when the recent slice
    /// is empty.
    pub fn analyze_customer(
        &self,
        customer_id: &str,
        recent_days: i64,
        all_transactions: Option<&[Transaction]>,
    ) -> Result<RiskProfile> {
        let reference = self.reference_time();

        let slices = self.store.window_slices(
            customer_id,
            recent_days,
            self.config.historical_days,
            reference,
        );
        if slices.recent.is_empty() {
            return Err(Error::NoTransactionsInWindow {
                customer_id: customer_id.to_string(),
            });
        }
        let recent = &slices.recent;
        let historical = &slices.historical;

        debug!(
            customer_id,
            recent = recent.len(),
            historical = historical.len(),
            "analyzing customer"
        );

        let customer_info = self.store.customer_info(customer_id);

        let weight_analysis =
            self.weight_detector
                .analyze(recent, historical, customer_info, reference);
        let entropy_analysis = self.entropy_detector.analyze(recent, historical);
        let predictability_analysis = self.predictability_detector.analyze(recent, historical);

        let peers = all_transactions.map(|all| self.peer_transactions(customer_id, recent, all));
        let peers = peers
            .as_deref()
            .filter(|p| p.len() >= MIN_PEER_TRANSACTIONS);

        let mut trust_analysis =
            self.trust_calculator
                .analyze(customer_id, recent, historical, peers);

        let statistical_analysis = self
            .statistical_analyzer
            .analyze(recent, all_transactions);

        // Findings from the other modules pull the reported trust score down
        self.apply_trust_penalty(
            &mut trust_analysis,
            &weight_analysis,
            &entropy_analysis,
            &statistical_analysis,
        );

        let raw_score = score::suspicion_score(
            &self.config,
            &weight_analysis,
            &entropy_analysis,
            &predictability_analysis,
            &statistical_analysis,
        );
        let suspicion_score = SuspicionScore::new(raw_score);
        let risk_level = RiskLevel::from(suspicion_score);

        let flag_list = flags::generate_flags(
            &weight_analysis,
            &entropy_analysis,
            &predictability_analysis,
            &trust_analysis,
            &statistical_analysis,
        );
        let recommendations = flags::generate_recommendations(risk_level, &flag_list);

        if matches!(risk_level, RiskLevel::Orange | RiskLevel::Red) {
            info!(
                customer_id,
                score = suspicion_score.value(),
                level = ?risk_level,
                flags = flag_list.len(),
                "elevated risk profile"
            );
        }

        let total_amount = recent
            .iter()
            .map(|t| t.amount)
            .sum::<rust_decimal::Decimal>()
            .to_f64()
            .unwrap_or(0.0);

        Ok(RiskProfile {
            customer_id: customer_id.to_string(),
            customer_name: recent[0].customer_name.clone(),
            total_transactions: recent.len(),
            total_amount,
            weight_analysis: Some(weight_analysis),
            entropy_analysis: Some(entropy_analysis),
            predictability_analysis: Some(predictability_analysis),
            trust_score_analysis: Some(trust_analysis),
            statistical_analysis: Some(statistical_analysis),
            suspicion_score,
            risk_level,
            flags: flag_list.iter().map(|f| f.to_string()).collect(),
            recommendations,
            analyzed_at: reference,
        })
    }

    /// Analyse every customer in the store
    ///
    /// Never fails per customer: a customer without transactions in the
    /// recent window receives a default GREEN profile. The result is sorted
    /// by suspicion score descending, customer id as tie-break.
    pub fn analyze_all_customers(&self, recent_days: i64) -> Vec<RiskProfile> {
        let reference = self.reference_time();
        let all_transactions = self.store.all_transactions();
        let customer_ids = self.store.customer_ids();

        info!(
            customers = customer_ids.len(),
            transactions = all_transactions.len(),
            "starting batch analysis"
        );

        let mut profiles: Vec<RiskProfile> = customer_ids
            .par_iter()
            .map(|customer_id| {
                match self.analyze_customer(customer_id, recent_days, Some(&all_transactions)) {
                    Ok(profile) => profile,
                    Err(Error::NoTransactionsInWindow { .. }) => {
                        debug!(%customer_id, "no recent transactions, default profile");
                        RiskProfile::default_green(customer_id, reference)
                    }
                    Err(err) => {
                        warn!(%customer_id, error = %err, "analysis failed, default profile");
                        RiskProfile::default_green(customer_id, reference)
                    }
                }
            })
            .collect();

        profiles.sort_by(|a, b| {
            b.suspicion_score
                .value()
                .total_cmp(&a.suspicion_score.value())
                .then_with(|| a.customer_id.cmp(&b.customer_id))
        });

        profiles
    }

    /// The instant all windows are measured against
    ///
    /// Datasets whose newest timestamp is older than the historical-mode
    /// threshold are analysed relative to their own end instead of the
    /// wall clock.
    pub fn reference_time(&self) -> NaiveDateTime {
        let now = self
            .reference_override
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        if self
            .store
            .is_historical_data(now, self.config.historical_mode_threshold_days)
        {
            self.store.latest_timestamp().unwrap_or(now)
        } else {
            now
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Peers are other customers whose transaction amounts sit within
    /// half to double this customer's mean
    fn peer_transactions(
        &self,
        customer_id: &str,
        recent: &[Transaction],
        all: &[Transaction],
    ) -> Vec<Transaction> {
        let amounts: Vec<f64> = recent.iter().map(|t| t.amount_f64()).collect();
        if amounts.is_empty() {
            return Vec::new();
        }
        let customer_mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
        if customer_mean <= 0.0 {
            return Vec::new();
        }

        all.iter()
            .filter(|t| t.customer_id != customer_id)
            .filter(|t| {
                let amount = t.amount_f64();
                amount >= 0.5 * customer_mean && amount <= 2.0 * customer_mean
            })
            .cloned()
            .collect()
    }

    /// Suspicious findings from the other modules reduce the reported trust
    /// score; the penalty is capped at 70%
    fn apply_trust_penalty(
        &self,
        trust: &mut TrustScoreAnalysis,
        weight: &detector_core::types::WeightAnalysis,
        entropy: &detector_core::types::EntropyAnalysis,
        statistics: &detector_core::types::StatisticalAnalysis,
    ) {
        let mut penalty: f64 = 0.0;

        if weight.is_suspicious {
            if weight.threshold_avoidance_ratio >= 0.5 {
                penalty += 0.3;
            } else if weight.threshold_avoidance_ratio >= 0.3 {
                penalty += 0.2;
            }
            if weight.cumulative_large_amount >= 50_000.0 {
                penalty += 0.2;
            }
            if weight.temporal_density_weeks > 1.0 {
                penalty += 0.2;
            }
        }

        if statistics.layering_score > 0.7 {
            penalty += 0.4;
        } else if statistics.layering_score > 0.5 {
            penalty += 0.3;
        } else if statistics.layering_score > 0.3 {
            penalty += 0.2;
        }

        if entropy.is_complex
            && (entropy.entropy_aggregate < 0.3 || entropy.entropy_aggregate > 2.0)
        {
            penalty += 0.2;
        }

        let penalty = penalty.min(0.7);
        trust.current_score = (trust.current_score * (1.0 - penalty)).clamp(0.0, 1.0);
    }
}
