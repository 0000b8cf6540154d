//! Dynamic trust score
//!
//! Scores how trustworthy a customer's behaviour looks: predictable
//! time-series behaviour raises the score, deviations from the customer's
//! own history and from the peer group lower it. Scores are smoothed over
//! time per customer, with the smoothing factor tightening as deviations
//! grow so that suspicious behaviour registers quickly.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::stats;
use crate::types::{Transaction, TrustScoreAnalysis};

/// Computes smoothed per-customer trust scores
///
/// The per-customer score history is the only mutable state in the whole
/// pipeline; it is sharded by customer id and reset at session start.
#[derive(Debug)]
pub struct TrustScoreCalculator {
    /// Baseline smoothing factor; higher means more inert
    beta: f64,
    previous_scores: DashMap<String, f64>,
}

impl Default for TrustScoreCalculator {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl TrustScoreCalculator {
    /// Create a calculator with the given baseline smoothing factor
    pub fn new(beta: f64) -> Self {
        Self {
            beta,
            previous_scores: DashMap::new(),
        }
    }

    /// Drop all per-customer score history (session start)
    pub fn reset(&self) {
        self.previous_scores.clear();
    }

    /// Full trust analysis for one customer
    pub fn analyze(
        &self,
        customer_id: &str,
        recent: &[Transaction],
        historical: &[Transaction],
        peers: Option<&[Transaction]>,
    ) -> TrustScoreAnalysis {
        let combined: Vec<Transaction> =
            historical.iter().chain(recent.iter()).cloned().collect();
        let predictability = self.predictability(&combined);

        let self_deviation = self.self_deviation(recent, historical);
        let peer_deviation = peers
            .map(|p| self.peer_deviation(recent, p))
            .unwrap_or(0.0);

        let current_score =
            self.update_score(customer_id, predictability, self_deviation, peer_deviation);

        TrustScoreAnalysis {
            current_score,
            predictability,
            self_deviation,
            peer_deviation,
        }
    }

    /// Time-series predictability from daily aggregates, 0-1
    pub fn predictability(&self, transactions: &[Transaction]) -> f64 {
        if transactions.len() < 5 {
            return 0.5;
        }

        let mut timestamped: Vec<&Transaction> =
            transactions.iter().filter(|t| t.timestamp.is_some()).collect();
        if timestamped.is_empty() {
            return 0.5;
        }
        timestamped.sort_by_key(|t| t.timestamp);

        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for txn in &timestamped {
            let day = txn.timestamp.expect("filtered above").date();
            *daily.entry(day).or_insert(0.0) += txn.amount_f64();
        }
        if daily.len() < 3 {
            return 0.5;
        }

        let daily_sums: Vec<f64> = daily.values().copied().collect();

        // 1. Variation of the daily volumes
        let cv_amount = stats::std_dev(&daily_sums) / (stats::mean(&daily_sums) + 1e-6);
        let cv_score = 1.0 / (1.0 + cv_amount);

        // 2. Regularity of the day-to-day gaps
        let dates: Vec<NaiveDate> = daily.keys().copied().collect();
        let intervals: Vec<f64> = dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days() as f64)
            .collect();
        let interval_score = if intervals.len() > 1 {
            let cv_intervals = stats::std_dev(&intervals) / (stats::mean(&intervals) + 1e-6);
            1.0 / (1.0 + cv_intervals)
        } else {
            0.5
        };

        // 3. How much of the variance a linear trend explains
        let trend_score = if daily.len() > 10 {
            1.0 - stats::detrended_variance_ratio(&daily_sums)
        } else {
            0.5
        };

        (cv_score * 0.4 + interval_score * 0.3 + trend_score * 0.3).clamp(0.0, 1.0)
    }

    /// Deviation from the customer's own historical pattern, 0-1
    pub fn self_deviation(&self, recent: &[Transaction], historical: &[Transaction]) -> f64 {
        if recent.is_empty() || historical.is_empty() {
            return 0.0;
        }

        let hist_amounts: Vec<f64> = historical.iter().map(|t| t.amount_f64()).collect();
        let hist_mean = stats::mean(&hist_amounts);
        let hist_std = stats::std_dev(&hist_amounts);

        let recent_amounts: Vec<f64> = recent.iter().map(|t| t.amount_f64()).collect();
        let recent_mean = stats::mean(&recent_amounts);

        // Mean-amount shift in baseline sigmas; a z of two is already severe
        let amount_z = if hist_std > 0.0 {
            ((recent_mean - hist_mean) / hist_std).abs()
        } else {
            0.0
        };
        let amount_deviation = (amount_z / 2.0).min(1.0);

        // Payment-method mix shift as a smoothed KL divergence
        let method_deviation =
            (self.payment_method_divergence(recent, historical) / 1.5).min(1.0);

        (amount_deviation * 0.6 + method_deviation * 0.4).clamp(0.0, 1.0)
    }

    /// Deviation of the customer's mean amount from the peer group, 0-1
    pub fn peer_deviation(&self, customer: &[Transaction], peers: &[Transaction]) -> f64 {
        if customer.is_empty() || peers.is_empty() {
            return 0.0;
        }

        let peer_amounts: Vec<f64> = peers.iter().map(|t| t.amount_f64()).collect();
        let peer_mean = stats::mean(&peer_amounts);
        let peer_std = stats::std_dev(&peer_amounts);

        let customer_amounts: Vec<f64> = customer.iter().map(|t| t.amount_f64()).collect();
        let customer_mean = stats::mean(&customer_amounts);

        let peer_z = if peer_std > 0.0 {
            ((customer_mean - peer_mean) / peer_std).abs()
        } else {
            0.0
        };
        (peer_z / 2.0).min(1.0)
    }

    /// Smoothed score update: T(t) = β_dyn · T(t−1) + (1−β_dyn) · T_new
    ///
    /// Deviations are penalised quadratically in T_new, and β_dyn shrinks as
    /// deviations grow so conspicuous behaviour shows quickly. Stores the
    /// result for the next observation of this customer.
    pub fn update_score(
        &self,
        customer_id: &str,
        predictability: f64,
        self_deviation: f64,
        peer_deviation: f64,
    ) -> f64 {
        let self_penalty = self_deviation * self_deviation;

        // A peer deviation of exactly zero usually means "no peers", which
        // is neutral information, not trustworthiness
        let t_new = if peer_deviation > 0.0 {
            let peer_penalty = peer_deviation * peer_deviation;
            0.25 * predictability + 0.50 * (1.0 - self_penalty) + 0.25 * (1.0 - peer_penalty)
        } else {
            0.20 * predictability + 0.80 * (1.0 - self_penalty)
        };

        let current = match self.previous_scores.get(customer_id) {
            Some(previous) => {
                let previous = *previous;
                let max_deviation = self_deviation.max(peer_deviation);
                let beta_dynamic = if max_deviation > 0.7 || t_new < 0.3 {
                    0.2
                } else if max_deviation > 0.5 || t_new < 0.4 {
                    0.3
                } else if max_deviation > 0.3 || t_new < 0.6 {
                    0.5
                } else {
                    self.beta
                };
                beta_dynamic * previous + (1.0 - beta_dynamic) * t_new
            }
            None => t_new,
        };

        let current = current.clamp(0.0, 1.0);
        self.previous_scores.insert(customer_id.to_string(), current);
        current
    }

    fn payment_method_divergence(&self, recent: &[Transaction], historical: &[Transaction]) -> f64 {
        let count = |txns: &[Transaction], method: &str| {
            txns.iter().filter(|t| t.payment_method.as_str() == method).count() as f64
        };

        let mut methods: Vec<&'static str> = Vec::new();
        for txn in recent.iter().chain(historical.iter()) {
            let name = txn.payment_method.as_str();
            if !methods.contains(&name) {
                methods.push(name);
            }
        }
        methods.sort_unstable();

        let recent_total = recent.len() as f64;
        let hist_total = historical.len() as f64;

        // Laplace smoothing with 0.01 mass for unseen categories
        let mut recent_probs: Vec<f64> = methods
            .iter()
            .map(|m| {
                let share = count(recent, m) / recent_total;
                if share > 0.0 {
                    share
                } else {
                    0.01
                }
            })
            .collect();
        let mut hist_probs: Vec<f64> = methods
            .iter()
            .map(|m| {
                let share = count(historical, m) / hist_total;
                if share > 0.0 {
                    share
                } else {
                    0.01
                }
            })
            .collect();

        let recent_sum: f64 = recent_probs.iter().sum();
        let hist_sum: f64 = hist_probs.iter().sum();
        for p in recent_probs.iter_mut() {
            *p /= recent_sum;
        }
        for p in hist_probs.iter_mut() {
            *p /= hist_sum;
        }

        recent_probs
            .iter()
            .zip(hist_probs.iter())
            .map(|(r, h)| r * ((r + 1e-10) / (h + 1e-10)).ln())
            .sum()
    }
}
