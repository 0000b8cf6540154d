//! Anti-structuring weight detector
//!
//! The weight variable composes log-scaled daily volume and daily frequency,
//! boosted on days where cash investments sit just under the 10,000 EUR
//! reporting limit and decayed exponentially by age. Absolute indicators
//! (threshold avoidance, temporal density, source-of-funds, economic
//! plausibility) back it up so structuring is caught even without a
//! historical baseline.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;

use crate::stats;
use crate::types::{CustomerInfo, Transaction, TransactionType, WeightAnalysis};

/// Detects structuring ("smurfing") patterns in a customer's cash flow
#[derive(Debug, Clone)]
pub struct WeightDetector {
    /// Exponential decay rate per day of age
    pub lambda_decay: f64,
    /// Upper bound for a "small" transaction in EUR
    pub small_transaction_threshold: f64,
    /// Lower edge of the near-limit band in EUR
    pub near_limit_min: f64,
    /// Upper edge of the near-limit band in EUR (the cash reporting limit)
    pub near_limit_max: f64,
    /// Cumulative near-limit volume regarded as structuring-scale
    pub structuring_cumulative_min: f64,
    /// Transactions per week of an ordinary saver (one per month)
    pub normal_saver_density: f64,
    /// Transactions per week regarded as suspicious
    pub smurfer_density: f64,
}

impl Default for WeightDetector {
    fn default() -> Self {
        Self {
            lambda_decay: 0.05,
            small_transaction_threshold: 2_000.0,
            near_limit_min: 7_000.0,
            near_limit_max: 10_000.0,
            structuring_cumulative_min: 50_000.0,
            normal_saver_density: 0.25,
            smurfer_density: 0.5,
        }
    }
}

struct DayAggregate {
    amount_sum: f64,
    count: usize,
    cash_investments: usize,
    near_limit_cash: usize,
}

impl WeightDetector {
    /// Create a detector with the default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Full weight analysis over a recent slice and its historical baseline
    ///
    /// The point-in-time weight is computed over the whole recent slice; the
    /// 7/30/90-day views share that value while their z-score baselines use
    /// rolling windows of the corresponding size.
    pub fn analyze(
        &self,
        recent: &[Transaction],
        historical: &[Transaction],
        info: Option<&CustomerInfo>,
        reference: NaiveDateTime,
    ) -> WeightAnalysis {
        let weight = self.window_weight(recent, reference);

        let z_score_7d = self.z_score(weight, historical, 7, reference);
        let z_score_30d = self.z_score(weight, historical, 30, reference);
        let z_score_90d = self.z_score(weight, historical, 90, reference);

        let small_transaction_ratio = self.small_transaction_ratio(recent);
        let (threshold_avoidance_ratio, cumulative_large_amount) =
            self.detect_threshold_avoidance(recent);
        let temporal_density_weeks = self.temporal_density_weeks(recent);

        let source_of_funds_exceeded = self.source_of_funds_exceeded(recent, info);
        let economic_plausibility_issue = self.economic_plausibility_issue(recent, info);

        let sof_declared = info.and_then(|i| i.source_of_funds).is_some();

        // When a source of funds is declared and not exceeded, this module
        // stands down; the other modules still see the customer.
        let mut is_suspicious = sof_declared && source_of_funds_exceeded;

        if !sof_declared || source_of_funds_exceeded {
            let mut triggered = false;

            // Absolute indicators, baseline-free
            if threshold_avoidance_ratio >= 0.3
                && cumulative_large_amount >= 30_000.0
                && temporal_density_weeks > self.normal_saver_density
            {
                triggered = true;
            }
            if threshold_avoidance_ratio >= 0.5 && temporal_density_weeks > self.smurfer_density {
                triggered = true;
            }
            if economic_plausibility_issue {
                triggered = true;
            }
            if !sof_declared
                && recent.len() >= 12
                && threshold_avoidance_ratio >= 0.3
                && cumulative_large_amount >= 30_000.0
            {
                triggered = true;
            }

            // Relative indicators, only meaningful with a baseline
            if z_score_30d >= 3.5 {
                triggered = true;
            } else if z_score_30d >= 2.5
                && (threshold_avoidance_ratio >= 0.3
                    || cumulative_large_amount >= self.structuring_cumulative_min)
            {
                triggered = true;
            }

            // Ordinary savers: low density, small amounts, nothing near the
            // reporting limit
            let normal_saver = temporal_density_weeks < self.normal_saver_density
                && small_transaction_ratio > 0.8
                && threshold_avoidance_ratio < 0.3
                && cumulative_large_amount < self.structuring_cumulative_min;

            if triggered && !normal_saver {
                is_suspicious = true;
            }
        }

        WeightAnalysis {
            weight_7d: weight,
            weight_30d: weight,
            weight_90d: weight,
            z_score_7d: stats::finite_or_zero(z_score_7d),
            z_score_30d: stats::finite_or_zero(z_score_30d),
            z_score_90d: stats::finite_or_zero(z_score_90d),
            is_suspicious,
            small_transaction_ratio,
            threshold_avoidance_ratio,
            cumulative_large_amount,
            temporal_density_weeks,
            source_of_funds_exceeded,
            economic_plausibility_issue,
        }
    }

    /// Decayed sum of per-day weights over a transaction slice
    pub fn window_weight(&self, transactions: &[Transaction], reference: NaiveDateTime) -> f64 {
        if transactions.is_empty() {
            return 0.0;
        }

        let mut days: BTreeMap<NaiveDate, DayAggregate> = BTreeMap::new();
        for txn in transactions {
            // Missing timestamps count towards the reference day
            let day = txn.timestamp.map(|ts| ts.date()).unwrap_or(reference.date());
            let entry = days.entry(day).or_insert(DayAggregate {
                amount_sum: 0.0,
                count: 0,
                cash_investments: 0,
                near_limit_cash: 0,
            });
            entry.amount_sum += txn.amount_f64();
            entry.count += 1;
            if txn.is_cash_investment() {
                entry.cash_investments += 1;
                if self.is_near_limit(txn.amount_f64()) {
                    entry.near_limit_cash += 1;
                }
            }
        }

        let mut total = 0.0;
        for (day, agg) in &days {
            let a_tilde = agg.amount_sum.ln_1p();
            let f_tilde = (agg.count as f64).ln_1p();

            // Days dominated by near-limit cash investments weigh heavier
            let factor = if agg.cash_investments > 0 {
                1.0 + 1.5 * (agg.near_limit_cash as f64 / agg.cash_investments as f64)
            } else {
                1.0
            };

            let days_ago = (reference.date() - *day).num_days() as f64;
            let decay = (-self.lambda_decay * days_ago).exp();

            total += a_tilde * f_tilde * factor * decay;
        }

        total
    }

    /// Z-score of the current weight against a rolling historical baseline
    ///
    /// With fewer than 20 historical transactions the baseline falls back to
    /// monthly buckets; otherwise rolling windows of `window_days` stepping
    /// by seven days are used.
    pub fn z_score(
        &self,
        current_weight: f64,
        historical: &[Transaction],
        window_days: i64,
        reference: NaiveDateTime,
    ) -> f64 {
        if historical.is_empty() {
            return 0.0;
        }

        let mut timestamped: Vec<&Transaction> =
            historical.iter().filter(|t| t.timestamp.is_some()).collect();
        if timestamped.is_empty() {
            return 0.0;
        }
        timestamped.sort_by_key(|t| t.timestamp);

        let mut baseline: Vec<f64> = Vec::new();

        if historical.len() < 20 {
            // Sparse history: one baseline sample per calendar month
            let mut months: BTreeMap<(i32, u32), Vec<Transaction>> = BTreeMap::new();
            for txn in &timestamped {
                let ts = txn.timestamp.expect("filtered above");
                months
                    .entry((ts.year(), ts.month()))
                    .or_default()
                    .push((*txn).clone());
            }
            for bucket in months.values() {
                baseline.push(self.window_weight(bucket, reference));
            }
        } else {
            let min_ts = timestamped.first().and_then(|t| t.timestamp).expect("non-empty");
            let max_ts = timestamped.last().and_then(|t| t.timestamp).expect("non-empty");

            let mut window_end = min_ts + chrono::Duration::days(window_days);
            while window_end <= max_ts {
                let window_start = window_end - chrono::Duration::days(window_days);
                let window: Vec<Transaction> = timestamped
                    .iter()
                    .filter(|t| {
                        let ts = t.timestamp.expect("filtered above");
                        ts >= window_start && ts < window_end
                    })
                    .map(|t| (*t).clone())
                    .collect();
                if window.len() >= 2 {
                    baseline.push(self.window_weight(&window, reference));
                }
                window_end += chrono::Duration::days(7);
            }
        }

        stats::baseline_z_score(current_weight, &baseline, 0.01)
    }

    /// Fraction of transactions below the small-amount threshold
    pub fn small_transaction_ratio(&self, transactions: &[Transaction]) -> f64 {
        if transactions.is_empty() {
            return 0.0;
        }
        let small = transactions
            .iter()
            .filter(|t| t.amount_f64() < self.small_transaction_threshold)
            .count();
        small as f64 / transactions.len() as f64
    }

    /// Share and cumulative volume of cash investments just under the limit
    pub fn detect_threshold_avoidance(&self, transactions: &[Transaction]) -> (f64, f64) {
        let cash_investments: Vec<&Transaction> =
            transactions.iter().filter(|t| t.is_cash_investment()).collect();
        if cash_investments.is_empty() {
            return (0.0, 0.0);
        }

        let near_limit: Vec<&&Transaction> = cash_investments
            .iter()
            .filter(|t| self.is_near_limit(t.amount_f64()))
            .collect();

        let ratio = near_limit.len() as f64 / cash_investments.len() as f64;
        let cumulative = near_limit.iter().map(|t| t.amount_f64()).sum();
        (ratio, cumulative)
    }

    /// Transactions per week over the actual span of timestamped activity
    ///
    /// The span is floored at one day, so a lone timestamped transaction
    /// reads as seven per week.
    pub fn temporal_density_weeks(&self, transactions: &[Transaction]) -> f64 {
        let timestamps: Vec<NaiveDateTime> =
            transactions.iter().filter_map(|t| t.timestamp).collect();
        if timestamps.is_empty() {
            return 0.0;
        }

        let min_ts = timestamps.iter().min().expect("non-empty");
        let max_ts = timestamps.iter().max().expect("non-empty");
        let actual_days = ((*max_ts - *min_ts).num_days() + 1).max(1) as f64;
        let actual_weeks = actual_days / 7.0;

        timestamps.len() as f64 / actual_weeks
    }

    fn source_of_funds_exceeded(
        &self,
        transactions: &[Transaction],
        info: Option<&CustomerInfo>,
    ) -> bool {
        let Some(sof) = info.and_then(|i| i.source_of_funds) else {
            return false;
        };
        let cumulative_investments: f64 = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Investment)
            .map(|t| t.amount_f64())
            .sum();
        cumulative_investments > sof.to_f64().unwrap_or(f64::MAX)
    }

    fn economic_plausibility_issue(
        &self,
        transactions: &[Transaction],
        info: Option<&CustomerInfo>,
    ) -> bool {
        let Some(income) = info.and_then(|i| i.monthly_income) else {
            return false;
        };
        let income = income.to_f64().unwrap_or(f64::MAX);

        let near_limit: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.is_cash_investment() && self.is_near_limit(t.amount_f64()))
            .collect();
        if near_limit.len() < 3 {
            return false;
        }

        let cumulative: f64 = near_limit.iter().map(|t| t.amount_f64()).sum();

        // More than six months of income parked just under the limit is not
        // explainable by savings alone
        cumulative > income * 6.0
    }

    fn is_near_limit(&self, amount: f64) -> bool {
        amount >= self.near_limit_min && amount < self.near_limit_max
    }
}
