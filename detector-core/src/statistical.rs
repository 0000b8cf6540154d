//! Supplementary statistical analyses
//!
//! Five independent 0-1 scores: Benford first-digit deviation, sliding-window
//! velocity against absolute expectations, temporal anomalies, behavioural
//! clustering distance and the cash-to-bank layering pattern.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::cluster::KMeans;
use crate::stats;
use crate::types::{PaymentMethod, StatisticalAnalysis, Transaction, TransactionType};

/// Benford's law: expected frequencies of the first digits 1..9
const BENFORD_EXPECTED: [f64; 9] = [0.301, 0.176, 0.125, 0.097, 0.079, 0.067, 0.058, 0.051, 0.046];

/// Critical chi-squared value for df=8 at alpha 0.05
const BENFORD_CHI_CRITICAL: f64 = 15.5;

/// Sliding-window sizes for the velocity check, in hours
const VELOCITY_WINDOWS_HOURS: [i64; 3] = [1, 24, 168];

/// Runs the supplementary statistical analyses for one customer
#[derive(Debug, Clone)]
pub struct StatisticalAnalyzer {
    /// Number of behavioural clusters for the k-means sub-score
    pub n_clusters: usize,
}

impl Default for StatisticalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticalAnalyzer {
    /// Create an analyzer with the default cluster count of five
    pub fn new() -> Self {
        Self { n_clusters: 5 }
    }

    /// Full statistical analysis; `all_transactions` enables the clustering
    /// sub-score by providing the cross-customer population
    pub fn analyze(
        &self,
        customer_transactions: &[Transaction],
        all_transactions: Option<&[Transaction]>,
    ) -> StatisticalAnalysis {
        let benford_score = self.benford_score(customer_transactions);
        let velocity_score = self.velocity_score(customer_transactions);
        let time_anomaly_score = self.time_anomaly_score(customer_transactions);
        let layering_score = self.layering_score(customer_transactions);
        let clustering_score = all_transactions
            .map(|all| self.clustering_score(customer_transactions, all))
            .unwrap_or(0.0);

        StatisticalAnalysis {
            benford_score,
            velocity_score,
            time_anomaly_score,
            clustering_score,
            layering_score,
        }
    }

    /// First-digit deviation from Benford's law, 0-1
    ///
    /// Needs at least twenty usable first digits; fabricated or constructed
    /// amounts tend to cluster on few leading digits.
    pub fn benford_score(&self, transactions: &[Transaction]) -> f64 {
        if transactions.len() < 20 {
            return 0.0;
        }

        let first_digits: Vec<u32> = transactions
            .iter()
            .filter_map(|t| first_digit(t.amount_f64()))
            .collect();
        if first_digits.len() < 20 {
            return 0.0;
        }

        let total = first_digits.len() as f64;
        let mut observed = [0.0f64; 9];
        for digit in &first_digits {
            observed[(*digit - 1) as usize] += 1.0 / total;
        }

        let chi_squared: f64 = observed
            .iter()
            .zip(BENFORD_EXPECTED.iter())
            .map(|(obs, exp)| (obs - exp) * (obs - exp) / exp)
            .sum();

        (chi_squared / BENFORD_CHI_CRITICAL).min(1.0)
    }

    /// Transaction velocity against absolute expectations, 0-1
    ///
    /// For each window size the densest sliding window is compared against
    /// roughly ten transactions and 50,000 EUR per day.
    pub fn velocity_score(&self, transactions: &[Transaction]) -> f64 {
        let mut timestamped: Vec<&Transaction> =
            transactions.iter().filter(|t| t.timestamp.is_some()).collect();
        if timestamped.len() < 3 {
            return 0.0;
        }
        timestamped.sort_by_key(|t| t.timestamp);

        let mut window_scores = Vec::with_capacity(VELOCITY_WINDOWS_HOURS.len());
        for window_hours in VELOCITY_WINDOWS_HOURS {
            let window = chrono::Duration::hours(window_hours);

            let mut max_count = 0usize;
            let mut max_amount = 0.0f64;
            for anchor in &timestamped {
                let start = anchor.timestamp.expect("filtered above");
                let end = start + window;

                let mut count = 0usize;
                let mut amount = 0.0f64;
                for txn in &timestamped {
                    let ts = txn.timestamp.expect("filtered above");
                    if ts >= start && ts < end {
                        count += 1;
                        amount += txn.amount_f64();
                    }
                }
                max_count = max_count.max(count);
                max_amount = max_amount.max(amount);
            }

            let expected_count = window_hours as f64 / 2.4;
            let expected_amount = (window_hours as f64 / 24.0) * 50_000.0;

            let count_score = (max_count as f64 / expected_count).min(1.0);
            let amount_score = (max_amount / expected_amount).min(1.0);
            window_scores.push((count_score + amount_score) / 2.0);
        }

        stats::mean(&window_scores)
    }

    /// Off-hours, weekend and burst anomalies, 0-1
    pub fn time_anomaly_score(&self, transactions: &[Transaction]) -> f64 {
        let mut timestamped: Vec<NaiveDateTime> =
            transactions.iter().filter_map(|t| t.timestamp).collect();
        if timestamped.len() < 5 {
            return 0.0;
        }
        timestamped.sort();

        let total = timestamped.len() as f64;

        // Night-time activity (22:00 - 06:00)
        let off_hours = timestamped
            .iter()
            .filter(|ts| ts.hour() < 6 || ts.hour() >= 22)
            .count() as f64;
        let off_hours_ratio = off_hours / total;

        // More than 40% weekend activity is unusual
        let weekend = timestamped
            .iter()
            .filter(|ts| ts.weekday().number_from_monday() >= 6)
            .count() as f64;
        let weekend_ratio = (weekend / total / 0.4).min(1.0);

        // Bursts: three transactions inside five minutes
        let mut bursts = 0usize;
        for window in timestamped.windows(3) {
            if (window[2] - window[0]).num_seconds() < 300 {
                bursts += 1;
            }
        }
        let burst_ratio = bursts as f64 / (timestamped.len() - 2).max(1) as f64;
        let burst_score = (burst_ratio / 0.2).min(1.0);

        (off_hours_ratio + weekend_ratio + burst_score) / 3.0
    }

    /// Distance of the customer from the nearest behavioural cluster, 0-1
    ///
    /// Requires at least fifty transactions overall and at least as many
    /// customers as clusters; returns 0 otherwise.
    pub fn clustering_score(&self, customer: &[Transaction], all: &[Transaction]) -> f64 {
        if customer.is_empty() || all.len() < 50 {
            return 0.0;
        }

        let mut by_customer: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for txn in all {
            by_customer.entry(txn.customer_id.as_str()).or_default().push(txn);
        }
        if by_customer.len() < self.n_clusters {
            return 0.0;
        }

        let population: Vec<Vec<f64>> = by_customer
            .values()
            .map(|txns| Self::feature_vector(txns))
            .collect();

        // Standardise each feature across the population
        let dims = population[0].len();
        let mut means = vec![0.0; dims];
        let mut stds = vec![0.0; dims];
        for d in 0..dims {
            let column: Vec<f64> = population.iter().map(|p| p[d]).collect();
            means[d] = stats::mean(&column);
            stds[d] = stats::std_dev(&column);
            if stds[d] < 1e-12 {
                stds[d] = 1.0;
            }
        }
        let scale = |point: &[f64]| -> Vec<f64> {
            point
                .iter()
                .enumerate()
                .map(|(d, v)| (v - means[d]) / stds[d])
                .collect()
        };

        let scaled: Vec<Vec<f64>> = population.iter().map(|p| scale(p)).collect();
        let model = KMeans::fit(&scaled, self.n_clusters, 42, 10);

        let customer_refs: Vec<&Transaction> = customer.iter().collect();
        let customer_point = scale(&Self::feature_vector(&customer_refs));
        let distance = model.nearest_distance(&customer_point);

        // Typical standardised distances land between zero and five
        (distance / 5.0).min(1.0)
    }

    /// Cash-to-bank layering pattern strength, 0-1
    ///
    /// Cash on the way in, SEPA or card on the way out, matching volumes and
    /// withdrawals following deposits within ninety days make the classic
    /// laundering shape.
    pub fn layering_score(&self, transactions: &[Transaction]) -> f64 {
        if transactions.len() < 3 {
            return 0.0;
        }

        let investments: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Investment)
            .collect();
        let withdrawals: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Withdrawal)
            .collect();

        if investments.is_empty() {
            return 0.0;
        }

        let cash_investments: Vec<&&Transaction> = investments
            .iter()
            .filter(|t| t.payment_method == PaymentMethod::Cash)
            .collect();

        if withdrawals.is_empty() {
            // Hoarding: plenty of cash going in, nothing coming out
            if cash_investments.len() >= 5 {
                let cash_ratio = cash_investments.len() as f64 / investments.len() as f64;
                return (cash_ratio * 0.7).min(0.5);
            }
            return 0.0;
        }

        let electronic_withdrawals: Vec<&&Transaction> = withdrawals
            .iter()
            .filter(|t| t.is_electronic_withdrawal())
            .collect();

        let cash_investment_ratio = cash_investments.len() as f64 / investments.len() as f64;
        let electronic_withdrawal_ratio =
            electronic_withdrawals.len() as f64 / withdrawals.len() as f64;

        let cash_in_volume: f64 = cash_investments.iter().map(|t| t.amount_f64()).sum();
        let electronic_out_volume: f64 =
            electronic_withdrawals.iter().map(|t| t.amount_f64()).sum();

        // Volumes passing through at a near 1:1 ratio are the tell
        let volume_match = if cash_in_volume > 0.0 {
            let ratio = electronic_out_volume / cash_in_volume;
            if ratio > 0.5 && ratio < 1.5 {
                1.0 - (1.0 - ratio).abs()
            } else {
                0.0
            }
        } else {
            0.0
        };

        // Share of withdrawals preceded by a cash deposit within 90 days
        let time_proximity = if !cash_investments.is_empty() && !electronic_withdrawals.is_empty() {
            let hits = electronic_withdrawals
                .iter()
                .filter(|w| {
                    let Some(w_ts) = w.timestamp else { return false };
                    cash_investments.iter().any(|b| {
                        b.timestamp.is_some_and(|b_ts| {
                            let days = (w_ts - b_ts).num_days();
                            (0..=90).contains(&days)
                        })
                    })
                })
                .count();
            hits as f64 / electronic_withdrawals.len() as f64
        } else {
            0.0
        };

        let mut indicators = 0usize;
        if cash_investments.len() >= 3 && electronic_withdrawals.len() >= 2 {
            indicators += 1;
        }
        if cash_investment_ratio >= 0.5 {
            indicators += 1;
        }
        if electronic_withdrawal_ratio >= 0.4 {
            indicators += 1;
        }
        if cash_in_volume >= 5_000.0 {
            indicators += 1;
        }
        if time_proximity >= 0.3 {
            indicators += 1;
        }

        let base = 0.35 * cash_investment_ratio
            + 0.35 * electronic_withdrawal_ratio
            + 0.15 * volume_match
            + 0.15 * time_proximity;

        if indicators >= 2 {
            let boost = (indicators as f64 * 0.1).min(0.3);
            (base + boost).min(1.0)
        } else {
            // Too few hard indicators: ordinary savers land here
            (base * 0.3).min(1.0)
        }
    }

    /// Feature vector per customer: mean amount, transactions per day,
    /// cash share, investment share
    fn feature_vector(transactions: &[&Transaction]) -> Vec<f64> {
        if transactions.is_empty() {
            return vec![0.0; 4];
        }

        let amounts: Vec<f64> = transactions.iter().map(|t| t.amount_f64()).collect();
        let avg_amount = stats::mean(&amounts);

        let dates: Vec<_> = transactions
            .iter()
            .filter_map(|t| t.timestamp.map(|ts| ts.date()))
            .collect();
        let frequency = if dates.len() > 1 {
            let min = dates.iter().min().expect("non-empty");
            let max = dates.iter().max().expect("non-empty");
            let span = ((*max - *min).num_days() + 1).max(1) as f64;
            transactions.len() as f64 / span
        } else {
            0.0
        };

        let cash_ratio = transactions
            .iter()
            .filter(|t| t.payment_method == PaymentMethod::Cash)
            .count() as f64
            / transactions.len() as f64;
        let investment_ratio = transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Investment)
            .count() as f64
            / transactions.len() as f64;

        vec![avg_amount, frequency, cash_ratio, investment_ratio]
    }
}

fn first_digit(amount: f64) -> Option<u32> {
    let mut value = amount.trunc() as u64;
    if value == 0 {
        return None;
    }
    while value >= 10 {
        value /= 10;
    }
    Some(value as u32)
}
