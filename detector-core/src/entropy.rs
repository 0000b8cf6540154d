//! Shannon-entropy complexity detector
//!
//! Measures how concentrated or dispersed a customer's behaviour is across
//! amounts, payment methods, transaction types and time patterns. Both
//! extremes are conspicuous: channelling everything into one pattern and
//! spreading everything so evenly that no pattern remains.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_decimal::Decimal;

use crate::stats;
use crate::types::{EntropyAnalysis, Transaction};

/// Weights of the entropy dimensions in the aggregate
#[derive(Debug, Clone)]
pub struct DimensionWeights {
    /// Weight of the amount-profile entropy
    pub amount: f64,
    /// Weight of the payment-method entropy
    pub payment_method: f64,
    /// Weight of the transaction-type entropy
    pub transaction_type: f64,
    /// Weight of the time-pattern entropy
    pub time: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            amount: 0.25,
            payment_method: 0.30,
            transaction_type: 0.20,
            time: 0.25,
        }
    }
}

/// Measures behavioural complexity via multi-dimensional Shannon entropy
#[derive(Debug, Clone)]
pub struct EntropyDetector {
    /// Bin edges for the amount profile in EUR; the last bin is open-ended
    pub amount_bins: Vec<f64>,
    /// Aggregate weights per dimension
    pub weights: DimensionWeights,
}

impl Default for EntropyDetector {
    fn default() -> Self {
        Self {
            amount_bins: vec![0.0, 500.0, 2_000.0, 10_000.0],
            weights: DimensionWeights::default(),
        }
    }
}

impl EntropyDetector {
    /// Create a detector with the default bins and weights
    pub fn new() -> Self {
        Self::default()
    }

    /// Full entropy analysis over a recent slice and its historical baseline
    pub fn analyze(&self, recent: &[Transaction], historical: &[Transaction]) -> EntropyAnalysis {
        let entropy_amount = self.amount_entropy(recent);
        let entropy_payment_method = self.payment_method_entropy(recent);
        let entropy_transaction_type = self.transaction_type_entropy(recent);
        let entropy_time = self.time_entropy(recent);

        let entropy_aggregate = self.aggregate(
            entropy_amount,
            entropy_payment_method,
            entropy_transaction_type,
            entropy_time,
        );

        // Absolute thresholds work without any baseline
        let mut absolute_suspicious =
            entropy_aggregate < 0.3 || entropy_aggregate > 2.0;

        if entropy_payment_method < 0.1 && recent.len() > 10 {
            // A single rail across many transactions
            absolute_suspicious = true;
        }

        if recent.len() >= 10 {
            let unique_amounts: HashSet<Decimal> = recent.iter().map(|t| t.amount).collect();
            let unique_ratio = unique_amounts.len() as f64 / recent.len() as f64;
            if unique_ratio >= 0.8 {
                // Every amount different reads as deliberate obfuscation
                absolute_suspicious = true;
            }
            if entropy_amount >= 1.0 {
                absolute_suspicious = true;
            }
        }

        // Relative threshold against the rolling historical baseline
        let mut z_score = 0.0;
        let mut relative_suspicious = false;
        if !historical.is_empty() {
            let baseline = self.historical_entropies(historical, 30);
            z_score = stats::finite_or_zero(stats::baseline_z_score(
                entropy_aggregate,
                &baseline,
                0.01,
            ));
            relative_suspicious = z_score.abs() >= 2.5;
        }

        EntropyAnalysis {
            entropy_amount,
            entropy_payment_method,
            entropy_transaction_type,
            entropy_time,
            entropy_aggregate,
            z_score,
            is_complex: absolute_suspicious || relative_suspicious,
        }
    }

    /// Entropy of the binned amount profile
    pub fn amount_entropy(&self, transactions: &[Transaction]) -> f64 {
        if transactions.is_empty() {
            return 0.0;
        }
        // One open-ended bin above the last edge
        let mut counts = vec![0usize; self.amount_bins.len()];
        for txn in transactions {
            let amount = txn.amount_f64();
            let mut bin = self.amount_bins.len() - 1;
            for (i, window) in self.amount_bins.windows(2).enumerate() {
                if amount >= window[0] && amount < window[1] {
                    bin = i;
                    break;
                }
            }
            counts[bin] += 1;
        }
        stats::shannon_entropy(&counts)
    }

    /// Entropy of the payment-method mix
    pub fn payment_method_entropy(&self, transactions: &[Transaction]) -> f64 {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for txn in transactions {
            *counts.entry(txn.payment_method.as_str()).or_default() += 1;
        }
        let counts: Vec<usize> = counts.into_values().collect();
        stats::shannon_entropy(&counts)
    }

    /// Entropy of the transaction-type mix
    pub fn transaction_type_entropy(&self, transactions: &[Transaction]) -> f64 {
        let mut investments = 0usize;
        let mut withdrawals = 0usize;
        for txn in transactions {
            match txn.transaction_type {
                crate::types::TransactionType::Investment => investments += 1,
                crate::types::TransactionType::Withdrawal => withdrawals += 1,
            }
        }
        stats::shannon_entropy(&[investments, withdrawals])
    }

    /// Entropy of the time pattern: average of weekday entropy and 4-hour
    /// block entropy over timestamped transactions
    pub fn time_entropy(&self, transactions: &[Transaction]) -> f64 {
        let timestamps: Vec<NaiveDateTime> =
            transactions.iter().filter_map(|t| t.timestamp).collect();
        if timestamps.is_empty() {
            return 0.0;
        }

        let mut weekday_counts = [0usize; 7];
        let mut block_counts = [0usize; 6];
        for ts in &timestamps {
            weekday_counts[ts.weekday().num_days_from_monday() as usize] += 1;
            block_counts[(ts.hour() / 4) as usize] += 1;
        }

        let weekday_entropy = stats::shannon_entropy(&weekday_counts);
        let block_entropy = stats::shannon_entropy(&block_counts);
        (weekday_entropy + block_entropy) / 2.0
    }

    /// Weighted aggregate over the four dimensions
    pub fn aggregate(&self, amount: f64, payment: f64, kind: f64, time: f64) -> f64 {
        self.weights.amount * amount
            + self.weights.payment_method * payment
            + self.weights.transaction_type * kind
            + self.weights.time * time
    }

    /// Aggregate entropies over rolling windows of the historical slice,
    /// stepping by seven days; windows need more than five transactions
    fn historical_entropies(&self, historical: &[Transaction], window_days: i64) -> Vec<f64> {
        let mut timestamped: Vec<&Transaction> =
            historical.iter().filter(|t| t.timestamp.is_some()).collect();
        if timestamped.is_empty() {
            return Vec::new();
        }
        timestamped.sort_by_key(|t| t.timestamp);

        let min_ts = timestamped.first().and_then(|t| t.timestamp).expect("non-empty");
        let max_ts = timestamped.last().and_then(|t| t.timestamp).expect("non-empty");

        let mut entropies = Vec::new();
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

            if window.len() > 5 {
                let amount = self.amount_entropy(&window);
                let payment = self.payment_method_entropy(&window);
                let kind = self.transaction_type_entropy(&window);
                let time = self.time_entropy(&window);
                entropies.push(self.aggregate(amount, payment, kind, time));
            }

            window_end += chrono::Duration::days(7);
        }

        entropies
    }
}
