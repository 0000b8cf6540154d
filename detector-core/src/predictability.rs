//! Behavioural-stability detector
//!
//! Scores how plannable a customer's behaviour is along three axes: the
//! regularity of inter-arrival intervals, the consistency of amounts and the
//! continuity of payment channels. High predictability earns trust; erratic
//! behaviour feeds suspicion.

use std::collections::HashMap;

use crate::stats;
use crate::types::{PredictabilityAnalysis, Transaction};

/// Prior standard deviation assumed for the predictability baseline
const BASELINE_SIGMA: f64 = 0.15;

/// Measures the stability and plannability of transaction behaviour
#[derive(Debug, Clone, Default)]
pub struct PredictabilityDetector;

impl PredictabilityDetector {
    /// Create a detector
    pub fn new() -> Self {
        Self
    }

    /// Full predictability analysis over a recent slice and its baseline
    pub fn analyze(
        &self,
        recent: &[Transaction],
        historical: &[Transaction],
    ) -> PredictabilityAnalysis {
        let temporal_stability = self.temporal_stability(recent);
        let amount_consistency = self.amount_consistency(recent, historical);
        let channel_continuity = self.channel_continuity(recent, historical);

        let overall_predictability =
            self.overall(temporal_stability, amount_consistency, channel_continuity);

        // Baseline comparison: the most recent thirty historical transactions
        // stand in for "then", the rest for their own baseline
        let mut z_score = 0.0;
        if historical.len() >= 10 {
            let (hist_base, hist_recent) = if historical.len() >= 30 {
                historical.split_at(historical.len() - 30)
            } else {
                (&historical[..0], historical)
            };

            let hist_temporal = self.temporal_stability(hist_recent);
            let hist_amount = self.amount_consistency(hist_recent, hist_base);
            let hist_channel = self.channel_continuity(hist_recent, hist_base);
            let hist_overall = self.overall(hist_temporal, hist_amount, hist_channel);

            if hist_overall > 0.0 {
                z_score = (overall_predictability - hist_overall) / BASELINE_SIGMA;
            }
        }

        PredictabilityAnalysis {
            temporal_stability,
            amount_consistency,
            channel_continuity,
            overall_predictability,
            z_score: stats::finite_or_zero(z_score),
            is_stable: overall_predictability >= 0.7,
        }
    }

    /// Regularity of the intervals between consecutive transactions
    pub fn temporal_stability(&self, transactions: &[Transaction]) -> f64 {
        if transactions.len() < 2 {
            return 0.5;
        }

        let mut timestamps: Vec<_> = transactions.iter().filter_map(|t| t.timestamp).collect();
        timestamps.sort();
        if timestamps.len() < 2 {
            return 0.5;
        }

        let intervals: Vec<f64> = timestamps
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
            .collect();

        let mean_interval = stats::mean(&intervals);
        if mean_interval == 0.0 {
            // Everything at the same instant is the opposite of a routine
            return 0.0;
        }

        let cv = stats::std_dev(&intervals) / mean_interval;
        if cv < 0.3 {
            0.8 + 0.2 * (0.3 - cv) / 0.3
        } else if cv < 0.6 {
            0.5 + 0.3 * (0.6 - cv) / 0.3
        } else if cv < 1.0 {
            0.3 + 0.2 * (1.0 - cv) / 0.4
        } else {
            (0.3 - 0.3 * (cv - 1.0) / 2.0).max(0.0)
        }
    }

    /// Consistency of the transaction amounts
    pub fn amount_consistency(&self, recent: &[Transaction], historical: &[Transaction]) -> f64 {
        if recent.len() < 2 {
            return 0.5;
        }

        let amounts: Vec<f64> = recent.iter().map(|t| t.amount_f64()).collect();
        let mean_amount = stats::mean(&amounts);
        if mean_amount == 0.0 {
            return 0.0;
        }

        let cv = stats::std_dev(&amounts) / mean_amount;
        let mut consistency = if cv < 0.2 {
            0.9 + 0.1 * (0.2 - cv) / 0.2
        } else if cv < 0.5 {
            0.7 + 0.2 * (0.5 - cv) / 0.3
        } else if cv < 1.0 {
            0.5 + 0.2 * (1.0 - cv) / 0.5
        } else if cv < 2.0 {
            0.3 + 0.2 * (2.0 - cv) / 1.0
        } else {
            (0.3 - 0.3 * (cv - 2.0) / 3.0).max(0.0)
        };

        // A marked widening against the customer's own history costs points
        if historical.len() >= 5 {
            let hist_amounts: Vec<f64> = historical.iter().map(|t| t.amount_f64()).collect();
            let hist_mean = stats::mean(&hist_amounts);
            let hist_cv = if hist_mean > 0.0 {
                stats::std_dev(&hist_amounts) / hist_mean
            } else {
                1.0
            };
            if cv > hist_cv * 1.5 {
                consistency *= 0.7;
            }
        }

        consistency
    }

    /// Continuity of payment-channel usage
    pub fn channel_continuity(&self, recent: &[Transaction], historical: &[Transaction]) -> f64 {
        if recent.is_empty() {
            return 0.5;
        }

        let mut recent_methods: HashMap<&'static str, usize> = HashMap::new();
        for txn in recent {
            *recent_methods.entry(txn.payment_method.as_str()).or_default() += 1;
        }
        let total_recent = recent.len() as f64;
        let dominant_ratio =
            recent_methods.values().copied().max().unwrap_or(0) as f64 / total_recent;

        let mut continuity = if dominant_ratio >= 0.9 {
            1.0
        } else if dominant_ratio >= 0.7 {
            0.8 + 0.2 * (dominant_ratio - 0.7) / 0.2
        } else if dominant_ratio >= 0.5 {
            0.6 + 0.2 * (dominant_ratio - 0.5) / 0.2
        } else {
            match recent_methods.len() {
                1 => 0.6,
                2 => 0.4,
                k => (0.4 - 0.1 * (k as f64 - 2.0)).max(0.0),
            }
        };

        if historical.len() >= 5 {
            let mut hist_methods: HashMap<&'static str, usize> = HashMap::new();
            for txn in historical {
                *hist_methods.entry(txn.payment_method.as_str()).or_default() += 1;
            }
            let total_hist = historical.len() as f64;
            let hist_dominant = hist_methods.values().copied().max().unwrap_or(0) as f64 / total_hist;
            // Deterministic tie-break on the method name
            let hist_dominant_method = hist_methods
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(m, _)| *m)
                .unwrap_or("");

            let recent_share_of_hist = recent_methods
                .get(hist_dominant_method)
                .copied()
                .unwrap_or(0) as f64
                / total_recent;

            if recent_share_of_hist >= 0.5 {
                // Still on the established channel
                continuity = (continuity + 0.2).min(1.0);
            } else if dominant_ratio < hist_dominant * 0.5 {
                continuity *= 0.7;
            }
        }

        continuity
    }

    /// Weighted overall predictability
    pub fn overall(&self, temporal: f64, amount: f64, channel: f64) -> f64 {
        0.40 * temporal + 0.35 * amount + 0.25 * channel
    }
}
