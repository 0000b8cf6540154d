//! Suspicion score combination
//!
//! The absolute component is the amplified weighted TP/SP sum; the relative
//! component converts the weight and entropy z-scores into point units at 30
//! points per sigma, capped at five sigmas. The combination is 70% absolute,
//! 30% relative, pushed through the non-linear scaling curve.

use detector_core::types::{
    EntropyAnalysis, PredictabilityAnalysis, StatisticalAnalysis, WeightAnalysis,
};

use crate::config::EngineConfig;
use crate::points::{self, ModuleBreakdown};

/// Combined suspicion score in TP/SP point units, floored at zero
pub fn suspicion_score(
    config: &EngineConfig,
    weight: &WeightAnalysis,
    entropy: &EntropyAnalysis,
    predictability: &PredictabilityAnalysis,
    statistics: &StatisticalAnalysis,
) -> f64 {
    if config.use_tp_sp_system {
        let breakdown = points::module_points(weight, entropy, predictability, statistics);
        tp_sp_score(config, &breakdown, weight, entropy)
    } else {
        legacy_score(config, weight, entropy, statistics)
    }
}

fn tp_sp_score(
    config: &EngineConfig,
    breakdown: &ModuleBreakdown,
    weight: &WeightAnalysis,
    entropy: &EntropyAnalysis,
) -> f64 {
    let weighted = points::weighted_net(breakdown);
    let amplification = points::amplification_factor(breakdown);

    let absolute = weighted * amplification * 0.7;

    // Five sigmas correspond to 150 points
    let relative = (config.alpha * positive_z(weight.z_score_30d) * 30.0
        + config.beta * absolute_z(entropy.z_score) * 30.0)
        * 0.3;

    let scaled = points::nonlinear_scale(absolute + relative);
    scaled.max(0.0)
}

/// Pre-TP/SP scoring path, kept for comparison runs only
///
/// Lives in a 0-10 point space, so it classifies GREEN under the shared
/// 150/300/500 thresholds. Selected via `use_tp_sp_system = false`; do not
/// use it for production decisions.
fn legacy_score(
    config: &EngineConfig,
    weight: &WeightAnalysis,
    entropy: &EntropyAnalysis,
    statistics: &StatisticalAnalysis,
) -> f64 {
    let mut smurfing = 0.0;
    if weight.is_suspicious {
        if weight.threshold_avoidance_ratio >= 0.5 {
            smurfing += 2.0;
        }
        if weight.cumulative_large_amount >= 50_000.0 {
            smurfing += 1.5;
        }
        if weight.temporal_density_weeks > 5.0 {
            smurfing += 4.0;
        } else if weight.temporal_density_weeks > 2.0 {
            smurfing += 3.0;
        } else if weight.temporal_density_weeks > 1.0 {
            smurfing += 2.0;
        } else if weight.temporal_density_weeks > 0.5 {
            smurfing += 1.0;
        }
        if weight.economic_plausibility_issue {
            smurfing += 1.5;
        }
        if weight.source_of_funds_exceeded {
            smurfing += 2.0;
        }
    }

    let mut entropy_points = 0.0;
    if entropy.entropy_aggregate < 0.3 || entropy.entropy_aggregate > 2.0 {
        entropy_points += 1.5;
    }
    if entropy.entropy_payment_method < 0.1 {
        entropy_points += 0.5;
    }

    let stats_points = (0.10 * statistics.benford_score
        + 0.10 * statistics.velocity_score
        + 0.10 * statistics.time_anomaly_score
        + 0.10 * statistics.clustering_score
        + 0.60 * statistics.layering_score)
        * 5.0;

    let absolute = (0.40 * smurfing + 0.30 * entropy_points + 0.30 * stats_points) * 0.7;
    let relative = (config.alpha * positive_z(weight.z_score_30d)
        + config.beta * absolute_z(entropy.z_score))
        * 0.3;

    (absolute + relative).max(0.0)
}

fn positive_z(z: f64) -> f64 {
    if z > 0.0 {
        z.clamp(0.0, 5.0)
    } else {
        0.0
    }
}

fn absolute_z(z: f64) -> f64 {
    if z != 0.0 {
        z.abs().clamp(0.0, 5.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_weight() -> WeightAnalysis {
        WeightAnalysis {
            weight_7d: 0.0,
            weight_30d: 0.0,
            weight_90d: 0.0,
            z_score_7d: 0.0,
            z_score_30d: 0.0,
            z_score_90d: 0.0,
            is_suspicious: false,
            small_transaction_ratio: 0.0,
            threshold_avoidance_ratio: 0.0,
            cumulative_large_amount: 0.0,
            temporal_density_weeks: 0.0,
            source_of_funds_exceeded: false,
            economic_plausibility_issue: false,
        }
    }

    fn quiet_entropy() -> EntropyAnalysis {
        EntropyAnalysis {
            entropy_amount: 1.0,
            entropy_payment_method: 1.0,
            entropy_transaction_type: 0.8,
            entropy_time: 1.2,
            entropy_aggregate: 1.0,
            z_score: 0.0,
            is_complex: false,
        }
    }

    fn neutral_predictability() -> PredictabilityAnalysis {
        PredictabilityAnalysis {
            temporal_stability: 0.55,
            amount_consistency: 0.55,
            channel_continuity: 0.55,
            overall_predictability: 0.55,
            z_score: 0.0,
            is_stable: false,
        }
    }

    fn quiet_statistics() -> StatisticalAnalysis {
        StatisticalAnalysis {
            benford_score: 0.0,
            velocity_score: 0.0,
            time_anomaly_score: 0.0,
            clustering_score: 0.0,
            layering_score: 0.0,
        }
    }

    #[test]
    fn test_quiet_customer_scores_zero() {
        let config = EngineConfig::default();
        let score = suspicion_score(
            &config,
            &quiet_weight(),
            &quiet_entropy(),
            &neutral_predictability(),
            &quiet_statistics(),
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_high_predictability_cannot_push_below_zero() {
        let config = EngineConfig::default();
        let mut predictability = neutral_predictability();
        predictability.overall_predictability = 0.95;
        predictability.is_stable = true;

        let score = suspicion_score(
            &config,
            &quiet_weight(),
            &quiet_entropy(),
            &predictability,
            &quiet_statistics(),
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_structuring_drives_the_score() {
        let config = EngineConfig::default();
        let mut weight = quiet_weight();
        weight.is_suspicious = true;
        weight.threshold_avoidance_ratio = 1.0;
        weight.cumulative_large_amount = 110_000.0;
        weight.temporal_density_weeks = 0.9;

        let score = suspicion_score(
            &config,
            &weight,
            &quiet_entropy(),
            &neutral_predictability(),
            &quiet_statistics(),
        );
        // SP 550 at µ 2.0 and 40% weighting, amplified and scaled
        assert!(score >= 300.0);
    }

    #[test]
    fn test_z_scores_are_capped_at_five_sigmas() {
        let config = EngineConfig::default();
        let mut weight = quiet_weight();
        weight.z_score_30d = 40.0;
        let mut entropy = quiet_entropy();
        entropy.z_score = -40.0;

        let score = suspicion_score(
            &config,
            &weight,
            &entropy,
            &neutral_predictability(),
            &quiet_statistics(),
        );
        // alpha 0.6 * 5 * 30 + beta 0.4 * 5 * 30 = 150 points, times 0.3
        assert!((score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_layering_monotonicity() {
        let config = EngineConfig::default();
        let mut previous = -1.0;
        for layering in [0.4, 0.6, 0.8, 0.95] {
            let mut statistics = quiet_statistics();
            statistics.layering_score = layering;
            let score = suspicion_score(
                &config,
                &quiet_weight(),
                &quiet_entropy(),
                &neutral_predictability(),
                &statistics,
            );
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_legacy_path_lives_in_small_point_space() {
        let config = EngineConfig {
            use_tp_sp_system: false,
            ..EngineConfig::default()
        };

        let mut weight = quiet_weight();
        weight.is_suspicious = true;
        weight.threshold_avoidance_ratio = 1.0;
        weight.cumulative_large_amount = 110_000.0;
        weight.temporal_density_weeks = 6.0;
        weight.source_of_funds_exceeded = true;
        weight.economic_plausibility_issue = true;

        let mut statistics = quiet_statistics();
        statistics.layering_score = 1.0;

        let score = suspicion_score(
            &config,
            &weight,
            &quiet_entropy(),
            &neutral_predictability(),
            &statistics,
        );
        assert!(score > 0.0);
        assert!(score < 150.0);
    }
}
