//! Trust/suspicion point conversion and scaling
//!
//! Each detector result is converted into trust points (TP) and suspicion
//! points (SP) with a fixed per-module multiplier. The weighted net points
//! feed the suspicion score after inter-module amplification and a
//! non-linear scaling curve.

use detector_core::types::{
    EntropyAnalysis, PredictabilityAnalysis, StatisticalAnalysis, WeightAnalysis,
};
use serde::{Deserialize, Serialize};

/// Points of one module
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulePoints {
    /// Trust points, always non-negative
    pub trust_points: f64,
    /// Suspicion points, always non-negative
    pub suspicion_points: f64,
    /// Module multiplier µ
    pub multiplier: f64,
}

impl ModulePoints {
    /// Net contribution towards suspicion: (SP − TP) · µ
    pub fn suspicion_net(&self) -> f64 {
        (self.suspicion_points - self.trust_points) * self.multiplier
    }
}

/// Points of all contributing modules
///
/// The trust analysis is deliberately absent: it is reported on the profile
/// but contributes no points to the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleBreakdown {
    /// Weight module, µ = 2.0
    pub weight: ModulePoints,
    /// Entropy module, µ = 1.2
    pub entropy: ModulePoints,
    /// Predictability module, µ = 1.0
    pub predictability: ModulePoints,
    /// Statistics module, µ = 1.5
    pub statistics: ModulePoints,
}

/// Convert detector results into per-module TP/SP
pub fn module_points(
    weight: &WeightAnalysis,
    entropy: &EntropyAnalysis,
    predictability: &PredictabilityAnalysis,
    statistics: &StatisticalAnalysis,
) -> ModuleBreakdown {
    ModuleBreakdown {
        weight: weight_points(weight),
        entropy: entropy_points(entropy),
        predictability: predictability_points(predictability),
        statistics: statistics_points(statistics),
    }
}

fn weight_points(analysis: &WeightAnalysis) -> ModulePoints {
    let mut sp = 0.0;

    // Temporal density speaks for itself, suspicion verdict or not
    if analysis.temporal_density_weeks > 5.0 {
        sp += 400.0;
    } else if analysis.temporal_density_weeks > 2.0 {
        sp += 300.0;
    } else if analysis.temporal_density_weeks > 1.0 {
        sp += 200.0;
    } else if analysis.temporal_density_weeks > 0.5 {
        sp += 100.0;
    }

    if analysis.is_suspicious {
        if analysis.threshold_avoidance_ratio >= 0.5 {
            sp += 300.0;
        }
        if analysis.cumulative_large_amount >= 50_000.0 {
            sp += 150.0;
        }
        if analysis.economic_plausibility_issue {
            sp += 150.0;
        }
        if analysis.source_of_funds_exceeded {
            sp += 200.0;
        }
    }

    ModulePoints {
        trust_points: 0.0,
        suspicion_points: sp,
        multiplier: 2.0,
    }
}

fn entropy_points(analysis: &EntropyAnalysis) -> ModulePoints {
    let mut sp = 0.0;

    if analysis.entropy_aggregate < 0.3 || analysis.entropy_aggregate > 2.0 {
        sp += 150.0;
    }
    if analysis.entropy_payment_method < 0.1 {
        sp += 50.0;
    }

    ModulePoints {
        trust_points: 0.0,
        suspicion_points: sp,
        multiplier: 1.2,
    }
}

fn predictability_points(analysis: &PredictabilityAnalysis) -> ModulePoints {
    let mut tp = 0.0;
    let mut sp = 0.0;

    if analysis.overall_predictability >= 0.8 {
        tp += 150.0;
    } else if analysis.overall_predictability >= 0.6 {
        tp += 80.0;
    }

    if analysis.overall_predictability < 0.3 {
        sp += 150.0;
    } else if analysis.overall_predictability < 0.5 {
        sp += 75.0;
    }

    if analysis.z_score < -2.0 {
        sp += 50.0;
    }

    ModulePoints {
        trust_points: tp,
        suspicion_points: sp,
        multiplier: 1.0,
    }
}

fn statistics_points(analysis: &StatisticalAnalysis) -> ModulePoints {
    let mut sp = 0.0;

    if analysis.benford_score > 0.6 {
        sp += 200.0;
    }
    if analysis.velocity_score > 0.7 {
        sp += 150.0;
    }
    if analysis.time_anomaly_score > 0.6 {
        sp += 100.0;
    }
    if analysis.layering_score > 0.9 {
        sp += 500.0;
    } else if analysis.layering_score > 0.7 {
        sp += 300.0;
    } else if analysis.layering_score > 0.5 {
        sp += 150.0;
    }

    ModulePoints {
        trust_points: 0.0,
        suspicion_points: sp,
        multiplier: 1.5,
    }
}

/// Inter-module amplification factor
///
/// Several modules firing at once amplify each other, with extra synergy for
/// weight+statistics and statistics+entropy combinations.
pub fn amplification_factor(points: &ModuleBreakdown) -> f64 {
    let weight_fires = points.weight.suspicion_points > 0.0;
    let entropy_fires = points.entropy.suspicion_points > 0.0;
    let predictability_fires = points.predictability.suspicion_points > 0.0;
    let statistics_fires = points.statistics.suspicion_points > 0.0;

    let firing = [weight_fires, entropy_fires, predictability_fires, statistics_fires]
        .iter()
        .filter(|&&f| f)
        .count();

    let mut factor = if firing > 1 {
        (1.0 + 0.1 * (firing as f64 - 1.0)).min(1.3)
    } else {
        1.0
    };

    if weight_fires && statistics_fires && points.statistics.suspicion_points > 100.0 {
        factor *= 1.2;
    }
    if statistics_fires && entropy_fires && points.statistics.suspicion_points > 300.0 {
        factor *= 1.3;
    }

    factor
}

/// Weighted sum of the per-module net suspicion points
pub fn weighted_net(points: &ModuleBreakdown) -> f64 {
    0.40 * points.weight.suspicion_net()
        + 0.25 * points.entropy.suspicion_net()
        + 0.25 * points.predictability.suspicion_net()
        + 0.10 * points.statistics.suspicion_net()
}

/// Non-linear scaling of the combined points, sign preserved
///
/// Identity up to 150 points, progressively steeper up to 500, then damped.
pub fn nonlinear_scale(points: f64) -> f64 {
    let magnitude = points.abs();
    let sign = if points >= 0.0 { 1.0 } else { -1.0 };

    let scaled = if magnitude <= 150.0 {
        magnitude
    } else if magnitude <= 300.0 {
        150.0 + 1.2 * (magnitude - 150.0)
    } else if magnitude <= 500.0 {
        150.0 + 180.0 + 1.5 * (magnitude - 300.0)
    } else {
        150.0 + 180.0 + 300.0 + 0.8 * (magnitude - 500.0)
    };

    sign * scaled
}
