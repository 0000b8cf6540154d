//! Flag catalogue and recommendations
//!
//! Flags are typed identifiers first and display strings second: consumers
//! that need localisation or routing match on the enum, the profile carries
//! the rendered message. Generation order is fixed, so identical analyses
//! always produce the identical flag sequence.

use std::fmt;

use detector_core::types::{
    EntropyAnalysis, PredictabilityAnalysis, StatisticalAnalysis, TrustScoreAnalysis,
    WeightAnalysis,
};
use serde::{Deserialize, Serialize};

use crate::profile::RiskLevel;

/// A single finding raised by the flag generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Flag {
    /// Structuring via cash investments just under the reporting limit
    StructuringNearLimit,
    /// Large cumulative volume parked just under the reporting limit
    LargeCumulativeNearLimit {
        /// Summed near-limit volume in EUR
        amount: f64,
    },
    /// Structuring via many small transactions
    StructuringSmallAmounts,
    /// Weight z-score of three sigmas or more
    HighActivity,
    /// More than 80% of transactions below 2,000 EUR
    SmallAmountPattern,
    /// Dominant share of cash investments sits just under the limit
    ThresholdAvoidance {
        /// Near-limit share of the cash investments, 0-1
        ratio: f64,
    },
    /// More than half a transaction per week
    HighTemporalDensity {
        /// Transactions per week
        per_week: f64,
    },
    /// Cumulative investments above the declared source of funds
    SourceOfFundsExceeded,
    /// Volume implausible relative to the declared income
    EconomicPlausibility,
    /// Extreme concentration on few behavioural patterns
    EntropyConcentration,
    /// Extreme dispersion across behavioural patterns
    EntropyDispersion,
    /// Complexity well above the customer's own history
    UnusualDispersionVsHistory,
    /// Concentration well below the customer's own history
    ChannellingVsHistory,
    /// Overall predictability below 0.3
    UnstableBehaviour,
    /// Overall predictability below 0.5
    UnpredictableBehaviour,
    /// Predictability far below the historical baseline
    PredictabilityDeviation,
    /// Trust score below 0.3
    LowTrustScore,
    /// Self-deviation above 0.7
    BehaviourChange,
    /// First digits deviate from Benford's law
    BenfordDeviation,
    /// Unusual transaction velocity
    HighVelocity,
    /// Unusual hours or days
    TimeAnomalies,
    /// Atypical for the behavioural peer group
    PeerGroupDeviation,
    /// Strong cash-to-bank layering pattern
    LayeringSuspected,
    /// Conspicuous cash/bank combination
    LayeringPattern,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::StructuringNearLimit => {
                write!(f, "🚨 STRUCTURING SUSPECTED: cash investments just under the 10,000 EUR limit")
            }
            Flag::LargeCumulativeNearLimit { amount } => {
                write!(f, "💰 LARGE CUMULATIVE SUM: {amount:.0} EUR just under the limit")
            }
            Flag::StructuringSmallAmounts => {
                write!(f, "⚠️ STRUCTURING SUSPECTED: many small transactions")
            }
            Flag::HighActivity => write!(f, "🔴 HIGH TRANSACTION ACTIVITY: z-score >= 3"),
            Flag::SmallAmountPattern => {
                write!(f, "💰 SMALL-AMOUNT PATTERN: >80% of transactions below 2,000 EUR")
            }
            Flag::ThresholdAvoidance { ratio } => {
                write!(
                    f,
                    "🎯 THRESHOLD AVOIDANCE: {:.0}% of cash investments just under the limit",
                    ratio * 100.0
                )
            }
            Flag::HighTemporalDensity { per_week } => {
                write!(f, "⏱️ HIGH TEMPORAL DENSITY: {per_week:.2} transactions/week")
            }
            Flag::SourceOfFundsExceeded => {
                write!(f, "🚨 SOURCE OF FUNDS EXCEEDED: cumulative investments above the declared amount")
            }
            Flag::EconomicPlausibility => {
                write!(f, "⚠️ ECONOMIC PLAUSIBILITY: amounts implausibly high relative to income")
            }
            Flag::EntropyConcentration => {
                write!(f, "📍 ENTROPY CONCENTRATION: extreme focus on few patterns")
            }
            Flag::EntropyDispersion => {
                write!(f, "🔀 ENTROPY DISPERSION: extreme spread, every amount different")
            }
            Flag::UnusualDispersionVsHistory => {
                write!(f, "🔀 UNUSUAL DISPERSION: complexity raised against own history")
            }
            Flag::ChannellingVsHistory => {
                write!(f, "📍 CHANNELLING: concentration on few patterns against own history")
            }
            Flag::UnstableBehaviour => {
                write!(f, "⚠️ UNSTABLE BEHAVIOUR: very low predictability (< 0.3)")
            }
            Flag::UnpredictableBehaviour => {
                write!(f, "📊 UNPREDICTABLE BEHAVIOUR: low predictability (< 0.5)")
            }
            Flag::PredictabilityDeviation => {
                write!(f, "📉 PREDICTABILITY DEVIATION: far below the historical baseline")
            }
            Flag::LowTrustScore => write!(f, "📉 LOW TRUST SCORE: unpredictable behaviour"),
            Flag::BehaviourChange => {
                write!(f, "⚡ BEHAVIOUR CHANGE: strong deviation from own profile")
            }
            Flag::BenfordDeviation => {
                write!(f, "📊 BENFORD DEVIATION: unnatural digit distribution")
            }
            Flag::HighVelocity => write!(f, "⏱️ HIGH VELOCITY: unusual transaction speed"),
            Flag::TimeAnomalies => write!(f, "🕐 TIME ANOMALIES: unusual hours or days"),
            Flag::PeerGroupDeviation => {
                write!(f, "👥 PEER GROUP DEVIATION: atypical for the customer segment")
            }
            Flag::LayeringSuspected => {
                write!(f, "🚨 LAUNDERING SUSPECTED: cash deposits followed by electronic withdrawals")
            }
            Flag::LayeringPattern => {
                write!(f, "⚠️ LAYERING PATTERN: conspicuous cash/bank combination")
            }
        }
    }
}

/// Derive the flag sequence from the five analyses; deterministic order
pub fn generate_flags(
    weight: &WeightAnalysis,
    entropy: &EntropyAnalysis,
    predictability: &PredictabilityAnalysis,
    trust: &TrustScoreAnalysis,
    statistics: &StatisticalAnalysis,
) -> Vec<Flag> {
    let mut flags = Vec::new();

    if weight.is_suspicious {
        if weight.threshold_avoidance_ratio >= 0.5 {
            flags.push(Flag::StructuringNearLimit);
            if weight.cumulative_large_amount >= 50_000.0 {
                flags.push(Flag::LargeCumulativeNearLimit {
                    amount: weight.cumulative_large_amount,
                });
            }
        } else {
            flags.push(Flag::StructuringSmallAmounts);
        }
    }

    if weight.z_score_30d >= 3.0 {
        flags.push(Flag::HighActivity);
    }
    if weight.small_transaction_ratio >= 0.8 {
        flags.push(Flag::SmallAmountPattern);
    }
    if weight.threshold_avoidance_ratio >= 0.7 {
        flags.push(Flag::ThresholdAvoidance {
            ratio: weight.threshold_avoidance_ratio,
        });
    }
    if weight.temporal_density_weeks > 0.5 {
        flags.push(Flag::HighTemporalDensity {
            per_week: weight.temporal_density_weeks,
        });
    }
    if weight.source_of_funds_exceeded {
        flags.push(Flag::SourceOfFundsExceeded);
    }
    if weight.economic_plausibility_issue {
        flags.push(Flag::EconomicPlausibility);
    }

    if entropy.entropy_aggregate < 0.3 {
        flags.push(Flag::EntropyConcentration);
    } else if entropy.entropy_aggregate > 2.0 {
        flags.push(Flag::EntropyDispersion);
    }
    if entropy.is_complex && entropy.z_score != 0.0 {
        if entropy.z_score > 2.0 {
            flags.push(Flag::UnusualDispersionVsHistory);
        } else if entropy.z_score < -2.0 {
            flags.push(Flag::ChannellingVsHistory);
        }
    }

    if !predictability.is_stable {
        if predictability.overall_predictability < 0.3 {
            flags.push(Flag::UnstableBehaviour);
        } else if predictability.overall_predictability < 0.5 {
            flags.push(Flag::UnpredictableBehaviour);
        }
    }
    if predictability.z_score < -2.0 {
        flags.push(Flag::PredictabilityDeviation);
    }

    if trust.current_score < 0.3 {
        flags.push(Flag::LowTrustScore);
    }
    if trust.self_deviation > 0.7 {
        flags.push(Flag::BehaviourChange);
    }

    if statistics.benford_score > 0.6 {
        flags.push(Flag::BenfordDeviation);
    }
    if statistics.velocity_score > 0.7 {
        flags.push(Flag::HighVelocity);
    }
    if statistics.time_anomaly_score > 0.6 {
        flags.push(Flag::TimeAnomalies);
    }
    if statistics.clustering_score > 0.7 {
        flags.push(Flag::PeerGroupDeviation);
    }
    if statistics.layering_score > 0.5 {
        flags.push(Flag::LayeringSuspected);
    } else if statistics.layering_score > 0.3 {
        flags.push(Flag::LayeringPattern);
    }

    flags
}

/// Derive operational recommendations from the risk level and the flags
pub fn generate_recommendations(risk_level: RiskLevel, flags: &[Flag]) -> Vec<String> {
    let mut recommendations: Vec<String> = Vec::new();

    match risk_level {
        RiskLevel::Green => {
            recommendations.push("✅ No action required".to_string());
        }
        RiskLevel::Yellow => {
            recommendations.push("👁️ Intensify monitoring".to_string());
            recommendations.push("📝 Document the transaction pattern".to_string());
        }
        RiskLevel::Orange => {
            recommendations.push("📄 Request supporting documents (e.g. source of funds)".to_string());
            recommendations.push("🔍 Consider enhanced due diligence".to_string());
            recommendations.push("📞 Contact the customer".to_string());
        }
        RiskLevel::Red => {
            recommendations.push("🚨 URGENT: supporting documents required".to_string());
            recommendations.push("⚠️ Perform enhanced due diligence".to_string());
            recommendations.push("📋 Notify the compliance team".to_string());
            recommendations.push("🔒 Consider temporary limits".to_string());
        }
    }

    let has_structuring = flags.iter().any(|f| {
        matches!(
            f,
            Flag::StructuringNearLimit | Flag::StructuringSmallAmounts
        )
    });
    if has_structuring {
        recommendations
            .push("💡 Verify the business rationale for the payment structure".to_string());
    }

    if flags.iter().any(|f| matches!(f, Flag::BenfordDeviation)) {
        recommendations.push("💡 Verify receipts and invoices for authenticity".to_string());
    }

    if flags.iter().any(|f| matches!(f, Flag::HighVelocity)) {
        recommendations
            .push("💡 Verify the plausibility of the transaction frequency".to_string());
    }

    let has_layering = flags
        .iter()
        .any(|f| matches!(f, Flag::LayeringSuspected | Flag::LayeringPattern));
    if has_layering {
        recommendations
            .push("🚨 LAUNDERING SUSPECTED: request source of funds for cash deposits".to_string());
        recommendations
            .push("🔍 Verify the link between deposits and withdrawals".to_string());
        recommendations
            .push("⚠️ Consider filing a suspicious activity report".to_string());
    }

    recommendations
}
