//! End-to-end scenarios over the full pipeline

use chrono::{Duration, NaiveDate, NaiveDateTime};
use detector_core::types::{CustomerInfo, PaymentMethod, Transaction, TransactionType};
use rust_decimal::Decimal;
use scoring_engine::{points, EngineConfig, RiskEngine, RiskLevel};

fn ts(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn txn(
    customer: &str,
    id: &str,
    amount: i64,
    method: PaymentMethod,
    kind: TransactionType,
    timestamp: NaiveDateTime,
) -> Transaction {
    Transaction {
        customer_id: customer.to_string(),
        transaction_id: id.to_string(),
        customer_name: format!("Customer {customer}"),
        amount: Decimal::from(amount),
        payment_method: method,
        transaction_type: kind,
        timestamp: Some(timestamp),
    }
}

/// Twelve monthly 500 EUR cash deposits: an ordinary saver stays GREEN.
#[test]
fn normal_saver_stays_green() {
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 11, 7, 12));
    // Every fourth Wednesday at 10:00, 2024-01-03 is a Wednesday
    engine.add_transactions(
        (0..12)
            .map(|i| {
                txn(
                    "SAVER",
                    &format!("T{i}"),
                    500,
                    PaymentMethod::Cash,
                    TransactionType::Investment,
                    ts(2024, 1, 3, 10) + Duration::days(i * 28),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("SAVER", 364, None).unwrap();

    let weight = profile.weight_analysis.as_ref().unwrap();
    assert!(!weight.is_suspicious);
    assert!(weight.small_transaction_ratio > 0.8);
    assert!(weight.threshold_avoidance_ratio < 0.3);
    assert!(weight.temporal_density_weeks < 0.5);

    let statistics = profile.statistical_analysis.as_ref().unwrap();
    assert!(statistics.layering_score <= 0.5);

    assert!(profile.suspicion_score.value() < 150.0);
    assert_eq!(profile.risk_level, RiskLevel::Green);
}

/// Twelve near-limit cash deposits inside three months: classic structuring.
#[test]
fn classic_smurfer_is_orange_or_red() {
    let amounts = [
        9500, 8700, 9900, 7600, 9200, 8800, 9400, 7900, 9600, 8500, 9300, 8100,
    ];
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 6, 1, 12));
    engine.add_transactions(
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                txn(
                    "SMURF",
                    &format!("T{i}"),
                    *amount,
                    PaymentMethod::Cash,
                    TransactionType::Investment,
                    ts(2024, 3, 1, 10) + Duration::days(i as i64 * 8),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("SMURF", 120, None).unwrap();

    let weight = profile.weight_analysis.as_ref().unwrap();
    assert!(weight.is_suspicious);
    assert!(weight.threshold_avoidance_ratio >= 0.9);
    assert!(weight.cumulative_large_amount >= 50_000.0);
    assert!(weight.temporal_density_weeks > 0.5);

    assert!(profile.suspicion_score.value() >= 300.0);
    assert!(matches!(
        profile.risk_level,
        RiskLevel::Orange | RiskLevel::Red
    ));
    assert!(profile
        .flags
        .iter()
        .any(|f| f.contains("STRUCTURING SUSPECTED")));
}

/// Cash in, SEPA out at matching volume and pace: layering goes RED.
#[test]
fn layering_pattern_is_red() {
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 6, 1, 12));

    let mut txns = Vec::new();
    for i in 0..8i64 {
        txns.push(txn(
            "LAYER",
            &format!("B{i}"),
            9000,
            PaymentMethod::Cash,
            TransactionType::Investment,
            ts(2024, 1, 3, 10) + Duration::days(i * 10),
        ));
    }
    for i in 0..6i64 {
        txns.push(txn(
            "LAYER",
            &format!("E{i}"),
            11_000,
            PaymentMethod::Sepa,
            TransactionType::Withdrawal,
            ts(2024, 1, 20, 14) + Duration::days(i * 12),
        ));
    }
    engine.add_transactions(txns);

    let profile = engine.analyze_customer("LAYER", 180, None).unwrap();

    let statistics = profile.statistical_analysis.as_ref().unwrap();
    assert!(statistics.layering_score >= 0.7);

    let breakdown = points::module_points(
        profile.weight_analysis.as_ref().unwrap(),
        profile.entropy_analysis.as_ref().unwrap(),
        profile.predictability_analysis.as_ref().unwrap(),
        statistics,
    );
    assert!(breakdown.statistics.suspicion_points >= 300.0);
    assert!(points::amplification_factor(&breakdown) >= 1.3);

    assert!(profile.suspicion_score.value() >= 500.0);
    assert_eq!(profile.risk_level, RiskLevel::Red);
    assert!(profile
        .recommendations
        .iter()
        .any(|r| r.contains("suspicious activity report")));
}

/// Fifty identical SEPA transfers on the same weekday and hour: extreme
/// concentration fires the entropy module, nothing else.
#[test]
fn entropy_concentration_fires_alone() {
    let config = EngineConfig {
        recent_days: 350,
        historical_days: 400,
        ..EngineConfig::default()
    };
    let mut engine =
        RiskEngine::with_config(config).unwrap().with_reference_time(ts(2023, 12, 14, 12));
    engine.add_transactions(
        (0..50)
            .map(|i| {
                txn(
                    "UNIFORM",
                    &format!("T{i}"),
                    1000,
                    PaymentMethod::Sepa,
                    TransactionType::Investment,
                    ts(2023, 1, 4, 10) + Duration::days(i * 7),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("UNIFORM", 350, None).unwrap();

    let entropy = profile.entropy_analysis.as_ref().unwrap();
    assert!(entropy.entropy_aggregate < 0.3);
    assert!(entropy.is_complex);

    let predictability = profile.predictability_analysis.as_ref().unwrap();
    assert!(predictability.is_stable);
    assert!(predictability.overall_predictability >= 0.7);

    let weight = profile.weight_analysis.as_ref().unwrap();
    assert!(!weight.is_suspicious);

    let breakdown = points::module_points(
        weight,
        entropy,
        predictability,
        profile.statistical_analysis.as_ref().unwrap(),
    );
    assert_eq!(breakdown.entropy.suspicion_points, 200.0);

    assert!(profile.suspicion_score.value() < 300.0);
}

/// Fifty amounts all leading with digit five: Benford deviation fires.
#[test]
fn fabricated_first_digits_fire_benford() {
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 3, 1, 12));
    engine.add_transactions(
        (0..50)
            .map(|i| {
                txn(
                    "FABRIC",
                    &format!("T{i}"),
                    5000 + i * 17,
                    PaymentMethod::Sepa,
                    TransactionType::Investment,
                    ts(2024, 1, 1, 11) + Duration::days(i),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("FABRIC", 90, None).unwrap();

    let statistics = profile.statistical_analysis.as_ref().unwrap();
    assert!(statistics.benford_score > 0.6);

    let breakdown = points::module_points(
        profile.weight_analysis.as_ref().unwrap(),
        profile.entropy_analysis.as_ref().unwrap(),
        profile.predictability_analysis.as_ref().unwrap(),
        statistics,
    );
    assert!(breakdown.statistics.suspicion_points >= 200.0);
    assert!(profile.flags.iter().any(|f| f.contains("BENFORD")));
}

/// Five 9,500 EUR cash deposits against a 2,500 EUR income: implausible.
#[test]
fn economic_plausibility_fires_with_income() {
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 6, 1, 12));
    engine.set_customer_info(CustomerInfo {
        customer_id: "IMPLAUSIBLE".to_string(),
        source_of_funds: None,
        monthly_income: Some(Decimal::from(2500)),
    });
    engine.add_transactions(
        (0..5)
            .map(|i| {
                txn(
                    "IMPLAUSIBLE",
                    &format!("T{i}"),
                    9500,
                    PaymentMethod::Cash,
                    TransactionType::Investment,
                    ts(2024, 4, 1, 10) + Duration::days(i * 10),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("IMPLAUSIBLE", 90, None).unwrap();

    let weight = profile.weight_analysis.as_ref().unwrap();
    assert!(weight.economic_plausibility_issue);
    assert!(weight.is_suspicious);

    let breakdown = points::module_points(
        weight,
        profile.entropy_analysis.as_ref().unwrap(),
        profile.predictability_analysis.as_ref().unwrap(),
        profile.statistical_analysis.as_ref().unwrap(),
    );
    // 300 for the avoidance ratio plus 150 for the plausibility issue
    assert!(breakdown.weight.suspicion_points >= 450.0);
    assert!(profile
        .flags
        .iter()
        .any(|f| f.contains("ECONOMIC PLAUSIBILITY")));
}

/// Identical input and reference time produce identical profiles.
#[test]
fn analysis_is_deterministic() {
    let build = || {
        let mut engine = RiskEngine::new().with_reference_time(ts(2024, 6, 1, 12));
        let mut txns = Vec::new();
        for i in 0..10i64 {
            txns.push(txn(
                "A",
                &format!("A{i}"),
                9300,
                PaymentMethod::Cash,
                TransactionType::Investment,
                ts(2024, 3, 1, 10) + Duration::days(i * 9),
            ));
            txns.push(txn(
                "B",
                &format!("B{i}"),
                400 + i * 13,
                PaymentMethod::Sepa,
                TransactionType::Investment,
                ts(2024, 4, 1, 9) + Duration::days(i * 3),
            ));
        }
        engine.add_transactions(txns);
        engine.analyze_all_customers(120)
    };

    let first = build();
    let second = build();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.customer_id, b.customer_id);
        assert_eq!(a.suspicion_score.value(), b.suspicion_score.value());
        assert_eq!(a.risk_level, b.risk_level);
        assert_eq!(a.flags, b.flags);
        assert_eq!(a.recommendations, b.recommendations);
    }
}

/// An empty historical slice never raises and zeroes every z-score.
#[test]
fn empty_history_is_robust() {
    let mut engine = RiskEngine::new().with_reference_time(ts(2024, 6, 1, 12));
    engine.add_transactions(
        (0..6)
            .map(|i| {
                txn(
                    "FRESH",
                    &format!("T{i}"),
                    800,
                    PaymentMethod::Sepa,
                    TransactionType::Investment,
                    ts(2024, 5, 10, 10) + Duration::days(i * 3),
                )
            })
            .collect(),
    );

    let profile = engine.analyze_customer("FRESH", 30, None).unwrap();

    let weight = profile.weight_analysis.as_ref().unwrap();
    assert_eq!(weight.z_score_7d, 0.0);
    assert_eq!(weight.z_score_30d, 0.0);
    assert_eq!(weight.z_score_90d, 0.0);
    assert_eq!(profile.entropy_analysis.as_ref().unwrap().z_score, 0.0);
    assert_eq!(
        profile.predictability_analysis.as_ref().unwrap().z_score,
        0.0
    );
}
