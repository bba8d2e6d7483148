//! Pattern analysis example
//!
//! This example demonstrates the full analysis cycle: building a pattern
//! snapshot from history, scoring recent transactions for anomalies,
//! classifying an unlabeled transaction, and forecasting trends.

use chrono::NaiveDate;
use spending_patterns::{
    Category, MonthlyIndicator, PatternDetector, Transaction, TransactionKind,
};

fn expense(
    id: &str,
    category_id: i64,
    amount: f64,
    year: i32,
    month: u32,
    day: u32,
    description: &str,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        category_id,
        amount,
        date: NaiveDate::from_ymd_opt(year, month, day).expect("valid date"),
        kind: TransactionKind::Expense,
        description: description.to_string(),
    }
}

fn main() {
    println!("=== Spending Pattern Detector ===\n");

    // Eighteen months of history: steady groceries, a utilities bill that
    // peaks every winter, and a slowly growing dining-out habit.
    let mut history = Vec::new();
    let mut n = 0;
    for offset in 0..18u32 {
        let year = 2023 + (offset / 12) as i32;
        let month = offset % 12 + 1;
        for day in [4, 11, 18, 25] {
            n += 1;
            history.push(expense(
                &format!("GRO-{}", n),
                1,
                85.0 + (n % 4) as f64 * 5.0,
                year,
                month,
                day,
                "supermarket grocery run",
            ));
        }
        let heating = if (11..=12).contains(&month) || month <= 2 {
            320.0
        } else {
            120.0
        };
        history.push(expense(
            &format!("UTI-{}", offset),
            2,
            heating,
            year,
            month,
            8,
            "electricity and heating bill",
        ));
        history.push(expense(
            &format!("DIN-{}", offset),
            3,
            60.0 + offset as f64 * 8.0,
            year,
            month,
            15,
            "restaurant dinner",
        ));
    }

    let indicators: Vec<MonthlyIndicator> = (0..18)
        .map(|i| MonthlyIndicator {
            confirmed_expenses: 650.0,
            balance: 2400.0 - 35.0 * i as f64,
        })
        .collect();

    let categories = vec![
        Category {
            id: 1,
            name: "Groceries".to_string(),
            kind: TransactionKind::Expense,
        },
        Category {
            id: 2,
            name: "Utilities".to_string(),
            kind: TransactionKind::Expense,
        },
        Category {
            id: 3,
            name: "Dining Out".to_string(),
            kind: TransactionKind::Expense,
        },
    ];

    let detector = PatternDetector::new();

    // 1. Build the analysis snapshot once; everything downstream reads it.
    println!("1. Pattern Analysis Snapshot");
    let analysis = detector.analyze_patterns(&history, &indicators);
    println!("   Overall confidence: {:.2}", analysis.confidence_score);
    for pattern in &analysis.seasonal_patterns {
        println!(
            "   Category {}: seasonal={} peaks={:?} lows={:?} impact={:.1}",
            pattern.category_id,
            pattern.is_seasonal,
            pattern.peak_months,
            pattern.low_months,
            pattern.impact_score
        );
    }
    for (pair, r) in &analysis.category_correlations {
        println!("   Correlation {}: r={:.2}", pair, r);
    }
    println!();

    // 2. Score a batch of recent transactions.
    println!("2. Anomaly Detection");
    let recent = vec![
        expense("NEW-1", 1, 92.0, 2024, 7, 4, "supermarket grocery run"),
        expense("NEW-2", 1, 1450.0, 2024, 7, 6, "supermarket grocery run"),
        expense("NEW-3", 3, 210.0, 2024, 7, 15, "restaurant dinner"),
    ];
    let anomalies = detector.detect_anomalies(&recent, &analysis);
    if anomalies.is_empty() {
        println!("   No anomalies detected");
    }
    for anomaly in &anomalies {
        println!(
            "   {}: {:?} severity={:.1} confidence={:.2}",
            anomaly.transaction_id, anomaly.anomaly_type, anomaly.severity_score, anomaly.confidence
        );
        for factor in &anomaly.factors {
            println!("     - {}", factor.reason);
        }
    }
    println!();

    // 3. Classify an unlabeled transaction.
    println!("3. Category Classification");
    let unlabeled = expense("NEW-4", 0, 88.0, 2024, 7, 11, "grocery run downtown");
    for prediction in detector.classify_transaction(&unlabeled, &analysis, &categories) {
        println!(
            "   {} ({:.2}): {}",
            prediction.category_name, prediction.confidence, prediction.reasoning
        );
    }
    println!();

    // 4. Forecast the next quarter.
    println!("4. Trend Forecasts");
    match detector.generate_trend_forecasts(&history, &indicators, 3) {
        Ok(forecasts) => {
            for forecast in &forecasts {
                println!(
                    "   Category {} ({:?}, {:?}): {:?} confidence={:.2}",
                    forecast.category_id,
                    forecast.kind,
                    forecast.direction,
                    forecast
                        .predicted_values
                        .iter()
                        .map(|v| (v * 100.0).round() / 100.0)
                        .collect::<Vec<f64>>(),
                    forecast.confidence
                );
            }
        }
        Err(err) => println!("   forecast failed: {}", err),
    }
}
