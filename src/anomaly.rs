//! Per-transaction anomaly scoring against a learned pattern baseline.
//!
//! Four independent detectors (amount, timing, frequency, seasonal) each
//! return a typed verdict. Flagged factors are weighted and summed into a
//! 0-100 severity score; a transaction with no flagged factors produces no
//! anomaly record at all.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::seasonality::SeasonalPattern;
use crate::timeseries::MonthKey;
use crate::{CategoryModel, DetectorConfig, PatternAnalysis, Transaction, TransactionKind};

/// Which learned pattern a detector scores against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnomalyKind {
    Amount,
    Timing,
    Frequency,
    Seasonal,
}

impl AnomalyKind {
    fn suggested_action(self) -> &'static str {
        match self {
            AnomalyKind::Amount => "Review whether this charge matches a real purchase",
            AnomalyKind::Timing => "Confirm the transaction date was entered correctly",
            AnomalyKind::Frequency => "Check for duplicate or unexpected recurring charges",
            AnomalyKind::Seasonal => "Verify this off-season spend was intentional",
        }
    }
}

/// Outcome of one detector for one transaction.
///
/// `Unsupported` means the baseline is too thin to judge; it is distinct
/// from `Clear` so a missing capability never reads as a real negative.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorVerdict {
    Flagged {
        kind: AnomalyKind,
        reason: String,
        /// Detector-local severity in [0, 1].
        severity: f64,
    },
    Clear,
    Unsupported,
}

/// One flagged factor contributing to an anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyFactor {
    pub kind: AnomalyKind,
    pub reason: String,
    /// Detector-local severity in [0, 1].
    pub severity: f64,
    /// Fixed weight applied when combining factors.
    pub weight: f64,
}

/// Scored anomaly for a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingAnomaly {
    pub transaction_id: String,
    /// Kind of the factor with the largest weighted contribution.
    pub anomaly_type: AnomalyKind,
    /// Combined weighted severity, clamped to [0, 100].
    pub severity_score: f64,
    /// min(factor_count * 0.3 + severity / 100, 1).
    pub confidence: f64,
    pub factors: Vec<AnomalyFactor>,
    pub description: String,
    pub suggested_actions: Vec<String>,
    pub detected_at: DateTime<Utc>,
}

/// Scores every transaction in `recent` against the baseline, keeping only
/// transactions with at least one flagged factor. Sorted descending by
/// severity score, ties by transaction id.
pub fn detect_anomalies(
    recent: &[Transaction],
    analysis: &PatternAnalysis,
    config: &DetectorConfig,
) -> Vec<SpendingAnomaly> {
    let mut anomalies: Vec<SpendingAnomaly> = recent
        .iter()
        .filter_map(|tx| evaluate_transaction_anomaly(tx, recent, analysis, config))
        .collect();

    anomalies.sort_by(|a, b| {
        b.severity_score
            .total_cmp(&a.severity_score)
            .then_with(|| a.transaction_id.cmp(&b.transaction_id))
    });
    anomalies
}

/// Runs all four detectors against one transaction.
///
/// Returns `None` when no detector flags: absence, not a zero-severity
/// record, is the no-anomaly signal.
pub fn evaluate_transaction_anomaly(
    tx: &Transaction,
    recent: &[Transaction],
    analysis: &PatternAnalysis,
    config: &DetectorConfig,
) -> Option<SpendingAnomaly> {
    let model = analysis.predictive_models.get(&tx.category_id);
    let seasonal = analysis
        .seasonal_patterns
        .iter()
        .find(|p| p.category_id == tx.category_id);

    let verdicts = [
        (check_amount(tx, model, config), config.amount_weight),
        (check_timing(tx, model, config), config.timing_weight),
        (
            check_frequency(tx, recent, model, config),
            config.frequency_weight,
        ),
        (check_seasonal(tx, seasonal), config.seasonal_weight),
    ];

    let mut factors = Vec::new();
    for (verdict, weight) in verdicts {
        if let DetectorVerdict::Flagged {
            kind,
            reason,
            severity,
        } = verdict
        {
            factors.push(AnomalyFactor {
                kind,
                reason,
                severity: severity.clamp(0.0, 1.0),
                weight,
            });
        }
    }

    if factors.is_empty() {
        return None;
    }

    let severity_score = factors
        .iter()
        .map(|f| f.severity * f.weight)
        .sum::<f64>()
        .clamp(0.0, 100.0);
    let confidence = (factors.len() as f64 * 0.3 + severity_score / 100.0).min(1.0);
    let anomaly_type = dominant_kind(&factors);

    let mut suggested_actions: Vec<String> = factors
        .iter()
        .map(|f| f.kind.suggested_action().to_string())
        .collect();
    suggested_actions.dedup();

    let description = format!(
        "Transaction {} deviates from the historical pattern of its category on {} factor(s)",
        tx.id,
        factors.len()
    );

    Some(SpendingAnomaly {
        transaction_id: tx.id.clone(),
        anomaly_type,
        severity_score,
        confidence: confidence.clamp(0.0, 1.0),
        factors,
        description,
        suggested_actions,
        detected_at: Utc::now(),
    })
}

/// Kind of the factor with the largest weighted contribution; earlier
/// detector order wins ties.
fn dominant_kind(factors: &[AnomalyFactor]) -> AnomalyKind {
    let mut best = &factors[0];
    for factor in &factors[1..] {
        if factor.severity * factor.weight > best.severity * best.weight {
            best = factor;
        }
    }
    best.kind
}

/// Amount outlier: z-score of |amount| against the category baseline.
fn check_amount(
    tx: &Transaction,
    model: Option<&CategoryModel>,
    config: &DetectorConfig,
) -> DetectorVerdict {
    let Some(model) = model else {
        return DetectorVerdict::Unsupported;
    };
    if model.sample_count < 2 || model.amount_std_dev <= 0.0 {
        return DetectorVerdict::Unsupported;
    }

    let z = (tx.amount.abs() - model.amount_mean).abs() / model.amount_std_dev;
    if z < config.amount_zscore_threshold {
        return DetectorVerdict::Clear;
    }

    DetectorVerdict::Flagged {
        kind: AnomalyKind::Amount,
        reason: format!(
            "amount {:.2} is {:.1} standard deviations from the category mean {:.2}",
            tx.amount.abs(),
            z,
            model.amount_mean
        ),
        severity: (z / 6.0).min(1.0),
    }
}

/// Timing: flags weekdays the category historically almost never uses.
fn check_timing(
    tx: &Transaction,
    model: Option<&CategoryModel>,
    config: &DetectorConfig,
) -> DetectorVerdict {
    let Some(model) = model else {
        return DetectorVerdict::Unsupported;
    };
    if model.sample_count < config.timing_min_samples {
        return DetectorVerdict::Unsupported;
    }

    let weekday = tx.date.weekday().num_days_from_sunday() as usize;
    let share = model.weekday_counts[weekday] as f64 / model.sample_count as f64;
    if share >= config.timing_rare_share {
        return DetectorVerdict::Clear;
    }

    DetectorVerdict::Flagged {
        kind: AnomalyKind::Timing,
        reason: format!(
            "weekday {} holds only {:.1}% of this category's history",
            weekday,
            share * 100.0
        ),
        severity: (1.0 - share / config.timing_rare_share).clamp(0.0, 1.0),
    }
}

/// Frequency: current-month transaction count versus the category norm.
fn check_frequency(
    tx: &Transaction,
    recent: &[Transaction],
    model: Option<&CategoryModel>,
    config: &DetectorConfig,
) -> DetectorVerdict {
    let Some(model) = model else {
        return DetectorVerdict::Unsupported;
    };
    if model.months_observed == 0 || model.monthly_tx_mean <= 0.0 {
        return DetectorVerdict::Unsupported;
    }

    let month = MonthKey::from_date(tx.date);
    let current_count = recent
        .iter()
        .filter(|t| t.category_id == tx.category_id && MonthKey::from_date(t.date) == month)
        .count();

    let ratio = current_count as f64 / model.monthly_tx_mean;
    if ratio < config.frequency_ratio_threshold {
        return DetectorVerdict::Clear;
    }

    DetectorVerdict::Flagged {
        kind: AnomalyKind::Frequency,
        reason: format!(
            "{} transactions this month versus a typical {:.1}",
            current_count, model.monthly_tx_mean
        ),
        severity: (0.5 + (ratio - config.frequency_ratio_threshold) / 2.0).clamp(0.0, 1.0),
    }
}

/// Seasonal: expense landing in an established low month of a seasonal
/// category.
fn check_seasonal(tx: &Transaction, pattern: Option<&SeasonalPattern>) -> DetectorVerdict {
    if tx.kind != TransactionKind::Expense {
        return DetectorVerdict::Clear;
    }
    let Some(pattern) = pattern else {
        return DetectorVerdict::Unsupported;
    };
    if !pattern.is_seasonal {
        return DetectorVerdict::Unsupported;
    }

    let month = tx.date.month();
    if !pattern.low_months.contains(&month) {
        return DetectorVerdict::Clear;
    }

    DetectorVerdict::Flagged {
        kind: AnomalyKind::Seasonal,
        reason: format!(
            "spend in month {} falls in an established low window for this category",
            month
        ),
        severity: pattern.confidence.clamp(0.0, 1.0),
    }
}
