//! # Spending Patterns
//!
//! A statistical pattern-detection and anomaly-scoring engine for personal
//! finance data.
//!
//! ## Features
//!
//! - **Seasonality Detection**: Per-category calendar-month cycles with
//!   peak/low windows, amplitude, and impact scoring
//! - **Spending Profile**: Weekday distribution, amount buckets, monthly
//!   frequency, and OLS growth trend
//! - **Anomaly Scoring**: Four independent typed detectors (amount, timing,
//!   frequency, seasonal) combined into a weighted 0-100 severity
//! - **Category Classification**: Text/amount/timing similarity ranking for
//!   unlabeled transactions
//! - **Trend Forecasting**: Near-future category spending and overall
//!   balance projection
//!
//! The engine is pure, synchronous computation over caller-owned
//! collections: [`PatternDetector::analyze_patterns`] builds an immutable
//! [`PatternAnalysis`] snapshot once, and every downstream call reads it by
//! shared reference. Insufficient data degrades to explicit sentinel
//! results, never to errors or NaN.

pub mod anomaly;
pub mod classify;
pub mod forecast;
pub mod profile;
pub mod seasonality;
pub mod timeseries;

pub use anomaly::{AnomalyFactor, AnomalyKind, DetectorVerdict, SpendingAnomaly};
pub use classify::CategoryPrediction;
pub use forecast::{ForecastKind, TrendForecast, BALANCE_CATEGORY_ID};
pub use profile::{
    AmountBuckets, DayOfWeekStats, FrequencyProfile, GrowthTrend, SpendingPatterns,
    TimeOfDaySupport, TrendDirection,
};
pub use seasonality::{CycleKind, SeasonalPattern};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Input-boundary errors. The analysis core itself never fails on data
/// volume; thin data degrades to explicit sentinel results instead.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid ISO-8601 date '{value}': {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("forecast horizon must be at least one month")]
    InvalidHorizon,
}

/// Transaction flow direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
            TransactionKind::Transfer => write!(f, "transfer"),
        }
    }
}

/// Immutable transaction snapshot supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub category_id: i64,
    /// Signed, currency-neutral amount; expense series use the absolute
    /// value so the host's sign convention does not matter.
    pub amount: f64,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub description: String,
}

impl Transaction {
    /// Builds a transaction from host-supplied fields, parsing the
    /// ISO-8601 calendar date.
    pub fn from_record(
        id: impl Into<String>,
        category_id: i64,
        amount: f64,
        date: &str,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Result<Self, PatternError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| {
            PatternError::InvalidDate {
                value: date.to_string(),
                source,
            }
        })?;
        Ok(Self {
            id: id.into(),
            category_id,
            amount,
            date,
            kind,
            description: description.into(),
        })
    }
}

/// Read-only category reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: TransactionKind,
}

/// Per-month aggregate supplied by the caller, chronologically ordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonthlyIndicator {
    pub confirmed_expenses: f64,
    pub balance: f64,
}

/// Lightweight per-category baseline consumed by the anomaly evaluator and
/// the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryModel {
    /// Mean of absolute transaction amounts.
    pub amount_mean: f64,
    /// Population standard deviation of absolute amounts.
    pub amount_std_dev: f64,
    pub sample_count: usize,
    /// Transaction counts per weekday, 0 = Sunday through 6 = Saturday.
    pub weekday_counts: [usize; 7],
    /// Mean transactions per observed month.
    pub monthly_tx_mean: f64,
    /// Distinct months in which the category appears.
    pub months_observed: usize,
    /// Lowercased description word frequencies.
    pub token_counts: BTreeMap<String, usize>,
}

/// Immutable analysis snapshot: produced once per cycle, then read by
/// every downstream call. Refreshing means re-running the full analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Sorted descending by impact score.
    pub seasonal_patterns: Vec<SeasonalPattern>,
    pub spending_patterns: SpendingPatterns,
    /// Only pairs with |r| above the configured threshold, keyed
    /// `"minId-maxId"`.
    pub category_correlations: BTreeMap<String, f64>,
    pub predictive_models: BTreeMap<i64, CategoryModel>,
    /// Overall data confidence in [0, 1].
    pub confidence_score: f64,
    pub analyzed_at: DateTime<Utc>,
}

impl PatternAnalysis {
    /// Export as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Detection thresholds and combination weights.
///
/// Immutable once constructed; the engine holds no other state, so a
/// single detector is safe to share across concurrent callers.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum months on the axis before seasonality is attempted.
    pub min_seasonal_months: usize,
    /// Correlation pairs below this |r| are dropped.
    pub correlation_threshold: f64,

    /// Amount detector: z-score at which an amount is an outlier.
    pub amount_zscore_threshold: f64,
    /// Timing detector: weekday share below this is historically rare.
    pub timing_rare_share: f64,
    /// Timing detector: minimum samples before weekday shares mean much.
    pub timing_min_samples: usize,
    /// Frequency detector: monthly count over mean ratio that flags.
    pub frequency_ratio_threshold: f64,

    /// Factor weights applied to detector-local severities.
    pub amount_weight: f64,
    pub timing_weight: f64,
    pub frequency_weight: f64,
    pub seasonal_weight: f64,

    /// Classifier similarity weights (sum to 1).
    pub text_weight: f64,
    pub amount_sim_weight: f64,
    pub timing_sim_weight: f64,
    /// Predictions below this confidence are excluded entirely.
    pub min_prediction_confidence: f64,

    /// |slope| a category trend must clear to be forecast.
    pub trend_slope_threshold: f64,
    /// Fixed per-month projection steps for rising/falling trends.
    pub forecast_step_up: f64,
    pub forecast_step_down: f64,
    /// Default forecast horizon in months.
    pub forecast_horizon: u32,
    /// Lower bound on balance-forecast confidence.
    pub balance_confidence_floor: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_seasonal_months: 12,
            correlation_threshold: 0.3,
            amount_zscore_threshold: 3.0,
            timing_rare_share: 0.05,
            timing_min_samples: 10,
            frequency_ratio_threshold: 2.0,
            amount_weight: 30.0,
            timing_weight: 20.0,
            frequency_weight: 25.0,
            seasonal_weight: 15.0,
            text_weight: 0.5,
            amount_sim_weight: 0.3,
            timing_sim_weight: 0.2,
            min_prediction_confidence: 0.1,
            trend_slope_threshold: 0.1,
            forecast_step_up: 50.0,
            forecast_step_down: 30.0,
            forecast_horizon: 3,
            balance_confidence_floor: 0.2,
        }
    }
}

/// Financial pattern detector.
///
/// All methods take `&self`; the detector carries only its configuration
/// and no scratch state, so each call is independent and reentrant.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: DetectorConfig,
}

impl PatternDetector {
    /// Create a detector with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector with custom thresholds.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Builds the full [`PatternAnalysis`] snapshot from transaction
    /// history and monthly indicators.
    pub fn analyze_patterns(
        &self,
        transactions: &[Transaction],
        indicators: &[MonthlyIndicator],
    ) -> PatternAnalysis {
        debug!(
            transactions = transactions.len(),
            indicators = indicators.len(),
            "building pattern analysis snapshot"
        );

        let seasonal_patterns =
            seasonality::detect_seasonal_patterns(transactions, indicators, &self.config);
        let spending_patterns = profile::analyze_spending_patterns(transactions);
        let category_correlations =
            timeseries::category_correlations(transactions, self.config.correlation_threshold);
        let predictive_models = build_category_models(transactions);
        let confidence_score = overall_confidence(transactions, &seasonal_patterns);

        PatternAnalysis {
            seasonal_patterns,
            spending_patterns,
            category_correlations,
            predictive_models,
            confidence_score,
            analyzed_at: Utc::now(),
        }
    }

    /// Scores recent transactions against the snapshot baseline.
    pub fn detect_anomalies(
        &self,
        recent: &[Transaction],
        analysis: &PatternAnalysis,
    ) -> Vec<SpendingAnomaly> {
        debug!(recent = recent.len(), "scoring transactions for anomalies");
        anomaly::detect_anomalies(recent, analysis, &self.config)
    }

    /// Predicts the most likely categories for an unlabeled transaction.
    pub fn classify_transaction(
        &self,
        tx: &Transaction,
        analysis: &PatternAnalysis,
        categories: &[Category],
    ) -> Vec<CategoryPrediction> {
        debug!(transaction = %tx.id, "classifying transaction");
        classify::classify_transaction(tx, analysis, categories, &self.config)
    }

    /// Projects per-category spending and the overall balance `months`
    /// ahead. A zero horizon is a caller contract violation.
    pub fn generate_trend_forecasts(
        &self,
        transactions: &[Transaction],
        indicators: &[MonthlyIndicator],
        months: u32,
    ) -> Result<Vec<TrendForecast>, PatternError> {
        if months == 0 {
            return Err(PatternError::InvalidHorizon);
        }
        debug!(months, "generating trend forecasts");
        Ok(forecast::generate_trend_forecasts(
            transactions,
            indicators,
            months,
            &self.config,
        ))
    }
}

/// Builds the per-category baselines the evaluator and classifier read.
fn build_category_models(transactions: &[Transaction]) -> BTreeMap<i64, CategoryModel> {
    let mut amounts: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    let mut weekdays: BTreeMap<i64, [usize; 7]> = BTreeMap::new();
    let mut months: BTreeMap<i64, BTreeSet<timeseries::MonthKey>> = BTreeMap::new();
    let mut tokens: BTreeMap<i64, BTreeMap<String, usize>> = BTreeMap::new();

    for tx in transactions {
        amounts
            .entry(tx.category_id)
            .or_default()
            .push(tx.amount.abs());
        let weekday = tx.date.weekday().num_days_from_sunday() as usize;
        weekdays.entry(tx.category_id).or_insert([0; 7])[weekday] += 1;
        months
            .entry(tx.category_id)
            .or_default()
            .insert(timeseries::MonthKey::from_date(tx.date));
        let token_counts = tokens.entry(tx.category_id).or_default();
        for token in classify::tokenize(&tx.description) {
            *token_counts.entry(token).or_insert(0) += 1;
        }
    }

    amounts
        .into_iter()
        .map(|(category_id, values)| {
            let months_observed = months.get(&category_id).map_or(0, BTreeSet::len);
            let sample_count = values.len();
            let monthly_tx_mean = if months_observed > 0 {
                sample_count as f64 / months_observed as f64
            } else {
                0.0
            };
            let model = CategoryModel {
                amount_mean: timeseries::mean(&values),
                amount_std_dev: timeseries::std_dev(&values),
                sample_count,
                weekday_counts: weekdays.get(&category_id).copied().unwrap_or([0; 7]),
                monthly_tx_mean,
                months_observed,
                token_counts: tokens.remove(&category_id).unwrap_or_default(),
            };
            (category_id, model)
        })
        .collect()
}

/// Blends data coverage with mean seasonal confidence into [0, 1].
fn overall_confidence(transactions: &[Transaction], patterns: &[SeasonalPattern]) -> f64 {
    let coverage = (timeseries::month_axis(transactions).len() as f64 / 12.0).min(1.0);
    let seasonal = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.confidence).sum::<f64>() / patterns.len() as f64
    };
    (0.5 * coverage + 0.5 * seasonal).clamp(0.0, 1.0)
}
