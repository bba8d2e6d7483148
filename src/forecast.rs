//! Near-future spending and balance projection.
//!
//! Per-category forecasts come from an OLS trend over the monthly expense
//! series; the projection itself is a deliberately simple fixed-step
//! extrapolation (configurable), monotonic per direction and floored at
//! zero. A balance forecast built from the indicator series is always
//! present under the reserved category id 0.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::TrendDirection;
use crate::timeseries;
use crate::{DetectorConfig, MonthlyIndicator, Transaction};

/// Reserved category id for the overall balance forecast.
pub const BALANCE_CATEGORY_ID: i64 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ForecastKind {
    CategorySpending,
    Balance,
}

/// Projected trend for one category (or the overall balance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendForecast {
    pub category_id: i64,
    pub kind: ForecastKind,
    pub horizon_months: u32,
    pub predicted_values: Vec<f64>,
    pub direction: TrendDirection,
    /// [0, 1]; decays from the fitted trend's own confidence.
    pub confidence: f64,
    /// Reserved for seasonal corrections; currently always empty.
    pub seasonal_adjustments: Vec<f64>,
    pub assumptions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Builds category spending forecasts plus the balance forecast.
///
/// Categories only produce a forecast when their fitted slope clears
/// `config.trend_slope_threshold`. Output is sorted descending by
/// confidence, ties by ascending category id.
pub fn generate_trend_forecasts(
    transactions: &[Transaction],
    indicators: &[MonthlyIndicator],
    months: u32,
    config: &DetectorConfig,
) -> Vec<TrendForecast> {
    let axis = timeseries::month_axis(transactions);
    let category_ids: BTreeSet<i64> = transactions.iter().map(|tx| tx.category_id).collect();

    let mut forecasts: Vec<TrendForecast> = category_ids
        .into_iter()
        .filter_map(|category_id| {
            let series = timeseries::category_expense_series(transactions, category_id, &axis);
            category_forecast(category_id, &series, months, config)
        })
        .collect();

    forecasts.push(balance_forecast(indicators, months, config));

    forecasts.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    forecasts
}

fn category_forecast(
    category_id: i64,
    series: &[f64],
    months: u32,
    config: &DetectorConfig,
) -> Option<TrendForecast> {
    let fit = timeseries::fit_linear(series)?;
    if fit.slope.abs() <= config.trend_slope_threshold {
        return None;
    }

    let direction = if fit.slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    let step = match direction {
        TrendDirection::Increasing => config.forecast_step_up,
        TrendDirection::Decreasing | TrendDirection::Stable => -config.forecast_step_down,
    };

    let last = series.last().copied().unwrap_or(0.0);
    let predicted_values: Vec<f64> = (1..=months)
        .map(|k| (last + step * k as f64).max(0.0))
        .collect();

    Some(TrendForecast {
        category_id,
        kind: ForecastKind::CategorySpending,
        horizon_months: months,
        predicted_values,
        direction,
        confidence: (fit.r_squared * 0.8).clamp(0.0, 1.0),
        seasonal_adjustments: Vec::new(),
        assumptions: vec![
            "spending trend continues at a fixed monthly step".to_string(),
            "no seasonal correction applied".to_string(),
        ],
        generated_at: Utc::now(),
    })
}

/// Projects the overall balance by the mean month-over-month delta.
/// A single indicator point leaves the delta undefined, treated as 0.
fn balance_forecast(
    indicators: &[MonthlyIndicator],
    months: u32,
    config: &DetectorConfig,
) -> TrendForecast {
    let balances: Vec<f64> = indicators.iter().map(|i| i.balance).collect();
    let avg_delta = if balances.len() >= 2 {
        let deltas: Vec<f64> = balances.windows(2).map(|w| w[1] - w[0]).collect();
        timeseries::mean(&deltas)
    } else {
        0.0
    };

    let direction = if avg_delta > 0.0 {
        TrendDirection::Increasing
    } else if avg_delta < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let last = balances.last().copied().unwrap_or(0.0);
    // Balances may legitimately go negative; no zero floor here.
    let predicted_values: Vec<f64> = (1..=months)
        .map(|k| last + avg_delta * k as f64)
        .collect();

    let confidence = ((indicators.len() as f64 / 12.0).min(1.0) * 0.9)
        .max(config.balance_confidence_floor)
        .clamp(0.0, 1.0);

    TrendForecast {
        category_id: BALANCE_CATEGORY_ID,
        kind: ForecastKind::Balance,
        horizon_months: months,
        predicted_values,
        direction,
        confidence,
        seasonal_adjustments: Vec::new(),
        assumptions: vec!["balance keeps moving by its average monthly delta".to_string()],
        generated_at: Utc::now(),
    }
}
