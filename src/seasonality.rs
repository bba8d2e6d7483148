//! Seasonal spending pattern detection.
//!
//! Looks for calendar-month cycles in per-category expense totals: a month
//! bucket whose mean sits more than one standard deviation away from the
//! overall series mean counts as a peak or a low.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::timeseries::{self, MonthKey};
use crate::{DetectorConfig, MonthlyIndicator, Transaction};

/// Cycle shape a seasonal pattern was detected against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleKind {
    /// Twelve calendar-month buckets pooled across years.
    Monthly,
}

/// Detected (or ruled-out) seasonal cycle for one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPattern {
    pub category_id: i64,
    pub cycle: CycleKind,
    pub cycle_length: u32,
    /// Calendar months (1-12) whose mean exceeds mean + stddev.
    pub peak_months: Vec<u32>,
    /// Calendar months (1-12) whose mean falls below mean - stddev.
    pub low_months: Vec<u32>,
    pub is_seasonal: bool,
    /// max(series) - min(series) over the monthly totals.
    pub amplitude: f64,
    /// min(amplitude / mean, 1); 0 when the series mean is 0.
    pub confidence: f64,
    /// Category spend relative to average monthly spend, scaled to [0, 100].
    pub impact_score: f64,
}

/// Detects per-category monthly seasonality.
///
/// A category is skipped (not reported) when its own history covers fewer
/// than `config.min_seasonal_months` distinct months; a short-lived
/// category inside a long dataset never qualifies. Output is sorted
/// descending by impact score, ties broken by ascending category id.
pub fn detect_seasonal_patterns(
    transactions: &[Transaction],
    indicators: &[MonthlyIndicator],
    config: &DetectorConfig,
) -> Vec<SeasonalPattern> {
    let axis = timeseries::month_axis(transactions);
    if axis.len() < config.min_seasonal_months {
        return Vec::new();
    }

    let mut observed_months: BTreeMap<i64, BTreeSet<MonthKey>> = BTreeMap::new();
    for tx in transactions {
        observed_months
            .entry(tx.category_id)
            .or_default()
            .insert(MonthKey::from_date(tx.date));
    }

    let avg_monthly_spend = timeseries::mean(
        &indicators
            .iter()
            .map(|i| i.confirmed_expenses)
            .collect::<Vec<f64>>(),
    );

    let mut patterns: Vec<SeasonalPattern> = observed_months
        .into_iter()
        .filter(|(_, months)| months.len() >= config.min_seasonal_months)
        .map(|(category_id, _)| {
            let series = timeseries::category_expense_series(transactions, category_id, &axis);
            analyze_category(category_id, &series, &axis, avg_monthly_spend)
        })
        .collect();

    patterns.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    patterns
}

fn analyze_category(
    category_id: i64,
    series: &[f64],
    axis: &[MonthKey],
    avg_monthly_spend: f64,
) -> SeasonalPattern {
    let overall_mean = timeseries::mean(series);
    let overall_std = timeseries::std_dev(series);

    let (peak_months, low_months) = month_buckets(series, axis, overall_mean, overall_std);
    let is_seasonal = !peak_months.is_empty() || !low_months.is_empty();

    let max = series.iter().copied().fold(f64::MIN, f64::max);
    let min = series.iter().copied().fold(f64::MAX, f64::min);
    let amplitude = if series.is_empty() { 0.0 } else { max - min };

    // Zero-mean series carry no signal; confidence must not divide by zero.
    let confidence = if overall_mean > 0.0 {
        (amplitude / overall_mean).min(1.0)
    } else {
        0.0
    };

    let total_spend: f64 = series.iter().sum();
    let impact_score = if avg_monthly_spend > 0.0 {
        (total_spend / avg_monthly_spend).min(1.0) * 100.0
    } else {
        0.0
    };

    SeasonalPattern {
        category_id,
        cycle: CycleKind::Monthly,
        cycle_length: 12,
        peak_months,
        low_months,
        is_seasonal,
        amplitude,
        confidence: confidence.clamp(0.0, 1.0),
        impact_score: impact_score.clamp(0.0, 100.0),
    }
}

/// Pools series points into 12 calendar-month buckets and classifies each
/// bucket mean against the overall mean +/- one standard deviation.
fn month_buckets(
    series: &[f64],
    axis: &[MonthKey],
    overall_mean: f64,
    overall_std: f64,
) -> (Vec<u32>, Vec<u32>) {
    let mut peaks = Vec::new();
    let mut lows = Vec::new();

    for month in 1..=12u32 {
        let bucket: Vec<f64> = axis
            .iter()
            .zip(series.iter())
            .filter(|(key, _)| key.month == month)
            .map(|(_, &value)| value)
            .collect();
        if bucket.is_empty() {
            continue;
        }
        let bucket_mean = timeseries::mean(&bucket);
        if bucket_mean > overall_mean + overall_std {
            peaks.push(month);
        } else if bucket_mean < overall_mean - overall_std {
            lows.push(month);
        }
    }

    (peaks, lows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionKind;
    use chrono::NaiveDate;

    fn expense(category_id: i64, amount: f64, year: i32, month: u32) -> Transaction {
        Transaction {
            id: format!("TXN-{}-{}-{}", category_id, year, month),
            category_id,
            amount,
            date: NaiveDate::from_ymd_opt(year, month, 10).unwrap(),
            kind: TransactionKind::Expense,
            description: "seasonal test".to_string(),
        }
    }

    fn indicator(confirmed_expenses: f64) -> MonthlyIndicator {
        MonthlyIndicator {
            confirmed_expenses,
            balance: 1000.0,
        }
    }

    fn year_of_spend(category_id: i64, monthly: [f64; 12]) -> Vec<Transaction> {
        monthly
            .iter()
            .enumerate()
            .filter(|(_, &amount)| amount > 0.0)
            .map(|(i, &amount)| expense(category_id, amount, 2024, i as u32 + 1))
            .collect()
    }

    #[test]
    fn test_flat_series_is_not_seasonal() {
        let txs = year_of_spend(1, [100.0; 12]);
        let indicators: Vec<MonthlyIndicator> = (0..12).map(|_| indicator(100.0)).collect();

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        assert_eq!(patterns.len(), 1);
        assert!(!patterns[0].is_seasonal);
        assert!(patterns[0].peak_months.is_empty());
        assert!(patterns[0].low_months.is_empty());
        assert_eq!(patterns[0].confidence, 0.0);
    }

    #[test]
    fn test_december_spike_detected_as_peak() {
        let mut monthly = [100.0; 12];
        monthly[11] = 1000.0;
        let txs = year_of_spend(1, monthly);
        let indicators: Vec<MonthlyIndicator> = (0..12).map(|_| indicator(150.0)).collect();

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_seasonal);
        assert_eq!(patterns[0].peak_months, vec![12]);
        assert!((patterns[0].amplitude - 900.0).abs() < 1e-9);
        assert!(patterns[0].confidence > 0.0 && patterns[0].confidence <= 1.0);
    }

    #[test]
    fn test_fewer_than_twelve_months_skipped() {
        let txs: Vec<Transaction> = (1..=11)
            .map(|month| expense(1, 100.0 * month as f64, 2024, month))
            .collect();
        let indicators: Vec<MonthlyIndicator> = (0..11).map(|_| indicator(100.0)).collect();

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_short_lived_category_excluded_from_long_dataset() {
        // Category 1 spans the full year; category 2 only spends in
        // October through December. The quarter-old category must not be
        // reported, and its quiet months must not read as structure.
        let mut txs = year_of_spend(1, [100.0; 12]);
        for month in [10, 11, 12] {
            txs.push(expense(2, 250.0, 2024, month));
        }
        let indicators: Vec<MonthlyIndicator> = (0..12).map(|_| indicator(150.0)).collect();

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].category_id, 1);
    }

    #[test]
    fn test_empty_indicators_zero_impact() {
        let mut monthly = [100.0; 12];
        monthly[5] = 900.0;
        let txs = year_of_spend(1, monthly);

        let patterns = detect_seasonal_patterns(&txs, &[], &DetectorConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].impact_score, 0.0);
    }

    #[test]
    fn test_sorted_descending_by_impact() {
        let mut big = [500.0; 12];
        big[0] = 2000.0;
        let mut small = [50.0; 12];
        small[0] = 200.0;
        let mut txs = year_of_spend(1, small);
        txs.extend(year_of_spend(2, big));
        let indicators: Vec<MonthlyIndicator> = (0..12).map(|_| indicator(10_000.0)).collect();

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].category_id, 2);
        assert!(patterns[0].impact_score >= patterns[1].impact_score);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let mut monthly = [10.0; 12];
        monthly[3] = 100_000.0;
        let txs = year_of_spend(9, monthly);
        let indicators = vec![indicator(5.0)];

        let patterns = detect_seasonal_patterns(&txs, &indicators, &DetectorConfig::default());
        for pattern in &patterns {
            assert!((0.0..=1.0).contains(&pattern.confidence));
            assert!((0.0..=100.0).contains(&pattern.impact_score));
        }
    }
}
