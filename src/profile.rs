//! Descriptive spending profile: weekday distribution, amount buckets,
//! monthly frequency, and growth trend.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::timeseries::{self, MonthKey};
use crate::{Transaction, TransactionKind};

/// Count and total amount for one weekday bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DayOfWeekStats {
    pub count: usize,
    pub total: f64,
}

/// Time-of-day analysis capability marker.
///
/// Input dates carry no time-of-day precision, so the analyzer reports
/// itself unsupported instead of returning an empty distribution that could
/// be mistaken for "no activity".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeOfDaySupport {
    Unsupported { reason: String },
}

/// Fixed amount buckets; each transaction lands in the first matching one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AmountBuckets {
    /// [0, 50)
    pub small: usize,
    /// [50, 200)
    pub medium: usize,
    /// [200, 1000)
    pub large: usize,
    /// [1000, inf)
    pub xlarge: usize,
}

/// Per-month transaction frequency summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrequencyProfile {
    pub mean: f64,
    pub variance: f64,
    /// Up to three most active months ("YYYY-MM"), ties kept chronological.
    pub top_months: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// OLS growth trend over monthly expense totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum GrowthTrend {
    /// Fewer than two monthly data points.
    InsufficientData,
    Computed {
        slope: f64,
        intercept: f64,
        direction: TrendDirection,
        /// Slope relative to the mean monthly total, as a percentage.
        growth_rate_pct: f64,
    },
}

/// Aggregate profile produced by [`analyze_spending_patterns`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingPatterns {
    pub by_day_of_week: BTreeMap<u32, DayOfWeekStats>,
    pub time_of_day: TimeOfDaySupport,
    pub by_amount_range: AmountBuckets,
    pub frequency: FrequencyProfile,
    pub growth: GrowthTrend,
}

/// Builds the five descriptive views over the full transaction set.
pub fn analyze_spending_patterns(transactions: &[Transaction]) -> SpendingPatterns {
    SpendingPatterns {
        by_day_of_week: day_of_week_distribution(transactions),
        time_of_day: TimeOfDaySupport::Unsupported {
            reason: "transaction dates carry no time-of-day precision".to_string(),
        },
        by_amount_range: amount_buckets(transactions),
        frequency: frequency_profile(transactions),
        growth: growth_trend(transactions),
    }
}

/// Weekday distribution, 0 = Sunday through 6 = Saturday.
fn day_of_week_distribution(transactions: &[Transaction]) -> BTreeMap<u32, DayOfWeekStats> {
    let mut distribution: BTreeMap<u32, DayOfWeekStats> = BTreeMap::new();
    for tx in transactions {
        let weekday = tx.date.weekday().num_days_from_sunday();
        let stats = distribution.entry(weekday).or_default();
        stats.count += 1;
        stats.total += tx.amount.abs();
    }
    distribution
}

/// First-match-wins bucketing over the absolute amount.
pub fn bucket_for_amount(amount: f64) -> AmountBucketKind {
    let value = amount.abs();
    if value < 50.0 {
        AmountBucketKind::Small
    } else if value < 200.0 {
        AmountBucketKind::Medium
    } else if value < 1000.0 {
        AmountBucketKind::Large
    } else {
        AmountBucketKind::XLarge
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountBucketKind {
    Small,
    Medium,
    Large,
    XLarge,
}

fn amount_buckets(transactions: &[Transaction]) -> AmountBuckets {
    let mut buckets = AmountBuckets::default();
    for tx in transactions {
        match bucket_for_amount(tx.amount) {
            AmountBucketKind::Small => buckets.small += 1,
            AmountBucketKind::Medium => buckets.medium += 1,
            AmountBucketKind::Large => buckets.large += 1,
            AmountBucketKind::XLarge => buckets.xlarge += 1,
        }
    }
    buckets
}

fn frequency_profile(transactions: &[Transaction]) -> FrequencyProfile {
    let counts: BTreeMap<MonthKey, usize> = timeseries::monthly_counts(transactions);
    let values: Vec<f64> = counts.values().map(|&c| c as f64).collect();

    // Stable sort keeps ties in chronological month order.
    let mut ranked: Vec<(&MonthKey, usize)> = counts.iter().map(|(k, &c)| (k, c)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    FrequencyProfile {
        mean: timeseries::mean(&values),
        variance: timeseries::variance(&values),
        top_months: ranked
            .into_iter()
            .take(3)
            .map(|(key, _)| key.to_string())
            .collect(),
    }
}

fn growth_trend(transactions: &[Transaction]) -> GrowthTrend {
    let expense_only: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Expense)
        .cloned()
        .collect();
    let axis = timeseries::month_axis(&expense_only);
    let series = timeseries::overall_expense_series(&expense_only, &axis);

    let Some(fit) = timeseries::fit_linear(&series) else {
        return GrowthTrend::InsufficientData;
    };

    let series_mean = timeseries::mean(&series);
    let growth_rate_pct = if series_mean > 0.0 {
        fit.slope / series_mean * 100.0
    } else {
        0.0
    };
    let direction = if fit.slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    GrowthTrend::Computed {
        slope: fit.slope,
        intercept: fit.intercept,
        direction,
        growth_rate_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn expense_on(amount: f64, year: i32, month: u32, day: u32) -> Transaction {
        Transaction {
            id: format!("TXN-{}-{}-{}", year, month, day),
            category_id: 1,
            amount,
            date: NaiveDate::from_ymd_opt(year, month, day).unwrap(),
            kind: TransactionKind::Expense,
            description: "profile test".to_string(),
        }
    }

    #[test]
    fn test_amount_bucket_boundaries() {
        assert_eq!(bucket_for_amount(0.0), AmountBucketKind::Small);
        assert_eq!(bucket_for_amount(49.99), AmountBucketKind::Small);
        assert_eq!(bucket_for_amount(50.0), AmountBucketKind::Medium);
        assert_eq!(bucket_for_amount(75.0), AmountBucketKind::Medium);
        assert_eq!(bucket_for_amount(199.99), AmountBucketKind::Medium);
        assert_eq!(bucket_for_amount(200.0), AmountBucketKind::Large);
        assert_eq!(bucket_for_amount(1000.0), AmountBucketKind::XLarge);
    }

    #[test]
    fn test_each_transaction_counted_once() {
        let txs = vec![
            expense_on(10.0, 2024, 1, 1),
            expense_on(75.0, 2024, 1, 2),
            expense_on(500.0, 2024, 1, 3),
            expense_on(2500.0, 2024, 1, 4),
        ];
        let patterns = analyze_spending_patterns(&txs);
        let buckets = patterns.by_amount_range;
        assert_eq!(buckets.small + buckets.medium + buckets.large + buckets.xlarge, 4);
        assert_eq!(buckets.medium, 1);
    }

    #[test]
    fn test_day_of_week_distribution() {
        // 2024-01-07 is a Sunday, 2024-01-08 a Monday.
        let txs = vec![
            expense_on(10.0, 2024, 1, 7),
            expense_on(20.0, 2024, 1, 14),
            expense_on(30.0, 2024, 1, 8),
        ];
        let patterns = analyze_spending_patterns(&txs);
        assert_eq!(patterns.by_day_of_week[&0].count, 2);
        assert!((patterns.by_day_of_week[&0].total - 30.0).abs() < 1e-9);
        assert_eq!(patterns.by_day_of_week[&1].count, 1);
    }

    #[test]
    fn test_time_of_day_is_unsupported() {
        let patterns = analyze_spending_patterns(&[expense_on(10.0, 2024, 1, 1)]);
        assert!(matches!(
            patterns.time_of_day,
            TimeOfDaySupport::Unsupported { .. }
        ));
    }

    #[test]
    fn test_frequency_top_months() {
        let mut txs = vec![
            expense_on(10.0, 2024, 1, 1),
            expense_on(10.0, 2024, 1, 2),
            expense_on(10.0, 2024, 1, 3),
            expense_on(10.0, 2024, 2, 1),
            expense_on(10.0, 2024, 3, 1),
            expense_on(10.0, 2024, 3, 2),
        ];
        txs.push(expense_on(10.0, 2024, 4, 1));
        let patterns = analyze_spending_patterns(&txs);
        assert_eq!(patterns.frequency.top_months[0], "2024-01");
        assert_eq!(patterns.frequency.top_months[1], "2024-03");
        assert_eq!(patterns.frequency.top_months.len(), 3);
        assert!((patterns.frequency.mean - 7.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_trend_two_points_increasing() {
        let txs = vec![expense_on(100.0, 2024, 1, 5), expense_on(200.0, 2024, 2, 5)];
        let patterns = analyze_spending_patterns(&txs);
        match patterns.growth {
            GrowthTrend::Computed {
                slope, direction, ..
            } => {
                assert!((slope - 100.0).abs() < 1e-9);
                assert_eq!(direction, TrendDirection::Increasing);
            }
            GrowthTrend::InsufficientData => panic!("two points must produce a computed trend"),
        }
    }

    #[test]
    fn test_growth_trend_single_point_insufficient() {
        let txs = vec![expense_on(100.0, 2024, 1, 5)];
        let patterns = analyze_spending_patterns(&txs);
        assert_eq!(patterns.growth, GrowthTrend::InsufficientData);
    }

    #[test]
    fn test_growth_rate_relative_to_mean() {
        let txs = vec![expense_on(100.0, 2024, 1, 5), expense_on(200.0, 2024, 2, 5)];
        let patterns = analyze_spending_patterns(&txs);
        if let GrowthTrend::Computed {
            growth_rate_pct, ..
        } = patterns.growth
        {
            // slope 100 over mean 150 -> 66.67%.
            assert!((growth_rate_pct - 100.0 / 150.0 * 100.0).abs() < 1e-6);
        } else {
            panic!("expected computed trend");
        }
    }
}
