//! Monthly time-series helpers shared by every analysis stage.
//!
//! All per-category series are aligned on a single global month axis (the
//! sorted set of distinct months appearing in the transaction set), with
//! months a category did not spend in filled as zero. Alignment keeps the
//! correlation and seasonality math free of length-mismatch special cases.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::{Transaction, TransactionKind};

/// Calendar month key, ordered chronologically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: chrono::NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The global month axis: every distinct month present in the data, sorted.
pub fn month_axis(transactions: &[Transaction]) -> Vec<MonthKey> {
    let months: BTreeSet<MonthKey> = transactions
        .iter()
        .map(|tx| MonthKey::from_date(tx.date))
        .collect();
    months.into_iter().collect()
}

/// Per-month transaction counts over all transactions.
pub fn monthly_counts(transactions: &[Transaction]) -> BTreeMap<MonthKey, usize> {
    let mut counts = BTreeMap::new();
    for tx in transactions {
        *counts.entry(MonthKey::from_date(tx.date)).or_insert(0) += 1;
    }
    counts
}

/// Monthly expense totals for one category, aligned on `axis`.
///
/// Income and transfers are excluded; expense amounts are taken as absolute
/// values so the host's sign convention does not matter.
pub fn category_expense_series(
    transactions: &[Transaction],
    category_id: i64,
    axis: &[MonthKey],
) -> Vec<f64> {
    let mut totals: BTreeMap<MonthKey, f64> = BTreeMap::new();
    for tx in transactions {
        if tx.category_id != category_id || tx.kind != TransactionKind::Expense {
            continue;
        }
        *totals.entry(MonthKey::from_date(tx.date)).or_insert(0.0) += tx.amount.abs();
    }
    axis.iter()
        .map(|key| totals.get(key).copied().unwrap_or(0.0))
        .collect()
}

/// Monthly expense totals across all categories, aligned on `axis`.
pub fn overall_expense_series(transactions: &[Transaction], axis: &[MonthKey]) -> Vec<f64> {
    let mut totals: BTreeMap<MonthKey, f64> = BTreeMap::new();
    for tx in transactions {
        if tx.kind != TransactionKind::Expense {
            continue;
        }
        *totals.entry(MonthKey::from_date(tx.date)).or_insert(0.0) += tx.amount.abs();
    }
    axis.iter()
        .map(|key| totals.get(key).copied().unwrap_or(0.0))
        .collect()
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Ordinary least-squares fit of `values` against a 0-based index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, clamped to [0, 1].
    pub r_squared: f64,
}

/// Fits a line through `(0, values[0]) .. (n-1, values[n-1])`.
///
/// Returns `None` with fewer than two points; callers surface that as an
/// explicit insufficient-data result rather than an error.
pub fn fit_linear(values: &[f64]) -> Option<LinearFit> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = mean(values);

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    let intercept = y_mean - slope * x_mean;
    let r_squared = if syy == 0.0 {
        // Flat series: the fit is exact but carries no trend information.
        0.0
    } else {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

/// Pearson correlation coefficient between two aligned series.
///
/// Mismatched lengths, empty input, or zero variance on either side all
/// yield 0 rather than NaN.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mean_a = mean(a);
    let mean_b = mean(b);

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0)
}

/// Pearson correlations between every unordered pair of categories.
///
/// Series are aligned on the global month axis, so lengths always match.
/// Only pairs with `|r| > threshold` are retained, keyed `"minId-maxId"`.
pub fn category_correlations(
    transactions: &[Transaction],
    threshold: f64,
) -> BTreeMap<String, f64> {
    let axis = month_axis(transactions);
    let category_ids: BTreeSet<i64> = transactions.iter().map(|tx| tx.category_id).collect();
    let ids: Vec<i64> = category_ids.into_iter().collect();

    let series: BTreeMap<i64, Vec<f64>> = ids
        .iter()
        .map(|&id| (id, category_expense_series(transactions, id, &axis)))
        .collect();

    let mut correlations = BTreeMap::new();
    for (i, &id_a) in ids.iter().enumerate() {
        for &id_b in &ids[i + 1..] {
            let r = pearson(&series[&id_a], &series[&id_b]);
            if r.abs() > threshold {
                correlations.insert(format!("{}-{}", id_a.min(id_b), id_a.max(id_b)), r);
            }
        }
    }
    correlations
}
