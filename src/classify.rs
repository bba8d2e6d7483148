//! Category prediction for unlabeled transactions.
//!
//! Combines description-text, amount, and timing similarity against each
//! category's learned baseline into a single weighted confidence.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Category, CategoryModel, DetectorConfig, PatternAnalysis, Transaction};

/// Ranked category guess for one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPrediction {
    pub category_id: i64,
    pub category_name: String,
    /// Weighted similarity in [0, 1].
    pub confidence: f64,
    /// Which similarity factors drove the guess.
    pub reasoning: String,
}

fn word_pattern() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid word pattern"))
}

/// Lowercased word tokens of a description.
pub fn tokenize(description: &str) -> Vec<String> {
    word_pattern()
        .find_iter(description)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Predicts the most likely categories for `tx`, best first, at most three.
///
/// Candidates whose weighted similarity falls below
/// `config.min_prediction_confidence` are excluded entirely.
pub fn classify_transaction(
    tx: &Transaction,
    analysis: &PatternAnalysis,
    categories: &[Category],
    config: &DetectorConfig,
) -> Vec<CategoryPrediction> {
    let tokens = tokenize(&tx.description);

    let mut predictions: Vec<CategoryPrediction> = categories
        .iter()
        .filter_map(|category| {
            let model = analysis.predictive_models.get(&category.id)?;
            let text = text_similarity(&tokens, model);
            let amount = amount_similarity(tx.amount.abs(), model);
            let timing = timing_similarity(tx, model);

            let confidence = (config.text_weight * text
                + config.amount_sim_weight * amount
                + config.timing_sim_weight * timing)
                .clamp(0.0, 1.0);
            if confidence < config.min_prediction_confidence {
                return None;
            }

            Some(CategoryPrediction {
                category_id: category.id,
                category_name: category.name.clone(),
                confidence,
                reasoning: reasoning_for(text, amount, timing),
            })
        })
        .collect();

    predictions.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    predictions.truncate(3);
    predictions
}

/// Share of the transaction's tokens seen in the category's history.
fn text_similarity(tokens: &[String], model: &CategoryModel) -> f64 {
    if tokens.is_empty() || model.token_counts.is_empty() {
        return 0.0;
    }
    let distinct: BTreeSet<&String> = tokens.iter().collect();
    let matched = distinct
        .iter()
        .filter(|token| model.token_counts.contains_key(token.as_str()))
        .count();
    (matched as f64 / distinct.len() as f64).clamp(0.0, 1.0)
}

/// How typical the amount is for the category's historical range.
fn amount_similarity(amount: f64, model: &CategoryModel) -> f64 {
    if model.sample_count == 0 {
        return 0.0;
    }
    if model.amount_std_dev > 0.0 {
        let z = (amount - model.amount_mean).abs() / model.amount_std_dev;
        return (1.0 - z / 3.0).clamp(0.0, 1.0);
    }
    // Constant-amount category: score by relative distance to the mean.
    if model.amount_mean > 0.0 {
        (1.0 - (amount - model.amount_mean).abs() / model.amount_mean).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// How typical the calendar position (weekday) is for the category.
/// A uniformly-used weekday scores 1.
fn timing_similarity(tx: &Transaction, model: &CategoryModel) -> f64 {
    if model.sample_count == 0 {
        return 0.0;
    }
    let weekday = tx.date.weekday().num_days_from_sunday() as usize;
    let share = model.weekday_counts[weekday] as f64 / model.sample_count as f64;
    (share * 7.0).clamp(0.0, 1.0)
}

fn reasoning_for(text: f64, amount: f64, timing: f64) -> String {
    let mut parts = Vec::new();
    if text > 0.3 {
        parts.push("similar description");
    }
    if amount > 0.3 {
        parts.push("typical amount");
    }
    if timing > 0.3 {
        parts.push("usual timing");
    }
    if parts.is_empty() {
        "weak overall match".to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MonthlyIndicator, PatternDetector, TransactionKind};
    use chrono::NaiveDate;

    fn tx(id: &str, category_id: i64, amount: f64, day: u32, description: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            category_id,
            amount,
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            kind: TransactionKind::Expense,
            description: description.to_string(),
        }
    }

    fn history() -> Vec<Transaction> {
        let mut txs = Vec::new();
        for i in 0..10 {
            txs.push(tx(
                &format!("G-{}", i),
                1,
                80.0 + i as f64,
                (i % 28) + 1,
                "supermarket grocery run",
            ));
            txs.push(tx(
                &format!("F-{}", i),
                2,
                1200.0 + i as f64,
                (i % 28) + 1,
                "monthly rent payment",
            ));
        }
        txs
    }

    fn categories() -> Vec<Category> {
        vec![
            Category {
                id: 1,
                name: "Groceries".to_string(),
                kind: TransactionKind::Expense,
            },
            Category {
                id: 2,
                name: "Rent".to_string(),
                kind: TransactionKind::Expense,
            },
        ]
    }

    fn analysis() -> PatternAnalysis {
        let indicators = vec![MonthlyIndicator {
            confirmed_expenses: 2000.0,
            balance: 500.0,
        }];
        PatternDetector::default().analyze_patterns(&history(), &indicators)
    }

    #[test]
    fn test_description_match_wins() {
        let analysis = analysis();
        let unknown = tx("NEW", 0, 85.0, 12, "grocery supermarket");
        let predictions =
            classify_transaction(&unknown, &analysis, &categories(), &DetectorConfig::default());

        assert!(!predictions.is_empty());
        assert_eq!(predictions[0].category_id, 1);
        assert!(predictions[0].reasoning.contains("similar description"));
    }

    #[test]
    fn test_predictions_sorted_and_capped() {
        let analysis = analysis();
        let unknown = tx("NEW", 0, 85.0, 12, "grocery supermarket");
        let predictions =
            classify_transaction(&unknown, &analysis, &categories(), &DetectorConfig::default());

        assert!(predictions.len() <= 3);
        for pair in predictions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        for p in &predictions {
            assert!((0.0..=1.0).contains(&p.confidence));
        }
    }

    #[test]
    fn test_low_scores_excluded() {
        let analysis = analysis();
        // No token overlap, amount far outside both ranges, so any candidate
        // left standing must clear the floor.
        let unknown = tx("NEW", 0, 1_000_000.0, 12, "zzz qqq xyzzy");
        let predictions =
            classify_transaction(&unknown, &analysis, &categories(), &DetectorConfig::default());
        for p in &predictions {
            assert!(p.confidence >= 0.1);
        }
    }

    #[test]
    fn test_unknown_tokens_no_text_credit() {
        let analysis = analysis();
        let model = analysis.predictive_models.get(&1).unwrap();
        assert_eq!(text_similarity(&tokenize("zzz qqq"), model), 0.0);
        assert!(text_similarity(&tokenize("grocery zzz"), model) > 0.0);
    }

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Supermarket GROCERY-Run 24h"),
            vec!["supermarket", "grocery", "run", "24h"]
        );
    }
}
