use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::tables::{AprioriCandidate, AprioriTable, PopularityTable};
use super::MAX_PER_CATEGORY;

/// Deterministic selection over the apriori and popularity tables. Holds
/// only immutable reference data, so shared use across turns needs no
/// locking.
#[derive(Clone, Debug, Default)]
pub struct RecommendationEngine {
    apriori: AprioriTable,
    popularity: PopularityTable,
}

impl RecommendationEngine {
    pub fn new(apriori: AprioriTable, popularity: PopularityTable) -> Self {
        Self { apriori, popularity }
    }

    /// Co-purchase recommendations for a set of input products.
    ///
    /// Candidates for every input product are concatenated, sorted by
    /// confidence descending (stable, so ties keep table order), then
    /// walked greedily: a candidate is taken only if its name has not been
    /// taken yet and its category holds fewer than [`MAX_PER_CATEGORY`]
    /// selections. Stops at `top_k`.
    pub fn apriori(&self, products: &[String], top_k: usize) -> Vec<String> {
        let mut candidates: Vec<&AprioriCandidate> = Vec::new();
        for product in products {
            candidates.extend(self.apriori.candidates_for(product));
        }

        candidates.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal)
        });

        let mut selected = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut per_category: HashMap<&str, usize> = HashMap::new();

        for candidate in candidates {
            if seen.contains(candidate.product.as_str()) {
                continue;
            }

            let count = per_category.entry(candidate.product_category.as_str()).or_insert(0);
            if *count >= MAX_PER_CATEGORY {
                continue;
            }

            *count += 1;
            seen.insert(candidate.product.as_str());
            selected.push(candidate.product.clone());

            if selected.len() >= top_k {
                break;
            }
        }

        selected
    }

    /// Most-purchased products, optionally restricted to exact category
    /// names. A filter that matches nothing yields an empty result; no
    /// fuzzy matching is attempted.
    pub fn popular(&self, categories: Option<&[String]>, top_k: usize) -> Vec<String> {
        let mut rows: Vec<_> = match categories {
            Some(filter) => self
                .popularity
                .rows()
                .iter()
                .filter(|row| filter.iter().any(|category| *category == row.product_category))
                .collect(),
            None => self.popularity.rows().iter().collect(),
        };

        rows.sort_by(|a, b| b.number_of_transactions.cmp(&a.number_of_transactions));
        rows.into_iter().take(top_k).map(|row| row.product.clone()).collect()
    }

    /// Product names known to the popularity table, in table order. Used
    /// to enumerate the shop's items in strategy-selection prompts.
    pub fn product_names(&self) -> Vec<&str> {
        self.popularity.products()
    }

    /// Distinct category names known to the popularity table.
    pub fn category_names(&self) -> Vec<&str> {
        self.popularity.categories()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::tables::{AprioriCandidate, AprioriTable, PopularityRow, PopularityTable};
    use super::RecommendationEngine;

    fn candidate(product: &str, category: &str, confidence: f64) -> AprioriCandidate {
        AprioriCandidate {
            product: product.to_owned(),
            product_category: category.to_owned(),
            confidence,
        }
    }

    fn row(product: &str, category: &str, transactions: u64) -> PopularityRow {
        PopularityRow {
            product: product.to_owned(),
            product_category: category.to_owned(),
            number_of_transactions: transactions,
        }
    }

    fn engine_with_apriori(entries: Vec<(&str, Vec<AprioriCandidate>)>) -> RecommendationEngine {
        let by_product: HashMap<String, Vec<AprioriCandidate>> =
            entries.into_iter().map(|(name, candidates)| (name.to_owned(), candidates)).collect();
        RecommendationEngine::new(AprioriTable::new(by_product), PopularityTable::default())
    }

    fn engine_with_popularity(rows: Vec<PopularityRow>) -> RecommendationEngine {
        RecommendationEngine::new(AprioriTable::default(), PopularityTable::new(rows))
    }

    #[test]
    fn apriori_category_cap_skips_but_keeps_ranking_order() {
        let engine = engine_with_apriori(vec![(
            "Latte",
            vec![
                candidate("Croissant", "Bakery", 0.9),
                candidate("Chocolate Croissant", "Bakery", 0.8),
                candidate("Ginger Scone", "Bakery", 0.7),
                candidate("Cappuccino", "Coffee", 0.6),
            ],
        )]);

        let selected = engine.apriori(&["Latte".to_owned()], 3);

        // The third Bakery candidate is skipped by the 2-per-category cap
        // even though its confidence outranks the Coffee candidate.
        assert_eq!(selected, vec!["Croissant", "Chocolate Croissant", "Cappuccino"]);
    }

    #[test]
    fn apriori_ties_preserve_table_order() {
        let engine = engine_with_apriori(vec![(
            "Latte",
            vec![
                candidate("Croissant", "Bakery", 0.8),
                candidate("Cappuccino", "Coffee", 0.8),
                candidate("Ginger Scone", "Bakery", 0.8),
            ],
        )]);

        let selected = engine.apriori(&["Latte".to_owned()], 5);
        assert_eq!(selected, vec!["Croissant", "Cappuccino", "Ginger Scone"]);
    }

    #[test]
    fn apriori_dedupes_names_across_input_products() {
        let engine = engine_with_apriori(vec![
            ("Latte", vec![candidate("Croissant", "Bakery", 0.9)]),
            (
                "Cappuccino",
                vec![
                    candidate("Croissant", "Bakery", 0.7),
                    candidate("Hazelnut Biscotti", "Bakery", 0.5),
                ],
            ),
        ]);

        let selected = engine.apriori(&["Latte".to_owned(), "Cappuccino".to_owned()], 5);
        assert_eq!(selected, vec!["Croissant", "Hazelnut Biscotti"]);
    }

    #[test]
    fn apriori_unknown_products_yield_nothing() {
        let engine = engine_with_apriori(vec![(
            "Latte",
            vec![candidate("Croissant", "Bakery", 0.9)],
        )]);

        assert!(engine.apriori(&["Flat White".to_owned()], 5).is_empty());
        assert!(engine.apriori(&[], 5).is_empty());
    }

    #[test]
    fn popular_ranks_by_transaction_count() {
        let engine = engine_with_popularity(vec![
            row("Croissant", "Bakery", 944),
            row("Latte", "Coffee", 1510),
            row("Cappuccino", "Coffee", 1203),
        ]);

        let selected = engine.popular(None, 2);
        assert_eq!(selected, vec!["Latte", "Cappuccino"]);
    }

    #[test]
    fn popular_filters_by_exact_category_name() {
        let engine = engine_with_popularity(vec![
            row("Croissant", "Bakery", 944),
            row("Latte", "Coffee", 1510),
        ]);

        let bakery = engine.popular(Some(&["Bakery".to_owned()]), 5);
        assert_eq!(bakery, vec!["Croissant"]);

        // Misspelled categories silently match nothing.
        let misspelled = engine.popular(Some(&["bakery".to_owned()]), 5);
        assert!(misspelled.is_empty());
    }

    #[test]
    fn popular_with_no_filter_uses_every_row() {
        let engine = engine_with_popularity(vec![
            row("Croissant", "Bakery", 944),
            row("Latte", "Coffee", 1510),
            row("Cappuccino", "Coffee", 1203),
        ]);

        assert_eq!(engine.popular(None, 10).len(), 3);
    }

    #[test]
    fn engine_exposes_table_names_for_prompts() {
        let engine = engine_with_popularity(vec![
            row("Latte", "Coffee", 1510),
            row("Croissant", "Bakery", 944),
        ]);

        assert_eq!(engine.product_names(), vec!["Latte", "Croissant"]);
        assert_eq!(engine.category_names(), vec!["Bakery", "Coffee"]);
    }
}
