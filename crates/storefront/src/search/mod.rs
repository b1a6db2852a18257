//! Product search.
//!
//! Queries are lower-cased, split into tokens and expanded through a static
//! multilingual synonym table. Each product is scored with additive weights
//! for matches in its name, category, material and description, and the best
//! matches are returned.
//!
//! The original query tokens match both whole words and substrings. Synonym
//! expansions match whole words only, so `cincin` finds "Solitaire Ring" but
//! not "Earrings".

pub mod synonyms;

use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use aurelia_core::ProductCategory;

use crate::models::Product;

/// Default number of results.
pub const DEFAULT_LIMIT: usize = 8;

/// Upper bound on requested results.
pub const MAX_LIMIT: usize = 20;

/// Queries longer than this are truncated.
const MAX_QUERY_CHARS: usize = 200;

/// Tokens beyond this are ignored.
const MAX_TOKENS: usize = 8;

/// Additive scoring weights.
pub mod weights {
    pub const NAME_EXACT: u32 = 100;
    pub const NAME_WORD: u32 = 40;
    pub const NAME_SUBSTRING: u32 = 15;
    pub const CATEGORY: u32 = 35;
    pub const MATERIAL_WORD: u32 = 20;
    pub const MATERIAL_SUBSTRING: u32 = 8;
    pub const DESCRIPTION_WORD: u32 = 6;
    pub const DESCRIPTION_SUBSTRING: u32 = 2;
    pub const FULL_COVERAGE: u32 = 25;
    pub const IN_STOCK: u32 = 1;
}

#[derive(Debug)]
struct Term {
    text: String,
    word: Regex,
    /// Whether substring matches count for this term.
    substring: bool,
}

impl Term {
    fn new(text: &str, substring: bool) -> Option<Self> {
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(text))).ok()?;
        Some(Self {
            text: text.to_owned(),
            word,
            substring,
        })
    }

    fn score_field(&self, haystack: &str, word_weight: u32, substring_weight: u32) -> u32 {
        if self.word.is_match(haystack) {
            word_weight
        } else if self.substring && haystack.contains(&self.text) {
            substring_weight
        } else {
            0
        }
    }
}

/// One query token and everything it expands to.
#[derive(Debug)]
struct Token {
    terms: Vec<Term>,
    category: Option<ProductCategory>,
}

/// A normalized, synonym-expanded query.
#[derive(Debug)]
pub struct ExpandedQuery {
    normalized: String,
    tokens: Vec<Token>,
}

impl ExpandedQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Every term the query expands to, originals first.
    #[must_use]
    pub fn terms(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .flat_map(|t| t.terms.iter().map(|term| term.text.as_str()))
            .collect()
    }
}

/// Distinct alphanumeric words of already lower-cased text, in order.
fn words(lowered: &str) -> Vec<&str> {
    let mut words: Vec<&str> = Vec::new();
    for raw in lowered.split(|c: char| !c.is_alphanumeric()) {
        if !raw.is_empty() && !words.contains(&raw) {
            words.push(raw);
        }
    }
    words.truncate(MAX_TOKENS);
    words
}

/// Lower-case, tokenize and expand a query through the synonym table.
#[must_use]
pub fn expand_query(query: &str) -> ExpandedQuery {
    let lowered: String = query.chars().take(MAX_QUERY_CHARS).collect::<String>().to_lowercase();
    let originals = words(&lowered);

    let tokens = originals
        .iter()
        .filter_map(|&original| {
            let group = synonyms::group_for(original);
            let mut terms = vec![Term::new(original, true)?];
            if let Some(group) = group {
                terms.extend(
                    group
                        .terms
                        .iter()
                        .filter(|&&t| t != original)
                        .filter_map(|t| Term::new(t, false)),
                );
            }

            let category = group.and_then(|g| g.category).or_else(|| original.parse().ok());
            Some(Token { terms, category })
        })
        .collect();

    ExpandedQuery {
        normalized: originals.join(" "),
        tokens,
    }
}

/// Relevance of a product for an expanded query. Zero means no match.
#[must_use]
pub fn score(product: &Product, query: &ExpandedQuery) -> u32 {
    if query.is_empty() {
        return 0;
    }

    let name = product.name.to_lowercase();
    let material = product.material.to_lowercase();
    let description = product.description.to_lowercase();

    let mut total = 0;
    let mut matched_tokens = 0;

    if words(&name).join(" ") == query.normalized {
        total += weights::NAME_EXACT;
    }

    for token in &query.tokens {
        let best = |haystack: &str, word: u32, substring: u32| {
            token
                .terms
                .iter()
                .map(|term| term.score_field(haystack, word, substring))
                .max()
                .unwrap_or(0)
        };

        let mut token_score = best(name.as_str(), weights::NAME_WORD, weights::NAME_SUBSTRING)
            + best(material.as_str(), weights::MATERIAL_WORD, weights::MATERIAL_SUBSTRING)
            + best(
                description.as_str(),
                weights::DESCRIPTION_WORD,
                weights::DESCRIPTION_SUBSTRING,
            );
        if token.category == Some(product.category) {
            token_score += weights::CATEGORY;
        }

        if token_score > 0 {
            matched_tokens += 1;
        }
        total += token_score;
    }

    if matched_tokens == query.tokens.len() {
        total += weights::FULL_COVERAGE;
    }
    if total > 0 && product.in_stock() {
        total += weights::IN_STOCK;
    }
    total
}

/// A scored search result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: u32,
    #[serde(flatten)]
    pub product: Product,
}

/// Rank products against a query and return the best `limit` matches.
///
/// Ties are broken by name. An empty query returns nothing.
#[instrument(skip(products), fields(candidates = products.len()))]
#[must_use]
pub fn search(products: Vec<Product>, query: &str, limit: usize) -> Vec<SearchHit> {
    let expanded = expand_query(query);
    if expanded.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = products
        .into_iter()
        .filter_map(|product| {
            let score = score(&product, &expanded);
            (score > 0).then_some(SearchHit { score, product })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.product.name.cmp(&b.product.name))
    });
    hits.truncate(limit.clamp(1, MAX_LIMIT));
    hits
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::seed::builtin_catalog;

    fn catalog() -> Vec<Product> {
        let now = chrono::Utc::now();
        builtin_catalog()
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, p)| Product {
                id: aurelia_core::ProductId::new(i32::try_from(i).unwrap() + 1),
                slug: p.slug(),
                name: p.name,
                description: p.description,
                category: p.category,
                material: p.material,
                gemstone: p.gemstone,
                price: p.price,
                stock_quantity: p.stock_quantity,
                image_url: p.image_url,
                is_featured: p.is_featured,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn test_expand_query_tokenizes_and_expands() {
        let q = expand_query("  Cincin, EMAS! ");
        let terms = q.terms();
        assert_eq!(terms[0], "cincin");
        assert!(terms.contains(&"ring"));
        assert!(terms.contains(&"gold"));
        assert_eq!(q.normalized, "cincin emas");
    }

    #[test]
    fn test_empty_query() {
        assert!(expand_query(" ,; ").is_empty());
        assert!(search(catalog(), "", 8).is_empty());
    }

    #[test]
    fn test_cincin_returns_rings() {
        let hits = search(catalog(), "cincin", DEFAULT_LIMIT);
        assert!(!hits.is_empty());
        assert!(
            hits.iter()
                .all(|h| h.product.category == ProductCategory::Rings)
        );
    }

    #[test]
    fn test_exact_name_ranks_first() {
        let hits = search(catalog(), "pearl drop earrings", DEFAULT_LIMIT);
        assert_eq!(hits[0].product.slug, "pearl-drop-earrings");
    }

    #[test]
    fn test_exact_name_ignores_punctuation() {
        let mut products = catalog();
        let band = products
            .iter_mut()
            .find(|p| p.category == ProductCategory::Rings)
            .unwrap();
        band.name = "Rose-Gold Band".to_owned();
        let band = band.clone();

        let exact = score(&band, &expand_query("rose gold band"));
        let partial = score(&band, &expand_query("rose gold"));
        assert!(exact >= partial + weights::NAME_EXACT, "{exact} vs {partial}");
        assert_eq!(exact, score(&band, &expand_query("Rose-Gold Band")));
    }

    #[test]
    fn test_spanish_material_and_category() {
        let hits = search(catalog(), "collar oro", DEFAULT_LIMIT);
        let top = &hits[0].product;
        assert_eq!(top.category, ProductCategory::Necklaces);
        assert!(top.material.to_lowercase().contains("gold"));
    }

    #[test]
    fn test_limit_is_respected() {
        assert_eq!(search(catalog(), "gold", 3).len(), 3);
        assert!(search(catalog(), "gold", 500).len() <= MAX_LIMIT);
    }

    #[test]
    fn test_in_stock_breaks_ties() {
        let mut products = catalog();
        products.truncate(1);
        let mut sold_out = products[0].clone();
        sold_out.stock_quantity = 0;

        let in_stock = score(&products[0], &expand_query("solitaire"));
        let empty = score(&sold_out, &expand_query("solitaire"));
        assert_eq!(in_stock, empty + weights::IN_STOCK);
    }

    #[test]
    fn test_unmatched_query_scores_zero() {
        assert!(search(catalog(), "tiara", DEFAULT_LIMIT).is_empty());
    }
}
