pub mod audit;
pub mod lexicon;

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use audit::{DishMappingAudit, TokenCount};
use lexicon::Lexicon;

const TOP_UNKNOWN_TOKENS: usize = 10;

/// Strict-mode output policy: drop sparse categories, cap the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DishStrategy {
    pub min_count: usize,
    pub top_n: usize,
}

impl Default for DishStrategy {
    fn default() -> Self {
        DishStrategy {
            min_count: 5,
            top_n: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishCategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategySummary {
    pub mode: &'static str,
    pub min_count: usize,
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub mapped: Vec<String>,
    pub unmapped: Vec<String>,
    pub unknown_token_counts: BTreeMap<String, usize>,
    pub top_unknown_tokens: Vec<TokenCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DishTaxonomy {
    pub strategy: StrategySummary,
    pub audit: AuditSummary,
    pub categories: Vec<DishCategoryCount>,
}

/// Lower-case, trim and strip auto-generated ID suffixes (`-047843dd`, `-123456`).
/// Stacked suffixes are all removed so normalizing twice changes nothing.
pub fn normalize_dish_slug(slug: &str) -> String {
    let mut normalized = slug.trim().to_lowercase();
    while let Some(idx) = normalized.rfind('-') {
        if !is_generated_suffix(&normalized[idx + 1..]) {
            break;
        }
        normalized.truncate(idx);
    }
    normalized
}

fn is_generated_suffix(suffix: &str) -> bool {
    let len = suffix.len();
    let all_digits = suffix.bytes().all(|b| b.is_ascii_digit());
    let all_hex = suffix.bytes().all(|b| b.is_ascii_hexdigit());
    let alnum_with_digit = suffix.bytes().all(|b| b.is_ascii_alphanumeric())
        && suffix.bytes().any(|b| b.is_ascii_digit());

    (len >= 6 && (all_digits || all_hex)) || (len >= 8 && alnum_with_digit)
}

pub fn tokenize_slug(slug: &str) -> Vec<&str> {
    slug.split('-').filter(|t| !t.is_empty()).collect()
}

/// Classify one slug. Every call lands the normalized slug in exactly one of
/// the audit's `mapped` / `unmapped` lists.
pub fn map_dish_slug(
    slug: &str,
    lexicon: &Lexicon,
    audit: Option<&mut DishMappingAudit>,
) -> Option<String> {
    let classifier = Classifier::new(lexicon);
    let category = classifier.classify(slug);
    if let Some(audit) = audit {
        classifier.record(audit, slug, category.as_deref());
    }
    category
}

/// Lexicon token sets resolved once per taxonomy build.
struct Classifier<'a> {
    lexicon: &'a Lexicon,
    non_category: HashSet<&'a str>,
    known: HashSet<&'a str>,
}

impl<'a> Classifier<'a> {
    fn new(lexicon: &'a Lexicon) -> Self {
        Classifier {
            lexicon,
            non_category: lexicon.non_category_tokens(),
            known: lexicon.known_tokens(),
        }
    }

    fn classify(&self, slug: &str) -> Option<String> {
        let normalized = normalize_dish_slug(slug);
        let tokens = tokenize_slug(&normalized);
        if !tokens.is_empty() && tokens.iter().all(|t| self.non_category.contains(t)) {
            return None;
        }
        self.lexicon
            .categories
            .iter()
            .find(|(_, category_tokens)| tokens.iter().any(|t| category_tokens.contains(*t)))
            .map(|(name, _)| name.clone())
    }

    fn record(&self, audit: &mut DishMappingAudit, slug: &str, category: Option<&str>) {
        let normalized = normalize_dish_slug(slug);
        match category {
            Some(_) => audit.record_mapped(&normalized),
            None => {
                debug!("Unmapped dish slug: {}", normalized);
                audit.record_unmapped(&normalized, &tokenize_slug(&normalized), &self.known);
            }
        }
    }
}

/// Pull the dish slug out of an item URL: the last segment after `items`.
pub fn slug_from_item_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let parts: Vec<&str> = parsed.path().split('/').filter(|p| !p.is_empty()).collect();
    let items_idx = parts.iter().position(|p| *p == "items")?;
    parts[items_idx + 1..].last().map(|s| s.to_string())
}

pub fn build_dish_taxonomy(
    item_urls: &[String],
    strategy: &DishStrategy,
    lexicon: &Lexicon,
) -> DishTaxonomy {
    let classifier = Classifier::new(lexicon);
    let mut audit = DishMappingAudit::default();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for slug in item_urls.iter().filter_map(|url| slug_from_item_url(url)) {
        let category = classifier.classify(&slug);
        classifier.record(&mut audit, &slug, category.as_deref());
        if let Some(category) = category {
            *counts.entry(category).or_default() += 1;
        }
    }

    let mut ranked: Vec<DishCategoryCount> = counts
        .into_iter()
        .map(|(category, count)| DishCategoryCount { category, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    let categories: Vec<DishCategoryCount> = ranked
        .into_iter()
        .filter(|c| c.count >= strategy.min_count)
        .take(strategy.top_n)
        .collect();

    info!(
        "Dish slugs: {} mapped, {} unmapped, {} categories kept",
        audit.mapped.len(),
        audit.unmapped.len(),
        categories.len()
    );

    DishTaxonomy {
        strategy: StrategySummary {
            mode: "strict",
            min_count: strategy.min_count,
            top_n: strategy.top_n,
        },
        audit: AuditSummary {
            top_unknown_tokens: audit.top_unknown_tokens(TOP_UNKNOWN_TOKENS),
            mapped: audit.mapped,
            unmapped: audit.unmapped,
            unknown_token_counts: audit.unknown_token_counts,
        },
        categories,
    }
}
