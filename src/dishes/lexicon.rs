use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Whitelist only: categories are dishes, never ingredients. Keep the lists conservative.
const MARKETING: &[&str] = &[
    "award", "winning", "signature", "famous", "classic", "original", "house", "new",
];
const PREP: &[&str] = &[
    "grilled", "fried", "crispy", "smoked", "roasted", "baked", "blackened", "braised",
];
const INGREDIENTS: &[&str] = &[
    "ahi", "tuna", "guacamole", "chicken", "pork", "shrimp", "avocado", "cheese", "bacon",
];
const BEVERAGES: &[&str] = &[
    "beer", "cocktail", "soda", "wine", "margarita", "lemonade", "tea", "coffee",
];

const CATEGORIES: &[(&str, &[&str])] = &[
    ("burgers", &["burger", "burgers", "cheeseburger"]),
    ("desserts", &["brownie", "cake", "cheesecake", "cookie", "pie", "sundae"]),
    ("nachos", &["nachos"]),
    ("pasta", &["fettuccine", "lasagna", "pasta", "penne", "spaghetti"]),
    ("pizza", &["pizza", "flatbread"]),
    ("ribs", &["ribs"]),
    ("salads", &["salad", "salads"]),
    ("sandwiches", &["sandwich", "sandwiches", "wrap", "hoagie"]),
    ("soups", &["soup", "chowder", "chili"]),
    ("steaks", &["steak", "ribeye", "sirloin", "filet"]),
    ("tacos", &["taco", "tacos"]),
    ("wings", &["wings"]),
];

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lexicon JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("category {0:?} has no tokens")]
    EmptyCategory(String),
}

/// Word lists driving dish classification. Category names iterate sorted,
/// which fixes the order categories are tested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub marketing: BTreeSet<String>,
    pub prep: BTreeSet<String>,
    pub ingredients: BTreeSet<String>,
    pub beverages: BTreeSet<String>,
    pub categories: BTreeMap<String, BTreeSet<String>>,
}

impl Default for Lexicon {
    fn default() -> Self {
        let set = |words: &[&str]| -> BTreeSet<String> {
            words.iter().map(|w| w.to_string()).collect()
        };
        Lexicon {
            marketing: set(MARKETING),
            prep: set(PREP),
            ingredients: set(INGREDIENTS),
            beverages: set(BEVERAGES),
            categories: CATEGORIES
                .iter()
                .map(|(name, tokens)| (name.to_string(), set(tokens)))
                .collect(),
        }
    }
}

impl Lexicon {
    pub fn from_json(json: &str) -> Result<Self, LexiconError> {
        let lexicon: Lexicon = serde_json::from_str(json)?;
        if let Some((name, _)) = lexicon.categories.iter().find(|(_, t)| t.is_empty()) {
            return Err(LexiconError::EmptyCategory(name.clone()));
        }
        Ok(lexicon)
    }

    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Tokens that describe a dish without naming its category.
    pub fn non_category_tokens(&self) -> HashSet<&str> {
        self.marketing
            .iter()
            .chain(&self.prep)
            .chain(&self.ingredients)
            .chain(&self.beverages)
            .map(String::as_str)
            .collect()
    }

    /// Every token the lexicon knows about, category tokens included.
    pub fn known_tokens(&self) -> HashSet<&str> {
        let mut known = self.non_category_tokens();
        known.extend(self.categories.values().flatten().map(String::as_str));
        known
    }
}
