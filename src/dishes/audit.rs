use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Record of how every processed slug was classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DishMappingAudit {
    pub mapped: Vec<String>,
    pub unmapped: Vec<String>,
    pub unknown_token_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
}

impl DishMappingAudit {
    pub fn record_mapped(&mut self, slug: &str) {
        self.mapped.push(slug.to_string());
    }

    /// Record an unmapped slug; tokens outside `known` count as unknown.
    pub fn record_unmapped(&mut self, slug: &str, tokens: &[&str], known: &HashSet<&str>) {
        self.unmapped.push(slug.to_string());
        for token in tokens.iter().filter(|t| !known.contains(*t)) {
            *self.unknown_token_counts.entry(token.to_string()).or_default() += 1;
        }
    }

    /// Most frequent unknown tokens, ordered by (-count, token).
    pub fn top_unknown_tokens(&self, limit: usize) -> Vec<TokenCount> {
        let mut counts: Vec<TokenCount> = self
            .unknown_token_counts
            .iter()
            .map(|(token, &count)| TokenCount {
                token: token.clone(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));
        counts.truncate(limit);
        counts
    }
}
