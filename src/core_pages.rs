use serde::Serialize;

const CORE_KEYWORDS: &[(&str, &str)] = &[
    ("/menu", "Menu"),
    ("/private-events", "Private Events"),
    ("/locations", "Locations"),
    ("/about", "About"),
];

const OTHER_LABEL: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorePageEntry {
    pub url: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

pub fn label_for(url: &str) -> &'static str {
    CORE_KEYWORDS
        .iter()
        .find(|(path, _)| url.contains(path))
        .map_or(OTHER_LABEL, |&(_, label)| label)
}

/// Label non-item URLs and order them by (-score, url).
pub fn rank_core_pages(urls: &[String]) -> Vec<CorePageEntry> {
    let mut pages: Vec<CorePageEntry> = urls
        .iter()
        .map(|url| CorePageEntry {
            url: url.clone(),
            label: label_for(url).to_string(),
            score: None,
        })
        .collect();
    sort_core_pages(&mut pages);
    pages
}

pub fn sort_core_pages(pages: &mut [CorePageEntry]) {
    pages.sort_by(|a, b| {
        b.score
            .unwrap_or(0)
            .cmp(&a.score.unwrap_or(0))
            .then_with(|| a.url.cmp(&b.url))
    });
}
