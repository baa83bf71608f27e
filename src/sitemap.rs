use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("sitemap XML could not be read: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("sitemap is not well-formed XML: {0}")]
    Malformed(String),
}

/// Why a `<loc>` entry was left out of the valid set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    InvalidUrl,
    UnsupportedScheme,
    MissingHost,
    NestedScheme,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::InvalidUrl => "invalid_url",
            ExclusionReason::UnsupportedScheme => "unsupported_scheme",
            ExclusionReason::MissingHost => "missing_host",
            ExclusionReason::NestedScheme => "nested_scheme",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedUrl {
    pub url: String,
    pub reason: ExclusionReason,
}

/// Sitemap entries partitioned into valid and excluded, both in document order.
#[derive(Debug, Clone, Default)]
pub struct SitemapUrls {
    pub valid: Vec<String>,
    pub excluded: Vec<ExcludedUrl>,
}

impl SitemapUrls {
    /// Split valid URLs into (item, non-item).
    pub fn split_items(&self) -> (Vec<String>, Vec<String>) {
        self.valid.iter().cloned().partition(|url| is_item_url(url))
    }
}

/// Parse sitemap bytes and classify every `<loc>` entry.
pub fn classify_sitemap(xml: &[u8]) -> Result<SitemapUrls, SitemapError> {
    let locs = parse_urlset(xml)?;
    info!("Total URLs in sitemap: {}", locs.len());

    let mut urls = SitemapUrls::default();
    for loc in locs {
        match check_url(&loc) {
            Ok(()) => urls.valid.push(loc),
            Err(reason) => {
                debug!("Excluding {} ({})", loc, reason.as_str());
                urls.excluded.push(ExcludedUrl { url: loc, reason });
            }
        }
    }

    info!(
        "Sitemap URLs: {} valid, {} excluded",
        urls.valid.len(),
        urls.excluded.len()
    );
    Ok(urls)
}

/// Parse a urlset document and return all `<url><loc>` texts, ignoring namespaces.
pub fn parse_urlset(xml: &[u8]) -> Result<Vec<String>, SitemapError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut urls = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut url_depth: Option<usize> = None;
    let mut loc_text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                if depth == 0 && saw_root {
                    return Err(SitemapError::Malformed("multiple root elements".into()));
                }
                saw_root = true;
                depth += 1;
                match e.local_name().as_ref() {
                    b"url" => url_depth = Some(depth),
                    b"loc" if url_depth == Some(depth - 1) => loc_text = Some(String::new()),
                    _ => {}
                }
            }
            Event::Empty(_) => {
                if depth == 0 {
                    if saw_root {
                        return Err(SitemapError::Malformed("multiple root elements".into()));
                    }
                    saw_root = true;
                }
            }
            Event::Text(e) => {
                let text = e.unescape()?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(SitemapError::Malformed(
                        "text content outside the root element".into(),
                    ));
                }
                if let Some(loc) = loc_text.as_mut() {
                    loc.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(loc) = loc_text.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => {
                if depth == 0 {
                    return Err(SitemapError::Malformed("unexpected closing tag".into()));
                }
                match e.local_name().as_ref() {
                    b"loc" => {
                        if let Some(loc) = loc_text.take() {
                            let loc = loc.trim();
                            if !loc.is_empty() {
                                urls.push(loc.to_string());
                            }
                        }
                    }
                    b"url" if url_depth == Some(depth) => url_depth = None,
                    _ => {}
                }
                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SitemapError::Malformed("no root element".into()));
    }
    if depth != 0 {
        return Err(SitemapError::Malformed(format!(
            "{} element(s) left unclosed",
            depth
        )));
    }
    Ok(urls)
}

/// Check a `<loc>` value against the malformed-URL rules.
pub fn check_url(loc: &str) -> Result<(), ExclusionReason> {
    let parsed = Url::parse(loc).map_err(|_| ExclusionReason::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExclusionReason::UnsupportedScheme);
    }
    if parsed.host_str().map_or(true, str::is_empty) || raw_authority(loc, parsed.scheme()).is_none() {
        return Err(ExclusionReason::MissingHost);
    }
    let path = parsed.path();
    if path.starts_with("/http") || path.contains("/https/") {
        return Err(ExclusionReason::NestedScheme);
    }
    Ok(())
}

/// Non-empty authority as written after `scheme://`. `Url::parse` gives
/// `https:///menu` and `https:example.com` a host the raw text lacks.
fn raw_authority<'a>(loc: &'a str, scheme: &str) -> Option<&'a str> {
    let rest = loc.get(scheme.len()..)?.strip_prefix("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Some(&rest[..end]).filter(|authority| !authority.is_empty())
}

pub fn is_item_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.path().contains("/items/"))
        .unwrap_or_else(|_| url.contains("/items/"))
}
