use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::ahrefs::AhrefsOverview;
use crate::core_pages::CorePageEntry;
use crate::dishes::DishTaxonomy;
use crate::locations::LocationRecord;
use crate::sitemap::ExcludedUrl;

pub const ARTIFACTS_DIR: &str = "artifacts";
pub const SITE_FACTS: &str = "site_facts.json";
pub const LOCATIONS: &str = "locations.json";
pub const CORE_PAGES: &str = "core_pages.json";
pub const DISH_TAXONOMY: &str = "dish_taxonomy.json";
pub const AHREFS_SUMMARY: &str = "ahrefs_summary.json";
pub const CLIPBOARD: &str = "clipboard_package.txt";

#[derive(Debug, Default, Serialize)]
pub struct SiteFacts {
    pub domain: Option<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Locations<'a> {
    pub locations: &'a [LocationRecord],
}

#[derive(Debug, Serialize)]
pub struct CorePages<'a> {
    pub urls: &'a [CorePageEntry],
    pub excluded: &'a [ExcludedUrl],
}

#[derive(Debug, Serialize)]
pub struct DishTaxonomyArtifact<'a> {
    pub dishes: &'a DishTaxonomy,
}

#[derive(Debug, Serialize)]
pub struct AhrefsSummary<'a> {
    pub overview: &'a AhrefsOverview,
}

/// Pretty JSON with lexicographically sorted keys and a trailing newline.
pub fn to_stable_json<T: Serialize>(payload: &T) -> Result<String> {
    // serde_json's Map is a BTreeMap, so going through Value sorts every object.
    let value = serde_json::to_value(payload)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

pub fn write_stable_json<T: Serialize>(payload: &T, path: &Path) -> Result<()> {
    let text = to_stable_json(payload)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Create `<out_dir>/artifacts` or empty it of regular files.
pub fn ensure_artifacts_dir(out_dir: &Path) -> Result<PathBuf> {
    let dir = out_dir.join(ARTIFACTS_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Unsorted {
        zeta: u8,
        alpha: Vec<u8>,
        mid: Option<String>,
    }

    #[test]
    fn keys_are_sorted_and_newline_terminated() {
        let json = to_stable_json(&Unsorted {
            zeta: 1,
            alpha: vec![],
            mid: Some("é".into()),
        })
        .unwrap();
        assert_eq!(json, "{\n  \"alpha\": [],\n  \"mid\": \"é\",\n  \"zeta\": 1\n}\n");
    }

    #[test]
    fn site_facts_placeholder() {
        let json = to_stable_json(&SiteFacts::default()).unwrap();
        assert_eq!(json, "{\n  \"domain\": null,\n  \"notes\": []\n}\n");
    }

    #[test]
    fn clears_files_but_keeps_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_artifacts_dir(tmp.path()).unwrap();
        fs::write(dir.join("stale.json"), "{}").unwrap();
        fs::create_dir(dir.join("keep")).unwrap();
        fs::write(dir.join("keep").join("inner.txt"), "x").unwrap();

        let again = ensure_artifacts_dir(tmp.path()).unwrap();
        assert_eq!(again, dir);
        assert!(!dir.join("stale.json").exists());
        assert!(dir.join("keep").join("inner.txt").exists());
    }
}
