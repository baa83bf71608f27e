use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::ahrefs::build_ahrefs_overview;
use crate::artifacts::{self, AhrefsSummary, CorePages, DishTaxonomyArtifact, Locations, SiteFacts};
use crate::core_pages::rank_core_pages;
use crate::dishes::lexicon::Lexicon;
use crate::dishes::{build_dish_taxonomy, DishStrategy};
use crate::locations::extract_locations;
use crate::render::{render_clipboard, ClipboardInput};
use crate::sitemap::classify_sitemap;

/// Raw bytes for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub sitemap_xml: Vec<u8>,
    pub html_docs: Vec<Vec<u8>>,
    pub keyword_csv: Option<Vec<u8>>,
    pub performance_csv: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub strategy: DishStrategy,
    pub lexicon: Lexicon,
    /// Append the unknown-token tuning section to the clipboard package.
    pub include_unknown_tokens: bool,
}

/// Run every stage and write the artifacts; returns `<out_dir>/artifacts`.
pub fn run_pipeline(
    inputs: &PipelineInputs,
    out_dir: &Path,
    options: &PipelineOptions,
) -> Result<PathBuf> {
    let sitemap = classify_sitemap(&inputs.sitemap_xml).context("Failed to parse sitemap")?;
    let (item_urls, non_item_urls) = sitemap.split_items();
    info!(
        "Item URLs: {}, non-item URLs: {}",
        item_urls.len(),
        non_item_urls.len()
    );

    let core_pages = rank_core_pages(&non_item_urls);
    let locations = extract_locations(&inputs.html_docs);
    let dishes = build_dish_taxonomy(&item_urls, &options.strategy, &options.lexicon);
    let overview = build_ahrefs_overview(
        inputs.keyword_csv.as_deref(),
        inputs.performance_csv.as_deref(),
    );

    let dir = artifacts::ensure_artifacts_dir(out_dir)?;

    artifacts::write_stable_json(&SiteFacts::default(), &dir.join(artifacts::SITE_FACTS))?;
    artifacts::write_stable_json(
        &Locations {
            locations: &locations,
        },
        &dir.join(artifacts::LOCATIONS),
    )?;
    artifacts::write_stable_json(
        &CorePages {
            urls: &core_pages,
            excluded: &sitemap.excluded,
        },
        &dir.join(artifacts::CORE_PAGES),
    )?;
    artifacts::write_stable_json(
        &DishTaxonomyArtifact { dishes: &dishes },
        &dir.join(artifacts::DISH_TAXONOMY),
    )?;
    artifacts::write_stable_json(
        &AhrefsSummary {
            overview: &overview,
        },
        &dir.join(artifacts::AHREFS_SUMMARY),
    )?;

    let unknown_tokens = options
        .include_unknown_tokens
        .then_some(dishes.audit.top_unknown_tokens.as_slice());
    let clipboard = render_clipboard(&ClipboardInput {
        locations: &locations,
        core_pages: &core_pages,
        dish_categories: &dishes.categories,
        ahrefs: &overview,
        unknown_tokens,
    });
    let clipboard_path = dir.join(artifacts::CLIPBOARD);
    fs::write(&clipboard_path, clipboard)
        .with_context(|| format!("Failed to write {}", clipboard_path.display()))?;

    info!("Artifacts written to {}", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fixture(name: &str) -> Vec<u8> {
        fs::read(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn read_json(dir: &Path, name: &str) -> Value {
        serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    fn sample_inputs(html: &str) -> PipelineInputs {
        PipelineInputs {
            sitemap_xml: fixture("sample_sitemap.xml"),
            html_docs: vec![fixture(html)],
            keyword_csv: None,
            performance_csv: None,
        }
    }

    fn min_count_one() -> PipelineOptions {
        PipelineOptions {
            strategy: DishStrategy { min_count: 1, top_n: 15 },
            ..Default::default()
        }
    }

    #[test]
    fn single_ribs_item_yields_ribs_category() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = PipelineInputs {
            sitemap_xml: br#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"><url><loc>https://example.com/items/ribs/award-winning-ribs-123456</loc></url></urlset>"#.to_vec(),
            ..Default::default()
        };
        let dir = run_pipeline(&inputs, tmp.path(), &min_count_one()).unwrap();

        let taxonomy = read_json(&dir, artifacts::DISH_TAXONOMY);
        assert_eq!(
            taxonomy["dishes"]["categories"],
            json!([{ "category": "ribs", "count": 1 }])
        );
        assert_eq!(
            taxonomy["dishes"]["strategy"],
            json!({ "mode": "strict", "min_count": 1, "top_n": 15 })
        );
        assert_eq!(read_json(&dir, artifacts::AHREFS_SUMMARY), json!({ "overview": {} }));
        assert_eq!(
            fs::read_to_string(dir.join(artifacts::SITE_FACTS)).unwrap(),
            "{\n  \"domain\": null,\n  \"notes\": []\n}\n"
        );
    }

    #[test]
    fn sample_site_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = run_pipeline(&sample_inputs("sample_location.html"), tmp.path(), &min_count_one()).unwrap();

        let locations = read_json(&dir, artifacts::LOCATIONS);
        assert_eq!(
            locations,
            json!({ "locations": [{
                "location_name": "Springfield",
                "street": "123 Main St",
                "city_state_zip": "Springfield, IL 62704",
                "city": "Springfield",
                "region": "IL",
                "postal": "62704",
                "full_address": "123 Main St, Springfield, IL 62704",
                "confidence": "high",
                "phone": "(217) 555-0142",
                "email": "springfield@smokehouse.example"
            }]})
        );

        let core = read_json(&dir, artifacts::CORE_PAGES);
        assert_eq!(
            core["urls"],
            json!([
                { "url": "https://smokehouse.example/", "label": "Other" },
                { "url": "https://smokehouse.example/about", "label": "About" },
                { "url": "https://smokehouse.example/locations", "label": "Locations" },
                { "url": "https://smokehouse.example/menu", "label": "Menu" },
                { "url": "https://smokehouse.example/private-events", "label": "Private Events" }
            ])
        );
        assert_eq!(
            core["excluded"],
            json!([
                { "url": "https://smokehouse.example/https/smokehouse.example/menu", "reason": "nested_scheme" },
                { "url": "smokehouse.example/about", "reason": "invalid_url" }
            ])
        );

        let dishes = read_json(&dir, artifacts::DISH_TAXONOMY)["dishes"].clone();
        assert_eq!(
            dishes["categories"],
            json!([
                { "category": "ribs", "count": 2 },
                { "category": "tacos", "count": 1 }
            ])
        );
        assert_eq!(
            dishes["audit"]["unmapped"],
            json!(["ahi-tuna-guacamole", "house-lemonade", "brisket-plate"])
        );
        assert_eq!(
            dishes["audit"]["top_unknown_tokens"],
            json!([{ "token": "brisket", "count": 1 }, { "token": "plate", "count": 1 }])
        );

        let clipboard = fs::read_to_string(dir.join(artifacts::CLIPBOARD)).unwrap();
        assert!(clipboard.starts_with("SEO Intake Summary\n"));
        assert!(clipboard.contains("- ribs (2)\n"));
        assert!(!clipboard.contains("Dish Unknown Tokens"));
        assert!(clipboard.ends_with('\n'));
    }

    #[test]
    fn multi_location_page_dedups() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = run_pipeline(
            &sample_inputs("sample_locations_multi.html"),
            tmp.path(),
            &PipelineOptions::default(),
        )
        .unwrap();
        let locations = read_json(&dir, artifacts::LOCATIONS);
        let names: Vec<&str> = locations["locations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["location_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Downtown", "Riverside", "Airport Kiosk"]);
    }

    #[test]
    fn rerun_is_byte_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let mut inputs = sample_inputs("sample_locations_multi.html");
        inputs.html_docs.push(fixture("sample_location.html"));
        inputs.keyword_csv = Some(fixture("keywords.csv"));
        inputs.performance_csv = Some(fixture("performance.tsv"));
        let options = PipelineOptions {
            include_unknown_tokens: true,
            ..min_count_one()
        };

        let names = [
            artifacts::SITE_FACTS,
            artifacts::LOCATIONS,
            artifacts::CORE_PAGES,
            artifacts::DISH_TAXONOMY,
            artifacts::AHREFS_SUMMARY,
            artifacts::CLIPBOARD,
        ];
        let dir = run_pipeline(&inputs, tmp.path(), &options).unwrap();
        let first: Vec<Vec<u8>> = names.iter().map(|n| fs::read(dir.join(n)).unwrap()).collect();

        fs::write(dir.join("leftover.txt"), "stale").unwrap();
        let dir = run_pipeline(&inputs, tmp.path(), &options).unwrap();
        let second: Vec<Vec<u8>> = names.iter().map(|n| fs::read(dir.join(n)).unwrap()).collect();

        assert_eq!(first, second);
        assert!(!dir.join("leftover.txt").exists());

        let overview = read_json(&dir, artifacts::AHREFS_SUMMARY)["overview"].clone();
        assert_eq!(overview["traffic_trend"], json!({ "direction": "up", "confidence": "78%" }));
        assert_eq!(overview["top_keywords"][0]["keyword"], json!("bbq near me"));
        let clipboard = String::from_utf8(second[5].clone()).unwrap();
        assert!(clipboard.contains("Dish Unknown Tokens (tuning):\n- brisket (1)\n"));
    }

    #[test]
    fn malformed_sitemap_aborts_before_touching_output() {
        let tmp = tempfile::tempdir().unwrap();
        let inputs = PipelineInputs {
            sitemap_xml: b"<urlset><url><loc>https://example.com/".to_vec(),
            ..Default::default()
        };
        assert!(run_pipeline(&inputs, tmp.path(), &PipelineOptions::default()).is_err());
        assert!(!tmp.path().join(artifacts::ARTIFACTS_DIR).exists());
    }
}
