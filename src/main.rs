mod ahrefs;
mod artifacts;
mod core_pages;
mod dishes;
mod locations;
mod pipeline;
mod render;
mod sitemap;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::dishes::audit::DishMappingAudit;
use crate::dishes::lexicon::Lexicon;
use crate::dishes::{map_dish_slug, normalize_dish_slug, DishStrategy};
use crate::pipeline::{PipelineInputs, PipelineOptions};

#[derive(Parser)]
#[command(name = "seo_intake", about = "Turn a restaurant site export into SEO intake artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the artifacts directory
    Run {
        /// sitemap.xml of the site
        #[arg(long)]
        sitemap: PathBuf,
        /// Location page, or a directory of .html/.htm pages (repeatable)
        #[arg(long)]
        html: Vec<PathBuf>,
        /// Ahrefs keyword or performance export (at most two)
        #[arg(long)]
        csv: Vec<PathBuf>,
        /// Output directory; artifacts land in <out>/artifacts
        #[arg(long)]
        out: PathBuf,
        /// Minimum slug count for a dish category to be kept
        #[arg(long, default_value = "5")]
        min_count: usize,
        /// Max dish categories to keep
        #[arg(long, default_value = "15")]
        top_n: usize,
        /// Lexicon JSON replacing the built-in one
        #[arg(long)]
        lexicon: Option<PathBuf>,
        /// Append unknown dish tokens to the clipboard package
        #[arg(long)]
        unknown_tokens: bool,
    },
    /// Classify sitemap URLs without writing anything
    Classify {
        #[arg(long)]
        sitemap: PathBuf,
    },
    /// Map dish slugs to categories
    Dish {
        #[arg(long)]
        lexicon: Option<PathBuf>,
        #[arg(required = true)]
        slugs: Vec<String>,
    },
    /// Print the built-in lexicon as JSON
    Lexicon,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            sitemap,
            html,
            csv,
            out,
            min_count,
            top_n,
            lexicon,
            unknown_tokens,
        } => {
            let inputs = read_inputs(&sitemap, &html, &csv)?;
            let options = PipelineOptions {
                strategy: DishStrategy { min_count, top_n },
                lexicon: load_lexicon(lexicon.as_deref())?,
                include_unknown_tokens: unknown_tokens,
            };
            let dir = pipeline::run_pipeline(&inputs, &out, &options)?;
            println!("Artifacts: {}", dir.display());
            Ok(())
        }
        Commands::Classify { sitemap } => {
            let xml = fs::read(&sitemap)
                .with_context(|| format!("Failed to read {}", sitemap.display()))?;
            let urls = sitemap::classify_sitemap(&xml).context("Failed to parse sitemap")?;
            let (items, non_items) = urls.split_items();
            println!("Valid:     {}", urls.valid.len());
            println!("Excluded:  {}", urls.excluded.len());
            println!("Items:     {}", items.len());
            println!("Non-items: {}", non_items.len());
            if !urls.excluded.is_empty() {
                println!("\n--- Excluded ---");
                for ex in &urls.excluded {
                    println!("  {:<16} {}", ex.reason.as_str(), truncate(&ex.url, 80));
                }
            }
            Ok(())
        }
        Commands::Dish { lexicon, slugs } => {
            let lexicon = load_lexicon(lexicon.as_deref())?;
            let mut audit = DishMappingAudit::default();
            for slug in &slugs {
                let category = map_dish_slug(slug, &lexicon, Some(&mut audit));
                println!(
                    "{:<40} {}",
                    truncate(&normalize_dish_slug(slug), 40),
                    category.as_deref().unwrap_or("unmapped")
                );
            }
            let unknown = audit.top_unknown_tokens(10);
            if !unknown.is_empty() {
                println!("\n--- Unknown tokens ---");
                for t in &unknown {
                    println!("  {}: {}", t.token, t.count);
                }
            }
            Ok(())
        }
        Commands::Lexicon => {
            print!("{}", artifacts::to_stable_json(&Lexicon::default())?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_lexicon(path: Option<&Path>) -> anyhow::Result<Lexicon> {
    match path {
        Some(path) => Lexicon::load(path)
            .with_context(|| format!("Failed to load lexicon {}", path.display())),
        None => Ok(Lexicon::default()),
    }
}

fn read_inputs(sitemap: &Path, html: &[PathBuf], csv: &[PathBuf]) -> anyhow::Result<PipelineInputs> {
    use indicatif::{ProgressBar, ProgressStyle};

    let sitemap_xml =
        fs::read(sitemap).with_context(|| format!("Failed to read {}", sitemap.display()))?;

    let html_paths = expand_html_paths(html)?;
    let pb = ProgressBar::new(html_paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    let mut html_docs = Vec::with_capacity(html_paths.len());
    for path in &html_paths {
        pb.set_message(truncate(&path.display().to_string(), 40));
        html_docs.push(fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    if csv.len() > 2 {
        warn!("{} CSV files given; only the first two are used", csv.len());
    }
    let csv_blobs = csv
        .iter()
        .take(2)
        .map(|path| fs::read(path).with_context(|| format!("Failed to read {}", path.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let blob_refs: Vec<&[u8]> = csv_blobs.iter().map(Vec::as_slice).collect();
    let (keyword_csv, performance_csv) = ahrefs::identify_csvs(&blob_refs);

    Ok(PipelineInputs {
        sitemap_xml,
        html_docs,
        keyword_csv: keyword_csv.map(<[u8]>::to_vec),
        performance_csv: performance_csv.map(<[u8]>::to_vec),
    })
}

/// Files are taken as given; directories contribute their .html/.htm files, sorted.
fn expand_html_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if !path.is_dir() {
            out.push(path.clone());
            continue;
        }
        let mut pages = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("Failed to list {}", path.display()))? {
            let page = entry?.path();
            let is_html = page
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
            if is_html && page.is_file() {
                pages.push(page);
            }
        }
        pages.sort();
        out.extend(pages);
    }
    Ok(out)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_dirs_expand_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.html", "a.HTM", "notes.txt"] {
            fs::write(tmp.path().join(name), "<html></html>").unwrap();
        }
        let single = tmp.path().join("b.html");
        let paths = expand_html_paths(&[tmp.path().to_path_buf(), single.clone()]).unwrap();
        assert_eq!(paths, vec![tmp.path().join("a.HTM"), single.clone(), single]);
    }

    #[test]
    fn csvs_routed_by_header() {
        let tmp = tempfile::tempdir().unwrap();
        let sitemap = tmp.path().join("sitemap.xml");
        fs::write(&sitemap, "<urlset></urlset>").unwrap();
        let inputs = read_inputs(
            &sitemap,
            &[],
            &[
                PathBuf::from("tests/fixtures/performance.tsv"),
                PathBuf::from("tests/fixtures/keywords.csv"),
            ],
        )
        .unwrap();
        assert!(inputs.keyword_csv.unwrap().starts_with(b"Keyword"));
        assert!(inputs.performance_csv.unwrap().starts_with(b"Metric"));
        assert!(inputs.html_docs.is_empty());
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefgh", 3), "abc...");
    }
}
