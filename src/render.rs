use crate::ahrefs::AhrefsOverview;
use crate::core_pages::CorePageEntry;
use crate::dishes::audit::TokenCount;
use crate::dishes::DishCategoryCount;
use crate::locations::LocationRecord;

const NOT_PROVIDED: &str = "Not provided";
const NONE_LINE: &str = "- None";

pub struct ClipboardInput<'a> {
    pub locations: &'a [LocationRecord],
    pub core_pages: &'a [CorePageEntry],
    pub dish_categories: &'a [DishCategoryCount],
    pub ahrefs: &'a AhrefsOverview,
    /// Tuning section; omitted entirely when `None`.
    pub unknown_tokens: Option<&'a [TokenCount]>,
}

/// Flatten all artifacts into the plaintext clipboard package.
pub fn render_clipboard(input: &ClipboardInput<'_>) -> String {
    let mut lines: Vec<String> = vec!["SEO Intake Summary".into(), String::new()];

    lines.push("Locations:".into());
    push_list(&mut lines, input.locations.iter().map(location_line));
    lines.push(String::new());

    lines.push("Core Pages:".into());
    push_list(
        &mut lines,
        input
            .core_pages
            .iter()
            .map(|p| format!("- {}: {}", p.label, p.url)),
    );
    lines.push(String::new());

    lines.push("Dish Categories:".into());
    push_list(
        &mut lines,
        input
            .dish_categories
            .iter()
            .map(|c| format!("- {} ({})", c.category, c.count)),
    );
    lines.push(String::new());

    lines.push("Ahrefs Snapshot:".into());
    push_ahrefs(&mut lines, input.ahrefs);

    if let Some(tokens) = input.unknown_tokens {
        lines.push(String::new());
        lines.push("Dish Unknown Tokens (tuning):".into());
        push_list(
            &mut lines,
            tokens.iter().map(|t| format!("- {} ({})", t.token, t.count)),
        );
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn push_list(lines: &mut Vec<String>, items: impl Iterator<Item = String>) {
    let before = lines.len();
    lines.extend(items);
    if lines.len() == before {
        lines.push(NONE_LINE.into());
    }
}

fn or_not_provided(value: &str) -> &str {
    if value.is_empty() {
        NOT_PROVIDED
    } else {
        value
    }
}

fn location_line(loc: &LocationRecord) -> String {
    let address = [&loc.full_address, &loc.city_state_zip, &loc.street]
        .into_iter()
        .find(|a| !a.is_empty())
        .map_or(NOT_PROVIDED, |a| a.as_str());
    format!(
        "- {}: {} | Phone: {} | Email: {} | Confidence: {}",
        or_not_provided(&loc.location_name),
        address,
        or_not_provided(&loc.phone),
        or_not_provided(&loc.email),
        loc.confidence.as_str()
    )
}

fn opt_text<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| NOT_PROVIDED.to_string(), |v| v.to_string())
}

fn push_ahrefs(lines: &mut Vec<String>, overview: &AhrefsOverview) {
    if overview.is_empty() {
        lines.push(NOT_PROVIDED.into());
        return;
    }

    let trend = overview.traffic_trend.clone().unwrap_or_default();
    lines.push(format!(
        "Traffic trend: {} (confidence: {})",
        opt_text(&trend.direction),
        opt_text(&trend.confidence)
    ));

    let distribution = overview
        .position_distribution
        .as_ref()
        .map(|d| {
            d.latest_counts
                .iter()
                .map(|(bucket, count)| format!("{}: {}", bucket, count))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "None".into());
    lines.push(format!("Position distribution: {}", distribution));

    lines.push("Top keywords:".into());
    let keywords = overview.top_keywords.as_deref().unwrap_or_default();
    push_list(
        lines,
        keywords.iter().map(|k| {
            format!(
                "- {} | volume: {} | position: {} | url: {}",
                k.keyword,
                opt_text(&k.volume),
                opt_text(&k.position),
                opt_text(&k.url)
            )
        }),
    );
}
