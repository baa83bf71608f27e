pub mod address;

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, info};

use address::{clean_text, Confidence, LocationKey, ParsedAddress};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRecord {
    pub location_name: String,
    pub street: String,
    pub city_state_zip: String,
    pub city: String,
    pub region: String,
    pub postal: String,
    pub full_address: String,
    pub confidence: Confidence,
    pub phone: String,
    pub email: String,
}

impl LocationRecord {
    pub fn key(&self) -> LocationKey {
        LocationKey::new(
            &self.location_name,
            &self.street,
            &self.city_state_zip,
            &self.phone,
            &self.email,
        )
    }
}

/// Selectors for the location block pattern: a `span.location-name` whose
/// parent holds an `<address>` of spans plus `tel:` / `mailto:` links.
struct LocationSelectors {
    name: Selector,
    address: Selector,
    span: Selector,
    tel: Selector,
    mailto: Selector,
}

impl LocationSelectors {
    fn new() -> Self {
        LocationSelectors {
            name: Selector::parse("span.location-name").unwrap(),
            address: Selector::parse("address").unwrap(),
            span: Selector::parse("span").unwrap(),
            tel: Selector::parse(r#"a[href^="tel:"]"#).unwrap(),
            mailto: Selector::parse(r#"a[href^="mailto:"]"#).unwrap(),
        }
    }
}

/// Scan every document, then drop repeats (first occurrence wins).
pub fn extract_locations<T: AsRef<[u8]>>(html_docs: &[T]) -> Vec<LocationRecord> {
    let selectors = LocationSelectors::new();
    let mut seen = HashSet::new();
    let mut locations = Vec::new();
    let mut scanned = 0usize;

    for doc in html_docs {
        let html = String::from_utf8_lossy(doc.as_ref());
        for record in scan_document(&html, &selectors) {
            scanned += 1;
            if seen.insert(record.key()) {
                locations.push(record);
            } else {
                debug!("Duplicate location skipped: {}", record.location_name);
            }
        }
    }

    info!(
        "Locations: {} found in {} documents, {} after dedup",
        scanned,
        html_docs.len(),
        locations.len()
    );
    locations
}

fn scan_document(html: &str, selectors: &LocationSelectors) -> Vec<LocationRecord> {
    let document = Html::parse_document(html);
    document
        .select(&selectors.name)
        .map(|name_span| build_record(name_span, selectors))
        .collect()
}

fn build_record(name_span: ElementRef<'_>, selectors: &LocationSelectors) -> LocationRecord {
    let container = name_span.parent().and_then(ElementRef::wrap);

    let address_lines: Vec<String> = container
        .and_then(|c| c.select(&selectors.address).next())
        .map(|address| {
            address
                .select(&selectors.span)
                .map(|span| clean_text(&element_text(span)))
                .filter(|line| !line.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let phone = container
        .and_then(|c| c.select(&selectors.tel).next())
        .map(|a| clean_text(&element_text(a)))
        .unwrap_or_default();

    let email = container
        .and_then(|c| c.select(&selectors.mailto).next())
        .and_then(|a| a.value().attr("href"))
        .map(|href| clean_text(href.strip_prefix("mailto:").unwrap_or(href)))
        .unwrap_or_default();

    let parsed = ParsedAddress::from_lines(&address_lines);
    LocationRecord {
        location_name: clean_text(&element_text(name_span)),
        full_address: parsed.full_address(),
        confidence: parsed.confidence(),
        street: parsed.street,
        city_state_zip: parsed.city_state_zip,
        city: parsed.city,
        region: parsed.region,
        postal: parsed.postal,
        phone,
        email,
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        std::fs::read(format!("tests/fixtures/{}", name)).unwrap()
    }

    const SINGLE: &str = r#"
        <div class="location">
          <span class="location-name">Downtown</span>
          <address>
            <span>123 Main St</span>
            <span>Springfield, IL 62704</span>
          </address>
          <a href="tel:+15551234567">(555) 123-4567</a>
        </div>"#;

    #[test]
    fn single_location_is_high_confidence() {
        let locations = extract_locations(&[SINGLE]);
        assert_eq!(locations.len(), 1);
        let loc = &locations[0];
        assert_eq!(loc.location_name, "Downtown");
        assert_eq!(loc.street, "123 Main St");
        assert_eq!(loc.city, "Springfield");
        assert_eq!(loc.region, "IL");
        assert_eq!(loc.postal, "62704");
        assert_eq!(loc.phone, "(555) 123-4567");
        assert_eq!(loc.email, "");
        assert_eq!(loc.confidence, Confidence::High);
        assert_eq!(loc.full_address, "123 Main St, Springfield, IL 62704");
    }

    #[test]
    fn missing_structure_degrades_to_empty_fields() {
        let html = r#"<p><span class="location-name">  Pop-up
            Stand </span></p>"#;
        let locations = extract_locations(&[html]);
        assert_eq!(locations.len(), 1);
        let loc = &locations[0];
        assert_eq!(loc.location_name, "Pop-up Stand");
        assert!(loc.street.is_empty());
        assert!(loc.full_address.is_empty());
        assert!(loc.phone.is_empty());
        assert_eq!(loc.confidence, Confidence::Low);
    }

    #[test]
    fn mailto_prefix_is_stripped() {
        let html = r#"<div><span class="location-name">North</span>
            <a href="mailto: north@example.com ">Email us</a></div>"#;
        let locations = extract_locations(&[html]);
        assert_eq!(locations[0].email, "north@example.com");
    }

    #[test]
    fn first_tel_link_wins_and_whitespace_is_collapsed() {
        let html = r#"<div><span class="location-name">East</span>
            <a href="tel:1">  555
               0001 </a><a href="tel:2">555 0002</a></div>"#;
        let locations = extract_locations(&[html]);
        assert_eq!(locations[0].phone, "555 0001");
    }

    #[test]
    fn duplicates_across_documents_keep_first() {
        let renamed = SINGLE.replace("Downtown", "Main Street");
        let locations = extract_locations(&[SINGLE.to_string(), renamed]);
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].location_name, "Downtown");
    }

    #[test]
    fn name_keyed_records_dedup_by_name() {
        let a = r#"<div><span class="location-name">Truck</span><a href="tel:1">555-0100</a></div>"#;
        let b = r#"<div><span class="location-name">Cart</span><a href="tel:1">555-0100</a></div>"#;
        let locations = extract_locations(&[a, a, b]);
        let names: Vec<&str> = locations.iter().map(|l| l.location_name.as_str()).collect();
        assert_eq!(names, vec!["Truck", "Cart"]);
    }

    #[test]
    fn multi_location_fixture() {
        let docs = vec![fixture("sample_locations_multi.html")];
        let locations = extract_locations(&docs);
        let names: Vec<&str> = locations.iter().map(|l| l.location_name.as_str()).collect();
        assert_eq!(names, vec!["Downtown", "Riverside", "Airport Kiosk"]);

        assert_eq!(locations[0].confidence, Confidence::High);
        assert_eq!(locations[0].email, "downtown@example.com");
        assert_eq!(locations[1].confidence, Confidence::Medium);
        assert_eq!(locations[1].full_address, "48 River Rd, Dayton, OH");
        assert_eq!(locations[2].confidence, Confidence::Low);
        assert_eq!(locations[2].street, "Terminal B, Gate 12");
    }

    #[test]
    fn extraction_is_repeatable() {
        let docs = vec![fixture("sample_location.html"), fixture("sample_locations_multi.html")];
        assert_eq!(extract_locations(&docs), extract_locations(&docs));
    }
}
