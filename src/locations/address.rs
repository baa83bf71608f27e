use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static CITY_STATE_ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<city>.+?),\s*(?P<region>[A-Za-z]{2})\s+(?P<postal>\d{5}(?:-\d{4})?)$").unwrap()
});
static CITY_STATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<city>.+?),\s*(?P<region>[A-Za-z]{2})$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Address lines resolved into street + city/region/postal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAddress {
    pub street: String,
    pub city_state_zip: String,
    pub city: String,
    pub region: String,
    pub postal: String,
}

impl ParsedAddress {
    /// Street is the first line; the city line is searched from the end of
    /// all lines, street line included.
    pub fn from_lines(lines: &[String]) -> Self {
        let Some(first) = lines.first() else {
            return ParsedAddress::default();
        };

        let city_line = find_from_end(lines, &CITY_STATE_ZIP_RE)
            .or_else(|| find_from_end(lines, &CITY_STATE_RE))
            .and_then(|line| parse_city_line(line));

        let mut parsed = match city_line {
            Some(parsed) => parsed,
            // A lone line is already the street; there is no separate raw city line.
            None if lines.len() == 1 => ParsedAddress::default(),
            None => ParsedAddress {
                city_state_zip: lines[lines.len() - 1].clone(),
                ..Default::default()
            },
        };
        parsed.street = first.clone();
        parsed
    }

    pub fn full_address(&self) -> String {
        if !self.street.is_empty()
            && !self.city.is_empty()
            && !self.region.is_empty()
            && !self.postal.is_empty()
        {
            format!("{}, {}, {} {}", self.street, self.city, self.region, self.postal)
        } else if !self.street.is_empty() && !self.city_state_zip.is_empty() {
            format!("{}, {}", self.street, self.city_state_zip)
        } else {
            String::new()
        }
    }

    pub fn confidence(&self) -> Confidence {
        let has_street = !self.street.is_empty();
        let has_city = !self.city.is_empty();
        let has_region = !self.region.is_empty();
        let has_postal = !self.postal.is_empty();

        if has_street && has_city && has_region && has_postal {
            Confidence::High
        } else if has_street && has_city && (has_region || has_postal) {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

fn find_from_end<'a>(lines: &'a [String], re: &Regex) -> Option<&'a String> {
    lines.iter().rev().find(|line| re.is_match(line))
}

fn parse_city_line(line: &str) -> Option<ParsedAddress> {
    if let Some(caps) = CITY_STATE_ZIP_RE.captures(line) {
        return Some(ParsedAddress {
            street: String::new(),
            city_state_zip: line.to_string(),
            city: caps["city"].trim().to_string(),
            region: caps["region"].to_uppercase(),
            postal: caps["postal"].to_string(),
        });
    }
    CITY_STATE_RE.captures(line).map(|caps| ParsedAddress {
        street: String::new(),
        city_state_zip: line.to_string(),
        city: caps["city"].trim().to_string(),
        region: caps["region"].to_uppercase(),
        postal: String::new(),
    })
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn normalize_key_part(text: &str) -> String {
    clean_text(text).to_lowercase()
}

/// Identity used to drop repeated locations across documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationKey {
    Address {
        street: String,
        city_state_zip: String,
        phone: String,
        email: String,
    },
    Name {
        name: String,
        phone: String,
        email: String,
    },
}

impl LocationKey {
    pub fn new(name: &str, street: &str, city_state_zip: &str, phone: &str, email: &str) -> Self {
        let phone = phone_digits(phone);
        let email = normalize_key_part(email);
        if !street.is_empty() && !city_state_zip.is_empty() {
            LocationKey::Address {
                street: normalize_key_part(street),
                city_state_zip: normalize_key_part(city_state_zip),
                phone,
                email,
            }
        } else {
            LocationKey::Name {
                name: name.to_string(),
                phone,
                email,
            }
        }
    }
}
