use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{info, warn};

const TOP_KEYWORDS: usize = 10;

const KEYWORD_KEYS: &[&str] = &["Keyword", "keyword"];
const VOLUME_KEYS: &[&str] = &["Volume", "Search volume", "Search Volume"];
const POSITION_KEYS: &[&str] = &["Position", "Pos"];
const URL_KEYS: &[&str] = &["URL", "Target", "Page"];
const METRIC_KEYS: &[&str] = &["Metric", "metric"];
const DIRECTION_KEYS: &[&str] = &["Direction", "Trend", "Value"];
const CONFIDENCE_KEYS: &[&str] = &["Confidence", "Confidence %", "Confidence score"];
const BUCKET_KEYS: &[&str] = &["Metric", "Bucket", "Range"];
const COUNT_KEYS: &[&str] = &["Count", "Value", "Keywords", "Keywords count", "Total"];

type Row = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrafficTrend {
    pub direction: Option<String>,
    pub confidence: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionDistribution {
    pub latest_counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub volume: Option<i64>,
    pub position: Option<i64>,
    pub url: Option<String>,
}

/// Keyword/traffic snapshot. Serializes as `{}` when no export was supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AhrefsOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_trend: Option<TrafficTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_distribution: Option<PositionDistribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_keywords: Option<Vec<KeywordEntry>>,
}

impl AhrefsOverview {
    pub fn is_empty(&self) -> bool {
        self.traffic_trend.is_none()
            && self.position_distribution.is_none()
            && self.top_keywords.is_none()
    }
}

pub fn build_ahrefs_overview(
    keyword_csv: Option<&[u8]>,
    performance_csv: Option<&[u8]>,
) -> AhrefsOverview {
    let keyword_csv = keyword_csv.filter(|b| !b.is_empty());
    let performance_csv = performance_csv.filter(|b| !b.is_empty());
    if keyword_csv.is_none() && performance_csv.is_none() {
        return AhrefsOverview::default();
    }

    let mut overview = AhrefsOverview {
        traffic_trend: Some(TrafficTrend::default()),
        position_distribution: Some(PositionDistribution::default()),
        top_keywords: Some(Vec::new()),
    };

    if let Some(bytes) = keyword_csv {
        let rows = read_csv_rows(bytes);
        info!("Keyword export: {} rows", rows.len());
        overview.top_keywords = Some(parse_top_keywords(&rows));
    }
    if let Some(bytes) = performance_csv {
        let rows = read_csv_rows(bytes);
        info!("Performance export: {} rows", rows.len());
        let (trend, trend_row) = parse_traffic_trend(&rows);
        overview.traffic_trend = Some(trend);
        overview.position_distribution = Some(PositionDistribution {
            latest_counts: parse_position_distribution(&rows, trend_row),
        });
    }
    overview
}

/// Route up to two exports into (keyword, performance) slots by their header row.
pub fn identify_csvs<'a>(blobs: &[&'a [u8]]) -> (Option<&'a [u8]>, Option<&'a [u8]>) {
    let mut keyword = None;
    let mut performance = None;
    for &blob in blobs {
        let header = read_header(blob);
        if header.iter().any(|h| h == "Keyword") && keyword.is_none() {
            keyword = Some(blob);
        } else if header.iter().any(|h| h == "Metric") && performance.is_none() {
            performance = Some(blob);
        }
    }
    (keyword, performance)
}

/// Decode as UTF-16 when a byte-order mark says so. Without one, UTF-16LE is
/// tried first and kept only when its header names a known column; otherwise
/// UTF-8 (BOM optional). `None` when nothing works.
pub fn decode_csv(bytes: &[u8]) -> Option<String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => std::str::from_utf8(rest).ok().map(str::to_string),
        _ => decode_utf16(bytes, u16::from_le_bytes)
            .filter(|text| has_known_header(text))
            .or_else(|| std::str::from_utf8(bytes).ok().map(str::to_string)),
    }
}

fn is_known_column(cell: &str) -> bool {
    [
        KEYWORD_KEYS,
        VOLUME_KEYS,
        POSITION_KEYS,
        URL_KEYS,
        METRIC_KEYS,
        DIRECTION_KEYS,
        CONFIDENCE_KEYS,
        BUCKET_KEYS,
        COUNT_KEYS,
    ]
    .iter()
    .any(|keys| keys.contains(&cell))
}

fn has_known_header(text: &str) -> bool {
    let Some(first) = text.lines().next() else {
        return false;
    };
    let delimiter = if first.contains('\t') { '\t' } else { ',' };
    first
        .split(delimiter)
        .any(|cell| is_known_column(cell.trim().trim_matches('"')))
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn sniff_delimiter(text: &str) -> u8 {
    match text.lines().next() {
        Some(first) if first.contains('\t') => b'\t',
        _ => b',',
    }
}

fn read_header(bytes: &[u8]) -> Vec<String> {
    let Some(text) = decode_csv(bytes) else {
        return Vec::new();
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&text))
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .next()
        .and_then(Result::ok)
        .map(|record| {
            record
                .iter()
                .map(str::trim)
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn read_csv_rows(bytes: &[u8]) -> Vec<Row> {
    let Some(text) = decode_csv(bytes) else {
        warn!("CSV export is neither UTF-16 nor UTF-8; ignoring it");
        return Vec::new();
    };
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(&text))
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) => {
            warn!("CSV header unreadable: {}", e);
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV row: {}", e);
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }
    rows
}

fn first_value(row: &Row, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        row.get(*key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Parse "1,234" / "12.7" style numbers, truncating decimals.
pub fn as_int(value: &str) -> Option<i64> {
    let cleaned = value.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

fn parse_top_keywords(rows: &[Row]) -> Vec<KeywordEntry> {
    let mut keywords: Vec<KeywordEntry> = rows
        .iter()
        .filter_map(|row| {
            let keyword = first_value(row, KEYWORD_KEYS)?;
            Some(KeywordEntry {
                keyword,
                volume: first_value(row, VOLUME_KEYS).and_then(|v| as_int(&v)),
                position: first_value(row, POSITION_KEYS).and_then(|v| as_int(&v)),
                url: first_value(row, URL_KEYS),
            })
        })
        .collect();

    if keywords.iter().any(|k| k.volume.is_some()) {
        keywords.sort_by(|a, b| b.volume.unwrap_or(0).cmp(&a.volume.unwrap_or(0)));
    }
    keywords.truncate(TOP_KEYWORDS);
    keywords
}

/// First row labelled as a trend/traffic metric, with its index.
fn parse_traffic_trend(rows: &[Row]) -> (TrafficTrend, Option<usize>) {
    for (idx, row) in rows.iter().enumerate() {
        let Some(metric) = first_value(row, METRIC_KEYS) else {
            continue;
        };
        let metric = metric.to_lowercase();
        if metric.contains("trend") || metric.contains("traffic") {
            let trend = TrafficTrend {
                direction: first_value(row, DIRECTION_KEYS),
                confidence: first_value(row, CONFIDENCE_KEYS),
            };
            return (trend, Some(idx));
        }
    }
    (TrafficTrend::default(), None)
}

fn parse_position_distribution(rows: &[Row], skip: Option<usize>) -> BTreeMap<String, i64> {
    rows.iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != skip)
        .filter_map(|(_, row)| {
            let bucket = first_value(row, BUCKET_KEYS)?;
            let count = first_value(row, COUNT_KEYS).and_then(|v| as_int(&v))?;
            Some((bucket, count))
        })
        .collect()
}
