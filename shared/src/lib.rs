use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ===== TIME TYPES =====

/// Point in time as milliseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn millis(self) -> i64 {
        self.0
    }

    /// Parse an ISO-8601 timestamp. Naive timestamps are taken as UTC.
    pub fn parse_iso(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(TimeMs(parsed.timestamp_millis()));
        }
        const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
        NAIVE_FORMATS.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|naive| TimeMs(naive.and_utc().timestamp_millis()))
        })
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }

    /// Calendar date (UTC) this instant falls on.
    pub fn date(self) -> NaiveDate {
        self.to_datetime()
            .map(|datetime| datetime.date_naive())
            .unwrap_or_default()
    }

    /// `YYYY-MM-DD`, the key used for calendar buckets and handle tooltips.
    pub fn date_label(self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }

    /// `HH:MM:SS`, used by the time-of-day selector.
    pub fn time_of_day_label(self) -> String {
        self.to_datetime()
            .map(|datetime| datetime.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }

    pub fn start_of_day(date: NaiveDate) -> Self {
        TimeMs(date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis())
    }

    pub fn abs_diff(self, other: TimeMs) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for TimeMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(datetime) => write!(f, "{}", datetime.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl Serialize for TimeMs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeMs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TimeMs::parse_iso(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 timestamp '{text}'")))
    }
}

// ===== REVISION TYPES =====

/// One saved version of an article.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionEntry {
    pub revid: u64,
    pub timestamp: TimeMs,
}

impl RevisionEntry {
    pub fn new(revid: u64, timestamp: TimeMs) -> Self {
        Self { revid, timestamp }
    }
}

/// Backend article identifier. The history endpoint sends it either as a
/// string or as a bare number; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ArticleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Identifier the backend sends either as a string or as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ArticleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawId::deserialize(deserializer).map(|raw| ArticleId(raw.into()))
    }
}

fn deserialize_opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}

// ===== API PAYLOADS =====

/// Every backend payload may carry an `error` field, even with HTTP 200.
pub trait BackendPayload {
    fn backend_error(&self) -> Option<&str>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ClustersResponse {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    /// Opaque backend id (a content hash). Summaries are requested by the
    /// cluster's position in the list, not by this id.
    #[serde(default, deserialize_with = "deserialize_opaque_id")]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub wikipedia_articles: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ArticleHistoryResponse {
    #[serde(default)]
    pub article_id: Option<ArticleId>,
    #[serde(default)]
    pub history: Vec<RevisionEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct VisualizationResponse {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub metadata: Option<VisualizationMetadata>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VisualizationMetadata {
    #[serde(default)]
    pub generation_time: Option<f64>,
    #[serde(default)]
    pub source: Option<VisualizationSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationSource {
    Cache,
    Generated,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ClusterSummaryResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl BackendPayload for ClustersResponse {
    fn backend_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl BackendPayload for ArticleHistoryResponse {
    fn backend_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl BackendPayload for VisualizationResponse {
    fn backend_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl BackendPayload for ClusterSummaryResponse {
    fn backend_error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

// ===== CONFIG TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSection,
    pub range_selector: RangeSelectorSection,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ClientConfig>(text).map(ClientConfig::normalized)
    }

    /// Clamp values that would break the selector to their minimums.
    pub fn normalized(mut self) -> Self {
        let selector = &mut self.range_selector;
        selector.initial_window = selector.initial_window.max(1);
        selector.transition_steps = selector.transition_steps.max(1);
        selector.transition_frame_ms = selector.transition_frame_ms.max(1);
        self.api.base_url = self.api.base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ApiSection {
    /// Empty means same origin.
    pub base_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RangeSelectorSection {
    pub debounce_ms: u32,
    /// How many of the most recent revisions the default range covers.
    pub initial_window: usize,
    pub transition_steps: u32,
    pub transition_frame_ms: u32,
}

impl Default for RangeSelectorSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            initial_window: 10,
            transition_steps: 10,
            transition_frame_ms: 16,
        }
    }
}
