use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Unix milliseconds. Every instant in the crate uses this type.
pub type Ms = i64;

pub const HOUR_MS: Ms = 3_600_000;
pub const DAY_MS: Ms = 24 * HOUR_MS;

/// Fixed slot length.
pub const SLOT_DURATION_MS: Ms = HOUR_MS;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        Self { start, end }
    }

    /// The one-hour span a slot starting at `start` occupies. Saturates at
    /// `Ms::MAX`; callers taking input use `slot_start` first.
    pub fn slot_at(start: Ms) -> Self {
        Self::new(start, start.saturating_add(SLOT_DURATION_MS))
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

/// A sales manager: the resource whose slots are counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesManager {
    pub id: i64,
    pub name: String,
    pub languages: BTreeSet<String>,
    pub products: BTreeSet<String>,
    pub customer_ratings: BTreeSet<String>,
}

impl SalesManager {
    pub fn new<L, P, R>(id: i64, name: impl Into<String>, languages: L, products: P, customer_ratings: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            languages: languages.into_iter().map(Into::into).collect(),
            products: products.into_iter().map(Into::into).collect(),
            customer_ratings: customer_ratings.into_iter().map(Into::into).collect(),
        }
    }
}

/// One bookable hour on a manager's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: i64,
    pub sales_manager_id: i64,
    pub span: Span,
    pub booked: bool,
}

impl Slot {
    /// Slots are always entered as one hour long; `end` is derived from `start`.
    pub fn new(id: i64, sales_manager_id: i64, start: Ms, booked: bool) -> Self {
        Self {
            id,
            sales_manager_id,
            span: Span::slot_at(start),
            booked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub date: NaiveDate,
    pub products: Vec<String>,
    pub language: String,
    pub rating: String,
}

impl AvailabilityRequest {
    /// Build a request from a `YYYY-MM-DD` day string.
    pub fn new(
        date: &str,
        products: Vec<String>,
        language: impl Into<String>,
        rating: impl Into<String>,
    ) -> Result<Self, RequestError> {
        Ok(Self {
            date: parse_day(date)?,
            products,
            language: language.into(),
            rating: rating.into(),
        })
    }

    pub fn day(&self) -> Span {
        day_bounds(self.date)
    }
}

/// One row of the availability answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub start_date: String,
    pub available_count: u32,
}

impl AvailabilityEntry {
    pub fn new(start: Ms, available_count: u32) -> Self {
        Self {
            start_date: format_instant(start),
            available_count,
        }
    }
}

/// Which implementation answers an availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Fetch candidates and slots, then reconcile in process.
    #[default]
    InMemory,
    /// One set-based query executed by the store.
    Store,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::InMemory => "memory",
            Strategy::Store => "store",
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "runtime" | "in_memory" => Ok(Strategy::InMemory),
            "store" | "db" | "sql" => Ok(Strategy::Store),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Time helpers ────────────────────────────────────────────────

/// `2024-05-03T10:30:00.000Z`. The store formats instants the same way.
pub fn format_instant(ms: Ms) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

/// Accepts RFC 3339 (`2024-05-03T10:30:00Z`, with or without fraction/offset).
pub fn parse_instant(s: &str) -> Result<Ms, RequestError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| RequestError::BadInstant(format!("{s}: {e}")))
}

/// A slot start whose whole hour is a representable UTC instant.
pub fn slot_start(ms: Ms) -> Result<Ms, RequestError> {
    let end = ms
        .checked_add(SLOT_DURATION_MS)
        .ok_or_else(|| RequestError::BadInstant(format!("{ms}: slot end out of range")))?;
    if DateTime::<Utc>::from_timestamp_millis(ms).is_none() || DateTime::<Utc>::from_timestamp_millis(end).is_none() {
        return Err(RequestError::BadInstant(format!("{ms}: outside the supported date range")));
    }
    Ok(ms)
}

pub fn parse_day(s: &str) -> Result<NaiveDate, RequestError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| RequestError::BadDate(format!("{s}: {e}")))
}

/// UTC day window `[00:00, next 00:00)`.
pub fn day_bounds(date: NaiveDate) -> Span {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    Span::new(start, start + DAY_MS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    BadDate(String),
    BadInstant(String),
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::BadDate(s) => write!(f, "invalid date (expected YYYY-MM-DD): {s}"),
            RequestError::BadInstant(s) => write!(f, "invalid timestamp: {s}"),
        }
    }
}

impl std::error::Error for RequestError {}

// ── Rendering ───────────────────────────────────────────────────

/// Render a set the way Postgres prints a text array: `{a,b}`.
pub fn render_set(values: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = values.iter().map(String::as_str).collect();
    format!("{{{}}}", joined.join(","))
}
