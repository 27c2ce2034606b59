//! # Search & Filter Layer
//!
//! Pure filtering used by the tire, customer and history search pages.
//!
//! ## Filter Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Tire Search Pipeline                              │
//! │                                                                         │
//! │  Rows from depo-db (TireDetail, already joined)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TireQuery::matches   ← status (default: Depoda), name, plate, phone,  │
//! │       │                 size, brand, condition, serial, entry window   │
//! │       ▼                                                                 │
//! │  sort by entry date, newest first                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  latest_per_customer  ← one row per customer                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Turkish Normalization
//! Names are compared after folding Turkish letters to their ASCII base and
//! lower-casing, so "şeyma", "SEYMA" and "Şeyma Öz" all find each other.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{
    CustomerSummary, HistoryEntry, RackGroup, RackOverview, TireDetail, TireStatus,
    TreadCondition,
};
use crate::validation::{validate_search_query, ValidationResult};

// =============================================================================
// Text Normalization
// =============================================================================

/// Folds Turkish letters to ASCII and lower-cases everything else.
///
/// ## Mapping
/// `İ I ı → i`, `Ş ş → s`, `Ğ ğ → g`, `Ü ü → u`, `Ö ö → o`, `Ç ç → c`.
/// The combining dot left behind by some decompositions of `İ` is dropped.
///
/// ## Example
/// ```rust
/// use depo_core::search::normalize_search_text;
///
/// assert_eq!(normalize_search_text("Şeyma Öz"), "seyma oz");
/// assert_eq!(normalize_search_text("IŞIK"), "isik");
/// ```
pub fn normalize_search_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'İ' | 'I' | 'ı' => out.push('i'),
            'Ş' | 'ş' => out.push('s'),
            'Ğ' | 'ğ' => out.push('g'),
            'Ü' | 'ü' => out.push('u'),
            'Ö' | 'ö' => out.push('o'),
            'Ç' | 'ç' => out.push('c'),
            '\u{0307}' => {}
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

/// Substring match after Turkish normalization of both sides.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    normalize_search_text(haystack).contains(&normalize_search_text(needle))
}

/// Case-insensitive substring match (plates, phones, sizes).
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Treats blank filter strings as absent.
fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn validate_text_filters(filters: &[(&str, &Option<String>)]) -> ValidationResult<()> {
    for (field, value) in filters {
        if let Some(value) = value {
            validate_search_query(field, value)?;
        }
    }
    Ok(())
}

// =============================================================================
// Search Context
// =============================================================================

/// Which clock turns calendar dates into instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    /// The server's time zone. The offset is looked up for each date, so a
    /// window across a DST change uses the offset in force on that day.
    System,
    /// A configured offset applied to every date.
    Fixed(FixedOffset),
}

/// Request-scoped settings for a search.
///
/// Carries the server-local zone used to turn calendar dates into day
/// spans. Created per request and passed in explicitly.
///
/// ```text
/// date ──► local midnight ──► zone offset on that date ──► UTC instant
///
/// day_start(d) .. day_end(d) = day_start(d) .. day_start(d + 1)
///                              (23 or 25 hours on DST change days)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchContext {
    pub zone: LocalZone,
}

impl SearchContext {
    /// Context following the server's time zone.
    pub fn local() -> Self {
        SearchContext {
            zone: LocalZone::System,
        }
    }

    /// Context with an explicit offset (configuration override, tests).
    pub fn with_offset(offset: FixedOffset) -> Self {
        SearchContext {
            zone: LocalZone::Fixed(offset),
        }
    }

    /// UTC offset in force at the start of `date`.
    pub fn offset_on(&self, date: NaiveDate) -> FixedOffset {
        match self.zone {
            LocalZone::Fixed(offset) => offset,
            LocalZone::System => {
                let start = self.day_start(date).naive_utc();
                Local.offset_from_utc_datetime(&start).fix()
            }
        }
    }

    /// First instant of `date` in this context's local time.
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        match self.zone {
            LocalZone::Fixed(offset) => local_midnight(&offset, date),
            LocalZone::System => local_midnight(&Local, date),
        }
    }

    /// First instant after `date` ends in this context's local time.
    pub fn day_end(&self, date: NaiveDate) -> DateTime<Utc> {
        match date.succ_opt() {
            Some(next) => self.day_start(next),
            None => self.day_start(date) + Duration::days(1),
        }
    }
}

/// Earliest instant of `date` in `tz`. When midnight falls in a DST gap the
/// day starts at the first valid local time after it.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..=2)
        .map(|h| midnight + Duration::hours(h))
        .find_map(|at| tz.from_local_datetime(&at).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

impl Default for SearchContext {
    fn default() -> Self {
        SearchContext::local()
    }
}

// =============================================================================
// Date Window
// =============================================================================

/// Inclusive calendar-date window.
///
/// `from` starts at the beginning of its day and `to` runs to the end of its
/// day, so `from == to` matches exactly one local day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    /// Window covering a single day.
    pub fn day(date: NaiveDate) -> Self {
        DateWindow {
            from: Some(date),
            to: Some(date),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Returns true when `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>, ctx: &SearchContext) -> bool {
        if let Some(from) = self.from {
            if at < ctx.day_start(from) {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at >= ctx.day_end(to) {
                return false;
            }
        }
        true
    }
}

/// Parses an optional `YYYY-MM-DD` form value. Blank means "no bound".
pub fn parse_date_param(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, CoreError> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    // Accept full timestamps too; only the date part matters.
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| {
            crate::error::ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

// =============================================================================
// Status Filter
// =============================================================================

/// Status selection on the tire search page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    /// "Tümü": every status.
    All,
    Only(TireStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: TireStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }

    /// Label to echo back into the search form.
    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "Tümü",
            StatusFilter::Only(status) => status.label(),
        }
    }
}

impl Default for StatusFilter {
    /// Only tires still in the depot.
    fn default() -> Self {
        StatusFilter::Only(TireStatus::InDepot)
    }
}

impl FromStr for StatusFilter {
    type Err = CoreError;

    /// Blank input selects the default; "Tümü"/"tumu"/"all" select every
    /// status; anything else must name a [`TireStatus`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(StatusFilter::default());
        }
        match normalize_search_text(trimmed).as_str() {
            "tumu" | "all" => Ok(StatusFilter::All),
            _ => trimmed.parse::<TireStatus>().map(StatusFilter::Only),
        }
    }
}

// =============================================================================
// Tire Query
// =============================================================================

/// Filters for the tire search page. Blank strings are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TireQuery {
    pub customer_name: Option<String>,
    pub plate: Option<String>,
    pub phone: Option<String>,
    pub size: Option<String>,
    /// Exact brand name.
    pub brand: Option<String>,
    pub condition: Option<TreadCondition>,
    pub serial_no: Option<i64>,
    pub status: StatusFilter,
    pub entry: DateWindow,
}

impl TireQuery {
    /// Rejects over-long text filters before any rows are loaded.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_text_filters(&[
            ("customer_name", &self.customer_name),
            ("plate", &self.plate),
            ("phone", &self.phone),
            ("size", &self.size),
            ("brand", &self.brand),
        ])
    }

    /// Returns true when `row` passes every active filter.
    pub fn matches(&self, row: &TireDetail, ctx: &SearchContext) -> bool {
        let tire = &row.tire;

        if !self.status.matches(tire.status) {
            return false;
        }
        if let Some(name) = active(&self.customer_name) {
            if !contains_normalized(&row.customer_name, name) {
                return false;
            }
        }
        if let Some(plate) = active(&self.plate) {
            if !contains_ignore_case(&row.customer_plate, plate) {
                return false;
            }
        }
        if let Some(phone) = active(&self.phone) {
            if !contains_ignore_case(&row.customer_phone, phone) {
                return false;
            }
        }
        if let Some(size) = active(&self.size) {
            let slot_hit = tire
                .slots
                .iter()
                .filter_map(|s| s.size.as_deref())
                .any(|s| contains_ignore_case(s, size));
            if !contains_ignore_case(&tire.size, size) && !slot_hit {
                return false;
            }
        }
        if let Some(brand) = active(&self.brand) {
            if row.brand_name != brand {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if tire.condition != condition {
                return false;
            }
        }
        if let Some(serial_no) = self.serial_no {
            if tire.serial_no != serial_no {
                return false;
            }
        }
        self.entry.contains(tire.entry_at, ctx)
    }

    /// Filters, orders newest first and collapses to one row per customer.
    pub fn apply(&self, rows: Vec<TireDetail>, ctx: &SearchContext) -> Vec<TireDetail> {
        let mut hits: Vec<TireDetail> = rows
            .into_iter()
            .filter(|row| self.matches(row, ctx))
            .collect();
        hits.sort_by(|a, b| {
            b.tire
                .entry_at
                .cmp(&a.tire.entry_at)
                .then(b.tire.serial_no.cmp(&a.tire.serial_no))
        });
        latest_per_customer(hits)
    }
}

/// Keeps only the most recently entered tire of each customer.
///
/// A replaced set and its successor share a customer; showing both would
/// list a tire that is no longer in the rack. Input order is preserved for
/// the rows that survive.
pub fn latest_per_customer(rows: Vec<TireDetail>) -> Vec<TireDetail> {
    let mut newest: BTreeMap<i64, (chrono::DateTime<Utc>, i64)> = BTreeMap::new();
    for row in &rows {
        let key = (row.tire.entry_at, row.tire.serial_no);
        newest
            .entry(row.tire.customer_id)
            .and_modify(|best| {
                if key > *best {
                    *best = key;
                }
            })
            .or_insert(key);
    }

    let mut emitted = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = (row.tire.entry_at, row.tire.serial_no);
            newest.get(&row.tire.customer_id) == Some(&key)
                && emitted.insert(row.tire.customer_id)
        })
        .collect()
}

// =============================================================================
// Customer Query
// =============================================================================

/// Filters for the customers page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerQuery {
    pub name: Option<String>,
    pub plate: Option<String>,
    pub phone: Option<String>,
}

impl CustomerQuery {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_text_filters(&[
            ("name", &self.name),
            ("plate", &self.plate),
            ("phone", &self.phone),
        ])
    }

    pub fn matches(&self, row: &CustomerSummary) -> bool {
        let c = &row.customer;
        active(&self.name).map_or(true, |n| contains_normalized(&c.name, n))
            && active(&self.plate).map_or(true, |p| contains_ignore_case(&c.plate, p))
            && active(&self.phone).map_or(true, |p| contains_ignore_case(&c.phone, p))
    }

    /// Filters and orders by normalized name.
    pub fn apply(&self, rows: Vec<CustomerSummary>) -> Vec<CustomerSummary> {
        let mut hits: Vec<CustomerSummary> =
            rows.into_iter().filter(|r| self.matches(r)).collect();
        hits.sort_by_cached_key(|r| normalize_search_text(&r.customer.name));
        hits
    }
}

// =============================================================================
// History Query
// =============================================================================

/// Filters for the history page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub customer_name: Option<String>,
    pub plate: Option<String>,
    pub phone: Option<String>,
    /// Matches either the old or the new serial number.
    pub serial_no: Option<i64>,
    pub occurred: DateWindow,
    pub skip: usize,
    pub limit: usize,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        HistoryQuery {
            customer_name: None,
            plate: None,
            phone: None,
            serial_no: None,
            occurred: DateWindow::default(),
            skip: 0,
            limit: 100,
        }
    }
}

impl HistoryQuery {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_text_filters(&[
            ("customer_name", &self.customer_name),
            ("plate", &self.plate),
            ("phone", &self.phone),
        ])
    }

    pub fn matches(&self, entry: &HistoryEntry, ctx: &SearchContext) -> bool {
        let r = &entry.record;
        if let Some(name) = active(&self.customer_name) {
            if !contains_normalized(&r.customer_name, name) {
                return false;
            }
        }
        if let Some(plate) = active(&self.plate) {
            if !contains_ignore_case(&r.plate, plate) {
                return false;
            }
        }
        if let Some(phone) = active(&self.phone) {
            if !contains_ignore_case(&r.phone, phone) {
                return false;
            }
        }
        if let Some(serial_no) = self.serial_no {
            if r.old_serial_no() != serial_no && r.new_serial_no() != Some(serial_no) {
                return false;
            }
        }
        self.occurred.contains(r.occurred_at, ctx)
    }

    /// Filters, orders newest first, then pages with `skip`/`limit`.
    pub fn apply(&self, entries: Vec<HistoryEntry>, ctx: &SearchContext) -> Vec<HistoryEntry> {
        let mut hits: Vec<HistoryEntry> = entries
            .into_iter()
            .filter(|e| self.matches(e, ctx))
            .collect();
        hits.sort_by(|a, b| {
            b.record
                .occurred_at
                .cmp(&a.record.occurred_at)
                .then(b.id.cmp(&a.id))
        });
        hits.into_iter().skip(self.skip).take(self.limit).collect()
    }
}

// =============================================================================
// Rack Grouping
// =============================================================================

/// Group key of a rack code: its leading ASCII letters ("A-3" → "A").
///
/// Codes without a letter prefix group under their first character; an empty
/// code groups under "OTHER".
pub fn rack_prefix(code: &str) -> String {
    let letters: String = code.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if !letters.is_empty() {
        return letters;
    }
    code.chars()
        .next()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "OTHER".to_string())
}

/// Numeric sort key of a rack code: its first run of digits, or 0.
pub fn rack_number(code: &str) -> u64 {
    code.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// Groups racks by prefix (groups sorted by prefix, racks by number).
pub fn group_racks(racks: Vec<RackOverview>) -> Vec<RackGroup> {
    let mut groups: BTreeMap<String, Vec<RackOverview>> = BTreeMap::new();
    for rack in racks {
        groups.entry(rack_prefix(&rack.rack.code)).or_default().push(rack);
    }
    groups
        .into_iter()
        .map(|(prefix, mut racks)| {
            racks.sort_by(|a, b| {
                rack_number(&a.rack.code)
                    .cmp(&rack_number(&b.rack.code))
                    .then_with(|| a.rack.code.cmp(&b.rack.code))
            });
            RackGroup { prefix, racks }
        })
        .collect()
}

/// Display string for the customers sharing a rack.
///
/// Duplicate names are collapsed, first-seen order is kept.
pub fn customer_display<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for name in names {
        if !name.is_empty() && !distinct.contains(&name) {
            distinct.push(name);
        }
    }
    match distinct.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, rest @ ..] => format!("{} (+{})", first, rest.len()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
