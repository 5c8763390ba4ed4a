//! Freeze timestamps
//!
//! Freeze times are stored as strings like `20160704T162800000000+0200`
//! (date, `T`, time with microseconds, UTC offset). Generated timestamps
//! are always in UTC, but beads frozen elsewhere may carry any offset, so
//! freeze times are ordered by the instant they denote.
//!
//! Older beads use the legacy spelling `20150901_151015_1` (date, time,
//! microseconds), read as UTC.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// strftime/strptime pattern of freeze times
pub const FORMAT: &str = "%Y%m%dT%H%M%S%6f%z";

/// Ordering key of phantom beads: earlier than any real freeze time
pub const EPOCH_STR: &str = "19700101T000000000000+0000";

/// A freeze timestamp
///
/// Equality is textual. Ordering follows the denoted instant, with the text
/// breaking ties; strings that are no timestamp sort before all that are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreezeTime(String);

impl FreezeTime {
    pub fn new(value: impl Into<String>) -> Self {
        FreezeTime(value.into())
    }

    pub fn now() -> Self {
        FreezeTime(timestamp())
    }

    pub fn epoch() -> Self {
        FreezeTime(EPOCH_STR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed instant, if the string is a well-formed timestamp
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        parse(&self.0)
    }

    fn sort_key(&self) -> (Option<DateTime<Utc>>, &str) {
        (parse(&self.0).map(|t| t.with_timezone(&Utc)), &self.0)
    }
}

impl Ord for FreezeTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for FreezeTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FreezeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FreezeTime {
    fn from(value: &str) -> Self {
        FreezeTime::new(value)
    }
}

impl From<String> for FreezeTime {
    fn from(value: String) -> Self {
        FreezeTime(value)
    }
}

/// Current time as a freeze timestamp string
pub fn timestamp() -> String {
    Utc::now().format(FORMAT).to_string()
}

fn legacy_format() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{8}_\d{6})_(\d{1,6})$").expect("valid legacy timestamp regex")
    })
}

/// Parse a freeze time in the current or the legacy spelling
pub fn parse(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_str(value, FORMAT) {
        return Some(t);
    }
    let captures = legacy_format().captures(value)?;
    let micros: u32 = captures[2].parse().ok()?;
    let naive = NaiveDateTime::parse_from_str(&captures[1], "%Y%m%d_%H%M%S")
        .ok()?
        .with_nanosecond(micros * 1000)?;
    Some(FixedOffset::east_opt(0)?.from_utc_datetime(&naive))
}
