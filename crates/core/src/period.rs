//! Reporting windows for analytics queries.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A named time window, always recomputed relative to "now" at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    All,
    Today,
    Week,
    Month,
    Year,
}

impl Period {
    /// Lenient parse used for query strings: anything unrecognised means `All`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("today") => Self::Today,
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            Some("year") => Self::Year,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Inclusive lower bound of the window, `None` for `All`.
    ///
    /// `Week` is a rolling seven days; the others snap to calendar
    /// boundaries in UTC.
    pub fn start(&self, now: Timestamp) -> Option<Timestamp> {
        let today = now.date_naive();
        match self {
            Self::All => None,
            Self::Today => Some(midnight(today)),
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => today.with_day(1).map(midnight),
            Self::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).map(midnight),
        }
    }

    pub fn contains(&self, ts: Timestamp, now: Timestamp) -> bool {
        self.start(now).map_or(true, |start| ts >= start)
    }
}

fn midnight(date: NaiveDate) -> Timestamp {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}
