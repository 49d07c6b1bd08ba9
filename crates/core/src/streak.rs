//! Consecutive-day completion streaks.
//!
//! Streaks are computed over UTC calendar dates, never over raw timestamp
//! differences, so two completions 23 hours apart on different days still
//! count as adjacent.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Distinct UTC dates of a set of completion timestamps.
pub fn completion_dates<I>(completed_at: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = Timestamp>,
{
    completed_at.into_iter().map(|ts| ts.date_naive()).collect()
}

/// Compute current and longest streak for a set of distinct completion dates.
///
/// The current streak counts back from `today` and is zero when there is no
/// completion on `today` itself. A streak that ended yesterday therefore
/// reads as broken until the user completes something today.
pub fn compute_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakState {
    if dates.is_empty() {
        return StreakState::default();
    }

    let mut current = 0u32;
    let mut check = Some(today);
    for _ in 0..dates.len() {
        match check {
            Some(day) if dates.contains(&day) => {
                current += 1;
                check = day.checked_sub_days(Days::new(1));
            }
            _ => break,
        }
    }

    let mut longest = 0u32;
    let mut run = 1u32;
    let mut newest_first = dates.iter().rev();
    if let Some(mut prev) = newest_first.next() {
        for date in newest_first {
            if (*prev - *date).num_days() == 1 {
                run += 1;
            } else {
                longest = longest.max(run);
                run = 1;
            }
            prev = date;
        }
    }
    longest = longest.max(run);

    StreakState {
        current_streak: current,
        longest_streak: longest,
    }
}
