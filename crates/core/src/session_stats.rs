//! Session aggregation: summaries, daily totals, device and time-of-day
//! distributions.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Timelike, Weekday};
use serde::Serialize;

use crate::device::DeviceType;
use crate::period::Period;
use crate::types::Timestamp;

/// Read access to the fields of a session that aggregation needs.
pub trait SessionFacts {
    fn start_time(&self) -> Timestamp;
    /// Minutes; zero while the session is still active.
    fn duration(&self) -> i64;
    fn device_type(&self) -> DeviceType;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub total_sessions: u64,
    pub total_time_spent: i64,
    pub average_session_time: f64,
    pub longest_session: i64,
    pub shortest_session: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySessions {
    pub date: NaiveDate,
    pub sessions: u64,
    pub total_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub summary: SessionSummary,
    pub daily: Vec<DailySessions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUsage {
    pub device_type: DeviceType,
    pub count: u64,
    pub total_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub activity_count: u64,
    pub total_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyUsage {
    pub hour: u32,
    pub total_time: i64,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayUsage {
    pub day: String,
    pub total_time: i64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalytics {
    pub summary: SessionSummary,
    pub daily: Vec<DailySessions>,
    pub hourly: Vec<HourlyUsage>,
    pub best_days: Vec<WeekdayUsage>,
}

fn summarize<'a, S, I>(sessions: I) -> SessionSummary
where
    S: SessionFacts + 'a,
    I: Iterator<Item = &'a S>,
{
    let mut summary = SessionSummary::default();
    let mut shortest: Option<i64> = None;
    for s in sessions {
        let d = s.duration();
        summary.total_sessions += 1;
        summary.total_time_spent += d;
        summary.longest_session = summary.longest_session.max(d);
        shortest = Some(shortest.map_or(d, |m| m.min(d)));
    }
    summary.shortest_session = shortest.unwrap_or(0);
    if summary.total_sessions > 0 {
        summary.average_session_time = summary.total_time_spent as f64 / summary.total_sessions as f64;
    }
    summary
}

fn daily<'a, S, I>(sessions: I) -> Vec<DailySessions>
where
    S: SessionFacts + 'a,
    I: Iterator<Item = &'a S>,
{
    let mut days: BTreeMap<NaiveDate, (u64, i64)> = BTreeMap::new();
    for s in sessions {
        let e = days.entry(s.start_time().date_naive()).or_default();
        e.0 += 1;
        e.1 += s.duration();
    }
    days.into_iter()
        .map(|(date, (sessions, total_time))| DailySessions {
            date,
            sessions,
            total_time,
        })
        .collect()
}

/// Summary and per-day totals for sessions started inside `period`.
pub fn session_stats<S: SessionFacts>(sessions: &[S], period: Period, now: Timestamp) -> SessionStats {
    let in_period = || {
        sessions
            .iter()
            .filter(move |s| period.contains(s.start_time(), now))
    };
    SessionStats {
        summary: summarize(in_period()),
        daily: daily(in_period()),
    }
}

/// Session counts per device type, most used first.
pub fn device_usage<S: SessionFacts>(sessions: &[S]) -> Vec<DeviceUsage> {
    let mut devices: Vec<DeviceUsage> = Vec::new();
    for s in sessions {
        match devices.iter_mut().find(|d| d.device_type == s.device_type()) {
            Some(d) => {
                d.count += 1;
                d.total_time += s.duration();
            }
            None => devices.push(DeviceUsage {
                device_type: s.device_type(),
                count: 1,
                total_time: s.duration(),
            }),
        }
    }
    devices.sort_by(|a, b| b.count.cmp(&a.count));
    devices
}

/// Per-day session counts for the last `days` days.
pub fn activity_heatmap<S: SessionFacts>(sessions: &[S], days: i64, now: Timestamp) -> Vec<HeatmapDay> {
    let start = now - Duration::days(days.max(0));
    daily(sessions.iter().filter(|s| s.start_time() >= start))
        .into_iter()
        .map(|d| HeatmapDay {
            date: d.date,
            activity_count: d.sessions,
            total_time: d.total_time,
        })
        .collect()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Summary over `period`, plus all-time daily, hourly and weekday
/// distributions. Weekdays are ordered by total time, busiest first.
pub fn time_analytics<S: SessionFacts>(sessions: &[S], period: Period, now: Timestamp) -> TimeAnalytics {
    let stats = session_stats(sessions, period, now);

    let mut hours: BTreeMap<u32, (u64, i64)> = BTreeMap::new();
    let mut weekdays: BTreeMap<u32, (Weekday, u64, i64)> = BTreeMap::new();
    for s in sessions {
        let start = s.start_time();
        let h = hours.entry(start.hour()).or_default();
        h.0 += 1;
        h.1 += s.duration();

        let wd = start.weekday();
        let w = weekdays
            .entry(wd.num_days_from_sunday())
            .or_insert((wd, 0, 0));
        w.1 += 1;
        w.2 += s.duration();
    }

    let hourly = hours
        .into_iter()
        .map(|(hour, (sessions, total_time))| HourlyUsage {
            hour,
            total_time,
            sessions,
        })
        .collect();

    let mut best_days: Vec<WeekdayUsage> = weekdays
        .into_values()
        .map(|(wd, sessions, total_time)| WeekdayUsage {
            day: weekday_name(wd).to_string(),
            total_time,
            sessions,
        })
        .collect();
    best_days.sort_by(|a, b| b.total_time.cmp(&a.total_time));

    TimeAnalytics {
        summary: stats.summary,
        daily: daily(sessions.iter()),
        hourly,
        best_days,
    }
}
