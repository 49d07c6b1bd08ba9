//! Progress aggregation.
//!
//! Every function here is pure: it takes already-loaded records and returns
//! a freshly computed structure. Empty input always yields zeroed output.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::period::Period;
use crate::progress::{Difficulty, ProgressStatus};
use crate::streak::{compute_streak, StreakState};
use crate::types::Timestamp;

/// Read access to the fields of a progress record that aggregation needs.
pub trait ProgressFacts {
    fn item_id(&self) -> &str;
    fn phase_id(&self) -> &str;
    fn section_id(&self) -> &str;
    fn status(&self) -> ProgressStatus;
    fn difficulty(&self) -> Difficulty;
    fn rating(&self) -> Option<i16>;
    fn time_spent(&self) -> i64;
    fn attempts(&self) -> i64;
    fn completed_at(&self) -> Option<Timestamp>;
    fn updated_at(&self) -> Timestamp;
}

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_items: u64,
    pub completed_items: u64,
    pub in_progress_items: u64,
    pub not_started_items: u64,
    pub total_time_spent: i64,
    pub average_rating: f64,
    pub completion_percentage: u32,
}

/// Overview totals with the user's completion streak alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    #[serde(flatten)]
    pub overview: OverviewStats,
    pub streak: StreakState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    #[serde(flatten)]
    pub overview: OverviewStats,
    pub difficulty_counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBreakdown {
    pub section_id: String,
    pub total_items: u64,
    pub completed_items: u64,
    pub in_progress_items: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStats {
    pub phase_id: String,
    pub total_items: u64,
    pub completed_items: u64,
    pub in_progress_items: u64,
    pub total_time_spent: i64,
    pub average_rating: f64,
    pub proficiency: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyCount {
    pub difficulty: Difficulty,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDifficulty {
    pub phase_id: String,
    pub difficulties: Vec<DifficultyCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAnalytics {
    pub skills: Vec<SkillStats>,
    pub difficulty_analysis: Vec<PhaseDifficulty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivity {
    pub month: String,
    pub items_completed: u64,
    pub time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCompletions {
    pub date: NaiveDate,
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub cumulative: u64,
    pub daily: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrends {
    pub completion_trends: Vec<DailyCompletions>,
    pub progress_accumulation: Vec<CumulativePoint>,
}

// ---------------------------------------------------------------------------
// Computations
// ---------------------------------------------------------------------------

/// `round(100 * completed / total)`, zero when there is nothing to complete.
pub fn completion_percentage(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

fn average_rating<'a, P, I>(records: I) -> f64
where
    P: ProgressFacts + 'a,
    I: IntoIterator<Item = &'a P>,
{
    let (sum, count) = records
        .into_iter()
        .filter_map(|r| r.rating())
        .fold((0i64, 0u64), |(s, c), r| (s + i64::from(r), c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

pub fn overview<P: ProgressFacts>(records: &[P]) -> OverviewStats {
    overview_of(records.iter())
}

pub fn overview_with_streak<P: ProgressFacts>(records: &[P], today: NaiveDate) -> ProgressOverview {
    ProgressOverview {
        overview: overview(records),
        streak: streak(records, today),
    }
}

fn overview_of<'a, P, I>(records: I) -> OverviewStats
where
    P: ProgressFacts + 'a,
    I: Iterator<Item = &'a P> + Clone,
{
    let mut stats = OverviewStats::default();
    for r in records.clone() {
        stats.total_items += 1;
        match r.status() {
            ProgressStatus::Completed => stats.completed_items += 1,
            ProgressStatus::InProgress => stats.in_progress_items += 1,
            ProgressStatus::NotStarted => {}
        }
        stats.total_time_spent += r.time_spent();
    }
    stats.not_started_items = stats.total_items - stats.completed_items - stats.in_progress_items;
    stats.average_rating = average_rating(records);
    stats.completion_percentage = completion_percentage(stats.completed_items, stats.total_items);
    stats
}

/// Overview plus difficulty distribution, restricted to records updated
/// inside `period`.
pub fn progress_stats<P: ProgressFacts>(
    records: &[P],
    period: Period,
    now: Timestamp,
) -> ProgressStats {
    let in_period = records
        .iter()
        .filter(|r| period.contains(r.updated_at(), now));

    let mut difficulty_counts = BTreeMap::new();
    for r in in_period.clone() {
        *difficulty_counts
            .entry(r.difficulty().as_str().to_string())
            .or_insert(0) += 1;
    }

    ProgressStats {
        overview: overview_of(in_period),
        difficulty_counts,
    }
}

/// Per-section counts for one phase, ordered by section id.
pub fn phase_breakdown<P: ProgressFacts>(records: &[P], phase_id: &str) -> Vec<SectionBreakdown> {
    let mut sections: BTreeMap<&str, SectionBreakdown> = BTreeMap::new();
    for r in records.iter().filter(|r| r.phase_id() == phase_id) {
        let entry = sections
            .entry(r.section_id())
            .or_insert_with(|| SectionBreakdown {
                section_id: r.section_id().to_string(),
                total_items: 0,
                completed_items: 0,
                in_progress_items: 0,
            });
        entry.total_items += 1;
        match r.status() {
            ProgressStatus::Completed => entry.completed_items += 1,
            ProgressStatus::InProgress => entry.in_progress_items += 1,
            ProgressStatus::NotStarted => {}
        }
    }
    sections.into_values().collect()
}

/// Phase-level skill stats, most completed first, plus the difficulty
/// distribution of each phase.
pub fn skill_analytics<P: ProgressFacts>(
    records: &[P],
    period: Period,
    now: Timestamp,
) -> SkillAnalytics {
    let mut by_phase: BTreeMap<&str, Vec<&P>> = BTreeMap::new();
    for r in records.iter().filter(|r| period.contains(r.updated_at(), now)) {
        by_phase.entry(r.phase_id()).or_default().push(r);
    }

    let mut skills: Vec<SkillStats> = by_phase
        .iter()
        .map(|(phase_id, rows)| {
            let overview = overview_of(rows.iter().copied());
            SkillStats {
                phase_id: phase_id.to_string(),
                total_items: overview.total_items,
                completed_items: overview.completed_items,
                in_progress_items: overview.in_progress_items,
                total_time_spent: overview.total_time_spent,
                average_rating: overview.average_rating,
                proficiency: overview.completion_percentage,
            }
        })
        .collect();
    skills.sort_by(|a, b| b.completed_items.cmp(&a.completed_items));

    let difficulty_analysis = by_phase
        .iter()
        .map(|(phase_id, rows)| {
            let mut counts: BTreeMap<&str, (Difficulty, u64)> = BTreeMap::new();
            for r in rows {
                let d = r.difficulty();
                counts.entry(d.as_str()).or_insert((d, 0)).1 += 1;
            }
            PhaseDifficulty {
                phase_id: phase_id.to_string(),
                difficulties: counts
                    .into_values()
                    .map(|(difficulty, count)| DifficultyCount { difficulty, count })
                    .collect(),
            }
        })
        .collect();

    SkillAnalytics {
        skills,
        difficulty_analysis,
    }
}

/// Completions and time grouped by the month of `updated_at`, oldest first.
pub fn monthly_activity<P: ProgressFacts>(records: &[P]) -> Vec<MonthlyActivity> {
    let mut months: BTreeMap<String, (u64, i64)> = BTreeMap::new();
    for r in records {
        let entry = months
            .entry(r.updated_at().format("%Y-%m").to_string())
            .or_default();
        if r.status() == ProgressStatus::Completed {
            entry.0 += 1;
        }
        entry.1 += r.time_spent();
    }
    months
        .into_iter()
        .map(|(month, (items_completed, time_spent))| MonthlyActivity {
            month,
            items_completed,
            time_spent,
        })
        .collect()
}

/// Daily completions over the last `days` days and their running total.
///
/// The accumulation counts any record with a completion date in the
/// window, including ones since reopened, so it reflects work done rather
/// than current state.
pub fn progress_trends<P: ProgressFacts>(records: &[P], days: i64, now: Timestamp) -> ProgressTrends {
    let start = now - Duration::days(days.max(0));

    let mut completed: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut any: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for r in records {
        let Some(at) = r.completed_at() else { continue };
        if at < start {
            continue;
        }
        *any.entry(at.date_naive()).or_default() += 1;
        if r.status() == ProgressStatus::Completed {
            *completed.entry(at.date_naive()).or_default() += 1;
        }
    }

    let mut cumulative = 0;
    let progress_accumulation = any
        .into_iter()
        .map(|(date, daily)| {
            cumulative += daily;
            CumulativePoint {
                date,
                cumulative,
                daily,
            }
        })
        .collect();

    ProgressTrends {
        completion_trends: completed
            .into_iter()
            .map(|(date, completed)| DailyCompletions { date, completed })
            .collect(),
        progress_accumulation,
    }
}

/// Streak over the completion dates of currently completed records.
pub fn streak<P: ProgressFacts>(records: &[P], today: NaiveDate) -> StreakState {
    let dates: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| r.status() == ProgressStatus::Completed)
        .filter_map(|r| r.completed_at())
        .map(|at| at.date_naive())
        .collect();
    compute_streak(&dates, today)
}

/// Number of distinct phases the user has any record in.
pub fn phases_touched<P: ProgressFacts>(records: &[P]) -> usize {
    records
        .iter()
        .map(|r| r.phase_id())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[derive(Debug, Clone)]
    struct Fact {
        pub item: &'static str,
        pub phase: &'static str,
        pub section: &'static str,
        pub status: ProgressStatus,
        pub difficulty: Difficulty,
        pub rating: Option<i16>,
        pub time_spent: i64,
        pub completed_at: Option<Timestamp>,
        pub updated_at: Timestamp,
    }

    impl Fact {
        pub fn new(item: &'static str, status: ProgressStatus, at: Timestamp) -> Self {
            Self {
                item,
                phase: "phase1",
                section: "month1",
                status,
                difficulty: Difficulty::Medium,
                rating: None,
                time_spent: 0,
                completed_at: (status == ProgressStatus::Completed).then_some(at),
                updated_at: at,
            }
        }
    }

    impl ProgressFacts for Fact {
        fn item_id(&self) -> &str {
            self.item
        }
        fn phase_id(&self) -> &str {
            self.phase
        }
        fn section_id(&self) -> &str {
            self.section
        }
        fn status(&self) -> ProgressStatus {
            self.status
        }
        fn difficulty(&self) -> Difficulty {
            self.difficulty
        }
        fn rating(&self) -> Option<i16> {
            self.rating
        }
        fn time_spent(&self) -> i64 {
            self.time_spent
        }
        fn attempts(&self) -> i64 {
            1
        }
        fn completed_at(&self) -> Option<Timestamp> {
            self.completed_at
        }
        fn updated_at(&self) -> Timestamp {
            self.updated_at
        }
    }

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn completion_percentage_bounds() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(5, 5), 100);
    }

    #[test]
    fn empty_overview_is_zeroed() {
        let stats = overview::<Fact>(&[]);
        assert_eq!(stats, OverviewStats::default());
    }

    #[test]
    fn overview_counts_and_averages() {
        let mut a = Fact::new("a", ProgressStatus::Completed, at(1));
        a.rating = Some(4);
        a.time_spent = 30;
        let mut b = Fact::new("b", ProgressStatus::InProgress, at(2));
        b.rating = Some(2);
        b.time_spent = 15;
        let c = Fact::new("c", ProgressStatus::NotStarted, at(3));

        let stats = overview(&[a, b, c]);
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.completed_items, 1);
        assert_eq!(stats.in_progress_items, 1);
        assert_eq!(stats.not_started_items, 1);
        assert_eq!(stats.total_time_spent, 45);
        assert!((stats.average_rating - 3.0).abs() < f64::EPSILON);
        assert_eq!(stats.completion_percentage, 33);
    }

    #[test]
    fn progress_stats_filters_by_period() {
        let now = at(20);
        let old = Fact::new("old", ProgressStatus::Completed, at(1));
        let mut recent = Fact::new("recent", ProgressStatus::Completed, at(19));
        recent.difficulty = Difficulty::Hard;

        let week = progress_stats(&[old.clone(), recent.clone()], Period::Week, now);
        assert_eq!(week.overview.total_items, 1);
        assert_eq!(week.difficulty_counts.get("hard"), Some(&1));
        assert_eq!(week.difficulty_counts.get("medium"), None);

        let all = progress_stats(&[old, recent], Period::All, now);
        assert_eq!(all.overview.total_items, 2);
    }

    #[test]
    fn phase_breakdown_groups_sections() {
        let mut a = Fact::new("a", ProgressStatus::Completed, at(1));
        a.section = "month2";
        let b = Fact::new("b", ProgressStatus::InProgress, at(1));
        let mut other = Fact::new("c", ProgressStatus::Completed, at(1));
        other.phase = "phase2";

        let sections = phase_breakdown(&[a, b, other], "phase1");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_id, "month1");
        assert_eq!(sections[0].in_progress_items, 1);
        assert_eq!(sections[1].section_id, "month2");
        assert_eq!(sections[1].completed_items, 1);
    }

    #[test]
    fn skills_sorted_by_completed_desc() {
        let a = Fact::new("a", ProgressStatus::InProgress, at(1));
        let mut b = Fact::new("b", ProgressStatus::Completed, at(1));
        b.phase = "phase2";
        let mut c = Fact::new("c", ProgressStatus::Completed, at(1));
        c.phase = "phase2";
        c.difficulty = Difficulty::Easy;

        let analytics = skill_analytics(&[a, b, c], Period::All, at(2));
        assert_eq!(analytics.skills[0].phase_id, "phase2");
        assert_eq!(analytics.skills[0].proficiency, 100);
        assert_eq!(analytics.skills[1].proficiency, 0);
        let phase2 = analytics
            .difficulty_analysis
            .iter()
            .find(|d| d.phase_id == "phase2")
            .unwrap();
        assert_eq!(phase2.difficulties.len(), 2);
    }

    #[test]
    fn monthly_activity_groups_by_update_month() {
        let jan = Fact::new("a", ProgressStatus::Completed, at(5));
        let mut feb = Fact::new("b", ProgressStatus::InProgress, at(5));
        feb.updated_at = Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap();
        feb.time_spent = 10;

        let months = monthly_activity(&[jan, feb]);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[0].items_completed, 1);
        assert_eq!(months[1].month, "2024-02");
        assert_eq!(months[1].time_spent, 10);
    }

    #[test]
    fn trends_accumulate_in_window() {
        let now = at(10);
        let facts = [
            Fact::new("a", ProgressStatus::Completed, at(8)),
            Fact::new("b", ProgressStatus::Completed, at(8)),
            Fact::new("c", ProgressStatus::Completed, at(9)),
            Fact::new("d", ProgressStatus::Completed, at(1)),
        ];
        let trends = progress_trends(&facts, 5, now);
        assert_eq!(trends.completion_trends.len(), 2);
        assert_eq!(trends.completion_trends[0].completed, 2);
        let last = trends.progress_accumulation.last().unwrap();
        assert_eq!(last.cumulative, 3);
        assert_eq!(last.daily, 1);
    }

    #[test]
    fn overview_carries_streak() {
        let facts = [
            Fact::new("a", ProgressStatus::Completed, at(1)),
            Fact::new("b", ProgressStatus::Completed, at(2)),
            Fact::new("c", ProgressStatus::InProgress, at(2)),
        ];
        let combined = overview_with_streak(&facts, at(2).date_naive());
        assert_eq!(combined.overview, overview(&facts));
        assert_eq!(combined.streak.current_streak, 2);
        assert_eq!(combined.streak.longest_streak, 2);

        let json = serde_json::to_value(&combined).unwrap();
        assert_eq!(json["completedItems"], 2);
        assert_eq!(json["streak"]["currentStreak"], 2);
    }

    #[test]
    fn streak_ignores_reopened_items() {
        let mut reopened = Fact::new("a", ProgressStatus::InProgress, at(3));
        reopened.completed_at = Some(at(3));
        let facts = [
            Fact::new("b", ProgressStatus::Completed, at(1)),
            Fact::new("c", ProgressStatus::Completed, at(2)),
            reopened,
        ];
        let state = streak(&facts, at(3).date_naive());
        assert_eq!(state.current_streak, 0);
        assert_eq!(state.longest_streak, 2);
    }

    #[test]
    fn phases_touched_counts_distinct() {
        let a = Fact::new("a", ProgressStatus::Completed, at(1));
        let b = Fact::new("b", ProgressStatus::Completed, at(1));
        let mut c = Fact::new("c", ProgressStatus::Completed, at(1));
        c.phase = "phase3";
        assert_eq!(phases_touched(&[a, b, c]), 2);
    }
}
