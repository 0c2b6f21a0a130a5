//! Aggregating normalized records into per-session, per-exercise
//! statistics, plus the range-filtered views the dashboard reads.

use crate::normalize::NormalizedSet;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Grouping key for per-session exercise statistics.
pub type StatKey = (NaiveDateTime, String);

/// Aggregate for one `(training_id, exercise)` group.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStat {
    /// Sum of set durations, in seconds.
    pub total_duration: i64,
    pub total_repetitions: u32,
    pub number_of_sets: usize,
    pub min_repetitions: u32,
    pub max_repetitions: u32,
}

/// Totals over an entire (filtered) record set, used for the status line
/// and the HTML report.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_sessions: usize,
    pub total_sets: usize,
    pub total_repetitions: u32,
    /// Seconds spent in logged sets.
    pub total_duration: i64,
}

/// `true` when `date` lies inside the optional inclusive range.
pub fn in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
}

/// Group records by `(training_id, exercise)` and compute the five summary
/// statistics per group.
///
/// The map is unordered; callers that need deterministic output sort the
/// keys (see [`sorted_stats`]).
pub fn aggregate_exercise_stats(records: &[NormalizedSet]) -> HashMap<StatKey, ExerciseStat> {
    let mut map: HashMap<StatKey, ExerciseStat> = HashMap::new();
    for r in records {
        let stat = map
            .entry((r.training_id, r.exercise.clone()))
            .or_insert_with(ExerciseStat::default);
        stat.total_duration += r.duration;
        stat.total_repetitions += r.count;
        stat.number_of_sets += 1;
        if stat.number_of_sets == 1 {
            stat.min_repetitions = r.count;
            stat.max_repetitions = r.count;
        } else {
            stat.min_repetitions = stat.min_repetitions.min(r.count);
            stat.max_repetitions = stat.max_repetitions.max(r.count);
        }
    }
    map
}

/// Records whose session date falls inside the optional range.
pub fn filter_records(
    records: &[NormalizedSet],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<NormalizedSet> {
    records
        .iter()
        .filter(|r| in_range(r.training_id.date(), start, end))
        .cloned()
        .collect()
}

/// Stats for sessions inside the optional range, sorted by
/// `(training_id, exercise)` so output order is stable.
pub fn sorted_stats(
    stats: &HashMap<StatKey, ExerciseStat>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<(StatKey, ExerciseStat)> {
    let mut rows: Vec<(StatKey, ExerciseStat)> = stats
        .iter()
        .filter(|((id, _), _)| in_range(id.date(), start, end))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

/// Alphabetical list of exercises present in sessions inside the range.
pub fn unique_exercises(
    stats: &HashMap<StatKey, ExerciseStat>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<String> {
    let mut set = BTreeSet::new();
    for (id, exercise) in stats.keys() {
        if in_range(id.date(), start, end) {
            set.insert(exercise.clone());
        }
    }
    set.into_iter().collect()
}

/// Earliest and latest session date in the record set, used to seed the
/// date-range pickers. `None` for an empty dataset.
pub fn session_bounds(records: &[NormalizedSet]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().map(|r| r.training_id.date());
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some((min, max))
}

/// Compute overall totals for the records inside the optional range.
pub fn compute_summary(
    records: &[NormalizedSet],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> LogSummary {
    let mut sessions = BTreeSet::new();
    let mut summary = LogSummary::default();
    for r in records {
        if in_range(r.training_id.date(), start, end) {
            sessions.insert(r.training_id);
            summary.total_sets += 1;
            summary.total_repetitions += r.count;
            summary.total_duration += r.duration;
        }
    }
    summary.total_sessions = sessions.len();
    summary
}
