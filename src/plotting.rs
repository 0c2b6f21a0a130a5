//! Chart inputs for the dashboard, built as pure functions over the data.
//!
//! Every builder also exposes its raw points so the numbers can be checked
//! without rendering anything.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use egui_plot::{Bar, BarChart, Line, PlotPoints};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::analysis::{ExerciseStat, StatKey, in_range};
use crate::normalize::{NormalizedSet, reference_midnight};

/// Which per-exercise statistic a line chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatMetric {
    TotalRepetitions,
    NumberOfSets,
    TotalDuration,
}

impl StatMetric {
    pub const ALL: [StatMetric; 3] = [
        StatMetric::TotalRepetitions,
        StatMetric::NumberOfSets,
        StatMetric::TotalDuration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatMetric::TotalRepetitions => "Total repetitions",
            StatMetric::NumberOfSets => "Number of sets",
            StatMetric::TotalDuration => "Total duration (s)",
        }
    }

    fn value(self, stat: &ExerciseStat) -> f64 {
        match self {
            StatMetric::TotalRepetitions => stat.total_repetitions as f64,
            StatMetric::NumberOfSets => stat.number_of_sets as f64,
            StatMetric::TotalDuration => stat.total_duration as f64,
        }
    }
}

/// One bar of the session timeline, in plot units: y is the session's row
/// on the axis (see [`session_axis`]), x spans the rebased set interval in
/// seconds since the reference midnight.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBar {
    pub session_row: f64,
    pub start_secs: f64,
    pub end_secs: f64,
    pub count: u32,
}

/// All timeline bars of one exercise, so the exercise gets a single legend
/// entry and color.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseTimeline {
    pub exercise: String,
    pub bars: Vec<TimelineBar>,
}

/// The distinct sessions inside the range, sorted by start timestamp. The
/// position in this list is a session's y coordinate on the timeline, so
/// two sessions on the same day still get separate rows.
pub fn session_axis(
    records: &[NormalizedSet],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<NaiveDateTime> {
    let ids: BTreeSet<NaiveDateTime> = records
        .iter()
        .filter(|r| in_range(r.training_id.date(), start, end))
        .map(|r| r.training_id)
        .collect();
    ids.into_iter().collect()
}

/// Build the per-exercise timeline rows for sessions inside the range,
/// keyed onto the rows of `sessions` (from [`session_axis`]).
///
/// Rows come back sorted by exercise name; bars keep record order.
pub fn timeline_rows(
    records: &[NormalizedSet],
    sessions: &[NaiveDateTime],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<ExerciseTimeline> {
    let midnight = reference_midnight();
    let rows: HashMap<NaiveDateTime, usize> = sessions
        .iter()
        .enumerate()
        .map(|(row, id)| (*id, row))
        .collect();
    let mut map: BTreeMap<String, Vec<TimelineBar>> = BTreeMap::new();
    for r in records {
        if !in_range(r.training_id.date(), start, end) {
            continue;
        }
        let Some(row) = rows.get(&r.training_id) else {
            continue;
        };
        map.entry(r.exercise.clone()).or_default().push(TimelineBar {
            session_row: *row as f64,
            start_secs: (r.start - midnight).num_seconds() as f64,
            end_secs: (r.end - midnight).num_seconds() as f64,
            count: r.count,
        });
    }
    map.into_iter()
        .map(|(exercise, bars)| ExerciseTimeline { exercise, bars })
        .collect()
}

/// Turn one timeline row into a horizontal bar chart: one bar per set,
/// anchored at the set's start time and as long as the set lasted.
pub fn timeline_chart(row: &ExerciseTimeline, sessions: &[NaiveDateTime]) -> BarChart {
    let bars: Vec<Bar> = row
        .bars
        .iter()
        .map(|b| {
            Bar::new(b.session_row, b.end_secs - b.start_secs)
                .base_offset(b.start_secs)
                .width(0.6)
                .name(format!("{} \u{00d7}{}", row.exercise, b.count))
        })
        .collect();
    let sessions = sessions.to_vec();
    BarChart::new(bars)
        .horizontal()
        .name(&row.exercise)
        .element_formatter(Box::new(move |bar, _chart| {
            let start = bar.base_offset.unwrap_or(0.0);
            format!(
                "{} on {}\n{} for {:.0}s",
                bar.name,
                format_session_label(&sessions, bar.argument),
                format_time_of_day(start),
                bar.value
            )
        }))
}

/// A timeline row coordinate as the session's start timestamp. Marks that
/// fall between rows or outside the axis come back empty.
pub fn format_session_label(sessions: &[NaiveDateTime], value: f64) -> String {
    let row = value.round();
    if (value - row).abs() > 0.01 || row < 0.0 {
        return String::new();
    }
    sessions
        .get(row as usize)
        .map(|id| id.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Per-session values of one metric for one exercise, sorted by session
/// date, as `[days_from_ce, value]` points.
pub fn stat_points(
    stats: &std::collections::HashMap<StatKey, ExerciseStat>,
    exercise: &str,
    metric: StatMetric,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<[f64; 2]> {
    let mut points: Vec<[f64; 2]> = stats
        .iter()
        .filter(|((id, ex), _)| ex.as_str() == exercise && in_range(id.date(), start, end))
        .map(|((id, _), stat)| [id.date().num_days_from_ce() as f64, metric.value(stat)])
        .collect();
    points.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));
    points
}

/// A stat line plus its raw points.
pub struct StatSeries {
    pub line: Line,
    pub points: Vec<[f64; 2]>,
}

pub fn stat_series(
    stats: &std::collections::HashMap<StatKey, ExerciseStat>,
    exercise: &str,
    metric: StatMetric,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> StatSeries {
    let points = stat_points(stats, exercise, metric, start, end);
    StatSeries {
        line: Line::new(PlotPoints::from(points.clone())).name(metric.label()),
        points,
    }
}

/// Seconds since the reference midnight as `HH:MM:SS`.
pub fn format_time_of_day(secs: f64) -> String {
    let total = secs.max(0.0).round() as i64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Days-from-CE plot coordinate as `YYYY-MM-DD`.
pub fn format_session_day(day: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(day.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("{day:.0}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate_exercise_stats;
    use crate::normalize::normalize;
    use crate::parser::{SetRecord, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use egui_plot::{PlotGeometry, PlotItem};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_records() -> Vec<NormalizedSet> {
        let raw = vec![
            SetRecord {
                training_id: ts("2024-01-01-08-00-00"),
                start: ts("2024-01-01-08-00-00"),
                end: ts("2024-01-01-08-00-30"),
                exercise: "squat".into(),
                count: 10,
            },
            SetRecord {
                training_id: ts("2024-01-01-08-00-00"),
                start: ts("2024-01-01-08-05-00"),
                end: ts("2024-01-01-08-06-00"),
                exercise: "bench".into(),
                count: 12,
            },
            SetRecord {
                training_id: ts("2024-01-03-18-00-00"),
                start: ts("2024-01-03-18-00-00"),
                end: ts("2024-01-03-18-00-45"),
                exercise: "squat".into(),
                count: 12,
            },
        ];
        normalize(&raw)
    }

    #[test]
    fn timeline_rows_grouped_by_exercise() {
        let records = sample_records();
        let sessions = session_axis(&records, None, None);
        assert_eq!(
            sessions,
            vec![ts("2024-01-01-08-00-00"), ts("2024-01-03-18-00-00")]
        );
        let rows = timeline_rows(&records, &sessions, None, None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].exercise, "bench");
        assert_eq!(rows[1].exercise, "squat");
        assert_eq!(rows[1].bars.len(), 2);

        // First squat set starts at the session origin, on the first row.
        let squat = &rows[1].bars[0];
        assert_eq!(squat.start_secs, 0.0);
        assert_eq!(squat.end_secs, 30.0);
        assert_eq!(squat.count, 10);
        assert_eq!(squat.session_row, 0.0);
        assert_eq!(rows[1].bars[1].session_row, 1.0);

        // Bench started five minutes into the session.
        let bench = &rows[0].bars[0];
        assert_eq!(bench.start_secs, 300.0);
        assert_eq!(bench.end_secs, 360.0);
    }

    #[test]
    fn same_day_sessions_get_separate_rows() {
        let raw = vec![
            SetRecord {
                training_id: ts("2024-01-01-08-00-00"),
                start: ts("2024-01-01-08-00-00"),
                end: ts("2024-01-01-08-00-30"),
                exercise: "squat".into(),
                count: 10,
            },
            SetRecord {
                training_id: ts("2024-01-01-18-00-00"),
                start: ts("2024-01-01-18-00-00"),
                end: ts("2024-01-01-18-00-40"),
                exercise: "squat".into(),
                count: 12,
            },
        ];
        let records = normalize(&raw);
        let sessions = session_axis(&records, None, None);
        assert_eq!(sessions.len(), 2);
        let rows = timeline_rows(&records, &sessions, None, None);
        assert_eq!(rows.len(), 1);
        let bars = &rows[0].bars;
        assert_eq!(bars[0].session_row, 0.0);
        assert_eq!(bars[1].session_row, 1.0);
        assert_eq!(format_session_label(&sessions, 0.0), "2024-01-01 08:00");
        assert_eq!(format_session_label(&sessions, 1.0), "2024-01-01 18:00");
    }

    #[test]
    fn timeline_rows_respect_range() {
        let records = sample_records();
        let sessions = session_axis(&records, Some(date("2024-01-02")), None);
        assert_eq!(sessions, vec![ts("2024-01-03-18-00-00")]);
        let rows = timeline_rows(&records, &sessions, Some(date("2024-01-02")), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exercise, "squat");
        assert_eq!(rows[0].bars.len(), 1);
        assert_eq!(rows[0].bars[0].session_row, 0.0);
    }

    #[test]
    fn timeline_rows_empty_range() {
        let records = sample_records();
        let start = Some(date("2030-01-01"));
        let end = Some(date("2030-12-31"));
        let sessions = session_axis(&records, start, end);
        assert!(sessions.is_empty());
        assert!(timeline_rows(&records, &sessions, start, end).is_empty());
    }

    #[test]
    fn session_label_ignores_off_row_marks() {
        let sessions = vec![ts("2024-01-01-08-00-00")];
        assert_eq!(format_session_label(&sessions, 0.5), "");
        assert_eq!(format_session_label(&sessions, -1.0), "");
        assert_eq!(format_session_label(&sessions, 3.0), "");
    }

    #[test]
    fn stat_points_per_metric() {
        let stats = aggregate_exercise_stats(&sample_records());
        let d1 = date("2024-01-01").num_days_from_ce() as f64;
        let d3 = date("2024-01-03").num_days_from_ce() as f64;

        let reps = stat_points(&stats, "squat", StatMetric::TotalRepetitions, None, None);
        assert_eq!(reps, vec![[d1, 10.0], [d3, 12.0]]);

        let sets = stat_points(&stats, "squat", StatMetric::NumberOfSets, None, None);
        assert_eq!(sets, vec![[d1, 1.0], [d3, 1.0]]);

        let duration = stat_points(&stats, "squat", StatMetric::TotalDuration, None, None);
        assert_eq!(duration, vec![[d1, 30.0], [d3, 45.0]]);
    }

    #[test]
    fn stat_series_line_matches_points() {
        let stats = aggregate_exercise_stats(&sample_records());
        let series = stat_series(&stats, "squat", StatMetric::TotalRepetitions, None, None);
        if let PlotGeometry::Points(points) = series.line.geometry() {
            let rendered: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
            assert_eq!(rendered, series.points);
        } else {
            panic!("expected points");
        }
    }

    #[test]
    fn stat_points_empty_range() {
        let stats = aggregate_exercise_stats(&sample_records());
        let points = stat_points(
            &stats,
            "squat",
            StatMetric::TotalRepetitions,
            Some(date("2030-01-01")),
            None,
        );
        assert!(points.is_empty());
    }

    #[test]
    fn time_of_day_formatting() {
        assert_eq!(format_time_of_day(0.0), "00:00:00");
        assert_eq!(format_time_of_day(30.0), "00:00:30");
        assert_eq!(format_time_of_day(3725.0), "01:02:05");
    }

    #[test]
    fn session_day_formatting() {
        let d = date("2024-01-01").num_days_from_ce() as f64;
        assert_eq!(format_session_day(d), "2024-01-01");
    }
}
