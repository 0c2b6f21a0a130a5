use crate::analysis::{ExerciseStat, LogSummary, StatKey};
use chrono::NaiveDateTime;
use maud::{Markup, html};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

fn fmt_duration(secs: i64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Write a static HTML report next to a PNG chart of total repetitions per
/// session. The chart file shares the report's name with a `.png` extension.
pub fn export_html_report<P: AsRef<Path>>(
    path: P,
    summary: &LogSummary,
    stats: &[(StatKey, ExerciseStat)],
) -> std::io::Result<()> {
    let path = path.as_ref();
    let chart_path = path.with_extension("png");
    let chart_file = match generate_reps_chart(stats, &chart_path) {
        Ok(_) => chart_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("")),
        Err(e) => {
            log::error!("failed to generate report chart: {e}");
            std::ffi::OsStr::new("")
        }
    };
    let markup = build_html(summary, &exercise_totals(stats), chart_file);
    std::fs::write(path, markup.into_string())
}

fn generate_reps_chart(
    stats: &[(StatKey, ExerciseStat)],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut per_session: BTreeMap<NaiveDateTime, u32> = BTreeMap::new();
    for ((id, _), s) in stats {
        *per_session.entry(*id).or_insert(0) += s.total_repetitions;
    }

    let root = BitMapBackend::new(path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    if per_session.is_empty() {
        root.present()?;
        return Ok(());
    }
    let max = per_session.values().copied().max().unwrap_or(0);
    let mut chart = ChartBuilder::on(&root)
        .caption("Repetitions per Session", ("sans-serif", 25))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(0..per_session.len(), 0u32..max)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Session")
        .y_desc("Repetitions")
        .draw()?;
    chart.draw_series(LineSeries::new(
        per_session.values().copied().enumerate(),
        &BLUE,
    ))?;
    root.present()?;
    Ok(())
}

/// Per-exercise totals across all sessions in the filtered stats:
/// `(exercise, sets, repetitions, duration)`.
fn exercise_totals(stats: &[(StatKey, ExerciseStat)]) -> Vec<(String, usize, u32, i64)> {
    let mut map: BTreeMap<&str, (usize, u32, i64)> = BTreeMap::new();
    for ((_, exercise), s) in stats {
        let entry = map.entry(exercise).or_insert((0, 0, 0));
        entry.0 += s.number_of_sets;
        entry.1 += s.total_repetitions;
        entry.2 += s.total_duration;
    }
    map.into_iter()
        .map(|(ex, (sets, reps, duration))| (ex.to_string(), sets, reps, duration))
        .collect()
}

fn build_html(
    summary: &LogSummary,
    totals: &[(String, usize, u32, i64)],
    chart_file: &std::ffi::OsStr,
) -> Markup {
    html! {
        html {
            head { meta charset="utf-8"; title { "Training Log Report" } }
            body {
                h1 { "Summary" }
                table border="1" {
                    tr { th { "Sessions" } td { (summary.total_sessions) } }
                    tr { th { "Sets" } td { (summary.total_sets) } }
                    tr { th { "Repetitions" } td { (summary.total_repetitions) } }
                    tr { th { "Time in Sets" } td { (fmt_duration(summary.total_duration)) } }
                }
                h1 { "Exercises" }
                table border="1" {
                    tr { th { "Exercise" } th { "Sets" } th { "Repetitions" } th { "Duration" } }
                    @for (exercise, sets, reps, duration) in totals {
                        tr {
                            td { (exercise) }
                            td { (sets) }
                            td { (reps) }
                            td { (fmt_duration(*duration)) }
                        }
                    }
                }
                h1 { "Repetitions per Session" }
                @if chart_file.is_empty() {
                    p { "Chart unavailable" }
                } @else {
                    img src=(chart_file.to_string_lossy());
                }
            }
        }
    }
}
