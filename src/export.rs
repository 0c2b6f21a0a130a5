use crate::{
    analysis::{ExerciseStat, LogSummary, StatKey},
    normalize::NormalizedSet,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_records_csv<P: AsRef<Path>>(path: P, records: &[NormalizedSet]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, records)
}

pub fn save_records_json<P: AsRef<Path>>(path: P, records: &[NormalizedSet]) -> std::io::Result<()> {
    write_json(records, path)
}

// Explicit columns instead of #[serde(flatten)]; the csv serializer does
// not handle flattened structs.
#[derive(Serialize)]
struct StatRow<'a> {
    training_id: &'a chrono::NaiveDateTime,
    exercise: &'a str,
    total_duration: i64,
    total_repetitions: u32,
    number_of_sets: usize,
    min_repetitions: u32,
    max_repetitions: u32,
}

fn stat_rows(stats: &[(StatKey, ExerciseStat)]) -> Vec<StatRow<'_>> {
    stats
        .iter()
        .map(|((id, exercise), s)| StatRow {
            training_id: id,
            exercise: exercise.as_str(),
            total_duration: s.total_duration,
            total_repetitions: s.total_repetitions,
            number_of_sets: s.number_of_sets,
            min_repetitions: s.min_repetitions,
            max_repetitions: s.max_repetitions,
        })
        .collect()
}

pub fn save_stats_csv<P: AsRef<Path>>(
    path: P,
    stats: &[(StatKey, ExerciseStat)],
) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, &stat_rows(stats))
}

pub fn save_stats_json<P: AsRef<Path>>(
    path: P,
    stats: &[(StatKey, ExerciseStat)],
) -> std::io::Result<()> {
    write_json(&stat_rows(stats), path)
}

#[derive(Serialize)]
pub struct StatsExport<'a> {
    pub summary: &'a LogSummary,
    pub exercises: &'a [(StatKey, ExerciseStat)],
}

pub fn save_full_export_json<P: AsRef<Path>>(
    path: P,
    summary: &LogSummary,
    exercises: &[(StatKey, ExerciseStat)],
) -> std::io::Result<()> {
    let export = StatsExport { summary, exercises };
    write_json(&export, path)
}
