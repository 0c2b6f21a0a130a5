//! Rebasing session timestamps onto a shared time axis.
//!
//! Sessions happen on different days but should be comparable side by side,
//! so every session is shifted to start at the same fixed midnight. After
//! the shift only the time of day is meaningful.

use crate::parser::SetRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The midnight every session is rebased onto (1970-01-01 00:00:00).
pub fn reference_midnight() -> NaiveDateTime {
    NaiveDateTime::default()
}

/// A [`SetRecord`] with start/end rebased relative to the earliest start of
/// its session, plus the derived set duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSet {
    pub training_id: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub exercise: String,
    pub count: u32,
    /// `end - start` in whole seconds.
    pub duration: i64,
}

/// Rebase every record so that the earliest `start` within each session
/// lands exactly on [`reference_midnight()`].
///
/// Rebasing is a pure shift per session, so durations are unchanged and
/// the input order is preserved.
pub fn normalize(records: &[SetRecord]) -> Vec<NormalizedSet> {
    let mut origins: HashMap<NaiveDateTime, NaiveDateTime> = HashMap::new();
    for r in records {
        origins
            .entry(r.training_id)
            .and_modify(|o| {
                if r.start < *o {
                    *o = r.start;
                }
            })
            .or_insert(r.start);
    }

    records
        .iter()
        .map(|r| {
            let origin = *origins.get(&r.training_id).unwrap_or(&r.start);
            let start = reference_midnight() + (r.start - origin);
            let end = reference_midnight() + (r.end - origin);
            NormalizedSet {
                training_id: r.training_id,
                start,
                end,
                exercise: r.exercise.clone(),
                count: r.count,
                duration: (end - start).num_seconds(),
            }
        })
        .collect()
}
