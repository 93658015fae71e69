use std::collections::BTreeSet;

use hitoffset_schema::{ColumnInput, HitType, Millis, PlaySession, ScoreRecord};
use log::warn;

use crate::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAnomaly {
    pub column: u8,
    pub map_notes: usize,
    pub hit_notes: usize,
    pub intervals: usize,
    pub offsets: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correlation {
    pub records: Vec<ScoreRecord>,
    pub anomalies: Vec<ColumnAnomaly>,
}

/// Integrity anomalies are logged and collected, never raised.
pub fn correlate_session(session: &PlaySession) -> AnalysisResult<Correlation> {
    let mut out = Correlation::default();

    for column in &session.columns {
        let (records, anomaly) = correlate_column(column);
        out.records.extend(records);
        if let Some(anomaly) = anomaly {
            out.anomalies.push(anomaly);
        }
    }

    if out.records.is_empty() {
        return Err(AnalysisError::new("E1001", "play has no hits and no misses"));
    }
    Ok(out)
}

pub fn correlate_column(input: &ColumnInput) -> (Vec<ScoreRecord>, Option<ColumnAnomaly>) {
    let times = &input.note_times;
    let mut records = Vec::with_capacity(input.scores.len());

    for entry in &input.scores {
        let interval = match entry.hit_type {
            HitType::HitPress | HitType::MissPress => note_index(times, entry.scheduled_ms)
                .filter(|&i| i > 0)
                .map(|i| times[i] - times[i - 1]),
            _ => None,
        };
        records.push(ScoreRecord::new(
            input.column,
            entry.hit_type,
            entry.scheduled_ms,
            entry.actual_ms,
            interval,
        ));
    }

    let anomaly = check_alignment(input);
    (records, anomaly)
}

// Counts intervals from the schedule side and offsets from the judgement side; the two
// only disagree when the classification references notes the schedule does not have.
fn check_alignment(input: &ColumnInput) -> Option<ColumnAnomaly> {
    let times = &input.note_times;
    let hit_times: Vec<Millis> = input
        .scores
        .iter()
        .filter(|e| e.hit_type == HitType::HitPress)
        .map(|e| e.scheduled_ms)
        .collect();

    let intervals = hit_times
        .iter()
        .filter_map(|h| note_index(times, *h))
        .filter(|&i| i > 0)
        .collect::<BTreeSet<usize>>()
        .len();
    let offsets = match times.first() {
        Some(first) => hit_times.iter().filter(|h| *h != first).count(),
        None => hit_times.len(),
    };

    if intervals == offsets {
        return None;
    }

    warn!(
        "column {}: {} intervals vs {} offsets (map notes = {}, hit notes = {}); keeping matched notes only",
        input.column,
        intervals,
        offsets,
        times.len(),
        hit_times.len()
    );
    Some(ColumnAnomaly {
        column: input.column,
        map_notes: times.len(),
        hit_notes: hit_times.len(),
        intervals,
        offsets,
    })
}

fn note_index(times: &[Millis], t: Millis) -> Option<usize> {
    let i = times.partition_point(|&x| x < t);
    (i < times.len() && times[i] == t).then_some(i)
}

/// `(intervals, offsets)` of press hits that have a preceding note in their column.
pub fn hit_samples(records: &[ScoreRecord]) -> (Vec<Millis>, Vec<Millis>) {
    records
        .iter()
        .filter(|r| r.hit_type == HitType::HitPress)
        .filter_map(|r| Some((r.interval_ms?, r.offset_ms?)))
        .unzip()
}

/// `(intervals, registered_at)` of missed presses that have a preceding note.
pub fn miss_samples(records: &[ScoreRecord]) -> (Vec<Millis>, Vec<Millis>) {
    records
        .iter()
        .filter(|r| r.hit_type == HitType::MissPress)
        .filter_map(|r| Some((r.interval_ms?, r.actual_ms)))
        .unzip()
}

pub fn offsets_of(records: &[ScoreRecord], kind: HitType) -> Vec<Millis> {
    records
        .iter()
        .filter(|r| r.hit_type == kind)
        .filter_map(|r| r.offset_ms)
        .collect()
}
