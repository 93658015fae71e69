use std::collections::BTreeMap;

use hitoffset_schema::{IntervalStat, Millis};
use serde::{Deserialize, Serialize};

use crate::utils::{frequency_rank_histogram, mean, normal_pdf, stddev, value_counts};
use crate::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowOptions {
    pub half_window: Millis,
    pub min_peak_count: usize,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            half_window: 10.0,
            min_peak_count: 50,
        }
    }
}

/// A peak is any interval value seen at least `min_peak_count` times. Its window is
/// `[peak - half_window - 1, peak + half_window + 1]`, inclusive on both ends.
///
/// Known gap: a peak that quantization split across neighbouring millisecond values is
/// judged per value, so two halves that are each under `min_peak_count` are dropped even
/// when together they would qualify.
pub fn windowed_stats(
    intervals: &[Millis],
    offsets: &[Millis],
    options: &WindowOptions,
) -> AnalysisResult<Vec<IntervalStat>> {
    check_lengths(intervals, offsets)?;
    if intervals.is_empty() {
        return Err(AnalysisError::new("E1001", "no hit offsets to aggregate"));
    }

    let (unique, counts) = value_counts(intervals);
    let mut stats = Vec::new();

    for (peak, _) in unique
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count >= options.min_peak_count)
    {
        let lo = peak - options.half_window - 1.0;
        let hi = peak + options.half_window + 1.0;
        let window = region_offsets(intervals, offsets, lo, hi);

        let (Some(mean_offset), Some(stddev_offset)) = (mean(&window), stddev(&window)) else {
            continue;
        };
        stats.push(IntervalStat {
            peak_interval: peak,
            mean_offset,
            stddev_offset,
            sample_count: window.len(),
        });
    }

    stats.sort_by(|a, b| a.peak_interval.total_cmp(&b.peak_interval));
    Ok(stats)
}

pub fn frequency_hist_for_plot(values: &[Millis]) -> Vec<usize> {
    frequency_rank_histogram(values)
}

pub fn region_offsets(intervals: &[Millis], offsets: &[Millis], start: Millis, end: Millis) -> Vec<Millis> {
    intervals
        .iter()
        .zip(offsets)
        .filter(|(i, _)| start <= **i && **i <= end)
        .map(|(_, o)| *o)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct OffsetDistribution {
    pub mean: Millis,
    pub stddev: Millis,
    pub count: usize,
    /// `None` when every offset is identical.
    pub model: Option<Vec<(Millis, f64)>>,
}

pub const DEFAULT_HIT_RANGE: (i32, i32) = (-151, 151);

pub fn offset_distribution(offsets: &[Millis], hit_range: (i32, i32)) -> AnalysisResult<OffsetDistribution> {
    let (Some(m), Some(s)) = (mean(offsets), stddev(offsets)) else {
        return Err(AnalysisError::new("E1001", "no offsets in selection"));
    };

    let model = (s != 0.0).then(|| {
        let n = offsets.len() as f64;
        (hit_range.0..hit_range.1)
            .map(|x| {
                let x = x as f64;
                (x, normal_pdf(x, m, s) * n)
            })
            .collect()
    });

    Ok(OffsetDistribution {
        mean: m,
        stddev: s,
        count: offsets.len(),
        model,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteStat {
    pub index: usize,
    pub mean: Millis,
    pub stddev: Millis,
    pub count: usize,
}

/// Per note index statistics across several plays of one chart. `None` entries are
/// misses. Indices nobody hit are left out.
pub fn per_note_stats(plays: &[Vec<Option<Millis>>]) -> Vec<NoteStat> {
    let notes = plays.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(notes);

    for index in 0..notes {
        let offsets: Vec<Millis> = plays
            .iter()
            .filter_map(|play| play.get(index).copied().flatten())
            .collect();
        if let (Some(mean), Some(stddev)) = (mean(&offsets), stddev(&offsets)) {
            out.push(NoteStat {
                index,
                mean,
                stddev,
                count: offsets.len(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinStat {
    pub center: Millis,
    pub mean: Millis,
    pub stddev: Millis,
    pub count: usize,
}

pub const DEFAULT_BIN_WIDTH: Millis = 500.0;

/// Local offset drift over the play: offsets grouped into fixed-width time bins
/// starting 100 ms before the first timing. Empty bins are skipped.
pub fn binned_offsets(timings: &[Millis], offsets: &[Millis], bin_width: Millis) -> AnalysisResult<Vec<BinStat>> {
    check_lengths(timings, offsets)?;
    if !(bin_width > 0.0) || !bin_width.is_finite() {
        return Err(AnalysisError::new("E2002", format!("bin width must be finite and > 0, got {bin_width}")));
    }
    if let Some(bad) = timings.iter().find(|t| !t.is_finite()) {
        return Err(AnalysisError::new("E2002", format!("timing must be finite, got {bad}")));
    }
    let Some(start) = timings.iter().copied().reduce(f64::min) else {
        return Err(AnalysisError::new("E1001", "no timings to bin"));
    };
    let start = start - 100.0;

    let mut bins: BTreeMap<u64, Vec<Millis>> = BTreeMap::new();
    for (t, o) in timings.iter().zip(offsets) {
        let idx = ((t - start) / bin_width).floor() as u64;
        bins.entry(idx).or_default().push(*o);
    }

    Ok(bins
        .iter()
        .filter_map(|(i, bin)| {
            Some(BinStat {
                center: start + bin_width * (*i as f64 + 0.5),
                mean: mean(bin)?,
                stddev: stddev(bin)?,
                count: bin.len(),
            })
        })
        .collect())
}

fn check_lengths(a: &[Millis], b: &[Millis]) -> AnalysisResult<()> {
    if a.len() != b.len() {
        return Err(AnalysisError::new(
            "E2001",
            format!("length mismatch: {} vs {}", a.len(), b.len()),
        ));
    }
    Ok(())
}
