use std::collections::{BTreeMap, HashMap};

use hitoffset_schema::{HitType, Millis, ScoreRecord, TappingRate};
use serde::{Deserialize, Serialize};

use crate::utils::{mean, stddev};
use crate::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundPolicy {
    #[default]
    Average,
    Minimum,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TappingOptions {
    /// Mean lag up to which a bucket counts as "not straining" (one 60 Hz frame).
    pub lag_tolerance: Millis,
    pub outlier_sigma: f64,
    pub min_samples: usize,
    pub min_straining: usize,
    pub policy: BoundPolicy,
}

impl Default for TappingOptions {
    fn default() -> Self {
        Self {
            lag_tolerance: 16.0,
            outlier_sigma: 1.5,
            min_samples: 10,
            min_straining: 1,
            policy: BoundPolicy::Average,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagStat {
    pub interval: Millis,
    pub mean_lag: Millis,
    pub stddev_lag: Millis,
    pub count: usize,
}

impl LagStat {
    pub fn tapping_interval(&self) -> Millis {
        self.interval + self.mean_lag + 2.0 * self.stddev_lag
    }
}

/// Drops lags further than `outlier_sigma` deviations from the mean, then recomputes.
/// Buckets with fewer than `min_samples` lags, before or after filtering, are discarded.
pub fn lag_stat(interval: Millis, lags: &[Millis], options: &TappingOptions) -> Option<LagStat> {
    if lags.len() < options.min_samples {
        return None;
    }
    let m = mean(lags)?;
    let s = stddev(lags)?;
    let kept: Vec<Millis> = lags
        .iter()
        .copied()
        .filter(|l| (l - m).abs() <= options.outlier_sigma * s)
        .collect();
    if kept.len() < options.min_samples {
        return None;
    }

    Some(LagStat {
        interval,
        mean_lag: mean(&kept)?,
        stddev_lag: stddev(&kept)?,
        count: kept.len(),
    })
}

/// `(interval, lag)` for every press hit whose previous note in the column was hit too,
/// where lag is the actual gap between the two hits minus the scheduled interval.
pub fn interval_lags(records: &[ScoreRecord]) -> Vec<(Millis, Millis)> {
    let mut last: HashMap<u8, &ScoreRecord> = HashMap::new();
    let mut out = Vec::new();

    for record in records {
        match record.hit_type {
            HitType::HitPress => {
                if let (Some(prev), Some(interval)) = (last.get(&record.column), record.interval_ms) {
                    let follows = (record.scheduled_ms - prev.scheduled_ms - interval).abs() < 1e-6;
                    if follows {
                        out.push((interval, (record.actual_ms - prev.actual_ms) - interval));
                    }
                }
                last.insert(record.column, record);
            }
            HitType::MissPress => {
                last.remove(&record.column);
            }
            _ => {}
        }
    }
    out
}

pub fn lag_buckets(records: &[ScoreRecord], options: &TappingOptions) -> Vec<LagStat> {
    let mut buckets: BTreeMap<i64, Vec<Millis>> = BTreeMap::new();
    for (interval, lag) in interval_lags(records) {
        buckets.entry(interval.round() as i64).or_default().push(lag);
    }

    buckets
        .into_iter()
        .filter_map(|(interval, lags)| lag_stat(interval as Millis, &lags, options))
        .collect()
}

/// If no bucket lags beyond `lag_tolerance` the player was never pushed, so the smallest
/// tested interval only gives a lower bound on the rate (`is_definite == false`).
pub fn estimate_tapping_rate(buckets: &[LagStat], options: &TappingOptions) -> AnalysisResult<TappingRate> {
    let straining: Vec<&LagStat> = buckets
        .iter()
        .filter(|b| b.mean_lag > options.lag_tolerance)
        .collect();

    let (is_definite, tapping_interval) = if !straining.is_empty() && straining.len() >= options.min_straining {
        let intervals: Vec<Millis> = straining.iter().map(|b| b.tapping_interval()).collect();
        let bound = match options.policy {
            BoundPolicy::Average => mean(&intervals),
            BoundPolicy::Minimum => intervals.iter().copied().reduce(f64::min),
        };
        (true, bound)
    } else {
        let smallest = buckets
            .iter()
            .min_by(|a, b| a.interval.total_cmp(&b.interval))
            .map(LagStat::tapping_interval);
        (false, smallest)
    };

    let tapping_interval =
        tapping_interval.ok_or_else(|| AnalysisError::new("E1005", "no interval bucket with enough samples"))?;
    if !(tapping_interval > 0.0) {
        return Err(AnalysisError::new(
            "E2002",
            format!("tapping interval must be > 0, got {tapping_interval}"),
        ));
    }

    Ok(TappingRate {
        is_definite,
        nps: 1000.0 / tapping_interval,
    })
}
