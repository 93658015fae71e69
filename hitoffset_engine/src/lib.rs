//! Hit-offset analysis core: correlates judged notes with the chart, aggregates offsets by
//! note interval, fits the softplus rhythm model and estimates a sustainable tapping rate.

mod correlate;
mod distribution;
mod error;
mod fit;
mod tapping;
pub mod utils;

use hitoffset_schema::{IntervalStat, PlaySession, ScoreRecord};
use serde::{Deserialize, Serialize};

pub use correlate::{correlate_column, correlate_session, hit_samples, miss_samples, offsets_of, ColumnAnomaly, Correlation};
pub use distribution::{
    binned_offsets, frequency_hist_for_plot, offset_distribution, per_note_stats, region_offsets, windowed_stats,
    BinStat, NoteStat, OffsetDistribution, WindowOptions, DEFAULT_BIN_WIDTH, DEFAULT_HIT_RANGE,
};
pub use error::{AnalysisError, AnalysisErrorKind, AnalysisResult};
pub use fit::{
    fit_error, fit_gradient_descent, fit_gradient_descent_with, fit_two_point, predict_offsets, DescentFit,
    DescentOptions, SignHistory, VerticalAnchor,
};
pub use tapping::{
    estimate_tapping_rate, interval_lags, lag_buckets, lag_stat, BoundPolicy, LagStat, TappingOptions,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub window: WindowOptions,
    pub descent: DescentOptions,
    pub tapping: TappingOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionAnalysis {
    pub records: Vec<ScoreRecord>,
    pub anomalies: Vec<ColumnAnomaly>,
    pub stats: Vec<IntervalStat>,
}

pub fn analyze_session(session: &PlaySession, config: &AnalysisConfig) -> AnalysisResult<SessionAnalysis> {
    let Correlation { records, anomalies } = correlate_session(session)?;
    let (intervals, offsets) = hit_samples(&records);
    let stats = windowed_stats(&intervals, &offsets, &config.window)?;

    Ok(SessionAnalysis {
        records,
        anomalies,
        stats,
    })
}
