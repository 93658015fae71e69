use std::ops::ControlFlow;

use hitoffset_schema::{softplus_rhythm, Millis, ModelFit, RhythmModel, TrainingSeries};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::utils::mean;
use crate::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum VerticalAnchor {
    #[default]
    Zero,
    /// Average of the mean offsets inside `[-tolerance, tolerance)`, the points where the
    /// player is not straining yet.
    SettledMean { tolerance: Millis },
}

impl VerticalAnchor {
    pub const SETTLED_TOLERANCE: Millis = 16.0;

    pub fn settled() -> Self {
        Self::SettledMean {
            tolerance: Self::SETTLED_TOLERANCE,
        }
    }
}

/// `t_min` is the smallest interval whose mean offset is in `[0, 2)`. The second anchor
/// takes the smallest non-negative interval and, independently, the largest mean offset
/// among non-negative intervals.
pub fn fit_two_point(series: &TrainingSeries, anchor: VerticalAnchor) -> AnalysisResult<ModelFit> {
    let points = checked_points(series)?;

    let t_min = points
        .iter()
        .filter(|(_, m)| (0.0..2.0).contains(m))
        .map(|(t, _)| *t)
        .reduce(f64::min)
        .ok_or_else(|| AnalysisError::new("E1002", "no point with mean offset in [0, 2)"))?;

    let non_negative: Vec<(Millis, Millis)> = points.iter().copied().filter(|(t, _)| *t >= 0.0).collect();
    let (Some(p1x), Some(p1y)) = (
        non_negative.iter().map(|(t, _)| *t).reduce(f64::min),
        non_negative.iter().map(|(_, m)| *m).reduce(f64::max),
    ) else {
        return Err(AnalysisError::new("E1003", "no point with a non-negative interval"));
    };

    let y = match anchor {
        VerticalAnchor::Zero => 0.0,
        VerticalAnchor::SettledMean { tolerance } => {
            let settled: Vec<Millis> = points
                .iter()
                .map(|(_, m)| *m)
                .filter(|m| -tolerance <= *m && *m < tolerance)
                .collect();
            mean(&settled).ok_or_else(|| {
                AnalysisError::new("E1002", format!("no point with mean offset within ±{tolerance} ms"))
            })?
        }
    };

    if t_min == p1x {
        return Err(AnalysisError::new("E2003", "both anchors share one interval; slope is undefined")
            .with_context(format!("t_min = {t_min}")));
    }

    let model = RhythmModel {
        r: (y - p1y) / (t_min - p1x),
        t_min,
        y,
    };
    let error = total_error(&points, &model) / points.len() as f64;
    debug!("two-point fit: {model:?} err = {error}");
    Ok(ModelFit { model, error })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DescentOptions {
    pub r: f64,
    pub t_min: Millis,
    pub y: Millis,
    pub step: f64,
    pub rate_r: f64,
    pub rate_t: f64,
    pub rate_y: f64,
    pub iterations: usize,
}

impl Default for DescentOptions {
    fn default() -> Self {
        Self {
            r: -0.5,
            t_min: 200.0,
            y: 0.0,
            step: 0.1,
            rate_r: 0.01,
            rate_t: 1.0,
            rate_y: 1.0,
            iterations: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescentFit {
    pub fit: ModelFit,
    pub rates: [f64; 3],
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignHistory {
    signs: [bool; 3],
    len: usize,
}

impl SignHistory {
    /// Records a gradient and reports whether the learning rate must be halved: two sign
    /// flips in a row over the last three samples.
    pub fn push(&mut self, gradient: f64) -> bool {
        self.signs = [gradient >= 0.0, self.signs[0], self.signs[1]];
        self.len = (self.len + 1).min(3);
        self.len == 3 && self.signs[0] != self.signs[1] && self.signs[1] != self.signs[2]
    }
}

struct OptimizerState {
    params: [f64; 3],
    rates: [f64; 3],
    signs: [SignHistory; 3],
}

impl OptimizerState {
    fn new(options: &DescentOptions) -> Self {
        Self {
            params: [options.r, options.t_min, options.y],
            rates: [options.rate_r, options.rate_t, options.rate_y],
            signs: [SignHistory::default(); 3],
        }
    }

    fn model(&self) -> RhythmModel {
        model_of(self.params)
    }
}

fn model_of([r, t_min, y]: [f64; 3]) -> RhythmModel {
    RhythmModel { r, t_min, y }
}

pub fn fit_gradient_descent(series: &TrainingSeries, options: &DescentOptions) -> AnalysisResult<DescentFit> {
    fit_gradient_descent_with(series, options, |_, _| ControlFlow::Continue(()))
}

/// `observe` sees `(iteration, total_error)` before each step; `ControlFlow::Break` ends the
/// run with a cancelled error.
pub fn fit_gradient_descent_with<F>(
    series: &TrainingSeries,
    options: &DescentOptions,
    mut observe: F,
) -> AnalysisResult<DescentFit>
where
    F: FnMut(usize, f64) -> ControlFlow<()>,
{
    let points = checked_points(series)?;
    let mut state = OptimizerState::new(options);
    let mut history = Vec::with_capacity(options.iterations);

    for iteration in 0..options.iterations {
        let base = total_error(&points, &state.model());
        history.push(base);
        if observe(iteration, base).is_break() {
            return Err(AnalysisError::new("E3001", "fit cancelled")
                .with_context(format!("iteration {iteration}")));
        }

        let mut gradients = [0.0; 3];
        for (i, gradient) in gradients.iter_mut().enumerate() {
            let mut nudged = state.params;
            nudged[i] += options.step;
            *gradient = total_error(&points, &model_of(nudged)) - base;
        }

        for i in 0..3 {
            if state.signs[i].push(gradients[i]) {
                state.rates[i] /= 2.0;
            }
            state.params[i] -= state.rates[i] * gradients[i];
        }
    }

    let model = state.model();
    let error = total_error(&points, &model) / points.len() as f64;
    debug!(
        "descent fit: {model:?} err = {error} rates = {:?} after {} iterations",
        state.rates, options.iterations
    );
    Ok(DescentFit {
        fit: ModelFit { model, error },
        rates: state.rates,
        history,
    })
}

pub fn fit_error(series: &TrainingSeries, model: &RhythmModel) -> AnalysisResult<f64> {
    let points = checked_points(series)?;
    Ok(total_error(&points, model) / points.len() as f64)
}

pub fn predict_offsets(model: &RhythmModel, intervals: &[Millis]) -> Vec<Millis> {
    intervals.iter().map(|t| model.predict(*t)).collect()
}

fn total_error(points: &[(Millis, Millis)], model: &RhythmModel) -> f64 {
    points
        .iter()
        .map(|(t, m)| (m - softplus_rhythm(*t, model.r, model.t_min, model.y)).abs())
        .sum()
}

fn checked_points(series: &TrainingSeries) -> AnalysisResult<Vec<(Millis, Millis)>> {
    if series.distr_t.len() != series.mean_h.len() {
        return Err(AnalysisError::new(
            "E2001",
            format!(
                "length mismatch: {} intervals vs {} means",
                series.distr_t.len(),
                series.mean_h.len()
            ),
        ));
    }
    if series.is_empty() {
        return Err(AnalysisError::new("E1004", "training series is empty"));
    }
    Ok(series.points().collect())
}
