use std::{fs, path::Path};

use anyhow::Context;
use hitoffset_schema::{PlaySession, TrainingSeries};

mod store;
mod worker;

pub use store::{NpsBoard, SeriesStore};
pub use worker::{FitOutcome, FitWorker};

pub fn load_session_json_from_path(path: impl AsRef<Path>) -> anyhow::Result<PlaySession> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read session: {}", path.display()))?;
    let session: PlaySession = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse session json: {}", path.display()))?;
    Ok(session)
}

pub fn load_session_json_from_str(json: &str) -> anyhow::Result<PlaySession> {
    let session: PlaySession = serde_json::from_str(json).context("failed to parse session json")?;
    Ok(session)
}

pub fn load_series_json_from_path(path: impl AsRef<Path>) -> anyhow::Result<TrainingSeries> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("failed to read series: {}", path.display()))?;
    let series: TrainingSeries = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse series json: {}", path.display()))?;
    Ok(series)
}

pub fn load_series_json_from_str(json: &str) -> anyhow::Result<TrainingSeries> {
    let series: TrainingSeries = serde_json::from_str(json).context("failed to parse series json")?;
    Ok(series)
}
