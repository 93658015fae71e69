use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use hitoffset_schema::{IntervalStat, TappingRate, TrainingSeries};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::load_series_json_from_path;

/// Append-only training series bound to a JSON file.
#[derive(Debug)]
pub struct SeriesStore {
    path: PathBuf,
    series: TrainingSeries,
}

impl SeriesStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let series = if path.exists() {
            load_series_json_from_path(&path)?
        } else {
            debug!("no series at {}, starting empty", path.display());
            TrainingSeries::default()
        };
        Ok(Self { path, series })
    }

    pub fn series(&self) -> &TrainingSeries {
        &self.series
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, stats: &[IntervalStat]) {
        self.series.extend_from_stats(stats);
    }

    pub fn save(&self) -> anyhow::Result<()> {
        write_json(&self.path, &self.series)?;
        info!("saved {} series points to {}", self.series.len(), self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpsBoard {
    best: BTreeMap<String, f64>,
}

impl NpsBoard {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).with_context(|| format!("failed to read nps board: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("failed to parse nps board json: {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        write_json(path.as_ref(), self)
    }

    /// Keeps the larger of the stored and the new rate. Returns `true` when the entry
    /// was created or raised.
    pub fn record(&mut self, play_hash: &str, rate: &TappingRate) -> bool {
        match self.best.get_mut(play_hash) {
            Some(old) if *old >= rate.nps => false,
            Some(old) => {
                *old = rate.nps;
                true
            }
            None => {
                self.best.insert(play_hash.to_string(), rate.nps);
                true
            }
        }
    }

    pub fn get(&self, play_hash: &str) -> Option<f64> {
        self.best.get(play_hash).copied()
    }

    pub fn top(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = self.best.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value).context("failed to serialize json")?;
    fs::write(path, json).with_context(|| format!("failed to write: {}", path.display()))
}
