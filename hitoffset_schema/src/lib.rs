use serde::{Deserialize, Serialize};

pub type Millis = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HitType {
    HitPress,
    HitRelease,
    MissPress,
    MissRelease,
    Empty,
}

impl HitType {
    pub fn is_hit(self) -> bool {
        matches!(self, HitType::HitPress | HitType::HitRelease)
    }

    pub fn is_miss(self) -> bool {
        matches!(self, HitType::MissPress | HitType::MissRelease)
    }
}

/// For misses `actual_ms` is the moment the miss was registered, not a hit instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntry {
    pub column: u8,
    pub hit_type: HitType,
    pub scheduled_ms: Millis,
    pub actual_ms: Millis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnInput {
    pub column: u8,
    /// Scheduled press times, strictly increasing.
    pub note_times: Vec<Millis>,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaySession {
    #[serde(default)]
    pub id: Option<String>,
    pub columns: Vec<ColumnInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub column: u8,
    pub scheduled_ms: Millis,
    pub actual_ms: Millis,
    pub offset_ms: Option<Millis>,
    pub hit_type: HitType,
    pub interval_ms: Option<Millis>,
}

impl ScoreRecord {
    pub fn new(
        column: u8,
        hit_type: HitType,
        scheduled_ms: Millis,
        actual_ms: Millis,
        interval_ms: Option<Millis>,
    ) -> Self {
        let offset_ms = hit_type.is_hit().then(|| actual_ms - scheduled_ms);
        Self {
            column,
            scheduled_ms,
            actual_ms,
            offset_ms,
            hit_type,
            interval_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IntervalStat {
    pub peak_interval: Millis,
    pub mean_offset: Millis,
    pub stddev_offset: Millis,
    pub sample_count: usize,
}

/// A negative `r` means the offset grows as the note interval drops below `t_min`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RhythmModel {
    pub r: f64,
    pub t_min: Millis,
    pub y: Millis,
}

impl RhythmModel {
    pub fn predict(&self, interval: Millis) -> Millis {
        softplus_rhythm(interval, self.r, self.t_min, self.y)
    }

    /// BPM at which 1/4 notes alternating on one column land exactly on `t_min`.
    pub fn t_min_bpm(&self) -> f64 {
        (1000.0 * 60.0) / (self.t_min * 2.0)
    }
}

/// `ln(exp(lin) + 1) + y` with `lin = r*(t - t_min)`; above `lin >= 100` the
/// linear branch is used as-is so `exp` cannot overflow. `y` is added on both branches.
pub fn softplus_rhythm(t: Millis, r: f64, t_min: Millis, y: Millis) -> Millis {
    let lin = r * (t - t_min);
    let lin = if lin < 100.0 { lin.exp().ln_1p() } else { lin };
    lin + y
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModelFit {
    pub model: RhythmModel,
    pub error: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TappingRate {
    /// `false` means `nps` is only a lower bound on what the player can sustain.
    pub is_definite: bool,
    pub nps: f64,
}

impl TappingRate {
    pub fn interval_ms(&self) -> Millis {
        1000.0 / self.nps
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingSeries {
    pub distr_t: Vec<Millis>,
    pub mean_h: Vec<Millis>,
    #[serde(default)]
    pub var_h: Vec<Millis>,
}

impl TrainingSeries {
    pub fn len(&self) -> usize {
        self.distr_t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distr_t.is_empty()
    }

    pub fn push(&mut self, stat: &IntervalStat) {
        self.distr_t.push(stat.peak_interval);
        self.mean_h.push(stat.mean_offset);
        self.var_h.push(stat.stddev_offset);
    }

    pub fn extend_from_stats(&mut self, stats: &[IntervalStat]) {
        for stat in stats {
            self.push(stat);
        }
    }

    /// `(peak_interval, mean_offset)` pairs, truncated to the shorter array.
    pub fn points(&self) -> impl Iterator<Item = (Millis, Millis)> + '_ {
        self.distr_t.iter().copied().zip(self.mean_h.iter().copied())
    }
}
