use anyhow::Context;
use hitoffset_engine::{windowed_stats, WindowOptions};
use hitoffset_schema::TrainingSeries;
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Interval below which the synthetic player starts lagging.
    pub t_min: f64,
    pub sigma: f64,
    pub rounds: usize,
    pub notes: usize,
}

pub fn generate_intervals<R: Rng>(rng: &mut R, notes: usize) -> Vec<f64> {
    (0..notes).map(|_| (rng.gen_range(0..100) * 5) as f64).collect()
}

/// Offsets of a player who is on time down to `t_min` and lags by half the shortfall
/// below it.
pub fn generate_offsets<R: Rng>(rng: &mut R, intervals: &[f64], t_min: f64, noise: &Normal<f64>) -> Vec<f64> {
    intervals
        .iter()
        .map(|&i| {
            let center = if i >= t_min { 0.0 } else { 0.5 * (t_min - i) };
            center + noise.sample(rng)
        })
        .collect()
}

pub fn simulate_series<R: Rng>(
    rng: &mut R,
    params: &SimParams,
    window: &WindowOptions,
) -> anyhow::Result<TrainingSeries> {
    let noise = Normal::new(0.0, params.sigma).with_context(|| format!("invalid sigma: {}", params.sigma))?;
    let mut series = TrainingSeries::default();
    for round in 0..params.rounds {
        let intervals = generate_intervals(rng, params.notes);
        let offsets = generate_offsets(rng, &intervals, params.t_min, &noise);
        let stats = windowed_stats(&intervals, &offsets, window).with_context(|| format!("round {round}"))?;
        debug!("round {round}: {} peaks", stats.len());
        series.extend_from_stats(&stats);
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn intervals_stay_on_the_grid() {
        let mut rng = StdRng::seed_from_u64(1);
        let intervals = generate_intervals(&mut rng, 2000);
        assert!(intervals.iter().all(|i| (0.0..500.0).contains(i) && i % 5.0 == 0.0));
    }

    #[test]
    fn noiseless_offsets_follow_the_lag_rule() {
        let mut rng = StdRng::seed_from_u64(1);
        let noise = Normal::new(0.0, 0.0).unwrap();
        let offsets = generate_offsets(&mut rng, &[100.0, 160.0, 200.0], 160.0, &noise);
        assert_eq!(offsets, vec![30.0, 0.0, 0.0]);
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = SimParams {
            t_min: 150.0,
            sigma: -1.0,
            rounds: 1,
            notes: 100,
        };
        let err = simulate_series(&mut rng, &params, &WindowOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid sigma: -1"));
    }

    #[test]
    fn rounds_accumulate_into_one_series() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = SimParams {
            t_min: 162.63,
            sigma: 25.0,
            rounds: 2,
            notes: 10_000,
        };
        let series = simulate_series(&mut rng, &params, &WindowOptions::default()).unwrap();

        // 100 grid values with ~100 hits each, all of them peaks
        assert!(series.len() > 150);
        assert_eq!(series.len(), series.mean_h.len());
        assert_eq!(series.len(), series.var_h.len());
    }
}
