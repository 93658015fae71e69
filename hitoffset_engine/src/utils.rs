use std::collections::HashMap;
use std::f64::consts::PI;

pub use hitoffset_schema::softplus_rhythm;

/// Gaussian density. Yields NaN/inf for `stddev == 0`; callers check for zero variance first.
pub fn normal_pdf(x: f64, mean: f64, stddev: f64) -> f64 {
    1.0 / (stddev * (2.0 * PI).sqrt()) * (-0.5 * ((x - mean) / stddev).powi(2)).exp()
}

pub fn softplus_rhythm_all(t: &[f64], r: f64, t_min: f64, y: f64) -> Vec<f64> {
    t.iter().map(|&t| softplus_rhythm(t, r, t_min, y)).collect()
}

/// `[5, 5, 5, 7, 7]` gives `[0, 1, 2, 0, 1]`. Used to stack identical points in scatter
/// views; it is not a count.
pub fn frequency_rank_histogram(values: &[f64]) -> Vec<usize> {
    let mut seen: HashMap<u64, usize> = HashMap::with_capacity(values.len());
    values
        .iter()
        .map(|v| {
            let rank = seen.entry(key(*v)).or_insert(0);
            let out = *rank;
            *rank += 1;
            out
        })
        .collect()
}

pub fn value_counts(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for v in values {
        counts.entry(key(*v)).or_insert((*v, 0)).1 += 1;
    }

    let mut pairs: Vec<(f64, usize)> = counts.into_values().collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn stddev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

// -0.0 and 0.0 collapse onto one bucket.
fn key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}
