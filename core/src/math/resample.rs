/// Fits a decoded row onto `bins` slots. Shrinking keeps the strongest value
/// of each span (max-hold), stretching repeats the nearest source sample.
pub fn resample_bins(samples: &[f32], bins: usize) -> Vec<f32> {
    if bins == 0 {
        return Vec::new();
    }
    if samples.is_empty() {
        return vec![0.0; bins];
    }
    if samples.len() == bins {
        return samples.to_vec();
    }

    let len = samples.len();
    (0..bins)
        .map(|bin| {
            let start = bin * len / bins;
            let end = ((bin + 1) * len / bins).max(start + 1).min(len);
            samples[start..end]
                .iter()
                .copied()
                .fold(f32::MIN, f32::max)
        })
        .collect()
}
