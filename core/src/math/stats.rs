pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().copied().fold(0.0, f32::max)
    }
}
