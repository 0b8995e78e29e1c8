use crate::prelude::{FrequencyWindow, LineOrigin, WaterfallLine};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const SUB_BAND_HZ: f64 = 1_000_000.0;
/// FT8 sits 74 kHz above each whole MHz.
const DIGITAL_OFFSET: f64 = 0.074;
const DIGITAL_HALF_WIDTH_HZ: f64 = 1_500.0;
/// Morse activity crowds the bottom 50 kHz of each MHz.
const CW_SEGMENT_HZ: f64 = 50_000.0;

/// Shape of the synthetic spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub noise_floor: (f32, f32),
    pub jitter: f32,
    /// Fractional window positions of persistent activity.
    pub clusters: Vec<f64>,
    pub cluster_width: f64,
    pub cluster_strength: (f32, f32),
    pub digital_strength: (f32, f32),
    pub cw_probability: f64,
    pub transient_probability: f64,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            noise_floor: (0.10, 0.20),
            jitter: 0.05,
            clusters: vec![0.08, 0.21, 0.37, 0.52, 0.68, 0.86],
            cluster_width: 0.012,
            cluster_strength: (0.25, 0.45),
            digital_strength: (0.35, 0.60),
            cw_probability: 0.08,
            transient_probability: 0.02,
            seed: None,
        }
    }
}

/// Failure-free source of plausible waterfall lines, used whenever a station
/// cannot supply real data.
pub struct SimulatedLineGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl SimulatedLineGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(GeneratorConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    /// Produces exactly `bins` samples spanning `freq_start_hz..freq_end_hz`.
    /// An empty or inverted window yields a zero-width line rather than an
    /// error.
    pub fn generate(
        &mut self,
        freq_start_hz: f64,
        freq_end_hz: f64,
        bins: usize,
    ) -> WaterfallLine {
        let window =
            FrequencyWindow::new(freq_start_hz, freq_end_hz).unwrap_or(FrequencyWindow {
                min_hz: freq_start_hz,
                max_hz: freq_start_hz,
            });
        let step_hz = window.step_hz(bins);
        let floor = sample_range(&mut self.rng, self.config.noise_floor);
        let strengths: Vec<f32> = (0..self.config.clusters.len())
            .map(|_| sample_range(&mut self.rng, self.config.cluster_strength))
            .collect();
        let cw_chance = self.config.cw_probability.clamp(0.0, 1.0);
        let transient_chance = self.config.transient_probability.clamp(0.0, 1.0);

        let mut samples = Vec::with_capacity(bins);
        for bin in 0..bins {
            let position = (bin as f64 + 0.5) / bins as f64;
            let freq_hz = window.min_hz + (bin as f64 + 0.5) * step_hz;
            let mut value = floor + self.rng.gen::<f32>() * self.config.jitter;

            value += self.cluster_energy(position, &strengths);

            let offset_hz = freq_hz.rem_euclid(SUB_BAND_HZ);
            let tolerance_hz = (step_hz / 2.0).max(DIGITAL_HALF_WIDTH_HZ);
            if (offset_hz - DIGITAL_OFFSET * SUB_BAND_HZ).abs() <= tolerance_hz {
                value += sample_range(&mut self.rng, self.config.digital_strength);
            }
            if offset_hz < CW_SEGMENT_HZ && self.rng.gen_bool(cw_chance) {
                value += self.rng.gen_range(0.3..0.7);
            }
            if self.rng.gen_bool(transient_chance) {
                value += self.rng.gen::<f32>();
            }

            samples.push(value.min(1.0));
        }

        WaterfallLine::stamped(window, samples, LineOrigin::Simulated)
    }

    fn cluster_energy(&self, position: f64, strengths: &[f32]) -> f32 {
        let width = self.config.cluster_width.max(f64::EPSILON);
        self.config
            .clusters
            .iter()
            .zip(strengths)
            .map(|(center, strength)| {
                let distance = (position - center) / width;
                let falloff = (-distance * distance).exp();
                if falloff > 0.01 {
                    strength * falloff as f32
                } else {
                    0.0
                }
            })
            .sum()
    }
}

impl Default for SimulatedLineGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

fn sample_range(rng: &mut StdRng, (low, high): (f32, f32)) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
