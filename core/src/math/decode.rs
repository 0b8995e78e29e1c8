use serde::{Deserialize, Serialize};

/// Mapping from one unsigned dB-scaled byte to linear magnitude:
/// `10^((byte - offset) / range)`, clamped to `[0, 1]`.
///
/// The default (128, 40) matches the common 8-bit waterfall convention seen
/// on amateur receivers. It is an empirical default, not a guarantee that
/// every station software family scales its bytes the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodeProfile {
    pub offset: f32,
    pub range: f32,
}

impl DecodeProfile {
    pub const DEFAULT: DecodeProfile = DecodeProfile {
        offset: 128.0,
        range: 40.0,
    };

    pub fn to_linear(&self, byte: u8) -> f32 {
        let value = 10f32.powf((byte as f32 - self.offset) / self.range);
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else if value > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

impl Default for DecodeProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decodes one magnitude per byte.
pub fn decode_magnitudes(bytes: &[u8], profile: DecodeProfile) -> Vec<f32> {
    bytes.iter().map(|&byte| profile.to_linear(byte)).collect()
}
