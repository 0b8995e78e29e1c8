pub mod decode;
pub mod resample;
pub mod stats;

pub use decode::{decode_magnitudes, DecodeProfile};
pub use resample::resample_bins;
pub use stats::StatsHelper;
