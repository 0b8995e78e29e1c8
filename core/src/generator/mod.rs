pub mod profile;

pub use profile::{GeneratorConfig, SimulatedLineGenerator};
