pub mod checker;

pub use checker::{StationStatus, StatusChecker, StatusConfig};
