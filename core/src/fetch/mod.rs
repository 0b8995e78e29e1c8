pub mod fetcher;

pub use fetcher::{FetcherConfig, LineProvider, WaterfallFetcher, MIN_PAYLOAD_BYTES};
