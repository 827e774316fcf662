pub mod config;
pub mod errors;
pub mod fetch;
pub mod metrics;
pub mod search;

pub use config::ScoutConfig;
pub use errors::{FetchError, ScoutError, ScoutResult};
pub use fetch::{Fetcher, UrlFetcher};
pub use metrics::RunSummary;
pub use search::{run, run_with_config, ShutdownSignal};
