//! Logging and metrics bootstrap

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
