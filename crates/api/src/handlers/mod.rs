pub mod metrics;
pub mod trigger;

pub use metrics::metrics_handler;
pub use trigger::trigger_handler;
