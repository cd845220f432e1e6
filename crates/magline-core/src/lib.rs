//! Magline Core - Common infrastructure for the MAG pipelines
//!
//! Logging, progress reporting, shutdown handling, and the small task pool
//! used to build several file indexes at once.

pub mod logging;
pub mod pool;
pub mod progress;
pub mod shutdown;

// Re-exports for convenience
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use pool::{default_workers, run_tasks};
pub use progress::{ProgressContext, fmt_num, pct};
pub use shutdown::{install_signal_handlers, is_shutdown_requested};
