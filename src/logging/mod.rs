//! Logging infrastructure for plain-text console output.

mod logger;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::{LOG_ENV, init_subscriber};
pub use types::{DRY_RUN_TARGET, Log, STAGE_SPAN, STAGE_TARGET};
