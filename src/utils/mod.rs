//! # Utility Modules
//!
//! Supporting utilities for logging, timing and metrics.
//!
//! ## Components
//! - **Logging**: Structured logging configuration
//! - **Timeout**: Deadlines and async timeout wrappers
//! - **Metrics**: Thread-safe datagram counters

pub mod logging;
pub mod metrics;
pub mod timeout;

pub use metrics::{Metrics, MetricsSnapshot};
