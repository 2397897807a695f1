//! # Utility Modules
//!
//! Supporting utilities for logging, timing and observability.
//!
//! ## Components
//! - **Logging**: tracing subscriber setup from [`crate::config::LoggingConfig`]
//! - **Timeout**: read deadlines and shutdown grace periods
//! - **Metrics**: process-wide atomic counters

pub mod logging;
pub mod metrics;
pub mod timeout;
