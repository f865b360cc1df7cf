//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router and handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (dispatch counters and latency histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every dispatch log event
//! - HTTP spans come from tower-http's TraceLayer

pub mod logging;
pub mod metrics;
