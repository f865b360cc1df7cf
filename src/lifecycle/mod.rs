//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build bindings → Start listener
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain in-flight dispatches → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then bindings, then listener
//! - Graceful shutdown lets streaming bodies finish

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
