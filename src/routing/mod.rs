//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming dispatch (X-BRIDGE-BINDING-MODULE, X-BRIDGE-BINDING-NAME)
//!     → matcher.rs (selector extraction)          missing      → 400
//!     → BindingTable lookup                        absent       → 400
//!     → matcher.rs (capability check)              unknown/mismatch → 404
//!     → handlers (decode envelope, call binding)   unsupported  → 404
//!                                                  binding error → 500
//! ```
//!
//! # Design Decisions
//! - The binding table is built at startup and passed in explicitly
//! - Deterministic: same selectors always resolve to the same binding
//! - Failures are plain-text bodies; binding failures also carry their kind

pub mod error;
pub mod matcher;
pub mod router;

pub use error::DispatchError;
pub use matcher::Selector;
pub use router::Router;
