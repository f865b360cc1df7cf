//! In-process binding implementations.
//!
//! These back the bindings named in the configuration file when the bridge
//! runs standalone, and serve as fixtures in tests. State lives only for the
//! lifetime of the process.

pub mod kv;
pub mod queue;
pub mod r2;

pub use kv::MemoryKv;
pub use queue::MemoryQueue;
pub use r2::MemoryObjectStore;
