//! Binding subsystem.
//!
//! # Data Flow
//! ```text
//! Host process (startup):
//!     concrete bindings (memory stores, HttpFetcher, host D1)
//!     → BindingTable::builder().r2(name, store)...build()
//!     → Arc<BindingTable> handed to the router
//!
//! Per dispatch:
//!     X-BRIDGE-BINDING-NAME → BindingTable::get(name)
//!     → Binding (variant tag = module it was registered as)
//! ```
//!
//! # Design Decisions
//! - Each binding carries its module as an enum variant chosen at
//!   registration; the router never inspects runtime types
//! - The table is immutable after construction and shared without locks

pub mod d1;
pub mod error;
pub mod kv;
pub mod queue;
pub mod r2;
pub mod service;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use d1::Database;
pub use error::{BindingError, BindingResult, ErrorKind};
pub use kv::KvNamespace;
pub use queue::Queue;
pub use r2::ObjectStore;
pub use service::{Fetcher, HttpFetcher};

/// Binding kinds the bridge can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Module {
    Kv,
    R2,
    D1,
    Service,
    Queue,
}

impl Module {
    pub const ALL: [Module; 5] = [Module::Kv, Module::R2, Module::D1, Module::Service, Module::Queue];

    /// Selector value used in `X-BRIDGE-BINDING-MODULE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Kv => "KV",
            Module::R2 => "R2",
            Module::D1 => "D1",
            Module::Service => "SERVICE",
            Module::Queue => "QUEUE",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized module selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown binding module: {0}")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    /// Selectors are matched exactly (case-sensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

/// A host-provided binding, tagged with its module.
#[derive(Clone)]
pub enum Binding {
    Kv(Arc<dyn KvNamespace>),
    R2(Arc<dyn ObjectStore>),
    D1(Arc<dyn Database>),
    Service(Arc<dyn Fetcher>),
    Queue(Arc<dyn Queue>),
}

impl Binding {
    pub fn module(&self) -> Module {
        match self {
            Binding::Kv(_) => Module::Kv,
            Binding::R2(_) => Module::R2,
            Binding::D1(_) => Module::D1,
            Binding::Service(_) => Module::Service,
            Binding::Queue(_) => Module::Queue,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.module()).finish()
    }
}

/// Named bindings available to the router.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    bindings: HashMap<String, Binding>,
}

impl BindingTable {
    pub fn builder() -> BindingTableBuilder {
        BindingTableBuilder::default()
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// `(name, module)` pairs sorted by name.
    pub fn entries(&self) -> Vec<(&str, Module)> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, b)| (name.as_str(), b.module()))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries
    }
}

/// Builder for [`BindingTable`]. Later registrations replace earlier ones.
#[derive(Debug, Default)]
pub struct BindingTableBuilder {
    bindings: HashMap<String, Binding>,
}

impl BindingTableBuilder {
    pub fn binding(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn kv(self, name: impl Into<String>, kv: Arc<dyn KvNamespace>) -> Self {
        self.binding(name, Binding::Kv(kv))
    }

    pub fn r2(self, name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.binding(name, Binding::R2(store))
    }

    pub fn d1(self, name: impl Into<String>, db: Arc<dyn Database>) -> Self {
        self.binding(name, Binding::D1(db))
    }

    pub fn service(self, name: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        self.binding(name, Binding::Service(fetcher))
    }

    pub fn queue(self, name: impl Into<String>, queue: Arc<dyn Queue>) -> Self {
        self.binding(name, Binding::Queue(queue))
    }

    pub fn build(self) -> BindingTable {
        BindingTable {
            bindings: self.bindings,
        }
    }
}
