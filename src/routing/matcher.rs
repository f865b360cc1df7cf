//! Selector extraction and capability matching.
//!
//! # Responsibilities
//! - Read the module and binding-name selector headers
//! - Check a resolved binding against the module the caller claims
//!
//! # Design Decisions
//! - Selector values are matched exactly (case-sensitive)
//! - Capability is the enum variant chosen at registration; no runtime
//!   type inspection

use axum::http::HeaderMap;

use crate::bindings::{Binding, Module};
use crate::headers;
use crate::routing::DispatchError;

/// The `(module, name)` pair a request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub module: String,
    pub name: String,
}

impl Selector {
    /// Both selector headers must be present and non-empty.
    pub fn from_headers(map: &HeaderMap) -> Result<Self, DispatchError> {
        let read = |name: &axum::http::HeaderName, label: &'static str| {
            map.get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(DispatchError::MissingSelector(label))
        };
        Ok(Self {
            module: read(&headers::BINDING_MODULE, "X-BRIDGE-BINDING-MODULE")?,
            name: read(&headers::BINDING_NAME, "X-BRIDGE-BINDING-NAME")?,
        })
    }
}

/// Verify that `binding` was registered as the module the selector names.
pub fn check_capability(selector: &Selector, binding: &Binding) -> Result<Module, DispatchError> {
    let claimed: Module = selector
        .module
        .parse()
        .map_err(|_| DispatchError::UnknownModule(selector.module.clone()))?;
    let actual = binding.module();
    if claimed != actual {
        return Err(DispatchError::ModuleMismatch {
            name: selector.name.clone(),
            claimed,
            actual,
        });
    }
    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryKv, MemoryObjectStore};
    use axum::http::HeaderValue;
    use std::sync::Arc;

    fn selector_headers(module: Option<&'static str>, name: Option<&'static str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(m) = module {
            map.insert(headers::BINDING_MODULE, HeaderValue::from_static(m));
        }
        if let Some(n) = name {
            map.insert(headers::BINDING_NAME, HeaderValue::from_static(n));
        }
        map
    }

    #[test]
    fn test_selector_requires_both_headers() {
        let selector = Selector::from_headers(&selector_headers(Some("R2"), Some("BUCKET"))).unwrap();
        assert_eq!(selector.module, "R2");
        assert_eq!(selector.name, "BUCKET");

        assert!(matches!(
            Selector::from_headers(&selector_headers(None, Some("BUCKET"))),
            Err(DispatchError::MissingSelector("X-BRIDGE-BINDING-MODULE"))
        ));
        assert!(matches!(
            Selector::from_headers(&selector_headers(Some("R2"), Some(""))),
            Err(DispatchError::MissingSelector("X-BRIDGE-BINDING-NAME"))
        ));
    }

    #[test]
    fn test_capability_check() {
        let bucket = Binding::R2(Arc::new(MemoryObjectStore::new()));
        let cache = Binding::Kv(Arc::new(MemoryKv::new()));
        let selector = Selector {
            module: "R2".into(),
            name: "BUCKET".into(),
        };

        assert_eq!(check_capability(&selector, &bucket).unwrap(), Module::R2);
        assert!(matches!(
            check_capability(&selector, &cache),
            Err(DispatchError::ModuleMismatch {
                claimed: Module::R2,
                actual: Module::Kv,
                ..
            })
        ));

        let bogus = Selector {
            module: "BOGUS".into(),
            name: "BUCKET".into(),
        };
        assert!(matches!(
            check_capability(&bogus, &bucket),
            Err(DispatchError::UnknownModule(m)) if m == "BOGUS"
        ));
    }
}
