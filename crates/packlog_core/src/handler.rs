//! Format-handler contract and dispatch.
//!
//! A [`FormatHandler`] is a pluggable per-format strategy with exactly two
//! operations: `package` reduces a modified asset to a delta against the
//! baseline during diff generation, and `merge` combines an incoming delta
//! with the currently-accumulated content during merging. Both receive the
//! fixed two-input [`PriorityPair`], never an open-ended list, and must be
//! deterministic for the same inputs.
//!
//! The [`HandlerRegistry`] maps lower-cased extensions to handler instances.
//! It is built once at startup and never mutated during processing; absence
//! of a handler is a routing signal ("treat as atomic, last-priority-wins"),
//! not an error.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure signalled by a handler on malformed input.
///
/// Propagates to the asset-processing boundary, where the caller applies the
/// whole-content fallback instead of aborting the run.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The two prioritized inputs every handler operation receives.
///
/// During packaging: `base` is the baseline content (priority 0), `over` the
/// mod's modified content (priority 1). During merging: `base` is the
/// currently-accumulated destination content, `over` the incoming changelog
/// delta.
#[derive(Debug, Clone, Copy)]
pub struct PriorityPair<'a> {
    /// Priority 0 input.
    pub base: &'a [u8],
    /// Priority 1 input.
    pub over: &'a [u8],
}

/// Per-format diff/merge strategy. See the module docs for the contract.
///
/// Sequential pairwise application across N mods in priority order is assumed
/// to match a single N-way merge; this property is expected of conforming
/// handlers, not enforced.
pub trait FormatHandler: Send + Sync {
    /// Reduce `inputs.over` to a delta relative to `inputs.base`.
    fn package(&self, key: &str, inputs: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError>;

    /// Combine the delta `inputs.over` into the accumulated `inputs.base`.
    fn merge(&self, key: &str, inputs: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError>;
}

/// Extension → handler lookup. Immutable once processing starts.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FormatHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an extension. Later registrations for the same
    /// extension replace earlier ones.
    pub fn register(&mut self, extension: &str, handler: Arc<dyn FormatHandler>) {
        self.handlers.insert(Self::normalize(extension), handler);
    }

    /// Look up the handler for an extension.
    ///
    /// The extension is lower-cased and a leading dot is stripped before the
    /// lookup. `None` means the asset is atomic whole-content.
    pub fn get(&self, extension: &str) -> Option<&dyn FormatHandler> {
        self.handlers.get(&Self::normalize(extension)).map(|h| &**h)
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn normalize(extension: &str) -> String {
        extension.trim_start_matches('.').to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl FormatHandler for Upper {
        fn package(&self, _key: &str, inputs: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError> {
            Ok(inputs.over.to_ascii_uppercase())
        }

        fn merge(&self, _key: &str, inputs: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError> {
            let mut out = inputs.base.to_vec();
            out.extend_from_slice(inputs.over);
            Ok(out)
        }
    }

    #[test]
    fn test_lookup_normalizes_extension() {
        let mut registry = HandlerRegistry::new();
        registry.register("bgyml", Arc::new(Upper));

        assert!(registry.get("bgyml").is_some());
        assert!(registry.get(".bgyml").is_some());
        assert!(registry.get("BGYML").is_some());
        assert!(registry.get(".BgYml").is_some());
        assert!(registry.get("byml").is_none());
    }

    #[test]
    fn test_absence_is_not_an_error() {
        let registry = HandlerRegistry::new();
        assert!(registry.get("anything").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_runs_registered_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register("txt", Arc::new(Upper));

        let handler = registry.get("txt").unwrap();
        let out = handler
            .package("a.txt", PriorityPair { base: b"old", over: b"new" })
            .unwrap();
        assert_eq!(out, b"NEW");
    }
}
