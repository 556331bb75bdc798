//! Backend registry for resolving backends by name.
//!
//! Names are resolved in two steps: exact names (case-insensitive), then
//! pattern matchers in registration order. Remote devices use matchers since
//! their names are open-ended device ARNs.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::backend::{Backend, BackendConfig, BackendFactory};
use crate::error::{HalError, HalResult};

/// Factory function type for backends.
type Factory = Box<dyn Fn(BackendConfig) -> HalResult<Box<dyn Backend>> + Send + Sync>;

/// Predicate deciding whether a matcher handles a backend name.
type Matcher = Box<dyn Fn(&str) -> bool + Send + Sync>;

struct MatcherEntry {
    label: String,
    matches: Matcher,
    factory: Factory,
}

/// Central registry for quantum backends.
#[derive(Default)]
pub struct BackendRegistry {
    /// Factories keyed by lower-cased name.
    builtins: FxHashMap<String, Factory>,
    matchers: Vec<MatcherEntry>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend type under an exact name.
    pub fn register<B>(&mut self, name: impl Into<String>)
    where
        B: BackendFactory + 'static,
    {
        self.register_factory(name, |config| {
            let backend = B::from_config(config)?;
            Ok(Box::new(backend))
        });
    }

    /// Register a backend factory under an exact name.
    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(BackendConfig) -> HalResult<Box<dyn Backend>> + Send + Sync + 'static,
    ) {
        let name = name.into().to_ascii_lowercase();
        debug!("Registering backend: {}", name);
        self.builtins.insert(name, Box::new(factory));
    }

    /// Register a factory for every name `matches` accepts.
    pub fn register_matcher(
        &mut self,
        label: impl Into<String>,
        matches: impl Fn(&str) -> bool + Send + Sync + 'static,
        factory: impl Fn(BackendConfig) -> HalResult<Box<dyn Backend>> + Send + Sync + 'static,
    ) {
        let label = label.into();
        debug!("Registering backend matcher: {}", label);
        self.matchers.push(MatcherEntry {
            label,
            matches: Box::new(matches),
            factory: Box::new(factory),
        });
    }

    /// Create a backend by name.
    pub fn create(&self, name: &str, config: BackendConfig) -> HalResult<Box<dyn Backend>> {
        if let Some(factory) = self.builtins.get(&name.to_ascii_lowercase()) {
            return factory(config);
        }

        if let Some(entry) = self.matchers.iter().find(|m| (m.matches)(name)) {
            debug!(backend = %name, matcher = %entry.label, "resolved backend by matcher");
            return (entry.factory)(config);
        }

        Err(HalError::BackendUnavailable(format!(
            "No backend registered with name '{name}'"
        )))
    }

    /// List exact backend names and matcher labels, sorted.
    pub fn available_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .builtins
            .keys()
            .cloned()
            .chain(self.matchers.iter().map(|m| m.label.clone()))
            .collect();
        names.sort();
        names
    }

    /// Check if a backend name resolves.
    pub fn has_backend(&self, name: &str) -> bool {
        self.builtins.contains_key(&name.to_ascii_lowercase())
            || self.matchers.iter().any(|m| (m.matches)(name))
    }
}
