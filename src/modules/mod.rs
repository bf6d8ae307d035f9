//! Module registry.
//!
//! The registry is the business-module loader the dispatcher delegates to.
//! It owns the whitelist and hands out a fresh handler on every load; nothing
//! is cached between requests.

pub mod ucp;

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::ajax::handler::ModuleHandler;

pub use ucp::UcpModule;

/// Builds one handler instance.
pub type ModuleFactory = Box<dyn Fn() -> Arc<dyn ModuleHandler> + Send + Sync>;

pub trait ModuleRegistry: Send + Sync {
    /// Instantiates the module registered under `name`, or `None` when it is
    /// unknown or not enabled.
    fn load(&self, name: &str) -> Option<Arc<dyn ModuleHandler>>;

    /// Names of the enabled modules that take part in polling.
    fn poll_capable(&self) -> BTreeSet<String>;
}

/// In-memory registry of module factories keyed by type identity
/// (e.g. `"Voicemail"`).
#[derive(Default)]
pub struct StaticRegistry {
    factories: BTreeMap<String, ModuleFactory>,
    enabled: Option<HashSet<String>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts loading to `names`. `None` enables everything registered.
    pub fn with_whitelist(mut self, names: Option<Vec<String>>) -> Self {
        self.enabled = names.map(|n| n.into_iter().collect());
        self
    }

    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ModuleHandler> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    fn is_enabled(&self, name: &str) -> bool {
        self.enabled.as_ref().is_none_or(|set| set.contains(name))
    }
}

impl ModuleRegistry for StaticRegistry {
    fn load(&self, name: &str) -> Option<Arc<dyn ModuleHandler>> {
        if !self.is_enabled(name) {
            tracing::debug!(module = name, "Module not enabled");
            return None;
        }
        self.factories.get(name).map(|factory| factory())
    }

    fn poll_capable(&self) -> BTreeSet<String> {
        self.factories
            .iter()
            .filter(|(name, _)| self.is_enabled(name))
            .filter(|(_, factory)| factory().polls())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticRegistry")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .field("enabled", &self.enabled)
            .finish()
    }
}
