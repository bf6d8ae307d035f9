//! Control-panel context shared by every request.
//!
//! Holds configuration, the business-module registry, the core module
//! definitions and the set of type identities the panel already defines.
//! It is built once at startup and passed explicitly; it holds no
//! per-request state.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::ajax::handler::ModuleHandler;
use crate::config::{AjaxSettings, Config};
use crate::modules::{ModuleFactory, ModuleRegistry};

/// Identities the panel itself defines. A non-reserved module whose
/// title-cased name collides with one of these is refused.
const PANEL_IDENTITIES: [&str; 4] = ["Ajax", "Modules", "UCP", "UCP_Helpers"];

pub struct PanelContext {
    config: Config,
    registry: Arc<dyn ModuleRegistry>,
    core: HashMap<String, ModuleFactory>,
    identities: HashSet<String>,
}

impl PanelContext {
    pub fn new(config: Config, registry: Arc<dyn ModuleRegistry>) -> Self {
        Self {
            config,
            registry,
            core: HashMap::new(),
            identities: PANEL_IDENTITIES.iter().map(|s| s.to_ascii_lowercase()).collect(),
        }
    }

    /// Registers the definition backing a reserved module (`UCP` or `User`).
    /// The identity counts as defined from then on.
    pub fn with_core_module<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ModuleHandler> + Send + Sync + 'static,
    {
        let name = name.into();
        self.identities.insert(name.to_ascii_lowercase());
        self.core.insert(name, Box::new(factory));
        self
    }

    /// Marks an extra type identity as already defined.
    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identities.insert(identity.to_ascii_lowercase());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &AjaxSettings {
        &self.config.ajax
    }

    pub fn registry(&self) -> &Arc<dyn ModuleRegistry> {
        &self.registry
    }

    /// Instantiates the core definition for `identity`, if one exists.
    pub fn core_module(&self, identity: &str) -> Option<Arc<dyn ModuleHandler>> {
        self.core.get(identity).map(|factory| factory())
    }

    /// Identities compare case-insensitively.
    pub fn is_defined(&self, identity: &str) -> bool {
        self.identities.contains(&identity.to_ascii_lowercase())
    }
}

impl fmt::Debug for PanelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelContext")
            .field("config", &self.config)
            .field("core", &self.core.keys().collect::<Vec<_>>())
            .field("identities", &self.identities)
            .finish()
    }
}
