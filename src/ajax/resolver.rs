//! Module name to handler resolution.
//!
//! Rules, in order:
//!
//! 1. The name is title-cased (first character upper-cased) into a type
//!    identity.
//! 2. Unless the name is exactly `UCP` or `User`, an identity that is already
//!    defined is refused with [`DispatchError::ModuleAlreadyLoaded`]. This
//!    stops a caller from aliasing a privileged identity through dispatch.
//! 3. `UCP` and `User` load only from their core definitions, and never when
//!    the name contains a `.`.
//! 4. Everything else goes to the module registry.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::ajax::error::DispatchError;
use crate::ajax::handler::ModuleHandler;
use crate::ajax::upper_first;
use crate::panel::PanelContext;

pub const RESERVED_MODULES: [&str; 2] = ["UCP", "User"];

/// A resolved module. No hook has been called on it yet.
#[derive(Clone)]
pub struct ModuleHandle {
    pub name: String,
    pub handler: Arc<dyn ModuleHandler>,
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle").field("name", &self.name).finish()
    }
}

/// Request-scoped resolver. Identities it loads count as defined for the
/// rest of the request.
pub struct ModuleResolver<'a> {
    panel: &'a PanelContext,
    loaded: HashSet<String>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(panel: &'a PanelContext) -> Self {
        Self {
            panel,
            loaded: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, module: &str) -> Result<ModuleHandle, DispatchError> {
        let identity = type_identity(module);
        let reserved = RESERVED_MODULES.contains(&module);

        if !reserved && self.is_defined(&identity) {
            tracing::warn!(module, identity = %identity, "Refusing to alias an existing identity");
            return Err(DispatchError::ModuleAlreadyLoaded(module.to_string()));
        }

        let handler = if reserved {
            if module.contains('.') {
                return Err(DispatchError::InvalidModule(module.to_string()));
            }
            self.panel
                .core_module(&identity)
                .ok_or_else(|| DispatchError::InvalidModule(module.to_string()))?
        } else {
            self.panel
                .registry()
                .load(&identity)
                .ok_or_else(|| DispatchError::ModuleNotFound(module.to_string()))?
        };

        self.loaded.insert(identity.to_ascii_lowercase());
        tracing::debug!(module, identity = %identity, "Module resolved");

        Ok(ModuleHandle {
            name: identity,
            handler,
        })
    }

    fn is_defined(&self, identity: &str) -> bool {
        self.panel.is_defined(identity) || self.loaded.contains(&identity.to_ascii_lowercase())
    }
}

/// Upper-cases the first character only: `"voicemail"` becomes `"Voicemail"`,
/// `"ucp"` becomes `"Ucp"`.
pub fn type_identity(module: &str) -> String {
    upper_first(module)
}
