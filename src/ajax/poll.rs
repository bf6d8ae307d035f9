//! Poll fan-out across every poll-capable module.
//!
//! Poll hooks run concurrently. Results are merged by module name, so the
//! output does not depend on completion order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinSet;

use crate::ajax::error::DispatchError;
use crate::ajax::handler::HookError;
use crate::modules::ModuleRegistry;

pub struct PollAggregator<'a> {
    registry: &'a dyn ModuleRegistry,
}

impl<'a> PollAggregator<'a> {
    pub fn new(registry: &'a dyn ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Returns `{"status": true, "modData": {<module>: <poll result>, ...}}`.
    ///
    /// Any failing poll hook fails the whole poll with
    /// [`DispatchError::GenericFailure`].
    pub async fn poll(&self, data: Value) -> Result<Value, DispatchError> {
        let data = Arc::new(data);
        let mut tasks = JoinSet::new();

        for name in self.registry.poll_capable() {
            let Some(handler) = self.registry.load(&name) else {
                tracing::warn!(module = %name, "Poll-capable module failed to load, skipping");
                continue;
            };
            let data = Arc::clone(&data);
            tasks.spawn(async move {
                let result = handler.poll(&data).await;
                (name, result)
            });
        }

        let mut mod_data = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined.map_err(|e| {
                tracing::error!(error = %e, "Poll task panicked");
                DispatchError::GenericFailure
            })?;

            match result {
                Ok(value) => {
                    mod_data.insert(name, value);
                }
                Err(HookError::Unsupported(hook)) => {
                    tracing::error!(module = %name, hook = %hook, "Poll-capable module has no poll hook");
                    return Err(DispatchError::GenericFailure);
                }
                Err(HookError::Failed(e)) => {
                    tracing::error!(module = %name, error = %e, "Poll failed");
                    return Err(DispatchError::GenericFailure);
                }
            }
        }

        tracing::debug!(modules = mod_data.len(), "Poll aggregated");
        Ok(json!({ "status": true, "modData": mod_data }))
    }
}
