//! Built-in `UCP` core module.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::ajax::context::ModuleRequest;
use crate::ajax::handler::{HandlerResult, HookError, ModuleHandler};
use crate::config::AjaxSettings;

/// Reports the panel version; pjax clients compare it to force a full reload.
#[derive(Debug, Default)]
pub struct UcpModule;

pub fn version() -> String {
    format!("v{}", env!("CARGO_PKG_VERSION"))
}

#[async_trait]
impl ModuleHandler for UcpModule {
    fn accept(&self, command: &str, _settings: &AjaxSettings) -> Result<bool, HookError> {
        Ok(command == "version")
    }

    async fn handle(&self, request: &ModuleRequest) -> Result<HandlerResult, HookError> {
        match request.command.as_str() {
            "version" => {
                let mut body = Map::new();
                body.insert("status".to_string(), Value::Bool(true));
                body.insert("version".to_string(), Value::String(version()));
                Ok(HandlerResult::map(body))
            }
            _ => Ok(HandlerResult::flag(false)),
        }
    }
}
