use std::sync::Arc;

use ucp_ajax::ajax::Dispatcher;
use ucp_ajax::config::Config;
use ucp_ajax::modules::{StaticRegistry, UcpModule};
use ucp_ajax::panel::PanelContext;
use ucp_ajax::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let registry = StaticRegistry::new().with_whitelist(cfg.modules.enabled.clone());
    let panel = PanelContext::new(cfg.clone(), Arc::new(registry))
        .with_core_module("UCP", || Arc::new(UcpModule));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(panel)));

    tokio::select! {
        res = server::listener::run(&cfg.server, dispatcher) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
