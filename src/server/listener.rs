use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::ajax::Dispatcher;
use crate::config::ServerConfig;
use crate::http::connection::Connection;

pub async fn run(cfg: &ServerConfig, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("Listening on {}", cfg.listen_addr);

    serve(listener, dispatcher, cfg).await
}

/// Accept loop over an already bound listener, one task per connection.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    cfg: &ServerConfig,
) -> anyhow::Result<()> {
    let request_timeout = cfg.request_timeout();

    loop {
        let (socket, peer) = listener.accept().await?;
        tracing::debug!("Accepted connection from {}", peer);

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, dispatcher, request_timeout);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
