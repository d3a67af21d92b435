use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use super::{AppContext, server};

/// A bound but not yet serving listener; lets tests discover the local
/// address before the accept loop starts.
pub struct BoundListener {
    listener: TcpListener,
    app: AppContext,
}

impl BoundListener {
    pub async fn bind(app: AppContext) -> Result<Self> {
        let bind_addr = app.settings.listen;
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind listener on {bind_addr}"))?;
        Ok(Self { listener, app })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    pub async fn serve(self) -> Result<()> {
        info!(address = %self.local_addr()?, "proxy listener started");
        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(err) => {
                    error!(error = %err, "failed to accept incoming connection");
                    continue;
                }
            };
            debug!(peer = %peer_addr, "accepted connection");
            if let Err(err) = stream.set_nodelay(true) {
                debug!(peer = %peer_addr, error = %err, "failed to set TCP_NODELAY");
            }
            let connection_app = self.app.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, peer_addr, connection_app).await {
                    debug!(peer = %peer_addr, error = %err, "connection closed with error");
                }
            });
        }
    }
}

pub async fn start_listener(app: AppContext) -> Result<()> {
    BoundListener::bind(app).await?.serve().await
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, app: AppContext) -> Result<()> {
    server::handle_connection(stream, peer, app).await
}
