use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use crate::config::MilterConfig;
use crate::error::Result;
use crate::protocol::dispatcher::MilterFactory;
use crate::protocol::session::{serve_connection, SessionConfig};
use crate::utils::metrics::global_metrics;

/// Start the milter listener, stopping on CTRL+C.
#[instrument(skip(config, factory), fields(address = %config.server.address))]
pub async fn start_server<F: MilterFactory>(config: &MilterConfig, factory: Arc<F>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received CTRL+C signal, shutting down");
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                error!(error = %e, "Unable to listen for CTRL+C, running until killed");
                // Dropping the sender would read as a shutdown request
                shutdown_tx.closed().await;
            }
        }
    });

    let listener = TcpListener::bind(&config.server.address).await?;
    serve(listener, config, factory, shutdown_rx).await
}

/// Accept sessions on `listener` until `shutdown_rx` receives a message.
///
/// A closed channel is not a shutdown request; the server keeps running.
///
/// At most `max_connections` sessions run at once; connections beyond that
/// are closed without a reply, which the MTA treats per its milter default
/// action.
pub async fn serve<F: MilterFactory>(
    listener: TcpListener,
    config: &MilterConfig,
    factory: Arc<F>,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let local = listener.local_addr()?;
    info!(address = %local, "Listening");

    let max_connections = config.server.max_connections.max(1);
    let slots = Arc::new(Semaphore::new(max_connections));
    let session_config = SessionConfig::from(config);

    loop {
        tokio::select! {
            Some(()) = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for sessions to close...");
                drain(&slots, max_connections, config).await;
                global_metrics().log_metrics();
                return Ok(());
            }

            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => admit(stream, peer, &slots, &factory, session_config),
                    Err(e) => error!(error = %e, "Error accepting connection"),
                }
            }
        }
    }
}

fn admit<F: MilterFactory>(
    stream: TcpStream,
    peer: SocketAddr,
    slots: &Arc<Semaphore>,
    factory: &Arc<F>,
    session_config: SessionConfig,
) {
    let metrics = global_metrics();

    let Ok(permit) = slots.clone().try_acquire_owned() else {
        warn!(peer = %peer, "Session limit reached, dropping connection");
        metrics.connection_rejected();
        return;
    };

    info!(peer = %peer, "Connection established");
    metrics.connection_established();

    let factory = Arc::clone(factory);
    tokio::spawn(async move {
        let peer = peer.to_string();
        if let Err(e) = serve_connection(stream, factory, session_config, &peer).await {
            warn!(peer = %peer, error = %e, "Session aborted");
            metrics.protocol_error();
        }
        metrics.connection_closed();
        drop(permit);
    });
}

async fn drain(slots: &Semaphore, max_connections: usize, config: &MilterConfig) {
    let all = u32::try_from(max_connections).unwrap_or(u32::MAX);
    match tokio::time::timeout(config.server.shutdown_timeout, slots.acquire_many(all)).await {
        Ok(_) => debug!("All sessions closed"),
        Err(_) => warn!(
            active = global_metrics().snapshot().connections_active,
            "Shutdown timeout reached, forcing exit"
        ),
    }
}
