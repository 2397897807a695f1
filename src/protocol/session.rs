//! Per-connection state machine.
//!
//! A [`Session`] owns the framer and the current handler. It is pure: bytes go
//! in through [`Session::feed`], framed replies come out of
//! [`Session::process`]. [`serve_connection`] drives it over an async transport.

use crate::config::MilterConfig;
use crate::core::codec::{Framer, PacketCodec};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dispatcher::{dispatch, Dispatch, MilterFactory};
use crate::utils::metrics::global_metrics;
use crate::utils::timeout::with_timeout_error;
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

/// Limits applied to one connection.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub read_chunk_size: usize,
    pub read_timeout: Duration,
    pub max_payload_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&MilterConfig::default())
    }
}

impl From<&MilterConfig> for SessionConfig {
    fn from(config: &MilterConfig) -> Self {
        Self {
            read_chunk_size: config.transport.read_chunk_size,
            read_timeout: config.server.read_timeout,
            max_payload_size: config.transport.max_payload_size,
        }
    }
}

pub struct Session<F: MilterFactory> {
    factory: Arc<F>,
    milter: F::Milter,
    framer: Framer,
    codec: PacketCodec,
    state: SessionState,
}

impl<F: MilterFactory> Session<F> {
    pub fn new(factory: Arc<F>, max_payload_size: usize) -> Self {
        let milter = factory.create();
        Self {
            factory,
            milter,
            framer: Framer::new(max_payload_size),
            codec: PacketCodec::new(max_payload_size),
            state: SessionState::Active,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.framer.feed(chunk);
    }

    /// End of input: no further messages will be processed.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Dispatch every complete buffered message, appending framed replies to `out`.
    ///
    /// Stops early on quit. Any error closes the session; replies already
    /// appended for earlier messages are complete and may still be sent.
    pub fn process(&mut self, out: &mut BytesMut) -> Result<()> {
        while self.state == SessionState::Active {
            let body = match self.framer.try_extract() {
                Ok(Some(body)) => body,
                Ok(None) => break,
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            };

            if let Err(e) = self.handle(&body, out) {
                self.close();
                return Err(e);
            }
        }
        Ok(())
    }

    fn handle(&mut self, body: &[u8], out: &mut BytesMut) -> Result<()> {
        let metrics = global_metrics();
        metrics.message_received();

        match dispatch(&mut self.milter, body)? {
            Dispatch::Responded(replies) => {
                for reply in replies {
                    self.codec.encode(reply, out)?;
                    metrics.reply_sent();
                }
            }
            Dispatch::ResetSession => {
                debug!("Abort received, resetting handler");
                metrics.session_reset();
                self.milter = self.factory.create();
            }
            Dispatch::TerminateSession => {
                debug!("Quit received");
                self.close();
            }
        }
        Ok(())
    }
}

/// Run one milter session over `stream` until quit, end of stream, or error.
///
/// Errors end only this session; the caller decides how to report them.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn serve_connection<S, F>(
    mut stream: S,
    factory: Arc<F>,
    config: SessionConfig,
    peer: &str,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: MilterFactory,
{
    let mut session = Session::new(factory, config.max_payload_size);
    let mut chunk = vec![0u8; config.read_chunk_size.max(1)];
    let mut out = BytesMut::new();

    loop {
        let processed = session.process(&mut out);
        if !out.is_empty() {
            stream.write_all(&out).await?;
            stream.flush().await?;
            out.clear();
        }
        processed?;

        if session.state() == SessionState::Closed {
            break;
        }

        let read = with_timeout_error(
            async { stream.read(&mut chunk).await.map_err(ProtocolError::from) },
            config.read_timeout,
        )
        .await;

        let n = match read {
            Ok(n) => n,
            Err(ProtocolError::Timeout) => {
                warn!(
                    timeout_ms = u64::try_from(config.read_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "{}",
                    constants::ERR_READ_TIMEOUT
                );
                return Err(ProtocolError::Timeout);
            }
            Err(e) => return Err(e),
        };

        if n == 0 {
            debug!("End of stream");
            session.close();
            break;
        }

        global_metrics().bytes_read(n as u64);
        session.feed(&chunk[..n]);
    }

    // The peer may already be gone; nothing left to report.
    let _ = stream.shutdown().await;
    info!("Connection closed");
    Ok(())
}
