//! # Error Types
//!
//! Error handling for the milter protocol engine.
//!
//! This module defines every failure that can occur while framing, decoding,
//! dispatching or serving a milter session.
//!
//! ## Error Categories
//! - **Incomplete data**: not enough bytes for a field or a framed packet. The
//!   framer absorbs this internally; it only escapes when a fixed layout is
//!   decoded from a truncated body.
//! - **Encoding errors**: more (or different) values than a layout consumes.
//!   These are internal consistency failures.
//! - **Protocol violations**: empty message bodies, oversized packets, read
//!   deadline expiry. Fatal to the owning session only.
//! - **Configuration errors**: invalid settings or recipient map files.
//!
//! Abort and quit are not errors: the dispatcher reports them as session
//! transitions (see [`crate::protocol::dispatcher::Dispatch`]).
//!
//! ## Example Usage
//! ```rust
//! use milter_protocol::error::{ProtocolError, Result};
//! use tracing::error;
//!
//! fn first_opcode(body: &[u8]) -> Result<u8> {
//!     body.first().copied().ok_or(ProtocolError::EmptyMessage)
//! }
//!
//! if let Err(e) = first_opcode(&[]) {
//!     error!(error = %e, "Dropping session");
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Protocol violations
    pub const ERR_EMPTY_MESSAGE: &str = "Message body has no opcode byte";
    pub const ERR_OVERSIZED_PACKET: &str = "Packet exceeds maximum size";

    /// Connection errors
    pub const ERR_READ_TIMEOUT: &str = "No data received before the read deadline";

    /// Configuration errors
    pub const ERR_RECIPIENT_MAP_PARSE: &str = "Failed to parse recipient map";
    pub const ERR_RECIPIENT_MAP_READ: &str = "Failed to read recipient map";
}

// ProtocolError is the primary error type for all milter operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Incomplete data: needed {needed} bytes, {available} available")]
    Incomplete { needed: usize, available: usize },

    #[error("Encoding overflow: {0} values left over")]
    EncodingOverflow(usize),

    #[error("Field mismatch: expected {expected}, found {found}")]
    FieldMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Missing value for {0} field")]
    MissingField(&'static str),

    #[error("Message body has no opcode byte")]
    EmptyMessage,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Read deadline expired")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether more input could resolve this error.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ProtocolError::Incomplete { .. })
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
