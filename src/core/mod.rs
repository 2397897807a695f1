//! # Core Protocol Components
//!
//! Low-level framing and field encoding for the milter wire format.
//!
//! ## Components
//! - **Field**: composable field layouts (uint32, string list, remainder)
//! - **Packet**: length-prefixed wire unit
//! - **Codec**: tokio codec and stream framer
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Opcode(1)] [Fields(Length - 1)]
//! ```
//!
//! The length excludes itself. Declared lengths above the configured maximum
//! are rejected before any allocation.

pub mod codec;
pub mod field;
pub mod packet;
