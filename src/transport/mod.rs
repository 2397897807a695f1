//! # Transport Layer
//!
//! TCP listener shell around [`crate::protocol::session::serve_connection`].
//!
//! One task per accepted connection. Sessions share nothing but the handler
//! factory (and whatever immutable data it captures). A semaphore bounds the
//! number of concurrent sessions.

pub mod tcp;
