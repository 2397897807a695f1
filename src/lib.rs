//! # milter-protocol
//!
//! Server side of the sendmail milter protocol: length-prefixed packets
//! carrying opcode-tagged messages from the MTA, answered by a pluggable
//! policy with short verdicts.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use milter_protocol::config::MilterConfig;
//! use milter_protocol::policy::{RecipientMap, RecipientPolicy};
//! use milter_protocol::transport::tcp::start_server;
//!
//! # async fn run() -> milter_protocol::error::Result<()> {
//! let config = MilterConfig::from_env()?;
//! let map = Arc::new(RecipientMap::from_file("recipients.toml")?);
//! start_server(&config, Arc::new(move || RecipientPolicy::new(map.clone()))).await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod policy;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use error::{ProtocolError, Result};
pub use protocol::dispatcher::{dispatch, Dispatch, Milter, MilterFactory, PassThrough};
pub use protocol::message::{Message, OptionNegotiation, Reply, Response};
pub use protocol::opcode::{Command, Verdict};
