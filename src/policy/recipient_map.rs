//! Recipient allow-lists.
//!
//! The map is loaded once at startup and never mutated afterwards, so
//! sessions share it behind an `Arc` without locking.
//!
//! ## File format
//! ```toml
//! [recipients]
//! "<list@example.org>" = ["<alice@example.org>", "bob@example.org"]
//! ```
//!
//! Addresses without angle brackets are wrapped in them, matching the form
//! the MTA sends in mail-from and rcpt-to.

use crate::error::{constants, ProtocolError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RecipientMapFile {
    #[serde(default)]
    recipients: HashMap<String, Vec<String>>,
}

/// Recipient address to the set of senders allowed to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientMap {
    entries: HashMap<String, HashSet<String>>,
}

impl RecipientMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `recipient` to `senders`, extending any existing allow-list.
    pub fn insert<I, S>(&mut self, recipient: &str, senders: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entries
            .entry(anglize(recipient))
            .or_default()
            .extend(senders.into_iter().map(|s| anglize(s.as_ref())));
    }

    /// Allowed senders for `recipient`, or `None` if it is unrestricted.
    pub fn allowed_senders(&self, recipient: &str) -> Option<&HashSet<String>> {
        self.entries.get(recipient)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RecipientMapFile = toml::from_str(content).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_RECIPIENT_MAP_PARSE))
        })?;

        let mut map = Self::new();
        for (recipient, senders) in &file.recipients {
            map.insert(recipient, senders);
        }
        Ok(map)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProtocolError::ConfigError(format!(
                "{} {}: {e}",
                constants::ERR_RECIPIENT_MAP_READ,
                path.display()
            ))
        })?;

        let map = Self::from_toml(&content)?;
        info!(path = %path.display(), recipients = map.len(), "Loaded recipient map");
        Ok(map)
    }
}

/// Wrap an address in angle brackets unless it already starts with one.
pub fn anglize(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with('<') {
        addr.to_string()
    } else {
        format!("<{addr}>")
    }
}
