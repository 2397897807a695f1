use crate::error::{ProtocolError, Result};
use crate::policy::recipient_map::RecipientMap;
use crate::protocol::dispatcher::Milter;
use crate::protocol::message::Response;
use crate::protocol::opcode::Verdict;
use std::sync::Arc;
use tracing::{info, warn};

/// Only lets listed senders reach restricted recipients.
///
/// Recipients absent from the map accept any sender. A recipient check with
/// no sender recorded (no mail-from yet, or an abort since) continues: the
/// policy only judges senders it has seen.
#[derive(Debug, Clone)]
pub struct RecipientPolicy {
    map: Arc<RecipientMap>,
    sender: Option<String>,
}

impl RecipientPolicy {
    pub fn new(map: Arc<RecipientMap>) -> Self {
        Self { map, sender: None }
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Verdict for `recipient` given the recorded sender.
    pub fn check(&self, recipient: &str) -> Verdict {
        let Some(allowed) = self.map.allowed_senders(recipient) else {
            return Verdict::Continue;
        };

        match &self.sender {
            Some(sender) if allowed.contains(sender) => Verdict::Continue,
            Some(_) => Verdict::Reject,
            None => {
                warn!(recipient, "Recipient check before any sender, continuing");
                Verdict::Continue
            }
        }
    }
}

impl Milter for RecipientPolicy {
    fn mail_from(&mut self, args: Vec<String>) -> Result<Response> {
        let sender = args
            .into_iter()
            .next()
            .ok_or(ProtocolError::MissingField("sender"))?;
        info!(sender = %sender, "Sender");
        self.sender = Some(sender);
        Ok(Verdict::Continue.into())
    }

    fn recipient_to(&mut self, args: Vec<String>) -> Result<Response> {
        let recipient = args
            .first()
            .map(String::as_str)
            .ok_or(ProtocolError::MissingField("recipient"))?;
        let verdict = self.check(recipient);
        info!(
            sender = self.sender.as_deref().unwrap_or_default(),
            recipient,
            verdict = %verdict,
            "Recipient"
        );
        Ok(verdict.into())
    }
}
