use crate::core::field::Layout;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::{
    Message, OptionNegotiation, Response, OPTNEG_LAYOUT, REMAINING_LAYOUT, STRING_LIST_LAYOUT,
};
use crate::protocol::opcode::{Command, Verdict};
use bytes::Bytes;
use tracing::{debug, warn};

/// Handler capability invoked by the dispatcher.
///
/// Every method has a default, so an empty implementation is a valid milter
/// that declines all optional features and lets every message through.
pub trait Milter: Send {
    /// Option negotiation. The default declines every optional feature.
    fn negotiate(&mut self, offer: OptionNegotiation) -> Result<Response> {
        Ok(offer.declined().into())
    }

    /// `args[0]` is the sender, the rest are ESMTP arguments.
    fn mail_from(&mut self, _args: Vec<String>) -> Result<Response> {
        Ok(Verdict::Continue.into())
    }

    /// `args[0]` is the recipient, the rest are ESMTP arguments.
    fn recipient_to(&mut self, _args: Vec<String>) -> Result<Response> {
        Ok(Verdict::Continue.into())
    }

    /// Macro definitions are acknowledged with silence.
    fn macro_definition(&mut self, _payload: Bytes) -> Result<Response> {
        Ok(Response::none())
    }
}

/// A milter that only negotiates and continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Milter for PassThrough {}

/// Builds a fresh handler for each session and after each abort.
pub trait MilterFactory: Send + Sync + 'static {
    type Milter: Milter;

    fn create(&self) -> Self::Milter;
}

impl<F, M> MilterFactory for F
where
    F: Fn() -> M + Send + Sync + 'static,
    M: Milter,
{
    type Milter = M;

    fn create(&self) -> M {
        self()
    }
}

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Encoded reply bodies, in order. May be empty.
    Responded(Vec<Bytes>),
    /// Abort: replace the handler, keep the connection.
    ResetSession,
    /// Quit: close the connection.
    TerminateSession,
}

struct Route {
    command: Command,
    layout: Layout,
}

static ROUTES: [Route; 6] = [
    Route {
        command: Command::MailFrom,
        layout: STRING_LIST_LAYOUT,
    },
    Route {
        command: Command::RecipientTo,
        layout: STRING_LIST_LAYOUT,
    },
    Route {
        command: Command::OptionNegotiation,
        layout: OPTNEG_LAYOUT,
    },
    Route {
        command: Command::Macro,
        layout: REMAINING_LAYOUT,
    },
    Route {
        command: Command::Abort,
        layout: Layout::new(&[]),
    },
    Route {
        command: Command::Quit,
        layout: Layout::new(&[]),
    },
];

#[inline]
fn route(opcode: u8) -> Option<&'static Route> {
    let command = Command::from_u8(opcode)?;
    ROUTES.iter().find(|r| r.command == command)
}

/// Decode a message body (opcode byte + fields).
///
/// Unknown opcodes come back as [`Message::Unknown`] without their fields
/// being looked at.
pub fn decode_message(body: &[u8]) -> Result<Message> {
    let (&opcode, fields) = body.split_first().ok_or_else(|| {
        warn!("{}", constants::ERR_EMPTY_MESSAGE);
        ProtocolError::EmptyMessage
    })?;

    match route(opcode) {
        Some(route) => {
            let values = route.layout.decode(fields)?;
            Message::from_values(route.command, values)
        }
        None => Ok(Message::Unknown(opcode)),
    }
}

/// Decode `body`, hand it to `milter`, and encode whatever it answers.
pub fn dispatch<M: Milter + ?Sized>(milter: &mut M, body: &[u8]) -> Result<Dispatch> {
    let response = match decode_message(body)? {
        Message::Abort => return Ok(Dispatch::ResetSession),
        Message::Quit => return Ok(Dispatch::TerminateSession),
        Message::Unknown(opcode) => {
            debug!(opcode = %char::from(opcode), "Unrouted opcode, continuing");
            Response::from(Verdict::Continue)
        }
        Message::MailFrom(args) => milter.mail_from(args)?,
        Message::RecipientTo(args) => milter.recipient_to(args)?,
        Message::OptionNegotiation(offer) => milter.negotiate(offer)?,
        Message::Macro(payload) => milter.macro_definition(payload)?,
    };

    let replies = response
        .into_replies()
        .iter()
        .map(|reply| {
            debug!(reply = reply.label(), "Reply");
            reply.encode()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Dispatch::Responded(replies))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::protocol::message::Reply;

    struct Recorder {
        senders: Vec<String>,
    }

    impl Milter for Recorder {
        fn mail_from(&mut self, args: Vec<String>) -> Result<Response> {
            self.senders.extend(args);
            Ok(vec![Reply::Verdict(Verdict::Progress), Verdict::Accept.into()].into())
        }
    }

    fn responded(dispatch: Dispatch) -> Vec<Bytes> {
        match dispatch {
            Dispatch::Responded(replies) => replies,
            other => panic!("expected replies, got {other:?}"),
        }
    }

    #[test]
    fn test_optneg_is_normalised() {
        let out = dispatch(&mut PassThrough, b"O\0\0\0\x02\0\0\0\x3f\0\0\0\x7f").unwrap();
        assert_eq!(
            responded(out),
            vec![Bytes::from_static(b"O\0\0\0\x02\0\0\0\0\0\0\0\0")]
        );
    }

    #[test]
    fn test_unknown_opcode_continues_without_decoding() {
        for opcode in [b'H', b'C', b'E', b'L', b'N', b'T', 0xff] {
            // Junk that no layout could decode
            let body = [opcode, 0x01];
            let out = dispatch(&mut PassThrough, &body).unwrap();
            assert_eq!(responded(out), vec![Bytes::from_static(b"c")]);
        }
    }

    #[test]
    fn test_macro_is_silent() {
        let out = dispatch(&mut PassThrough, b"DCj\0mx.example\0").unwrap();
        assert!(responded(out).is_empty());
    }

    #[test]
    fn test_abort_and_quit_transitions() {
        assert_eq!(dispatch(&mut PassThrough, b"A").unwrap(), Dispatch::ResetSession);
        assert_eq!(dispatch(&mut PassThrough, b"Q").unwrap(), Dispatch::TerminateSession);
    }

    #[test]
    fn test_empty_body_is_fatal() {
        assert!(matches!(
            dispatch(&mut PassThrough, b""),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn test_truncated_optneg_is_incomplete() {
        let err = dispatch(&mut PassThrough, b"O\0\0\0\x02\0\0").unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_sequence_reply_order() {
        let mut milter = Recorder { senders: vec![] };
        let out = dispatch(&mut milter, b"M<a@x>\0BODY=8BITMIME\0").unwrap();
        assert_eq!(
            responded(out),
            vec![Bytes::from_static(b"p"), Bytes::from_static(b"a")]
        );
        assert_eq!(milter.senders, vec!["<a@x>", "BODY=8BITMIME"]);
    }

    #[test]
    fn test_closure_factory() {
        let factory = || PassThrough;
        let mut milter = factory.create();
        assert_eq!(
            responded(dispatch(&mut milter, b"R<b@x>\0").unwrap()),
            vec![Bytes::from_static(b"c")]
        );
    }
}
