use crate::core::field::{Field, Layout, Value};
use crate::error::{ProtocolError, Result};
use crate::protocol::opcode::{Command, Verdict};
use bytes::{BufMut, Bytes, BytesMut};

/// Body layout of an option negotiation: version, actions, protocol.
pub const OPTNEG_LAYOUT: Layout = Layout::new(&[Field::Uint32, Field::Uint32, Field::Uint32]);

/// Body layout of mail-from and rcpt-to: sender/recipient followed by ESMTP arguments.
pub const STRING_LIST_LAYOUT: Layout = Layout::new(&[Field::StringList]);

/// Body layout of a macro definition (never interpreted).
pub const REMAINING_LAYOUT: Layout = Layout::new(&[Field::Remaining]);

/// Capability bitmasks exchanged during option negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionNegotiation {
    pub version: u32,
    pub actions: u32,
    pub protocol: u32,
}

impl OptionNegotiation {
    /// The server's answer: same version, no optional actions or protocol steps.
    pub fn declined(&self) -> Self {
        Self {
            version: self.version,
            actions: 0,
            protocol: 0,
        }
    }

    fn from_values(values: Vec<Value>) -> Result<Self> {
        let mut values = values.into_iter();
        Ok(Self {
            version: take_u32(values.next())?,
            actions: take_u32(values.next())?,
            protocol: take_u32(values.next())?,
        })
    }

    fn to_values(self) -> [Value; 3] {
        [
            Value::Uint32(self.version),
            Value::Uint32(self.actions),
            Value::Uint32(self.protocol),
        ]
    }
}

/// A decoded MTA message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    MailFrom(Vec<String>),
    RecipientTo(Vec<String>),
    OptionNegotiation(OptionNegotiation),
    Macro(Bytes),
    Abort,
    Quit,
    /// Opcode with no table entry; its body is never decoded.
    Unknown(u8),
}

impl Message {
    /// Build a message from the values produced by the command's layout.
    pub(crate) fn from_values(command: Command, values: Vec<Value>) -> Result<Self> {
        let message = match command {
            Command::MailFrom => Message::MailFrom(take_strings(values)?),
            Command::RecipientTo => Message::RecipientTo(take_strings(values)?),
            Command::OptionNegotiation => {
                Message::OptionNegotiation(OptionNegotiation::from_values(values)?)
            }
            Command::Macro => Message::Macro(take_bytes(values)?),
            Command::Abort => Message::Abort,
            Command::Quit => Message::Quit,
        };
        Ok(message)
    }

    /// Encode to an unframed body (opcode byte + fields), as the MTA would send it.
    pub fn to_body(&self) -> Result<Bytes> {
        let (opcode, fields) = match self {
            Message::MailFrom(args) => (
                Command::MailFrom.as_u8(),
                STRING_LIST_LAYOUT.encode(&[Value::Strings(args.clone())])?,
            ),
            Message::RecipientTo(args) => (
                Command::RecipientTo.as_u8(),
                STRING_LIST_LAYOUT.encode(&[Value::Strings(args.clone())])?,
            ),
            Message::OptionNegotiation(neg) => (
                Command::OptionNegotiation.as_u8(),
                OPTNEG_LAYOUT.encode(&neg.to_values())?,
            ),
            Message::Macro(payload) => (
                Command::Macro.as_u8(),
                REMAINING_LAYOUT.encode(&[Value::Bytes(payload.clone())])?,
            ),
            Message::Abort => (Command::Abort.as_u8(), Bytes::new()),
            Message::Quit => (Command::Quit.as_u8(), Bytes::new()),
            Message::Unknown(opcode) => (*opcode, Bytes::new()),
        };

        let mut body = BytesMut::with_capacity(1 + fields.len());
        body.put_u8(opcode);
        body.put_slice(&fields);
        Ok(body.freeze())
    }
}

/// One response value sent back to the MTA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Verdict(Verdict),
    OptionNegotiation(OptionNegotiation),
}

impl Reply {
    /// Opcode-tagged bytes, ready to be length-framed.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Reply::Verdict(verdict) => Ok(Bytes::copy_from_slice(&[verdict.as_u8()])),
            Reply::OptionNegotiation(neg) => {
                let fields = OPTNEG_LAYOUT.encode(&neg.to_values())?;
                let mut out = BytesMut::with_capacity(1 + fields.len());
                out.put_u8(Command::OptionNegotiation.as_u8());
                out.put_slice(&fields);
                Ok(out.freeze())
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Reply::Verdict(verdict) => verdict.as_str(),
            Reply::OptionNegotiation(_) => "optneg",
        }
    }
}

impl From<Verdict> for Reply {
    fn from(verdict: Verdict) -> Self {
        Reply::Verdict(verdict)
    }
}

/// What a handler returns: one reply, or an ordered (possibly empty) sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Single(Reply),
    Sequence(Vec<Reply>),
}

impl Response {
    /// Send nothing.
    pub fn none() -> Self {
        Response::Sequence(Vec::new())
    }

    pub fn into_replies(self) -> Vec<Reply> {
        match self {
            Response::Single(reply) => vec![reply],
            Response::Sequence(replies) => replies,
        }
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Response::Single(reply)
    }
}

impl From<Verdict> for Response {
    fn from(verdict: Verdict) -> Self {
        Response::Single(Reply::Verdict(verdict))
    }
}

impl From<OptionNegotiation> for Response {
    fn from(neg: OptionNegotiation) -> Self {
        Response::Single(Reply::OptionNegotiation(neg))
    }
}

impl From<Vec<Reply>> for Response {
    fn from(replies: Vec<Reply>) -> Self {
        Response::Sequence(replies)
    }
}

fn take_u32(value: Option<Value>) -> Result<u32> {
    match value {
        Some(Value::Uint32(n)) => Ok(n),
        Some(other) => Err(mismatch(Field::Uint32, &other)),
        None => Err(ProtocolError::MissingField(Field::Uint32.name())),
    }
}

fn take_strings(values: Vec<Value>) -> Result<Vec<String>> {
    match values.into_iter().next() {
        Some(Value::Strings(list)) => Ok(list),
        Some(other) => Err(mismatch(Field::StringList, &other)),
        None => Err(ProtocolError::MissingField(Field::StringList.name())),
    }
}

fn take_bytes(values: Vec<Value>) -> Result<Bytes> {
    match values.into_iter().next() {
        Some(Value::Bytes(bytes)) => Ok(bytes),
        Some(other) => Err(mismatch(Field::Remaining, &other)),
        None => Err(ProtocolError::MissingField(Field::Remaining.name())),
    }
}

fn mismatch(expected: Field, found: &Value) -> ProtocolError {
    ProtocolError::FieldMismatch {
        expected: expected.name(),
        found: found.kind(),
    }
}
