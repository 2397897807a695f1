use std::fmt;

/// Commands sent by the MTA. The wire value is the first body byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Abort = b'A',
    Macro = b'D',
    MailFrom = b'M',
    OptionNegotiation = b'O',
    Quit = b'Q',
    RecipientTo = b'R',
}

impl Command {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(Command::Abort),
            b'D' => Some(Command::Macro),
            b'M' => Some(Command::MailFrom),
            b'O' => Some(Command::OptionNegotiation),
            b'Q' => Some(Command::Quit),
            b'R' => Some(Command::RecipientTo),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Abort => "abort",
            Command::Macro => "macro",
            Command::MailFrom => "mail-from",
            Command::OptionNegotiation => "optneg",
            Command::Quit => "quit",
            Command::RecipientTo => "rcpt-to",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-byte replies instructing the MTA how to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Verdict {
    AddRecipient = b'+',
    DeleteRecipient = b'-',
    Accept = b'a',
    ReplaceBody = b'b',
    Continue = b'c',
    Discard = b'd',
    AddHeader = b'h',
    ChangeHeader = b'm',
    Progress = b'p',
    Quarantine = b'q',
    Reject = b'r',
    Tempfail = b't',
    ReplyCode = b'y',
}

impl Verdict {
    pub fn from_u8(byte: u8) -> Option<Self> {
        let verdict = match byte {
            b'+' => Verdict::AddRecipient,
            b'-' => Verdict::DeleteRecipient,
            b'a' => Verdict::Accept,
            b'b' => Verdict::ReplaceBody,
            b'c' => Verdict::Continue,
            b'd' => Verdict::Discard,
            b'h' => Verdict::AddHeader,
            b'm' => Verdict::ChangeHeader,
            b'p' => Verdict::Progress,
            b'q' => Verdict::Quarantine,
            b'r' => Verdict::Reject,
            b't' => Verdict::Tempfail,
            b'y' => Verdict::ReplyCode,
            _ => return None,
        };
        Some(verdict)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::AddRecipient => "add-recipient",
            Verdict::DeleteRecipient => "delete-recipient",
            Verdict::Accept => "accept",
            Verdict::ReplaceBody => "replace-body",
            Verdict::Continue => "continue",
            Verdict::Discard => "discard",
            Verdict::AddHeader => "add-header",
            Verdict::ChangeHeader => "change-header",
            Verdict::Progress => "progress",
            Verdict::Quarantine => "quarantine",
            Verdict::Reject => "reject",
            Verdict::Tempfail => "tempfail",
            Verdict::ReplyCode => "reply-code",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        for byte in *b"ADMOQR" {
            let command = Command::from_u8(byte);
            assert_eq!(command.map(Command::as_u8), Some(byte));
        }
        assert_eq!(Command::from_u8(b'H'), None);
        assert_eq!(Command::from_u8(0), None);
    }

    #[test]
    fn test_verdict_bytes() {
        for byte in *b"+-abcdhmpqrty" {
            assert_eq!(Verdict::from_u8(byte).map(Verdict::as_u8), Some(byte));
        }
        assert_eq!(Verdict::Continue.as_u8(), b'c');
        assert_eq!(Verdict::Reject.as_u8(), b'r');
        assert_eq!(Verdict::from_u8(b'O'), None);
    }
}
