//! # Milter Protocol
//!
//! Opcode table, handler interface and per-connection session state machine.
//!
//! ## Message flow
//! 1. The [`session`] framer extracts one body at a time
//! 2. [`dispatcher::dispatch`] decodes it by opcode and calls the [`dispatcher::Milter`]
//! 3. Replies are length-framed and written in dispatch order
//! 4. Abort swaps in a fresh handler; quit closes the session
//!
//! ## Opcodes
//! | Opcode | Meaning | Reply |
//! |---|---|---|
//! | `M` | mail-from | verdict |
//! | `R` | rcpt-to | verdict |
//! | `O` | option negotiation | `O` + version, 0, 0 |
//! | `D` | macro definition | none |
//! | `A` | abort | none |
//! | `Q` | quit | none |
//! | other | ignored | `c` |

pub mod dispatcher;
pub mod message;
pub mod opcode;
pub mod session;
