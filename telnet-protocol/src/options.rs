//! # Telnet Option Behaviors
//!
//! The options this server knows how to negotiate, each carrying the
//! behavior for the four negotiation verbs and for sub-negotiation
//! parameters:
//!
//! - **BINARY** (RFC 856): 8-bit transmission, negotiated per direction
//! - **ECHO** (RFC 857): server-side echo, announced for kludge mode
//! - **SUPPRESS-GO-AHEAD** (RFC 858): full-duplex operation, announced for
//!   kludge mode
//! - **TERMINAL-TYPE** (RFC 1091): the client's terminal name, fetched with
//!   a SEND sub-negotiation once the client announces WILL
//! - **NAWS** (RFC 1073): window size updates, pushed by the client
//!
//! Anything else on the wire is refused by the session itself (`DO` answered
//! with `WONT`, `WILL` answered with `DONT`).

use crate::connection::{TelnetHandler, TelnetSession};
use crate::protocol::{self, TelnetCommand};

/// TERMINAL-TYPE sub-negotiation qualifier: the payload carries a name.
const BYTE_IS: u8 = 0;

/// TERMINAL-TYPE sub-negotiation qualifier: request the client's name.
const BYTE_SEND: u8 = 1;

/// The negotiable options, as a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetOption {
    /// Binary Transmission (RFC 856)
    Binary,
    /// Echo (RFC 857)
    Echo,
    /// Suppress Go Ahead (RFC 858)
    SuppressGoAhead,
    /// Terminal Type (RFC 1091)
    TerminalType,
    /// Negotiate About Window Size (RFC 1073)
    Naws,
}

impl TelnetOption {
    /// The option's assigned protocol code.
    pub const fn code(self) -> u8 {
        match self {
            TelnetOption::Binary => 0,
            TelnetOption::Echo => 1,
            TelnetOption::SuppressGoAhead => 3,
            TelnetOption::TerminalType => 24,
            TelnetOption::Naws => 31,
        }
    }

    /// Look up a supported option by its protocol code.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TelnetOption::Binary),
            1 => Some(TelnetOption::Echo),
            3 => Some(TelnetOption::SuppressGoAhead),
            24 => Some(TelnetOption::TerminalType),
            31 => Some(TelnetOption::Naws),
            _ => None,
        }
    }

    /// The client accepted our WILL announcement with `DO`.
    pub(crate) fn handle_do(self, session: &mut TelnetSession, handler: &mut dyn TelnetHandler) {
        match self {
            TelnetOption::Binary => {
                session.output().borrow_mut().set_send_binary(true);
                handler.on_send_binary(true);
            }
            TelnetOption::Echo => handler.on_echo(true),
            TelnetOption::SuppressGoAhead => handler.on_sga(true),
            // the client drives these two, a DO from it means nothing here
            TelnetOption::TerminalType | TelnetOption::Naws => {}
        }
    }

    /// The client refused our WILL announcement with `DONT`.
    pub(crate) fn handle_dont(self, session: &mut TelnetSession, handler: &mut dyn TelnetHandler) {
        match self {
            TelnetOption::Binary => {
                session.output().borrow_mut().set_send_binary(false);
                handler.on_send_binary(false);
            }
            TelnetOption::Echo => handler.on_echo(false),
            TelnetOption::SuppressGoAhead => handler.on_sga(false),
            TelnetOption::TerminalType | TelnetOption::Naws => {}
        }
    }

    /// The client announced `WILL`, accepting a DO request of ours.
    pub(crate) fn handle_will(self, session: &mut TelnetSession, handler: &mut dyn TelnetHandler) {
        match self {
            TelnetOption::Binary => {
                session.set_receive_binary(true);
                handler.on_receive_binary(true);
            }
            TelnetOption::TerminalType => {
                // ask for the name right away: IAC SB TERMINAL-TYPE SEND IAC SE
                session.output().borrow_mut().send(&[
                    protocol::IAC,
                    TelnetCommand::SB.to_byte(),
                    TelnetOption::TerminalType.code(),
                    BYTE_SEND,
                    protocol::IAC,
                    TelnetCommand::SE.to_byte(),
                ]);
            }
            TelnetOption::Echo | TelnetOption::SuppressGoAhead | TelnetOption::Naws => {}
        }
    }

    /// The client announced `WONT`, refusing a DO request of ours.
    pub(crate) fn handle_wont(self, session: &mut TelnetSession, handler: &mut dyn TelnetHandler) {
        match self {
            TelnetOption::Binary => {
                session.set_receive_binary(false);
                handler.on_receive_binary(false);
            }
            TelnetOption::Echo
            | TelnetOption::SuppressGoAhead
            | TelnetOption::TerminalType
            | TelnetOption::Naws => {}
        }
    }

    /// A completed sub-negotiation for this option.
    pub(crate) fn handle_parameters(
        self,
        _session: &mut TelnetSession,
        params: &[u8],
        handler: &mut dyn TelnetHandler,
    ) {
        match self {
            TelnetOption::Naws => {
                // RFC 1073: two 16-bit big-endian values, anything else is junk
                if params.len() == 4 {
                    let width = u16::from_be_bytes([params[0], params[1]]);
                    let height = u16::from_be_bytes([params[2], params[3]]);
                    handler.on_size(width, height);
                }
            }
            TelnetOption::TerminalType => {
                if params.first() == Some(&BYTE_IS) {
                    let name = String::from_utf8_lossy(&params[1..]);
                    handler.on_terminal_type(&name);
                }
            }
            TelnetOption::Binary | TelnetOption::Echo | TelnetOption::SuppressGoAhead => {}
        }
    }
}
