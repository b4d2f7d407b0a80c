//! # Telnet Protocol Constants and Types
//!
//! This module implements the core Telnet protocol constants as defined in:
//! - **RFC 854**: Telnet Protocol Specification
//! - **RFC 855**: Telnet Option Specifications
//!
//! ## Key Concepts from RFC 854:
//!
//! ### IAC (Interpret As Command) - Byte 255
//! The IAC byte (255/0xFF) signals that the following bytes should be interpreted
//! as Telnet commands rather than data. Any data byte with value 255 must be
//! escaped as IAC IAC (255 255).
//!
//! ### Command Structure
//! Telnet commands follow the pattern: `IAC <command> [option]`
//! - For negotiation: `IAC WILL/WONT/DO/DONT <option>`
//! - For actions: `IAC <command>` (like IAC AYT for Are You There)
//!
//! ### Sub-negotiation Structure (RFC 855)
//! Sub-negotiations use: `IAC SB <option> <parameters...> IAC SE`
//! This is how NAWS window sizes and TERMINAL-TYPE names are carried.

/// IAC - Interpret As Command (RFC 854, Section 4)
///
/// The IAC byte (255/0xFF) indicates that the next byte(s) should be interpreted
/// as a Telnet command sequence rather than regular data.
///
/// **Important**: Any data byte with value 255 must be escaped as two consecutive
/// IAC bytes (255 255) to distinguish it from command sequences.
pub const IAC: u8 = 255;

/// Telnet Commands (RFC 854, Section 4)
///
/// These commands follow the IAC byte to indicate specific protocol operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TelnetCommand {
    /// End of subnegotiation parameters (RFC 855)
    /// Format: IAC SB <option> <data...> IAC SE
    SE = 240,

    /// No Operation - can be used as keepalive
    /// Format: IAC NOP
    NOP = 241,

    /// Data Mark - indicates position of Synch event in data stream
    DM = 242,

    /// Break - indicates Break or Attention signal
    /// Format: IAC BRK
    BRK = 243,

    /// Interrupt Process - suspend, interrupt, abort, or terminate process
    /// Equivalent to Ctrl+C on many systems
    /// Format: IAC IP
    IP = 244,

    /// Abort Output - allow process to run to completion but discard output
    /// Format: IAC AO
    AO = 245,

    /// Are You There - request visible evidence that system is still running
    /// Format: IAC AYT
    AYT = 246,

    /// Erase Character - delete the last character entered
    /// Format: IAC EC
    EC = 247,

    /// Erase Line - delete the current line being entered
    /// Format: IAC EL
    EL = 248,

    /// Go Ahead - used in half-duplex mode to signal turn-taking
    /// Format: IAC GA
    GA = 249,

    /// Subnegotiation Begin (RFC 855)
    /// Format: IAC SB <option> <parameters...> IAC SE
    SB = 250,

    /// WILL - sender wants to enable option
    /// Format: IAC WILL <option>
    WILL = 251,

    /// WON'T - sender wants to disable option or refuses to enable
    /// Format: IAC WONT <option>
    WONT = 252,

    /// DO - sender wants receiver to enable option
    /// Format: IAC DO <option>
    DO = 253,

    /// DON'T - sender wants receiver to disable option or refuses request
    /// Format: IAC DONT <option>
    DONT = 254,
}

impl TelnetCommand {
    /// Convert a byte to a TelnetCommand if it represents a valid command
    ///
    /// # Example
    /// ```
    /// use telnet_protocol::protocol::TelnetCommand;
    ///
    /// assert_eq!(TelnetCommand::from_byte(251), Some(TelnetCommand::WILL));
    /// assert_eq!(TelnetCommand::from_byte(100), None);
    /// ```
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            240 => Some(TelnetCommand::SE),
            241 => Some(TelnetCommand::NOP),
            242 => Some(TelnetCommand::DM),
            243 => Some(TelnetCommand::BRK),
            244 => Some(TelnetCommand::IP),
            245 => Some(TelnetCommand::AO),
            246 => Some(TelnetCommand::AYT),
            247 => Some(TelnetCommand::EC),
            248 => Some(TelnetCommand::EL),
            249 => Some(TelnetCommand::GA),
            250 => Some(TelnetCommand::SB),
            251 => Some(TelnetCommand::WILL),
            252 => Some(TelnetCommand::WONT),
            253 => Some(TelnetCommand::DO),
            254 => Some(TelnetCommand::DONT),
            _ => None,
        }
    }

    /// Convert command to its byte representation
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this command is part of option negotiation
    ///
    /// Returns true for WILL, WONT, DO, DONT - the commands that must be
    /// followed by an option byte and that drive the negotiation machine.
    pub fn is_negotiation_command(self) -> bool {
        matches!(
            self,
            TelnetCommand::WILL | TelnetCommand::WONT | TelnetCommand::DO | TelnetCommand::DONT
        )
    }
}
