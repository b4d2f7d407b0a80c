//! # Telnet Protocol Library
//!
//! A Rust library for the server side of the Telnet protocol as defined in:
//! - RFC 854: Telnet Protocol Specification (https://tools.ietf.org/html/rfc854)
//! - RFC 855: Telnet Option Specifications
//! - Various option-specific RFCs (856, 857, 858, 1073, 1091)
//!
//! This library is designed to be:
//! - **Transport-agnostic**: The session is fed bytes and writes replies through
//!   a caller-provided [`Transport`] sink, so it works over TCP, a WebSocket
//!   bridge, or an in-memory pipe equally well
//! - **Non-blocking**: `receive` never waits; everything is driven by the caller
//! - **Standards-compliant**: Follow the RFCs precisely
//!
//! ## Architecture Overview
//!
//! The library is organized into three modules:
//! - `protocol`: Basic Telnet protocol constants and types (RFC 854)
//! - `connection`: The per-connection IAC state machine ([`TelnetSession`]),
//!   the send side ([`TelnetOutput`]), and the [`TelnetHandler`] event trait
//! - `options`: The options this server negotiates (BINARY, ECHO,
//!   SUPPRESS-GO-AHEAD, TERMINAL-TYPE, NAWS), each carrying its own behavior

pub mod connection;
pub mod options;
pub mod protocol;

pub use connection::{TelnetHandler, TelnetOutput, TelnetSession, Transport};
pub use options::TelnetOption;
pub use protocol::{IAC, TelnetCommand};
