//! # Termdock
//!
//! A library for exposing interactive terminal sessions over byte-oriented
//! transports. It stacks three layers:
//!
//! - **Transport adapters**: [`telnet_tty::TelnetTtyConnection`] speaks the
//!   Telnet protocol (via the `telnet-protocol` crate) and
//!   [`web_tty::WebTtyConnection`] speaks a small JSON message protocol for
//!   browser terminals. Both expose the same [`tty::TtyConnection`] facade.
//! - **Codec pipeline**: received bytes are charset-decoded into code points
//!   ([`codec::BinaryDecoder`]), scanned for inline signal characters
//!   ([`tty::event_decoder::TtyEventDecoder`]), and handed to the
//!   application; written code points travel the reverse path with
//!   newline-to-CRLF translation ([`tty::output`]).
//! - **Line editing**: [`readline::Readline`] turns key presses into edited
//!   lines with history, GNU-readline-style keymaps, and pluggable editing
//!   functions.
//!
//! Everything is single-threaded and callback-driven; each connection is
//! owned by a serial [`executor::Executor`]. The one deliberately
//! thread-safe piece is [`pool::BufferPool`], which is shared across
//! connections.

pub mod codec;
pub mod config;
pub mod errors;
pub mod executor;
pub mod pool;
pub mod readline;
pub mod telnet_tty;
pub mod tty;
pub mod web_tty;

pub use codec::Charset;
pub use config::TermConfig;
pub use errors::{TermError, TermResult};
pub use readline::Readline;
pub use telnet_tty::TelnetTtyConnection;
pub use tty::{TtyConnection, TtyEvent, Vector};
pub use web_tty::WebTtyConnection;
