//! # Telnet Session State Machine
//!
//! This module implements the per-connection receive state machine and the
//! send side of the protocol according to **RFC 854** (Telnet Protocol
//! Specification).
//!
//! ## Key Concepts:
//!
//! ### IAC State Machine (RFC 854, Section 4)
//! The session uses a state machine to handle the IAC (Interpret As Command)
//! protocol:
//! - **Data**: Normal data bytes, batched until a command interrupts them
//! - **Esc**: Found 255 while BINARY reception is active; IAC IAC collapses
//!   to a literal data byte 255
//! - **Iac**: Found 255, next byte determines the action
//! - **Sb**: Processing an IAC SB ... IAC SE sequence
//! - **Do/Dont/Will/Wont**: A negotiation command awaiting its option byte
//!
//! ### Data Batching
//! Consecutive data bytes are accumulated in a fixed 256-byte pending buffer
//! and delivered to [`TelnetHandler::on_data`] in batches: when the buffer
//! fills, when a command sequence begins, and at the end of each `receive`
//! call. A handler therefore always observes data and commands in exactly
//! the order they appeared on the wire.

use std::cell::RefCell;
use std::rc::Rc;

use crate::options::TelnetOption;
use crate::protocol::{self, TelnetCommand};

/// Pending data bytes are batched up to this size before being flushed to the
/// handler.
const PENDING_CAPACITY: usize = 256;

/// Sub-negotiation parameter storage grows in steps of this size.
const PARAMS_GROWTH: usize = 100;

/// A byte sink the session writes protocol output to.
///
/// Implementations wrap whatever carries the connection: a TCP stream, a
/// WebSocket bridge, or an in-memory buffer in tests.
pub trait Transport {
    /// Send bytes to the peer.
    fn send(&mut self, data: &[u8]);

    /// Close the underlying channel.
    fn close(&mut self);
}

/// Callbacks for protocol events decoded by a [`TelnetSession`].
///
/// All methods have empty default bodies so implementations only override
/// what they care about.
pub trait TelnetHandler {
    /// A batch of application data bytes, with IAC escapes already collapsed.
    fn on_data(&mut self, _data: &[u8]) {}

    /// A command byte other than negotiation and sub-negotiation, such as
    /// AYT or NOP. The byte is passed raw; [`TelnetCommand::from_byte`] can
    /// classify it.
    fn on_command(&mut self, _command: u8) {}

    /// The client reported its window size via NAWS (RFC 1073).
    fn on_size(&mut self, _width: u16, _height: u16) {}

    /// The client reported its terminal type via TERMINAL-TYPE (RFC 1091).
    fn on_terminal_type(&mut self, _terminal_type: &str) {}

    /// The client acknowledged or refused our ECHO announcement (RFC 857).
    fn on_echo(&mut self, _enabled: bool) {}

    /// The client acknowledged or refused our SUPPRESS-GO-AHEAD announcement
    /// (RFC 858).
    fn on_sga(&mut self, _enabled: bool) {}

    /// BINARY transmission (RFC 856) was enabled or disabled for the
    /// server-to-client direction.
    fn on_send_binary(&mut self, _enabled: bool) {}

    /// BINARY transmission (RFC 856) was enabled or disabled for the
    /// client-to-server direction.
    fn on_receive_binary(&mut self, _enabled: bool) {}

    /// The connection is gone.
    fn on_close(&mut self) {}
}

/// The send side of a Telnet connection.
///
/// Shared between the [`TelnetSession`] (which writes negotiation replies
/// while decoding input) and the application (which writes terminal output),
/// so it lives behind an `Rc<RefCell<..>>` handed out by
/// [`TelnetSession::output`].
pub struct TelnetOutput {
    transport: Box<dyn Transport>,
    send_binary: bool,
    closed: bool,
}

impl TelnetOutput {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            send_binary: false,
            closed: false,
        }
    }

    /// Send raw protocol bytes without any escaping. Used for command and
    /// negotiation sequences which must never be rewritten.
    pub fn send(&mut self, data: &[u8]) {
        if !self.closed {
            self.transport.send(data);
        }
    }

    /// Write application data to the client, escaping 0xFF bytes as IAC IAC
    /// when BINARY transmission is active in the send direction. Outside
    /// binary mode bytes pass through untouched.
    pub fn write(&mut self, data: &[u8]) {
        if self.closed {
            return;
        }
        if self.send_binary {
            let mut prev = 0;
            for (i, &b) in data.iter().enumerate() {
                if b == protocol::IAC {
                    if i > prev {
                        self.transport.send(&data[prev..i]);
                    }
                    self.transport.send(&[protocol::IAC, protocol::IAC]);
                    prev = i + 1;
                }
            }
            if prev < data.len() {
                self.transport.send(&data[prev..]);
            }
        } else {
            self.transport.send(data);
        }
    }

    /// Whether BINARY transmission is active in the send direction.
    pub fn send_binary(&self) -> bool {
        self.send_binary
    }

    pub(crate) fn set_send_binary(&mut self, enabled: bool) {
        self.send_binary = enabled;
    }

    /// Close the transport. Subsequent sends are silently dropped and
    /// closing again is a no-op.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.transport.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Receive state of the IAC state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Expecting normal data or an IAC byte
    Data,
    /// Found IAC while BINARY reception is active, expecting IAC or command
    Esc,
    /// Found IAC, expecting the command byte
    Iac,
    /// Processing sub-negotiation parameters until IAC SE
    Sb,
    /// Found IAC DO, expecting the option byte
    Do,
    /// Found IAC DONT, expecting the option byte
    Dont,
    /// Found IAC WILL, expecting the option byte
    Will,
    /// Found IAC WONT, expecting the option byte
    Wont,
}

/// The receive side of a Telnet connection: a stateful byte-at-a-time
/// decoder that separates application data from command sequences and
/// dispatches both to a [`TelnetHandler`].
///
/// The session never reads by itself; the owner feeds it whatever bytes
/// arrived with [`TelnetSession::receive`].
pub struct TelnetSession {
    status: Status,
    pending: Vec<u8>,
    params_option_code: Option<u8>,
    params: Vec<u8>,
    params_iac: bool,
    receive_binary: bool,
    output: Rc<RefCell<TelnetOutput>>,
}

impl TelnetSession {
    /// Create a session writing replies through `output`.
    pub fn new(output: Rc<RefCell<TelnetOutput>>) -> Self {
        Self {
            status: Status::Data,
            pending: Vec::with_capacity(PENDING_CAPACITY),
            params_option_code: None,
            params: Vec::new(),
            params_iac: false,
            receive_binary: false,
            output,
        }
    }

    /// A shared handle on the send side of the connection.
    pub fn output(&self) -> Rc<RefCell<TelnetOutput>> {
        Rc::clone(&self.output)
    }

    /// Write an `IAC DO <option>` request to the client.
    pub fn write_do_option(&mut self, option: TelnetOption) {
        self.output.borrow_mut().send(&[
            protocol::IAC,
            TelnetCommand::DO.to_byte(),
            option.code(),
        ]);
    }

    /// Write an `IAC WILL <option>` announcement to the client.
    pub fn write_will_option(&mut self, option: TelnetOption) {
        self.output.borrow_mut().send(&[
            protocol::IAC,
            TelnetCommand::WILL.to_byte(),
            option.code(),
        ]);
    }

    /// Whether BINARY transmission is active in the receive direction.
    pub fn receive_binary(&self) -> bool {
        self.receive_binary
    }

    pub(crate) fn set_receive_binary(&mut self, enabled: bool) {
        self.receive_binary = enabled;
    }

    /// True while the decoder sits in the middle of a command sequence and
    /// needs more bytes to finish it.
    pub fn has_pending_sequence(&self) -> bool {
        self.status != Status::Data
    }

    /// Feed received bytes through the state machine. Data batches and
    /// protocol events are dispatched to `handler` in wire order; any data
    /// still pending when the input is exhausted is flushed before
    /// returning.
    pub fn receive(&mut self, data: &[u8], handler: &mut dyn TelnetHandler) {
        for &b in data {
            self.handle(b, handler);
        }
        self.flush_data_if_necessary(handler);
    }

    fn handle(&mut self, b: u8, handler: &mut dyn TelnetHandler) {
        match self.status {
            Status::Data => {
                if b == protocol::IAC {
                    if self.receive_binary {
                        self.status = Status::Esc;
                    } else {
                        self.flush_data_if_necessary(handler);
                        self.status = Status::Iac;
                    }
                } else {
                    self.append_data(b, handler);
                }
            }
            Status::Esc => {
                if b == protocol::IAC {
                    // IAC IAC collapses to a literal 0xFF data byte
                    self.append_data(protocol::IAC, handler);
                    self.status = Status::Data;
                } else {
                    self.flush_data_if_necessary(handler);
                    self.handle_command(b, handler);
                }
            }
            Status::Iac => self.handle_command(b, handler),
            Status::Sb => self.handle_subnegotiation(b, handler),
            Status::Do => {
                self.status = Status::Data;
                self.on_option_do(b, handler);
            }
            Status::Dont => {
                self.status = Status::Data;
                self.on_option_dont(b, handler);
            }
            Status::Will => {
                self.status = Status::Data;
                self.on_option_will(b, handler);
            }
            Status::Wont => {
                self.status = Status::Data;
                self.on_option_wont(b, handler);
            }
        }
    }

    /// Dispatch the byte following an IAC.
    fn handle_command(&mut self, b: u8, handler: &mut dyn TelnetHandler) {
        match TelnetCommand::from_byte(b) {
            Some(TelnetCommand::DO) => self.status = Status::Do,
            Some(TelnetCommand::DONT) => self.status = Status::Dont,
            Some(TelnetCommand::WILL) => self.status = Status::Will,
            Some(TelnetCommand::WONT) => self.status = Status::Wont,
            Some(TelnetCommand::SB) => {
                self.params_option_code = None;
                self.params = Vec::with_capacity(PARAMS_GROWTH);
                self.params_iac = false;
                self.status = Status::Sb;
            }
            _ => {
                // AYT, NOP, BRK and friends carry no parameters
                handler.on_command(b);
                self.status = Status::Data;
            }
        }
    }

    /// Handle one byte of an `IAC SB <option> <params...> IAC SE` sequence.
    /// The first byte names the option; afterwards IAC IAC collapses to a
    /// literal 255 parameter byte and IAC SE terminates the sequence.
    fn handle_subnegotiation(&mut self, b: u8, handler: &mut dyn TelnetHandler) {
        if self.params_option_code.is_none() {
            self.params_option_code = Some(b);
            return;
        }
        if self.params_iac {
            self.params_iac = false;
            if b == TelnetCommand::SE.to_byte() {
                let option_code = self.params_option_code.take();
                let params = std::mem::take(&mut self.params);
                self.status = Status::Data;
                if let Some(code) = option_code {
                    self.on_option_parameters(code, &params, handler);
                }
            } else if b == protocol::IAC {
                self.append_param(protocol::IAC);
            }
            // any other byte after IAC inside SB is dropped
        } else if b == protocol::IAC {
            self.params_iac = true;
        } else {
            self.append_param(b);
        }
    }

    /// Handle an option `DO` request. Known options dispatch to their
    /// behavior; unknown options are refused with `IAC WONT <code>`.
    fn on_option_do(&mut self, option_code: u8, handler: &mut dyn TelnetHandler) {
        match TelnetOption::from_byte(option_code) {
            Some(option) => option.handle_do(self, handler),
            None => self.output.borrow_mut().send(&[
                protocol::IAC,
                TelnetCommand::WONT.to_byte(),
                option_code,
            ]),
        }
    }

    /// Handle an option `DONT` request. Unknown options are ignored.
    fn on_option_dont(&mut self, option_code: u8, handler: &mut dyn TelnetHandler) {
        if let Some(option) = TelnetOption::from_byte(option_code) {
            option.handle_dont(self, handler);
        }
    }

    /// Handle an option `WILL` announcement. Known options dispatch to their
    /// behavior; unknown options are refused with `IAC DONT <code>`.
    fn on_option_will(&mut self, option_code: u8, handler: &mut dyn TelnetHandler) {
        match TelnetOption::from_byte(option_code) {
            Some(option) => option.handle_will(self, handler),
            None => self.output.borrow_mut().send(&[
                protocol::IAC,
                TelnetCommand::DONT.to_byte(),
                option_code,
            ]),
        }
    }

    /// Handle an option `WONT` announcement. Unknown options are ignored.
    fn on_option_wont(&mut self, option_code: u8, handler: &mut dyn TelnetHandler) {
        if let Some(option) = TelnetOption::from_byte(option_code) {
            option.handle_wont(self, handler);
        }
    }

    /// Dispatch a completed sub-negotiation to its option. Sequences for
    /// unknown options are discarded.
    fn on_option_parameters(&mut self, option_code: u8, params: &[u8], handler: &mut dyn TelnetHandler) {
        if let Some(option) = TelnetOption::from_byte(option_code) {
            option.handle_parameters(self, params, handler);
        }
    }

    /// Append a data byte, flushing first when the batch buffer is full.
    fn append_data(&mut self, b: u8, handler: &mut dyn TelnetHandler) {
        if self.pending.len() >= PENDING_CAPACITY {
            self.flush_data(handler);
        }
        self.pending.push(b);
    }

    fn flush_data_if_necessary(&mut self, handler: &mut dyn TelnetHandler) {
        if !self.pending.is_empty() {
            self.flush_data(handler);
        }
    }

    fn flush_data(&mut self, handler: &mut dyn TelnetHandler) {
        // drain keeps the buffer's capacity for the next batch
        let batch: Vec<u8> = self.pending.drain(..).collect();
        handler.on_data(&batch);
    }

    fn append_param(&mut self, b: u8) {
        if self.params.len() == self.params.capacity() {
            self.params.reserve_exact(PARAMS_GROWTH);
        }
        self.params.push(b);
    }
}
