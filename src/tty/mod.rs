//! The transport-neutral terminal connection surface.
//!
//! A [`TtyConnection`] is what applications program against: code points in
//! and out, size and terminal-type reports, inline signals, and a serial
//! executor to run follow-up work on. The telnet and web adapters both
//! implement it over the same codec pipeline.

pub mod event_decoder;
pub mod output;

use std::collections::VecDeque;
use std::time::Duration;

pub use event_decoder::TtyEventDecoder;
pub use output::TtyWriter;

/// A deferred unit of work for the connection's executor.
pub type Task = Box<dyn FnOnce()>;

/// Inline signals scanned out of the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyEvent {
    /// Interrupt, Ctrl-C by default
    Intr,
    /// End of input, Ctrl-D by default
    Eof,
    /// Suspend, Ctrl-Z by default
    Susp,
}

/// A terminal dimension in columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector {
    /// Columns
    pub x: u16,
    /// Rows
    pub y: u16,
}

impl Vector {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// The facade both transport adapters expose to applications.
pub trait TtyConnection {
    /// A cloneable handle on the encoding output path, usable from
    /// callbacks without holding the connection itself.
    fn writer(&self) -> TtyWriter;

    /// Write text through the output pipeline (newline translation, then
    /// charset encoding).
    fn write(&mut self, text: &str);

    /// Install or clear the handler receiving decoded input code points.
    fn set_stdin_handler(&mut self, handler: Option<Box<dyn FnMut(&[char])>>);

    /// Install or clear the handler receiving inline signals. While no
    /// handler is installed, signal characters flow through as data.
    fn set_event_handler(&mut self, handler: Option<Box<dyn FnMut(TtyEvent, char)>>);

    /// Install or clear the handler notified of size reports.
    fn set_size_handler(&mut self, handler: Option<Box<dyn FnMut(Vector)>>);

    /// Install or clear the handler notified of the terminal type.
    fn set_terminal_type_handler(&mut self, handler: Option<Box<dyn FnMut(&str)>>);

    /// Install or clear the handler fired once when the connection goes
    /// away.
    fn set_close_handler(&mut self, handler: Option<Box<dyn FnOnce()>>);

    /// The most recent size report, zero until one arrives.
    fn size(&self) -> Vector;

    /// The terminal type, if the client reported one.
    fn terminal_type(&self) -> Option<String>;

    /// When input was last received on this connection.
    fn last_accessed_time(&self) -> jiff::Timestamp;

    /// Run a task on the connection's serial executor.
    fn execute(&mut self, task: Task);

    /// Run a task on the connection's serial executor after a delay.
    fn schedule(&mut self, task: Task, delay: Duration);

    /// Close the connection. Repeated calls are no-ops.
    fn close(&mut self);
}

/// Queue for decoded input that arrives before the connection is ready to
/// deliver it, preserving batch boundaries.
#[derive(Default)]
pub struct ReadBuffer {
    batches: VecDeque<Vec<char>>,
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch: &[char]) {
        self.batches.push_back(batch.to_vec());
    }

    pub fn pop(&mut self) -> Option<Vec<char>> {
        self.batches.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
