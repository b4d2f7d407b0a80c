//! The web transport adapter: a [`TtyConnection`] over JSON text messages,
//! for browser terminals speaking over a WebSocket-style channel.
//!
//! Inbound messages are small JSON objects tagged by an `action` field:
//!
//! ```json
//! {"action": "read", "data": "ls -l\r"}
//! {"action": "resize", "cols": 120, "rows": 40}
//! ```
//!
//! Outbound terminal output is copied into buffers from the shared
//! [`BufferPool`] and handed to the transport by value; dropping the buffer
//! returns it to the pool, so a transport that writes asynchronously keeps
//! it alive exactly as long as it needs to.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::{BinaryDecoder, Charset};
use crate::config::TermConfig;
use crate::errors::{TermError, TermResult};
use crate::executor::Executor;
use crate::pool::{BufferPool, PooledBuf};
use crate::tty::{Task, TtyConnection, TtyEvent, TtyEventDecoder, TtyWriter, Vector};

/// Terminal type reported for all web connections.
const TERMINAL_TYPE: &str = "vt100";

/// The channel carrying JSON frames to the browser.
pub trait WebTransport {
    /// Ship a filled output buffer. Dropping it returns it to the pool.
    fn send_text(&mut self, data: PooledBuf);

    /// Close the underlying channel.
    fn close(&mut self);
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientMessage {
    Read {
        data: String,
    },
    Resize {
        #[serde(default)]
        cols: u16,
        #[serde(default)]
        rows: u16,
    },
}

/// A [`TtyConnection`] over a JSON message transport.
pub struct WebTtyConnection {
    decoder: BinaryDecoder,
    event_decoder: TtyEventDecoder,
    writer: TtyWriter,
    transport: Rc<RefCell<Box<dyn WebTransport>>>,
    executor: Rc<dyn Executor>,
    size: Vector,
    last_accessed: jiff::Timestamp,
    size_handler: Option<Box<dyn FnMut(Vector)>>,
    terminal_type_handler: Option<Box<dyn FnMut(&str)>>,
    close_handler: Option<Box<dyn FnOnce()>>,
    closed: bool,
    debug_logging: bool,
}

impl WebTtyConnection {
    /// Build a connection shipping output buffers from `pool` through
    /// `transport`. Browser terminals are UTF-8 from the first byte, so
    /// there is no charset negotiation and no readiness gate.
    pub fn new(
        config: &TermConfig,
        pool: BufferPool,
        transport: Box<dyn WebTransport>,
        executor: Rc<dyn Executor>,
    ) -> Self {
        let transport = Rc::new(RefCell::new(transport));

        let sink_transport = Rc::clone(&transport);
        let writer = TtyWriter::new(
            Charset::Utf8,
            Box::new(move |bytes: &[u8]| {
                // a closed pool means the server is tearing down
                if let Ok(mut buf) = pool.acquire() {
                    buf.extend_from_slice(bytes);
                    sink_transport.borrow_mut().send_text(buf);
                }
            }),
        );

        Self {
            decoder: BinaryDecoder::new(Charset::Utf8),
            event_decoder: TtyEventDecoder::new(
                config.signals.interrupt,
                config.signals.eof,
                config.signals.suspend,
            ),
            writer,
            transport,
            executor,
            size: Vector::new(80, 24),
            last_accessed: jiff::Timestamp::now(),
            size_handler: None,
            terminal_type_handler: None,
            close_handler: None,
            closed: false,
            debug_logging: false,
        }
    }

    /// Enable debug output to stderr for malformed messages.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug_logging = debug;
        self
    }

    /// Feed one JSON text message from the transport into the pipeline.
    pub fn receive_message(&mut self, message: &str) -> TermResult<()> {
        let parsed: ClientMessage = serde_json::from_str(message).map_err(|e| {
            if self.debug_logging {
                eprintln!("[DEBUG] Discarding malformed message: {}", e);
            }
            TermError::InvalidMessage(e.to_string())
        })?;

        match parsed {
            ClientMessage::Read { data } => {
                self.last_accessed = jiff::Timestamp::now();
                let event_decoder = &self.event_decoder;
                self.decoder
                    .write(data.as_bytes(), &mut |codepoints| {
                        event_decoder.write(codepoints);
                    });
            }
            ClientMessage::Resize { cols, rows } => {
                // only a real change is reported onward
                if cols > 0 && rows > 0 && (cols != self.size.x || rows != self.size.y) {
                    self.size = Vector::new(cols, rows);
                    if let Some(handler) = &mut self.size_handler {
                        handler(self.size);
                    }
                }
            }
        }
        Ok(())
    }

    /// Tell the connection its transport is gone.
    pub fn transport_closed(&mut self) {
        self.fire_close();
    }

    fn fire_close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Some(handler) = self.close_handler.take() {
                handler();
            }
        }
    }
}

impl TtyConnection for WebTtyConnection {
    fn writer(&self) -> TtyWriter {
        self.writer.clone()
    }

    fn write(&mut self, text: &str) {
        self.writer.write_str(text);
    }

    fn set_stdin_handler(&mut self, handler: Option<Box<dyn FnMut(&[char])>>) {
        self.event_decoder.set_read_handler(handler);
    }

    fn set_event_handler(&mut self, handler: Option<Box<dyn FnMut(TtyEvent, char)>>) {
        self.event_decoder.set_event_handler(handler);
    }

    fn set_size_handler(&mut self, handler: Option<Box<dyn FnMut(Vector)>>) {
        self.size_handler = handler;
    }

    fn set_terminal_type_handler(&mut self, handler: Option<Box<dyn FnMut(&str)>>) {
        // the type is fixed, report it immediately
        if let Some(mut handler) = handler {
            handler(TERMINAL_TYPE);
            self.terminal_type_handler = Some(handler);
        } else {
            self.terminal_type_handler = None;
        }
    }

    fn set_close_handler(&mut self, handler: Option<Box<dyn FnOnce()>>) {
        self.close_handler = handler;
    }

    fn size(&self) -> Vector {
        self.size
    }

    fn terminal_type(&self) -> Option<String> {
        Some(TERMINAL_TYPE.to_string())
    }

    fn last_accessed_time(&self) -> jiff::Timestamp {
        self.last_accessed
    }

    fn execute(&mut self, task: Task) {
        self.executor.execute(task);
    }

    fn schedule(&mut self, task: Task, delay: Duration) {
        self.executor.schedule(task, delay);
    }

    fn close(&mut self) {
        self.transport.borrow_mut().close();
        self.fire_close();
    }
}
