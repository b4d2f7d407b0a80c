//! The Telnet transport adapter: a [`TtyConnection`] over a
//! [`telnet_protocol::TelnetSession`].
//!
//! On open the connection pushes the server into character-at-a-time
//! "kludge mode" (WILL ECHO + WILL SUPPRESS-GO-AHEAD), requests BINARY
//! transmission per configured direction, and asks for window size and
//! terminal type reports. Decoded input runs through the codec pipeline:
//! bytes -> code points -> signal scan -> application.
//!
//! Input decoded before the connection is *ready* (BINARY negotiation
//! still in flight) or before a stdin handler is installed is buffered and
//! replayed in order once both hold, so an eager client loses nothing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use telnet_protocol::{TelnetHandler, TelnetOption, TelnetOutput, TelnetSession, Transport};

use crate::codec::{BinaryDecoder, Charset};
use crate::config::TermConfig;
use crate::executor::Executor;
use crate::tty::{ReadBuffer, Task, TtyConnection, TtyEvent, TtyEventDecoder, TtyWriter, Vector};

/// Everything the [`TelnetHandler`] callbacks touch, split from the session
/// so decoding can borrow both disjointly.
struct TtyState {
    in_binary: bool,
    out_binary: bool,
    receiving_binary: bool,
    sending_binary: bool,
    accepted: bool,
    charset: Charset,
    decoder: BinaryDecoder,
    read_buffer: ReadBuffer,
    event_decoder: TtyEventDecoder,
    writer: TtyWriter,
    size: Vector,
    terminal_type: Option<String>,
    last_accessed: jiff::Timestamp,
    size_handler: Option<Box<dyn FnMut(Vector)>>,
    terminal_type_handler: Option<Box<dyn FnMut(&str)>>,
    ready_handler: Option<Box<dyn FnOnce()>>,
    close_handler: Option<Box<dyn FnOnce()>>,
    closed: bool,
}

impl TtyState {
    /// Readiness gate: each requested BINARY direction must be negotiated
    /// before buffered input is released and the ready handler fires.
    fn check_accept(&mut self) {
        if self.accepted {
            return;
        }
        if (self.out_binary && !self.sending_binary) || (self.in_binary && !self.receiving_binary) {
            return;
        }
        self.accepted = true;
        self.drain_read_buffer();
        if let Some(handler) = self.ready_handler.take() {
            handler();
        }
    }

    /// Replay buffered input, in order, once someone is there to take it.
    fn drain_read_buffer(&mut self) {
        if !self.event_decoder.has_read_handler() {
            return;
        }
        while let Some(batch) = self.read_buffer.pop() {
            self.event_decoder.write(&batch);
        }
    }

    fn deliver(&mut self, batch: &[char]) {
        if self.accepted && self.event_decoder.has_read_handler() {
            self.event_decoder.write(batch);
        } else {
            self.read_buffer.push(batch);
        }
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

impl TelnetHandler for TtyState {
    fn on_data(&mut self, data: &[u8]) {
        let mut batches: Vec<Vec<char>> = Vec::new();
        self.decoder.write(data, &mut |codepoints| {
            batches.push(codepoints.to_vec());
        });
        for batch in batches {
            self.deliver(&batch);
        }
    }

    fn on_size(&mut self, width: u16, height: u16) {
        self.size = Vector::new(width, height);
        if let Some(handler) = &mut self.size_handler {
            handler(self.size);
        }
    }

    fn on_terminal_type(&mut self, terminal_type: &str) {
        self.terminal_type = Some(terminal_type.to_string());
        if let Some(handler) = &mut self.terminal_type_handler {
            handler(terminal_type);
        }
    }

    fn on_send_binary(&mut self, enabled: bool) {
        self.sending_binary = enabled;
        if enabled {
            // re-arm the output path with the full charset
            self.writer.set_charset(self.charset);
        }
        self.check_accept();
    }

    fn on_receive_binary(&mut self, enabled: bool) {
        self.receiving_binary = enabled;
        if enabled {
            // re-arm the input path with the full charset
            self.decoder.set_charset(self.charset);
        }
        self.check_accept();
    }

    fn on_close(&mut self) {
        self.fire_close();
    }
}

/// A [`TtyConnection`] over a Telnet transport.
pub struct TelnetTtyConnection {
    session: TelnetSession,
    tty: TtyState,
    executor: Rc<dyn Executor>,
}

impl TelnetTtyConnection {
    /// Build a connection writing to `transport` and running callbacks on
    /// `executor`. Nothing is sent until [`TelnetTtyConnection::open`].
    pub fn new(
        config: &TermConfig,
        transport: Box<dyn Transport>,
        executor: Rc<dyn Executor>,
    ) -> Self {
        let output = Rc::new(RefCell::new(TelnetOutput::new(transport)));
        let session = TelnetSession::new(Rc::clone(&output));

        let writer_output = Rc::clone(&output);
        // both paths start 7-bit safe until BINARY is negotiated
        let writer = TtyWriter::new(
            Charset::Ascii,
            Box::new(move |bytes: &[u8]| writer_output.borrow_mut().write(bytes)),
        );

        let tty = TtyState {
            in_binary: config.telnet.in_binary,
            out_binary: config.telnet.out_binary,
            receiving_binary: false,
            sending_binary: false,
            accepted: false,
            charset: config.telnet.charset,
            decoder: BinaryDecoder::new(Charset::Ascii),
            read_buffer: ReadBuffer::new(),
            event_decoder: TtyEventDecoder::new(
                config.signals.interrupt,
                config.signals.eof,
                config.signals.suspend,
            ),
            writer,
            size: Vector::new(0, 0),
            terminal_type: None,
            last_accessed: jiff::Timestamp::now(),
            size_handler: None,
            terminal_type_handler: None,
            ready_handler: None,
            close_handler: None,
            closed: false,
        };

        Self {
            session,
            tty,
            executor,
        }
    }

    /// Install the handler fired once when negotiation settles.
    pub fn set_ready_handler(&mut self, handler: Option<Box<dyn FnOnce()>>) {
        self.tty.ready_handler = handler;
    }

    /// Send the opening negotiation burst. When no BINARY direction is
    /// requested the connection is ready immediately.
    pub fn open(&mut self) {
        self.session.write_will_option(TelnetOption::Echo);
        self.session.write_will_option(TelnetOption::SuppressGoAhead);
        if self.tty.in_binary {
            self.session.write_do_option(TelnetOption::Binary);
        }
        if self.tty.out_binary {
            self.session.write_will_option(TelnetOption::Binary);
        }
        self.session.write_do_option(TelnetOption::Naws);
        self.session.write_do_option(TelnetOption::TerminalType);
        self.tty.check_accept();
    }

    /// Feed bytes read from the transport into the protocol machinery.
    pub fn receive(&mut self, data: &[u8]) {
        self.tty.last_accessed = jiff::Timestamp::now();
        self.session.receive(data, &mut self.tty);
    }

    /// Tell the connection its transport is gone (remote close or error).
    pub fn transport_closed(&mut self) {
        self.tty.fire_close();
    }
}

impl TtyConnection for TelnetTtyConnection {
    fn writer(&self) -> TtyWriter {
        self.tty.writer.clone()
    }

    fn write(&mut self, text: &str) {
        self.tty.writer.write_str(text);
    }

    fn set_stdin_handler(&mut self, handler: Option<Box<dyn FnMut(&[char])>>) {
        self.tty.event_decoder.set_read_handler(handler);
        if self.tty.accepted {
            self.tty.drain_read_buffer();
        }
    }

    fn set_event_handler(&mut self, handler: Option<Box<dyn FnMut(TtyEvent, char)>>) {
        self.tty.event_decoder.set_event_handler(handler);
    }

    fn set_size_handler(&mut self, handler: Option<Box<dyn FnMut(Vector)>>) {
        self.tty.size_handler = handler;
    }

    fn set_terminal_type_handler(&mut self, handler: Option<Box<dyn FnMut(&str)>>) {
        self.tty.terminal_type_handler = handler;
        // a type reported before the handler was installed is not lost
        if let (Some(handler), Some(terminal_type)) = (
            &mut self.tty.terminal_type_handler,
            &self.tty.terminal_type,
        ) {
            handler(terminal_type);
        }
    }

    fn set_close_handler(&mut self, handler: Option<Box<dyn FnOnce()>>) {
        self.tty.close_handler = handler;
    }

    fn size(&self) -> Vector {
        self.tty.size
    }

    fn terminal_type(&self) -> Option<String> {
        self.tty.terminal_type.clone()
    }

    fn last_accessed_time(&self) -> jiff::Timestamp {
        self.tty.last_accessed
    }

    fn execute(&mut self, task: Task) {
        self.executor.execute(task);
    }

    fn schedule(&mut self, task: Task, delay: Duration) {
        self.executor.schedule(task, delay);
    }

    fn close(&mut self) {
        self.session.output().borrow_mut().close();
        self.tty.fire_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TaskQueue;

    const IAC: u8 = 255;
    const WILL: u8 = 251;
    const DO: u8 = 253;
    const SB: u8 = 250;
    const SE: u8 = 240;

    struct CaptureTransport {
        sent: Rc<RefCell<Vec<u8>>>,
        closed: Rc<RefCell<bool>>,
    }

    impl Transport for CaptureTransport {
        fn send(&mut self, data: &[u8]) {
            self.sent.borrow_mut().extend_from_slice(data);
        }

        fn close(&mut self) {
            *self.closed.borrow_mut() = true;
        }
    }

    struct Harness {
        conn: TelnetTtyConnection,
        sent: Rc<RefCell<Vec<u8>>>,
        closed: Rc<RefCell<bool>>,
    }

    fn harness(config: TermConfig) -> Harness {
        let sent = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(RefCell::new(false));
        let transport = CaptureTransport {
            sent: Rc::clone(&sent),
            closed: Rc::clone(&closed),
        };
        let conn = TelnetTtyConnection::new(&config, Box::new(transport), Rc::new(TaskQueue::new()));
        Harness { conn, sent, closed }
    }

    /// Client side of BINARY negotiation for both directions.
    fn accept_binary(conn: &mut TelnetTtyConnection) {
        conn.receive(&[IAC, WILL, 0, IAC, DO, 0]);
    }

    #[test]
    fn test_open_sends_negotiation_burst() {
        let mut h = harness(TermConfig::default());
        h.conn.open();

        assert_eq!(
            *h.sent.borrow(),
            vec![
                IAC, WILL, 1,  // WILL ECHO
                IAC, WILL, 3,  // WILL SUPPRESS-GO-AHEAD
                IAC, DO, 0,    // DO BINARY
                IAC, WILL, 0,  // WILL BINARY
                IAC, DO, 31,   // DO NAWS
                IAC, DO, 24,   // DO TERMINAL-TYPE
            ]
        );
    }

    #[test]
    fn test_ready_waits_for_binary_negotiation() {
        let mut h = harness(TermConfig::default());
        let ready = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ready);
        h.conn
            .set_ready_handler(Some(Box::new(move || *flag.borrow_mut() = true)));

        h.conn.open();
        assert!(!*ready.borrow());

        h.conn.receive(&[IAC, WILL, 0]);
        assert!(!*ready.borrow());

        h.conn.receive(&[IAC, DO, 0]);
        assert!(*ready.borrow());
    }

    #[test]
    fn test_ready_fires_on_open_without_binary() {
        let mut config = TermConfig::default();
        config.telnet.in_binary = false;
        config.telnet.out_binary = false;

        let mut h = harness(config);
        let ready = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ready);
        h.conn
            .set_ready_handler(Some(Box::new(move || *flag.borrow_mut() = true)));

        h.conn.open();
        assert!(*ready.borrow());
    }

    #[test]
    fn test_input_before_ready_is_replayed_in_order() {
        let mut h = harness(TermConfig::default());
        let received: Rc<RefCell<Vec<char>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&received);
        h.conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            log.borrow_mut().extend_from_slice(data);
        })));

        h.conn.open();
        h.conn.receive(b"early");
        assert!(received.borrow().is_empty());

        accept_binary(&mut h.conn);
        h.conn.receive(b"-late");

        assert_eq!(
            received.borrow().iter().collect::<String>(),
            "early-late".to_string()
        );
    }

    #[test]
    fn test_input_before_handler_install_is_replayed() {
        let mut h = harness(TermConfig::default());
        h.conn.open();
        accept_binary(&mut h.conn);
        h.conn.receive(b"queued");

        let received: Rc<RefCell<Vec<char>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&received);
        h.conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            log.borrow_mut().extend_from_slice(data);
        })));

        assert_eq!(received.borrow().iter().collect::<String>(), "queued");
    }

    #[test]
    fn test_utf8_input_after_binary_negotiation() {
        let mut h = harness(TermConfig::default());
        let received: Rc<RefCell<Vec<char>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&received);
        h.conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            log.borrow_mut().extend_from_slice(data);
        })));

        h.conn.open();
        accept_binary(&mut h.conn);
        h.conn.receive("héllo".as_bytes());

        assert_eq!(received.borrow().iter().collect::<String>(), "héllo");
    }

    #[test]
    fn test_signal_ordering_with_surrounding_data() {
        let mut h = harness(TermConfig::default());
        let journal: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let data_log = Rc::clone(&journal);
        h.conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            data_log
                .borrow_mut()
                .push(format!("data:{}", data.iter().collect::<String>()));
        })));
        let event_log = Rc::clone(&journal);
        h.conn.set_event_handler(Some(Box::new(move |event, _cp| {
            event_log.borrow_mut().push(format!("event:{:?}", event));
        })));

        h.conn.open();
        accept_binary(&mut h.conn);
        h.conn.receive(b"abc\x03def");

        assert_eq!(
            *journal.borrow(),
            vec![
                "data:abc".to_string(),
                "event:Intr".to_string(),
                "data:def".to_string(),
            ]
        );
    }

    #[test]
    fn test_write_translates_newlines() {
        let mut h = harness(TermConfig::default());
        h.conn.open();
        h.sent.borrow_mut().clear();

        h.conn.write("hi\n");
        assert_eq!(*h.sent.borrow(), b"hi\r\n".to_vec());
    }

    #[test]
    fn test_naws_report_updates_size_and_handler() {
        let mut h = harness(TermConfig::default());
        let sizes: Rc<RefCell<Vec<Vector>>> = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&sizes);
        h.conn
            .set_size_handler(Some(Box::new(move |size| log.borrow_mut().push(size))));

        h.conn.open();
        assert_eq!(h.conn.size(), Vector::new(0, 0));
        h.conn.receive(&[IAC, SB, 31, 0, 120, 0, 40, IAC, SE]);

        assert_eq!(h.conn.size(), Vector::new(120, 40));
        assert_eq!(*sizes.borrow(), vec![Vector::new(120, 40)]);
    }

    #[test]
    fn test_terminal_type_report() {
        let mut h = harness(TermConfig::default());
        h.conn.open();

        let mut input = vec![IAC, SB, 24, 0];
        input.extend_from_slice(b"xterm-256color");
        input.extend_from_slice(&[IAC, SE]);
        h.conn.receive(&input);

        assert_eq!(h.conn.terminal_type(), Some("xterm-256color".to_string()));
    }

    #[test]
    fn test_terminal_type_handler_installed_late_fires_immediately() {
        let mut h = harness(TermConfig::default());
        h.conn.open();

        let mut input = vec![IAC, SB, 24, 0];
        input.extend_from_slice(b"ansi");
        input.extend_from_slice(&[IAC, SE]);
        h.conn.receive(&input);

        let reported = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&reported);
        h.conn
            .set_terminal_type_handler(Some(Box::new(move |terminal_type| {
                *slot.borrow_mut() = Some(terminal_type.to_string());
            })));

        assert_eq!(*reported.borrow(), Some("ansi".to_string()));
    }

    #[test]
    fn test_echo_from_stdin_handler_reaches_transport() {
        let mut h = harness(TermConfig::default());
        let writer = h.conn.writer();
        h.conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            writer.write_codepoints(data);
        })));

        h.conn.open();
        accept_binary(&mut h.conn);
        h.sent.borrow_mut().clear();

        h.conn.receive(b"x");
        assert_eq!(*h.sent.borrow(), b"x".to_vec());
    }

    #[test]
    fn test_close_fires_handler_once_and_closes_transport() {
        let mut h = harness(TermConfig::default());
        let closes = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&closes);
        h.conn
            .set_close_handler(Some(Box::new(move || *counter.borrow_mut() += 1)));

        h.conn.open();
        h.conn.close();
        h.conn.close();
        h.conn.transport_closed();

        assert_eq!(*closes.borrow(), 1);
        assert!(*h.closed.borrow());
    }
}
