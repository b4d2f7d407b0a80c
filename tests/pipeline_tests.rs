use std::cell::RefCell;
use std::rc::Rc;

use telnet_protocol::Transport;
use termdock::codec::Charset;
use termdock::config::TermConfig;
use termdock::errors::TermError;
use termdock::executor::TaskQueue;
use termdock::pool::{BufferPool, PooledBuf};
use termdock::telnet_tty::TelnetTtyConnection;
use termdock::tty::{TtyConnection, TtyEvent, Vector};
use termdock::web_tty::{WebTransport, WebTtyConnection};

const IAC: u8 = 255;
const WILL: u8 = 251;
const DO: u8 = 253;
const SB: u8 = 250;
const SE: u8 = 240;

struct CaptureTransport {
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Transport for CaptureTransport {
    fn send(&mut self, data: &[u8]) {
        self.sent.borrow_mut().extend_from_slice(data);
    }

    fn close(&mut self) {}
}

fn telnet_conn(config: TermConfig) -> (TelnetTtyConnection, Rc<RefCell<Vec<u8>>>) {
    let sent = Rc::new(RefCell::new(Vec::new()));
    let transport = CaptureTransport {
        sent: Rc::clone(&sent),
    };
    let conn = TelnetTtyConnection::new(&config, Box::new(transport), Rc::new(TaskQueue::new()));
    (conn, sent)
}

/// Client side of BINARY negotiation for both directions.
fn accept_binary(conn: &mut TelnetTtyConnection) {
    conn.receive(&[IAC, WILL, 0, IAC, DO, 0]);
}

fn collect_stdin(conn: &mut TelnetTtyConnection) -> Rc<RefCell<Vec<char>>> {
    let received = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&received);
    conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
        log.borrow_mut().extend_from_slice(data);
    })));
    received
}

#[test]
fn test_full_session_utf8_both_directions() {
    let (mut conn, sent) = telnet_conn(TermConfig::default());
    let received = collect_stdin(&mut conn);

    conn.open();
    accept_binary(&mut conn);
    sent.borrow_mut().clear();

    conn.receive("héllo wörld".as_bytes());
    assert_eq!(received.borrow().iter().collect::<String>(), "héllo wörld");

    conn.write("tschüss\n");
    assert_eq!(*sent.borrow(), "tschüss\r\n".as_bytes().to_vec());
}

#[test]
fn test_torn_packets_reassemble() {
    let (mut conn, _sent) = telnet_conn(TermConfig::default());
    let received = collect_stdin(&mut conn);

    conn.open();
    // negotiation replies torn across packet boundaries
    conn.receive(&[IAC]);
    conn.receive(&[WILL]);
    conn.receive(&[0, IAC, DO]);
    conn.receive(&[0]);

    // a multi-byte code point torn the same way
    let euro = "€".as_bytes();
    conn.receive(&euro[..1]);
    conn.receive(&euro[1..]);

    assert_eq!(received.borrow().iter().collect::<String>(), "€");
}

#[test]
fn test_escaped_iac_reaches_application_as_one_byte() {
    let mut config = TermConfig::default();
    // a bare 0xFF is not valid UTF-8, pick a charset where it decodes
    config.telnet.charset = Charset::Ascii;
    let (mut conn, _sent) = telnet_conn(config);
    let received = collect_stdin(&mut conn);

    conn.open();
    accept_binary(&mut conn);
    conn.receive(&[b'a', IAC, IAC, b'b']);

    // the doubled IAC collapses to a single data byte, unmapped in ASCII
    assert_eq!(received.borrow().iter().collect::<String>(), "a\u{fffd}b");
}

#[test]
fn test_ascii_charset_sanitizes_both_directions() {
    let mut config = TermConfig::default();
    config.telnet.charset = Charset::Ascii;
    let (mut conn, sent) = telnet_conn(config);
    let received = collect_stdin(&mut conn);

    conn.open();
    accept_binary(&mut conn);
    sent.borrow_mut().clear();

    conn.receive(&[b'o', b'k', 0x80]);
    assert_eq!(received.borrow().iter().collect::<String>(), "ok\u{fffd}");

    conn.write("café");
    assert_eq!(*sent.borrow(), b"caf?".to_vec());
}

#[test]
fn test_custom_signal_configuration() {
    let mut config = TermConfig::default();
    config.signals.interrupt = '\u{18}'; // C-x instead of C-c
    let (mut conn, _sent) = telnet_conn(config);

    let events = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&events);
    conn.set_event_handler(Some(Box::new(move |event, cp| {
        log.borrow_mut().push((event, cp));
    })));
    let received = collect_stdin(&mut conn);

    conn.open();
    accept_binary(&mut conn);
    conn.receive(b"\x18\x03");

    // C-x fires the interrupt, C-c is plain data now
    assert_eq!(*events.borrow(), vec![(TtyEvent::Intr, '\u{18}')]);
    assert_eq!(received.borrow().iter().collect::<String>(), "\u{3}");
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("termdock-test-{}.conf", std::process::id()));
    let contents = "\
[telnet]
in_binary = true
out_binary = false
charset = \"ascii\"

[signals]
interrupt = 24

[readline]
history_limit = 7
";
    std::fs::write(&path, contents).unwrap();

    let config = TermConfig::load_from_file(path.to_str().unwrap()).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(config.telnet.in_binary);
    assert!(!config.telnet.out_binary);
    assert_eq!(config.telnet.charset, Charset::Ascii);
    assert_eq!(config.signals.interrupt, '\u{18}');
    assert_eq!(config.readline.history_limit, 7);
    // untouched sections keep their defaults
    assert_eq!(config.signals.eof, '\u{4}');
}

#[test]
fn test_naws_and_terminal_type_drive_state() {
    let (mut conn, _sent) = telnet_conn(TermConfig::default());
    conn.open();

    conn.receive(&[IAC, SB, 31, 0, 132, 0, 50, IAC, SE]);
    let mut terminal_type = vec![IAC, SB, 24, 0];
    terminal_type.extend_from_slice(b"vt220");
    terminal_type.extend_from_slice(&[IAC, SE]);
    conn.receive(&terminal_type);

    assert_eq!(conn.size(), Vector::new(132, 50));
    assert_eq!(conn.terminal_type(), Some("vt220".to_string()));
}

// --- web adapter ---

struct CaptureWebTransport {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
    closed: Rc<RefCell<bool>>,
}

impl WebTransport for CaptureWebTransport {
    fn send_text(&mut self, data: PooledBuf) {
        self.frames.borrow_mut().push(data.to_vec());
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

fn web_conn(pool: BufferPool) -> (WebTtyConnection, Rc<RefCell<Vec<Vec<u8>>>>) {
    let frames = Rc::new(RefCell::new(Vec::new()));
    let transport = CaptureWebTransport {
        frames: Rc::clone(&frames),
        closed: Rc::new(RefCell::new(false)),
    };
    let conn = WebTtyConnection::new(
        &TermConfig::default(),
        pool,
        Box::new(transport),
        Rc::new(TaskQueue::new()),
    );
    (conn, frames)
}

#[test]
fn test_web_read_message_reaches_stdin_handler() {
    let config = TermConfig::default();
    let (mut conn, _frames) = web_conn(BufferPool::new(&config.pool));

    let received = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&received);
    conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
        log.borrow_mut().extend_from_slice(data);
    })));

    conn.receive_message(r#"{"action":"read","data":"whoami\r"}"#)
        .unwrap();

    assert_eq!(received.borrow().iter().collect::<String>(), "whoami\r");
}

#[test]
fn test_web_resize_message_updates_size() {
    let config = TermConfig::default();
    let (mut conn, _frames) = web_conn(BufferPool::new(&config.pool));

    let sizes = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&sizes);
    conn.set_size_handler(Some(Box::new(move |size| log.borrow_mut().push(size))));

    conn.receive_message(r#"{"action":"resize","cols":100,"rows":30}"#)
        .unwrap();

    assert_eq!(conn.size(), Vector::new(100, 30));
    assert_eq!(*sizes.borrow(), vec![Vector::new(100, 30)]);
}

#[test]
fn test_web_malformed_message_is_an_error() {
    let config = TermConfig::default();
    let (mut conn, _frames) = web_conn(BufferPool::new(&config.pool));

    let result = conn.receive_message("{\"action\":\"launch\"}");
    assert!(matches!(result, Err(TermError::InvalidMessage(_))));
}

#[test]
fn test_web_output_frames_come_from_the_pool() {
    let config = TermConfig::default();
    let pool = BufferPool::new(&config.pool);
    let (mut conn, frames) = web_conn(pool.clone());

    for _ in 0..10 {
        conn.write("tick\n");
    }

    // each write flushes the text and the CRLF separately
    assert_eq!(frames.borrow().len(), 20);
    assert_eq!(frames.borrow()[0], b"tick".to_vec());
    assert_eq!(frames.borrow()[1], b"\r\n".to_vec());
    // frames were dropped by the transport, so one buffer cycled through
    // the pool instead of twenty being allocated
    assert_eq!(pool.allocated(), 1);
}
