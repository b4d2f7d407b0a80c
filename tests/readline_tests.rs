use std::cell::RefCell;
use std::rc::Rc;

use telnet_protocol::Transport;
use termdock::config::TermConfig;
use termdock::executor::TaskQueue;
use termdock::pool::{BufferPool, PooledBuf};
use termdock::readline::Readline;
use termdock::telnet_tty::TelnetTtyConnection;
use termdock::tty::TtyConnection;
use termdock::web_tty::{WebTransport, WebTtyConnection};

const IAC: u8 = 255;
const WILL: u8 = 251;
const DO: u8 = 253;

struct CaptureTransport {
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Transport for CaptureTransport {
    fn send(&mut self, data: &[u8]) {
        self.sent.borrow_mut().extend_from_slice(data);
    }

    fn close(&mut self) {}
}

/// A readline installed over a fully negotiated Telnet connection.
fn session() -> (TelnetTtyConnection, Readline, Rc<RefCell<Vec<u8>>>) {
    let config = TermConfig::default();
    let sent = Rc::new(RefCell::new(Vec::new()));
    let transport = CaptureTransport {
        sent: Rc::clone(&sent),
    };
    let mut conn =
        TelnetTtyConnection::new(&config, Box::new(transport), Rc::new(TaskQueue::new()));
    let readline = Readline::install(&mut conn, &config.readline);
    conn.open();
    conn.receive(&[IAC, WILL, 0, IAC, DO, 0]);
    sent.borrow_mut().clear();
    (conn, readline, sent)
}

#[test]
fn test_shell_loop_with_history_recall() {
    let (mut conn, readline, _sent) = session();
    let lines: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    fn arm(readline: &Readline, lines: &Rc<RefCell<Vec<String>>>) {
        let readline_again = readline.clone();
        let lines = Rc::clone(lines);
        readline.readline("$ ", move |line| {
            if let Some(line) = line {
                lines.borrow_mut().push(line);
                arm(&readline_again, &lines);
            }
        });
    }
    arm(&readline, &lines);

    conn.receive(b"uptime\r");
    // up arrow on the next prompt recalls the line just accepted
    conn.receive(b"\x1b[A\r");
    // end-of-file finishes the loop without a line
    conn.receive(b"\x04");

    assert_eq!(*lines.borrow(), vec!["uptime", "uptime"]);
    assert!(!readline.is_active());
}

#[test]
fn test_input_torn_across_packets() {
    let (mut conn, readline, _sent) = session();
    let result = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&result);
    readline.readline("> ", move |line| {
        *slot.borrow_mut() = Some(line);
    });

    // a multi-byte code point and an escape sequence, one byte at a time
    conn.receive(b"caf");
    for byte in "é".as_bytes() {
        conn.receive(&[*byte]);
    }
    conn.receive(b"X");
    conn.receive(&[0x1b]);
    conn.receive(b"[");
    conn.receive(b"D");
    conn.receive(b"\x1b[C");
    conn.receive(&[0x7f]);
    conn.receive(b"\r");

    // the cursor bounced left and back, so the backspace removed the X
    assert_eq!(*result.borrow(), Some(Some("café".to_string())));
}

#[test]
fn test_backspace_redraws_line() {
    let (mut conn, readline, sent) = session();
    readline.readline("> ", |_line| {});
    conn.receive(b"ab");
    sent.borrow_mut().clear();

    conn.receive(&[0x7f]);

    // column reset, clear to end of line, prompt and shortened buffer
    assert_eq!(*sent.borrow(), b"\x1b[1G\x1b[K> a".to_vec());
}

#[test]
fn test_prompt_denied_while_active() {
    let (mut conn, readline, _sent) = session();
    let first = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&first);
    readline.readline("> ", move |line| {
        *slot.borrow_mut() = Some(line);
    });

    let stolen = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&stolen);
    readline.readline("> ", move |_line| {
        *flag.borrow_mut() = true;
    });

    conn.receive(b"still mine\r");

    assert_eq!(*first.borrow(), Some(Some("still mine".to_string())));
    assert!(!*stolen.borrow());
}

#[test]
fn test_history_browse_reaches_oldest() {
    let (mut conn, readline, _sent) = session();

    for line in [&b"a\r"[..], b"b\r", b"c\r"] {
        readline.readline("> ", |_line| {});
        conn.receive(line);
    }

    let result = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&result);
    readline.readline("> ", move |line| {
        *slot.borrow_mut() = Some(line);
    });
    // three steps back lands on the oldest surviving entry
    conn.receive(b"\x1b[A\x1b[A\x1b[A\r");

    assert_eq!(*result.borrow(), Some(Some("a".to_string())));
}

// --- readline over the web adapter ---

struct CaptureWebTransport {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl WebTransport for CaptureWebTransport {
    fn send_text(&mut self, data: PooledBuf) {
        self.frames.borrow_mut().push(data.to_vec());
    }

    fn close(&mut self) {}
}

#[test]
fn test_readline_over_web_connection() {
    let config = TermConfig::default();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let transport = CaptureWebTransport {
        frames: Rc::clone(&frames),
    };
    let mut conn = WebTtyConnection::new(
        &config,
        BufferPool::new(&config.pool),
        Box::new(transport),
        Rc::new(TaskQueue::new()),
    );
    let readline = Readline::install(&mut conn, &config.readline);

    let result = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&result);
    readline.readline("web> ", move |line| {
        *slot.borrow_mut() = Some(line);
    });

    conn.receive_message(r#"{"action":"read","data":"pwd\r"}"#)
        .unwrap();

    assert_eq!(*result.borrow(), Some(Some("pwd".to_string())));
    // the echo went out as web frames: prompt, keystrokes, newline
    let echoed: Vec<u8> = frames.borrow().iter().flatten().copied().collect();
    assert_eq!(echoed, b"web> pwd\r\n".to_vec());
}
