//! The encoding side of the pipeline: newline translation and the shared
//! writer handle.

use std::cell::RefCell;
use std::rc::Rc;

use crate::codec::{BinaryEncoder, Charset};

/// What `\n` expands to on the wire.
const CRLF: [char; 2] = ['\r', '\n'];

pub type ByteSink = Box<dyn FnMut(&[u8])>;

/// Split output on newlines, emitting each run of ordinary code points and
/// each CRLF expansion as its own flush. Carriage returns already present
/// pass through untouched, so `\r\n` in the input becomes `\r` `\r\n` on
/// the wire.
pub fn translate_newlines(data: &[char], emit: &mut dyn FnMut(&[char])) {
    let mut prev = 0;
    for (i, &cp) in data.iter().enumerate() {
        if cp == '\n' {
            if i > prev {
                emit(&data[prev..i]);
            }
            emit(&CRLF);
            prev = i + 1;
        }
    }
    if prev < data.len() {
        emit(&data[prev..]);
    }
}

struct TtyWriterInner {
    encoder: BinaryEncoder,
    sink: ByteSink,
}

/// Cloneable handle on a connection's output path.
///
/// Every write runs newline translation, then charset encoding, then the
/// transport byte sink. Clones share the encoder, so a charset re-arm after
/// BINARY negotiation is visible to all of them.
#[derive(Clone)]
pub struct TtyWriter {
    inner: Rc<RefCell<TtyWriterInner>>,
}

impl TtyWriter {
    pub fn new(charset: Charset, sink: ByteSink) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TtyWriterInner {
                encoder: BinaryEncoder::new(charset),
                sink,
            })),
        }
    }

    /// Write a batch of code points through the pipeline.
    pub fn write_codepoints(&self, data: &[char]) {
        let mut inner = self.inner.borrow_mut();
        let TtyWriterInner { encoder, sink } = &mut *inner;
        translate_newlines(data, &mut |run| {
            encoder.encode(run, &mut |bytes| sink(bytes));
        });
    }

    /// Write text through the pipeline.
    pub fn write_str(&self, text: &str) {
        let codepoints: Vec<char> = text.chars().collect();
        self.write_codepoints(&codepoints);
    }

    /// Re-arm the encoder with a different charset.
    pub fn set_charset(&self, charset: Charset) {
        self.inner.borrow_mut().encoder.set_charset(charset);
    }

    pub fn charset(&self) -> Charset {
        self.inner.borrow().encoder.charset()
    }
}
