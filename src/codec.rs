//! Charset codecs for the byte side of a terminal connection.
//!
//! Incoming bytes turn into Unicode code points through [`BinaryDecoder`],
//! outgoing code points turn back into bytes through [`BinaryEncoder`].
//! Both are incremental: a multi-byte sequence may arrive split across any
//! number of reads and the decoder carries the partial tail over to the
//! next call. Malformed input never fails the stream; it becomes U+FFFD on
//! the way in and `?` on the way out.

/// Emitted for undecodable byte sequences.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Substituted for characters the target charset cannot encode.
const REPLACEMENT_BYTE: u8 = b'?';

/// The charsets a connection can negotiate.
///
/// `Ascii` stands in for the 7-bit-safe mode used before BINARY
/// transmission is agreed; `Utf8` is the full charset connections re-arm to
/// once it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
}

impl Charset {
    /// Parse a configuration name like `utf-8` or `ascii`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "ascii" | "us-ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Ascii => "ascii",
        }
    }
}

/// Incremental bytes-to-code-points decoder.
pub struct BinaryDecoder {
    charset: Charset,
    /// Undecoded tail of a split multi-byte sequence
    pending: Vec<u8>,
}

impl BinaryDecoder {
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            pending: Vec::new(),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Switch charsets mid-stream. Bytes already buffered are decoded with
    /// the new charset; this matches re-arming after BINARY negotiation,
    /// which happens on a sequence boundary anyway.
    pub fn set_charset(&mut self, charset: Charset) {
        self.charset = charset;
    }

    /// Decode a chunk of bytes, passing every completed code point to
    /// `sink` as one batch. An incomplete multi-byte tail is retained for
    /// the next call; `sink` is not invoked when nothing completed.
    pub fn write(&mut self, data: &[u8], sink: &mut dyn FnMut(&[char])) {
        self.pending.extend_from_slice(data);
        let mut decoded: Vec<char> = Vec::with_capacity(self.pending.len());

        match self.charset {
            Charset::Ascii => {
                for &b in &self.pending {
                    decoded.push(if b < 0x80 { b as char } else { REPLACEMENT_CHAR });
                }
                self.pending.clear();
            }
            Charset::Utf8 => {
                let mut pos = 0;
                loop {
                    match std::str::from_utf8(&self.pending[pos..]) {
                        Ok(valid) => {
                            decoded.extend(valid.chars());
                            pos = self.pending.len();
                            break;
                        }
                        Err(err) => {
                            let valid_len = err.valid_up_to();
                            if valid_len > 0 {
                                if let Ok(valid) =
                                    std::str::from_utf8(&self.pending[pos..pos + valid_len])
                                {
                                    decoded.extend(valid.chars());
                                }
                                pos += valid_len;
                            }
                            match err.error_len() {
                                // a malformed sequence of known length
                                Some(bad_len) => {
                                    decoded.push(REPLACEMENT_CHAR);
                                    pos += bad_len;
                                }
                                // a possibly-valid sequence cut short, keep it
                                None => break,
                            }
                        }
                    }
                }
                self.pending.drain(..pos);
            }
        }

        if !decoded.is_empty() {
            sink(&decoded);
        }
    }

    /// True while the decoder holds the head of an unfinished sequence.
    pub fn has_pending_bytes(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Code-points-to-bytes encoder with a reusable output buffer.
pub struct BinaryEncoder {
    charset: Charset,
    buf: Vec<u8>,
}

impl BinaryEncoder {
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            buf: Vec::new(),
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn set_charset(&mut self, charset: Charset) {
        self.charset = charset;
    }

    /// Encode code points and hand the resulting bytes to `sink` in one
    /// batch. Code points the charset cannot represent become `?`.
    pub fn encode(&mut self, data: &[char], sink: &mut dyn FnMut(&[u8])) {
        self.buf.clear();
        match self.charset {
            Charset::Utf8 => {
                let mut scratch = [0u8; 4];
                for &c in data {
                    self.buf.extend_from_slice(c.encode_utf8(&mut scratch).as_bytes());
                }
            }
            Charset::Ascii => {
                for &c in data {
                    self.buf.push(if (c as u32) < 0x80 {
                        c as u8
                    } else {
                        REPLACEMENT_BYTE
                    });
                }
            }
        }
        if !self.buf.is_empty() {
            sink(&self.buf);
        }
    }
}
