//! Key sequence decoding: bindings from code point sequences to editing
//! function names, and the stateful decoder that applies them.

/// A decoded key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    /// A bound editing function, by name.
    Function(String),
    /// An unbound code point, inserted as-is when printable.
    Literal(char),
}

struct Binding {
    sequence: Vec<char>,
    function: String,
}

/// Sequence-to-function bindings.
///
/// The default set covers the GNU-readline basics this library's editing
/// functions implement: emacs-style control keys plus the ANSI arrow
/// sequences.
pub struct Keymap {
    bindings: Vec<Binding>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut keymap = Keymap {
            bindings: Vec::new(),
        };
        keymap.bind("\r", "accept-line");
        keymap.bind("\n", "accept-line");
        keymap.bind("\u{1}", "beginning-of-line"); // C-a
        keymap.bind("\u{5}", "end-of-line"); // C-e
        keymap.bind("\u{2}", "backward-char"); // C-b
        keymap.bind("\u{6}", "forward-char"); // C-f
        keymap.bind("\u{8}", "delete-char-backward"); // C-h
        keymap.bind("\u{7f}", "delete-char-backward"); // DEL
        keymap.bind("\u{b}", "kill-line"); // C-k
        keymap.bind("\u{15}", "backward-kill-line"); // C-u
        keymap.bind("\u{1f}", "undo"); // C-_
        keymap.bind("\u{1b}[A", "history-search-backward"); // up
        keymap.bind("\u{1b}[B", "history-search-forward"); // down
        keymap.bind("\u{1b}[C", "forward-char"); // right
        keymap.bind("\u{1b}[D", "backward-char"); // left
        keymap
    }
}

impl Keymap {
    /// Bind a code point sequence to a function name, shadowing any
    /// earlier binding of the same sequence.
    pub fn bind(&mut self, sequence: &str, function: &str) {
        let sequence: Vec<char> = sequence.chars().collect();
        self.bindings.retain(|b| b.sequence != sequence);
        self.bindings.push(Binding {
            sequence,
            function: function.to_string(),
        });
    }

    /// The longest binding matching the start of `pending`, if any.
    fn longest_match(&self, pending: &[char]) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for binding in &self.bindings {
            if pending.starts_with(&binding.sequence)
                && best.is_none_or(|(_, len)| binding.sequence.len() > len)
            {
                best = Some((&binding.function, binding.sequence.len()));
            }
        }
        best
    }

    /// Whether `pending` could still grow into a longer binding.
    fn is_prefix(&self, pending: &[char]) -> bool {
        self.bindings
            .iter()
            .any(|b| b.sequence.len() > pending.len() && b.sequence.starts_with(pending))
    }
}

/// Buffers raw input code points and decodes them into [`KeyEvent`]s
/// against a keymap.
///
/// A partial binding prefix (a lone ESC, say) stays buffered until the
/// following input disambiguates it. Anything that matches no binding and
/// no prefix comes out as a literal, one code point at a time.
#[derive(Default)]
pub struct KeyDecoder {
    pending: Vec<char>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, data: &[char]) {
        self.pending.extend_from_slice(data);
    }

    /// Decode the next key event, or `None` when the buffer is empty or
    /// holds only an ambiguous prefix.
    pub fn next(&mut self, keymap: &Keymap) -> Option<KeyEvent> {
        if self.pending.is_empty() {
            return None;
        }
        if let Some((function, len)) = keymap.longest_match(&self.pending) {
            let function = function.to_string();
            self.pending.drain(..len);
            return Some(KeyEvent::Function(function));
        }
        if keymap.is_prefix(&self.pending) {
            return None;
        }
        Some(KeyEvent::Literal(self.pending.remove(0)))
    }

    /// Code points buffered but not yet decoded.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
