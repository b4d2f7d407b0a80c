//! The edit buffer behind a readline prompt.

use std::fmt;

/// A line under edit: code points plus a cursor.
///
/// The cursor is always within `0..=len`. Editing functions work on a copy
/// and push the result back through the interaction's refresh, so the type
/// is plain data with no rendering knowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    data: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer holding `line` with the cursor at the end.
    pub fn from_chars(line: &[char]) -> Self {
        Self {
            data: line.to_vec(),
            cursor: line.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.data.get(index).copied()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.data
    }

    /// Insert one code point at the cursor, advancing it.
    pub fn insert(&mut self, c: char) {
        self.data.insert(self.cursor, c);
        self.cursor += 1;
    }

    /// Insert code points at the cursor, advancing it past them.
    pub fn insert_slice(&mut self, line: &[char]) {
        for &c in line {
            self.insert(c);
        }
    }

    /// Delete up to `delta` code points: after the cursor when positive,
    /// before it when negative (moving the cursor back). Returns how many
    /// were actually removed.
    pub fn delete(&mut self, delta: isize) -> usize {
        if delta > 0 {
            let count = (delta as usize).min(self.data.len() - self.cursor);
            self.data.drain(self.cursor..self.cursor + count);
            count
        } else {
            let count = (-delta as usize).min(self.cursor);
            self.data.drain(self.cursor - count..self.cursor);
            self.cursor -= count;
            count
        }
    }

    /// Move the cursor by `delta`, clamped to the buffer. Returns the
    /// movement actually applied.
    pub fn move_cursor(&mut self, delta: isize) -> isize {
        let target = (self.cursor as isize + delta).clamp(0, self.data.len() as isize);
        let moved = target - self.cursor as isize;
        self.cursor = target as usize;
        moved
    }

    /// Place the cursor, clamped to the buffer.
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.data.len());
    }

    /// Truncate the buffer to `size` code points, clamping the cursor.
    pub fn set_size(&mut self, size: usize) {
        if size < self.data.len() {
            self.data.truncate(size);
        }
        if self.cursor > self.data.len() {
            self.cursor = self.data.len();
        }
    }
}

impl fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &c in &self.data {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Whether the buffer's whole content equals `line`.
pub fn buffer_equals(buf: &LineBuffer, line: &[char]) -> bool {
    buf.as_slice() == line
}

/// Whether `line` starts with everything before the buffer's cursor. This
/// is the prefix test the history search functions use.
pub fn match_before_cursor(buf: &LineBuffer, line: &[char]) -> bool {
    if line.len() < buf.cursor() {
        return false;
    }
    buf.as_slice()[..buf.cursor()] == line[..buf.cursor()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_insert_advances_cursor() {
        let mut buf = LineBuffer::new();
        buf.insert('h');
        buf.insert('i');
        assert_eq!(buf.to_string(), "hi");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn test_insert_mid_line() {
        let mut buf = LineBuffer::from_chars(&chars("hllo"));
        buf.set_cursor(1);
        buf.insert('e');
        assert_eq!(buf.to_string(), "hello");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn test_delete_forward_clamps_at_end() {
        let mut buf = LineBuffer::from_chars(&chars("hello"));
        buf.set_cursor(3);
        assert_eq!(buf.delete(10), 2);
        assert_eq!(buf.to_string(), "hel");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn test_delete_backward_moves_cursor() {
        let mut buf = LineBuffer::from_chars(&chars("hello"));
        assert_eq!(buf.delete(-2), 2);
        assert_eq!(buf.to_string(), "hel");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn test_delete_whole_prefix() {
        let mut buf = LineBuffer::from_chars(&chars("hello"));
        buf.set_cursor(3);
        let cursor = buf.cursor() as isize;
        assert_eq!(buf.delete(-cursor), 3);
        assert_eq!(buf.to_string(), "lo");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn test_move_cursor_clamped() {
        let mut buf = LineBuffer::from_chars(&chars("abc"));
        assert_eq!(buf.move_cursor(-10), -3);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.move_cursor(2), 2);
        assert_eq!(buf.move_cursor(10), 1);
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn test_set_size_clamps_cursor() {
        let mut buf = LineBuffer::from_chars(&chars("hello"));
        buf.set_size(0);
        assert!(buf.is_empty());
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn test_buffer_equals() {
        let buf = LineBuffer::from_chars(&chars("abc"));
        assert!(buffer_equals(&buf, &chars("abc")));
        assert!(!buffer_equals(&buf, &chars("ab")));
        assert!(!buffer_equals(&buf, &chars("abd")));
    }

    #[test]
    fn test_match_before_cursor() {
        let mut buf = LineBuffer::from_chars(&chars("grep"));
        buf.set_cursor(2);
        assert!(match_before_cursor(&buf, &chars("grep -r foo")));
        assert!(match_before_cursor(&buf, &chars("gr")));
        assert!(!match_before_cursor(&buf, &chars("git log")));
        assert!(!match_before_cursor(&buf, &chars("g")));

        // an empty prefix matches anything
        buf.set_cursor(0);
        assert!(match_before_cursor(&buf, &chars("whatever")));
    }
}
