//! The built-in editing functions.
//!
//! Each function receives the current [`Interaction`], edits a copy of the
//! line buffer, pushes it back with `refresh`, and hands control back with
//! `resume`. Functions doing deferred work call `suspend` instead and
//! resume through the handle later.

use super::Interaction;
use super::line_buffer::{LineBuffer, buffer_equals, match_before_cursor};

/// A named editing function, dispatched through the keymap.
pub trait Function {
    fn name(&self) -> &'static str;

    fn apply(&self, interaction: &mut Interaction);
}

/// The functions every readline instance starts with.
pub fn load_defaults() -> Vec<Box<dyn Function>> {
    vec![
        Box::new(BeginningOfLine),
        Box::new(EndOfLine),
        Box::new(BackwardChar),
        Box::new(ForwardChar),
        Box::new(DeleteCharBackward),
        Box::new(KillLine),
        Box::new(BackwardKillLine),
        Box::new(Undo),
        Box::new(HistorySearchBackward),
        Box::new(HistorySearchForward),
    ]
}

pub struct BeginningOfLine;

impl Function for BeginningOfLine {
    fn name(&self) -> &'static str {
        "beginning-of-line"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        buf.set_cursor(0);
        interaction.refresh(buf);
        interaction.resume();
    }
}

pub struct EndOfLine;

impl Function for EndOfLine {
    fn name(&self) -> &'static str {
        "end-of-line"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        let end = buf.len();
        buf.set_cursor(end);
        interaction.refresh(buf);
        interaction.resume();
    }
}

pub struct BackwardChar;

impl Function for BackwardChar {
    fn name(&self) -> &'static str {
        "backward-char"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        buf.move_cursor(-1);
        interaction.refresh(buf);
        interaction.resume();
    }
}

pub struct ForwardChar;

impl Function for ForwardChar {
    fn name(&self) -> &'static str {
        "forward-char"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        buf.move_cursor(1);
        interaction.refresh(buf);
        interaction.resume();
    }
}

pub struct DeleteCharBackward;

impl Function for DeleteCharBackward {
    fn name(&self) -> &'static str {
        "delete-char-backward"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        buf.delete(-1);
        interaction.refresh(buf);
        interaction.resume();
    }
}

/// Delete from the cursor to the end of the line.
pub struct KillLine;

impl Function for KillLine {
    fn name(&self) -> &'static str {
        "kill-line"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        let tail = buf.len() - buf.cursor();
        buf.delete(tail as isize);
        interaction.refresh(buf);
        interaction.resume();
    }
}

/// Delete from the beginning of the line to the cursor.
pub struct BackwardKillLine;

impl Function for BackwardKillLine {
    fn name(&self) -> &'static str {
        "backward-kill-line"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        let cursor = buf.cursor() as isize;
        buf.delete(-cursor);
        interaction.refresh(buf);
        interaction.resume();
    }
}

/// Reset the line to empty.
pub struct Undo;

impl Function for Undo {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let mut buf = interaction.buffer();
        buf.set_size(0);
        interaction.refresh(buf);
        interaction.resume();
    }
}

/// Walk toward older history entries whose content starts with everything
/// before the cursor.
///
/// Two fast paths flip straight to the next older entry: an empty buffer,
/// and sitting at the end of the entry currently being browsed (the state
/// right after a previous flip). Otherwise a prefix search runs from the
/// next older entry onward, keeping the cursor where it is; when nothing
/// matches, the line stays put.
pub struct HistorySearchBackward;

impl Function for HistorySearchBackward {
    fn name(&self) -> &'static str {
        "history-search-backward"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let buf = interaction.buffer();
        let cursor = buf.cursor();
        let curr = interaction.history_index();

        let mut apply_next = buf.is_empty();
        if cursor == buf.len() && curr >= 0 {
            if let Some(current_entry) = interaction.history_entry(curr as usize) {
                if buffer_equals(&buf, &current_entry)
                    && ((curr + 1) as usize) < interaction.history_len()
                {
                    apply_next = true;
                }
            }
        }

        if apply_next {
            let next = curr + 1;
            if let Some(entry) = interaction.history_entry(next as usize) {
                interaction.refresh(LineBuffer::from_chars(&entry));
                interaction.set_history_index(next);
            }
        } else {
            for i in (curr + 1) as usize..interaction.history_len() {
                let Some(line) = interaction.history_entry(i) else {
                    break;
                };
                if buffer_equals(&buf, &line) {
                    continue;
                }
                if match_before_cursor(&buf, &line) {
                    let mut replacement = LineBuffer::from_chars(&line);
                    replacement.set_cursor(cursor);
                    interaction.refresh(replacement);
                    interaction.set_history_index(i as isize);
                    break;
                }
            }
        }

        interaction.resume();
    }
}

/// Walk toward newer history entries whose content starts with everything
/// before the cursor.
///
/// Where the backward search stays put on a miss, this one snaps to the
/// adjacent newer entry instead, with the cursor at the end.
pub struct HistorySearchForward;

impl Function for HistorySearchForward {
    fn name(&self) -> &'static str {
        "history-search-forward"
    }

    fn apply(&self, interaction: &mut Interaction) {
        let buf = interaction.buffer();
        let curr = interaction.history_index();
        let search_start = curr - 1;

        let mut found = false;
        let mut i = search_start;
        while i >= 0 {
            let Some(line) = interaction.history_entry(i as usize) else {
                break;
            };
            if !buffer_equals(&buf, &line) && match_before_cursor(&buf, &line) {
                interaction.refresh(LineBuffer::from_chars(&line));
                interaction.set_history_index(i);
                found = true;
                break;
            }
            i -= 1;
        }

        if !found && search_start >= 0 && (search_start as usize) < interaction.history_len() {
            if let Some(line) = interaction.history_entry(search_start as usize) {
                interaction.refresh(LineBuffer::from_chars(&line));
                interaction.set_history_index(search_start);
            }
        }

        interaction.resume();
    }
}
