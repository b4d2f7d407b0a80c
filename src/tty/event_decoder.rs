//! Inline signal detection on the decoded code point stream.

use std::cell::RefCell;
use std::rc::Rc;

use super::TtyEvent;

pub type ReadHandler = Box<dyn FnMut(&[char])>;
pub type EventHandler = Box<dyn FnMut(TtyEvent, char)>;

/// Scans decoded input for the configured interrupt, end-of-file, and
/// suspend characters.
///
/// Consecutive non-signal code points are batched and flushed to the read
/// handler immediately before each signal dispatch and at the end of every
/// `write` call, so the application observes data and signals in input
/// order. While no event handler is installed the scan is skipped entirely
/// and signal characters pass through as ordinary data.
///
/// Handler slots are single and replaceable, and dispatch works by
/// take-call-reinstall: a handler that installs a replacement from inside
/// its own invocation wins, the old one is dropped instead of being put
/// back. The readline engine relies on this to re-arm itself from a
/// completion callback.
pub struct TtyEventDecoder {
    intr: char,
    eof: char,
    susp: char,
    read_handler: Rc<RefCell<Option<ReadHandler>>>,
    event_handler: Rc<RefCell<Option<EventHandler>>>,
}

impl TtyEventDecoder {
    pub fn new(intr: char, eof: char, susp: char) -> Self {
        Self {
            intr,
            eof,
            susp,
            read_handler: Rc::new(RefCell::new(None)),
            event_handler: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_read_handler(&self, handler: Option<ReadHandler>) {
        *self.read_handler.borrow_mut() = handler;
    }

    pub fn has_read_handler(&self) -> bool {
        self.read_handler.borrow().is_some()
    }

    pub fn set_event_handler(&self, handler: Option<EventHandler>) {
        *self.event_handler.borrow_mut() = handler;
    }

    /// Scan a batch of decoded code points, dispatching data runs and
    /// signals in order.
    pub fn write(&self, data: &[char]) {
        let scan_signals = self.event_handler.borrow().is_some();
        if !scan_signals {
            self.dispatch_read(data);
            return;
        }

        let mut start = 0;
        for (i, &cp) in data.iter().enumerate() {
            let event = if cp == self.intr {
                Some(TtyEvent::Intr)
            } else if cp == self.eof {
                Some(TtyEvent::Eof)
            } else if cp == self.susp {
                Some(TtyEvent::Susp)
            } else {
                None
            };
            if let Some(event) = event {
                if i > start {
                    self.dispatch_read(&data[start..i]);
                }
                start = i + 1;
                self.dispatch_event(event, cp);
            }
        }
        if start < data.len() {
            self.dispatch_read(&data[start..]);
        }
    }

    fn dispatch_read(&self, data: &[char]) {
        if data.is_empty() {
            return;
        }
        let taken = self.read_handler.borrow_mut().take();
        if let Some(mut handler) = taken {
            handler(data);
            // keep a replacement installed mid-call over the old handler
            let mut slot = self.read_handler.borrow_mut();
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
    }

    fn dispatch_event(&self, event: TtyEvent, cp: char) {
        let taken = self.event_handler.borrow_mut().take();
        if let Some(mut handler) = taken {
            handler(event, cp);
            let mut slot = self.event_handler.borrow_mut();
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
    }
}
