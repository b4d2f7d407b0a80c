//! Line editing over a [`TtyConnection`].
//!
//! [`Readline`] installs itself as the connection's stdin and event
//! handler once and then arms one prompt at a time: [`Readline::readline`]
//! writes the prompt, collects edited input, and fires its completion
//! callback with the accepted line (or `None` on end-of-file, the logout
//! convention). Keys arriving between prompts stay queued in the key
//! decoder, so type-ahead survives.
//!
//! Editing behavior lives in [`Function`]s dispatched through a
//! [`Keymap`]. A function runs single-flight: the engine pauses key
//! processing, invokes it, and continues only once it calls
//! [`Interaction::resume`] or resumes later through the
//! [`ResumeHandle`] it got from [`Interaction::suspend`].

pub mod functions;
pub mod history;
pub mod keymap;
pub mod line_buffer;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crossterm::Command;
use crossterm::cursor::{MoveLeft, MoveToColumn};
use crossterm::terminal::{Clear, ClearType};

use crate::config::ReadlineConfig;
use crate::tty::{TtyConnection, TtyEvent, TtyWriter};

pub use functions::Function;
pub use history::History;
pub use keymap::{KeyDecoder, KeyEvent, Keymap};
pub use line_buffer::LineBuffer;

/// History browse index value meaning "not browsing".
pub const NOT_BROWSING: isize = -1;

type Completion = Box<dyn FnOnce(Option<String>)>;

struct PromptState {
    prompt: String,
    buffer: LineBuffer,
    history_index: isize,
    /// Set while an editing function is in flight
    paused: bool,
    completion: Option<Completion>,
}

struct ReadlineCore {
    keymap: Keymap,
    functions: HashMap<String, Rc<dyn Function>>,
    history: History,
    decoder: KeyDecoder,
    writer: TtyWriter,
    app_event_handler: Option<Box<dyn FnMut(TtyEvent, char)>>,
    prompt: Option<PromptState>,
}

/// The line editing engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Readline {
    core: Rc<RefCell<ReadlineCore>>,
}

impl Readline {
    /// Install the engine on a connection. It takes over the stdin and
    /// event handlers; signals other than end-of-file are forwarded to the
    /// handler registered with [`Readline::set_event_handler`].
    pub fn install(conn: &mut dyn TtyConnection, config: &ReadlineConfig) -> Self {
        let mut function_table: HashMap<String, Rc<dyn Function>> = HashMap::new();
        for function in functions::load_defaults() {
            function_table.insert(function.name().to_string(), Rc::from(function));
        }

        let core = Rc::new(RefCell::new(ReadlineCore {
            keymap: Keymap::default(),
            functions: function_table,
            history: History::new(config),
            decoder: KeyDecoder::new(),
            writer: conn.writer(),
            app_event_handler: None,
            prompt: None,
        }));

        let stdin_core = Rc::clone(&core);
        conn.set_stdin_handler(Some(Box::new(move |data: &[char]| {
            stdin_core.borrow_mut().decoder.append(data);
            pump(&stdin_core);
        })));

        let event_core = Rc::clone(&core);
        conn.set_event_handler(Some(Box::new(move |event, cp| {
            on_event(&event_core, event, cp);
        })));

        Readline { core }
    }

    /// Arm a prompt. The completion callback fires exactly once, with the
    /// accepted line or `None` on end-of-file; re-arming from inside the
    /// callback is the usual shell loop.
    pub fn readline(&self, prompt: &str, completion: impl FnOnce(Option<String>) + 'static) {
        {
            let mut core = self.core.borrow_mut();
            if core.prompt.is_some() {
                eprintln!("Warning: readline requested while a prompt is outstanding");
                return;
            }
            core.writer.write_str(prompt);
            core.prompt = Some(PromptState {
                prompt: prompt.to_string(),
                buffer: LineBuffer::new(),
                history_index: NOT_BROWSING,
                paused: false,
                completion: Some(Box::new(completion)),
            });
        }
        // consume any type-ahead queued between prompts
        pump(&self.core);
    }

    /// Whether a prompt is currently outstanding.
    pub fn is_active(&self) -> bool {
        self.core.borrow().prompt.is_some()
    }

    /// Receive the signals the engine does not consume (everything except
    /// end-of-file while a prompt is outstanding).
    pub fn set_event_handler(&self, handler: Option<Box<dyn FnMut(TtyEvent, char)>>) {
        self.core.borrow_mut().app_event_handler = handler;
    }

    /// Bind a key sequence to a function name.
    pub fn bind(&self, sequence: &str, function: &str) {
        self.core.borrow_mut().keymap.bind(sequence, function);
    }

    /// Register an editing function, replacing any previous one of the
    /// same name.
    pub fn add_function(&self, function: Rc<dyn Function>) {
        self.core
            .borrow_mut()
            .functions
            .insert(function.name().to_string(), function);
    }

    /// Seed a history entry, as if the line had been accepted.
    pub fn add_history(&self, line: &str) {
        let line: Vec<char> = line.chars().collect();
        self.core.borrow_mut().history.add(&line);
    }
}

/// What the pump decided to do with the next key event.
enum Step {
    Literal(char),
    Accept,
    Invoke(Rc<dyn Function>),
    Skip,
}

fn pump(core: &Rc<RefCell<ReadlineCore>>) {
    loop {
        let step = {
            let mut c = core.borrow_mut();
            let ReadlineCore {
                keymap,
                functions,
                decoder,
                prompt,
                ..
            } = &mut *c;
            let Some(p) = prompt else { break };
            if p.paused {
                break;
            }
            match decoder.next(keymap) {
                None => break,
                Some(KeyEvent::Function(name)) if name == "accept-line" => Step::Accept,
                Some(KeyEvent::Function(name)) => match functions.get(&name) {
                    Some(function) => Step::Invoke(Rc::clone(function)),
                    None => Step::Skip,
                },
                Some(KeyEvent::Literal(ch)) => Step::Literal(ch),
            }
        };

        match step {
            Step::Literal(ch) => {
                if ch.is_control() {
                    continue;
                }
                let mut c = core.borrow_mut();
                let ReadlineCore { writer, prompt, .. } = &mut *c;
                if let Some(p) = prompt {
                    let at_end = p.buffer.cursor() == p.buffer.len();
                    p.buffer.insert(ch);
                    if at_end {
                        // plain append, echo just the character
                        writer.write_codepoints(&[ch]);
                    } else {
                        render(writer, &p.prompt, &p.buffer);
                    }
                }
            }
            Step::Accept => {
                let finished = {
                    let mut c = core.borrow_mut();
                    match c.prompt.take() {
                        Some(mut p) => {
                            c.writer.write_str("\n");
                            let line: Vec<char> = p.buffer.as_slice().to_vec();
                            c.history.add(&line);
                            p.completion
                                .take()
                                .map(|cb| (cb, line.iter().collect::<String>()))
                        }
                        None => None,
                    }
                };
                // the callback may re-arm, so the pump keeps going after it
                if let Some((completion, line)) = finished {
                    completion(Some(line));
                }
            }
            Step::Invoke(function) => {
                if let Some(p) = &mut core.borrow_mut().prompt {
                    p.paused = true;
                }
                let mut interaction = Interaction {
                    core: Rc::clone(core),
                    resumed: false,
                };
                function.apply(&mut interaction);
                if interaction.resumed {
                    if let Some(p) = &mut core.borrow_mut().prompt {
                        p.paused = false;
                    }
                } else {
                    // suspended; the ResumeHandle pumps when it resolves
                    break;
                }
            }
            Step::Skip => {}
        }
    }
}

fn on_event(core: &Rc<RefCell<ReadlineCore>>, event: TtyEvent, cp: char) {
    if event == TtyEvent::Eof {
        let finished = {
            let mut c = core.borrow_mut();
            match c.prompt.take() {
                Some(mut p) => {
                    c.writer.write_str("\n");
                    p.completion.take()
                }
                None => None,
            }
        };
        if let Some(completion) = finished {
            completion(None);
            return;
        }
    }

    // not ours, forward to the application
    let taken = core.borrow_mut().app_event_handler.take();
    if let Some(mut handler) = taken {
        handler(event, cp);
        let mut c = core.borrow_mut();
        if c.app_event_handler.is_none() {
            c.app_event_handler = Some(handler);
        }
    }
}

/// Redraw the prompt line: return to column zero, clear, write prompt and
/// buffer, and step the cursor back to its logical position.
fn render(writer: &TtyWriter, prompt: &str, buffer: &LineBuffer) {
    let mut out = String::new();
    let _ = MoveToColumn(0).write_ansi(&mut out);
    let _ = Clear(ClearType::UntilNewLine).write_ansi(&mut out);
    out.push_str(prompt);
    out.extend(buffer.as_slice().iter().copied());
    let back = buffer.len() - buffer.cursor();
    if back > 0 {
        let _ = MoveLeft(back as u16).write_ansi(&mut out);
    }
    writer.write_str(&out);
}

fn refresh_core(core: &Rc<RefCell<ReadlineCore>>, buffer: LineBuffer) {
    let mut c = core.borrow_mut();
    let ReadlineCore { writer, prompt, .. } = &mut *c;
    if let Some(p) = prompt {
        p.buffer = buffer;
        render(writer, &p.prompt, &p.buffer);
    }
}

/// A function's window onto the prompt it was invoked against.
pub struct Interaction {
    core: Rc<RefCell<ReadlineCore>>,
    resumed: bool,
}

impl Interaction {
    /// A copy of the line under edit.
    pub fn buffer(&self) -> LineBuffer {
        self.core
            .borrow()
            .prompt
            .as_ref()
            .map(|p| p.buffer.clone())
            .unwrap_or_default()
    }

    pub fn history_len(&self) -> usize {
        self.core.borrow().history.len()
    }

    pub fn history_entry(&self, index: usize) -> Option<Vec<char>> {
        self.core.borrow().history.get(index).map(|l| l.to_vec())
    }

    /// The prompt's history browse index, [`NOT_BROWSING`] if idle.
    pub fn history_index(&self) -> isize {
        self.core
            .borrow()
            .prompt
            .as_ref()
            .map_or(NOT_BROWSING, |p| p.history_index)
    }

    pub fn set_history_index(&mut self, index: isize) {
        if let Some(p) = &mut self.core.borrow_mut().prompt {
            p.history_index = index;
        }
    }

    /// Replace the line under edit and redraw it.
    pub fn refresh(&mut self, buffer: LineBuffer) {
        refresh_core(&self.core, buffer);
    }

    /// Hand control back to the engine.
    pub fn resume(&mut self) {
        self.resumed = true;
    }

    /// Keep the engine paused past this invocation; the returned handle
    /// resumes it later, typically from a task on the connection's
    /// executor.
    pub fn suspend(&mut self) -> ResumeHandle {
        ResumeHandle {
            core: Rc::clone(&self.core),
        }
    }
}

/// Resumes a suspended interaction.
pub struct ResumeHandle {
    core: Rc<RefCell<ReadlineCore>>,
}

impl ResumeHandle {
    /// Replace the line under edit and redraw it.
    pub fn refresh(&self, buffer: LineBuffer) {
        refresh_core(&self.core, buffer);
    }

    /// Unpause the engine and process any keys queued meanwhile.
    pub fn resume(self) {
        if let Some(p) = &mut self.core.borrow_mut().prompt {
            p.paused = false;
        }
        pump(&self.core);
    }
}
