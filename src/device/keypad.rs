//! The square wall keypad and the PDA remote.
//!
//! Both models show a 16 column character display and understand the same
//! commands. They differ only in display height, bus address, ack type and
//! the remapping of the PDA's header rows, which [`KeypadModel`] carries.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::display::{DisplayBuffer, Scroll};
use super::{lookup_key, Device};
use crate::codec::{Frame, Hex};
use crate::types::{Role, Status, NO_KEY};

/// Display width of both keypad models.
pub const WIDTH: usize = 16;

/// Navigation keys, the same codes on both models.
const NAV_KEYS: &[(&str, u8)] = &[
    ("up", 0x06),
    ("down", 0x05),
    ("back", 0x02),
    ("select", 0x04),
    ("pgup", 0x01),
    ("pgdn", 0x03),
];

/// The PDA encodes its header rows with mode flags in the high bits.
const PDA_ROWS: &[(u8, usize)] = &[(64, 0), (130, 2)];

/// Constants distinguishing the keypad models.
#[derive(Debug, Copy, Clone)]
pub struct KeypadModel {
    pub role: Role,
    pub height: usize,
    keys: &'static [(&'static str, u8)],
    row_map: &'static [(u8, usize)],
}

impl KeypadModel {
    pub const SQUARE: KeypadModel = KeypadModel {
        role: Role::Keypad,
        height: 12,
        keys: NAV_KEYS,
        row_map: &[],
    };

    pub const PDA: KeypadModel = KeypadModel {
        role: Role::Pda,
        height: 10,
        keys: NAV_KEYS,
        row_map: PDA_ROWS,
    };

    /// Display row addressed by the raw row byte of a command.
    pub fn row(&self, raw: u8) -> usize {
        self.row_map
            .iter()
            .find(|(from, _)| *from == raw)
            .map_or(usize::from(raw), |(_, to)| *to)
    }
}

/// Command byte of a frame sent to a keypad.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
enum Command {
    Probe,
    Status,
    WriteLine,
    Handshake,
    InvertLine,
    ClearScreen,
    Scroll,
    InvertChars,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(cmd: u8) -> Self {
        match cmd {
            0x00 => Command::Probe,
            0x02 => Command::Status,
            0x04 => Command::WriteLine,
            0x05 => Command::Handshake,
            0x08 => Command::InvertLine,
            0x09 => Command::ClearScreen,
            0x0F => Command::Scroll,
            0x10 => Command::InvertChars,
            other => Command::Unknown(other),
        }
    }
}

#[derive(Debug)]
struct KeypadState {
    display: DisplayBuffer,
    pending_ack: u8,
    status: String,
}

/// An emulated keypad, shared between the bus thread and the web layer.
#[derive(Debug)]
pub struct Keypad {
    model: KeypadModel,
    state: Mutex<KeypadState>,
}

impl Keypad {
    pub fn new(model: KeypadModel) -> Self {
        Self {
            model,
            state: Mutex::new(KeypadState {
                display: DisplayBuffer::new(WIDTH, model.height),
                pending_ack: NO_KEY,
                status: String::from("00000000"),
            }),
        }
    }

    /// The square AqualinkRS keypad.
    pub fn square() -> Self {
        Self::new(KeypadModel::SQUARE)
    }

    /// The PDA remote.
    pub fn pda() -> Self {
        Self::new(KeypadModel::PDA)
    }

    /// Text of one display row.
    pub fn row(&self, line: usize) -> Option<String> {
        self.lock().display.row(line)
    }

    /// Terminal rendering of the display, or None if nothing changed since the
    /// last call.
    pub fn console_update(&self) -> Option<String> {
        let mut state = self.lock();
        if state.display.take_dirty() {
            Some(state.display.render_console(&state.status))
        } else {
            None
        }
    }

    fn lock(&self) -> MutexGuard<'_, KeypadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, state: &mut KeypadState, frame: &Frame) {
        let display = &mut state.display;
        let args = frame.args.as_slice();
        match Command::from(frame.command) {
            Command::Probe | Command::Handshake => {}
            Command::ClearScreen => {
                // The argument is nonzero for what might be a partial clear,
                // its meaning is unknown.
                if args.first().map_or(false, |arg| *arg != 0) {
                    debug!("{} clear screen with argument {}", self.model.role, Hex(args));
                }
                display.clear();
            }
            Command::Scroll => match *args {
                [start, end, direction, ..] => match Scroll::from_byte(direction) {
                    Some(dir) => display.scroll(start.into(), end.into(), dir),
                    None => debug!("{} ignoring scroll direction {:#04x}", self.model.role, direction),
                },
                _ => warn!("{} short scroll command: {}", self.model.role, Hex(args)),
            },
            Command::WriteLine => match args.split_first() {
                Some((&line, text)) => {
                    let len = text.iter().position(|c| *c == 0).unwrap_or(text.len());
                    display.write_line(self.model.row(line), &text[..len]);
                }
                None => warn!("{} write line without a row", self.model.role),
            },
            Command::Status => state.status = Hex(args).to_string(),
            Command::InvertLine => match args.first() {
                Some(&line) => display.invert_line(self.model.row(line)),
                None => warn!("{} invert line without a row", self.model.role),
            },
            Command::InvertChars => match *args {
                [line, start, end, ..] => {
                    display.invert_chars(self.model.row(line), start.into(), end.into())
                }
                _ => warn!("{} short invert command: {}", self.model.role, Hex(args)),
            },
            Command::Unknown(cmd) => {
                warn!(
                    "{} unknown command {:#04x}, args {}",
                    self.model.role,
                    cmd,
                    Hex(args)
                );
            }
        }
    }
}

impl Device for Keypad {
    fn role(&self) -> Role {
        self.model.role
    }

    fn process_command(&self, frame: &Frame) -> Frame {
        let mut state = self.lock();
        self.apply(&mut state, frame);
        let ack = Frame::ack(self.model.role, state.pending_ack);
        state.pending_ack = NO_KEY;
        ack
    }

    fn send_key(&self, key: &str) {
        if let Some(code) = lookup_key(self.model.keys, key) {
            self.lock().pending_ack = code;
        }
    }

    fn render_text(&self) -> String {
        self.lock().display.render_text()
    }

    fn render_html(&self) -> String {
        self.lock().display.render_html()
    }

    fn status(&self) -> Status {
        Status::Raw(self.lock().status.clone())
    }
}
