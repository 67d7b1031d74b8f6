//! The spa-side remote with its 7-segment display and equipment lights.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::display::push_escaped_str;
use super::{lookup_key, Device};
use crate::codec::{Frame, Hex};
use crate::types::{Role, SpaStatus, Status, NO_KEY};

const SPA_KEYS: &[(&str, u8)] = &[
    ("1", 0x09),
    ("2", 0x06),
    ("3", 0x03),
    ("4", 0x08),
    ("5", 0x02),
    ("6", 0x07),
    ("7", 0x04),
    ("8", 0x01),
    ("*", 0x05),
];

/// Shown until the controller sends a readable text status.
const NO_TEXT: &str = "---";
const POWERING_OFF: &str = "... ...";
const MARKER: u8 = b'!';

#[derive(PartialEq, Eq, Debug, Copy, Clone)]
enum Command {
    Probe,
    Status,
    Text,
    Change,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(cmd: u8) -> Self {
        match cmd {
            0x00 => Command::Probe,
            0x02 => Command::Status,
            0x03 => Command::Text,
            0x09 => Command::Change,
            other => Command::Unknown(other),
        }
    }
}

/// Decode the 7-segment text of a text status payload.
///
/// Bytes 1..4 hold the digits. Bytes 1..7 reading `" . . ."` mean the spa is
/// powering off. Otherwise a suffix is picked from markers at offsets 5
/// (set point), 9 (air) and 7 (water), in that order.
fn decode_text(args: &[u8]) -> Option<String> {
    let digits = args.get(1..4)?;
    if args.get(1..7) == Some(&b" . . ."[..]) {
        return Some(POWERING_OFF.to_string());
    }
    if digits == b"0FF" {
        return Some("OFF H2O".to_string());
    }
    let mut text: String = digits.iter().copied().map(char::from).collect();
    if args.get(5) == Some(&1) {
        text.push_str(" SET");
    } else if args.get(9) == Some(&MARKER) {
        text.push_str(" AIR");
    } else if args.get(7) == Some(&MARKER) {
        text.push_str(" H2O");
    } else {
        debug!("spa text without a known suffix: {}", Hex(args));
    }
    Some(text)
}

#[derive(Debug)]
struct SpaState {
    text: String,
    status: SpaStatus,
    pending_ack: u8,
}

/// An emulated spa-side remote.
#[derive(Debug)]
pub struct Spa {
    state: Mutex<SpaState>,
}

impl Spa {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SpaState {
                text: NO_TEXT.to_string(),
                status: SpaStatus::default(),
                pending_ack: NO_KEY,
            }),
        }
    }

    /// The 7-segment text, the spa, heat and jets states as `1`/`0`,
    /// separated by `|`, e.g. `"102 H2O|110"`.
    pub fn binary_summary(&self) -> String {
        let state = self.lock();
        let bit = |on: bool| if on { '1' } else { '0' };
        let mut ret = state.text.clone();
        ret.push('|');
        ret.push(bit(state.status.spa.is_on()));
        ret.push(bit(state.status.heat.is_on()));
        ret.push(bit(state.status.jets.is_on()));
        ret
    }

    fn lock(&self) -> MutexGuard<'_, SpaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(state: &mut SpaState, frame: &Frame) {
        let args = frame.args.as_slice();
        match Command::from(frame.command) {
            Command::Probe => {}
            Command::Status => {
                state.status = SpaStatus::from_payload(args);
                if args.is_empty() {
                    warn!("spa status without payload");
                }
            }
            Command::Text => {
                state.text = decode_text(args).unwrap_or_else(|| {
                    warn!("short spa text status: {}", Hex(args));
                    NO_TEXT.to_string()
                });
            }
            Command::Change => match *args {
                [equipment, new_state, ..] => debug!(
                    "spa change request, equipment {:#04x} state {:#04x}",
                    equipment, new_state
                ),
                _ => debug!("short spa change request: {}", Hex(args)),
            },
            Command::Unknown(cmd) => {
                debug!("spa unknown command {:#04x}, args {}", cmd, Hex(args));
            }
        }
    }
}

impl Default for Spa {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Spa {
    fn role(&self) -> Role {
        Role::Spa
    }

    fn process_command(&self, frame: &Frame) -> Frame {
        let mut state = self.lock();
        Self::apply(&mut state, frame);
        let ack = Frame::ack(Role::Spa, state.pending_ack);
        state.pending_ack = NO_KEY;
        ack
    }

    fn send_key(&self, key: &str) {
        if let Some(code) = lookup_key(SPA_KEYS, key) {
            self.lock().pending_ack = code;
        }
    }

    fn render_text(&self) -> String {
        self.lock().text.clone()
    }

    fn render_html(&self) -> String {
        let mut ret = String::from("<pre>");
        push_escaped_str(&mut ret, &self.lock().text);
        ret.push_str("</pre>");
        ret
    }

    fn status(&self) -> Status {
        Status::Spa(self.lock().status)
    }
}
