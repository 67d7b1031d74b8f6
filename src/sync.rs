//! Message synchronization on an undelimited byte stream.
//!
//! See [`Synchronizer`] for details.

use arrayvec::ArrayVec;
use log::debug;
use snafu::Snafu;

use crate::ascii::*;
use crate::codec::Frame;
use crate::nom_parser::{parse_message, MessageToken};

/// Longest message, after removal of stuffing, that is accepted from the bus.
pub const MAX_MESSAGE_LEN: usize = 128;

/// A message was received but had to be discarded.
#[derive(Debug, Snafu, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum FramingError {
    /// The transmitted checksum doesn't match the message content.
    #[snafu(display(
        "Bad checksum, expected {:#04x} but received {:#04x}",
        expected,
        received
    ))]
    BadChecksum { expected: u8, received: u8 },
    /// The message is too short to contain a destination and a command.
    #[snafu(display("Malformed message"))]
    Malformed,
    /// No DLE ETX was seen within [`MAX_MESSAGE_LEN`] bytes.
    #[snafu(display("Message longer than {} bytes", MAX_MESSAGE_LEN))]
    Oversized,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum State {
    /// Looking for DLE STX. `dle` is set when the last byte was a DLE.
    Searching { dle: bool },
    /// Collecting message bytes. `dle_pending` is set when the last byte was
    /// a DLE that hasn't yet been identified as stuffed or as a DLE ETX trailer.
    Accumulating { dle_pending: bool },
}

/// Byte-at-a-time synchronization state machine.
///
/// Bytes are skipped until a `DLE STX` header is found. The message is then
/// accumulated, with stuffed `NUL`s removed, until a `DLE ETX` trailer is seen.
/// A complete message is validated and returned as a [`Frame`], or as a
/// [`FramingError`] if it has to be discarded. In both cases the synchronizer
/// goes back to searching for the next header.
///
/// A `DLE STX` inside a message restarts accumulation, since the controller
/// never sends an unstuffed DLE in a message body.
#[derive(Debug)]
pub struct Synchronizer {
    state: State,
    message: ArrayVec<u8, MAX_MESSAGE_LEN>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self {
            state: State::Searching { dle: false },
            message: ArrayVec::new(),
        }
    }

    /// Feed bytes until a message is complete.
    ///
    /// Returns the number of bytes consumed from `data`, and the completed
    /// message, if any. Bytes following a completed message are left unconsumed.
    pub fn receive_data(&mut self, data: &[u8]) -> (usize, Option<Result<Frame, FramingError>>) {
        for (pos, &byte) in data.iter().enumerate() {
            if let Some(result) = self.push(byte) {
                return (pos + 1, Some(result));
            }
        }
        (data.len(), None)
    }

    /// Returns true if a message is partially received.
    pub fn in_message(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// Drop any partially received message.
    pub fn reset(&mut self) {
        self.state = State::Searching { dle: false };
        self.message.clear();
    }

    fn push(&mut self, byte: u8) -> Option<Result<Frame, FramingError>> {
        match self.state {
            State::Searching { dle } => {
                if dle && byte == STX {
                    self.start_message();
                } else {
                    self.state = State::Searching { dle: byte == DLE };
                }
                None
            }
            State::Accumulating { dle_pending: true } => match byte {
                NUL => {
                    // stuffed, the DLE was data
                    self.state = State::Accumulating { dle_pending: false };
                    None
                }
                ETX => Some(self.finish_message()),
                STX => {
                    debug!("DLE STX inside a message, dropping {} bytes", self.message.len());
                    self.start_message();
                    None
                }
                _ => self.accumulate(byte),
            },
            State::Accumulating { dle_pending: false } => self.accumulate(byte),
        }
    }

    fn start_message(&mut self) {
        self.message.clear();
        self.message.push(DLE);
        self.message.push(STX);
        self.state = State::Accumulating { dle_pending: false };
    }

    fn accumulate(&mut self, byte: u8) -> Option<Result<Frame, FramingError>> {
        if self.message.try_push(byte).is_err() {
            self.reset();
            self.state = State::Searching { dle: byte == DLE };
            return Some(OversizedSnafu.fail());
        }
        self.state = State::Accumulating {
            dle_pending: byte == DLE,
        };
        None
    }

    fn finish_message(&mut self) -> Result<Frame, FramingError> {
        let pushed = self.message.try_push(ETX);
        let token = if pushed.is_ok() {
            parse_message(&self.message)
        } else {
            MessageToken::Malformed
        };
        self.reset();
        match (pushed, token) {
            (Err(_), _) => OversizedSnafu.fail(),
            (_, MessageToken::Valid(frame)) => Ok(frame),
            (_, MessageToken::BadChecksum { expected, received }) => {
                BadChecksumSnafu { expected, received }.fail()
            }
            (_, MessageToken::Malformed) => MalformedSnafu.fail(),
        }
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}
