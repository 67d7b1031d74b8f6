//! Frame encoding and checksum.
//!
//! A frame travels on the wire as
//! `DLE STX <dest> <cmd> <args...> <checksum> DLE ETX`, where the checksum is the
//! byte sum of everything before it, and every literal `DLE` between the
//! header and the trailer is followed by a stuffed `NUL`.
//! Decoding is done by [`crate::sync::Synchronizer`].

use core::fmt;

use crate::ascii::*;
use crate::types::{Role, CONTROLLER_ADDRESS, REPLY_COMMAND};

/// One logical protocol message.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct Frame {
    pub destination: u8,
    pub command: u8,
    pub args: Vec<u8>,
}

impl Frame {
    pub fn new(destination: u8, command: u8, args: &[u8]) -> Self {
        Self {
            destination,
            command,
            args: args.to_vec(),
        }
    }

    /// The acknowledgement a device sends to the controller after every command.
    pub fn ack(role: Role, key: u8) -> Self {
        Self::new(CONTROLLER_ADDRESS, REPLY_COMMAND, &[role.ack_type(), key])
    }

    /// Encode the frame for transmission.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self.destination, self.command, &self.args)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {{ dest: {:02x}, cmd: {:02x}, args: {} }}",
            self.destination,
            self.command,
            Hex(&self.args)
        )
    }
}

/// Hex formatting of a byte slice, for log messages.
pub(crate) struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Sum of all bytes, modulo 256.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// Build the on-wire byte sequence of a frame, including byte stuffing.
pub fn encode(destination: u8, command: u8, args: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(args.len() + 7);
    msg.extend_from_slice(&[DLE, STX, destination, command]);
    msg.extend_from_slice(args);
    msg.push(checksum(&msg));

    // Stuff everything between the DLE STX header and the DLE ETX trailer,
    // checksum included.
    let mut wire = Vec::with_capacity(msg.len() + 4);
    wire.extend_from_slice(&msg[..2]);
    for &byte in &msg[2..] {
        wire.push(byte);
        if byte == DLE {
            wire.push(NUL);
        }
    }
    wire.extend_from_slice(&[DLE, ETX]);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x10, 0x02, 0x00, 0x01, 0x8b, 0x00]), 0x9e);
        assert_eq!(checksum(&[0xff, 0x02]), 0x01); // wraps around
    }

    #[test]
    fn test_checksum_single_byte_change() {
        let msg = [DLE, STX, 0x40, 0x04, 0x00, b'H', b'I'];
        let sum = checksum(&msg);
        for pos in 0..msg.len() {
            for delta in 1..=255u8 {
                let mut changed = msg;
                changed[pos] = changed[pos].wrapping_add(delta);
                assert_ne!(checksum(&changed), sum);
            }
        }
    }

    #[test]
    fn test_encode_ack() {
        let wire = Frame::ack(Role::Keypad, 0x00).to_bytes();
        assert_eq!(
            wire,
            vec![0x10, 0x02, 0x00, 0x01, 0x8b, 0x00, 0x9e, 0x10, 0x03]
        );
    }

    #[test]
    fn test_encode_stuffing() {
        let wire = encode(0x40, 0x04, &[0x10, 0x41]);
        // checksum: 0x10 + 0x02 + 0x40 + 0x04 + 0x10 + 0x41 = 0xa7
        assert_eq!(
            wire,
            vec![0x10, 0x02, 0x40, 0x04, 0x10, 0x00, 0x41, 0xa7, 0x10, 0x03]
        );
    }

    #[test]
    fn test_encode_stuffed_checksum() {
        let wire = encode(0x00, 0x01, &[0xfd]);
        assert_eq!(checksum(&[0x10, 0x02, 0x00, 0x01, 0xfd]), 0x10);
        assert_eq!(wire, vec![0x10, 0x02, 0x00, 0x01, 0xfd, 0x10, 0x00, 0x10, 0x03]);
    }

    #[test]
    fn test_frame_debug() {
        let frame = Frame::new(0x40, 0x04, b"HI");
        assert_eq!(
            format!("{:?}", frame),
            "Frame { dest: 40, cmd: 04, args: 4849 }"
        );
    }
}
