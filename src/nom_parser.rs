use nom::bytes::complete::{tag, take};
use nom::combinator::{all_consuming, consumed};
use nom::number::complete::u8;
use nom::sequence::{terminated, tuple};
use nom::IResult;

use crate::ascii::*;
use crate::codec::{checksum, Frame};

type Buf = [u8];

/// Outcome of parsing one de-stuffed message.
#[derive(PartialEq, Debug)]
pub(crate) enum MessageToken {
    Valid(Frame),
    BadChecksum { expected: u8, received: u8 },
    Malformed,
}

/// Parse a complete message, `DLE STX dest cmd args.. checksum DLE ETX`,
/// with byte stuffing already removed.
pub(crate) fn parse_message(buf: &Buf) -> MessageToken {
    match message(buf) {
        Ok((_, (summed, (destination, command, args), received))) => {
            let expected = checksum(summed);
            if expected == received {
                MessageToken::Valid(Frame::new(destination, command, args))
            } else {
                MessageToken::BadChecksum { expected, received }
            }
        }
        Err(_) => MessageToken::Malformed,
    }
}

fn message(buf: &Buf) -> IResult<&Buf, (&Buf, (u8, u8, &Buf), u8)> {
    // Everything but the trailing checksum and DLE ETX is covered by the checksum.
    let body_len = buf.len().saturating_sub(3);
    let (buf, (summed, header)) = consumed(header(body_len))(buf)?;
    let (buf, received) = all_consuming(terminated(u8, tag(&[DLE, ETX][..])))(buf)?;
    Ok((buf, (summed, header, received)))
}

fn header<'a>(body_len: usize) -> impl FnMut(&'a Buf) -> IResult<&'a Buf, (u8, u8, &'a Buf)> {
    move |buf: &'a Buf| {
        let (buf, (_dle_stx, destination, command)) = tuple((tag(&[DLE, STX][..]), u8, u8))(buf)?;
        let (buf, args) = take(body_len.saturating_sub(4))(buf)?;
        Ok((buf, (destination, command, args)))
    }
}
