//! Control characters used by the bus framing.

pub(crate) const NUL: u8 = 0x00;
pub(crate) const DLE: u8 = 0x10;
pub(crate) const STX: u8 = 0x02;
pub(crate) const ETX: u8 = 0x03;
