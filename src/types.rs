//! Device roles, status values and the crate error type.

use core::fmt;
use snafu::Snafu;

/// Bus address of the pool controller, and the destination of every reply.
pub const CONTROLLER_ADDRESS: u8 = 0x00;
/// Destination reported when no frame could be read because the transport is absent.
pub const UNKNOWN_ADDRESS: u8 = 0xFF;
/// Command byte of every reply sent to the controller.
pub const REPLY_COMMAND: u8 = 0x01;
/// Ack byte meaning "no key pressed".
pub const NO_KEY: u8 = 0x00;

/// Error type for this crate
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// The transport could not be opened.
    #[snafu(display("Failed to open bus transport {}: {}", path, source))]
    Open {
        path: String,
        source: std::io::Error,
    },
    /// Writing a frame to the transport failed.
    #[snafu(display("Failed to write to the bus"))]
    Write { source: std::io::Error },
    /// There is no open transport to write to.
    #[snafu(display("Bus transport is not open"))]
    NotConnected,
    /// The address doesn't belong to an emulated device role.
    #[snafu(display("No device role at address {:#04x}", address))]
    UnknownRole { address: u8 },
}

/// The device roles this crate can impersonate on the bus.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub enum Role {
    /// The square "AqualinkRS" wall keypad with a 16x12 display.
    Keypad,
    /// The hand-held PDA remote with a 16x10 display.
    Pda,
    /// The spa-side remote with a 7-segment display.
    Spa,
}

impl Role {
    /// All roles, in address order.
    pub const ALL: [Role; 3] = [Role::Spa, Role::Keypad, Role::Pda];

    /// The bus address the controller polls this role at.
    pub const fn address(self) -> u8 {
        match self {
            Role::Keypad => 0x40,
            Role::Pda => 0x60,
            Role::Spa => 0x20,
        }
    }

    /// The first argument byte of every ack sent by this role.
    pub const fn ack_type(self) -> u8 {
        match self {
            Role::Keypad => 0x8B,
            Role::Pda => 0x40,
            Role::Spa => 0x00,
        }
    }

    /// Look up the role polled at `address`.
    /// # Errors
    /// Returns [`Error::UnknownRole`] for any other address.
    pub fn from_address(address: u8) -> Result<Self, Error> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.address() == address)
            .ok_or(Error::UnknownRole { address })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Keypad => "keypad",
            Role::Pda => "pda",
            Role::Spa => "spa",
        };
        f.write_str(name)
    }
}

/// State of a piece of spa equipment as last reported by the controller.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Switch {
    On,
    Off,
    Unknown,
}

impl Switch {
    fn from_bit(byte: u8, mask: u8) -> Self {
        if byte & mask != 0 {
            Switch::On
        } else {
            Switch::Off
        }
    }

    pub const fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

impl Default for Switch {
    fn default() -> Self {
        Switch::Unknown
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Switch::On => "ON",
            Switch::Off => "OFF",
            Switch::Unknown => "UNK",
        };
        f.write_str(name)
    }
}

/// The spa, jets and heater states decoded from a spa status frame.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default)]
pub struct SpaStatus {
    pub spa: Switch,
    pub jets: Switch,
    pub heat: Switch,
}

const SPA_BIT: u8 = 1 << 4;
const JETS_BIT: u8 = 1 << 0;
const HEAT_BIT: u8 = 1 << 3;

impl SpaStatus {
    /// Decode the status bitmask. An empty payload yields all [`Switch::Unknown`].
    pub fn from_payload(args: &[u8]) -> Self {
        match args.first() {
            Some(&byte) => Self {
                spa: Switch::from_bit(byte, SPA_BIT),
                jets: Switch::from_bit(byte, JETS_BIT),
                heat: Switch::from_bit(byte, HEAT_BIT),
            },
            None => Self::default(),
        }
    }
}

impl fmt::Display for SpaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spa={} jets={} heat={}", self.spa, self.jets, self.heat)
    }
}

/// Status snapshot of one device, see [`crate::device::Device::status`].
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Status {
    /// Raw status bytes of a keypad, as lowercase hex.
    Raw(String),
    /// Decoded spa equipment state.
    Spa(SpaStatus),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Raw(hex) => f.write_str(hex),
            Status::Spa(status) => status.fmt(f),
        }
    }
}
