//! Emulation of Aqualink RS-485 remote devices.
//!
//! The crate impersonates the square wall keypad, the PDA remote and the
//! spa-side remote on the bus of a pool controller. Commands addressed to an
//! emulated device update its display and status, and every command is
//! acknowledged with the key press queued by the user, if any.
//!
//! The [`Dispatcher`] runs the bus on its own thread, while [`Devices`] is
//! shared with whatever presents the displays and accepts key presses.

mod ascii;
mod buffer;
pub mod codec;
pub mod device;
pub mod discovery;
pub mod dispatcher;
mod nom_parser;
pub mod reader;
pub mod sync;
pub mod types;

pub use codec::{checksum, encode, Frame};
pub use device::{Device, Devices, Keypad, KeypadModel, Spa};
pub use discovery::discover;
pub use dispatcher::{Dispatcher, Poll};
#[cfg(feature = "serial")]
pub use reader::SerialConnector;
pub use reader::{BusConfig, BusReader, Connector, ReadOutcome, Shutdown, MIN_GAP};
pub use sync::{FramingError, Synchronizer, MAX_MESSAGE_LEN};
pub use types::{
    Error, Role, SpaStatus, Status, Switch, CONTROLLER_ADDRESS, NO_KEY, REPLY_COMMAND,
    UNKNOWN_ADDRESS,
};
