//! Find out which device roles the controller is polling.

use std::collections::BTreeSet;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::reader::{BusReader, Connector, ReadOutcome};
use crate::types::Role;

/// Pause between attempts to open a missing transport.
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Watch the bus for `window` and collect the roles that are addressed.
///
/// Nothing is written. The controller keeps polling a role for a while
/// after a device goes quiet, so a role found here can be emulated with
/// [`crate::Devices::with_roles`].
pub fn discover<C: Connector>(reader: &mut BusReader<C>, window: Duration) -> BTreeSet<Role> {
    let deadline = Instant::now() + window;
    let mut roles = BTreeSet::new();

    while Instant::now() < deadline {
        match reader.read_frame() {
            ReadOutcome::Frame(frame) => {
                if let Ok(role) = Role::from_address(frame.destination) {
                    if roles.insert(role) {
                        info!("Controller polls {} at {:#04x}", role, frame.destination);
                    }
                }
            }
            ReadOutcome::Stop => break,
            ReadOutcome::NoDevice => {
                debug!("No bus transport during discovery");
                let remaining = deadline.saturating_duration_since(Instant::now());
                thread::sleep(remaining.min(RETRY_DELAY));
            }
            ReadOutcome::Idle | ReadOutcome::Discarded(_) => {}
        }
    }
    roles
}
