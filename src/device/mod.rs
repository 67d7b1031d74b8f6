//! Emulated bus devices and the query surface used by the web layer.
//!
//! Each device keeps its state behind its own mutex, so the bus thread and
//! web request threads can share it through an `Arc`. Every operation holds
//! the lock only for its own duration.

use std::sync::Arc;

use crate::codec::Frame;
use crate::types::{Error, Role, Status};

pub mod display;
pub mod keypad;
pub mod spa;

pub use display::{DisplayBuffer, Scroll};
pub use keypad::{Keypad, KeypadModel};
pub use spa::Spa;

/// Capabilities shared by every emulated device.
pub trait Device: Send + Sync {
    /// The role, and thereby the bus address, of this device.
    fn role(&self) -> Role;

    /// Apply a command from the controller and return the ack to send back.
    ///
    /// The ack carries the pending key, which is cleared. Every command gets
    /// an ack, including unknown or malformed ones.
    fn process_command(&self, frame: &Frame) -> Frame;

    /// Queue a key press for the next ack. Unknown keys are ignored, and a
    /// key that hasn't been sent yet is replaced.
    fn send_key(&self, key: &str);

    /// Plain text snapshot of the display.
    fn render_text(&self) -> String;

    /// HTML snapshot of the display.
    fn render_html(&self) -> String;

    /// The last status reported by the controller.
    fn status(&self) -> Status;
}

pub(crate) fn lookup_key(keys: &[(&str, u8)], key: &str) -> Option<u8> {
    keys.iter()
        .find(|(name, _)| *name == key)
        .map(|(_, code)| *code)
}

/// The set of enabled devices, addressed by role.
///
/// Cloning is cheap. Clones share the device state, but each clone has its
/// own set of roles, so a device added after cloning is only seen by the
/// clone it was added to.
#[derive(Clone, Default)]
pub struct Devices {
    devices: Vec<Arc<dyn Device>>,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the default device for each of the given roles.
    pub fn with_roles(roles: &[Role]) -> Self {
        let mut devices = Self::new();
        for role in roles {
            let device: Arc<dyn Device> = match role {
                Role::Keypad => Arc::new(Keypad::square()),
                Role::Pda => Arc::new(Keypad::pda()),
                Role::Spa => Arc::new(Spa::new()),
            };
            devices.add(device);
        }
        devices
    }

    /// Enable a device, replacing any earlier device with the same role.
    pub fn add(&mut self, device: Arc<dyn Device>) {
        let role = device.role();
        self.devices.retain(|d| d.role() != role);
        self.devices.push(device);
    }

    pub fn roles(&self) -> Vec<Role> {
        self.devices.iter().map(|d| d.role()).collect()
    }

    /// The device polled at `address`, if it is enabled.
    pub fn by_address(&self, address: u8) -> Option<&Arc<dyn Device>> {
        self.devices.iter().find(|d| d.role().address() == address)
    }

    /// The device with the given role.
    /// # Errors
    /// Returns [`Error::UnknownRole`] if the role isn't enabled.
    pub fn get(&self, role: Role) -> Result<&Arc<dyn Device>, Error> {
        self.by_address(role.address()).ok_or(Error::UnknownRole {
            address: role.address(),
        })
    }

    /// See [`Device::send_key`].
    pub fn send_key(&self, role: Role, key: &str) -> Result<(), Error> {
        self.get(role)?.send_key(key);
        Ok(())
    }

    /// See [`Device::render_text`].
    pub fn render_text(&self, role: Role) -> Result<String, Error> {
        Ok(self.get(role)?.render_text())
    }

    /// See [`Device::render_html`].
    pub fn render_html(&self, role: Role) -> Result<String, Error> {
        Ok(self.get(role)?.render_html())
    }

    /// See [`Device::status`].
    pub fn status(&self, role: Role) -> Result<Status, Error> {
        Ok(self.get(role)?.status())
    }
}

impl core::fmt::Debug for Devices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Devices")
            .field("roles", &self.roles())
            .finish()
    }
}
