//! The bus poll loop.

use std::thread;

use log::{debug, info, warn};

use crate::device::Devices;
use crate::reader::{BusReader, Connector, ReadOutcome, Shutdown};

/// Whether the poll loop should keep going.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Poll {
    Continue,
    Stop,
}

/// Routes frames from the bus to the enabled devices and sends their acks.
///
/// # Example
///
/// ```no_run
/// use aqualink_keypad::{BusConfig, BusReader, Devices, Dispatcher, Role, Shutdown};
///
/// let shutdown = Shutdown::new();
/// let reader = BusReader::serial(BusConfig::default(), shutdown.clone());
/// let devices = Devices::with_roles(&[Role::Keypad, Role::Spa]);
/// let bus = Dispatcher::new(reader, devices.clone()).spawn();
///
/// // The web layer uses `devices` and watches `shutdown` ...
/// devices.send_key(Role::Keypad, "select").unwrap();
///
/// shutdown.request();
/// bus.join().unwrap();
/// ```
pub struct Dispatcher<C: Connector> {
    reader: BusReader<C>,
    devices: Devices,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(reader: BusReader<C>, devices: Devices) -> Self {
        Self { reader, devices }
    }

    pub fn shutdown(&self) -> &Shutdown {
        self.reader.shutdown()
    }

    /// Handle the next frame from the bus.
    ///
    /// Frames for enabled devices are acked before returning. Frames for
    /// other addresses, discarded messages and an absent transport are
    /// ignored. Returns [`Poll::Stop`] once shutdown is requested.
    pub fn poll_once(&mut self) -> Poll {
        let frame = match self.reader.read_frame() {
            ReadOutcome::Frame(frame) => frame,
            ReadOutcome::Stop => {
                // Make sure the web layer sees the stop as well.
                self.reader.shutdown().request();
                return Poll::Stop;
            }
            ReadOutcome::Idle | ReadOutcome::Discarded(_) | ReadOutcome::NoDevice => {
                return Poll::Continue;
            }
        };

        let device = match self.devices.by_address(frame.destination) {
            Some(device) => device,
            None => return Poll::Continue,
        };
        let ack = device.process_command(&frame);
        if let Err(err) = self.reader.write_frame(&ack) {
            warn!("{} ack not sent: {}", device.role(), err);
        }
        Poll::Continue
    }

    /// Poll until shutdown is requested.
    pub fn run(mut self) {
        info!("Bus loop started, emulating {:?}", self.devices.roles());
        while self.poll_once() == Poll::Continue {}
        debug!("Bus loop stopped");
    }

    /// Run the poll loop on its own thread.
    pub fn spawn(self) -> thread::JoinHandle<()>
    where
        C: Send + 'static,
        C::Port: Send,
    {
        thread::spawn(move || self.run())
    }
}
