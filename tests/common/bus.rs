//! A simulated half-duplex RS-485 bus between one controller and one device.

use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Write};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use aqualink_keypad::Connector;

/// Bytes travelling in one direction.
#[derive(Default)]
struct Line {
    data: Mutex<VecDeque<u8>>,
    available: Condvar,
}

#[derive(Default)]
pub struct RS485Bus {
    to_controller: Line,
    to_device: Line,
}

impl RS485Bus {
    pub fn new() -> Arc<RS485Bus> {
        Default::default()
    }

    pub fn controller_interface(self: &Arc<Self>) -> BusInterface {
        BusInterface::new(self, true)
    }

    pub fn device_interface(self: &Arc<Self>) -> BusInterface {
        BusInterface::new(self, false)
    }
}

pub struct BusInterface {
    bus: Arc<RS485Bus>,
    is_controller: bool,
    pub timeout: Duration,
}

impl BusInterface {
    fn new(bus: &Arc<RS485Bus>, is_controller: bool) -> BusInterface {
        BusInterface {
            bus: Arc::clone(bus),
            is_controller,
            timeout: Duration::from_millis(20),
        }
    }

    fn lines(&self) -> (&Line, &Line) {
        if self.is_controller {
            (&self.bus.to_controller, &self.bus.to_device)
        } else {
            (&self.bus.to_device, &self.bus.to_controller)
        }
    }

    pub fn send(&mut self, data: &[u8]) {
        self.write_all(data).unwrap();
    }
}

impl std::io::Read for BusInterface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let (rx, _) = self.lines();
        let mut data = rx.data.lock().unwrap();
        if data.is_empty() {
            data = rx.available.wait_timeout(data, self.timeout).unwrap().0;
        }

        let len = buf.len().min(data.len());
        for (dst, src) in buf.iter_mut().zip(data.drain(..len)) {
            *dst = src;
        }
        if len > 0 {
            Ok(len)
        } else {
            Err(Error::new(ErrorKind::TimedOut, "IO read timeout"))
        }
    }
}

impl std::io::Write for BusInterface {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let (_, tx) = self.lines();
        tx.data.lock().unwrap().extend(buf);
        tx.available.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hands out the device side of the bus once; later connects fail.
pub struct BusConnector(Option<BusInterface>);

impl BusConnector {
    pub fn new(bus: &Arc<RS485Bus>) -> Self {
        BusConnector(Some(bus.device_interface()))
    }
}

impl Connector for BusConnector {
    type Port = BusInterface;

    fn connect(&mut self) -> std::io::Result<BusInterface> {
        self.0
            .take()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "bus interface already taken"))
    }

    fn name(&self) -> &str {
        "simulated bus"
    }
}
