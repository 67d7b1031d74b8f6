#![allow(dead_code)]

use std::cmp::min;
use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard};

use aqualink_keypad::{Connector, Shutdown};

pub mod bus;

/// A serial port that replays scripted bytes and records what is written.
pub struct SerialInterface {
    rx: Vec<u8>,
    rx_pos: usize,
    pub tx: Vec<u8>,
    do_read_error: bool,
    do_write_error: bool,
    do_interrupt: bool,
    on_interrupt: Option<Shutdown>,
    pub fail_open: bool,
    pub opens: usize,
    pub failed_opens: usize,
}

#[derive(Clone)]
pub struct SharedInterface(Arc<Mutex<SerialInterface>>);

/// One open handle to a [`SerialInterface`].
pub struct SerialIOPlane(SharedInterface);

impl SerialInterface {
    pub fn new(rx: &[u8]) -> SharedInterface {
        SharedInterface(Arc::new(Mutex::new(SerialInterface {
            rx: rx.to_vec(),
            rx_pos: 0,
            tx: Vec::new(),
            do_read_error: false,
            do_write_error: false,
            do_interrupt: false,
            on_interrupt: None,
            fail_open: false,
            opens: 0,
            failed_opens: 0,
        })))
    }

    pub fn trigger_write_error(&mut self) {
        self.do_write_error = true;
    }

    pub fn trigger_read_error(&mut self) {
        self.do_read_error = true;
    }

    /// Make the next read fail with `Interrupted`, as a signal would. The
    /// given shutdown is requested from inside that read.
    pub fn trigger_interrupt(&mut self, shutdown: Option<Shutdown>) {
        self.do_interrupt = true;
        self.on_interrupt = shutdown;
    }

    pub fn push_rx(&mut self, data: &[u8]) {
        self.rx.extend_from_slice(data);
    }
}

impl SharedInterface {
    pub fn lock(&self) -> MutexGuard<'_, SerialInterface> {
        self.0.lock().unwrap()
    }

    pub fn connector(&self) -> ScriptedConnector {
        ScriptedConnector(self.clone())
    }
}

impl std::io::Read for SerialIOPlane {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut inner = self.0.lock();
        if inner.do_read_error {
            inner.do_read_error = false;
            return Err(Error::new(ErrorKind::PermissionDenied, "IO read error"));
        }
        if inner.do_interrupt {
            inner.do_interrupt = false;
            if let Some(shutdown) = inner.on_interrupt.take() {
                shutdown.request();
            }
            return Err(Error::new(ErrorKind::Interrupted, "IO read interrupted"));
        }
        if inner.rx_pos == inner.rx.len() {
            return Err(Error::new(ErrorKind::TimedOut, "IO read timeout"));
        }
        let old_pos = inner.rx_pos;
        inner.rx_pos = min(old_pos + buf.len(), inner.rx.len());
        let len = inner.rx_pos - old_pos;
        buf[..len].copy_from_slice(&inner.rx[old_pos..inner.rx_pos]);
        Ok(len)
    }
}

impl std::io::Write for SerialIOPlane {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self.0.lock();
        if inner.do_write_error {
            inner.do_write_error = false;
            Err(Error::new(ErrorKind::PermissionDenied, "IO write error"))
        } else {
            inner.tx.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Opens handles to a [`SerialInterface`], unless `fail_open` is set.
pub struct ScriptedConnector(SharedInterface);

impl Connector for ScriptedConnector {
    type Port = SerialIOPlane;

    fn connect(&mut self) -> std::io::Result<SerialIOPlane> {
        let mut inner = self.0.lock();
        if inner.fail_open {
            inner.failed_opens += 1;
            return Err(Error::new(ErrorKind::NotFound, "no such device"));
        }
        inner.opens += 1;
        Ok(SerialIOPlane(self.0.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
