//! Frame I/O over a serial transport.
//!
//! [`BusReader`] drives the [`Synchronizer`] with bytes read from a transport
//! provided by a [`Connector`], and writes acks back with the bus turnaround
//! gap. The transport is reopened when it fails, and reads always return
//! within the transport's read timeout so the caller can check for shutdown.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use snafu::{OptionExt, ResultExt};

use crate::buffer::Buffer;
use crate::codec::{Frame, Hex};
use crate::sync::{FramingError, Synchronizer};
use crate::types::{Error, NotConnectedSnafu, OpenSnafu, WriteSnafu};

/// Minimum time between the end of a read and the start of a write.
pub const MIN_GAP: Duration = Duration::from_millis(4);

const READ_CHUNK: usize = 64;

/// Serial port settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    /// Path of the RS-485 serial device.
    pub path: String,
    pub baud_rate: u32,
    /// Upper bound for a single blocking read.
    pub read_timeout: Duration,
    /// Minimum time between the end of a read and the start of a write.
    pub min_gap: Duration,
    /// Pause before trying to open a device path that doesn't exist.
    pub absent_delay: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            path: String::from("/dev/rs485"),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(100),
            min_gap: MIN_GAP,
            absent_delay: Duration::from_secs(1),
        }
    }
}

/// Opens the transport, and reopens it after a failure.
pub trait Connector {
    type Port: Read + Write;

    /// Open a new handle to the transport.
    fn connect(&mut self) -> io::Result<Self::Port>;

    /// Name of the transport, for log messages.
    fn name(&self) -> &str;
}

/// Connects to a serial port, 7 data bits, no parity and one stop bit.
#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: BusConfig,
}

#[cfg(feature = "serial")]
impl SerialConnector {
    pub fn new(config: BusConfig) -> Self {
        Self { config }
    }
}

#[cfg(feature = "serial")]
impl Connector for SerialConnector {
    type Port = Box<dyn serialport::SerialPort>;

    fn connect(&mut self) -> io::Result<Self::Port> {
        if !std::path::Path::new(&self.config.path).exists() {
            // Back off, the device may be hot plugged.
            thread::sleep(self.config.absent_delay);
        }
        serialport::new(self.config.path.as_str(), self.config.baud_rate)
            .data_bits(serialport::DataBits::Seven)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(self.config.read_timeout)
            .open()
            .map_err(io::Error::from)
    }

    fn name(&self) -> &str {
        &self.config.path
    }
}

/// Operator requested shutdown, shared between the bus thread and the web layer.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of [`BusReader::read_frame`].
#[derive(Debug, PartialEq)]
pub enum ReadOutcome {
    /// A frame with a valid checksum.
    Frame(Frame),
    /// No complete message arrived within the read timeout.
    Idle,
    /// A message was received but discarded.
    Discarded(FramingError),
    /// The transport isn't available. Callers that deal in destination
    /// addresses report this as [`crate::UNKNOWN_ADDRESS`].
    NoDevice,
    /// Shutdown was requested.
    Stop,
}

/// Reads frames from, and writes frames to, the bus.
pub struct BusReader<C: Connector> {
    connector: C,
    port: Option<C::Port>,
    sync: Synchronizer,
    input: Buffer,
    last_read: Instant,
    min_gap: Duration,
    shutdown: Shutdown,
}

#[cfg(feature = "serial")]
impl BusReader<SerialConnector> {
    /// Create a reader for the serial port described by `config`.
    pub fn serial(config: BusConfig, shutdown: Shutdown) -> Self {
        let min_gap = config.min_gap;
        BusReader::new(SerialConnector::new(config), shutdown).with_min_gap(min_gap)
    }
}

impl<C: Connector> BusReader<C> {
    /// Create a reader. The transport is opened by the first read.
    pub fn new(connector: C, shutdown: Shutdown) -> Self {
        Self {
            connector,
            port: None,
            sync: Synchronizer::new(),
            input: Buffer::new(),
            last_read: Instant::now(),
            min_gap: MIN_GAP,
            shutdown,
        }
    }

    pub fn with_min_gap(mut self, min_gap: Duration) -> Self {
        self.min_gap = min_gap;
        self
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Open the transport now, instead of at the first read.
    /// # Errors
    /// Returns [`Error::Open`] if the transport can't be opened.
    pub fn connect(&mut self) -> Result<(), Error> {
        let port = self.connector.connect().context(OpenSnafu {
            path: self.connector.name(),
        })?;
        info!("Opened {}", self.connector.name());
        self.port = Some(port);
        Ok(())
    }

    /// Read until a message is complete or the transport runs dry.
    ///
    /// A message with a bad checksum is reported as
    /// [`ReadOutcome::Discarded`] rather than skipped, so that every call
    /// returns after at most one message.
    pub fn read_frame(&mut self) -> ReadOutcome {
        loop {
            if self.shutdown.is_requested() {
                return ReadOutcome::Stop;
            }

            if !self.input.is_empty() {
                let (consumed, result) = self.sync.receive_data(self.input.as_ref());
                self.input.consume(consumed);
                match result {
                    Some(Ok(frame)) => {
                        debug!("--> {:?}", frame);
                        return ReadOutcome::Frame(frame);
                    }
                    Some(Err(err)) => {
                        warn!("Discarding message from {}: {}", self.connector.name(), err);
                        return ReadOutcome::Discarded(err);
                    }
                    None => continue,
                }
            }

            if let Some(outcome) = self.fill_input() {
                return outcome;
            }
        }
    }

    /// Write a frame, waiting out the remainder of the turnaround gap first.
    /// # Errors
    /// Returns [`Error::NotConnected`] if there is no open transport, or
    /// [`Error::Write`] if the write fails. The transport is reopened by the
    /// next read in the latter case.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        let port = self.port.as_mut().context(NotConnectedSnafu)?;
        let data = frame.to_bytes();

        let elapsed = self.last_read.elapsed();
        if elapsed < self.min_gap {
            thread::sleep(self.min_gap - elapsed);
        }

        debug!("<-- {:?}", frame);
        let result = port.write_all(&data).and_then(|()| port.flush());
        if result.is_err() {
            self.disconnect();
        }
        result.context(WriteSnafu)
    }

    /// Read more bytes into the input buffer. Returns the outcome to report
    /// if no bytes could be read.
    fn fill_input(&mut self) -> Option<ReadOutcome> {
        if self.port.is_none() && !self.reconnect() {
            return Some(ReadOutcome::NoDevice);
        }
        let port = self.port.as_mut()?;

        let mut chunk = [0; READ_CHUNK];
        match port.read(&mut chunk) {
            Ok(0) => Some(ReadOutcome::Idle),
            Ok(len) => {
                self.last_read = Instant::now();
                trace!("raw {}", Hex(&chunk[..len]));
                self.input.write(&chunk[..len]);
                None
            }
            Err(err) if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock => {
                Some(ReadOutcome::Idle)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                if self.shutdown.is_requested() {
                    Some(ReadOutcome::Stop)
                } else {
                    Some(ReadOutcome::Idle)
                }
            }
            Err(err) => {
                warn!("Read from {} failed: {}", self.connector.name(), err);
                self.disconnect();
                self.reconnect();
                Some(ReadOutcome::Idle)
            }
        }
    }

    fn reconnect(&mut self) -> bool {
        match self.connect() {
            Ok(()) => true,
            Err(err) => {
                debug!("{}", err);
                false
            }
        }
    }

    fn disconnect(&mut self) {
        if self.sync.in_message() {
            debug!("Dropping partially received message");
        }
        self.port = None;
        self.sync.reset();
        self.input.clear();
    }
}
