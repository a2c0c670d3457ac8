//! HID connection to a Joy-Con or Pro Controller.
//!
//! Handles output report framing, input report decode, and subscriber
//! callbacks. No game logic; callers drive timing and sequencing.

use std::io;

use tracing::{debug, info, warn};

use crate::device::{DeviceInfo, DeviceKind};
use crate::error::ProtocolError;
use crate::protocol::{OutputReport, PacketCounter, Report, Subcommand};

/// A HID device handle the host has already been granted access to.
///
/// Input reports are pushed by the host; the owner of the [`Connection`]
/// forwards each one to [`Connection::receive`].
pub trait HidTransport {
    /// Vendor/product identity of the opened device.
    fn device_info(&self) -> DeviceInfo;

    /// Write one output report.
    fn send_report(&mut self, report_id: u8, data: &[u8]) -> io::Result<()>;

    /// Release the device.
    fn close(&mut self) -> io::Result<()>;
}

/// Errors from connection operations.
#[derive(Debug)]
pub enum ConnError {
    /// Transport I/O error.
    Io(io::Error),
    /// Input report decode error.
    Protocol(ProtocolError),
    /// Device is not in the vendor/product allow-list.
    UnsupportedDevice(DeviceInfo),
    /// Connection was closed.
    NotConnected,
}

impl std::fmt::Display for ConnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnError::Io(e) => write!(f, "I/O error: {e}"),
            ConnError::Protocol(e) => write!(f, "protocol error: {e}"),
            ConnError::UnsupportedDevice(info) => write!(
                f,
                "unsupported device {:04X}:{:04X}",
                info.vendor_id, info.product_id
            ),
            ConnError::NotConnected => write!(f, "device not connected"),
        }
    }
}

impl std::error::Error for ConnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnError::Io(e) => Some(e),
            ConnError::Protocol(e) => Some(e),
            ConnError::UnsupportedDevice(_) | ConnError::NotConnected => None,
        }
    }
}

impl From<io::Error> for ConnError {
    fn from(e: io::Error) -> Self {
        ConnError::Io(e)
    }
}

impl From<ProtocolError> for ConnError {
    fn from(e: ProtocolError) -> Self {
        ConnError::Protocol(e)
    }
}

/// An open controller connection.
///
/// Single-threaded. Each subscriber slot holds one callback; registering a
/// new one replaces the previous.
pub struct Connection<T: HidTransport> {
    transport: T,
    kind: DeviceKind,
    counter: PacketCounter,
    connected: bool,
    /// Called before every subcommand is written.
    on_send: Option<Box<dyn FnMut(&Subcommand, &OutputReport)>>,
    /// Called after every successful input report decode.
    on_report: Option<Box<dyn FnMut(&Report)>>,
}

impl<T: HidTransport> Connection<T> {
    /// Take ownership of an opened transport, checking it against the allow-list.
    pub fn open(transport: T) -> Result<Self, ConnError> {
        let info = transport.device_info();
        let kind = DeviceKind::from_info(info).ok_or(ConnError::UnsupportedDevice(info))?;
        info!("connected to {kind} ({:04X}:{:04X})", info.vendor_id, info.product_id);
        Ok(Self {
            transport,
            kind,
            counter: PacketCounter::new(),
            connected: true,
            on_send: None,
            on_report: None,
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Register the send observer (replaces any previous one).
    pub fn set_on_send(&mut self, f: impl FnMut(&Subcommand, &OutputReport) + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register the input report subscriber (replaces any previous one).
    pub fn set_on_report(&mut self, f: impl FnMut(&Report) + 'static) {
        self.on_report = Some(Box::new(f));
    }

    /// Stamp `cmd` with the next packet counter and write it.
    pub fn send(&mut self, cmd: &Subcommand) -> Result<(), ConnError> {
        if !self.connected {
            return Err(ConnError::NotConnected);
        }
        let report = cmd.encode(self.counter.next());
        if let Some(cb) = self.on_send.as_mut() {
            cb(cmd, &report);
        }
        debug!("send {}: {report:?}", cmd.label());
        self.transport.send_report(report.report_id, &report.data)?;
        Ok(())
    }

    /// Decode one pushed input report and hand it to the subscriber.
    pub fn receive(&mut self, raw: &[u8]) -> Result<Report, ConnError> {
        if !self.connected {
            return Err(ConnError::NotConnected);
        }
        let report = Report::decode(raw, self.kind)?;
        if let Some(cb) = self.on_report.as_mut() {
            cb(&report);
        }
        Ok(report)
    }

    /// Close the transport. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.counter.reset();
        if let Err(e) = self.transport.close() {
            warn!("error closing {}: {e}", self.kind);
        }
        info!("disconnected from {}", self.kind);
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

// ---------------------------------------------------------------------------
// Test transport
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::device::{PRODUCT_JOYCON_RIGHT, VENDOR_ID};

    /// In-memory transport that records every output report.
    #[derive(Debug)]
    pub struct MockTransport {
        pub info: DeviceInfo,
        pub sent: Vec<(u8, Vec<u8>)>,
        /// Subcommand ids whose writes fail with `BrokenPipe`.
        pub fail_subcommands: Vec<u8>,
        pub closed: bool,
    }

    impl MockTransport {
        pub fn right_joycon() -> Self {
            Self::with_product(PRODUCT_JOYCON_RIGHT)
        }

        pub fn with_product(product_id: u16) -> Self {
            Self {
                info: DeviceInfo { vendor_id: VENDOR_ID, product_id },
                sent: Vec::new(),
                fail_subcommands: Vec::new(),
                closed: false,
            }
        }

        /// Subcommand ids of every successful write, in order.
        pub fn sent_subcommands(&self) -> Vec<u8> {
            self.sent
                .iter()
                .filter_map(|(_, data)| data.get(crate::protocol::subcommand::HEADER_LEN).copied())
                .collect()
        }
    }

    impl HidTransport for MockTransport {
        fn device_info(&self) -> DeviceInfo {
            self.info
        }

        fn send_report(&mut self, report_id: u8, data: &[u8]) -> io::Result<()> {
            let id = data.get(crate::protocol::subcommand::HEADER_LEN).copied();
            if id.is_some_and(|id| self.fail_subcommands.contains(&id)) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
            }
            self.sent.push((report_id, data.to_vec()));
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed = true;
            Ok(())
        }
    }
}
