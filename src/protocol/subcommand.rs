//! Output reports (host → device).
//!
//! Subcommand frames go out as HID output report 0x01:
//!
//! ```text
//! 0      packet counter (low nibble, wraps at 16)
//! 1..9   rumble data (neutral)
//! 9      subcommand id
//! 10..   subcommand arguments
//! ```

use std::fmt;

/// HID output report id for rumble + subcommand frames.
pub const OUTPUT_REPORT_SUBCOMMAND: u8 = 0x01;

/// Rumble bytes for "no vibration" on both actuators.
pub const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

/// Bytes before the subcommand id.
pub const HEADER_LEN: usize = 1 + NEUTRAL_RUMBLE.len();

pub const SUBCMD_SET_REPORT_MODE: u8 = 0x03;
pub const SUBCMD_ENABLE_IMU: u8 = 0x40;
pub const SUBCMD_ENABLE_VIBRATION: u8 = 0x48;

/// Report mode: standard full mode, pushed at 60 Hz with IMU data.
pub const REPORT_MODE_FULL: u8 = 0x30;

/// Rolling 4-bit packet counter stamped into every output frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketCounter(u8);

impl PacketCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Current value, then advance (wrapping at 16).
    pub fn next(&mut self) -> u8 {
        let value = self.0;
        self.0 = (self.0 + 1) & 0x0F;
        value
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// A subcommand we send to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    EnableVibration(bool),
    EnableImu(bool),
    SetReportMode(u8),
}

impl Subcommand {
    /// The three-step initialization sequence, in send order.
    pub const INIT_SEQUENCE: [Subcommand; 3] = [
        Subcommand::EnableVibration(true),
        Subcommand::EnableImu(true),
        Subcommand::SetReportMode(REPORT_MODE_FULL),
    ];

    pub fn id(&self) -> u8 {
        match self {
            Subcommand::EnableVibration(_) => SUBCMD_ENABLE_VIBRATION,
            Subcommand::EnableImu(_) => SUBCMD_ENABLE_IMU,
            Subcommand::SetReportMode(_) => SUBCMD_SET_REPORT_MODE,
        }
    }

    pub fn args(&self) -> Vec<u8> {
        match *self {
            Subcommand::EnableVibration(on) | Subcommand::EnableImu(on) => vec![u8::from(on)],
            Subcommand::SetReportMode(mode) => vec![mode],
        }
    }

    /// Encode into an output report stamped with `counter`.
    pub fn encode(&self, counter: u8) -> OutputReport {
        let args = self.args();
        let mut data = Vec::with_capacity(HEADER_LEN + 1 + args.len());
        data.push(counter & 0x0F);
        data.extend_from_slice(&NEUTRAL_RUMBLE);
        data.push(self.id());
        data.extend_from_slice(&args);
        OutputReport { report_id: OUTPUT_REPORT_SUBCOMMAND, data }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Subcommand::EnableVibration(_) => "enable-vibration",
            Subcommand::EnableImu(_) => "enable-imu",
            Subcommand::SetReportMode(_) => "set-report-mode",
        }
    }
}

/// An encoded output report ready for the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub report_id: u8,
    pub data: Vec<u8>,
}

impl OutputReport {
    /// Packet counter carried in the header.
    pub fn counter(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }

    /// Subcommand id, if the frame is long enough to carry one.
    pub fn subcommand_id(&self) -> Option<u8> {
        self.data.get(HEADER_LEN).copied()
    }
}

impl fmt::Debug for OutputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "0x01 11B | 03 00 01 40 40 00 01 40 40 48 01"
        write!(f, "0x{:02X} {}B", self.report_id, self.data.len())?;
        if !self.data.is_empty() {
            write!(f, " |")?;
            for b in &self.data {
                write!(f, " {b:02X}")?;
            }
        }
        Ok(())
    }
}
