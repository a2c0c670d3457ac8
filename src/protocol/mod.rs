//! Report types and decode dispatch.
//!
//! - [`Report`]: input reports the controller pushes to us
//! - [`Subcommand`]: output commands we send to the controller
//!
//! Only the combined-controller layout is decoded: three button bytes
//! (right, shared, left) and two stick groups at fixed offsets. The
//! device kind picked at connect time selects the stick group.

pub mod buttons;
pub mod input;
pub mod subcommand;

pub use buttons::ButtonSet;
pub use input::MotionFrame;
pub use subcommand::{OutputReport, PacketCounter, Subcommand};

use tracing::trace;

use crate::device::DeviceKind;
use crate::error::{ProtocolError, Result};

// ---------------------------------------------------------------------------
// Report tags
// ---------------------------------------------------------------------------

/// Standard full report: IMU + buttons + sticks.
pub const TAG_FULL: u8 = 0x30;
/// Simple HID report: buttons and hat only.
pub const TAG_MINIMAL: u8 = 0x3F;
/// Subcommand reply.
pub const TAG_SUBCOMMAND_REPLY: u8 = 0x21;

/// A decoded input report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// Full-data report. Carries real IMU and stick data.
    Full(MotionFrame),
    /// Minimal-data report. The device is not in full mode yet.
    Minimal(MotionFrame),
    /// Any other tag (subcommand replies, NFC/IR, ...). Not an error.
    Ignored { tag: u8 },
}

impl Report {
    /// Decode a raw input report. `raw[0]` is the report tag.
    pub fn decode(raw: &[u8], kind: DeviceKind) -> Result<Self> {
        let Some(&tag) = raw.first() else {
            return Err(ProtocolError::EmptyReport);
        };
        match tag {
            TAG_FULL => input::decode_full(raw, kind)
                .map(Report::Full)
                .map_err(|e| e.with_raw(raw)),
            TAG_MINIMAL => input::decode_minimal(raw, kind)
                .map(Report::Minimal)
                .map_err(|e| e.with_raw(raw)),
            TAG_SUBCOMMAND_REPLY => {
                trace!("subcommand reply 0x{:02X}", raw.get(14).copied().unwrap_or(0));
                Ok(Report::Ignored { tag })
            }
            _ => Ok(Report::Ignored { tag }),
        }
    }

    /// The motion frame, if this report produced one.
    pub fn frame(&self) -> Option<&MotionFrame> {
        match self {
            Report::Full(frame) | Report::Minimal(frame) => Some(frame),
            Report::Ignored { .. } => None,
        }
    }

    pub fn is_minimal(&self) -> bool {
        matches!(self, Report::Minimal(_))
    }
}
