//! Initialization handshake and minimal-report fallback.
//!
//! The controller boots in simple HID mode (0x3F reports, buttons only). To
//! get IMU data it must be sent, in order: enable vibration, enable IMU, set
//! report mode to full (0x30). Any step may fail; failures are logged and
//! the remaining steps are still attempted.
//!
//! If minimal reports keep arriving after the handshake was sent, the mode
//! switch didn't take. [`FallbackGate`] throttles how often the handshake is
//! re-issued.

use tracing::{debug, info, warn};

use crate::conn::{Connection, HidTransport};
use crate::protocol::Subcommand;

/// Default minimum spacing between handshake attempts.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// Outcome of one handshake pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Subcommands written successfully, in send order.
    pub sent: Vec<Subcommand>,
    /// Subcommands that failed, with the error text.
    pub failed: Vec<(Subcommand, String)>,
}

impl HandshakeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Send the three-step initialization sequence.
///
/// Never fails as a whole: gameplay proceeds with whatever reports the
/// device produces, and the caller may retry.
pub fn initialize<T: HidTransport>(conn: &mut Connection<T>) -> HandshakeReport {
    let mut report = HandshakeReport::default();
    for cmd in Subcommand::INIT_SEQUENCE {
        match conn.send(&cmd) {
            Ok(()) => report.sent.push(cmd),
            Err(e) => {
                warn!("handshake step {} failed: {e}", cmd.label());
                report.failed.push((cmd, e.to_string()));
            }
        }
    }
    if report.is_complete() {
        debug!("handshake sent to {}", conn.kind());
    }
    report
}

/// Throttle for re-issuing the handshake while the device is stuck in
/// minimal-report mode.
#[derive(Debug, Clone)]
pub struct FallbackGate {
    interval_ms: u64,
    last_attempt_ms: Option<u64>,
    retries: u32,
}

impl FallbackGate {
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms, last_attempt_ms: None, retries: 0 }
    }

    /// Record that the handshake was sent at `now_ms`.
    pub fn mark_requested(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    /// Whether the handshake has been sent since the last reset.
    pub fn is_requested(&self) -> bool {
        self.last_attempt_ms.is_some()
    }

    /// Called for every minimal report. Returns true (and records the
    /// attempt) if the handshake should be re-issued now.
    pub fn on_minimal_report(&mut self, now_ms: u64) -> bool {
        let Some(last) = self.last_attempt_ms else {
            return false;
        };
        if now_ms.saturating_sub(last) < self.interval_ms {
            return false;
        }
        self.last_attempt_ms = Some(now_ms);
        self.retries += 1;
        info!("still receiving minimal reports, re-sending handshake (retry {})", self.retries);
        true
    }

    /// Number of re-issued handshakes since the last reset.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Forget all attempts (on disconnect).
    pub fn reset(&mut self) {
        self.last_attempt_ms = None;
        self.retries = 0;
    }
}

impl Default for FallbackGate {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::testing::MockTransport;
    use crate::protocol::subcommand::{
        SUBCMD_ENABLE_IMU, SUBCMD_ENABLE_VIBRATION, SUBCMD_SET_REPORT_MODE,
    };

    #[test]
    fn handshake_order_and_counters() {
        let mut conn = Connection::open(MockTransport::right_joycon()).unwrap();
        let report = initialize(&mut conn);
        assert!(report.is_complete());
        assert_eq!(
            conn.transport().sent_subcommands(),
            vec![SUBCMD_ENABLE_VIBRATION, SUBCMD_ENABLE_IMU, SUBCMD_SET_REPORT_MODE]
        );
        let counters: Vec<u8> = conn.transport().sent.iter().map(|(_, d)| d[0]).collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }

    #[test]
    fn failed_step_does_not_stop_sequence() {
        let mut transport = MockTransport::right_joycon();
        transport.fail_subcommands.push(SUBCMD_ENABLE_IMU);
        let mut conn = Connection::open(transport).unwrap();
        let report = initialize(&mut conn);
        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, Subcommand::EnableImu(true));
        assert_eq!(
            conn.transport().sent_subcommands(),
            vec![SUBCMD_ENABLE_VIBRATION, SUBCMD_SET_REPORT_MODE]
        );
    }

    #[test]
    fn gate_ignores_minimal_before_request() {
        let mut gate = FallbackGate::new(1000);
        assert!(!gate.on_minimal_report(5000));
    }

    #[test]
    fn gate_throttles_retries() {
        let mut gate = FallbackGate::new(1000);
        gate.mark_requested(0);
        assert!(!gate.on_minimal_report(16));
        assert!(!gate.on_minimal_report(999));
        assert!(gate.on_minimal_report(1000));
        assert!(!gate.on_minimal_report(1500));
        assert!(gate.on_minimal_report(2000));
        assert_eq!(gate.retries(), 2);
    }

    #[test]
    fn gate_reset_clears_request() {
        let mut gate = FallbackGate::default();
        gate.mark_requested(0);
        gate.reset();
        assert!(!gate.is_requested());
        assert!(!gate.on_minimal_report(10_000));
    }
}
