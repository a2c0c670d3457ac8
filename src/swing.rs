//! Swing detection over the gyroscope magnitude.
//!
//! A swing starts when the angular velocity magnitude crosses the trigger
//! threshold. The detector then captures for a fixed window and reports the
//! peak magnitude when the window expires. Ending on a fixed deadline instead
//! of on decay keeps follow-through wobble from splitting one swing in two.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::SwingConfig;
use crate::protocol::MotionFrame;

/// A completed swing capture.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwingEvent {
    /// Peak gyro magnitude in the window (rad/s)
    pub peak: f64,
    /// Whether the trigger was held when the swing started
    pub trigger_held_at_start: bool,
}

/// One point of the swing chart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwingSample {
    pub t_ms: u64,
    /// Gyro magnitude (rad/s)
    pub magnitude: f64,
}

impl SwingSample {
    /// Magnitude as a percentage of `reference`, clamped to `[0, 100]`.
    pub fn power_percent(&self, reference: f64) -> f64 {
        percent_of(self.magnitude, reference)
    }
}

/// What a frame did to the detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingSignal {
    /// A capture window opened on this frame.
    Started { trigger_held: bool },
    /// The pending window expired.
    Completed(SwingEvent),
}

#[derive(Debug, Clone, Copy)]
struct CaptureWindow {
    deadline_ms: u64,
    peak: f64,
    trigger_held: bool,
}

/// Threshold-triggered, fixed-window swing detector.
#[derive(Debug, Clone)]
pub struct SwingDetector {
    config: SwingConfig,
    window: Option<CaptureWindow>,
    power_percent: f64,
    trace: VecDeque<SwingSample>,
}

impl SwingDetector {
    pub fn new(config: SwingConfig) -> Self {
        let trace = VecDeque::with_capacity(config.trace_len);
        Self { config, window: None, power_percent: 0.0, trace }
    }

    /// Feed one motion frame.
    ///
    /// An expired window completes before the frame is considered, so a
    /// frame can never both finish one swing and start the next.
    pub fn on_frame(
        &mut self,
        frame: &MotionFrame,
        trigger_held: bool,
        now_ms: u64,
    ) -> Option<SwingSignal> {
        if let Some(event) = self.poll(now_ms) {
            return Some(SwingSignal::Completed(event));
        }

        let magnitude = frame.gyro.magnitude();
        if self.window.is_none() {
            if magnitude <= self.config.trigger_threshold {
                return None;
            }
            self.begin_capture(trigger_held, now_ms);
            self.record(magnitude, now_ms);
            return Some(SwingSignal::Started { trigger_held });
        }

        self.record(magnitude, now_ms);
        None
    }

    /// Expire the pending window if its deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<SwingEvent> {
        let window = self.window?;
        if now_ms < window.deadline_ms {
            return None;
        }
        self.window = None;
        let event = SwingEvent { peak: window.peak, trigger_held_at_start: window.trigger_held };
        debug!("swing captured: peak={:.2} rad/s held={}", event.peak, event.trigger_held_at_start);
        Some(event)
    }

    /// Open a capture window at `now_ms`, replacing any pending one.
    pub fn begin_capture(&mut self, trigger_held: bool, now_ms: u64) {
        if self.window.is_some() {
            debug!("capture window replaced at {now_ms} ms");
        }
        self.window = Some(CaptureWindow {
            deadline_ms: now_ms + self.config.window_ms,
            peak: 0.0,
            trigger_held,
        });
        self.trace.clear();
    }

    /// Drop any pending window without emitting an event.
    pub fn cancel(&mut self) {
        self.window = None;
    }

    pub fn is_armed(&self) -> bool {
        self.window.is_some()
    }

    /// Deadline of the pending window, if armed.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.window.map(|w| w.deadline_ms)
    }

    /// Smoothed power meter (0-100).
    pub fn power_percent(&self) -> f64 {
        self.power_percent
    }

    /// Samples of the current or last capture, oldest first.
    pub fn trace(&self) -> Vec<SwingSample> {
        self.trace.iter().copied().collect()
    }

    pub fn config(&self) -> &SwingConfig {
        &self.config
    }

    fn record(&mut self, magnitude: f64, now_ms: u64) {
        if let Some(window) = self.window.as_mut() {
            window.peak = window.peak.max(magnitude);
        }
        if self.config.trace_len > 0 {
            if self.trace.len() == self.config.trace_len {
                self.trace.pop_front();
            }
            self.trace.push_back(SwingSample { t_ms: now_ms, magnitude });
        }
        let target = percent_of(magnitude, self.config.max_power_reference);
        let k = self.config.smoothing;
        self.power_percent = (self.power_percent * k + target * (1.0 - k)).clamp(0.0, 100.0);
    }
}

fn percent_of(magnitude: f64, reference: f64) -> f64 {
    (magnitude / reference * 100.0).clamp(0.0, 100.0)
}
