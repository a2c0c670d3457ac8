//! Game tunables.
//!
//! [`GameConfig::default`] is the canonical game. With the `json` feature a
//! partial JSON document can override any subset of fields.

use thiserror::Error;

use crate::club::{self, Club};
use crate::vector::Vec3;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[cfg(feature = "json")]
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Swing detection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SwingConfig {
    /// Gyro magnitude that starts a capture (rad/s)
    pub trigger_threshold: f64,
    /// Gyro magnitude treated as 100% power (rad/s)
    pub max_power_reference: f64,
    /// Capture window length (ms)
    pub window_ms: u64,
    /// Samples kept for the post-shot chart
    pub trace_len: usize,
    /// Weight of the previous value in the power meter EMA
    pub smoothing: f64,
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            trigger_threshold: 4.0,
            max_power_reference: 20.0,
            window_ms: 400,
            trace_len: 40,
            smoothing: 0.8,
        }
    }
}

/// Launch and flight physics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Power ratio at or below which a swing is a practice swing
    pub activation_floor: f64,
    /// Power ratio ceiling
    pub overshoot_cap: f64,
    /// Launch speed per meter of club max distance at full power
    pub speed_factor: f64,
    /// Extra multiplier on vertical launch speed
    pub lift_factor: f64,
    /// Max lateral noise at full power and difficulty 1 (rad)
    pub accuracy_spread: f64,
    /// m/s²
    pub gravity: f64,
    /// Horizontal velocity multiplier per airborne tick
    pub air_drag: f64,
    /// Vertical velocity multiplier on bounce
    pub bounce_restitution: f64,
    /// Horizontal velocity multiplier on bounce
    pub bounce_friction: f64,
    /// Horizontal velocity multiplier per rolling tick
    pub rolling_friction: f64,
    /// Impact speed above which the ball bounces instead of rolling
    pub bounce_threshold: f64,
    /// Speed under which a grounded ball is at rest
    pub rest_speed: f64,
    /// Simulation step (s)
    pub tick_seconds: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            activation_floor: 0.1,
            overshoot_cap: 1.1,
            speed_factor: 0.25,
            lift_factor: 1.5,
            accuracy_spread: 0.05,
            gravity: 9.81,
            air_drag: 0.995,
            bounce_restitution: 0.5,
            bounce_friction: 0.7,
            rolling_friction: 0.95,
            bounce_threshold: 0.5,
            rest_speed: 0.1,
            tick_seconds: 0.016,
        }
    }
}

/// Hole placement and landing-zone sizes (m).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CourseConfig {
    pub hole: Vec3,
    pub hole_radius: f64,
    pub green_radius: f64,
    /// Max |x| still counted as fairway
    pub fairway_half_width: f64,
}

impl Default for CourseConfig {
    fn default() -> Self {
        Self {
            hole: Vec3::new(0.0, 0.0, 300.0),
            hole_radius: 1.0,
            green_radius: 15.0,
            fairway_half_width: 10.0,
        }
    }
}

/// Button bindings, by name (see `protocol::buttons::BUTTONS`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InputConfig {
    /// Held to address the ball and commit the next swing
    pub trigger: Vec<String>,
    /// Held on the result screen to start over
    pub reset: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            trigger: vec!["b".into(), "zl".into()],
            reset: vec!["a".into(), "b".into(), "zl".into(), "zr".into()],
        }
    }
}

/// Commentary display.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CommentaryConfig {
    /// Shown when the provider is missing, fails, or times out
    pub fallback: String,
    pub timeout_ms: u64,
}

impl Default for CommentaryConfig {
    fn default() -> Self {
        Self { fallback: "Nice shot! Keep it up.".into(), timeout_ms: 8000 }
    }
}

/// All game tunables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    pub swing: SwingConfig,
    pub physics: PhysicsConfig,
    pub course: CourseConfig,
    pub input: InputConfig,
    pub commentary: CommentaryConfig,
    pub clubs: Vec<Club>,
    /// Minimum spacing between handshake retries (ms)
    pub handshake_retry_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            swing: SwingConfig::default(),
            physics: PhysicsConfig::default(),
            course: CourseConfig::default(),
            input: InputConfig::default(),
            commentary: CommentaryConfig::default(),
            clubs: club::default_bag(),
            handshake_retry_ms: crate::seq::DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl GameConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    #[cfg(feature = "json")]
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or blow up the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if self.clubs.is_empty() {
            return Err(ConfigError::Invalid("club bag is empty".into()));
        }
        for (name, value) in [
            ("swing.trigger_threshold", self.swing.trigger_threshold),
            ("swing.max_power_reference", self.swing.max_power_reference),
            ("physics.activation_floor", p.activation_floor),
            ("physics.overshoot_cap", p.overshoot_cap),
            ("physics.speed_factor", p.speed_factor),
            ("physics.lift_factor", p.lift_factor),
            ("physics.accuracy_spread", p.accuracy_spread),
            ("physics.gravity", p.gravity),
            ("physics.bounce_threshold", p.bounce_threshold),
            ("physics.rest_speed", p.rest_speed),
            ("physics.tick_seconds", p.tick_seconds),
            ("course.hole.x", self.course.hole.x),
            ("course.hole.z", self.course.hole.z),
            ("course.hole_radius", self.course.hole_radius),
            ("course.green_radius", self.course.green_radius),
            ("course.fairway_half_width", self.course.fairway_half_width),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite")));
            }
        }
        for club in &self.clubs {
            let values = [club.max_distance, club.loft_deg, club.difficulty];
            if !values.iter().all(|v| v.is_finite()) {
                let msg = format!("club {:?} has a non-finite value", club.name);
                return Err(ConfigError::Invalid(msg));
            }
        }
        if self.swing.max_power_reference <= 0.0 {
            return Err(ConfigError::Invalid("swing.max_power_reference must be > 0".into()));
        }
        if self.swing.window_ms == 0 {
            return Err(ConfigError::Invalid("swing.window_ms must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.swing.smoothing) {
            return Err(ConfigError::Invalid("swing.smoothing must be in [0, 1)".into()));
        }
        if p.tick_seconds <= 0.0 {
            return Err(ConfigError::Invalid("physics.tick_seconds must be > 0".into()));
        }
        if p.gravity <= 0.0 {
            return Err(ConfigError::Invalid("physics.gravity must be > 0".into()));
        }
        if p.bounce_threshold < 0.0 {
            return Err(ConfigError::Invalid("physics.bounce_threshold must be >= 0".into()));
        }
        for (name, value) in [
            ("physics.air_drag", p.air_drag),
            ("physics.bounce_restitution", p.bounce_restitution),
            ("physics.bounce_friction", p.bounce_friction),
            ("physics.rolling_friction", p.rolling_friction),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1)")));
            }
        }
        if p.rest_speed <= 0.0 {
            return Err(ConfigError::Invalid("physics.rest_speed must be > 0".into()));
        }
        Ok(())
    }
}
