//! Shot launch, flight simulation, and landing classification.
//!
//! Velocities are m/s and positions meters. One [`Flight::step`] advances
//! the ball by `tick_seconds`; the rest test compares raw velocity
//! components against `rest_speed`.

use rand::Rng;
use tracing::info;

use crate::club::Club;
use crate::config::{CourseConfig, PhysicsConfig};
use crate::swing::SwingEvent;
use crate::vector::Vec3;

// ---------------------------------------------------------------------------
// Accuracy noise
// ---------------------------------------------------------------------------

/// Source of the lateral accuracy draw.
pub trait AccuracyNoise {
    /// Uniform draw in `[-1.0, 1.0]`.
    fn sample(&mut self) -> f64;
}

/// Noise from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomNoise<R: Rng>(pub R);

impl<R: Rng> AccuracyNoise for RandomNoise<R> {
    fn sample(&mut self) -> f64 {
        self.0.gen_range(-1.0..=1.0)
    }
}

/// Constant noise. `FixedNoise(0.0)` hits every shot dead straight.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl AccuracyNoise for FixedNoise {
    fn sample(&mut self) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Landing zone. Sand and Water are modeled but no rule produces them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terrain {
    Hole,
    Green,
    Fairway,
    Rough,
    Sand,
    Water,
}

impl Terrain {
    pub fn label(&self) -> &'static str {
        match self {
            Terrain::Hole => "hole",
            Terrain::Green => "green",
            Terrain::Fairway => "fairway",
            Terrain::Rough => "rough",
            Terrain::Sand => "sand",
            Terrain::Water => "water",
        }
    }
}

impl std::fmt::Display for Terrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one completed flight.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShotResult {
    /// Final forward position (m)
    pub distance: f64,
    /// Same as `distance`; carry and roll are not separated.
    pub carry: f64,
    /// Final lateral position (m, positive = right)
    pub deviation: f64,
    pub terrain: Terrain,
    pub strokes: u32,
    /// Not computed by the engine; left for the display layer.
    pub power: f64,
    /// Not computed by the engine; left for the display layer.
    pub accuracy: f64,
}

/// Classify a resting ball position.
pub fn classify(position: Vec3, course: &CourseConfig) -> ShotResult {
    let to_hole = (position.x - course.hole.x).hypot(position.z - course.hole.z);
    let terrain = if to_hole < course.hole_radius {
        Terrain::Hole
    } else if to_hole < course.green_radius {
        Terrain::Green
    } else if position.x.abs() < course.fairway_half_width {
        Terrain::Fairway
    } else {
        Terrain::Rough
    };
    ShotResult {
        distance: position.z,
        carry: position.z,
        deviation: position.x,
        terrain,
        strokes: 1,
        power: 0.0,
        accuracy: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Flight
// ---------------------------------------------------------------------------

/// Ball position and velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BallState {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl BallState {
    /// Ball on the tee, at rest.
    pub fn teed() -> Self {
        Self::default()
    }

    pub fn is_grounded(&self) -> bool {
        self.position.y <= 0.0
    }
}

/// Result of one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Airborne,
    Bounced,
    Rolling,
    /// The ball was already grounded and slower than the rest speed.
    /// The state was not advanced.
    AtRest,
}

/// A ball in motion.
#[derive(Debug, Clone)]
pub struct Flight {
    ball: BallState,
    physics: PhysicsConfig,
    ticks: u64,
}

impl Flight {
    pub fn new(launch_velocity: Vec3, physics: PhysicsConfig) -> Self {
        Self {
            ball: BallState { position: Vec3::ZERO, velocity: launch_velocity },
            physics,
            ticks: 0,
        }
    }

    pub fn ball(&self) -> BallState {
        self.ball
    }

    /// Steps taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the ball is resting: on the ground with every velocity
    /// component below the rest speed.
    pub fn is_at_rest(&self) -> bool {
        let v = self.ball.velocity;
        let rest = self.physics.rest_speed;
        self.ball.is_grounded() && v.horizontal_magnitude() < rest && v.y.abs() < rest
    }

    /// Advance one tick.
    pub fn step(&mut self) -> FlightStatus {
        if self.is_at_rest() {
            return FlightStatus::AtRest;
        }
        self.ticks += 1;
        self.ball = tick(self.ball, &self.physics);
        if self.ball.position.y > 0.0 {
            FlightStatus::Airborne
        } else if self.ball.velocity.y != 0.0 {
            FlightStatus::Bounced
        } else {
            FlightStatus::Rolling
        }
    }

    /// Step until the ball rests. Returns the resting position.
    pub fn run_to_rest(&mut self) -> Vec3 {
        while self.step() != FlightStatus::AtRest {}
        self.ball.position
    }
}

/// Integrate one tick: move, then apply air drag or resolve ground contact.
pub fn tick(ball: BallState, p: &PhysicsConfig) -> BallState {
    let dt = p.tick_seconds;
    let mut position = ball.position + ball.velocity * dt;
    let mut velocity = ball.velocity;

    if position.y > 0.0 {
        velocity.y -= p.gravity * dt;
        velocity.x *= p.air_drag;
        velocity.z *= p.air_drag;
    } else {
        position.y = 0.0;
        if velocity.y.abs() > p.bounce_threshold {
            velocity.y = -velocity.y * p.bounce_restitution;
            velocity.x *= p.bounce_friction;
            velocity.z *= p.bounce_friction;
        } else {
            velocity.y = 0.0;
            velocity.x *= p.rolling_friction;
            velocity.z *= p.rolling_friction;
        }
    }

    BallState { position, velocity }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// How a swing was judged.
#[derive(Debug, Clone, PartialEq)]
pub enum Launch {
    /// A real shot; the flight has started.
    Shot { power_ratio: f64, velocity: Vec3 },
    /// Trigger not held at swing start, or too weak.
    Practice { power_ratio: f64 },
}

/// Turns swings into flights.
pub struct ShotEngine {
    physics: PhysicsConfig,
    max_power_reference: f64,
    noise: Box<dyn AccuracyNoise>,
}

impl ShotEngine {
    pub fn new(
        physics: PhysicsConfig,
        max_power_reference: f64,
        noise: impl AccuracyNoise + 'static,
    ) -> Self {
        Self { physics, max_power_reference, noise: Box::new(noise) }
    }

    /// Peak magnitude normalized to the reference, capped at the overshoot limit.
    pub fn power_ratio(&self, peak: f64) -> f64 {
        (peak / self.max_power_reference).min(self.physics.overshoot_cap)
    }

    /// Launch velocity for `club` at `power_ratio` with lateral angle `noise_rad`.
    pub fn launch_velocity(&self, club: &Club, power_ratio: f64, noise_rad: f64) -> Vec3 {
        let speed = club.max_distance * self.physics.speed_factor * power_ratio;
        let loft = club.loft_rad();
        Vec3::new(
            noise_rad.sin() * speed,
            loft.sin() * speed * self.physics.lift_factor,
            loft.cos() * speed * noise_rad.cos(),
        )
    }

    /// Judge a swing. Real shots draw accuracy noise and return the flight.
    pub fn execute(&mut self, swing: &SwingEvent, club: &Club) -> (Launch, Option<Flight>) {
        let power_ratio = self.power_ratio(swing.peak);
        if !swing.trigger_held_at_start || power_ratio <= self.physics.activation_floor {
            return (Launch::Practice { power_ratio }, None);
        }

        let noise_rad =
            self.noise.sample() * self.physics.accuracy_spread * power_ratio * club.difficulty;
        let velocity = self.launch_velocity(club, power_ratio, noise_rad);
        info!(
            "{}: power={:.0}% launch=({:.1}, {:.1}, {:.1}) m/s",
            club.name,
            power_ratio * 100.0,
            velocity.x,
            velocity.y,
            velocity.z,
        );
        (Launch::Shot { power_ratio, velocity }, Some(Flight::new(velocity, self.physics.clone())))
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }
}

impl std::fmt::Debug for ShotEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShotEngine")
            .field("physics", &self.physics)
            .field("max_power_reference", &self.max_power_reference)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::club::default_bag;

    const MAX_POWER: f64 = 20.0;

    fn driver() -> Club {
        default_bag().remove(0)
    }

    fn engine(noise: impl AccuracyNoise + 'static) -> ShotEngine {
        ShotEngine::new(PhysicsConfig::default(), MAX_POWER, noise)
    }

    fn held(peak: f64) -> SwingEvent {
        SwingEvent { peak, trigger_held_at_start: true }
    }

    #[test]
    fn full_power_driver_is_deterministic_without_noise() {
        let mut engine = engine(FixedNoise(0.0));
        let club = driver();
        let (launch, flight) = engine.execute(&held(MAX_POWER), &club);
        let Launch::Shot { power_ratio, velocity } = launch else {
            panic!("expected a shot");
        };
        assert_eq!(power_ratio, 1.0);
        let expected_z = club.loft_rad().cos() * club.max_distance * 0.25;
        assert!((velocity.z - expected_z).abs() < 1e-9);
        assert_eq!(velocity.x, 0.0);
        let expected_y = club.loft_rad().sin() * club.max_distance * 0.25 * 1.5;
        assert!((velocity.y - expected_y).abs() < 1e-9);
        assert_eq!(flight.unwrap().ball().velocity, velocity);
    }

    #[test]
    fn power_ratio_caps_at_overshoot() {
        let engine = engine(FixedNoise(0.0));
        assert_eq!(engine.power_ratio(MAX_POWER * 3.0), 1.1);
        assert_eq!(engine.power_ratio(MAX_POWER / 2.0), 0.5);
    }

    #[test]
    fn practice_without_trigger() {
        let mut engine = engine(FixedNoise(0.0));
        let swing = SwingEvent { peak: MAX_POWER, trigger_held_at_start: false };
        let (launch, flight) = engine.execute(&swing, &driver());
        assert_eq!(launch, Launch::Practice { power_ratio: 1.0 });
        assert!(flight.is_none());
    }

    #[test]
    fn practice_below_activation_floor() {
        let mut engine = engine(FixedNoise(0.0));
        let (launch, flight) = engine.execute(&held(MAX_POWER * 0.1), &driver());
        assert!(matches!(launch, Launch::Practice { .. }));
        assert!(flight.is_none());
        let (launch, _) = engine.execute(&held(MAX_POWER * 0.11), &driver());
        assert!(matches!(launch, Launch::Shot { .. }));
    }

    #[test]
    fn noise_pushes_ball_sideways_scaled_by_difficulty() {
        let mut engine = engine(FixedNoise(1.0));
        let club = driver();
        let (launch, _) = engine.execute(&held(MAX_POWER), &club);
        let Launch::Shot { velocity, .. } = launch else {
            panic!("expected a shot");
        };
        let angle = 0.05 * club.difficulty;
        let speed = club.max_distance * 0.25;
        assert!((velocity.x - angle.sin() * speed).abs() < 1e-9);
        assert!((velocity.z - club.loft_rad().cos() * speed * angle.cos()).abs() < 1e-9);
    }

    #[test]
    fn random_noise_stays_in_range() {
        let mut noise = RandomNoise(ChaCha8Rng::seed_from_u64(7));
        for _ in 0..1000 {
            let v = noise.sample();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn gravity_and_drag_while_airborne() {
        let p = PhysicsConfig::default();
        let ball = BallState {
            position: Vec3::new(0.0, 10.0, 0.0),
            velocity: Vec3::new(1.0, 0.0, 2.0),
        };
        let next = tick(ball, &p);
        assert!((next.velocity.y + 9.81 * 0.016).abs() < 1e-12);
        assert!((next.velocity.x - 0.995).abs() < 1e-12);
        assert!((next.velocity.z - 1.99).abs() < 1e-12);
    }

    #[test]
    fn ground_contact_bounces_then_rolls() {
        let p = PhysicsConfig::default();
        let ball = BallState {
            position: Vec3::new(0.0, 0.01, 0.0),
            velocity: Vec3::new(0.0, -10.0, 10.0),
        };
        let next = tick(ball, &p);
        assert_eq!(next.position.y, 0.0);
        assert_eq!(next.velocity.y, 5.0);
        assert!((next.velocity.z - 7.0).abs() < 1e-12);

        let slow = BallState {
            position: Vec3::new(0.0, 0.0, 0.0),
            velocity: Vec3::new(0.0, -0.3, 10.0),
        };
        let next = tick(slow, &p);
        assert_eq!(next.velocity.y, 0.0);
        assert!((next.velocity.z - 9.5).abs() < 1e-12);
    }

    #[test]
    fn height_never_negative() {
        let mut flight = Flight::new(Vec3::new(3.0, 40.0, 60.0), PhysicsConfig::default());
        while flight.step() != FlightStatus::AtRest {
            assert!(flight.ball().position.y >= 0.0);
        }
    }

    #[test]
    fn every_launch_comes_to_rest() {
        let mut engine = engine(RandomNoise(ChaCha8Rng::seed_from_u64(42)));
        for club in default_bag() {
            for peak in [3.0, 10.0, 20.0, 40.0] {
                let (_, flight) = engine.execute(&held(peak), &club);
                let Some(mut flight) = flight else { continue };
                let rest = flight.run_to_rest();
                assert!(flight.is_at_rest());
                assert_eq!(rest.y, 0.0);
                assert!(flight.ticks() < 10_000, "{} took {} ticks", club.name, flight.ticks());
            }
        }
    }

    #[test]
    fn slow_launch_from_ground_is_at_rest() {
        let flight = Flight::new(Vec3::new(0.0, 0.05, 0.05), PhysicsConfig::default());
        assert!(flight.is_at_rest());
        let flight = Flight::new(Vec3::new(0.0, 5.0, 20.0), PhysicsConfig::default());
        assert!(!flight.is_at_rest());
    }

    #[test]
    fn classification_boundaries() {
        let course = CourseConfig::default();
        assert_eq!(course.hole, Vec3::new(0.0, 0.0, 300.0));
        assert_eq!(classify(Vec3::new(0.0, 0.0, 300.0), &course).terrain, Terrain::Hole);
        assert_eq!(classify(Vec3::new(0.0, 0.0, 290.0), &course).terrain, Terrain::Green);
        assert_eq!(classify(Vec3::new(5.0, 0.0, 250.0), &course).terrain, Terrain::Fairway);
        assert_eq!(classify(Vec3::new(20.0, 0.0, 250.0), &course).terrain, Terrain::Rough);
        assert_eq!(classify(Vec3::new(-9.99, 0.0, 100.0), &course).terrain, Terrain::Fairway);
        assert_eq!(classify(Vec3::new(-10.0, 0.0, 100.0), &course).terrain, Terrain::Rough);
    }

    #[test]
    fn result_fields() {
        let result = classify(Vec3::new(-4.0, 0.0, 187.5), &CourseConfig::default());
        assert_eq!(result.distance, 187.5);
        assert_eq!(result.carry, 187.5);
        assert_eq!(result.deviation, -4.0);
        assert_eq!(result.strokes, 1);
        assert_eq!(result.power, 0.0);
        assert_eq!(result.accuracy, 0.0);
    }
}
