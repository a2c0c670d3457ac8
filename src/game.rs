//! Game state machine.
//!
//! ```text
//! Intro → Idle ⇄ Address → Swinging → BallFlying → Result → Idle
//! ```
//!
//! Frames drive Idle, Address and Swinging. [`Game::tick`] drives the capture
//! deadline, ball flight and commentary. Every call returns the events it
//! produced, in order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::club::Club;
use crate::commentary::{Commentator, CommentaryProvider};
use crate::config::{ConfigError, GameConfig};
use crate::protocol::MotionFrame;
use crate::shot::{
    self, AccuracyNoise, BallState, Flight, FlightStatus, Launch, RandomNoise, ShotEngine,
    ShotResult,
};
use crate::swing::{SwingDetector, SwingEvent, SwingSample, SwingSignal};
use crate::vector::Vec3;

/// Game errors. None of them change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("unknown club index {index} (bag has {len})")]
    UnknownClub { index: usize, len: usize },

    #[error("club cannot change while a shot is in progress")]
    ClubLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GamePhase {
    Intro,
    Idle,
    Address,
    Swinging,
    BallFlying,
    Result,
}

impl GamePhase {
    /// Phases in which motion frames can cause transitions.
    pub fn accepts_frames(&self) -> bool {
        matches!(self, GamePhase::Idle | GamePhase::Address | GamePhase::Swinging)
    }

    /// Phases in which the club is locked.
    pub fn shot_in_progress(&self) -> bool {
        matches!(self, GamePhase::Swinging | GamePhase::BallFlying)
    }
}

/// Output of the game, for the display layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    /// Smoothed power meter (0-100).
    PowerUpdated(f64),
    SwingStarted { trigger_held: bool },
    /// A swing that did not launch the ball.
    PracticeSwing { power_ratio: f64 },
    ShotStarted { club: String, power_ratio: f64, velocity: Vec3 },
    BallMoved(Vec3),
    ShotFinished { result: ShotResult, trace: Vec<SwingSample> },
    CommentaryReady(String),
}

pub struct Game {
    config: GameConfig,
    phase: GamePhase,
    club_index: usize,
    detector: SwingDetector,
    engine: ShotEngine,
    flight: Option<Flight>,
    ball: BallState,
    last_result: Option<ShotResult>,
    commentator: Commentator,
    /// Trigger state of the last accepted frame.
    trigger_held: bool,
}

impl Game {
    /// New game in [`GamePhase::Intro`] with entropy-seeded accuracy noise.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Self::with_noise(config, RandomNoise(ChaCha8Rng::from_entropy()))
    }

    /// New game with a specific noise source. The config is validated first.
    pub fn with_noise(
        config: GameConfig,
        noise: impl AccuracyNoise + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = SwingDetector::new(config.swing.clone());
        let engine =
            ShotEngine::new(config.physics.clone(), config.swing.max_power_reference, noise);
        let commentator = Commentator::new(config.commentary.clone());
        Ok(Self {
            config,
            phase: GamePhase::Intro,
            club_index: 0,
            detector,
            engine,
            flight: None,
            ball: BallState::teed(),
            last_result: None,
            commentator,
            trigger_held: false,
        })
    }

    pub fn set_commentary_provider(&mut self, provider: impl CommentaryProvider + 'static) {
        self.commentator.set_provider(provider);
    }

    /// Leave the intro screen.
    pub fn begin(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase == GamePhase::Intro {
            self.transition(GamePhase::Idle, &mut events);
        }
        events
    }

    /// Feed one decoded motion frame.
    pub fn on_frame(&mut self, frame: &MotionFrame, now_ms: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if self.phase == GamePhase::Result {
            if frame.buttons.any(&self.config.input.reset) {
                debug!("reset held: {}", frame.buttons);
                self.tee_up(&mut events);
            }
            return events;
        }
        if !self.phase.accepts_frames() {
            return events;
        }

        let trigger_held = frame.buttons.any(&self.config.input.trigger);
        self.trigger_held = trigger_held;
        match (self.phase, trigger_held) {
            (GamePhase::Idle, true) => self.transition(GamePhase::Address, &mut events),
            (GamePhase::Address, false) => self.transition(GamePhase::Idle, &mut events),
            _ => {}
        }

        let before = self.detector.power_percent();
        let signal = self.detector.on_frame(frame, trigger_held, now_ms);
        let after = self.detector.power_percent();

        match signal {
            Some(SwingSignal::Started { trigger_held }) => {
                events.push(GameEvent::SwingStarted { trigger_held });
                if trigger_held && self.phase == GamePhase::Address {
                    self.transition(GamePhase::Swinging, &mut events);
                }
            }
            Some(SwingSignal::Completed(swing)) => self.on_swing(swing, &mut events),
            None => {}
        }
        if after != before {
            events.push(GameEvent::PowerUpdated(after));
        }
        events
    }

    /// Advance timers and physics by one step.
    pub fn tick(&mut self, now_ms: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if self.phase.accepts_frames() {
            if let Some(swing) = self.detector.poll(now_ms) {
                self.on_swing(swing, &mut events);
            }
        }

        if let Some(flight) = self.flight.as_mut() {
            match flight.step() {
                FlightStatus::AtRest => self.finish_flight(now_ms, &mut events),
                _ => {
                    self.ball = flight.ball();
                    events.push(GameEvent::BallMoved(self.ball.position));
                }
            }
        }

        if let Some(text) = self.commentator.poll(now_ms) {
            events.push(GameEvent::CommentaryReady(text));
        }
        events
    }

    /// Select a club by bag index.
    pub fn select_club(&mut self, index: usize) -> Result<&Club, GameError> {
        if self.phase.shot_in_progress() {
            return Err(GameError::ClubLocked);
        }
        let len = self.config.clubs.len();
        if index >= len {
            return Err(GameError::UnknownClub { index, len });
        }
        self.club_index = index;
        let club = &self.config.clubs[index];
        debug!("selected {}", club.name);
        Ok(club)
    }

    /// Acknowledge the result screen. No-op in any other phase.
    pub fn next_shot(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase == GamePhase::Result {
            self.tee_up(&mut events);
        }
        events
    }

    /// Abandon whatever is in progress and return to Idle with the ball
    /// teed up. Ignored before [`Game::begin`].
    pub fn reset(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.phase != GamePhase::Intro {
            self.tee_up(&mut events);
        }
        events
    }

    /// Drop any pending capture after the device goes away. An addressed or
    /// swinging player goes back to Idle; a flight in progress continues.
    pub fn on_disconnect(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.detector.cancel();
        self.trigger_held = false;
        if matches!(self.phase, GamePhase::Address | GamePhase::Swinging) {
            self.transition(GamePhase::Idle, &mut events);
        }
        events
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Whether the player is addressing the ball.
    pub fn addressing(&self) -> bool {
        self.phase == GamePhase::Address
    }

    /// Smoothed power meter (0-100).
    pub fn power(&self) -> f64 {
        self.detector.power_percent()
    }

    /// Whether a swing capture window is open.
    pub fn is_capturing(&self) -> bool {
        self.detector.is_armed()
    }

    pub fn is_commentary_pending(&self) -> bool {
        self.commentator.is_pending()
    }

    pub fn ball_position(&self) -> Vec3 {
        self.ball.position
    }

    pub fn club(&self) -> &Club {
        &self.config.clubs[self.club_index]
    }

    pub fn club_index(&self) -> usize {
        self.club_index
    }

    pub fn clubs(&self) -> &[Club] {
        &self.config.clubs
    }

    pub fn last_result(&self) -> Option<&ShotResult> {
        self.last_result.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn on_swing(&mut self, swing: SwingEvent, events: &mut Vec<GameEvent>) {
        let club = &self.config.clubs[self.club_index];
        let (launch, flight) = self.engine.execute(&swing, club);
        match launch {
            Launch::Shot { power_ratio, velocity } => {
                events.push(GameEvent::ShotStarted {
                    club: club.name.clone(),
                    power_ratio,
                    velocity,
                });
                self.flight = flight;
                self.transition(GamePhase::BallFlying, events);
            }
            Launch::Practice { power_ratio } => {
                debug!("practice swing: power={:.0}%", power_ratio * 100.0);
                events.push(GameEvent::PracticeSwing { power_ratio });
                if self.phase == GamePhase::Swinging {
                    let to = if self.trigger_held { GamePhase::Address } else { GamePhase::Idle };
                    self.transition(to, events);
                }
            }
        }
    }

    fn finish_flight(&mut self, now_ms: u64, events: &mut Vec<GameEvent>) {
        let Some(flight) = self.flight.take() else {
            return;
        };
        self.ball = flight.ball();
        let result = shot::classify(self.ball.position, &self.config.course);
        info!(
            "shot finished: {:.1} m, {:+.1} m lateral, {} after {} ticks",
            result.distance,
            result.deviation,
            result.terrain,
            flight.ticks(),
        );
        self.last_result = Some(result);
        events.push(GameEvent::ShotFinished { result, trace: self.detector.trace() });
        self.transition(GamePhase::Result, events);
        if let Some(text) = self.commentator.request(&result, now_ms) {
            events.push(GameEvent::CommentaryReady(text));
        }
    }

    fn tee_up(&mut self, events: &mut Vec<GameEvent>) {
        self.detector.cancel();
        self.commentator.cancel();
        self.flight = None;
        self.trigger_held = false;
        self.ball = BallState::teed();
        events.push(GameEvent::BallMoved(self.ball.position));
        self.transition(GamePhase::Idle, events);
    }

    fn transition(&mut self, to: GamePhase, events: &mut Vec<GameEvent>) {
        let from = self.phase;
        if from == to {
            return;
        }
        debug!("phase {from:?} -> {to:?}");
        self.phase = to;
        events.push(GameEvent::PhaseChanged { from, to });
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("phase", &self.phase)
            .field("club", &self.club().name)
            .field("ball", &self.ball)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::StaticCommentary;
    use crate::protocol::ButtonSet;
    use crate::shot::{FixedNoise, Terrain};

    fn game() -> Game {
        let mut game = Game::with_noise(GameConfig::default(), FixedNoise(0.0)).unwrap();
        game.begin();
        game
    }

    fn frame(gyro: f64, trigger: bool) -> MotionFrame {
        MotionFrame {
            gyro: Vec3::new(0.0, gyro, 0.0),
            buttons: ButtonSet { b: trigger, ..ButtonSet::default() },
            ..MotionFrame::default()
        }
    }

    fn phases(events: &[GameEvent]) -> Vec<GamePhase> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    /// Address, swing at full power, and tick until the ball rests.
    fn play_full_shot(game: &mut Game) -> Vec<GameEvent> {
        let mut events = Vec::new();
        events.extend(game.on_frame(&frame(0.0, true), 0));
        events.extend(game.on_frame(&frame(20.0, true), 16));
        let mut now = 16;
        while game.phase() != GamePhase::Result && now < 200_000 {
            now += 16;
            events.extend(game.tick(now));
        }
        events
    }

    #[test]
    fn invalid_config_is_rejected() {
        let empty = GameConfig { clubs: Vec::new(), ..GameConfig::default() };
        assert!(matches!(Game::with_noise(empty, FixedNoise(0.0)), Err(ConfigError::Invalid(_))));

        let mut flat = GameConfig::default();
        flat.physics.gravity = 0.0;
        assert!(Game::with_noise(flat, FixedNoise(0.0)).is_err());
    }

    #[test]
    fn starts_in_intro_and_ignores_frames() {
        let mut game = Game::with_noise(GameConfig::default(), FixedNoise(0.0)).unwrap();
        assert_eq!(game.phase(), GamePhase::Intro);
        assert!(game.on_frame(&frame(30.0, true), 0).is_empty());
        assert!(game.reset().is_empty());
        assert_eq!(phases(&game.begin()), vec![GamePhase::Idle]);
    }

    #[test]
    fn trigger_toggles_address() {
        let mut game = game();
        assert_eq!(phases(&game.on_frame(&frame(0.0, true), 0)), vec![GamePhase::Address]);
        assert!(game.addressing());
        assert!(phases(&game.on_frame(&frame(0.0, true), 16)).is_empty());
        assert_eq!(phases(&game.on_frame(&frame(0.0, false), 32)), vec![GamePhase::Idle]);
    }

    #[test]
    fn zl_also_triggers() {
        let mut game = game();
        let f = MotionFrame {
            buttons: ButtonSet { zl: true, ..ButtonSet::default() },
            ..MotionFrame::default()
        };
        game.on_frame(&f, 0);
        assert_eq!(game.phase(), GamePhase::Address);
    }

    #[test]
    fn full_shot_reaches_result() {
        let mut game = game();
        let events = play_full_shot(&mut game);
        assert_eq!(
            phases(&events),
            vec![
                GamePhase::Address,
                GamePhase::Swinging,
                GamePhase::BallFlying,
                GamePhase::Result
            ]
        );
        let finished = events.iter().find_map(|e| match e {
            GameEvent::ShotFinished { result, trace } => Some((*result, trace.clone())),
            _ => None,
        });
        let (result, trace) = finished.unwrap();
        assert!(result.distance > 0.0);
        assert_eq!(result.deviation, 0.0);
        assert_eq!(result.strokes, 1);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].magnitude, 20.0);
        assert_eq!(game.ball_position(), Vec3::new(0.0, 0.0, result.distance));
        assert!(events.iter().any(|e| matches!(e, GameEvent::CommentaryReady(_))));
        assert!(events.iter().any(|e| matches!(e, GameEvent::BallMoved(_))));
    }

    #[test]
    fn ball_never_below_ground() {
        let mut game = game();
        for event in play_full_shot(&mut game) {
            if let GameEvent::BallMoved(p) = event {
                assert!(p.y >= 0.0);
            }
        }
    }

    #[test]
    fn swing_without_trigger_is_practice() {
        let mut game = game();
        let events = game.on_frame(&frame(20.0, false), 0);
        assert!(events.contains(&GameEvent::SwingStarted { trigger_held: false }));
        assert_eq!(game.phase(), GamePhase::Idle);
        let events = game.tick(400);
        assert_eq!(events, vec![GameEvent::PracticeSwing { power_ratio: 1.0 }]);
        assert_eq!(game.phase(), GamePhase::Idle);
    }

    #[test]
    fn weak_swing_returns_to_address() {
        let mut config = GameConfig::default();
        // 4.5 / 50 is under the activation floor
        config.swing.max_power_reference = 50.0;
        let mut game = Game::with_noise(config, FixedNoise(0.0)).unwrap();
        game.begin();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(4.5, true), 10);
        assert_eq!(game.phase(), GamePhase::Swinging);
        let events = game.tick(410);
        assert!(matches!(events[0], GameEvent::PracticeSwing { .. }));
        assert_eq!(phases(&events), vec![GamePhase::Address]);
    }

    #[test]
    fn weak_swing_with_trigger_released_returns_to_idle() {
        let mut config = GameConfig::default();
        config.swing.max_power_reference = 50.0;

        // released on the frame that closes the window
        let mut game = Game::with_noise(config.clone(), FixedNoise(0.0)).unwrap();
        game.begin();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(4.5, true), 10);
        let events = game.on_frame(&frame(0.0, false), 410);
        assert!(matches!(events[0], GameEvent::PracticeSwing { .. }));
        assert_eq!(phases(&events), vec![GamePhase::Idle]);

        // released mid-window, window closed by tick
        let mut game = Game::with_noise(config, FixedNoise(0.0)).unwrap();
        game.begin();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(4.5, true), 10);
        game.on_frame(&frame(0.0, false), 200);
        assert_eq!(game.phase(), GamePhase::Swinging);
        let events = game.tick(410);
        assert_eq!(phases(&events), vec![GamePhase::Idle]);
    }

    #[test]
    fn frame_after_deadline_completes_swing() {
        let mut game = game();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(20.0, true), 10);
        let events = game.on_frame(&frame(0.0, true), 410);
        assert!(matches!(events[0], GameEvent::ShotStarted { .. }));
        assert_eq!(game.phase(), GamePhase::BallFlying);
    }

    #[test]
    fn frames_ignored_while_flying() {
        let mut game = game();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(20.0, true), 10);
        game.tick(410);
        assert_eq!(game.phase(), GamePhase::BallFlying);
        assert!(game.on_frame(&frame(30.0, false), 420).is_empty());
        assert_eq!(game.phase(), GamePhase::BallFlying);
    }

    #[test]
    fn club_locked_during_shot() {
        let mut game = game();
        game.select_club(6).unwrap();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(20.0, true), 10);
        assert_eq!(game.select_club(0).unwrap_err(), GameError::ClubLocked);
        game.tick(410);
        assert_eq!(game.select_club(0).unwrap_err(), GameError::ClubLocked);
        assert_eq!(game.club().name, "Sand Wedge");
    }

    #[test]
    fn unknown_club_rejected() {
        let mut game = game();
        assert_eq!(
            game.select_club(8).unwrap_err(),
            GameError::UnknownClub { index: 8, len: 8 }
        );
        assert_eq!(game.club_index(), 0);
    }

    #[test]
    fn reset_button_from_result_tees_up() {
        let mut game = game();
        play_full_shot(&mut game);
        assert_eq!(game.phase(), GamePhase::Result);
        assert_ne!(game.ball_position(), Vec3::ZERO);

        let events = game.on_frame(&frame(0.0, true), 100_000);
        assert_eq!(phases(&events), vec![GamePhase::Idle]);
        assert_eq!(game.ball_position(), Vec3::ZERO);
    }

    #[test]
    fn reset_button_among_others_tees_up() {
        let mut game = game();
        play_full_shot(&mut game);
        let f = MotionFrame {
            buttons: ButtonSet { b: true, x: true, plus: true, ..ButtonSet::default() },
            ..MotionFrame::default()
        };
        let events = game.on_frame(&f, 100_000);
        assert_eq!(phases(&events), vec![GamePhase::Idle]);
        assert_eq!(game.phase(), GamePhase::Idle);
        assert_eq!(game.ball_position(), Vec3::ZERO);
    }

    #[test]
    fn result_ignores_non_reset_buttons() {
        let mut game = game();
        play_full_shot(&mut game);
        let f = MotionFrame {
            buttons: ButtonSet { x: true, ..ButtonSet::default() },
            ..MotionFrame::default()
        };
        assert!(game.on_frame(&f, 100_000).is_empty());
        assert_eq!(game.phase(), GamePhase::Result);
    }

    #[test]
    fn next_shot_only_from_result() {
        let mut game = game();
        assert!(game.next_shot().is_empty());
        play_full_shot(&mut game);
        assert_eq!(phases(&game.next_shot()), vec![GamePhase::Idle]);
        assert_eq!(game.ball_position(), Vec3::ZERO);
        assert!(game.last_result().is_some());
    }

    #[test]
    fn commentary_from_provider() {
        let mut game = game();
        game.set_commentary_provider(StaticCommentary("Pure.".into()));
        let events = play_full_shot(&mut game);
        assert_eq!(events.last(), Some(&GameEvent::CommentaryReady("Pure.".into())));
    }

    #[test]
    fn putter_stays_on_fairway() {
        let mut game = game();
        game.select_club(7).unwrap();
        let events = play_full_shot(&mut game);
        let result = events.iter().find_map(|e| match e {
            GameEvent::ShotFinished { result, .. } => Some(*result),
            _ => None,
        });
        assert_eq!(result.unwrap().terrain, Terrain::Fairway);
    }

    #[test]
    fn disconnect_cancels_capture() {
        let mut game = game();
        game.on_frame(&frame(0.0, true), 0);
        game.on_frame(&frame(20.0, true), 10);
        assert_eq!(phases(&game.on_disconnect()), vec![GamePhase::Idle]);
        assert!(game.tick(1000).is_empty());
    }
}
