//! Connection, handshake, fallback and game wired together.
//!
//! The host owns the device callbacks and the frame clock:
//!
//! ```ignore
//! let mut session = Session::new(GameConfig::default())?;
//! if !session.connect(transport, now_ms()) {
//!     return; // still pre-game
//! }
//! // on every input report pushed by the device:
//! session.handle_report(&raw, now_ms());
//! // every ~16 ms:
//! session.tick(now_ms());
//! ```

use tracing::{debug, info, warn};

use crate::config::{ConfigError, GameConfig};
use crate::conn::{ConnError, Connection, HidTransport};
use crate::game::{Game, GameError, GameEvent};
use crate::protocol::{MotionFrame, Report};
use crate::seq::{self, FallbackGate};

pub struct Session<T: HidTransport> {
    conn: Option<Connection<T>>,
    game: Game,
    gate: FallbackGate,
    last_frame: Option<MotionFrame>,
    on_event: Option<Box<dyn FnMut(&GameEvent)>>,
}

impl<T: HidTransport> Session<T> {
    /// Fails if `config` does not validate.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_game(Game::new(config)?))
    }

    /// Wrap an already-built game (custom noise, commentary provider).
    pub fn with_game(game: Game) -> Self {
        let gate = FallbackGate::new(game.config().handshake_retry_ms);
        Self { conn: None, game, gate, last_frame: None, on_event: None }
    }

    /// Register the event subscriber (replaces any previous one).
    pub fn set_on_event(&mut self, f: impl FnMut(&GameEvent) + 'static) {
        self.on_event = Some(Box::new(f));
    }

    /// Open `transport`, send the initialization handshake, and start the
    /// game. Returns false if the device is not supported.
    pub fn connect(&mut self, transport: T, now_ms: u64) -> bool {
        if self.conn.is_some() {
            self.disconnect();
        }
        let mut conn = match Connection::open(transport) {
            Ok(conn) => conn,
            Err(e) => {
                warn!("connect failed: {e}");
                return false;
            }
        };
        let report = seq::initialize(&mut conn);
        if !report.is_complete() {
            info!("{} handshake step(s) failed; will retry on minimal reports", report.failed.len());
        }
        self.gate.mark_requested(now_ms);
        self.conn = Some(conn);
        let events = self.game.begin();
        self.emit(events);
        true
    }

    /// Close the device and drop any pending swing capture.
    pub fn disconnect(&mut self) -> Vec<GameEvent> {
        let Some(mut conn) = self.conn.take() else {
            return Vec::new();
        };
        conn.disconnect();
        self.gate.reset();
        self.last_frame = None;
        let events = self.game.on_disconnect();
        self.emit(events)
    }

    /// Handle one input report pushed by the device.
    ///
    /// Malformed and unknown reports produce no frame. Minimal reports after
    /// the handshake trigger a throttled re-handshake.
    pub fn handle_report(&mut self, raw: &[u8], now_ms: u64) -> Vec<GameEvent> {
        let Some(conn) = self.conn.as_mut() else {
            return Vec::new();
        };
        let report = match conn.receive(raw) {
            Ok(report) => report,
            Err(ConnError::Protocol(e)) => {
                debug!("dropping report: {e}");
                return Vec::new();
            }
            Err(e) => {
                warn!("receive failed: {e}");
                return Vec::new();
            }
        };

        if report.is_minimal() && self.gate.on_minimal_report(now_ms) {
            seq::initialize(conn);
        }

        let frame = match report {
            Report::Full(frame) | Report::Minimal(frame) => frame,
            Report::Ignored { tag } => {
                debug!("ignoring report 0x{tag:02X}");
                return Vec::new();
            }
        };
        self.last_frame = Some(frame);
        let events = self.game.on_frame(&frame, now_ms);
        self.emit(events)
    }

    /// Advance timers and physics.
    pub fn tick(&mut self, now_ms: u64) -> Vec<GameEvent> {
        let events = self.game.tick(now_ms);
        self.emit(events)
    }

    pub fn select_club(&mut self, index: usize) -> Result<(), GameError> {
        self.game.select_club(index).map(|_| ())
    }

    pub fn next_shot(&mut self) -> Vec<GameEvent> {
        let events = self.game.next_shot();
        self.emit(events)
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        let events = self.game.reset();
        self.emit(events)
    }

    pub fn is_connected(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.is_connected())
    }

    pub fn connection(&self) -> Option<&Connection<T>> {
        self.conn.as_ref()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Most recent decoded frame, for diagnostics.
    pub fn last_frame(&self) -> Option<&MotionFrame> {
        self.last_frame.as_ref()
    }

    /// Handshakes re-sent because of minimal reports since connect.
    pub fn handshake_retries(&self) -> u32 {
        self.gate.retries()
    }

    fn emit(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        if let Some(cb) = self.on_event.as_mut() {
            for event in &events {
                cb(event);
            }
        }
        events
    }
}
