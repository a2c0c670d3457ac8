pub mod club;
pub mod codec;
pub mod commentary;
pub mod config;
pub mod conn;
pub mod device;
pub mod error;
pub mod game;
pub mod protocol;
pub mod seq;
pub mod session;
pub mod shot;
pub mod swing;
pub mod vector;

pub use club::Club;
pub use commentary::{CommentaryProvider, CommentaryReply};
pub use config::GameConfig;
pub use conn::{ConnError, Connection, HidTransport};
pub use device::{DeviceInfo, DeviceKind};
pub use error::ProtocolError;
pub use game::{Game, GameError, GameEvent, GamePhase};
pub use protocol::{ButtonSet, MotionFrame, Report, Subcommand};
pub use session::Session;
pub use shot::{ShotResult, Terrain};
pub use swing::{SwingDetector, SwingEvent};
pub use vector::{Vec2, Vec3};
