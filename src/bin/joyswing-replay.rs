//! Replay recorded controller traffic through a game session.
//!
//! Usage: joyswing-replay [--device left|right|pro] [--club N] [--config FILE] [FILE]
//!
//! Input is one report per line: `<time_ms> <hex bytes>`. Hex may be spaced
//! or packed. Blank lines and lines starting with `#` are skipped. Reads
//! stdin when no file is given. The game ticks every 16 ms of report time.
//!
//! Set `RUST_LOG=joyswing=debug` to see handshake and phase logging.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::process;

use joyswing::device::{
    PRODUCT_JOYCON_LEFT, PRODUCT_JOYCON_RIGHT, PRODUCT_PRO_CONTROLLER, VENDOR_ID,
};
use joyswing::{DeviceInfo, GameConfig, GameEvent, GamePhase, HidTransport, Session};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const TICK_MS: u64 = 16;
/// Give up on a flight that has not settled after this long.
const MAX_SETTLE_MS: u64 = 120_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum ReplayError {
    Usage(String),
    Io(io::Error),
    Parse { line: usize, msg: String },
    Config(String),
    Connect,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Usage(msg) => write!(f, "{msg}"),
            ReplayError::Io(e) => write!(f, "I/O error: {e}"),
            ReplayError::Parse { line, msg } => write!(f, "line {line}: {msg}"),
            ReplayError::Config(msg) => write!(f, "config: {msg}"),
            ReplayError::Connect => write!(f, "device rejected"),
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        ReplayError::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Accepts every output report and logs it.
struct ReplayTransport {
    info: DeviceInfo,
}

impl HidTransport for ReplayTransport {
    fn device_info(&self) -> DeviceInfo {
        self.info
    }

    fn send_report(&mut self, report_id: u8, data: &[u8]) -> io::Result<()> {
        debug!("out 0x{report_id:02X}: {}", hex(data));
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".into());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).map_err(|_| format!("bad hex byte {byte:?}"))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Option<(u64, Vec<u8>)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (time, bytes) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let time = time.parse::<u64>().map_err(|_| format!("bad timestamp {time:?}"))?;
    Ok(Some((time, parse_hex(bytes)?)))
}

fn read_reports(input: impl BufRead) -> Result<Vec<(u64, Vec<u8>)>, ReplayError> {
    let mut reports = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(msg) => return Err(ReplayError::Parse { line: i + 1, msg }),
        }
    }
    Ok(reports)
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

struct Args {
    product_id: u16,
    club: Option<usize>,
    config: Option<String>,
    input: Option<String>,
}

fn parse_args() -> Result<Args, ReplayError> {
    let mut args = Args { product_id: PRODUCT_JOYCON_RIGHT, club: None, config: None, input: None };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next().ok_or_else(|| ReplayError::Usage(format!("{name} needs a value")))
        };
        match arg.as_str() {
            "--device" => {
                args.product_id = match value("--device")?.as_str() {
                    "left" => PRODUCT_JOYCON_LEFT,
                    "right" => PRODUCT_JOYCON_RIGHT,
                    "pro" => PRODUCT_PRO_CONTROLLER,
                    other => return Err(ReplayError::Usage(format!("unknown device {other:?}"))),
                }
            }
            "--club" => {
                let v = value("--club")?;
                let index = v.parse().map_err(|_| ReplayError::Usage(format!("bad club {v:?}")))?;
                args.club = Some(index);
            }
            "--config" => args.config = Some(value("--config")?),
            "-h" | "--help" => {
                return Err(ReplayError::Usage(
                    "usage: joyswing-replay [--device left|right|pro] [--club N] [--config FILE] [FILE]"
                        .into(),
                ));
            }
            _ if args.input.is_none() && !arg.starts_with("--") => args.input = Some(arg.clone()),
            _ => return Err(ReplayError::Usage(format!("unexpected argument {arg:?}"))),
        }
    }
    Ok(args)
}

#[cfg(feature = "json")]
fn load_config(path: Option<&str>) -> Result<GameConfig, ReplayError> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    GameConfig::from_json(&text).map_err(|e| ReplayError::Config(e.to_string()))
}

#[cfg(not(feature = "json"))]
fn load_config(path: Option<&str>) -> Result<GameConfig, ReplayError> {
    match path {
        Some(_) => Err(ReplayError::Config("--config requires the `json` feature".into())),
        None => Ok(GameConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[cfg(feature = "json")]
fn print_event(t_ms: u64, event: &GameEvent) {
    match serde_json::to_string(event) {
        Ok(json) => println!(r#"{{"t_ms":{t_ms},"event":{json}}}"#),
        Err(e) => eprintln!("{t_ms:>8} <unserializable event: {e}>"),
    }
}

#[cfg(not(feature = "json"))]
fn print_event(t_ms: u64, event: &GameEvent) {
    match event {
        // One line per tick is too noisy for a text log.
        GameEvent::BallMoved(_) | GameEvent::PowerUpdated(_) => {}
        GameEvent::ShotFinished { result, trace } => println!(
            "{t_ms:>8} shot: {:.1} m ({:+.1} m) {} [{} samples]",
            result.distance,
            result.deviation,
            result.terrain,
            trace.len(),
        ),
        other => println!("{t_ms:>8} {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        process::exit(match e {
            ReplayError::Usage(_) => 2,
            _ => 1,
        });
    }
}

fn run() -> Result<(), ReplayError> {
    let args = parse_args()?;
    let config = load_config(args.config.as_deref())?;
    let reports = match &args.input {
        Some(path) => read_reports(BufReader::new(std::fs::File::open(path)?))?,
        None => read_reports(io::stdin().lock())?,
    };

    let mut session =
        Session::new(config).map_err(|e| ReplayError::Config(e.to_string()))?;
    let start = reports.first().map_or(0, |(t, _)| *t);
    let info = DeviceInfo { vendor_id: VENDOR_ID, product_id: args.product_id };
    let transport = ReplayTransport { info };
    if !session.connect(transport, start) {
        return Err(ReplayError::Connect);
    }
    if let Some(index) = args.club {
        session.select_club(index).map_err(|e| ReplayError::Usage(e.to_string()))?;
    }

    let mut next_tick = start + TICK_MS;
    for (t, raw) in &reports {
        while next_tick <= *t {
            for event in session.tick(next_tick) {
                print_event(next_tick, &event);
            }
            next_tick += TICK_MS;
        }
        for event in session.handle_report(raw, *t) {
            print_event(*t, &event);
        }
    }

    // Let a pending capture expire and any flight come to rest.
    let deadline = next_tick + MAX_SETTLE_MS;
    while next_tick < deadline {
        if !settling(&session) {
            break;
        }
        for event in session.tick(next_tick) {
            print_event(next_tick, &event);
        }
        next_tick += TICK_MS;
    }

    if let Some(result) = session.game().last_result() {
        eprintln!(
            "last shot: {:.1} m, {:+.1} m lateral, {} ({} handshake retries)",
            result.distance,
            result.deviation,
            result.terrain,
            session.handshake_retries(),
        );
    }
    session.disconnect();
    Ok(())
}

fn settling(session: &Session<ReplayTransport>) -> bool {
    let game = session.game();
    game.phase() == GamePhase::BallFlying || game.is_capturing() || game.is_commentary_pending()
}
