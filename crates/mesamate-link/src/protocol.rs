//! Line protocol spoken with the motion controller board.
//!
//! ## Wire format
//!
//! Every message is one ASCII line terminated by `\n`. There is no framing,
//! checksum or sequence number; a response is matched to a request purely by
//! position.
//!
//! ```text
//! controller → device   4right | PATH_START:1 | FOOD_RECEIVED:1 | BUZZER_ON | TEST_LEDS | test
//! device → controller   DIRECTION_DONE | <anything else, informational>
//! ```

use std::fmt;
use std::str::FromStr;

use mesamate_route::DirectionCommand;

/// Acknowledgment token sent once a direction command has been executed.
pub const DIRECTION_DONE: &str = "DIRECTION_DONE";

const PATH_START: &str = "PATH_START:";
const FOOD_RECEIVED: &str = "FOOD_RECEIVED:";
const BUZZER_ON: &str = "BUZZER_ON";
const TEST_LEDS: &str = "TEST_LEDS";
const PROBE: &str = "test";

/// A controller → device message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Drive `count` cells in a direction. The only command that is
    /// acknowledged.
    Move(DirectionCommand),
    /// Light the indicator for leg `n`.
    PathStart(u32),
    /// Clear the indicator for leg `n`.
    FoodReceived(u32),
    /// Sound the alert after a failed delivery.
    BuzzerOn,
    /// Cycle every indicator (diagnostic).
    TestLeds,
    /// Liveness probe.
    Probe,
}

impl Command {
    /// The newline-terminated wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        format!("{self}\n").into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move(cmd) => cmd.fmt(f),
            Command::PathStart(n) => write!(f, "{PATH_START}{n}"),
            Command::FoodReceived(n) => write!(f, "{FOOD_RECEIVED}{n}"),
            Command::BuzzerOn => f.write_str(BUZZER_ON),
            Command::TestLeds => f.write_str(TEST_LEDS),
            Command::Probe => f.write_str(PROBE),
        }
    }
}

/// Error returned when a line is not a known controller command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized command line `{0}`")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let unknown = || UnknownCommand(line.to_string());
        if let Some(n) = line.strip_prefix(PATH_START) {
            return n.parse().map(Command::PathStart).map_err(|_| unknown());
        }
        if let Some(n) = line.strip_prefix(FOOD_RECEIVED) {
            return n.parse().map(Command::FoodReceived).map_err(|_| unknown());
        }
        match line {
            BUZZER_ON => Ok(Command::BuzzerOn),
            TEST_LEDS => Ok(Command::TestLeds),
            PROBE => Ok(Command::Probe),
            _ => line.parse().map(Command::Move).map_err(|_| unknown()),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceMessage
// ---------------------------------------------------------------------------

/// A device → controller line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceMessage {
    /// The outstanding direction command finished.
    DirectionDone,
    /// Any other line: debug output, probe replies, noise.
    Other(String),
}

impl DeviceMessage {
    /// Classify one received line. Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == DIRECTION_DONE {
            DeviceMessage::DirectionDone
        } else {
            DeviceMessage::Other(line.to_string())
        }
    }
}
