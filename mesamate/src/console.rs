//! Line-oriented operator console.
//!
//! Runs on its own thread, turning typed commands into [`Event`]s for the
//! execution controller. Routes are planned here so a slow A* search never
//! delays acknowledgment handling.

use std::io::{BufRead, Write};
use std::str::FromStr;

use crossbeam_channel::Sender;
use mesamate_link::{Context, Event};
use mesamate_route::{StationId, UnknownStationName};

use crate::operator::PendingConfirmation;
use crate::planner::Planner;

const HELP: &str = "\
commands:
  start <station>...   plan and drive home -> stations -> home (e.g. `start table1 table3`)
  yes | no             answer the delivery confirmation
  retry                re-send after a link error or timeout
  abort                abandon the current run
  leds                 cycle the indicator LEDs (idle only)
  stations             list configured stations
  quit                 shut down";

/// One parsed console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start(Vec<StationId>),
    Yes,
    No,
    Retry,
    Abort,
    TestLeds,
    Stations,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseConsoleError {
    #[error("unknown command `{0}`, type `help`")]
    Unknown(String),
    #[error("`start` needs at least one station")]
    MissingStations,
    #[error(transparent)]
    Station(#[from] UnknownStationName),
}

impl FromStr for ConsoleCommand {
    type Err = ParseConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let command = match verb.as_str() {
            "start" | "go" => {
                let stations = words
                    .map(str::parse::<StationId>)
                    .collect::<Result<Vec<StationId>, _>>()?;
                if stations.is_empty() {
                    return Err(ParseConsoleError::MissingStations);
                }
                return Ok(ConsoleCommand::Start(stations));
            }
            "yes" | "y" => ConsoleCommand::Yes,
            "no" | "n" => ConsoleCommand::No,
            "retry" => ConsoleCommand::Retry,
            "abort" | "stop" => ConsoleCommand::Abort,
            "leds" | "test" => ConsoleCommand::TestLeds,
            "stations" => ConsoleCommand::Stations,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            _ => return Err(ParseConsoleError::Unknown(s.trim().to_string())),
        };
        match words.next() {
            Some(_) => Err(ParseConsoleError::Unknown(s.trim().to_string())),
            None => Ok(command),
        }
    }
}

/// Reads operator commands and posts them to the controller.
pub struct Console<W: Write> {
    planner: Planner,
    pending: PendingConfirmation,
    events: Sender<Event>,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(planner: Planner, pending: PendingConfirmation, events: Sender<Event>, out: W) -> Self {
        Self {
            planner,
            pending,
            events,
            out,
        }
    }

    /// Process lines until `quit`, end of input, or cancellation. Always
    /// asks the controller to shut down on the way out.
    pub fn run<R: BufRead>(&mut self, input: R, ctx: &Context) {
        let _ = writeln!(self.out, "{HELP}");
        for line in input.lines() {
            if ctx.is_done() {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("console read failed: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ConsoleCommand>() {
                Ok(ConsoleCommand::Quit) => break,
                Ok(command) => {
                    if !self.execute(command) {
                        break;
                    }
                }
                Err(e) => self.say(&e.to_string()),
            }
        }
        let _ = self.events.send(Event::Shutdown);
    }

    /// Apply one command. Returns `false` once the controller is gone.
    fn execute(&mut self, command: ConsoleCommand) -> bool {
        let event = match command {
            ConsoleCommand::Start(stations) => match self.planner.plan(&stations) {
                Ok(route) => {
                    for leg in &route.skipped {
                        self.say(&format!("{} is unreachable and will be skipped", leg.description));
                    }
                    Event::Start(route)
                }
                Err(e) => {
                    self.say(&format!("cannot start: {e}"));
                    return true;
                }
            },
            ConsoleCommand::Yes => match self.pending.current() {
                Some(station) => Event::Confirmation {
                    station,
                    delivered: true,
                },
                None => {
                    self.say("no delivery is awaiting confirmation");
                    return true;
                }
            },
            ConsoleCommand::No => match self.pending.current() {
                Some(station) => Event::Confirmation {
                    station,
                    delivered: false,
                },
                None => {
                    self.say("no delivery is awaiting confirmation");
                    return true;
                }
            },
            ConsoleCommand::Retry => Event::Retry,
            ConsoleCommand::Abort => Event::Abort,
            ConsoleCommand::TestLeds => Event::TestLeds,
            ConsoleCommand::Stations => {
                let home = self.planner.home();
                let mut listing = format!("home: {home}");
                for (id, pos) in self.planner.stations().iter() {
                    listing.push_str(&format!("\n{id}: {pos}"));
                }
                self.say(&listing);
                return true;
            }
            ConsoleCommand::Help => {
                self.say(HELP);
                return true;
            }
            ConsoleCommand::Quit => return false,
        };
        if self.events.send(event).is_err() {
            log::warn!("controller has stopped");
            return false;
        }
        true
    }

    fn say(&mut self, message: &str) {
        if writeln!(self.out, "{message}").and_then(|_| self.out.flush()).is_err() {
            log::warn!("terminal output failed: {message}");
        }
    }
}
