//! Run-length direction commands.
//!
//! A [`DirectionCommand`] means "move `count` unit cells toward
//! `direction`". [`compile`] turns a planner path into the shortest list of
//! such commands and [`expand`] walks them back into cells.
//!
//! ## Wire format
//!
//! ```text
//! <count><direction>      e.g. 4right, 1up, 12down
//! ```

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use mesamate_core::Pos;
use mesamate_paths::CellPath;

/// Cardinal move direction in grid space. Up decreases the row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Direction of a single 4-adjacent step, or `None` for any other delta.
    pub fn of_step(from: Pos, to: Pos) -> Option<Self> {
        let d = to - from;
        match (d.row, d.col) {
            (-1, 0) => Some(Direction::Up),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (0, 1) => Some(Direction::Right),
            _ => None,
        }
    }

    /// Unit offset as a `Pos` delta.
    pub const fn delta(self) -> Pos {
        match self {
            Direction::Up => Pos::new(-1, 0),
            Direction::Down => Pos::new(1, 0),
            Direction::Left => Pos::new(0, -1),
            Direction::Right => Pos::new(0, 1),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DirectionCommand
// ---------------------------------------------------------------------------

/// `count` consecutive unit moves toward `direction`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionCommand {
    pub count: NonZeroU32,
    pub direction: Direction,
}

impl DirectionCommand {
    /// Create a command. Returns `None` for a zero count.
    pub fn new(count: u32, direction: Direction) -> Option<Self> {
        NonZeroU32::new(count).map(|count| Self { count, direction })
    }

    /// Number of unit moves.
    #[inline]
    pub fn count(self) -> u32 {
        self.count.get()
    }
}

impl fmt::Display for DirectionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.direction)
    }
}

/// Error returned when a direction command line cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed direction command `{0}`")]
pub struct ParseCommandError(pub String);

impl FromStr for DirectionCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ParseCommandError(s.to_string()))?;
        let (digits, word) = s.split_at(split);
        let count: u32 = digits.parse().map_err(|_| ParseCommandError(s.to_string()))?;
        let direction = Direction::ALL
            .into_iter()
            .find(|d| d.as_str() == word)
            .ok_or_else(|| ParseCommandError(s.to_string()))?;
        DirectionCommand::new(count, direction).ok_or_else(|| ParseCommandError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// compile / expand
// ---------------------------------------------------------------------------

/// A path contained a step that is not a single cardinal move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cells {from} and {to} (step {index}) are not 4-adjacent")]
pub struct CompileError {
    pub index: usize,
    pub from: Pos,
    pub to: Pos,
}

/// Run-length encode a path into direction commands.
///
/// Paths with fewer than two cells compile to an empty list.
pub fn compile(path: &CellPath) -> Result<Vec<DirectionCommand>, CompileError> {
    let mut commands: Vec<DirectionCommand> = Vec::new();
    let mut run: Option<(Direction, u32)> = None;

    for (index, w) in path.cells().windows(2).enumerate() {
        let dir = Direction::of_step(w[0], w[1]).ok_or(CompileError {
            index,
            from: w[0],
            to: w[1],
        })?;
        run = match run {
            Some((d, n)) if d == dir => Some((d, n + 1)),
            Some((d, n)) => {
                commands.extend(DirectionCommand::new(n, d));
                Some((dir, 1))
            }
            None => Some((dir, 1)),
        };
    }
    if let Some((d, n)) = run {
        commands.extend(DirectionCommand::new(n, d));
    }
    Ok(commands)
}

/// Walk `commands` from `start`, returning every visited cell including
/// `start` itself.
pub fn expand(start: Pos, commands: &[DirectionCommand]) -> Vec<Pos> {
    let total: usize = commands.iter().map(|c| c.count() as usize).sum();
    let mut cells = Vec::with_capacity(total + 1);
    let mut p = start;
    cells.push(p);
    for cmd in commands {
        for _ in 0..cmd.count() {
            p = p + cmd.direction.delta();
            cells.push(p);
        }
    }
    cells
}
