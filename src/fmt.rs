use std::fmt;

use crate::{Cell, Direction, Level, Pos, State};

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Frame::new(self, &self.init))
    }
}

/// A state drawn onto its level, one text row per grid row.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    level: &'a Level,
    state: &'a State,
}

impl<'a> Frame<'a> {
    pub fn new(level: &'a Level, state: &'a State) -> Self {
        Self { level, state }
    }
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.level.grid();
        for (pos, cell) in grid.cells() {
            // Tokens are drawn over the seeker.
            if self.state.tokens.contains(&pos) {
                f.write_str("b")?;
            } else if pos == self.state.seeker {
                f.write_str("p")?;
            } else {
                write!(f, "{cell}")?;
            }
            if pos.x + 1 == grid.width() {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

/// Move letters, e.g. `RRDLU`.
#[derive(Debug, Clone, Copy)]
pub struct Moves<'a>(pub &'a [Direction]);

impl fmt::Display for Moves<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|dir| write!(f, "{dir}"))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Open => f.write_str(" "),
            Cell::Wall => f.write_str("#"),
            Cell::Exit => f.write_str("o"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Right => f.write_str("R"),
            Direction::Down => f.write_str("D"),
            Direction::Left => f.write_str("L"),
            Direction::Up => f.write_str("U"),
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
