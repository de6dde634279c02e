use std::{fmt, mem};

use thiserror::Error;

use crate::{Direction, Frame, Level, MoveError, Moves, State};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {step} ({dir}) failed")]
pub struct ReplayError {
    /// 1-based.
    pub step: usize,
    pub dir: Direction,
    #[source]
    pub source: MoveError,
}

/// Re-simulates `moves` from the initial state. Returns every state visited,
/// the initial one included.
pub fn replay(level: &Level, moves: &[Direction]) -> Result<Vec<State>, ReplayError> {
    let mut states = Vec::with_capacity(moves.len() + 1);
    let mut state = level.init_state().clone();
    for (&dir, step) in moves.iter().zip(1..) {
        let next = level
            .advance(&state, dir)
            .map_err(|source| ReplayError { step, dir, source })?;
        states.push(mem::replace(&mut state, next));
    }
    states.push(state);
    Ok(states)
}

/// A turn-by-turn rendering: each frame followed by the moves made so far.
#[derive(Debug, Clone)]
pub struct Replay<'a> {
    level: &'a Level,
    moves: &'a [Direction],
    states: Vec<State>,
}

impl<'a> Replay<'a> {
    pub fn new(level: &'a Level, moves: &'a [Direction]) -> Result<Self, ReplayError> {
        let states = replay(level, moves)?;
        Ok(Self {
            level,
            moves,
            states,
        })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn final_state(&self) -> &State {
        // `replay` always yields the initial state.
        &self.states[self.states.len() - 1]
    }
}

impl fmt::Display for Replay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.states.iter().enumerate() {
            write!(f, "{}", Frame::new(self.level, state))?;
            writeln!(f, "{}", Moves(&self.moves[..i]))?;
        }
        Ok(())
    }
}
