use crate::{Direction, Level, MoveError, State, StateKey};

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;

/// Parent index of the initial state.
const ROOT: usize = !0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The goal state reached.
    pub state: State,
    /// Seeker moves from the initial state, shortest possible.
    pub moves: Vec<Direction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Solved(Solution),
    /// Every reachable state was explored without catching all tokens.
    Unsolvable { explored: usize },
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Solved(solution) => Some(solution),
            Outcome::Unsolvable { .. } => None,
        }
    }
}

/// Breadth-first search from the level's initial state. `on_step` runs once
/// per expanded state.
pub fn bfs(level: &Level, mut on_step: impl FnMut()) -> Result<Outcome, MoveError> {
    // Visited states in discovery order, which is also the queue order.
    let mut state_parent = IndexMap::default();
    state_parent.insert(level.init_state().key(), (ROOT, Direction::Right)); // Sentinel.

    let mut cursor = 0;
    while let Some((&key, _)) = state_parent.get_index(cursor) {
        #[cfg(feature = "coz")]
        coz::scope!("Expand");

        on_step();

        let state = key.state();
        if state.is_goal() {
            let moves = backtrack(&state_parent, cursor);
            tracing::debug!(
                explored = state_parent.len(),
                moves = moves.len(),
                memo = level.memo_len(),
                "solved"
            );
            return Ok(Outcome::Solved(Solution { state, moves }));
        }

        for dir in Direction::ALL {
            let next = match level.advance(&state, dir) {
                Ok(next) => next,
                Err(MoveError::Blocked { .. }) => continue,
                Err(err) => return Err(err),
            };
            state_parent.entry(next.key()).or_insert((cursor, dir));
        }
        cursor += 1;
    }

    tracing::debug!(
        explored = state_parent.len(),
        memo = level.memo_len(),
        "no solution"
    );
    Ok(Outcome::Unsolvable {
        explored: state_parent.len(),
    })
}

fn backtrack(
    state_parent: &IndexMap<StateKey, (usize, Direction)>,
    cursor: usize,
) -> Vec<Direction> {
    let mut steps = std::iter::successors(Some(state_parent[cursor]), |&(parent, _)| {
        (parent != ROOT).then(|| state_parent[parent])
    })
    .take_while(|&(parent, _)| parent != ROOT)
    .map(|(_, dir)| dir)
    .collect::<Vec<_>>();
    steps.reverse();
    steps
}
