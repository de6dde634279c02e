use std::cell::RefCell;
use std::ops::Index;

use arrayvec::ArrayVec;
use fxhash::FxHashMap;
use thiserror::Error;

mod fmt;
mod parse;
mod react;
pub mod replay;
pub mod solve;

pub use fmt::{Frame, Moves};
pub use parse::parse_moves;

/// Most tokens a single level may hold.
pub const MAX_TOKENS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MoveError {
    #[error("seeker at {from} cannot move {dir}")]
    Blocked { from: Pos, dir: Direction },
    #[error("token at {token} still fleeing from seeker at {seeker} after {limit} slides")]
    Diverged {
        seeker: Pos,
        token: Pos,
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub x: u8,
    pub y: u8,
}

impl Pos {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right = 0,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Right, Self::Down, Self::Left, Self::Up];

    pub fn reversed(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Up => Direction::Down,
        }
    }

    // Screen coordinates: y grows downward, so turning left from `Right` faces `Up`.
    pub fn turned_left(self) -> Self {
        Self::ALL[(self as usize + 3) % 4]
    }

    pub fn turned_right(self) -> Self {
        Self::ALL[(self as usize + 1) % 4]
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Open,
    Wall,
    /// The `o` marker. Open terrain for everything the solver does.
    Exit,
}

impl Cell {
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    width: u8,
    height: u8,
    cells: Box<[Cell]>,
}

impl Index<Pos> for Grid {
    type Output = Cell;
    fn index(&self, pos: Pos) -> &Self::Output {
        &self.cells[self.index_of(pos)]
    }
}

impl Grid {
    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn area(&self) -> usize {
        self.cells.len()
    }

    fn index_of(&self, pos: Pos) -> usize {
        pos.y as usize * self.width as usize + pos.x as usize
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Pos, Cell)> + '_ {
        let idx_iter = std::iter::successors(Some(Pos::new(0, 0)), |&Pos { x, y }| {
            Some(if x + 1 < self.width {
                Pos::new(x + 1, y)
            } else {
                Pos::new(0, y + 1)
            })
        });
        idx_iter.zip(self.cells.iter().copied())
    }

    pub fn step(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        const DIRECTIONS: [(i8, i8); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        let x = pos.x.checked_add_signed(DIRECTIONS[dir as usize].0)?;
        let y = pos.y.checked_add_signed(DIRECTIONS[dir as usize].1)?;
        if self.width <= x || self.height <= y {
            return None;
        }
        Some(Pos::new(x, y))
    }

    /// Like `step`, but only onto open cells.
    pub fn open_step(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        self.step(pos, dir).filter(|&next| self[next].is_open())
    }
}

/// A seeker position and the ordered token positions. Order is token identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    pub seeker: Pos,
    pub tokens: ArrayVec<Pos, MAX_TOKENS>,
}

impl State {
    pub fn is_goal(&self) -> bool {
        self.tokens.iter().all(|&token| token == self.seeker)
    }

    pub fn key(&self) -> StateKey {
        let mut fields = [StateKey::ABSENT; MAX_TOKENS + 1];
        fields[0] = StateKey::pack(self.seeker);
        for (field, &token) in fields[1..].iter_mut().zip(&self.tokens) {
            *field = StateKey::pack(token);
        }
        let packed = fields
            .iter()
            .rev()
            .fold(0u128, |acc, &field| (acc << StateKey::FIELD_BITS) | u128::from(field));
        StateKey(packed)
    }
}

/// Canonical encoding of a `State`.
///
/// One 16-bit field per position, seeker in the lowest field, followed by the
/// tokens in order and `ABSENT` padding. A position packs to `x << 8 | y`, and
/// grids are at most 255 cells wide, so no position packs to `ABSENT`. Every
/// field is therefore decodable on its own and two keys are equal iff their
/// states are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey(u128);

const _: () = assert!((MAX_TOKENS + 1) * StateKey::FIELD_BITS as usize <= u128::BITS as usize);

impl StateKey {
    const FIELD_BITS: u32 = u16::BITS;
    const ABSENT: u16 = u16::MAX;

    fn pack(pos: Pos) -> u16 {
        (u16::from(pos.x) << 8) | u16::from(pos.y)
    }

    fn unpack(field: u16) -> Pos {
        Pos::new((field >> 8) as u8, field as u8)
    }

    fn field(self, i: usize) -> u16 {
        (self.0 >> (i as u32 * Self::FIELD_BITS)) as u16
    }

    pub fn state(self) -> State {
        let tokens = (1..=MAX_TOKENS)
            .map(|i| self.field(i))
            .take_while(|&field| field != Self::ABSENT)
            .map(Self::unpack)
            .collect();
        State {
            seeker: Self::unpack(self.field(0)),
            tokens,
        }
    }
}

/// A static maze with its initial state, structural annotations and the
/// memo of token reactions.
#[derive(Debug, Clone)]
pub struct Level {
    grid: Grid,
    init: State,
    degree: Box<[u8]>,
    dead_end: Box<[bool]>,
    flee_limit: usize,
    memo: RefCell<FxHashMap<(Pos, Pos), Pos>>,
}

impl Level {
    pub(crate) fn new(grid: Grid, init: State) -> Self {
        let degree = compute_degrees(&grid);
        let dead_end = compute_dead_ends(&grid, &degree);
        let flee_limit = grid.area();
        tracing::debug!(
            width = grid.width,
            height = grid.height,
            tokens = init.tokens.len(),
            dead_ends = dead_end.iter().filter(|&&dead| dead).count(),
            "level loaded"
        );
        Self {
            grid,
            init,
            degree,
            dead_end,
            flee_limit,
            memo: RefCell::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_flee_limit(mut self, limit: usize) -> Self {
        self.flee_limit = limit;
        self.memo.get_mut().clear();
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn init_state(&self) -> &State {
        &self.init
    }

    /// Number of open orthogonal neighbors, `None` for walls.
    pub fn degree(&self, pos: Pos) -> Option<u8> {
        self.grid[pos]
            .is_open()
            .then(|| self.degree[self.grid.index_of(pos)])
    }

    pub fn is_dead_end(&self, pos: Pos) -> bool {
        self.dead_end[self.grid.index_of(pos)]
    }

    /// Number of reactions memoized so far.
    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }

    /// Moves the seeker one cell and lets every token react.
    pub fn advance(&self, state: &State, dir: Direction) -> Result<State, MoveError> {
        let seeker = self
            .grid
            .open_step(state.seeker, dir)
            .ok_or(MoveError::Blocked {
                from: state.seeker,
                dir,
            })?;
        let tokens = state
            .tokens
            .iter()
            .map(|&token| self.react(seeker, token))
            .collect::<Result<_, _>>()?;
        Ok(State { seeker, tokens })
    }
}

fn compute_degrees(grid: &Grid) -> Box<[u8]> {
    grid.cells()
        .map(|(pos, cell)| {
            if !cell.is_open() {
                return 0;
            }
            Direction::ALL
                .into_iter()
                .filter(|&dir| grid.open_step(pos, dir).is_some())
                .count() as u8
        })
        .collect()
}

// Walks straight out of every degree-1 cell while the next cell is a plain corridor.
fn compute_dead_ends(grid: &Grid, degree: &[u8]) -> Box<[bool]> {
    let mut dead_end = vec![false; grid.area()];
    for (pos, _) in grid.cells() {
        if degree[grid.index_of(pos)] != 1 {
            continue;
        }
        let Some(dir) = Direction::ALL
            .into_iter()
            .find(|&dir| grid.open_step(pos, dir).is_some())
        else {
            continue;
        };
        let mut cur = pos;
        loop {
            dead_end[grid.index_of(cur)] = true;
            match grid.open_step(cur, dir) {
                Some(next) if degree[grid.index_of(next)] == 2 => cur = next,
                _ => break,
            }
        }
    }
    dead_end.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(seeker: (u8, u8), tokens: &[(u8, u8)]) -> State {
        State {
            seeker: Pos::new(seeker.0, seeker.1),
            tokens: tokens.iter().map(|&(x, y)| Pos::new(x, y)).collect(),
        }
    }

    #[test]
    fn turns_follow_screen_coordinates() {
        assert_eq!(Direction::Right.turned_left(), Direction::Up);
        assert_eq!(Direction::Right.turned_right(), Direction::Down);
        assert_eq!(Direction::Left.turned_left(), Direction::Down);
        assert_eq!(Direction::Up.turned_right(), Direction::Right);
        for dir in Direction::ALL {
            assert_eq!(dir.turned_left().turned_right(), dir);
            assert_eq!(dir.turned_left().turned_left(), dir.reversed());
        }
    }

    #[test]
    fn key_distinguishes_token_order_and_count() {
        let keys = [
            state((1, 1), &[(2, 1)]),
            state((1, 1), &[(2, 1), (3, 1)]),
            state((1, 1), &[(3, 1), (2, 1)]),
            state((2, 1), &[(1, 1)]),
            state((0, 0), &[(0, 0)]),
            state((254, 254), &[(254, 254), (254, 254), (254, 254), (254, 254)]),
        ]
        .map(|s| s.key());
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn key_decodes_back() {
        let s = state((7, 3), &[(1, 2), (254, 0), (0, 254)]);
        assert_eq!(s.key().state(), s);
    }

    #[test]
    fn goal_requires_every_token() {
        assert!(state((2, 2), &[(2, 2), (2, 2)]).is_goal());
        assert!(!state((2, 2), &[(2, 2), (3, 2)]).is_goal());
    }

    #[test]
    fn annotations() {
        let level = "\
#######
## ####
#p  b #
## ## #
#######"
            .parse::<Level>()
            .unwrap();
        let degree = |x, y| level.degree(Pos::new(x, y));
        assert_eq!(degree(0, 0), None);
        assert_eq!(degree(1, 2), Some(1));
        assert_eq!(degree(2, 2), Some(4));
        assert_eq!(degree(5, 2), Some(2));
        assert_eq!(degree(5, 3), Some(1));

        let dead = level
            .grid()
            .cells()
            .map(|(pos, _)| pos)
            .filter(|&pos| level.is_dead_end(pos))
            .collect::<Vec<_>>();
        // Three stubs around the crossing, plus the bend at (5, 2) walked from (5, 3).
        assert_eq!(
            dead,
            [(2, 1), (1, 2), (5, 2), (2, 3), (5, 3)].map(|(x, y)| Pos::new(x, y))
        );
    }
}
