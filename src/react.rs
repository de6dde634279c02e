use crate::{Direction, Level, MoveError, Pos};

impl Level {
    /// Where a token at `token` ends up once the seeker has stepped onto `seeker`.
    pub fn react(&self, seeker: Pos, token: Pos) -> Result<Pos, MoveError> {
        let cached = self.memo.borrow().get(&(seeker, token)).copied();
        if let Some(pos) = cached {
            return Ok(pos);
        }

        let pos = self.flee(seeker, token, self.flee_limit())?;
        tracing::trace!(%seeker, from = %token, to = %pos, "token reaction");
        self.memo.borrow_mut().insert((seeker, token), pos);
        Ok(pos)
    }

    /// Cap on slides within a single reaction.
    pub(crate) fn flee_limit(&self) -> usize {
        self.flee_limit
    }

    fn flee(&self, seeker: Pos, start: Pos, limit: usize) -> Result<Pos, MoveError> {
        let mut token = start;
        let mut slides = 0;
        loop {
            let Some(away) = self.threat(seeker, token) else { break };
            // Cornered.
            let Some(dir) = self.escape_direction(token, away) else { break };
            if slides == limit {
                return Err(MoveError::Diverged {
                    seeker,
                    token: start,
                    limit,
                });
            }
            token = self.slide(token, dir);
            slides += 1;
        }
        Ok(token)
    }

    /// The direction pointing away from the seeker, if the seeker threatens the token.
    fn threat(&self, seeker: Pos, token: Pos) -> Option<Direction> {
        let dx = i16::from(seeker.x) - i16::from(token.x);
        let dy = i16::from(seeker.y) - i16::from(token.y);
        let (away, distance) = match (dx, dy) {
            (1 | 2, 0) => (Direction::Left, dx),
            (-2 | -1, 0) => (Direction::Right, -dx),
            (0, 1 | 2) => (Direction::Up, dy),
            (0, -2 | -1) => (Direction::Down, -dy),
            _ => return None,
        };
        // No threat across a wall.
        if distance == 2 && self.grid.open_step(token, away.reversed()).is_none() {
            return None;
        }
        Some(away)
    }

    // Straight, then left, then right. Never back towards the seeker. Dead ends
    // only when nothing else is open.
    fn escape_direction(&self, token: Pos, away: Direction) -> Option<Direction> {
        let candidates = [away, away.turned_left(), away.turned_right()];
        let open = |dir| self.grid.open_step(token, dir);
        candidates
            .into_iter()
            .find(|&dir| open(dir).is_some_and(|next| !self.is_dead_end(next)))
            .or_else(|| candidates.into_iter().find(|&dir| open(dir).is_some()))
    }

    // Keeps going through corridor cells, stopping on junctions or before walls.
    fn slide(&self, mut token: Pos, dir: Direction) -> Pos {
        while let Some(next) = self.grid.open_step(token, dir) {
            token = next;
            if !matches!(self.degree[self.grid.index_of(next)], 1 | 2) {
                break;
            }
        }
        token
    }
}
