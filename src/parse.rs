use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Context, Result};
use arrayvec::ArrayVec;

use crate::{Cell, Direction, Grid, Level, Pos, State, MAX_TOKENS};

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines = s.lines().collect::<Vec<_>>();
        let first = lines
            .iter()
            .position(|line| !line.is_empty())
            .context("Empty level")?;
        let last = lines
            .iter()
            .rposition(|line| !line.is_empty())
            .unwrap_or(first);
        let rows = &lines[first..=last];

        let width = rows[0].chars().count();
        let height = rows.len();
        ensure!(
            width <= u8::MAX as usize && height <= u8::MAX as usize,
            "Level too large: {width}x{height}, at most {max}x{max}",
            max = u8::MAX,
        );

        let mut grid = Vec::with_capacity(width * height);
        let mut seeker = None;
        let mut tokens = ArrayVec::<Pos, MAX_TOKENS>::new();
        for (y, row) in rows.iter().enumerate() {
            ensure!(
                row.chars().count() == width,
                "Width mismatch at line {}, expecting width {width}",
                y + 1,
            );
            for (x, ch) in row.chars().enumerate() {
                let pos = Pos::new(x as u8, y as u8);
                let on_border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                let cell = match ch {
                    '#' => Cell::Wall,
                    ' ' | '.' => Cell::Open,
                    'o' => Cell::Exit,
                    'p' => {
                        ensure!(!on_border, "Seeker on the border at {pos}");
                        ensure!(seeker.is_none(), "Multiple seekers");
                        seeker = Some(pos);
                        Cell::Open
                    }
                    'b' => {
                        ensure!(!on_border, "Token on the border at {pos}");
                        tokens
                            .try_push(pos)
                            .map_err(|_| anyhow!("More than {MAX_TOKENS} tokens"))?;
                        Cell::Open
                    }
                    _ => bail!("Invalid cell {ch:?} at {pos}"),
                };
                grid.push(cell);
            }
        }

        let seeker = seeker.context("Missing seeker")?;
        ensure!(!tokens.is_empty(), "Missing token");

        let grid = Grid {
            width: width as u8,
            height: height as u8,
            cells: grid.into(),
        };
        Ok(Level::new(grid, State { seeker, tokens }))
    }
}

impl TryFrom<char> for Direction {
    type Error = anyhow::Error;

    fn try_from(ch: char) -> Result<Self> {
        Ok(match ch {
            'R' => Direction::Right,
            'D' => Direction::Down,
            'L' => Direction::Left,
            'U' => Direction::Up,
            _ => bail!("Invalid move: {ch:?}"),
        })
    }
}

/// Parses move letters such as `RRDLU`. Whitespace is ignored.
pub fn parse_moves(s: &str) -> Result<Vec<Direction>> {
    s.chars()
        .filter(|ch| !ch.is_whitespace())
        .map(Direction::try_from)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{parse_moves, Cell, Direction, Level, Pos};

    fn parse_err(map: &str) -> String {
        map.parse::<Level>().unwrap_err().to_string()
    }

    #[test]
    fn markers_become_open_cells() {
        let level = "\
#####
#pbo#
#####"
            .parse::<Level>()
            .unwrap();
        let grid = level.grid();
        assert_eq!((grid.width(), grid.height()), (5, 3));
        assert_eq!(grid[Pos::new(1, 1)], Cell::Open);
        assert_eq!(grid[Pos::new(2, 1)], Cell::Open);
        assert_eq!(grid[Pos::new(3, 1)], Cell::Exit);
        assert_eq!(level.init_state().seeker, Pos::new(1, 1));
        assert_eq!(level.init_state().tokens.as_slice(), [Pos::new(2, 1)]);
    }

    #[test]
    fn tokens_in_row_major_order() {
        let level = "\
#####
# b #
#b p#
#####"
            .parse::<Level>()
            .unwrap();
        assert_eq!(
            level.init_state().tokens.as_slice(),
            [Pos::new(2, 1), Pos::new(1, 2)]
        );
    }

    #[test]
    fn display_round_trips() {
        let map = "\
#######
#p . o#
#  b  #
#######
";
        let level = map.parse::<Level>().unwrap();
        let shown = level.to_string();
        assert_eq!(shown, map.replace('.', " "));
        assert_eq!(shown.parse::<Level>().unwrap().to_string(), shown);
    }

    #[test]
    fn blank_edges_and_crlf() {
        let level = "\n\n#####\r\n#p b#\r\n#####\r\n\n"
            .parse::<Level>()
            .unwrap();
        assert_eq!(level.grid().height(), 3);
    }

    #[test]
    fn rejects_broken_levels() {
        assert_eq!(parse_err(""), "Empty level");
        assert_eq!(parse_err("#####\n#  b#\n#####"), "Missing seeker");
        assert_eq!(parse_err("#####\n#p  #\n#####"), "Missing token");
        assert_eq!(parse_err("#####\n#pp #\n#####"), "Multiple seekers");
        assert_eq!(
            parse_err("########\n#pbbbbb#\n########"),
            "More than 4 tokens"
        );
        assert_eq!(
            parse_err("#####\n#p b#\n####"),
            "Width mismatch at line 3, expecting width 5"
        );
        assert_eq!(parse_err("#####\n#p?b#\n#####"), "Invalid cell '?' at (2, 1)");
        assert_eq!(parse_err("##b##\n#p  #\n#####"), "Token on the border at (2, 0)");
    }

    #[test]
    fn moves() {
        assert_eq!(
            parse_moves("RD LU\n").unwrap(),
            [
                Direction::Right,
                Direction::Down,
                Direction::Left,
                Direction::Up
            ]
        );
        assert!(parse_moves("RX").is_err());
    }
}
