//! Sliding-tile board model for the N-puzzle.
//!
//! This module defines the puzzle's fundamental components:
//! - `Direction`: the four ways the blank can move.
//! - `Board`: an immutable N×N grid of tiles with a cached blank position,
//!   including move application, parity (solvability) and random scrambling.
use crate::error::PuzzleError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value of the blank cell.
pub const BLANK: u8 = 0;

/// Smallest supported side length.
pub const MIN_BOARD_SIZE: usize = 2;

/// Largest supported side length. Tile values must fit in a `u8`.
pub const MAX_BOARD_SIZE: usize = 15;

/// A move of the blank cell.
///
/// `Up` moves the blank one row towards row 0, i.e. the tile above the blank
/// slides down into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All four directions in expansion order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row and column offsets of the blank for this move.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// The move that undoes this one.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Single-letter form used in compact move listings.
    ///
    /// # Examples
    ///
    /// ```
    /// use npuzzle_solver::engine::Direction;
    /// assert_eq!(Direction::Left.to_char(), 'L');
    /// assert_eq!(Direction::from_char('l'), Some(Direction::Left));
    /// ```
    pub fn to_char(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }

    /// Parses the letter produced by [`Direction::to_char`], case-insensitively.
    pub fn from_char(c: char) -> Option<Direction> {
        match c.to_ascii_uppercase() {
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        };
        write!(f, "{}", name)
    }
}

/// Moves `(row, col)` one step in `dir` on a `size`×`size` grid.
///
/// Returns `None` when the step would leave the grid.
pub fn step(size: usize, row: usize, col: usize, dir: Direction) -> Option<(usize, usize)> {
    let (dr, dc) = dir.delta();
    let nr = row.checked_add_signed(dr)?;
    let nc = col.checked_add_signed(dc)?;
    if nr < size && nc < size {
        Some((nr, nc))
    } else {
        None
    }
}

/// An immutable N×N sliding-tile board.
///
/// Cells are stored row-major. The values are always a permutation of
/// `0..N²` with `0` as the blank, whose position is cached. Two boards are
/// equal iff their grids are equal, so a `Board` can be used directly as a
/// hash-map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    cells: Vec<u8>,
    blank: usize,
}

impl Board {
    /// Creates a board from row-major cell values.
    ///
    /// # Arguments
    /// * `size`: The side length N, in `MIN_BOARD_SIZE..=MAX_BOARD_SIZE`.
    /// * `cells`: N² values forming a permutation of `0..N²`.
    ///
    /// # Returns
    /// * `Ok(Board)` on valid input.
    /// * `Err(PuzzleError)` if the size is unsupported, the cell count is wrong,
    ///   or the values are not a permutation.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::engine::Board;
    /// let board = Board::new(2, vec![1, 2, 3, 0]).unwrap();
    /// assert_eq!(board.blank(), (1, 1));
    /// assert!(Board::new(2, vec![1, 1, 3, 0]).is_err());
    /// ```
    pub fn new(size: usize, cells: Vec<u8>) -> Result<Self, PuzzleError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(PuzzleError::UnsupportedSize(size));
        }
        let expected = size * size;
        if cells.len() != expected {
            return Err(PuzzleError::CellCount {
                size,
                expected,
                found: cells.len(),
            });
        }

        let mut seen = vec![false; expected];
        for &value in &cells {
            let slot = seen.get_mut(value as usize).ok_or(PuzzleError::NotAPermutation {
                size,
                cells: expected,
            })?;
            if *slot {
                return Err(PuzzleError::NotAPermutation {
                    size,
                    cells: expected,
                });
            }
            *slot = true;
        }

        // Every value 0..N² was seen exactly once, so the blank exists.
        let blank = cells.iter().position(|&v| v == BLANK).unwrap_or_default();
        Ok(Board { size, cells, blank })
    }

    /// The canonical goal: tiles `1..N²` in row-major order, blank last.
    pub fn solved(size: usize) -> Result<Self, PuzzleError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(PuzzleError::UnsupportedSize(size));
        }
        let count = size * size;
        let mut cells: Vec<u8> = (1..count).map(|v| v as u8).collect();
        cells.push(BLANK);
        Ok(Board {
            size,
            cells,
            blank: count - 1,
        })
    }

    /// Side length N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Returns the tile at `(row, col)`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the board.
    pub fn tile(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.size + col]
    }

    /// Row and column of the blank.
    pub fn blank(&self) -> (usize, usize) {
        (self.blank / self.size, self.blank % self.size)
    }

    /// Whether the blank can move in `dir` without leaving the board.
    pub fn can_move(&self, dir: Direction) -> bool {
        let (row, col) = self.blank();
        step(self.size, row, col, dir).is_some()
    }

    /// Returns the board obtained by moving the blank in `dir`.
    ///
    /// The receiver is left untouched; `None` is returned when the move would
    /// leave the board.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::engine::{Board, Direction};
    /// let goal = Board::solved(3).unwrap();
    /// let moved = goal.apply(Direction::Left).unwrap();
    /// assert_eq!(moved.cells(), &[1, 2, 3, 4, 5, 6, 7, 0, 8]);
    /// assert!(goal.apply(Direction::Right).is_none());
    /// ```
    pub fn apply(&self, dir: Direction) -> Option<Board> {
        let (row, col) = self.blank();
        let (nr, nc) = step(self.size, row, col, dir)?;
        let target = nr * self.size + nc;
        let mut cells = self.cells.clone();
        cells.swap(self.blank, target);
        Some(Board {
            size: self.size,
            cells,
            blank: target,
        })
    }

    /// Number of pairs of non-blank tiles that appear in reverse order when
    /// the grid is read row-major.
    pub fn inversions(&self) -> usize {
        let tiles: Vec<u8> = self.cells.iter().copied().filter(|&v| v != BLANK).collect();
        tiles
            .iter()
            .enumerate()
            .map(|(i, &a)| tiles[i + 1..].iter().filter(|&&b| b < a).count())
            .sum()
    }

    /// The permutation-parity invariant preserved by every legal move.
    ///
    /// For odd N this is the inversion parity. For even N a vertical move also
    /// changes the blank's row, so the blank row counted from the bottom
    /// (1-based) is added before taking the parity.
    pub fn parity(&self) -> usize {
        let inversions = self.inversions();
        if self.size % 2 == 1 {
            inversions % 2
        } else {
            let blank_row_from_bottom = self.size - self.blank().0;
            (inversions + blank_row_from_bottom) % 2
        }
    }

    /// Whether `goal` is reachable from this board.
    ///
    /// Boards of different sizes are never mutually reachable.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::engine::Board;
    /// let goal = Board::solved(3).unwrap();
    /// let swapped = Board::new(3, vec![2, 1, 3, 4, 5, 6, 7, 8, 0]).unwrap();
    /// assert!(!swapped.is_solvable_towards(&goal));
    /// ```
    pub fn is_solvable_towards(&self, goal: &Board) -> bool {
        self.size == goal.size && self.parity() == goal.parity()
    }

    /// Generates a board by walking the blank `moves` random steps away from
    /// `goal`, never immediately undoing the previous step.
    ///
    /// The result is always solvable towards `goal`. Pass a seeded
    /// `SmallRng` for reproducible instances.
    pub fn scrambled(goal: &Board, moves: usize, rng: &mut impl Rng) -> Board {
        let mut board = goal.clone();
        let mut last: Option<Direction> = None;
        for _ in 0..moves {
            let options: Vec<Direction> = Direction::ALL
                .iter()
                .copied()
                .filter(|&d| board.can_move(d) && last.map_or(true, |l| d != l.opposite()))
                .collect();
            let Some(&dir) = options.choose(rng) else {
                break;
            };
            if let Some(next) = board.apply(dir) {
                board = next;
                last = Some(dir);
            }
        }
        board
    }
}

impl fmt::Display for Board {
    /// Renders the grid with right-aligned tiles and the blank as `.`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.size * self.size - 1).to_string().len();
        for (r, row) in self.cells.chunks(self.size).enumerate() {
            let line: Vec<String> = row
                .iter()
                .map(|&v| {
                    if v == BLANK {
                        format!("{:>width$}", ".")
                    } else {
                        format!("{:>width$}", v)
                    }
                })
                .collect();
            write!(f, "{}", line.join(" "))?;
            if r + 1 < self.size {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
