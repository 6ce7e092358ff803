//! Packed 64-bit board keys.
//!
//! Every cell takes `BITS_PER_CELL` bits, row-major, with cell `(0, 0)` in the
//! most significant used nibble. A 4×4 board fills the 64 bits exactly, so
//! boards up to 4×4 can be packed; larger boards have no codec.
//!
//! Two encodings share the layout:
//! - the *full* key keeps every tile value and is a bijection on boards of
//!   one size (used for cycle detection);
//! - the *abstract* key keeps the blank and the tiles of a [`Pattern`], and
//!   writes `DONT_CARE` everywhere else (used by pattern databases).
use crate::engine::{Board, BLANK, MIN_BOARD_SIZE};
use crate::error::PuzzleError;
use std::fmt;

/// Bits used by one cell.
pub const BITS_PER_CELL: u32 = 4;

/// Nibble written for tiles outside the pattern in abstract keys.
pub const DONT_CARE: u8 = 0xF;

/// Largest side length whose cells fit in a `u64`.
pub const MAX_PACKED_SIZE: usize = 4;

const MAX_CELLS: usize = MAX_PACKED_SIZE * MAX_PACKED_SIZE;
const CELL_MASK: u64 = (1 << BITS_PER_CELL) - 1;

/// A set of tile values, `1..=15`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    bits: u16,
}

impl Pattern {
    /// Builds a pattern from tile values.
    ///
    /// The blank and values that cannot be packed are rejected.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::codec::Pattern;
    /// let pattern = Pattern::new(&[1, 2, 5]).unwrap();
    /// assert!(pattern.contains(5));
    /// assert!(!pattern.contains(3));
    /// assert!(Pattern::new(&[0]).is_err());
    /// ```
    pub fn new(tiles: &[u8]) -> Result<Self, PuzzleError> {
        let mut bits = 0u16;
        for &tile in tiles {
            if tile == BLANK || tile as usize >= MAX_CELLS {
                return Err(PuzzleError::InvalidPatternTile {
                    tile,
                    size: MAX_PACKED_SIZE,
                });
            }
            bits |= 1 << tile;
        }
        Ok(Pattern { bits })
    }

    /// Whether `tile` belongs to the pattern. Always false for the blank.
    pub fn contains(&self, tile: u8) -> bool {
        (tile as usize) < MAX_CELLS && self.bits & (1 << tile) != 0
    }

    /// Tiles in ascending order.
    pub fn tiles(&self) -> impl Iterator<Item = u8> + '_ {
        (1..MAX_CELLS as u8).filter(move |&t| self.contains(t))
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Whether the two patterns share a tile.
    pub fn intersects(&self, other: &Pattern) -> bool {
        self.bits & other.bits != 0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiles: Vec<String> = self.tiles().map(|t| t.to_string()).collect();
        write!(f, "{{{}}}", tiles.join(", "))
    }
}

/// Encoder/decoder for packed keys of one board size.
///
/// Holds per-cell shift and mask tables so single cells can be read or
/// rewritten inside a key without materializing a grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedCodec {
    size: usize,
    shifts: [u32; MAX_CELLS],
    masks: [u64; MAX_CELLS],
}

impl PackedCodec {
    /// Creates the codec for `size`×`size` boards.
    ///
    /// # Returns
    /// * `Err(PuzzleError::UnpackableSize)` if the board does not fit 64 bits.
    pub fn new(size: usize) -> Result<Self, PuzzleError> {
        if !(MIN_BOARD_SIZE..=MAX_PACKED_SIZE).contains(&size) {
            return Err(PuzzleError::UnpackableSize(size));
        }
        let cells = size * size;
        let mut shifts = [0u32; MAX_CELLS];
        let mut masks = [0u64; MAX_CELLS];
        for index in 0..cells {
            let shift = (cells - 1 - index) as u32 * BITS_PER_CELL;
            shifts[index] = shift;
            masks[index] = CELL_MASK << shift;
        }
        Ok(PackedCodec {
            size,
            shifts,
            masks,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells covered by a key.
    pub fn cells(&self) -> usize {
        self.size * self.size
    }

    /// Packs every tile value of `board`.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::codec::PackedCodec;
    /// use npuzzle_solver::engine::Board;
    /// let codec = PackedCodec::new(2).unwrap();
    /// let board = Board::solved(2).unwrap();
    /// assert_eq!(codec.encode_full(&board), 0x1230);
    /// ```
    pub fn encode_full(&self, board: &Board) -> u64 {
        debug_assert_eq!(board.size(), self.size);
        board
            .cells()
            .iter()
            .fold(0u64, |key, &v| (key << BITS_PER_CELL) | u64::from(v))
    }

    /// Packs `board` keeping only the blank and the tiles in `pattern`.
    pub fn encode_abstract(&self, board: &Board, pattern: &Pattern) -> u64 {
        debug_assert_eq!(board.size(), self.size);
        board.cells().iter().fold(0u64, |key, &v| {
            let nibble = if v == BLANK {
                BLANK
            } else if pattern.contains(v) {
                v
            } else {
                DONT_CARE
            };
            (key << BITS_PER_CELL) | u64::from(nibble)
        })
    }

    /// Reads the value stored for cell `(row, col)`.
    pub fn decode_tile(&self, key: u64, row: usize, col: usize) -> u8 {
        self.decode_index(key, row * self.size + col)
    }

    pub(crate) fn decode_index(&self, key: u64, index: usize) -> u8 {
        ((key & self.masks[index]) >> self.shifts[index]) as u8
    }

    /// Exchanges the values of two cells inside `key`.
    ///
    /// Used to move the blank directly on a packed key.
    pub fn swap_tiles(&self, key: u64, r1: usize, c1: usize, r2: usize, c2: usize) -> u64 {
        let a = r1 * self.size + c1;
        let b = r2 * self.size + c2;
        let va = (key & self.masks[a]) >> self.shifts[a];
        let vb = (key & self.masks[b]) >> self.shifts[b];
        let cleared = key & !self.masks[a] & !self.masks[b];
        cleared | (va << self.shifts[b]) | (vb << self.shifts[a])
    }

    /// Locates the first cell holding `value`, scanning row-major.
    pub fn find_tile(&self, key: u64, value: u8) -> Option<(usize, usize)> {
        (0..self.cells())
            .find(|&i| self.decode_index(key, i) == value)
            .map(|i| (i / self.size, i % self.size))
    }

    /// Rebuilds the board packed by [`PackedCodec::encode_full`].
    ///
    /// Fails if `key` is not the full key of a valid board of this size.
    pub fn decode_full(&self, key: u64) -> Result<Board, PuzzleError> {
        let cells = (0..self.cells())
            .map(|i| self.decode_index(key, i))
            .collect();
        Board::new(self.size, cells)
    }
}
