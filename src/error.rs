//! Error type shared by the board model, the codec, pattern databases,
//! parsing and configuration loading.

use thiserror::Error;

/// Everything that can go wrong while building puzzles or search inputs.
///
/// Search itself never fails with an error: running out of states is a normal
/// outcome reported through [`crate::solver::SearchOutcome`].
#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("board side length {0} is not supported (expected 2..=15)")]
    UnsupportedSize(usize),
    #[error("a {size}x{size} board needs {expected} cells, found {found}")]
    CellCount {
        size: usize,
        expected: usize,
        found: usize,
    },
    #[error("cells of a {size}x{size} board must be a permutation of 0..{cells}")]
    NotAPermutation { size: usize, cells: usize },
    #[error("initial board is {initial}x{initial} but goal board is {goal}x{goal}")]
    SizeMismatch { initial: usize, goal: usize },
    #[error("a {0}x{0} board does not fit in a 64-bit packed key")]
    UnpackableSize(usize),
    #[error("tile {tile} cannot be part of a pattern on a {size}x{size} board")]
    InvalidPatternTile { tile: u8, size: usize },
    #[error("a {tiles}-tile pattern table on a {size}x{size} board is too large")]
    PatternTooLarge { tiles: usize, size: usize },
    #[error("tile {0} appears in more than one pattern")]
    OverlappingPatterns(u8),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
