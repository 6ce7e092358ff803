//! # N-Puzzle Solver Library
//!
//! This library solves sliding-tile puzzles (the 8-puzzle, the 15-puzzle and
//! their N×N relatives) with heuristic search: IDA* for memory-light optimal
//! solving and A* over a best-first frontier.
//!
//! It is used by three binaries:
//! - `human_player`: Lets you slide tiles yourself, with undo and hints.
//! - `ai_solver`: Solves every instance in a problem file and reports the
//!   moves and search counters.
//! - `heuristic_evaluator`: Compares the heuristics on seeded random
//!   instances.
//!
//! ## Modules
//! - `engine`: The board (`Board`), blank moves (`Direction`), solvability
//!   and scrambling.
//! - `codec`: Packs boards up to 4×4 into a `u64`, whole or abstracted to a
//!   tile `Pattern`.
//! - `heuristics`: Misplaced tiles, Manhattan distance, linear conflicts and
//!   the disjoint pattern database estimate, selected by `HeuristicKind`.
//! - `pattern_db`: Builds and caches pattern databases.
//! - `problem`: Search nodes and the `Problem` / `Predictor` contracts.
//! - `frontier`: The priority queue used by A*.
//! - `solver`: `IdaStar`, `AStar` and the `solve` entry point.
//! - `config`: `SolverConfig`, loadable from JSON.
//! - `utils`: Parsing boards and problem files.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod heuristics;
pub mod pattern_db;
pub mod problem;
pub mod solver;
pub mod utils;

pub use error::PuzzleError;
