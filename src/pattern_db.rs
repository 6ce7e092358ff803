//! Pattern databases: exact move counts for sub-problems of the puzzle.
//!
//! A [`PatternDatabase`] answers "how many moves does it take to bring the
//! tiles of one [`Pattern`] home" for every placement of those tiles and the
//! blank. It is built once per (pattern, goal, charge) by a reverse
//! breadth-first search from the abstracted goal and then only read.
//!
//! Several databases over disjoint patterns form a [`DisjointPatternDb`],
//! whose summed lookups are the strongest heuristic in this crate. Databases
//! are expensive to build, so they are shared through a [`PdbCache`].
use crate::codec::{PackedCodec, Pattern, DONT_CARE};
use crate::engine::{step, Board, Direction, BLANK};
use crate::error::PuzzleError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

/// Table value of configurations the search never reached.
const UNREACHED: u8 = u8::MAX;

const NO_RANK: u8 = u8::MAX;

/// Largest table a single database may allocate (one byte per slot).
const MAX_TABLE_SLOTS: usize = 1 << 28;

/// How moves are charged while building a database.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveCharge {
    /// Every blank move costs one. Each database is the exact distance in its
    /// abstract space, but summing several of them can overestimate.
    EveryMove,
    /// Only moves that displace a pattern tile cost one. Databases over
    /// disjoint patterns can be summed without losing admissibility, since
    /// every real move is charged by at most one of them.
    #[default]
    PatternMoves,
}

/// Minimum remaining moves for every abstracted configuration of one pattern.
///
/// The table is dense: the slot of an abstracted key is the mixed-radix number
/// formed by the cells of the tracked tiles and of the blank, so a 5-tile
/// pattern on a 4×4 board takes 16⁶ bytes.
#[derive(Debug)]
pub struct PatternDatabase {
    pattern: Pattern,
    tracked: Vec<u8>,
    rank: [u8; 16],
    codec: PackedCodec,
    charge: MoveCharge,
    table: Vec<u8>,
    entries: usize,
    max_depth: u8,
    build_time: Duration,
}

impl PatternDatabase {
    /// Builds the database for `pattern` towards `goal`.
    ///
    /// The search starts from the goal's abstracted key and walks the blank
    /// over the packed key with [`PackedCodec::swap_tiles`]. Moves are
    /// reversible, so the distance recorded for a configuration is its
    /// distance *to* the goal. Zero-cost moves (see [`MoveCharge`]) are pushed
    /// to the front of the queue, which keeps the search a valid 0-1 BFS.
    ///
    /// On a 4×4 board tile 15 shares its nibble with [`DONT_CARE`]; if the
    /// pattern contains it, the tile is left untracked.
    ///
    /// # Returns
    /// * `Err(PuzzleError::UnpackableSize)` if the goal has no packed codec.
    /// * `Err(PuzzleError::InvalidPatternTile)` if a tile is not on the board.
    /// * `Err(PuzzleError::PatternTooLarge)` if the table would be too big.
    pub fn build(pattern: Pattern, goal: &Board, charge: MoveCharge) -> Result<Self, PuzzleError> {
        let codec = PackedCodec::new(goal.size())?;
        let cells = codec.cells();
        if let Some(tile) = pattern.tiles().find(|&t| t as usize >= cells) {
            return Err(PuzzleError::InvalidPatternTile {
                tile,
                size: goal.size(),
            });
        }

        let tracked: Vec<u8> = pattern.tiles().filter(|&t| t != DONT_CARE).collect();
        if tracked.len() < pattern.len() {
            warn!(
                "tile {} cannot be told apart from untracked tiles on a {}x{} board; pattern {} will not track it",
                DONT_CARE,
                goal.size(),
                goal.size(),
                pattern
            );
        }
        let slots = cells
            .checked_pow(tracked.len() as u32 + 1)
            .filter(|&n| n <= MAX_TABLE_SLOTS)
            .ok_or(PuzzleError::PatternTooLarge {
                tiles: tracked.len(),
                size: goal.size(),
            })?;

        let mut rank = [NO_RANK; 16];
        for (r, &tile) in tracked.iter().enumerate() {
            rank[tile as usize] = r as u8;
        }

        let mut db = PatternDatabase {
            pattern,
            tracked,
            rank,
            codec,
            charge,
            table: vec![UNREACHED; slots],
            entries: 0,
            max_depth: 0,
            build_time: Duration::ZERO,
        };
        db.fill(goal);
        info!(
            "pattern database {} built: {} states, max depth {}, {:.2?}",
            db.pattern, db.entries, db.max_depth, db.build_time
        );
        Ok(db)
    }

    fn fill(&mut self, goal: &Board) {
        let started = Instant::now();
        let size = self.codec.size();
        let goal_key = self.codec.encode_abstract(goal, &self.pattern);
        let (row, col) = self
            .codec
            .find_tile(goal_key, BLANK)
            .unwrap_or_else(|| goal.blank());
        let Some(goal_slot) = self.slot_of(goal_key) else {
            return;
        };

        self.table[goal_slot] = 0;
        self.entries = 1;
        let mut queue = VecDeque::new();
        queue.push_back((goal_key, row, col, 0u8));

        while let Some((key, row, col, dist)) = queue.pop_front() {
            let Some(slot) = self.slot_of(key) else {
                continue;
            };
            if dist > self.table[slot] {
                // Superseded by a cheaper route found after this entry was queued.
                continue;
            }
            self.max_depth = self.max_depth.max(dist);

            for dir in Direction::ALL {
                let Some((nr, nc)) = step(size, row, col, dir) else {
                    continue;
                };
                let moved = self.codec.decode_tile(key, nr, nc);
                let cost = match self.charge {
                    MoveCharge::EveryMove => 1,
                    MoveCharge::PatternMoves => u8::from(moved != DONT_CARE),
                };
                let child = self.codec.swap_tiles(key, row, col, nr, nc);
                let Some(child_slot) = self.slot_of(child) else {
                    continue;
                };
                let child_dist = dist.saturating_add(cost);
                if child_dist < self.table[child_slot] {
                    if self.table[child_slot] == UNREACHED {
                        self.entries += 1;
                    }
                    self.table[child_slot] = child_dist;
                    if cost == 0 {
                        queue.push_front((child, nr, nc, child_dist));
                    } else {
                        queue.push_back((child, nr, nc, child_dist));
                    }
                }
            }
        }
        self.build_time = started.elapsed();
    }

    /// Table slot of an abstracted key, or `None` if the key does not hold
    /// exactly the blank and every tracked tile.
    fn slot_of(&self, key: u64) -> Option<usize> {
        let cells = self.codec.cells();
        let mut positions = [0usize; 16];
        let mut seen = 0u32;
        let mut blank = None;
        for index in 0..cells {
            let value = self.codec.decode_index(key, index);
            if value == BLANK {
                if blank.replace(index).is_some() {
                    return None;
                }
            } else if let Some(&r) = self.rank.get(value as usize) {
                if r != NO_RANK {
                    positions[r as usize] = index;
                    seen |= 1 << r;
                }
            }
        }
        if seen.count_ones() as usize != self.tracked.len() {
            return None;
        }
        let slot = (0..self.tracked.len())
            .rev()
            .fold(blank?, |acc, r| acc * cells + positions[r]);
        Some(slot)
    }

    /// Stored distance for an abstracted key, `None` if it was never reached.
    pub fn get(&self, key: u64) -> Option<u8> {
        match self.table.get(self.slot_of(key)?) {
            Some(&UNREACHED) | None => None,
            Some(&dist) => Some(dist),
        }
    }

    /// Heuristic value of an abstracted key.
    ///
    /// Keys missing from the table read as 0. That keeps the estimate a lower
    /// bound but hides the fact that the key should have been present.
    pub fn heuristic(&self, key: u64) -> u32 {
        self.get(key).map_or(0, u32::from)
    }

    /// Heuristic value of a full board.
    pub fn estimate(&self, board: &Board) -> u32 {
        self.heuristic(self.codec.encode_abstract(board, &self.pattern))
    }

    /// Abstracted key of `board` for this database's pattern.
    pub fn key_of(&self, board: &Board) -> u64 {
        self.codec.encode_abstract(board, &self.pattern)
    }

    /// The pattern as requested.
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Tiles the table distinguishes, ascending.
    pub fn tracked_tiles(&self) -> &[u8] {
        &self.tracked
    }

    pub fn charge(&self) -> MoveCharge {
        self.charge
    }

    /// Number of configurations reached by the build.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn build_time(&self) -> Duration {
        self.build_time
    }
}

/// Disjoint tile sets whose databases are summed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Partition {
    patterns: Vec<Pattern>,
}

impl Partition {
    /// Groups `patterns` into a partition.
    ///
    /// # Returns
    /// * `Err(PuzzleError::OverlappingPatterns)` naming the first shared tile.
    pub fn new(patterns: Vec<Pattern>) -> Result<Self, PuzzleError> {
        for (i, a) in patterns.iter().enumerate() {
            for b in &patterns[i + 1..] {
                if a.intersects(b) {
                    let shared = a.tiles().find(|&t| b.contains(t)).unwrap_or_default();
                    return Err(PuzzleError::OverlappingPatterns(shared));
                }
            }
        }
        Ok(Partition { patterns })
    }

    /// Builds a partition from plain tile lists.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::pattern_db::Partition;
    /// let partition = Partition::from_tiles(&[vec![1, 2, 3, 4], vec![5, 6, 7, 8]]).unwrap();
    /// assert_eq!(partition.patterns().len(), 2);
    /// assert!(Partition::from_tiles(&[vec![1, 2], vec![2, 3]]).is_err());
    /// ```
    pub fn from_tiles(groups: &[Vec<u8>]) -> Result<Self, PuzzleError> {
        let patterns = groups
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;
        Partition::new(patterns)
    }

    /// The default partition for a board size, if there is one.
    ///
    /// Only 4×4 boards have one: three 5-tile patterns, `{1..5}`, `{6..10}`
    /// and `{11..15}`.
    pub fn standard(size: usize) -> Option<Self> {
        if size != 4 {
            return None;
        }
        Partition::from_tiles(&[
            vec![1, 2, 3, 4, 5],
            vec![6, 7, 8, 9, 10],
            vec![11, 12, 13, 14, 15],
        ])
        .ok()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

/// Databases over disjoint patterns, summed into one admissible estimate.
///
/// Tiles no database tracks contribute their Manhattan distance, so every
/// tile is accounted for exactly once.
#[derive(Debug, Clone)]
pub struct DisjointPatternDb {
    databases: Vec<Arc<PatternDatabase>>,
    residual_goal: Vec<Option<(usize, usize)>>,
}

impl DisjointPatternDb {
    /// Combines databases built towards `goal`.
    pub fn new(databases: Vec<Arc<PatternDatabase>>, goal: &Board) -> Self {
        let size = goal.size();
        let mut residual_goal = vec![None; size * size];
        for (index, &tile) in goal.cells().iter().enumerate() {
            let tracked = databases.iter().any(|db| db.tracked_tiles().contains(&tile));
            if tile != BLANK && !tracked {
                residual_goal[tile as usize] = Some((index / size, index % size));
            }
        }
        DisjointPatternDb {
            databases,
            residual_goal,
        }
    }

    pub fn databases(&self) -> &[Arc<PatternDatabase>] {
        &self.databases
    }

    /// Tiles covered by Manhattan distance instead of a database.
    pub fn residual_tiles(&self) -> Vec<u8> {
        self.residual_goal
            .iter()
            .enumerate()
            .filter(|(_, goal)| goal.is_some())
            .map(|(tile, _)| tile as u8)
            .collect()
    }

    /// Sum of every database lookup plus the residual Manhattan distance.
    pub fn estimate(&self, board: &Board) -> u32 {
        let size = board.size();
        let residual: usize = board
            .cells()
            .iter()
            .enumerate()
            .filter_map(|(index, &tile)| {
                let (gr, gc) = (*self.residual_goal.get(tile as usize)?)?;
                Some((index / size).abs_diff(gr) + (index % size).abs_diff(gc))
            })
            .sum();
        let summed: u32 = self.databases.iter().map(|db| db.estimate(board)).sum();
        summed + residual as u32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    pattern: Pattern,
    goal: Board,
    charge: MoveCharge,
}

/// Shared store of built databases, keyed by (pattern, goal, charge).
///
/// "Build if absent" runs under one lock, so concurrent first use builds a
/// database once and nobody observes a half-filled table.
#[derive(Debug, Default)]
pub struct PdbCache {
    databases: Mutex<HashMap<CacheKey, Arc<PatternDatabase>>>,
}

static GLOBAL_CACHE: OnceLock<Arc<PdbCache>> = OnceLock::new();

impl PdbCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<PdbCache> {
        Arc::clone(GLOBAL_CACHE.get_or_init(|| Arc::new(PdbCache::new())))
    }

    /// Returns the database for the key, building it first if needed.
    pub fn get_or_build(
        &self,
        pattern: Pattern,
        goal: &Board,
        charge: MoveCharge,
    ) -> Result<Arc<PatternDatabase>, PuzzleError> {
        let key = CacheKey {
            pattern,
            goal: goal.clone(),
            charge,
        };
        let mut databases = self.databases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(db) = databases.get(&key) {
            return Ok(Arc::clone(db));
        }
        let db = Arc::new(PatternDatabase::build(pattern, goal, charge)?);
        databases.insert(key, Arc::clone(&db));
        Ok(db)
    }

    /// Builds or fetches every database of `partition` (pattern-move charge)
    /// and combines them.
    pub fn disjoint(&self, partition: &Partition, goal: &Board) -> Result<DisjointPatternDb, PuzzleError> {
        let databases = partition
            .patterns()
            .iter()
            .map(|&p| self.get_or_build(p, goal, MoveCharge::PatternMoves))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DisjointPatternDb::new(databases, goal))
    }

    /// Number of cached databases.
    pub fn len(&self) -> usize {
        self.databases.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached database. Holders of an `Arc` keep theirs.
    pub fn clear(&self) {
        self.databases.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
