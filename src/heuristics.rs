use crate::engine::{Board, BLANK};
use crate::pattern_db::{DisjointPatternDb, Partition, PdbCache};
use crate::problem::Predictor;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Selects one of the estimators in this module.
///
/// Tags are parsed leniently: an unknown tag selects [`HeuristicKind::Zero`],
/// which turns A* and IDA* into uniform-cost search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeuristicKind {
    Misplaced,
    #[default]
    Manhattan,
    LinearConflict,
    DisjointPdb,
    Zero,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 5] = [
        HeuristicKind::Misplaced,
        HeuristicKind::Manhattan,
        HeuristicKind::LinearConflict,
        HeuristicKind::DisjointPdb,
        HeuristicKind::Zero,
    ];

    /// Maps a tag to a kind, falling back to `Zero` for unknown tags.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::heuristics::HeuristicKind;
    /// assert_eq!(HeuristicKind::from_tag("linear-conflict"), HeuristicKind::LinearConflict);
    /// assert_eq!(HeuristicKind::from_tag("PDB"), HeuristicKind::DisjointPdb);
    /// assert_eq!(HeuristicKind::from_tag("nonsense"), HeuristicKind::Zero);
    /// ```
    pub fn from_tag(tag: &str) -> HeuristicKind {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "misplaced" | "misplaced-tiles" | "hamming" => HeuristicKind::Misplaced,
            "manhattan" => HeuristicKind::Manhattan,
            "linear-conflict" | "linear-conflicts" | "manhattan+linear-conflicts" => {
                HeuristicKind::LinearConflict
            }
            "disjoint-pdb" | "pdb" | "disjoint-pattern-database" => HeuristicKind::DisjointPdb,
            "zero" | "none" => HeuristicKind::Zero,
            other => {
                warn!("unknown heuristic '{}', searching without an estimate", other);
                HeuristicKind::Zero
            }
        }
    }

    /// Canonical tag, accepted back by [`HeuristicKind::from_tag`].
    pub fn tag(self) -> &'static str {
        match self {
            HeuristicKind::Misplaced => "misplaced",
            HeuristicKind::Manhattan => "manhattan",
            HeuristicKind::LinearConflict => "linear-conflict",
            HeuristicKind::DisjointPdb => "disjoint-pdb",
            HeuristicKind::Zero => "zero",
        }
    }
}

impl FromStr for HeuristicKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HeuristicKind::from_tag(s))
    }
}

impl From<String> for HeuristicKind {
    fn from(tag: String) -> Self {
        HeuristicKind::from_tag(&tag)
    }
}

impl From<HeuristicKind> for String {
    fn from(kind: HeuristicKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

/// Goal cell of every tile value, built once per goal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalIndex {
    size: usize,
    positions: Vec<(usize, usize)>,
}

impl GoalIndex {
    pub fn new(goal: &Board) -> Self {
        let size = goal.size();
        let mut positions = vec![(0, 0); size * size];
        for (index, &tile) in goal.cells().iter().enumerate() {
            positions[tile as usize] = (index / size, index % size);
        }
        GoalIndex { size, positions }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Goal `(row, col)` of `tile`.
    pub fn position(&self, tile: u8) -> (usize, usize) {
        self.positions[tile as usize]
    }
}

/// Counts the non-blank tiles that are not on their goal cell.
///
/// # Arguments
/// * `state`: The board to estimate.
/// * `goal`: The target board, same size as `state`.
///
/// # Returns
/// The number of misplaced tiles. Never more than the real distance.
pub fn misplaced(state: &Board, goal: &Board) -> u32 {
    state
        .cells()
        .iter()
        .zip(goal.cells())
        .filter(|&(&s, &g)| s != BLANK && s != g)
        .count() as u32
}

/// Sums the grid distance of every non-blank tile to its goal cell.
///
/// # Arguments
/// * `state`: The board to estimate.
/// * `index`: Goal positions, built from a goal of the same size.
///
/// # Returns
/// The Manhattan distance. It is 0 only for the goal itself.
///
/// # Examples
/// ```
/// use npuzzle_solver::engine::Board;
/// use npuzzle_solver::heuristics::{manhattan, GoalIndex};
/// let goal = Board::solved(3).unwrap();
/// let board = Board::new(3, vec![1, 2, 3, 4, 5, 6, 0, 7, 8]).unwrap();
/// assert_eq!(manhattan(&board, &GoalIndex::new(&goal)), 2);
/// ```
pub fn manhattan(state: &Board, index: &GoalIndex) -> u32 {
    let size = state.size();
    debug_assert_eq!(size, index.size());
    state
        .cells()
        .iter()
        .enumerate()
        .filter(|&(_, &tile)| tile != BLANK)
        .map(|(i, &tile)| {
            let (gr, gc) = index.position(tile);
            ((i / size).abs_diff(gr) + (i % size).abs_diff(gc)) as u32
        })
        .sum()
}

/// Extra moves forced by tiles that sit in their goal line in the wrong order.
///
/// Every row (then every column) is scanned for the tiles whose goal lies in
/// that same line. If their goal offsets are not increasing along the line,
/// some of them must step out of the line and back: at least as many as the
/// line holds beyond its longest increasing run of goal offsets, two moves
/// each. With a single reversed pair this is the textbook `2` per conflict;
/// with three or more tiles it never charges more than is needed.
///
/// # Arguments
/// * `state`: The board to estimate.
/// * `index`: Goal positions, built from a goal of the same size.
///
/// # Returns
/// The correction to add to [`manhattan`]. Zero when no line has tiles in
/// reversed order.
pub fn linear_conflicts(state: &Board, index: &GoalIndex) -> u32 {
    let size = state.size();
    let mut extra = 0;
    let mut offsets = Vec::with_capacity(size);
    for line in 0..size {
        offsets.clear();
        for along in 0..size {
            let tile = state.tile(line, along);
            if tile == BLANK {
                continue;
            }
            let (gr, gc) = index.position(tile);
            if gr == line {
                offsets.push(gc);
            }
        }
        extra += offsets.len() - longest_increasing_run(&offsets);

        offsets.clear();
        for along in 0..size {
            let tile = state.tile(along, line);
            if tile == BLANK {
                continue;
            }
            let (gr, gc) = index.position(tile);
            if gc == line {
                offsets.push(gr);
            }
        }
        extra += offsets.len() - longest_increasing_run(&offsets);
    }
    2 * extra as u32
}

/// Length of the longest strictly increasing subsequence.
fn longest_increasing_run(values: &[usize]) -> usize {
    let mut tails: Vec<usize> = Vec::with_capacity(values.len());
    for &v in values {
        let at = tails.partition_point(|&t| t < v);
        if at == tails.len() {
            tails.push(v);
        } else {
            tails[at] = v;
        }
    }
    tails.len()
}

/// [`manhattan`] plus [`linear_conflicts`].
pub fn manhattan_with_conflicts(state: &Board, index: &GoalIndex) -> u32 {
    manhattan(state, index) + linear_conflicts(state, index)
}

/// A configured estimator bound to one goal.
///
/// The goal index is built up front. Pattern databases are built (or fetched
/// from the shared [`PdbCache`]) on the first estimate that needs them, which
/// blocks that call until the tables are complete. Boards the databases
/// cannot cover are estimated with Manhattan distance instead.
///
/// Through [`Predictor`] it also answers for other goals. The most recent of
/// those is remembered with its index and databases, so they are rebuilt only
/// when the requested goal changes.
#[derive(Debug)]
pub struct Heuristic {
    kind: HeuristicKind,
    goal: Board,
    index: GoalIndex,
    partition: Option<Partition>,
    cache: Arc<PdbCache>,
    databases: OnceLock<Option<DisjointPatternDb>>,
    unbound: Mutex<Option<Arc<UnboundGoal>>>,
}

/// Lookup state for the last goal requested other than the bound one.
#[derive(Debug)]
struct UnboundGoal {
    goal: Board,
    index: GoalIndex,
    databases: Option<DisjointPatternDb>,
}

impl Heuristic {
    /// Creates an estimator backed by the process-wide database cache.
    pub fn new(kind: HeuristicKind, goal: &Board) -> Self {
        Heuristic::with_cache(kind, goal, PdbCache::global())
    }

    /// Creates an estimator backed by `cache`.
    pub fn with_cache(kind: HeuristicKind, goal: &Board, cache: Arc<PdbCache>) -> Self {
        Heuristic {
            kind,
            goal: goal.clone(),
            index: GoalIndex::new(goal),
            partition: Partition::standard(goal.size()),
            cache,
            databases: OnceLock::new(),
            unbound: Mutex::new(None),
        }
    }

    /// Replaces the default tile partition used by `DisjointPdb`.
    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = Some(partition);
        self.databases = OnceLock::new();
        self.unbound = Mutex::new(None);
        self
    }

    pub fn kind(&self) -> HeuristicKind {
        self.kind
    }

    pub fn goal(&self) -> &Board {
        &self.goal
    }

    /// Estimate of the distance from `state` to the bound goal.
    pub fn estimate(&self, state: &Board) -> u32 {
        let databases = match self.kind {
            HeuristicKind::DisjointPdb => self
                .databases
                .get_or_init(|| self.load_databases(&self.goal))
                .as_ref(),
            _ => None,
        };
        self.estimate_with(state, &self.goal, &self.index, databases)
    }

    fn load_databases(&self, goal: &Board) -> Option<DisjointPatternDb> {
        let Some(partition) = &self.partition else {
            debug!(
                "no pattern partition for {}x{} boards, using Manhattan distance",
                goal.size(),
                goal.size()
            );
            return None;
        };
        match self.cache.disjoint(partition, goal) {
            Ok(databases) => Some(databases),
            Err(e) => {
                warn!("pattern databases unavailable ({}), using Manhattan distance", e);
                None
            }
        }
    }

    fn estimate_with(
        &self,
        state: &Board,
        goal: &Board,
        index: &GoalIndex,
        databases: Option<&DisjointPatternDb>,
    ) -> u32 {
        match self.kind {
            HeuristicKind::Misplaced => misplaced(state, goal),
            HeuristicKind::Manhattan => manhattan(state, index),
            HeuristicKind::LinearConflict => manhattan_with_conflicts(state, index),
            HeuristicKind::DisjointPdb => match databases {
                Some(db) => db.estimate(state),
                None => manhattan(state, index),
            },
            HeuristicKind::Zero => 0,
        }
    }
}

impl Predictor<Board> for Heuristic {
    fn predict(&self, state: &Board, goal: &Board) -> u32 {
        if *goal == self.goal {
            return self.estimate(state);
        }
        let unbound = self.unbound_goal(goal);
        self.estimate_with(state, goal, &unbound.index, unbound.databases.as_ref())
    }
}

impl Heuristic {
    fn unbound_goal(&self, goal: &Board) -> Arc<UnboundGoal> {
        let mut slot = self.unbound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(unbound) = slot.as_ref().filter(|u| u.goal == *goal) {
            return Arc::clone(unbound);
        }
        trace!("estimate requested towards an unbound goal, indexing it");
        let databases = match self.kind {
            HeuristicKind::DisjointPdb => self.load_databases(goal),
            _ => None,
        };
        let unbound = Arc::new(UnboundGoal {
            goal: goal.clone(),
            index: GoalIndex::new(goal),
            databases,
        });
        *slot = Some(Arc::clone(&unbound));
        unbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;
    use crate::pattern_db::tests::exact_distances;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn board(size: usize, cells: &[u8]) -> Board {
        Board::new(size, cells.to_vec()).unwrap()
    }

    fn all(state: &Board, goal: &Board) -> (u32, u32, u32) {
        let index = GoalIndex::new(goal);
        (
            misplaced(state, goal),
            manhattan(state, &index),
            linear_conflicts(state, &index),
        )
    }

    #[test]
    fn test_known_values_3x3() {
        let goal = Board::solved(3).unwrap();
        let cases: [(&[u8], (u32, u32, u32)); 6] = [
            (&[8, 6, 7, 2, 5, 4, 3, 0, 1], (7, 21, 2)),
            (&[2, 1, 3, 4, 5, 6, 7, 8, 0], (2, 2, 2)),
            (&[1, 2, 3, 4, 5, 6, 0, 7, 8], (2, 2, 0)),
            (&[3, 2, 1, 4, 5, 6, 7, 8, 0], (2, 4, 4)),
            (&[4, 1, 3, 7, 2, 6, 0, 5, 8], (6, 6, 0)),
            (&[1, 2, 3, 4, 5, 6, 7, 0, 8], (1, 1, 0)),
        ];
        for (cells, expected) in cases {
            assert_eq!(all(&board(3, cells), &goal), expected, "board {:?}", cells);
        }
    }

    #[test]
    fn test_known_values_4x4() {
        let goal = Board::solved(4).unwrap();
        let a = board(4, &[6, 1, 8, 2, 5, 7, 12, 3, 10, 11, 0, 4, 9, 13, 14, 15]);
        assert_eq!(all(&a, &goal), (14, 20, 0));
        let b = board(4, &[10, 1, 0, 3, 2, 15, 11, 4, 9, 8, 5, 12, 13, 6, 7, 14]);
        let index = GoalIndex::new(&goal);
        assert_eq!(manhattan(&b, &index), 24);
        assert_eq!(linear_conflicts(&b, &index), 2);
    }

    #[test]
    fn test_goal_scores_zero() {
        for size in 2..=5 {
            let goal = Board::solved(size).unwrap();
            assert_eq!(all(&goal, &goal), (0, 0, 0));
        }
    }

    #[test]
    fn test_custom_goal_index() {
        let goal = board(3, &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        let index = GoalIndex::new(&goal);
        assert_eq!(index.position(0), (0, 0));
        assert_eq!(index.position(8), (2, 2));
        let state = Board::solved(3).unwrap();
        // Every tile sits one cell right of (or wrapped below) its goal.
        assert_eq!(misplaced(&state, &goal), 8);
        assert_eq!(manhattan(&state, &index), 12);
    }

    #[test]
    fn test_tags_round_trip() {
        for kind in HeuristicKind::ALL {
            assert_eq!(HeuristicKind::from_tag(kind.tag()), kind);
            assert_eq!(kind.to_string().parse::<HeuristicKind>(), Ok(kind));
        }
        assert_eq!(HeuristicKind::from_tag("Linear_Conflicts"), HeuristicKind::LinearConflict);
        assert_eq!(HeuristicKind::from_tag("bogus"), HeuristicKind::Zero);
    }

    #[test]
    fn test_kind_from_json_is_lenient() {
        let kinds: Vec<HeuristicKind> = serde_json::from_str(r#"["pdb", "manhattan", "what"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![HeuristicKind::DisjointPdb, HeuristicKind::Manhattan, HeuristicKind::Zero]
        );
        assert_eq!(
            serde_json::to_string(&HeuristicKind::LinearConflict).unwrap(),
            "\"linear-conflict\""
        );
    }

    #[test]
    fn test_heuristic_dispatch() {
        let goal = Board::solved(3).unwrap();
        let state = board(3, &[8, 6, 7, 2, 5, 4, 3, 0, 1]);
        let cache = Arc::new(PdbCache::new());
        let expect = [
            (HeuristicKind::Misplaced, 7),
            (HeuristicKind::Manhattan, 21),
            (HeuristicKind::LinearConflict, 23),
            (HeuristicKind::Zero, 0),
        ];
        for (kind, value) in expect {
            let h = Heuristic::with_cache(kind, &goal, Arc::clone(&cache));
            assert_eq!(h.predict(&state, &goal), value, "{}", kind);
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_pdb_falls_back_to_manhattan_without_partition() {
        let goal = Board::solved(3).unwrap();
        let state = board(3, &[8, 6, 7, 2, 5, 4, 3, 0, 1]);
        let cache = Arc::new(PdbCache::new());
        let h = Heuristic::with_cache(HeuristicKind::DisjointPdb, &goal, Arc::clone(&cache));
        assert_eq!(h.estimate(&state), 21);
        assert!(cache.is_empty());

        let five = Board::solved(5).unwrap();
        let partition = Partition::from_tiles(&[vec![1, 2, 3]]).unwrap();
        let h = Heuristic::with_cache(HeuristicKind::DisjointPdb, &five, Arc::clone(&cache))
            .with_partition(partition);
        let moved = five.apply(Direction::Up).unwrap();
        assert_eq!(h.estimate(&moved), 1);
    }

    #[test]
    fn test_pdb_with_custom_partition() {
        let goal = Board::solved(3).unwrap();
        let cache = Arc::new(PdbCache::new());
        let partition = Partition::from_tiles(&[vec![1, 2, 3, 4], vec![5, 6, 7, 8]]).unwrap();
        let h = Heuristic::with_cache(HeuristicKind::DisjointPdb, &goal, Arc::clone(&cache))
            .with_partition(partition);
        assert_eq!(h.estimate(&board(3, &[8, 6, 7, 2, 5, 4, 3, 0, 1])), 29);
        assert_eq!(h.estimate(&board(3, &[4, 1, 3, 7, 2, 6, 0, 5, 8])), 6);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_predict_towards_other_goal() {
        let goal = Board::solved(3).unwrap();
        let other = goal.apply(Direction::Left).unwrap();
        let h = Heuristic::with_cache(HeuristicKind::Manhattan, &goal, Arc::new(PdbCache::new()));
        assert_eq!(h.predict(&goal, &other), 1);
        assert_eq!(h.predict(&other, &other), 0);
    }

    #[test]
    fn test_other_goal_databases_are_reused() {
        let goal = Board::solved(3).unwrap();
        let other = goal.apply(Direction::Left).unwrap();
        let state = other.apply(Direction::Up).unwrap();
        let cache = Arc::new(PdbCache::new());
        let partition = Partition::from_tiles(&[vec![1, 2, 3, 4], vec![5, 6, 7, 8]]).unwrap();
        let h = Heuristic::with_cache(HeuristicKind::DisjointPdb, &goal, Arc::clone(&cache))
            .with_partition(partition);

        assert_eq!(h.predict(&state, &other), 1);
        assert_eq!(cache.len(), 2);
        // Later calls for the same goal skip the cache entirely.
        cache.clear();
        assert_eq!(h.predict(&state, &other), 1);
        assert_eq!(h.predict(&other, &other), 0);
        assert!(cache.is_empty());

        // A different goal is looked up again.
        assert_eq!(h.predict(&other, &goal), 1);
        assert!(h.predict(&state, &goal) >= 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_conflicts_admissible_on_every_3x3_board() {
        let goal = Board::solved(3).unwrap();
        let index = GoalIndex::new(&goal);
        let exact = exact_distances(&goal);
        assert_eq!(exact.len(), 181_440);
        for (state, &distance) in &exact {
            assert!(manhattan_with_conflicts(state, &index) <= distance, "board\n{}", state);
        }
    }

    #[test]
    fn test_reversed_line_charges_tiles_not_pairs() {
        let goal = Board::solved(3).unwrap();
        let index = GoalIndex::new(&goal);
        let state = board(3, &[0, 8, 7, 6, 5, 4, 3, 2, 1]);
        // The middle row and middle column each hold three tiles in reverse:
        // three reversed pairs, but only two tiles have to leave the line.
        assert_eq!(manhattan(&state, &index), 20);
        assert_eq!(linear_conflicts(&state, &index), 8);
        assert_eq!(exact_distances(&goal)[&state], 28);
        assert_eq!(manhattan_with_conflicts(&state, &index), 28);
    }

    #[test]
    fn test_scrambles_respect_dominance() {
        let goal = Board::solved(4).unwrap();
        let index = GoalIndex::new(&goal);
        let mut rng = SmallRng::seed_from_u64(11);
        for moves in [5, 20, 80] {
            let state = Board::scrambled(&goal, moves, &mut rng);
            let m = manhattan(&state, &index);
            assert!(misplaced(&state, &goal) <= m);
            assert!(m <= moves as u32);
            assert!(manhattan_with_conflicts(&state, &index) >= m);
        }
    }

    proptest! {
        #[test]
        fn manhattan_zero_iff_goal(cells in Just((0u8..9).collect::<Vec<u8>>()).prop_shuffle()) {
            let goal = Board::solved(3).unwrap();
            let state = Board::new(3, cells).unwrap();
            let index = GoalIndex::new(&goal);
            prop_assert_eq!(manhattan(&state, &index) == 0, state == goal);
            prop_assert_eq!(misplaced(&state, &goal) == 0, state == goal);
            prop_assert!(misplaced(&state, &goal) <= manhattan(&state, &index));
        }

        #[test]
        fn one_move_changes_manhattan_by_one(
            cells in Just((0u8..16).collect::<Vec<u8>>()).prop_shuffle(),
            dir in prop::sample::select(Direction::ALL.to_vec()),
        ) {
            let goal = Board::solved(4).unwrap();
            let index = GoalIndex::new(&goal);
            let state = Board::new(4, cells).unwrap();
            if let Some(next) = state.apply(dir) {
                let before = manhattan(&state, &index);
                let after = manhattan(&next, &index);
                prop_assert_eq!(before.abs_diff(after), 1);
            }
        }
    }
}
