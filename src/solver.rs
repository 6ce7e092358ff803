use crate::config::{Algorithm, SolverConfig};
use crate::engine::{Board, Direction};
use crate::error::PuzzleError;
use crate::frontier::{Evaluation, Frontier};
use crate::heuristics::Heuristic;
use crate::pattern_db::PdbCache;
use crate::problem::{NPuzzleProblem, Node, Predictor, Problem};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

/// Represents a solution found by a searcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution<S, A> {
    /// Actions from the initial state to the goal.
    pub moves: Vec<A>,
    /// The state after each action; the last one is the goal.
    pub states: Vec<S>,
    /// Sum of step costs along the path.
    pub cost: u32,
}

impl<S: Clone, A: Copy> Solution<S, A> {
    /// Rebuilds the path that ends at `goal` by following parent links.
    pub fn from_node(goal: &Rc<Node<S, A>>) -> Self {
        let path = goal.path();
        Solution {
            moves: path.iter().filter_map(|n| n.action()).collect(),
            states: path.iter().map(|n| n.state().clone()).collect(),
            cost: goal.path_cost(),
        }
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// How a search ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome<S, A> {
    Solved(Solution<S, A>),
    /// The solvability check failed; nothing was expanded.
    Unsolvable,
    /// Every reachable state was tried without reaching the goal.
    Exhausted,
    /// The expansion budget ran out first.
    LimitReached,
}

impl<S, A> SearchOutcome<S, A> {
    pub fn solution(&self) -> Option<&Solution<S, A>> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution<S, A>> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SearchOutcome::Solved(_))
    }

    /// Short label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Solved(_) => "solved",
            SearchOutcome::Unsolvable => "unsolvable",
            SearchOutcome::Exhausted => "exhausted",
            SearchOutcome::LimitReached => "limit-reached",
        }
    }
}

/// Work counters of the last search. Reset at the start of every search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub nodes_generated: u64,
    pub nodes_expanded: u64,
    /// Bound levels tried by IDA*; always 0 for A*.
    pub iterations: u32,
}

/// Optional stopping rules shared by both searchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    /// Give up once this many nodes have been expanded. Checked between IDA*
    /// iterations and between A* polls.
    pub max_expansions: Option<u64>,
    /// Ask [`Problem::solvable`] before searching.
    pub check_solvability: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_expansions: None,
            check_solvability: true,
        }
    }
}

impl SearchLimits {
    fn exceeded(&self, stats: &SearchStats) -> bool {
        self.max_expansions
            .is_some_and(|max| stats.nodes_expanded >= max)
    }
}

/// Iterative-deepening A*.
///
/// Runs depth-first passes bounded by f = g + h, raising the bound to the
/// smallest f that exceeded it after each pass. Memory stays linear in the
/// solution depth. With an admissible predictor the first solution found is
/// optimal.
pub struct IdaStar<H> {
    predictor: H,
    limits: SearchLimits,
    stats: SearchStats,
}

/// State of one bounded depth-first pass.
struct BoundedWalk<'a, P: Problem, H> {
    problem: &'a P,
    predictor: &'a H,
    stats: &'a mut SearchStats,
    on_path: HashSet<P::Key>,
    bound: u32,
    next_bound: u32,
}

impl<P, H> BoundedWalk<'_, P, H>
where
    P: Problem,
    H: Predictor<P::State>,
{
    fn descend(&mut self, node: &Rc<Node<P::State, P::Action>>) -> Option<Rc<Node<P::State, P::Action>>> {
        let f = node.evaluation();
        if f > self.bound {
            self.next_bound = self.next_bound.min(f);
            return None;
        }
        if self.problem.is_goal(node.state()) {
            return Some(Rc::clone(node));
        }

        self.stats.nodes_expanded += 1;
        for child in self.problem.child_nodes(node, self.predictor) {
            self.stats.nodes_generated += 1;
            let key = self.problem.cycle_key(child.state());
            if !self.on_path.insert(key.clone()) {
                continue;
            }
            let found = self.descend(&child);
            self.on_path.remove(&key);
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

impl<H> IdaStar<H> {
    pub fn new(predictor: H) -> Self {
        IdaStar {
            predictor,
            limits: SearchLimits::default(),
            stats: SearchStats::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Counters of the last [`IdaStar::search`].
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Searches for a cheapest path from the problem's initial state to its
    /// goal.
    ///
    /// # Returns
    /// * `SearchOutcome::Solved` with the path, root excluded.
    /// * `SearchOutcome::Unsolvable` if the solvability check is enabled and
    ///   fails.
    /// * `SearchOutcome::Exhausted` if no pass was cut off by the bound.
    /// * `SearchOutcome::LimitReached` if the expansion budget ran out.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::engine::{Board, Direction};
    /// use npuzzle_solver::heuristics::{Heuristic, HeuristicKind};
    /// use npuzzle_solver::problem::NPuzzleProblem;
    /// use npuzzle_solver::solver::IdaStar;
    ///
    /// let goal = Board::solved(3).unwrap();
    /// let initial = Board::new(3, vec![1, 2, 3, 4, 5, 6, 0, 7, 8]).unwrap();
    /// let problem = NPuzzleProblem::new(initial, goal.clone()).unwrap();
    /// let mut search = IdaStar::new(Heuristic::new(HeuristicKind::Manhattan, &goal));
    /// let solution = search.search(&problem).into_solution().unwrap();
    /// assert_eq!(solution.moves, vec![Direction::Right, Direction::Right]);
    /// ```
    pub fn search<P>(&mut self, problem: &P) -> SearchOutcome<P::State, P::Action>
    where
        P: Problem,
        H: Predictor<P::State>,
    {
        self.stats = SearchStats::default();
        if self.limits.check_solvability && !problem.solvable() {
            debug!("IDA*: instance is unsolvable, not searching");
            return SearchOutcome::Unsolvable;
        }

        let root = problem.root(&self.predictor);
        self.stats.nodes_generated = 1;
        let root_key = problem.cycle_key(root.state());
        let mut walk = BoundedWalk {
            problem,
            predictor: &self.predictor,
            stats: &mut self.stats,
            on_path: HashSet::new(),
            bound: root.evaluation(),
            next_bound: u32::MAX,
        };

        loop {
            walk.stats.iterations += 1;
            debug!(
                "IDA* iteration {} with bound {} ({} nodes expanded so far)",
                walk.stats.iterations, walk.bound, walk.stats.nodes_expanded
            );
            walk.next_bound = u32::MAX;
            walk.on_path.clear();
            walk.on_path.insert(root_key.clone());

            if let Some(goal) = walk.descend(&root) {
                return SearchOutcome::Solved(Solution::from_node(&goal));
            }
            if walk.next_bound == u32::MAX {
                return SearchOutcome::Exhausted;
            }
            if self.limits.exceeded(walk.stats) {
                return SearchOutcome::LimitReached;
            }
            walk.bound = walk.next_bound;
        }
    }
}

/// Best-first graph search ordered by a [`Frontier`].
///
/// Uses f = g + h by default. States are not re-opened once expanded, so
/// optimality needs a consistent predictor, which every heuristic in
/// [`crate::heuristics`] is.
pub struct AStar<H> {
    predictor: H,
    limits: SearchLimits,
    evaluation: Evaluation,
    stats: SearchStats,
}

impl<H> AStar<H> {
    pub fn new(predictor: H) -> Self {
        AStar {
            predictor,
            limits: SearchLimits::default(),
            evaluation: Evaluation::Total,
            stats: SearchStats::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Orders the frontier by something other than f, e.g. g for
    /// uniform-cost search.
    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Searches like [`IdaStar::search`] and returns the same outcomes.
    pub fn search<P>(&mut self, problem: &P) -> SearchOutcome<P::State, P::Action>
    where
        P: Problem,
        H: Predictor<P::State>,
    {
        self.stats = SearchStats::default();
        if self.limits.check_solvability && !problem.solvable() {
            debug!("A*: instance is unsolvable, not searching");
            return SearchOutcome::Unsolvable;
        }

        let mut frontier = Frontier::new(self.evaluation);
        let mut explored: HashSet<P::State> = HashSet::new();
        frontier.offer(problem.root(&self.predictor));
        self.stats.nodes_generated = 1;

        while let Some(node) = frontier.poll() {
            if problem.is_goal(node.state()) {
                debug!(
                    "A*: goal reached after {} expansions, {} nodes still open",
                    self.stats.nodes_expanded,
                    frontier.len()
                );
                return SearchOutcome::Solved(Solution::from_node(&node));
            }
            if self.limits.exceeded(&self.stats) {
                return SearchOutcome::LimitReached;
            }
            explored.insert(node.state().clone());
            self.stats.nodes_expanded += 1;
            for child in problem.child_nodes(&node, &self.predictor) {
                self.stats.nodes_generated += 1;
                if !explored.contains(child.state()) {
                    frontier.offer(child);
                }
            }
        }
        SearchOutcome::Exhausted
    }
}

/// Runs the configured search on an N-puzzle instance.
///
/// # Arguments
/// * `problem`: The instance to solve.
/// * `config`: Algorithm, heuristic and limits.
/// * `cache`: Where pattern databases are looked up and stored.
///
/// # Returns
/// The outcome and the counters of the search, or an error if the configured
/// pattern partition is invalid.
pub fn solve(
    problem: &NPuzzleProblem,
    config: &SolverConfig,
    cache: Arc<PdbCache>,
) -> Result<(SearchOutcome<Board, Direction>, SearchStats), PuzzleError> {
    let mut heuristic = Heuristic::with_cache(config.heuristic, problem.goal(), cache);
    if let Some(partition) = config.partition()? {
        heuristic = heuristic.with_partition(partition);
    }
    let limits = config.limits();
    let result = match config.algorithm {
        Algorithm::IdaStar => {
            let mut search = IdaStar::new(heuristic).with_limits(limits);
            let outcome = search.search(problem);
            (outcome, search.stats())
        }
        Algorithm::AStar => {
            let mut search = AStar::new(heuristic).with_limits(limits);
            let outcome = search.search(problem);
            (outcome, search.stats())
        }
    };
    Ok(result)
}

/// Replays `moves` from `start`, returning `None` at the first illegal move.
pub fn replay(start: &Board, moves: &[Direction]) -> Option<Board> {
    moves
        .iter()
        .try_fold(start.clone(), |board, &dir| board.apply(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::HeuristicKind;

    fn board(size: usize, cells: &[u8]) -> Board {
        Board::new(size, cells.to_vec()).unwrap()
    }

    fn manhattan_search(goal: &Board) -> IdaStar<Heuristic> {
        IdaStar::new(Heuristic::with_cache(
            HeuristicKind::Manhattan,
            goal,
            Arc::new(PdbCache::new()),
        ))
    }

    /// Walk along a line of `len` cells; only stepping right reaches the end.
    struct Line {
        start: u32,
        end: u32,
        len: u32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Step {
        Left,
        Right,
    }

    impl Problem for Line {
        type State = u32;
        type Action = Step;
        type Key = u32;

        fn initial_state(&self) -> &u32 {
            &self.start
        }

        fn goal_state(&self) -> &u32 {
            &self.end
        }

        fn actions(&self, _state: &u32) -> &[Step] {
            &[Step::Left, Step::Right]
        }

        fn applicable(&self, state: &u32, action: Step) -> bool {
            match action {
                Step::Left => *state > 0,
                Step::Right => *state + 1 < self.len,
            }
        }

        fn result(&self, state: &u32, action: Step) -> Option<u32> {
            if !self.applicable(state, action) {
                return None;
            }
            Some(match action {
                Step::Left => state - 1,
                Step::Right => state + 1,
            })
        }

        fn step_cost(&self, _state: &u32, _action: Step) -> u32 {
            1
        }

        fn solvable(&self) -> bool {
            self.end < self.len
        }

        fn cycle_key(&self, state: &u32) -> u32 {
            *state
        }
    }

    fn distance(state: &u32, goal: &u32) -> u32 {
        state.abs_diff(*goal)
    }

    #[test_log::test]
    fn test_solved_board_needs_no_moves() {
        let goal = Board::solved(3).unwrap();
        let problem = NPuzzleProblem::new(goal.clone(), goal.clone()).unwrap();
        let mut search = manhattan_search(&goal);
        let solution = search.search(&problem).into_solution().unwrap();
        assert!(solution.is_empty());
        assert_eq!(solution.cost, 0);
        assert_eq!(search.stats().nodes_expanded, 0);
        assert_eq!(search.stats().iterations, 1);
    }

    #[test_log::test]
    fn test_one_move_away() {
        let goal = Board::solved(3).unwrap();
        let problem = NPuzzleProblem::new(board(3, &[1, 2, 3, 4, 5, 6, 7, 0, 8]), goal.clone()).unwrap();
        let solution = manhattan_search(&goal).search(&problem).into_solution().unwrap();
        assert_eq!(solution.moves, vec![Direction::Right]);
        assert_eq!(solution.states, vec![goal]);
    }

    #[test_log::test]
    fn test_unsolvable_fails_fast() {
        let goal = Board::solved(3).unwrap();
        let problem = NPuzzleProblem::new(board(3, &[2, 1, 3, 4, 5, 6, 7, 8, 0]), goal.clone()).unwrap();
        let mut search = manhattan_search(&goal);
        assert_eq!(search.search(&problem), SearchOutcome::Unsolvable);
        assert_eq!(search.stats(), SearchStats::default());
    }

    #[test_log::test]
    fn test_unsolvable_2x2_exhausts_without_check() {
        let goal = Board::solved(2).unwrap();
        let problem = NPuzzleProblem::new(board(2, &[2, 1, 3, 0]), goal.clone()).unwrap();
        let limits = SearchLimits {
            check_solvability: false,
            ..SearchLimits::default()
        };

        let mut ida = manhattan_search(&goal).with_limits(limits);
        assert_eq!(ida.search(&problem), SearchOutcome::Exhausted);
        assert!(ida.stats().nodes_expanded > 0);

        let mut astar = AStar::new(Heuristic::with_cache(
            HeuristicKind::Manhattan,
            &goal,
            Arc::new(PdbCache::new()),
        ))
        .with_limits(limits);
        assert_eq!(astar.search(&problem), SearchOutcome::Exhausted);
        // Half of the 24 arrangements share the start's parity.
        assert_eq!(astar.stats().nodes_expanded, 12);
    }

    #[test_log::test]
    fn test_expansion_limit() {
        let goal = Board::solved(3).unwrap();
        let problem = NPuzzleProblem::new(board(3, &[8, 6, 7, 2, 5, 4, 3, 0, 1]), goal.clone()).unwrap();
        let limits = SearchLimits {
            max_expansions: Some(10),
            ..SearchLimits::default()
        };
        let mut ida = manhattan_search(&goal).with_limits(limits);
        assert_eq!(ida.search(&problem), SearchOutcome::LimitReached);
        assert!(ida.stats().nodes_expanded >= 10);

        let mut astar = AStar::new(Heuristic::new(HeuristicKind::Manhattan, &goal)).with_limits(limits);
        assert_eq!(astar.search(&problem), SearchOutcome::LimitReached);
        assert_eq!(astar.stats().nodes_expanded, 10);
    }

    #[test_log::test]
    fn test_algorithms_agree_on_cost() {
        let goal = Board::solved(3).unwrap();
        let initial = board(3, &[4, 1, 3, 7, 2, 6, 0, 5, 8]);
        let problem = NPuzzleProblem::new(initial.clone(), goal.clone()).unwrap();

        let ida = manhattan_search(&goal).search(&problem).into_solution().unwrap();
        let mut astar = AStar::new(Heuristic::new(HeuristicKind::LinearConflict, &goal));
        let best = astar.search(&problem).into_solution().unwrap();
        assert_eq!(ida.cost, 6);
        assert_eq!(best.cost, 6);
        assert_eq!(replay(&initial, &ida.moves), Some(goal.clone()));
        assert_eq!(replay(&initial, &best.moves), Some(goal));
    }

    #[test_log::test]
    fn test_generic_problem_with_closure_predictor() {
        let line = Line { start: 2, end: 7, len: 10 };
        let mut ida = IdaStar::new(distance);
        let solution = ida.search(&line).into_solution().unwrap();
        assert_eq!(solution.moves, vec![Step::Right; 5]);
        assert_eq!(solution.states, vec![3, 4, 5, 6, 7]);
        // A perfect estimate walks straight to the goal.
        assert_eq!(ida.stats().iterations, 1);
        assert_eq!(ida.stats().nodes_expanded, 5);

        let mut ucs = AStar::new(|_: &u32, _: &u32| 0u32).with_evaluation(Evaluation::PathCost);
        assert_eq!(ucs.search(&line).into_solution().map(|s| s.cost), Some(5));

        let unreachable = Line { start: 0, end: 12, len: 10 };
        assert_eq!(ida.search(&unreachable), SearchOutcome::Unsolvable);
    }

    #[test_log::test]
    fn test_solve_uses_configured_algorithm() {
        let goal = Board::solved(3).unwrap();
        let problem = NPuzzleProblem::new(board(3, &[4, 1, 3, 7, 2, 6, 0, 5, 8]), goal).unwrap();
        let cache = Arc::new(PdbCache::new());
        for algorithm in [Algorithm::IdaStar, Algorithm::AStar] {
            let config = SolverConfig {
                algorithm,
                heuristic: HeuristicKind::DisjointPdb,
                patterns: Some(vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]),
                ..SolverConfig::default()
            };
            let (outcome, stats) = solve(&problem, &config, Arc::clone(&cache)).unwrap();
            assert_eq!(outcome.solution().map(|s| s.len()), Some(6), "{:?}", algorithm);
            assert!(stats.nodes_expanded >= 6);
        }
        assert_eq!(cache.len(), 2);

        let bad = SolverConfig {
            patterns: Some(vec![vec![1, 2], vec![2]]),
            ..SolverConfig::default()
        };
        assert!(solve(&problem, &bad, cache).is_err());
    }

    #[test]
    fn test_replay_rejects_illegal_moves() {
        let goal = Board::solved(2).unwrap();
        assert_eq!(replay(&goal, &[Direction::Down]), None);
        assert_eq!(replay(&goal, &[]), Some(goal.clone()));
    }
}
