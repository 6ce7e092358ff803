//! Search nodes and the contract between a search problem and a searcher.
//!
//! Searchers in [`crate::solver`] only see the [`Problem`] trait. The
//! sliding-tile puzzle is one implementation, [`NPuzzleProblem`].
use crate::codec::PackedCodec;
use crate::engine::{Board, Direction};
use crate::error::PuzzleError;
use std::hash::Hash;
use std::rc::Rc;

/// Estimates the remaining cost from `state` to `goal`.
///
/// Any `Fn(&S, &S) -> u32` is a predictor, so tests can pass closures.
pub trait Predictor<S> {
    fn predict(&self, state: &S, goal: &S) -> u32;
}

impl<S, F> Predictor<S> for F
where
    F: Fn(&S, &S) -> u32,
{
    fn predict(&self, state: &S, goal: &S) -> u32 {
        self(state, goal)
    }
}

/// An immutable node of the search tree.
///
/// Children hold a reference-counted link to their parent, so a path costs
/// one allocation per node no matter how many branches share its prefix.
#[derive(Debug)]
pub struct Node<S, A> {
    state: S,
    parent: Option<Rc<Node<S, A>>>,
    action: Option<A>,
    path_cost: u32,
    estimate: u32,
}

impl<S, A: Copy> Node<S, A> {
    /// A root node: no parent, no action, zero path cost.
    pub fn root(state: S, estimate: u32) -> Rc<Self> {
        Rc::new(Node {
            state,
            parent: None,
            action: None,
            path_cost: 0,
            estimate,
        })
    }

    /// A child of `parent` reached by `action`.
    pub fn child(parent: &Rc<Self>, state: S, action: A, step_cost: u32, estimate: u32) -> Rc<Self> {
        Rc::new(Node {
            state,
            parent: Some(Rc::clone(parent)),
            action: Some(action),
            path_cost: parent.path_cost + step_cost,
            estimate,
        })
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// The action that produced this node, `None` for the root.
    pub fn action(&self) -> Option<A> {
        self.action
    }

    /// Cost from the root (g).
    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    /// Predicted remaining cost (h).
    pub fn estimate(&self) -> u32 {
        self.estimate
    }

    /// f = g + h.
    pub fn evaluation(&self) -> u32 {
        self.path_cost + self.estimate
    }

    /// Number of actions between the root and this node.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self;
        while let Some(parent) = &node.parent {
            depth += 1;
            node = parent;
        }
        depth
    }

    /// The nodes from the root's first child down to `self`.
    ///
    /// The root is excluded, so the path of a root is empty and the path of
    /// any other node has exactly one entry per action.
    pub fn path(self: &Rc<Self>) -> Vec<Rc<Self>> {
        let mut path = Vec::new();
        let mut current = Rc::clone(self);
        while let Some(parent) = current.parent.clone() {
            path.push(current);
            current = parent;
        }
        path.reverse();
        path
    }
}

/// A state space with a single initial state and a single goal state.
///
/// Implementors supply the transition model; node construction and goal
/// testing have default implementations.
pub trait Problem {
    type State: Clone + Eq + Hash;
    type Action: Copy;
    /// Compact identity of a state, used for cycle detection.
    type Key: Clone + Eq + Hash;

    fn initial_state(&self) -> &Self::State;

    fn goal_state(&self) -> &Self::State;

    /// Every action the problem knows, applicable or not.
    fn actions(&self, state: &Self::State) -> &[Self::Action];

    fn applicable(&self, state: &Self::State, action: Self::Action) -> bool;

    /// The state reached by `action`, `None` if it is not applicable.
    fn result(&self, state: &Self::State, action: Self::Action) -> Option<Self::State>;

    fn step_cost(&self, state: &Self::State, action: Self::Action) -> u32;

    /// Whether the goal can be reached at all. Must be cheap.
    fn solvable(&self) -> bool;

    fn cycle_key(&self, state: &Self::State) -> Self::Key;

    fn is_goal(&self, state: &Self::State) -> bool {
        state == self.goal_state()
    }

    /// The root node, estimated with `predictor`.
    fn root<P>(&self, predictor: &P) -> Rc<Node<Self::State, Self::Action>>
    where
        P: Predictor<Self::State> + ?Sized,
    {
        let initial = self.initial_state();
        let estimate = predictor.predict(initial, self.goal_state());
        Node::root(initial.clone(), estimate)
    }

    /// One child per applicable action, in [`Problem::actions`] order.
    fn child_nodes<P>(
        &self,
        node: &Rc<Node<Self::State, Self::Action>>,
        predictor: &P,
    ) -> Vec<Rc<Node<Self::State, Self::Action>>>
    where
        P: Predictor<Self::State> + ?Sized,
    {
        let state = node.state();
        self.actions(state)
            .iter()
            .copied()
            .filter(|&action| self.applicable(state, action))
            .filter_map(|action| {
                let next = self.result(state, action)?;
                let estimate = predictor.predict(&next, self.goal_state());
                let cost = self.step_cost(state, action);
                Some(Node::child(node, next, action, cost, estimate))
            })
            .collect()
    }
}

/// Identity of a board for cycle detection.
///
/// Boards up to 4×4 use their packed key. Larger boards fall back to the
/// grid itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoardKey {
    Packed(u64),
    Grid(Board),
}

/// The sliding-tile puzzle: move the blank until `initial` becomes `goal`.
#[derive(Clone, Debug)]
pub struct NPuzzleProblem {
    initial: Board,
    goal: Board,
    codec: Option<PackedCodec>,
}

impl NPuzzleProblem {
    /// Pairs an initial board with a goal board.
    ///
    /// # Returns
    /// * `Err(PuzzleError::SizeMismatch)` if the boards differ in size.
    ///
    /// # Examples
    /// ```
    /// use npuzzle_solver::engine::Board;
    /// use npuzzle_solver::problem::{NPuzzleProblem, Problem};
    /// let goal = Board::solved(3).unwrap();
    /// let initial = Board::new(3, vec![1, 2, 3, 4, 5, 6, 7, 0, 8]).unwrap();
    /// let problem = NPuzzleProblem::new(initial, goal).unwrap();
    /// assert!(problem.solvable());
    /// ```
    pub fn new(initial: Board, goal: Board) -> Result<Self, PuzzleError> {
        if initial.size() != goal.size() {
            return Err(PuzzleError::SizeMismatch {
                initial: initial.size(),
                goal: goal.size(),
            });
        }
        let codec = PackedCodec::new(goal.size()).ok();
        Ok(NPuzzleProblem {
            initial,
            goal,
            codec,
        })
    }

    pub fn initial(&self) -> &Board {
        &self.initial
    }

    pub fn goal(&self) -> &Board {
        &self.goal
    }

    pub fn size(&self) -> usize {
        self.goal.size()
    }
}

impl Problem for NPuzzleProblem {
    type State = Board;
    type Action = Direction;
    type Key = BoardKey;

    fn initial_state(&self) -> &Board {
        &self.initial
    }

    fn goal_state(&self) -> &Board {
        &self.goal
    }

    fn actions(&self, _state: &Board) -> &[Direction] {
        &Direction::ALL
    }

    fn applicable(&self, state: &Board, action: Direction) -> bool {
        state.can_move(action)
    }

    fn result(&self, state: &Board, action: Direction) -> Option<Board> {
        state.apply(action)
    }

    fn step_cost(&self, _state: &Board, _action: Direction) -> u32 {
        1
    }

    fn solvable(&self) -> bool {
        self.initial.is_solvable_towards(&self.goal)
    }

    fn cycle_key(&self, state: &Board) -> BoardKey {
        match &self.codec {
            Some(codec) => BoardKey::Packed(codec.encode_full(state)),
            None => BoardKey::Grid(state.clone()),
        }
    }
}
