//! The open list of best-first search.
use crate::problem::Node;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::rc::Rc;

/// Which node value orders the frontier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Evaluation {
    /// f = g + h (A*).
    #[default]
    Total,
    /// g alone (uniform-cost search).
    PathCost,
    /// h alone (greedy best-first).
    Estimate,
}

impl Evaluation {
    pub fn score<S, A: Copy>(self, node: &Node<S, A>) -> u32 {
        match self {
            Evaluation::Total => node.evaluation(),
            Evaluation::PathCost => node.path_cost(),
            Evaluation::Estimate => node.estimate(),
        }
    }
}

/// A priority queue of nodes with at most one entry per state.
///
/// Nodes leave in ascending score. Equal scores leave in insertion order; a
/// node that replaced an older entry counts as inserted at replacement time.
#[derive(Debug)]
pub struct Frontier<S, A> {
    evaluation: Evaluation,
    queue: BTreeMap<(u32, u64), Rc<Node<S, A>>>,
    slots: HashMap<S, (u32, u64)>,
    next_seq: u64,
}

impl<S, A> Frontier<S, A>
where
    S: Clone + Eq + Hash,
    A: Copy,
{
    pub fn new(evaluation: Evaluation) -> Self {
        Frontier {
            evaluation,
            queue: BTreeMap::new(),
            slots: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Adds `node`, or improves the entry for its state.
    ///
    /// If the state is already queued, the new node replaces it only when it
    /// scores strictly lower; otherwise the offer is discarded.
    ///
    /// # Returns
    /// `true` if the node is now in the frontier.
    pub fn offer(&mut self, node: Rc<Node<S, A>>) -> bool {
        let score = self.evaluation.score(&node);
        if let Some(&old) = self.slots.get(node.state()) {
            if score >= old.0 {
                return false;
            }
            self.queue.remove(&old);
        }
        let slot = (score, self.next_seq);
        self.next_seq += 1;
        self.slots.insert(node.state().clone(), slot);
        self.queue.insert(slot, node);
        true
    }

    /// Removes and returns the lowest-scoring node.
    pub fn poll(&mut self) -> Option<Rc<Node<S, A>>> {
        let (_, node) = self.queue.pop_first()?;
        self.slots.remove(node.state());
        Some(node)
    }

    /// The node `poll` would return next.
    pub fn peek(&self) -> Option<&Rc<Node<S, A>>> {
        self.queue.first_key_value().map(|(_, node)| node)
    }

    /// Whether a node for the same state is queued.
    pub fn contains(&self, node: &Node<S, A>) -> bool {
        self.contains_state(node.state())
    }

    pub fn contains_state(&self, state: &S) -> bool {
        self.slots.contains_key(state)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.slots.clear();
    }
}
