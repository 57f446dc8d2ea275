use crate::fml::ConjFml;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A proof obligation: "show this cube is not reachable at this level".
///
/// Created when a bad state is discovered at the frontier or when a
/// predecessor of an open obligation is found; destroyed when the cube is
/// blocked at its level, or fatally when one reaches level 0.
#[derive(Debug, Clone)]
pub struct Obligation {
    pub level: usize,
    pub cube: ConjFml,
}

impl Obligation {
    fn key(&self) -> (usize, usize) {
        (self.level, self.cube.len())
    }
}

impl PartialEq for Obligation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Obligation {}

impl PartialOrd for Obligation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lowest level first, so refutation or blocking happens as early as
/// possible; cube size breaks ties.
impl Ord for Obligation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-priority queue over obligations; owns the cubes until they are
/// popped.
#[derive(Debug, Default)]
pub struct ObligationQueue {
    heap: BinaryHeap<Reverse<Obligation>>,
}

impl ObligationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: usize, cube: ConjFml) {
        self.heap.push(Reverse(Obligation { level, cube }));
    }

    pub fn pop(&mut self) -> Option<Obligation> {
        self.heap.pop().map(|Reverse(obligation)| obligation)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::ast::{Ast, Int};

    fn cube_of_len(n: usize) -> ConjFml {
        ConjFml::from_clauses(
            (0..n).map(|i| Int::new_const(format!("v{i}"))._eq(&Int::from_i64(i as i64))),
        )
    }

    #[test]
    fn lowest_level_pops_first() {
        let mut queue = ObligationQueue::new();
        queue.push(3, cube_of_len(1));
        queue.push(1, cube_of_len(1));
        queue.push(2, cube_of_len(1));
        assert_eq!(queue.pop().unwrap().level, 1);
        assert_eq!(queue.pop().unwrap().level, 2);
        assert_eq!(queue.pop().unwrap().level, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn cube_size_breaks_level_ties() {
        let mut queue = ObligationQueue::new();
        queue.push(1, cube_of_len(3));
        queue.push(1, cube_of_len(1));
        assert_eq!(queue.pop().unwrap().cube.len(), 1);
        assert_eq!(queue.pop().unwrap().cube.len(), 3);
    }
}
