//! The TTT discrimination-tree algorithm.

use std::time::Instant;

use tracing::{debug, info, trace};

use super::{cached_query, BuildHypothesis};
use crate::machine::Machine;
use crate::math::Map;
use crate::sul::Sul;
use crate::teacher::Teacher;
use crate::word::{self, concat, push, Output, Symbol, Word};
use crate::Error;

const ITERATION_THRESHOLD: usize = if cfg!(debug_assertions) { 300 } else { 200_000 };

/// Identifies a node in a [`DiscriminationTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    /// An inner node, labeled with a distinguishing suffix.
    Inner(usize),
    /// A leaf, corresponding to one hypothesis state.
    Leaf(usize),
}

#[derive(Debug, Clone)]
struct InnerNode<S: Symbol, O: Output> {
    suffix: Word<S>,
    // children keyed by the output observed on the suffix, in insertion order
    children: Vec<(O, NodeId)>,
    parent: Option<usize>,
}

#[derive(Debug, Clone)]
struct LeafNode<S: Symbol> {
    access: Word<S>,
    parent: Option<usize>,
}

/// The discrimination tree at the heart of TTT.
///
/// Inner nodes carry a distinguishing suffix and route by the output observed when that
/// suffix is played after a word; leaves carry the access word of one hypothesis state.
/// For acceptors the children of a node are exactly the two boolean outcomes, for
/// transducers there is one child per output token ever observed. For any two leaves,
/// the suffix at their lowest common ancestor tells their states apart. Suffixes are only
/// ever added, never removed, so a distinction found once stays found.
#[derive(Debug, Clone)]
pub struct DiscriminationTree<S: Symbol, O: Output> {
    inner: Vec<InnerNode<S, O>>,
    leaves: Vec<LeafNode<S>>,
    root: NodeId,
}

impl<S: Symbol, O: Output> DiscriminationTree<S, O> {
    fn new() -> Self {
        Self {
            inner: Vec::new(),
            leaves: vec![LeafNode {
                access: Vec::new(),
                parent: None,
            }],
            root: NodeId::Leaf(0),
        }
    }

    /// The number of leaves, which is the number of hypothesis states.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// The number of inner nodes, which is the number of distinguishing suffixes.
    pub fn inner_count(&self) -> usize {
        self.inner.len()
    }

    /// The access word of a leaf.
    pub fn access(&self, leaf: usize) -> &Word<S> {
        &self.leaves[leaf].access
    }

    /// Routes `word` from the root to a leaf, querying `word · suffix` at every inner
    /// node. If an inner node has no child for the observed output, a fresh leaf with
    /// access word `word` is grown there; the flag reports whether that happened.
    fn sift(&mut self, word: &[S], query: &mut dyn FnMut(&[S]) -> O) -> (usize, bool) {
        let mut current = self.root;
        loop {
            match current {
                NodeId::Leaf(leaf) => return (leaf, false),
                NodeId::Inner(node) => {
                    let out = query(&concat(word, &self.inner[node].suffix));
                    match self.inner[node]
                        .children
                        .iter()
                        .find(|(key, _)| *key == out)
                    {
                        Some((_, child)) => current = *child,
                        None => {
                            let leaf = self.leaves.len();
                            self.leaves.push(LeafNode {
                                access: word.to_vec(),
                                parent: Some(node),
                            });
                            self.inner[node].children.push((out, NodeId::Leaf(leaf)));
                            return (leaf, true);
                        }
                    }
                }
            }
        }
    }

    /// Splits `leaf` on `suffix`: the leaf keeps its access word and moves below a new
    /// inner node under `old_out`, a fresh leaf for `new_access` appears under `new_out`.
    fn split_leaf(
        &mut self,
        leaf: usize,
        suffix: Word<S>,
        old_out: O,
        new_access: Word<S>,
        new_out: O,
    ) -> usize {
        debug_assert!(old_out != new_out, "a split needs differing outputs");
        let parent = self.leaves[leaf].parent;
        let node = self.inner.len();
        let new_leaf = self.leaves.len();
        self.leaves.push(LeafNode {
            access: new_access,
            parent: Some(node),
        });
        self.inner.push(InnerNode {
            suffix,
            children: vec![
                (old_out, NodeId::Leaf(leaf)),
                (new_out, NodeId::Leaf(new_leaf)),
            ],
            parent,
        });
        self.leaves[leaf].parent = Some(node);
        match parent {
            None => self.root = NodeId::Inner(node),
            Some(p) => {
                let slot = self.inner[p]
                    .children
                    .iter_mut()
                    .find(|(_, child)| *child == NodeId::Leaf(leaf))
                    .expect("the split leaf hangs off its parent");
                slot.1 = NodeId::Inner(node);
            }
        }
        new_leaf
    }
}

/// An implementation of the TTT algorithm.
///
/// The hypothesis states are exactly the leaves of a discrimination tree and transitions
/// are found by sifting each state's one-symbol extensions down the tree. A
/// counterexample is decomposed by binary search into a single new distinguishing suffix
/// that splits one leaf. Old distinctions are never re-derived, which is what puts the
/// query complexity below L* on larger systems.
pub struct TttLearner<'a, T, H>
where
    T: Sul,
    H: BuildHypothesis<Symbol = T::Symbol, Out = T::Out>,
{
    teacher: &'a mut Teacher<T, H>,
    tree: DiscriminationTree<T::Symbol, T::Out>,
    queries: Map<Word<T::Symbol>, T::Out>,
    on_hypothesis: Option<Box<dyn FnMut(&H) + 'a>>,
    intermediate: bool,
}

impl<'a, T, H> TttLearner<'a, T, H>
where
    T: Sul,
    H: BuildHypothesis<Symbol = T::Symbol, Out = T::Out>,
{
    /// Creates a learner that talks to `teacher`.
    pub fn new(teacher: &'a mut Teacher<T, H>) -> Self {
        Self {
            teacher,
            tree: DiscriminationTree::new(),
            queries: Map::default(),
            on_hypothesis: None,
            intermediate: true,
        }
    }

    /// Registers a callback invoked on emitted hypotheses.
    pub fn on_hypothesis(mut self, callback: impl FnMut(&H) + 'a) -> Self {
        self.on_hypothesis = Some(Box::new(callback));
        self
    }

    /// Controls whether intermediate hypotheses are passed to the callback or only the
    /// final one. Defaults to emitting all of them.
    pub fn intermediate_hypotheses(mut self, intermediate: bool) -> Self {
        self.intermediate = intermediate;
        self
    }

    /// The discrimination tree in its current shape.
    pub fn tree(&self) -> &DiscriminationTree<T::Symbol, T::Out> {
        &self.tree
    }

    fn output(&mut self, input: &[T::Symbol]) -> T::Out {
        cached_query(&mut self.queries, self.teacher, input)
    }

    /// Sifts every state's one-symbol extensions until no new leaves appear.
    fn close_tree(&mut self) {
        let alphabet = self.teacher.alphabet().to_vec();
        let mut leaf = 0;
        while leaf < self.tree.leaf_count() {
            let access = self.tree.access(leaf).clone();
            for sym in &alphabet {
                let word = push(&access, sym);
                let (tree, queries, teacher) =
                    (&mut self.tree, &mut self.queries, &mut self.teacher);
                let mut query = |input: &[T::Symbol]| cached_query(queries, &mut **teacher, input);
                let (target, fresh) = tree.sift(&word, &mut query);
                if fresh {
                    trace!(
                        "discovered state {} with access {}",
                        target,
                        word::show(&word)
                    );
                }
            }
            leaf += 1;
        }
    }

    fn hypothesis(&mut self) -> Result<H, Error> {
        self.close_tree();
        let alphabet = self.teacher.alphabet().to_vec();
        let count = self.tree.leaf_count();

        let mut states = Vec::with_capacity(count);
        let mut edges = Vec::new();
        for leaf in 0..count {
            let access = self.tree.access(leaf).clone();
            let (tree, queries, teacher) = (&mut self.tree, &mut self.queries, &mut self.teacher);
            let mut query = |input: &[T::Symbol]| cached_query(queries, &mut **teacher, input);
            states.push((access.clone(), H::state_label(&access, &mut query)?));
            for sym in &alphabet {
                let word = push(&access, sym);
                let (target, fresh) = tree.sift(&word, &mut query);
                debug_assert!(!fresh, "the tree is closed at this point");
                let out = H::edge_label(&access, sym, &mut query)?;
                edges.push((leaf, sym.clone(), out, target));
            }
        }
        H::assemble(&alphabet, states, edges)
    }

    fn probe(&mut self, leaf: usize, suffix: &[T::Symbol]) -> T::Out {
        let access = self.tree.access(leaf).clone();
        self.output(&concat(&access, suffix))
    }

    /// Decomposes `counterexample` and splits one leaf.
    ///
    /// With `q_i` the hypothesis state after `i` symbols, the probe outputs
    /// `T(access(q_i) · counterexample[i..])` start at the target's verdict and end at
    /// the hypothesis's, so somewhere two neighbors disagree. Binary search finds that
    /// spot; the tail behind it is the new suffix, the state reached there the leaf to
    /// split.
    fn refine(&mut self, counterexample: &[T::Symbol], hypothesis: &H) {
        let mut path = Vec::with_capacity(counterexample.len() + 1);
        let mut state = hypothesis.initial();
        path.push(state);
        for sym in counterexample {
            state = hypothesis
                .successor(state, sym)
                .expect("hypotheses are total");
            path.push(state);
        }

        let n = counterexample.len();
        let target_out = self.output(counterexample);
        let mut lo = 0;
        let mut hi = n;
        // for transducers the last probe can coincide with the target's output, one step
        // back it equals the hypothesis's output and cannot
        if self.probe(path[hi] as usize, &counterexample[hi..]) == target_out {
            hi = n - 1;
        }
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.probe(path[mid] as usize, &counterexample[mid..]) == target_out {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let access_lo = self.tree.access(path[lo] as usize).clone();
        let new_access = push(&access_lo, &counterexample[lo]);
        let suffix = counterexample[lo + 1..].to_vec();
        let split = path[lo + 1] as usize;
        let new_out = self.output(&concat(&new_access, &suffix));
        let old_out = self.probe(split, &suffix);
        trace!(
            "splitting leaf {} on suffix {}",
            split,
            word::show(&suffix)
        );
        self.tree
            .split_leaf(split, suffix, old_out, new_access, new_out);
    }

    /// Runs the learning loop to completion and returns the certified hypothesis.
    pub fn run(mut self) -> Result<H, Error> {
        let start = Instant::now();
        let mut iteration = 0;
        while iteration < ITERATION_THRESHOLD {
            iteration += 1;
            let mut hypothesis = self.hypothesis()?;
            trace!(
                "iteration {iteration}, hypothesis with {} states",
                hypothesis.size()
            );
            if self.intermediate {
                if let Some(callback) = self.on_hypothesis.as_mut() {
                    callback(&hypothesis);
                }
            }
            match self.teacher.equivalence_query(&mut hypothesis) {
                Ok(()) => {
                    if !self.intermediate {
                        if let Some(callback) = self.on_hypothesis.as_mut() {
                            callback(&hypothesis);
                        }
                    }
                    info!(
                        "learned a {} state hypothesis in {}ms",
                        hypothesis.size(),
                        start.elapsed().as_millis()
                    );
                    return Ok(hypothesis);
                }
                Err(counterexample) => {
                    debug!("counterexample {}", word::show(&counterexample));
                    self.refine(&counterexample, &hypothesis);
                }
            }
        }
        panic!("iteration threshold exceeded")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Dfa, Mealy};
    use crate::sul::Sul;
    use crate::oracle::{BoundedChecker, EquivalenceChecker, WmethodChecker};
    use crate::teacher::Teacher;

    fn dfa_target() -> Dfa<char> {
        Dfa::builder()
            .with_edge("s1", 'a', "s2")
            .with_edge("s1", 'b', "s1")
            .with_edge("s2", 'a', "s2")
            .with_edge("s2", 'b', "s3")
            .with_edge("s3", 'a', "s3")
            .with_edge("s3", 'b', "s3")
            .accepting(["s3"])
            .build()
            .unwrap()
    }

    fn mealy_target() -> Mealy<char, &'static str> {
        Mealy::builder()
            .with_edge("1", 'a', "nice", "2")
            .with_edge("1", 'b', "B", "1")
            .with_edge("2", 'a', "nice", "3")
            .with_edge("2", 'b', "back", "1")
            .with_edge("3", 'a', "A", "3")
            .with_edge("3", 'b', "back", "1")
            .build()
            .unwrap()
    }

    fn wide_mealy() -> Mealy<char, &'static str> {
        Mealy::builder()
            .with_edge("p", 'a', "ok", "q")
            .with_edge("p", 'b', "ok", "p")
            .with_edge("q", 'a', "ok", "r")
            .with_edge("q", 'b', "hold", "q")
            .with_edge("r", 'a', "ok", "s")
            .with_edge("r", 'b', "hold", "p")
            .with_edge("s", 'a', "done", "t")
            .with_edge("s", 'b', "hold", "r")
            .with_edge("t", 'a', "done", "t")
            .with_edge("t", 'b', "reset", "p")
            .build()
            .unwrap()
    }

    #[test_log::test]
    fn ttt_dfa_bruteforce() {
        let mut teacher: Teacher<_, Dfa<char>> =
            Teacher::new(dfa_target(), BoundedChecker::new(4));
        let mut hypothesis = TttLearner::new(&mut teacher).run().unwrap();
        assert_eq!(hypothesis.size(), 3);
        hypothesis.reset();
        assert!(hypothesis.process(&['a', 'b']));
    }

    #[test_log::test]
    fn ttt_dfa_wmethod() {
        let mut teacher: Teacher<_, Dfa<char>> =
            Teacher::new(dfa_target(), WmethodChecker::new(3));
        let mut hypothesis = TttLearner::new(&mut teacher).run().unwrap();
        assert_eq!(hypothesis.size(), 3);

        let mut check = WmethodChecker::new(3);
        let mut stats = Default::default();
        assert!(check
            .test_equivalence(&mut dfa_target(), &mut hypothesis, &mut stats)
            .is_ok());
    }

    #[test_log::test]
    fn ttt_mealy_wmethod() {
        let mut teacher: Teacher<_, Mealy<char, &'static str>> =
            Teacher::new(mealy_target(), WmethodChecker::new(3));
        let mut hypothesis = TttLearner::new(&mut teacher).run().unwrap();
        assert_eq!(hypothesis.size(), 3);
        hypothesis.reset();
        assert_eq!(hypothesis.process(&['a', 'a', 'a']), Some("A"));
    }

    #[test_log::test]
    fn ttt_learns_a_wider_machine() {
        let mut teacher: Teacher<_, Mealy<char, &'static str>> =
            Teacher::new(wide_mealy(), WmethodChecker::new(5));
        let mut hypothesis = TttLearner::new(&mut teacher).run().unwrap();
        assert_eq!(hypothesis.size(), 5);

        let mut check = WmethodChecker::new(5);
        let mut stats = Default::default();
        assert!(check
            .test_equivalence(&mut wide_mealy(), &mut hypothesis, &mut stats)
            .is_ok());
    }

    #[test]
    fn the_tree_ends_with_one_leaf_per_state() {
        let mut teacher: Teacher<_, Mealy<char, &'static str>> =
            Teacher::new(mealy_target(), WmethodChecker::new(3));
        // drive the loop by hand to keep access to the tree
        let mut learner = TttLearner::new(&mut teacher);
        let mut hypothesis = learner.hypothesis().unwrap();
        let mut suffixes = learner.tree().inner_count();
        while let Err(counterexample) = learner.teacher.equivalence_query(&mut hypothesis) {
            learner.refine(&counterexample, &hypothesis);
            // refinement only ever adds distinguishing suffixes
            assert!(learner.tree().inner_count() > suffixes);
            suffixes = learner.tree().inner_count();
            hypothesis = learner.hypothesis().unwrap();
        }
        assert_eq!(learner.tree().leaf_count(), hypothesis.size());
    }
}
