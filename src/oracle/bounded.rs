//! Exhaustive bounded-depth equivalence checking.

use tracing::debug;

use super::{run_test, CounterexampleHook, EquivalenceChecker};
use crate::machine::Machine;
use crate::sul::Sul;
use crate::teacher::QueryStats;
use crate::word::{words_up_to, Symbol, Word};

/// Replays every input sequence up to a maximum length against both machines, breadth
/// first over the sorted alphabet.
///
/// Exhaustive and exact up to the bound, and combinatorial beyond all hope above it. Use
/// it on small fixtures and as a cross-check for the smarter checkers.
pub struct BoundedChecker<S: Symbol> {
    max_depth: usize,
    hooks: Vec<CounterexampleHook<S>>,
}

impl<S: Symbol> BoundedChecker<S> {
    /// Creates a checker that explores all sequences of length `1..=max_depth`.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            hooks: Vec::new(),
        }
    }
}

impl<M: Machine> EquivalenceChecker<M> for BoundedChecker<M::Symbol> {
    fn test_equivalence(
        &mut self,
        sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
        hypothesis: &mut M,
        stats: &mut QueryStats,
    ) -> Result<(), Word<M::Symbol>> {
        let alphabet = sul.alphabet();
        let tests = words_up_to(&alphabet, self.max_depth);
        debug!(
            "bounded search over {} sequences up to depth {}",
            tests.len() - 1,
            self.max_depth
        );
        for input in &tests {
            if input.is_empty() {
                continue;
            }
            run_test(sul, hypothesis, stats, input, &mut self.hooks)?;
        }
        Ok(())
    }

    fn on_counterexample(&mut self, hook: CounterexampleHook<M::Symbol>) {
        self.hooks.push(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Mealy;

    fn target() -> Mealy<char, &'static str> {
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

    #[test]
    fn identical_machines_are_equivalent() {
        let mut sul = target();
        let mut hyp = target();
        let mut checker = BoundedChecker::new(4);
        let mut stats = QueryStats::default();
        assert!(checker
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .is_ok());
        assert_eq!(stats.tests, 2 + 4 + 8 + 16);
    }

    #[test]
    fn a_deep_difference_is_found_at_its_depth() {
        let mut sul = target();
        // identical except for the output of aaa
        let mut hyp = Mealy::builder()
            .with_edge("1", 'a', "nice", "2")
            .with_edge("1", 'b', "B", "1")
            .with_edge("2", 'a', "nice", "3")
            .with_edge("2", 'b', "back", "1")
            .with_edge("3", 'a', "ohno", "3")
            .with_edge("3", 'b', "back", "1")
            .build()
            .unwrap();
        let mut checker = BoundedChecker::new(4);
        let mut stats = QueryStats::default();
        let counterexample = checker
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .unwrap_err();
        assert_eq!(counterexample, vec!['a', 'a', 'a']);
    }
}
