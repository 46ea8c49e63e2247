//! A W-method variant that reorders and prunes its test suite.

use tracing::debug;

use super::{run_test, CounterexampleHook, EquivalenceChecker};
use crate::cover::state_cover;
use crate::distset::{distinguishing_set, Method};
use crate::machine::Machine;
use crate::math::{Map, Set};
use crate::sul::Sul;
use crate::teacher::QueryStats;
use crate::word::{concat, words_up_to, Output, Symbol, Word};

/// How the per-access-sequence test batches are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestOrder {
    /// Breadth-first discovery order of the state cover.
    #[default]
    Discovery,
    /// Batches whose access sequence produced counterexamples in earlier checks first.
    CounterexampleCount,
}

/// The W-method suite with knobs for finding counterexamples cheaper.
///
/// Functionally this checker accepts and rejects exactly like [`super::WmethodChecker`],
/// it only spends its test queries differently. `horizon` caps the length of the middle
/// sections, `stop_on` names output tokens that are fatal for the system under learning:
/// once one is observed the rest of the batch behind that access sequence is pointless
/// and gets skipped. Counterexample counts per access sequence persist across calls and
/// feed the [`TestOrder::CounterexampleCount`] ordering.
pub struct SmartWmethodChecker<S: Symbol, O: Output> {
    m: usize,
    method: Method,
    horizon: Option<usize>,
    stop_on: Set<O>,
    order: TestOrder,
    ce_counts: Map<Word<S>, usize>,
    hooks: Vec<CounterexampleHook<S>>,
}

impl<S: Symbol, O: Output> SmartWmethodChecker<S, O> {
    /// Creates a checker with the given bound on the true system's state count.
    pub fn new(m: usize) -> Self {
        Self {
            m,
            method: Method::Hopcroft,
            horizon: None,
            stop_on: Set::default(),
            order: TestOrder::default(),
            ce_counts: Map::default(),
            hooks: Vec::new(),
        }
    }

    /// Caps the length of the middle sections.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Declares outputs that abort the remaining batch once observed.
    pub fn stop_on(mut self, outputs: impl IntoIterator<Item = O>) -> Self {
        self.stop_on.extend(outputs);
        self
    }

    /// Selects the batch ordering heuristic.
    pub fn with_order(mut self, order: TestOrder) -> Self {
        self.order = order;
        self
    }

    /// Selects the refinement algorithm used for the characterization set.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

impl<M: Machine> EquivalenceChecker<M> for SmartWmethodChecker<M::Symbol, M::Out> {
    fn test_equivalence(
        &mut self,
        sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
        hypothesis: &mut M,
        stats: &mut QueryStats,
    ) -> Result<(), Word<M::Symbol>> {
        let n = hypothesis.size();
        let mut extra = self.m.saturating_sub(n) + 1;
        if let Some(horizon) = self.horizon {
            extra = extra.min(horizon);
        }
        let dset = distinguishing_set(hypothesis, self.method);
        let middles = words_up_to(&hypothesis.alphabet(), extra);

        let mut batches = state_cover(hypothesis);
        if self.order == TestOrder::CounterexampleCount {
            // stable, so equal counts keep their discovery order
            batches.sort_by_key(|access| {
                std::cmp::Reverse(self.ce_counts.get(access).copied().unwrap_or(0))
            });
        }
        debug!(
            "smart w-method over {} batches, middle sections up to {extra} symbols",
            batches.len()
        );

        let mut seen: Set<Word<M::Symbol>> = Set::default();
        for access in &batches {
            'batch: for middle in &middles {
                let base = concat(access, middle);
                if !base.is_empty() && seen.insert(base.clone()) {
                    match run_test(sul, hypothesis, stats, &base, &mut self.hooks) {
                        Err(counterexample) => {
                            *self.ce_counts.entry(access.clone()).or_default() += 1;
                            return Err(counterexample);
                        }
                        Ok(out) => {
                            if self.stop_on.contains(&out) {
                                debug!(
                                    "fatal output {:?}, skipping the rest of this batch",
                                    out
                                );
                                break 'batch;
                            }
                        }
                    }
                }
                for suffix in &dset {
                    let test = concat(&base, suffix);
                    if test.is_empty() || !seen.insert(test.clone()) {
                        continue;
                    }
                    if let Err(counterexample) =
                        run_test(sul, hypothesis, stats, &test, &mut self.hooks)
                    {
                        *self.ce_counts.entry(access.clone()).or_default() += 1;
                        return Err(counterexample);
                    }
                }
            }
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

    fn mutant() -> Mealy<char, &'static str> {
        Mealy::builder()
            .with_edge("1", 'a', "nice", "2")
            .with_edge("1", 'b', "B", "1")
            .with_edge("2", 'a', "nice", "3")
            .with_edge("2", 'b', "back", "1")
            .with_edge("3", 'a', "WRONG", "3")
            .with_edge("3", 'b', "back", "1")
            .build()
            .unwrap()
    }

    #[test]
    fn behaves_like_the_plain_w_method_on_mutants() {
        let mut sul = target();
        let mut hyp = mutant();
        let mut stats = QueryStats::default();
        let mut checker = SmartWmethodChecker::new(3);
        let counterexample = checker
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .unwrap_err();
        sul.reset();
        hyp.reset();
        assert_ne!(sul.process(&counterexample), hyp.process(&counterexample));
    }

    #[test]
    fn knobs_do_not_lose_counterexamples() {
        let mut sul = target();
        let mut hyp = mutant();
        let mut stats = QueryStats::default();
        let mut checker = SmartWmethodChecker::new(3)
            .with_horizon(2)
            .stop_on([Some("unused")])
            .with_order(TestOrder::CounterexampleCount);
        assert!(checker
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .is_err());
    }

    #[test]
    fn fatal_outputs_skip_the_rest_of_the_batch() {
        let mut sul = target();
        let mut hyp = target();

        let mut plain = SmartWmethodChecker::new(3);
        let mut plain_stats = QueryStats::default();
        assert!(plain
            .test_equivalence(&mut sul, &mut hyp, &mut plain_stats)
            .is_ok());

        // declaring a common output fatal prunes tests without breaking acceptance
        let mut pruned = SmartWmethodChecker::new(3).stop_on([Some("back")]);
        let mut pruned_stats = QueryStats::default();
        assert!(pruned
            .test_equivalence(&mut sul, &mut hyp, &mut pruned_stats)
            .is_ok());
        assert!(pruned_stats.tests < plain_stats.tests);
    }

    #[test]
    fn counterexample_counts_persist_across_checks() {
        let mut sul = target();
        let mut hyp = mutant();
        let mut checker =
            SmartWmethodChecker::new(3).with_order(TestOrder::CounterexampleCount);

        let mut first = QueryStats::default();
        assert!(checker
            .test_equivalence(&mut sul, &mut hyp, &mut first)
            .is_err());
        // the second run starts in the batch that paid off before
        let mut second = QueryStats::default();
        assert!(checker
            .test_equivalence(&mut sul, &mut hyp, &mut second)
            .is_err());
        assert!(second.tests <= first.tests);
    }
}
