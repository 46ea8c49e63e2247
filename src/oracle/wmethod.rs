//! The classic W-method conformance test.

use tracing::debug;

use super::{run_test, CounterexampleHook, EquivalenceChecker};
use crate::cover::state_cover;
use crate::distset::{distinguishing_set, Method};
use crate::machine::Machine;
use crate::math::Set;
use crate::sul::Sul;
use crate::teacher::QueryStats;
use crate::word::{concat, words_up_to, Symbol, Word};

/// Conformance testing after Chow: a state cover of the hypothesis, middle sections of up
/// to `m - n + 1` extra symbols and a characterization set of distinguishing suffixes.
///
/// `m` is the caller's upper bound on the state count of the true system, `n` the size of
/// the hypothesis. With `m` at least the true count, a passing run certifies equivalence.
/// The characterization set is computed from the hypothesis unless one is supplied.
pub struct WmethodChecker<S: Symbol> {
    m: usize,
    method: Method,
    dset: Option<Vec<Word<S>>>,
    hooks: Vec<CounterexampleHook<S>>,
}

impl<S: Symbol> WmethodChecker<S> {
    /// Creates a checker with the given bound on the true system's state count.
    pub fn new(m: usize) -> Self {
        Self {
            m,
            method: Method::Hopcroft,
            dset: None,
            hooks: Vec::new(),
        }
    }

    /// Selects the refinement algorithm used for the characterization set.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Supplies a characterization set instead of computing one per hypothesis.
    pub fn with_dset(mut self, dset: Vec<Word<S>>) -> Self {
        self.dset = Some(dset);
        self
    }
}

/// Generates the W-method test suite for `hypothesis`, deduplicated and in deterministic
/// order.
///
/// Every access-and-middle section runs twice: once with each distinguishing suffix
/// appended and once bare. Only the last output of a trace is compared, so a diverging
/// transition whose successor states the suffixes cannot tell apart is caught by nothing
/// but the bare run. The bare characterization sequences from the initial state come out
/// of the same rule, through the empty access sequence and the empty middle section.
pub fn wmethod_suite<M: Machine>(
    hypothesis: &M,
    m: usize,
    dset: &[Word<M::Symbol>],
) -> Vec<Word<M::Symbol>> {
    let n = hypothesis.size();
    let extra = m.saturating_sub(n) + 1;
    let cover = state_cover(hypothesis);
    let middles = words_up_to(&hypothesis.alphabet(), extra);

    let mut seen: Set<Word<M::Symbol>> = Set::default();
    let mut suite = Vec::new();
    for access in &cover {
        for middle in &middles {
            let base = concat(access, middle);
            if !base.is_empty() && seen.insert(base.clone()) {
                suite.push(base.clone());
            }
            for suffix in dset {
                let test = concat(&base, suffix);
                if !test.is_empty() && seen.insert(test.clone()) {
                    suite.push(test);
                }
            }
        }
    }
    suite
}

impl<M: Machine> EquivalenceChecker<M> for WmethodChecker<M::Symbol> {
    fn test_equivalence(
        &mut self,
        sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
        hypothesis: &mut M,
        stats: &mut QueryStats,
    ) -> Result<(), Word<M::Symbol>> {
        let dset = match &self.dset {
            Some(dset) => dset.clone(),
            None => distinguishing_set(hypothesis, self.method),
        };
        let suite = wmethod_suite(hypothesis, self.m, &dset);
        debug!(
            "w-method suite of {} tests for {} hypothesis states",
            suite.len(),
            hypothesis.size()
        );
        for test in &suite {
            run_test(sul, hypothesis, stats, test, &mut self.hooks)?;
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

    fn with_output(edges: [(&'static str, char, &'static str, &'static str); 6]) -> Mealy<char, &'static str> {
        let mut builder = Mealy::builder();
        for (from, input, output, to) in edges {
            builder = builder.with_edge(from, input, output, to);
        }
        builder.build().unwrap()
    }

    #[test]
    fn identical_machines_pass() {
        let mut sul = target();
        let mut hyp = target();
        let mut stats = QueryStats::default();
        assert!(WmethodChecker::new(3)
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .is_ok());
        assert!(stats.tests > 0);
    }

    #[test]
    fn a_single_changed_output_is_detected() {
        let mut sul = target();
        let mut mutant = with_output([
            ("1", 'a', "nice", "2"),
            ("1", 'b', "B", "1"),
            ("2", 'a', "nice", "3"),
            ("2", 'b', "back", "1"),
            ("3", 'a', "WRONG", "3"),
            ("3", 'b', "back", "1"),
        ]);
        let mut stats = QueryStats::default();
        let counterexample = WmethodChecker::new(3)
            .test_equivalence(&mut sul, &mut mutant, &mut stats)
            .unwrap_err();
        // the reported sequence really does tell the machines apart
        sul.reset();
        mutant.reset();
        assert_ne!(sul.process(&counterexample), mutant.process(&counterexample));
    }

    // A single-state hypothesis has an empty characterization set, so the whole suite
    // consists of bare sections. Dropping those would leave nothing to replay and the
    // check would silently certify a wrong hypothesis.
    #[test]
    fn divergence_past_the_suffixes_needs_the_bare_tests() {
        let mut sul: Mealy<char, &'static str> = Mealy::builder()
            .with_edge("s0", 'a', "x", "s0")
            .with_edge("s0", 'b', "y", "s1")
            .with_edge("s1", 'a', "x", "s1")
            .with_edge("s1", 'b', "z", "s1")
            .build()
            .unwrap();
        let mut hyp: Mealy<char, &'static str> = Mealy::builder()
            .with_edge("h", 'a', "x", "h")
            .with_edge("h", 'b', "y", "h")
            .build()
            .unwrap();
        assert!(distinguishing_set(&hyp, Method::Hopcroft).is_empty());

        let mut stats = QueryStats::default();
        let counterexample = WmethodChecker::new(2)
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .unwrap_err();
        sul.reset();
        hyp.reset();
        assert_ne!(sul.process(&counterexample), hyp.process(&counterexample));
    }

    #[test]
    fn the_suite_contains_the_bare_characterization_sequences() {
        let hyp = target();
        let dset = distinguishing_set(&hyp, Method::Hopcroft);
        let suite = wmethod_suite(&hyp, 3, &dset);
        for suffix in &dset {
            assert!(suite.contains(suffix));
        }
        // and the suffix-less access sections themselves
        assert!(suite.contains(&vec!['a', 'a']));
    }

    #[test]
    fn an_initial_state_divergence_is_detected() {
        let mut sul = target();
        let mut mutant = with_output([
            ("1", 'a', "meh", "2"),
            ("1", 'b', "B", "1"),
            ("2", 'a', "nice", "3"),
            ("2", 'b', "back", "1"),
            ("3", 'a', "A", "3"),
            ("3", 'b', "back", "1"),
        ]);
        let mut stats = QueryStats::default();
        assert!(WmethodChecker::new(3)
            .test_equivalence(&mut sul, &mut mutant, &mut stats)
            .is_err());
    }

    #[test]
    fn a_supplied_characterization_set_is_used_as_is() {
        let mut sul = target();
        let mut hyp = target();
        let mut stats = QueryStats::default();
        let mut checker = WmethodChecker::new(3).with_dset(vec![vec!['a'], vec!['b']]);
        assert!(checker
            .test_equivalence(&mut sul, &mut hyp, &mut stats)
            .is_ok());
    }
}
