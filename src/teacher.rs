//! The teacher mediates every query between a learner and its target.

use tracing::{debug, trace};

use crate::machine::Machine;
use crate::oracle::{CheckerSpec, CounterexampleHook, EquivalenceChecker, SequentialChecker};
use crate::sul::Sul;
use crate::word::{self, Word};
use crate::Error;

/// Counters for the three kinds of queries a learning run causes.
///
/// The teacher owns the counters and hands out `Copy` snapshots, so readings taken at
/// different times stay independent. The gap between `equivalence` and `tests` is what
/// makes the cost of a single equivalence query visible: one query may replay thousands
/// of traces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryStats {
    /// Membership queries answered by the system under learning.
    pub membership: u64,
    /// Equivalence queries posed to the checker.
    pub equivalence: u64,
    /// Individual traces replayed against the system during equivalence checks.
    pub tests: u64,
}

/// Wraps one system under learning together with one equivalence checker.
///
/// Learners talk to the teacher exclusively. The teacher resets the system before every
/// membership query, delegates equivalence queries to the checker and counts everything
/// that passes through.
pub struct Teacher<T: Sul, H: Machine<Symbol = T::Symbol, Out = T::Out>> {
    sul: T,
    checker: Box<dyn EquivalenceChecker<H>>,
    stats: QueryStats,
    alphabet: Vec<T::Symbol>,
}

impl<T, H> Teacher<T, H>
where
    T: Sul,
    H: Machine<Symbol = T::Symbol, Out = T::Out>,
{
    /// Creates a teacher for `sul` with a ready-made checker.
    pub fn new(sul: T, checker: impl EquivalenceChecker<H> + 'static) -> Self {
        let alphabet = sul.alphabet();
        Self {
            sul,
            checker: Box::new(checker),
            stats: QueryStats::default(),
            alphabet,
        }
    }

    /// Creates a teacher with a stack of checkers, binding deferred entries against the
    /// system under learning. Fails fast if the stack is empty.
    pub fn with_stack(sul: T, specs: Vec<CheckerSpec<H>>) -> Result<Self, Error>
    where
        H: 'static,
    {
        let alphabet = sul.alphabet();
        let checker = SequentialChecker::from_specs(specs, Some(&alphabet))?;
        Ok(Self {
            sul,
            checker: Box::new(checker),
            stats: QueryStats::default(),
            alphabet,
        })
    }

    /// Resets the system, replays `input` and returns its output.
    pub fn member_query(&mut self, input: &[T::Symbol]) -> T::Out {
        self.stats.membership += 1;
        trace!("membership query {}", word::show(input));
        self.sul.reset();
        self.sul.process(input)
    }

    /// Asks the checker whether `hypothesis` matches the system, returning a
    /// counterexample sequence if it does not.
    pub fn equivalence_query(&mut self, hypothesis: &mut H) -> Result<(), Word<T::Symbol>> {
        self.stats.equivalence += 1;
        debug!(
            "equivalence query for a hypothesis with {} states",
            hypothesis.size()
        );
        self.checker
            .test_equivalence(&mut self.sul, hypothesis, &mut self.stats)
    }

    /// The input alphabet of the system under learning, sorted.
    pub fn alphabet(&self) -> &[T::Symbol] {
        &self.alphabet
    }

    /// A snapshot of the query counters.
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Registers an observer that is invoked with every counterexample the checker finds.
    pub fn on_counterexample(&mut self, hook: CounterexampleHook<T::Symbol>) {
        self.checker.on_counterexample(hook);
    }

    /// Consumes the teacher and hands the system under learning back.
    pub fn into_sul(self) -> T {
        self.sul
    }
}
