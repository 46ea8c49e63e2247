//! Sequential composition of equivalence checkers.

use tracing::debug;

use super::{CounterexampleHook, EquivalenceChecker};
use crate::machine::Machine;
use crate::sul::Sul;
use crate::teacher::QueryStats;
use crate::word::Word;
use crate::Error;

/// One entry of a checker stack: either a ready checker or a constructor that still needs
/// the alphabet of the system under learning to finish building.
pub enum CheckerSpec<M: Machine> {
    /// A fully built checker.
    Ready(Box<dyn EquivalenceChecker<M>>),
    /// A constructor, bound lazily against the shared system under learning when the
    /// teacher assembles the stack.
    Deferred(Box<dyn FnOnce(&[M::Symbol]) -> Box<dyn EquivalenceChecker<M>>>),
}

impl<M: Machine> CheckerSpec<M> {
    /// Wraps a ready checker.
    pub fn ready(checker: impl EquivalenceChecker<M> + 'static) -> Self {
        Self::Ready(Box::new(checker))
    }

    /// Wraps a constructor that receives the alphabet of the system under learning.
    pub fn deferred(
        build: impl FnOnce(&[M::Symbol]) -> Box<dyn EquivalenceChecker<M>> + 'static,
    ) -> Self {
        Self::Deferred(Box::new(build))
    }
}

/// Runs an ordered list of checkers, short-circuiting on the first counterexample.
///
/// The intended use is a cheap, shallow check in front of an expensive exhaustive one.
/// Sub-checkers are owned by the stack and cannot be reached from outside once wrapped;
/// counterexample observers registered on the stack are broadcast to every layer.
pub struct SequentialChecker<M: Machine> {
    checkers: Vec<Box<dyn EquivalenceChecker<M>>>,
}

impl<M: Machine> SequentialChecker<M> {
    /// Builds a stack from ready checkers. Fails fast on an empty stack.
    pub fn new(checkers: Vec<Box<dyn EquivalenceChecker<M>>>) -> Result<Self, Error> {
        if checkers.is_empty() {
            return Err(Error::EmptyStack);
        }
        Ok(Self { checkers })
    }

    /// Builds a stack from specs, resolving deferred constructors against `alphabet`.
    /// A deferred entry without an alphabet to bind against fails fast.
    pub fn from_specs(
        specs: Vec<CheckerSpec<M>>,
        alphabet: Option<&[M::Symbol]>,
    ) -> Result<Self, Error> {
        let mut checkers = Vec::with_capacity(specs.len());
        for spec in specs {
            match spec {
                CheckerSpec::Ready(checker) => checkers.push(checker),
                CheckerSpec::Deferred(build) => match alphabet {
                    Some(alphabet) => checkers.push(build(alphabet)),
                    None => return Err(Error::UnboundChecker),
                },
            }
        }
        Self::new(checkers)
    }
}

impl<M: Machine> EquivalenceChecker<M> for SequentialChecker<M> {
    fn test_equivalence(
        &mut self,
        sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
        hypothesis: &mut M,
        stats: &mut QueryStats,
    ) -> Result<(), Word<M::Symbol>> {
        for (layer, checker) in self.checkers.iter_mut().enumerate() {
            debug!("equivalence check, layer {layer}");
            checker.test_equivalence(sul, hypothesis, stats)?;
        }
        Ok(())
    }

    fn on_counterexample(&mut self, hook: CounterexampleHook<M::Symbol>) {
        for checker in &mut self.checkers {
            checker.on_counterexample(hook.clone());
        }
    }
}
