//! Equivalence checkers: the oracles that certify or refute a hypothesis.
//!
//! All checkers implement [`EquivalenceChecker`] and are driven through the
//! [`crate::teacher::Teacher`]. A checker never owns the system under learning, it
//! borrows it per call, which is what lets one teacher feed a whole stack of checkers.

mod bounded;
pub use bounded::BoundedChecker;

mod wmethod;
pub use wmethod::{wmethod_suite, WmethodChecker};

mod smart;
pub use smart::{SmartWmethodChecker, TestOrder};

mod sequential;
pub use sequential::{CheckerSpec, SequentialChecker};

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::machine::Machine;
use crate::sul::Sul;
use crate::teacher::QueryStats;
use crate::word::{self, Word};

/// An observer invoked with every counterexample a checker finds, before the checker
/// returns it. Shared ownership lets a sequential stack broadcast one observer to all of
/// its layers.
pub type CounterexampleHook<S> = Rc<RefCell<dyn FnMut(&[S])>>;

/// The common contract of all equivalence checkers.
///
/// `test_equivalence` either certifies the hypothesis with `Ok(())` or returns a
/// counterexample input sequence on which hypothesis and system disagree. Any registered
/// counterexample observers fire before the counterexample is returned.
pub trait EquivalenceChecker<M: Machine> {
    /// Compares `hypothesis` against `sul`, counting every replayed trace in `stats`.
    fn test_equivalence(
        &mut self,
        sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
        hypothesis: &mut M,
        stats: &mut QueryStats,
    ) -> Result<(), Word<M::Symbol>>;

    /// Registers a counterexample observer.
    fn on_counterexample(&mut self, hook: CounterexampleHook<M::Symbol>);
}

/// Replays one `input` against both machines and compares their outputs. On disagreement
/// the registered hooks fire and the input comes back as the counterexample; otherwise the
/// output of the system under learning is returned for callers that want to inspect it.
pub(crate) fn run_test<M: Machine>(
    sul: &mut dyn Sul<Symbol = M::Symbol, Out = M::Out>,
    hypothesis: &mut M,
    stats: &mut QueryStats,
    input: &[M::Symbol],
    hooks: &mut [CounterexampleHook<M::Symbol>],
) -> Result<M::Out, Word<M::Symbol>> {
    hypothesis.reset();
    let hyp_out = hypothesis.process(input);
    sul.reset();
    let sul_out = sul.process(input);
    stats.tests += 1;

    if hyp_out != sul_out {
        trace!(
            "counterexample {}: expected {:?}, hypothesis produced {:?}",
            word::show(input),
            sul_out,
            hyp_out
        );
        for hook in hooks.iter_mut() {
            (*hook.borrow_mut())(input);
        }
        return Err(input.to_vec());
    }
    Ok(sul_out)
}
