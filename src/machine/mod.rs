//! Explicit state-graph machines, used both as learned hypotheses and as hand-built fixtures.
//!
//! States live in an arena indexed by dense [`StateId`]s, edges are maps from input symbol
//! to successor index. This avoids ownership cycles in the state graph and lets equality
//! and traversal work on indices instead of reference identity.

mod dfa;
pub use dfa::Dfa;

mod mealy;
pub use mealy::Mealy;

mod build;
pub use build::{DfaBuilder, MealyBuilder};

use crate::sul::Sul;
use crate::word::Output;

/// Index of a state inside a machine's arena.
pub type StateId = u32;

/// Structural access to a machine, beyond the black-box [`Sul`] view.
///
/// Everything that inspects a hypothesis from the outside goes through this trait: the
/// W-method needs state covers and per-state responses, the partition refinement needs
/// edges and their outputs. The set of states is always recomputed by traversal from the
/// initial state, machines do not maintain it incrementally across edits.
pub trait Machine: Sul + Sized {
    /// The observation attached to a single edge. Transducers emit their output token
    /// here, acceptors emit nothing.
    type EdgeOut: Output;

    /// The initial state.
    fn initial(&self) -> StateId;

    /// All states reachable from the initial state, in breadth-first discovery order.
    fn state_ids(&self) -> Vec<StateId>;

    /// The name of a state.
    fn state_name(&self, state: StateId) -> &str;

    /// Looks a state up by name.
    fn state_by_name(&self, name: &str) -> Option<StateId>;

    /// The number of reachable states.
    fn size(&self) -> usize {
        self.state_ids().len()
    }

    /// The outgoing edge of `state` for `input`, if one is defined.
    fn edge(&self, state: StateId, input: &Self::Symbol) -> Option<(StateId, Self::EdgeOut)>;

    /// The successor of `state` under `input`, if one is defined.
    fn successor(&self, state: StateId, input: &Self::Symbol) -> Option<StateId> {
        self.edge(state, input).map(|(target, _)| target)
    }

    /// What the empty input yields when the machine sits in `state`.
    fn state_out(&self, state: StateId) -> Self::Out;

    /// Replays `input` from `state` without touching the playback cursor and returns the
    /// same output that [`Sul::process`] would produce for it from that state.
    fn respond(&self, state: StateId, input: &[Self::Symbol]) -> Self::Out;
}
