//! Active automata learning for deterministic acceptors and Mealy transducers.
//!
//! A black-box reactive system is modelled as a [`sul::Sul`] (system under learning): it can
//! be reset, fed an input sequence and asked for the resulting output, and it knows its input
//! alphabet. A [`teacher::Teacher`] wraps one such system together with an equivalence checker
//! and counts every query that passes through it. A learner talks to the teacher only: it poses
//! membership queries to fill its internal data structure, builds a candidate machine from it
//! and asks an equivalence query. The checker either certifies the candidate or produces a
//! counterexample which the learner folds back into its data structure before trying again.
//!
//! Two learners are provided. [`learner::LStarLearner`] maintains the classic observation
//! table of prefix rows and experiment columns, restoring closedness and consistency before
//! every hypothesis. [`learner::TttLearner`] maintains a discrimination tree whose leaves are
//! the hypothesis states; counterexamples split exactly one leaf, so distinctions found once
//! are never derived again.
//!
//! Equivalence checking is pluggable through [`oracle::EquivalenceChecker`]. The crate ships
//! a bounded-depth brute force search, the classic W-method built on state covers and
//! distinguishing sets, a configurable variant of it that reorders and prunes its test suite,
//! and a sequential composition that stacks cheap checkers in front of expensive ones.
//!
//! The distinguishing sets themselves come from the partition refinement algorithms in
//! [`distset`], available in a worklist driven Hopcroft flavor and an iterative Moore flavor.
//! Both are deterministic for a fixed input machine, which keeps generated test suites
//! reproducible.
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude re-exports the types needed for everyday use of the crate.
pub mod prelude {
    pub use super::{
        cover::state_cover,
        distset::{dset_outputs, distinguishing_set, verify_distinguishing_set, Method},
        dot::{load_mealy_dot, mealy_to_dot, parse_mealy_dot, DotDialect},
        learner::{BuildHypothesis, LStarLearner, TttLearner},
        machine::{Dfa, Machine, Mealy, StateId},
        math,
        oracle::{
            BoundedChecker, CheckerSpec, CounterexampleHook, EquivalenceChecker,
            SequentialChecker, SmartWmethodChecker, TestOrder, WmethodChecker,
        },
        sul::{CachedSul, Sul},
        teacher::{QueryStats, Teacher},
        word::{self, Output, Symbol, Word},
        Error,
    };
}

pub mod math;

pub mod word;

pub mod sul;

pub mod machine;

pub mod teacher;

pub mod cover;

pub mod distset;

pub mod oracle;

pub mod learner;

pub mod dot;

/// Random generation of transducers, gated behind the `random` feature.
#[cfg(feature = "random")]
pub mod random;

/// Everything that can go wrong while building machines, configuring checkers or talking to
/// external tooling. Counterexamples and observation table inconsistencies are deliberately
/// absent, they are the normal mode of progress during learning and never surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An edge for this input already leaves the state and no override was requested.
    #[error("state {state} already has an edge for input {symbol}")]
    DuplicateEdge {
        /// Name of the offending state.
        state: String,
        /// The input symbol that is already taken.
        symbol: String,
    },
    /// A state with this name already exists in the machine.
    #[error("a state named {0} already exists")]
    DuplicateState(String),
    /// A name was used that does not denote any state of the machine.
    #[error("no state named {0} exists")]
    UnknownState(String),
    /// A symbol was played from a state that has no edge for it.
    #[error("no transition for input {symbol} from state {state}")]
    UndefinedTransition {
        /// Name of the state the playback got stuck in.
        state: String,
        /// The input symbol that has no edge.
        symbol: String,
    },
    /// A finished hypothesis must have an edge for every alphabet symbol in every state.
    #[error("hypothesis state {state} has no transition for input {symbol}")]
    IncompleteHypothesis {
        /// Name of the incomplete state.
        state: String,
        /// The missing input symbol.
        symbol: String,
    },
    /// The target produced no output where the learner needed one.
    #[error("the target produced no output for a non-empty input sequence")]
    MissingOutput,
    /// A deferred equivalence checker was built without a system under learning to bind to.
    #[error("a deferred equivalence checker can only be bound against a system under learning")]
    UnboundChecker,
    /// A sequential equivalence checker needs at least one sub-checker.
    #[error("sequential equivalence checker has no sub-checkers")]
    EmptyStack,
    /// The dot input could not be parsed.
    #[error("unparseable dot input at line {line}: {reason}")]
    DotParse {
        /// One-based line number of the offending line.
        line: usize,
        /// What went wrong.
        reason: String,
    },
    /// The separating-sequence tool produced a record we cannot make sense of.
    #[error("malformed separating-sequence record: {0}")]
    SeparatingTool(String),
    /// An I/O error while reading or writing machine files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
