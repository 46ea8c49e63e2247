//! The learning algorithms and the glue that turns their internal structures into machines.

mod lstar;
pub use lstar::LStarLearner;

mod ttt;
pub use ttt::{DiscriminationTree, TttLearner};

use crate::machine::{Dfa, Machine, Mealy, StateId};
use crate::math::Map;
use crate::sul::Sul;
use crate::teacher::Teacher;
use crate::word::{push, Output, Symbol, Word};
use crate::Error;

/// Glue between the generic learner cores and a concrete machine flavor.
///
/// A learner produces the same raw material regardless of what it learns: an access word
/// per state and a successor per state and symbol. What distinguishes an acceptor from a
/// transducer is which membership queries label the states and edges, and both answers
/// live here. Queries go through the `query` argument, which the learners back by their
/// cache, so asking for the same word twice stays free.
pub trait BuildHypothesis: Machine {
    /// The per-state information extracted from queries, acceptance for acceptors.
    type StateLabel;

    /// The experiments every observation table starts from.
    fn mandatory_experiments(alphabet: &[Self::Symbol]) -> Vec<Word<Self::Symbol>>;

    /// The label of the hypothesis state reached by `access`.
    fn state_label(
        access: &[Self::Symbol],
        query: &mut dyn FnMut(&[Self::Symbol]) -> Self::Out,
    ) -> Result<Self::StateLabel, Error>;

    /// The output along the transition taken on `input` out of the state reached by
    /// `access`.
    fn edge_label(
        access: &[Self::Symbol],
        input: &Self::Symbol,
        query: &mut dyn FnMut(&[Self::Symbol]) -> Self::Out,
    ) -> Result<Self::EdgeOut, Error>;

    /// Assembles a complete machine. `states[0]` must carry the empty access word and
    /// becomes the initial state; every state needs an edge for every alphabet symbol.
    fn assemble(
        alphabet: &[Self::Symbol],
        states: Vec<(Word<Self::Symbol>, Self::StateLabel)>,
        edges: Vec<(usize, Self::Symbol, Self::EdgeOut, usize)>,
    ) -> Result<Self, Error>;
}

fn ensure_total<M: Machine>(machine: &M, alphabet: &[M::Symbol]) -> Result<(), Error> {
    for q in machine.state_ids() {
        for symbol in alphabet {
            if machine.edge(q, symbol).is_none() {
                return Err(Error::IncompleteHypothesis {
                    state: machine.state_name(q).to_string(),
                    symbol: symbol.to_string(),
                });
            }
        }
    }
    Ok(())
}

impl<S: Symbol> BuildHypothesis for Dfa<S> {
    type StateLabel = bool;

    fn mandatory_experiments(_alphabet: &[S]) -> Vec<Word<S>> {
        // the empty experiment reads off acceptance of the access word itself
        vec![vec![]]
    }

    fn state_label(
        access: &[S],
        query: &mut dyn FnMut(&[S]) -> bool,
    ) -> Result<bool, Error> {
        Ok(query(access))
    }

    fn edge_label(
        _access: &[S],
        _input: &S,
        _query: &mut dyn FnMut(&[S]) -> bool,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn assemble(
        alphabet: &[S],
        states: Vec<(Word<S>, bool)>,
        edges: Vec<(usize, S, (), usize)>,
    ) -> Result<Self, Error> {
        let (first_access, initial_accepting) =
            states.first().expect("a hypothesis has at least one state");
        assert!(
            first_access.is_empty(),
            "the first state must be the initial one"
        );
        let mut dfa = Dfa::new("s0", *initial_accepting);
        for (i, (_, accepting)) in states.iter().enumerate().skip(1) {
            dfa.add_state(format!("s{i}"), *accepting)?;
        }
        for (from, input, (), to) in edges {
            dfa.add_edge(from as StateId, input, to as StateId)?;
        }
        ensure_total(&dfa, alphabet)?;
        Ok(dfa)
    }
}

impl<S: Symbol, O: Output> BuildHypothesis for Mealy<S, O> {
    type StateLabel = ();

    fn mandatory_experiments(alphabet: &[S]) -> Vec<Word<S>> {
        // one single-symbol experiment per input, the empty word produces no output
        alphabet.iter().map(|a| vec![a.clone()]).collect()
    }

    fn state_label(
        _access: &[S],
        _query: &mut dyn FnMut(&[S]) -> Option<O>,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn edge_label(
        access: &[S],
        input: &S,
        query: &mut dyn FnMut(&[S]) -> Option<O>,
    ) -> Result<O, Error> {
        query(&push(access, input)).ok_or(Error::MissingOutput)
    }

    fn assemble(
        alphabet: &[S],
        states: Vec<(Word<S>, ())>,
        edges: Vec<(usize, S, O, usize)>,
    ) -> Result<Self, Error> {
        let (first_access, ()) = states.first().expect("a hypothesis has at least one state");
        assert!(
            first_access.is_empty(),
            "the first state must be the initial one"
        );
        let mut mm = Mealy::new("s0");
        for i in 1..states.len() {
            mm.add_state(format!("s{i}"))?;
        }
        for (from, input, output, to) in edges {
            mm.add_edge(from as StateId, input, output, to as StateId)?;
        }
        ensure_total(&mm, alphabet)?;
        Ok(mm)
    }
}

/// Looks `input` up in the learner's cache, going through to the teacher at most once per
/// distinct word.
pub(crate) fn cached_query<T, H>(
    cache: &mut Map<Word<T::Symbol>, T::Out>,
    teacher: &mut Teacher<T, H>,
    input: &[T::Symbol],
) -> T::Out
where
    T: Sul,
    H: Machine<Symbol = T::Symbol, Out = T::Out>,
{
    if let Some(out) = cache.get(input) {
        return out.clone();
    }
    let out = teacher.member_query(input);
    cache.insert(input.to_vec(), out.clone());
    out
}
