//! Distinguishing sets through partition refinement.
//!
//! A distinguishing set for a machine is a set of input suffixes such that replaying every
//! suffix from every state yields a different output tuple for every state. The W-method
//! builds its test suites from these sets and the quotient construction in
//! [`Mealy::minimized`] reuses the underlying partition.

mod refinement;

mod external;
pub use external::{external_distinguishing_set, parse_separating_records, SeparatingRecords};

use crate::machine::{Machine, Mealy, StateId};
use crate::sul::Sul;
use crate::word::{Output, Symbol, Word};
use std::collections::BTreeSet;
use tracing::debug;

/// Which refinement algorithm computes the set.
///
/// Both are deterministic for a fixed machine and produce a valid distinguishing set for
/// every machine without output-equivalent state pairs. Hopcroft processes a worklist of
/// splitters and scales near linearithmically in the number of edges, Moore iterates
/// global k-equivalence rounds, which is simpler and makes a good cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Worklist driven refinement with smaller-half splitter scheduling.
    Hopcroft,
    /// Iterated table filling over k-equivalence classes.
    Moore,
}

/// Computes a distinguishing set for `machine`.
///
/// The result is sorted and never contains the empty sequence. Calling this twice on the
/// same machine with the same method returns identical sets, there is no dependence on
/// hash iteration order or randomness.
pub fn distinguishing_set<M: Machine>(machine: &M, method: Method) -> Vec<Word<M::Symbol>> {
    let refinement = match method {
        Method::Hopcroft => refinement::hopcroft(machine),
        Method::Moore => refinement::moore(machine),
    };
    let suffixes: BTreeSet<Word<M::Symbol>> = refinement
        .seps
        .values()
        .filter(|w| !w.is_empty())
        .cloned()
        .collect();
    debug!(
        "distinguishing set of size {} for {} states",
        suffixes.len(),
        machine.size()
    );
    suffixes.into_iter().collect()
}

/// Replays every suffix of `dset` from every state and returns the output tuples, one per
/// state. The first component of each tuple is the state's own response to the empty
/// input, which is what separates acceptance classes in acceptors.
pub fn dset_outputs<M: Machine>(
    machine: &M,
    dset: &[Word<M::Symbol>],
) -> Vec<(StateId, Vec<M::Out>)> {
    machine
        .state_ids()
        .into_iter()
        .map(|q| {
            let mut outs = Vec::with_capacity(dset.len() + 1);
            outs.push(machine.state_out(q));
            outs.extend(dset.iter().map(|suffix| machine.respond(q, suffix)));
            (q, outs)
        })
        .collect()
}

/// Checks that `dset` actually distinguishes all states of `machine`, returning the first
/// pair of states with identical output tuples otherwise. Also usable to validate
/// externally supplied sets, for example ones produced by [`external_distinguishing_set`].
pub fn verify_distinguishing_set<M: Machine>(
    machine: &M,
    dset: &[Word<M::Symbol>],
) -> Result<(), (StateId, StateId)> {
    let outputs = dset_outputs(machine, dset);
    for (i, (qa, outs_a)) in outputs.iter().enumerate() {
        for (qb, outs_b) in &outputs[i + 1..] {
            if outs_a == outs_b {
                return Err((*qa, *qb));
            }
        }
    }
    Ok(())
}

impl<S: Symbol, O: Output> Mealy<S, O> {
    /// Returns the quotient of this machine under output equivalence, merging states that
    /// no input sequence tells apart. Best effort: re-verify the result through
    /// [`verify_distinguishing_set`] where minimality matters.
    pub fn minimized(&self) -> Mealy<S, O> {
        let refinement = refinement::hopcroft(self);
        let alphabet = self.alphabet();
        // one representative per block, the block member discovered first
        let reps: Vec<StateId> = refinement
            .partition
            .iter()
            .map(|block| *block.iter().next().expect("blocks are never empty"))
            .collect();
        let block_of = |q: StateId| -> usize {
            refinement
                .partition
                .class_of(&q)
                .expect("every reachable state belongs to a block")
        };
        let initial_block = block_of(self.initial());
        let mut quotient = Mealy::new(self.state_name(reps[initial_block]).to_string());
        let mut ids = vec![None; reps.len()];
        ids[initial_block] = Some(0);
        for (b, rep) in reps.iter().enumerate() {
            if ids[b].is_none() {
                let id = quotient
                    .add_state(self.state_name(*rep).to_string())
                    .expect("representative names are unique");
                ids[b] = Some(id);
            }
        }
        for (b, rep) in reps.iter().enumerate() {
            for symbol in &alphabet {
                if let Some((target, output)) = self.edge(*rep, symbol) {
                    let from = ids[b].expect("all blocks were mapped");
                    let to = ids[block_of(target)].expect("all blocks were mapped");
                    quotient
                        .add_edge(from, symbol.clone(), output, to)
                        .expect("one edge per symbol and representative");
                }
            }
        }
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Mealy;
    use crate::sul::Sul;

    fn simple() -> Mealy<char, &'static str> {
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

    fn simple_single() -> Mealy<char, &'static str> {
        Mealy::builder()
            .with_edge("1", 'a', "1", "2")
            .with_edge("1", 'b', "next", "1")
            .with_edge("2", 'a', "2", "3")
            .with_edge("2", 'b', "next", "1")
            .with_edge("3", 'a', "3", "3")
            .with_edge("3", 'b', "next", "1")
            .build()
            .unwrap()
    }

    fn long_single() -> Mealy<char, String> {
        let mut builder = Mealy::builder();
        for i in 0..100usize {
            let next = (i + 1) % 100;
            builder = builder
                .with_edge(format!("{i}"), 'a', format!("{i}"), format!("{next}"))
                .with_edge(format!("{i}"), 'b', "loop".to_string(), format!("{i}"))
                .with_edge(format!("{i}"), 'c', "loop".to_string(), format!("{i}"))
                .with_edge(format!("{i}"), 'd', "loop".to_string(), format!("{i}"));
        }
        builder.with_initial("0").build().unwrap()
    }

    #[test]
    fn simple_hopcroft() {
        let dset = distinguishing_set(&simple(), Method::Hopcroft);
        assert_eq!(dset, vec![vec!['a'], vec!['b']]);
    }

    #[test]
    fn simple_moore() {
        let dset = distinguishing_set(&simple(), Method::Moore);
        assert_eq!(dset, vec![vec!['a'], vec!['b']]);
    }

    #[test]
    fn single_symbol_suffices() {
        for method in [Method::Hopcroft, Method::Moore] {
            assert_eq!(
                distinguishing_set(&simple_single(), method),
                vec![vec!['a']]
            );
        }
    }

    #[test]
    fn long_cycle_single_symbol() {
        for method in [Method::Hopcroft, Method::Moore] {
            assert_eq!(distinguishing_set(&long_single(), method), vec![vec!['a']]);
        }
    }

    #[test]
    fn computed_sets_verify() {
        for method in [Method::Hopcroft, Method::Moore] {
            let mm = simple();
            let dset = distinguishing_set(&mm, method);
            assert!(verify_distinguishing_set(&mm, &dset).is_ok());
        }
    }

    #[test]
    fn verification_rejects_insufficient_sets() {
        let mm = simple();
        assert!(verify_distinguishing_set(&mm, &[]).is_err());
        // 'b' alone cannot tell state 2 from state 3
        assert!(verify_distinguishing_set(&mm, &[vec!['b']]).is_err());
    }

    #[test]
    fn computation_is_deterministic() {
        for method in [Method::Hopcroft, Method::Moore] {
            let first = distinguishing_set(&simple(), method);
            let second = distinguishing_set(&simple(), method);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn quotient_merges_equivalent_states() {
        // states x and y behave identically, the quotient must fold them together
        let mm: Mealy<char, &'static str> = Mealy::builder()
            .with_edge("s", 'a', "go", "x")
            .with_edge("s", 'b', "go", "y")
            .with_edge("x", 'a', "one", "s")
            .with_edge("x", 'b', "two", "x")
            .with_edge("y", 'a', "one", "s")
            .with_edge("y", 'b', "two", "y")
            .build()
            .unwrap();
        let min = mm.minimized();
        assert_eq!(min.size(), 2);

        let mut original = mm.clone();
        let mut quotient = min.clone();
        for input in crate::word::words_up_to(&mm.alphabet(), 4) {
            original.reset();
            quotient.reset();
            assert_eq!(original.process(&input), quotient.process(&input));
        }
        let dset = distinguishing_set(&min, Method::Moore);
        assert!(verify_distinguishing_set(&min, &dset).is_ok());
    }
}
