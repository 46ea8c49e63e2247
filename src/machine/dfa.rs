use std::collections::{BTreeMap, VecDeque};

use itertools::Itertools;

use super::{DfaBuilder, Machine, StateId};
use crate::math::{Bijection, Set};
use crate::sul::Sul;
use crate::word::Symbol;
use crate::Error;

#[derive(Debug, Clone)]
pub(super) struct DfaState<S: Symbol> {
    pub(super) name: String,
    pub(super) accepting: bool,
    pub(super) edges: BTreeMap<S, StateId>,
}

/// A deterministic acceptor.
///
/// Whether a state accepts is fixed when the state is added and never changes afterwards.
/// Playback through [`Sul`] keeps a cursor: [`Sul::process`] advances it symbol by symbol
/// and reports whether the reached state accepts. Hitting an undefined transition
/// short-circuits to `false` instead of failing, which is only meaningful for partially
/// built fixtures; a finished hypothesis is total over its alphabet.
#[derive(Debug, Clone)]
pub struct Dfa<S: Symbol = char> {
    states: Vec<DfaState<S>>,
    names: Bijection<String, StateId>,
    initial: StateId,
    cursor: StateId,
}

impl<S: Symbol> Dfa<S> {
    /// Creates an acceptor with a single initial state.
    pub fn new(initial_name: impl Into<String>, accepting: bool) -> Self {
        let name = initial_name.into();
        let mut names = Bijection::new();
        names.insert(name.clone(), 0);
        Self {
            states: vec![DfaState {
                name,
                accepting,
                edges: BTreeMap::new(),
            }],
            names,
            initial: 0,
            cursor: 0,
        }
    }

    /// Returns a builder that assembles an acceptor from named edges.
    pub fn builder() -> DfaBuilder<S> {
        DfaBuilder::default()
    }

    /// Adds a fresh state and returns its id.
    pub fn add_state(&mut self, name: impl Into<String>, accepting: bool) -> Result<StateId, Error> {
        let name = name.into();
        if self.names.contains_left(&name) {
            return Err(Error::DuplicateState(name));
        }
        let id = self.states.len() as StateId;
        self.names.insert(name.clone(), id);
        self.states.push(DfaState {
            name,
            accepting,
            edges: BTreeMap::new(),
        });
        Ok(id)
    }

    /// Adds an edge, refusing to overwrite an existing one.
    pub fn add_edge(&mut self, from: StateId, input: S, to: StateId) -> Result<(), Error> {
        let state = &mut self.states[from as usize];
        if state.edges.contains_key(&input) {
            return Err(Error::DuplicateEdge {
                state: state.name.clone(),
                symbol: input.to_string(),
            });
        }
        state.edges.insert(input, to);
        Ok(())
    }

    /// The explicit override path: sets the edge regardless of whether one exists and
    /// returns the previous target, if any.
    pub fn replace_edge(&mut self, from: StateId, input: S, to: StateId) -> Option<StateId> {
        self.states[from as usize].edges.insert(input, to)
    }

    /// The successor of `from` under `input`. An undefined transition here is a
    /// construction bug in the caller, not a runtime condition.
    pub fn next(&self, from: StateId, input: &S) -> Result<StateId, Error> {
        self.states[from as usize]
            .edges
            .get(input)
            .copied()
            .ok_or_else(|| Error::UndefinedTransition {
                state: self.states[from as usize].name.clone(),
                symbol: input.to_string(),
            })
    }

    /// Whether `state` accepts.
    pub fn accepting(&self, state: StateId) -> bool {
        self.states[state as usize].accepting
    }
}

impl<S: Symbol> Sul for Dfa<S> {
    type Symbol = S;
    type Out = bool;

    fn reset(&mut self) {
        self.cursor = self.initial;
    }

    fn process(&mut self, input: &[S]) -> bool {
        for symbol in input {
            match self.states[self.cursor as usize].edges.get(symbol) {
                Some(target) => self.cursor = *target,
                None => return false,
            }
        }
        self.states[self.cursor as usize].accepting
    }

    fn alphabet(&self) -> Vec<S> {
        self.state_ids()
            .into_iter()
            .flat_map(|q| self.states[q as usize].edges.keys().cloned())
            .unique()
            .sorted()
            .collect()
    }
}

impl<S: Symbol> Machine for Dfa<S> {
    type EdgeOut = ();

    fn initial(&self) -> StateId {
        self.initial
    }

    fn state_ids(&self) -> Vec<StateId> {
        let mut seen: Set<StateId> = Set::default();
        seen.insert(self.initial);
        let mut order = vec![self.initial];
        let mut queue = VecDeque::from([self.initial]);
        while let Some(q) = queue.pop_front() {
            for target in self.states[q as usize].edges.values() {
                if seen.insert(*target) {
                    order.push(*target);
                    queue.push_back(*target);
                }
            }
        }
        order
    }

    fn state_name(&self, state: StateId) -> &str {
        &self.states[state as usize].name
    }

    fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.names.get_by_left(name).copied()
    }

    fn edge(&self, state: StateId, input: &S) -> Option<(StateId, ())> {
        self.states[state as usize]
            .edges
            .get(input)
            .map(|target| (*target, ()))
    }

    fn state_out(&self, state: StateId) -> bool {
        self.states[state as usize].accepting
    }

    fn respond(&self, state: StateId, input: &[S]) -> bool {
        let mut current = state;
        for symbol in input {
            match self.states[current as usize].edges.get(symbol) {
                Some(target) => current = *target,
                None => return false,
            }
        }
        self.states[current as usize].accepting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Dfa<char> {
        Dfa::builder()
            .with_edge("s1", 'a', "s2")
            .with_edge("s1", 'b', "s1")
            .with_edge("s2", 'a', "s2")
            .with_edge("s2", 'b', "s3")
            .with_edge("s3", 'a', "s3")
            .with_edge("s3", 'b', "s3")
            .accepting(["s3"])
            .build()
            .unwrap()
    }

    #[test]
    fn playback_follows_edges() {
        let mut dfa = fixture();
        dfa.reset();
        assert!(!dfa.process(&['a']));
        assert!(dfa.process(&['b']));
        dfa.reset();
        assert!(dfa.process(&['a', 'b']));
        dfa.reset();
        assert!(!dfa.process(&['b', 'b', 'a']));
    }

    #[test]
    fn duplicate_edges_are_refused() {
        let mut dfa = Dfa::new("s1", false);
        let s2 = dfa.add_state("s2", true).unwrap();
        dfa.add_edge(0, 'a', s2).unwrap();
        assert!(matches!(
            dfa.add_edge(0, 'a', 0),
            Err(Error::DuplicateEdge { .. })
        ));
        assert_eq!(dfa.replace_edge(0, 'a', 0), Some(s2));
    }

    #[test]
    fn partial_playback_short_circuits() {
        let mut dfa = Dfa::new("s1", true);
        dfa.reset();
        assert!(dfa.process(&[]));
        assert!(!dfa.process(&['x', 'y']));
        assert!(matches!(
            dfa.next(0, &'x'),
            Err(Error::UndefinedTransition { .. })
        ));
    }

    #[test]
    fn traversal_reaches_exactly_the_reachable_states() {
        let mut dfa = fixture();
        let orphan = dfa.add_state("orphan", false).unwrap();
        dfa.add_edge(orphan, 'a', 0).unwrap();
        assert_eq!(dfa.size(), 3);
        assert_eq!(dfa.alphabet(), vec!['a', 'b']);
    }
}
