use std::collections::{BTreeMap, VecDeque};

use itertools::Itertools;

use super::{Machine, MealyBuilder, StateId};
use crate::math::{Bijection, Set};
use crate::sul::Sul;
use crate::word::{Output, Symbol};
use crate::Error;

#[derive(Debug, Clone)]
pub(super) struct MealyState<S: Symbol, O: Output> {
    pub(super) name: String,
    pub(super) edges: BTreeMap<S, (StateId, O)>,
}

/// A deterministic Mealy transducer.
///
/// Every edge carries an output token next to its successor. Processing a sequence yields
/// the output of the last transition taken, so the empty input yields `None`. An undefined
/// transition mid-sequence also short-circuits to `None`; once learning has converged the
/// machine is total and this never happens.
#[derive(Debug, Clone)]
pub struct Mealy<S: Symbol = char, O: Output = String> {
    states: Vec<MealyState<S, O>>,
    names: Bijection<String, StateId>,
    initial: StateId,
    cursor: StateId,
}

impl<S: Symbol, O: Output> Mealy<S, O> {
    /// Creates a transducer with a single initial state.
    pub fn new(initial_name: impl Into<String>) -> Self {
        let name = initial_name.into();
        let mut names = Bijection::new();
        names.insert(name.clone(), 0);
        Self {
            states: vec![MealyState {
                name,
                edges: BTreeMap::new(),
            }],
            names,
            initial: 0,
            cursor: 0,
        }
    }

    /// Returns a builder that assembles a transducer from named edges.
    pub fn builder() -> MealyBuilder<S, O> {
        MealyBuilder::default()
    }

    /// Adds a fresh state and returns its id.
    pub fn add_state(&mut self, name: impl Into<String>) -> Result<StateId, Error> {
        let name = name.into();
        if self.names.contains_left(&name) {
            return Err(Error::DuplicateState(name));
        }
        let id = self.states.len() as StateId;
        self.names.insert(name.clone(), id);
        self.states.push(MealyState {
            name,
            edges: BTreeMap::new(),
        });
        Ok(id)
    }

    /// Adds an edge with its output token, refusing to overwrite an existing one.
    pub fn add_edge(&mut self, from: StateId, input: S, output: O, to: StateId) -> Result<(), Error> {
        let state = &mut self.states[from as usize];
        if state.edges.contains_key(&input) {
            return Err(Error::DuplicateEdge {
                state: state.name.clone(),
                symbol: input.to_string(),
            });
        }
        state.edges.insert(input, (to, output));
        Ok(())
    }

    /// The explicit override path: sets the edge regardless of whether one exists and
    /// returns the previous entry, if any.
    pub fn replace_edge(
        &mut self,
        from: StateId,
        input: S,
        output: O,
        to: StateId,
    ) -> Option<(StateId, O)> {
        self.states[from as usize].edges.insert(input, (to, output))
    }

    /// The successor and output of `from` under `input`. An undefined transition here is
    /// a construction bug in the caller, not a runtime condition.
    pub fn next(&self, from: StateId, input: &S) -> Result<(StateId, &O), Error> {
        self.states[from as usize]
            .edges
            .get(input)
            .map(|(target, output)| (*target, output))
            .ok_or_else(|| Error::UndefinedTransition {
                state: self.states[from as usize].name.clone(),
                symbol: input.to_string(),
            })
    }
}

impl<S: Symbol, O: Output> Sul for Mealy<S, O> {
    type Symbol = S;
    type Out = Option<O>;

    fn reset(&mut self) {
        self.cursor = self.initial;
    }

    fn process(&mut self, input: &[S]) -> Option<O> {
        let mut last = None;
        for symbol in input {
            match self.states[self.cursor as usize].edges.get(symbol) {
                Some((target, output)) => {
                    last = Some(output.clone());
                    self.cursor = *target;
                }
                None => return None,
            }
        }
        last
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

impl<S: Symbol, O: Output> Machine for Mealy<S, O> {
    type EdgeOut = O;

    fn initial(&self) -> StateId {
        self.initial
    }

    fn state_ids(&self) -> Vec<StateId> {
        let mut seen: Set<StateId> = Set::default();
        seen.insert(self.initial);
        let mut order = vec![self.initial];
        let mut queue = VecDeque::from([self.initial]);
        while let Some(q) = queue.pop_front() {
            for (target, _) in self.states[q as usize].edges.values() {
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

    fn edge(&self, state: StateId, input: &S) -> Option<(StateId, O)> {
        self.states[state as usize]
            .edges
            .get(input)
            .map(|(target, output)| (*target, output.clone()))
    }

    fn state_out(&self, _state: StateId) -> Option<O> {
        None
    }

    fn respond(&self, state: StateId, input: &[S]) -> Option<O> {
        let mut current = state;
        let mut last = None;
        for symbol in input {
            match self.states[current as usize].edges.get(symbol) {
                Some((target, output)) => {
                    last = Some(output.clone());
                    current = *target;
                }
                None => return None,
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Mealy<char, &'static str> {
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

    #[test]
    fn playback_reports_the_last_output() {
        let mut mm = fixture();
        mm.reset();
        assert_eq!(mm.process(&['a', 'a', 'a']), Some("A"));
        mm.reset();
        assert_eq!(mm.process(&['a', 'b']), Some("back"));
        mm.reset();
        assert_eq!(mm.process(&[]), None);
    }

    #[test]
    fn undefined_transitions_short_circuit() {
        let mut mm: Mealy<char, &'static str> = Mealy::new("only");
        mm.reset();
        assert_eq!(mm.process(&['a']), None);
        assert!(matches!(
            mm.next(0, &'a'),
            Err(Error::UndefinedTransition { .. })
        ));
    }

    #[test]
    fn respond_leaves_the_cursor_alone() {
        let mut mm = fixture();
        mm.reset();
        mm.process(&['a']);
        let two = mm.state_by_name("2").unwrap();
        assert_eq!(mm.respond(two, &['a']), Some("nice"));
        assert_eq!(mm.process(&['a']), Some("nice"));
        assert_eq!(mm.process(&['a']), Some("A"));
    }
}
