//! Builders that assemble machines from named edge lists, for tests and fixtures.

use super::{Dfa, Mealy, StateId};
use crate::math::Map;
use crate::word::{Output, Symbol};
use crate::Error;

/// Accumulates named edges for a [`Dfa`]. States are created on first mention, the initial
/// state defaults to the source of the first edge.
#[derive(Debug)]
pub struct DfaBuilder<S: Symbol> {
    edges: Vec<(String, S, String)>,
    accepting: Vec<String>,
    initial: Option<String>,
}

impl<S: Symbol> Default for DfaBuilder<S> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            accepting: Vec::new(),
            initial: None,
        }
    }
}

impl<S: Symbol> DfaBuilder<S> {
    /// Adds an edge between two named states.
    pub fn with_edge(mut self, from: impl Into<String>, input: S, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), input, to.into()));
        self
    }

    /// Adds many edges at once.
    pub fn with_edges<F: Into<String>, T: Into<String>>(
        mut self,
        edges: impl IntoIterator<Item = (F, S, T)>,
    ) -> Self {
        for (from, input, to) in edges {
            self.edges.push((from.into(), input, to.into()));
        }
        self
    }

    /// Marks the given states as accepting.
    pub fn accepting<N: Into<String>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.accepting.extend(names.into_iter().map(Into::into));
        self
    }

    /// Overrides the initial state.
    pub fn with_initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Assembles the acceptor.
    pub fn build(self) -> Result<Dfa<S>, Error> {
        let initial = match &self.initial {
            Some(name) => name.clone(),
            None => match self.edges.first() {
                Some((from, _, _)) => from.clone(),
                None => return Err(Error::UnknownState("<initial>".to_string())),
            },
        };
        let accepts = |name: &str| self.accepting.iter().any(|a| a == name);
        let mut dfa = Dfa::new(initial.clone(), accepts(&initial));
        let mut ids: Map<String, StateId> = Map::default();
        ids.insert(initial, 0);
        for (from, input, to) in self.edges {
            let from_id = match ids.get(&from) {
                Some(id) => *id,
                None => {
                    let id = dfa.add_state(from.clone(), accepts(&from))?;
                    ids.insert(from, id);
                    id
                }
            };
            let to_id = match ids.get(&to) {
                Some(id) => *id,
                None => {
                    let id = dfa.add_state(to.clone(), accepts(&to))?;
                    ids.insert(to, id);
                    id
                }
            };
            dfa.add_edge(from_id, input, to_id)?;
        }
        Ok(dfa)
    }
}

/// Accumulates named edges for a [`Mealy`] machine. States are created on first mention,
/// the initial state defaults to the source of the first edge.
#[derive(Debug)]
pub struct MealyBuilder<S: Symbol, O: Output> {
    edges: Vec<(String, S, O, String)>,
    initial: Option<String>,
}

impl<S: Symbol, O: Output> Default for MealyBuilder<S, O> {
    fn default() -> Self {
        Self {
            edges: Vec::new(),
            initial: None,
        }
    }
}

impl<S: Symbol, O: Output> MealyBuilder<S, O> {
    /// Adds an edge between two named states, emitting `output`.
    pub fn with_edge(
        mut self,
        from: impl Into<String>,
        input: S,
        output: O,
        to: impl Into<String>,
    ) -> Self {
        self.edges.push((from.into(), input, output, to.into()));
        self
    }

    /// Adds many edges at once.
    pub fn with_edges<F: Into<String>, T: Into<String>>(
        mut self,
        edges: impl IntoIterator<Item = (F, S, O, T)>,
    ) -> Self {
        for (from, input, output, to) in edges {
            self.edges.push((from.into(), input, output, to.into()));
        }
        self
    }

    /// Overrides the initial state.
    pub fn with_initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    /// Assembles the transducer.
    pub fn build(self) -> Result<Mealy<S, O>, Error> {
        let initial = match &self.initial {
            Some(name) => name.clone(),
            None => match self.edges.first() {
                Some((from, _, _, _)) => from.clone(),
                None => return Err(Error::UnknownState("<initial>".to_string())),
            },
        };
        let mut mm = Mealy::new(initial.clone());
        let mut ids: Map<String, StateId> = Map::default();
        ids.insert(initial, 0);
        for (from, input, output, to) in self.edges {
            let from_id = match ids.get(&from) {
                Some(id) => *id,
                None => {
                    let id = mm.add_state(from.clone())?;
                    ids.insert(from, id);
                    id
                }
            };
            let to_id = match ids.get(&to) {
                Some(id) => *id,
                None => {
                    let id = mm.add_state(to.clone())?;
                    ids.insert(to, id);
                    id
                }
            };
            mm.add_edge(from_id, input, output, to_id)?;
        }
        Ok(mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Machine;
    use crate::sul::Sul;

    #[test]
    fn builder_respects_explicit_initial() {
        let mut mm: Mealy<char, &'static str> = Mealy::builder()
            .with_edge("a", 'x', "one", "b")
            .with_edge("b", 'x', "two", "a")
            .with_initial("b")
            .build()
            .unwrap();
        assert_eq!(mm.state_name(mm.initial()), "b");
        mm.reset();
        assert_eq!(mm.process(&['x']), Some("two"));
    }

    #[test]
    fn builder_rejects_duplicate_edges() {
        let result: Result<Dfa<char>, _> = Dfa::builder()
            .with_edge("a", 'x', "b")
            .with_edge("a", 'x', "a")
            .build();
        assert!(matches!(result, Err(Error::DuplicateEdge { .. })));
    }
}
