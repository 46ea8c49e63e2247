//! The L* observation table algorithm.

use std::time::Instant;

use itertools::Itertools;
use owo_colors::OwoColorize;
use tracing::{debug, info, trace};

use super::{cached_query, BuildHypothesis};
use crate::machine::Machine;
use crate::math::{Map, Set};
use crate::sul::Sul;
use crate::teacher::Teacher;
use crate::word::{self, concat, push, Word};
use crate::Error;

const ITERATION_THRESHOLD: usize = if cfg!(debug_assertions) { 300 } else { 200_000 };

/// An implementation of the L* algorithm.
///
/// The learner maintains an observation table: the rows are access words, split into a
/// base of candidate states and their one-symbol extensions, the columns are experiment
/// suffixes. Before every hypothesis the table is made consistent (two base words with
/// equal rows must stay equal under every extension, a violation yields a new experiment)
/// and closed (every extension row must occur as a base row, a violation promotes the
/// extension into the base). Counterexamples enter the table as prefixes. Prefixes and
/// experiments only ever grow, and every distinct word is queried at most once.
pub struct LStarLearner<'a, T, H>
where
    T: Sul,
    H: BuildHypothesis<Symbol = T::Symbol, Out = T::Out>,
{
    teacher: &'a mut Teacher<T, H>,
    // the access words forming the base states, the empty word first
    base: Vec<Word<T::Symbol>>,
    experiments: Vec<Word<T::Symbol>>,
    // rows of outputs, indexed like `experiments`
    table: Map<Word<T::Symbol>, Vec<T::Out>>,
    // all queries posed so far, so no distinct word is asked twice
    queries: Map<Word<T::Symbol>, T::Out>,
    on_hypothesis: Option<Box<dyn FnMut(&H) + 'a>>,
    intermediate: bool,
}

impl<'a, T, H> LStarLearner<'a, T, H>
where
    T: Sul,
    H: BuildHypothesis<Symbol = T::Symbol, Out = T::Out>,
{
    /// Creates a learner that talks to `teacher`.
    pub fn new(teacher: &'a mut Teacher<T, H>) -> Self {
        let experiments = H::mandatory_experiments(teacher.alphabet());
        Self {
            teacher,
            base: vec![vec![]],
            experiments,
            table: Map::default(),
            queries: Map::default(),
            on_hypothesis: None,
            intermediate: true,
        }
    }

    /// Registers a callback invoked on emitted hypotheses.
    pub fn on_hypothesis(mut self, callback: impl FnMut(&H) + 'a) -> Self {
        self.on_hypothesis = Some(Box::new(callback));
        self
    }

    /// Controls whether intermediate hypotheses are passed to the callback or only the
    /// final one. Defaults to emitting all of them.
    pub fn intermediate_hypotheses(mut self, intermediate: bool) -> Self {
        self.intermediate = intermediate;
        self
    }

    fn output(&mut self, input: &[T::Symbol]) -> T::Out {
        cached_query(&mut self.queries, self.teacher, input)
    }

    fn one_letter_extensions(&self) -> Vec<Word<T::Symbol>> {
        let alphabet = self.teacher.alphabet();
        self.base
            .iter()
            .flat_map(|w| {
                std::iter::once(w.clone()).chain(alphabet.iter().map(|a| push(w, a)))
            })
            .unique()
            .collect()
    }

    fn update_table(&mut self) {
        let experiment_count = self.experiments.len();
        for row_word in self.one_letter_extensions() {
            let stored = self.table.get(&row_word).map(|r| r.len()).unwrap_or(0);
            for i in stored..experiment_count {
                let input = concat(&row_word, &self.experiments[i]);
                let out = self.output(&input);
                self.table.entry(row_word.clone()).or_default().push(out);
            }
        }
    }

    /// Finds two base words with equal rows whose extensions disagree and returns the
    /// experiment that repairs the disagreement.
    fn inconsistency(&self) -> Option<Word<T::Symbol>> {
        let alphabet = self.teacher.alphabet();
        for (i, left) in self.base.iter().enumerate() {
            for right in &self.base[i + 1..] {
                if self.table.get(left) != self.table.get(right) {
                    continue;
                }
                for sym in alphabet {
                    let l = self
                        .table
                        .get(&push(left, sym))
                        .expect("extension rows are filled");
                    let r = self
                        .table
                        .get(&push(right, sym))
                        .expect("extension rows are filled");
                    if l == r {
                        continue;
                    }
                    for (j, experiment) in self.experiments.iter().enumerate() {
                        if l[j] != r[j] {
                            return Some(concat(&[sym.clone()], experiment));
                        }
                    }
                }
            }
        }
        None
    }

    /// Extension words whose rows occur in no base word, one per distinct row.
    fn rows_to_promote(&self) -> Vec<Word<T::Symbol>> {
        let known: Set<&Vec<T::Out>> = self
            .base
            .iter()
            .map(|b| self.table.get(b).expect("base rows are filled"))
            .collect();
        let mut chosen: Set<&Vec<T::Out>> = Set::default();
        let mut promote = Vec::new();
        for word in self.one_letter_extensions() {
            if self.base.contains(&word) {
                continue;
            }
            let row = self.table.get(&word).expect("extension rows are filled");
            if !known.contains(row) && chosen.insert(row) {
                promote.push(word.clone());
            }
        }
        promote
    }

    fn hypothesis(&mut self) -> Result<H, Error> {
        let alphabet = self.teacher.alphabet().to_vec();

        // one state per distinct base row, represented by the first word carrying it
        let mut representatives: Vec<Word<T::Symbol>> = Vec::new();
        let mut state_of_row: Map<&Vec<T::Out>, usize> = Map::default();
        for base_word in &self.base {
            let row = self.table.get(base_word).expect("base rows are filled");
            if !state_of_row.contains_key(row) {
                state_of_row.insert(row, representatives.len());
                representatives.push(base_word.clone());
            }
        }

        let mut transitions: Vec<(usize, T::Symbol, usize)> = Vec::new();
        for (state, representative) in representatives.iter().enumerate() {
            for sym in &alphabet {
                let row = self
                    .table
                    .get(&push(representative, sym))
                    .expect("extension rows are filled");
                let target = *state_of_row
                    .get(row)
                    .expect("can only build a hypothesis from a closed table");
                transitions.push((state, sym.clone(), target));
            }
        }

        let Self {
            queries, teacher, ..
        } = self;
        let mut query = |input: &[T::Symbol]| cached_query(queries, &mut **teacher, input);

        let mut states = Vec::with_capacity(representatives.len());
        for representative in &representatives {
            states.push((
                representative.clone(),
                H::state_label(representative, &mut query)?,
            ));
        }
        let mut edges = Vec::with_capacity(transitions.len());
        for (state, sym, target) in transitions {
            let out = H::edge_label(&representatives[state], &sym, &mut query)?;
            edges.push((state, sym, out, target));
        }
        H::assemble(&alphabet, states, edges)
    }

    fn process_counterexample(&mut self, counterexample: &[T::Symbol]) {
        for i in 1..=counterexample.len() {
            let prefix = counterexample[..i].to_vec();
            if !self.base.contains(&prefix) {
                self.base.push(prefix);
            }
        }
    }

    /// Runs the learning loop to completion and returns the certified hypothesis.
    pub fn run(mut self) -> Result<H, Error> {
        let start = Instant::now();
        let mut iteration = 0;
        while iteration < ITERATION_THRESHOLD {
            iteration += 1;
            self.update_table();
            trace!("iteration {iteration}, table\n{:?}", self);

            if let Some(experiment) = self.inconsistency() {
                trace!("table inconsistent, adding experiment {}", word::show(&experiment));
                debug_assert!(!self.experiments.contains(&experiment));
                self.experiments.push(experiment);
                continue;
            }
            let promote = self.rows_to_promote();
            if !promote.is_empty() {
                trace!(
                    "table not closed, promoting {}",
                    promote.iter().map(|w| word::show(w)).join(", ")
                );
                self.base.extend(promote);
                continue;
            }

            let mut hypothesis = self.hypothesis()?;
            if self.intermediate {
                if let Some(callback) = self.on_hypothesis.as_mut() {
                    callback(&hypothesis);
                }
            }
            match self.teacher.equivalence_query(&mut hypothesis) {
                Ok(()) => {
                    if !self.intermediate {
                        if let Some(callback) = self.on_hypothesis.as_mut() {
                            callback(&hypothesis);
                        }
                    }
                    info!(
                        "learned a {} state hypothesis in {}ms",
                        hypothesis.size(),
                        start.elapsed().as_millis()
                    );
                    return Ok(hypothesis);
                }
                Err(counterexample) => {
                    debug!("counterexample {}", word::show(&counterexample));
                    self.process_counterexample(&counterexample);
                }
            }
        }
        panic!("iteration threshold exceeded")
    }
}

impl<'a, T, H> std::fmt::Debug for LStarLearner<'a, T, H>
where
    T: Sul,
    H: BuildHypothesis<Symbol = T::Symbol, Out = T::Out>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builder = tabled::builder::Builder::default();
        let mut header = vec![String::new()];
        header.extend(self.experiments.iter().map(|e| word::show(e)));
        builder.push_record(header);

        for row_word in self.one_letter_extensions() {
            let mut record = if self.base.contains(&row_word) {
                vec![word::show(&row_word).blue().to_string()]
            } else {
                vec![word::show(&row_word)]
            };
            if let Some(row) = self.table.get(&row_word) {
                record.extend(row.iter().map(|out| format!("{out:?}")));
            }
            builder.push_record(record);
        }
        write!(f, "{}", builder.build())
    }
}
