//! The system under learning capability.

use crate::math::Map;
use crate::word::{Output, Symbol, Word};

/// The contract every black-box target and every learned hypothesis implements.
///
/// A system under learning can be reset to its initial state, consume a sequence of inputs
/// and report the resulting output, and report its input alphabet. For a transducer the
/// output of a sequence is the output of the last transition taken, for an acceptor it is
/// whether the reached state accepts. The trait is object safe, so heterogeneous adapters
/// can be passed around as `&mut dyn Sul<..>`.
pub trait Sul {
    /// The input symbol type.
    type Symbol: Symbol;
    /// What processing an input sequence yields.
    type Out: Output;

    /// Puts the system back into its initial state.
    fn reset(&mut self);

    /// Consumes `input` starting from the current state and returns the resulting output.
    /// Consecutive calls compose, callers that want a fresh run must [`Sul::reset`] first.
    fn process(&mut self, input: &[Self::Symbol]) -> Self::Out;

    /// The input alphabet, sorted so that iteration over it is deterministic.
    fn alphabet(&self) -> Vec<Self::Symbol>;
}

/// A transparent memoizing wrapper around a system under learning.
///
/// Queries are keyed by the full trace since the last reset, so the wrapper behaves
/// observationally identical to the wrapped system, it is only faster on repeats. On a cache
/// miss the inner system is reset and replayed from scratch, which keeps the wrapper correct
/// even when callers interleave `process` calls without resets.
#[derive(Debug)]
pub struct CachedSul<T: Sul> {
    inner: T,
    trace: Word<T::Symbol>,
    cache: Map<Word<T::Symbol>, T::Out>,
    hits: u64,
    misses: u64,
}

impl<T: Sul> CachedSul<T> {
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            trace: Vec::new(),
            cache: Map::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// How many queries were answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// How many queries had to go through to the wrapped system.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Unwraps the inner system, dropping the cache.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Sul> Sul for CachedSul<T> {
    type Symbol = T::Symbol;
    type Out = T::Out;

    fn reset(&mut self) {
        self.trace.clear();
    }

    fn process(&mut self, input: &[Self::Symbol]) -> Self::Out {
        self.trace.extend_from_slice(input);
        if let Some(out) = self.cache.get(&self.trace) {
            self.hits += 1;
            return out.clone();
        }
        self.misses += 1;
        self.inner.reset();
        let out = self.inner.process(&self.trace);
        self.cache.insert(self.trace.clone(), out.clone());
        out
    }

    fn alphabet(&self) -> Vec<Self::Symbol> {
        self.inner.alphabet()
    }
}
