//! Finite input words and the bounds on symbol and output types.
//!
//! A [`Word`] is simply a vector of input symbols. Learners and oracles deal in words
//! exclusively, the machines in [`crate::machine`] consume them symbol by symbol.

use itertools::Itertools;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// An input symbol. Anything that can be cloned, compared, hashed, ordered and printed
/// qualifies, so `char`, `&str`, `String` and integer types all work out of the box.
pub trait Symbol: Clone + Eq + Hash + Ord + Debug + Display {}
impl<T: Clone + Eq + Hash + Ord + Debug + Display> Symbol for T {}

/// An output that a system under learning may produce. Acceptors produce `bool`,
/// transducers produce their output tokens wrapped in `Option`.
pub trait Output: Clone + Eq + Hash + Ord + Debug {}
impl<T: Clone + Eq + Hash + Ord + Debug> Output for T {}

/// A finite word over the symbol type `S`.
pub type Word<S> = Vec<S>;

/// Renders a word for log and table output. The empty word is shown as ε.
pub fn show<S: Symbol>(word: &[S]) -> String {
    if word.is_empty() {
        "ε".to_string()
    } else {
        word.iter().map(|sym| sym.to_string()).join("")
    }
}

/// Returns the concatenation of `prefix` and `suffix` as a fresh word.
pub fn concat<S: Symbol>(prefix: &[S], suffix: &[S]) -> Word<S> {
    let mut out = Vec::with_capacity(prefix.len() + suffix.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(suffix);
    out
}

/// Returns `prefix` extended by a single symbol.
pub fn push<S: Symbol>(prefix: &[S], symbol: &S) -> Word<S> {
    let mut out = Vec::with_capacity(prefix.len() + 1);
    out.extend_from_slice(prefix);
    out.push(symbol.clone());
    out
}

/// Enumerates all words over `alphabet` of length at most `max_len` in length
/// lexicographic order, starting with the empty word.
pub fn words_up_to<S: Symbol>(alphabet: &[S], max_len: usize) -> Vec<Word<S>> {
    let mut out: Vec<Word<S>> = vec![vec![]];
    let mut frontier: Vec<Word<S>> = vec![vec![]];
    for _ in 0..max_len {
        let mut next = Vec::with_capacity(frontier.len() * alphabet.len());
        for w in &frontier {
            for a in alphabet {
                next.push(push(w, a));
            }
        }
        out.extend(next.iter().cloned());
        frontier = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_words() {
        assert_eq!(show::<char>(&[]), "ε");
        assert_eq!(show(&['a', 'b']), "ab");
    }

    #[test]
    fn word_enumeration_is_length_lexicographic() {
        let words = words_up_to(&['a', 'b'], 2);
        assert_eq!(
            words,
            vec![
                vec![],
                vec!['a'],
                vec!['b'],
                vec!['a', 'a'],
                vec!['a', 'b'],
                vec!['b', 'a'],
                vec!['b', 'b']
            ]
        );
    }
}
