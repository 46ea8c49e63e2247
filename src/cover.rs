//! State covers: one shortest access sequence per reachable state.

use std::collections::VecDeque;

use crate::machine::Machine;
use crate::sul::Sul;
use crate::math::Set;
use crate::word::{push, Word};

/// Computes a state cover of `machine` by breadth-first traversal over the sorted alphabet.
///
/// The result contains exactly one access sequence per reachable state, always the
/// shortest one discovered, in discovery order. The first entry is the empty sequence for
/// the initial state. Given the same machine the same cover comes out every time.
pub fn state_cover<M: Machine>(machine: &M) -> Vec<Word<M::Symbol>> {
    let alphabet = machine.alphabet();
    let mut seen: Set<_> = Set::default();
    seen.insert(machine.initial());
    let mut queue = VecDeque::from([(Word::new(), machine.initial())]);
    let mut cover = Vec::new();
    while let Some((path, state)) = queue.pop_front() {
        for symbol in &alphabet {
            if let Some(target) = machine.successor(state, symbol) {
                if seen.insert(target) {
                    queue.push_back((push(&path, symbol), target));
                }
            }
        }
        cover.push(path);
    }
    cover
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Mealy;
    use crate::math::Set;

    #[test]
    fn cover_reaches_every_state_once() {
        let mm: Mealy<char, &'static str> = Mealy::builder()
            .with_edge("1", 'a', "nice", "2")
            .with_edge("1", 'b', "B", "1")
            .with_edge("2", 'a', "nice", "3")
            .with_edge("2", 'b', "back", "1")
            .with_edge("3", 'a', "A", "3")
            .with_edge("3", 'b', "back", "1")
            .build()
            .unwrap();

        let cover = state_cover(&mm);
        assert_eq!(cover.len(), mm.size());
        assert_eq!(cover[0], Vec::<char>::new());

        let mut reached = Set::default();
        for access in &cover {
            let mut q = mm.initial();
            for a in access {
                q = mm.successor(q, a).unwrap();
            }
            reached.insert(q);
        }
        assert!(mm.state_ids().iter().all(|q| reached.contains(q)));
    }
}
