//! Partition refinement with separating-suffix bookkeeping.
//!
//! Both algorithms maintain the same invariant: the moment two states land in different
//! blocks, a suffix witnessing the difference is recorded for that pair. Composed suffixes
//! always consult pairs that were separated in an earlier step, so every lookup hits.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use tracing::trace;

use crate::machine::{Machine, StateId};
use crate::math::{Map, Partition};
use crate::sul::Sul;
use crate::word::Word;

pub(crate) struct Refinement<S> {
    pub(crate) partition: Partition<StateId>,
    pub(crate) seps: Map<(StateId, StateId), Word<S>>,
}

fn pair(a: StateId, b: StateId) -> (StateId, StateId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Groups `states` by their response to the empty input. Cross pairs are separated by the
/// empty word itself, which never enters a distinguishing set but serves as the base case
/// for suffix composition.
fn initial_blocks<M: Machine>(
    machine: &M,
    states: &[StateId],
    seps: &mut Map<(StateId, StateId), Word<M::Symbol>>,
) -> Vec<Vec<StateId>> {
    let mut blocks: Vec<Vec<StateId>> = Vec::new();
    let mut index: Map<M::Out, usize> = Map::default();
    for &q in states {
        let out = machine.state_out(q);
        let slot = *index.entry(out).or_insert_with(|| {
            blocks.push(Vec::new());
            blocks.len() - 1
        });
        blocks[slot].push(q);
    }
    for i in 0..blocks.len() {
        for j in i + 1..blocks.len() {
            for &qa in &blocks[i] {
                for &qb in &blocks[j] {
                    seps.insert(pair(qa, qb), Vec::new());
                }
            }
        }
    }
    blocks
}

/// Finds a suffix separating `qa` from `qb`, assuming their one-step signatures differ
/// under the current block assignment.
fn split_suffix<M: Machine>(
    machine: &M,
    alphabet: &[M::Symbol],
    qa: StateId,
    qb: StateId,
    class_of: &Map<StateId, usize>,
    seps: &Map<(StateId, StateId), Word<M::Symbol>>,
) -> Word<M::Symbol> {
    for a in alphabet {
        match (machine.edge(qa, a), machine.edge(qb, a)) {
            (None, None) => continue,
            (Some(_), None) | (None, Some(_)) => return vec![a.clone()],
            (Some((ta, oa)), Some((tb, ob))) => {
                if oa != ob {
                    return vec![a.clone()];
                }
                if class_of[&ta] != class_of[&tb] {
                    let mut suffix = vec![a.clone()];
                    suffix.extend(
                        seps.get(&pair(ta, tb))
                            .expect("separated successors have a recorded suffix")
                            .iter()
                            .cloned(),
                    );
                    return suffix;
                }
            }
        }
    }
    unreachable!("states in different subgroups must differ on some symbol")
}

/// Iterated table filling: recomputes the k-equivalence classes until they stabilize.
pub(crate) fn moore<M: Machine>(machine: &M) -> Refinement<M::Symbol> {
    let states = machine.state_ids();
    let alphabet = machine.alphabet();
    let mut seps: Map<(StateId, StateId), Word<M::Symbol>> = Map::default();
    let mut blocks = initial_blocks(machine, &states, &mut seps);

    let mut class_of: Map<StateId, usize> = Map::default();
    let mut rounds = 0usize;
    loop {
        class_of.clear();
        for (b, block) in blocks.iter().enumerate() {
            for &q in block {
                class_of.insert(q, b);
            }
        }

        let mut changed = false;
        let mut next: Vec<Vec<StateId>> = Vec::new();
        for block in &blocks {
            // subgroup by one-step signature, preserving member order
            let mut groups: Vec<(Vec<Option<(M::EdgeOut, usize)>>, Vec<StateId>)> = Vec::new();
            for &q in block {
                let sig: Vec<Option<(M::EdgeOut, usize)>> = alphabet
                    .iter()
                    .map(|a| machine.edge(q, a).map(|(t, o)| (o, class_of[&t])))
                    .collect();
                match groups.iter_mut().find(|(key, _)| *key == sig) {
                    Some((_, members)) => members.push(q),
                    None => groups.push((sig, vec![q])),
                }
            }
            if groups.len() > 1 {
                changed = true;
                for i in 0..groups.len() {
                    for j in i + 1..groups.len() {
                        for &qa in &groups[i].1 {
                            for &qb in &groups[j].1 {
                                let suffix =
                                    split_suffix(machine, &alphabet, qa, qb, &class_of, &seps);
                                seps.insert(pair(qa, qb), suffix);
                            }
                        }
                    }
                }
            }
            next.extend(groups.into_iter().map(|(_, members)| members));
        }
        if !changed {
            break;
        }
        blocks = next;
        rounds += 1;
    }
    trace!("moore refinement stabilized after {rounds} rounds");
    Refinement {
        partition: Partition::new(blocks),
        seps,
    }
}

/// Worklist driven refinement. Blocks are first split on the outputs of every symbol, the
/// worklist then refines on successor membership with smaller-half scheduling.
pub(crate) fn hopcroft<M: Machine>(machine: &M) -> Refinement<M::Symbol> {
    let states = machine.state_ids();
    let alphabet = machine.alphabet();
    let position: Map<StateId, usize> = states.iter().enumerate().map(|(i, &q)| (q, i)).collect();
    let mut seps: Map<(StateId, StateId), Word<M::Symbol>> = Map::default();
    let mut blocks = initial_blocks(machine, &states, &mut seps);

    // split on emitted outputs so the worklist only has to deal with successor blocks
    for a in &alphabet {
        let count = blocks.len();
        for b in 0..count {
            let mut groups: Vec<(Option<M::EdgeOut>, Vec<StateId>)> = Vec::new();
            for &q in &blocks[b] {
                let key = machine.edge(q, a).map(|(_, o)| o);
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, members)) => members.push(q),
                    None => groups.push((key, vec![q])),
                }
            }
            if groups.len() > 1 {
                for i in 0..groups.len() {
                    for j in i + 1..groups.len() {
                        for &qa in &groups[i].1 {
                            for &qb in &groups[j].1 {
                                seps.insert(pair(qa, qb), vec![a.clone()]);
                            }
                        }
                    }
                }
                let mut parts = groups.into_iter().map(|(_, members)| members);
                blocks[b] = parts.next().expect("at least two groups");
                blocks.extend(parts);
            }
        }
    }

    let mut work: VecDeque<(Vec<StateId>, M::Symbol)> = VecDeque::new();
    for block in &blocks {
        for a in &alphabet {
            work.push_back((block.clone(), a.clone()));
        }
    }

    while let Some((splitter, a)) = work.pop_front() {
        let mut in_splitter = FixedBitSet::with_capacity(states.len());
        for q in &splitter {
            in_splitter.insert(position[q]);
        }
        let count = blocks.len();
        for b in 0..count {
            let (mut hit, mut miss) = (Vec::new(), Vec::new());
            for &q in &blocks[b] {
                match machine.successor(q, &a) {
                    Some(t) if in_splitter.contains(position[&t]) => hit.push(q),
                    _ => miss.push(q),
                }
            }
            if hit.is_empty() || miss.is_empty() {
                continue;
            }
            for &qa in &hit {
                for &qb in &miss {
                    let suffix = match (machine.successor(qa, &a), machine.successor(qb, &a)) {
                        (Some(ta), Some(tb)) => {
                            let mut suffix = vec![a.clone()];
                            suffix.extend(
                                seps.get(&pair(ta, tb))
                                    .expect("successors on opposite sides of a splitter are separated")
                                    .iter()
                                    .cloned(),
                            );
                            suffix
                        }
                        // blocks are output uniform after the pre-split, so members of
                        // the same block either all have this edge or all lack it
                        _ => unreachable!("hit members carry an edge into the splitter"),
                    };
                    seps.insert(pair(qa, qb), suffix);
                }
            }
            let smaller = if hit.len() <= miss.len() {
                hit.clone()
            } else {
                miss.clone()
            };
            blocks[b] = hit;
            blocks.push(miss);
            for sym in &alphabet {
                work.push_back((smaller.clone(), sym.clone()));
            }
        }
    }

    Refinement {
        partition: Partition::new(blocks),
        seps,
    }
}
