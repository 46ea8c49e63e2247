//! Random generation of Mealy machines, mainly for producing test fixtures.

use fastrand::Rng;

use crate::machine::{Mealy, StateId};
use crate::word::{Output, Symbol};

/// Generates a transducer with `states` states over the given input and output alphabets.
///
/// The first input symbol forms a spine through all states, so every state is reachable;
/// all other transitions go to uniformly drawn states with uniformly drawn outputs. The
/// result is fully determined by the state of `rng`, a seeded generator reproduces the
/// same machine. Generated machines are not necessarily minimal, pass them through
/// [`Mealy::minimized`] when that matters.
pub fn random_mealy<S: Symbol, O: Output>(
    states: usize,
    inputs: &[S],
    outputs: &[O],
    rng: &mut Rng,
) -> Mealy<S, O> {
    assert!(states > 0, "a machine needs at least one state");
    assert!(
        !inputs.is_empty() && !outputs.is_empty(),
        "alphabets may not be empty"
    );
    let mut mm = Mealy::new("s0");
    for i in 1..states {
        mm.add_state(format!("s{i}"))
            .expect("generated state names are unique");
    }
    for state in 0..states {
        for (k, input) in inputs.iter().enumerate() {
            let target = if k == 0 && state + 1 < states {
                state + 1
            } else {
                rng.usize(0..states)
            };
            let output = outputs[rng.usize(0..outputs.len())].clone();
            mm.add_edge(
                state as StateId,
                input.clone(),
                output,
                target as StateId,
            )
            .expect("one edge per state and input");
        }
    }
    mm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distset::{distinguishing_set, verify_distinguishing_set, Method};
    use crate::dot::mealy_to_dot;
    use crate::machine::Machine;
    use crate::sul::Sul;

    const INPUTS: [char; 4] = ['a', 'b', 'c', 'd'];
    const OUTPUTS: [&str; 3] = ["x", "y", "z"];

    #[test]
    fn generation_is_reproducible() {
        let first = random_mealy(30, &INPUTS, &OUTPUTS, &mut Rng::with_seed(7));
        let second = random_mealy(30, &INPUTS, &OUTPUTS, &mut Rng::with_seed(7));
        assert_eq!(mealy_to_dot(&first), mealy_to_dot(&second));
    }

    #[test]
    fn generated_machines_are_total_and_reachable() {
        let mm = random_mealy(30, &INPUTS, &OUTPUTS, &mut Rng::with_seed(3));
        assert_eq!(mm.size(), 30);
        assert_eq!(mm.alphabet(), INPUTS.to_vec());
        for q in mm.state_ids() {
            for input in &INPUTS {
                assert!(mm.edge(q, input).is_some());
            }
        }
    }

    #[test]
    fn minimized_generations_verify() {
        let mm = random_mealy(12, &INPUTS, &OUTPUTS, &mut Rng::with_seed(11));
        let min = mm.minimized();
        assert!(min.size() <= mm.size());
        for method in [Method::Hopcroft, Method::Moore] {
            let dset = distinguishing_set(&min, method);
            assert!(verify_distinguishing_set(&min, &dset).is_ok());
        }
    }
}
