//! Poseidon2 hash over the BN254 scalar field.
//!
//! This is the Poseidon2 instance used by Noir's `std::hash::poseidon2` and
//! Aztec's `poseidon2Hash`, so digests computed here match the circuit
//! gate-for-gate.
//!
//! # Permutation
//!
//! - state width t = 4, S-box x^5
//! - 8 full rounds (4 before, 4 after) and 56 partial rounds
//! - external layer: the HorizenLabs 4x4 matrix
//! - internal layer: `diag(mu) + J`, i.e. `s_i <- s_i * mu_i + sum(s)`
//!
//! # Sponge
//!
//! ```text
//! rate = 3, capacity = 1
//! state[3] = message_length * 2^64      (domain separation IV)
//! absorb:  buffer up to 3 inputs, duplex when a fourth arrives
//! squeeze: zero-pad the buffer, add into state[0..3], permute, output state[0]
//! ```

mod constants;

use halo2curves_axiom::{bn256::Fr, ff::Field};
use once_cell::sync::Lazy;

use crate::{Error, FieldElement, Result};

/// Permutation state width.
pub const WIDTH: usize = 4;
/// Sponge rate (the remaining lane is capacity).
pub const RATE: usize = 3;
/// Number of full rounds, split evenly around the partial rounds.
pub const FULL_ROUNDS: usize = 8;
/// Number of partial rounds.
pub const PARTIAL_ROUNDS: usize = 56;
/// Total rounds.
pub const ROUNDS: usize = FULL_ROUNDS + PARTIAL_ROUNDS;

struct Params {
    round_constants: [[Fr; WIDTH]; ROUNDS],
    internal_diagonal: [Fr; WIDTH],
}

static PARAMS: Lazy<Params> = Lazy::new(|| Params {
    round_constants: constants::ROUND_CONSTANTS.map(|round| round.map(Fr::from_raw)),
    internal_diagonal: constants::INTERNAL_MATRIX_DIAGONAL.map(Fr::from_raw),
});

#[inline]
fn sbox(x: Fr) -> Fr {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}

/// Multiply by the external matrix
/// `[[5,7,1,3],[4,6,1,1],[1,3,5,7],[1,1,4,6]]` using the 8-addition chain.
fn external_layer(state: &mut [Fr; WIDTH]) {
    let t0 = state[0] + state[1];
    let t1 = state[2] + state[3];
    let t2 = state[1].double() + t1;
    let t3 = state[3].double() + t0;
    let t4 = t1.double().double() + t3;
    let t5 = t0.double().double() + t2;
    let t6 = t3 + t5;
    let t7 = t2 + t4;
    *state = [t6, t5, t7, t4];
}

fn internal_layer(state: &mut [Fr; WIDTH], diagonal: &[Fr; WIDTH]) {
    let sum = state.iter().fold(Fr::ZERO, |acc, s| acc + *s);
    for (s, mu) in state.iter_mut().zip(diagonal.iter()) {
        *s = *s * *mu + sum;
    }
}

fn permute_in_place(state: &mut [Fr; WIDTH]) {
    let params = &*PARAMS;
    let half_full = FULL_ROUNDS / 2;

    external_layer(state);

    for rc in &params.round_constants[..half_full] {
        for (s, c) in state.iter_mut().zip(rc.iter()) {
            *s = sbox(*s + *c);
        }
        external_layer(state);
    }

    for rc in &params.round_constants[half_full..half_full + PARTIAL_ROUNDS] {
        state[0] = sbox(state[0] + rc[0]);
        internal_layer(state, &params.internal_diagonal);
    }

    for rc in &params.round_constants[half_full + PARTIAL_ROUNDS..] {
        for (s, c) in state.iter_mut().zip(rc.iter()) {
            *s = sbox(*s + *c);
        }
        external_layer(state);
    }
}

/// Apply the raw Poseidon2 permutation to a full state.
pub fn permute(state: [FieldElement; WIDTH]) -> [FieldElement; WIDTH] {
    let mut inner = state.map(Fr::from);
    permute_in_place(&mut inner);
    inner.map(FieldElement::from)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Absorb,
    Squeeze,
}

/// Incremental Poseidon2 sponge for a message of known length.
///
/// The message length is bound into the capacity lane up front, so the
/// sponge refuses to absorb more elements than declared and refuses to
/// squeeze before all of them have arrived.
#[derive(Clone, Debug)]
pub struct Poseidon2Sponge {
    state: [Fr; WIDTH],
    cache: [Fr; RATE],
    cache_size: usize,
    mode: Mode,
    message_length: usize,
    absorbed: usize,
}

impl Poseidon2Sponge {
    pub fn new(message_length: usize) -> Self {
        let two_pow_64 = Fr::from_raw([0, 1, 0, 0]);
        let iv = Fr::from(message_length as u64) * two_pow_64;
        Self {
            state: [Fr::ZERO, Fr::ZERO, Fr::ZERO, iv],
            cache: [Fr::ZERO; RATE],
            cache_size: 0,
            mode: Mode::Absorb,
            message_length,
            absorbed: 0,
        }
    }

    pub fn absorb(&mut self, input: FieldElement) -> Result<()> {
        if self.mode == Mode::Squeeze {
            return Err(Error::HashFailure(
                "cannot absorb after the sponge has been squeezed".into(),
            ));
        }
        if self.absorbed == self.message_length {
            return Err(Error::HashFailure(format!(
                "sponge declared for {} elements, refusing element {}",
                self.message_length,
                self.absorbed + 1
            )));
        }
        self.push(input.into());
        Ok(())
    }

    /// Squeeze the next output. The first output is the message digest.
    pub fn squeeze(&mut self) -> Result<FieldElement> {
        if self.absorbed != self.message_length {
            return Err(Error::HashFailure(format!(
                "sponge declared for {} elements but only {} were absorbed",
                self.message_length, self.absorbed
            )));
        }
        Ok(self.pull().into())
    }

    fn push(&mut self, input: Fr) {
        if self.cache_size == RATE {
            self.duplex();
            self.cache[0] = input;
            self.cache_size = 1;
        } else {
            self.cache[self.cache_size] = input;
            self.cache_size += 1;
        }
        self.absorbed += 1;
    }

    fn pull(&mut self) -> Fr {
        if self.mode == Mode::Squeeze && self.cache_size == 0 {
            self.mode = Mode::Absorb;
        }
        if self.mode == Mode::Absorb {
            let output = self.duplex();
            self.cache = output;
            self.cache_size = RATE;
            self.mode = Mode::Squeeze;
        }
        let result = self.cache[0];
        self.cache.copy_within(1.., 0);
        self.cache_size -= 1;
        self.cache[self.cache_size] = Fr::ZERO;
        result
    }

    fn duplex(&mut self) -> [Fr; RATE] {
        for cached in self.cache.iter_mut().skip(self.cache_size) {
            *cached = Fr::ZERO;
        }
        for (s, c) in self.state.iter_mut().zip(self.cache.iter()) {
            *s += *c;
        }
        permute_in_place(&mut self.state);
        self.cache_size = 0;
        [self.state[0], self.state[1], self.state[2]]
    }
}

/// Poseidon2 digest of a fixed-length message.
pub fn poseidon2_hash(inputs: &[FieldElement]) -> FieldElement {
    let mut sponge = Poseidon2Sponge::new(inputs.len());
    for input in inputs {
        sponge.push((*input).into());
    }
    sponge.pull().into()
}

/// Two-to-one Poseidon2 digest, the `Hash2` used by key agreement and the
/// keystream.
pub fn hash2(left: FieldElement, right: FieldElement) -> FieldElement {
    poseidon2_hash(&[left, right])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(hex: &str) -> FieldElement {
        FieldElement::from_hex(hex).unwrap()
    }

    #[test]
    fn permutation_known_answer() {
        let input = [0u64, 1, 2, 3].map(FieldElement::from_u64);
        let output = permute(input);
        assert_eq!(
            output,
            [
                fe("0x01bd538c2ee014ed5141b29e9ae240bf8db3fe5b9a38629a9647cf8d76c01737"),
                fe("0x239b62e7db98aa3a2a8f6a0d2fa1709e7a35959aa6c7034814d9daa90cbac662"),
                fe("0x04cbb44c61d928ed06808456bf758cbf0c18d1e15a7b6dbc8245fa7515d5e3cb"),
                fe("0x2e11c5cff2a22c64d01304b778d78f6998eff1ab73163a35603f54794c30847a"),
            ]
        );
    }

    #[test]
    fn hash2_known_answer() {
        let digest = hash2(FieldElement::from_u64(1), FieldElement::from_u64(2));
        assert_eq!(
            digest,
            fe("0x038682aa1cb5ae4e0a3f13da432a95c77c5c111f6f030faf9cad641ce1ed7383")
        );
    }

    #[test]
    fn hash_is_deterministic_and_order_sensitive() {
        let a = FieldElement::from_u64(7);
        let b = FieldElement::from_u64(11);
        assert_eq!(hash2(a, b), hash2(a, b));
        assert_ne!(hash2(a, b), hash2(b, a));
    }

    #[test]
    fn length_is_bound_into_digest() {
        let zero = FieldElement::ZERO;
        assert_ne!(poseidon2_hash(&[zero]), poseidon2_hash(&[zero, zero]));
    }

    #[test]
    fn sponge_matches_one_shot_hash() {
        let inputs: Vec<FieldElement> = (1..=5).map(FieldElement::from_u64).collect();
        let mut sponge = Poseidon2Sponge::new(inputs.len());
        for input in &inputs {
            sponge.absorb(*input).unwrap();
        }
        assert_eq!(sponge.squeeze().unwrap(), poseidon2_hash(&inputs));
    }

    #[test]
    fn sponge_rejects_extra_input() {
        let mut sponge = Poseidon2Sponge::new(1);
        sponge.absorb(FieldElement::ONE).unwrap();
        let err = sponge.absorb(FieldElement::ONE).unwrap_err();
        assert!(matches!(err, Error::HashFailure(_)));
    }

    #[test]
    fn sponge_rejects_early_squeeze() {
        let mut sponge = Poseidon2Sponge::new(2);
        sponge.absorb(FieldElement::ONE).unwrap();
        assert!(matches!(sponge.squeeze(), Err(Error::HashFailure(_))));
    }

    #[test]
    fn sponge_rejects_absorb_after_squeeze() {
        let mut sponge = Poseidon2Sponge::new(0);
        sponge.squeeze().unwrap();
        assert!(matches!(
            sponge.absorb(FieldElement::ONE),
            Err(Error::HashFailure(_))
        ));
    }

    #[test]
    fn successive_squeezes_differ() {
        let mut sponge = Poseidon2Sponge::new(0);
        let outputs: Vec<FieldElement> = (0..5).map(|_| sponge.squeeze().unwrap()).collect();
        for (i, a) in outputs.iter().enumerate() {
            for b in &outputs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
