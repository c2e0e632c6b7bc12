//! Entropy pool accumulation and stirring.
//!
//! The pool is a single 64-bit word. Samples enter by XOR followed by
//! a rotation so each round lands on fresh bit positions; after a full
//! generation pass an invertible mixer scrambles the bit layout. Both
//! operations are bijective on the pool and therefore cannot reduce
//! whatever entropy has been gathered.

use crate::noise::{DATA_SIZE_BITS, TIME_ENTROPY_BITS};

/// Derived from the first two SHA-1 initialization vectors (FIPS 180-4
/// section 5.3.1), high word first. The numbers themselves carry no
/// meaning beyond having a good mix of set and clear bits; tests pin
/// the chosen order.
const STIR_CONSTANT: u64 = 0x6745_2301_efcd_ab89;

/// Mixer start value, from the third and fourth SHA-1 initialization
/// vectors in the same order.
const STIR_SEED: u64 = 0x98ba_dcfe_1032_5476;

/// Folds one sample into the pool: XOR, then rotate left by the sample
/// width so consecutive samples cover the whole word.
pub(crate) fn accumulate(pool: u64, sample: u64) -> u64 {
    (pool ^ sample).rotate_left(TIME_ENTROPY_BITS)
}

/// Computes the stir mixer for the given pool value.
///
/// For every set bit of the pool the constant is XORed into the mixer,
/// with a one-bit rotation between positions, yielding one of 2^64
/// possible mixer values. The caller XORs the result back into the
/// pool. The mixer is not assumed to contain entropy of its own.
pub(crate) fn stir_mix(pool: u64) -> u64 {
    let mut mixer = STIR_SEED;
    for bit in 0..DATA_SIZE_BITS {
        if (pool >> bit) & 1 == 1 {
            mixer ^= STIR_CONSTANT;
        }
        mixer = mixer.rotate_left(1);
    }
    mixer
}
