//! Jitter noise sources.
//!
//! The collector draws its entropy from the execution timing of the
//! operations in this module: the time-folding loop whose duration is
//! the measured signal, and the memory walk that adds cache wait-state
//! variance to each measurement.

mod fold;
mod memory;

pub use fold::{DATA_SIZE_BITS, DATA_SIZE_BYTES, TIME_ENTROPY_BITS};
pub use memory::MemoryAccess;

pub(crate) use fold::{
    fold_once, fold_time, loop_shuffle, MAX_FOLD_LOOP_BIT, MIN_FOLD_LOOP_BIT,
};
