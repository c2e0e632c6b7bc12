//! rand ecosystem adapter.
//!
//! Lets the collector slot in anywhere a [`rand_core::RngCore`] is
//! expected. The jitter source is slow by design; use it to seed a
//! CSPRNG rather than as a bulk generator.

use rand_core::RngCore;

use super::core::EntropyCollector;
use crate::timing::TimeSource;

impl<C: TimeSource> RngCore for EntropyCollector<C> {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_ne_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest)
            .expect("jitter entropy source failed its continuous self-test")
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.read(dest).map(|_| ()).map_err(rand_core::Error::new)
    }
}
