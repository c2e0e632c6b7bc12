//! Memory-access noise source.
//!
//! Walks a buffer larger than a typical L1 data cache so that each
//! access rides through an unpredictable number of CPU wait states.
//! The walk happens immediately before a timing measurement; its only
//! purpose is to vary the duration the caller then measures.

use core::hint::black_box;

use zeroize::{Zeroize, Zeroizing};

use crate::collector::AllocError;

/// Stride between touched locations in bytes.
pub(crate) const MEMORY_BLOCKSIZE: usize = 64;

/// Number of distinct locations visited by the walk.
pub(crate) const MEMORY_BLOCKS: usize = 512;

/// Walk steps performed per invocation.
pub(crate) const MEMORY_ACCESSLOOPS: usize = 128;

/// Scratch region for the memory-access noise source.
///
/// Each step reads, increments and writes back one byte, forcing the
/// cache line dirty so eviction traffic varies, then advances by
/// `block_size - 1` modulo the buffer size. With the stride and buffer
/// size coprime the walk visits every location evenly. The buffer is
/// wiped on drop.
pub struct MemoryAccess {
    buffer: Zeroizing<Vec<u8>>,
    block_size: usize,
    blocks: usize,
    access_loops: usize,
    location: usize,
}

impl MemoryAccess {
    /// Allocates a zero-filled scratch region with the default
    /// geometry (32 KiB, 128 steps per invocation).
    pub fn new() -> Result<Self, AllocError> {
        Self::with_geometry(MEMORY_BLOCKSIZE, MEMORY_BLOCKS, MEMORY_ACCESSLOOPS)
    }

    pub(crate) fn with_geometry(
        block_size: usize,
        blocks: usize,
        access_loops: usize,
    ) -> Result<Self, AllocError> {
        let size = block_size * blocks;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size).map_err(|_| AllocError)?;
        buffer.resize(size, 0);
        Ok(Self {
            buffer: Zeroizing::new(buffer),
            block_size,
            blocks,
            access_loops,
            location: 0,
        })
    }

    /// Runs one invocation of the walk.
    pub fn touch(&mut self) {
        let wrap = self.block_size * self.blocks;
        for _ in 0..self.access_loops {
            let cell = &mut self.buffer[self.location];
            *cell = cell.wrapping_add(1);
            black_box(*cell);
            self.location = (self.location + self.block_size - 1) % wrap;
        }
    }

    /// Returns the scratch bytes (inspection only).
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

impl std::fmt::Debug for MemoryAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAccess")
            .field("bytes", &self.buffer.len())
            .field("block_size", &self.block_size)
            .field("blocks", &self.blocks)
            .field("access_loops", &self.access_loops)
            .finish()
    }
}

impl Zeroize for MemoryAccess {
    fn zeroize(&mut self) {
        self.buffer.zeroize();
        self.location = 0;
    }
}
