//! Helpers shared by in-crate unit tests.

use core::hash::{BuildHasher, Hasher};

/// Forces every key into slot 0 so chains are exercised deterministically.
#[derive(Clone, Default)]
pub(crate) struct ConstBuildHasher;

pub(crate) struct ConstHasher;

impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}

impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

/// Hashes `u32` keys to themselves, giving each key a predictable slot.
#[derive(Clone, Default)]
pub(crate) struct IdentityBuildHasher;

#[derive(Default)]
pub(crate) struct IdentityHasher(u64);

impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher(0)
    }
}

impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | b as u64;
        }
    }
    fn write_u32(&mut self, n: u32) {
        self.0 = n as u64;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}
