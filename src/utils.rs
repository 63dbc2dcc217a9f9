use std::hash::{BuildHasher, Hasher};

/// A hasher that passes an already-hashed u64 key straight through. The
/// registry keys its meter map by a precomputed mid, so hashing the key a
/// second time would be wasted work.
pub(crate) struct MidHasher {
    mid: u64,
}

impl Hasher for MidHasher {
    fn finish(&self) -> u64 {
        self.mid
    }

    fn write(&mut self, _bytes: &[u8]) {
        debug_assert!(false, "MidHasher only accepts u64 keys that were already hashed");
    }

    fn write_u64(&mut self, i: u64) {
        self.mid = i;
    }
}

/// [`BuildHasher`] for maps keyed by a precomputed mid.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct BuildMidHasher;

impl BuildHasher for BuildMidHasher {
    type Hasher = MidHasher;

    fn build_hasher(&self) -> Self::Hasher {
        MidHasher { mid: 0 }
    }
}
