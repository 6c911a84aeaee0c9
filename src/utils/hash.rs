use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Returns the 64-bits hash value of `T`.
pub fn hash64<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}
