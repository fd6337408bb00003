/// Hash function injected into the extendible hash table. The key's byte
/// stream is mixed into a 32-bit value whose high bits select the
/// directory and whose low bits select the bucket.
pub trait KeyHasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> u32;
}

/// FNV-1a, 32-bit. Cheap and well distributed for short integer keys.
pub struct Fnv1aHasher;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

impl KeyHasher for Fnv1aHasher {
    fn hash(&self, bytes: &[u8]) -> u32 {
        let mut hash = FNV_OFFSET_BASIS;
        for &byte in bytes {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }
}

/// Passes the first four little-endian bytes through unchanged. Used by
/// tests that need full control over directory and bucket placement.
pub struct IdentityHasher;

impl KeyHasher for IdentityHasher {
    fn hash(&self, bytes: &[u8]) -> u32 {
        let mut word = [0u8; 4];
        for (i, &byte) in bytes.iter().take(4).enumerate() {
            word[i] = byte;
        }
        u32::from_le_bytes(word)
    }
}
