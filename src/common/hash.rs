//! Placement hashing for ringkv
//!
//! Node positions on the ring and key placements both come from the same
//! function: a BLAKE3 digest truncated to its first 4 bytes, read
//! big-endian as a `u32`. Collisions are handled by numeric wraparound on
//! the ring, nothing stronger.

/// Hash a string onto the 32-bit ring space.
pub fn key_hash(data: &str) -> u32 {
    let digest = blake3::hash(data.as_bytes());
    u32::from_be_bytes(digest.as_bytes()[..4].try_into().unwrap())
}
