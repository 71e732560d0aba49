//! # Key Hashing
//!
//! 64-bit FNV-1a over raw bytes. The output must be identical across
//! processes, platforms and releases: schema creation and data loading run
//! in separate transactions (possibly separate processes) and both derive
//! partition membership from this value.

/// FNV 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a byte slice. Empty input returns [`FNV_OFFSET_BASIS`].
#[inline]
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash the UTF-8 bytes of a string.
#[inline]
pub fn fnv1a_str(value: &str) -> u64 {
    fnv1a_64(value.as_bytes())
}
