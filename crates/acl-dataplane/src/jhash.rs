//! Bob Jenkins' lookup3 hash, single-block variant.
//!
//! This is the same function the Linux kernel exposes as `jhash()`,
//! restricted to keys of at most 12 bytes. The control plane hashes rules
//! with it at install time and the data path re-derives the hash per packet,
//! so the two must agree bit for bit.

/// Arbitrary initial value folded into the internal state.
pub const JHASH_INITVAL: u32 = 0xdead_beef;

/// Longest key accepted by the single-block variant.
pub const JHASH_MAX_KEY_LEN: usize = 12;

struct KeyLen<const N: usize>;

impl<const N: usize> KeyLen<N> {
    const CHECK: () = assert!(N <= JHASH_MAX_KEY_LEN, "jhash keys are at most 12 bytes");
}

/// Final mixing of three 32-bit values into `c`.
#[inline(always)]
const fn final_mix(mut a: u32, mut b: u32, mut c: u32) -> u32 {
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(14));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(11));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(25));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(16));
    a ^= c;
    a = a.wrapping_sub(c.rotate_left(4));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(14));
    c ^= b;
    c = c.wrapping_sub(b.rotate_left(24));
    c
}

/// Hashes a key of at most 12 bytes. Callers guarantee the bound.
#[inline(always)]
fn hash_block(key: &[u8], seed: u32) -> u32 {
    let init = JHASH_INITVAL
        .wrapping_add(key.len() as u32)
        .wrapping_add(seed);
    let (mut a, mut b, mut c) = (init, init, init);

    if key.is_empty() {
        return c;
    }

    // Little-endian accumulation: bytes 0..4 into a, 4..8 into b, 8..12 into c.
    for (i, &byte) in key.iter().take(JHASH_MAX_KEY_LEN).enumerate() {
        let word = u32::from(byte) << (8 * (i % 4));
        match i / 4 {
            0 => a = a.wrapping_add(word),
            1 => b = b.wrapping_add(word),
            _ => c = c.wrapping_add(word),
        }
    }

    final_mix(a, b, c)
}

/// Hashes a fixed-size key with the given seed.
///
/// Keys longer than [`JHASH_MAX_KEY_LEN`] are rejected at compile time.
///
/// ```
/// use acl_dataplane::jhash;
///
/// let key = [192, 168, 1, 0, 192, 168, 1, 0, 1];
/// assert_eq!(jhash(&key, 1), 0xb2de_a0d4);
/// ```
#[inline]
pub fn jhash<const N: usize>(key: &[u8; N], seed: u32) -> u32 {
    #[allow(clippy::let_unit_value)]
    let () = KeyLen::<N>::CHECK;
    hash_block(key, seed)
}

/// Hashes a runtime-length key, returning `None` above 12 bytes.
pub fn jhash_checked(key: &[u8], seed: u32) -> Option<u32> {
    if key.len() > JHASH_MAX_KEY_LEN {
        return None;
    }
    Some(hash_block(key, seed))
}
