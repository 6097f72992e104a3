//! Channel-state bit packing.
//!
//! The device stores channel states 8 per byte with a layout that is easiest
//! to state as a double end-to-end reversal: reverse the channel order,
//! group into bytes high-bit-first, then reverse the byte sequence. The net
//! effect is that channel `i` lands in bit `i % 8` of byte `i / 8`, with any
//! padding in the high bits of the last byte. Both directions are kept
//! explicit below because getting one reversal wrong produces bytes that
//! look plausible and switch the wrong channels.

/// Pack one bool per channel into the device's byte representation.
///
/// Output length is `states.len()` rounded up to a whole byte.
pub fn pack(states: &[bool]) -> Vec<u8> {
    let pad = states.len().next_multiple_of(8) - states.len();
    // Reversed channel order, padded on the high side so the padding ends up
    // past the last channel once the byte order is reversed again.
    let mut bits = vec![false; pad];
    bits.extend(states.iter().rev());

    let mut bytes: Vec<u8> = bits
        .chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | bit as u8))
        .collect();
    bytes.reverse();
    bytes
}

/// Unpack device bytes into one bool per channel — the exact inverse of
/// [`pack`]: reverse the byte order, expand each byte high-bit-first,
/// reverse the whole bit sequence, truncate to `channel_count`.
pub fn unpack(bytes: &[u8], channel_count: usize) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes.iter().rev() {
        for shift in (0..8).rev() {
            bits.push(byte & (1 << shift) != 0);
        }
    }
    bits.reverse();
    bits.truncate(channel_count);
    bits
}
