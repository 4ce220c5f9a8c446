//! Custom base-32 codec for short textual identifiers.
//!
//! The alphabet omits confusable characters (no capitals, no `j`, `l`, `u`,
//! `v`) and leads with `o` followed by the digits so that encoded values
//! loosely resemble hex.  This codec is *not* the RFC 4648 encoding used for
//! `uid` names — that one comes from `data-encoding`.

/// The 32-character alphabet, in index order.
const ALPHABET: &[u8; 32] = b"o123456789abcdefghikmnpqrstvwxyz";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("chunk size must be between 1 and 8, got {0}")]
    ChunkSize(usize),
    #[error("bit window starting at bit {start} runs past the end of a {len}-byte buffer")]
    OutOfRange { start: usize, len: usize },
}

/// Read `n` contiguous bits from `input` starting at bit offset `start`.
///
/// Unlike [`crate::bitset::BitSet`], this window is **big-endian**: `start / 8`
/// selects the byte and `start % 8` counts from the high bit.  The two
/// orderings serve different derivations and are deliberately kept apart.
pub fn get_bits(input: &[u8], start: usize, n: usize) -> Result<u32, Error> {
    if n == 0 || n > 8 {
        return Err(Error::ChunkSize(n));
    }

    let byte_start = start / 8;
    let bit_start = start % 8;
    if byte_start >= input.len() {
        return Err(Error::OutOfRange {
            start,
            len: input.len(),
        });
    }

    let remaining_in_first = 8 - bit_start;
    let first_bits = u32::from(input[byte_start] & (0xFF >> bit_start));
    if n <= remaining_in_first {
        // All requested bits live in the first byte.
        return Ok(first_bits >> (remaining_in_first - n));
    }

    let second_bits_needed = n - remaining_in_first;
    if byte_start + 1 >= input.len() {
        return Err(Error::OutOfRange {
            start,
            len: input.len(),
        });
    }
    let second_bits = u32::from(input[byte_start + 1] >> (8 - second_bits_needed));
    Ok(first_bits << second_bits_needed | second_bits)
}

/// Encode the leading `num_bits` of `input`, five bits per character.
///
/// Produces `ceil(num_bits / 5)` characters; errors when the final 5-bit
/// window would run past the buffer.
pub fn encode(input: &[u8], num_bits: usize) -> Result<String, Error> {
    let output_len = num_bits.div_ceil(5);
    let mut encoded = String::with_capacity(output_len);
    for i in 0..output_len {
        let value = get_bits(input, 5 * i, 5)?;
        encoded.push(ALPHABET[value as usize] as char);
    }
    Ok(encoded)
}
