//! Pronounceable-name generation from raw bits.
//!
//! A [`Generator`] carries three ordered tables — onsets (initial
//! consonants), nuclei (vowels, required) and codas (final consonants) — and
//! spends `ceil(log2(len))` bits per table pick.  Generation walks the input
//! bit field and concatenates syllables until the bits run out, so the output
//! is a pure function of the input.

use crate::bitset::BitSet;

/// Bits needed to index a table of `n` choices; zero for singletons and
/// empty tables.
pub fn bits_for(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as usize
    }
}

/// Syllable generator over fixed onset/nucleus/coda tables.
pub struct Generator {
    onsets: Vec<String>,
    nuclei: Vec<String>,
    codas: Vec<String>,
    onset_bits: usize,
    nuclei_bits: usize,
    coda_bits: usize,
}

impl Generator {
    /// Build a generator from the three tables.
    ///
    /// Panics when `nuclei` is empty — every syllable needs a nucleus, so an
    /// empty table is a configuration error.
    pub fn new(onsets: &[&str], nuclei: &[&str], codas: &[&str]) -> Self {
        assert!(!nuclei.is_empty(), "syllable nuclei table must not be empty");

        Self {
            onsets: onsets.iter().map(|s| s.to_string()).collect(),
            nuclei: nuclei.iter().map(|s| s.to_string()).collect(),
            codas: codas.iter().map(|s| s.to_string()).collect(),
            onset_bits: bits_for(onsets.len()),
            nuclei_bits: bits_for(nuclei.len()),
            coda_bits: bits_for(codas.len()),
        }
    }

    /// English phonotactics: 16 onsets, 8 nuclei, 8 codas — 10 bits per full
    /// syllable, so a 40-bit identifier yields exactly four syllables.
    pub fn english() -> Self {
        Self::new(
            &[
                "p", "t", "k", "b", "d", "g", "f", "v", "s", "z", "m", "n", "l", "r", "w", "y",
            ],
            &["a", "e", "i", "o", "u", "ai", "ei", "ou"],
            &["m", "n", "l", "r", "s", "f", "t", "k"],
        )
    }

    /// Bits consumed by one syllable, with (`full`) or without a coda.
    pub fn bits_per_syllable(&self, full: bool) -> usize {
        let total = self.onset_bits + self.nuclei_bits;
        if full { total + self.coda_bits } else { total }
    }

    /// Generate syllables from the bit field, reading onset, nucleus and
    /// (while bits remain) coda indices in sequence.
    pub fn generate(&self, bits: &BitSet) -> String {
        let mut result = String::new();
        let mut pos = 0;
        let max = bits.size();

        while pos < max {
            if !self.onsets.is_empty() {
                let idx = bits.slice(pos, pos + self.onset_bits).to_u64() as usize;
                result.push_str(&self.onsets[idx]);
                pos += self.onset_bits;
            }

            let idx = bits.slice(pos, pos + self.nuclei_bits).to_u64() as usize;
            result.push_str(&self.nuclei[idx]);
            pos += self.nuclei_bits;

            if self.coda_bits > 0 && pos < max {
                let idx = bits.slice(pos, pos + self.coda_bits).to_u64() as usize;
                result.push_str(&self.codas[idx]);
                pos += self.coda_bits;
            }

            // A generator whose tables are all singletons consumes no bits;
            // stop after one syllable rather than spinning forever.
            if self.bits_per_syllable(true) == 0 {
                break;
            }
        }

        result
    }

    /// Generate from the low `size` bits of an integer.
    pub fn generate_from_int(&self, value: u64, size: usize) -> String {
        self.generate(&BitSet::from_int(value, size))
    }
}
