//! User-supplied wildcard patterns (spec §3).
//!
//! Grounded on `examples/original_source/src/main.cpp` (`indices`,
//! `indices2`, and the `if (indices2.size() > indices.size()) swap`
//! rule) and the teacher's own preference for small owned structs over
//! borrowed `&str` slices (`lotus-miner-lib/src/block.rs`'s `Block`).

use crate::alphabet::Alphabet;
use crate::hash_string::HashString;

pub const PRIMARY_WILDCARD: u8 = b'*';
pub const SECONDARY_WILDCARD: u8 = b'%';

#[derive(Debug, Clone)]
pub struct Pattern {
    /// The pattern exactly as the user typed it (for output reconstruction).
    pub original: String,
    /// `HashString` over the uppercased pattern, wildcard bytes kept literal.
    pub hash_string: HashString,
    pub alphabet: Alphabet,
    /// Byte offsets of the primary (enumeration-driving) wildcard set.
    pub primary_indices: Vec<usize>,
    /// Byte offsets of the secondary (mirrored) wildcard set.
    pub secondary_indices: Vec<usize>,
}

impl Pattern {
    pub fn new(original: &str, alphabet: Alphabet) -> Self {
        let hash_string = HashString::new(original);
        let mut stars = Vec::new();
        let mut percents = Vec::new();
        for (i, &b) in hash_string.logical_bytes().iter().enumerate() {
            match b {
                PRIMARY_WILDCARD => stars.push(i),
                SECONDARY_WILDCARD => percents.push(i),
                _ => {}
            }
        }
        // "the larger set drives enumeration" (spec §3 GLOSSARY)
        let (primary_indices, secondary_indices) = if percents.len() > stars.len() {
            (percents, stars)
        } else {
            (stars, percents)
        };

        Pattern {
            original: original.to_string(),
            hash_string,
            alphabet,
            primary_indices,
            secondary_indices,
        }
    }

    #[inline]
    pub fn wildcard_width(&self) -> usize {
        self.primary_indices.len()
    }

    #[inline]
    pub fn has_wildcards(&self) -> bool {
        !self.primary_indices.is_empty()
    }

    /// Reconstruct the printable match string: fixed characters
    /// preserved from `original`, wildcard positions replaced by the
    /// lowercase of the resolved letter, `\` mapped back to `/`
    /// (spec §6 "Match output").
    pub fn render_match(&self, resolved: &HashString) -> String {
        let mut out = String::with_capacity(resolved.len());
        let original_bytes = self.original.as_bytes();
        for (i, &b) in resolved.logical_bytes().iter().enumerate() {
            let is_wildcard = i < original_bytes.len()
                && (original_bytes[i] == PRIMARY_WILDCARD || original_bytes[i] == SECONDARY_WILDCARD);
            if i < original_bytes.len() && !is_wildcard {
                out.push(original_bytes[i] as char);
            } else {
                let lowered = match b {
                    b'A'..=b'Z' => b | 0x20,
                    b'\\' => b'/',
                    other => other,
                };
                out.push(lowered as char);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_rule_picks_larger_set_as_primary() {
        let p = Pattern::new("*%*", Alphabet::parse("hex"));
        assert_eq!(p.primary_indices.len(), 2); // two '*'
        assert_eq!(p.secondary_indices.len(), 1); // one '%', mirrors primary[0]
    }

    #[test]
    fn swap_rule_swaps_when_secondary_is_larger() {
        let p = Pattern::new("*%%", Alphabet::parse("hex"));
        assert_eq!(p.primary_indices, vec![1, 2]); // the two '%'
        assert_eq!(p.secondary_indices, vec![0]); // the single '*'
    }

    #[test]
    fn render_match_preserves_fixed_chars_and_lowercases_wildcards() {
        // Fixed characters print exactly as typed ('A', 'C'); only the
        // wildcard position is lowercased.
        let p = Pattern::new("A*C", Alphabet::parse("letters"));
        let mut hs = HashString::new("A*C");
        hs.set_byte(1, b'B');
        assert_eq!(p.render_match(&hs), "AbC");
    }

    #[test]
    fn render_match_lowercases_a_fully_wildcard_pattern() {
        let p = Pattern::new("***", Alphabet::parse("letters"));
        let mut hs = HashString::new("***");
        hs.set_byte(0, b'A');
        hs.set_byte(1, b'B');
        hs.set_byte(2, b'C');
        assert_eq!(p.render_match(&hs), "abc");
    }
}
