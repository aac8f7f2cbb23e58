//! Exact byte-subsequence search over snapshot buffers.

use memchr::memmem;

use crate::pattern::{Encoding, SensitivePattern};
use crate::snapshot::{MemorySnapshot, Phase};

/// Find every offset at which `needle` occurs in `haystack`.
///
/// Offsets are unique and ascending, and overlapping occurrences are all
/// reported: the scan restarts one byte past each hit rather than skipping
/// the needle length. An empty needle, an empty haystack, or a needle longer
/// than the haystack yields no matches.
///
/// Core dumps of real processes run to hundreds of megabytes, so the scan
/// goes through `memmem` instead of a window-by-window comparison.
pub fn find_all(needle: &[u8], haystack: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    let finder = memmem::Finder::new(needle);
    let mut offsets = Vec::new();
    let mut start = 0usize;

    while let Some(pos) = finder.find(&haystack[start..]) {
        offsets.push(start + pos);
        start += pos + 1;
    }

    offsets
}

/// All occurrences of one pattern in one snapshot.
#[derive(Debug, Clone)]
pub struct MatchSet {
    pub label: String,
    pub encoding: Encoding,
    pub phase: Phase,
    pub offsets: Vec<usize>,
}

impl MatchSet {
    /// Run the pattern against a snapshot buffer.
    pub fn collect(pattern: &SensitivePattern, snapshot: &MemorySnapshot) -> Self {
        Self {
            label: pattern.label.clone(),
            encoding: pattern.encoding,
            phase: snapshot.phase,
            offsets: find_all(&pattern.bytes, &snapshot.bytes),
        }
    }

    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference scan: check every window of the haystack.
    fn find_all_naive(needle: &[u8], haystack: &[u8]) -> Vec<usize> {
        if needle.is_empty() || haystack.is_empty() || needle.len() > haystack.len() {
            return Vec::new();
        }
        (0..=haystack.len() - needle.len())
            .filter(|&i| &haystack[i..i + needle.len()] == needle)
            .collect()
    }

    #[test]
    fn single_match_at_start() {
        assert_eq!(find_all(&[1, 2, 3], &[1, 2, 3, 4, 5]), vec![0]);
    }

    #[test]
    fn two_matches() {
        assert_eq!(find_all(&[1, 2, 3], &[1, 2, 3, 4, 1, 2, 3, 5]), vec![0, 4]);
    }

    #[test]
    fn needle_equals_haystack() {
        assert_eq!(find_all(&[1, 2, 3], &[1, 2, 3]), vec![0]);
    }

    #[test]
    fn no_match() {
        assert_eq!(find_all(&[1, 2, 3], &[1, 2, 4, 3, 5]), Vec::<usize>::new());
    }

    #[test]
    fn empty_needle_yields_nothing() {
        assert_eq!(find_all(&[], &[1, 2, 3]), Vec::<usize>::new());
    }

    #[test]
    fn empty_haystack_yields_nothing() {
        assert_eq!(find_all(&[1, 2], &[]), Vec::<usize>::new());
    }

    #[test]
    fn needle_longer_than_haystack_yields_nothing() {
        assert_eq!(find_all(&[1, 2, 3, 4], &[1, 2, 3]), Vec::<usize>::new());
    }

    #[test]
    fn overlapping_matches_are_all_reported() {
        assert_eq!(find_all(b"aa", b"aaaa"), vec![0, 1, 2]);
    }

    #[test]
    fn agrees_with_naive_scan() {
        // Deterministic pseudo-random buffer with a narrow alphabet so
        // overlaps and repeats actually occur.
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let haystack: Vec<u8> = (0..4096)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                (state >> 56) as u8 % 4
            })
            .collect();

        for needle_len in 1..=4 {
            let needle = &haystack[100..100 + needle_len];
            assert_eq!(
                find_all(needle, &haystack),
                find_all_naive(needle, &haystack),
                "mismatch for needle_len={needle_len}"
            );
        }
    }

    #[test]
    fn offsets_are_ascending_and_unique() {
        let offsets = find_all(b"ab", b"abababab");
        assert_eq!(offsets, vec![0, 2, 4, 6]);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    }
}
