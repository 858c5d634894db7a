//! Approximate matching on DNA, including the reverse strand.

use super::{EditTypes, Match, Matcher};
use crate::error::Result;

/// The reverse complement of a DNA sequence. Bases outside `ACGT` map to
/// `N`.
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => 'T',
            b'T' => 'A',
            b'G' => 'C',
            b'C' => 'G',
            _ => 'N',
        })
        .collect()
}

/// A [`Match`] tagged with the strand it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrandMatch {
    pub matched: Match,
    /// `true` when found on the reverse complement; coordinates are then
    /// relative to the reverse-complemented sequence.
    pub reverse_strand: bool,
}

/// Mismatch-tolerant DNA search: substitutions only, so every hit keeps
/// the pattern's length.
#[derive(Debug, Clone)]
pub struct DnaMatcher {
    matcher: Matcher,
}

impl DnaMatcher {
    pub fn new(pattern: &str, max_mismatches: usize) -> Result<Self> {
        Ok(Self {
            matcher: Matcher::new(pattern, max_mismatches, EditTypes::SUBSTITUTION)?,
        })
    }

    pub fn find_all(&self, seq: &str) -> Vec<Match> {
        self.matcher.find_all(seq)
    }

    /// Searches the sequence and its reverse complement.
    pub fn find_both_strands(&self, seq: &str) -> Vec<StrandMatch> {
        let mut results: Vec<StrandMatch> = self
            .find_all(seq)
            .into_iter()
            .map(|matched| StrandMatch {
                matched,
                reverse_strand: false,
            })
            .collect();

        let reverse = reverse_complement(seq);
        results.extend(self.find_all(&reverse).into_iter().map(|matched| StrandMatch {
            matched,
            reverse_strand: true,
        }));

        results
    }
}

#[cfg(test)]
mod tests {
    use super::{reverse_complement, DnaMatcher};

    #[test]
    fn reverse_complement_basics() {
        assert_eq!(reverse_complement("ATGC"), "GCAT");
        assert_eq!(reverse_complement(""), "");
        assert_eq!(reverse_complement("acgt"), "acgt".to_uppercase());
        assert_eq!(reverse_complement("AXA"), "TNT");
    }

    #[test]
    fn mismatches_are_substitution_only() {
        let matcher = DnaMatcher::new("GAATTC", 1).unwrap();
        let hits = matcher.find_all("AAGAATCCTT");
        // GAATCC is one substitution away from GAATTC
        assert!(hits.iter().any(|m| m.text == "GAATCC" && m.distance == 1));
        // all hits keep the pattern length
        assert!(hits.iter().all(|m| m.end - m.start == 6));
    }

    #[test]
    fn both_strands_are_searched() {
        let matcher = DnaMatcher::new("ATG", 0).unwrap();
        // CAT on the forward strand is ATG on the reverse strand
        let hits = matcher.find_both_strands("CCATC");
        assert!(hits.iter().any(|h| h.reverse_strand && h.matched.text == "ATG"));
        assert!(!hits.iter().any(|h| !h.reverse_strand));
    }
}
