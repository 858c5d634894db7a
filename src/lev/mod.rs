//! Levenshtein automata for approximate matching.
//!
//! [`Matcher::build_nfa`] lays out product states over (pattern position ×
//! edit count); the NFA answers substring-accept queries, while the true
//! edit distance of a candidate is recomputed by [`edit_distance`]
//! (Wagner-Fischer) so reported distances are exact.

use crate::error::{Error, Result};
use crate::fsm::Nfa;
use crate::state::StateId;
use crate::symbol::Symbol;
use bitflags::bitflags;
use std::collections::BTreeSet;

mod dna;

pub use dna::{reverse_complement, DnaMatcher, StrandMatch};

bitflags! {
    /// Which edit operations the automaton may spend its budget on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EditTypes: u8 {
        const SUBSTITUTION = 1;
        const INSERTION = 2;
        const DELETION = 4;
    }
}

/// An approximate occurrence of the pattern in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
    /// Exact Levenshtein distance between the pattern and `text`.
    pub distance: usize,
    pub text: String,
}

/// Builds and runs Levenshtein automata for one pattern.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Vec<u8>,
    max_distance: usize,
    edit_types: EditTypes,
    alphabet: BTreeSet<u8>,
}

impl Matcher {
    /// Creates a matcher for `pattern` allowing up to `max_distance` edits
    /// of the selected kinds. The pattern must be non-empty.
    ///
    /// The alphabet is the pattern's bytes extended by the ASCII letters,
    /// so substitutions and insertions are defined for every symbol a
    /// biological input is likely to contain.
    pub fn new(pattern: &str, max_distance: usize, edit_types: EditTypes) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::Domain("pattern must not be empty".into()));
        }

        let mut alphabet: BTreeSet<u8> = pattern.bytes().collect();
        alphabet.extend(b'A'..=b'Z');
        alphabet.extend(b'a'..=b'z');

        Ok(Self {
            pattern: pattern.bytes().collect(),
            max_distance,
            edit_types,
            alphabet,
        })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Packs `(pos, edits)` into the dense id `pos·(k+1) + edits`.
    fn encode_state(&self, pos: usize, edits: usize) -> StateId {
        pos * (self.max_distance + 1) + edits
    }

    /// The product-state NFA: state `(pos, e)` means `pos` pattern bytes
    /// are matched with `e` edits spent. Every state with `pos == n` is
    /// accepting.
    pub fn build_nfa(&self) -> Nfa {
        let mut nfa = Nfa::new();
        let n = self.pattern.len();

        for pos in 0..=n {
            for _edits in 0..=self.max_distance {
                // states are added in encoding order, so ids line up with
                // encode_state
                nfa.add_state("", pos == n);
            }
        }

        for pos in 0..n {
            let expected = self.pattern[pos];
            for edits in 0..=self.max_distance {
                let from = self.encode_state(pos, edits);

                // exact match
                nfa.link(from, self.encode_state(pos + 1, edits), Symbol::Byte(expected));

                if edits < self.max_distance {
                    if self.edit_types.contains(EditTypes::SUBSTITUTION) {
                        for &c in &self.alphabet {
                            if c != expected {
                                nfa.link(
                                    from,
                                    self.encode_state(pos + 1, edits + 1),
                                    Symbol::Byte(c),
                                );
                            }
                        }
                    }

                    // insertion consumes input without advancing the pattern
                    if self.edit_types.contains(EditTypes::INSERTION) {
                        for &c in &self.alphabet {
                            nfa.link(from, self.encode_state(pos, edits + 1), Symbol::Byte(c));
                        }
                    }

                    // deletion advances the pattern without consuming input
                    if self.edit_types.contains(EditTypes::DELETION) {
                        nfa.link(from, self.encode_state(pos + 1, edits + 1), Symbol::Epsilon);
                    }
                }
            }
        }

        nfa
    }

    /// Whether the whole text is within `max_distance` edits of the
    /// pattern, as judged by the automaton.
    pub fn matches(&self, text: &str) -> bool {
        self.build_nfa().accepts(text)
    }

    /// Every window of `text` the automaton accepts, with its exact edit
    /// distance. Windows run over all start positions and lengths
    /// `1..=n+k`; ordering follows start position, then end position.
    pub fn find_all(&self, text: &str) -> Vec<Match> {
        let mut matches = Vec::new();
        let nfa = self.build_nfa();
        let bytes = text.as_bytes();
        let longest = self.pattern.len() + self.max_distance;

        for start in 0..bytes.len() {
            let max_len = longest.min(bytes.len() - start);
            for len in 1..=max_len {
                let window = &bytes[start..start + len];
                if !nfa.accepts_bytes(window) {
                    continue;
                }
                let distance = edit_distance_bytes(&self.pattern, window);
                if distance <= self.max_distance {
                    matches.push(Match {
                        start,
                        end: start + len,
                        distance,
                        text: String::from_utf8_lossy(window).into_owned(),
                    });
                }
            }
        }

        matches
    }
}

/// A single operation in an edit script, positioned on the first string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Characters agree; nothing is spent.
    Keep { pos: usize, c: u8 },
    /// Replace the character at `pos` with `c`.
    Substitute { pos: usize, c: u8 },
    /// Insert `c` before `pos`.
    Insert { pos: usize, c: u8 },
    /// Delete the character at `pos`.
    Delete { pos: usize, c: u8 },
}

/// Levenshtein distance by Wagner-Fischer dynamic programming.
pub fn edit_distance(s1: &str, s2: &str) -> usize {
    edit_distance_bytes(s1.as_bytes(), s2.as_bytes())
}

fn distance_table(s1: &[u8], s2: &[u8]) -> Vec<Vec<usize>> {
    let (m, n) = (s1.len(), s2.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if s1[i - 1] == s2[j - 1] {
                dp[i - 1][j - 1]
            } else {
                1 + dp[i - 1][j].min(dp[i][j - 1]).min(dp[i - 1][j - 1])
            };
        }
    }

    dp
}

fn edit_distance_bytes(s1: &[u8], s2: &[u8]) -> usize {
    distance_table(s1, s2)[s1.len()][s2.len()]
}

/// The operations turning `s1` into `s2`, recovered by backtracking the
/// Wagner-Fischer table. Ordered by position in `s1`.
pub fn edit_operations(s1: &str, s2: &str) -> Vec<EditOp> {
    let (s1, s2) = (s1.as_bytes(), s2.as_bytes());
    let dp = distance_table(s1, s2);

    let mut ops = Vec::new();
    let (mut i, mut j) = (s1.len(), s2.len());

    while i > 0 || j > 0 {
        if i > 0 && j > 0 && s1[i - 1] == s2[j - 1] {
            ops.push(EditOp::Keep {
                pos: i - 1,
                c: s1[i - 1],
            });
            i -= 1;
            j -= 1;
        } else if i > 0 && j > 0 && dp[i][j] == dp[i - 1][j - 1] + 1 {
            ops.push(EditOp::Substitute {
                pos: i - 1,
                c: s2[j - 1],
            });
            i -= 1;
            j -= 1;
        } else if j > 0 && dp[i][j] == dp[i][j - 1] + 1 {
            ops.push(EditOp::Insert {
                pos: i,
                c: s2[j - 1],
            });
            j -= 1;
        } else {
            ops.push(EditOp::Delete {
                pos: i - 1,
                c: s1[i - 1],
            });
            i -= 1;
        }
    }

    ops.reverse();
    ops
}

#[cfg(test)]
mod tests {
    use super::{edit_distance, edit_operations, EditOp, EditTypes, Matcher};

    #[test]
    fn empty_pattern_is_a_domain_error() {
        assert!(matches!(
            Matcher::new("", 1, EditTypes::all()),
            Err(crate::Error::Domain(_))
        ));
    }

    #[test]
    fn nfa_state_count_matches_the_grid() {
        let matcher = Matcher::new("ATG", 1, EditTypes::all()).unwrap();
        // (n + 1) positions × (k + 1) edit counts
        assert_eq!(matcher.build_nfa().states().len(), 4 * 2);
    }

    #[test]
    fn exact_match_spends_no_edits() {
        let matcher = Matcher::new("ATG", 0, EditTypes::all()).unwrap();
        assert!(matcher.matches("ATG"));
        assert!(!matcher.matches("ATC"));
        assert!(!matcher.matches("AT"));
    }

    #[test]
    fn substitution_only_respects_the_mask() {
        let matcher = Matcher::new("ATG", 1, EditTypes::SUBSTITUTION).unwrap();
        assert!(matcher.matches("ACG"));
        // length changes need insertions or deletions
        assert!(!matcher.matches("AT"));
        assert!(!matcher.matches("ATGG"));
    }

    #[test]
    fn deletion_uses_an_epsilon_transition() {
        let matcher = Matcher::new("ATG", 1, EditTypes::DELETION).unwrap();
        assert!(matcher.matches("AT"));
        assert!(matcher.matches("TG"));
        assert!(!matcher.matches("ATGA"));
    }

    #[test]
    fn insertion_consumes_without_advancing() {
        let matcher = Matcher::new("ATG", 1, EditTypes::INSERTION).unwrap();
        assert!(matcher.matches("ATGG"));
        assert!(matcher.matches("CATG"));
        assert!(!matcher.matches("AT"));
    }

    #[test]
    fn scenario_find_all_in_genomic_text() {
        let matcher = Matcher::new("ATG", 1, EditTypes::all()).unwrap();
        let matches = matcher.find_all("ATGCGATCG");

        let exact = matches
            .iter()
            .find(|m| m.start == 0 && m.end == 3)
            .expect("the literal occurrence must be reported");
        assert_eq!(exact.distance, 0);
        assert_eq!(exact.text, "ATG");

        for m in &matches {
            assert!(m.distance <= 1);
            assert_eq!(
                edit_distance("ATG", &m.text),
                m.distance,
                "reported distance must be exact for {:?}",
                m.text
            );
        }
    }

    #[test]
    fn distance_is_a_metric_on_samples() {
        let samples = ["", "a", "ab", "abc", "axc", "cba"];
        for s in samples {
            assert_eq!(edit_distance(s, s), 0);
        }
        for s in samples {
            for t in samples {
                assert_eq!(edit_distance(s, t), edit_distance(t, s));
                for u in samples {
                    assert!(
                        edit_distance(s, u) <= edit_distance(s, t) + edit_distance(t, u),
                        "triangle inequality failed on {:?} {:?} {:?}",
                        s,
                        t,
                        u
                    );
                }
            }
        }
    }

    #[test]
    fn classic_distances() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("ATG", "AG"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn edit_operations_cost_matches_distance() {
        for (s1, s2) in [("kitten", "sitting"), ("ATG", "AG"), ("abc", "abc")] {
            let ops = edit_operations(s1, s2);
            let cost = ops
                .iter()
                .filter(|op| !matches!(op, EditOp::Keep { .. }))
                .count();
            assert_eq!(cost, edit_distance(s1, s2), "{} -> {}", s1, s2);
        }
    }

    #[test]
    fn edit_operations_replay_onto_the_target() {
        let (s1, s2) = ("kitten", "sitting");
        let mut rebuilt = Vec::new();
        for op in edit_operations(s1, s2) {
            match op {
                EditOp::Keep { c, .. } => rebuilt.push(c),
                EditOp::Substitute { c, .. } => rebuilt.push(c),
                EditOp::Insert { c, .. } => rebuilt.push(c),
                EditOp::Delete { .. } => {}
            }
        }
        assert_eq!(rebuilt, s2.as_bytes());
    }
}
