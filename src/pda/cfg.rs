//! Context-free grammars and their PDA construction.

use super::Pda;
use crate::symbol::Symbol::{Byte, Epsilon};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// A production `head → body`. An empty body is the epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub head: u8,
    pub body: Vec<u8>,
}

/// A context-free grammar over single-byte symbols.
///
/// Nonterminals are the production heads; every other symbol appearing in
/// a body is a terminal.
#[derive(Debug, Clone)]
pub struct Cfg {
    start_symbol: u8,
    productions: Vec<Production>,
}

impl Cfg {
    pub fn new(start_symbol: u8) -> Self {
        Self {
            start_symbol,
            productions: Vec::new(),
        }
    }

    pub fn add_production(&mut self, head: u8, body: &[u8]) {
        self.productions.push(Production {
            head,
            body: body.to_vec(),
        });
    }

    pub fn start_symbol(&self) -> u8 {
        self.start_symbol
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn non_terminals(&self) -> BTreeSet<u8> {
        self.productions.iter().map(|p| p.head).collect()
    }

    pub fn terminals(&self) -> BTreeSet<u8> {
        let heads = self.non_terminals();
        self.productions
            .iter()
            .flat_map(|p| p.body.iter().copied())
            .filter(|symbol| !heads.contains(symbol))
            .collect()
    }

    /// The standard three-state construction. From `start`, an epsilon
    /// transition pushes the grammar's start symbol on top of the bottom
    /// marker. In the loop state, each production `A → w` pops `A` and
    /// pushes `w` reversed (so the first symbol of `w` surfaces first),
    /// and each terminal pops itself against the matching input. Exposing
    /// the bottom marker again moves to the accept state.
    pub fn to_pda(&self) -> Pda {
        let mut pda = Pda::new();
        let q0 = pda.add_state("start", false);
        let q1 = pda.add_state("loop", false);
        let q2 = pda.add_state("accept", true);
        pda.set_initial_stack_symbol(b'Z');

        pda.link(q0, q1, Epsilon, Byte(b'Z'), &[b'Z', self.start_symbol]);

        for production in &self.productions {
            let reversed: Vec<u8> = production.body.iter().rev().copied().collect();
            pda.link(q1, q1, Epsilon, Byte(production.head), &reversed);
        }

        for terminal in self.terminals() {
            pda.link(q1, q1, Byte(terminal), Byte(terminal), b"");
        }

        pda.link(q1, q2, Epsilon, Byte(b'Z'), b"");

        pda
    }

    /// Canonical JSON rendering; epsilon production bodies render as `ε`.
    pub fn to_json(&self) -> Value {
        let productions: Vec<Value> = self
            .productions
            .iter()
            .map(|p| {
                let rhs = if p.body.is_empty() {
                    "ε".to_owned()
                } else {
                    p.body.iter().map(|&b| b as char).collect()
                };
                json!({
                    "lhs": (p.head as char).to_string(),
                    "rhs": rhs,
                })
            })
            .collect();
        json!({
            "startSymbol": (self.start_symbol as char).to_string(),
            "productions": productions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Cfg;

    /// `S → (S)S | ε`: the balanced-parentheses grammar.
    fn balanced() -> Cfg {
        let mut cfg = Cfg::new(b'S');
        cfg.add_production(b'S', b"(S)S");
        cfg.add_production(b'S', b"");
        cfg
    }

    #[test]
    fn terminal_and_nonterminal_split() {
        let cfg = balanced();
        assert_eq!(cfg.non_terminals(), [b'S'].into());
        assert_eq!(cfg.terminals(), [b'(', b')'].into());
    }

    #[test]
    fn constructed_pda_recognizes_the_grammar() {
        let pda = balanced().to_pda();
        for input in ["", "()", "(())", "()()", "(()())"] {
            assert!(pda.accepts_by_final_state(input), "should accept {:?}", input);
        }
        for input in ["(", ")", ")(", "(()"] {
            assert!(!pda.accepts_by_final_state(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn an_bn_grammar() {
        // S → aSb | ε
        let mut cfg = Cfg::new(b'S');
        cfg.add_production(b'S', b"aSb");
        cfg.add_production(b'S', b"");
        let pda = cfg.to_pda();

        assert!(pda.accepts_by_final_state(""));
        assert!(pda.accepts_by_final_state("aabb"));
        assert!(!pda.accepts_by_final_state("aab"));
        assert!(!pda.accepts_by_final_state("ba"));
    }

    #[test]
    fn json_lists_productions_in_insertion_order() {
        let value = balanced().to_json();
        assert_eq!(value["startSymbol"], "S");
        assert_eq!(value["productions"][0]["rhs"], "(S)S");
        assert_eq!(value["productions"][1]["rhs"], "ε");
    }
}
