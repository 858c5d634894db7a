//! Deterministic finite automata.
//!
//! The transition table maps `(state, symbol)` to at most one successor;
//! [`Dfa::add_transition`] rejects conflicting entries. The explicit
//! alphabet set is kept in sync as transitions are added. Subset
//! construction, minimization and the product operations live in
//! [`ops`](self).

use crate::error::{Error, Result};
use crate::json;
use crate::state::{State, StateId};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};

mod ops;

/// A deterministic transition `(from, to, symbol)`. The symbol is a plain
/// byte; epsilon transitions cannot exist in a DFA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub symbol: u8,
}

impl Transition {
    pub(crate) fn to_json(&self) -> Value {
        json!({
            "from": self.from,
            "to": self.to,
            "symbol": (self.symbol as char).to_string(),
            "isEpsilon": false,
        })
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self> {
        Ok(Self {
            from: json::get_usize(value, "from")?,
            to: json::get_usize(value, "to")?,
            symbol: json::get_byte(value, "symbol")?,
        })
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) -> {}", self.from, self.symbol as char, self.to)
    }
}

/// One step of a recorded DFA walk. `to` is `None` when the table has no
/// entry for `(from, symbol)`, which rejects the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStep {
    pub from: StateId,
    pub symbol: u8,
    pub to: Option<StateId>,
    /// Whether this step ended the walk in an accepting state.
    pub accepted: bool,
}

/// A deterministic finite automaton.
#[derive(Debug, Clone, Default)]
pub struct Dfa {
    states: Vec<State>,
    transitions: Vec<Transition>,
    table: HashMap<(StateId, u8), StateId>,
    alphabet: BTreeSet<u8>,
    accepting: BTreeSet<StateId>,
    start: Option<StateId>,
}

impl Dfa {
    /// Creates an automaton with no states.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state and returns its id. The first state added becomes the
    /// start state. An empty label defaults to `q<id>`.
    pub fn add_state(&mut self, label: &str, accepting: bool) -> StateId {
        let id = self.states.len();
        let start = self.states.is_empty();
        self.states.push(State::new(id, label, accepting, start));
        if start {
            self.start = Some(id);
        }
        if accepting {
            self.accepting.insert(id);
        }
        id
    }

    /// Moves the start flag to `id`.
    pub fn set_start_state(&mut self, id: StateId) -> Result<()> {
        if id >= self.states.len() {
            return Err(Error::InvalidState(id));
        }
        if let Some(old) = self.start {
            self.states[old].set_start(false);
        }
        self.start = Some(id);
        self.states[id].set_start(true);
        Ok(())
    }

    /// Sets or clears the accepting flag of `id`.
    pub fn set_accepting(&mut self, id: StateId, accepting: bool) -> Result<()> {
        if id >= self.states.len() {
            return Err(Error::InvalidState(id));
        }
        self.states[id].set_accepting(accepting);
        if accepting {
            self.accepting.insert(id);
        } else {
            self.accepting.remove(&id);
        }
        Ok(())
    }

    /// Adds a transition. Fails when either endpoint is missing or a
    /// transition for `(from, symbol)` already exists.
    pub fn add_transition(&mut self, from: StateId, to: StateId, symbol: u8) -> Result<()> {
        if from >= self.states.len() {
            return Err(Error::InvalidState(from));
        }
        if to >= self.states.len() {
            return Err(Error::InvalidState(to));
        }
        if self.table.contains_key(&(from, symbol)) {
            return Err(Error::Invariant(format!(
                "transition for ({}, {}) already defined",
                from, symbol as char
            )));
        }
        self.insert_transition(from, to, symbol);
        Ok(())
    }

    /// Unchecked insertion for construction sites that already hold valid,
    /// conflict-free entries.
    pub(crate) fn insert_transition(&mut self, from: StateId, to: StateId, symbol: u8) {
        self.transitions.push(Transition { from, to, symbol });
        self.table.insert((from, symbol), to);
        self.alphabet.insert(symbol);
    }

    /// The successor of `from` on `symbol`, if defined.
    pub fn next_state(&self, from: StateId, symbol: u8) -> Option<StateId> {
        self.table.get(&(from, symbol)).copied()
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn accepting_states(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    pub fn alphabet(&self) -> &BTreeSet<u8> {
        &self.alphabet
    }

    /// Walks the table from the start state; a missing transition rejects.
    pub fn accepts(&self, input: &str) -> bool {
        let Some(mut current) = self.start else {
            return false;
        };
        for b in input.bytes() {
            match self.next_state(current, b) {
                Some(next) => current = next,
                None => return false,
            }
        }
        self.accepting.contains(&current)
    }

    /// Records the walk over `input`, stopping at the first missing
    /// transition.
    pub fn trace_execution(&self, input: &str) -> Vec<ExecutionStep> {
        let mut trace = Vec::new();
        let Some(mut current) = self.start else {
            return trace;
        };

        let bytes = input.as_bytes();
        for (i, &b) in bytes.iter().enumerate() {
            let next = self.next_state(current, b);
            let accepted = next
                .map(|n| i == bytes.len() - 1 && self.accepting.contains(&n))
                .unwrap_or(false);
            trace.push(ExecutionStep {
                from: current,
                symbol: b,
                to: next,
                accepted,
            });
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        trace
    }

    /// All substring matches in `text` as `(start, end_exclusive)` pairs:
    /// start positions ascending, and for a fixed start, match ends
    /// ascending. A zero-length match `(i, i)` is emitted at every position
    /// where the start state itself accepts.
    pub fn find_all_matches(&self, text: &str) -> Vec<(usize, usize)> {
        let mut matches = Vec::new();
        let Some(start) = self.start else {
            return matches;
        };

        let bytes = text.as_bytes();
        for i in 0..bytes.len() {
            let mut current = start;
            if self.accepting.contains(&current) {
                matches.push((i, i));
            }
            for (j, &b) in bytes.iter().enumerate().skip(i) {
                match self.next_state(current, b) {
                    Some(next) => current = next,
                    None => break,
                }
                if self.accepting.contains(&current) {
                    matches.push((i, j + 1));
                }
            }
        }
        matches
    }

    /// Canonical JSON rendering. A missing start state renders as `-1`.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "DFA",
            "startState": self.start.map(|s| s as i64).unwrap_or(-1),
            "acceptingStates": self.accepting.iter().copied().collect::<Vec<_>>(),
            "states": self.states.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
            "transitions": self.transitions.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
        })
    }

    /// Reconstructs an automaton from the output of [`Dfa::to_json`].
    pub fn from_json(value: &Value) -> Result<Self> {
        json::expect_type(value, "DFA")?;

        let mut dfa = Self::new();
        for (index, state) in json::get_array(value, "states")?.iter().enumerate() {
            let state = State::from_json(state)?;
            if state.id() != index {
                return Err(Error::InvalidJson(format!(
                    "state ids must be dense, found {} at index {}",
                    state.id(),
                    index
                )));
            }
            dfa.add_state(state.label(), state.is_accepting());
        }

        let start = json::get_i64(value, "startState")?;
        if start >= 0 {
            dfa.set_start_state(start as StateId)
                .map_err(|_| Error::InvalidJson(format!("startState {} does not exist", start)))?;
        } else if let Some(old) = dfa.start.take() {
            dfa.states[old].set_start(false);
        }

        for transition in json::get_array(value, "transitions")? {
            let t = Transition::from_json(transition)?;
            dfa.add_transition(t.from, t.to, t.symbol)
                .map_err(|err| Error::InvalidJson(format!("bad transition {}: {}", t, err)))?;
        }

        Ok(dfa)
    }
}

#[cfg(test)]
mod tests {
    use super::Dfa;

    /// `a*b` built by hand: q0 loops on `a`, `b` reaches the accepting q1.
    fn a_star_b() -> Dfa {
        let mut dfa = Dfa::new();
        let q0 = dfa.add_state("", false);
        let q1 = dfa.add_state("", true);
        dfa.add_transition(q0, q0, b'a').unwrap();
        dfa.add_transition(q0, q1, b'b').unwrap();
        dfa
    }

    #[test]
    fn accepts_walks_the_table() {
        let dfa = a_star_b();
        assert!(dfa.accepts("b"));
        assert!(dfa.accepts("aab"));
        assert!(!dfa.accepts(""));
        assert!(!dfa.accepts("aba"));
        assert!(!dfa.accepts("ax"));
    }

    #[test]
    fn conflicting_transition_is_an_invariant_error() {
        let mut dfa = a_star_b();
        assert!(matches!(
            dfa.add_transition(0, 1, b'a'),
            Err(crate::Error::Invariant(_))
        ));
    }

    #[test]
    fn endpoints_must_exist() {
        let mut dfa = a_star_b();
        assert!(matches!(
            dfa.add_transition(0, 9, b'z'),
            Err(crate::Error::InvalidState(9))
        ));
    }

    #[test]
    fn alphabet_tracks_added_transitions() {
        let dfa = a_star_b();
        assert_eq!(dfa.alphabet().iter().copied().collect::<Vec<_>>(), vec![b'a', b'b']);
    }

    #[test]
    fn find_all_matches_orders_by_start_then_end() {
        let dfa = a_star_b();
        // text: "abab"; matches of a*b: (0,2), (2,4), (1,2), (3,4)
        assert_eq!(
            dfa.find_all_matches("abab"),
            vec![(0, 2), (1, 2), (2, 4), (3, 4)]
        );
    }

    #[test]
    fn find_all_matches_emits_zero_length_at_accepting_start() {
        let mut dfa = Dfa::new();
        let q0 = dfa.add_state("", true);
        dfa.add_transition(q0, q0, b'a').unwrap();
        // every prefix position matches, plus each extension
        assert_eq!(
            dfa.find_all_matches("aa"),
            vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2)]
        );
    }

    #[test]
    fn trace_stops_at_missing_transition() {
        let dfa = a_star_b();
        let trace = dfa.trace_execution("ax");
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].to, None);
        assert!(!trace[1].accepted);

        let trace = dfa.trace_execution("ab");
        assert!(trace.last().unwrap().accepted);
    }

    #[test]
    fn json_round_trip_is_byte_identical() {
        let dfa = a_star_b();
        let first = dfa.to_json().to_string();
        let back = Dfa::from_json(&dfa.to_json()).unwrap();
        assert_eq!(back.to_json().to_string(), first);
        assert!(back.accepts("aab"));
    }

    #[test]
    fn json_rejects_nondeterministic_tables() {
        let dfa = a_star_b();
        let mut value = dfa.to_json();
        let transitions = value["transitions"].as_array_mut().unwrap();
        let duplicate = transitions[0].clone();
        transitions.push(duplicate);
        assert!(Dfa::from_json(&value).is_err());
    }
}
