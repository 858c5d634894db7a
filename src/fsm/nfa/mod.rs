//! Nondeterministic finite automata with epsilon transitions.
//!
//! The automaton owns its states and transitions in dense vectors; every
//! cross-reference is a [`StateId`] index, so transitions own no memory.
//! Thompson composition consumes its operands by value and renumbers one
//! side so ids never collide.

use crate::error::{Error, Result};
use crate::json;
use crate::regex::Ast;
use crate::state::{State, StateId};
use crate::symbol::Symbol;
use serde_json::{json, Value};
use std::collections::BTreeSet;

mod compiler;

/// A transition `(from, to, symbol)`; the symbol may be epsilon.
///
/// Several transitions may share the same `(from, symbol)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub symbol: Symbol,
}

impl Transition {
    pub fn is_epsilon(&self) -> bool {
        self.symbol.is_epsilon()
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "from": self.from,
            "to": self.to,
            "symbol": self.symbol.to_string(),
            "isEpsilon": self.is_epsilon(),
        })
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self> {
        Ok(Self {
            from: json::get_usize(value, "from")?,
            to: json::get_usize(value, "to")?,
            symbol: Symbol::from_rendered(json::get_str(value, "symbol")?)?,
        })
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) -> {}", self.from, self.symbol, self.to)
    }
}

/// One step of a recorded NFA execution: either a consuming move (`symbol`
/// is a byte) or an epsilon-closure expansion (`symbol` is epsilon).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStep {
    pub from: BTreeSet<StateId>,
    pub symbol: Symbol,
    pub to: BTreeSet<StateId>,
}

/// A nondeterministic finite automaton.
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    states: Vec<State>,
    transitions: Vec<Transition>,
    start: Option<StateId>,
    accepting: BTreeSet<StateId>,
}

impl Nfa {
    /// Creates an automaton with no states.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a parsed regular expression by Thompson's construction.
    pub fn from_ast(ast: &Ast) -> Result<Self> {
        compiler::compile(&ast.0)
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

    /// Adds a transition; both endpoints must exist.
    pub fn add_transition(&mut self, from: StateId, to: StateId, symbol: Symbol) -> Result<()> {
        if from >= self.states.len() {
            return Err(Error::InvalidState(from));
        }
        if to >= self.states.len() {
            return Err(Error::InvalidState(to));
        }
        self.link(from, to, symbol);
        Ok(())
    }

    pub fn add_epsilon_transition(&mut self, from: StateId, to: StateId) -> Result<()> {
        self.add_transition(from, to, Symbol::Epsilon)
    }

    /// Unchecked insertion for construction sites that already hold valid
    /// ids.
    pub(crate) fn link(&mut self, from: StateId, to: StateId, symbol: Symbol) {
        self.transitions.push(Transition { from, to, symbol });
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

    /// The non-epsilon symbols appearing on transitions.
    pub fn alphabet(&self) -> BTreeSet<u8> {
        self.transitions
            .iter()
            .filter_map(|t| t.symbol.byte())
            .collect()
    }

    fn transitions_from(
        &self,
        from: StateId,
        symbol: Symbol,
    ) -> impl Iterator<Item = &Transition> + '_ {
        self.transitions
            .iter()
            .filter(move |t| t.from == from && t.symbol == symbol)
    }

    /// The smallest superset of `states` closed under epsilon transitions.
    pub fn epsilon_closure(&self, states: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = states.clone();
        let mut stack: Vec<StateId> = states.iter().copied().collect();

        while let Some(state) = stack.pop() {
            for t in self.transitions_from(state, Symbol::Epsilon) {
                if closure.insert(t.to) {
                    stack.push(t.to);
                }
            }
        }

        closure
    }

    /// Targets of non-epsilon transitions from any state in `states` on
    /// `symbol`.
    pub fn move_on(&self, states: &BTreeSet<StateId>, symbol: u8) -> BTreeSet<StateId> {
        let mut result = BTreeSet::new();
        for &state in states {
            for t in self.transitions_from(state, Symbol::Byte(symbol)) {
                result.insert(t.to);
            }
        }
        result
    }

    /// The extended transition function: closes over epsilon, then applies
    /// `epsilon_closure ∘ move` per input symbol.
    pub fn extended_delta(&self, states: &BTreeSet<StateId>, input: &str) -> BTreeSet<StateId> {
        let mut current = self.epsilon_closure(states);
        for b in input.bytes() {
            current = self.epsilon_closure(&self.move_on(&current, b));
        }
        current
    }

    /// Whether the automaton accepts `input`.
    pub fn accepts(&self, input: &str) -> bool {
        self.accepts_bytes(input.as_bytes())
    }

    pub(crate) fn accepts_bytes(&self, input: &[u8]) -> bool {
        let Some(start) = self.start else {
            return false;
        };
        let mut current = self.epsilon_closure(&BTreeSet::from([start]));
        for &b in input {
            current = self.epsilon_closure(&self.move_on(&current, b));
        }
        current.iter().any(|s| self.accepting.contains(s))
    }

    /// Records each epsilon-closure expansion and each consuming move made
    /// while reading `input`.
    pub fn trace_execution(&self, input: &str) -> Vec<ExecutionStep> {
        let mut trace = Vec::new();
        let Some(start) = self.start else {
            return trace;
        };

        let mut current = BTreeSet::from([start]);
        let closed = self.epsilon_closure(&current);
        if closed != current {
            trace.push(ExecutionStep {
                from: current,
                symbol: Symbol::Epsilon,
                to: closed.clone(),
            });
        }
        current = closed;

        for b in input.bytes() {
            let moved = self.move_on(&current, b);
            trace.push(ExecutionStep {
                from: current,
                symbol: Symbol::Byte(b),
                to: moved.clone(),
            });

            let closed = self.epsilon_closure(&moved);
            if closed != moved {
                trace.push(ExecutionStep {
                    from: moved,
                    symbol: Symbol::Epsilon,
                    to: closed.clone(),
                });
            }
            current = closed;
        }

        trace
    }

    // Thompson building blocks. Compositions take their operands by value:
    // the operands' states are renumbered into the result, so keeping a
    // handle to a half-absorbed input must be impossible.

    /// Two states, `start →ε→ accept`: the empty-string automaton.
    pub fn empty() -> Self {
        let mut nfa = Self::new();
        let start = nfa.add_state("", false);
        let end = nfa.add_state("", true);
        nfa.link(start, end, Symbol::Epsilon);
        nfa
    }

    /// Two states, `start →c→ accept`.
    pub fn single(symbol: u8) -> Self {
        let mut nfa = Self::new();
        let start = nfa.add_state("", false);
        let end = nfa.add_state("", true);
        nfa.link(start, end, Symbol::Byte(symbol));
        nfa
    }

    /// Two states with one parallel transition per member of `symbols`.
    /// Language-equivalent to folding [`Nfa::union`] over singles, without
    /// the intermediate states.
    pub(crate) fn class(symbols: impl IntoIterator<Item = u8>) -> Self {
        let mut nfa = Self::new();
        let start = nfa.add_state("", false);
        let end = nfa.add_state("", true);
        for symbol in symbols {
            nfa.link(start, end, Symbol::Byte(symbol));
        }
        nfa
    }

    /// `a|b`: a fresh start branches into both operands, whose accepting
    /// states are rewired to a fresh accept state.
    pub fn union(a: Self, b: Self) -> Result<Self> {
        let mut result = Self::new();
        let start = result.add_state("", false);
        let (a_start, a_accepts) = result.absorb(a)?;
        let (b_start, b_accepts) = result.absorb(b)?;
        let end = result.add_state("", true);

        result.link(start, a_start, Symbol::Epsilon);
        result.link(start, b_start, Symbol::Epsilon);
        for s in a_accepts.into_iter().chain(b_accepts) {
            result.link(s, end, Symbol::Epsilon);
        }
        Ok(result)
    }

    /// `ab`: `a`'s accepting states step into `b`'s start; `b`'s accepting
    /// states carry over.
    pub fn concat(a: Self, b: Self) -> Result<Self> {
        if a.start.is_none() {
            return Err(Error::Invariant(
                "cannot compose an automaton without a start state".into(),
            ));
        }

        let mut result = a;
        let a_accepts: Vec<StateId> = result.accepting.iter().copied().collect();
        for &s in &a_accepts {
            result.states[s].set_accepting(false);
        }
        result.accepting.clear();

        let (b_start, b_accepts) = result.absorb(b)?;
        for s in a_accepts {
            result.link(s, b_start, Symbol::Epsilon);
        }
        for s in b_accepts {
            result.states[s].set_accepting(true);
            result.accepting.insert(s);
        }
        Ok(result)
    }

    /// `x*`: zero or more repetitions.
    pub fn star(x: Self) -> Result<Self> {
        let mut result = Self::new();
        let start = result.add_state("", false);
        let (x_start, x_accepts) = result.absorb(x)?;
        let end = result.add_state("", true);

        result.link(start, x_start, Symbol::Epsilon);
        result.link(start, end, Symbol::Epsilon);
        for s in x_accepts {
            result.link(s, x_start, Symbol::Epsilon);
            result.link(s, end, Symbol::Epsilon);
        }
        Ok(result)
    }

    /// `x+`, desugared to `x · x'*` over a fresh clone `x'` so the two
    /// copies keep disjoint state ids.
    pub fn plus(x: Self) -> Result<Self> {
        let copy = x.clone();
        Self::concat(x, Self::star(copy)?)
    }

    /// `x?`: like [`Nfa::star`] without the loop back.
    pub fn optional(x: Self) -> Result<Self> {
        let mut result = Self::new();
        let start = result.add_state("", false);
        let (x_start, x_accepts) = result.absorb(x)?;
        let end = result.add_state("", true);

        result.link(start, x_start, Symbol::Epsilon);
        result.link(start, end, Symbol::Epsilon);
        for s in x_accepts {
            result.link(s, end, Symbol::Epsilon);
        }
        Ok(result)
    }

    /// `x{min,max}`: `min` required clones in sequence, then a starred
    /// clone for an unbounded `max` or `max - min` optional clones.
    pub fn repeat(x: Self, min: u32, max: Option<u32>) -> Result<Self> {
        if min == 0 && max == Some(0) {
            return Ok(Self::empty());
        }

        let mut result = Self::empty();
        for _ in 0..min {
            result = Self::concat(result, x.clone())?;
        }

        match max {
            None => Self::concat(result, Self::star(x)?),
            Some(max) => {
                for _ in min..max {
                    result = Self::concat(result, Self::optional(x.clone())?)?;
                }
                Ok(result)
            }
        }
    }

    /// Renumbers `other`'s states past `self`'s and moves them in, with
    /// start and accepting flags cleared. Returns `other`'s start id and
    /// accepting ids under the new numbering so the caller can rewire them.
    fn absorb(&mut self, other: Nfa) -> Result<(StateId, Vec<StateId>)> {
        let other_start = other.start.ok_or_else(|| {
            Error::Invariant("cannot compose an automaton without a start state".into())
        })?;

        let offset = self.states.len();
        let mut accepts = Vec::new();
        for state in &other.states {
            if state.is_accepting() {
                accepts.push(state.id() + offset);
            }
            self.states.push(State::new(state.id() + offset, "", false, false));
        }
        for t in &other.transitions {
            self.transitions.push(Transition {
                from: t.from + offset,
                to: t.to + offset,
                symbol: t.symbol,
            });
        }

        Ok((other_start + offset, accepts))
    }

    /// Canonical JSON rendering. A missing start state renders as `-1`.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "NFA",
            "startState": self.start.map(|s| s as i64).unwrap_or(-1),
            "acceptingStates": self.accepting.iter().copied().collect::<Vec<_>>(),
            "states": self.states.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
            "transitions": self.transitions.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
        })
    }

    /// Reconstructs an automaton from the output of [`Nfa::to_json`].
    pub fn from_json(value: &Value) -> Result<Self> {
        json::expect_type(value, "NFA")?;

        let mut nfa = Self::new();
        for (index, state) in json::get_array(value, "states")?.iter().enumerate() {
            let state = State::from_json(state)?;
            if state.id() != index {
                return Err(Error::InvalidJson(format!(
                    "state ids must be dense, found {} at index {}",
                    state.id(),
                    index
                )));
            }
            nfa.add_state(state.label(), state.is_accepting());
        }

        let start = json::get_i64(value, "startState")?;
        if start >= 0 {
            nfa.set_start_state(start as StateId)
                .map_err(|_| Error::InvalidJson(format!("startState {} does not exist", start)))?;
        } else if let Some(old) = nfa.start.take() {
            nfa.states[old].set_start(false);
        }

        for transition in json::get_array(value, "transitions")? {
            let t = Transition::from_json(transition)?;
            nfa.add_transition(t.from, t.to, t.symbol)
                .map_err(|_| Error::InvalidJson(format!("transition endpoints out of range: {}", t)))?;
        }

        Ok(nfa)
    }
}
