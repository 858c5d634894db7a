//! Pushdown automata, simulated by breadth-first search over
//! configurations.
//!
//! A configuration is `(state, remaining input, stack)`, with the stack
//! bottom at index 0 and the top at the end. The search prunes revisited
//! configurations and is bounded by an iteration budget counted in
//! dequeues; the configuration space can be infinite (epsilon cycles that
//! grow the stack), so the budget is what guarantees termination.

use crate::error::{Error, Result};
use crate::json;
use crate::state::{State, StateId};
use crate::symbol::{Symbol, STACK_BOTTOM};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet, VecDeque};

pub mod builtin;
mod cfg;

pub use cfg::{Cfg, Production};

/// Dequeues the configuration search performs before giving up.
pub const DEFAULT_ITERATION_BUDGET: usize = 10_000;

/// A PDA transition `(from, to, input, pop, push)`.
///
/// `input` and `pop` may each be epsilon (consume no input / pop nothing).
/// `push` is written bottom-to-top: its last byte becomes the new stack
/// top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdaTransition {
    pub from: StateId,
    pub to: StateId,
    pub input: Symbol,
    pub pop: Symbol,
    pub push: Vec<u8>,
}

impl PdaTransition {
    pub(crate) fn to_json(&self) -> Value {
        let push = if self.push.is_empty() {
            "ε".to_owned()
        } else {
            self.push.iter().map(|&b| b as char).collect()
        };
        json!({
            "from": self.from,
            "to": self.to,
            "inputSymbol": self.input.to_string(),
            "popSymbol": self.pop.to_string(),
            "pushSymbols": push,
        })
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self> {
        let push = json::get_str(value, "pushSymbols")?;
        let push = if push == "ε" {
            Vec::new()
        } else {
            push.bytes().collect()
        };
        Ok(Self {
            from: json::get_usize(value, "from")?,
            to: json::get_usize(value, "to")?,
            input: Symbol::from_rendered(json::get_str(value, "inputSymbol")?)?,
            pop: Symbol::from_rendered(json::get_str(value, "popSymbol")?)?,
            push,
        })
    }
}

impl std::fmt::Display for PdaTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let push: String = if self.push.is_empty() {
            "ε".to_owned()
        } else {
            self.push.iter().map(|&b| b as char).collect()
        };
        write!(
            f,
            "({}, {}, {}) -> ({}, {})",
            self.from, self.input, self.pop, self.to, push
        )
    }
}

/// An instantaneous description of the machine: current state, unread
/// input, and the stack (bottom first).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub state: StateId,
    pub remaining: Vec<u8>,
    pub stack: Vec<u8>,
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, \"{}\", {})",
            self.state,
            String::from_utf8_lossy(&self.remaining),
            String::from_utf8_lossy(&self.stack),
        )
    }
}

/// One fired transition in an accepting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStep {
    pub before: Configuration,
    pub transition: PdaTransition,
    pub after: Configuration,
}

/// Acceptance mode of the configuration search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptMode {
    FinalState,
    EmptyStack,
}

enum SearchOutcome {
    Accepted,
    Exhausted,
    OutOfBudget,
}

/// A pushdown automaton.
#[derive(Debug, Clone)]
pub struct Pda {
    states: Vec<State>,
    transitions: Vec<PdaTransition>,
    accepting: BTreeSet<StateId>,
    start: Option<StateId>,
    initial_stack_symbol: u8,
}

impl Default for Pda {
    fn default() -> Self {
        Self::new()
    }
}

impl Pda {
    /// Creates an automaton with no states and `$` as the initial stack
    /// symbol.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            transitions: Vec::new(),
            accepting: BTreeSet::new(),
            start: None,
            initial_stack_symbol: STACK_BOTTOM,
        }
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

    /// The symbol the stack holds before any transition fires.
    pub fn set_initial_stack_symbol(&mut self, symbol: u8) {
        self.initial_stack_symbol = symbol;
    }

    pub fn initial_stack_symbol(&self) -> u8 {
        self.initial_stack_symbol
    }

    /// Adds a transition; both endpoints must exist.
    pub fn add_transition(
        &mut self,
        from: StateId,
        to: StateId,
        input: Symbol,
        pop: Symbol,
        push: &[u8],
    ) -> Result<()> {
        if from >= self.states.len() {
            return Err(Error::InvalidState(from));
        }
        if to >= self.states.len() {
            return Err(Error::InvalidState(to));
        }
        self.link(from, to, input, pop, push);
        Ok(())
    }

    /// Unchecked insertion for construction sites that already hold valid
    /// ids.
    pub(crate) fn link(
        &mut self,
        from: StateId,
        to: StateId,
        input: Symbol,
        pop: Symbol,
        push: &[u8],
    ) {
        self.transitions.push(PdaTransition {
            from,
            to,
            input,
            pop,
            push: push.to_vec(),
        });
    }

    pub fn start_state(&self) -> Option<StateId> {
        self.start
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn transitions(&self) -> &[PdaTransition] {
        &self.transitions
    }

    pub fn accepting_states(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    /// Fires every enabled transition of `config` once. Returns the index
    /// of the fired transition alongside the successor configuration.
    fn step(&self, config: &Configuration) -> Vec<(usize, Configuration)> {
        let mut next = Vec::new();

        for (index, t) in self.transitions.iter().enumerate() {
            if t.from != config.state {
                continue;
            }

            let consume = match t.input {
                Symbol::Epsilon => false,
                Symbol::Byte(b) => {
                    if config.remaining.first() != Some(&b) {
                        continue;
                    }
                    true
                }
            };

            let pop = match t.pop {
                Symbol::Epsilon => false,
                Symbol::Byte(b) => {
                    if config.stack.last() != Some(&b) {
                        continue;
                    }
                    true
                }
            };

            let remaining = if consume {
                config.remaining[1..].to_vec()
            } else {
                config.remaining.clone()
            };
            let mut stack = config.stack.clone();
            if pop {
                stack.pop();
            }
            stack.extend_from_slice(&t.push);

            next.push((
                index,
                Configuration {
                    state: t.to,
                    remaining,
                    stack,
                },
            ));
        }

        next
    }

    fn initial_configuration(&self, input: &str, start: StateId) -> Configuration {
        Configuration {
            state: start,
            remaining: input.bytes().collect(),
            stack: vec![self.initial_stack_symbol],
        }
    }

    fn search(&self, input: &str, budget: usize, mode: AcceptMode) -> SearchOutcome {
        let Some(start) = self.start else {
            return SearchOutcome::Exhausted;
        };

        let mut queue = VecDeque::from([self.initial_configuration(input, start)]);
        let mut visited: HashSet<Configuration> = HashSet::new();
        let mut remaining_budget = budget;

        while let Some(current) = queue.pop_front() {
            if remaining_budget == 0 {
                return SearchOutcome::OutOfBudget;
            }
            remaining_budget -= 1;

            if visited.contains(&current) {
                continue;
            }

            let accepted = current.remaining.is_empty()
                && match mode {
                    AcceptMode::FinalState => self.accepting.contains(&current.state),
                    AcceptMode::EmptyStack => current.stack.is_empty(),
                };
            if accepted {
                return SearchOutcome::Accepted;
            }

            for (_, next) in self.step(&current) {
                queue.push_back(next);
            }
            visited.insert(current);
        }

        SearchOutcome::Exhausted
    }

    /// Whether some run consumes all of `input` and ends in an accepting
    /// state. `false` when the iteration budget runs out, without
    /// guaranteeing rejection.
    pub fn accepts_by_final_state(&self, input: &str) -> bool {
        self.accepts_by_final_state_with_budget(input, DEFAULT_ITERATION_BUDGET)
    }

    pub fn accepts_by_final_state_with_budget(&self, input: &str, budget: usize) -> bool {
        matches!(
            self.search(input, budget, AcceptMode::FinalState),
            SearchOutcome::Accepted
        )
    }

    /// Whether some run consumes all of `input` and empties the stack.
    /// `false` when the iteration budget runs out, without guaranteeing
    /// rejection.
    pub fn accepts_by_empty_stack(&self, input: &str) -> bool {
        self.accepts_by_empty_stack_with_budget(input, DEFAULT_ITERATION_BUDGET)
    }

    pub fn accepts_by_empty_stack_with_budget(&self, input: &str, budget: usize) -> bool {
        matches!(
            self.search(input, budget, AcceptMode::EmptyStack),
            SearchOutcome::Accepted
        )
    }

    /// The ordered transition sequence of some accepting run (by final
    /// state), reconstructed through parent pointers. `Ok(None)` when the
    /// reachable configuration space is exhausted without accepting;
    /// [`Error::IterationLimit`] when the budget runs out first.
    pub fn find_accepting_path(&self, input: &str) -> Result<Option<Vec<ExecutionStep>>> {
        self.find_accepting_path_with_budget(input, DEFAULT_ITERATION_BUDGET)
    }

    pub fn find_accepting_path_with_budget(
        &self,
        input: &str,
        budget: usize,
    ) -> Result<Option<Vec<ExecutionStep>>> {
        let Some(start) = self.start else {
            return Ok(None);
        };

        struct PathNode {
            config: Configuration,
            fired: Option<usize>,
            parent: Option<usize>,
        }

        let mut nodes = vec![PathNode {
            config: self.initial_configuration(input, start),
            fired: None,
            parent: None,
        }];
        let mut queue = VecDeque::from([0usize]);
        let mut visited: HashSet<Configuration> = HashSet::new();
        let mut remaining_budget = budget;

        while let Some(index) = queue.pop_front() {
            if remaining_budget == 0 {
                return Err(Error::IterationLimit { budget });
            }
            remaining_budget -= 1;

            if visited.contains(&nodes[index].config) {
                continue;
            }

            let accepted = nodes[index].config.remaining.is_empty()
                && self.accepting.contains(&nodes[index].config.state);
            if accepted {
                // walk parents backwards, then reverse
                let mut path = Vec::new();
                let mut at = index;
                while let (Some(parent), Some(fired)) = (nodes[at].parent, nodes[at].fired) {
                    path.push(ExecutionStep {
                        before: nodes[parent].config.clone(),
                        transition: self.transitions[fired].clone(),
                        after: nodes[at].config.clone(),
                    });
                    at = parent;
                }
                path.reverse();
                return Ok(Some(path));
            }

            let successors = self.step(&nodes[index].config);
            visited.insert(nodes[index].config.clone());
            for (fired, config) in successors {
                nodes.push(PathNode {
                    config,
                    fired: Some(fired),
                    parent: Some(index),
                });
                queue.push_back(nodes.len() - 1);
            }
        }

        Ok(None)
    }

    /// Canonical JSON rendering. A missing start state renders as `-1`.
    pub fn to_json(&self) -> Value {
        json!({
            "type": "PDA",
            "startState": self.start.map(|s| s as i64).unwrap_or(-1),
            "initialStackSymbol": (self.initial_stack_symbol as char).to_string(),
            "acceptingStates": self.accepting.iter().copied().collect::<Vec<_>>(),
            "states": self.states.iter().map(|s| s.to_json()).collect::<Vec<_>>(),
            "transitions": self.transitions.iter().map(|t| t.to_json()).collect::<Vec<_>>(),
        })
    }

    /// Reconstructs an automaton from the output of [`Pda::to_json`].
    pub fn from_json(value: &Value) -> Result<Self> {
        json::expect_type(value, "PDA")?;

        let mut pda = Self::new();
        pda.initial_stack_symbol = json::get_byte(value, "initialStackSymbol")?;

        for (index, state) in json::get_array(value, "states")?.iter().enumerate() {
            let state = State::from_json(state)?;
            if state.id() != index {
                return Err(Error::InvalidJson(format!(
                    "state ids must be dense, found {} at index {}",
                    state.id(),
                    index
                )));
            }
            pda.add_state(state.label(), state.is_accepting());
        }

        let start = json::get_i64(value, "startState")?;
        if start >= 0 {
            pda.set_start_state(start as StateId)
                .map_err(|_| Error::InvalidJson(format!("startState {} does not exist", start)))?;
        } else if let Some(old) = pda.start.take() {
            pda.states[old].set_start(false);
        }

        for transition in json::get_array(value, "transitions")? {
            let t = PdaTransition::from_json(transition)?;
            pda.add_transition(t.from, t.to, t.input, t.pop, &t.push)
                .map_err(|_| {
                    Error::InvalidJson(format!("transition endpoints out of range: {}", t))
                })?;
        }

        Ok(pda)
    }
}

#[cfg(test)]
mod tests {
    use super::builtin;
    use super::{Pda, Symbol};

    #[test]
    fn scenario_balanced_parentheses() {
        let pda = builtin::balanced_parentheses();
        for input in ["", "()", "(())", "()()"] {
            assert!(pda.accepts_by_final_state(input), "should accept {:?}", input);
        }
        for input in ["(", ")(", "(()"] {
            assert!(!pda.accepts_by_final_state(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn an_bn_by_final_state() {
        let pda = builtin::an_bn();
        for input in ["", "ab", "aabb", "aaabbb"] {
            assert!(pda.accepts_by_final_state(input), "should accept {:?}", input);
        }
        for input in ["a", "b", "ba", "aab", "abb"] {
            assert!(!pda.accepts_by_final_state(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn empty_stack_acceptance_mode() {
        // pops its bottom marker after matching, so it accepts by empty
        // stack without any accepting state
        let mut pda = Pda::new();
        let q0 = pda.add_state("", false);
        pda.set_initial_stack_symbol(b'Z');
        pda.add_transition(q0, q0, Symbol::Byte(b'a'), Symbol::Epsilon, b"A")
            .unwrap();
        pda.add_transition(q0, q0, Symbol::Byte(b'b'), Symbol::Byte(b'A'), b"")
            .unwrap();
        pda.add_transition(q0, q0, Symbol::Epsilon, Symbol::Byte(b'Z'), b"")
            .unwrap();

        assert!(pda.accepts_by_empty_stack("ab"));
        assert!(pda.accepts_by_empty_stack("aabb"));
        assert!(pda.accepts_by_empty_stack(""));
        assert!(!pda.accepts_by_empty_stack("abb"));
        assert!(!pda.accepts_by_final_state("ab"));
    }

    #[test]
    fn accepting_path_reconstruction() {
        let pda = builtin::an_bn();
        let path = pda.find_accepting_path("aabb").unwrap().unwrap();
        assert!(!path.is_empty());

        // the chain of configurations is contiguous and ends accepted
        for pair in path.windows(2) {
            assert_eq!(pair[0].after, pair[1].before);
        }
        let last = path.last().unwrap();
        assert!(last.after.remaining.is_empty());
        assert!(pda.accepting_states().contains(&last.after.state));

        // the first configuration is the initial one
        let first = &path[0].before;
        assert_eq!(Some(first.state), pda.start_state());
        assert_eq!(first.remaining, b"aabb".to_vec());
        assert_eq!(first.stack, vec![pda.initial_stack_symbol()]);
    }

    #[test]
    fn rejected_input_yields_no_path() {
        let pda = builtin::an_bn();
        assert_eq!(pda.find_accepting_path("aab").unwrap(), None);
    }

    #[test]
    fn budget_exhaustion_is_reported_on_the_path_entry_point() {
        let pda = builtin::balanced_parentheses();
        // one dequeue is never enough to finish a non-trivial search
        let err = pda
            .find_accepting_path_with_budget("(((((((((()", 1)
            .unwrap_err();
        assert!(matches!(err, crate::Error::IterationLimit { budget: 1 }));

        // boolean entry points degrade to `false` instead
        assert!(!pda.accepts_by_final_state_with_budget("()", 1));
    }

    #[test]
    fn acceptance_is_monotone_in_the_budget() {
        let pda = builtin::balanced_parentheses();
        let input = "(()())()";
        let mut accepted = false;
        for budget in [1, 10, 100, 1_000, 10_000] {
            let now = pda.accepts_by_final_state_with_budget(input, budget);
            assert!(!accepted || now, "budget {} flipped acceptance back", budget);
            accepted = now;
        }
        assert!(accepted);
    }

    #[test]
    fn json_round_trip_is_byte_identical() {
        let pda = builtin::an_bn();
        let first = pda.to_json().to_string();
        let back = Pda::from_json(&pda.to_json()).unwrap();
        assert_eq!(back.to_json().to_string(), first);
        assert!(back.accepts_by_final_state("aabb"));
        assert_eq!(back.initial_stack_symbol(), pda.initial_stack_symbol());
    }
}
