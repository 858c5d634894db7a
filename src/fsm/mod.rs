//! Finite-state machines: the NFA/DFA pair behind the regex pipeline.

pub use self::{dfa::Dfa, nfa::Nfa};

pub mod dfa;
pub mod nfa;
