//! Automata-theoretic pattern matching for biological and structural data.
//!
//! The crate compiles regular expressions into finite automata and executes
//! them, simulates pushdown automata for context-free recognition (balanced
//! brackets, RNA secondary structure, XML-style tag nesting), and constructs
//! Levenshtein automata for approximate matching.
//!
//! The pipeline: a pattern string is parsed into an [`Ast`](regex::Ast),
//! compiled into an [`Nfa`] by Thompson construction, optionally determinized
//! into a [`Dfa`] by subset construction and minimized. Input strings are
//! matched by any stage of that pipeline. Structural strings go straight to
//! the [`Pda`](pda::Pda) simulator. The [`lev`] module produces NFAs over
//! (pattern position × edit count) product states and feeds the same
//! NFA/DFA machinery.
//!
//! Every automaton and the AST expose a canonical JSON rendering
//! (`to_json`/`from_json`); round trips are byte-identical.

pub use error::{Error, Result};
pub use fsm::{Dfa, Nfa};
pub use state::{State, StateId};
pub use symbol::{Symbol, STACK_BOTTOM};

mod error;
mod state;
mod symbol;

pub mod fsm;
pub mod lev;
pub mod pda;
pub mod regex;

pub(crate) mod json;

/// Parses a regular expression and compiles it into an [`Nfa`].
///
/// Shorthand for [`regex::Parser`] followed by [`Nfa::from_ast`].
pub fn compile(pattern: &str) -> Result<Nfa> {
    let ast = regex::Parser::new(pattern).parse()?;
    Nfa::from_ast(&ast)
}
