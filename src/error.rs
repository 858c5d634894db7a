use crate::regex::ParseError;
use crate::state::StateId;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the automata core.
///
/// The core never logs and never exits the process; every failure is
/// reported to the caller through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Regex syntax error, with position and expectation.
    Parse(ParseError),
    /// A [`StateId`] that does not exist in the automaton was referenced.
    InvalidState(StateId),
    /// A structural invariant was violated, e.g. adding a conflicting
    /// deterministic transition or composing an automaton without a start
    /// state.
    Invariant(String),
    /// The PDA configuration search exhausted its iteration budget before
    /// the reachable configuration space was covered.
    IterationLimit { budget: usize },
    /// A caller-supplied value is outside the operation's domain, e.g. an
    /// empty pattern for a matcher that forbids it.
    Domain(String),
    /// A JSON document handed to `from_json` does not describe an automaton.
    InvalidJson(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::InvalidState(id) => write!(f, "invalid state id: {}", id),
            Error::Invariant(msg) => write!(f, "invariant violated: {}", msg),
            Error::IterationLimit { budget } => {
                write!(f, "iteration budget of {} exceeded", budget)
            }
            Error::Domain(msg) => write!(f, "domain error: {}", msg),
            Error::InvalidJson(msg) => write!(f, "invalid json: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}
