use crate::error::Result;
use crate::json;
use serde_json::{json, Value};

/// Identifier of a state, dense and sequential within one automaton.
///
/// Ids are assigned at insertion and stay stable for the lifetime of the
/// automaton; deletion is not supported, so ids are never reused.
pub type StateId = usize;

/// A state in a finite or pushdown automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    id: StateId,
    label: String,
    accepting: bool,
    start: bool,
}

impl State {
    /// Creates a new state. An empty label defaults to `q<id>`.
    pub(crate) fn new(id: StateId, label: &str, accepting: bool, start: bool) -> Self {
        let label = if label.is_empty() {
            format!("q{}", id)
        } else {
            label.to_owned()
        };
        Self {
            id,
            label,
            accepting,
            start,
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn is_start(&self) -> bool {
        self.start
    }

    pub(crate) fn set_accepting(&mut self, accepting: bool) {
        self.accepting = accepting;
    }

    pub(crate) fn set_start(&mut self, start: bool) {
        self.start = start;
    }

    pub(crate) fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "label": self.label,
            "isAccepting": self.accepting,
            "isStart": self.start,
        })
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self> {
        Ok(Self {
            id: json::get_usize(value, "id")?,
            label: json::get_str(value, "label")?.to_owned(),
            accepting: json::get_bool(value, "isAccepting")?,
            start: json::get_bool(value, "isStart")?,
        })
    }
}

impl std::fmt::Display for State {
    /// Renders `->label` for start states and `(label)` for accepting ones.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start {
            write!(f, "->")?;
        }
        if self.accepting {
            write!(f, "({})", self.label)
        } else {
            write!(f, "{}", self.label)
        }
    }
}
