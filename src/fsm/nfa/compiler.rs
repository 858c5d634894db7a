//! Regex AST to NFA compiler.
//!
//! Each node maps onto a Thompson building block. `plus` and counted
//! repetition duplicate their sub-automaton per copy, so state ids stay
//! disjoint across clones. Anchors compile to epsilon fragments: they are
//! carried in the AST but the matcher does not enforce anchoring.

use super::Nfa;
use crate::error::Result;
use crate::regex::ExprKind;
use crate::symbol::{PRINTABLE_MAX, PRINTABLE_MIN};

pub(super) fn compile(expr: &ExprKind) -> Result<Nfa> {
    match expr {
        ExprKind::Epsilon | ExprKind::StartAnchor | ExprKind::EndAnchor => Ok(Nfa::empty()),
        ExprKind::Char(c) => Ok(Nfa::single(*c)),
        // the wildcard is the printable-ASCII class, not "any byte"
        ExprKind::Any => Ok(Nfa::class(PRINTABLE_MIN..=PRINTABLE_MAX)),
        ExprKind::CharClass(chars) if chars.is_empty() => Ok(Nfa::empty()),
        ExprKind::CharClass(chars) => Ok(Nfa::class(chars.iter().copied())),
        ExprKind::Union(l, r) => Nfa::union(compile(l)?, compile(r)?),
        ExprKind::Concat(l, r) => Nfa::concat(compile(l)?, compile(r)?),
        ExprKind::Star(x) => Nfa::star(compile(x)?),
        ExprKind::Plus(x) => Nfa::plus(compile(x)?),
        ExprKind::Optional(x) => Nfa::optional(compile(x)?),
        ExprKind::Group(x) => compile(x),
        ExprKind::Repeat { inner, min, max } => Nfa::repeat(compile(inner)?, *min, *max),
    }
}
