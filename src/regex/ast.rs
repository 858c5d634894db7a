use crate::error::{Error, Result};
use crate::json;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// A parsed regular expression.
///
/// Trees are immutable after parsing; the NFA compiler walks them without
/// taking ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast(pub ExprKind);

/// A node of the regular expression tree.
///
/// The anchors `^` and `$` are recognized syntactically and kept in the
/// tree, but they compile to epsilon fragments: the NFA matcher does not
/// enforce anchoring semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// The empty regular expression.
    Epsilon,
    /// A single literal byte.
    Char(u8),
    /// The wildcard `.`, defined over printable ASCII.
    Any,
    /// A character class `[...]`, already resolved to its member set.
    CharClass(BTreeSet<u8>),
    /// An alternative `l|r`.
    Union(Box<ExprKind>, Box<ExprKind>),
    /// Two expressions in sequence.
    Concat(Box<ExprKind>, Box<ExprKind>),
    /// Zero or more repetitions.
    Star(Box<ExprKind>),
    /// One or more repetitions.
    Plus(Box<ExprKind>),
    /// Zero or one occurrence.
    Optional(Box<ExprKind>),
    /// A parenthesized sub-expression.
    Group(Box<ExprKind>),
    /// The `^` anchor.
    StartAnchor,
    /// The `$` anchor.
    EndAnchor,
    /// Counted repetition `{m}`, `{m,}` or `{m,n}`; `max` of `None` means
    /// unbounded.
    Repeat {
        inner: Box<ExprKind>,
        min: u32,
        max: Option<u32>,
    },
}

impl Ast {
    /// Canonical JSON rendering of the tree.
    pub fn to_json(&self) -> Value {
        self.0.to_json()
    }

    /// Reconstructs a tree from the output of [`Ast::to_json`].
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(Ast(ExprKind::from_json(value)?))
    }
}

impl std::fmt::Display for Ast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ExprKind {
    fn type_tag(&self) -> &'static str {
        match self {
            ExprKind::Epsilon => "epsilon",
            ExprKind::Char(_) => "char",
            ExprKind::Any => "any",
            ExprKind::CharClass(_) => "charClass",
            ExprKind::Union(..) => "union",
            ExprKind::Concat(..) => "concat",
            ExprKind::Star(_) => "star",
            ExprKind::Plus(_) => "plus",
            ExprKind::Optional(_) => "optional",
            ExprKind::Group(_) => "group",
            ExprKind::StartAnchor => "startAnchor",
            ExprKind::EndAnchor => "endAnchor",
            ExprKind::Repeat { .. } => "repeatN",
        }
    }

    fn children(&self) -> Vec<&ExprKind> {
        match self {
            ExprKind::Union(l, r) | ExprKind::Concat(l, r) => vec![l, r],
            ExprKind::Star(x)
            | ExprKind::Plus(x)
            | ExprKind::Optional(x)
            | ExprKind::Group(x) => vec![x],
            ExprKind::Repeat { inner, .. } => vec![inner],
            _ => Vec::new(),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.type_tag()));

        match self {
            ExprKind::Char(c) => {
                obj.insert("value".into(), json!((*c as char).to_string()));
            }
            ExprKind::CharClass(chars) => {
                let rendered: String = chars.iter().map(|&c| c as char).collect();
                obj.insert("chars".into(), json!(rendered));
            }
            ExprKind::Repeat { min, max, .. } => {
                obj.insert("minRepeat".into(), json!(min));
                obj.insert("maxRepeat".into(), json!(max.map(i64::from).unwrap_or(-1)));
            }
            _ => {}
        }

        let children = self.children();
        if !children.is_empty() {
            let rendered: Vec<Value> = children.iter().map(|c| c.to_json()).collect();
            obj.insert("children".into(), Value::Array(rendered));
        }

        Value::Object(obj)
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self> {
        let tag = json::get_str(value, "type")?;
        let child = |index: usize| -> Result<Box<ExprKind>> {
            let children = json::get_array(value, "children")?;
            let child = children.get(index).ok_or_else(|| {
                Error::InvalidJson(format!("`{}` node is missing child {}", tag, index))
            })?;
            Ok(Box::new(ExprKind::from_json(child)?))
        };

        match tag {
            "epsilon" => Ok(ExprKind::Epsilon),
            "char" => Ok(ExprKind::Char(json::get_byte(value, "value")?)),
            "any" => Ok(ExprKind::Any),
            "charClass" => {
                let chars = json::get_str(value, "chars")?;
                Ok(ExprKind::CharClass(
                    chars.chars().map(|c| c as u8).collect(),
                ))
            }
            "union" => Ok(ExprKind::Union(child(0)?, child(1)?)),
            "concat" => Ok(ExprKind::Concat(child(0)?, child(1)?)),
            "star" => Ok(ExprKind::Star(child(0)?)),
            "plus" => Ok(ExprKind::Plus(child(0)?)),
            "optional" => Ok(ExprKind::Optional(child(0)?)),
            "group" => Ok(ExprKind::Group(child(0)?)),
            "startAnchor" => Ok(ExprKind::StartAnchor),
            "endAnchor" => Ok(ExprKind::EndAnchor),
            "repeatN" => {
                let min = json::get_usize(value, "minRepeat")? as u32;
                let max = match json::get_i64(value, "maxRepeat")? {
                    -1 => None,
                    n if n >= 0 => Some(n as u32),
                    n => {
                        return Err(Error::InvalidJson(format!(
                            "maxRepeat out of range: {}",
                            n
                        )))
                    }
                };
                Ok(ExprKind::Repeat {
                    inner: child(0)?,
                    min,
                    max,
                })
            }
            other => Err(Error::InvalidJson(format!("unknown node type `{}`", other))),
        }
    }
}

impl std::fmt::Display for ExprKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprKind::Epsilon => write!(f, "ε"),
            ExprKind::Char(c) => write!(f, "{}", *c as char),
            ExprKind::Any => write!(f, "."),
            ExprKind::CharClass(chars) => {
                write!(f, "[")?;
                for &c in chars {
                    write!(f, "{}", c as char)?;
                }
                write!(f, "]")
            }
            ExprKind::Union(l, r) => write!(f, "({}|{})", l, r),
            ExprKind::Concat(l, r) => write!(f, "{}{}", l, r),
            ExprKind::Star(x) => write!(f, "({})*", x),
            ExprKind::Plus(x) => write!(f, "({})+", x),
            ExprKind::Optional(x) => write!(f, "({})?", x),
            ExprKind::Group(x) => write!(f, "({})", x),
            ExprKind::StartAnchor => write!(f, "^"),
            ExprKind::EndAnchor => write!(f, "$"),
            ExprKind::Repeat { inner, min, max } => {
                write!(f, "({}){{{}", inner, min)?;
                match max {
                    None => write!(f, ",}}"),
                    Some(max) if max != min => write!(f, ",{}}}", max),
                    Some(_) => write!(f, "}}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Ast, ExprKind};
    use std::collections::BTreeSet;

    fn sample() -> Ast {
        // a(b|c)*{2,} with a char class thrown in
        Ast(ExprKind::Concat(
            Box::new(ExprKind::Char(b'a')),
            Box::new(ExprKind::Repeat {
                inner: Box::new(ExprKind::Star(Box::new(ExprKind::Union(
                    Box::new(ExprKind::Char(b'b')),
                    Box::new(ExprKind::CharClass(BTreeSet::from([b'c', b'd']))),
                )))),
                min: 2,
                max: None,
            }),
        ))
    }

    #[test]
    fn display_renders_pattern_shape() {
        assert_eq!(sample().to_string(), "a(((b|[cd]))*){2,}");
        assert_eq!(Ast(ExprKind::Epsilon).to_string(), "ε");
        assert_eq!(
            Ast(ExprKind::Repeat {
                inner: Box::new(ExprKind::Char(b'a')),
                min: 3,
                max: Some(3),
            })
            .to_string(),
            "(a){3}"
        );
    }

    #[test]
    fn json_round_trip_is_byte_identical() {
        let ast = sample();
        let first = ast.to_json().to_string();
        let back = Ast::from_json(&ast.to_json()).unwrap();
        assert_eq!(back, ast);
        assert_eq!(back.to_json().to_string(), first);
    }

    #[test]
    fn json_rejects_unknown_node_kinds() {
        let value = serde_json::json!({"type": "lookahead"});
        assert!(Ast::from_json(&value).is_err());
    }

    #[test]
    fn unbounded_repeat_serializes_max_as_minus_one() {
        let ast = Ast(ExprKind::Repeat {
            inner: Box::new(ExprKind::Char(b'x')),
            min: 1,
            max: None,
        });
        assert_eq!(ast.to_json()["maxRepeat"], serde_json::json!(-1));
    }
}
