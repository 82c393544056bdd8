use core::fmt;

use crate::error::Error;
use crate::model::Node;

pub type NodeSet = Vec<Node>;

/// XPath 1.0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    NodeSet(NodeSet),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::NodeSet(_) => "node-set",
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn empty() -> Self {
        Value::NodeSet(Vec::new())
    }

    pub fn is_nodeset(&self) -> bool {
        matches!(self, Value::NodeSet(_))
    }

    /// `string()` conversion.
    pub fn string_value(&self) -> String {
        match self {
            Value::NodeSet(nodes) => nodes.first().map(Node::string_value).unwrap_or_default(),
            Value::String(s) => s.clone(),
            Value::Number(n) => number_to_string(*n),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }

    /// `number()` conversion.
    pub fn number_value(&self) -> f64 {
        match self {
            Value::NodeSet(_) | Value::String(_) => string_to_number(&self.string_value()),
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// `boolean()` conversion.
    pub fn boolean_value(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Boolean(b) => *b,
        }
    }

    pub fn into_nodeset(self) -> Result<NodeSet, Error> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::type_error(format!(
                "expected node-set, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_nodeset(&self) -> Result<&[Node], Error> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(Error::type_error(format!(
                "expected node-set, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}

impl From<NodeSet> for Value {
    fn from(nodes: NodeSet) -> Self {
        Value::NodeSet(nodes)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// XPath string → number: optional whitespace, optional minus, decimal
/// digits; anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let body = t.strip_prefix('-').unwrap_or(t);
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return f64::NAN,
        }
    }
    if digits == 0 || dots > 1 {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath number → string: integral values print without fraction,
/// NaN/Infinity spelled out.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e21 {
        return format!("{n:.0}");
    }
    format!("{n}")
}

/// Arithmetic results keep at most six fractional digits (half up).
pub fn round6(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    (n * 1e6 + 0.5).floor() / 1e6
}

/// `Math.round` semantics: half rounds toward positive infinity.
pub fn round_half_up(n: f64) -> f64 {
    if !n.is_finite() {
        return n;
    }
    (n + 0.5).floor()
}
