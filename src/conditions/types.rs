//! core types for the condition system

use std::fmt;

use serde::{Deserialize, Serialize};

/// argument passed to a condition's check
///
/// persisted data may predate a change to a condition's argument type, so
/// every check must treat an unexpected variant as `false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionArg {
    #[default]
    None,
    Int(i64),
    #[serde(rename = "uint64")]
    UInt64(u64),
    String(String),
}

impl ConditionArg {
    /// try to get as signed integer (an unsigned value that fits is accepted)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConditionArg::Int(n) => Some(*n),
            ConditionArg::UInt64(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// try to get as unsigned integer (a non-negative signed value is accepted)
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConditionArg::UInt64(n) => Some(*n),
            ConditionArg::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// try to get as u32, used by the id-style checks (job, flag, layout)
    pub fn as_u32(&self) -> Option<u32> {
        self.as_u64().and_then(|n| u32::try_from(n).ok())
    }

    /// try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConditionArg::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ConditionArg::None)
    }
}

impl From<i64> for ConditionArg {
    fn from(n: i64) -> Self {
        ConditionArg::Int(n)
    }
}

impl From<u64> for ConditionArg {
    fn from(n: u64) -> Self {
        ConditionArg::UInt64(n)
    }
}

impl From<&str> for ConditionArg {
    fn from(s: &str) -> Self {
        ConditionArg::String(s.to_string())
    }
}

impl From<String> for ConditionArg {
    fn from(s: String) -> Self {
        ConditionArg::String(s)
    }
}

impl fmt::Display for ConditionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionArg::None => Ok(()),
            ConditionArg::Int(n) => write!(f, "{}", n),
            ConditionArg::UInt64(n) => write!(f, "{}u", n),
            ConditionArg::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// boolean operator joining a condition to the accumulated result before it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[default]
    And,
    Or,
    Xor,
    Equals,
}

impl Operator {
    /// parse operator from string (supports symbolic and word forms)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "and" | "&&" | "&" => Some(Operator::And),
            "or" | "||" | "|" => Some(Operator::Or),
            "xor" | "^" => Some(Operator::Xor),
            "equals" | "eq" | "==" => Some(Operator::Equals),
            _ => None,
        }
    }

    /// fold one leaf into the accumulator
    pub fn combine(self, prev: bool, leaf: bool) -> bool {
        match self {
            Operator::And => prev && leaf,
            Operator::Or => prev || leaf,
            Operator::Xor => prev ^ leaf,
            Operator::Equals => prev == leaf,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Xor => "^",
            Operator::Equals => "==",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// a condition used inside a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRef {
    /// registry id of the condition (may be unknown to this build)
    pub id: String,
    #[serde(default, skip_serializing_if = "ConditionArg::is_none")]
    pub arg: ConditionArg,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negate: bool,
    /// ignored on the first ref of a set
    #[serde(default)]
    pub operator: Operator,
}

impl ConditionRef {
    pub fn new(id: impl Into<String>, arg: impl Into<ConditionArg>) -> Self {
        Self {
            id: id.into(),
            arg: arg.into(),
            negate: false,
            operator: Operator::And,
        }
    }

    /// ref with no argument
    pub fn bare(id: impl Into<String>) -> Self {
        Self::new(id, ConditionArg::None)
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }
}

impl fmt::Display for ConditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negate {
            write!(f, "!")?;
        }
        write!(f, "{}({})", self.id, self.arg)
    }
}

/// an ordered list of condition refs folded left to right
///
/// the set's identity is its index in the owning collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<ConditionRef>,
}

impl ConditionSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
        }
    }

    /// builder form of `push`
    pub fn with(mut self, condition: ConditionRef) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: ConditionRef) {
        self.conditions.push(condition);
    }

    pub fn remove(&mut self, position: usize) -> Option<ConditionRef> {
        if position < self.conditions.len() {
            Some(self.conditions.remove(position))
        } else {
            None
        }
    }

    /// swap two refs; returns false if either position is out of range
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a < self.conditions.len() && b < self.conditions.len() {
            self.conditions.swap(a, b);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "true");
        }
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", c.operator)?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
