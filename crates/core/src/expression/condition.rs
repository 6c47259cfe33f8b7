use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr, Not};

use crate::value::{Item, Value};

/// Starts a condition on a key attribute.
///
/// Key conditions only accept `eq`, the range comparisons, `between` and
/// `begins_with`; the database rejects anything else in a key condition.
pub fn key(name: impl Into<String>) -> Path {
    Path { name: name.into() }
}

/// Starts a condition on any attribute, for filters.
pub fn attr(name: impl Into<String>) -> Path {
    Path { name: name.into() }
}

/// An attribute name a condition is being built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    name: String,
}

impl Path {
    fn compare(self, op: Comparator, value: impl Into<Value>) -> Condition {
        Condition::Compare {
            name: self.name,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Ne, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Le, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Condition {
        self.compare(Comparator::Ge, value)
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::Between {
            name: self.name,
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn begins_with(self, prefix: impl Into<Value>) -> Condition {
        Condition::BeginsWith {
            name: self.name,
            prefix: prefix.into(),
        }
    }

    pub fn contains(self, value: impl Into<Value>) -> Condition {
        Condition::Contains {
            name: self.name,
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::In {
            name: self.name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(self) -> Condition {
        Condition::Exists(self.name)
    }

    pub fn not_exists(self) -> Condition {
        Condition::NotExists(self.name)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "<>",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Ne => ordering != Ordering::Equal,
            Comparator::Lt => ordering == Ordering::Less,
            Comparator::Le => ordering != Ordering::Greater,
            Comparator::Gt => ordering == Ordering::Greater,
            Comparator::Ge => ordering != Ordering::Less,
        }
    }
}

/// A boolean predicate over an item's attributes.
///
/// Combine with `&`, `|` and `!`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        name: String,
        op: Comparator,
        value: Value,
    },
    Between {
        name: String,
        low: Value,
        high: Value,
    },
    BeginsWith {
        name: String,
        prefix: Value,
    },
    Contains {
        name: String,
        value: Value,
    },
    In {
        name: String,
        values: Vec<Value>,
    },
    Exists(String),
    NotExists(String),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// AND-combines all conditions, or `None` when there are none.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        conditions.into_iter().reduce(|acc, c| acc & c)
    }

    /// Evaluates the condition against an item.
    ///
    /// Comparisons against an absent attribute, or between values of
    /// different types, are false.
    pub fn evaluate(&self, item: &Item) -> bool {
        match self {
            Condition::Compare { name, op, value } => item
                .get(name)
                .and_then(|v| v.compare(value))
                .is_some_and(|ordering| op.holds(ordering)),
            Condition::Between { name, low, high } => item.get(name).is_some_and(|v| {
                matches!(v.compare(low), Some(Ordering::Equal | Ordering::Greater))
                    && matches!(v.compare(high), Some(Ordering::Equal | Ordering::Less))
            }),
            Condition::BeginsWith { name, prefix } => match (item.get(name), prefix) {
                (Some(Value::String(s)), Value::String(p)) => s.starts_with(p.as_str()),
                (Some(Value::Binary(b)), Value::Binary(p)) => b.starts_with(p),
                _ => false,
            },
            Condition::Contains { name, value } => match (item.get(name), value) {
                (Some(Value::String(s)), Value::String(sub)) => s.contains(sub.as_str()),
                _ => false,
            },
            Condition::In { name, values } => item
                .get(name)
                .is_some_and(|v| values.iter().any(|candidate| v.matches(candidate))),
            Condition::Exists(name) => item.contains_key(name),
            Condition::NotExists(name) => !item.contains_key(name),
            Condition::And(a, b) => a.evaluate(item) && b.evaluate(item),
            Condition::Or(a, b) => a.evaluate(item) || b.evaluate(item),
            Condition::Not(inner) => !inner.evaluate(item),
        }
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}
