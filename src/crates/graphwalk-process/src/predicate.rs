//! Value predicates used by `is`, `has` and friends.

use graphwalk_structure::Value;
use std::cmp::Ordering;
use std::fmt;

/// A predicate over a single [`Value`].
///
/// Ordering predicates compare numbers across `Int`/`Float`; values of
/// incomparable kinds never satisfy an ordering predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum P {
    Eq(Value),
    Neq(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    Within(Vec<Value>),
    Without(Vec<Value>),
    /// `low <= v < high`
    Between(Value, Value),
    And(Box<P>, Box<P>),
    Or(Box<P>, Box<P>),
    Not(Box<P>),
}

impl P {
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Eq(value.into())
    }

    pub fn neq(value: impl Into<Value>) -> Self {
        Self::Neq(value.into())
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::Lt(value.into())
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::Lte(value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::Gt(value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::Gte(value.into())
    }

    pub fn within<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Within(values.into_iter().map(Into::into).collect())
    }

    pub fn without<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Without(values.into_iter().map(Into::into).collect())
    }

    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Between(low.into(), high.into())
    }

    pub fn and(self, other: P) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: P) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate the predicate against `value`.
    pub fn test(&self, value: &Value) -> bool {
        let cmp = |other: &Value| value.compare(other);
        match self {
            Self::Eq(v) => cmp(v) == Some(Ordering::Equal),
            Self::Neq(v) => cmp(v) != Some(Ordering::Equal),
            Self::Lt(v) => cmp(v) == Some(Ordering::Less),
            Self::Lte(v) => matches!(cmp(v), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt(v) => cmp(v) == Some(Ordering::Greater),
            Self::Gte(v) => matches!(cmp(v), Some(Ordering::Greater | Ordering::Equal)),
            Self::Within(vs) => vs.iter().any(|v| cmp(v) == Some(Ordering::Equal)),
            Self::Without(vs) => vs.iter().all(|v| cmp(v) != Some(Ordering::Equal)),
            Self::Between(low, high) => {
                matches!(cmp(low), Some(Ordering::Greater | Ordering::Equal))
                    && cmp(high) == Some(Ordering::Less)
            }
            Self::And(a, b) => a.test(value) && b.test(value),
            Self::Or(a, b) => a.test(value) || b.test(value),
            Self::Not(p) => !p.test(value),
        }
    }

    /// The value an index lookup can answer this predicate with, if any.
    pub fn index_value(&self) -> Option<&Value> {
        match self {
            Self::Eq(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for P {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |vs: &[Value]| {
            vs.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Eq(v) => write!(f, "eq({})", v),
            Self::Neq(v) => write!(f, "neq({})", v),
            Self::Lt(v) => write!(f, "lt({})", v),
            Self::Lte(v) => write!(f, "lte({})", v),
            Self::Gt(v) => write!(f, "gt({})", v),
            Self::Gte(v) => write!(f, "gte({})", v),
            Self::Within(vs) => write!(f, "within([{}])", list(vs)),
            Self::Without(vs) => write!(f, "without([{}])", list(vs)),
            Self::Between(a, b) => write!(f, "between({}, {})", a, b),
            Self::And(a, b) => write!(f, "and({}, {})", a, b),
            Self::Or(a, b) => write!(f, "or({}, {})", a, b),
            Self::Not(p) => write!(f, "not({})", p),
        }
    }
}
