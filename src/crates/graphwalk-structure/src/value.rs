//! Values, element identifiers and edge directions.
//!
//! [`Value`] is the single data type that flows through a traversal: literals,
//! collections and references to graph elements. It is totally ordered and
//! hashable (floats use their IEEE total order) so traversers carrying values
//! can be merged, deduplicated and sorted.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Property map attached to vertices and edges.
pub type Properties = BTreeMap<String, Value>;

/// Unique identifier for a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(u64);

impl VertexId {
    /// Create a new `VertexId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v[{}]", self.0)
    }
}

/// Unique identifier for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Create a new `EdgeId` from a raw u64 value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e[{}]", self.0)
    }
}

/// Direction of an edge relative to a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges leaving the vertex
    Out,
    /// Edges arriving at the vertex
    In,
    /// Both directions
    Both,
}

impl Direction {
    /// The opposite direction (`Both` stays `Both`).
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Out => Self::In,
            Self::In => Self::Out,
            Self::Both => Self::Both,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Out => "OUT",
            Self::In => "IN",
            Self::Both => "BOTH",
        };
        f.write_str(name)
    }
}

/// A value carried by a traverser or stored as a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<Value>),
    /// Sorted map of values
    Map(#[serde(with = "map_entries")] BTreeMap<Value, Value>),
    /// Reference to a vertex
    Vertex(VertexId),
    /// Reference to an edge
    Edge(EdgeId),
}

fn saturate(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Exact numeric comparison of an integer with a float.
///
/// NaNs sort the way `f64::total_cmp` puts them: negative ones below every
/// integer, positive ones above.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    // in range, so the cast is exact
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.total_cmp(&(f - whole)),
        ord => ord,
    }
}

impl Value {
    /// An `Int` from an unsigned count, saturating at `i64::MAX`.
    #[must_use]
    pub fn saturating_int(n: u64) -> Self {
        Self::Int(saturate(n))
    }

    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a boolean if it is one.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer if it is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list elements if the value is a list.
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map if the value is a map.
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the vertex id if the value references a vertex.
    #[inline]
    #[must_use]
    pub const fn as_vertex(&self) -> Option<VertexId> {
        match self {
            Self::Vertex(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the edge id if the value references an edge.
    #[inline]
    #[must_use]
    pub const fn as_edge(&self) -> Option<EdgeId> {
        match self {
            Self::Edge(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns `true` for integers and floats.
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Returns `true` for vertex and edge references.
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self, Self::Vertex(_) | Self::Edge(_))
    }

    /// Compare two values the way predicates do.
    ///
    /// Numbers compare numerically across `Int`/`Float`; other values only
    /// compare with the same kind. Returns `None` when incomparable.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => Some(cmp_int_float(*a, *b)),
            (Self::Float(a), Self::Int(b)) => Some(cmp_int_float(*b, *a).reverse()),
            (Self::Float(a), Self::Float(b)) => Some(a.total_cmp(b)),
            (a, b) if a.rank() == b.rank() => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Add two numeric values, keeping integers when both sides are integers.
    #[must_use]
    pub fn add_numeric(&self, other: &Value) -> Option<Value> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(Self::Int(a.saturating_add(*b))),
            (a, b) => Some(Self::Float(a.as_f64()? + b.as_f64()?)),
        }
    }

    /// Multiply a numeric value by an integer factor (used for bulk weighting).
    #[must_use]
    pub fn scale(&self, factor: u64) -> Option<Value> {
        match self {
            Self::Int(i) => Some(Self::Int(i.saturating_mul(saturate(factor)))),
            Self::Float(f) => Some(Self::Float(f * factor as f64)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::String(_) => 4,
            Self::List(_) => 5,
            Self::Map(_) => 6,
            Self::Vertex(_) => 7,
            Self::Edge(_) => 8,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            // Mixed numbers order numerically; ties fall back to Int < Float
            (Self::Int(a), Self::Float(b)) => cmp_int_float(*a, *b).then(Ordering::Less),
            (Self::Float(a), Self::Int(b)) => cmp_int_float(*b, *a)
                .reverse()
                .then(Ordering::Greater),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.iter().cmp(b.iter()),
            (Self::Vertex(a), Self::Vertex(b)) => a.cmp(b),
            (Self::Edge(a), Self::Edge(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::List(items) => items.hash(state),
            Self::Map(map) => {
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Self::Vertex(id) => id.hash(state),
            Self::Edge(id) => id.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Self::Vertex(id) => write!(f, "{}", id),
            Self::Edge(id) => write!(f, "{}", id),
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<VertexId> for Value {
    #[inline]
    fn from(id: VertexId) -> Self {
        Self::Vertex(id)
    }
}

impl From<EdgeId> for Value {
    #[inline]
    fn from(id: EdgeId) -> Self {
        Self::Edge(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Maps serialize as a list of `[key, value]` pairs since keys are not strings.
mod map_entries {
    use super::Value;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<Value, Value>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Value, Value>, D::Error> {
        let entries: Vec<(Value, Value)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(42i64).as_int(), Some(42));
        assert_eq!(Value::from(2.5f64).as_f64(), Some(2.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(VertexId::new(3)).as_vertex(), Some(VertexId::new(3)));
    }

    #[test]
    fn mixed_numbers_order_numerically() {
        assert!(Value::Int(1) < Value::Float(1.5));
        assert!(Value::Float(0.5) < Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Int(1).compare(&Value::Float(1.0)), Some(Ordering::Equal));
    }

    #[test]
    fn large_ints_compare_exactly_with_floats() {
        let big = 1i64 << 53;
        let float = Value::Float(big as f64);
        // 2^53 + 1 has no f64 representation
        assert_eq!(Value::Int(big + 1).compare(&float), Some(Ordering::Greater));
        assert!(float < Value::Int(big + 1));
        assert!(Value::Int(big) < float);
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Float(9.3e18)), Some(Ordering::Less));
        assert_eq!(Value::Int(3).compare(&Value::Float(f64::NAN)), Some(Ordering::Less));

        let mut values = vec![Value::Int(big + 1), float.clone(), Value::Int(big), Value::Float(0.5)];
        values.sort();
        assert_eq!(
            values,
            vec![Value::Float(0.5), Value::Int(big), float, Value::Int(big + 1)]
        );
    }

    #[test]
    fn counts_saturate() {
        assert_eq!(Value::saturating_int(u64::MAX), Value::Int(i64::MAX));
        assert_eq!(Value::Int(2).scale(u64::MAX), Some(Value::Int(i64::MAX)));
        assert_eq!(Value::Int(-2).scale(u64::MAX), Some(Value::Int(i64::MIN)));
    }

    #[test]
    fn incomparable_kinds() {
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
        assert_eq!(Value::from("a").compare(&Value::from("b")), Some(Ordering::Less));
    }

    #[test]
    fn equal_values_hash_equal() {
        let a = Value::from(vec![Value::Int(1), Value::from("x")]);
        let b = Value::from(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(hash_of(&Value::Float(2.0)), hash_of(&Value::Float(2.0)));
    }

    #[test]
    fn numeric_helpers() {
        assert_eq!(Value::Int(2).add_numeric(&Value::Int(3)), Some(Value::Int(5)));
        assert_eq!(Value::Int(2).add_numeric(&Value::Float(0.5)), Some(Value::Float(2.5)));
        assert_eq!(Value::Float(1.5).scale(2), Some(Value::Float(3.0)));
        assert_eq!(Value::from("x").scale(2), None);
    }

    #[test]
    fn map_round_trips_through_json() {
        let mut map = BTreeMap::new();
        map.insert(Value::Vertex(VertexId::new(1)), Value::Int(2));
        let value = Value::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn ids_display() {
        assert_eq!(VertexId::new(1).to_string(), "v[1]");
        assert_eq!(EdgeId::new(7).to_string(), "e[7]");
        assert_eq!(Direction::Out.opposite(), Direction::In);
    }
}
