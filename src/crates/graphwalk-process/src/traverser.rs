//! Traversers: the unit of data flowing through a step pipeline.
//!
//! A [`Traverser`] carries the current [`Value`], an optional [`Path`] of the
//! values it visited, a bulk multiplicity and a loop counter. Two traversers
//! with equal value, path and loop count are interchangeable, so they may be
//! merged into one whose bulk is the sum of both ([`TraverserSet`]).

use crate::error::{ProcessError, Result};
use graphwalk_structure::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One visited value plus the step labels attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathEntry {
    pub labels: Vec<String>,
    pub value: Value,
}

/// Ordered history of the values a traverser visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    entries: Vec<PathEntry>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value with the given labels.
    pub fn extend(&mut self, value: Value, labels: &[String]) {
        self.entries.push(PathEntry {
            labels: labels.to_vec(),
            value,
        });
    }

    /// Add labels to the most recent entry.
    pub fn label_last(&mut self, labels: &[String]) {
        if let Some(last) = self.entries.last_mut() {
            for label in labels {
                if !last.labels.contains(label) {
                    last.labels.push(label.clone());
                }
            }
        }
    }

    /// Most recent value carrying `label`.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.labels.iter().any(|l| l == label))
            .map(|e| &e.value)
    }

    /// `(labels, value)` pairs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &Value)> {
        self.entries.iter().map(|e| (e.labels.as_slice(), &e.value))
    }

    pub fn objects(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether no value appears twice.
    pub fn is_simple(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.entries.iter().all(|e| seen.insert(&e.value))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", entry.value)?;
        }
        write!(f, "]")
    }
}

/// A value moving through a traversal, with path, bulk and loop state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traverser {
    value: Value,
    path: Option<Path>,
    bulk: u64,
    loops: u32,
}

impl Traverser {
    /// A traverser without path tracking.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            path: None,
            bulk: 1,
            loops: 0,
        }
    }

    /// A traverser whose path starts with `value`.
    pub fn with_path(value: Value, labels: &[String]) -> Self {
        let mut path = Path::new();
        path.extend(value.clone(), labels);
        Self {
            value,
            path: Some(path),
            bulk: 1,
            loops: 0,
        }
    }

    /// Start a traverser, tracking its path when `track_path` is set.
    pub fn start(value: Value, track_path: bool) -> Self {
        if track_path {
            Self::with_path(value, &[])
        } else {
            Self::new(value)
        }
    }

    /// The current value.
    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// The path, or [`ProcessError::PathNotTracked`] if it is not tracked.
    ///
    /// A tracked path is never confused with a missing one: a traverser
    /// created with path tracking always has at least its start value.
    pub fn path(&self) -> Result<&Path> {
        self.path.as_ref().ok_or(ProcessError::PathNotTracked)
    }

    pub fn is_path_tracked(&self) -> bool {
        self.path.is_some()
    }

    pub fn bulk(&self) -> u64 {
        self.bulk
    }

    /// Set the bulk. A bulk of zero is raised to one.
    pub fn set_bulk(&mut self, bulk: u64) {
        self.bulk = bulk.max(1);
    }

    pub fn loops(&self) -> u32 {
        self.loops
    }

    pub fn incr_loops(&mut self) {
        self.loops = self.loops.saturating_add(1);
    }

    pub fn reset_loops(&mut self) {
        self.loops = 0;
    }

    /// A traverser at `value` that keeps this one's path, bulk and loops.
    ///
    /// When the path is tracked the new value is appended to it.
    pub fn split(&self, value: Value) -> Traverser {
        let path = self.path.as_ref().map(|path| {
            let mut path = path.clone();
            path.extend(value.clone(), &[]);
            path
        });
        Traverser {
            value,
            path,
            bulk: self.bulk,
            loops: self.loops,
        }
    }

    /// Attach step labels to the latest path entry.
    pub fn add_labels(&mut self, labels: &[String]) {
        if let Some(path) = self.path.as_mut() {
            path.label_last(labels);
        }
    }

    /// Whether `other` can be merged into this traverser.
    pub fn can_merge(&self, other: &Traverser) -> bool {
        self.value == other.value && self.loops == other.loops && self.path == other.path
    }

    /// Add `other`'s bulk to this traverser. The caller checks [`can_merge`](Self::can_merge).
    pub fn merge(&mut self, other: &Traverser) {
        self.bulk = self.bulk.saturating_add(other.bulk);
    }

    fn merge_key(&self) -> (Value, Option<Path>, u32) {
        (self.value.clone(), self.path.clone(), self.loops)
    }
}

impl fmt::Display for Traverser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bulk > 1 {
            write!(f, "{}x{}", self.value, self.bulk)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Insertion-ordered collection that merges equal traversers by bulk.
#[derive(Debug, Clone, Default)]
pub struct TraverserSet {
    traversers: Vec<Traverser>,
    index: HashMap<(Value, Option<Path>, u32), usize>,
}

impl TraverserSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a traverser, merging it into an equal one if present.
    pub fn add(&mut self, traverser: Traverser) {
        let key = traverser.merge_key();
        match self.index.get(&key) {
            Some(&i) => self.traversers[i].merge(&traverser),
            None => {
                self.index.insert(key, self.traversers.len());
                self.traversers.push(traverser);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.traversers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traversers.is_empty()
    }

    /// Sum of all bulks.
    pub fn total_bulk(&self) -> u64 {
        self.traversers.iter().map(Traverser::bulk).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Traverser> {
        self.traversers.iter()
    }

    pub fn into_vec(self) -> Vec<Traverser> {
        self.traversers
    }
}

impl FromIterator<Traverser> for TraverserSet {
    fn from_iter<I: IntoIterator<Item = Traverser>>(iter: I) -> Self {
        let mut set = TraverserSet::new();
        for traverser in iter {
            set.add(traverser);
        }
        set
    }
}

impl IntoIterator for TraverserSet {
    type Item = Traverser;
    type IntoIter = std::vec::IntoIter<Traverser>;

    fn into_iter(self) -> Self::IntoIter {
        self.traversers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_not_tracked_is_distinct_from_empty() {
        let untracked = Traverser::new(Value::Int(1));
        assert!(matches!(untracked.path(), Err(ProcessError::PathNotTracked)));

        let tracked = Traverser::with_path(Value::Int(1), &[]);
        assert_eq!(tracked.path().unwrap().len(), 1);
        assert!(Path::new().is_empty());
    }

    #[test]
    fn test_split_inherits_bulk_and_extends_path() {
        let mut t = Traverser::with_path(Value::Int(1), &["a".to_string()]);
        t.set_bulk(4);
        t.incr_loops();
        let s = t.split(Value::Int(2));
        assert_eq!(s.bulk(), 4);
        assert_eq!(s.loops(), 1);
        assert_eq!(s.path().unwrap().objects(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(s.path().unwrap().get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_set_merges_equal_traversers() {
        let mut a = Traverser::new(Value::from("x"));
        a.set_bulk(2);
        let mut b = Traverser::new(Value::from("x"));
        b.set_bulk(3);
        let mut looped = Traverser::new(Value::from("x"));
        looped.incr_loops();

        let set: TraverserSet = vec![a, b, looped].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_bulk(), 6);
        assert_eq!(set.iter().next().unwrap().bulk(), 5);
    }

    #[test]
    fn test_zero_bulk_is_raised() {
        let mut t = Traverser::new(Value::Null);
        t.set_bulk(0);
        assert_eq!(t.bulk(), 1);
    }

    #[test]
    fn test_simple_path() {
        let t = Traverser::with_path(Value::Int(1), &[]);
        let t = t.split(Value::Int(2));
        assert!(t.path().unwrap().is_simple());
        let t = t.split(Value::Int(1));
        assert!(!t.path().unwrap().is_simple());
    }
}
