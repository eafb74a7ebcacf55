//! Reducer-backed side effects.
//!
//! Every key is registered up front with an initial value and a [`Reducer`].
//! Writes never overwrite: [`SideEffects::add`] combines the current value
//! with the update through the key's reducer. The same store backs a
//! traversal's side effects (OLTP) and a graph computer's memory (OLAP).
//!
//! # Built-in reducers
//!
//! | Reducer | Behavior |
//! |---|---|
//! | [`OverwriteReducer`] | replaces the current value |
//! | [`AppendReducer`] | appends to a list (lists are concatenated) |
//! | [`SumReducer`] | numeric addition |
//! | [`MapSumReducer`] | merges maps, summing values of shared keys |
//! | [`MinReducer`] / [`MaxReducer`] | keeps the smaller/larger value |
//! | [`OrReducer`] / [`AndReducer`] | boolean or/and |

use crate::error::{ProcessError, Result};
use graphwalk_structure::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Combines a current value with an update.
///
/// Reducers used for memory must be associative and commutative: the
/// graph computer applies writes of one superstep in vertex order, not in
/// execution order.
pub trait Reducer: Send + Sync {
    /// Apply an update to the current value
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value>;

    /// Get a human-readable name for this reducer
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct OverwriteReducer;

impl Reducer for OverwriteReducer {
    fn reduce(&self, _current: &Value, update: &Value) -> Result<Value> {
        Ok(update.clone())
    }

    fn name(&self) -> &str {
        "overwrite"
    }
}

#[derive(Debug, Clone)]
pub struct AppendReducer;

impl Reducer for AppendReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        match (current, update) {
            (Value::List(curr), Value::List(upd)) => {
                let mut result = curr.clone();
                result.extend_from_slice(upd);
                Ok(Value::List(result))
            }
            (Value::Null, Value::List(upd)) => Ok(Value::List(upd.clone())),
            (Value::List(curr), single) => {
                let mut result = curr.clone();
                result.push(single.clone());
                Ok(Value::List(result))
            }
            (Value::Null, single) => Ok(Value::List(vec![single.clone()])),
            _ => Err(ProcessError::reducer(
                self.name(),
                format!("cannot append to {}", current),
            )),
        }
    }

    fn name(&self) -> &str {
        "append"
    }
}

#[derive(Debug, Clone)]
pub struct SumReducer;

impl Reducer for SumReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        if current.is_null() {
            return Ok(update.clone());
        }
        current
            .add_numeric(update)
            .ok_or_else(|| ProcessError::reducer(self.name(), format!("cannot add {} and {}", current, update)))
    }

    fn name(&self) -> &str {
        "sum"
    }
}

/// Merges maps; values under the same key are added.
#[derive(Debug, Clone)]
pub struct MapSumReducer;

impl Reducer for MapSumReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let mut merged = match current {
            Value::Map(map) => map.clone(),
            Value::Null => BTreeMap::new(),
            other => {
                return Err(ProcessError::reducer(
                    self.name(),
                    format!("current value {} is not a map", other),
                ))
            }
        };
        let Value::Map(update) = update else {
            return Err(ProcessError::reducer(
                self.name(),
                format!("update {} is not a map", update),
            ));
        };
        for (key, value) in update {
            let next = match merged.get(key) {
                Some(existing) => existing.add_numeric(value).ok_or_else(|| {
                    ProcessError::reducer("map_sum", format!("cannot add {} and {}", existing, value))
                })?,
                None => value.clone(),
            };
            merged.insert(key.clone(), next);
        }
        Ok(Value::Map(merged))
    }

    fn name(&self) -> &str {
        "map_sum"
    }
}

#[derive(Debug, Clone)]
pub struct MinReducer;

impl Reducer for MinReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        if current.is_null() || update.compare(current) == Some(std::cmp::Ordering::Less) {
            Ok(update.clone())
        } else {
            Ok(current.clone())
        }
    }

    fn name(&self) -> &str {
        "min"
    }
}

#[derive(Debug, Clone)]
pub struct MaxReducer;

impl Reducer for MaxReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        if current.is_null() || update.compare(current) == Some(std::cmp::Ordering::Greater) {
            Ok(update.clone())
        } else {
            Ok(current.clone())
        }
    }

    fn name(&self) -> &str {
        "max"
    }
}

fn as_flag(reducer: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => Err(ProcessError::reducer(
            reducer,
            format!("{} is not a boolean", other),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct OrReducer;

impl Reducer for OrReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        Ok(Value::Bool(
            as_flag(self.name(), current)? || as_flag(self.name(), update)?,
        ))
    }

    fn name(&self) -> &str {
        "or"
    }
}

#[derive(Debug, Clone)]
pub struct AndReducer;

impl Reducer for AndReducer {
    fn reduce(&self, current: &Value, update: &Value) -> Result<Value> {
        let current = if current.is_null() {
            true
        } else {
            as_flag(self.name(), current)?
        };
        Ok(Value::Bool(current && as_flag(self.name(), update)?))
    }

    fn name(&self) -> &str {
        "and"
    }
}

#[derive(Clone)]
struct Entry {
    value: Value,
    initial: Value,
    reducer: Arc<dyn Reducer>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("value", &self.value)
            .field("reducer", &self.reducer.name())
            .finish()
    }
}

/// Registry of reducer-backed keys.
#[derive(Debug, Clone, Default)]
pub struct SideEffects {
    entries: BTreeMap<String, Entry>,
    journal: Option<Vec<(String, Value)>>,
}

impl SideEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) `key`.
    pub fn register(&mut self, key: impl Into<String>, initial: Value, reducer: Arc<dyn Reducer>) {
        self.entries.insert(
            key.into(),
            Entry {
                value: initial.clone(),
                initial,
                reducer,
            },
        );
    }

    /// Register `key` unless it is already registered.
    pub fn register_if_absent(
        &mut self,
        key: impl Into<String>,
        initial: Value,
        reducer: Arc<dyn Reducer>,
    ) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.register(key, initial, reducer);
        }
    }

    /// Register every key of `other` that is missing here.
    pub fn absorb(&mut self, other: &SideEffects) {
        for (key, entry) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), entry.clone());
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.entries
            .get(key)
            .map(|e| &e.value)
            .ok_or_else(|| ProcessError::UnregisteredKey(key.to_string()))
    }

    pub fn reducer(&self, key: &str) -> Result<Arc<dyn Reducer>> {
        self.entries
            .get(key)
            .map(|e| e.reducer.clone())
            .ok_or_else(|| ProcessError::UnregisteredKey(key.to_string()))
    }

    pub fn initial(&self, key: &str) -> Result<&Value> {
        self.entries
            .get(key)
            .map(|e| &e.initial)
            .ok_or_else(|| ProcessError::UnregisteredKey(key.to_string()))
    }

    /// Combine `update` into `key` through its reducer.
    pub fn add(&mut self, key: &str, update: Value) -> Result<()> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| ProcessError::UnregisteredKey(key.to_string()))?;
        entry.value = entry.reducer.reduce(&entry.value, &update)?;
        if let Some(journal) = self.journal.as_mut() {
            journal.push((key.to_string(), update));
        }
        Ok(())
    }

    /// Replace the value of `key`, bypassing its reducer.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| ProcessError::UnregisteredKey(key.to_string()))?;
        entry.value = value;
        Ok(())
    }

    /// Same keys and reducers, values reset to their initial values, and
    /// every subsequent `add` recorded so it can be replayed elsewhere.
    pub fn recording(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(k, e)| {
                let mut e = e.clone();
                e.value = e.initial.clone();
                (k.clone(), e)
            })
            .collect();
        Self {
            entries,
            journal: Some(Vec::new()),
        }
    }

    /// Updates recorded since [`recording`](Self::recording).
    pub fn take_journal(&mut self) -> Vec<(String, Value)> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Current values by key.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }
}
