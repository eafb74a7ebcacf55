//! Cross-superstep memory of a graph computation.

use crate::error::Result;
use crate::side_effects::{Reducer, SideEffects};
use graphwalk_structure::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Reducer-backed global state of a computation.
///
/// Only the engine and the program's `setup`/`terminate` hooks hold a
/// `Memory` mutably. Vertex executions read a [`MemorySnapshot`] taken at
/// the start of the superstep and buffer their writes, which the engine
/// folds in through each key's reducer at the barrier.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    store: SideEffects,
    superstep: u64,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with an initial value and reducer.
    pub fn register(&mut self, key: impl Into<String>, initial: Value, reducer: Arc<dyn Reducer>) {
        self.store.register(key, initial, reducer);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    pub fn get(&self, key: &str) -> Result<&Value> {
        self.store.get(key)
    }

    /// Combine `update` into `key` through its reducer.
    pub fn add(&mut self, key: &str, update: Value) -> Result<()> {
        self.store.add(key, update)
    }

    /// Replace the value of `key`, bypassing its reducer.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.store.set(key, value)
    }

    /// Supersteps completed so far.
    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    pub(crate) fn set_superstep(&mut self, superstep: u64) {
        self.superstep = superstep;
    }

    pub(crate) fn snapshot(&self, runtime: Duration) -> MemorySnapshot {
        MemorySnapshot {
            values: self.store.values(),
            superstep: self.superstep,
            runtime,
        }
    }
}

/// Immutable view of memory values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemorySnapshot {
    values: BTreeMap<String, Value>,
    superstep: u64,
    runtime: Duration,
}

impl MemorySnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// Wall-clock time from submission to the snapshot.
    pub fn runtime(&self) -> Duration {
        self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::side_effects::{OrReducer, SumReducer};

    #[test]
    fn test_snapshot_is_detached_from_later_writes() {
        let mut memory = Memory::new();
        memory.register("total", Value::Int(0), Arc::new(SumReducer));
        memory.register("flag", Value::Bool(false), Arc::new(OrReducer));
        memory.add("total", Value::Int(2)).unwrap();
        memory.set_superstep(3);

        let snapshot = memory.snapshot(Duration::from_millis(5));
        memory.add("total", Value::Int(5)).unwrap();
        memory.add("flag", Value::Bool(true)).unwrap();

        assert_eq!(snapshot.get("total"), Some(&Value::Int(2)));
        assert_eq!(snapshot.get("flag"), Some(&Value::Bool(false)));
        assert_eq!(snapshot.superstep(), 3);
        assert_eq!(memory.get("total").unwrap(), &Value::Int(7));
    }

    #[test]
    fn test_unregistered_key() {
        let mut memory = Memory::new();
        assert!(memory.add("missing", Value::Int(1)).is_err());
        assert!(!memory.contains("missing"));
    }
}
