use super::{StrategyCategory, TraversalEngine, TraversalStrategy};
use crate::error::Result;
use crate::predicate::P;
use crate::step::{HasContainer, Step, StepKind};
use crate::traversal::Traversal;
use graphwalk_structure::Value;

/// Restricts a traversal to elements whose `partition_key` is one of the
/// readable partitions, and tags edges it adds with the write partition.
#[derive(Debug, Clone)]
pub struct PartitionStrategy {
    partition_key: String,
    write_partition: Option<String>,
    read_partitions: Vec<String>,
}

impl PartitionStrategy {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            write_partition: None,
            read_partitions: Vec::new(),
        }
    }

    /// Partition written by `add_e`; it is readable too.
    pub fn write_partition(mut self, partition: impl Into<String>) -> Self {
        let partition = partition.into();
        if !self.read_partitions.contains(&partition) {
            self.read_partitions.push(partition.clone());
        }
        self.write_partition = Some(partition);
        self
    }

    pub fn read_partition(mut self, partition: impl Into<String>) -> Self {
        let partition = partition.into();
        if !self.read_partitions.contains(&partition) {
            self.read_partitions.push(partition);
        }
        self
    }

    fn filter(&self) -> HasContainer {
        HasContainer::property(
            self.partition_key.clone(),
            P::within(self.read_partitions.iter().map(String::as_str)),
        )
    }
}

impl TraversalStrategy for PartitionStrategy {
    fn id(&self) -> &str {
        "PartitionStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Decoration
    }

    fn apply(&self, traversal: &mut Traversal, _engine: TraversalEngine) -> Result<()> {
        let mut i = 0;
        while i < traversal.steps().len() {
            let step = &mut traversal.steps_mut()[i];
            if let StepKind::AddEdge { properties, .. } = step.kind_mut() {
                if let Some(partition) = &self.write_partition {
                    properties.insert(self.partition_key.clone(), Value::from(partition.as_str()));
                }
            }
            if step.kind().emits_elements() {
                traversal.insert_step(i + 1, Step::new(StepKind::Has(vec![self.filter()])));
                i += 1;
            }
            i += 1;
        }
        Ok(())
    }
}
