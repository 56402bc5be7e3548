use loomcore::{Execution, ExecutionId};
use std::collections::VecDeque;

/// Bounded record of past executions, evicted oldest-first, kept
/// independently of workflow persistence.
pub struct ExecutionHistory {
    capacity: usize,
    entries: VecDeque<Execution>,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn record(&mut self, execution: Execution) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(execution);
    }

    pub fn get(&self, id: ExecutionId) -> Option<&Execution> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All retained executions, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &Execution> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
