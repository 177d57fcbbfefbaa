//! Identity allocation.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// Allocates identities, monotonically increasing and unique per table.
pub trait Sequences: Send + Sync {
    /// Next identity for the qualified table name.
    fn next(&self, table: &str) -> Result<i64>;
}

/// In-process sequences starting at 1 for every table.
#[derive(Debug, Default)]
pub struct MemorySequences {
    counters: Mutex<HashMap<String, i64>>,
}

impl MemorySequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last identity handed out for `table`, or 0.
    pub fn current(&self, table: &str) -> i64 {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters.get(table).copied().unwrap_or(0)
    }
}

impl Sequences for MemorySequences {
    fn next(&self, table: &str) -> Result<i64> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(table.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_table() {
        let seq = MemorySequences::new();
        assert_eq!(seq.next("harness.master1").unwrap(), 1);
        assert_eq!(seq.next("harness.master1").unwrap(), 2);
        assert_eq!(seq.next("harness.detail").unwrap(), 1);
        assert_eq!(seq.current("harness.master1"), 2);
        assert_eq!(seq.current("harness.other"), 0);
    }
}
