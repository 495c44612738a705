//! GROUP BY bucketing
//!
//! Rows are grouped in a single scan. Groups keep the order in which their key
//! was first seen, and each group keeps its member rows so aggregates can be
//! recomputed over them.

use super::aggregator::fold_group;
use super::evaluator::Environment;
use crate::error::Result;
use crate::types::{AggregateCall, Row, Value};
use std::collections::HashMap;

/// One group: its key values and the source rows that produced it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupContext {
    pub key: Vec<Value>,
    pub members: Vec<Row>,
}

impl GroupContext {
    /// A row standing in for the group when evaluating grouped expressions.
    /// Every member agrees on the grouped columns, so the first one is used;
    /// an empty group yields NULLs.
    pub fn representative(&self, width: usize) -> Row {
        self.members
            .first()
            .cloned()
            .unwrap_or_else(|| vec![Value::Null; width])
    }

    /// Computes each aggregate call over the group's members.
    pub fn aggregate_values(
        &self,
        calls: &[AggregateCall],
        env: &Environment,
    ) -> Result<Vec<Value>> {
        calls
            .iter()
            .map(|call| fold_group(call, &self.members, env))
            .collect()
    }
}

/// Buckets rows by key, in first-seen order.
#[derive(Debug, Default)]
pub struct Grouper {
    groups: Vec<GroupContext>,
    index: HashMap<Vec<Value>, usize>,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: Vec<Value>, row: Row) {
        let position = match self.index.get(&key) {
            Some(position) => *position,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(GroupContext {
                    key,
                    members: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        self.groups[position].members.push(row);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> Vec<GroupContext> {
        self.groups
    }
}
