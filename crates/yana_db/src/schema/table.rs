//! Table definitions.

use super::column::Column;
use crate::constraint::{ConstraintSet, RowConstraint};
use crate::error::DbResult;
use crate::trigger::{TriggerContext, TriggerEvent, TriggerFn, TriggerSet};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A table: columns, primary key, constraints and triggers.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    primary_key: String,
    columns: BTreeMap<String, Column>,
    constraints: Vec<RowConstraint>,
    triggers: TriggerSet,
    readonly: bool,
}

impl Table {
    /// Creates a table. The name is lower-cased, the primary key upper-cased.
    pub fn new(name: &str, primary_key: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            primary_key: primary_key.to_uppercase(),
            columns: BTreeMap::new(),
            constraints: Vec::new(),
            triggers: TriggerSet::default(),
            readonly: false,
        }
    }

    /// Adds a column, replacing one with the same name.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column.name().to_string(), column);
        self
    }

    /// Adds a table constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: RowConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Registers a trigger callback for `event`.
    #[must_use]
    pub fn on<F>(mut self, event: TriggerEvent, trigger: F) -> Self
    where
        F: Fn(&TriggerContext) -> DbResult<()> + Send + Sync + 'static,
    {
        self.triggers.add(event, Arc::new(trigger));
        self
    }

    /// Marks the table read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Returns the lower-case table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the upper-case primary key column.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Looks up a column, case-insensitively.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(&name.to_uppercase())
    }

    /// Returns true if the column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Iterates over the columns in name order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Returns every constraint that applies to writes on this table.
    pub fn constraints(&self) -> ConstraintSet<'_> {
        let columns = self
            .columns
            .values()
            .filter(|c| !c.constraints().is_empty())
            .map(|c| (c.name(), c.constraints()))
            .collect();
        ConstraintSet::new(&self.name, &self.constraints, columns)
    }

    /// Returns the triggers registered for `event`.
    pub fn triggers(&self, event: TriggerEvent) -> &[TriggerFn] {
        self.triggers.get(event)
    }

    /// Returns true if the table refuses writes.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}
