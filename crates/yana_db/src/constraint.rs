//! Declared constraints.
//!
//! A constraint is a named boolean predicate. Table constraints see the
//! constraint input of a write (the proposed column values, upper-case
//! keys); column constraints see the proposed value of their column. A
//! write is only queued if every applicable predicate returns `true`.
//!
//! Table constraints only see the columns a write proposes. A cell update
//! of `NAME` hands `{NAME: …}` to every table constraint, so predicates
//! must treat missing columns as "not my concern".

use crate::error::{DbError, DbResult};
use crate::row::Row;
use std::fmt;
use std::sync::Arc;
use yana_codec::Value;

/// A named predicate over `T`.
pub struct Constraint<T: ?Sized> {
    name: String,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

/// Constraint attached to a table.
pub type RowConstraint = Constraint<Row>;

/// Constraint attached to a column.
pub type ColumnConstraint = Constraint<Value>;

impl<T: ?Sized> Constraint<T> {
    /// Creates a constraint.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Returns the constraint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluates the predicate.
    pub fn holds(&self, input: &T) -> bool {
        (self.predicate)(input)
    }
}

impl<T: ?Sized> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// All constraints that apply to writes on one table.
#[derive(Debug, Clone)]
pub struct ConstraintSet<'a> {
    table: &'a str,
    table_constraints: &'a [RowConstraint],
    column_constraints: Vec<(&'a str, &'a [ColumnConstraint])>,
}

impl<'a> ConstraintSet<'a> {
    pub(crate) fn new(
        table: &'a str,
        table_constraints: &'a [RowConstraint],
        column_constraints: Vec<(&'a str, &'a [ColumnConstraint])>,
    ) -> Self {
        Self {
            table,
            table_constraints,
            column_constraints,
        }
    }

    /// Returns true if no constraint applies.
    pub fn is_empty(&self) -> bool {
        self.table_constraints.is_empty()
            && self.column_constraints.iter().all(|(_, c)| c.is_empty())
    }

    /// Checks the proposed values.
    ///
    /// Column constraints run first, for the columns present in `input`,
    /// then table constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConstraintViolation` naming the first failing constraint.
    pub fn check(&self, input: &Row) -> DbResult<()> {
        for (column, constraints) in &self.column_constraints {
            let Some(value) = input.get(*column) else {
                continue;
            };
            if let Some(failed) = constraints.iter().find(|c| !c.holds(value)) {
                return Err(DbError::constraint_violation(self.table, failed.name()));
            }
        }

        if let Some(failed) = self.table_constraints.iter().find(|c| !c.holds(input)) {
            return Err(DbError::constraint_violation(self.table, failed.name()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive_age() -> RowConstraint {
        Constraint::new("age_positive", |row: &Row| {
            row.get("AGE")
                .and_then(Value::as_integer)
                .map_or(true, |age| age >= 0)
        })
    }

    fn short_name() -> ColumnConstraint {
        Constraint::new("name_short", |v: &Value| {
            v.as_text().map_or(true, |s| s.len() <= 5)
        })
    }

    #[test]
    fn passing_input() {
        let table = [positive_age()];
        let column = [short_name()];
        let set = ConstraintSet::new("users", &table, vec![("NAME", &column[..])]);

        let mut row = Row::new();
        row.insert("AGE".into(), Value::from(3));
        row.insert("NAME".into(), Value::from("Bob"));
        assert!(set.check(&row).is_ok());
    }

    #[test]
    fn table_constraint_failure_names_constraint() {
        let table = [positive_age()];
        let set = ConstraintSet::new("users", &table, Vec::new());

        let mut row = Row::new();
        row.insert("AGE".into(), Value::from(-1));
        match set.check(&row) {
            Err(DbError::ConstraintViolation { table, constraint }) => {
                assert_eq!(table, "users");
                assert_eq!(constraint, "age_positive");
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }
    }

    #[test]
    fn column_constraint_only_sees_its_column() {
        let column = [short_name()];
        let set = ConstraintSet::new("users", &[], vec![("NAME", &column[..])]);

        let mut row = Row::new();
        row.insert("MAIL".into(), Value::from("a-very-long-address@example.org"));
        assert!(set.check(&row).is_ok());

        row.insert("NAME".into(), Value::from("Alexander"));
        assert!(set.check(&row).is_err());
    }

    #[test]
    fn empty_set() {
        let set = ConstraintSet::new("t", &[], Vec::new());
        assert!(set.is_empty());
        assert!(set.check(&Row::new()).is_ok());
    }
}
