//! Column definitions.

use crate::constraint::ColumnConstraint;
use yana_codec::Value;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float. Integers are accepted and widened by readers.
    Float,
    /// UTF-8 text.
    Text,
    /// Boolean.
    Bool,
    /// Raw bytes.
    Bytes,
    /// Nested array or map, addressable by sub-path.
    Array,
}

impl ColumnType {
    /// Returns true if `value` can be stored in a column of this type.
    ///
    /// `Null` is not handled here; see [`Column::accepts`].
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ColumnType::Integer => matches!(value, Value::Integer(_)),
            ColumnType::Float => matches!(value, Value::Float(_) | Value::Integer(_)),
            ColumnType::Text => matches!(value, Value::Text(_)),
            ColumnType::Bool => matches!(value, Value::Bool(_)),
            ColumnType::Bytes => matches!(value, Value::Bytes(_)),
            ColumnType::Array => value.is_container(),
        }
    }
}

/// A column of a table.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    nullable: bool,
    readonly: bool,
    constraints: Vec<ColumnConstraint>,
}

impl Column {
    /// Creates a nullable, writeable column. The name is upper-cased.
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_uppercase(),
            column_type,
            nullable: true,
            readonly: false,
            constraints: Vec::new(),
        }
    }

    /// Rejects `Null` values.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Adds a constraint on the proposed value.
    #[must_use]
    pub fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Returns the upper-case column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Returns true for array-typed columns.
    pub fn is_array(&self) -> bool {
        self.column_type == ColumnType::Array
    }

    /// Returns true if `Null` is allowed.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns true if the column refuses writes.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Returns the declared constraints.
    pub fn constraints(&self) -> &[ColumnConstraint] {
        &self.constraints
    }

    /// Returns true if `value` fits the type and nullability of this column.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            self.nullable
        } else {
            self.column_type.accepts(value)
        }
    }
}
