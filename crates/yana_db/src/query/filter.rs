//! Row filters for select, count, exist and delete queries.

use crate::row::Row;
use std::cmp::Ordering;
use std::fmt;
use yana_codec::Value;

/// Comparison operator of a [`Where`] clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// Case-insensitive pattern match with `%` and `_` wildcards.
    Like,
}

impl Operator {
    fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Like => "LIKE",
        }
    }

    fn evaluate(self, left: &Value, right: &Value) -> bool {
        if self == Operator::Like {
            return match (left.as_text(), right.as_text()) {
                (Some(text), Some(pattern)) => like(text, pattern),
                _ => false,
            };
        }
        let Some(ordering) = left.compare(right) else {
            return self == Operator::NotEqual;
        };
        match self {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::NotEqual => ordering != Ordering::Equal,
            Operator::Less => ordering == Ordering::Less,
            Operator::LessOrEqual => ordering != Ordering::Greater,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
            Operator::Like => false,
        }
    }
}

/// A boolean filter over rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Compares a column with a constant. Missing columns read as `Null`.
    Compare {
        /// Upper-case column name.
        column: String,
        /// Operator.
        operator: Operator,
        /// Right-hand side.
        value: Value,
    },
    /// All clauses hold. An empty list holds.
    And(Vec<Where>),
    /// Any clause holds. An empty list does not hold.
    Or(Vec<Where>),
    /// The clause does not hold.
    Not(Box<Where>),
}

impl Where {
    /// Builds a comparison; the column name is upper-cased.
    pub fn compare(column: &str, operator: Operator, value: impl Into<Value>) -> Self {
        Where::Compare {
            column: column.to_uppercase(),
            operator,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Equal, value)
    }

    /// `column <> value`
    pub fn ne(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::NotEqual, value)
    }

    /// `column < value`
    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Less, value)
    }

    /// `column <= value`
    pub fn le(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::LessOrEqual, value)
    }

    /// `column > value`
    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::Greater, value)
    }

    /// `column >= value`
    pub fn ge(column: &str, value: impl Into<Value>) -> Self {
        Self::compare(column, Operator::GreaterOrEqual, value)
    }

    /// `column LIKE pattern`
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::compare(column, Operator::Like, pattern)
    }

    /// Conjunction of `self` and `other`.
    #[must_use]
    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut clauses) => {
                clauses.push(other);
                Where::And(clauses)
            }
            clause => Where::And(vec![clause, other]),
        }
    }

    /// Disjunction of `self` and `other`.
    #[must_use]
    pub fn or(self, other: Where) -> Self {
        match self {
            Where::Or(mut clauses) => {
                clauses.push(other);
                Where::Or(clauses)
            }
            clause => Where::Or(vec![clause, other]),
        }
    }

    /// Negation of `self`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Where::Not(Box::new(self))
    }

    /// Evaluates the filter against a row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Where::Compare {
                column,
                operator,
                value,
            } => {
                let left = row.get(column).unwrap_or(&Value::Null);
                operator.evaluate(left, value)
            }
            Where::And(clauses) => clauses.iter().all(|c| c.matches(row)),
            Where::Or(clauses) => clauses.iter().any(|c| c.matches(row)),
            Where::Not(clause) => !clause.matches(row),
        }
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, clauses: &[Where], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, clause) in clauses.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{clause}")?;
            }
            f.write_str(")")
        }

        match self {
            Where::Compare {
                column,
                operator,
                value,
            } => write!(f, "{column} {} {value}", operator.symbol()),
            Where::And(clauses) => join(f, clauses, "AND"),
            Where::Or(clauses) => join(f, clauses, "OR"),
            Where::Not(clause) => write!(f, "NOT {clause}"),
        }
    }
}

/// SQL `LIKE` matching, case-insensitive.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    // matched[j]: pattern[..i] matches text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}
