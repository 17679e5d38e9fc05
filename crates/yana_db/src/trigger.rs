//! Before/after triggers.
//!
//! Tables declare callbacks for insert, update and delete. Before-triggers
//! run synchronously while a write is being queued; after-triggers are
//! collected into a [`TriggerCollection`] that travels with the queued
//! statement and runs right after that statement executed.

use crate::error::DbResult;
use crate::query::Query;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Point in a write's life at which a trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerEvent {
    /// Before an insert is queued.
    BeforeInsert,
    /// Before an update is queued.
    BeforeUpdate,
    /// Before a delete is queued.
    BeforeDelete,
    /// After an insert executed.
    AfterInsert,
    /// After an update executed.
    AfterUpdate,
    /// After a delete executed.
    AfterDelete,
}

impl TriggerEvent {
    /// Returns true for the `Before*` events.
    pub fn is_before(self) -> bool {
        matches!(
            self,
            TriggerEvent::BeforeInsert | TriggerEvent::BeforeUpdate | TriggerEvent::BeforeDelete
        )
    }
}

/// What a trigger gets to see.
#[derive(Debug, Clone)]
pub struct TriggerContext {
    /// Event being fired.
    pub event: TriggerEvent,
    /// Table the write targets.
    pub table: String,
    /// The write itself.
    pub query: Query,
}

/// A trigger callback.
///
/// Returning an error from a before-trigger stops the write from being
/// queued; from an after-trigger it aborts the commit.
pub type TriggerFn = Arc<dyn Fn(&TriggerContext) -> DbResult<()> + Send + Sync>;

/// Wraps a closure as a [`TriggerFn`].
pub fn trigger<F>(f: F) -> TriggerFn
where
    F: Fn(&TriggerContext) -> DbResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The triggers a table declares, grouped by event.
#[derive(Clone, Default)]
pub struct TriggerSet {
    triggers: BTreeMap<TriggerEvent, Vec<TriggerFn>>,
}

impl TriggerSet {
    /// Registers a trigger for `event`.
    pub fn add(&mut self, event: TriggerEvent, trigger: TriggerFn) {
        self.triggers.entry(event).or_default().push(trigger);
    }

    /// Returns the triggers registered for `event`, in registration order.
    pub fn get(&self, event: TriggerEvent) -> &[TriggerFn] {
        self.triggers.get(&event).map_or(&[], Vec::as_slice)
    }

    /// Returns the total number of registered triggers.
    pub fn len(&self) -> usize {
        self.triggers.values().map(Vec::len).sum()
    }

    /// Returns true if no trigger is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.triggers.iter().map(|(event, t)| (event, t.len())))
            .finish()
    }
}

/// Triggers bound to one statement, fired in insertion order.
#[derive(Clone, Default)]
pub struct TriggerCollection {
    entries: Vec<(TriggerFn, TriggerContext)>,
}

impl TriggerCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every trigger in `triggers` to a context for `event`.
    pub fn bind(triggers: &[TriggerFn], event: TriggerEvent, table: &str, query: &Query) -> Self {
        let entries = triggers
            .iter()
            .map(|t| {
                let context = TriggerContext {
                    event,
                    table: table.to_string(),
                    query: query.clone(),
                };
                (Arc::clone(t), context)
            })
            .collect();
        Self { entries }
    }

    /// Appends another collection.
    pub fn extend(&mut self, other: TriggerCollection) {
        self.entries.extend(other.entries);
    }

    /// Returns the number of bound triggers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fires every bound trigger in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error a trigger reports.
    pub fn fire(&self) -> DbResult<()> {
        self.entries
            .iter()
            .try_for_each(|(trigger, context)| trigger(context))
    }
}

impl fmt::Debug for TriggerCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(_, ctx)| ctx.event))
            .finish()
    }
}
