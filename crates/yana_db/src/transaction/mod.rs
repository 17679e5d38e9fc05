//! Queued transactions.
//!
//! Writes are not sent to the backend when they are made. A [`Transaction`]
//! validates each write against the schema, fires its before-triggers, and
//! appends it to a queue together with its after-triggers. [`Transaction::commit`]
//! replays the queue against a driver inside a begin/commit envelope.

mod queue;
mod replay;
mod state;

pub use queue::{QueuedStatement, Statement};
pub use state::Transaction;
