//! Replaying a transaction against a driver.

use super::queue::Statement;
use super::state::Transaction;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use tracing::{debug, error};

impl Transaction {
    /// Sends every queued statement to `driver` and commits.
    ///
    /// Statements run in queue order. Right after a statement executed its
    /// after-triggers fire, before the next statement is sent. If a
    /// statement or trigger fails, the driver is rolled back, the error is
    /// returned unchanged and the queue is kept. A failed driver commit is
    /// also followed by a rollback attempt. The queue is cleared only once
    /// the driver committed.
    ///
    /// An empty transaction does not touch the driver.
    ///
    /// # Errors
    ///
    /// The error of the failing statement or trigger, the error of
    /// `begin_transaction`, or `CommitFailed` if the driver commit fails.
    pub fn commit(&mut self, driver: &mut dyn Driver) -> DbResult<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        driver.begin_transaction()?;

        for entry in &self.queue {
            if entry.statement.is_empty() {
                debug!(statement = %entry.statement, "skipping empty statement");
                continue;
            }
            debug!(driver = driver.name(), statement = %entry.statement, "sending statement");

            let sent = match &entry.statement {
                Statement::Query(query) => driver.send_query(query),
                Statement::Sql(sql) => driver.send_sql(sql),
            };
            let outcome = sent.and_then(|_| entry.triggers.fire());

            if let Err(err) = outcome {
                error!(
                    driver = driver.name(),
                    statement = %entry.statement,
                    error = %err,
                    "statement failed, rolling back"
                );
                if let Err(rollback_err) = driver.rollback() {
                    error!(driver = driver.name(), error = %rollback_err, "rollback failed");
                }
                return Err(err);
            }
        }

        if let Err(err) = driver.commit() {
            error!(driver = driver.name(), error = %err, "commit failed, rolling back");
            if let Err(rollback_err) = driver.rollback() {
                error!(driver = driver.name(), error = %rollback_err, "rollback failed");
            }
            return Err(DbError::commit_failed(err.to_string()));
        }
        self.queue.clear();
        Ok(())
    }
}
