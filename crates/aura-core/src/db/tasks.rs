//! Task completion

use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::records::map_task;
use super::Database;
use crate::error::{Error, Result};
use crate::models::{Table, Task};

const SELECT_TASK: &str = "SELECT id, title, description, completed, priority, category, date, created_at
                           FROM tasks WHERE id = ?1";

impl Database {
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(SELECT_TASK, params![id], map_task)
            .optional()?)
    }

    /// Set a task's completion flag and return the updated task
    pub fn set_task_completed(&self, id: &str, completed: bool) -> Result<Task> {
        self.update_task(id, |_| completed)
    }

    /// Flip a task's completion flag and return the updated task
    pub fn toggle_task(&self, id: &str) -> Result<Task> {
        self.update_task(id, |current| !current)
    }

    fn update_task(&self, id: &str, next: impl FnOnce(bool) -> bool) -> Result<Task> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::write(Table::Tasks))?;

        let mut task = tx
            .query_row(SELECT_TASK, params![id], map_task)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?;

        task.completed = next(task.completed);
        tx.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2",
            params![task.completed, id],
        )
        .map_err(Error::write(Table::Tasks))?;
        tx.commit().map_err(Error::write(Table::Tasks))?;

        debug!(id, completed = task.completed, "Task updated");
        Ok(task)
    }
}
