//! Read-only views derived from a snapshot of tasks.
//!
//! Nothing here touches storage or the clock: callers pass the task list and
//! the reference date, and get borrowed views back.

pub mod grouping;
pub mod labels;
pub mod reminders;

pub use grouping::{group_by_due_date, GroupKey, MalformedDueDate, TaskGroups, NO_DUE_DATE};
pub use reminders::{
    days_overdue, find_overdue_reminders, Reminder, DEFAULT_REMINDER_THRESHOLD_DAYS,
};

use crate::model::Task;

/// Tasks not yet done, in snapshot order.
pub fn pending_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| !task.is_done).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn pending_keeps_order_and_drops_done() {
        let make = |content: &str, is_done| Task {
            id: Uuid::new_v4(),
            content: content.into(),
            is_done,
            due_date: None,
            created_at: datetime!(2024-01-01 00:00 UTC),
        };
        let tasks = vec![make("a", false), make("b", true), make("c", false)];
        let pending: Vec<&str> = pending_tasks(&tasks)
            .into_iter()
            .map(|task| task.content.as_str())
            .collect();
        assert_eq!(pending, vec!["a", "c"]);
    }
}
