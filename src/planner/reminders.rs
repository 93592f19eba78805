use time::Date;

use crate::model::{DueDate, Task};

/// Remind once a task is this many days past due.
pub const DEFAULT_REMINDER_THRESHOLD_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder<'a> {
    pub task: &'a Task,
    pub due_date: Date,
    pub days_overdue: i64,
}

impl Reminder<'_> {
    pub fn describe(&self) -> String {
        let plural = if self.days_overdue == 1 { "" } else { "s" };
        format!("Due {} day{plural} ago", self.days_overdue)
    }
}

/// Whole days between `due` and `reference_date`; negative when `due` is ahead.
pub fn days_overdue(due: Date, reference_date: Date) -> i64 {
    (reference_date - due).whole_days()
}

/// Open tasks due at least `threshold_days` before `reference_date`, most
/// overdue first. Tasks due today or later never qualify.
pub fn find_overdue_reminders(
    tasks: &[Task],
    reference_date: Date,
    threshold_days: u32,
) -> Vec<Reminder<'_>> {
    let threshold = i64::from(threshold_days);
    let mut reminders: Vec<Reminder<'_>> = tasks
        .iter()
        .filter(|task| !task.is_done)
        .filter_map(|task| match task.due() {
            DueDate::On(due) => Some((task, due)),
            DueDate::Malformed(raw) => {
                tracing::debug!(task_id = %task.id, raw, "skipping reminder check for unreadable due date");
                None
            }
            DueDate::Absent => None,
        })
        .filter(|(_, due)| *due < reference_date)
        .map(|(task, due)| Reminder {
            task,
            due_date: due,
            days_overdue: days_overdue(due, reference_date),
        })
        .filter(|reminder| reminder.days_overdue >= threshold)
        .collect();
    reminders.sort_by_key(|reminder| reminder.due_date);
    reminders
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use uuid::Uuid;

    fn task(content: &str, due: Option<&str>, is_done: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            content: content.into(),
            is_done,
            due_date: due.map(str::to_owned),
            created_at: datetime!(2023-12-01 12:00 UTC),
        }
    }

    #[test]
    fn includes_tasks_past_threshold_with_day_count() {
        let tasks = vec![task("file taxes", Some("2024-01-05"), false)];
        let reminders = find_overdue_reminders(&tasks, date!(2024 - 01 - 10), 3);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].days_overdue, 5);
        assert_eq!(reminders[0].task.content, "file taxes");
    }

    #[test]
    fn threshold_is_inclusive() {
        let tasks = vec![task("call mum", Some("2024-01-08"), false)];
        let reference = date!(2024 - 01 - 10);
        assert!(find_overdue_reminders(&tasks, reference, 3).is_empty());
        let reminders = find_overdue_reminders(&tasks, reference, 2);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].days_overdue, 2);
    }

    #[test]
    fn done_tasks_are_never_reminded() {
        let tasks = vec![task("ancient", Some("2020-01-01"), true)];
        for threshold in [0, 1, 3, 10_000] {
            assert!(find_overdue_reminders(&tasks, date!(2024 - 01 - 10), threshold).is_empty());
        }
    }

    #[test]
    fn due_today_or_later_never_qualifies() {
        let reference = date!(2024 - 01 - 10);
        assert_eq!(days_overdue(date!(2024 - 01 - 10), reference), 0);
        assert_eq!(days_overdue(date!(2024 - 01 - 12), reference), -2);
        let tasks = vec![
            task("today", Some("2024-01-10"), false),
            task("later", Some("2024-02-01"), false),
        ];
        for threshold in [0, 1, 3] {
            assert!(find_overdue_reminders(&tasks, reference, threshold).is_empty());
        }
    }

    #[test]
    fn undated_and_malformed_tasks_are_skipped() {
        let tasks = vec![
            task("undated", None, false),
            task("broken", Some("05/01/2024"), false),
        ];
        assert!(find_overdue_reminders(&tasks, date!(2024 - 01 - 10), 0).is_empty());
    }

    #[test]
    fn most_overdue_comes_first_and_ties_keep_input_order() {
        let tasks = vec![
            task("recent", Some("2024-01-06"), false),
            task("oldest", Some("2023-12-01"), false),
            task("tie a", Some("2024-01-01"), false),
            task("tie b", Some("2024-01-01"), false),
        ];
        let reminders = find_overdue_reminders(&tasks, date!(2024 - 01 - 10), 3);
        let order: Vec<&str> = reminders
            .iter()
            .map(|reminder| reminder.task.content.as_str())
            .collect();
        assert_eq!(order, vec!["oldest", "tie a", "tie b", "recent"]);
        assert_eq!(reminders[0].days_overdue, 40);
    }

    #[test]
    fn counts_span_leap_days() {
        assert_eq!(days_overdue(date!(2024 - 02 - 28), date!(2024 - 03 - 01)), 2);
        assert_eq!(days_overdue(date!(2023 - 02 - 28), date!(2023 - 03 - 01)), 1);
    }

    #[test]
    fn describe_pluralises_days() {
        let single = task("one", Some("2024-01-09"), false);
        let reminder = Reminder {
            task: &single,
            due_date: date!(2024 - 01 - 09),
            days_overdue: 1,
        };
        assert_eq!(reminder.describe(), "Due 1 day ago");
        let many = Reminder {
            days_overdue: 4,
            ..reminder.clone()
        };
        assert_eq!(many.describe(), "Due 4 days ago");
    }

    #[test]
    fn reminder_search_is_idempotent() {
        let tasks = vec![
            task("a", Some("2024-01-01"), false),
            task("b", Some("2023-11-11"), false),
        ];
        let reference = date!(2024 - 01 - 10);
        assert_eq!(
            find_overdue_reminders(&tasks, reference, 3),
            find_overdue_reminders(&tasks, reference, 3)
        );
    }
}
