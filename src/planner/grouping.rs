use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use time::Date;
use uuid::Uuid;

use crate::model::{format_due_date, DueDate, Task};
use crate::planner::labels;

pub const NO_DUE_DATE: &str = "No Due Date";

/// Bucket a task lands in on the agenda.
///
/// Orders by calendar date with [`GroupKey::NoDueDate`] after every date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Date(Date),
    NoDueDate,
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Date(a), GroupKey::Date(b)) => a.cmp(b),
            (GroupKey::Date(_), GroupKey::NoDueDate) => Ordering::Less,
            (GroupKey::NoDueDate, GroupKey::Date(_)) => Ordering::Greater,
            (GroupKey::NoDueDate, GroupKey::NoDueDate) => Ordering::Equal,
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Date(date) => f.write_str(&format_due_date(*date)),
            GroupKey::NoDueDate => f.write_str(NO_DUE_DATE),
        }
    }
}

/// A task whose stored due date could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedDueDate {
    pub task_id: Uuid,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct TaskGroups<'a> {
    pub groups: IndexMap<GroupKey, Vec<&'a Task>>,
    pub ordered_keys: Vec<GroupKey>,
    /// Tasks grouped under [`GroupKey::NoDueDate`] only because their date was unreadable.
    pub malformed: Vec<MalformedDueDate>,
    reference_date: Date,
}

impl<'a> TaskGroups<'a> {
    pub fn get(&self, key: &GroupKey) -> Option<&[&'a Task]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Groups in display order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupKey, &[&'a Task])> + '_ {
        self.ordered_keys
            .iter()
            .filter_map(|key| self.get(key).map(|tasks| (*key, tasks)))
    }

    pub fn label(&self, key: GroupKey) -> String {
        labels::group_label(key, self.reference_date)
    }

    pub fn reference_date(&self) -> Date {
        self.reference_date
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Partitions `tasks` into due-date buckets.
///
/// Within a bucket, dated tasks come first ordered by due date, then newest
/// `created_at` first. Keys are ordered ascending by date with the
/// "No Due Date" bucket last. `reference_date` anchors the relative labels.
pub fn group_by_due_date(tasks: &[Task], reference_date: Date) -> TaskGroups<'_> {
    let mut malformed = Vec::new();
    let mut dated: Vec<(&Task, Option<Date>)> = tasks
        .iter()
        .map(|task| match task.due() {
            DueDate::On(date) => (task, Some(date)),
            DueDate::Absent => (task, None),
            DueDate::Malformed(raw) => {
                tracing::warn!(task_id = %task.id, raw, "unreadable due date, grouping as undated");
                malformed.push(MalformedDueDate {
                    task_id: task.id,
                    raw: raw.to_string(),
                });
                (task, None)
            }
        })
        .collect();

    dated.sort_by(|(a, a_due), (b, b_due)| match (a_due, b_due) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y).then_with(|| b.created_at.cmp(&a.created_at)),
        (None, None) => b.created_at.cmp(&a.created_at),
    });

    let mut groups: IndexMap<GroupKey, Vec<&Task>> = IndexMap::new();
    for (task, due) in dated {
        let key = due.map(GroupKey::Date).unwrap_or(GroupKey::NoDueDate);
        groups.entry(key).or_default().push(task);
    }
    groups.sort_keys();
    let ordered_keys = groups.keys().copied().collect();

    TaskGroups {
        groups,
        ordered_keys,
        malformed,
        reference_date,
    }
}
