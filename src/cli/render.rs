use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::model::{format_due_date, DueDate, GroceryItem, GroceryList, Task};
use crate::planner::labels::short_date;
use crate::planner::{GroupKey, MalformedDueDate, Reminder, TaskGroups};

#[derive(Serialize)]
struct AgendaView<'a> {
    reference_date: String,
    reminders: Vec<ReminderView<'a>>,
    groups: Vec<GroupView<'a>>,
    malformed: Vec<MalformedView<'a>>,
}

#[derive(Serialize)]
struct GroupView<'a> {
    key: String,
    label: String,
    tasks: &'a [&'a Task],
}

#[derive(Serialize)]
struct ReminderView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    days_overdue: i64,
}

#[derive(Serialize)]
struct MalformedView<'a> {
    task_id: String,
    raw: &'a str,
}

#[derive(Serialize)]
struct GroceryListView<'a> {
    #[serde(flatten)]
    list: &'a GroceryList,
    items: &'a [GroceryItem],
}

pub fn agenda_json(groups: &TaskGroups<'_>, reminders: &[Reminder<'_>]) -> Result<String> {
    let view = AgendaView {
        reference_date: format_due_date(groups.reference_date()),
        reminders: reminder_views(reminders),
        groups: groups
            .iter()
            .map(|(key, tasks)| GroupView {
                key: key.to_string(),
                label: groups.label(key),
                tasks,
            })
            .collect(),
        malformed: groups.malformed.iter().map(malformed_view).collect(),
    };
    to_json(&view)
}

pub fn reminders_json(reminders: &[Reminder<'_>]) -> Result<String> {
    to_json(&reminder_views(reminders))
}

pub fn grocery_list_json(list: &GroceryList, items: &[GroceryItem]) -> Result<String> {
    to_json(&GroceryListView { list, items })
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|json| json + "\n")
        .context("serialising JSON output")
}

fn reminder_views<'a>(reminders: &[Reminder<'a>]) -> Vec<ReminderView<'a>> {
    reminders
        .iter()
        .map(|reminder| ReminderView {
            task: reminder.task,
            days_overdue: reminder.days_overdue,
        })
        .collect()
}

fn malformed_view(entry: &MalformedDueDate) -> MalformedView<'_> {
    MalformedView {
        task_id: entry.task_id.to_string(),
        raw: &entry.raw,
    }
}

pub fn agenda_text(groups: &TaskGroups<'_>, reminders: &[Reminder<'_>], show_ids: bool) -> String {
    if groups.is_empty() {
        return "Nothing planned. Add a task with `planner task add`.\n".to_string();
    }
    let mut out = String::new();
    if !reminders.is_empty() {
        out.push_str(&reminders_text(reminders, show_ids));
        out.push('\n');
    }
    for (key, tasks) in groups.iter() {
        let _ = writeln!(&mut out, "{}", groups.label(key));
        for task in tasks {
            let mut line = task_line(task, show_ids);
            if key == GroupKey::NoDueDate {
                if let DueDate::Malformed(raw) = task.due() {
                    let _ = write!(&mut line, "  (unreadable due date '{raw}')");
                }
            }
            let _ = writeln!(&mut out, "{line}");
        }
        out.push('\n');
    }
    if !groups.malformed.is_empty() {
        let count = groups.malformed.len();
        let _ = writeln!(
            &mut out,
            "warning: {count} task{} with an unreadable due date listed under No Due Date",
            if count == 1 { "" } else { "s" }
        );
    }
    out
}

pub fn reminders_text(reminders: &[Reminder<'_>], show_ids: bool) -> String {
    let mut out = String::from("Reminders\n");
    for reminder in reminders {
        let _ = writeln!(
            &mut out,
            "{}  ({}, {})",
            task_line(reminder.task, show_ids),
            reminder.describe(),
            short_date(reminder.due_date)
        );
    }
    out
}

pub fn task_list_text(heading: &str, tasks: &[&Task], show_ids: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(&mut out, "{heading}");
    for task in tasks {
        let _ = writeln!(&mut out, "{}{}", task_line(task, show_ids), due_suffix(task));
    }
    out
}

pub fn grocery_lists_text(lists: &[GroceryList], show_ids: bool) -> String {
    if lists.is_empty() {
        return "No grocery lists yet. Start one with `planner grocery new`.\n".to_string();
    }
    let mut out = String::from("Grocery lists\n");
    for list in lists {
        let id = if show_ids {
            format!("{}  ", crate::model::short_id(&list.id))
        } else {
            String::new()
        };
        let _ = writeln!(&mut out, "  {id}{}", list.name);
    }
    out
}

pub fn grocery_list_text(list: &GroceryList, items: &[GroceryItem], show_ids: bool) -> String {
    let checked = items.iter().filter(|item| item.is_checked).count();
    let mut out = String::new();
    let _ = writeln!(
        &mut out,
        "{} ({} item{}, {checked} checked)",
        list.name,
        items.len(),
        if items.len() == 1 { "" } else { "s" }
    );
    if items.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }
    for item in items {
        let _ = writeln!(&mut out, "{}", grocery_item_line(item, show_ids));
    }
    out
}

pub fn grocery_item_line(item: &GroceryItem, show_ids: bool) -> String {
    let mut line = format!("  {} ", checkbox(item.is_checked));
    if show_ids {
        let _ = write!(&mut line, "{}  ", crate::model::short_id(&item.id));
    }
    line.push_str(&item.content);
    if let Some(quantity) = &item.quantity {
        let _ = write!(&mut line, " ({quantity})");
    }
    line
}

fn task_line(task: &Task, show_ids: bool) -> String {
    let mut line = format!("  {} ", checkbox(task.is_done));
    if show_ids {
        let _ = write!(&mut line, "{}  ", task.short_id());
    }
    line.push_str(&task.content);
    line
}

/// `  (due Wed, Jan 10, 2024)` for dated tasks, empty otherwise.
pub fn due_suffix(task: &Task) -> String {
    match task.due() {
        DueDate::On(date) => format!("  (due {})", short_date(date)),
        DueDate::Malformed(raw) => format!("  (due '{raw}')"),
        DueDate::Absent => String::new(),
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}
