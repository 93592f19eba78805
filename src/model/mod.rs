use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use time::format_description::{self, FormatItem};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::PlannerError;

static DUE_DATE_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[year]-[month]-[day]").expect("valid date format description")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub content: String,
    pub is_done: bool,
    /// Stored verbatim so malformed values can be reported as-is.
    pub due_date: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Interpretation of a task's stored due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate<'a> {
    Absent,
    On(Date),
    Malformed(&'a str),
}

impl<'a> DueDate<'a> {
    pub fn date(&self) -> Option<Date> {
        match self {
            DueDate::On(date) => Some(*date),
            _ => None,
        }
    }
}

impl Task {
    pub fn due(&self) -> DueDate<'_> {
        match self.due_date.as_deref().map(str::trim) {
            None | Some("") => DueDate::Absent,
            Some(raw) => match parse_due_date(raw) {
                Some(date) => DueDate::On(date),
                None => DueDate::Malformed(raw),
            },
        }
    }

    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryList {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub content: String,
    pub quantity: Option<String>,
    pub is_checked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn parse_due_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), &*DUE_DATE_FORMAT).ok()
}

pub fn format_due_date(date: Date) -> String {
    date.format(&*DUE_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Validates user input for a due date. Blank input clears the date.
pub fn normalize_due_date(raw: Option<&str>) -> Result<Option<String>, PlannerError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    match parse_due_date(trimmed) {
        Some(date) => Ok(Some(format_due_date(date))),
        None => Err(PlannerError::InvalidDueDate {
            raw: trimmed.to_string(),
        }),
    }
}

pub fn normalize_quantity(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn task_with_due(due: Option<&str>) -> Task {
        Task {
            id: Uuid::new_v4(),
            content: "water the ferns".into(),
            is_done: false,
            due_date: due.map(str::to_owned),
            created_at: datetime!(2024-01-01 08:00 UTC),
        }
    }

    #[test]
    fn due_distinguishes_absent_valid_and_malformed() {
        assert_eq!(task_with_due(None).due(), DueDate::Absent);
        assert_eq!(task_with_due(Some("  ")).due(), DueDate::Absent);
        assert_eq!(
            task_with_due(Some("2024-02-29")).due(),
            DueDate::On(date!(2024 - 02 - 29))
        );
        assert_eq!(
            task_with_due(Some("2023-02-29")).due(),
            DueDate::Malformed("2023-02-29")
        );
        assert_eq!(
            task_with_due(Some("next tuesday")).due(),
            DueDate::Malformed("next tuesday")
        );
    }

    #[test]
    fn normalize_due_date_trims_and_rejects_garbage() {
        assert_eq!(normalize_due_date(None), Ok(None));
        assert_eq!(normalize_due_date(Some("")), Ok(None));
        assert_eq!(
            normalize_due_date(Some(" 2024-03-05 ")),
            Ok(Some("2024-03-05".to_string()))
        );
        assert_eq!(
            normalize_due_date(Some("2024-13-01")),
            Err(PlannerError::InvalidDueDate {
                raw: "2024-13-01".into()
            })
        );
    }

    #[test]
    fn normalize_quantity_drops_blank_values() {
        assert_eq!(normalize_quantity(Some("  2 kg ")), Some("2 kg".into()));
        assert_eq!(normalize_quantity(Some("   ")), None);
        assert_eq!(normalize_quantity(None), None);
    }

    #[test]
    fn short_id_is_eight_hex_chars() {
        let id = Uuid::parse_str("6f1c2a9e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(short_id(&id), "6f1c2a9e");
    }
}
