use once_cell::sync::Lazy;
use time::format_description::{self, FormatItem};
use time::Date;

use crate::planner::grouping::{GroupKey, NO_DUE_DATE};

static LONG_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse("[weekday], [month repr:long] [day padding:none], [year]")
        .expect("valid long date format description")
});

static SHORT_FORMAT: Lazy<Vec<FormatItem<'static>>> = Lazy::new(|| {
    format_description::parse(
        "[weekday repr:short], [month repr:short] [day padding:none], [year]",
    )
    .expect("valid short date format description")
});

/// Heading for an agenda group, relative to `reference_date` (UTC).
pub fn group_label(key: GroupKey, reference_date: Date) -> String {
    match key {
        GroupKey::NoDueDate => NO_DUE_DATE.to_string(),
        GroupKey::Date(date) => relative_label(date, reference_date)
            .map(str::to_owned)
            .unwrap_or_else(|| long_date(date)),
    }
}

pub fn relative_label(date: Date, reference_date: Date) -> Option<&'static str> {
    if date == reference_date {
        Some("Today")
    } else if Some(date) == reference_date.next_day() {
        Some("Tomorrow")
    } else if Some(date) == reference_date.previous_day() {
        Some("Yesterday")
    } else {
        None
    }
}

/// `Wednesday, January 10, 2024`
pub fn long_date(date: Date) -> String {
    date.format(&*LONG_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// `Wed, Jan 10, 2024`
pub fn short_date(date: Date) -> String {
    date.format(&*SHORT_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}
