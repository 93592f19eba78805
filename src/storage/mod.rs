use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::{ConfigPaths, StorageOptions};
use crate::error::{PlannerError, RecordKind};
use crate::model::{normalize_due_date, Task};

mod grocery;
mod schema;

pub use grocery::GroceryListDeleteOutcome;

const TASK_COLUMNS: &str = "id, content, is_done, due_date, created_at";

/// Cheap, cloneable access to the planner database for a single profile.
///
/// Every query is scoped to `owner`; rows belonging to other profiles are
/// invisible, including to id lookups.
#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
    owner: Arc<str>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Same database, different profile.
    pub fn for_owner(&self, owner: &str) -> Self {
        Self {
            db_path: Arc::clone(&self.db_path),
            options: Arc::clone(&self.options),
            owner: Arc::from(owner),
        }
    }

    /// All tasks of the profile, newest first.
    pub fn fetch_tasks(&self) -> Result<Vec<Task>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {TASK_COLUMNS}
                 FROM tasks
                 WHERE owner = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params![&*self.owner], task_from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("fetching tasks")?;
            tracing::debug!(count = tasks.len(), "fetched tasks");
            Ok(tasks)
        })
    }

    pub fn fetch_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        self.with_connection(|conn| fetch_task_with(conn, &self.owner, task_id))
    }

    pub fn create_task(&self, content: &str, due_date: Option<&str>) -> Result<Task> {
        let content = normalize_content(content, PlannerError::EmptyContent)?;
        let due_date = normalize_due_date(due_date)?;
        let task = Task {
            id: Uuid::new_v4(),
            content,
            is_done: false,
            due_date,
            created_at: OffsetDateTime::now_utc(),
        };
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, owner, content, is_done, due_date, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                params![
                    task.id.to_string(),
                    &*self.owner,
                    task.content,
                    task.due_date,
                    timestamp_to_sql(task.created_at)?,
                ],
            )
            .context("inserting task")?;
            Ok(())
        })?;
        tracing::info!(task_id = %task.id, due = ?task.due_date, "created task");
        Ok(task)
    }

    /// Flips `is_done`, leaving every other field untouched.
    pub fn toggle_task(&self, task_id: Uuid) -> Result<Task> {
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE tasks SET is_done = 1 - is_done WHERE id = ?1 AND owner = ?2",
                    params![task_id.to_string(), &*self.owner],
                )
                .context("toggling task")?;
            if updated == 0 {
                return Err(not_found(RecordKind::Task, task_id));
            }
            let task = fetch_task_with(conn, &self.owner, task_id)?
                .ok_or_else(|| not_found(RecordKind::Task, task_id))?;
            tracing::info!(task_id = %task.id, is_done = task.is_done, "toggled task");
            Ok(task)
        })
    }

    /// Replaces content and due date; `None` clears the due date.
    ///
    /// A due date equal to the stored one is written back verbatim, so a task
    /// holding an unreadable date can still be renamed.
    pub fn edit_task(&self, task_id: Uuid, content: &str, due_date: Option<&str>) -> Result<Task> {
        let content = normalize_content(content, PlannerError::EmptyContent)?;
        self.with_connection(|conn| {
            let current = fetch_task_with(conn, &self.owner, task_id)?
                .ok_or_else(|| not_found(RecordKind::Task, task_id))?;
            let due_date = match due_date {
                Some(raw) if current.due_date.as_deref() == Some(raw) => Some(raw.to_string()),
                other => normalize_due_date(other)?,
            };
            let updated = conn
                .execute(
                    "UPDATE tasks SET content = ?1, due_date = ?2 WHERE id = ?3 AND owner = ?4",
                    params![content, due_date, task_id.to_string(), &*self.owner],
                )
                .context("updating task")?;
            if updated == 0 {
                return Err(not_found(RecordKind::Task, task_id));
            }
            let task = fetch_task_with(conn, &self.owner, task_id)?
                .ok_or_else(|| not_found(RecordKind::Task, task_id))?;
            tracing::info!(task_id = %task.id, "edited task");
            Ok(task)
        })
    }

    pub fn delete_task(&self, task_id: Uuid) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM tasks WHERE id = ?1 AND owner = ?2",
                    params![task_id.to_string(), &*self.owner],
                )
                .context("deleting task")?;
            if deleted == 0 {
                return Err(not_found(RecordKind::Task, task_id));
            }
            tracing::info!(task_id = %task_id, "deleted task");
            Ok(())
        })
    }

    /// Resolves a full id or any unique prefix of it (hyphens optional).
    pub fn resolve_task_id(&self, prefix: &str) -> Result<Uuid> {
        self.with_connection(|conn| resolve_id(conn, RecordKind::Task, &self.owner, prefix))
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions, owner: &str) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    tracing::debug!(path = %db_path.display(), owner, "storage ready");
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
        owner: Arc::from(owner),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)
        .context("enabling foreign keys")?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn fetch_task_with(conn: &Connection, owner: &str, task_id: Uuid) -> Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner = ?2");
    let task = conn
        .query_row(&sql, params![task_id.to_string(), owner], task_from_row)
        .optional()
        .context("fetching task")?;
    Ok(task)
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: uuid_column(row, 0)?,
        content: row.get(1)?,
        is_done: row.get::<_, i64>(2)? != 0,
        due_date: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn normalize_content(raw: &str, empty: PlannerError) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty.into());
    }
    Ok(trimmed.to_string())
}

fn not_found(kind: RecordKind, id: Uuid) -> anyhow::Error {
    PlannerError::NotFound {
        kind,
        id: id.to_string(),
    }
    .into()
}

fn resolve_id(conn: &Connection, kind: RecordKind, owner: &str, prefix: &str) -> Result<Uuid> {
    let table = match kind {
        RecordKind::Task => "tasks",
        RecordKind::GroceryList => "grocery_lists",
        RecordKind::GroceryItem => "grocery_items",
    };
    let needle: String = prefix
        .trim()
        .chars()
        .filter(|ch| *ch != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if needle.is_empty() || !needle.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(PlannerError::NotFound {
            kind,
            id: prefix.to_string(),
        }
        .into());
    }

    let sql = format!(
        "SELECT id FROM {table}
         WHERE owner = ?1 AND replace(id, '-', '') LIKE ?2 || '%'"
    );
    let mut stmt = conn.prepare(&sql)?;
    let matches = stmt
        .query_map(params![owner, needle], |row| uuid_column(row, 0))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("resolving {kind} id '{prefix}'"))?;
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(PlannerError::NotFound {
            kind,
            id: prefix.to_string(),
        }
        .into()),
        _ => Err(PlannerError::AmbiguousId {
            kind,
            prefix: prefix.to_string(),
            matches: matches.len(),
        }
        .into()),
    }
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let nanos: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(err)))
}

/// Nanoseconds since the epoch, so rapid inserts still order by creation.
fn timestamp_to_sql(at: OffsetDateTime) -> Result<i64> {
    i64::try_from(at.unix_timestamp_nanos()).context("timestamp out of range for storage")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    pub(crate) fn temp_paths(root: &TempDir) -> ConfigPaths {
        let config_dir = root.path().join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            root.path().join("data"),
        )
    }

    pub(crate) fn init_storage() -> Result<(TempDir, StorageHandle)> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        let mut options = StorageOptions::default();
        options.database_path = paths.database_path.clone();
        let storage = init(&paths, &options, "default")?;
        Ok((temp, storage))
    }

    fn planner_error(err: &anyhow::Error) -> Option<&PlannerError> {
        err.downcast_ref::<PlannerError>()
    }

    #[test]
    fn create_task_trims_content_and_starts_open() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("  buy stamps  ", Some("2024-05-01"))?;
        assert_eq!(task.content, "buy stamps");
        assert!(!task.is_done);
        assert_eq!(task.due_date.as_deref(), Some("2024-05-01"));

        let loaded = storage.fetch_task(task.id)?.expect("task persisted");
        assert_eq!(loaded, task);
        Ok(())
    }

    #[test]
    fn create_task_rejects_blank_content_and_bad_dates() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let err = storage.create_task("   ", None).unwrap_err();
        assert_matches!(planner_error(&err), Some(PlannerError::EmptyContent));

        let err = storage.create_task("pay rent", Some("31/01/2024")).unwrap_err();
        assert_matches!(
            planner_error(&err),
            Some(PlannerError::InvalidDueDate { raw }) if raw == "31/01/2024"
        );
        assert!(storage.fetch_tasks()?.is_empty());
        Ok(())
    }

    #[test]
    fn fetch_tasks_lists_newest_first() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.create_task("first", None)?;
        storage.create_task("second", None)?;
        storage.create_task("third", None)?;

        let contents: Vec<String> = storage
            .fetch_tasks()?
            .into_iter()
            .map(|task| task.content)
            .collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
        Ok(())
    }

    #[test]
    fn toggle_flips_only_completion() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("sweep", Some("2024-02-02"))?;

        let done = storage.toggle_task(task.id)?;
        assert!(done.is_done);
        assert_eq!(done.content, task.content);
        assert_eq!(done.due_date, task.due_date);
        assert_eq!(done.created_at, task.created_at);

        let reopened = storage.toggle_task(task.id)?;
        assert!(!reopened.is_done);
        Ok(())
    }

    #[test]
    fn edit_keeps_identity_and_can_clear_due_date() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("draft", Some("2024-02-02"))?;

        let edited = storage.edit_task(task.id, " final ", None)?;
        assert_eq!(edited.id, task.id);
        assert_eq!(edited.created_at, task.created_at);
        assert_eq!(edited.content, "final");
        assert_eq!(edited.due_date, None);

        let err = storage.edit_task(task.id, "", None).unwrap_err();
        assert_matches!(planner_error(&err), Some(PlannerError::EmptyContent));
        Ok(())
    }

    #[test]
    fn edit_keeps_an_unreadable_stored_due_date() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("mystery", Some("2024-02-02"))?;
        storage.with_connection(|conn| {
            conn.execute(
                "UPDATE tasks SET due_date = 'garbage' WHERE id = ?1",
                params![task.id.to_string()],
            )?;
            Ok(())
        })?;

        let renamed = storage.edit_task(task.id, "renamed", Some("garbage"))?;
        assert_eq!(renamed.content, "renamed");
        assert_eq!(renamed.due_date.as_deref(), Some("garbage"));

        let err = storage.edit_task(task.id, "renamed", Some("later")).unwrap_err();
        assert_matches!(
            planner_error(&err),
            Some(PlannerError::InvalidDueDate { raw }) if raw == "later"
        );
        Ok(())
    }

    #[test]
    fn delete_removes_task_and_reports_missing() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("temporary", None)?;
        storage.delete_task(task.id)?;
        assert!(storage.fetch_task(task.id)?.is_none());

        let err = storage.delete_task(task.id).unwrap_err();
        assert_matches!(
            planner_error(&err),
            Some(PlannerError::NotFound {
                kind: RecordKind::Task,
                ..
            })
        );
        Ok(())
    }

    #[test]
    fn profiles_do_not_see_each_other() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let mine = storage.create_task("mine", None)?;
        let other = storage.for_owner("guest");
        other.create_task("theirs", None)?;

        assert_eq!(storage.fetch_tasks()?.len(), 1);
        assert_eq!(other.fetch_tasks()?.len(), 1);
        assert!(other.fetch_task(mine.id)?.is_none());
        assert!(other.toggle_task(mine.id).is_err());
        assert!(other.delete_task(mine.id).is_err());
        assert!(storage.fetch_task(mine.id)?.is_some());
        Ok(())
    }

    #[test]
    fn resolve_task_id_accepts_unique_prefixes() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        let task = storage.create_task("findable", None)?;

        let full = task.id.to_string();
        assert_eq!(storage.resolve_task_id(&full)?, task.id);
        assert_eq!(storage.resolve_task_id(&task.short_id())?, task.id);
        assert_eq!(
            storage.resolve_task_id(&task.short_id().to_uppercase())?,
            task.id
        );

        let err = storage.resolve_task_id("zz-not-hex").unwrap_err();
        assert_matches!(planner_error(&err), Some(PlannerError::NotFound { .. }));
        Ok(())
    }

    #[test]
    fn resolve_task_id_flags_ambiguous_prefixes() -> Result<()> {
        let (_temp, storage) = init_storage()?;
        storage.with_connection(|conn| {
            for id in [
                "abcd0000-0000-4000-8000-000000000001",
                "abcd0000-0000-4000-8000-000000000002",
            ] {
                conn.execute(
                    "INSERT INTO tasks (id, owner, content, is_done, due_date, created_at)
                     VALUES (?1, 'default', 'twin', 0, NULL, 0)",
                    params![id],
                )?;
            }
            Ok(())
        })?;

        let err = storage.resolve_task_id("abcd").unwrap_err();
        assert_matches!(
            planner_error(&err),
            Some(PlannerError::AmbiguousId { matches: 2, .. })
        );
        let second = storage.resolve_task_id("abcd0000000040008000000000000002")?;
        assert_eq!(second.to_string(), "abcd0000-0000-4000-8000-000000000002");
        Ok(())
    }
}
