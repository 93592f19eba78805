use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            content TEXT NOT NULL CHECK (length(trim(content)) > 0),
            is_done INTEGER NOT NULL DEFAULT 0,
            due_date TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS tasks_owner_created
            ON tasks (owner, created_at DESC);

        CREATE TABLE IF NOT EXISTS grocery_lists (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            name TEXT NOT NULL CHECK (length(trim(name)) > 0),
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS grocery_items (
            id TEXT PRIMARY KEY,
            list_id TEXT NOT NULL,
            owner TEXT NOT NULL,
            content TEXT NOT NULL CHECK (length(trim(content)) > 0),
            quantity TEXT,
            is_checked INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (list_id) REFERENCES grocery_lists(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS grocery_items_list_created
            ON grocery_items (list_id, created_at);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
