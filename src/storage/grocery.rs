use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    normalize_content, not_found, resolve_id, timestamp_column, timestamp_to_sql, uuid_column,
    StorageHandle,
};
use crate::error::{PlannerError, RecordKind};
use crate::model::{normalize_quantity, GroceryItem, GroceryList};

const LIST_COLUMNS: &str = "id, name, created_at";
const ITEM_COLUMNS: &str = "id, list_id, content, quantity, is_checked, created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroceryListDeleteOutcome {
    pub name: String,
    pub items_removed: usize,
}

impl StorageHandle {
    /// Grocery lists of the profile, newest first.
    pub fn fetch_grocery_lists(&self) -> Result<Vec<GroceryList>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {LIST_COLUMNS}
                 FROM grocery_lists
                 WHERE owner = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let lists = stmt
                .query_map(params![self.owner()], list_from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("fetching grocery lists")?;
            Ok(lists)
        })
    }

    pub fn create_grocery_list(&self, name: &str) -> Result<GroceryList> {
        let name = normalize_content(name, PlannerError::EmptyListName)?;
        let list = GroceryList {
            id: Uuid::new_v4(),
            name,
            created_at: OffsetDateTime::now_utc(),
        };
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO grocery_lists (id, owner, name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    list.id.to_string(),
                    self.owner(),
                    list.name,
                    timestamp_to_sql(list.created_at)?,
                ],
            )
            .context("inserting grocery list")?;
            Ok(())
        })?;
        tracing::info!(list_id = %list.id, name = %list.name, "created grocery list");
        Ok(list)
    }

    /// Deletes the list together with all of its items.
    pub fn delete_grocery_list(&self, list_id: Uuid) -> Result<GroceryListDeleteOutcome> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let name: String = tx
            .query_row(
                "SELECT name FROM grocery_lists WHERE id = ?1 AND owner = ?2",
                params![list_id.to_string(), self.owner()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(RecordKind::GroceryList, list_id))?;
        let items_removed = tx
            .execute(
                "DELETE FROM grocery_items WHERE list_id = ?1",
                params![list_id.to_string()],
            )
            .context("deleting grocery items")?;
        tx.execute(
            "DELETE FROM grocery_lists WHERE id = ?1",
            params![list_id.to_string()],
        )
        .context("deleting grocery list")?;
        tx.commit()?;
        tracing::info!(list_id = %list_id, items_removed, "deleted grocery list");
        Ok(GroceryListDeleteOutcome {
            name,
            items_removed,
        })
    }

    /// Looks a list up by exact name (case-insensitive) first, then by id prefix.
    pub fn resolve_grocery_list(&self, query: &str) -> Result<GroceryList> {
        let needle = query.trim();
        let mut by_name = self.with_connection(|conn| {
            let sql = format!(
                "SELECT {LIST_COLUMNS}
                 FROM grocery_lists
                 WHERE owner = ?1 AND name = ?2 COLLATE NOCASE
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let lists = stmt
                .query_map(params![self.owner(), needle], list_from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("looking up grocery list by name")?;
            Ok(lists)
        })?;
        match by_name.len() {
            1 => return Ok(by_name.remove(0)),
            0 => {}
            matches => {
                return Err(PlannerError::AmbiguousId {
                    kind: RecordKind::GroceryList,
                    prefix: needle.to_string(),
                    matches,
                }
                .into())
            }
        }

        self.with_connection(|conn| {
            let list_id = resolve_id(conn, RecordKind::GroceryList, self.owner(), needle)?;
            fetch_list_with(conn, self.owner(), list_id)?
                .ok_or_else(|| not_found(RecordKind::GroceryList, list_id))
        })
    }

    /// Items of one list, oldest first.
    pub fn fetch_grocery_items(&self, list_id: Uuid) -> Result<Vec<GroceryItem>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {ITEM_COLUMNS}
                 FROM grocery_items
                 WHERE owner = ?1 AND list_id = ?2
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params![self.owner(), list_id.to_string()], item_from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("fetching grocery items")?;
            Ok(items)
        })
    }

    pub fn add_grocery_item(
        &self,
        list_id: Uuid,
        content: &str,
        quantity: Option<&str>,
    ) -> Result<GroceryItem> {
        let content = normalize_content(content, PlannerError::EmptyItemContent)?;
        let item = GroceryItem {
            id: Uuid::new_v4(),
            list_id,
            content,
            quantity: normalize_quantity(quantity),
            is_checked: false,
            created_at: OffsetDateTime::now_utc(),
        };
        self.with_connection(|conn| {
            if fetch_list_with(conn, self.owner(), list_id)?.is_none() {
                return Err(not_found(RecordKind::GroceryList, list_id));
            }
            conn.execute(
                "INSERT INTO grocery_items (id, list_id, owner, content, quantity, is_checked, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    item.id.to_string(),
                    list_id.to_string(),
                    self.owner(),
                    item.content,
                    item.quantity,
                    timestamp_to_sql(item.created_at)?,
                ],
            )
            .context("inserting grocery item")?;
            Ok(())
        })?;
        tracing::info!(item_id = %item.id, list_id = %list_id, "added grocery item");
        Ok(item)
    }

    pub fn toggle_grocery_item(&self, item_id: Uuid) -> Result<GroceryItem> {
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE grocery_items SET is_checked = 1 - is_checked
                     WHERE id = ?1 AND owner = ?2",
                    params![item_id.to_string(), self.owner()],
                )
                .context("toggling grocery item")?;
            if updated == 0 {
                return Err(not_found(RecordKind::GroceryItem, item_id));
            }
            fetch_item_with(conn, self.owner(), item_id)?
                .ok_or_else(|| not_found(RecordKind::GroceryItem, item_id))
        })
    }

    /// Replaces content and quantity; a blank or missing quantity clears it.
    pub fn edit_grocery_item(
        &self,
        item_id: Uuid,
        content: &str,
        quantity: Option<&str>,
    ) -> Result<GroceryItem> {
        let content = normalize_content(content, PlannerError::EmptyItemContent)?;
        let quantity = normalize_quantity(quantity);
        self.with_connection(|conn| {
            let updated = conn
                .execute(
                    "UPDATE grocery_items SET content = ?1, quantity = ?2
                     WHERE id = ?3 AND owner = ?4",
                    params![content, quantity, item_id.to_string(), self.owner()],
                )
                .context("updating grocery item")?;
            if updated == 0 {
                return Err(not_found(RecordKind::GroceryItem, item_id));
            }
            fetch_item_with(conn, self.owner(), item_id)?
                .ok_or_else(|| not_found(RecordKind::GroceryItem, item_id))
        })
    }

    pub fn delete_grocery_item(&self, item_id: Uuid) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM grocery_items WHERE id = ?1 AND owner = ?2",
                    params![item_id.to_string(), self.owner()],
                )
                .context("deleting grocery item")?;
            if deleted == 0 {
                return Err(not_found(RecordKind::GroceryItem, item_id));
            }
            Ok(())
        })
    }

    pub fn fetch_grocery_item(&self, item_id: Uuid) -> Result<Option<GroceryItem>> {
        self.with_connection(|conn| fetch_item_with(conn, self.owner(), item_id))
    }

    pub fn resolve_grocery_item_id(&self, prefix: &str) -> Result<Uuid> {
        self.with_connection(|conn| {
            resolve_id(conn, RecordKind::GroceryItem, self.owner(), prefix)
        })
    }
}

fn fetch_list_with(conn: &Connection, owner: &str, list_id: Uuid) -> Result<Option<GroceryList>> {
    let sql = format!("SELECT {LIST_COLUMNS} FROM grocery_lists WHERE id = ?1 AND owner = ?2");
    let list = conn
        .query_row(&sql, params![list_id.to_string(), owner], list_from_row)
        .optional()
        .context("fetching grocery list")?;
    Ok(list)
}

fn fetch_item_with(conn: &Connection, owner: &str, item_id: Uuid) -> Result<Option<GroceryItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM grocery_items WHERE id = ?1 AND owner = ?2");
    let item = conn
        .query_row(&sql, params![item_id.to_string(), owner], item_from_row)
        .optional()
        .context("fetching grocery item")?;
    Ok(item)
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<GroceryList> {
    Ok(GroceryList {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<GroceryItem> {
    Ok(GroceryItem {
        id: uuid_column(row, 0)?,
        list_id: uuid_column(row, 1)?,
        content: row.get(2)?,
        quantity: row.get(3)?,
        is_checked: row.get::<_, i64>(4)? != 0,
        created_at: timestamp_column(row, 5)?,
    })
}
