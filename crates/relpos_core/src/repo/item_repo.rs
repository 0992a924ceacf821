//! Position store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist orderable items and their nullable positions.
//! - Answer the scoped aggregate lookups used by the placement engine.
//! - Keep renumbering (rebalance, bulk placement) inside one transaction.
//!
//! # Invariants
//! - Write paths validate positions before SQL mutations.
//! - Listing is deterministic: placed items by `position ASC, item_uuid ASC`,
//!   then unplaced items by `item_uuid ASC`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::item::{
    validate_position, ContainerId, ItemId, ItemValidationError, OrderableItem,
};
use crate::positioning::query::PositionQuery;
use crate::positioning::{MAX_POSITION, MIN_POSITION, START_POSITION};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    item_uuid,
    container_uuid,
    position
FROM orderable_items";

const ITEM_COLUMNS: [&str; 5] = [
    "item_uuid",
    "container_uuid",
    "position",
    "created_at",
    "updated_at",
];

pub type ItemRepoResult<T> = Result<T, ItemRepoError>;

/// Errors from position store operations.
#[derive(Debug)]
pub enum ItemRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Item failed validation before a write.
    Validation(ItemValidationError),
    /// Target item does not exist.
    NotFound(ItemId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid item.
    InvalidData(String),
}

impl Display for ItemRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "orderable item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "position store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "position store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "position store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for ItemRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ItemRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ItemRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ItemValidationError> for ItemRepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for the position store.
pub trait ItemRepository: PositionQuery {
    /// Inserts one item as-is (placed or unplaced).
    fn insert_item(&self, item: &OrderableItem) -> ItemRepoResult<()>;
    /// Loads one item by id.
    fn get_item(&self, id: ItemId) -> ItemRepoResult<Option<OrderableItem>>;
    /// Lists every item of one container in display order.
    fn list_items(&self, container_id: ContainerId) -> ItemRepoResult<Vec<OrderableItem>>;
    /// Writes one item's position.
    fn update_position(&self, id: ItemId, position: Option<f64>) -> ItemRepoResult<()>;
    /// Writes several positions atomically.
    fn update_positions(&self, updates: &[(ItemId, f64)]) -> ItemRepoResult<()>;
    /// Renumbers every placed item of a container `spacing` apart, centred on
    /// `START_POSITION`, keeping the current order. Returns the count.
    fn rebalance(&self, container_id: ContainerId, spacing: f64) -> ItemRepoResult<usize>;
    /// Removes one item.
    fn delete_item(&self, id: ItemId) -> ItemRepoResult<()>;
}

/// SQLite-backed position store.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ItemRepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PositionQuery for SqliteItemRepository<'_> {
    fn min_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>> {
        let value = self.conn.query_row(
            "SELECT MIN(position)
             FROM orderable_items
             WHERE container_uuid = ?1;",
            [container_id.to_string()],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(value)
    }

    fn max_position(&self, container_id: ContainerId) -> ItemRepoResult<Option<f64>> {
        let value = self.conn.query_row(
            "SELECT MAX(position)
             FROM orderable_items
             WHERE container_uuid = ?1;",
            [container_id.to_string()],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(value)
    }

    fn prev_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64> {
        let value = self.conn.query_row(
            "SELECT MAX(position)
             FROM orderable_items
             WHERE container_uuid = ?1
               AND position < ?2;",
            params![container_id.to_string(), position],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(value.unwrap_or(MIN_POSITION))
    }

    fn next_position(&self, container_id: ContainerId, position: f64) -> ItemRepoResult<f64> {
        let value = self.conn.query_row(
            "SELECT MIN(position)
             FROM orderable_items
             WHERE container_uuid = ?1
               AND position > ?2;",
            params![container_id.to_string(), position],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(value.unwrap_or(MAX_POSITION))
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_item(&self, item: &OrderableItem) -> ItemRepoResult<()> {
        item.validate()?;
        self.conn.execute(
            "INSERT INTO orderable_items (item_uuid, container_uuid, position)
             VALUES (?1, ?2, ?3);",
            params![
                item.id.to_string(),
                item.container_id.to_string(),
                item.position,
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> ItemRepoResult<Option<OrderableItem>> {
        let item = self
            .conn
            .query_row(
                &format!("{ITEM_SELECT_SQL} WHERE item_uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_item_row(row)),
            )
            .optional()?;
        item.transpose()
    }

    fn list_items(&self, container_id: ContainerId) -> ItemRepoResult<Vec<OrderableItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE container_uuid = ?1
             ORDER BY position IS NULL ASC, position ASC, item_uuid ASC;"
        ))?;
        let mut rows = stmt.query([container_id.to_string()])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn update_position(&self, id: ItemId, position: Option<f64>) -> ItemRepoResult<()> {
        if let Some(position) = position {
            validate_position(position)?;
        }
        write_position(self.conn, id, position)
    }

    fn update_positions(&self, updates: &[(ItemId, f64)]) -> ItemRepoResult<()> {
        for (_, position) in updates {
            validate_position(*position)?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (id, position) in updates {
            write_position(&tx, *id, Some(*position))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn rebalance(&self, container_id: ContainerId, spacing: f64) -> ItemRepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let ids = list_placed_ids(&tx, container_id)?;

        let centre_offset = (ids.len() as f64 - 1.0) / 2.0;
        for (index, id) in ids.iter().enumerate() {
            let position = START_POSITION + (index as f64 - centre_offset) * spacing;
            validate_position(position)?;
            write_position(&tx, *id, Some(position))?;
        }

        tx.commit()?;
        Ok(ids.len())
    }

    fn delete_item(&self, id: ItemId) -> ItemRepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM orderable_items WHERE item_uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(ItemRepoError::NotFound(id));
        }
        Ok(())
    }
}

fn write_position(conn: &Connection, id: ItemId, position: Option<f64>) -> ItemRepoResult<()> {
    let changed = conn.execute(
        "UPDATE orderable_items
         SET position = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE item_uuid = ?1;",
        params![id.to_string(), position],
    )?;
    if changed == 0 {
        return Err(ItemRepoError::NotFound(id));
    }
    Ok(())
}

fn list_placed_ids(conn: &Connection, container_id: ContainerId) -> ItemRepoResult<Vec<ItemId>> {
    let mut stmt = conn.prepare(
        "SELECT item_uuid
         FROM orderable_items
         WHERE container_uuid = ?1
           AND position IS NOT NULL
         ORDER BY position ASC, item_uuid ASC;",
    )?;
    let mut rows = stmt.query([container_id.to_string()])?;

    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "orderable_items.item_uuid")?);
    }
    Ok(ids)
}

fn parse_item_row(row: &Row<'_>) -> ItemRepoResult<OrderableItem> {
    let id_text: String = row.get("item_uuid")?;
    let container_text: String = row.get("container_uuid")?;

    let item = OrderableItem {
        id: parse_uuid(&id_text, "orderable_items.item_uuid")?,
        container_id: parse_uuid(&container_text, "orderable_items.container_uuid")?,
        position: row.get("position")?,
    };
    item.validate().map_err(|err| {
        ItemRepoError::InvalidData(format!("{err} in orderable_items.position"))
    })?;
    Ok(item)
}

fn parse_uuid(value: &str, column: &'static str) -> ItemRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ItemRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> ItemRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ItemRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "orderable_items")? {
        return Err(ItemRepoError::MissingRequiredTable("orderable_items"));
    }
    for column in ITEM_COLUMNS {
        if !table_has_column(conn, "orderable_items", column)? {
            return Err(ItemRepoError::MissingRequiredColumn {
                table: "orderable_items",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> ItemRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> ItemRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
