//! Repository for the `items` table.

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio_postgres::Row;
use tracing::warn;

use crate::db::PgPool;
use crate::error::DbError;

const LIST_ITEMS: &str = "SELECT id, name, created_at FROM items ORDER BY id DESC";
const INSERT_ITEM: &str = "INSERT INTO items(name) VALUES ($1) RETURNING id";

/// One row of the `items` table.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    /// Unique id assigned by the database; never reused.
    pub id: i32,
    /// Item name.
    pub name: String,
    /// Insert timestamp, serialized as ISO-8601.
    pub created_at: NaiveDateTime,
}

impl Item {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get(0)?,
            name: row.try_get(1)?,
            created_at: row.try_get(2)?,
        })
    }
}

/// Item repository over the connection pool.
///
/// Each operation leases one connection for one statement. A failure that
/// looks connection-level invalidates the lease and is retried exactly once
/// on a fresh connection.
#[derive(Clone)]
pub struct ItemStore {
    pool: PgPool,
}

impl ItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All items, newest first. The descending-id order is part of the API
    /// contract.
    pub async fn list(&self) -> Result<Vec<Item>, DbError> {
        let mut retried = false;
        loop {
            let mut conn = self.pool.acquire().await?;
            match conn.query(LIST_ITEMS, &[]).await {
                Ok(rows) => {
                    return rows
                        .iter()
                        .map(Item::from_row)
                        .collect::<Result<_, _>>()
                        .map_err(DbError::Query);
                }
                Err(e) if !retried && is_connection_error(&e) => {
                    warn!("list failed on a broken connection, retrying once: {e}");
                    conn.invalidate();
                    retried = true;
                }
                Err(e) => return Err(DbError::Query(e)),
            }
        }
    }

    /// Insert one item and return its assigned id. The single INSERT
    /// auto-commits, so the row is durable before the lease ends.
    pub async fn insert(&self, name: &str) -> Result<i32, DbError> {
        let mut retried = false;
        loop {
            let mut conn = self.pool.acquire().await?;
            match conn.query_one(INSERT_ITEM, &[&name]).await {
                Ok(row) => return row.try_get(0).map_err(DbError::Query),
                Err(e) if !retried && is_connection_error(&e) => {
                    warn!("insert failed on a broken connection, retrying once: {e}");
                    conn.invalidate();
                    retried = true;
                }
                Err(e) => return Err(DbError::Query(e)),
            }
        }
    }
}

/// Errors without a server-reported counterpart are transport-level; those
/// and closed-client errors qualify for the one transparent retry.
fn is_connection_error(e: &tokio_postgres::Error) -> bool {
    e.is_closed() || e.as_db_error().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn item_serializes_created_at_as_iso8601() {
        let item = Item {
            id: 1,
            name: "widget".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .expect("valid date")
                .and_hms_opt(10, 30, 0)
                .expect("valid time"),
        };

        let value = serde_json::to_value(&item).expect("serialize");
        assert_eq!(value["created_at"], "2024-05-17T10:30:00");
        assert_eq!(value["id"], 1);
        assert_eq!(value["name"], "widget");
    }
}
