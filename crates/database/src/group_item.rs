//! Group item (pattern) persistence.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{GroupItem, GroupItemSource, GroupItemType};
use crate::Result;

/// Fields written by [`upsert_group_item`].
///
/// Optional provenance fields left as `None` keep whatever value the row
/// already has; they never clear it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupItemUpsert<'a> {
    pub group_id: &'a str,
    pub kind: GroupItemType,
    pub value: &'a str,
    pub exclude: bool,
    pub reason: Option<&'a str>,
    pub source: Option<GroupItemSource>,
    pub message_id: Option<&'a str>,
    pub thread_id: Option<&'a str>,
}

impl<'a> GroupItemUpsert<'a> {
    /// A bare pattern with no provenance.
    pub fn new(group_id: &'a str, kind: GroupItemType, value: &'a str) -> Self {
        Self {
            group_id,
            kind,
            value,
            exclude: false,
            reason: None,
            source: None,
            message_id: None,
            thread_id: None,
        }
    }
}

/// Create or update the item keyed by `(group_id, type, value)`.
///
/// Last writer wins on `exclude`.
pub async fn upsert_group_item(pool: &SqlitePool, item: &GroupItemUpsert<'_>) -> Result<GroupItem> {
    let row = sqlx::query_as::<_, GroupItem>(
        r#"
        INSERT INTO group_items
            (id, group_id, type, value, exclude, reason, source, message_id, thread_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(group_id, type, value) DO UPDATE SET
            exclude = excluded.exclude,
            reason = COALESCE(excluded.reason, group_items.reason),
            source = COALESCE(excluded.source, group_items.source),
            message_id = COALESCE(excluded.message_id, group_items.message_id),
            thread_id = COALESCE(excluded.thread_id, group_items.thread_id),
            updated_at = datetime('now')
        RETURNING id, group_id, type, value, exclude, reason, source, message_id,
                  thread_id, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(item.group_id)
    .bind(item.kind)
    .bind(item.value)
    .bind(item.exclude)
    .bind(item.reason)
    .bind(item.source)
    .bind(item.message_id)
    .bind(item.thread_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Get one item by its natural key.
pub async fn get_group_item(
    pool: &SqlitePool,
    group_id: &str,
    kind: GroupItemType,
    value: &str,
) -> Result<Option<GroupItem>> {
    let row = sqlx::query_as::<_, GroupItem>(
        r#"
        SELECT id, group_id, type, value, exclude, reason, source, message_id,
               thread_id, created_at, updated_at
        FROM group_items
        WHERE group_id = ? AND type = ? AND value = ?
        "#,
    )
    .bind(group_id)
    .bind(kind)
    .bind(value)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List the items of a group in creation order.
pub async fn list_group_items(pool: &SqlitePool, group_id: &str) -> Result<Vec<GroupItem>> {
    let rows = sqlx::query_as::<_, GroupItem>(
        r#"
        SELECT id, group_id, type, value, exclude, reason, source, message_id,
               thread_id, created_at, updated_at
        FROM group_items
        WHERE group_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete the items matching `(group_id, type, value)`.
pub async fn delete_group_items(
    pool: &SqlitePool,
    group_id: &str,
    kind: GroupItemType,
    value: &str,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM group_items
        WHERE group_id = ? AND type = ? AND value = ?
        "#,
    )
    .bind(group_id)
    .bind(kind)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Count the items of a group.
pub async fn count_group_items(pool: &SqlitePool, group_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM group_items WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
