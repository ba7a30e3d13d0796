//! Pattern group operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{map_unique, DatabaseError, Result};
use crate::models::Group;

/// Create a group and link it to a rule in one transaction.
///
/// Fails with [`DatabaseError::AlreadyExists`] when the name is taken within
/// the account or when the rule already points at a group. Nothing is
/// written in either case.
pub async fn create_group_for_rule(
    pool: &SqlitePool,
    email_account_id: &str,
    name: &str,
    rule_id: &str,
) -> Result<Group> {
    let id = Uuid::new_v4().to_string();
    let mut tx = pool.begin().await?;

    let group = sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO groups (id, name, email_account_id)
        VALUES (?, ?, ?)
        RETURNING id, name, email_account_id, created_at
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(email_account_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique(e, "Group", name))?;

    let linked = sqlx::query(
        r#"
        UPDATE rules
        SET group_id = ?, updated_at = datetime('now')
        WHERE id = ? AND email_account_id = ? AND group_id IS NULL
        "#,
    )
    .bind(&group.id)
    .bind(rule_id)
    .bind(email_account_id)
    .execute(&mut *tx)
    .await?;

    if linked.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DatabaseError::AlreadyExists {
            entity: "Group link",
            id: rule_id.to_string(),
        });
    }

    tx.commit().await?;

    tracing::debug!(group_id = %group.id, rule_id, "Created group for rule");
    Ok(group)
}

/// Create a group that no rule points at yet.
pub async fn create_group(pool: &SqlitePool, email_account_id: &str, name: &str) -> Result<Group> {
    let group = sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO groups (id, name, email_account_id)
        VALUES (?, ?, ?)
        RETURNING id, name, email_account_id, created_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(email_account_id)
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique(e, "Group", name))?;

    Ok(group)
}

/// Get a group by ID.
pub async fn get_group(pool: &SqlitePool, id: &str) -> Result<Group> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT id, name, email_account_id, created_at
        FROM groups
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Group",
        id: id.to_string(),
    })
}

/// Get a group by its name within an email account.
pub async fn get_group_by_name(
    pool: &SqlitePool,
    email_account_id: &str,
    name: &str,
) -> Result<Option<Group>> {
    let group = sqlx::query_as::<_, Group>(
        r#"
        SELECT id, name, email_account_id, created_at
        FROM groups
        WHERE name = ? AND email_account_id = ?
        "#,
    )
    .bind(name)
    .bind(email_account_id)
    .fetch_optional(pool)
    .await?;

    Ok(group)
}

/// Count groups owned by an email account.
pub async fn count_groups(pool: &SqlitePool, email_account_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM groups WHERE email_account_id = ?
        "#,
    )
    .bind(email_account_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
