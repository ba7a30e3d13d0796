//! Rule operations.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{map_unique, DatabaseError, Result};
use crate::models::Rule;

/// Create a new rule for an email account.
pub async fn create_rule(pool: &SqlitePool, email_account_id: &str, name: &str) -> Result<Rule> {
    let rule = Rule {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email_account_id: email_account_id.to_string(),
        group_id: None,
    };

    sqlx::query(
        r#"
        INSERT INTO rules (id, name, email_account_id)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&rule.id)
    .bind(&rule.name)
    .bind(&rule.email_account_id)
    .execute(pool)
    .await
    .map_err(|e| map_unique(e, "Rule", name))?;

    Ok(rule)
}

/// Get a rule by ID, scoped to its email account.
pub async fn get_rule(pool: &SqlitePool, email_account_id: &str, id: &str) -> Result<Option<Rule>> {
    let rule = sqlx::query_as::<_, Rule>(
        r#"
        SELECT id, name, email_account_id, group_id
        FROM rules
        WHERE id = ? AND email_account_id = ?
        "#,
    )
    .bind(id)
    .bind(email_account_id)
    .fetch_optional(pool)
    .await?;

    Ok(rule)
}

/// Get a rule by its name within an email account.
pub async fn get_rule_by_name(
    pool: &SqlitePool,
    email_account_id: &str,
    name: &str,
) -> Result<Option<Rule>> {
    let rule = sqlx::query_as::<_, Rule>(
        r#"
        SELECT id, name, email_account_id, group_id
        FROM rules
        WHERE name = ? AND email_account_id = ?
        "#,
    )
    .bind(name)
    .bind(email_account_id)
    .fetch_optional(pool)
    .await?;

    Ok(rule)
}

/// Re-read the group a rule currently points at.
pub async fn get_rule_group_id(
    pool: &SqlitePool,
    email_account_id: &str,
    rule_id: &str,
) -> Result<Option<String>> {
    let group_id = sqlx::query_scalar::<_, Option<String>>(
        r#"
        SELECT group_id
        FROM rules
        WHERE id = ? AND email_account_id = ?
        "#,
    )
    .bind(rule_id)
    .bind(email_account_id)
    .fetch_optional(pool)
    .await?;

    Ok(group_id.flatten())
}

/// Find the rule that owns a group, if any.
pub async fn find_rule_by_group(pool: &SqlitePool, group_id: &str) -> Result<Option<Rule>> {
    let rule = sqlx::query_as::<_, Rule>(
        r#"
        SELECT id, name, email_account_id, group_id
        FROM rules
        WHERE group_id = ?
        "#,
    )
    .bind(group_id)
    .fetch_optional(pool)
    .await?;

    Ok(rule)
}

/// Point a rule at a group, but only while the rule has none.
///
/// Returns [`DatabaseError::AlreadyExists`] when the rule is already linked
/// or the group belongs to another rule.
pub async fn link_group(
    pool: &SqlitePool,
    email_account_id: &str,
    rule_id: &str,
    group_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE rules
        SET group_id = ?, updated_at = datetime('now')
        WHERE id = ? AND email_account_id = ? AND group_id IS NULL
        "#,
    )
    .bind(group_id)
    .bind(rule_id)
    .bind(email_account_id)
    .execute(pool)
    .await
    .map_err(|e| map_unique(e, "Group link", group_id))?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::AlreadyExists {
            entity: "Group link",
            id: rule_id.to_string(),
        });
    }

    Ok(())
}

/// List all rules of an email account.
pub async fn list_rules(pool: &SqlitePool, email_account_id: &str) -> Result<Vec<Rule>> {
    let rules = sqlx::query_as::<_, Rule>(
        r#"
        SELECT id, name, email_account_id, group_id
        FROM rules
        WHERE email_account_id = ?
        ORDER BY name
        "#,
    )
    .bind(email_account_id)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}
