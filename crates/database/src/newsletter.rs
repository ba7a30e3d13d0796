//! Sender (newsletter) records.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Newsletter, NewsletterStatus};
use crate::validation::extract_email_address;
use crate::Result;

/// Set the status of a sender, creating the record on first sight.
///
/// The address is normalized first, so `"News <a@Example.com>"` and
/// `a@example.com` key the same row. Repeating the call with the same status
/// is a no-op apart from `updated_at`.
pub async fn set_sender_status(
    pool: &SqlitePool,
    email_account_id: &str,
    newsletter_email: &str,
    status: Option<NewsletterStatus>,
) -> Result<Newsletter> {
    let email = extract_email_address(newsletter_email)?;

    let row = sqlx::query_as::<_, Newsletter>(
        r#"
        INSERT INTO newsletters (id, email, email_account_id, status)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(email, email_account_id) DO UPDATE SET
            status = excluded.status,
            updated_at = datetime('now')
        RETURNING id, email, email_account_id, status, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&email)
    .bind(email_account_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    tracing::debug!(
        email = %row.email,
        email_account_id,
        status = ?row.status,
        "Updated sender status"
    );

    Ok(row)
}

/// Get a sender record by (normalized) address.
pub async fn get_newsletter(
    pool: &SqlitePool,
    email_account_id: &str,
    newsletter_email: &str,
) -> Result<Option<Newsletter>> {
    let email = extract_email_address(newsletter_email)?;

    let row = sqlx::query_as::<_, Newsletter>(
        r#"
        SELECT id, email, email_account_id, status, created_at, updated_at
        FROM newsletters
        WHERE email = ? AND email_account_id = ?
        "#,
    )
    .bind(&email)
    .bind(email_account_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List the senders of an account that carry a given status.
pub async fn list_by_status(
    pool: &SqlitePool,
    email_account_id: &str,
    status: NewsletterStatus,
) -> Result<Vec<Newsletter>> {
    let rows = sqlx::query_as::<_, Newsletter>(
        r#"
        SELECT id, email, email_account_id, status, created_at, updated_at
        FROM newsletters
        WHERE email_account_id = ? AND status = ?
        ORDER BY email
        "#,
    )
    .bind(email_account_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count sender records of an account.
pub async fn count_newsletters(pool: &SqlitePool, email_account_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM newsletters WHERE email_account_id = ?
        "#,
    )
    .bind(email_account_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
