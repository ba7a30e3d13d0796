//! Rule → group resolution.
//!
//! A rule starts without a group and gets one the first time a pattern is
//! learned for it. Concurrent first-time writers race on the unique
//! `(name, email_account_id)` constraint; the loser recovers by reading the
//! winner's group instead of failing. A rule never loses its group again.

use chrono::{SecondsFormat, Utc};
use database::{group, rule, Rule, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{PatternError, Result};

/// Return the rule's group ID, creating and linking a group if needed.
pub async fn resolve_group_id(pool: &SqlitePool, rule: &Rule) -> Result<String> {
    if let Some(group_id) = &rule.group_id {
        return Ok(group_id.clone());
    }

    let account = rule.email_account_id.as_str();

    match group::create_group_for_rule(pool, account, &rule.name, &rule.id).await {
        Ok(created) => {
            info!(rule_id = %rule.id, group_id = %created.id, "Created group for rule");
            return Ok(created.id);
        }
        Err(e) if e.is_duplicate() => {
            debug!(rule_id = %rule.id, "Group creation lost a race, re-reading rule");
        }
        Err(e) => return Err(e.into()),
    }

    // Another writer linked a group first.
    if let Some(group_id) = rule::get_rule_group_id(pool, account, &rule.id).await? {
        return Ok(group_id);
    }

    // The name is held by a group this rule does not point at.
    if let Some(existing) = group::get_group_by_name(pool, account, &rule.name).await? {
        if rule::find_rule_by_group(pool, &existing.id).await?.is_none() {
            match rule::link_group(pool, account, &rule.id, &existing.id).await {
                Ok(()) => {
                    info!(rule_id = %rule.id, group_id = %existing.id, "Linked orphan group to rule");
                    return Ok(existing.id);
                }
                Err(e) if e.is_duplicate() => {
                    if let Some(group_id) = rule::get_rule_group_id(pool, account, &rule.id).await? {
                        return Ok(group_id);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    let name = format!(
        "{} ({})",
        rule.name,
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    warn!(rule_id = %rule.id, group_name = %name, "Group name taken, creating suffixed group");

    match group::create_group_for_rule(pool, account, &name, &rule.id).await {
        Ok(created) => Ok(created.id),
        Err(e) if e.is_duplicate() => rule::get_rule_group_id(pool, account, &rule.id)
            .await?
            .ok_or_else(|| PatternError::GroupUnavailable {
                rule_id: rule.id.clone(),
            }),
        Err(e) => Err(e.into()),
    }
}
