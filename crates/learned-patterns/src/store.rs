//! Saving learned sender patterns onto a rule's group.

use database::{
    group_item, rule, GroupItem, GroupItemSource, GroupItemType, GroupItemUpsert, SqlitePool,
};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::group::resolve_group_id;

/// A single sender pattern learned for a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveLearnedPattern {
    pub email_account_id: String,
    /// Sender address to match.
    pub from: String,
    pub rule_id: String,
    /// True to record "never match this sender".
    pub exclude: bool,
    pub reason: Option<String>,
    pub source: Option<GroupItemSource>,
    pub message_id: Option<String>,
    pub thread_id: Option<String>,
}

/// Outcome of [`save_learned_pattern`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The pattern was created or updated.
    Saved(GroupItem),
    /// Nothing was written.
    Skipped(SkipReason),
}

/// Why a save was skipped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RuleNotFound,
}

/// Record that `from` should (or should not) match the rule.
///
/// A missing rule is logged and reported as [`SaveOutcome::Skipped`] so that
/// webhook callers never fail on it. Calling this twice with the same input
/// leaves exactly one group item. The rule's group is resolved with
/// [`resolve_group_id`], the same recovery path the batch save uses.
pub async fn save_learned_pattern(
    pool: &SqlitePool,
    input: &SaveLearnedPattern,
) -> Result<SaveOutcome> {
    let Some(rule) = rule::get_rule(pool, &input.email_account_id, &input.rule_id).await? else {
        error!(
            rule_id = %input.rule_id,
            email_account_id = %input.email_account_id,
            "Rule not found"
        );
        return Ok(SaveOutcome::Skipped(SkipReason::RuleNotFound));
    };

    let group_id = resolve_group_id(pool, &rule).await?;

    let item = group_item::upsert_group_item(
        pool,
        &GroupItemUpsert {
            group_id: &group_id,
            kind: GroupItemType::From,
            value: &input.from,
            exclude: input.exclude,
            reason: input.reason.as_deref(),
            source: input.source,
            message_id: input.message_id.as_deref(),
            thread_id: input.thread_id.as_deref(),
        },
    )
    .await?;

    debug!(
        rule_id = %rule.id,
        group_id = %group_id,
        from = %input.from,
        exclude = input.exclude,
        "Saved learned pattern"
    );

    Ok(SaveOutcome::Saved(item))
}

/// One pattern of a batch save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternInput {
    pub kind: GroupItemType,
    pub value: String,
    pub exclude: bool,
}

impl PatternInput {
    pub fn from_sender(value: impl Into<String>) -> Self {
        Self {
            kind: GroupItemType::From,
            value: value.into(),
            exclude: false,
        }
    }

    pub fn subject(value: impl Into<String>) -> Self {
        Self {
            kind: GroupItemType::Subject,
            value: value.into(),
            exclude: false,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.exclude = true;
        self
    }
}

/// Batch input for [`save_learned_patterns`]; the rule is found by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveLearnedPatterns {
    pub email_account_id: String,
    pub rule_name: String,
    pub patterns: Vec<PatternInput>,
}

/// Aggregated outcome of a batch save.
///
/// Serializes as `{"success": true}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSaveResult {
    Success,
    /// Failure messages joined with `", "`. Patterns not named here were saved.
    Error(String),
}

impl BatchSaveResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchSaveResult::Success)
    }
}

impl Serialize for BatchSaveResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            BatchSaveResult::Success => map.serialize_entry("success", &true)?,
            BatchSaveResult::Error(message) => map.serialize_entry("error", message)?,
        }
        map.end()
    }
}

/// Save several patterns for the rule named `rule_name`.
///
/// Patterns are upserted in input order and independently: a failing
/// pattern is recorded and the rest still go through. Errors resolving the
/// rule's group propagate.
pub async fn save_learned_patterns(
    pool: &SqlitePool,
    input: &SaveLearnedPatterns,
) -> Result<BatchSaveResult> {
    let Some(rule) =
        rule::get_rule_by_name(pool, &input.email_account_id, &input.rule_name).await?
    else {
        error!(
            rule_name = %input.rule_name,
            email_account_id = %input.email_account_id,
            "Rule not found"
        );
        return Ok(BatchSaveResult::Error("Rule not found".to_string()));
    };

    let group_id = resolve_group_id(pool, &rule).await?;

    let mut errors = Vec::new();
    for pattern in &input.patterns {
        let mut item = GroupItemUpsert::new(&group_id, pattern.kind, &pattern.value);
        item.exclude = pattern.exclude;

        if let Err(e) = group_item::upsert_group_item(pool, &item).await {
            if e.is_duplicate() {
                errors.push(format!("Duplicate pattern: {} {}", pattern.kind, pattern.value));
            } else {
                errors.push(format!(
                    "Error saving pattern {} {}: {}",
                    pattern.kind, pattern.value, e
                ));
            }
        }
    }

    if errors.is_empty() {
        info!(
            rule_id = %rule.id,
            count = input.patterns.len(),
            "Saved learned patterns"
        );
        return Ok(BatchSaveResult::Success);
    }

    warn!(
        rule_id = %rule.id,
        failed = errors.len(),
        total = input.patterns.len(),
        "Some learned patterns were not saved"
    );
    Ok(BatchSaveResult::Error(errors.join(", ")))
}

/// Remove a learned pattern from the rule's group.
///
/// Returns the number of rows removed; zero when the rule, its group or the
/// pattern does not exist.
pub async fn remove_learned_pattern(
    pool: &SqlitePool,
    email_account_id: &str,
    rule_id: &str,
    kind: GroupItemType,
    value: &str,
) -> Result<u64> {
    let Some(group_id) = rule::get_rule_group_id(pool, email_account_id, rule_id).await? else {
        debug!(rule_id, "No group for rule, nothing to remove");
        return Ok(0);
    };

    let removed = group_item::delete_group_items(pool, &group_id, kind, value).await?;
    Ok(removed)
}

/// List the patterns learned for a rule, oldest first.
pub async fn list_learned_patterns(
    pool: &SqlitePool,
    email_account_id: &str,
    rule_id: &str,
) -> Result<Vec<GroupItem>> {
    match rule::get_rule_group_id(pool, email_account_id, rule_id).await? {
        Some(group_id) => Ok(group_item::list_group_items(pool, &group_id).await?),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{group, Database};

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn spam_pattern(rule_id: &str) -> SaveLearnedPattern {
        SaveLearnedPattern {
            email_account_id: "acct".to_string(),
            from: "promo@shop.example".to_string(),
            rule_id: rule_id.to_string(),
            reason: Some("marked as spam".to_string()),
            source: Some(GroupItemSource::User),
            message_id: Some("msg-1".to_string()),
            thread_id: Some("thread-1".to_string()),
            ..Default::default()
        }
    }

    fn saved(outcome: SaveOutcome) -> GroupItem {
        match outcome {
            SaveOutcome::Saved(item) => item,
            other => panic!("expected saved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_creates_group_lazily() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();

        let item = saved(save_learned_pattern(db.pool(), &spam_pattern(&r.id)).await.unwrap());

        let group_id = rule::get_rule_group_id(db.pool(), "acct", &r.id)
            .await
            .unwrap()
            .unwrap();
        let created = group::get_group(db.pool(), &group_id).await.unwrap();
        assert_eq!(created.name, "Spam");
        assert_eq!(item.group_id, group_id);
        assert_eq!(item.kind, GroupItemType::From);
        assert_eq!(item.message_id.as_deref(), Some("msg-1"));
        assert!(!item.exclude);
    }

    #[tokio::test]
    async fn test_save_twice_is_idempotent() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();

        let first = saved(save_learned_pattern(db.pool(), &spam_pattern(&r.id)).await.unwrap());

        let mut input = spam_pattern(&r.id);
        input.exclude = true;
        input.reason = Some("user approved sender".to_string());
        input.source = Some(GroupItemSource::LabelRemoved);
        let second = saved(save_learned_pattern(db.pool(), &input).await.unwrap());

        assert_eq!(first.id, second.id);
        assert!(second.exclude);
        assert_eq!(second.reason.as_deref(), Some("user approved sender"));
        assert_eq!(second.source, Some(GroupItemSource::LabelRemoved));

        let items = list_learned_patterns(db.pool(), "acct", &r.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(group::count_groups(db.pool(), "acct").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_rule_is_skipped() {
        let db = test_db().await;

        let outcome = save_learned_pattern(db.pool(), &spam_pattern("no-such-rule"))
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::RuleNotFound));
        assert_eq!(group::count_groups(db.pool(), "acct").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rule_from_other_account_is_skipped() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "someone-else", "Spam").await.unwrap();

        let outcome = save_learned_pattern(db.pool(), &spam_pattern(&r.id)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::RuleNotFound));
    }

    #[tokio::test]
    async fn test_concurrent_first_saves_create_one_group() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();
        let input = spam_pattern(&r.id);

        let (a, b) = tokio::join!(
            save_learned_pattern(db.pool(), &input),
            save_learned_pattern(db.pool(), &input),
        );
        let a = saved(a.unwrap());
        let b = saved(b.unwrap());

        assert_eq!(a.id, b.id);
        assert_eq!(group::count_groups(db.pool(), "acct").await.unwrap(), 1);
        let items = list_learned_patterns(db.pool(), "acct", &r.id).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_rule_snapshot_recovers_existing_group() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();

        // Another writer links a group after our snapshot was taken.
        let winner = group::create_group_for_rule(db.pool(), "acct", "Spam", &r.id)
            .await
            .unwrap();

        let group_id = resolve_group_id(db.pool(), &r).await.unwrap();
        assert_eq!(group_id, winner.id);
        assert_eq!(group::count_groups(db.pool(), "acct").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_saves_all_patterns() {
        let db = test_db().await;
        rule::create_rule(db.pool(), "acct", "Newsletters").await.unwrap();

        let input = SaveLearnedPatterns {
            email_account_id: "acct".to_string(),
            rule_name: "Newsletters".to_string(),
            patterns: vec![
                PatternInput::from_sender("news@a.example"),
                PatternInput::from_sender("digest@b.example").excluded(),
                PatternInput::subject("Weekly digest"),
            ],
        };

        let result = save_learned_patterns(db.pool(), &input).await.unwrap();
        assert_eq!(result, BatchSaveResult::Success);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({ "success": true })
        );

        let r = rule::get_rule_by_name(db.pool(), "acct", "Newsletters")
            .await
            .unwrap()
            .unwrap();
        let items = list_learned_patterns(db.pool(), "acct", &r.id).await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].value, "news@a.example");
        assert!(items[1].exclude);
        assert_eq!(items[2].kind, GroupItemType::Subject);

        // Re-running flips exclude without duplicating rows
        let rerun = SaveLearnedPatterns {
            patterns: vec![PatternInput::from_sender("digest@b.example")],
            ..input
        };
        save_learned_patterns(db.pool(), &rerun).await.unwrap();
        let items = list_learned_patterns(db.pool(), "acct", &r.id).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(!items[1].exclude);
    }

    #[tokio::test]
    async fn test_batch_collects_partial_failures() {
        let db = test_db().await;
        rule::create_rule(db.pool(), "acct", "Newsletters").await.unwrap();

        let input = SaveLearnedPatterns {
            email_account_id: "acct".to_string(),
            rule_name: "Newsletters".to_string(),
            patterns: vec![
                PatternInput::from_sender("news@a.example"),
                PatternInput::from_sender(""),
                PatternInput::subject("Sale"),
            ],
        };

        let result = save_learned_patterns(db.pool(), &input).await.unwrap();
        match &result {
            BatchSaveResult::Error(message) => {
                assert!(message.starts_with("Error saving pattern FROM"));
                assert!(!message.contains("news@a.example"));
            }
            other => panic!("expected error, got {:?}", other),
        }

        let r = rule::get_rule_by_name(db.pool(), "acct", "Newsletters")
            .await
            .unwrap()
            .unwrap();
        let items = list_learned_patterns(db.pool(), "acct", &r.id).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_missing_rule() {
        let db = test_db().await;
        let input = SaveLearnedPatterns {
            email_account_id: "acct".to_string(),
            rule_name: "Nope".to_string(),
            patterns: vec![PatternInput::from_sender("a@b.example")],
        };

        let result = save_learned_patterns(db.pool(), &input).await.unwrap();
        assert_eq!(result, BatchSaveResult::Error("Rule not found".to_string()));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({ "error": "Rule not found" })
        );
    }

    #[tokio::test]
    async fn test_batch_links_orphan_group_with_rule_name() {
        let db = test_db().await;
        let orphan = group::create_group(db.pool(), "acct", "Receipts").await.unwrap();
        let r = rule::create_rule(db.pool(), "acct", "Receipts").await.unwrap();

        let input = SaveLearnedPatterns {
            email_account_id: "acct".to_string(),
            rule_name: "Receipts".to_string(),
            patterns: vec![PatternInput::from_sender("billing@store.example")],
        };
        assert!(save_learned_patterns(db.pool(), &input).await.unwrap().is_success());

        assert_eq!(
            rule::get_rule_group_id(db.pool(), "acct", &r.id).await.unwrap(),
            Some(orphan.id)
        );
        assert_eq!(group::count_groups(db.pool(), "acct").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_uses_suffixed_name_when_group_name_is_owned() {
        let db = test_db().await;
        // A renamed rule still owns the group called "Receipts".
        let old = rule::create_rule(db.pool(), "acct", "Old receipts").await.unwrap();
        let taken = group::create_group_for_rule(db.pool(), "acct", "Receipts", &old.id)
            .await
            .unwrap();
        let r = rule::create_rule(db.pool(), "acct", "Receipts").await.unwrap();

        let input = SaveLearnedPatterns {
            email_account_id: "acct".to_string(),
            rule_name: "Receipts".to_string(),
            patterns: vec![PatternInput::from_sender("billing@store.example")],
        };
        assert!(save_learned_patterns(db.pool(), &input).await.unwrap().is_success());

        let group_id = rule::get_rule_group_id(db.pool(), "acct", &r.id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(group_id, taken.id);
        let created = group::get_group(db.pool(), &group_id).await.unwrap();
        assert!(created.name.starts_with("Receipts ("));
        assert_eq!(
            group_item::count_group_items(db.pool(), &taken.id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_single_save_shares_group_recovery() {
        let db = test_db().await;
        let orphan = group::create_group(db.pool(), "acct", "Spam").await.unwrap();
        let spam = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();

        let item = saved(save_learned_pattern(db.pool(), &spam_pattern(&spam.id)).await.unwrap());
        assert_eq!(item.group_id, orphan.id);

        // In another account "Spam" is owned by a different rule.
        let other = rule::create_rule(db.pool(), "other", "Spam").await.unwrap();
        let owner = rule::create_rule(db.pool(), "other", "Old spam").await.unwrap();
        group::create_group_for_rule(db.pool(), "other", "Spam", &owner.id)
            .await
            .unwrap();

        let mut input = spam_pattern(&other.id);
        input.email_account_id = "other".to_string();
        let item = saved(save_learned_pattern(db.pool(), &input).await.unwrap());
        let created = group::get_group(db.pool(), &item.group_id).await.unwrap();
        assert!(created.name.starts_with("Spam ("));
    }

    #[tokio::test]
    async fn test_remove_learned_pattern() {
        let db = test_db().await;
        let r = rule::create_rule(db.pool(), "acct", "Spam").await.unwrap();

        assert_eq!(
            remove_learned_pattern(db.pool(), "acct", &r.id, GroupItemType::From, "x@y.example")
                .await
                .unwrap(),
            0
        );

        save_learned_pattern(db.pool(), &spam_pattern(&r.id)).await.unwrap();
        let removed = remove_learned_pattern(
            db.pool(),
            "acct",
            &r.id,
            GroupItemType::From,
            "promo@shop.example",
        )
        .await
        .unwrap();
        assert_eq!(removed, 1);
        assert!(list_learned_patterns(db.pool(), "acct", &r.id)
            .await
            .unwrap()
            .is_empty());
        // The group stays with the rule
        assert!(rule::get_rule_group_id(db.pool(), "acct", &r.id)
            .await
            .unwrap()
            .is_some());
    }
}
