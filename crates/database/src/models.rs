//! Database models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named per-account automation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Rule {
    pub id: String,
    /// Unique per email account.
    pub name: String,
    pub email_account_id: String,
    /// Pattern group backing this rule, once one has been learned.
    pub group_id: Option<String>,
}

/// A named container of matching patterns owned by a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub email_account_id: String,
    pub created_at: String,
}

/// What a group item matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupItemType {
    /// Sender address.
    From,
    /// Subject substring.
    Subject,
}

impl GroupItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupItemType::From => "FROM",
            GroupItemType::Subject => "SUBJECT",
        }
    }
}

impl fmt::Display for GroupItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupItemType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FROM" => Ok(GroupItemType::From),
            "SUBJECT" => Ok(GroupItemType::Subject),
            _ => Err(UnknownVariant::new("group item type", s)),
        }
    }
}

/// Where a learned pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupItemSource {
    /// Explicit user action (marking spam, approving a sender).
    User,
    /// Inferred by the assistant.
    Ai,
    /// A label was added to a message by the user.
    LabelAdded,
    /// A label was removed from a message by the user.
    LabelRemoved,
}

impl FromStr for GroupItemSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "USER" => Ok(GroupItemSource::User),
            "AI" => Ok(GroupItemSource::Ai),
            "LABEL_ADDED" => Ok(GroupItemSource::LabelAdded),
            "LABEL_REMOVED" => Ok(GroupItemSource::LabelRemoved),
            _ => Err(UnknownVariant::new("group item source", s)),
        }
    }
}

/// One matching pattern inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GroupItem {
    pub id: String,
    pub group_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: GroupItemType,
    pub value: String,
    /// When true the pattern means "never match".
    pub exclude: bool,
    pub reason: Option<String>,
    pub source: Option<GroupItemSource>,
    pub message_id: Option<String>,
    pub thread_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Status of a tracked sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsletterStatus {
    Unsubscribed,
    AutoArchived,
    Approved,
}

impl FromStr for NewsletterStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "UNSUBSCRIBED" => Ok(NewsletterStatus::Unsubscribed),
            "AUTO_ARCHIVED" => Ok(NewsletterStatus::AutoArchived),
            "APPROVED" => Ok(NewsletterStatus::Approved),
            _ => Err(UnknownVariant::new("newsletter status", s)),
        }
    }
}

/// A tracked sender, one per address and email account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Newsletter {
    pub id: String,
    /// Normalized sender address.
    pub email: String,
    pub email_account_id: String,
    pub status: Option<NewsletterStatus>,
    pub created_at: String,
    pub updated_at: String,
}

/// Returned when parsing an enum from user input fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
