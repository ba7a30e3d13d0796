//! Learned sender patterns for rules.
//!
//! A learned pattern is a group item recorded from observed behaviour (a
//! user marking mail as spam, approving a sender, or the assistant inferring
//! a match) rather than written by hand. Each rule owns at most one group;
//! it is created the first time a pattern is learned for the rule.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use learned_patterns::{save_learned_pattern, SaveLearnedPattern, SaveOutcome};
//!
//! # async fn example(db: Database, rule_id: String) -> learned_patterns::Result<()> {
//! let outcome = save_learned_pattern(
//!     db.pool(),
//!     &SaveLearnedPattern {
//!         email_account_id: "account-1".to_string(),
//!         from: "promo@shop.example".to_string(),
//!         rule_id,
//!         ..Default::default()
//!     },
//! )
//! .await?;
//!
//! if let SaveOutcome::Skipped(reason) = outcome {
//!     println!("nothing saved: {:?}", reason);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod group;
mod store;

pub use error::{PatternError, Result};
pub use group::resolve_group_id;
pub use store::{
    list_learned_patterns, remove_learned_pattern, save_learned_pattern, save_learned_patterns,
    BatchSaveResult, PatternInput, SaveLearnedPattern, SaveLearnedPatterns, SaveOutcome,
    SkipReason,
};
