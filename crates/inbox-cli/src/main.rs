//! Operator CLI for learned sender patterns and automatic unsubscribe.
//!
//! Every command prints its result as JSON on stdout; logs go to stderr and
//! are filtered with `RUST_LOG`.

mod config;

use clap::{Parser, Subcommand};
use database::{
    newsletter, rule, Database, GroupItemSource, GroupItemType, NewsletterStatus,
};
use learned_patterns::{
    list_learned_patterns, remove_learned_pattern, save_learned_pattern, save_learned_patterns,
    PatternInput, SaveLearnedPattern, SaveLearnedPatterns,
};
use sender_unsubscribe::{UnsubscribeRequest, Unsubscriber};
use serde_json::json;
use tracing::{debug, info_span};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "inbox-cli")]
#[command(about = "Manage learned sender patterns and unsubscribe from senders")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a rule for an email account
    CreateRule {
        #[arg(long)]
        account: String,
        #[arg(long)]
        name: String,
    },

    /// Learn a sender pattern for a rule
    Learn {
        #[arg(long)]
        account: String,
        #[arg(long)]
        rule_id: String,
        /// Sender address to match
        #[arg(long)]
        from: String,
        /// Record the sender as "never match"
        #[arg(long)]
        exclude: bool,
        #[arg(long)]
        reason: Option<String>,
        /// user, ai, label-added or label-removed
        #[arg(long)]
        source: Option<GroupItemSource>,
    },

    /// Learn several patterns for a rule looked up by name
    LearnBatch {
        #[arg(long)]
        account: String,
        #[arg(long)]
        rule_name: String,
        /// Sender pattern (repeatable)
        #[arg(long)]
        from: Vec<String>,
        /// Subject pattern (repeatable)
        #[arg(long)]
        subject: Vec<String>,
        /// Mark every pattern in the batch as excluded
        #[arg(long)]
        exclude: bool,
    },

    /// Forget a learned sender pattern
    Forget {
        #[arg(long)]
        account: String,
        #[arg(long)]
        rule_id: String,
        #[arg(long)]
        from: String,
    },

    /// List the patterns learned for a rule
    Patterns {
        #[arg(long)]
        account: String,
        #[arg(long)]
        rule_id: String,
    },

    /// Set the status of a sender
    SetStatus {
        #[arg(long)]
        account: String,
        #[arg(long)]
        sender: String,
        /// unsubscribed, auto-archived, approved or none
        #[arg(long)]
        status: String,
    },

    /// Unsubscribe from a sender and mark it on success
    Unsubscribe {
        #[arg(long)]
        account: String,
        #[arg(long)]
        sender: String,
        /// Unsubscribe link found in the message body
        #[arg(long)]
        link: Option<String>,
        /// Raw List-Unsubscribe header value
        #[arg(long)]
        header: Option<String>,
    },
}

fn parse_status(value: &str) -> Result<Option<NewsletterStatus>, database::UnknownVariant> {
    if value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;
    debug!(database_url = %config.database_url, "Database ready");

    let output = match args.command {
        Command::CreateRule { account, name } => {
            let rule = rule::create_rule(db.pool(), &account, &name).await?;
            serde_json::to_value(rule)?
        }

        Command::Learn {
            account,
            rule_id,
            from,
            exclude,
            reason,
            source,
        } => {
            let outcome = save_learned_pattern(
                db.pool(),
                &SaveLearnedPattern {
                    email_account_id: account,
                    from,
                    rule_id,
                    exclude,
                    reason,
                    source,
                    ..Default::default()
                },
            )
            .await?;
            serde_json::to_value(outcome)?
        }

        Command::LearnBatch {
            account,
            rule_name,
            from,
            subject,
            exclude,
        } => {
            let patterns = from
                .into_iter()
                .map(PatternInput::from_sender)
                .chain(subject.into_iter().map(PatternInput::subject))
                .map(|p| if exclude { p.excluded() } else { p })
                .collect();

            let result = save_learned_patterns(
                db.pool(),
                &SaveLearnedPatterns {
                    email_account_id: account,
                    rule_name,
                    patterns,
                },
            )
            .await?;
            serde_json::to_value(result)?
        }

        Command::Forget {
            account,
            rule_id,
            from,
        } => {
            let removed =
                remove_learned_pattern(db.pool(), &account, &rule_id, GroupItemType::From, &from)
                    .await?;
            json!({ "removed": removed })
        }

        Command::Patterns { account, rule_id } => {
            let items = list_learned_patterns(db.pool(), &account, &rule_id).await?;
            serde_json::to_value(items)?
        }

        Command::SetStatus {
            account,
            sender,
            status,
        } => {
            let status = parse_status(&status)?;
            let record = newsletter::set_sender_status(db.pool(), &account, &sender, status).await?;
            serde_json::to_value(record)?
        }

        Command::Unsubscribe {
            account,
            sender,
            link,
            header,
        } => {
            let unsubscriber = Unsubscriber::with_http(db.pool().clone(), config.unsubscribe)?;
            let span = info_span!("unsubscribe", email_account_id = %account, sender = %sender);
            let request = UnsubscribeRequest {
                email_account_id: account,
                newsletter_email: sender,
                unsubscribe_link: link,
                list_unsubscribe_header: header,
            };
            let outcome = unsubscriber.unsubscribe_sender_and_mark(&request, &span).await?;
            serde_json::to_value(outcome)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    db.close().await;
    Ok(())
}
