use chrono::Utc;
use clap::{Args, Subcommand};
use locker_core::sharing::normalize_email;
use locker_core::{SyncEvent, SyncEventType, User, UserStatus};
use locker_db::repo::sharing::{self, SharingTxError};
use locker_db::PgPool;
use serde::Serialize;
use uuid::Uuid;

use crate::domains::sync::notifier::SyncNotifier;

#[derive(Debug, Clone, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UserCommand {
    /// Create an account and attach pending email invitations
    Create(CreateUserArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CreateUserArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateUserOutput {
    user_id: String,
    email: String,
    claimed_invitations: usize,
}

pub async fn run(db: &PgPool, notifier: &SyncNotifier, args: &UserArgs) -> Result<(), String> {
    match &args.command {
        UserCommand::Create(args) => create(db, notifier, args).await,
    }
}

async fn create(db: &PgPool, notifier: &SyncNotifier, args: &CreateUserArgs) -> Result<(), String> {
    let email = normalize_email(&args.email).ok_or_else(|| "invalid_email".to_string())?;
    let now = Utc::now();
    let user = User {
        id: Uuid::now_v7(),
        email,
        full_name: non_blank(args.name.as_deref()),
        public_key: non_blank(args.public_key.as_deref()),
        status: UserStatus::Active,
        revision_date: now,
        created_at: now,
    };

    let mut tx = db.begin().await.map_err(|err| {
        tracing::error!(event = "user_create_failed", error = %err, "DB begin failed");
        "db_error".to_string()
    })?;
    let (claimed, owner_ids) = match sharing::create_user_claiming_invites(&mut tx, &user).await {
        Ok(result) => result,
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    event = "user_create_failed",
                    error = %rollback_err,
                    "DB rollback failed"
                );
            }
            return Err(match err {
                SharingTxError::Conflict(code) | SharingTxError::Rejected(code) => {
                    code.to_string()
                }
                SharingTxError::NotFound => "not_found".to_string(),
                SharingTxError::Forbidden => "forbidden".to_string(),
                SharingTxError::Db(err) => {
                    tracing::error!(event = "user_create_failed", error = %err, "User insert failed");
                    "db_error".to_string()
                }
            });
        }
    };
    tx.commit().await.map_err(|err| {
        tracing::error!(event = "user_create_failed", error = %err, "DB commit failed");
        "db_error".to_string()
    })?;

    for member in &claimed {
        notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingInvitation)
                    .with_team(member.team_id)
                    .with_member(member.id),
                [user.id],
            )
            .await;
    }
    if !claimed.is_empty() {
        notifier
            .notify(
                SyncEvent::new(SyncEventType::SharingMemberUpdated).with_user(user.id),
                owner_ids,
            )
            .await;
    }
    tracing::info!(
        event = "user_created",
        user_id = %user.id,
        claimed = claimed.len(),
        "User created"
    );

    let output = CreateUserOutput {
        user_id: user.id.to_string(),
        email: user.email,
        claimed_invitations: claimed.len(),
    };
    let json = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
