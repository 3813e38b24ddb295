use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use locker_core::Session;
use locker_db::repo::{SessionRepo, UserRepo};
use locker_db::PgPool;
use serde::Serialize;
use uuid::Uuid;

use crate::domains::auth::tokens::{generate_token, hash_token};
use crate::settings::Settings;

#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SessionCommand {
    /// Issue a bearer token for an existing user
    Issue(IssueSessionArgs),
}

#[derive(Debug, Clone, Args)]
pub struct IssueSessionArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, value_name = "seconds")]
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
struct IssueSessionOutput {
    session_id: String,
    user_id: String,
    access_token: String,
    expires_at: String,
}

pub async fn run(settings: &Settings, db: &PgPool, args: &SessionArgs) -> Result<(), String> {
    match &args.command {
        SessionCommand::Issue(args) => issue(settings, db, args).await,
    }
}

async fn issue(settings: &Settings, db: &PgPool, args: &IssueSessionArgs) -> Result<(), String> {
    let ttl_seconds = args.ttl_seconds.unwrap_or(settings.session_ttl_seconds);
    let ttl = Duration::try_seconds(ttl_seconds)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| "invalid_ttl".to_string())?;
    let email = args.email.trim().to_ascii_lowercase();
    let user = UserRepo::new(db)
        .get_by_email(&email)
        .await
        .map_err(|err| {
            tracing::error!(event = "session_issue_failed", error = %err, "User lookup failed");
            "db_error".to_string()
        })?
        .ok_or_else(|| "user_not_found".to_string())?;

    let token = generate_token();
    let now = Utc::now();
    let session = Session {
        id: Uuid::now_v7(),
        user_id: user.id,
        access_token_hash: hash_token(&token, &settings.token_pepper),
        access_expires_at: now + ttl,
        created_at: now,
    };
    SessionRepo::new(db).create(&session).await.map_err(|err| {
        tracing::error!(event = "session_issue_failed", error = %err, "Session insert failed");
        "db_error".to_string()
    })?;
    tracing::info!(
        event = "session_issued",
        user_id = %user.id,
        session_id = %session.id,
        "Session issued"
    );

    let output = IssueSessionOutput {
        session_id: session.id.to_string(),
        user_id: user.id.to_string(),
        access_token: token,
        expires_at: session.access_expires_at.to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}
