use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod sessions;
pub mod users;

#[derive(Parser)]
#[command(name = "locker-server")]
#[command(about = "Locker Server CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Print OpenAPI spec (optionally to a file)
    Openapi(OpenApiArgs),
    /// Manage user accounts
    User(users::UserArgs),
    /// Issue access sessions
    Session(sessions::SessionArgs),
}

#[derive(Args)]
struct OpenApiArgs {
    #[arg(long, short)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum RunMode {
    Server,
    Migrate,
    OpenApi { out: Option<PathBuf> },
    User(users::UserArgs),
    Session(sessions::SessionArgs),
}

pub fn parse_args() -> RunMode {
    let cli = Cli::parse();
    match cli.command {
        None => RunMode::Server,
        Some(Command::Migrate) => RunMode::Migrate,
        Some(Command::Openapi(args)) => RunMode::OpenApi { out: args.out },
        Some(Command::User(args)) => RunMode::User(args),
        Some(Command::Session(args)) => RunMode::Session(args),
    }
}
