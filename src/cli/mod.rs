pub mod commands;
pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::config;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "recipectl")]
#[command(about = "Recipe API operator CLI - migrations, users and tokens")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "User management")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "Bearer token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}

/// The CLI always talks to PostgreSQL directly, whatever STORE_BACKEND says
pub(crate) async fn connect() -> anyhow::Result<PgPool> {
    DatabaseManager::connect(&config::config().database)
        .await
        .context("could not connect to DATABASE_URL")
}
