use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::database::postgres::PgStore;
use crate::database::UserRepository;
use crate::models::NewUser;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user")]
    Create {
        #[arg(help = "Email address (unique)")]
        email: String,
        #[arg(long, help = "Display name")]
        name: Option<String>,
    },

    #[command(about = "Show a user by email")]
    Show {
        #[arg(help = "Email address")]
        email: String,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::new(connect().await?);

    match cmd {
        UserCommands::Create { email, name } => {
            let new_user = NewUser::new(&email, name.as_deref()).map_err(|e| anyhow::anyhow!("{}", e))?;
            let user = store.create(new_user).await?;
            output_success(
                output_format,
                &format!("Created user {} ({})", user.email, user.id),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Show { email } => {
            let email = crate::models::user::normalize_email(&email)
                .ok_or_else(|| anyhow::anyhow!("'{}' is not a valid email address", email))?;
            let user = store
                .find_by_email(&email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no user with email '{}'", email))?;
            output_success(
                output_format,
                &format!("{} (id {}, active: {})", user.email, user.id, user.is_active),
                Some(json!({ "user": user })),
            )
        }
    }
}
