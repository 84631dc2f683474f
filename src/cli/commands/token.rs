use clap::Subcommand;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_value;
use crate::cli::{connect, OutputFormat};
use crate::database::postgres::PgStore;
use crate::database::UserRepository;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for an active user")]
    Issue {
        #[arg(help = "Email address of the user")]
        email: String,
        #[arg(long, help = "Token lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { email, hours } => {
            let store = PgStore::new(connect().await?);
            let email = crate::models::user::normalize_email(&email)
                .ok_or_else(|| anyhow::anyhow!("'{}' is not a valid email address", email))?;
            let user = store
                .find_by_email(&email)
                .await?
                .filter(|user| user.is_active)
                .ok_or_else(|| anyhow::anyhow!("no active user with email '{}'", email))?;

            let claims = match hours {
                Some(hours) if hours > 0 => Claims::for_hours(&user, hours)?,
                Some(_) => anyhow::bail!("--hours must be positive"),
                None => Claims::new(&user)?,
            };
            let token = generate_jwt(&claims)?;
            output_value(output_format, "token", &token)
        }
    }
}
