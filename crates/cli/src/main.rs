//! BRANA Arts CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! brana-cli migrate
//!
//! # Create an admin account
//! brana-cli admin create -e admin@example.com -p 's3cret-pass' -u admin
//!
//! # Promote an existing account
//! brana-cli admin promote -e artist@example.com
//!
//! # Seed a demo artist with artworks
//! brana-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "brana-cli")]
#[command(author, version, about = "BRANA Arts CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed a demo artist and artworks
    Seed {
        /// Password for the demo artist account
        #[arg(short, long, default_value = "brana-demo")]
        password: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin password (min 6 characters)
        #[arg(short, long)]
        password: String,

        /// Optional username
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Give an existing account the admin role
    Promote {
        /// Email of the account to promote
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                password,
                username,
            } => {
                commands::admin::create(&email, &password, username.as_deref()).await?;
            }
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Seed { password } => commands::seed::demo(&password).await?,
    }
    Ok(())
}
