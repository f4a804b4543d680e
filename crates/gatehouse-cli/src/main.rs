//! Gatehouse CLI
//!
//! Usage:
//!   gatehouse migrate
//!   gatehouse create-admin --email <email> --first-name <name> --last-name <name> --password <pw>
//!   gatehouse hash-password <password>
//!   gatehouse generate-secret [--bytes N]
//!   gatehouse check-config

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use gatehouse_api::auth::{CredentialVerifier, JwtConfig};
use gatehouse_core::{AppConfig, NewUser, PgStore, Role, UserRepository};
use rand::RngCore;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(about = "Gatehouse authentication service administration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Create an admin account directly in the database
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        password: String,
    },
    /// Print the Argon2id hash of a password
    HashPassword {
        password: String,
    },
    /// Print a random base64 secret suitable for REFRESH_TOKEN_SECRET
    GenerateSecret {
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
    /// Validate configuration and signing keys
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_core=info,warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            let store = connect(&load_config()?).await?;
            store.migrate().await?;
            println!("Migrations applied");
        }
        Commands::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => {
            let config = load_config()?;
            if password.len() < 8 {
                bail!("password must be at least 8 characters long");
            }
            let credentials = CredentialVerifier::new(&config.password)?;
            let store = connect(&config).await?;
            let password_hash = credentials.hash(password).await?;

            let user = UserRepository::create(
                &store,
                NewUser {
                    first_name,
                    last_name,
                    email: email.trim().to_string(),
                    password_hash,
                    role: Role::Admin,
                    tenant_id: None,
                },
            )
            .await?;
            println!("Created admin {} ({})", user.email, user.id);
        }
        Commands::HashPassword { password } => {
            let config = load_config()?;
            let credentials = CredentialVerifier::new(&config.password)?;
            println!("{}", credentials.hash_blocking(&password)?);
        }
        Commands::GenerateSecret { bytes } => {
            if bytes == 0 {
                bail!("--bytes must be greater than zero");
            }
            println!("{}", generate_secret(bytes));
        }
        Commands::CheckConfig => {
            let config = load_config()?;
            JwtConfig::from_auth_config(&config.auth)?.ensure_configured()?;
            CredentialVerifier::new(&config.password)?;

            println!("Listen address: {}", config.bind_address());
            println!(
                "Storage: {}",
                if config.database.postgres_url.is_some() {
                    "postgres"
                } else {
                    "in-memory"
                }
            );
            println!("Issuer: {}", config.auth.issuer);
            println!("Secure cookies: {}", config.auth.cookie_secure);
            println!("Configuration OK");
        }
    }

    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("failed to load configuration")
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgStore> {
    let Some(url) = config.database.postgres_url.as_deref() else {
        bail!("DATABASE_URL is not set");
    };
    PgStore::new(url, config.database.postgres_pool_size)
        .await
        .context("failed to connect to PostgreSQL")
}

fn generate_secret(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    STANDARD.encode(buf)
}
