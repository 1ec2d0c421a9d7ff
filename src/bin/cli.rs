use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;

use schoolyard::cli::demo::generate_demo_data;
use schoolyard::cli::{create_system_admin, run_migrations, seed_catalog};

#[derive(Parser)]
#[command(name = "schoolyard-cli", about = "Schoolyard operator commands", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Seed the permission catalog and system role grants
    Seed,
    /// Create a global system administrator (prompts for missing fields)
    CreateSysadmin {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Generate a demo school with staff, students, and parents
    DemoData,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    match cli.command {
        Commands::Migrate => run_migrations(&pool).await?,
        Commands::Seed => seed_catalog(&pool).await?,
        Commands::CreateSysadmin {
            first_name,
            last_name,
            email,
        } => {
            let first_name = match first_name {
                Some(v) => v,
                None => Input::new().with_prompt("First name").interact_text()?,
            };
            let last_name = match last_name {
                Some(v) => v,
                None => Input::new().with_prompt("Last name").interact_text()?,
            };
            let email: String = match email {
                Some(v) => v,
                None => Input::new().with_prompt("Email").interact_text()?,
            };
            let password = Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()?;

            let user_id =
                create_system_admin(&pool, &first_name, &last_name, &email, &password).await?;
            println!("System administrator created: {user_id} ({email})");
        }
        Commands::DemoData => generate_demo_data(&pool).await?,
    }

    Ok(())
}
