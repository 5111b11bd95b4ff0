use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadline::api::{self, middleware::SecurityConfig};
use leadline::db::Database;

#[derive(Parser)]
#[command(name = "leadline")]
#[command(about = "Lead-distribution admin server with round-robin assignment")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the leadline server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file path (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Verify lead-assignment integrity (every assigned lead must
    /// reference an existing agent)
    Check {
        /// Database file path (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "leadline=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(port: u16, db: Database) -> anyhow::Result<()> {
    let security = SecurityConfig::from_env();
    if !security.auth_enabled() {
        tracing::warn!("No API keys configured; running unauthenticated as the local operator");
    }

    let app = api::create_router(db, security);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("leadline server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port, db }) => {
            tracing::info!("Starting leadline server on port {}", port);
            serve(port, open_database(db)?).await?;
        }
        Some(Commands::Check { db }) => {
            let db = open_database(db)?;
            let orphaned = db.count_orphaned_leads()?;
            if orphaned == 0 {
                println!("ok: all assigned leads reference an existing agent");
            } else {
                println!("FAIL: {orphaned} lead(s) reference a missing agent");
                std::process::exit(1);
            }
        }
        None => {
            // Default: start server
            tracing::info!("Starting leadline server on port 3000");
            serve(3000, open_database(None)?).await?;
        }
    }

    Ok(())
}
