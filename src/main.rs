use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldreport::{api, db::Database, storage::Storage};

#[derive(Parser)]
#[command(name = "frpt")]
#[command(about = "Field inspection report backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the fieldreport server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Data directory (photos, documents, database)
        #[arg(long)]
        data_dir: Option<std::path::PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "fieldreport=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16, data_dir: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let storage = match data_dir {
        Some(dir) => Storage::new(dir),
        None => Storage::default_dir()?,
    };

    let db_path = storage.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(db_path)?;
    db.migrate()?;

    let app = api::create_router(api::AppState::new(db, storage));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("fieldreport server listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    match Cli::parse().command {
        Some(Commands::Serve { port, data_dir }) => serve(port, data_dir).await,
        None => serve(8000, None).await,
    }
}
