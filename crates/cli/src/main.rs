use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docscan_core::{ChatVisionProvider, ProcessingConfig, VisionProvider, DEFAULT_MODEL};
use docscan_orchestrator::exporter::{Exporter, LocalFileExporter};
use docscan_orchestrator::Orchestrator;
use docscan_persistence::{create_pool, run_migrations, DbConfig, PersistenceService};
use docscan_storage::{LocalStorage, StorageBackend};
use std::sync::Arc;
use std::time::Duration;

/// Operator CLI for the document-extraction service: runs the HTTP
/// server or triggers a one-off maintenance job.
#[derive(Parser)]
#[command(name = "docscan", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations, then start the HTTP server.
    Serve(ServeArgs),
    /// Run pending database migrations and exit.
    Migrate,
    /// Detach calendar-year document partitions older than a retention
    /// window, per `ARCHIVE_PARTITIONS_OLDER_THAN_YEARS`.
    ArchivePartitions(ArchiveArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Directory uploads are buffered to before preprocessing.
    #[arg(long, default_value = "./uploads")]
    upload_dir: std::path::PathBuf,

    /// Directory approved documents are exported to.
    #[arg(long, default_value = "./exports")]
    export_dir: std::path::PathBuf,

    /// Root directory the local storage backend writes accepted
    /// artifacts under, content-addressed by `docscan_storage::storage_key`.
    #[arg(long, default_value = "./storage")]
    storage_dir: std::path::PathBuf,

    /// Base URL the local storage backend reports as `public_url`.
    #[arg(long, default_value = "http://localhost:3000/files")]
    storage_base_url: String,
}

#[derive(Parser)]
struct ArchiveArgs {
    /// Partitions whose year is older than this many years from now are
    /// detached. Defaults to `ARCHIVE_PARTITIONS_OLDER_THAN_YEARS` or 7.
    #[arg(long)]
    older_than_years: Option<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Migrate => run_migrate().await,
        Commands::ArchivePartitions(args) => run_archive_partitions(args).await,
    }
}

async fn connect() -> Result<sqlx::PgPool> {
    let db_config = DbConfig::from_env().context("loading DATABASE_URL")?;
    create_pool(&db_config).await.context("connecting to database")
}

async fn run_migrate() -> Result<()> {
    let pool = connect().await?;
    run_migrations(&pool).await.context("running migrations")?;
    println!("migrations applied");
    Ok(())
}

async fn run_archive_partitions(args: ArchiveArgs) -> Result<()> {
    let years = args.older_than_years.unwrap_or_else(|| {
        std::env::var("ARCHIVE_PARTITIONS_OLDER_THAN_YEARS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7)
    });

    let pool = connect().await?;
    let service = PersistenceService::new(pool);
    let archived = service.archive_old_partitions(years).await?;

    if archived.is_empty() {
        println!("no partitions older than {years} years");
    } else {
        println!("detached {} partition(s):", archived.len());
        for name in archived {
            println!("  {name}");
        }
    }
    Ok(())
}

/// Selects a storage backend by `STORAGE_BACKEND` (`local`, `nfs`, `s3`),
/// defaulting to `local`. `nfs` and `s3` read their own connection
/// details from the environment rather than CLI flags, since they are
/// deployment-specific in a way the upload/export directories are not.
async fn build_storage_backend(args: &ServeArgs) -> Result<Arc<dyn StorageBackend>> {
    match std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string()).as_str() {
        "nfs" => {
            let mount_point = std::env::var("NFS_MOUNT_POINT")
                .context("NFS_MOUNT_POINT must be set when STORAGE_BACKEND=nfs")?;
            let backend = docscan_storage::NfsStorage::new(mount_point.into(), args.storage_base_url.clone())
                .context("mounting NFS storage backend")?;
            Ok(Arc::new(backend))
        }
        "s3" => {
            let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET must be set when STORAGE_BACKEND=s3")?;
            let prefix = std::env::var("S3_PREFIX").unwrap_or_default();
            let backend = docscan_storage::S3Storage::new(bucket, prefix, args.storage_base_url.clone())
                .await
                .context("connecting S3 storage backend")?;
            Ok(Arc::new(backend))
        }
        other => {
            if other != "local" {
                tracing::warn!(backend = other, "unknown STORAGE_BACKEND, falling back to local");
            }
            Ok(Arc::new(LocalStorage::new(args.storage_dir.clone(), args.storage_base_url.clone())))
        }
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let pool = connect().await?;
    run_migrations(&pool).await.context("running migrations")?;
    let persistence = Arc::new(PersistenceService::new(pool));

    let model = std::env::var("VISION_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let provider: Arc<dyn VisionProvider> = Arc::new(ChatVisionProvider::new(model));

    let exporters: Vec<Arc<dyn Exporter>> = vec![Arc::new(LocalFileExporter::new(&args.export_dir))];
    let config = ProcessingConfig::from_env();
    let duplicate_window = Duration::from_secs(
        std::env::var("DUPLICATE_CHECK_WINDOW_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
    );

    let storage = build_storage_backend(&args).await?;

    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        persistence.clone(),
        storage,
        exporters,
        config,
        duplicate_window,
    ));

    let api_token = std::env::var("API_TOKEN").context("API_TOKEN must be set to run the server")?;
    let state = docscan_server::AppState::new(orchestrator, persistence, args.upload_dir, api_token);
    let app = docscan_server::create_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind).await.context("binding listen address")?;
    tracing::info!(bind = %args.bind, "listening");
    axum::serve(listener, app).await.context("server error")
}
