//! bouquet-feedback - bouquet satisfaction survey client
//!
//! Subcommands:
//! - `serve`: HTTP API for the browser form
//! - `submit`: submit one survey from the command line
//! - `history`: print the stored history
//! - `export`: write the history to a dated CSV file

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bouquet_common::config::{
    config_file_path, load_config, RelayMode, RootFolderInitializer, RootFolderResolver,
    TomlConfig,
};
use bouquet_feedback::export::{export_history, DirectorySink, DownloadSink};
use bouquet_feedback::form::{FormController, Locale, SubmissionState};
use bouquet_feedback::history::HistoryStore;
use bouquet_feedback::storage::SqliteKeyValueStore;
use bouquet_feedback::{build_router, relay, AppState, Satisfaction, SubmissionPipeline, SubmitError};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for bouquet-feedback
#[derive(Parser, Debug)]
#[command(name = "bouquet-feedback")]
#[command(about = "Bouquet satisfaction survey client")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding the local history database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, env = "BOUQUET_PORT")]
        port: Option<u16>,
    },

    /// Submit one survey
    Submit {
        /// Bouquet name
        #[arg(long)]
        name: String,

        /// Satisfied with the bouquet: yes/no (tak/nie also accepted)
        #[arg(long)]
        satisfied: String,

        /// Star rating, 1-5
        #[arg(long)]
        rating: u8,

        /// Comment
        #[arg(long)]
        comment: String,
    },

    /// Print the stored history as JSON
    History,

    /// Export the history to CSV
    Export {
        /// Target directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Everything the subcommands share
struct Runtime {
    config: TomlConfig,
    root: RootFolderInitializer,
    pipeline: Arc<SubmissionPipeline>,
    locale: Locale,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_source = config_file_path(args.config.as_deref());
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config.logging.level);

    info!(
        "Starting bouquet-feedback v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config_source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    let runtime = build_runtime(&args, config).await?;

    match args.command {
        Command::Serve { host, port } => serve(runtime, host, port).await,
        Command::Submit {
            name,
            satisfied,
            rating,
            comment,
        } => submit(runtime, name, &satisfied, rating, comment).await,
        Command::History => history(runtime).await,
        Command::Export { out } => export(runtime, out).await,
    }
}

/// RUST_LOG wins; otherwise the configured level for our crates
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "bouquet_feedback={level},bouquet_common={level},tower_http={level}",
                    level = level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_runtime(args: &Args, config: TomlConfig) -> Result<Runtime> {
    let root_folder = RootFolderResolver::new(&config).resolve(args.root_folder.as_deref());
    let root = RootFolderInitializer::new(root_folder);
    root.ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = root.database_path(&config.storage);
    info!("Database path: {}", db_path.display());
    let pool = bouquet_common::db::init_database(&db_path)
        .await
        .context("Failed to open local storage database")?;

    let history = HistoryStore::open(
        Arc::new(SqliteKeyValueStore::new(pool)),
        config.storage.history_key.clone(),
    )
    .await
    .context("Failed to load feedback history")?;

    let relay = relay::from_config(&config.relay).context("Failed to create relay client")?;
    match &config.relay.endpoint {
        Some(endpoint) => info!("Relaying submissions to {}", endpoint),
        None => info!("No collector endpoint configured, submissions stay local"),
    }

    // The process exits right after a one-shot submit; a detached relay would be dropped
    let mode = match args.command {
        Command::Submit { .. } => RelayMode::Awaited,
        _ => config.relay.mode,
    };
    let pipeline = SubmissionPipeline::new(Arc::new(history), relay).with_mode(mode);

    let locale = match config.locale.as_deref() {
        Some(s) => s.parse::<Locale>().unwrap_or_else(|e| {
            warn!("{}, falling back to English labels", e);
            Locale::En
        }),
        None => Locale::En,
    };

    Ok(Runtime {
        config,
        root,
        pipeline: Arc::new(pipeline),
        locale,
    })
}

async fn serve(runtime: Runtime, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| runtime.config.server.host.clone());
    let port = port.unwrap_or(runtime.config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let state = AppState::new(
        runtime.pipeline.clone(),
        runtime.config.export.filename_prefix.clone(),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("bouquet-feedback listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn submit(
    runtime: Runtime,
    name: String,
    satisfied: &str,
    rating: u8,
    comment: String,
) -> Result<()> {
    let Some(answer) = Satisfaction::parse_localized(satisfied) else {
        bail!("--satisfied must be yes or no, got '{}'", satisfied);
    };

    let mut form = FormController::new(runtime.pipeline, runtime.locale);
    form.set_subject_name(name);
    form.set_satisfied(answer);
    form.set_rating(rating);
    form.set_comment(comment);
    let label = form.rating_label();

    match form.submit().await {
        SubmissionState::Submitted(outcome) => {
            println!("Thank you for your feedback!");
            println!(
                "  {} - {} ({}), submitted {}",
                outcome.record.subject_name,
                outcome.record.rating,
                label.unwrap_or_default(),
                outcome.record.submitted_at_string()
            );
            for warning in &outcome.warnings {
                println!("  warning ({}): {}", warning.kind(), warning);
            }
            Ok(())
        }
        SubmissionState::Failed(SubmitError::Validation(e)) => {
            for issue in &e.issues {
                println!("  {}: {}", issue.field(), issue);
            }
            bail!("Feedback not submitted");
        }
        SubmissionState::Failed(e) => bail!("Feedback not submitted: {}", e),
        SubmissionState::Editing | SubmissionState::Submitting => {
            bail!("Submission did not complete")
        }
    }
}

async fn history(runtime: Runtime) -> Result<()> {
    let records = runtime.pipeline.history().load().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&records).context("Failed to encode history")?
    );
    Ok(())
}

async fn export(runtime: Runtime, out: Option<PathBuf>) -> Result<()> {
    let export = export_history(
        runtime.pipeline.history(),
        &runtime.config.export.filename_prefix,
    )
    .await
    .context("Failed to build CSV export")?;

    let Some(export) = export else {
        println!("No feedback to export");
        return Ok(());
    };

    let dir = out.unwrap_or_else(|| runtime.root.export_dir(&runtime.config.export));
    let path = DirectorySink::new(dir)
        .deliver(&export)
        .context("Failed to write export")?;
    println!("Exported {} submissions to {}", export.rows, path.display());
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
