use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crm_graphql::config::{Config, DEFAULT_CONFIG_PATH};
use crm_graphql::graphql::create_schema;
use crm_graphql::storage::{InMemoryStorage, SqliteStorage, Storage};
use crm_graphql::tasks::{generate_crm_report, run_periodic, ReportSource, RetryPolicy};
use crm_graphql::{logging, metrics, server};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "crm_graphql")]
#[command(about = "CRM GraphQL backend and report worker")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the rolling JSON log
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the GraphQL API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Keep data in memory instead of the SQLite database
        #[arg(long)]
        in_memory: bool,
        /// Run the periodic report job alongside the server
        #[arg(long)]
        with_worker: bool,
        /// Address for the Prometheus scrape endpoint
        #[arg(long)]
        metrics_addr: Option<SocketAddr>,
    },
    /// Generate one report line and exit
    Report {
        /// GraphQL endpoint to query instead of the local database
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Run the report job on its configured interval
    Worker {
        /// GraphQL endpoint to query instead of the local database
        #[arg(long)]
        endpoint: Option<String>,
        /// Seconds between runs (overrides config)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn open_storage(config: &Config, in_memory: bool) -> Result<Arc<dyn Storage>> {
    if in_memory {
        info!("Using in-memory storage");
        return Ok(Arc::new(InMemoryStorage::new()));
    }
    let path = &config.database.path;
    let storage = SqliteStorage::open(path)
        .with_context(|| format!("opening database at {}", path.display()))?;
    info!("Using SQLite database at {}", path.display());
    Ok(Arc::new(storage))
}

fn report_source(config: &Config, endpoint: Option<String>) -> Result<ReportSource> {
    match endpoint.or_else(|| config.report.endpoint.clone()) {
        Some(endpoint) => Ok(ReportSource::http(endpoint, config.report.request_timeout())?),
        None => {
            let storage = open_storage(config, false)?;
            Ok(ReportSource::InProcess(create_schema(storage)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = logging::init_logging(&cli.log_dir);

    let mut config = Config::load_from(&cli.config).context("loading configuration")?;

    match cli.command {
        Commands::Serve {
            port,
            in_memory,
            with_worker,
            metrics_addr,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let metrics_addr = match metrics_addr {
                Some(addr) => Some(addr),
                None => config
                    .server
                    .metrics_addr
                    .as_deref()
                    .map(str::parse::<SocketAddr>)
                    .transpose()
                    .context("parsing metrics address")?,
            };
            if let Some(addr) = metrics_addr {
                metrics::init(addr).map_err(|e| anyhow::anyhow!("{e}"))?;
            }

            let storage = open_storage(&config, in_memory)?;
            let schema = create_schema(storage);

            let worker = if with_worker {
                let (stop_tx, stop_rx) = oneshot::channel::<()>();
                let handle = tokio::spawn(run_periodic(
                    ReportSource::InProcess(schema.clone()),
                    config.report.log_path.clone(),
                    RetryPolicy::from(&config.report),
                    config.report.interval(),
                    async move {
                        let _ = stop_rx.await;
                    },
                ));
                Some((stop_tx, handle))
            } else {
                None
            };

            let served = server::start_server(schema, config.server.port, shutdown_signal()).await;

            if let Some((stop_tx, handle)) = worker {
                let _ = stop_tx.send(());
                if let Err(e) = handle.await {
                    error!("Report worker panicked: {}", e);
                }
            }
            served.map_err(|e| anyhow::anyhow!("server error: {e}"))?;
        }
        Commands::Report { endpoint } => {
            let source = report_source(&config, endpoint)?;
            let outcome = generate_crm_report(
                &source,
                &config.report.log_path,
                &RetryPolicy::from(&config.report),
            )
            .await;
            match &outcome.error {
                None => println!("Report written to {}", config.report.log_path.display()),
                Some(e) => println!("Report failed: {}", e),
            }
        }
        Commands::Worker {
            endpoint,
            interval_secs,
        } => {
            if let Some(secs) = interval_secs {
                config.report.interval_secs = secs;
            }
            let source = report_source(&config, endpoint)?;
            run_periodic(
                source,
                config.report.log_path.clone(),
                RetryPolicy::from(&config.report),
                config.report.interval(),
                shutdown_signal(),
            )
            .await;
        }
    }
    Ok(())
}
