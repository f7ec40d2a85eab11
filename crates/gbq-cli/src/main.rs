use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gbq_catalog::{BigQueryWarehouse, Warehouse};
use gbq_core::{ArgumentError, Config, ProjectId, PROJECT_ENV};
use gbq_engine::{ExploreRequest, Session, TabledRenderer};

/// gbq-analyzer - Explore and query BigQuery from the terminal
#[derive(Parser)]
#[command(name = "gbq-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Google Cloud project (default: GBQ_PROJECT, then `project` in gbq.toml)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Path to config file (default: gbq.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse datasets, tables and table schemas
    ///
    /// Without a project the public catalog (bigquery-public-data) is shown.
    Explore {
        /// [dataset] [table]
        args: Vec<String>,

        /// Also print sample rows when describing a table (needs a project)
        #[arg(short, long)]
        sample: bool,
    },

    /// Run a SQL query and print the first rows
    Query {
        /// SQL to execute
        sql: String,

        /// Maximum rows to print (default: query_limit from config)
        #[arg(short, long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },

    /// Check that BigQuery is reachable with the current credentials
    Test,

    /// Describe and profile a table
    Analyze {
        /// Table as dataset.table
        table: String,

        /// Also print sample rows
        #[arg(short, long)]
        sample: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // A missing .env is not an error
    dotenvy::dotenv().ok();

    let config = load_config(cli.config.as_deref(), cli.verbose)?.with_env_overrides();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(execute(cli, config))
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new("gbq.toml").exists() {
        Config::from_file(Path::new("gbq.toml"))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };
    Ok(config)
}

async fn execute(cli: Cli, config: Config) -> Result<()> {
    let warehouse: Arc<dyn Warehouse> = Arc::new(match &config.credentials {
        Some(key_path) => BigQueryWarehouse::from_service_account_file(key_path),
        None => BigQueryWarehouse::with_adc(),
    });

    let project = config
        .project_or(cli.project.as_deref())
        .map(ProjectId::new)
        .transpose()?;

    if cli.verbose {
        match &project {
            Some(p) => eprintln!("{} {}", "Using project:".cyan(), p),
            None => eprintln!("{}", "No project set, exploring public datasets".cyan()),
        }
    }

    let mut renderer = TabledRenderer::new();
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Explore { args, sample } => {
            let request = ExploreRequest::from_args(project.is_some(), &args)?;
            let session =
                open_session(warehouse, project.unwrap_or_else(ProjectId::public_data)).await?;
            let sample_rows = sample.then_some(config.sample_rows);

            let result = session
                .explore(&request, sample_rows, &mut renderer, &mut out)
                .await;
            session.close();
            result?;
        }
        Commands::Query { sql, limit } => {
            let session = open_session(warehouse, require_project(project)?).await?;
            let limit = limit.unwrap_or(config.query_limit);

            let result = session.query(&sql, limit, &mut renderer, &mut out).await;
            session.close();
            result?;
        }
        Commands::Test => {
            let session = open_session(warehouse, require_project(project)?).await?;

            let result = session.test_connection(&mut out).await;
            session.close();
            result?;
        }
        Commands::Analyze { table, sample } => {
            let session = open_session(warehouse, require_project(project)?).await?;
            let sample_rows = sample.then_some(config.sample_rows);

            let result = session
                .analyze(&table, sample_rows, &mut renderer, &mut out)
                .await;
            session.close();
            result?;
        }
    }

    Ok(())
}

/// Open a session and cancel it on Ctrl-C
async fn open_session(warehouse: Arc<dyn Warehouse>, project: ProjectId) -> Result<Session> {
    tracing::debug!(project = %project, "connecting");
    let session = Session::open(warehouse, project).await?;

    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    Ok(session)
}

fn require_project(project: Option<ProjectId>) -> Result<ProjectId, ArgumentError> {
    project.ok_or_else(|| {
        ArgumentError::Missing(format!(
            "this command needs a project: pass --project or set {}",
            PROJECT_ENV
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_query_with_negative_limit() {
        let cli = Cli::try_parse_from(["gbq-analyzer", "query", "SELECT 1", "-l", "-1"]).unwrap();
        match cli.command {
            Commands::Query { sql, limit } => {
                assert_eq!(sql, "SELECT 1");
                assert_eq!(limit, Some(-1));
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn parse_explore_global_project() {
        let cli = Cli::try_parse_from([
            "gbq-analyzer",
            "explore",
            "sales",
            "orders",
            "--sample",
            "-p",
            "my-proj",
        ])
        .unwrap();
        assert_eq!(cli.project.as_deref(), Some("my-proj"));
        match cli.command {
            Commands::Explore { args, sample } => {
                assert_eq!(args, vec!["sales", "orders"]);
                assert!(sample);
            }
            _ => panic!("expected explore command"),
        }
    }

    #[test]
    fn missing_project_is_argument_error() {
        let err = require_project(None).unwrap_err();
        assert!(err.to_string().contains("--project"));
        assert!(err.to_string().contains(PROJECT_ENV));
    }
}
