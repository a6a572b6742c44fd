use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use project_cost::api::{self, AppState};
use project_cost::config::Config;
use project_cost::estimator::Estimator;
use project_cost::models::PredictInput;
use project_cost::report;
use project_cost::sessions::SessionStore;

#[derive(Parser)]
#[command(name = "pcost")]
#[command(about = "Predict project cost from ticket records")]
struct Cli {
    /// Directory holding model.json and the lookup artifacts.
    ///
    /// Overrides PROJECT_COST_ARTIFACTS and the config file. Without any of
    /// these, ./artifacts is used when it exists, else the user data directory.
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for HTTP API
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List selectable clients
    Clients,
    /// List selectable line items
    LineItems,
    /// Predict a project described in a JSON file ({"client": ..., "tickets": [...]})
    Predict {
        #[arg(long)]
        project: PathBuf,

        /// Print the full report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Initialize tracing on stderr so stdout stays clean for command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "project_cost=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: &Config, estimator: Estimator) -> anyhow::Result<()> {
    let sessions = SessionStore::with_idle_timeout(config.session_idle_timeout());
    let app = api::create_router(AppState::with_sessions(estimator, sessions));

    let addr = (config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        "Project cost server listening on http://{}:{}",
        config.bind,
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load();
    if let Some(dir) = cli.artifacts {
        config.artifacts_dir = dir;
    }

    // Missing or corrupt artifacts are fatal: never serve from a partial store.
    let estimator = Estimator::load(&config.artifacts_dir).with_context(|| {
        format!(
            "Failed to load artifacts from {}",
            config.artifacts_dir.display()
        )
    })?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            serve(&config, estimator).await?;
        }
        Some(Commands::Clients) => {
            for client in estimator.known_clients() {
                println!("{}", client);
            }
        }
        Some(Commands::LineItems) => {
            for item in estimator.known_line_item_categories() {
                println!("{}", item);
            }
        }
        Some(Commands::Predict { project, json }) => {
            let content = std::fs::read_to_string(&project)
                .with_context(|| format!("Failed to read {}", project.display()))?;
            let input: PredictInput = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", project.display()))?;

            let prediction = estimator.predict_input(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print!("{}", report::render_text(&prediction));
            }
        }
        None => {
            serve(&config, estimator).await?;
        }
    }

    Ok(())
}
