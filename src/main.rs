use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casebook::config::Config;
use casebook::store::SqliteStore;
use casebook::{api, mcp, Repository};

#[derive(Parser)]
#[command(name = "casebook")]
#[command(about = "Hierarchical test-artifact repository for AI-assisted test generation")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API (defaults to CASEBOOK_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start MCP server via stdio
    Mcp,
    /// Print a project as an ASCII tree
    Tree {
        project_id: String,
    },
    /// Print project statistics as JSON
    Stats {
        project_id: String,
    },
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "casebook=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // stdout carries the MCP protocol
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_repository(config: &Config) -> anyhow::Result<Repository> {
    let store = match &config.database_path {
        Some(path) => SqliteStore::open(path.clone())?,
        None => SqliteStore::open_default()?,
    };
    store.migrate()?;
    Ok(Repository::with_retry(store, config.retry.clone()))
}

async fn serve(config: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting casebook server on port {}", port);

    let repo = open_repository(&config)?;
    let app = api::create_router_with_cors(repo, config.cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("casebook server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Everything but `serve` writes its output to stdout
    let use_stderr = !matches!(cli.command, None | Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let config = Config::from_env();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            serve(config, port).await?;
        }
        Some(Commands::Mcp) => {
            let repo = open_repository(&config)?;
            mcp::run_stdio_server(repo).await?;
        }
        Some(Commands::Tree { project_id }) => {
            let repo = open_repository(&config)?;
            let project = repo.get_project(&project_id)?;
            print!("{}", mcp::tree_render::render_project(&project));
        }
        Some(Commands::Stats { project_id }) => {
            let repo = open_repository(&config)?;
            let stats = repo.statistics(&project_id)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        None => {
            let port = config.port;
            serve(config, port).await?;
        }
    }

    Ok(())
}
