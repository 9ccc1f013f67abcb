use clap::{Parser, Subcommand, ValueEnum};
use imgrab::prelude::*;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgrab")]
#[command(about = "Search images through SerpApi and store them in a database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true, help = "SerpApi API key")]
    pub api_key: Option<String>,

    #[arg(long, env = "SERPAPI_ENDPOINT", default_value = DEFAULT_ENDPOINT, help = "Search endpoint URL")]
    pub endpoint: String,

    #[arg(long, env = "DATABASE_URL", hide_env_values = true, help = "Database connection URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_PORT", help = "Database port; re-prompted when not a number")]
    pub db_port: Option<String>,

    #[arg(long, env = "DB_NAME", help = "Database name (file path for SQLite)")]
    pub db_name: Option<String>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, value_enum, default_value_t = Variant::Thumbnail, help = "Which image URL to download")]
    pub variant: Variant,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..), help = "Image download timeout in seconds")]
    pub timeout_secs: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single search and exit.
    Harvest {
        #[arg(help = "Search term")]
        query: String,

        #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(0..=100), help = "Maximum number of images")]
        max: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Variant {
    Thumbnail,
    Original,
}

impl From<Variant> for ImageVariant {
    fn from(value: Variant) -> Self {
        match value {
            Variant::Thumbnail => ImageVariant::Thumbnail,
            Variant::Original => ImageVariant::Original,
        }
    }
}

impl Cli {
    fn database_settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.database_url.clone(),
            host: self.db_host.clone(),
            port: self.db_port.clone(),
            name: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) => tracing::debug!(error = %e, "no .env loaded"),
    }

    let mut console = Console::stdio();
    console
        .say("This tool searches for images on Google and stores them in a database.")
        .await?;

    let target = cli.database_settings().resolve(&mut console).await?;
    let database = Database::connect(&target).await?;

    let result = run(&cli, &mut console, database.clone()).await;
    database.close().await;

    result
}

async fn run<R, W>(
    cli: &Cli,
    console: &mut Console<R, W>,
    database: Database,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let api_key = resolve_api_key(cli.api_key.clone(), console).await?;
    let harvester = Harvester {
        search: SearchClient::new(api_key)?
            .with_endpoint(cli.endpoint.clone())
            .with_variant(cli.variant.into()),
        fetcher: Fetcher::new(Duration::from_secs(cli.timeout_secs))?,
        database,
    };

    match &cli.command {
        Some(Commands::Harvest { query, max }) => {
            let report = HarvestCommand::new(query)
                .with_max_results(*max as usize)
                .execute(&harvester)
                .await?;

            print_report(console, &report).await?;
        }
        None => {
            let summary = session::run(console, &harvester).await?;

            console
                .say(format!(
                    "Bye: {} queries, {} images stored, {} skipped.",
                    summary.queries, summary.stored, summary.skipped
                ))
                .await?;
        }
    }

    Ok(())
}
