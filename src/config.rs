//! Connection and credential settings.
//!
//! The binary fills [`DatabaseSettings`] and the API key from flags, the
//! environment and `.env`. Whatever is still missing is asked for on the
//! console before the session starts.

use crate::console::Console;
use crate::dialect::{CurrentDialect, Dialect};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Database settings as collected from flags and environment; any field may be absent.
#[derive(Debug, Clone, Default)]
pub struct DatabaseSettings {
    /// A complete connection URL. When set, the individual parts are ignored.
    pub url: Option<String>,
    pub host: Option<String>,
    /// Unparsed, so a bad value is re-prompted like a bad answer.
    pub port: Option<String>,
    /// Database name; the file path for SQLite.
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Where to connect, once every required value is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Url(String),
    Params(DatabaseParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseParams {
    pub name: String,
    /// Present for networked backends only.
    pub server: Option<ServerParams>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl DatabaseSettings {
    /// Completes the settings for the compiled-in database backend,
    /// prompting for every missing value.
    pub async fn resolve<R, W>(
        self,
        console: &mut Console<R, W>,
    ) -> Result<DatabaseTarget, ConfigError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.resolve_for(CurrentDialect::NETWORKED, console).await
    }

    async fn resolve_for<R, W>(
        self,
        networked: bool,
        console: &mut Console<R, W>,
    ) -> Result<DatabaseTarget, ConfigError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(url) = self.url.filter(|url| !url.trim().is_empty()) {
            return Ok(DatabaseTarget::Url(url));
        }

        if !networked {
            let name = required(console, self.name, "Please enter database file: ", "database name").await?;
            return Ok(DatabaseTarget::Params(DatabaseParams { name, server: None }));
        }

        let host = required(console, self.host, "Please enter host: ", "database host").await?;
        let name = required(console, self.name, "Please enter database name: ", "database name").await?;
        let user = required(console, self.user, "Please enter database user name: ", "database user").await?;
        let password = required(
            console,
            self.password,
            "Please enter database user password: ",
            "database password",
        )
        .await?;
        let port = ask_port(console, self.port).await?;

        Ok(DatabaseTarget::Params(DatabaseParams {
            name,
            server: Some(ServerParams {
                host,
                port,
                user,
                password,
            }),
        }))
    }
}

/// Returns the configured search API key, asking for it when absent.
///
/// An empty answer is returned as-is; the search client rejects it.
pub async fn resolve_api_key<R, W>(
    current: Option<String>,
    console: &mut Console<R, W>,
) -> Result<String, ConfigError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    required(
        console,
        current,
        "Please enter your SerpApi API key: ",
        "search API key",
    )
    .await
}

async fn required<R, W>(
    console: &mut Console<R, W>,
    current: Option<String>,
    prompt: &str,
    what: &'static str,
) -> Result<String, ConfigError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    console
        .value_or_ask(current, prompt)
        .await?
        .map(|value| value.trim().to_string())
        .ok_or(ConfigError::InputClosed { what })
}

async fn ask_port<R, W>(
    console: &mut Console<R, W>,
    mut current: Option<String>,
) -> Result<u16, ConfigError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let raw = required(
            console,
            current.take(),
            "Please enter database port: ",
            "database port",
        )
        .await?;
        match raw.parse::<u16>() {
            Ok(port) => return Ok(port),
            Err(_) => console.say(format!("Invalid port: {raw}")).await?,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Input ended before a required value was provided.
    #[error("input closed while asking for the {what}")]
    InputClosed { what: &'static str },

    #[error("console I/O failed")]
    Io(#[from] std::io::Error),
}
