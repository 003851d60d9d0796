//! Command-line entry point for the badge server.
//!
//! Settings are read from an optional YAML document and then overridden by
//! flags and environment variables before the HTTP server starts.

use std::{path::PathBuf, process, sync::Arc};

use clap::Parser;
use ghbadge::{
    BadgeService, Error, GitHubSource, MemoryCache, Settings, load_settings, serve,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve embeddable GitHub activity badges.
#[derive(Debug, Parser,)]
#[command(name = "ghbadge", version, about = "Serve embeddable GitHub activity badges")]
struct Cli
{
    /// Path to a YAML settings document.
    #[arg(long = "config", value_name = "PATH", env = "GHBADGE_CONFIG")]
    config: Option<PathBuf,>,

    /// Socket address to listen on.
    #[arg(long = "listen", value_name = "ADDR", env = "GHBADGE_LISTEN")]
    listen: Option<String,>,

    /// Token used for GitHub API requests.
    #[arg(long = "github-token", value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String,>,

    /// Alternative GitHub API root.
    #[arg(long = "api-base", value_name = "URL", env = "GHBADGE_API_BASE")]
    api_base: Option<String,>,
}

impl Cli
{
    /// Loads the settings document, if any, and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Propagates loading errors and validation failures of the merged result.
    fn settings(&self,) -> Result<Settings, Error,>
    {
        let mut settings = match &self.config {
            Some(path,) => load_settings(path,)?,
            None => Settings::default(),
        };

        if let Some(listen,) = &self.listen {
            settings.listen.clone_from(listen,);
        }
        if let Some(token,) = &self.github_token {
            settings.github_token = Some(token.clone(),);
        }
        if let Some(base,) = &self.api_base {
            settings.api_base = Some(base.clone(),);
        }

        settings.validate()?;
        Ok(settings,)
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),
        )
        .init();

    if let Err(error,) = run(Cli::parse(),).await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Builds the service from CLI settings and serves until Ctrl-C.
///
/// # Errors
///
/// Propagates configuration, client initialization and bind failures.
async fn run(cli: Cli,) -> Result<(), Error,>
{
    let settings = cli.settings()?;
    let address = settings.listen_addr()?;

    if settings.github_token.is_none() {
        warn!("No GitHub token configured, requests are subject to anonymous rate limits");
    }

    let source = GitHubSource::new(settings.github_token.as_deref(), settings.api_base.as_deref(),)?;
    let cache = Arc::new(MemoryCache::new(
        settings.cache.max_entries,
        settings.cache.max_item_bytes,
    ),);
    let service = Arc::new(BadgeService::new(cache, source, &settings.badge,),);

    let listener = TcpListener::bind(address,).await.map_err(|source| Error::Bind {
        address: address.to_string(),
        source,
    },)?;
    info!("Listening on http://{}", address);

    serve(listener, service, async {
        if let Err(error,) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", error);
            std::future::pending::<(),>().await;
        }
    },)
    .await
}
