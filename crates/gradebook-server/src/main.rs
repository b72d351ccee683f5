//! gradebook server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid by
//! `GRADEBOOK_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP until interrupted.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3333
//! store_path = "~/.local/share/gradebook/gradebook.sqlite3"
//! jwt_secret = "change-me"
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use gradebook_api::{AppState, ServerConfig};
use gradebook_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Academic gradebook server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("GRADEBOOK").try_parsing(true))
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig (is jwt_secret set?)")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  tracing::info!(path = ?store_path, "store opened");

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = gradebook_api::router(AppState::new(Arc::new(store), server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relative_paths_are_untouched() {
    assert_eq!(expand_tilde(Path::new("gradebook.sqlite3")), PathBuf::from("gradebook.sqlite3"));
  }

  #[test]
  fn defaults_fill_everything_but_the_secret() {
    let settings = config::Config::builder()
      .set_override("jwt_secret", "s3cret")
      .unwrap()
      .build()
      .unwrap();
    let cfg: ServerConfig = settings.try_deserialize().unwrap();
    assert_eq!(cfg.port, 3333);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.token_ttl_hours, 24);
    assert_eq!(cfg.request_timeout_secs, 10);

    let missing = config::Config::builder().build().unwrap();
    assert!(missing.try_deserialize::<ServerConfig>().is_err());
  }
}
