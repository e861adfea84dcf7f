//! Tracing setup: human-readable logs on stderr, optionally mirrored to a file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over `level` when set.
pub fn init(level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = level.parse::<tracing::Level>().map_or_else(|_| "info".to_string(), |l| l.to_string().to_lowercase());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).without_time().with_target(false);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).with_target(false))
        }
        None => None,
    };

    tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).try_init()?;
    Ok(())
}
