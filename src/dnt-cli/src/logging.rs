//! Log subscriber setup
//!
//! Console output goes to stderr. An optional log file receives the same
//! events without ANSI colours.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Default filter for a `-v` count; `RUST_LOG` takes precedence
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "dnt=info",
        1 => "dnt=debug",
        _ => "dnt=trace",
    }
}

/// Build the subscriber; the caller decides how long it stays installed
pub fn subscriber(verbose: u8, log_file: Option<&Path>) -> Result<impl Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "dnt=info");
        assert_eq!(default_directive(1), "dnt=debug");
        assert_eq!(default_directive(5), "dnt=trace");
    }

    #[test]
    fn test_log_file_receives_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dnt.log");

        let subscriber = subscriber(0, Some(&path)).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "dnt::test", "hello from test");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("hello from test"));
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("dnt.log");
        assert!(subscriber(0, Some(&path)).is_err());
    }
}
