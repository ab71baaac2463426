// Tracing setup for embedding hosts whose terminal or UI must stay clean.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

pub const LOG_FILE_NAME: &str = "talia-client.log";

const DEFAULT_FILTER: &str = "talia_client=info,talia_core=info,warn";

/// Initialize tracing to log to `<log_dir>/talia-client.log`.
///
/// `RUST_LOG` overrides the default filter. Returns the log file path.
pub fn init_tracing(log_dir: &Path) -> anyhow::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_to_log_file_and_refuses_second_install() {
        let dir = std::env::temp_dir().join("talia_logging_test");
        let _ = std::fs::remove_dir_all(&dir);

        let path = init_tracing(&dir).expect("first install succeeds");
        assert!(path.exists());
        tracing::warn!("logging smoke test");

        assert!(init_tracing(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
