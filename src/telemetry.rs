use std::{fs::OpenOptions, path::Path, sync::Mutex};

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// With `log_file` set, events are appended to that file without ANSI colors,
/// which keeps them off a terminal UI's screen.
pub fn init(filter: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let installed = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
