use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static EXE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
});

pub fn exe_dir() -> PathBuf {
    EXE_DIR.clone()
}

/// Logs to stdout and, when the directory is writable, to `log.txt` next to the
/// executable. Keep the returned guard alive or buffered file lines are lost on exit.
pub fn init() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("log.txt")
        .build(exe_dir());

    let (file_layer, guard, file_err) = match file_appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    if let Err(e) = result {
        eprintln!("logger already initialised: {}", e);
    }

    tracing::info!("===== routrans start =====");
    if let Some(e) = file_err {
        tracing::warn!("file logging disabled: {}", e);
    }
    guard
}
