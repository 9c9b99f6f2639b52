use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::AppConfig;

const LOG_FILE_PREFIX: &str = "keysplit.log";

/// Where keysplit logs go and how much of it
///
/// Command output owns stdout, so logs always go to stderr, plus a daily
///  rolling file when a log directory is configured. `RUST_LOG` overrides
///  the level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            dir: None,
        }
    }
}

impl LogSettings {
    /// Unknown level names fall back to `warn`
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            level: Level::from_str(&config.log_level).unwrap_or(Level::WARN),
            dir: config.log_dir.clone(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.into())
            .from_env_lossy()
    }

    /// Install the global subscriber and route panics through it
    ///
    /// The returned guards flush buffered lines when dropped.
    pub fn init(self) -> Vec<WorkerGuard> {
        let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
        let mut guards = vec![stderr_guard];

        let stderr_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(stderr_writer)
            .with_filter(self.filter());

        let file_layer = self.dir.as_ref().and_then(|dir| {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: not logging to {}: {}", dir.display(), e);
                return None;
            }
            let (file_writer, file_guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
            guards.push(file_guard);

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_filter(self.filter()),
            )
        });

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .init();

        std::panic::set_hook(Box::new(|panic| {
            let location = panic.location();
            tracing::error!(
                panic.file = location.map(|l| l.file()),
                panic.line = location.map(|l| l.line()),
                "{}",
                panic
            );
        }));

        guards
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = AppConfig {
            log_level: "debug".to_string(),
            log_dir: Some(PathBuf::from("/var/log/keysplit")),
            ..Default::default()
        };
        let settings = LogSettings::from_config(&config);
        assert_eq!(settings.level, Level::DEBUG);
        assert_eq!(settings.dir, Some(PathBuf::from("/var/log/keysplit")));

        assert_eq!(
            LogSettings::from_config(&AppConfig::default()),
            LogSettings::default()
        );
    }

    #[test]
    fn test_unknown_level_falls_back_to_warn() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert_eq!(LogSettings::from_config(&config).level, Level::WARN);
    }
}
