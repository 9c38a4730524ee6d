// Logging for the admin commands, on tracing-subscriber.
//
// Library crates log through the `log` facade; `tracing_log::LogTracer` routes
// those records into the subscriber installed here.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use lineage_configs::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// timestamp LEVEL target - message
    Compact,
    /// JSON Lines
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Base level, quieted dependencies, then per-target overrides from config.
pub fn build_env_filter(level: &str, target_levels: &HashMap<String, String>) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[("sqlparser", "warn"), ("rusqlite", "warn")];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    // Sorted so the resulting filter does not depend on map order.
    let mut overrides: Vec<_> = target_levels.iter().collect();
    overrides.sort();
    for (target, lvl) in overrides {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Install the global subscriber: an optional stderr layer and an optional file layer.
///
/// `verbose` raises the base level to `debug`.
pub fn init_logging(settings: &LoggingSettings, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { settings.level.as_str() };
    let format = LogFormat::parse(&settings.format);

    tracing_log::LogTracer::init().ok();

    let console_layer = if settings.log_to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(build_env_filter(level, &settings.targets)?),
        )
    } else {
        None
    };

    let file_layer: Option<Box<dyn Layer<Registry> + Send + Sync>> = match &settings.file_path {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                fs::create_dir_all(parent)?;
            }
            let log_file = OpenOptions::new().create(true).append(true).open(file_path)?;
            let filter = build_env_filter(level, &settings.targets)?;
            let layer = match format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(log_file)
                    .with_target(true)
                    .with_filter(filter)
                    .boxed(),
                LogFormat::Compact => tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(log_file)
                    .with_target(true)
                    .with_filter(filter)
                    .boxed(),
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={:?}",
        level,
        settings.log_to_console,
        settings.file_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("jsonl"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_filter_accepts_overrides() {
        let mut targets = HashMap::new();
        targets.insert("lineage_core::tagger".to_string(), "trace".to_string());
        let filter = build_env_filter("info", &targets).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("lineage_core::tagger=trace"));
        assert!(rendered.contains("sqlparser=warn"));
    }

    #[test]
    fn test_filter_rejects_garbage() {
        let mut targets = HashMap::new();
        targets.insert("lineage".to_string(), "loud!".to_string());
        assert!(build_env_filter("info", &targets).is_err());
    }
}
