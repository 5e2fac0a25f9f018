use anyhow::Result;
use std::{fs::OpenOptions, path::PathBuf, str::FromStr, sync::Mutex};
use tracing::warn;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Verbosity preset for this crate. `RUST_LOG` wins when it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    /// Warnings and errors only.
    Prod,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "guild_jukebox=debug,serenity=info,songbird=info",
            Self::Info => "guild_jukebox=info,serenity=warn,songbird=warn",
            Self::Prod => "warn",
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "prod" | "warn" => Ok(Self::Prod),
            other => anyhow::bail!("unknown log level `{other}` (expected debug, info or prod)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, colored when writing to a terminal.
    #[default]
    Text,
    /// Human readable without ANSI colors.
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format `{other}` (expected text, plain or json)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Append to this file instead of stdout.
    pub file: Option<PathBuf>,
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.directive()));

    let mut file_error = None;
    let writer = match &settings.file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(BoxMakeWriter::new(Mutex::new(file))),
            Err(e) => {
                file_error = Some((path.clone(), e));
                None
            }
        },
        None => None,
    };
    let to_file = writer.is_some();
    let writer = writer.unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout));

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(settings.format == LogFormat::Text && !to_file);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (settings.format, settings.timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (_, true) => layer.boxed(),
        (_, false) => layer.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()?;

    if let Some((path, e)) = file_error {
        warn!(path = %path.display(), error = %e, "⚠️ Could not open log file, logging to stdout");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("prod".parse::<LogLevel>().unwrap(), LogLevel::Prod);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Prod);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn prod_only_lets_warnings_through() {
        assert_eq!(LogLevel::Prod.directive(), "warn");
        assert!(LogLevel::Debug.directive().contains("guild_jukebox=debug"));
    }

    #[test]
    fn formats_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Plain ".parse::<LogFormat>().unwrap(), LogFormat::Plain);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
