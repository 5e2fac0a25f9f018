use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

use crate::logging::{LogFormat, LogLevel, LogSettings};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // guild-scoped command registration

    // Logging
    pub log: LogSettings,

    // Search / selection
    pub search_results: usize,
    pub selection_ttl: Duration,
    pub selection_capacity: usize,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            guild_id: var("GUILD_ID")
                .map(|s| s.trim().parse())
                .transpose()
                .context("GUILD_ID must be a numeric guild id")?,

            log: LogSettings {
                level: var("LOG_LEVEL").unwrap_or_else(|| "info".into()).parse()?,
                format: var("LOG_FORMAT").unwrap_or_else(|| "text".into()).parse()?,
                timestamps: parse_switch(&var("LOG_TIMESTAMPS").unwrap_or_else(|| "on".into()))?,
                file: var("LOG_FILE")
                    .filter(|path| !path.trim().eq_ignore_ascii_case("none"))
                    .map(PathBuf::from),
            },

            search_results: var("SEARCH_RESULTS")
                .unwrap_or_else(|| "5".into())
                .trim()
                .parse()
                .context("SEARCH_RESULTS must be a number")?,
            selection_ttl: parse_seconds(&var("SELECTION_TTL").unwrap_or_else(|| "300".into()))
                .context("SELECTION_TTL must be seconds or a duration like `5m`")?,
            selection_capacity: var("SELECTION_CAPACITY")
                .unwrap_or_else(|| "1000".into())
                .trim()
                .parse()
                .context("SELECTION_CAPACITY must be a number")?,
            ytdlp_path: var("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".into()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the bot cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.search_results) {
            anyhow::bail!(
                "SEARCH_RESULTS must be between 1 and 10, got: {}",
                self.search_results
            );
        }

        if self.selection_capacity == 0 {
            anyhow::bail!("SELECTION_CAPACITY must be greater than 0");
        }

        if self.ytdlp_path.trim().is_empty() {
            anyhow::bail!("YTDLP_PATH must not be empty");
        }

        Ok(())
    }

    /// Token-free description for the startup log.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Logging: {:?} level, {:?} format, timestamps {}, output {}\n  \
            Search: {} results via {}\n  \
            Selections: {} max, expire after {}",
            self.guild_id
                .map_or("global".to_string(), |id| format!("for guild {id}")),
            self.log.level,
            self.log.format,
            if self.log.timestamps { "on" } else { "off" },
            self.log
                .file
                .as_ref()
                .map_or("stdout".to_string(), |p| p.display().to_string()),
            self.search_results,
            self.ytdlp_path,
            self.selection_capacity,
            humantime::format_duration(self.selection_ttl),
        )
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        other => anyhow::bail!("expected on/off, got `{other}`"),
    }
}

/// Plain seconds, or a humantime duration (`90s`, `5m`).
fn parse_seconds(value: &str) -> Result<Duration> {
    let value = value.trim();
    match value.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Ok(humantime::parse_duration(value)?),
    }
}
