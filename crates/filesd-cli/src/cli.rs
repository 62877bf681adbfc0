use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use filesd::config::DEFAULT_REFRESH_INTERVAL;
use filesd::{load_config, FileSdConfig};

#[derive(Debug, Parser)]
#[command(name = "filesd")]
#[command(version, about = "Discover scrape targets from JSON and YAML files", long_about = None)]
#[command(after_help = "Target group updates are written to stdout, one JSON array per line.

EXAMPLES:
    # Watch every JSON file in a directory
    filesd --file '/etc/targets/*.json'

    # Load patterns and interval from a config file
    filesd --config filesd.yml")]
pub struct Args {
    /// YAML config file with `files` and `refresh_interval`
    #[arg(short, long, env = "FILESD_CONFIG", conflicts_with = "files")]
    pub config: Option<PathBuf>,

    /// File pattern to watch (repeatable)
    #[arg(short = 'f', long = "file", value_name = "PATTERN")]
    pub files: Vec<String>,

    /// Interval between full rereads when no --config is given
    #[arg(long, value_parser = humantime::parse_duration)]
    pub refresh_interval: Option<Duration>,

    /// Interval between metrics dumps to the log, 0 disables them
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1m")]
    pub metrics_interval: Duration,

    /// Capacity of the update channel
    #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u16).range(1..))]
    pub channel_capacity: u16,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Builds the discovery config from either the config file or the flags.
    pub fn discovery_config(&self) -> filesd::Result<FileSdConfig> {
        if let Some(path) = &self.config {
            let mut config = load_config(path)?;
            if let Some(interval) = self.refresh_interval {
                config.refresh_interval = interval;
                config.validate()?;
            }
            return Ok(config);
        }

        let config = FileSdConfig::new(
            self.files.iter().cloned(),
            self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
        );
        config.validate()?;
        Ok(config)
    }
}
