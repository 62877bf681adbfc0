use std::path::Path;

use crate::config::schema::FileSdConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileSdConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<FileSdConfig, ConfigError> {
    let config: FileSdConfig = serde_yaml::from_str(content)?;

    config.validate()?;

    Ok(config)
}
