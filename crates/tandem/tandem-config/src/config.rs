use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TandemConfig {
    /// Ring capacity in bytes.
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    /// Largest span requested per begin call.
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub write_bound: WriteBoundMode,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

/// Formula for wrapped write windows, see `tandem_ring::WriteBound`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteBoundMode {
    #[default]
    Contiguous,
    Observed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

mod defaults {
    pub fn capacity() -> usize {
        1 << 16 // 65536
    }

    pub fn chunk_size() -> usize {
        4096
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl Default for TandemConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            chunk_size: defaults::chunk_size(),
            write_bound: WriteBoundMode::default(),
            log_level: defaults::log_level(),
        }
    }
}

impl TandemConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_to_str)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: TandemConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be greater than 0".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be greater than 0".into()));
        }
        Ok(())
    }
}
