mod config;

pub use config::{ConfigError, TandemConfig, WriteBoundMode};
