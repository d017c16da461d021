mod config;
mod error;

pub use self::config::*;
pub use self::error::ConfigError;
