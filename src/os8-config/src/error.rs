use std::io::Error as IoError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] IoError),
    #[error("no token found at {0}")]
    NoToken(String),
}
