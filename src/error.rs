use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("scheme must not be empty")]
    EmptyScheme,
    #[error("invalid scheme letter {0:?}")]
    UnknownLabel(char),
    #[error("scheme needs {0} distinct letters, more than the alphabet holds")]
    AlphabetExhausted(usize),
    #[error("scheme covers {actual} weights, network has {expected}")]
    SchemeLength { expected: usize, actual: usize },
    #[error("input has {actual} values, network expects {expected}")]
    InputLength { expected: usize, actual: usize },
    #[error("invalid topology: {0}")]
    Topology(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("could not parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
