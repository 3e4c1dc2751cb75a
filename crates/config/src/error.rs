#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("failed to parse workflow document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0}")]
    Validation(String),

    #[error("unbalanced braces in path list: {0:?}")]
    UnbalancedBraces(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
