use thiserror::Error;

/// Why a run could not be started or observed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("command channel is not connected")]
    NotConnected,
    #[error("interpreter is already running")]
    AlreadyRunning,
    #[error("run task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot parse timing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid timing config: {0}")]
    Invalid(String),
}
