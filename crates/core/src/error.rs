use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid task '{name}': {reason}")]
    InvalidTask { name: String, reason: String },

    #[error("task '{0}' not found")]
    UnknownTask(String),
}
