use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Vision error: {0}")]
    Vision(String),
}

pub type Result<T> = std::result::Result<T, Error>;
