use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("server is already started")]
    AlreadyStarted,
    #[error("discovery error: {0}")]
    Discovery(#[from] parallelogram_discovery::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
