use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("discovery: failed to join multicast group")]
    JoinMulticastGroup,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
