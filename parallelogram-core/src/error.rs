use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the parallelogram engine.
///
/// Per-chunk failures (`ChunkTimeout`, `ConnectFailure`, `DecodeFailure`) are
/// deliberately *not* surfaced through `Dispatcher::dispatch` — they are
/// absorbed into the round loop's blacklist-and-retry machinery and only
/// ever logged. They live here so every crate shares one vocabulary for
/// what went wrong with a given chunk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `p_reduce` was called with an empty input; a precondition violation
    /// surfaced directly to the caller.
    #[error("reduce requires a non-empty input")]
    EmptyInput,

    /// Discovery returned no workers and no previously known candidates
    /// remain. Callers of `Scheduler::assign` see this; `Dispatcher` treats
    /// it as the signal to fall back to local execution.
    #[error("no workers available")]
    NoWorkers,

    /// The worker has no handler registered under the request's name.
    #[error("unrecognized operation/handler: {0}")]
    UnknownOp(String),

    /// Shipping `fn_token` failed before any chunk was dispatched.
    #[error("failed to serialize function token: {0}")]
    SerializationFailure(#[from] serde_json::Error),

    /// Discovery (UDP probe/responder) failed outright. Stored as a
    /// rendered string rather than `#[from] parallelogram_discovery::Error`
    /// because `parallelogram-discovery` itself depends on this crate — a
    /// `#[from]` here would make that a cycle.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A single chunk's round-trip did not complete before its deadline.
    /// Non-fatal: the slot stays unfilled and the worker is blacklisted.
    #[error("chunk {0} timed out")]
    ChunkTimeout(u32),

    /// A single chunk's TCP connection could not be established or broke
    /// mid-transfer. Non-fatal, same handling as `ChunkTimeout`.
    #[error("chunk {0} connect failed: {1}")]
    ConnectFailure(u32, String),

    /// A single chunk's response envelope failed to decode. Non-fatal, same
    /// handling as `ChunkTimeout`.
    #[error("chunk {0} failed to decode response: {1}")]
    DecodeFailure(u32, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
