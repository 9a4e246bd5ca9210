#![warn(rust_2018_idioms)]

//! `parallelogram`: a small distributed compute library that parallelizes
//! map, filter, and reduce over chunks of a sequence, discovering worker
//! peers on the local network via multicast and dispatching chunks to the
//! least-loaded ones (see `SPEC_FULL.md`).
//!
//! Re-exports the sub-crates the way `webrtc`'s `src/lib.rs` re-exports
//! `mdns`, `util`, and friends.

pub use parallelogram_core as core;
pub use parallelogram_discovery as discovery;
pub use parallelogram_worker as worker;

pub mod api;
pub mod dispatcher;
pub mod scheduler;

pub use api::{p_filter, p_map, p_reduce};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use parallelogram_core::{EngineConfig, Error, FnToken, HandlerRegistry, Operation, Result};
pub use parallelogram_worker::Server;
