#![warn(rust_2018_idioms)]

//! Data model, wire codec, local executors, and handler registry shared by
//! the discovery, worker, and dispatcher crates of the `parallelogram`
//! distributed map/filter/reduce engine.

pub mod chunk;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executors;
pub mod registry;
pub mod worker_record;

pub use chunk::{chunk_data, Chunk};
pub use config::EngineConfig;
pub use envelope::{FnToken, Operation, Request, Response};
pub use error::{Error, Result};
pub use registry::HandlerRegistry;
pub use worker_record::WorkerRecord;
