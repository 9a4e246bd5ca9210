#![warn(rust_2018_idioms)]

//! The worker side of the `parallelogram` engine: a long-lived `Server`
//! that joins multicast discovery, accepts chunks over TCP, and executes
//! registered handlers against them (§4.8).

pub mod error;
pub mod queue;
pub mod server;

pub use error::{Error, Result};
pub use queue::ChunkQueue;
pub use server::Server;
