#![warn(rust_2018_idioms)]

//! UDP multicast peer discovery for the `parallelogram` engine: the
//! client-side probe (§4.4) and the worker-side responder (§4.5).

pub mod client;
pub mod error;
pub mod responder;

pub use client::discover;
pub use error::{Error, Result};
pub use responder::run_responder;
