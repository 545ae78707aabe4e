//! Core implementation of the Valkey/Redis client: the RESP3 wire codec,
//! typed commands, connection and subscription management, pooling,
//! retry/redirect handling and cluster topology tracking.
//!
//! Do not depend on this crate directly; use `valkeyclient`, which wraps it
//! in the facade most applications want.
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
extern crate log;

pub mod command;
pub mod conn;
pub mod error;
pub mod pool;
pub mod resp;
pub mod retry;
pub mod topology;
pub mod util;

pub use error::{ClientError, ClientResult};
pub use resp::Frame;
pub use util::OnceShared;
