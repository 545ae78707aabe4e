//! An async Rust client for Valkey and Redis servers.
//!
//! `valkeyclient` is written completely in rust; its asynchronous model is
//! based on [`tokio`](https://crates.io/crates/tokio). It speaks RESP3,
//! tracks a server's primary/replica topology, retries `MOVED`/`ASK`/
//! `LOADING`/`BUSY` redirects, and pools one connection set per node.
//!
//! Most applications depend only on this crate, not on
//! `valkeyclient-core` directly.
//!
//! ```no_run
//! use valkeyclient::{Client, ClientConfiguration};
//!
//! # async fn example() -> Result<(), valkeyclient::ClientError> {
//! let config = ClientConfiguration::builder()
//!     .host("127.0.0.1")
//!     .port(6379)
//!     .build()?;
//! let client = Client::connect(config).await?;
//! # Ok(())
//! # }
//! ```
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "bb8_pool")]
mod bb8;
mod client;
mod config;

#[cfg(feature = "bb8_pool")]
pub use crate::bb8::ConnectionManager;
pub use client::Client;
pub use config::{ClientConfiguration, ClientConfigurationBuilder, TlsMode};

pub use valkeyclient_core::command::*;
pub use valkeyclient_core::conn::{Filter, Invalidation, Message, SubscriptionStream};
pub use valkeyclient_core::error::{ClientError, ClientResult, ServerErrorKind};
pub use valkeyclient_core::pool::{PoolConfig, PoolConfigBuilder};
pub use valkeyclient_core::retry::RetryConfig;
pub use valkeyclient_core::topology::ReadRouting;
pub use valkeyclient_core::Frame;
