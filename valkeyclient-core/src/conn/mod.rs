//! A single connection to a node: dialing, the `HELLO 3` handshake, the
//! executor-affinity actor that owns the socket, and the subscription
//! manager layered on top of its push-frame stream.
pub mod config;
mod actor;
mod handshake;
mod io;
mod stream;
mod subscription;
mod tls;

pub use actor::{connect, ConnectionHandle};
pub use config::ConnectParams;
pub use subscription::{Filter, Invalidation, Message, SubscriptionManager, SubscriptionStream};
pub use tls::{CoalescingSslContextProvider, SslContextProvider};
