//! Error taxonomy for the client.
use thiserror::Error;

/// A list specifying categories of [`ClientError`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// The byte stream did not contain a valid RESP3 frame.
    #[error("protocol parse error")]
    ProtocolParse(#[from] crate::resp::ParseError),

    /// The server replied with a frame of a different shape than expected.
    #[error("unexpected frame type: expected {expected}, got {got}")]
    UnexpectedType {
        /// What the decoder wanted.
        expected: &'static str,
        /// What it actually got.
        got: &'static str,
    },

    /// The connection was closed gracefully (draining completed).
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection is in the process of closing and refuses new work.
    #[error("connection closing")]
    ConnectionClosing,

    /// A pending request was cancelled while it was already on the wire.
    #[error("connection closed due to request cancellation")]
    ConnectionClosedDueToCancellation,

    /// A request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The pool's circuit breaker is open; no new leases are being granted.
    #[error("connection pool unavailable")]
    PoolUnavailable,

    /// The server replied with a simple or bulk error.
    #[error("server error: {message}")]
    Command {
        /// The raw error message returned by the server.
        message: String,
    },

    /// `EXEC` returned null because a watched key was modified.
    #[error("transaction aborted: a watched key was modified")]
    TransactionAborted,

    /// At least one queued command in a transaction failed to queue.
    #[error("transaction errors while queueing: {results:?}")]
    TransactionErrors {
        /// The per-command queueing results, `Ok(())` for queued, `Err` for rejected.
        results: Vec<Result<(), String>>,
    },

    /// A subscription-management call failed.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// A `push` frame arrived that did not correspond to any known
    /// subscription filter.
    #[error("unsolicited push frame")]
    UnsolicitedToken,

    /// A configuration value was invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A required configuration value was missing.
    #[error("missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    /// The enclosing async task/scope was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error occurred while talking to the server.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TLS setup failed.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// The server's ROLE reply reported a sentinel node, which this client
    /// does not support.
    #[error("sentinel nodes are not supported")]
    SentinelNotSupported,
}

/// The result type used throughout this crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Detail extracted from a `Command` error's message, when it matches a
/// pattern the retry driver understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// `MOVED <slot> <host>:<port>`
    Moved { slot: u16, host: String, port: u16 },
    /// `ASK <slot> <host>:<port>`
    Ask { slot: u16, host: String, port: u16 },
    /// `REDIRECT <slot> <host>:<port>` (non-cluster redirect hint)
    Redirect { slot: u16, host: String, port: u16 },
    /// `LOADING` — the server is loading its dataset from disk.
    Loading,
    /// `BUSY` — the server is busy running a script.
    Busy,
    /// `WRONGPASS` — bad credentials.
    WrongPass,
    /// `READONLY` — tried to write against a read-only replica.
    ReadOnly,
    /// `WRONGTYPE` — command applied to a key of the wrong type.
    WrongType,
    /// Anything else; not retryable by the driver.
    Other,
}

impl ServerErrorKind {
    /// Classify a raw server error message.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let mut words = message.split_whitespace();
        match words.next().unwrap_or("") {
            "MOVED" | "ASK" | "REDIRECT" => {
                let kind = message.split_whitespace().next().unwrap_or("");
                let slot: u16 = words.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                let hostport = words.next().unwrap_or("");
                let (host, port) = match hostport.rsplit_once(':') {
                    Some((h, p)) => (h.to_string(), p.parse().unwrap_or(0)),
                    None => (hostport.to_string(), 0),
                };
                match kind {
                    "MOVED" => Self::Moved { slot, host, port },
                    "ASK" => Self::Ask { slot, host, port },
                    _ => Self::Redirect { slot, host, port },
                }
            }
            "LOADING" => Self::Loading,
            "BUSY" => Self::Busy,
            "WRONGPASS" => Self::WrongPass,
            "READONLY" => Self::ReadOnly,
            "WRONGTYPE" => Self::WrongType,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_moved() {
        let kind = ServerErrorKind::classify("MOVED 1234 10.0.0.2:6380");
        assert_eq!(
            kind,
            ServerErrorKind::Moved {
                slot: 1234,
                host: "10.0.0.2".to_string(),
                port: 6380,
            }
        );
    }

    #[test]
    fn classifies_ask_and_redirect() {
        assert_eq!(
            ServerErrorKind::classify("ASK 1 127.0.0.1:7000"),
            ServerErrorKind::Ask {
                slot: 1,
                host: "127.0.0.1".to_string(),
                port: 7000,
            }
        );
        assert_eq!(
            ServerErrorKind::classify("REDIRECT 1 127.0.0.1:7000"),
            ServerErrorKind::Redirect {
                slot: 1,
                host: "127.0.0.1".to_string(),
                port: 7000,
            }
        );
    }

    #[test]
    fn classifies_leaf_kinds() {
        assert_eq!(ServerErrorKind::classify("LOADING"), ServerErrorKind::Loading);
        assert_eq!(ServerErrorKind::classify("BUSY"), ServerErrorKind::Busy);
        assert_eq!(
            ServerErrorKind::classify("WRONGPASS invalid username-password"),
            ServerErrorKind::WrongPass
        );
        assert_eq!(
            ServerErrorKind::classify("READONLY You can't write"),
            ServerErrorKind::ReadOnly
        );
        assert_eq!(
            ServerErrorKind::classify("WRONGTYPE Operation against a key"),
            ServerErrorKind::WrongType
        );
        assert_eq!(ServerErrorKind::classify("ERR unknown"), ServerErrorKind::Other);
    }
}
