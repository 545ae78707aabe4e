//! Retry/redirect handling and the transaction driver (spec.md §4.6/§7).
mod config;

pub use config::RetryConfig;

use crate::command::{Asking, Command, Discard, Exec, Multi, TypedCommand, Watch};
use crate::conn::ConnectionHandle;
use crate::error::{ClientError, ClientResult, ServerErrorKind};
use crate::resp::Frame;
use crate::topology::{NodeAddr, Topology};
use bytes::Bytes;

/// What a server error tells the retry driver to do next, derived from
/// [`ServerErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// `LOADING`/`BUSY`: wait and retry against the same node.
    TryAgain,
    /// `MOVED`/`REDIRECT`: the primary moved; update topology then retry.
    Redirected(NodeAddr),
    /// `ASK`: retry exactly once against this address, preceded by
    /// `ASKING`, without changing the primary.
    Ask(NodeAddr),
    /// Any other command error: surface it as-is.
    DontRetry,
}

/// Classify a server error message into the action the retry driver should
/// take.
#[must_use]
pub fn classify_retry_action(message: &str) -> RetryAction {
    match ServerErrorKind::classify(message) {
        ServerErrorKind::Moved { host, port, .. } | ServerErrorKind::Redirect { host, port, .. } => {
            RetryAction::Redirected(NodeAddr::new(host, port))
        }
        ServerErrorKind::Ask { host, port, .. } => RetryAction::Ask(NodeAddr::new(host, port)),
        ServerErrorKind::Loading | ServerErrorKind::Busy => RetryAction::TryAgain,
        ServerErrorKind::WrongPass
        | ServerErrorKind::ReadOnly
        | ServerErrorKind::WrongType
        | ServerErrorKind::Other => RetryAction::DontRetry,
    }
}

/// Execute `command` against `topology`, following `MOVED`/`ASK`/`REDIRECT`/
/// `LOADING`/`BUSY` per spec.md §4.6, bounded by `retry_config`'s backoff
/// schedule.
pub async fn retry_command<C: TypedCommand>(
    topology: &Topology,
    retry_config: &RetryConfig,
    command: &C,
) -> ClientResult<C::Response> {
    let mut attempt = 0u32;
    loop {
        let pool = if command.is_read_only() {
            topology.pool_for_read()?
        } else {
            topology.pool_for_write()?
        };
        let conn = pool.lease().await?;
        let result = conn.execute(command).await;
        drop(conn);

        let err = match result {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        let ClientError::Command { message } = &err else {
            return Err(err);
        };
        match classify_retry_action(message) {
            RetryAction::DontRetry => return Err(err),
            RetryAction::TryAgain => {}
            RetryAction::Redirected(addr) => topology.set_primary(addr).await?,
            RetryAction::Ask(addr) => {
                // Retried exactly once, against the indicated node,
                // prefixed with ASKING; does not touch the primary view.
                let ask_pool = topology.node_pool(&addr);
                let ask_conn = ask_pool.lease().await?;
                ask_conn.execute(&Asking).await?;
                return ask_conn.execute(command).await;
            }
        }

        attempt += 1;
        match retry_config.backoff(attempt) {
            Some(wait) => tokio::time::sleep(wait).await,
            None => return Err(err),
        }
    }
}

/// Runs `WATCH` (optional) + `MULTI` + a batch of already-encoded commands +
/// `EXEC` over one connection (spec.md §4.6/§7's transaction contract).
/// Borrowing a [`ConnectionHandle`] directly rather than going through the
/// pool/topology: a transaction's queued commands must land on one
/// connection, which is the caller's responsibility to hold for the whole
/// batch.
pub struct TransactionDriver<'a> {
    handle: &'a ConnectionHandle,
}

impl<'a> TransactionDriver<'a> {
    #[must_use]
    pub fn new(handle: &'a ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Queue every command in `commands` inside `MULTI`/`EXEC`, optionally
    /// preceded by `WATCH watch_keys`. `MULTI`, the queued commands and
    /// `EXEC` are written to the wire as a single batched write (one
    /// `write_all`/flush, via [`ConnectionHandle::execute_batch`]), not one
    /// round trip per command. On success, returns the per-command reply
    /// frames in submission order for the caller to decode with each
    /// command's own [`TypedCommand::decode_response`].
    pub async fn execute(&self, watch_keys: Vec<Bytes>, commands: Vec<Bytes>) -> ClientResult<Vec<Frame>> {
        if !watch_keys.is_empty() {
            self.handle.execute(&Watch { keys: watch_keys }).await?;
        }

        let queued_count = commands.len();
        let mut batch = Vec::with_capacity(queued_count + 2);
        batch.push(crate::command::encode_to_bytes(&Multi));
        batch.extend(commands);
        batch.push(crate::command::encode_to_bytes(&Exec));

        let timeout = self.handle.command_timeout();
        let mut replies = self.handle.execute_batch(batch, timeout).await?.into_iter();

        replies.next().expect("batch always includes a MULTI reply")?;

        let mut queue_results = Vec::with_capacity(queued_count);
        for _ in 0..queued_count {
            match replies.next().expect("batch includes one reply per queued command") {
                Ok(_) => queue_results.push(Ok(())),
                Err(ClientError::Command { message }) => queue_results.push(Err(message)),
                Err(e) => return Err(e),
            }
        }
        if queue_results.iter().any(Result::is_err) {
            let _ = self.handle.execute(&Discard).await;
            return Err(ClientError::TransactionErrors { results: queue_results });
        }

        let exec_reply = replies.next().expect("batch always includes an EXEC reply")?;
        match Exec
            .decode_response(exec_reply)
            .map_err(|e| ClientError::UnexpectedType { expected: e.expected, got: e.got })?
        {
            Some(frames) => Ok(frames),
            None => Err(ClientError::TransactionAborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_moved_as_redirected() {
        assert_eq!(
            classify_retry_action("MOVED 1 10.0.0.1:6380"),
            RetryAction::Redirected(NodeAddr::new("10.0.0.1", 6380))
        );
    }

    #[test]
    fn classifies_ask() {
        assert_eq!(
            classify_retry_action("ASK 1 10.0.0.1:6380"),
            RetryAction::Ask(NodeAddr::new("10.0.0.1", 6380))
        );
    }

    #[test]
    fn classifies_loading_and_busy_as_try_again() {
        assert_eq!(classify_retry_action("LOADING"), RetryAction::TryAgain);
        assert_eq!(classify_retry_action("BUSY script running"), RetryAction::TryAgain);
    }

    #[test]
    fn classifies_everything_else_as_dont_retry() {
        assert_eq!(classify_retry_action("WRONGTYPE bad type"), RetryAction::DontRetry);
    }
}
