//! The per-connection executor-affinity actor (spec.md §4.3 / §5):
//! one task owns the socket and the in-order waiter FIFO; callers never
//! touch the socket directly, only send requests over a channel and await
//! a `oneshot` reply. Since only the owning task ever touches the
//! connection's state, no mutex around a shared core is needed at all.
use crate::conn::config::ConnectParams;
use crate::conn::io::FrameReader;
use crate::conn::stream::Stream;
use crate::error::{ClientError, ClientResult};
use crate::resp::Frame;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

const STATE_ACTIVE: u8 = 0;
const STATE_DRAINING: u8 = 1;
const STATE_CLOSED: u8 = 2;

enum ActorMessage {
    Execute {
        bytes: Bytes,
        respond_to: oneshot::Sender<ClientResult<Frame>>,
    },
    /// A command whose reply never satisfies the FIFO waiter queue because
    /// the server answers it with a `push` frame instead of a regular
    /// reply (the `SUBSCRIBE` family in RESP3). No waiter is registered.
    SendNoReply {
        bytes: Bytes,
    },
    /// A batch of already-concatenated command bytes, written with one
    /// `write_all`/flush call; `respond_to` holds one reply sender per
    /// command, in submission order. Used by the transaction driver so
    /// `MULTI`+queued commands+`EXEC` reach the wire as a single batched
    /// write instead of one round trip per command.
    ExecuteBatch {
        bytes: Bytes,
        respond_to: Vec<oneshot::Sender<ClientResult<Frame>>>,
    },
    KeepAliveFailed,
    Shutdown,
}

/// A handle to a live connection actor. Cheaply cloneable; every clone
/// shares the same underlying task and waiter FIFO.
#[derive(Clone)]
pub struct ConnectionHandle {
    tx: mpsc::UnboundedSender<ActorMessage>,
    state: Arc<AtomicU8>,
    command_timeout: Duration,
    blocking_command_timeout: Duration,
}

impl ConnectionHandle {
    /// True once the connection has stopped accepting new requests
    /// (draining or closed).
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.state.load(Ordering::Acquire) != STATE_ACTIVE
    }

    /// The default, non-blocking command timeout configured for this
    /// connection. Exposed for callers (the transaction driver) that send
    /// raw, untyped command bytes via [`Self::execute_with_timeout`]
    /// directly instead of [`Self::execute`].
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Send one already-encoded command and await its reply frame, bounded
    /// by `timeout`.
    pub async fn execute_with_timeout(&self, bytes: Bytes, timeout: Duration) -> ClientResult<Frame> {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => return Err(ClientError::ConnectionClosed),
            STATE_DRAINING => return Err(ClientError::ConnectionClosing),
            _ => {}
        }
        let (respond_to, rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::Execute { bytes, respond_to })
            .map_err(|_| ClientError::ConnectionClosed)?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            // The actor dropped our sender without replying: connection died
            // mid-flight.
            Ok(Err(_)) => Err(ClientError::ConnectionClosedDueToCancellation),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Encode and send a typed command, decoding its reply. Uses the
    /// blocking timeout when [`crate::command::Command::is_blocking`]
    /// reports true, the default command timeout otherwise.
    pub async fn execute<C: crate::command::TypedCommand>(&self, command: &C) -> ClientResult<C::Response> {
        use crate::command::Command;
        let timeout = if command.is_blocking() {
            self.blocking_command_timeout
        } else {
            self.command_timeout
        };
        let bytes = crate::command::encode_to_bytes(command);
        let frame = self.execute_with_timeout(bytes, timeout).await?;
        if frame.is_error() {
            return Err(ClientError::Command {
                message: frame.as_error_message().unwrap_or("?").to_string(),
            });
        }
        command
            .decode_response(frame)
            .map_err(|e| ClientError::UnexpectedType {
                expected: e.expected,
                got: e.got,
            })
    }

    /// Write every command in `commands` as a single batched write, then
    /// await each reply in submission order. The outer `Result` reports a
    /// transport-level failure (closed connection, timeout); each inner
    /// `ClientResult<Frame>` is that command's own reply, exactly as
    /// [`Self::execute_with_timeout`] would have returned it had the
    /// commands been sent one at a time.
    pub async fn execute_batch(&self, commands: Vec<Bytes>, timeout: Duration) -> ClientResult<Vec<ClientResult<Frame>>> {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => return Err(ClientError::ConnectionClosed),
            STATE_DRAINING => return Err(ClientError::ConnectionClosing),
            _ => {}
        }
        let mut bytes = BytesMut::with_capacity(commands.iter().map(Bytes::len).sum());
        for command in &commands {
            bytes.extend_from_slice(command);
        }

        let mut receivers = Vec::with_capacity(commands.len());
        let mut respond_to = Vec::with_capacity(commands.len());
        for _ in 0..commands.len() {
            let (tx, rx) = oneshot::channel();
            respond_to.push(tx);
            receivers.push(rx);
        }
        self.tx
            .send(ActorMessage::ExecuteBatch { bytes: bytes.freeze(), respond_to })
            .map_err(|_| ClientError::ConnectionClosed)?;

        let mut results = Vec::with_capacity(receivers.len());
        for rx in receivers {
            results.push(match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(ClientError::ConnectionClosedDueToCancellation),
                Err(_) => Err(ClientError::Timeout),
            });
        }
        Ok(results)
    }

    /// Send one already-encoded command without registering a FIFO waiter.
    /// For the `SUBSCRIBE` command family, whose confirmations arrive as
    /// `push` frames rather than regular replies: registering a waiter for
    /// them would leave a stale entry at the front of the queue forever,
    /// misattributing every reply sent after it.
    pub fn send_no_reply(&self, bytes: Bytes) -> ClientResult<()> {
        match self.state.load(Ordering::Acquire) {
            STATE_CLOSED => return Err(ClientError::ConnectionClosed),
            STATE_DRAINING => return Err(ClientError::ConnectionClosing),
            _ => {}
        }
        self.tx
            .send(ActorMessage::SendNoReply { bytes })
            .map_err(|_| ClientError::ConnectionClosed)
    }

    /// Begin draining: no new requests are accepted, the actor task exits
    /// once its current work finishes.
    pub fn close(&self) {
        self.state.store(STATE_DRAINING, Ordering::Release);
        let _ = self.tx.send(ActorMessage::Shutdown);
    }
}

/// Dial, authenticate and spawn the actor task for one connection.
/// Returns the handle plus a receiver of out-of-band `push` frames (always
/// present; subscription management is layered on top by the caller).
pub async fn connect(
    params: &ConnectParams,
    ssl: &dyn crate::conn::tls::SslContextProvider,
) -> ClientResult<(ConnectionHandle, mpsc::UnboundedReceiver<Frame>)> {
    debug!("connecting to {params}, state=handshaking");
    let mut stream = crate::conn::stream::dial(params, ssl).await?;
    let hello = crate::conn::handshake::perform(&mut stream, params).await?;
    debug!(
        "handshake complete against {} {}, state=active",
        hello.server, hello.version
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let (push_tx, push_rx) = mpsc::unbounded_channel();
    let state = Arc::new(AtomicU8::new(STATE_ACTIVE));

    let handle = ConnectionHandle {
        tx: tx.clone(),
        state: state.clone(),
        command_timeout: params.command_timeout,
        blocking_command_timeout: params.blocking_command_timeout,
    };

    tokio::spawn(run(stream, rx, tx.downgrade(), push_tx, state, params.keep_alive_frequency, params.command_timeout));

    Ok((handle, push_rx))
}

async fn run(
    stream: Stream,
    mut rx: mpsc::UnboundedReceiver<ActorMessage>,
    // Weak: the keep-alive watcher below must not itself keep the channel
    // open once every `ConnectionHandle` clone (the strong senders) has been
    // dropped, or `rx.recv()` below would never observe the channel as
    // closed and this task (and its socket) would leak forever.
    self_tx: mpsc::WeakUnboundedSender<ActorMessage>,
    push_tx: mpsc::UnboundedSender<Frame>,
    state: Arc<AtomicU8>,
    keep_alive_frequency: Option<Duration>,
    keep_alive_timeout: Duration,
) {
    let (mut read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = FrameReader::new();
    let mut waiters: VecDeque<oneshot::Sender<ClientResult<Frame>>> = VecDeque::new();
    let mut keepalive = keep_alive_frequency.map(tokio::time::interval);
    if let Some(ticker) = keepalive.as_mut() {
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    }

    let close_reason = loop {
        let keepalive_tick = async {
            match keepalive.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(ActorMessage::Execute { bytes, respond_to }) => {
                    trace!("writing {} bytes", bytes.len());
                    let write_result = async {
                        write_half.write_all(&bytes).await?;
                        write_half.flush().await
                    }
                    .await;
                    if let Err(e) = write_result {
                        let kind = e.kind();
                        let _ = respond_to.send(Err(ClientError::Io(e)));
                        break ClientError::Io(std::io::Error::from(kind));
                    }
                    waiters.push_back(respond_to);
                }
                Some(ActorMessage::SendNoReply { bytes }) => {
                    trace!("writing {} bytes (no reply expected)", bytes.len());
                    let write_result = async {
                        write_half.write_all(&bytes).await?;
                        write_half.flush().await
                    }
                    .await;
                    if let Err(e) = write_result {
                        break ClientError::Io(e);
                    }
                }
                Some(ActorMessage::ExecuteBatch { bytes, respond_to }) => {
                    trace!("writing batch of {} bytes ({} commands)", bytes.len(), respond_to.len());
                    let write_result = async {
                        write_half.write_all(&bytes).await?;
                        write_half.flush().await
                    }
                    .await;
                    if let Err(e) = write_result {
                        let kind = e.kind();
                        for tx in respond_to {
                            let _ = tx.send(Err(ClientError::Io(std::io::Error::from(kind))));
                        }
                        break ClientError::Io(std::io::Error::from(kind));
                    }
                    waiters.extend(respond_to);
                }
                Some(ActorMessage::KeepAliveFailed) => {
                    warn!("keep-alive PING timed out, closing connection");
                    break ClientError::Timeout;
                }
                Some(ActorMessage::Shutdown) | None => {
                    debug!("state=closing");
                    break ClientError::ConnectionClosing;
                }
            },
            frame = reader.read_frame(&mut read_half) => match frame {
                Ok(frame) => {
                    if frame.is_push() {
                        trace!("push frame: {}", frame.type_name());
                        let _ = push_tx.send(frame);
                        continue;
                    }
                    if let Some(tx) = waiters.pop_front() {
                        let result = if frame.is_error() {
                            Err(ClientError::Command { message: frame.as_error_message().unwrap_or("?").to_string() })
                        } else {
                            Ok(frame)
                        };
                        // A `send` failure here means the caller already
                        // gave up (timed out); the reply is discarded
                        // silently, per spec, while FIFO order is
                        // preserved because the slot was still occupied.
                        let _ = tx.send(result);
                    } else {
                        warn!("received frame with no matching waiter: {}", frame.type_name());
                    }
                }
                Err(e) => {
                    warn!("connection read failed: {e}");
                    break e;
                }
            },
            () = keepalive_tick => {
                trace!("sending keep-alive PING");
                let ping = crate::command::encode_to_bytes(&crate::command::Ping::default());
                if let Err(e) = write_half.write_all(&ping).await {
                    break ClientError::Io(e);
                }
                let (tx, ping_rx) = oneshot::channel();
                waiters.push_back(tx);
                let self_tx = self_tx.clone();
                tokio::spawn(async move {
                    if tokio::time::timeout(keep_alive_timeout, ping_rx).await.is_err() {
                        if let Some(self_tx) = self_tx.upgrade() {
                            let _ = self_tx.send(ActorMessage::KeepAliveFailed);
                        }
                    }
                });
            }
        }
    };

    state.store(STATE_CLOSED, Ordering::Release);
    rx.close();
    while let Ok(msg) = rx.try_recv() {
        if let ActorMessage::Execute { respond_to, .. } = msg {
            let _ = respond_to.send(Err(ClientError::ConnectionClosed));
        }
    }
    for tx in waiters.drain(..) {
        let _ = tx.send(Err(ClientError::ConnectionClosed));
    }
    debug!("state=closed ({close_reason})");
}
