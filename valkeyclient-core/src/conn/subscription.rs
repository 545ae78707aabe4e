//! Subscription manager (spec.md §4.4): a refcounted filter table shared by
//! every caller subscribing on the same connection. `SUBSCRIBE`/
//! `PSUBSCRIBE`/`SSUBSCRIBE` are issued only on a filter's 0→1 refcount
//! transition; `UNSUBSCRIBE`/`PUNSUBSCRIBE`/`SUNSUBSCRIBE` only on a
//! transition back to 0. Commands may still be sent on a subscribed
//! connection; the response FIFO (owned by [`super::actor`]) is unaffected,
//! since push frames are routed out of band before reaching the waiter
//! queue.
use crate::command::{Command, PSubscribe, SSubscribe, Subscribe, Unsubscribe};
use crate::conn::actor::ConnectionHandle;
use crate::error::ClientResult;
use crate::resp::{Encoder, Frame};
use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// One of the three filter kinds a connection can subscribe against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Channel(Bytes),
    Pattern(Bytes),
    ShardChannel(Bytes),
}

/// One delivered pub/sub message. `payload` is kept as the raw decoded
/// frame rather than flattened to bytes, since a message payload is
/// ordinarily a bulk string but the invalidation pseudo-channel (see
/// [`Invalidation`]) delivers an array or null instead.
#[derive(Debug, Clone)]
pub struct Message {
    pub filter: Filter,
    /// For `Filter::Pattern`, the concrete channel name the message was
    /// published on; `None` for `Channel`/`ShardChannel` filters.
    pub channel: Option<Bytes>,
    pub payload: Frame,
}

/// A receiver of messages for the filters passed to
/// [`SubscriptionManager::subscribe`].
pub type SubscriptionStream = mpsc::UnboundedReceiver<Message>;

struct FilterEntry {
    refcount: usize,
    sinks: Vec<mpsc::UnboundedSender<Message>>,
}

struct Shared {
    table: Mutex<HashMap<Filter, FilterEntry>>,
}

/// Owns a connection's filter table and the background task that reads
/// `push` frames off it and fans them out to registered sinks.
pub struct SubscriptionManager {
    handle: ConnectionHandle,
    shared: Arc<Shared>,
    dispatch_task: JoinHandle<()>,
}

impl SubscriptionManager {
    /// Take ownership of a connection's push-frame stream and start
    /// dispatching.
    #[must_use]
    pub fn new(handle: ConnectionHandle, mut push_rx: mpsc::UnboundedReceiver<Frame>) -> Self {
        let shared = Arc::new(Shared {
            table: Mutex::new(HashMap::new()),
        });
        let dispatch_shared = shared.clone();
        let dispatch_task = tokio::spawn(async move {
            while let Some(frame) = push_rx.recv().await {
                dispatch(&dispatch_shared, frame).await;
            }
        });
        Self {
            handle,
            shared,
            dispatch_task,
        }
    }

    /// Subscribe to `filters`, run `process` with the resulting message
    /// stream, then unsubscribe from every filter whose refcount drops to
    /// zero, regardless of whether `process` completed or panicked, the
    /// unsubscribe is attempted on the way out.
    pub async fn subscribe<F, Fut, T>(&self, filters: Vec<Filter>, process: F) -> ClientResult<T>
    where
        F: FnOnce(SubscriptionStream) -> Fut,
        Fut: Future<Output = T>,
    {
        let stream = self.open(&filters).await?;
        let result = process(stream).await;
        self.close(&filters).await;
        Ok(result)
    }

    async fn open(&self, filters: &[Filter]) -> ClientResult<SubscriptionStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut to_open: Vec<Filter> = Vec::new();
        {
            let mut table = self.shared.table.lock().await;
            for filter in filters {
                let entry = table.entry(filter.clone()).or_insert_with(|| FilterEntry {
                    refcount: 0,
                    sinks: Vec::new(),
                });
                entry.refcount += 1;
                entry.sinks.push(tx.clone());
                if entry.refcount == 1 {
                    to_open.push(filter.clone());
                }
            }
        }
        if !to_open.is_empty() {
            self.send_subscribe(&to_open).await?;
        }
        Ok(rx)
    }

    async fn close(&self, filters: &[Filter]) {
        let mut to_close: Vec<Filter> = Vec::new();
        {
            let mut table = self.shared.table.lock().await;
            for filter in filters {
                if let Some(entry) = table.get_mut(filter) {
                    entry.refcount = entry.refcount.saturating_sub(1);
                    if entry.refcount == 0 {
                        table.remove(filter);
                        to_close.push(filter.clone());
                    }
                }
            }
        }
        if !to_close.is_empty() {
            if let Err(e) = self.send_unsubscribe(&to_close).await {
                warn!("unsubscribe failed: {e}");
            }
        }
    }

    async fn send_subscribe(&self, filters: &[Filter]) -> ClientResult<()> {
        let (channels, patterns, shards) = partition(filters);
        if !channels.is_empty() {
            self.fire(&Subscribe { channels }).await?;
        }
        if !patterns.is_empty() {
            self.fire(&PSubscribe { patterns }).await?;
        }
        if !shards.is_empty() {
            self.fire(&SSubscribe { shard_channels: shards }).await?;
        }
        Ok(())
    }

    async fn send_unsubscribe(&self, filters: &[Filter]) -> ClientResult<()> {
        let (channels, patterns, shards) = partition(filters);
        if !channels.is_empty() {
            self.fire(&Unsubscribe { channels }).await?;
        }
        if !patterns.is_empty() {
            self.fire(&PatternUnsubscribe { patterns }).await?;
        }
        if !shards.is_empty() {
            self.fire(&ShardUnsubscribe { shard_channels: shards }).await?;
        }
        Ok(())
    }

    /// Send a subscription-control command without registering a FIFO
    /// waiter. The server answers `SUBSCRIBE`/`UNSUBSCRIBE` and kin with a
    /// `push` frame per channel, never a regular reply, so there is nothing
    /// for a waiter to ever be satisfied by; the dispatch loop above quietly
    /// drops those confirmation frames since their kind isn't one of
    /// `message`/`smessage`/`pmessage`.
    async fn fire<C: Command>(&self, command: &C) -> ClientResult<()> {
        let bytes = crate::command::encode_to_bytes(command);
        self.handle.send_no_reply(bytes)
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.dispatch_task.abort();
    }
}

fn partition(filters: &[Filter]) -> (Vec<Bytes>, Vec<Bytes>, Vec<Bytes>) {
    let mut channels = Vec::new();
    let mut patterns = Vec::new();
    let mut shards = Vec::new();
    for f in filters {
        match f {
            Filter::Channel(c) => channels.push(c.clone()),
            Filter::Pattern(p) => patterns.push(p.clone()),
            Filter::ShardChannel(s) => shards.push(s.clone()),
        }
    }
    (channels, patterns, shards)
}

async fn dispatch(shared: &Arc<Shared>, frame: Frame) {
    let elements = match &frame {
        Frame::Push(agg) => match agg.to_vec() {
            Ok(v) => v,
            Err(e) => {
                warn!("malformed push frame: {e}");
                return;
            }
        },
        other => {
            warn!("non-push frame on subscription channel: {}", other.type_name());
            return;
        }
    };
    let Some(kind) = elements.first().and_then(bulk_str) else {
        return;
    };
    let (filter, channel, payload) = match kind.as_str() {
        "message" if elements.len() >= 3 => {
            let channel = bulk_bytes(&elements[1]);
            (Filter::Channel(channel), None, elements[2].clone())
        }
        "smessage" if elements.len() >= 3 => {
            let channel = bulk_bytes(&elements[1]);
            (Filter::ShardChannel(channel), None, elements[2].clone())
        }
        "pmessage" if elements.len() >= 4 => {
            let pattern = bulk_bytes(&elements[1]);
            let channel = bulk_bytes(&elements[2]);
            (Filter::Pattern(pattern), Some(channel), elements[3].clone())
        }
        // `subscribe`/`unsubscribe`/`psubscribe`/... confirmations carry a
        // count, not a payload; they are not forwarded to any sink.
        _ => return,
    };

    let table = shared.table.lock().await;
    if let Some(entry) = table.get(&filter) {
        for sink in &entry.sinks {
            let _ = sink.send(Message {
                filter: filter.clone(),
                channel: channel.clone(),
                payload: payload.clone(),
            });
        }
    }
}

fn bulk_bytes(frame: &Frame) -> Bytes {
    match frame {
        Frame::BulkString(Some(b)) | Frame::SimpleString(b) => b.clone(),
        _ => Bytes::new(),
    }
}

fn bulk_str(frame: &Frame) -> Option<String> {
    match frame {
        Frame::BulkString(Some(b)) | Frame::SimpleString(b) => std::str::from_utf8(b).ok().map(str::to_string),
        _ => None,
    }
}

/// `PUNSUBSCRIBE pattern [pattern ...]`
#[derive(Debug, Clone)]
struct PatternUnsubscribe {
    patterns: Vec<Bytes>,
}

impl Command for PatternUnsubscribe {
    fn name(&self) -> &'static str {
        "PUNSUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.patterns.len());
        enc.write_bulk("PUNSUBSCRIBE");
        for p in &self.patterns {
            enc.write_bulk(p);
        }
    }
}

/// `SUNSUBSCRIBE [shardchannel ...]`
#[derive(Debug, Clone)]
struct ShardUnsubscribe {
    shard_channels: Vec<Bytes>,
}

impl Command for ShardUnsubscribe {
    fn name(&self) -> &'static str {
        "SUNSUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.shard_channels.len());
        enc.write_bulk("SUNSUBSCRIBE");
        for c in &self.shard_channels {
            enc.write_bulk(c);
        }
    }
}

/// Keyspace invalidation (spec.md §4.4's supplemented feature): a thin
/// adapter over `channel("__redis__:invalidate")` that decodes each push's
/// payload into the list of invalidated keys rather than handing callers
/// raw bytes.
pub struct Invalidation;

impl Invalidation {
    pub const FILTER: &'static str = "__redis__:invalidate";

    /// Subscribe to the invalidation channel and decode each message's
    /// payload (a RESP array of bulk-string keys, or null for a full
    /// flush) into the keys that were invalidated. The forwarding loop and
    /// `process` run concurrently, so `process` can observe keys as they
    /// arrive instead of only after the subscription has already ended.
    pub async fn subscribe<F, Fut, T>(manager: &SubscriptionManager, process: F) -> ClientResult<T>
    where
        F: FnOnce(mpsc::UnboundedReceiver<Option<Vec<Bytes>>>) -> Fut,
        Fut: Future<Output = T>,
    {
        let filter = Filter::Channel(Bytes::from_static(Self::FILTER.as_bytes()));
        manager
            .subscribe(vec![filter], |mut messages| async move {
                let (tx, rx) = mpsc::unbounded_channel();
                let forward = async move {
                    while let Some(msg) = messages.recv().await {
                        let keys = decode_invalidation_payload(&msg.payload);
                        if tx.send(keys).is_err() {
                            break;
                        }
                    }
                };
                tokio::pin!(forward);
                let process_fut = process(rx);
                tokio::pin!(process_fut);
                tokio::select! {
                    output = &mut process_fut => output,
                    // The raw push stream ended before `process` did (e.g.
                    // the connection was torn down); let `process` observe
                    // the now-closed channel and finish on its own terms.
                    _ = &mut forward => process_fut.await,
                }
            })
            .await
    }
}

/// A full-flush invalidation carries a null payload; a targeted one
/// carries an array of the invalidated keys.
fn decode_invalidation_payload(payload: &Frame) -> Option<Vec<Bytes>> {
    match payload {
        Frame::Array(Some(agg)) => Some(
            agg.iter()
                .flatten()
                .filter_map(|item| match item {
                    Frame::BulkString(Some(k)) => Some(k),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}
