//! The facade entry point: [`Client`] ties together a node topology, the
//! retry driver, and a lazily-shared dedicated subscription connection.
use crate::config::ClientConfiguration;
use bytes::Bytes;
use std::sync::Arc;
use valkeyclient_core::command::TypedCommand;
use valkeyclient_core::conn::{self, CoalescingSslContextProvider, ConnectionHandle, SslContextProvider, SubscriptionManager};
use valkeyclient_core::error::{ClientError, ClientResult};
use valkeyclient_core::retry::{self, RetryConfig, TransactionDriver};
use valkeyclient_core::topology::{NodeAddr, Topology};
use valkeyclient_core::OnceShared;

/// An async client for one Valkey/Redis primary (with optional replicas).
///
/// Cheap to clone: internally `Arc`-wrapped, every clone shares the same
/// topology, pools, and dedicated subscription connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    topology: Topology,
    retry: RetryConfig,
    ssl: Arc<dyn SslContextProvider>,
    subscription_params: valkeyclient_core::conn::ConnectParams,
    /// The dedicated subscription connection (spec.md §4.4/§9): acquired
    /// lazily on the first `subscribe` call and shared by every concurrent
    /// subscriber via the refcounted single-slot acquirer, released once
    /// the last one finishes.
    subscription_conn: OnceShared<Arc<SubscriptionManager>>,
}

impl Client {
    /// Dial the primary named in `config`, and if `config.discover_replicas`
    /// is set, run the initial `ROLE` discovery.
    pub async fn connect(config: ClientConfiguration) -> ClientResult<Self> {
        let ssl: Arc<dyn SslContextProvider> = Arc::new(CoalescingSslContextProvider::new());
        let params = config.connect_params();
        let topology = Topology::new(
            params.clone(),
            ssl.clone(),
            config.pool.clone(),
            config.read_only_command_node_selection,
            false,
            config.discover_replicas,
        );
        topology.set_primary(NodeAddr::new(config.host.clone(), config.port)).await?;
        Ok(Self {
            inner: Arc::new(Inner {
                topology,
                retry: config.retry,
                ssl,
                subscription_params: params,
                subscription_conn: OnceShared::new(),
            }),
        })
    }

    /// Execute one typed command, following redirects and retrying per the
    /// configured backoff schedule.
    pub async fn execute<C: TypedCommand>(&self, command: &C) -> ClientResult<C::Response> {
        retry::retry_command(&self.inner.topology, &self.inner.retry, command).await
    }

    /// `PING` the primary. Used by the `bb8` adapter to validate a pooled
    /// client before handing it out.
    pub async fn ping(&self) -> ClientResult<Bytes> {
        self.execute(&valkeyclient_core::command::Ping::default()).await
    }

    /// Run `commands` inside `MULTI`/`EXEC`, optionally preceded by
    /// `WATCH watch_keys`, over one connection leased from the primary's
    /// pool for the whole batch. `commands` may be a heterogeneous batch
    /// (e.g. `SET`, `INCR`, `GET` in the same transaction), each already
    /// encoded with [`encode_to_bytes`]; decode the returned per-command
    /// reply frames with each command's own `decode_response`.
    pub async fn transaction(&self, watch_keys: Vec<Bytes>, commands: Vec<Bytes>) -> ClientResult<Vec<valkeyclient_core::Frame>> {
        let pool = self.inner.topology.pool_for_write()?;
        let conn = pool.lease().await?;
        let driver = TransactionDriver::new(&conn);
        driver.execute(watch_keys, commands).await
    }

    /// Run `process` against the client-level subscription stream for
    /// `filters`, acquiring the shared dedicated subscription connection on
    /// first use and releasing it once the last concurrent subscriber
    /// returns.
    pub async fn subscribe<F, Fut, T>(&self, filters: Vec<conn::Filter>, process: F) -> ClientResult<T>
    where
        F: FnOnce(conn::SubscriptionStream) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let manager = self.subscription_manager().await?;
        let result = manager.subscribe(filters, process).await;
        self.inner.subscription_conn.release().await;
        result
    }

    async fn subscription_manager(&self) -> ClientResult<Arc<SubscriptionManager>> {
        self.inner
            .subscription_conn
            .get_or_init(|| async {
                let (handle, push_rx) = conn::connect(&self.inner.subscription_params, self.inner.ssl.as_ref()).await?;
                Ok::<_, ClientError>(Arc::new(SubscriptionManager::new(handle, push_rx)))
            })
            .await
    }

    /// A raw connection handle leased from the primary's pool, for callers
    /// that need direct access (e.g. pipelining several commands by hand).
    pub async fn primary_connection(&self) -> ClientResult<impl std::ops::Deref<Target = ConnectionHandle>> {
        self.inner.topology.pool_for_write()?.lease().await
    }
}
