//! The per-node connection pool (spec.md §4.5), modeled directly on the
//! primitives named in spec.md §5 — a `tokio::sync::Semaphore` bounding
//! connection slots, a plain queue of idle connections, and a circuit
//! breaker — rather than an external pooling crate: the soft/hard max with
//! distinct idle-eviction policies and a trip-window circuit breaker don't
//! map onto a generic `ManageConnection` trait. An optional `bb8` adapter
//! over this pool lives in the `valkeyclient` facade instead of this crate,
//! consuming it the same way any other external pooling crate would.
mod circuit_breaker;
mod config;

pub use circuit_breaker::CircuitBreaker;
pub use config::{PoolConfig, PoolConfigBuilder};

use crate::conn::ConnectionHandle;
use crate::error::{ClientError, ClientResult};
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Dials one fresh connection for a pool to add to its slots. Implemented
/// by whatever knows how to reach a specific node (see
/// [`crate::topology`]).
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    async fn dial(&self) -> ClientResult<ConnectionHandle>;
}

struct IdleConn {
    handle: ConnectionHandle,
    became_idle_at: Instant,
    // Held for the connection's entire life, idle or leased; dropping it
    // frees the slot back to `slots`.
    permit: OwnedSemaphorePermit,
}

struct Inner {
    idle: VecDeque<IdleConn>,
    open_count: usize,
    breaker: CircuitBreaker,
}

/// A per-node pool of [`ConnectionHandle`]s. Always used behind an `Arc`:
/// the idle reaper task holds only a [`Weak`] reference, so the pool (and
/// its connections) are torn down as soon as the last `Arc<Pool<F>>` is
/// dropped.
pub struct Pool<F: ConnectionFactory> {
    factory: F,
    config: PoolConfig,
    inner: Mutex<Inner>,
    /// One permit per connection slot (idle or leased); bounds total
    /// connections at `hard_max`.
    slots: Arc<Semaphore>,
    /// Bounds concurrent dial attempts at `max_concurrent_connection_requests`,
    /// independent of `slots`.
    dial_permits: Semaphore,
}

impl<F: ConnectionFactory> Pool<F> {
    #[must_use]
    pub fn new(factory: F, config: PoolConfig) -> Arc<Self> {
        let pool = Arc::new(Self {
            slots: Arc::new(Semaphore::new(config.hard_max)),
            dial_permits: Semaphore::new(config.max_concurrent_connection_requests),
            inner: Mutex::new(Inner {
                idle: VecDeque::new(),
                open_count: 0,
                breaker: CircuitBreaker::new(config.circuit_breaker_trip_after),
            }),
            factory,
            config,
        });
        tokio::spawn(reap_idle(Arc::downgrade(&pool)));
        pool
    }

    /// Acquire a ready connection, reusing an idle one or dialing a fresh
    /// one when none is available and the pool is under `hard_max`.
    /// Fails fast with [`ClientError::PoolUnavailable`] while the circuit
    /// breaker is open. Drop of the returned future (caller cancellation)
    /// abandons any pending semaphore wait atomically, same as the FIFO
    /// waiter cancellation in [`crate::conn`].
    pub async fn lease(self: &Arc<Self>) -> ClientResult<PooledConnection<F>> {
        if self.inner.lock().unwrap().breaker.is_open() {
            return Err(ClientError::PoolUnavailable);
        }

        while let Some(idle) = {
            let mut inner = self.inner.lock().unwrap();
            inner.idle.pop_front()
        } {
            if idle.handle.is_closing() {
                let mut inner = self.inner.lock().unwrap();
                inner.open_count = inner.open_count.saturating_sub(1);
                drop(inner);
                drop(idle.permit);
                continue;
            }
            return Ok(PooledConnection {
                pool: self.clone(),
                handle: Some(idle.handle),
                permit: Some(idle.permit),
            });
        }

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;
        if self.inner.lock().unwrap().breaker.is_open() {
            drop(permit);
            return Err(ClientError::PoolUnavailable);
        }

        let _dial_permit = self
            .dial_permits
            .acquire()
            .await
            .map_err(|_| ClientError::ConnectionClosed)?;
        match self.factory.dial().await {
            Ok(handle) => {
                let mut inner = self.inner.lock().unwrap();
                inner.breaker.record_success();
                inner.open_count += 1;
                Ok(PooledConnection {
                    pool: self.clone(),
                    handle: Some(handle),
                    permit: Some(permit),
                })
            }
            Err(e) => {
                self.inner.lock().unwrap().breaker.record_failure();
                drop(permit);
                Err(e)
            }
        }
    }

    fn release(&self, handle: ConnectionHandle, permit: OwnedSemaphorePermit) {
        let mut inner = self.inner.lock().unwrap();
        if handle.is_closing() || inner.open_count > self.config.soft_max {
            inner.open_count = inner.open_count.saturating_sub(1);
            drop(inner);
            handle.close();
            drop(permit);
            return;
        }
        inner.idle.push_back(IdleConn {
            handle,
            became_idle_at: Instant::now(),
            permit,
        });
    }

    /// Current total connection count (idle + leased).
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().open_count
    }
}

/// A leased connection. Deref's to [`ConnectionHandle`]; on drop, the
/// connection returns to the idle queue (or is closed, if unhealthy or the
/// pool is currently above `soft_max`).
pub struct PooledConnection<F: ConnectionFactory> {
    pool: Arc<Pool<F>>,
    handle: Option<ConnectionHandle>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<F: ConnectionFactory> Deref for PooledConnection<F> {
    type Target = ConnectionHandle;
    fn deref(&self) -> &ConnectionHandle {
        self.handle.as_ref().expect("handle taken only on drop")
    }
}

impl<F: ConnectionFactory> Drop for PooledConnection<F> {
    fn drop(&mut self) {
        if let (Some(handle), Some(permit)) = (self.handle.take(), self.permit.take()) {
            self.pool.release(handle, permit);
        }
    }
}

/// Dials a specific node's address using the shared TLS context provider.
/// The default [`ConnectionFactory`] for a pool created by
/// [`crate::topology`].
pub struct NodeConnectionFactory {
    params: crate::conn::ConnectParams,
    ssl: Arc<dyn crate::conn::SslContextProvider>,
}

impl NodeConnectionFactory {
    #[must_use]
    pub fn new(params: crate::conn::ConnectParams, ssl: Arc<dyn crate::conn::SslContextProvider>) -> Self {
        Self { params, ssl }
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for NodeConnectionFactory {
    async fn dial(&self) -> ClientResult<ConnectionHandle> {
        let (handle, _push_rx) = crate::conn::connect(&self.params, self.ssl.as_ref()).await?;
        Ok(handle)
    }
}

/// Closes idle connections that have aged past `idle_timeout`, stopping
/// short of `min`. Exits once the pool it watches is dropped.
async fn reap_idle<F: ConnectionFactory>(pool: Weak<Pool<F>>) {
    loop {
        let Some(pool) = pool.upgrade() else { return };
        tokio::time::sleep(pool.config.idle_timeout).await;
        let mut inner = pool.inner.lock().unwrap();
        let idle_timeout = pool.config.idle_timeout;
        let min = pool.config.min;
        let now = Instant::now();
        let mut kept = VecDeque::with_capacity(inner.idle.len());
        while let Some(idle) = inner.idle.pop_front() {
            let expired = now.duration_since(idle.became_idle_at) >= idle_timeout;
            let above_min = inner.open_count > min;
            if expired && above_min {
                trace!("closing idle connection past idle_timeout");
                inner.open_count = inner.open_count.saturating_sub(1);
                idle.handle.close();
                drop(idle.permit);
            } else {
                kept.push_back(idle);
            }
        }
        inner.idle = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FailingFactory;
    #[async_trait::async_trait]
    impl ConnectionFactory for FailingFactory {
        async fn dial(&self) -> ClientResult<ConnectionHandle> {
            Err(ClientError::ConnectionClosed)
        }
    }

    #[tokio::test]
    async fn circuit_breaker_trips_after_continuous_failures() {
        let cfg = PoolConfig::builder()
            .hard_max(4)
            .circuit_breaker_trip_after(Duration::from_millis(0))
            .build()
            .unwrap();
        let pool = Pool::new(FailingFactory, cfg);
        assert!(pool.lease().await.is_err());
        assert!(pool.lease().await.is_err());
        let err = pool.lease().await.unwrap_err();
        assert!(matches!(err, ClientError::PoolUnavailable));
    }

    struct CountingFactory {
        dialed: AtomicUsize,
    }
    #[async_trait::async_trait]
    impl ConnectionFactory for CountingFactory {
        async fn dial(&self) -> ClientResult<ConnectionHandle> {
            self.dialed.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::ConnectionClosed)
        }
    }

    #[tokio::test]
    async fn dial_permits_cap_concurrent_attempts() {
        let cfg = PoolConfig::builder()
            .hard_max(8)
            .max_concurrent_connection_requests(2)
            .circuit_breaker_trip_after(Duration::from_secs(3600))
            .build()
            .unwrap();
        let pool = Pool::new(CountingFactory { dialed: AtomicUsize::new(0) }, cfg);
        let _ = tokio::join!(pool.lease(), pool.lease(), pool.lease());
        assert_eq!(pool.factory.dialed.load(Ordering::SeqCst), 3);
    }
}
