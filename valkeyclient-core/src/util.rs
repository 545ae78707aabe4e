//! Small shared utilities used across the connection, pool and subscription
//! modules.
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// A lazily-produced, shared, refcounted value (spec.md §9's "lazy shared
/// once-init" pattern): the first caller to reach [`OnceShared::get_or_init`]
/// runs the producer future and every other concurrent caller parks on a
/// [`Notify`] until it completes, then all callers observe the same value.
/// If the producer is cancelled (its future is dropped before completing)
/// or it fails, the next parked caller becomes the producer; with no parked
/// callers the state simply reverts to uninitialized, so a later call gets
/// a fresh attempt rather than a cached failure. [`OnceShared::release`]
/// decrements the refcount and reports whether this was the last holder, so
/// the caller can tear the value down.
pub struct OnceShared<T> {
    inner: Mutex<State<T>>,
    notify: Notify,
}

enum State<T> {
    Uninitialized,
    Producing,
    Ready { value: T, refcount: usize },
}

impl<T: Clone> Default for OnceShared<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(State::Uninitialized),
            notify: Notify::new(),
        }
    }
}

impl<T: Clone> OnceShared<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain the shared value, producing it via `produce` if this is the
    /// first caller since the last teardown.
    pub async fn get_or_init<F, Fut, E>(&self, produce: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut produce = Some(produce);
        loop {
            enum Action<T> {
                Ready(T),
                Produce,
                Wait,
            }
            let action = {
                let mut guard = self.inner.lock().await;
                match &*guard {
                    State::Ready { value, refcount } => {
                        let value = value.clone();
                        let refcount = *refcount + 1;
                        *guard = State::Ready {
                            value: value.clone(),
                            refcount,
                        };
                        Action::Ready(value)
                    }
                    State::Uninitialized => {
                        *guard = State::Producing;
                        Action::Produce
                    }
                    State::Producing => Action::Wait,
                }
            };
            match action {
                Action::Ready(value) => return Ok(value),
                Action::Produce => {
                    let produce = produce.take().expect("produce runs at most once per loop");
                    match produce().await {
                        Ok(value) => {
                            let mut guard = self.inner.lock().await;
                            *guard = State::Ready {
                                value: value.clone(),
                                refcount: 1,
                            };
                            drop(guard);
                            self.notify.notify_waiters();
                            return Ok(value);
                        }
                        Err(e) => {
                            let mut guard = self.inner.lock().await;
                            *guard = State::Uninitialized;
                            drop(guard);
                            self.notify.notify_waiters();
                            return Err(e);
                        }
                    }
                }
                Action::Wait => {
                    self.notify.notified().await;
                }
            }
        }
    }

    /// Release one holder's reference. Returns `true` if this was the last
    /// holder (the caller should tear the value down and the state reverts
    /// to `Uninitialized`).
    pub async fn release(&self) -> bool {
        let mut guard = self.inner.lock().await;
        match &*guard {
            State::Ready { refcount, .. } if *refcount > 1 => {
                if let State::Ready { value, refcount } = &*guard {
                    let value = value.clone();
                    *guard = State::Ready {
                        value,
                        refcount: refcount - 1,
                    };
                }
                false
            }
            State::Ready { .. } => {
                *guard = State::Uninitialized;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_callers_share_one_production() {
        let shared: Arc<OnceShared<u32>> = Arc::new(OnceShared::new());
        let produced = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = shared.clone();
            let produced = produced.clone();
            handles.push(tokio::spawn(async move {
                shared
                    .get_or_init(|| async move {
                        produced.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                        Ok::<_, std::convert::Infallible>(42u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(produced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failed_producer_does_not_wedge_later_callers() {
        let shared: OnceShared<u32> = OnceShared::new();
        let first = shared.get_or_init(|| async { Err::<u32, &'static str>("connect refused") }).await;
        assert_eq!(first, Err("connect refused"));

        let second = shared.get_or_init(|| async { Ok::<_, &'static str>(7u32) }).await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn release_reinitializes_after_last_holder() {
        let shared: OnceShared<u32> = OnceShared::new();
        let n = std::sync::atomic::AtomicUsize::new(0);
        shared
            .get_or_init(|| async {
                n.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(1u32)
            })
            .await
            .unwrap();
        assert!(shared.release().await);
        shared
            .get_or_init(|| async {
                n.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(1u32)
            })
            .await
            .unwrap();
        assert_eq!(n.load(Ordering::SeqCst), 2);
    }
}
