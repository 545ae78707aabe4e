//! Connection pooling with bb8, for applications that want one pool shared
//! across a whole cluster's worth of clients rather than this crate's own
//! per-node pool.
use crate::{Client, ClientConfiguration};
use async_trait::async_trait;
use bb8::ManageConnection;
use log::trace;
use valkeyclient_core::error::ClientError;

/// Implementation of [`bb8::ManageConnection`] over [`Client`].
///
/// ```rust,no_run
/// use bb8::Pool;
/// use valkeyclient::{ClientConfiguration, ConnectionManager};
///
/// # async fn foo() -> Result<(), valkeyclient::ClientError> {
/// let config = ClientConfiguration::builder().host("127.0.0.1").build()?;
/// let pool = Pool::builder()
///     .max_size(15)
///     .build(ConnectionManager::new(config))
///     .await
///     .unwrap();
///
/// let client = pool.get().await.unwrap();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    config: ClientConfiguration,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(config: ClientConfiguration) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ManageConnection for ConnectionManager {
    type Connection = Client;
    type Error = ClientError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        trace!("ConnectionManager::connect()");
        Client::connect(self.config.clone()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        trace!("ConnectionManager::is_valid()");
        conn.ping().await.map(|_| ())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
