//! TLS context acquisition (spec.md §6: "The connection factory obtains an
//! SSL context from a `SSLContextProvider.get() -> SSLContext` which is
//! asynchronous and MAY coalesce concurrent callers").
use crate::error::{ClientError, ClientResult};
use crate::util::OnceShared;
use std::sync::Arc;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;

/// An asynchronous, coalescing provider of a shared TLS client context.
///
/// Implementations MAY share one [`ClientConfig`] across concurrent
/// `get()` callers rather than rebuilding it per connection; see
/// [`CoalescingSslContextProvider`] for the default implementation, which
/// does exactly that via [`OnceShared`].
#[async_trait::async_trait]
pub trait SslContextProvider: Send + Sync {
    async fn get(&self) -> ClientResult<Arc<ClientConfig>>;
}

/// Builds one [`ClientConfig`] from the platform's webpki root store and
/// shares it across every connection that asks, producing it at most once
/// until every holder has released it.
#[derive(Default)]
pub struct CoalescingSslContextProvider {
    shared: OnceShared<Arc<ClientConfig>>,
}

impl CoalescingSslContextProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SslContextProvider for CoalescingSslContextProvider {
    async fn get(&self) -> ClientResult<Arc<ClientConfig>> {
        self.shared
            .get_or_init(|| async {
                let mut roots = tokio_rustls::rustls::RootCertStore::empty();
                roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
                    tokio_rustls::rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
                        ta.subject,
                        ta.spki,
                        ta.name_constraints,
                    )
                }));
                let config = ClientConfig::builder()
                    .with_safe_defaults()
                    .with_root_certificates(roots)
                    .with_no_client_auth();
                Ok::<_, ClientError>(Arc::new(config))
            })
            .await
    }

    // Note: no `release` call site exists yet because no connection holds
    // this provider's value across its own lifetime today; every connection
    // calls `get()` once at dial time and drops its `Arc` on close, which is
    // sufficient since `Arc<ClientConfig>` is itself cheaply shared. The
    // `OnceShared` refcount exists for parity with the subscription
    // connection's identical pattern and for provider implementations that
    // hold non-`Arc` resources.
}

/// Open a TLS-wrapped connector for `server_name` using a context obtained
/// from `provider`.
pub async fn connector_for(
    provider: &dyn SslContextProvider,
    server_name: &str,
) -> ClientResult<(TlsConnector, tokio_rustls::rustls::ServerName)> {
    let config = provider.get().await?;
    let name = tokio_rustls::rustls::ServerName::try_from(server_name)
        .map_err(|_| ClientError::Tls(format!("invalid TLS server name: {server_name}")))?;
    Ok((TlsConnector::from(config), name))
}
