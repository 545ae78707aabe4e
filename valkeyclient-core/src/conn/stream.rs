//! The dialed byte stream: plain TCP or TLS-over-TCP, dispatched through a
//! tagged enum rather than a trait object (teacher precedent:
//! `conn::TcpClient::{SyncPlain, SyncTls, AsyncPlain, AsyncTls, Dead}`).
use crate::conn::config::ConnectParams;
use crate::conn::tls::SslContextProvider;
use crate::error::{ClientError, ClientResult};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// Either half of a dialed connection: a bare TCP socket, or one wrapped in
/// a TLS session. Both implement [`AsyncRead`]/[`AsyncWrite`] by dispatching
/// to the wrapped value.
pub enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_flush(cx),
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Stream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Dial `params.host:params.port`, wrapping in TLS when `params.tls` is set.
pub async fn dial(params: &ConnectParams, ssl: &dyn SslContextProvider) -> ClientResult<Stream> {
    let addr = (params.host.as_str(), params.port);
    let tcp = tokio::time::timeout(params.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout)??;
    tcp.set_nodelay(true).ok();

    if !params.tls {
        return Ok(Stream::Plain(tcp));
    }
    let server_name = params
        .tls_server_name
        .as_deref()
        .unwrap_or(params.host.as_str());
    let (connector, name) = crate::conn::tls::connector_for(ssl, server_name).await?;
    let tls = connector
        .connect(name, tcp)
        .await
        .map_err(|e| ClientError::Tls(e.to_string()))?;
    Ok(Stream::Tls(Box::new(tls)))
}
