//! Per-connection configuration (spec.md §6's connection-level knobs).
use std::time::Duration;

/// Parameters needed to dial and authenticate one connection to one node.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Server name used for certificate verification; independent of
    /// `host` so a connection can be dialed by IP while still verifying
    /// against a DNS name.
    pub tls_server_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_name: Option<String>,
    pub db: Option<u8>,
    pub command_timeout: Duration,
    pub blocking_command_timeout: Duration,
    pub connect_timeout: Duration,
    pub keep_alive_frequency: Option<Duration>,
    pub lib_name: &'static str,
    pub lib_version: &'static str,
}

impl ConnectParams {
    /// A minimal, unauthenticated, non-TLS connection to `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            tls_server_name: None,
            username: None,
            password: None,
            client_name: None,
            db: None,
            command_timeout: Duration::from_millis(30_000),
            blocking_command_timeout: Duration::from_millis(120_000),
            connect_timeout: Duration::from_millis(10_000),
            keep_alive_frequency: None,
            lib_name: "valkeyclient",
            lib_version: env!("CARGO_PKG_VERSION"),
        }
    }

    #[must_use]
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_tls(mut self, server_name: impl Into<String>) -> Self {
        self.tls = true;
        self.tls_server_name = Some(server_name.into());
        self
    }

    #[must_use]
    pub fn with_db(mut self, db: u8) -> Self {
        self.db = Some(db);
        self
    }

    /// A copy of these params pointed at a different host/port, as used
    /// after a `MOVED`/`ASK`/`REDIRECT` reply.
    #[must_use]
    pub fn redirected(&self, host: impl Into<String>, port: u16) -> Self {
        let mut next = self.clone();
        next.host = host.into();
        next.port = port;
        next
    }
}

impl std::fmt::Display for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, if self.tls { " (tls)" } else { "" })
    }
}
