//! Client-level configuration (spec.md §6): the full set of recognised
//! keys, built with a chained `&mut self -> &mut Self` builder idiom.
use std::time::Duration;
use valkeyclient_core::conn::ConnectParams;
use valkeyclient_core::error::{ClientError, ClientResult};
use valkeyclient_core::pool::PoolConfig;
use valkeyclient_core::retry::RetryConfig;
use valkeyclient_core::topology::ReadRouting;

/// Whether and how a connection is secured.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Disabled,
    Enabled {
        /// Overrides the hostname used for certificate verification.
        server_name: Option<String>,
    },
}

/// The full set of settings spec.md §6 names, with its defaults.
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_name: Option<String>,
    pub database_number: u8,
    pub command_timeout: Duration,
    pub blocking_command_timeout: Duration,
    pub keep_alive_frequency: Option<Duration>,
    pub read_only_command_node_selection: ReadRouting,
    pub discover_replicas: bool,
    pub pool: PoolConfig,
    pub retry: RetryConfig,
}

impl ClientConfiguration {
    #[must_use]
    pub fn builder() -> ClientConfigurationBuilder {
        ClientConfigurationBuilder::default()
    }

    pub(crate) fn connect_params(&self) -> ConnectParams {
        let mut params = ConnectParams::new(self.host.clone(), self.port);
        params.command_timeout = self.command_timeout;
        params.blocking_command_timeout = self.blocking_command_timeout;
        params.keep_alive_frequency = self.keep_alive_frequency;
        params.client_name = self.client_name.clone();
        params.db = Some(self.database_number);
        params.username = self.username.clone();
        params.password = self.password.clone();
        match &self.tls {
            TlsMode::Disabled => {}
            TlsMode::Enabled { server_name } => {
                params.tls = true;
                params.tls_server_name = server_name.clone();
            }
        }
        params
    }
}

/// Builds a [`ClientConfiguration`], validating `databaseNumber ∈ 0..=15`
/// and the pool's `soft_max ≤ hard_max` at [`build`](Self::build) time.
#[derive(Debug, Clone)]
pub struct ClientConfigurationBuilder {
    host: String,
    port: u16,
    tls: TlsMode,
    username: Option<String>,
    password: Option<String>,
    client_name: Option<String>,
    database_number: u8,
    command_timeout: Duration,
    blocking_command_timeout: Duration,
    keep_alive_frequency: Option<Duration>,
    read_only_command_node_selection: ReadRouting,
    discover_replicas: bool,
    pool: PoolConfig,
    retry: RetryConfig,
}

impl Default for ClientConfigurationBuilder {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            tls: TlsMode::Disabled,
            username: None,
            password: None,
            client_name: None,
            database_number: 0,
            command_timeout: Duration::from_millis(30_000),
            blocking_command_timeout: Duration::from_millis(120_000),
            keep_alive_frequency: Some(Duration::from_millis(30_000)),
            read_only_command_node_selection: ReadRouting::Primary,
            discover_replicas: false,
            pool: PoolConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfigurationBuilder {
    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn tls(&mut self, tls: TlsMode) -> &mut Self {
        self.tls = tls;
        self
    }

    pub fn authentication(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn client_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn database_number(&mut self, db: u8) -> &mut Self {
        self.database_number = db;
        self
    }

    pub fn command_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.command_timeout = timeout;
        self
    }

    pub fn blocking_command_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.blocking_command_timeout = timeout;
        self
    }

    pub fn keep_alive_frequency(&mut self, frequency: Option<Duration>) -> &mut Self {
        self.keep_alive_frequency = frequency;
        self
    }

    pub fn read_only_command_node_selection(&mut self, selection: ReadRouting) -> &mut Self {
        self.read_only_command_node_selection = selection;
        self
    }

    pub fn discover_replicas(&mut self, discover: bool) -> &mut Self {
        self.discover_replicas = discover;
        self
    }

    pub fn pool(&mut self, pool: PoolConfig) -> &mut Self {
        self.pool = pool;
        self
    }

    pub fn retry(&mut self, retry: RetryConfig) -> &mut Self {
        self.retry = retry;
        self
    }

    pub fn build(&self) -> ClientResult<ClientConfiguration> {
        if self.database_number > 15 {
            return Err(ClientError::InvalidConfiguration(format!(
                "databaseNumber must be in 0..=15, got {}",
                self.database_number
            )));
        }
        if self.host.is_empty() {
            return Err(ClientError::MissingConfiguration("host"));
        }
        Ok(ClientConfiguration {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            client_name: self.client_name.clone(),
            database_number: self.database_number,
            command_timeout: self.command_timeout,
            blocking_command_timeout: self.blocking_command_timeout,
            keep_alive_frequency: self.keep_alive_frequency,
            read_only_command_node_selection: self.read_only_command_node_selection,
            discover_replicas: self.discover_replicas,
            pool: self.pool.clone(),
            retry: self.retry.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_database_number() {
        let err = ClientConfiguration::builder().database_number(16).build().unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfiguration(_)));
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = ClientConfiguration::builder().build().unwrap();
        assert_eq!(cfg.port, 6379);
        assert_eq!(cfg.database_number, 0);
        assert_eq!(cfg.read_only_command_node_selection, ReadRouting::Primary);
    }
}
