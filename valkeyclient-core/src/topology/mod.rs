//! Node & replica state machine (spec.md §4.6): tracks the current primary
//! and its replicas, keeps a connection pool per node, and drives discovery
//! through `ROLE`. Guarded by one `std::sync::Mutex` over the map plus
//! current view, held only for the map update itself, per spec.md §5.
use crate::command::{Role, RoleReply};
use crate::conn::{ConnectParams, SslContextProvider};
use crate::error::{ClientError, ClientResult};
use crate::pool::{NodeConnectionFactory, Pool, PoolConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How a `read_only` command picks a node (spec.md §6's
/// `readOnlyCommandNodeSelection`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadRouting {
    #[default]
    Primary,
    CycleReplicas,
    CycleAllNodes,
}

/// A node's address, independent of which pool/connection currently serves
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl From<(String, u16)> for NodeAddr {
    fn from((host, port): (String, u16)) -> Self {
        Self { host, port }
    }
}

enum State {
    Uninitialized,
    Running { primary: NodeAddr, replicas: Vec<NodeAddr> },
}

struct Shared {
    state: State,
    pools: HashMap<NodeAddr, Arc<Pool<NodeConnectionFactory>>>,
}

type NodePool = Arc<Pool<NodeConnectionFactory>>;

/// Owns the primary/replica view for one logical server (standalone,
/// replicated, or a single shard of a cluster) plus one pool per known
/// node.
pub struct Topology {
    shared: Mutex<Shared>,
    base_params: ConnectParams,
    ssl: Arc<dyn SslContextProvider>,
    pool_config: PoolConfig,
    read_routing: ReadRouting,
    /// If true, a `ROLE` reply reporting this node as a replica does not
    /// cause a primary switch-over (the client was deliberately pointed at
    /// a replica to read from it directly).
    stay_on_replica: bool,
    discover_replicas: bool,
    read_cursor: AtomicUsize,
}

impl Topology {
    #[must_use]
    pub fn new(
        base_params: ConnectParams,
        ssl: Arc<dyn SslContextProvider>,
        pool_config: PoolConfig,
        read_routing: ReadRouting,
        stay_on_replica: bool,
        discover_replicas: bool,
    ) -> Self {
        Self {
            shared: Mutex::new(Shared {
                state: State::Uninitialized,
                pools: HashMap::new(),
            }),
            base_params,
            ssl,
            pool_config,
            read_routing,
            stay_on_replica,
            discover_replicas,
            read_cursor: AtomicUsize::new(0),
        }
    }

    /// Point the topology at a new primary, creating its pool if needed,
    /// and (when configured to discover replicas) query `ROLE` against it
    /// to refresh the replica set.
    pub async fn set_primary(&self, addr: NodeAddr) -> ClientResult<()> {
        debug!("topology: set_primary({}:{})", addr.host, addr.port);
        let pool = self.node_pool(&addr);
        {
            let mut shared = self.shared.lock().unwrap();
            shared.state = State::Running {
                primary: addr.clone(),
                replicas: match &shared.state {
                    State::Running { replicas, .. } => replicas.clone(),
                    State::Uninitialized => Vec::new(),
                },
            };
        }
        if self.discover_replicas {
            let conn = pool.lease().await?;
            let reply = conn.execute(&Role).await?;
            drop(conn);
            self.handle_role_reply(reply).await?;
        }
        Ok(())
    }

    /// Replace the current replica set with `addrs`, creating pools for
    /// any newly-listed node and dropping pools for ones no longer listed.
    pub fn add_replicas(&self, addrs: Vec<NodeAddr>) {
        let mut shared = self.shared.lock().unwrap();
        let State::Running { primary, replicas } = &mut shared.state else {
            warn!("add_replicas called before a primary was set; ignoring");
            return;
        };
        let removed: Vec<NodeAddr> = replicas.iter().filter(|r| !addrs.contains(*r)).cloned().collect();
        *replicas = addrs.clone();
        let primary = primary.clone();
        drop(shared);

        for addr in &addrs {
            self.node_pool(addr);
        }
        let mut shared = self.shared.lock().unwrap();
        for addr in removed {
            if addr != primary {
                debug!("topology: dropping pool for departed replica {}:{}", addr.host, addr.port);
                shared.pools.remove(&addr);
            }
        }
    }

    async fn handle_role_reply(&self, reply: RoleReply) -> ClientResult<()> {
        match reply {
            RoleReply::Primary { replicas, .. } => {
                let addrs = replicas.into_iter().map(NodeAddr::from).collect();
                self.add_replicas(addrs);
                Ok(())
            }
            RoleReply::Replica { primary_host, primary_port } => {
                if self.stay_on_replica {
                    return Ok(());
                }
                // Box the recursion through set_primary: this node is a
                // replica of another primary, follow it.
                let new_primary = NodeAddr::new(primary_host, primary_port);
                Box::pin(self.set_primary(new_primary)).await
            }
            RoleReply::Sentinel => Err(ClientError::SentinelNotSupported),
        }
    }

    /// The pool for a non-read-only command: always the current primary.
    pub fn pool_for_write(&self) -> ClientResult<NodePool> {
        let shared = self.shared.lock().unwrap();
        match &shared.state {
            State::Running { primary, .. } => Ok(shared.pools.get(primary).expect("primary always has a pool").clone()),
            State::Uninitialized => Err(ClientError::InvalidConfiguration(
                "no primary has been set yet".to_string(),
            )),
        }
    }

    /// The pool for a `read_only` command, per [`ReadRouting`].
    pub fn pool_for_read(&self) -> ClientResult<NodePool> {
        let shared = self.shared.lock().unwrap();
        let State::Running { primary, replicas } = &shared.state else {
            return Err(ClientError::InvalidConfiguration("no primary has been set yet".to_string()));
        };
        let candidates: Vec<&NodeAddr> = match self.read_routing {
            ReadRouting::Primary => vec![primary],
            ReadRouting::CycleReplicas if !replicas.is_empty() => replicas.iter().collect(),
            ReadRouting::CycleReplicas => vec![primary],
            // Resolved Open Question (spec.md §9): cycleAllNodes includes
            // the primary in rotation whenever it is healthy; "healthy" is
            // left to the pool's own circuit breaker rather than probed
            // here, since `Pool::lease` already fails fast when it isn't.
            ReadRouting::CycleAllNodes => std::iter::once(primary).chain(replicas.iter()).collect(),
        };
        let i = self.read_cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Ok(shared.pools.get(candidates[i]).expect("candidate always has a pool").clone())
    }

    /// The pool for an arbitrary node address, creating it on demand. Used
    /// by the retry driver for one-off `ASK` redirects that should not
    /// perturb the primary/replica view.
    pub fn node_pool(&self, addr: &NodeAddr) -> NodePool {
        let mut shared = self.shared.lock().unwrap();
        shared
            .pools
            .entry(addr.clone())
            .or_insert_with(|| {
                let mut params = self.base_params.clone();
                params.host = addr.host.clone();
                params.port = addr.port;
                Pool::new(NodeConnectionFactory::new(params, self.ssl.clone()), self.pool_config.clone())
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::CoalescingSslContextProvider;

    fn test_topology(read_routing: ReadRouting) -> Topology {
        Topology::new(
            ConnectParams::new("127.0.0.1", 6379),
            Arc::new(CoalescingSslContextProvider::new()),
            PoolConfig::default(),
            read_routing,
            false,
            false,
        )
    }

    #[test]
    fn read_routing_cycles_over_replicas_only() {
        let topo = test_topology(ReadRouting::CycleReplicas);
        {
            let mut shared = topo.shared.lock().unwrap();
            shared.state = State::Running {
                primary: NodeAddr::new("p", 1),
                replicas: vec![NodeAddr::new("r1", 2), NodeAddr::new("r2", 3)],
            };
        }
        topo.node_pool(&NodeAddr::new("r1", 2));
        topo.node_pool(&NodeAddr::new("r2", 3));
        let first = topo.pool_for_read().unwrap();
        let second = topo.pool_for_read().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn write_pool_is_always_primary() {
        let topo = test_topology(ReadRouting::CycleAllNodes);
        topo.node_pool(&NodeAddr::new("p", 1));
        {
            let mut shared = topo.shared.lock().unwrap();
            shared.state = State::Running {
                primary: NodeAddr::new("p", 1),
                replicas: Vec::new(),
            };
        }
        let pool = topo.pool_for_write().unwrap();
        assert!(Arc::ptr_eq(&pool, &topo.node_pool(&NodeAddr::new("p", 1))));
    }
}
