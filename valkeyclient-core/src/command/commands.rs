//! Hand-written command stubs standing in for the codegen output described
//! in spec.md §6: enough of the catalogue to exercise every encoding shape
//! (pure-token flags, one-of arguments, combined-with-count multiples) and
//! every response shape the driver, transaction, and subscription paths
//! need at runtime. The generator in `valkeyclient-codegen` produces more of
//! these from the full command catalogue; these are not placeholders, they
//! are the ones the core crate itself depends on (handshake, transactions,
//! pub/sub, topology discovery).
use super::{multiple_with_count, pure_token, FromFrame, FromFrameError};
use crate::command::{Command, TypedCommand};
use crate::resp::{Encoder, Frame};
use bytes::Bytes;

fn bulk_string_bytes(name: &'static str, enc: &mut Encoder, args: &[&[u8]]) {
    enc.write_array_header(1 + args.len());
    enc.write_bulk(name);
    for a in args {
        enc.write_bulk(*a);
    }
}

/// `GET key`
#[derive(Debug, Clone)]
pub struct Get {
    pub key: Bytes,
}

impl Command for Get {
    fn name(&self) -> &'static str {
        "GET"
    }
    fn keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(2);
        enc.write_bulk("GET");
        enc.write_bulk(&self.key);
    }
}

impl TypedCommand for Get {
    type Response = Option<Bytes>;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        Option::<Bytes>::from_frame(frame)
    }
}

/// Expiry clause for `SET`'s one-of expiry argument: `EX seconds | PX millis
/// | EXAT unix-secs | PXAT unix-millis | KEEPTTL`.
#[derive(Debug, Clone, Copy)]
pub enum SetExpiry {
    Ex(i64),
    Px(i64),
    ExAt(i64),
    PxAt(i64),
    KeepTtl,
}

impl SetExpiry {
    fn encode(self, enc: &mut Encoder) {
        match self {
            Self::Ex(n) => {
                enc.write_bulk("EX");
                enc.write_bulk(n.to_string().as_str());
            }
            Self::Px(n) => {
                enc.write_bulk("PX");
                enc.write_bulk(n.to_string().as_str());
            }
            Self::ExAt(n) => {
                enc.write_bulk("EXAT");
                enc.write_bulk(n.to_string().as_str());
            }
            Self::PxAt(n) => {
                enc.write_bulk("PXAT");
                enc.write_bulk(n.to_string().as_str());
            }
            Self::KeepTtl => enc.write_bulk("KEEPTTL"),
        }
    }
}

/// `SET key value [NX|XX] [GET] [expiry]`
#[derive(Debug, Clone)]
pub struct Set {
    pub key: Bytes,
    pub value: Bytes,
    pub nx: bool,
    pub xx: bool,
    pub get: bool,
    pub expiry: Option<SetExpiry>,
}

impl Set {
    /// A plain `SET key value` with no flags.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            nx: false,
            xx: false,
            get: false,
            expiry: None,
        }
    }
}

impl Command for Set {
    fn name(&self) -> &'static str {
        "SET"
    }
    fn keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(self.arity());
        enc.write_bulk("SET");
        enc.write_bulk(&self.key);
        enc.write_bulk(&self.value);
        pure_token(enc, "NX", self.nx);
        pure_token(enc, "XX", self.xx);
        pure_token(enc, "GET", self.get);
        if let Some(expiry) = self.expiry {
            expiry.encode(enc);
        }
    }
}

impl Set {
    fn arity(&self) -> usize {
        3 + self.nx as usize
            + self.xx as usize
            + self.get as usize
            + match self.expiry {
                None => 0,
                Some(SetExpiry::KeepTtl) => 1,
                Some(_) => 2,
            }
    }
}

impl TypedCommand for Set {
    /// `None` only when `GET` is set and no prior value existed; otherwise
    /// `Some(())` for the plain `OK` acknowledgement.
    type Response = Option<Bytes>;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        if self.get {
            Option::<Bytes>::from_frame(frame)
        } else {
            <()>::from_frame(frame).map(|()| None)
        }
    }
}

/// `DEL key [key ...]`
#[derive(Debug, Clone)]
pub struct Del {
    pub keys: Vec<Bytes>,
}

impl Command for Del {
    fn name(&self) -> &'static str {
        "DEL"
    }
    fn keys(&self) -> Vec<Bytes> {
        self.keys.clone()
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.keys.len());
        enc.write_bulk("DEL");
        for key in &self.keys {
            enc.write_bulk(key);
        }
    }
}

impl TypedCommand for Del {
    type Response = i64;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        i64::from_frame(frame)
    }
}

/// `EXPIRE key seconds [NX|XX|GT|LT]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    None,
    Nx,
    Xx,
    Gt,
    Lt,
}

#[derive(Debug, Clone)]
pub struct Expire {
    pub key: Bytes,
    pub seconds: i64,
    pub condition: ExpireCondition,
}

impl Command for Expire {
    fn name(&self) -> &'static str {
        "EXPIRE"
    }
    fn keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
    fn encode(&self, enc: &mut Encoder) {
        let token = match self.condition {
            ExpireCondition::None => None,
            ExpireCondition::Nx => Some("NX"),
            ExpireCondition::Xx => Some("XX"),
            ExpireCondition::Gt => Some("GT"),
            ExpireCondition::Lt => Some("LT"),
        };
        enc.write_array_header(3 + token.is_some() as usize);
        enc.write_bulk("EXPIRE");
        enc.write_bulk(&self.key);
        enc.write_bulk(self.seconds.to_string().as_str());
        if let Some(t) = token {
            enc.write_bulk(t);
        }
    }
}

impl TypedCommand for Expire {
    type Response = bool;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        Ok(i64::from_frame(frame)? != 0)
    }
}

/// `INCR key`
#[derive(Debug, Clone)]
pub struct Incr {
    pub key: Bytes,
}

impl Command for Incr {
    fn name(&self) -> &'static str {
        "INCR"
    }
    fn keys(&self) -> Vec<Bytes> {
        vec![self.key.clone()]
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(2);
        enc.write_bulk("INCR");
        enc.write_bulk(&self.key);
    }
}

impl TypedCommand for Incr {
    type Response = i64;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        i64::from_frame(frame)
    }
}

/// `MULTI`
#[derive(Debug, Clone, Copy, Default)]
pub struct Multi;

impl Command for Multi {
    fn name(&self) -> &'static str {
        "MULTI"
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("MULTI", enc, &[]);
    }
}

impl TypedCommand for Multi {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `EXEC`. Decodes to `None` when the transaction was aborted by a watched
/// key (the server's null array reply); the driver turns that into
/// `TransactionAborted` rather than handing callers a bare `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exec;

impl Command for Exec {
    fn name(&self) -> &'static str {
        "EXEC"
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("EXEC", enc, &[]);
    }
}

impl TypedCommand for Exec {
    type Response = Option<Vec<Frame>>;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        match frame {
            Frame::Array(None) => Ok(None),
            Frame::Array(Some(agg)) => {
                let frames = agg.to_vec().map_err(|_| FromFrameError {
                    expected: "exec results",
                    got: "malformed frame",
                })?;
                Ok(Some(frames))
            }
            other => Err(FromFrameError {
                expected: "array",
                got: other.type_name(),
            }),
        }
    }
}

/// `DISCARD`
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Command for Discard {
    fn name(&self) -> &'static str {
        "DISCARD"
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("DISCARD", enc, &[]);
    }
}

impl TypedCommand for Discard {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `WATCH key [key ...]`
#[derive(Debug, Clone)]
pub struct Watch {
    pub keys: Vec<Bytes>,
}

impl Command for Watch {
    fn name(&self) -> &'static str {
        "WATCH"
    }
    fn keys(&self) -> Vec<Bytes> {
        self.keys.clone()
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.keys.len());
        enc.write_bulk("WATCH");
        for key in &self.keys {
            enc.write_bulk(key);
        }
    }
}

impl TypedCommand for Watch {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `UNWATCH`
#[derive(Debug, Clone, Copy, Default)]
pub struct Unwatch;

impl Command for Unwatch {
    fn name(&self) -> &'static str {
        "UNWATCH"
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("UNWATCH", enc, &[]);
    }
}

impl TypedCommand for Unwatch {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `PING [message]`
#[derive(Debug, Clone, Default)]
pub struct Ping {
    pub message: Option<Bytes>,
}

impl Command for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }
    fn encode(&self, enc: &mut Encoder) {
        match &self.message {
            Some(m) => {
                enc.write_array_header(2);
                enc.write_bulk("PING");
                enc.write_bulk(m);
            }
            None => bulk_string_bytes("PING", enc, &[]),
        }
    }
}

impl TypedCommand for Ping {
    type Response = Bytes;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        Bytes::from_frame(frame)
    }
}

/// `HELLO 3 [AUTH user pass] [SETNAME name]`, the handshake's first step.
#[derive(Debug, Clone)]
pub struct Hello {
    pub auth: Option<(Bytes, Bytes)>,
    pub setname: Option<Bytes>,
}

impl Command for Hello {
    fn name(&self) -> &'static str {
        "HELLO"
    }
    fn encode(&self, enc: &mut Encoder) {
        let mut argc = 2;
        if self.auth.is_some() {
            argc += 3;
        }
        if self.setname.is_some() {
            argc += 2;
        }
        enc.write_array_header(argc);
        enc.write_bulk("HELLO");
        enc.write_bulk("3");
        if let Some((user, pass)) = &self.auth {
            enc.write_bulk("AUTH");
            enc.write_bulk(user);
            enc.write_bulk(pass);
        }
        if let Some(name) = &self.setname {
            enc.write_bulk("SETNAME");
            enc.write_bulk(name);
        }
    }
}

/// The server's `HELLO` reply map, decoded into the fields the handshake
/// cares about (server name/version/protocol version, id, running mode,
/// role, modules list is dropped rather than typed).
#[derive(Debug, Clone)]
pub struct HelloReply {
    pub server: String,
    pub version: String,
    pub proto: i64,
    pub id: i64,
    pub mode: String,
    pub role: String,
}

impl FromFrame for HelloReply {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        use std::collections::HashMap;
        let map = HashMap::<String, Frame>::from_frame(frame)?;
        let take_str = |map: &HashMap<String, Frame>, k: &str| -> Result<String, FromFrameError> {
            map.get(k)
                .cloned()
                .ok_or(FromFrameError {
                    expected: "hello field",
                    got: "missing",
                })
                .and_then(String::from_frame)
        };
        let take_i64 = |map: &HashMap<String, Frame>, k: &str| -> Result<i64, FromFrameError> {
            map.get(k)
                .cloned()
                .ok_or(FromFrameError {
                    expected: "hello field",
                    got: "missing",
                })
                .and_then(i64::from_frame)
        };
        Ok(HelloReply {
            server: take_str(&map, "server")?,
            version: take_str(&map, "version")?,
            proto: take_i64(&map, "proto")?,
            id: take_i64(&map, "id")?,
            mode: take_str(&map, "mode")?,
            role: take_str(&map, "role")?,
        })
    }
}

impl TypedCommand for Hello {
    type Response = HelloReply;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        HelloReply::from_frame(frame)
    }
}

/// `AUTH user pass`, used standalone for re-authentication outside HELLO.
#[derive(Debug, Clone)]
pub struct Auth {
    pub username: Bytes,
    pub password: Bytes,
}

impl Command for Auth {
    fn name(&self) -> &'static str {
        "AUTH"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(3);
        enc.write_bulk("AUTH");
        enc.write_bulk(&self.username);
        enc.write_bulk(&self.password);
    }
}

impl TypedCommand for Auth {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `CLIENT SETINFO attr value`
#[derive(Debug, Clone)]
pub struct ClientSetInfo {
    pub attr: &'static str,
    pub value: Bytes,
}

impl Command for ClientSetInfo {
    fn name(&self) -> &'static str {
        "CLIENT"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(4);
        enc.write_bulk("CLIENT");
        enc.write_bulk("SETINFO");
        enc.write_bulk(self.attr);
        enc.write_bulk(&self.value);
    }
}

impl TypedCommand for ClientSetInfo {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `CLIENT SETNAME name`
#[derive(Debug, Clone)]
pub struct ClientSetName {
    pub name: Bytes,
}

impl Command for ClientSetName {
    fn name(&self) -> &'static str {
        "CLIENT"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(3);
        enc.write_bulk("CLIENT");
        enc.write_bulk("SETNAME");
        enc.write_bulk(&self.name);
    }
}

impl TypedCommand for ClientSetName {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `SELECT dbnum`
#[derive(Debug, Clone, Copy)]
pub struct Select {
    pub db: i64,
}

impl Command for Select {
    fn name(&self) -> &'static str {
        "SELECT"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(2);
        enc.write_bulk("SELECT");
        enc.write_bulk(self.db.to_string().as_str());
    }
}

impl TypedCommand for Select {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `ASKING`, sent once ahead of a command retried after an `ASK` redirect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Asking;

impl Command for Asking {
    fn name(&self) -> &'static str {
        "ASKING"
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("ASKING", enc, &[]);
    }
}

impl TypedCommand for Asking {
    type Response = ();
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        <()>::from_frame(frame)
    }
}

/// `ROLE`, used for primary/replica discovery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Role;

impl Command for Role {
    fn name(&self) -> &'static str {
        "ROLE"
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn encode(&self, enc: &mut Encoder) {
        bulk_string_bytes("ROLE", enc, &[]);
    }
}

/// The `ROLE` reply, shaped differently for a primary vs. a replica; only
/// the fields the topology state machine needs are kept.
#[derive(Debug, Clone)]
pub enum RoleReply {
    Primary {
        replication_offset: i64,
        replicas: Vec<(String, u16)>,
    },
    Replica {
        primary_host: String,
        primary_port: u16,
    },
    Sentinel,
}

impl FromFrame for RoleReply {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let elements = match &frame {
            Frame::Array(Some(agg)) => agg.to_vec().map_err(|_| FromFrameError {
                expected: "role reply",
                got: "malformed frame",
            })?,
            other => {
                return Err(FromFrameError {
                    expected: "array",
                    got: other.type_name(),
                })
            }
        };
        let mut iter = elements.into_iter();
        let kind = String::from_frame(iter.next().ok_or(FromFrameError {
            expected: "role kind",
            got: "missing",
        })?)?;
        match kind.as_str() {
            "master" => {
                let offset = i64::from_frame(iter.next().ok_or(FromFrameError {
                    expected: "replication offset",
                    got: "missing",
                })?)?;
                let replica_rows = iter.next().ok_or(FromFrameError {
                    expected: "replica list",
                    got: "missing",
                })?;
                let rows: Vec<(String, String, String)> = Vec::<(String, String, String)>::from_frame(replica_rows)?;
                let replicas = rows
                    .into_iter()
                    .map(|(host, port, _offset)| {
                        let port: u16 = port.parse().map_err(|_| FromFrameError {
                            expected: "port number",
                            got: "non-numeric port",
                        })?;
                        Ok((host, port))
                    })
                    .collect::<Result<Vec<_>, FromFrameError>>()?;
                Ok(RoleReply::Primary {
                    replication_offset: offset,
                    replicas,
                })
            }
            "slave" | "replica" => {
                let primary_host = String::from_frame(iter.next().ok_or(FromFrameError {
                    expected: "primary host",
                    got: "missing",
                })?)?;
                let primary_port_n = i64::from_frame(iter.next().ok_or(FromFrameError {
                    expected: "primary port",
                    got: "missing",
                })?)?;
                let primary_port = u16::try_from(primary_port_n).map_err(|_| FromFrameError {
                    expected: "port number",
                    got: "out of range",
                })?;
                Ok(RoleReply::Replica {
                    primary_host,
                    primary_port,
                })
            }
            "sentinel" => Ok(RoleReply::Sentinel),
            _ => Err(FromFrameError {
                expected: "master|slave|sentinel",
                got: "unrecognized role kind",
            }),
        }
    }
}

impl TypedCommand for Role {
    type Response = RoleReply;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        RoleReply::from_frame(frame)
    }
}

/// `SUBSCRIBE channel [channel ...]`
#[derive(Debug, Clone)]
pub struct Subscribe {
    pub channels: Vec<Bytes>,
}

impl Command for Subscribe {
    fn name(&self) -> &'static str {
        "SUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.channels.len());
        enc.write_bulk("SUBSCRIBE");
        for c in &self.channels {
            enc.write_bulk(c);
        }
    }
}

/// `PSUBSCRIBE pattern [pattern ...]`
#[derive(Debug, Clone)]
pub struct PSubscribe {
    pub patterns: Vec<Bytes>,
}

impl Command for PSubscribe {
    fn name(&self) -> &'static str {
        "PSUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.patterns.len());
        enc.write_bulk("PSUBSCRIBE");
        for p in &self.patterns {
            enc.write_bulk(p);
        }
    }
}

/// `SSUBSCRIBE shardchannel [shardchannel ...]`
#[derive(Debug, Clone)]
pub struct SSubscribe {
    pub shard_channels: Vec<Bytes>,
}

impl Command for SSubscribe {
    fn name(&self) -> &'static str {
        "SSUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.shard_channels.len());
        enc.write_bulk("SSUBSCRIBE");
        for c in &self.shard_channels {
            enc.write_bulk(c);
        }
    }
}

/// `UNSUBSCRIBE [channel ...]`; no arguments unsubscribes from all.
#[derive(Debug, Clone, Default)]
pub struct Unsubscribe {
    pub channels: Vec<Bytes>,
}

impl Command for Unsubscribe {
    fn name(&self) -> &'static str {
        "UNSUBSCRIBE"
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + self.channels.len());
        enc.write_bulk("UNSUBSCRIBE");
        for c in &self.channels {
            enc.write_bulk(c);
        }
    }
}

/// An illustrative combined-with-count variadic command: `SINTERCARD
/// numkeys key [key ...] [LIMIT limit]`, chosen to exercise
/// [`multiple_with_count`].
#[derive(Debug, Clone)]
pub struct SInterCard {
    pub keys: Vec<Bytes>,
    pub limit: Option<i64>,
}

impl Command for SInterCard {
    fn name(&self) -> &'static str {
        "SINTERCARD"
    }
    fn keys(&self) -> Vec<Bytes> {
        self.keys.clone()
    }
    fn is_read_only(&self) -> bool {
        true
    }
    fn encode(&self, enc: &mut Encoder) {
        enc.write_array_header(1 + 1 + self.keys.len() + self.limit.map_or(0, |_| 2));
        enc.write_bulk("SINTERCARD");
        multiple_with_count(enc, &self.keys);
        if let Some(limit) = self.limit {
            enc.write_bulk("LIMIT");
            enc.write_bulk(limit.to_string().as_str());
        }
    }
}

impl TypedCommand for SInterCard {
    type Response = i64;
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError> {
        i64::from_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::encode_to_bytes;
    use crate::resp::decode_frame;
    use bytes::BytesMut;

    #[test]
    fn encodes_get() {
        let cmd = Get {
            key: Bytes::from_static(b"foo"),
        };
        assert_eq!(&encode_to_bytes(&cmd)[..], b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n");
    }

    #[test]
    fn encodes_set_with_nx_and_expiry() {
        let cmd = Set {
            key: Bytes::from_static(b"foo"),
            value: Bytes::from_static(b"bar"),
            nx: true,
            xx: false,
            get: false,
            expiry: Some(SetExpiry::Ex(60)),
        };
        let bytes = encode_to_bytes(&cmd);
        assert_eq!(
            &bytes[..],
            b"*6\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nNX\r\n$2\r\nEX\r\n$2\r\n60\r\n"
        );
    }

    #[test]
    fn decodes_exec_null_as_none() {
        let mut buf = BytesMut::from(&b"*-1\r\n"[..]);
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(Exec.decode_response(frame).unwrap(), None);
    }

    #[test]
    fn decodes_role_primary() {
        let mut buf = BytesMut::from(
            &b"*3\r\n+master\r\n:3129659\r\n*1\r\n*3\r\n$9\r\n127.0.0.1\r\n$4\r\n6380\r\n$7\r\n3129659\r\n"[..],
        );
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        match Role.decode_response(frame).unwrap() {
            RoleReply::Primary {
                replication_offset,
                replicas,
            } => {
                assert_eq!(replication_offset, 3129659);
                assert_eq!(replicas, vec![("127.0.0.1".to_string(), 6380)]);
            }
            other => panic!("expected primary role, got {other:?}"),
        }
    }

    #[test]
    fn encodes_sintercard_with_limit() {
        let cmd = SInterCard {
            keys: vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")],
            limit: Some(5),
        };
        let bytes = encode_to_bytes(&cmd);
        assert_eq!(
            &bytes[..],
            b"*6\r\n$10\r\nSINTERCARD\r\n$1\r\n2\r\n$1\r\na\r\n$1\r\nb\r\n$5\r\nLIMIT\r\n$1\r\n5\r\n"
        );
    }
}
