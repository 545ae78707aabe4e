//! End-to-end scenarios (spec.md §8) run against the in-process mock RESP
//! server in `tests/support`, since a real Valkey/Redis server is an
//! external dependency this repository's test run does not have available.
mod support;

use bytes::Bytes;
use valkeyclient::{ClientConfiguration, ClientError, Filter, Frame, Get, Incr, Set, TypedCommand};
use valkeyclient_core::command::encode_to_bytes;

async fn connect_to(port: u16) -> valkeyclient::Client {
    let config = ClientConfiguration::builder().host("127.0.0.1").port(port).build().unwrap();
    valkeyclient::Client::connect(config).await.unwrap()
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let (port, _server) = support::start(vec![b"+OK\r\n".to_vec(), b"$5\r\nHello\r\n".to_vec()]).await;
    let client = connect_to(port).await;

    client.execute(&Set::new("foo", "Hello")).await.unwrap();
    let value = client.execute(&Get { key: Bytes::from_static(b"foo") }).await.unwrap();
    assert_eq!(value, Some(Bytes::from_static(b"Hello")));
}

#[tokio::test]
async fn transaction_runs_queued_commands_under_exec() {
    let (port, _server) = support::start(vec![
        b"+OK\r\n".to_vec(),     // MULTI
        b"+QUEUED\r\n".to_vec(), // SET k 100
        b"+QUEUED\r\n".to_vec(), // INCR k
        b"+QUEUED\r\n".to_vec(), // GET k
        b"*3\r\n+OK\r\n:101\r\n$3\r\n101\r\n".to_vec(), // EXEC
    ])
    .await;
    let client = connect_to(port).await;

    let commands = vec![
        encode_to_bytes(&Set::new("k", "100")),
        encode_to_bytes(&Incr { key: Bytes::from_static(b"k") }),
        encode_to_bytes(&Get { key: Bytes::from_static(b"k") }),
    ];
    let responses = client.transaction(Vec::new(), commands).await.unwrap();
    assert_eq!(responses.len(), 3);
    let get_reply = Get { key: Bytes::from_static(b"k") }.decode_response(responses[2].clone()).unwrap();
    assert_eq!(get_reply, Some(Bytes::from_static(b"101")));
}

#[tokio::test]
async fn moved_redirect_is_followed_and_retried() {
    let (target_port, _target_server) = support::start(vec![b"$5\r\nHello\r\n".to_vec()]).await;
    let redirect = format!("-MOVED 1234 127.0.0.1:{target_port}\r\n").into_bytes();
    let (primary_port, _primary_server) = support::start(vec![redirect]).await;

    let client = connect_to(primary_port).await;
    let value = client.execute(&Get { key: Bytes::from_static(b"foo") }).await.unwrap();
    assert_eq!(value, Some(Bytes::from_static(b"Hello")));
}

#[tokio::test]
async fn a_dont_retry_error_surfaces_directly() {
    let (port, _server) = support::start(vec![b"-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".to_vec()]).await;
    let client = connect_to(port).await;

    let err = client.execute(&Get { key: Bytes::from_static(b"foo") }).await.unwrap_err();
    assert!(matches!(err, ClientError::Command { .. }));
}

#[tokio::test]
async fn a_watch_violated_by_another_client_aborts_the_transaction() {
    let (port, _server) = support::start(vec![
        b"+OK\r\n".to_vec(),     // WATCH w
        b"+OK\r\n".to_vec(),     // MULTI
        b"+QUEUED\r\n".to_vec(), // SET w v2
        b"*-1\r\n".to_vec(),     // EXEC, aborted because w changed underneath the WATCH
    ])
    .await;
    let client = connect_to(port).await;

    let err = client
        .transaction(vec![Bytes::from_static(b"w")], vec![encode_to_bytes(&Set::new("w", "v2"))])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::TransactionAborted));
}

#[tokio::test]
async fn subscribe_delivers_published_messages_then_unsubscribes() {
    let (port, _server) =
        support::start_pubsub(vec![support::message_push("c1", "hello"), support::message_push("c1", "bye")]).await;
    let client = connect_to(port).await;

    let (first, second) = client
        .subscribe(vec![Filter::Channel(Bytes::from_static(b"c1"))], |mut stream| async move {
            let first = stream.recv().await.expect("first message");
            let second = stream.recv().await.expect("second message");
            (first.payload, second.payload)
        })
        .await
        .unwrap();

    assert!(matches!(&first, Frame::BulkString(Some(b)) if &b[..] == b"hello"));
    assert!(matches!(&second, Frame::BulkString(Some(b)) if &b[..] == b"bye"));
}
