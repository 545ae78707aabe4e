// advisable because not all test modules use all functions of this module:
#![allow(dead_code)]

//! A tiny in-process mock RESP3 server (spec.md §8's end-to-end scenarios):
//! accepts one connection, answers the handshake automatically, then
//! replies to each subsequent command with the next entry of a scripted
//! reply list, in order. A real Valkey/Redis server is an external
//! dependency this repository's test run does not have available, so
//! connection setup here drives a fake one instead of a real database.
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use valkeyclient_core::resp::decode_frame;

/// Bytes of the `HELLO 3` reply this harness always answers with: protocol
/// 3, standalone mode, role master.
pub fn hello_reply() -> Vec<u8> {
    b"%6\r\n\
$6\r\nserver\r\n$6\r\nvalkey\r\n\
$7\r\nversion\r\n$5\r\n7.2.0\r\n\
$5\r\nproto\r\n:3\r\n\
$2\r\nid\r\n:1\r\n\
$4\r\nmode\r\n$10\r\nstandalone\r\n\
$4\r\nrole\r\n$6\r\nmaster\r\n"
        .to_vec()
}

pub fn ok_reply() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

/// Reads exactly one complete RESP frame off `socket`, across as many reads
/// as needed.
async fn read_one_frame(socket: &mut TcpStream, buf: &mut BytesMut) -> valkeyclient_core::Frame {
    loop {
        if let Some(frame) = decode_frame(buf).expect("mock server received malformed frame") {
            return frame;
        }
        let mut chunk = [0u8; 4096];
        let n = socket.read(&mut chunk).await.expect("mock server read failed");
        assert!(n > 0, "connection closed before a full frame arrived");
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Bytes of a RESP3 `message` push frame for a plain channel subscription.
pub fn message_push(channel: &str, payload: &str) -> Vec<u8> {
    format!(
        ">3\r\n$7\r\nmessage\r\n${}\r\n{channel}\r\n${}\r\n{payload}\r\n",
        channel.len(),
        payload.len()
    )
    .into_bytes()
}

/// Start a mock server that, after the handshake, reads one `SUBSCRIBE`
/// frame, immediately pushes `messages` back-to-back (no request/reply
/// pairing, since `SUBSCRIBE`/`UNSUBSCRIBE` are fire-and-forget on the wire),
/// then reads and silently drops the matching `UNSUBSCRIBE`.
pub async fn start_pubsub(messages: Vec<Vec<u8>>) -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept mock connection");
        let mut buf = BytesMut::new();

        let _ = read_one_frame(&mut socket, &mut buf).await; // HELLO
        socket.write_all(&hello_reply()).await.unwrap();
        for _ in 0..2 {
            let _ = read_one_frame(&mut socket, &mut buf).await; // CLIENT SETINFO x2
            socket.write_all(&ok_reply()).await.unwrap();
        }

        let _ = read_one_frame(&mut socket, &mut buf).await; // SUBSCRIBE
        for message in messages {
            socket.write_all(&message).await.unwrap();
        }

        let _ = read_one_frame(&mut socket, &mut buf).await; // UNSUBSCRIBE
    });
    (port, handle)
}

/// Start a mock server on an ephemeral localhost port. After completing the
/// handshake, replies to each subsequent command, in order, with the
/// corresponding entry of `script`; any later commands receive `+OK\r\n`.
/// Returns the port to connect to and the background task's handle.
pub async fn start(script: Vec<Vec<u8>>) -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept mock connection");
        let mut buf = BytesMut::new();

        // HELLO
        let _ = read_one_frame(&mut socket, &mut buf).await;
        socket.write_all(&hello_reply()).await.unwrap();
        // CLIENT SETINFO lib-name, CLIENT SETINFO lib-ver
        for _ in 0..2 {
            let _ = read_one_frame(&mut socket, &mut buf).await;
            socket.write_all(&ok_reply()).await.unwrap();
        }

        for reply in script {
            let _ = read_one_frame(&mut socket, &mut buf).await;
            socket.write_all(&reply).await.unwrap();
        }
        // Keep serving +OK for anything beyond the scripted replies
        // (e.g. a redirect retry's second attempt against the same mock).
        loop {
            let _ = read_one_frame(&mut socket, &mut buf).await;
            if socket.write_all(&ok_reply()).await.is_err() {
                return;
            }
        }
    });
    (port, handle)
}
