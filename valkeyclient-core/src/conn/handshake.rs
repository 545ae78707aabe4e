//! The connection handshake (spec.md §6): exactly `HELLO 3` (with embedded
//! `AUTH` when credentials are present), `CLIENT SETINFO lib-name`, `CLIENT
//! SETINFO lib-ver`, optional `CLIENT SETNAME`, optional `SELECT dbnum`.
//! Staged as a construction sequence rather than one monolithic dial
//! routine, so each step's own error is distinguishable.
use crate::command::{ClientSetInfo, ClientSetName, Hello, HelloReply, Select, TypedCommand};
use crate::conn::config::ConnectParams;
use crate::conn::io::FrameReader;
use crate::conn::stream::Stream;
use crate::error::{ClientError, ClientResult};
use tokio::io::AsyncWriteExt;

async fn send_and_receive(
    stream: &mut Stream,
    reader: &mut FrameReader,
    bytes: bytes::Bytes,
) -> ClientResult<crate::resp::Frame> {
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    reader.read_frame(stream).await
}

/// Run the handshake to completion over an already-dialed `stream`.
/// A non-success `HELLO` or `SELECT` reply is fatal; `CLIENT SETINFO`
/// failures are logged and tolerated.
pub async fn perform(stream: &mut Stream, params: &ConnectParams) -> ClientResult<HelloReply> {
    let auth = match (&params.username, &params.password) {
        (Some(u), Some(p)) => Some((bytes::Bytes::from(u.clone()), bytes::Bytes::from(p.clone()))),
        _ => None,
    };
    let hello = Hello {
        auth,
        setname: None,
    };

    let mut reader = FrameReader::new();
    let frame = send_and_receive(stream, &mut reader, crate::command::encode_to_bytes(&hello)).await?;
    let reply = reject_error(frame, "HELLO")?;
    let hello_reply = hello
        .decode_response(reply)
        .map_err(|e| ClientError::UnexpectedType {
            expected: e.expected,
            got: e.got,
        })?;
    debug!("handshake: HELLO ok, server {} {}", hello_reply.server, hello_reply.version);

    for (attr, value) in [("lib-name", params.lib_name.to_string()), ("lib-ver", params.lib_version.to_string())] {
        let cmd = ClientSetInfo {
            attr,
            value: bytes::Bytes::from(value),
        };
        match send_and_receive(stream, &mut reader, crate::command::encode_to_bytes(&cmd)).await {
            Ok(frame) if !frame.is_error() => {}
            Ok(frame) => warn!(
                "handshake: CLIENT SETINFO {attr} rejected: {}",
                frame.as_error_message().unwrap_or("?")
            ),
            Err(e) => warn!("handshake: CLIENT SETINFO {attr} failed: {e}"),
        }
    }

    if let Some(name) = &params.client_name {
        let cmd = ClientSetName {
            name: bytes::Bytes::from(name.clone()),
        };
        let frame = send_and_receive(stream, &mut reader, crate::command::encode_to_bytes(&cmd)).await?;
        reject_error(frame, "CLIENT SETNAME")?;
        debug!("handshake: CLIENT SETNAME ok");
    }

    if let Some(db) = params.db {
        let cmd = Select { db: i64::from(db) };
        let frame = send_and_receive(stream, &mut reader, crate::command::encode_to_bytes(&cmd)).await?;
        reject_error(frame, "SELECT")?;
        debug!("handshake: SELECT {db} ok");
    }

    Ok(hello_reply)
}

fn reject_error(frame: crate::resp::Frame, step: &'static str) -> ClientResult<crate::resp::Frame> {
    if frame.is_error() {
        Err(ClientError::Command {
            message: format!("{step}: {}", frame.as_error_message().unwrap_or("?")),
        })
    } else {
        Ok(frame)
    }
}
