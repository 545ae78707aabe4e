//! Buffered frame reading over an `AsyncRead` half.
use crate::error::{ClientError, ClientResult};
use crate::resp::decode_frame;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Buffers a partial trailing frame across reads off whatever `AsyncRead`
/// half is passed to [`FrameReader::read_frame`]. Does not own the stream,
/// so callers remain free to interleave writes to the same socket between
/// reads (the handshake writes and reads on the same `&mut Stream`).
#[derive(Default)]
pub struct FrameReader {
    buf: BytesMut,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(8 * 1024),
        }
    }

    /// Read and decode exactly one frame from `stream`, reading more off the
    /// socket as needed. Fails with [`ClientError::ConnectionClosed`] on
    /// clean EOF.
    pub async fn read_frame<S: AsyncRead + Unpin>(&mut self, stream: &mut S) -> ClientResult<crate::resp::Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf)? {
                return Ok(frame);
            }
            let n = stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
        }
    }
}
