//! Typed commands and response decoding (spec §4.2).
mod decode;
mod commands;

use crate::resp::{Encoder, Frame};
use bytes::Bytes;

pub use decode::{FromFrame, FromFrameError};
pub use commands::*;

/// A value that can encode itself as one RESP3 command (an array of bulk
/// strings) and knows which keys it touches, for routing.
pub trait Command {
    /// The command's wire name; for commands with a sub-command (e.g.
    /// `CLIENT SETNAME`), only the top-level literal.
    fn name(&self) -> &'static str;

    /// The keys this command reads or writes, for cluster/replica routing.
    fn keys(&self) -> Vec<Bytes> {
        Vec::new()
    }

    /// True if this command only reads state and may be routed to a
    /// replica.
    fn is_read_only(&self) -> bool {
        false
    }

    /// True if this command may block the connection awaiting a server
    /// event (e.g. `BLPOP`), and therefore uses the blocking timeout rather
    /// than the default command timeout.
    fn is_blocking(&self) -> bool {
        false
    }

    /// Write this command's arguments (including the command literal and
    /// any sub-command literal) onto `enc` as RESP3 bulk strings.
    fn encode(&self, enc: &mut Encoder);
}

/// A [`Command`] whose server reply decodes to a fixed, typed `Response`.
pub trait TypedCommand: Command {
    /// The decoded shape of this command's reply.
    type Response;

    /// Decode the server's reply frame into this command's typed response.
    fn decode_response(&self, frame: Frame) -> Result<Self::Response, FromFrameError>;
}

/// Render a full command as RESP3 bytes: the array header followed by each
/// argument as a bulk string.
pub fn encode_to_bytes<C: Command + ?Sized>(command: &C) -> Bytes {
    let mut enc = Encoder::new();
    command.encode(&mut enc);
    enc.into_bytes()
}

/// Helper for commands with a "pure token" flag: a literal string argument
/// that is written only when `present` is true, and otherwise contributes
/// nothing to the encoded command.
pub fn pure_token(enc: &mut Encoder, literal: &'static str, present: bool) {
    if present {
        enc.write_bulk(literal);
    }
}

/// Helper for a "multiple" argument combined with a leading count element
/// (the `numkeys`-style form used by e.g. `ZADD ... GT CH <score> <member>`
/// style variadic commands).
pub fn multiple_with_count<A: crate::resp::BulkArg>(enc: &mut Encoder, items: &[A]) {
    enc.write_bulk(items.len().to_string().as_str());
    for item in items {
        enc.write_bulk(item);
    }
}
