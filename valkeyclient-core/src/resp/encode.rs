//! Command encoding: every client request is an RESP array of bulk strings.
use bytes::{BufMut, Bytes, BytesMut};

/// A value that can be written as one RESP bulk string.
///
/// Implemented for owned strings, borrowed string slices, and borrowed byte
/// slices; all three produce byte-identical output for the same logical
/// content, since the encoder only ever looks at the underlying bytes.
pub trait BulkArg {
    /// The bytes this argument encodes to.
    fn as_bulk_bytes(&self) -> &[u8];
}

impl BulkArg for String {
    fn as_bulk_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl BulkArg for str {
    fn as_bulk_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl BulkArg for &str {
    fn as_bulk_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl BulkArg for [u8] {
    fn as_bulk_bytes(&self) -> &[u8] {
        self
    }
}

impl BulkArg for &[u8] {
    fn as_bulk_bytes(&self) -> &[u8] {
        self
    }
}

impl BulkArg for Vec<u8> {
    fn as_bulk_bytes(&self) -> &[u8] {
        self
    }
}

impl BulkArg for Bytes {
    fn as_bulk_bytes(&self) -> &[u8] {
        self
    }
}

impl<T: BulkArg + ?Sized> BulkArg for &T {
    fn as_bulk_bytes(&self) -> &[u8] {
        (**self).as_bulk_bytes()
    }
}

/// Accumulates an RESP3 request: an array of bulk strings.
///
/// Never produces the RESP2 inline-command form; every command is always
/// framed as `*n\r\n$len\r\n...\r\n` regardless of argument count.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    /// A fresh, empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Begin an array of `len` bulk-string elements.
    pub fn write_array_header(&mut self, len: usize) {
        self.buf.put_u8(b'*');
        write_itoa(&mut self.buf, len as i64);
        self.buf.put_slice(b"\r\n");
    }

    /// Write one bulk-string element.
    pub fn write_bulk<A: BulkArg + ?Sized>(&mut self, arg: &A) {
        let bytes = arg.as_bulk_bytes();
        self.buf.put_u8(b'$');
        write_itoa(&mut self.buf, bytes.len() as i64);
        self.buf.put_slice(b"\r\n");
        self.buf.put_slice(bytes);
        self.buf.put_slice(b"\r\n");
    }

    /// Consume the encoder, returning the accumulated bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// The number of bytes accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn write_itoa(buf: &mut BytesMut, value: i64) {
    let mut tmp = itoa::Buffer::new();
    buf.put_slice(tmp.format(value).as_bytes());
}

/// Encode a full command (array of bulk strings) from an iterator of
/// arguments implementing [`BulkArg`].
pub fn encode_command<'a, I, A>(args: I) -> Bytes
where
    I: IntoIterator<Item = &'a A>,
    I::IntoIter: ExactSizeIterator,
    A: BulkArg + 'a + ?Sized,
{
    let iter = args.into_iter();
    let mut enc = Encoder::new();
    enc.write_array_header(iter.len());
    for arg in iter {
        enc.write_bulk(arg);
    }
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_set_command() {
        let args: Vec<&str> = vec!["SET", "foo", "Hello"];
        let bytes = encode_command(&args);
        assert_eq!(&bytes[..], b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$5\r\nHello\r\n");
    }

    #[test]
    fn owned_borrowed_and_bytes_sinks_agree() {
        let owned = "Hello".to_string();
        let borrowed: &str = "Hello";
        let raw: &[u8] = b"Hello";

        let mut e1 = Encoder::new();
        e1.write_bulk(&owned);
        let mut e2 = Encoder::new();
        e2.write_bulk(&borrowed);
        let mut e3 = Encoder::new();
        e3.write_bulk(raw);

        assert_eq!(e1.into_bytes(), e2.into_bytes());
        let mut e2b = Encoder::new();
        e2b.write_bulk(&borrowed);
        assert_eq!(e2b.into_bytes(), e3.into_bytes());
    }

    #[test]
    fn empty_array_header() {
        let mut enc = Encoder::new();
        enc.write_array_header(0);
        assert_eq!(&enc.into_bytes()[..], b"*0\r\n");
    }
}
