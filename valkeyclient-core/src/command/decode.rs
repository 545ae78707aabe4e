//! Typed response decoding (spec §4.2): primitive decoders for
//! integer/double/string/bulk-bytes, an option decoder that maps null
//! frames to absence, array decoders for homogeneous arrays, tuple decoders
//! for fixed-shape arrays, and map decoders that accept either a RESP3 map
//! or an RESP2 flat array of key/value pairs.
use crate::resp::Frame;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A response frame did not have the shape a typed decoder expected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected type: expected {expected}, got {got}")]
pub struct FromFrameError {
    /// What the decoder wanted.
    pub expected: &'static str,
    /// What it actually got.
    pub got: &'static str,
}

impl FromFrameError {
    fn new(expected: &'static str, frame: &Frame) -> Self {
        Self {
            expected,
            got: frame.type_name(),
        }
    }
}

/// A value decodable from one server reply frame.
pub trait FromFrame: Sized {
    /// Decode `frame` into `Self`, or fail with `FromFrameError` carrying
    /// the expected and received type tags.
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError>;
}

fn bulk_bytes(frame: &Frame) -> Option<Bytes> {
    match frame {
        Frame::BulkString(Some(b)) | Frame::SimpleString(b) | Frame::BulkError(b) => Some(b.clone()),
        Frame::VerbatimString { payload, .. } => Some(payload.clone()),
        Frame::BigNumber(b) => Some(b.clone()),
        _ => None,
    }
}

impl FromFrame for Bytes {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        bulk_bytes(&frame).ok_or_else(|| FromFrameError::new("bulk_bytes", &frame))
    }
}

impl FromFrame for Vec<u8> {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        Bytes::from_frame(frame).map(|b| b.to_vec())
    }
}

impl FromFrame for String {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let bytes = bulk_bytes(&frame).ok_or_else(|| FromFrameError::new("string", &frame))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FromFrameError {
            expected: "utf8 string",
            got: "invalid utf-8",
        })
    }
}

impl FromFrame for i64 {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        match &frame {
            Frame::Number(n) => Ok(*n),
            _ => {
                let bytes = bulk_bytes(&frame).ok_or_else(|| FromFrameError::new("number", &frame))?;
                std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| FromFrameError::new("number", &frame))
            }
        }
    }
}

impl FromFrame for u64 {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let n = i64::from_frame(frame)?;
        u64::try_from(n).map_err(|_| FromFrameError {
            expected: "non-negative number",
            got: "negative number",
        })
    }
}

impl FromFrame for f64 {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        match &frame {
            Frame::Double(d) => Ok(*d),
            Frame::Number(n) => Ok(*n as f64),
            _ => {
                let bytes = bulk_bytes(&frame).ok_or_else(|| FromFrameError::new("double", &frame))?;
                std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok())
                    .ok_or_else(|| FromFrameError::new("double", &frame))
            }
        }
    }
}

impl FromFrame for bool {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        match &frame {
            Frame::Boolean(b) => Ok(*b),
            Frame::Number(n) => Ok(*n != 0),
            _ => Err(FromFrameError::new("boolean", &frame)),
        }
    }
}

/// Maps null frames (`bulk_string` null, `array` null, or RESP3 `null`) to
/// `None`; anything else decodes via `T::from_frame`.
impl<T: FromFrame> FromFrame for Option<T> {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        match frame {
            Frame::Null | Frame::BulkString(None) | Frame::Array(None) => Ok(None),
            other => T::from_frame(other).map(Some),
        }
    }
}

fn aggregate_of(frame: &Frame) -> Option<&crate::resp::Aggregate> {
    match frame {
        Frame::Array(Some(a)) | Frame::Set(a) | Frame::Push(a) | Frame::Map(a) | Frame::Attribute(a) => Some(a),
        _ => None,
    }
}

impl<T: FromFrame> FromFrame for Vec<T> {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let agg = aggregate_of(&frame).ok_or_else(|| FromFrameError::new("array", &frame))?;
        agg.iter()
            .map(|item| {
                let item = item.map_err(|_| FromFrameError {
                    expected: "array element",
                    got: "malformed frame",
                })?;
                T::from_frame(item)
            })
            .collect()
    }
}

fn map_pairs(frame: &Frame) -> Result<Vec<Frame>, FromFrameError> {
    let agg = aggregate_of(frame).ok_or_else(|| FromFrameError::new("map", frame))?;
    agg.iter()
        .map(|item| {
            item.map_err(|_| FromFrameError {
                expected: "map element",
                got: "malformed frame",
            })
        })
        .collect()
}

impl<K, V> FromFrame for HashMap<K, V>
where
    K: FromFrame + Eq + Hash,
    V: FromFrame,
{
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let elements = map_pairs(&frame)?;
        if elements.len() % 2 != 0 {
            return Err(FromFrameError::new("map", &frame));
        }
        let mut out = HashMap::with_capacity(elements.len() / 2);
        let mut it = elements.into_iter();
        while let (Some(k), Some(v)) = (it.next(), it.next()) {
            out.insert(K::from_frame(k)?, V::from_frame(v)?);
        }
        Ok(out)
    }
}

impl<K, V> FromFrame for BTreeMap<K, V>
where
    K: FromFrame + Ord,
    V: FromFrame,
{
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        let elements = map_pairs(&frame)?;
        if elements.len() % 2 != 0 {
            return Err(FromFrameError::new("map", &frame));
        }
        let mut out = BTreeMap::new();
        let mut it = elements.into_iter();
        while let (Some(k), Some(v)) = (it.next(), it.next()) {
            out.insert(K::from_frame(k)?, V::from_frame(v)?);
        }
        Ok(out)
    }
}

/// Identity decode: useful for maps/arrays whose values are heterogeneous
/// and better left as frames for the caller to dispatch on (e.g. `HELLO`'s
/// reply map, whose values span strings, numbers and nested arrays).
impl FromFrame for Frame {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        Ok(frame)
    }
}

/// `()` decodes from the simple-string `OK` acknowledgement server commands
/// commonly reply with.
impl FromFrame for () {
    fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
        match &frame {
            Frame::SimpleString(b) if &b[..] == b"OK" => Ok(()),
            _ => Err(FromFrameError::new("simple_string(OK)", &frame)),
        }
    }
}

macro_rules! impl_tuple_from_frame {
    ($($idx:tt => $ty:ident),+ ; $len:expr) => {
        impl<$($ty: FromFrame),+> FromFrame for ($($ty,)+) {
            fn from_frame(frame: Frame) -> Result<Self, FromFrameError> {
                let agg = aggregate_of(&frame).ok_or_else(|| FromFrameError::new("array", &frame))?;
                if agg.len() != $len {
                    return Err(FromFrameError::new("array", &frame));
                }
                let mut items = agg.iter();
                $(
                    let $ty = {
                        let item = items
                            .next()
                            .expect("length already checked")
                            .map_err(|_| FromFrameError { expected: "array element", got: "malformed frame" })?;
                        $ty::from_frame(item)?
                    };
                )+
                Ok(($($ty,)+))
            }
        }
    };
}

impl_tuple_from_frame!(0 => A; 1);
impl_tuple_from_frame!(0 => A, 1 => B; 2);
impl_tuple_from_frame!(0 => A, 1 => B, 2 => C; 3);
impl_tuple_from_frame!(0 => A, 1 => B, 2 => C, 3 => D; 4);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::decode_frame;
    use bytes::BytesMut;

    fn one(input: &[u8]) -> Frame {
        let mut buf = BytesMut::from(input);
        decode_frame(&mut buf).unwrap().unwrap()
    }

    #[test]
    fn decodes_bulk_string_as_string() {
        let frame = one(b"$5\r\nHello\r\n");
        assert_eq!(String::from_frame(frame).unwrap(), "Hello");
    }

    #[test]
    fn decodes_option_none_for_null() {
        let frame = one(b"$-1\r\n");
        assert_eq!(Option::<String>::from_frame(frame).unwrap(), None);
    }

    #[test]
    fn decodes_vec_of_numbers() {
        let frame = one(b"*3\r\n:1\r\n:2\r\n:3\r\n");
        assert_eq!(Vec::<i64>::from_frame(frame).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn decodes_resp3_map() {
        let frame = one(b"%2\r\n+a\r\n:1\r\n+b\r\n:2\r\n");
        let map = HashMap::<String, i64>::from_frame(frame).unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn decodes_resp2_flat_array_as_map() {
        let frame = one(b"*4\r\n+a\r\n:1\r\n+b\r\n:2\r\n");
        let map = HashMap::<String, i64>::from_frame(frame).unwrap();
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn decodes_fixed_tuple() {
        let frame = one(b"*2\r\n+a\r\n:7\r\n");
        let (s, n) = <(String, i64)>::from_frame(frame).unwrap();
        assert_eq!(s, "a");
        assert_eq!(n, 7);
    }

    #[test]
    fn decodes_unit_ok() {
        let frame = one(b"+OK\r\n");
        <()>::from_frame(frame).unwrap();
    }
}
