//! Codecs turning typed keys, column names and values into bytes and back.
//!
//! A codec is any type implementing [`Codec`]: an `encode`/`decode` pair that is
//! pure, synchronous and never suspends. The built-in codecs of this module form
//! the registry the column family constructors are usually given:
//!
//! | Codec          | Value       | Encoding                  |
//! |----------------|-------------|---------------------------|
//! | [`Utf8Codec`]  | `String`    | UTF-8 bytes               |
//! | [`Int32Codec`] | `i32`       | 4 bytes, big-endian       |
//! | [`Int64Codec`] | `i64`       | 8 bytes, big-endian       |
//! | [`BytesCodec`] | `Vec<u8>`   | identity                  |
//! | [`UuidCodec`]  | `Uuid`      | 16 bytes                  |
//!
//! Custom encodings either implement [`Codec`] directly or wrap two closures in
//! a [`FnCodec`].
//!
//! # Example
//!
//! ```rust
//! use grapple_cassandra::codec::{Codec, Int64Codec, Utf8Codec};
//!
//! let bytes = Utf8Codec.encode(&"motto".to_string());
//! assert_eq!("motto", Utf8Codec.decode(&bytes).unwrap());
//!
//! assert!(Int64Codec.decode(&[0, 1, 2]).is_err());
//! ```

use std::{fmt::Debug, string::FromUtf8Error};

use derive_more::derive::From;
use uuid::Uuid;

pub type Result<T> = core::result::Result<T, CodecError>;

/// Failure to decode a byte sequence into the codec's value type.
#[derive(Debug, From)]
pub enum CodecError {
    /// The input length does not match the fixed width of the target type.
    Length {
        codec: &'static str,
        expected: usize,
        actual: usize,
    },

    #[from]
    Utf8(FromUtf8Error),

    /// Rejected by a custom codec.
    Invalid(String),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for CodecError {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for CodecError {}

// endregion: --- Error Boilerplate

/// Converts values of type [`Codec::Value`] to bytes and back.
///
/// `decode(encode(v)) == v` must hold for every value the caller passes, and
/// `decode` must fail rather than return a wrong value for bytes it did not
/// produce.
pub trait Codec: Send + Sync {
    type Value;

    fn encode(&self, value: &Self::Value) -> Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value>;
}

fn fixed<const W: usize>(codec: &'static str, bytes: &[u8]) -> Result<[u8; W]> {
    bytes.try_into().map_err(|_| CodecError::Length {
        codec,
        expected: W,
        actual: bytes.len(),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    type Value = String;

    fn encode(&self, value: &String) -> Vec<u8> {
        value.as_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Int32Codec;

impl Codec for Int32Codec {
    type Value = i32;

    fn encode(&self, value: &i32) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<i32> {
        Ok(i32::from_be_bytes(fixed("int32", bytes)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Int64Codec;

impl Codec for Int64Codec {
    type Value = i64;

    fn encode(&self, value: &i64) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64> {
        Ok(i64::from_be_bytes(fixed("int64", bytes)?))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec for BytesCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Vec<u8> {
        value.clone()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodec;

impl Codec for UuidCodec {
    type Value = Uuid;

    fn encode(&self, value: &Uuid) -> Vec<u8> {
        value.as_bytes().to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Uuid> {
        Ok(Uuid::from_bytes(fixed("uuid", bytes)?))
    }
}

/// A codec assembled from an encode and a decode closure.
///
/// # Example
///
/// ```rust
/// use grapple_cassandra::codec::{Codec, CodecError, FnCodec};
///
/// let flag = FnCodec::new(
///     |v: &bool| vec![*v as u8],
///     |b: &[u8]| match b {
///         [0] => Ok(false),
///         [1] => Ok(true),
///         _ => Err(CodecError::Invalid(format!("not a flag: {b:?}"))),
///     },
/// );
///
/// assert!(flag.decode(&flag.encode(&true)).unwrap());
/// ```
pub struct FnCodec<T, E, D>
where
    E: Fn(&T) -> Vec<u8>,
    D: Fn(&[u8]) -> Result<T>,
{
    encode: E,
    decode: D,
    _value: std::marker::PhantomData<fn() -> T>,
}

impl<T, E, D> FnCodec<T, E, D>
where
    E: Fn(&T) -> Vec<u8>,
    D: Fn(&[u8]) -> Result<T>,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self {
            encode,
            decode,
            _value: std::marker::PhantomData,
        }
    }
}

impl<T, E, D> Codec for FnCodec<T, E, D>
where
    E: Fn(&T) -> Vec<u8> + Send + Sync,
    D: Fn(&[u8]) -> Result<T> + Send + Sync,
{
    type Value = T;

    fn encode(&self, value: &T) -> Vec<u8> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        (self.decode)(bytes)
    }
}

impl<T, E, D> Debug for FnCodec<T, E, D>
where
    E: Fn(&T) -> Vec<u8>,
    D: Fn(&[u8]) -> Result<T>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCodec")
    }
}

// region:    --- Tests


// endregion: --- Tests
