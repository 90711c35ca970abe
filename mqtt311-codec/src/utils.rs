use std::num::NonZeroU16;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use bytestring::ByteString;

use crate::error::{DecodeError, EncodeError};
use crate::pack::{pack_string16, pack_u16, unpack_string16, unpack_u16, unpack_u8};
use crate::types::MAX_REMAINING_LENGTH;

macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            return Err($e);
        }
    };
}

macro_rules! prim_enum {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident {
            $(
                $( #[$enum_item_attr:meta] )*
                $var:ident=$val:expr
            ),+
        }) => {
        $( #[$enum_attr] )*
        #[repr(u8)]
        #[derive(Debug, Eq, PartialEq, Copy, Clone)]
        pub enum $name {
            $(
                $( #[$enum_item_attr] )*
                $var = $val
            ),+
        }
        impl std::convert::TryFrom<u8> for $name {
            type Error = $crate::error::DecodeError;
            fn try_from(v: u8) -> Result<Self, Self::Error> {
                match v {
                    $($val => Ok($name::$var)),+
                    ,_ => Err($crate::error::DecodeError::MalformedPacket)
                }
            }
        }
    };
}

pub(crate) trait Decode: Sized {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError>;
}

impl Decode for u8 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        unpack_u8(src)
    }
}

impl Decode for u16 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        unpack_u16(src)
    }
}

impl Decode for NonZeroU16 {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        NonZeroU16::new(u16::decode(src)?).ok_or(DecodeError::MalformedPacket)
    }
}

impl Decode for Bytes {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(unpack_string16(src)?.0)
    }
}

impl Decode for ByteString {
    fn decode(src: &mut Bytes) -> Result<Self, DecodeError> {
        ByteString::try_from(Bytes::decode(src)?).map_err(|_| DecodeError::Utf8Error)
    }
}

pub(crate) trait Encode {
    fn encoded_size(&self) -> usize;

    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError>;
}

impl Encode for u16 {
    fn encoded_size(&self) -> usize {
        2
    }
    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        pack_u16(buf, *self);
        Ok(())
    }
}

impl Encode for NonZeroU16 {
    fn encoded_size(&self) -> usize {
        2
    }
    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        self.get().encode(buf)
    }
}

impl Encode for Bytes {
    fn encoded_size(&self) -> usize {
        2 + self.len()
    }
    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        pack_string16(buf, self)
    }
}

impl Encode for ByteString {
    fn encoded_size(&self) -> usize {
        2 + self.len()
    }
    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        pack_string16(buf, self.as_bytes())
    }
}

impl Encode for &str {
    fn encoded_size(&self) -> usize {
        2 + self.len()
    }
    fn encode(&self, buf: &mut BytesMut) -> Result<(), EncodeError> {
        pack_string16(buf, self.as_bytes())
    }
}

/// Decodes a Remaining Length field, advancing `src` past it.
///
/// Fails with [`DecodeError::OversizedLength`] when the fourth byte still has
/// its continuation bit set, and with [`DecodeError::TruncatedInput`] when the
/// field is cut short.
pub fn decode_length<B: Buf>(src: &mut B) -> Result<u32, DecodeError> {
    let mut multiplier: u32 = 1;
    let mut len: u32 = 0;
    for consumed in 1..=4 {
        ensure!(src.has_remaining(), DecodeError::TruncatedInput { needed: consumed, available: consumed - 1 });
        let byte = src.get_u8();
        len += (byte & 0b0111_1111) as u32 * multiplier;
        if byte & 0b1000_0000 == 0 {
            return Ok(len);
        }
        multiplier *= 128;
    }
    Err(DecodeError::OversizedLength)
}

/// Writes `len` as a Remaining Length field and returns the number of bytes used.
pub fn encode_length<B: BufMut>(mut len: u32, dst: &mut B) -> Result<usize, EncodeError> {
    ensure!(len <= MAX_REMAINING_LENGTH, EncodeError::OversizedLength);
    let mut written = 0;
    loop {
        let mut digit = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            digit |= 0b1000_0000;
        }
        dst.put_u8(digit);
        written += 1;
        if len == 0 {
            return Ok(written);
        }
    }
}

/// Number of bytes [`encode_length`] uses for `len`.
#[inline]
pub fn encoded_length_size(len: u32) -> usize {
    match len {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}
