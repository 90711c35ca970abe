//! Fixed-width integers and length-prefixed strings in network byte order.
//!
//! Every function works on a cursor: readers advance a [`Buf`], writers append
//! to a [`BufMut`]. Reads are bounds checked and fail with
//! [`DecodeError::TruncatedInput`] instead of running past the source.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{DecodeError, EncodeError};

#[inline]
fn ensure_remaining<B: Buf>(src: &B, needed: usize) -> Result<(), DecodeError> {
    ensure!(src.remaining() >= needed, DecodeError::TruncatedInput { needed, available: src.remaining() });
    Ok(())
}

#[inline]
pub fn unpack_u8<B: Buf>(src: &mut B) -> Result<u8, DecodeError> {
    ensure_remaining(src, 1)?;
    Ok(src.get_u8())
}

#[inline]
pub fn unpack_u16<B: Buf>(src: &mut B) -> Result<u16, DecodeError> {
    ensure_remaining(src, 2)?;
    Ok(src.get_u16())
}

#[inline]
pub fn unpack_u32<B: Buf>(src: &mut B) -> Result<u32, DecodeError> {
    ensure_remaining(src, 4)?;
    Ok(src.get_u32())
}

/// Takes exactly `len` bytes off the cursor.
///
/// When the cursor is a [`Bytes`] the result shares its allocation instead of copying.
#[inline]
pub fn unpack_bytes<B: Buf>(src: &mut B, len: usize) -> Result<Bytes, DecodeError> {
    ensure_remaining(src, len)?;
    Ok(src.copy_to_bytes(len))
}

/// Reads a u16 length prefix followed by that many bytes.
pub fn unpack_string16<B: Buf>(src: &mut B) -> Result<(Bytes, u16), DecodeError> {
    let len = unpack_u16(src)?;
    let buf = unpack_bytes(src, len as usize)?;
    Ok((buf, len))
}

#[inline]
pub fn pack_u8<B: BufMut>(dst: &mut B, v: u8) {
    dst.put_u8(v);
}

#[inline]
pub fn pack_u16<B: BufMut>(dst: &mut B, v: u16) {
    dst.put_u16(v);
}

#[inline]
pub fn pack_u32<B: BufMut>(dst: &mut B, v: u32) {
    dst.put_u32(v);
}

/// Writes `src` verbatim. Embedded zero bytes are payload like any other.
#[inline]
pub fn pack_bytes<B: BufMut>(dst: &mut B, src: &[u8]) {
    dst.put_slice(src);
}

/// Writes a u16 length prefix followed by `src`.
pub fn pack_string16<B: BufMut>(dst: &mut B, src: &[u8]) -> Result<(), EncodeError> {
    let len = u16::try_from(src.len()).map_err(|_| EncodeError::InvalidLength)?;
    pack_u16(dst, len);
    pack_bytes(dst, src);
    Ok(())
}
