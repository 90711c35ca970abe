#![deny(unsafe_code)]

//! MQTT v3.1.1 control packet codec
//!
//! ## Core Features:
//! - **Whole-frame unpacking**: [`unpack`] turns the front of a `Bytes` buffer into a [`Packet`]
//!   and reports how many bytes the frame occupied
//! - **Zero-copy payloads**: topics, payloads and credentials are slices of the input buffer
//! - **Size-first packing**: [`pack_packet`] computes the encoded size before writing a byte,
//!   and [`pack_into`] leaves the destination untouched on failure
//! - **Strict validation**: reserved flags, packet identifiers, UTF-8 strings and
//!   CONNECT flag dependencies are all checked while unpacking
//!
//! ## Architecture Components:
//! - [`Codec`]: unpack/pack bound to a set of [`CodecOptions`] (max packet size, protocol strictness)
//! - [`pack`]: big-endian integer and length-prefixed string primitives
//! - [`make_header`], [`make_ack`], [`make_connack`], [`make_suback`], [`make_publish`]:
//!   building packets to send, and [`release`] to drop them
//! - Error handling with dedicated [`EncodeError`]/[`DecodeError`] types

#[macro_use]
mod utils;

mod codec;
mod decode;
mod encode;
mod lifecycle;
mod options;
mod packet;

/// Error types for encoding/decoding operations
pub mod error;

/// Big-endian integer and string primitives
pub mod pack;

/// Shared types and constants for MQTT protocol
pub mod types;

pub use self::codec::Codec;
pub use self::decode::{unpack, unpack_packet};
pub use self::encode::{pack_into, pack_packet};
pub use self::error::{DecodeError, EncodeError};
pub use self::lifecycle::{make_ack, make_connack, make_header, make_publish, make_suback, release};
pub use self::options::CodecOptions;
pub use self::packet::{
    Connect, ConnectAck, ConnectAckReason, LastWill, Packet, Publish, SubscribeReturnCode,
};
pub use self::types::{FixedHeader, Header, PacketType, Protocol, QoS, MAX_REMAINING_LENGTH};
pub use self::utils::{decode_length, encode_length, encoded_length_size};
