//! Building packets without unpacking them first, and releasing them.
//!
//! Every constructor takes ownership of the buffers it is handed. A buffer
//! built from a `Vec` or `String` moves into the packet, so nothing the
//! caller still holds is aliased.

use std::num::NonZeroU16;

use bytes::Bytes;
use bytestring::ByteString;

use crate::error::EncodeError;
use crate::packet::{ConnectAck, ConnectAckReason, Packet, Publish, SubscribeReturnCode};
use crate::types::{Header, PacketType, QoS};

/// Builds a fixed header byte from its parts.
#[inline]
pub fn make_header(packet_type: PacketType, dup: bool, qos: QoS, retain: bool) -> Header {
    Header { packet_type, dup, qos, retain }
}

/// Builds a packet-identifier-only acknowledgement.
///
/// Returns `None` when `packet_type` is not PUBACK, PUBREC, PUBREL, PUBCOMP or UNSUBACK.
///
/// # Example
/// ```
/// use std::num::NonZeroU16;
/// use mqtt311_codec::{make_ack, Packet, PacketType};
///
/// let id = NonZeroU16::new(10).unwrap();
/// assert_eq!(make_ack(PacketType::PublishAck, id), Some(Packet::PublishAck { packet_id: id }));
/// assert_eq!(make_ack(PacketType::Connect, id), None);
/// ```
pub fn make_ack(packet_type: PacketType, packet_id: NonZeroU16) -> Option<Packet> {
    let packet = match packet_type {
        PacketType::PublishAck => Packet::PublishAck { packet_id },
        PacketType::PublishReceived => Packet::PublishReceived { packet_id },
        PacketType::PublishRelease => Packet::PublishRelease { packet_id },
        PacketType::PublishComplete => Packet::PublishComplete { packet_id },
        PacketType::UnsubscribeAck => Packet::UnsubscribeAck { packet_id },
        _ => return None,
    };
    Some(packet)
}

#[inline]
pub fn make_connack(session_present: bool, return_code: ConnectAckReason) -> Packet {
    Packet::ConnectAck(ConnectAck { return_code, session_present })
}

#[inline]
pub fn make_suback(packet_id: NonZeroU16, status: Vec<SubscribeReturnCode>) -> Packet {
    Packet::SubscribeAck { packet_id, status }
}

/// Builds a PUBLISH packet, checking that `packet_id` is present exactly when
/// `qos` requires one and that `dup` is only set for QoS 1 and 2.
pub fn make_publish(
    dup: bool,
    qos: QoS,
    retain: bool,
    packet_id: Option<NonZeroU16>,
    topic: impl Into<ByteString>,
    payload: impl Into<Bytes>,
) -> Result<Packet, EncodeError> {
    match (qos, packet_id) {
        (QoS::AtMostOnce, Some(_)) => return Err(EncodeError::MalformedPacket),
        (QoS::AtLeastOnce | QoS::ExactlyOnce, None) => return Err(EncodeError::PacketIdRequired),
        _ => {}
    }
    ensure!(qos != QoS::AtMostOnce || !dup, EncodeError::InvalidFlagCombination("dup set on QoS 0 publish"));
    Ok(Packet::Publish(Publish { dup, retain, qos, topic: topic.into(), packet_id, payload: payload.into() }))
}

/// Releases `packet` and every buffer it owns.
///
/// Consuming the packet makes a second release or a later use a compile error.
/// Variants without owned buffers release nothing.
#[inline]
pub fn release(packet: Packet) {
    log::trace!("releasing {:?} packet", packet.packet_type());
    drop(packet);
}
