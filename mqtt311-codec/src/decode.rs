use std::num::NonZeroU16;

use bytes::{Buf, Bytes};
use bytestring::ByteString;

use crate::error::DecodeError;
use crate::options::CodecOptions;
use crate::packet::{Connect, ConnectAck, ConnectAckReason, LastWill, Packet, Publish, SubscribeReturnCode};
use crate::types::{
    ConnectAckFlags, ConnectFlags, FixedHeader, Header, PacketType, Protocol, QoS, MQISDP, MQTT,
    MQTT_LEVEL_31, MQTT_LEVEL_311, WILL_QOS_SHIFT,
};
use crate::utils::Decode;

/// Unpacks one whole frame from the front of `src`.
///
/// Returns the packet and the number of bytes the frame occupied, header
/// included. `src` is only advanced when the frame decodes successfully.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use mqtt311_codec::{unpack, Packet};
///
/// let mut src = Bytes::from_static(b"\xc0\x00\xd0\x00");
/// assert_eq!(unpack(&mut src).unwrap(), (Packet::PingRequest, 2));
/// assert_eq!(unpack(&mut src).unwrap(), (Packet::PingResponse, 2));
/// ```
pub fn unpack(src: &mut Bytes) -> Result<(Packet, usize), DecodeError> {
    unpack_with(src, &CodecOptions::default())
}

/// Unpacks the variable header and payload of the frame announced by `fixed`.
///
/// `src` starts right after the Remaining Length field. On success it is
/// advanced past the frame and the number of body bytes consumed is returned.
pub fn unpack_packet(fixed: FixedHeader, src: &mut Bytes) -> Result<(Packet, usize), DecodeError> {
    unpack_packet_with(fixed, src, &CodecOptions::default())
}

pub(crate) fn unpack_with(src: &mut Bytes, opts: &CodecOptions) -> Result<(Packet, usize), DecodeError> {
    let mut buf = src.clone();
    let fixed = FixedHeader::decode(&mut buf)?;
    let header_len = src.len() - buf.len();
    let (packet, body_len) = unpack_packet_with(fixed, &mut buf, opts)?;
    src.advance(header_len + body_len);
    Ok((packet, header_len + body_len))
}

pub(crate) fn unpack_packet_with(
    fixed: FixedHeader,
    src: &mut Bytes,
    opts: &CodecOptions,
) -> Result<(Packet, usize), DecodeError> {
    if opts.exceeds_max_size(fixed.remaining_length) {
        log::debug!(
            "{:?} packet of {} bytes exceeds max packet size {}",
            fixed.header.packet_type,
            fixed.remaining_length,
            opts.max_packet_size
        );
        return Err(DecodeError::MaxSizeExceeded);
    }
    let len = fixed.remaining_length as usize;
    ensure!(src.remaining() >= len, DecodeError::TruncatedInput { needed: len, available: src.remaining() });
    let packet = decode_packet(src.slice(..len), fixed.header, opts)?;
    src.advance(len);
    log::trace!("unpacked {:?} packet, remaining length {}", fixed.header.packet_type, len);
    Ok((packet, len))
}

pub(crate) fn decode_packet(mut src: Bytes, header: Header, opts: &CodecOptions) -> Result<Packet, DecodeError> {
    let declared = src.len();
    let res = decode_body(&mut src, header, opts).and_then(|packet| {
        ensure!(
            !src.has_remaining(),
            DecodeError::LengthMismatch { declared: declared as u32, consumed: declared - src.remaining() }
        );
        Ok(packet)
    });
    res.map_err(|e| {
        let offset = declared - src.remaining();
        log::debug!("failed to unpack {:?} packet at offset {}: {}", header.packet_type, offset, e);
        e.in_packet(header.packet_type, offset)
    })
}

fn decode_body(src: &mut Bytes, header: Header, opts: &CodecOptions) -> Result<Packet, DecodeError> {
    if let Some(flags) = header.packet_type.reserved_flags() {
        ensure!(header.flags() == flags, DecodeError::InvalidFlagCombination("reserved fixed header flags"));
    }
    match header.packet_type {
        PacketType::Connect => decode_connect_packet(src, opts),
        PacketType::ConnectAck => decode_connect_ack_packet(src),
        PacketType::Publish => decode_publish_packet(src, header),
        PacketType::PublishAck => decode_ack(src, |packet_id| Packet::PublishAck { packet_id }),
        PacketType::PublishReceived => decode_ack(src, |packet_id| Packet::PublishReceived { packet_id }),
        PacketType::PublishRelease => decode_ack(src, |packet_id| Packet::PublishRelease { packet_id }),
        PacketType::PublishComplete => decode_ack(src, |packet_id| Packet::PublishComplete { packet_id }),
        PacketType::Subscribe => decode_subscribe_packet(src),
        PacketType::SubscribeAck => decode_subscribe_ack_packet(src),
        PacketType::Unsubscribe => decode_unsubscribe_packet(src),
        PacketType::UnsubscribeAck => decode_ack(src, |packet_id| Packet::UnsubscribeAck { packet_id }),
        PacketType::PingRequest => Ok(Packet::PingRequest),
        PacketType::PingResponse => Ok(Packet::PingResponse),
        PacketType::Disconnect => Ok(Packet::Disconnect),
    }
}

#[inline]
fn decode_ack(src: &mut Bytes, f: impl Fn(NonZeroU16) -> Packet) -> Result<Packet, DecodeError> {
    let packet_id = NonZeroU16::decode(src)?;
    Ok(f(packet_id))
}

fn decode_connect_packet(src: &mut Bytes, opts: &CodecOptions) -> Result<Packet, DecodeError> {
    let name = Bytes::decode(src)?;
    let level = u8::decode(src)?;
    // each name is only valid with its own level
    let expected_level = if name == MQTT.as_bytes() {
        MQTT_LEVEL_311
    } else if !opts.strict_protocol && name == MQISDP.as_bytes() {
        MQTT_LEVEL_31
    } else {
        return Err(DecodeError::InvalidProtocol);
    };
    ensure!(level == expected_level, DecodeError::UnsupportedProtocolLevel(level));

    let flags = ConnectFlags::from_bits(u8::decode(src)?).ok_or(DecodeError::ConnectReservedFlagSet)?;
    let will_qos = QoS::try_from((flags & ConnectFlags::WILL_QOS).bits() >> WILL_QOS_SHIFT)
        .map_err(|_| DecodeError::InvalidFlagCombination("will qos 3"))?;
    if !flags.contains(ConnectFlags::WILL) {
        ensure!(will_qos == QoS::AtMostOnce, DecodeError::InvalidFlagCombination("will qos without will"));
        ensure!(
            !flags.contains(ConnectFlags::WILL_RETAIN),
            DecodeError::InvalidFlagCombination("will retain without will")
        );
    }
    ensure!(
        flags.contains(ConnectFlags::USERNAME) || !flags.contains(ConnectFlags::PASSWORD),
        DecodeError::InvalidFlagCombination("password without username")
    );

    let keep_alive = u16::decode(src)?;
    let client_id = ByteString::decode(src)?;

    ensure!(!client_id.is_empty() || flags.contains(ConnectFlags::CLEAN_SESSION), DecodeError::InvalidClientId);

    let last_will = if flags.contains(ConnectFlags::WILL) {
        let topic = ByteString::decode(src)?;
        let message = Bytes::decode(src)?;
        Some(LastWill { qos: will_qos, retain: flags.contains(ConnectFlags::WILL_RETAIN), topic, message })
    } else {
        None
    };
    let username = if flags.contains(ConnectFlags::USERNAME) { Some(ByteString::decode(src)?) } else { None };
    let password = if flags.contains(ConnectFlags::PASSWORD) { Some(Bytes::decode(src)?) } else { None };
    Ok(Connect {
        protocol: Protocol(level),
        clean_session: flags.contains(ConnectFlags::CLEAN_SESSION),
        keep_alive,
        client_id,
        last_will,
        username,
        password,
    }
    .into())
}

fn decode_connect_ack_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let flags = ConnectAckFlags::from_bits(u8::decode(src)?).ok_or(DecodeError::ConnAckReservedFlagSet)?;
    let return_code = ConnectAckReason::try_from(u8::decode(src)?)?;
    Ok(Packet::ConnectAck(ConnectAck {
        return_code,
        session_present: flags.contains(ConnectAckFlags::SESSION_PRESENT),
    }))
}

fn decode_publish_packet(src: &mut Bytes, header: Header) -> Result<Packet, DecodeError> {
    ensure!(
        header.qos != QoS::AtMostOnce || !header.dup,
        DecodeError::InvalidFlagCombination("dup set on QoS 0 publish")
    );
    let topic = ByteString::decode(src)?;
    let packet_id = if header.qos == QoS::AtMostOnce {
        None
    } else {
        Some(NonZeroU16::decode(src)?) // packet id = 0 encountered
    };

    Ok(Packet::Publish(Publish {
        dup: header.dup,
        qos: header.qos,
        retain: header.retain,
        topic,
        packet_id,
        payload: src.split_off(0),
    }))
}

fn decode_subscribe_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = NonZeroU16::decode(src)?;
    let mut topic_filters = Vec::new();
    while src.has_remaining() {
        let topic = ByteString::decode(src)?;
        let qos = QoS::try_from(u8::decode(src)?)?;
        topic_filters.push((topic, qos));
    }
    ensure!(!topic_filters.is_empty(), DecodeError::MalformedPacket);

    Ok(Packet::Subscribe { packet_id, topic_filters })
}

fn decode_subscribe_ack_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = NonZeroU16::decode(src)?;
    let mut status = Vec::with_capacity(src.len());
    while src.has_remaining() {
        let code = src.get_u8();
        status.push(if code == SubscribeReturnCode::FAILURE {
            SubscribeReturnCode::Failure
        } else {
            SubscribeReturnCode::Success(QoS::try_from(code)?)
        });
    }
    Ok(Packet::SubscribeAck { packet_id, status })
}

fn decode_unsubscribe_packet(src: &mut Bytes) -> Result<Packet, DecodeError> {
    let packet_id = NonZeroU16::decode(src)?;
    let mut topic_filters = Vec::new();
    while src.has_remaining() {
        topic_filters.push(ByteString::decode(src)?);
    }
    ensure!(!topic_filters.is_empty(), DecodeError::MalformedPacket);
    Ok(Packet::Unsubscribe { packet_id, topic_filters })
}
