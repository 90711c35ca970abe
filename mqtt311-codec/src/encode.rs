use bytes::{BufMut, BytesMut};
use bytestring::ByteString;

use crate::error::EncodeError;
use crate::options::CodecOptions;
use crate::packet::*;
use crate::pack::{pack_bytes, pack_u8};
use crate::types::{ConnectFlags, QoS, MAX_REMAINING_LENGTH, WILL_QOS_SHIFT};
use crate::utils::{encode_length, encoded_length_size, Encode};

/// Packs `packet` into a freshly allocated buffer holding exactly one frame.
///
/// # Example
/// ```
/// use mqtt311_codec::{pack_packet, Packet};
///
/// let buf = pack_packet(&Packet::PingRequest).unwrap();
/// assert_eq!(&buf[..], b"\xc0\x00");
/// ```
pub fn pack_packet(packet: &Packet) -> Result<BytesMut, EncodeError> {
    let mut dst = BytesMut::new();
    pack_into(packet, &mut dst)?;
    Ok(dst)
}

/// Appends the frame for `packet` to `dst` and returns the number of bytes written.
///
/// On error `dst` is left as it was.
pub fn pack_into(packet: &Packet, dst: &mut BytesMut) -> Result<usize, EncodeError> {
    pack_with(packet, dst, &CodecOptions::default())
}

pub(crate) fn pack_with(packet: &Packet, dst: &mut BytesMut, opts: &CodecOptions) -> Result<usize, EncodeError> {
    let content_size = u32::try_from(get_encoded_size(packet)).map_err(|_| EncodeError::OversizedLength)?;
    ensure!(content_size <= MAX_REMAINING_LENGTH, EncodeError::OversizedLength);
    ensure!(!opts.exceeds_max_size(content_size), EncodeError::OverMaxPacketSize);

    let start = dst.len();
    dst.reserve(1 + encoded_length_size(content_size) + content_size as usize);
    if let Err(e) = encode(packet, dst, content_size) {
        log::debug!("failed to pack {:?} packet: {}", packet.packet_type(), e);
        dst.truncate(start);
        return Err(e);
    }
    log::trace!("packed {:?} packet, remaining length {}", packet.packet_type(), content_size);
    Ok(dst.len() - start)
}

pub(crate) fn get_encoded_publish_size(p: &Publish) -> usize {
    // Topic + Packet Id + Payload
    if p.qos == QoS::AtLeastOnce || p.qos == QoS::ExactlyOnce {
        4 + p.topic.len() + p.payload.len()
    } else {
        2 + p.topic.len() + p.payload.len()
    }
}

pub(crate) fn get_encoded_subscribe_size(topic_filters: &[(ByteString, QoS)]) -> usize {
    2 + topic_filters.iter().fold(0, |acc, (filter, _)| acc + 2 + filter.len() + 1)
}

pub(crate) fn get_encoded_unsubscribe_size(topic_filters: &[ByteString]) -> usize {
    2 + topic_filters.iter().fold(0, |acc, filter| acc + 2 + filter.len())
}

pub(crate) fn get_encoded_size(packet: &Packet) -> usize {
    match *packet {
        Packet::Connect ( ref connect ) => {
            let Connect {ref protocol, ref last_will, ref client_id, ref username, ref password, ..} = **connect;

            //Protocol Level + Connect Flags + Keep Alive
            let mut n = 1 + 1 + 2;

            //Protocol Name
            n += 2 + protocol.name().len();

            // Client Id
            n += client_id.encoded_size();

            // Will Topic + Will Message
            if let Some(LastWill { ref topic, ref message, .. }) = *last_will {
                n += topic.encoded_size() + message.encoded_size();
            }

            if let Some(ref s) = *username {
                n += s.encoded_size();
            }

            if let Some(ref s) = *password {
                n += s.encoded_size();
            }

            n
        }

        Packet::Publish( ref publish ) => get_encoded_publish_size(publish),
        Packet::ConnectAck { .. } | // Flags + Return Code
        Packet::PublishAck { .. } | // Packet Id
        Packet::PublishReceived { .. } | // Packet Id
        Packet::PublishRelease { .. } | // Packet Id
        Packet::PublishComplete { .. } | // Packet Id
        Packet::UnsubscribeAck { .. } => 2, // Packet Id
        Packet::Subscribe { ref topic_filters, .. } => get_encoded_subscribe_size(topic_filters),
        Packet::SubscribeAck { ref status, .. } => 2 + status.len(),

        Packet::Unsubscribe { ref topic_filters, .. } => get_encoded_unsubscribe_size(topic_filters),

        Packet::PingRequest | Packet::PingResponse | Packet::Disconnect => 0,
    }
}

pub(crate) fn encode(packet: &Packet, dst: &mut BytesMut, content_size: u32) -> Result<(), EncodeError> {
    pack_u8(dst, packet.header().to_byte());
    encode_length(content_size, dst)?;
    match packet {
        Packet::Connect(connect) => encode_connect(connect, dst)?,
        Packet::ConnectAck(ack) => {
            dst.put_slice(&[u8::from(ack.session_present), ack.return_code.into()]);
        }
        Packet::Publish(publish) => {
            publish.topic.encode(dst)?;
            if publish.qos == QoS::AtMostOnce {
                ensure!(publish.packet_id.is_none(), EncodeError::MalformedPacket); // packet id must not be set
                ensure!(!publish.dup, EncodeError::InvalidFlagCombination("dup set on QoS 0 publish"));
            } else {
                publish.packet_id.ok_or(EncodeError::PacketIdRequired)?.encode(dst)?;
            }
            pack_bytes(dst, &publish.payload);
        }
        Packet::PublishAck { packet_id }
        | Packet::PublishReceived { packet_id }
        | Packet::PublishRelease { packet_id }
        | Packet::PublishComplete { packet_id }
        | Packet::UnsubscribeAck { packet_id } => packet_id.encode(dst)?,
        Packet::Subscribe { packet_id, ref topic_filters } => {
            ensure!(!topic_filters.is_empty(), EncodeError::MalformedPacket);
            packet_id.encode(dst)?;
            for &(ref filter, qos) in topic_filters {
                filter.encode(dst)?;
                pack_u8(dst, qos.into());
            }
        }
        Packet::SubscribeAck { packet_id, ref status } => {
            packet_id.encode(dst)?;
            for s in status {
                pack_u8(dst, (*s).into());
            }
        }
        Packet::Unsubscribe { packet_id, ref topic_filters } => {
            ensure!(!topic_filters.is_empty(), EncodeError::MalformedPacket);
            packet_id.encode(dst)?;
            for filter in topic_filters {
                filter.encode(dst)?;
            }
        }
        Packet::PingRequest | Packet::PingResponse | Packet::Disconnect => {}
    }

    Ok(())
}

fn encode_connect(connect: &Connect, dst: &mut BytesMut) -> Result<(), EncodeError> {
    let Connect {
        protocol,
        clean_session,
        keep_alive,
        ref last_will,
        ref client_id,
        ref username,
        ref password,
    } = *connect;

    ensure!(
        username.is_some() || password.is_none(),
        EncodeError::InvalidFlagCombination("password without username")
    );
    ensure!(!client_id.is_empty() || clean_session, EncodeError::MalformedPacket);

    protocol.name().encode(dst)?;

    let mut flags = ConnectFlags::empty();

    if username.is_some() {
        flags |= ConnectFlags::USERNAME;
    }
    if password.is_some() {
        flags |= ConnectFlags::PASSWORD;
    }

    if let Some(LastWill { qos, retain, .. }) = *last_will {
        flags |= ConnectFlags::WILL;

        if retain {
            flags |= ConnectFlags::WILL_RETAIN;
        }

        flags |= ConnectFlags::from_bits_truncate(qos.value() << WILL_QOS_SHIFT);
    }

    if clean_session {
        flags |= ConnectFlags::CLEAN_SESSION;
    }

    dst.put_slice(&[protocol.level(), flags.bits()]);
    keep_alive.encode(dst)?;
    client_id.encode(dst)?;

    if let Some(LastWill { ref topic, ref message, .. }) = *last_will {
        topic.encode(dst)?;
        message.encode(dst)?;
    }

    if let Some(ref s) = *username {
        s.encode(dst)?;
    }

    if let Some(ref s) = *password {
        s.encode(dst)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU16;

    use bytes::Bytes;

    use super::*;
    use crate::types::Protocol;

    fn packet_id(v: u16) -> NonZeroU16 {
        NonZeroU16::new(v).unwrap()
    }

    fn publish(qos: QoS, packet_id: Option<NonZeroU16>) -> Packet {
        Packet::Publish(Publish {
            dup: false,
            retain: false,
            qos,
            topic: ByteString::from_static("topic"),
            packet_id,
            payload: Bytes::from_static(b"data"),
        })
    }

    #[test]
    fn test_encode_fixed_header() {
        let p = Packet::PingRequest;

        assert_eq!(get_encoded_size(&p), 0);
        assert_eq!(&pack_packet(&p).unwrap()[..], b"\xc0\x00");

        let p = Packet::Publish(Publish {
            dup: true,
            retain: true,
            qos: QoS::ExactlyOnce,
            topic: ByteString::from_static("topic"),
            packet_id: Some(packet_id(0x4321)),
            payload: (0..255).collect::<Vec<u8>>().into(),
        });

        assert_eq!(get_encoded_size(&p), 264);
        let v = pack_packet(&p).unwrap();
        assert_eq!(&v[0..3], b"\x3d\x88\x02".as_ref());
        assert_eq!(v.len(), 3 + 264);
    }

    fn assert_encode_packet(packet: &Packet, expected: &[u8]) {
        let v = pack_packet(packet).unwrap();
        assert_eq!(expected.len(), v.len());
        assert_eq!(expected, &v[..]);
    }

    #[test]
    fn test_encode_connect_packets() {
        assert_encode_packet(
            &Packet::Connect(Box::new(Connect {
                protocol: Protocol::default(),
                clean_session: false,
                keep_alive: 60,
                client_id: ByteString::from_static("12345"),
                last_will: None,
                username: Some(ByteString::from_static("user")),
                password: Some(Bytes::from_static(b"pass")),
            })),
            &b"\x10\x1D\x00\x04MQTT\x04\xC0\x00\x3C\x00\
\x0512345\x00\x04user\x00\x04pass"[..],
        );

        assert_encode_packet(
            &Packet::Connect(Box::new(Connect {
                protocol: Protocol::default(),
                clean_session: false,
                keep_alive: 60,
                client_id: ByteString::from_static("12345"),
                last_will: Some(LastWill {
                    qos: QoS::ExactlyOnce,
                    retain: false,
                    topic: ByteString::from_static("topic"),
                    message: Bytes::from_static(b"message"),
                }),
                username: None,
                password: None,
            })),
            &b"\x10\x21\x00\x04MQTT\x04\x14\x00\x3C\x00\
\x0512345\x00\x05topic\x00\x07message"[..],
        );

        assert_encode_packet(&Packet::Disconnect, b"\xe0\x00");
    }

    #[test]
    fn test_encode_connect_errors() {
        let mut connect = Connect {
            clean_session: true,
            password: Some(Bytes::from_static(b"pass")),
            ..Connect::default()
        };
        assert!(matches!(
            pack_packet(&connect.clone().into()),
            Err(EncodeError::InvalidFlagCombination(_))
        ));

        connect.password = None;
        connect.clean_session = false;
        assert!(matches!(pack_packet(&connect.into()), Err(EncodeError::MalformedPacket)));
    }

    #[test]
    fn test_encode_connack_packet() {
        assert_encode_packet(
            &Packet::ConnectAck(ConnectAck {
                session_present: true,
                return_code: ConnectAckReason::NotAuthorized,
            }),
            b"\x20\x02\x01\x05",
        );
    }

    #[test]
    fn test_encode_publish_packets() {
        assert_encode_packet(
            &Packet::Publish(Publish {
                dup: true,
                retain: true,
                qos: QoS::ExactlyOnce,
                topic: ByteString::from_static("topic"),
                packet_id: Some(packet_id(0x4321)),
                payload: Bytes::from_static(b"data"),
            }),
            b"\x3d\x0D\x00\x05topic\x43\x21data",
        );

        assert_encode_packet(&publish(QoS::AtMostOnce, None), b"\x30\x0b\x00\x05topicdata");
    }

    #[test]
    fn test_publish_qos0_omits_packet_id() {
        let qos0 = pack_packet(&publish(QoS::AtMostOnce, None)).unwrap();
        let qos1 = pack_packet(&publish(QoS::AtLeastOnce, Some(packet_id(1)))).unwrap();
        assert_eq!(qos0.len() + 2, qos1.len());
    }

    #[test]
    fn test_encode_publish_errors() {
        assert!(matches!(
            pack_packet(&publish(QoS::AtLeastOnce, None)),
            Err(EncodeError::PacketIdRequired)
        ));
        assert!(matches!(
            pack_packet(&publish(QoS::AtMostOnce, Some(packet_id(1)))),
            Err(EncodeError::MalformedPacket)
        ));

        // a failed encode leaves previously written frames untouched
        let mut dst = BytesMut::new();
        pack_into(&Packet::PingRequest, &mut dst).unwrap();
        assert!(pack_into(&publish(QoS::ExactlyOnce, None), &mut dst).is_err());
        assert_eq!(&dst[..], b"\xc0\x00");
    }

    #[test]
    fn test_encode_topic_too_long() {
        let p = Packet::Unsubscribe {
            packet_id: packet_id(1),
            topic_filters: vec![ByteString::from("x".repeat(70_000))],
        };
        assert!(matches!(pack_packet(&p), Err(EncodeError::InvalidLength)));
    }

    #[test]
    fn test_encode_max_size() {
        let opts = CodecOptions { max_packet_size: 8, ..CodecOptions::default() };
        let mut dst = BytesMut::new();
        assert!(matches!(
            pack_with(&publish(QoS::AtMostOnce, None), &mut dst, &opts),
            Err(EncodeError::OverMaxPacketSize)
        ));
        assert!(dst.is_empty());
        assert_eq!(pack_with(&Packet::PublishAck { packet_id: packet_id(1) }, &mut dst, &opts).unwrap(), 4);
    }

    #[test]
    fn test_encode_subscribe_packets() {
        assert_encode_packet(
            &Packet::Subscribe {
                packet_id: packet_id(0x1234),
                topic_filters: vec![
                    (ByteString::from_static("test"), QoS::AtLeastOnce),
                    (ByteString::from_static("filter"), QoS::ExactlyOnce),
                ],
            },
            b"\x82\x12\x12\x34\x00\x04test\x01\x00\x06filter\x02",
        );

        assert_encode_packet(
            &Packet::Subscribe {
                packet_id: packet_id(1),
                topic_filters: vec![
                    (ByteString::from_static("a"), QoS::AtMostOnce),
                    (ByteString::from_static("bb"), QoS::AtLeastOnce),
                ],
            },
            b"\x82\x0b\x00\x01\x00\x01a\x00\x00\x02bb\x01",
        );

        assert_encode_packet(
            &Packet::SubscribeAck {
                packet_id: packet_id(0x1234),
                status: vec![
                    SubscribeReturnCode::Success(QoS::AtLeastOnce),
                    SubscribeReturnCode::Failure,
                    SubscribeReturnCode::Success(QoS::ExactlyOnce),
                ],
            },
            b"\x90\x05\x12\x34\x01\x80\x02",
        );

        assert_encode_packet(
            &Packet::Unsubscribe {
                packet_id: packet_id(0x1234),
                topic_filters: vec![ByteString::from_static("test"), ByteString::from_static("filter")],
            },
            b"\xa2\x10\x12\x34\x00\x04test\x00\x06filter",
        );

        assert_encode_packet(&Packet::UnsubscribeAck { packet_id: packet_id(0x4321) }, b"\xb0\x02\x43\x21");

        assert!(matches!(
            pack_packet(&Packet::Subscribe { packet_id: packet_id(1), topic_filters: vec![] }),
            Err(EncodeError::MalformedPacket)
        ));
    }

    #[test]
    fn test_encode_ack_packets() {
        assert_encode_packet(&Packet::PublishAck { packet_id: packet_id(0x4321) }, b"\x40\x02\x43\x21");
        assert_encode_packet(&Packet::PublishReceived { packet_id: packet_id(0x4321) }, b"\x50\x02\x43\x21");
        assert_encode_packet(&Packet::PublishRelease { packet_id: packet_id(0x4321) }, b"\x62\x02\x43\x21");
        assert_encode_packet(&Packet::PublishComplete { packet_id: packet_id(0x4321) }, b"\x70\x02\x43\x21");
    }

    #[test]
    fn test_encode_ping_packets() {
        assert_encode_packet(&Packet::PingRequest, b"\xc0\x00");
        assert_encode_packet(&Packet::PingResponse, b"\xd0\x00");
    }
}
