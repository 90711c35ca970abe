use bytes::{Bytes, BytesMut};

use crate::decode::{unpack_packet_with, unpack_with};
use crate::encode::{get_encoded_size, pack_with};
use crate::error::{DecodeError, EncodeError};
use crate::options::CodecOptions;
use crate::packet::Packet;
use crate::types::FixedHeader;
use crate::utils::encoded_length_size;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Mqtt v3.1.1 protocol codec
///
/// Stateless apart from its [`CodecOptions`]; every call works on a whole frame.
pub struct Codec {
    opts: CodecOptions,
}

impl Codec {
    /// Create `Codec` instance
    ///
    /// If `max_packet_size` is `0`, size is unlimited.
    pub fn new(max_packet_size: u32) -> Self {
        Self::with_options(CodecOptions { max_packet_size, ..CodecOptions::default() })
    }

    #[inline]
    pub fn with_options(opts: CodecOptions) -> Self {
        Codec { opts }
    }

    #[inline]
    pub fn options(&self) -> &CodecOptions {
        &self.opts
    }

    /// Set max packet size, `0` means unlimited.
    pub fn set_max_size(&mut self, size: u32) {
        self.opts.max_packet_size = size;
    }

    /// Unpacks one whole frame from the front of `src`, see [`crate::unpack`].
    pub fn unpack(&self, src: &mut Bytes) -> Result<(Packet, usize), DecodeError> {
        unpack_with(src, &self.opts)
    }

    /// Unpacks the body of the frame announced by `fixed`, see [`crate::unpack_packet`].
    pub fn unpack_packet(&self, fixed: FixedHeader, src: &mut Bytes) -> Result<(Packet, usize), DecodeError> {
        unpack_packet_with(fixed, src, &self.opts)
    }

    /// Packs `packet` into a new buffer sized for the whole frame.
    pub fn pack(&self, packet: &Packet) -> Result<BytesMut, EncodeError> {
        let mut dst = BytesMut::with_capacity(frame_capacity(get_encoded_size(packet)));
        pack_with(packet, &mut dst, &self.opts)?;
        Ok(dst)
    }

    /// Appends `packet` to `dst`, returning the number of bytes written.
    ///
    /// `dst` is left untouched on error.
    pub fn pack_into(&self, packet: &Packet, dst: &mut BytesMut) -> Result<usize, EncodeError> {
        pack_with(packet, dst, &self.opts)
    }
}

/// Bytes needed for a frame whose Remaining Length is `size`.
#[inline]
fn frame_capacity(size: usize) -> usize {
    let length_size = encoded_length_size(u32::try_from(size).unwrap_or(u32::MAX));
    size.saturating_add(1 + length_size)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU16;

    use bytestring::ByteString;

    use super::*;
    use crate::packet::{Connect, ConnectAck, ConnectAckReason, LastWill, Publish, SubscribeReturnCode};
    use crate::types::{Protocol, QoS};

    fn packet_id(v: u16) -> NonZeroU16 {
        NonZeroU16::new(v).unwrap()
    }

    fn assert_round_trip(codec: &Codec, packet: Packet) {
        let buf = codec.pack(&packet).unwrap();
        let len = buf.len();
        let mut src = buf.freeze();
        assert_eq!(codec.unpack(&mut src).unwrap(), (packet, len));
        assert!(src.is_empty());
    }

    #[test]
    fn test_max_size() {
        let mut codec = Codec::default();
        codec.set_max_size(5);
        assert_eq!(codec.options().max_packet_size, 5);

        let mut src = Bytes::from_static(b"\x30\x09");
        assert!(matches!(codec.unpack(&mut src), Err(DecodeError::MaxSizeExceeded)));
        assert_eq!(src.len(), 2);

        let p = Packet::Unsubscribe { packet_id: packet_id(1), topic_filters: vec![ByteString::from_static("abcd")] };
        let mut dst = BytesMut::from(&b"\xc0\x00"[..]);
        assert!(matches!(codec.pack_into(&p, &mut dst), Err(EncodeError::OverMaxPacketSize)));
        assert_eq!(&dst[..], b"\xc0\x00");
    }

    #[test]
    fn test_frame_capacity() {
        assert_eq!(frame_capacity(0), 2);
        assert_eq!(frame_capacity(127), 129);
        assert_eq!(frame_capacity(128), 131);
        // sizes beyond the u32 range still reserve a 4-byte length field
        #[cfg(target_pointer_width = "64")]
        assert_eq!(frame_capacity(u32::MAX as usize + 1), u32::MAX as usize + 6);
        assert_eq!(frame_capacity(usize::MAX), usize::MAX);

        let p = Packet::PublishAck { packet_id: packet_id(1) };
        assert!(Codec::default().pack(&p).unwrap().capacity() >= 4);
    }

    #[test]
    fn test_packet() {
        let codec = Codec::new(1024 * 1024);
        let pkt = Publish {
            dup: false,
            retain: false,
            qos: QoS::AtMostOnce,
            topic: ByteString::from_static("/test"),
            packet_id: None,
            payload: Bytes::from(Vec::from("a".repeat(260 * 1024))),
        };
        assert_round_trip(&codec, Packet::Publish(pkt));
    }

    #[test]
    fn test_round_trip_all_packets() {
        let codec = Codec::default();
        let packets = vec![
            Packet::from(Connect::default().client_id("12345")),
            Packet::from(Connect {
                protocol: Protocol::default(),
                clean_session: false,
                keep_alive: 60,
                last_will: Some(LastWill {
                    qos: QoS::ExactlyOnce,
                    retain: true,
                    topic: ByteString::from_static("will/topic"),
                    message: Bytes::from_static(b"gone"),
                }),
                client_id: ByteString::from_static("client"),
                username: Some(ByteString::from_static("user")),
                password: Some(Bytes::from_static(b"\x00pass")),
            }),
            Packet::ConnectAck(ConnectAck { return_code: ConnectAckReason::NotAuthorized, session_present: false }),
            Packet::ConnectAck(ConnectAck { return_code: ConnectAckReason::ConnectionAccepted, session_present: true }),
            Packet::Publish(Publish {
                dup: false,
                retain: true,
                qos: QoS::AtMostOnce,
                topic: ByteString::from_static("a/b"),
                packet_id: None,
                payload: Bytes::new(),
            }),
            Packet::Publish(Publish {
                dup: true,
                retain: false,
                qos: QoS::ExactlyOnce,
                topic: ByteString::from_static("a/b"),
                packet_id: Some(packet_id(u16::MAX)),
                payload: Bytes::from_static(b"data"),
            }),
            Packet::PublishAck { packet_id: packet_id(1) },
            Packet::PublishReceived { packet_id: packet_id(2) },
            Packet::PublishRelease { packet_id: packet_id(3) },
            Packet::PublishComplete { packet_id: packet_id(4) },
            Packet::Subscribe {
                packet_id: packet_id(5),
                topic_filters: vec![
                    (ByteString::from_static("a/+"), QoS::AtMostOnce),
                    (ByteString::from_static("b/#"), QoS::ExactlyOnce),
                ],
            },
            Packet::SubscribeAck {
                packet_id: packet_id(5),
                status: vec![SubscribeReturnCode::Success(QoS::AtMostOnce), SubscribeReturnCode::Failure],
            },
            Packet::SubscribeAck { packet_id: packet_id(6), status: vec![] },
            Packet::Unsubscribe { packet_id: packet_id(7), topic_filters: vec![ByteString::from_static("a/+")] },
            Packet::UnsubscribeAck { packet_id: packet_id(7) },
            Packet::PingRequest,
            Packet::PingResponse,
            Packet::Disconnect,
        ];
        for p in packets {
            assert_round_trip(&codec, p);
        }
    }

    #[test]
    fn test_tolerant_protocol() {
        let frame = b"\x10\x12\x00\x06MQIsdp\x03\x02\x00\x0a\x00\x04abcd";
        let strict = Codec::default();
        let err = strict.unpack(&mut Bytes::from_static(frame)).unwrap_err();
        assert!(matches!(err.root_cause(), DecodeError::InvalidProtocol));

        let tolerant = Codec::with_options(CodecOptions { strict_protocol: false, ..CodecOptions::default() });
        let (p, n) = tolerant.unpack(&mut Bytes::from_static(frame)).unwrap();
        assert_eq!(n, frame.len());
        match p {
            Packet::Connect(ref c) => {
                assert_eq!(c.protocol, Protocol(3));
                assert_eq!(c.client_id, "abcd");
            }
            _ => panic!("expected connect"),
        }
        assert_eq!(&tolerant.pack(&p).unwrap()[..], &frame[..]);
    }

    #[test]
    fn test_unpack_packet_after_header() {
        let codec = Codec::default();
        let mut src = Bytes::from_static(b"\x40\x02\x00\x09\xe0\x00");
        let fixed = FixedHeader::decode(&mut src).unwrap();
        assert_eq!(fixed.remaining_length, 2);
        assert_eq!(codec.unpack_packet(fixed, &mut src).unwrap(), (Packet::PublishAck { packet_id: packet_id(9) }, 2));
        assert_eq!(&src[..], b"\xe0\x00");
    }
}
