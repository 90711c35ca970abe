use bytes::Buf;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::utils::decode_length;

pub(crate) const MQTT: &str = "MQTT";
pub(crate) const MQISDP: &str = "MQIsdp";
pub const MQTT_LEVEL_31: u8 = 3;
pub const MQTT_LEVEL_311: u8 = 4;
pub(crate) const WILL_QOS_SHIFT: u8 = 3;

/// Largest value the 4-byte Remaining Length field can carry.
pub const MAX_REMAINING_LENGTH: u32 = 0xF_FF_FF_FF;

/// Protocol level announced in a CONNECT packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Protocol(pub u8);

impl Protocol {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Protocol(MQTT_LEVEL_31) => MQISDP,
            Protocol(_) => MQTT,
        }
    }

    #[inline]
    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol(MQTT_LEVEL_311)
    }
}

prim_enum! {
    /// Quality of Service
    #[derive(Serialize, Deserialize, PartialOrd, Ord, Hash)]
    pub enum QoS {
        /// At most once delivery
        ///
        /// No response is sent by the receiver and no retry is performed by the sender.
        AtMostOnce = 0,
        /// At least once delivery
        ///
        /// A QoS 1 PUBLISH Packet has a Packet Identifier in its variable header
        /// and is acknowledged by a PUBACK Packet.
        AtLeastOnce = 1,
        /// Exactly once delivery
        ///
        /// Acknowledged by the PUBREC / PUBREL / PUBCOMP exchange.
        ExactlyOnce = 2
    }
}

impl QoS {
    #[inline]
    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl From<QoS> for u8 {
    fn from(v: QoS) -> Self {
        v.value()
    }
}

prim_enum! {
    /// Control packet type, the high nibble of the fixed header byte.
    #[derive(Hash)]
    pub enum PacketType {
        Connect = 1,
        ConnectAck = 2,
        Publish = 3,
        PublishAck = 4,
        PublishReceived = 5,
        PublishRelease = 6,
        PublishComplete = 7,
        Subscribe = 8,
        SubscribeAck = 9,
        Unsubscribe = 10,
        UnsubscribeAck = 11,
        PingRequest = 12,
        PingResponse = 13,
        Disconnect = 14
    }
}

impl PacketType {
    /// Flag bits the protocol mandates for this type, `None` for PUBLISH whose
    /// flags carry dup/qos/retain.
    #[inline]
    pub fn reserved_flags(self) -> Option<u8> {
        match self {
            PacketType::Publish => None,
            PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe => Some(0b0010),
            _ => Some(0),
        }
    }

    /// Whether this type is a bare packet-identifier acknowledgement.
    #[inline]
    pub fn is_ack(self) -> bool {
        matches!(
            self,
            PacketType::PublishAck
                | PacketType::PublishReceived
                | PacketType::PublishRelease
                | PacketType::PublishComplete
                | PacketType::UnsubscribeAck
        )
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ConnectFlags: u8 {
        const USERNAME    = 0b1000_0000;
        const PASSWORD    = 0b0100_0000;
        const WILL_RETAIN = 0b0010_0000;
        const WILL_QOS    = 0b0001_1000;
        const WILL        = 0b0000_0100;
        const CLEAN_SESSION = 0b0000_0010;
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ConnectAckFlags: u8 {
        const SESSION_PRESENT = 0b0000_0001;
    }
}

/// The type/flags byte that opens every packet.
///
/// Layout is `type:4 | dup:1 | qos:2 | retain:1`, type in the high nibble.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Header {
    pub packet_type: PacketType,
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
}

impl Header {
    /// Header of `packet_type` with the flag bits the protocol mandates.
    pub fn new(packet_type: PacketType) -> Self {
        let qos = if packet_type.reserved_flags() == Some(0b0010) { QoS::AtLeastOnce } else { QoS::AtMostOnce };
        Header { packet_type, dup: false, qos, retain: false }
    }

    /// Parses the header byte.
    ///
    /// Types other than PUBLISH must carry their mandated flags, otherwise the
    /// result is [`DecodeError::InvalidFlagCombination`].
    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        let packet_type = PacketType::try_from(byte >> 4).map_err(|_| DecodeError::MalformedHeader(byte))?;
        if let Some(flags) = packet_type.reserved_flags() {
            ensure!(byte & 0b0000_1111 == flags, DecodeError::InvalidFlagCombination("reserved fixed header flags"));
        }
        let qos = QoS::try_from((byte & 0b0110) >> 1).map_err(|_| DecodeError::MalformedHeader(byte))?;
        Ok(Header { packet_type, dup: byte & 0b1000 != 0, qos, retain: byte & 0b0001 != 0 })
    }

    #[inline]
    pub fn to_byte(&self) -> u8 {
        ((self.packet_type as u8) << 4) | ((self.dup as u8) << 3) | (self.qos.value() << 1) | self.retain as u8
    }

    /// The low nibble of the header byte.
    #[inline]
    pub fn flags(&self) -> u8 {
        self.to_byte() & 0b0000_1111
    }
}

/// Header byte plus the decoded Remaining Length.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FixedHeader {
    pub header: Header,
    /// the number of bytes remaining within the current packet,
    /// including data in the variable header and the payload.
    pub remaining_length: u32,
}

impl FixedHeader {
    /// Reads the header byte and the Remaining Length field, advancing `src`.
    pub fn decode<B: Buf>(src: &mut B) -> Result<Self, DecodeError> {
        ensure!(src.has_remaining(), DecodeError::TruncatedInput { needed: 2, available: 0 });
        let header = Header::from_byte(src.get_u8())?;
        let remaining_length = decode_length(src)?;
        Ok(FixedHeader { header, remaining_length })
    }
}
