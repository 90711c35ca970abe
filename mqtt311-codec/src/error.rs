use crate::types::PacketType;

/// Errors raised while unpacking bytes into packets.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed fixed header byte {0:#04x}")]
    MalformedHeader(u8),
    #[error("Truncated input, needed {needed} bytes but {available} available")]
    TruncatedInput { needed: usize, available: usize },
    #[error("Remaining length is {declared} but {consumed} bytes were consumed")]
    LengthMismatch { declared: u32, consumed: usize },
    #[error("Remaining length exceeds 4 encoded bytes")]
    OversizedLength,
    #[error("Invalid flag combination: {0}")]
    InvalidFlagCombination(&'static str),
    #[error("Invalid protocol")]
    InvalidProtocol,
    #[error("Unsupported protocol level {0}")]
    UnsupportedProtocolLevel(u8),
    #[error("Connect frame's reserved flag is set")]
    ConnectReservedFlagSet,
    #[error("ConnectAck frame's reserved flag is set")]
    ConnAckReservedFlagSet,
    #[error("Invalid client id")]
    InvalidClientId,
    #[error("Malformed packet")]
    MalformedPacket,
    #[error("Max size exceeded")]
    MaxSizeExceeded,
    #[error("utf8 error")]
    Utf8Error,
    /// A failure inside the body of a packet, tagged with where it happened.
    #[error("{packet_type:?} packet at offset {offset}: {source}")]
    Packet {
        packet_type: PacketType,
        /// Offset inside the variable header and payload.
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// The underlying error kind with any packet context removed.
    pub fn root_cause(&self) -> &DecodeError {
        match self {
            DecodeError::Packet { source, .. } => source.root_cause(),
            e => e,
        }
    }

    pub(crate) fn in_packet(self, packet_type: PacketType, offset: usize) -> DecodeError {
        match self {
            e @ DecodeError::Packet { .. } => e,
            e => DecodeError::Packet { packet_type, offset, source: Box::new(e) },
        }
    }
}

/// Errors raised while packing packets into bytes.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Packet is bigger than the configured maximum packet size")]
    OverMaxPacketSize,
    #[error("Remaining length exceeds 4 encoded bytes")]
    OversizedLength,
    #[error("Invalid length")]
    InvalidLength,
    #[error("Malformed packet")]
    MalformedPacket,
    #[error("Packet id is required")]
    PacketIdRequired,
    #[error("Invalid flag combination: {0}")]
    InvalidFlagCombination(&'static str),
}
