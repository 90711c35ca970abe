use serde::{Deserialize, Serialize};

/// Limits and policies applied by [`crate::Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodecOptions {
    /// Largest accepted Remaining Length, in bytes. `0` means unlimited.
    #[serde(default = "CodecOptions::max_packet_size_default")]
    pub max_packet_size: u32,
    /// Accept only protocol name "MQTT" at level 4 in CONNECT.
    ///
    /// When disabled, the MQTT v3.1 name "MQIsdp" and level 3 are accepted too.
    #[serde(default = "CodecOptions::strict_protocol_default")]
    pub strict_protocol: bool,
}

impl Default for CodecOptions {
    #[inline]
    fn default() -> Self {
        Self { max_packet_size: Self::max_packet_size_default(), strict_protocol: Self::strict_protocol_default() }
    }
}

impl CodecOptions {
    #[inline]
    fn max_packet_size_default() -> u32 {
        0
    }
    #[inline]
    fn strict_protocol_default() -> bool {
        true
    }

    #[inline]
    pub(crate) fn exceeds_max_size(&self, len: u32) -> bool {
        self.max_packet_size != 0 && len > self.max_packet_size
    }
}
