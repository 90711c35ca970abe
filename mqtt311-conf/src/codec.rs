use serde::Deserialize;

use mqtt311_codec::{Codec, CodecOptions};

use crate::bytesize::Bytesize;

/// The `[codec]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CodecSettings {
    /// Largest Remaining Length accepted or produced, `"0"` for unlimited.
    #[serde(default = "CodecSettings::max_packet_size_default")]
    pub max_packet_size: Bytesize,
    #[serde(default = "CodecSettings::strict_protocol_default")]
    pub strict_protocol: bool,
}

impl Default for CodecSettings {
    #[inline]
    fn default() -> Self {
        Self {
            max_packet_size: Self::max_packet_size_default(),
            strict_protocol: Self::strict_protocol_default(),
        }
    }
}

impl CodecSettings {
    #[inline]
    fn max_packet_size_default() -> Bytesize {
        Bytesize(1024 * 1024)
    }
    #[inline]
    fn strict_protocol_default() -> bool {
        true
    }

    #[inline]
    pub fn options(&self) -> CodecOptions {
        CodecOptions { max_packet_size: self.max_packet_size.as_u32(), strict_protocol: self.strict_protocol }
    }

    #[inline]
    pub fn codec(&self) -> Codec {
        Codec::with_options(self.options())
    }
}
