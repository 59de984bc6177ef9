/*!
    Codec identification.
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/**
    Codec identifiers.

    Compressed codecs are only identified here; decoding them needs a
    native decoder. The uncompressed `RawVideo` and PCM codecs are decoded
    in pure Rust by `media-decode`.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CodecId {
    // Video codecs
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// VP9
    Vp9,
    /// AV1
    Av1,
    /// MPEG-2 Video
    Mpeg2Video,
    /// Uncompressed video, one frame per packet
    RawVideo,

    // Audio codecs
    /// AAC (Advanced Audio Coding)
    Aac,
    /// Opus
    Opus,
    /// MP3 (MPEG Audio Layer 3)
    Mp3,
    /// FLAC (Free Lossless Audio Codec)
    Flac,
    /// AC-3 (Dolby Digital)
    Ac3,
    /// PCM unsigned 8-bit
    PcmU8,
    /// PCM signed 16-bit little-endian
    PcmS16Le,
    /// PCM signed 32-bit little-endian
    PcmS32Le,
    /// PCM 32-bit float little-endian
    PcmF32Le,
}

/**
    Kind of media an elementary stream carries.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

impl CodecId {
    /**
        Kind of stream this codec belongs to.
    */
    pub const fn kind(self) -> MediaKind {
        match self {
            Self::H264
            | Self::H265
            | Self::Vp9
            | Self::Av1
            | Self::Mpeg2Video
            | Self::RawVideo => MediaKind::Video,
            Self::Aac
            | Self::Opus
            | Self::Mp3
            | Self::Flac
            | Self::Ac3
            | Self::PcmU8
            | Self::PcmS16Le
            | Self::PcmS32Le
            | Self::PcmF32Le => MediaKind::Audio,
        }
    }

    /**
        Returns true if this is a video codec.
    */
    pub const fn is_video(self) -> bool {
        matches!(self.kind(), MediaKind::Video)
    }

    /**
        Returns true if this is an audio codec.
    */
    pub const fn is_audio(self) -> bool {
        matches!(self.kind(), MediaKind::Audio)
    }

    /**
        Returns true if packets carry samples without compression.
    */
    pub const fn is_uncompressed(self) -> bool {
        matches!(
            self,
            Self::RawVideo | Self::PcmU8 | Self::PcmS16Le | Self::PcmS32Le | Self::PcmF32Le
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_kinds() {
        assert!(CodecId::H264.is_video());
        assert!(CodecId::RawVideo.is_video());
        assert!(CodecId::PcmS16Le.is_audio());
        assert!(!CodecId::Aac.is_video());
        assert_eq!(CodecId::Flac.kind(), MediaKind::Audio);
    }

    #[test]
    fn uncompressed_codecs() {
        assert!(CodecId::RawVideo.is_uncompressed());
        assert!(CodecId::PcmF32Le.is_uncompressed());
        assert!(!CodecId::Flac.is_uncompressed());
    }
}
