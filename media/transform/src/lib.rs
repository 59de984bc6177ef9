/*!
    Format conversion for the sample production pipeline.

    This crate turns decoded frames in whatever layout the decoder produced
    into the fixed layout a playback surface consumes:
    - **Video**: pixel format conversion to NV12 or YUV420P, resampling
      chroma planes with a selectable filter
    - **Audio**: channel layout remapping and sample format conversion to
      interleaved output

    Frame dimensions and sample rates are never changed.

    # Video Transformation

    ```ignore
    use media_transform::{VideoTransform, VideoTransformConfig};
    use media_types::PixelFormat;

    // Convert 1920x1080 YUV 4:2:0 frames to NV12
    let mut transform =
        VideoTransform::new(VideoTransformConfig::new(), 1920, 1080, PixelFormat::Yuv420p)?;

    for frame in decoded_frames {
        let nv12 = transform.transform(&frame)?;
        // Hand nv12 to the display surface
    }
    ```

    # Audio Transformation

    ```ignore
    use media_transform::{AudioTransform, AudioTransformConfig};

    // Downmix anything to 16-bit stereo
    let mut transform = AudioTransform::new(AudioTransformConfig::stereo(), &stream_info)?;

    for frame in decoded_frames {
        let pcm = transform.transform(&frame)?;
        // Send to audio output
    }
    ```

    # Allocation

    Both transforms do all of their setup in `new`: resampling filters,
    mix matrices and scratch buffers. Per-frame calls only reuse them. The
    input size and format are fixed at that point, and a frame that no
    longer matches fails with `FormatChanged`.
*/

pub use media_types::{
    AudioFrame, ChannelLayout, DecodedFrame, Error, PixelFormat, Result, SampleFormat, VideoFrame,
};

use media_types::{MediaKind, StreamDescriptor, StreamParams};

mod audio;
mod video;

pub use audio::{AudioTransform, AudioTransformConfig, MixMatrix};
pub use video::{ScalingAlgorithm, VideoTransform, VideoTransformConfig};

/**
    The transform for one stream, video or audio.
*/
#[derive(Debug)]
pub enum Converter {
    Video(VideoTransform),
    Audio(AudioTransform),
}

impl Converter {
    /**
        Build the converter matching the stream's kind.
    */
    pub fn new(
        stream: &StreamDescriptor,
        video: VideoTransformConfig,
        audio: AudioTransformConfig,
    ) -> Result<Self> {
        match &stream.params {
            StreamParams::Video(info) => Ok(Self::Video(VideoTransform::new(
                video,
                info.width,
                info.height,
                info.pixel_format,
            )?)),
            StreamParams::Audio(info) => Ok(Self::Audio(AudioTransform::new(audio, info)?)),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }

    /**
        Convert one decoded frame into the output layout.
    */
    pub fn convert(&mut self, frame: &DecodedFrame) -> Result<&[u8]> {
        match (self, frame) {
            (Self::Video(transform), DecodedFrame::Video(frame)) => transform.transform(frame),
            (Self::Audio(transform), DecodedFrame::Audio(frame)) => transform.transform(frame),
            (this, frame) => Err(Error::format_changed(format!(
                "{} converter received a {} frame",
                this.kind(),
                frame.kind()
            ))),
        }
    }
}

static_assertions::assert_impl_all!(Converter: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{AudioStreamInfo, CodecId, Rational, VideoStreamInfo};

    #[test]
    fn converter_follows_stream_kind() {
        let stream = StreamDescriptor::audio(
            0,
            CodecId::PcmS16Le,
            Rational::new(1, 48000),
            AudioStreamInfo::new(48000, ChannelLayout::Mono, SampleFormat::S16),
        )
        .unwrap();
        let converter =
            Converter::new(&stream, VideoTransformConfig::new(), AudioTransformConfig::new())
                .unwrap();
        assert_eq!(converter.kind(), MediaKind::Audio);
    }

    #[test]
    fn kind_mismatch_is_fatal() {
        let stream = StreamDescriptor::video(
            0,
            CodecId::RawVideo,
            Rational::new(1, 25),
            VideoStreamInfo::new(2, 2, PixelFormat::Yuv420p),
        )
        .unwrap();
        let mut converter =
            Converter::new(&stream, VideoTransformConfig::new(), AudioTransformConfig::new())
                .unwrap();
        let tb = Rational::new(1, 48000);
        let audio = AudioFrame::new(vec![vec![0; 2]], 1, 48000, None, 1, SampleFormat::S16, tb);
        let err = converter.convert(&DecodedFrame::Audio(audio)).unwrap_err();
        assert!(err.is_fatal());
    }
}
