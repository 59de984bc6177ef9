/*!
    Stream metadata.
*/

use crate::{ChannelLayout, CodecId, Error, MediaKind, PixelFormat, Rational, Result, SampleFormat};

/**
    Field order of interlaced video, as declared by the stream.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldOrder {
    /// Not declared; frames carry their own flags.
    #[default]
    Unknown,
    Progressive,
    TopFirst,
    BottomFirst,
}

/**
    Video stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    /// Pixel format the decoder produces.
    pub pixel_format: PixelFormat,
    pub field_order: FieldOrder,
    /// Nominal frame rate, if the container declares one.
    pub frame_rate: Option<Rational>,
}

impl VideoStreamInfo {
    /**
        Create video stream parameters with unknown field order and frame rate.
    */
    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
            field_order: FieldOrder::Unknown,
            frame_rate: None,
        }
    }

    pub fn with_field_order(mut self, field_order: FieldOrder) -> Self {
        self.field_order = field_order;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /**
        Size of one tightly packed native frame, or `None` if it does not
        fit in `usize`.
    */
    pub fn frame_size(&self) -> Option<usize> {
        self.pixel_format.checked_frame_size(self.width, self.height)
    }
}

/**
    Audio stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    /// Declared layout; `None` when the stream only gives a channel count.
    pub channel_layout: Option<ChannelLayout>,
    pub channels: u16,
    /// Sample format the decoder produces.
    pub sample_format: SampleFormat,
}

impl AudioStreamInfo {
    /**
        Create audio stream parameters from a known layout.
    */
    pub fn new(
        sample_rate: u32,
        channel_layout: ChannelLayout,
        sample_format: SampleFormat,
    ) -> Self {
        Self {
            sample_rate,
            channel_layout: Some(channel_layout),
            channels: channel_layout.channels(),
            sample_format,
        }
    }

    /**
        Create audio stream parameters that only declare a channel count.
    */
    pub fn with_channel_count(
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
    ) -> Self {
        Self {
            sample_rate,
            channel_layout: None,
            channels,
            sample_format,
        }
    }

    /**
        The declared layout, or the default layout for the channel count.
    */
    pub fn effective_layout(&self) -> Option<ChannelLayout> {
        self.channel_layout
            .or_else(|| ChannelLayout::from_channel_count(self.channels))
    }

    /**
        Bytes in one sample frame (one sample for every channel).
    */
    pub fn block_align(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }
}

/**
    Kind-specific stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamParams {
    Video(VideoStreamInfo),
    Audio(AudioStreamInfo),
}

/**
    Immutable description of one elementary stream.

    Set once when a sample provider is built and never renegotiated.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Index of the stream within its container.
    pub index: usize,
    pub codec: CodecId,
    /// Time base of packet and frame timestamps.
    pub time_base: Rational,
    pub params: StreamParams,
}

impl StreamDescriptor {
    /**
        Describe a video stream.

        Fails if the codec is not a video codec or the dimensions are empty.
    */
    pub fn video(
        index: usize,
        codec: CodecId,
        time_base: Rational,
        info: VideoStreamInfo,
    ) -> Result<Self> {
        if !codec.is_video() {
            return Err(Error::unsupported_format(format!("{codec:?} is not a video codec")));
        }
        if info.width == 0 || info.height == 0 {
            return Err(Error::invalid_data(format!(
                "invalid video dimensions {}x{}",
                info.width, info.height
            )));
        }
        Ok(Self {
            index,
            codec,
            time_base,
            params: StreamParams::Video(info),
        })
    }

    /**
        Describe an audio stream.

        Fails if the codec is not an audio codec, or the sample rate or
        channel count is zero.
    */
    pub fn audio(
        index: usize,
        codec: CodecId,
        time_base: Rational,
        info: AudioStreamInfo,
    ) -> Result<Self> {
        if !codec.is_audio() {
            return Err(Error::unsupported_format(format!("{codec:?} is not an audio codec")));
        }
        if info.sample_rate == 0 || info.channels == 0 {
            return Err(Error::invalid_data(format!(
                "invalid audio parameters: {} Hz, {} channels",
                info.sample_rate, info.channels
            )));
        }
        if let Some(layout) = info.channel_layout
            && layout.channels() != info.channels
        {
            return Err(Error::invalid_data(format!(
                "layout {layout} has {} channels, stream declares {}",
                layout.channels(),
                info.channels
            )));
        }
        Ok(Self {
            index,
            codec,
            time_base,
            params: StreamParams::Audio(info),
        })
    }

    pub fn kind(&self) -> MediaKind {
        match self.params {
            StreamParams::Video(_) => MediaKind::Video,
            StreamParams::Audio(_) => MediaKind::Audio,
        }
    }

    pub fn video_info(&self) -> Option<&VideoStreamInfo> {
        match &self.params {
            StreamParams::Video(info) => Some(info),
            StreamParams::Audio(_) => None,
        }
    }

    pub fn audio_info(&self) -> Option<&AudioStreamInfo> {
        match &self.params {
            StreamParams::Audio(info) => Some(info),
            StreamParams::Video(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_descriptor() {
        let info = VideoStreamInfo::new(1920, 1080, PixelFormat::Yuv420p);
        let stream =
            StreamDescriptor::video(0, CodecId::H264, Rational::new(1, 90000), info).unwrap();
        assert_eq!(stream.kind(), MediaKind::Video);
        assert_eq!(stream.video_info().unwrap().frame_size(), Some(1920 * 1080 * 3 / 2));
        assert!(stream.audio_info().is_none());
    }

    #[test]
    fn codec_kind_must_match() {
        let info = VideoStreamInfo::new(64, 64, PixelFormat::Yuv420p);
        assert!(StreamDescriptor::video(0, CodecId::Aac, Rational::new(1, 1000), info).is_err());
    }

    #[test]
    fn audio_layout_must_match_channel_count() {
        let mut info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        info.channels = 6;
        let tb = Rational::new(1, 48000);
        assert!(StreamDescriptor::audio(1, CodecId::PcmS16Le, tb, info).is_err());
    }

    #[test]
    fn effective_layout_falls_back_to_channel_count() {
        let info = AudioStreamInfo::with_channel_count(44100, 6, SampleFormat::F32p);
        assert_eq!(info.effective_layout(), Some(ChannelLayout::Surround51));
        assert_eq!(info.block_align(), 24);

        let odd = AudioStreamInfo::with_channel_count(44100, 5, SampleFormat::S16);
        assert_eq!(odd.effective_layout(), None);
    }
}
