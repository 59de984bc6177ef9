/*!
    Native decoding through FFmpeg.
*/

use ffmpeg_next::{
    codec::{self, decoder::Audio as AudioDecoderFFmpeg, decoder::Video as VideoDecoderFFmpeg},
    error::EAGAIN,
    format::{Pixel, Sample},
    util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg},
};
use tracing::warn;

use media_types::{
    AudioFrame, DecodedFrame, Error, MediaKind, Packet, PixelFormat, Plane, Pts, Rational,
    Result, SampleFormat, StreamDescriptor, VideoFrame,
};

use crate::Decoder;

enum Inner {
    Video(VideoDecoderFFmpeg),
    Audio(AudioDecoderFFmpeg),
}

enum Received {
    Video(VideoFrameFFmpeg),
    Audio(AudioFrameFFmpeg),
}

/**
    Decoder backed by an FFmpeg codec context.

    Frames are copied out of FFmpeg-owned buffers as soon as they are
    received, so nothing returned from here references native memory.
*/
pub struct FfmpegDecoder {
    stream: StreamDescriptor,
    inner: Inner,
}

impl FfmpegDecoder {
    /**
        Open a decoder for `stream` using the codec parameters the
        demuxer reported for it.
    */
    pub fn new(stream: StreamDescriptor, parameters: codec::Parameters) -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::codec(e.to_string()))?;

        let context = codec::context::Context::from_parameters(parameters)
            .map_err(|e| Error::codec(e.to_string()))?;

        let inner = match stream.kind() {
            MediaKind::Video => Inner::Video(
                context
                    .decoder()
                    .video()
                    .map_err(|e| Error::codec(e.to_string()))?,
            ),
            MediaKind::Audio => Inner::Audio(
                context
                    .decoder()
                    .audio()
                    .map_err(|e| Error::codec(e.to_string()))?,
            ),
        };

        Ok(Self { stream, inner })
    }

    fn convert_audio(&self, frame: &AudioFrameFFmpeg) -> Result<AudioFrame> {
        let samples = frame.samples();
        if samples == 0 {
            return Err(Error::invalid_data("audio frame has zero samples"));
        }

        let format = sample_format_from_ffmpeg(frame.format()).ok_or_else(|| {
            Error::unsupported_format(format!("unsupported sample format: {:?}", frame.format()))
        })?;
        let channels = frame.channels() as u16;

        let plane_len = if format.is_planar() {
            samples * format.bytes_per_sample()
        } else {
            samples * channels as usize * format.bytes_per_sample()
        };
        let plane_count = if format.is_planar() { channels as usize } else { 1 };
        let planes = (0..plane_count)
            .map(|i| frame.data(i)[..plane_len].to_vec())
            .collect();

        let layout = self.stream.audio_info().and_then(|info| info.effective_layout());
        let mut out = AudioFrame::new(
            planes,
            samples,
            frame.rate(),
            layout,
            channels,
            format,
            self.stream.time_base,
        );
        out.pts = frame.pts().map(Pts);
        out.best_effort_pts = frame.timestamp().map(Pts);
        Ok(out)
    }
}

impl Decoder for FfmpegDecoder {
    fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        let mut ffmpeg_pkt = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };
        ffmpeg_pkt.set_pts(packet.pts.map(|p| p.0));
        ffmpeg_pkt.set_dts(packet.dts.map(|p| p.0));
        ffmpeg_pkt.set_duration(packet.duration.0);

        let result = match &mut self.inner {
            Inner::Video(decoder) => decoder.send_packet(&ffmpeg_pkt),
            Inner::Audio(decoder) => decoder.send_packet(&ffmpeg_pkt),
        };
        result.map_err(|e| Error::codec(e.to_string()))
    }

    fn send_eof(&mut self) -> Result<()> {
        let result = match &mut self.inner {
            Inner::Video(decoder) => decoder.send_eof(),
            Inner::Audio(decoder) => decoder.send_eof(),
        };
        result.map_err(|e| Error::codec(e.to_string()))
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>> {
        let received = match &mut self.inner {
            Inner::Video(decoder) => {
                let mut frame = VideoFrameFFmpeg::empty();
                decoder.receive_frame(&mut frame).map(|()| Received::Video(frame))
            }
            Inner::Audio(decoder) => {
                let mut frame = AudioFrameFFmpeg::empty();
                decoder.receive_frame(&mut frame).map(|()| Received::Audio(frame))
            }
        };

        match received {
            Ok(Received::Video(frame)) => {
                convert_video(&frame, self.stream.time_base)
                    .map(|f| Some(DecodedFrame::Video(f)))
            }
            Ok(Received::Audio(frame)) => {
                self.convert_audio(&frame).map(|f| Some(DecodedFrame::Audio(f)))
            }
            Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => Ok(None),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(Error::codec(e.to_string())),
        }
    }

    fn reset(&mut self) {
        match &mut self.inner {
            Inner::Video(decoder) => decoder.flush(),
            Inner::Audio(decoder) => decoder.flush(),
        }
    }
}

/**
    Convert FFmpeg pixel format to our PixelFormat.
*/
fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
        Pixel::YUV422P | Pixel::YUVJ422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P | Pixel::YUVJ444P => Some(PixelFormat::Yuv444p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::NV21 => Some(PixelFormat::Nv21),
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        other => {
            warn!(?other, "no mapping for FFmpeg pixel format");
            None
        }
    }
}

fn convert_video(frame: &VideoFrameFFmpeg, time_base: Rational) -> Result<VideoFrame> {
    let format = pixel_format_from_ffmpeg(frame.format()).ok_or_else(|| {
        Error::unsupported_format(format!("unsupported pixel format: {:?}", frame.format()))
    })?;

    let planes = (0..format.plane_count())
        .map(|i| Plane::new(frame.data(i).to_vec(), frame.stride(i)))
        .collect();

    let mut out = VideoFrame::new(planes, frame.width(), frame.height(), format, time_base);
    out.pts = frame.pts().map(Pts);
    out.best_effort_pts = frame.timestamp().map(Pts);
    out.interlaced = frame.is_interlaced();
    out.top_field_first = frame.is_top_first();
    Ok(out)
}

/**
    Convert FFmpeg sample format to our SampleFormat.
*/
fn sample_format_from_ffmpeg(format: Sample) -> Option<SampleFormat> {
    use ffmpeg_next::format::sample::Type;

    match format {
        Sample::U8(Type::Packed) => Some(SampleFormat::U8),
        Sample::U8(Type::Planar) => Some(SampleFormat::U8p),
        Sample::I16(Type::Packed) => Some(SampleFormat::S16),
        Sample::I16(Type::Planar) => Some(SampleFormat::S16p),
        Sample::I32(Type::Packed) => Some(SampleFormat::S32),
        Sample::I32(Type::Planar) => Some(SampleFormat::S32p),
        Sample::F32(Type::Packed) => Some(SampleFormat::F32),
        Sample::F32(Type::Planar) => Some(SampleFormat::F32p),
        Sample::F64(Type::Packed) => Some(SampleFormat::F64),
        Sample::F64(Type::Planar) => Some(SampleFormat::F64p),
        _ => None,
    }
}

impl std::fmt::Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegDecoder")
            .field("codec", &self.stream.codec)
            .field("kind", &self.stream.kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB: Rational = Rational { num: 1, den: 25 };

    #[test]
    fn progressive_frames_convert_without_field_flags() {
        let frame = VideoFrameFFmpeg::new(Pixel::GRAY8, 4, 2);
        let out = convert_video(&frame, TB).unwrap();

        assert_eq!(out.format, PixelFormat::Gray8);
        assert_eq!((out.width, out.height), (4, 2));
        assert!(!out.interlaced);
        assert!(!out.top_field_first);
        assert_eq!(out.pts, None);
    }

    #[test]
    fn unknown_pixel_formats_are_rejected() {
        let frame = VideoFrameFFmpeg::new(Pixel::PAL8, 4, 2);
        assert!(matches!(
            convert_video(&frame, TB),
            Err(Error::UnsupportedFormat { .. })
        ));
    }
}
