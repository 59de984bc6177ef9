/*!
    Decoder contexts for the sample production pipeline.

    This crate turns encoded packets into decoded frames behind a single
    [`Decoder`] trait. The protocol mirrors FFmpeg's send/receive model:
    packets go in with [`Decoder::send_packet`], frames come out with
    [`Decoder::receive_frame`] until it returns `None`, and
    [`Decoder::send_eof`] asks the decoder to release anything it is
    holding back.

    # Decoders

    - [`RawVideoDecoder`] - Uncompressed video, one frame per packet
    - [`PcmDecoder`] - Interleaved little-endian PCM audio
    - `FfmpegDecoder` - Any codec the system FFmpeg supports (`ffmpeg` feature)

    # Example

    ```ignore
    use media_decode::open;

    let mut decoder = open(stream)?;
    decoder.send_packet(&packet)?;
    while let Some(frame) = decoder.receive_frame()? {
        // Process frame
    }
    ```

    # Features

    - `ffmpeg`: Enable native decoding through the system FFmpeg libraries
*/

pub use media_types::{DecodedFrame, Error, Packet, Result, StreamDescriptor};

use media_types::CodecId;

#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod pcm;
mod raw;
mod timestamp;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegDecoder;
pub use pcm::PcmDecoder;
pub use raw::RawVideoDecoder;
pub use timestamp::BestEffortTimestamp;

/**
    A decoder context bound to one stream.

    A decoder may buffer packets internally, so a single packet can produce
    zero or more frames. Callers should drain [`Decoder::receive_frame`]
    after every packet.
*/
pub trait Decoder: Send {
    /// The stream this decoder was opened for.
    fn stream(&self) -> &StreamDescriptor;

    /**
        Feed one encoded packet.

        A corrupt packet fails with a decode error (see
        [`Error::is_decode_error`]) and leaves the decoder usable.
    */
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /**
        Signal that no more packets will follow.
    */
    fn send_eof(&mut self) -> Result<()>;

    /**
        Take the next decoded frame, or `None` if more input is needed.
    */
    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>>;

    /**
        Drop all buffered state after a discontinuity.
    */
    fn reset(&mut self);
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn stream(&self) -> &StreamDescriptor {
        (**self).stream()
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        (**self).send_packet(packet)
    }

    fn send_eof(&mut self) -> Result<()> {
        (**self).send_eof()
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>> {
        (**self).receive_frame()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/**
    Open the built-in decoder for an uncompressed stream.

    Compressed codecs need codec parameters from a demuxer and are opened
    through `FfmpegDecoder::new` instead.
*/
pub fn open(stream: StreamDescriptor) -> Result<Box<dyn Decoder>> {
    match stream.codec {
        CodecId::RawVideo => Ok(Box::new(RawVideoDecoder::new(stream)?)),
        CodecId::PcmU8 | CodecId::PcmS16Le | CodecId::PcmS32Le | CodecId::PcmF32Le => {
            Ok(Box::new(PcmDecoder::new(stream)?))
        }
        other => Err(Error::unsupported_format(format!(
            "no built-in decoder for {other:?}"
        ))),
    }
}
