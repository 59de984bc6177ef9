/*!
    Uncompressed video "decoder".
*/

use tracing::trace;

use media_types::{
    CodecId, DecodedFrame, Error, FieldOrder, Packet, Result, StreamDescriptor, VideoFrame,
    VideoStreamInfo,
};

use crate::{BestEffortTimestamp, Decoder};

/**
    Decoder for `rawvideo` streams.

    Each packet carries exactly one tightly packed frame in the stream's
    pixel format. A packet of any other length is rejected as corrupt.
    Interlace flags come from the stream's declared field order, the same
    way FFmpeg's rawvideo decoder applies `field_order`.
*/
pub struct RawVideoDecoder {
    stream: StreamDescriptor,
    info: VideoStreamInfo,
    timestamps: BestEffortTimestamp,
    pending: Option<VideoFrame>,
    eof: bool,
}

impl RawVideoDecoder {
    /**
        Create a decoder for the given stream.
    */
    pub fn new(stream: StreamDescriptor) -> Result<Self> {
        if stream.codec != CodecId::RawVideo {
            return Err(Error::unsupported_format(format!(
                "raw video decoder cannot decode {:?}",
                stream.codec
            )));
        }
        let info = *stream
            .video_info()
            .ok_or_else(|| Error::unsupported_format("raw video decoder needs a video stream"))?;

        Ok(Self {
            stream,
            info,
            timestamps: BestEffortTimestamp::new(),
            pending: None,
            eof: false,
        })
    }
}

impl Decoder for RawVideoDecoder {
    fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.eof {
            return Err(Error::invalid_state("packet sent after end of stream"));
        }
        if self.pending.is_some() {
            return Err(Error::invalid_state("previous frame has not been received"));
        }

        let mut frame = VideoFrame::from_packed(
            &packet.data,
            self.info.width,
            self.info.height,
            self.info.pixel_format,
            self.stream.time_base,
        )
        .map_err(|e| Error::codec(format!("corrupt raw video packet: {e}")))?;

        frame.pts = packet.pts;
        frame.best_effort_pts = self.timestamps.guess(packet.pts, packet.dts);
        frame.duration = packet.duration;
        (frame.interlaced, frame.top_field_first) = match self.info.field_order {
            FieldOrder::TopFirst => (true, true),
            FieldOrder::BottomFirst => (true, false),
            FieldOrder::Progressive | FieldOrder::Unknown => (false, false),
        };

        trace!(pts = ?frame.best_effort_pts, "raw video frame decoded");
        self.pending = Some(frame);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>> {
        Ok(self.pending.take().map(DecodedFrame::Video))
    }

    fn reset(&mut self) {
        self.pending = None;
        self.eof = false;
        self.timestamps.reset();
    }
}

impl std::fmt::Debug for RawVideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawVideoDecoder")
            .field("width", &self.info.width)
            .field("height", &self.info.height)
            .field("pixel_format", &self.info.pixel_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{PixelFormat, Pts, Rational};

    fn stream(field_order: FieldOrder) -> StreamDescriptor {
        let info = VideoStreamInfo::new(4, 2, PixelFormat::Yuv420p).with_field_order(field_order);
        StreamDescriptor::video(0, CodecId::RawVideo, Rational::new(1, 25), info).unwrap()
    }

    #[test]
    fn decodes_one_frame_per_packet() {
        let mut decoder = RawVideoDecoder::new(stream(FieldOrder::Progressive)).unwrap();
        let packet = Packet::new(vec![7; 12], 0, Some(Pts(3)), Rational::new(1, 25));

        assert!(decoder.receive_frame().unwrap().is_none());
        decoder.send_packet(&packet).unwrap();

        let Some(DecodedFrame::Video(frame)) = decoder.receive_frame().unwrap() else {
            panic!("expected a video frame");
        };
        assert_eq!(frame.best_effort_pts, Some(Pts(3)));
        assert_eq!(frame.planes[0].data, vec![7; 8]);
        assert!(!frame.interlaced);
        assert!(decoder.receive_frame().unwrap().is_none());
    }

    #[test]
    fn wrong_size_packet_is_a_codec_error() {
        let mut decoder = RawVideoDecoder::new(stream(FieldOrder::Progressive)).unwrap();
        let packet = Packet::new(vec![0; 11], 0, Some(Pts(0)), Rational::new(1, 25));
        let err = decoder.send_packet(&packet).unwrap_err();
        assert!(err.is_decode_error());
        assert!(decoder.receive_frame().unwrap().is_none());
    }

    #[test]
    fn field_order_sets_interlace_flags() {
        let mut decoder = RawVideoDecoder::new(stream(FieldOrder::BottomFirst)).unwrap();
        decoder
            .send_packet(&Packet::new(vec![0; 12], 0, None, Rational::new(1, 25)))
            .unwrap();
        let Some(DecodedFrame::Video(frame)) = decoder.receive_frame().unwrap() else {
            panic!("expected a video frame");
        };
        assert!(frame.interlaced);
        assert!(!frame.top_field_first);
    }

    #[test]
    fn rejects_other_codecs() {
        let info = VideoStreamInfo::new(4, 2, PixelFormat::Yuv420p);
        let h264 = StreamDescriptor::video(0, CodecId::H264, Rational::new(1, 25), info).unwrap();
        assert!(RawVideoDecoder::new(h264).is_err());
    }
}
