/*!
    PCM audio decoder.
*/

use std::collections::VecDeque;

use tracing::trace;

use media_types::{
    AudioFrame, AudioStreamInfo, CodecId, DecodedFrame, Error, Packet, Pts, Rational, Result,
    SampleFormat, StreamDescriptor,
};

use crate::{BestEffortTimestamp, Decoder};

/**
    Decoder for little-endian interleaved PCM.

    Every packet becomes one frame. A packet whose length is not a whole
    number of sample frames is rejected as corrupt. Packets without
    timestamps continue from the end of the previous frame.
*/
pub struct PcmDecoder {
    stream: StreamDescriptor,
    info: AudioStreamInfo,
    timestamps: BestEffortTimestamp,
    next_pts: Option<Pts>,
    pending: VecDeque<AudioFrame>,
    eof: bool,
}

impl PcmDecoder {
    /**
        Create a decoder for the given stream.

        The stream's sample format must be the one the PCM codec stores.
    */
    pub fn new(stream: StreamDescriptor) -> Result<Self> {
        let format = match stream.codec {
            CodecId::PcmU8 => SampleFormat::U8,
            CodecId::PcmS16Le => SampleFormat::S16,
            CodecId::PcmS32Le => SampleFormat::S32,
            CodecId::PcmF32Le => SampleFormat::F32,
            other => {
                return Err(Error::unsupported_format(format!(
                    "PCM decoder cannot decode {other:?}"
                )));
            }
        };
        let info = *stream
            .audio_info()
            .ok_or_else(|| Error::unsupported_format("PCM decoder needs an audio stream"))?;
        if info.sample_format != format {
            return Err(Error::unsupported_format(format!(
                "{:?} stores {format}, stream declares {}",
                stream.codec, info.sample_format
            )));
        }

        Ok(Self {
            stream,
            info,
            timestamps: BestEffortTimestamp::new(),
            next_pts: None,
            pending: VecDeque::new(),
            eof: false,
        })
    }
}

impl Decoder for PcmDecoder {
    fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.eof {
            return Err(Error::invalid_state("packet sent after end of stream"));
        }

        let block_align = self.info.block_align();
        if packet.data.is_empty() || packet.data.len() % block_align != 0 {
            return Err(Error::codec(format!(
                "corrupt PCM packet: {} bytes is not a multiple of {block_align}",
                packet.data.len()
            )));
        }
        let samples = packet.data.len() / block_align;

        let guessed = self.timestamps.guess(packet.pts, packet.dts).or(self.next_pts);
        let time_base = self.stream.time_base;
        self.next_pts = guessed.map(|pts| {
            let sample_time = Rational::new(1, self.info.sample_rate as i32);
            Pts(pts.0.saturating_add(sample_time.rescale(samples as i64, time_base)))
        });

        let mut frame = AudioFrame::new(
            vec![packet.data.clone()],
            samples,
            self.info.sample_rate,
            self.info.channel_layout,
            self.info.channels,
            self.info.sample_format,
            time_base,
        );
        frame.pts = packet.pts;
        frame.best_effort_pts = guessed;

        trace!(samples, pts = ?guessed, "PCM frame decoded");
        self.pending.push_back(frame);
        Ok(())
    }

    fn send_eof(&mut self) -> Result<()> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Option<DecodedFrame>> {
        Ok(self.pending.pop_front().map(DecodedFrame::Audio))
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.next_pts = None;
        self.eof = false;
        self.timestamps.reset();
    }
}

impl std::fmt::Debug for PcmDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmDecoder")
            .field("codec", &self.stream.codec)
            .field("sample_rate", &self.info.sample_rate)
            .field("channels", &self.info.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::ChannelLayout;

    const TB: Rational = Rational { num: 1, den: 48000 };

    fn decoder() -> PcmDecoder {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        PcmDecoder::new(StreamDescriptor::audio(1, CodecId::PcmS16Le, TB, info).unwrap()).unwrap()
    }

    fn receive(decoder: &mut PcmDecoder) -> AudioFrame {
        match decoder.receive_frame().unwrap() {
            Some(DecodedFrame::Audio(frame)) => frame,
            other => panic!("expected an audio frame, got {other:?}"),
        }
    }

    #[test]
    fn decodes_interleaved_packet() {
        let mut decoder = decoder();
        decoder.send_packet(&Packet::new(vec![0; 16], 1, Some(Pts(0)), TB)).unwrap();
        let frame = receive(&mut decoder);
        assert_eq!(frame.samples, 4);
        assert_eq!(frame.format, SampleFormat::S16);
        assert_eq!(frame.best_effort_pts, Some(Pts(0)));
    }

    #[test]
    fn extrapolates_missing_timestamps() {
        let mut decoder = decoder();
        decoder.send_packet(&Packet::new(vec![0; 400], 1, Some(Pts(1000)), TB)).unwrap();
        decoder.send_packet(&Packet::new(vec![0; 400], 1, None, TB)).unwrap();
        assert_eq!(receive(&mut decoder).best_effort_pts, Some(Pts(1000)));
        assert_eq!(receive(&mut decoder).best_effort_pts, Some(Pts(1100)));
    }

    #[test]
    fn partial_sample_frame_is_corrupt() {
        let mut decoder = decoder();
        let err = decoder
            .send_packet(&Packet::new(vec![0; 6], 1, Some(Pts(0)), TB))
            .unwrap_err();
        assert!(err.is_decode_error());
        assert!(decoder.receive_frame().unwrap().is_none());
    }

    #[test]
    fn stream_format_must_match_codec() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::F32);
        let stream = StreamDescriptor::audio(1, CodecId::PcmS16Le, TB, info).unwrap();
        assert!(PcmDecoder::new(stream).is_err());
    }
}
