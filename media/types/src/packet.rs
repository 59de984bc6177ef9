/*!
    Encoded packet type.
*/

use crate::{MediaDuration, Pts, Rational};

/**
    An encoded media packet.

    Contains compressed data from a single elementary stream, with timing
    information. Packets are owned by the demuxer; decoders only borrow
    them for the duration of one decode call.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    /// Compressed data.
    pub data: Vec<u8>,
    /// Index of the stream this packet belongs to.
    pub stream_index: usize,
    /// Presentation timestamp (when to display/play).
    pub pts: Option<Pts>,
    /// Decode timestamp (may differ from PTS for B-frames).
    pub dts: Option<Pts>,
    /// Duration of this packet's content.
    pub duration: MediaDuration,
    /// Time base for interpreting timestamps.
    pub time_base: Rational,
    /// Whether this is a keyframe (can be decoded independently).
    pub is_keyframe: bool,
}

impl Packet {
    /**
        Create a keyframe packet with a presentation timestamp and no
        decode timestamp.
    */
    pub fn new(data: Vec<u8>, stream_index: usize, pts: Option<Pts>, time_base: Rational) -> Self {
        Self {
            data,
            stream_index,
            pts,
            dts: None,
            duration: MediaDuration(0),
            time_base,
            is_keyframe: true,
        }
    }

    pub fn with_dts(mut self, dts: Option<Pts>) -> Self {
        self.dts = dts;
        self
    }

    pub fn with_duration(mut self, duration: MediaDuration) -> Self {
        self.duration = duration;
        self
    }

    /**
        Returns the presentation time as a Duration, if PTS is set.
    */
    pub fn presentation_time(&self) -> Option<std::time::Duration> {
        self.pts.map(|pts| pts.to_duration(self.time_base))
    }
}

// Packets are handed from demux threads to decode workers
static_assertions::assert_impl_all!(Packet: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TB_1_1000: Rational = Rational { num: 1, den: 1000 };

    #[test]
    fn packet_construction() {
        let packet = Packet::new(vec![0u8; 1000], 1, Some(Pts(500)), TB_1_1000)
            .with_dts(Some(Pts(400)))
            .with_duration(MediaDuration(40));

        assert_eq!(packet.data.len(), 1000);
        assert_eq!(packet.stream_index, 1);
        assert_eq!(packet.dts, Some(Pts(400)));
        assert!(packet.is_keyframe);
        assert_eq!(packet.presentation_time(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn packet_without_pts() {
        let packet = Packet::new(vec![], 0, None, TB_1_1000);
        assert_eq!(packet.presentation_time(), None);
    }
}
