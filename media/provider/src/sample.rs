/*!
    Output samples handed to the playback surface.
*/

use std::time::Duration;

use bytes::Bytes;

use media_types::{FieldOrder, MediaKind, Pts};

/**
    One converted, consumer-ready sample.

    The buffer holds a whole frame in the provider's target layout: NV12 or
    YUV420P planes back to back for video, interleaved samples for audio.
    Ownership passes to the caller; the provider keeps no reference.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSample {
    pub kind: MediaKind,
    pub data: Bytes,
    /// Presentation time, never earlier than the previous sample's.
    pub timestamp: Duration,
    /// Best-effort timestamp in the stream's time base, before clamping.
    pub pts: Option<Pts>,
    pub duration: Duration,
    /// `TopFirst` or `BottomFirst` for interlaced video, `None` otherwise.
    pub interlace: Option<FieldOrder>,
}

impl OutputSample {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_interlaced(&self) -> bool {
        self.interlace.is_some()
    }

    pub fn top_field_first(&self) -> bool {
        self.interlace == Some(FieldOrder::TopFirst)
    }
}

static_assertions::assert_impl_all!(OutputSample: Send, Sync);
