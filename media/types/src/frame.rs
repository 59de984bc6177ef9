/*!
    Decoded frame types.
*/

use crate::{
    ChannelLayout, Error, MediaDuration, MediaKind, PixelFormat, Pts, Rational, Result,
    SampleFormat,
};

/**
    One plane of a decoded video frame.

    Rows may be padded: `stride` is the distance in bytes between the
    starts of consecutive rows and can exceed the visible row length.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    pub data: Vec<u8>,
    pub stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, stride: usize) -> Self {
        Self { data, stride }
    }
}

/**
    A decoded video frame in the decoder's native pixel format.

    Carries the timing and interlace information the decoder reported
    alongside the pixel planes.
*/
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Pixel planes, in the order given by `format.planes()`.
    pub planes: Vec<Plane>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format of the planes.
    pub format: PixelFormat,
    /// Presentation timestamp from the packet, if any.
    pub pts: Option<Pts>,
    /// Decoder's best guess at the presentation time after reordering.
    pub best_effort_pts: Option<Pts>,
    /// Display duration, zero if unknown.
    pub duration: MediaDuration,
    /// Time base for interpreting the timestamps.
    pub time_base: Rational,
    pub interlaced: bool,
    pub top_field_first: bool,
}

impl VideoFrame {
    /**
        Create a new progressive video frame without timing.
    */
    pub fn new(
        planes: Vec<Plane>,
        width: u32,
        height: u32,
        format: PixelFormat,
        time_base: Rational,
    ) -> Self {
        Self {
            planes,
            width,
            height,
            format,
            pts: None,
            best_effort_pts: None,
            duration: MediaDuration(0),
            time_base,
            interlaced: false,
            top_field_first: false,
        }
    }

    /**
        Split a tightly packed buffer into planes.

        Fails if the buffer is not exactly one frame long.
    */
    pub fn from_packed(
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        time_base: Rational,
    ) -> Result<Self> {
        let expected = format.checked_frame_size(width, height).ok_or_else(|| {
            Error::resource_exhausted(format!("{format} frame of {width}x{height} exceeds memory"))
        })?;
        if data.len() != expected {
            return Err(Error::invalid_data(format!(
                "{format} {width}x{height} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let mut planes = Vec::with_capacity(format.plane_count());
        let mut offset = 0;
        for layout in format.planes() {
            let stride = layout.row_bytes(width);
            let len = stride * layout.height(height);
            planes.push(Plane::new(data[offset..offset + len].to_vec(), stride));
            offset += len;
        }

        Ok(Self::new(planes, width, height, format, time_base))
    }

    pub fn with_pts(mut self, pts: Option<Pts>) -> Self {
        self.pts = pts;
        self.best_effort_pts = pts;
        self
    }

    pub fn with_interlace(mut self, interlaced: bool, top_field_first: bool) -> Self {
        self.interlaced = interlaced;
        self.top_field_first = top_field_first;
        self
    }

    /**
        Check that the planes match the declared format and dimensions.
    */
    pub fn validate(&self) -> Result<()> {
        let layouts = self.format.planes();
        if self.planes.len() != layouts.len() {
            return Err(Error::invalid_data(format!(
                "{} frame has {} planes, expected {}",
                self.format,
                self.planes.len(),
                layouts.len()
            )));
        }
        for (index, (plane, layout)) in self.planes.iter().zip(layouts).enumerate() {
            let row_bytes = layout.row_bytes(self.width);
            let rows = layout.height(self.height);
            if plane.stride < row_bytes {
                return Err(Error::invalid_data(format!(
                    "plane {index} stride {} shorter than row ({row_bytes} bytes)",
                    plane.stride
                )));
            }
            let needed = match rows {
                0 => 0,
                rows => plane.stride * (rows - 1) + row_bytes,
            };
            if plane.data.len() < needed {
                return Err(Error::invalid_data(format!(
                    "plane {index} holds {} bytes, needs {needed}",
                    plane.data.len()
                )));
            }
        }
        Ok(())
    }

    /**
        Visible bytes of one row of a plane.
    */
    #[inline]
    pub fn row(&self, plane: usize, y: usize) -> &[u8] {
        let row_bytes = self.format.planes()[plane].row_bytes(self.width);
        let p = &self.planes[plane];
        &p.data[y * p.stride..y * p.stride + row_bytes]
    }

    /**
        Mutable visible bytes of one row of a plane.
    */
    #[inline]
    pub fn row_mut(&mut self, plane: usize, y: usize) -> &mut [u8] {
        let row_bytes = self.format.planes()[plane].row_bytes(self.width);
        let p = &mut self.planes[plane];
        &mut p.data[y * p.stride..y * p.stride + row_bytes]
    }

    /**
        Number of rows in a plane.
    */
    #[inline]
    pub fn rows(&self, plane: usize) -> usize {
        self.format.planes()[plane].height(self.height)
    }

    /**
        Copy the visible pixels into one tightly packed buffer.
    */
    pub fn to_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.format.frame_size(self.width, self.height));
        for plane in 0..self.planes.len() {
            for y in 0..self.rows(plane) {
                out.extend_from_slice(self.row(plane, y));
            }
        }
        out
    }
}

/**
    A decoded audio frame in the decoder's native sample format.

    Packed formats keep every channel interleaved in `planes[0]`; planar
    formats hold one plane per channel.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    pub planes: Vec<Vec<u8>>,
    /// Number of samples per channel.
    pub samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Declared layout, if the stream has one.
    pub channel_layout: Option<ChannelLayout>,
    pub channels: u16,
    pub format: SampleFormat,
    pub pts: Option<Pts>,
    pub best_effort_pts: Option<Pts>,
    pub time_base: Rational,
}

impl AudioFrame {
    /**
        Create a new audio frame without timing.
    */
    pub fn new(
        planes: Vec<Vec<u8>>,
        samples: usize,
        sample_rate: u32,
        channel_layout: Option<ChannelLayout>,
        channels: u16,
        format: SampleFormat,
        time_base: Rational,
    ) -> Self {
        Self {
            planes,
            samples,
            sample_rate,
            channel_layout,
            channels,
            format,
            pts: None,
            best_effort_pts: None,
            time_base,
        }
    }

    pub fn with_pts(mut self, pts: Option<Pts>) -> Self {
        self.pts = pts;
        self.best_effort_pts = pts;
        self
    }

    /**
        Returns the duration of this frame based on sample count and rate.
    */
    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.samples as f64 / self.sample_rate as f64)
    }

    /**
        Expected length of each plane in bytes.
    */
    pub fn expected_plane_len(&self) -> usize {
        if self.format.is_planar() {
            self.samples * self.format.bytes_per_sample()
        } else {
            self.samples * self.channels as usize * self.format.bytes_per_sample()
        }
    }

    /**
        Check that plane count and plane sizes match the declared format.
    */
    pub fn validate(&self) -> Result<()> {
        let expected_planes = if self.format.is_planar() {
            self.channels as usize
        } else {
            1
        };
        if self.planes.len() != expected_planes {
            return Err(Error::invalid_data(format!(
                "{} frame with {} channels has {} planes",
                self.format,
                self.channels,
                self.planes.len()
            )));
        }
        let expected_len = self.expected_plane_len();
        if let Some(short) = self.planes.iter().position(|p| p.len() < expected_len) {
            return Err(Error::invalid_data(format!(
                "plane {short} holds {} bytes, needs {expected_len}",
                self.planes[short].len()
            )));
        }
        Ok(())
    }
}

/**
    A frame fresh out of a decoder.
*/
#[derive(Clone, Debug)]
pub enum DecodedFrame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl DecodedFrame {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }

    /**
        Best-effort timestamp, falling back to the raw PTS.
    */
    pub fn timestamp(&self) -> Option<Pts> {
        match self {
            Self::Video(f) => f.best_effort_pts.or(f.pts),
            Self::Audio(f) => f.best_effort_pts.or(f.pts),
        }
    }

    pub fn time_base(&self) -> Rational {
        match self {
            Self::Video(f) => f.time_base,
            Self::Audio(f) => f.time_base,
        }
    }
}

impl From<VideoFrame> for DecodedFrame {
    fn from(frame: VideoFrame) -> Self {
        Self::Video(frame)
    }
}

impl From<AudioFrame> for DecodedFrame {
    fn from(frame: AudioFrame) -> Self {
        Self::Audio(frame)
    }
}

// Frames cross from decode workers to playback threads
static_assertions::assert_impl_all!(VideoFrame: Send, Sync);
static_assertions::assert_impl_all!(AudioFrame: Send, Sync);
