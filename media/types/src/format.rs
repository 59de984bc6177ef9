/*!
    Pixel, sample and channel format types.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/**
    Geometry of one plane of a pixel format.

    Plane dimensions are the frame dimensions shifted right by the
    subsampling amounts, rounding up, so odd-sized frames keep their
    last chroma column and row.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    /// log2 of horizontal subsampling.
    pub width_shift: u8,
    /// log2 of vertical subsampling.
    pub height_shift: u8,
    /// Bytes stored per plane element (a chroma pair in NV12 counts as one).
    pub bytes_per_element: u8,
}

impl PlaneLayout {
    const fn new(width_shift: u8, height_shift: u8, bytes_per_element: u8) -> Self {
        Self {
            width_shift,
            height_shift,
            bytes_per_element,
        }
    }

    /**
        Number of elements per row for a frame of the given width.
    */
    #[inline]
    pub const fn width(self, width: u32) -> usize {
        ceil_rshift(width, self.width_shift)
    }

    /**
        Number of rows for a frame of the given height.
    */
    #[inline]
    pub const fn height(self, height: u32) -> usize {
        ceil_rshift(height, self.height_shift)
    }

    /**
        Tightly packed row length in bytes.
    */
    #[inline]
    pub const fn row_bytes(self, width: u32) -> usize {
        self.width(width) * self.bytes_per_element as usize
    }
}

#[inline]
const fn ceil_rshift(value: u32, shift: u8) -> usize {
    ((value as usize) + (1 << shift) - 1) >> shift
}

const YUV420P: &[PlaneLayout] = &[
    PlaneLayout::new(0, 0, 1),
    PlaneLayout::new(1, 1, 1),
    PlaneLayout::new(1, 1, 1),
];
const YUV422P: &[PlaneLayout] = &[
    PlaneLayout::new(0, 0, 1),
    PlaneLayout::new(1, 0, 1),
    PlaneLayout::new(1, 0, 1),
];
const YUV444P: &[PlaneLayout] = &[
    PlaneLayout::new(0, 0, 1),
    PlaneLayout::new(0, 0, 1),
    PlaneLayout::new(0, 0, 1),
];
const SEMI_PLANAR: &[PlaneLayout] = &[PlaneLayout::new(0, 0, 1), PlaneLayout::new(1, 1, 2)];
const GRAY8: &[PlaneLayout] = &[PlaneLayout::new(0, 0, 1)];
const PACKED24: &[PlaneLayout] = &[PlaneLayout::new(0, 0, 3)];
const PACKED32: &[PlaneLayout] = &[PlaneLayout::new(0, 0, 4)];
const YUV420P10: &[PlaneLayout] = &[
    PlaneLayout::new(0, 0, 2),
    PlaneLayout::new(1, 1, 2),
    PlaneLayout::new(1, 1, 2),
];

/**
    Video pixel formats.

    This is the subset of decoder output formats the pipeline understands.
    Names follow FFmpeg's `pix_fmt` spelling.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp (most common video format)
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp
    Yuv444p,
    /// Semi-planar YUV 4:2:0, interleaved U/V
    Nv12,
    /// Semi-planar YUV 4:2:0, interleaved V/U
    Nv21,
    /// Luma only, 8bpp
    Gray8,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed BGR, 24bpp
    Bgr24,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed BGRA, 32bpp
    Bgra,
    /// Planar YUV 4:2:0, 10-bit little-endian in 16-bit words
    #[serde(rename = "yuv420p10le")]
    Yuv420p10,
}

impl PixelFormat {
    /**
        Plane geometry, in plane order.
    */
    pub const fn planes(self) -> &'static [PlaneLayout] {
        match self {
            Self::Yuv420p => YUV420P,
            Self::Yuv422p => YUV422P,
            Self::Yuv444p => YUV444P,
            Self::Nv12 | Self::Nv21 => SEMI_PLANAR,
            Self::Gray8 => GRAY8,
            Self::Rgb24 | Self::Bgr24 => PACKED24,
            Self::Rgba | Self::Bgra => PACKED32,
            Self::Yuv420p10 => YUV420P10,
        }
    }

    /**
        Number of planes.
    */
    pub const fn plane_count(self) -> usize {
        self.planes().len()
    }

    /**
        Size in bytes of a tightly packed frame of the given dimensions.

        This is the exact length of a converted output buffer. Sizes that
        do not fit in `usize` saturate at `usize::MAX`; use
        [`PixelFormat::checked_frame_size`] to detect them.
    */
    pub const fn frame_size(self, width: u32, height: u32) -> usize {
        match self.checked_frame_size(width, height) {
            Some(size) => size,
            None => usize::MAX,
        }
    }

    /**
        Size in bytes of a tightly packed frame, or `None` on overflow.
    */
    pub const fn checked_frame_size(self, width: u32, height: u32) -> Option<usize> {
        let planes = self.planes();
        let mut total: usize = 0;
        let mut i = 0;
        while i < planes.len() {
            let plane = match planes[i].row_bytes(width).checked_mul(planes[i].height(height)) {
                Some(plane) => plane,
                None => return None,
            };
            total = match total.checked_add(plane) {
                Some(total) => total,
                None => return None,
            };
            i += 1;
        }
        Some(total)
    }

    /**
        Returns true for luma/chroma formats.
    */
    pub const fn is_yuv(self) -> bool {
        matches!(
            self,
            Self::Yuv420p
                | Self::Yuv422p
                | Self::Yuv444p
                | Self::Nv12
                | Self::Nv21
                | Self::Gray8
                | Self::Yuv420p10
        )
    }

    /**
        Returns true for packed RGB formats.
    */
    pub const fn is_rgb(self) -> bool {
        matches!(self, Self::Rgb24 | Self::Bgr24 | Self::Rgba | Self::Bgra)
    }

    /**
        Returns true if every component is stored in one byte.
    */
    pub const fn is_8bit(self) -> bool {
        !matches!(self, Self::Yuv420p10)
    }

    /**
        Byte offsets of R, G, B (and alpha) inside one packed pixel.
    */
    pub const fn rgb_offsets(self) -> Option<(usize, usize, usize, Option<usize>)> {
        match self {
            Self::Rgb24 => Some((0, 1, 2, None)),
            Self::Bgr24 => Some((2, 1, 0, None)),
            Self::Rgba => Some((0, 1, 2, Some(3))),
            Self::Bgra => Some((2, 1, 0, Some(3))),
            _ => None,
        }
    }

    /**
        FFmpeg name of this format.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Yuv420p => "yuv420p",
            Self::Yuv422p => "yuv422p",
            Self::Yuv444p => "yuv444p",
            Self::Nv12 => "nv12",
            Self::Nv21 => "nv21",
            Self::Gray8 => "gray",
            Self::Rgb24 => "rgb24",
            Self::Bgr24 => "bgr24",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
            Self::Yuv420p10 => "yuv420p10le",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "yuv420p" | "i420" => Self::Yuv420p,
            "yuv422p" => Self::Yuv422p,
            "yuv444p" => Self::Yuv444p,
            "nv12" => Self::Nv12,
            "nv21" => Self::Nv21,
            "gray" | "gray8" => Self::Gray8,
            "rgb24" => Self::Rgb24,
            "bgr24" => Self::Bgr24,
            "rgba" => Self::Rgba,
            "bgra" => Self::Bgra,
            "yuv420p10le" | "yuv420p10" => Self::Yuv420p10,
            other => {
                return Err(Error::unsupported_format(format!(
                    "unknown pixel format '{other}'"
                )));
            }
        })
    }
}

/**
    Audio sample formats.

    Packed formats interleave channels in one buffer; planar formats
    store one buffer per channel.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SampleFormat {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    S16,
    /// Signed 32-bit integer
    S32,
    /// 32-bit floating point, range [-1.0, 1.0]
    F32,
    /// 64-bit floating point
    F64,
    /// Planar unsigned 8-bit integer
    U8p,
    /// Planar signed 16-bit integer
    S16p,
    /// Planar signed 32-bit integer
    S32p,
    /// Planar 32-bit floating point
    F32p,
    /// Planar 64-bit floating point
    F64p,
}

impl SampleFormat {
    /**
        Returns the number of bytes per sample.
    */
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 | Self::U8p => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::F32 | Self::S32p | Self::F32p => 4,
            Self::F64 | Self::F64p => 8,
        }
    }

    /**
        Returns true if this is a floating-point format.
    */
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::F32p | Self::F64p)
    }

    /**
        Returns true if channels are stored in separate planes.
    */
    pub const fn is_planar(self) -> bool {
        matches!(
            self,
            Self::U8p | Self::S16p | Self::S32p | Self::F32p | Self::F64p
        )
    }

    /**
        The interleaved variant of this format.
    */
    pub const fn packed(self) -> Self {
        match self {
            Self::U8 | Self::U8p => Self::U8,
            Self::S16 | Self::S16p => Self::S16,
            Self::S32 | Self::S32p => Self::S32,
            Self::F32 | Self::F32p => Self::F32,
            Self::F64 | Self::F64p => Self::F64,
        }
    }

    /**
        FFmpeg name of this format.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
            Self::U8p => "u8p",
            Self::S16p => "s16p",
            Self::S32p => "s32p",
            Self::F32p => "fltp",
            Self::F64p => "dblp",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "u8" => Self::U8,
            "s16" => Self::S16,
            "s32" => Self::S32,
            "flt" | "f32" => Self::F32,
            "dbl" | "f64" => Self::F64,
            "u8p" => Self::U8p,
            "s16p" => Self::S16p,
            "s32p" => Self::S32p,
            "fltp" | "f32p" => Self::F32p,
            "dblp" | "f64p" => Self::F64p,
            other => {
                return Err(Error::unsupported_format(format!(
                    "unknown sample format '{other}'"
                )));
            }
        })
    }
}

/**
    A single speaker position.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    SideLeft,
    SideRight,
}

/**
    Audio channel layout.

    Channel order within interleaved data follows [`ChannelLayout::positions`].
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single channel
    #[serde(rename = "mono")]
    Mono,
    /// Left and right channels
    #[serde(rename = "stereo")]
    Stereo,
    /// Left, right, centre
    #[serde(rename = "3.0")]
    Surround,
    /// Front and back pairs
    #[serde(rename = "quad")]
    Quad,
    /// 5.1 with back surrounds
    #[serde(rename = "5.1")]
    Surround51,
    /// 7.1 with back and side surrounds
    #[serde(rename = "7.1")]
    Surround71,
}

impl ChannelLayout {
    /**
        Returns the number of channels.
    */
    pub const fn channels(self) -> u16 {
        self.positions().len() as u16
    }

    /**
        Speaker positions in storage order.
    */
    pub const fn positions(self) -> &'static [Channel] {
        use Channel::*;
        match self {
            Self::Mono => &[FrontCenter],
            Self::Stereo => &[FrontLeft, FrontRight],
            Self::Surround => &[FrontLeft, FrontRight, FrontCenter],
            Self::Quad => &[FrontLeft, FrontRight, BackLeft, BackRight],
            Self::Surround51 => &[
                FrontLeft,
                FrontRight,
                FrontCenter,
                LowFrequency,
                BackLeft,
                BackRight,
            ],
            Self::Surround71 => &[
                FrontLeft,
                FrontRight,
                FrontCenter,
                LowFrequency,
                BackLeft,
                BackRight,
                SideLeft,
                SideRight,
            ],
        }
    }

    /**
        Index of the given position within this layout, if present.
    */
    pub fn index_of(self, channel: Channel) -> Option<usize> {
        self.positions().iter().position(|&c| c == channel)
    }

    /**
        Default layout for a channel count, as FFmpeg picks for streams
        that only declare how many channels they carry.
    */
    pub const fn from_channel_count(count: u16) -> Option<Self> {
        match count {
            1 => Some(Self::Mono),
            2 => Some(Self::Stereo),
            3 => Some(Self::Surround),
            4 => Some(Self::Quad),
            6 => Some(Self::Surround51),
            8 => Some(Self::Surround71),
            _ => None,
        }
    }

    /**
        FFmpeg name of this layout.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mono => "mono",
            Self::Stereo => "stereo",
            Self::Surround => "3.0",
            Self::Quad => "quad",
            Self::Surround51 => "5.1",
            Self::Surround71 => "7.1",
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "mono" => Self::Mono,
            "stereo" => Self::Stereo,
            "3.0" | "surround" => Self::Surround,
            "quad" => Self::Quad,
            "5.1" => Self::Surround51,
            "7.1" => Self::Surround71,
            other => {
                return Err(Error::unsupported_format(format!(
                    "unknown channel layout '{other}'"
                )));
            }
        })
    }
}
