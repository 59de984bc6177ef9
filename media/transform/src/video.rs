/*!
    Video pixel format conversion.
*/

use serde::{Deserialize, Serialize};
use tracing::debug;

use media_types::{Error, PixelFormat, Result, VideoFrame};

/**
    Filter used when chroma planes have to be resampled.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingAlgorithm {
    /// Nearest neighbour
    Point,
    /// Linear interpolation between the two nearest samples
    Bilinear,
    /// Cubic convolution over four samples, a = -0.5
    #[default]
    Bicubic,
}

impl ScalingAlgorithm {
    fn radius(self) -> f64 {
        match self {
            Self::Point => 0.5,
            Self::Bilinear => 1.0,
            Self::Bicubic => 2.0,
        }
    }

    fn weight(self, t: f64) -> f64 {
        let t = t.abs();
        match self {
            Self::Point => {
                if t < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Bilinear => (1.0 - t).max(0.0),
            Self::Bicubic => {
                if t <= 1.0 {
                    (1.5 * t - 2.5) * t * t + 1.0
                } else if t < 2.0 {
                    ((-0.5 * t + 2.5) * t - 4.0) * t + 2.0
                } else {
                    0.0
                }
            }
        }
    }
}

/**
    Configuration for video conversion.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoTransformConfig {
    /// Output pixel format. Only NV12 and YUV420P are produced.
    pub target_format: PixelFormat,
    /// Chroma resampling filter.
    pub algorithm: ScalingAlgorithm,
}

impl Default for VideoTransformConfig {
    fn default() -> Self {
        Self {
            target_format: PixelFormat::Nv12,
            algorithm: ScalingAlgorithm::Bicubic,
        }
    }
}

impl VideoTransformConfig {
    /**
        Create a config with default settings (NV12, bicubic).
    */
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Create a config that outputs planar YUV 4:2:0.
    */
    pub fn yuv420p() -> Self {
        Self {
            target_format: PixelFormat::Yuv420p,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: ScalingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/**
    Precomputed one-dimensional resampling filter.

    Every output position has the same number of taps. Source indices are
    clamped at the edges, so border samples repeat.
*/
#[derive(Clone, Debug)]
struct Filter {
    taps: usize,
    indices: Vec<usize>,
    weights: Vec<f32>,
}

impl Filter {
    fn new(src: usize, dst: usize, algorithm: ScalingAlgorithm) -> Result<Self> {
        let scale = src as f64 / dst as f64;
        // Widen the kernel when downscaling so every source sample contributes
        let stretch = scale.max(1.0);
        let radius = algorithm.radius() * stretch;
        let taps = match algorithm {
            ScalingAlgorithm::Point => 1,
            _ => (2.0 * radius).ceil() as usize + 1,
        };

        let len = area(dst, taps)?;
        let mut indices = Vec::new();
        let mut weights = Vec::new();
        reserve(&mut indices, len)?;
        reserve(&mut weights, len)?;
        let last = src as i64 - 1;

        for i in 0..dst {
            let center = (i as f64 + 0.5) * scale - 0.5;
            if taps == 1 {
                indices.push((((i as f64 + 0.5) * scale) as i64).clamp(0, last) as usize);
                weights.push(1.0);
                continue;
            }

            let left = (center - radius).ceil() as i64;
            let start = weights.len();
            let mut sum = 0.0;
            for k in 0..taps as i64 {
                let j = left + k;
                let w = algorithm.weight((j as f64 - center) / stretch);
                indices.push(j.clamp(0, last) as usize);
                weights.push(w as f32);
                sum += w;
            }
            if sum.abs() > f64::EPSILON {
                for w in &mut weights[start..] {
                    *w = (*w as f64 / sum) as f32;
                }
            }
        }

        Ok(Self {
            taps,
            indices,
            weights,
        })
    }

    #[inline]
    fn apply(&self, position: usize, sample: impl Fn(usize) -> f32) -> f32 {
        let base = position * self.taps;
        self.indices[base..base + self.taps]
            .iter()
            .zip(&self.weights[base..base + self.taps])
            .map(|(&index, &weight)| sample(index) * weight)
            .sum()
    }
}

/**
    Separable resampler for one chroma plane size.
*/
#[derive(Clone, Debug)]
struct ChromaResampler {
    src: (usize, usize),
    dst: (usize, usize),
    horizontal: Filter,
    vertical: Filter,
}

impl ChromaResampler {
    fn new(src: (usize, usize), dst: (usize, usize), algorithm: ScalingAlgorithm) -> Result<Self> {
        Ok(Self {
            src,
            dst,
            horizontal: Filter::new(src.0, dst.0, algorithm)?,
            vertical: Filter::new(src.1, dst.1, algorithm)?,
        })
    }

    fn resample(&self, src: &[u8], tmp: &mut Vec<f32>, dst: &mut Vec<u8>) {
        let (src_w, src_h) = self.src;
        let (dst_w, dst_h) = self.dst;

        tmp.clear();
        for y in 0..src_h {
            let row = &src[y * src_w..(y + 1) * src_w];
            for x in 0..dst_w {
                tmp.push(self.horizontal.apply(x, |i| row[i] as f32));
            }
        }

        dst.clear();
        for y in 0..dst_h {
            for x in 0..dst_w {
                let value = self.vertical.apply(y, |i| tmp[i * dst_w + x]);
                dst.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }
}

/**
    Working buffers, sized once when the transform is created.
*/
#[derive(Default)]
struct Scratch {
    luma: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
    tmp: Vec<f32>,
    cb_out: Vec<u8>,
    cr_out: Vec<u8>,
    out: Vec<u8>,
}

fn area(width: usize, height: usize) -> Result<usize> {
    width.checked_mul(height).ok_or_else(|| {
        Error::resource_exhausted(format!("plane of {width}x{height} exceeds memory"))
    })
}

fn reserve<T>(buf: &mut Vec<T>, len: usize) -> Result<()> {
    buf.try_reserve_exact(len)
        .map_err(|e| Error::resource_exhausted(format!("scratch buffer of {len} elements: {e}")))
}

/**
    Converts decoded frames of one fixed size and format to NV12 or YUV420P.

    This plays the role of a scaler context: the resampling filters and all
    scratch buffers are built once in [`VideoTransform::new`] and reused for
    every frame. Frame dimensions are never changed; only chroma planes are
    resampled to the target subsampling.

    RGB input is converted with BT.601 limited-range coefficients.
*/
pub struct VideoTransform {
    config: VideoTransformConfig,
    width: u32,
    height: u32,
    source: PixelFormat,
    source_chroma: Option<(usize, usize)>,
    target_chroma: (usize, usize),
    resampler: Option<ChromaResampler>,
    scratch: Scratch,
}

impl VideoTransform {
    /**
        Build a transform for frames of the given size and native format.

        Fails with `UnsupportedFormat` for targets other than NV12 and
        YUV420P, and with `ResourceExhausted` if scratch storage cannot
        be allocated.
    */
    pub fn new(
        config: VideoTransformConfig,
        width: u32,
        height: u32,
        source: PixelFormat,
    ) -> Result<Self> {
        let target = config.target_format;
        if !matches!(target, PixelFormat::Nv12 | PixelFormat::Yuv420p) {
            return Err(Error::unsupported_format(format!(
                "cannot convert to {target}, only nv12 and yuv420p are produced"
            )));
        }
        if width == 0 || height == 0 {
            return Err(Error::invalid_data(format!("invalid frame size {width}x{height}")));
        }

        let chroma_of = |format: PixelFormat| {
            let layout = format.planes()[1];
            (layout.width(width), layout.height(height))
        };
        let target_chroma = chroma_of(target);
        let source_chroma = match source {
            PixelFormat::Gray8 => None,
            f if f.is_rgb() => Some((width as usize, height as usize)),
            f => Some(chroma_of(f)),
        };

        let out_len = target.checked_frame_size(width, height).ok_or_else(|| {
            Error::resource_exhausted(format!("{target} frame of {width}x{height} exceeds memory"))
        })?;
        let mut scratch = Scratch::default();
        reserve(&mut scratch.out, out_len)?;

        let resampler = match source_chroma.filter(|&dims| dims != target_chroma) {
            Some(dims) => Some(ChromaResampler::new(dims, target_chroma, config.algorithm)?),
            None => None,
        };

        if source != target {
            let luma_len = area(width as usize, height as usize)?;
            let source_chroma_len = source_chroma.map_or(Ok(0), |(w, h)| area(w, h))?;
            let target_chroma_len = area(target_chroma.0, target_chroma.1)?;

            reserve(&mut scratch.luma, luma_len)?;
            reserve(&mut scratch.cb, source_chroma_len)?;
            reserve(&mut scratch.cr, source_chroma_len)?;
            if let Some((_, src_h)) = resampler.as_ref().map(|r| r.src) {
                reserve(&mut scratch.tmp, area(target_chroma.0, src_h)?)?;
            }
            reserve(&mut scratch.cb_out, target_chroma_len)?;
            reserve(&mut scratch.cr_out, target_chroma_len)?;
        }

        debug!(
            %source,
            %target,
            width,
            height,
            resample = resampler.is_some(),
            algorithm = ?config.algorithm,
            "video transform allocated"
        );

        Ok(Self {
            config,
            width,
            height,
            source,
            source_chroma,
            target_chroma,
            resampler,
            scratch,
        })
    }

    pub fn config(&self) -> &VideoTransformConfig {
        &self.config
    }

    /**
        Exact length of every converted frame.
    */
    pub fn output_size(&self) -> usize {
        self.config.target_format.frame_size(self.width, self.height)
    }

    /**
        Convert one frame, returning the packed output.

        The returned slice borrows the transform's output buffer and is
        overwritten by the next call. A frame whose size or format differs
        from the one the transform was built for fails with
        `FormatChanged`; malformed planes fail with `Conversion`.
    */
    pub fn transform(&mut self, frame: &VideoFrame) -> Result<&[u8]> {
        if frame.width != self.width || frame.height != self.height || frame.format != self.source {
            return Err(Error::format_changed(format!(
                "expected {} {}x{}, got {} {}x{}",
                self.source, self.width, self.height, frame.format, frame.width, frame.height
            )));
        }
        frame
            .validate()
            .map_err(|e| Error::conversion(e.to_string()))?;

        let scratch = &mut self.scratch;
        scratch.out.clear();

        if self.source == self.config.target_format {
            for plane in 0..frame.planes.len() {
                for y in 0..frame.rows(plane) {
                    scratch.out.extend_from_slice(frame.row(plane, y));
                }
            }
            return Ok(&scratch.out);
        }

        split(frame, scratch);

        let (cb, cr) = match (&self.resampler, self.source_chroma) {
            (Some(resampler), _) => {
                resampler.resample(&scratch.cb, &mut scratch.tmp, &mut scratch.cb_out);
                resampler.resample(&scratch.cr, &mut scratch.tmp, &mut scratch.cr_out);
                (&scratch.cb_out, &scratch.cr_out)
            }
            (None, Some(_)) => (&scratch.cb, &scratch.cr),
            (None, None) => {
                let len = self.target_chroma.0 * self.target_chroma.1;
                scratch.cb_out.clear();
                scratch.cb_out.resize(len, 128);
                scratch.cr_out.clear();
                scratch.cr_out.resize(len, 128);
                (&scratch.cb_out, &scratch.cr_out)
            }
        };

        scratch.out.extend_from_slice(&scratch.luma);
        match self.config.target_format {
            PixelFormat::Nv12 => {
                for (&u, &v) in cb.iter().zip(cr) {
                    scratch.out.push(u);
                    scratch.out.push(v);
                }
            }
            _ => {
                scratch.out.extend_from_slice(cb);
                scratch.out.extend_from_slice(cr);
            }
        }

        Ok(&scratch.out)
    }
}

impl std::fmt::Debug for VideoTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTransform")
            .field("source", &self.source)
            .field("target", &self.config.target_format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/**
    Unpack a frame into separate luma and chroma planes at source resolution.
*/
fn split(frame: &VideoFrame, scratch: &mut Scratch) {
    scratch.luma.clear();
    scratch.cb.clear();
    scratch.cr.clear();

    match frame.format {
        PixelFormat::Yuv420p | PixelFormat::Yuv422p | PixelFormat::Yuv444p => {
            copy_plane(frame, 0, &mut scratch.luma);
            copy_plane(frame, 1, &mut scratch.cb);
            copy_plane(frame, 2, &mut scratch.cr);
        }
        PixelFormat::Nv12 | PixelFormat::Nv21 => {
            copy_plane(frame, 0, &mut scratch.luma);
            let (first, second) = match frame.format {
                PixelFormat::Nv12 => (&mut scratch.cb, &mut scratch.cr),
                _ => (&mut scratch.cr, &mut scratch.cb),
            };
            for y in 0..frame.rows(1) {
                for pair in frame.row(1, y).chunks_exact(2) {
                    first.push(pair[0]);
                    second.push(pair[1]);
                }
            }
        }
        PixelFormat::Gray8 => copy_plane(frame, 0, &mut scratch.luma),
        PixelFormat::Yuv420p10 => {
            for (plane, out) in [&mut scratch.luma, &mut scratch.cb, &mut scratch.cr]
                .into_iter()
                .enumerate()
            {
                for y in 0..frame.rows(plane) {
                    out.extend(frame.row(plane, y).chunks_exact(2).map(|s| {
                        let value = u16::from_le_bytes([s[0], s[1]]);
                        (value.saturating_add(2) >> 2).min(255) as u8
                    }));
                }
            }
        }
        format => {
            let Some((r, g, b, _)) = format.rgb_offsets() else {
                return;
            };
            let stride = format.planes()[0].bytes_per_element as usize;
            for y in 0..frame.rows(0) {
                for pixel in frame.row(0, y).chunks_exact(stride) {
                    let (luma, cb, cr) = rgb_to_ycbcr(pixel[r], pixel[g], pixel[b]);
                    scratch.luma.push(luma);
                    scratch.cb.push(cb);
                    scratch.cr.push(cr);
                }
            }
        }
    }
}

fn copy_plane(frame: &VideoFrame, plane: usize, out: &mut Vec<u8>) {
    for y in 0..frame.rows(plane) {
        out.extend_from_slice(frame.row(plane, y));
    }
}

/**
    BT.601 limited-range RGB to YCbCr.
*/
#[inline]
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 16.0 + (65.481 * r + 128.553 * g + 24.966 * b) / 255.0;
    let cb = 128.0 + (-37.797 * r - 74.203 * g + 112.0 * b) / 255.0;
    let cr = 128.0 + (112.0 * r - 93.786 * g - 18.214 * b) / 255.0;
    let clip = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    (clip(y), clip(cb), clip(cr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{Plane, Rational};

    const TB: Rational = Rational { num: 1, den: 25 };

    fn yuv420p_frame(width: u32, height: u32, y: u8, u: u8, v: u8) -> VideoFrame {
        let cw = width.div_ceil(2) as usize;
        let ch = height.div_ceil(2) as usize;
        VideoFrame::new(
            vec![
                Plane::new(vec![y; (width * height) as usize], width as usize),
                Plane::new(vec![u; cw * ch], cw),
                Plane::new(vec![v; cw * ch], cw),
            ],
            width,
            height,
            PixelFormat::Yuv420p,
            TB,
        )
    }

    #[test]
    fn yuv420p_to_nv12_interleaves_chroma() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(), 4, 2, PixelFormat::Yuv420p).unwrap();
        let frame = VideoFrame::from_packed(
            &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 20, 21],
            4,
            2,
            PixelFormat::Yuv420p,
            TB,
        )
        .unwrap();
        let out = transform.transform(&frame).unwrap();
        assert_eq!(out, &[1, 2, 3, 4, 5, 6, 7, 8, 10, 20, 11, 21]);
    }

    #[test]
    fn output_size_is_exact_for_odd_dimensions() {
        let sources = [
            PixelFormat::Yuv420p,
            PixelFormat::Yuv444p,
            PixelFormat::Rgb24,
            PixelFormat::Gray8,
        ];
        for source in sources {
            let mut transform =
                VideoTransform::new(VideoTransformConfig::new(), 5, 3, source).unwrap();
            let data = vec![90; source.frame_size(5, 3)];
            let frame = VideoFrame::from_packed(&data, 5, 3, source, TB).unwrap();
            let out = transform.transform(&frame).unwrap();
            assert_eq!(out.len(), 5 * 3 + 2 * 3 * 2, "{source}");
            assert_eq!(out.len(), transform.output_size());
        }
    }

    #[test]
    fn passthrough_is_a_copy() {
        let config = VideoTransformConfig::yuv420p();
        let mut transform = VideoTransform::new(config, 4, 4, PixelFormat::Yuv420p).unwrap();
        let data: Vec<u8> = (0..24).collect();
        let frame = VideoFrame::from_packed(&data, 4, 4, PixelFormat::Yuv420p, TB).unwrap();
        assert_eq!(transform.transform(&frame).unwrap(), data.as_slice());
    }

    #[test]
    fn flat_chroma_survives_resampling() {
        let algorithms = [
            ScalingAlgorithm::Point,
            ScalingAlgorithm::Bilinear,
            ScalingAlgorithm::Bicubic,
        ];
        for algorithm in algorithms {
            let config = VideoTransformConfig::new().with_algorithm(algorithm);
            let mut transform = VideoTransform::new(config, 6, 4, PixelFormat::Yuv444p).unwrap();
            let frame = VideoFrame::from_packed(
                &[vec![50; 24], vec![100; 24], vec![200; 24]].concat(),
                6,
                4,
                PixelFormat::Yuv444p,
                TB,
            )
            .unwrap();
            let out = transform.transform(&frame).unwrap();
            assert!(out[..24].iter().all(|&v| v == 50));
            for pair in out[24..].chunks_exact(2) {
                assert_eq!(pair, &[100, 200], "{algorithm:?}");
            }
        }
    }

    #[test]
    fn bicubic_identity_filter() {
        let filter = Filter::new(8, 8, ScalingAlgorithm::Bicubic).unwrap();
        let row = [0u8, 10, 40, 90, 160, 250, 30, 7];
        for (x, &expected) in row.iter().enumerate() {
            let value = filter.apply(x, |i| row[i] as f32);
            assert!((value - expected as f32).abs() < 1e-3);
        }
    }

    #[test]
    fn rgb_white_and_black_use_limited_range() {
        assert_eq!(rgb_to_ycbcr(255, 255, 255), (235, 128, 128));
        assert_eq!(rgb_to_ycbcr(0, 0, 0), (16, 128, 128));
    }

    #[test]
    fn bgra_reads_channels_in_order() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(), 2, 2, PixelFormat::Bgra).unwrap();
        // Pure blue in BGRA
        let data = [255, 0, 0, 255].repeat(4);
        let frame = VideoFrame::from_packed(&data, 2, 2, PixelFormat::Bgra, TB).unwrap();
        let out = transform.transform(&frame).unwrap();
        let (y, cb, cr) = rgb_to_ycbcr(0, 0, 255);
        assert_eq!(out, &[y, y, y, y, cb, cr]);
    }

    #[test]
    fn gray_gets_neutral_chroma() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::yuv420p(), 2, 2, PixelFormat::Gray8).unwrap();
        let frame =
            VideoFrame::from_packed(&[10, 20, 30, 40], 2, 2, PixelFormat::Gray8, TB).unwrap();
        assert_eq!(transform.transform(&frame).unwrap(), &[10, 20, 30, 40, 128, 128]);
    }

    #[test]
    fn ten_bit_is_scaled_down() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(), 2, 2, PixelFormat::Yuv420p10).unwrap();
        let mut data = Vec::new();
        for value in [64u16, 64, 940, 940, 512, 512] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let frame = VideoFrame::from_packed(&data, 2, 2, PixelFormat::Yuv420p10, TB).unwrap();
        assert_eq!(transform.transform(&frame).unwrap(), &[16, 16, 235, 235, 128, 128]);
    }

    #[test]
    fn size_change_is_fatal() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(), 4, 4, PixelFormat::Yuv420p).unwrap();
        let err = transform.transform(&yuv420p_frame(8, 4, 0, 0, 0)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_planes_are_a_conversion_error() {
        let mut transform =
            VideoTransform::new(VideoTransformConfig::new(), 4, 4, PixelFormat::Yuv420p).unwrap();
        let mut frame = yuv420p_frame(4, 4, 0, 0, 0);
        frame.planes[2].data.truncate(1);
        let err = transform.transform(&frame).unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }));
        assert!(!err.is_fatal());

        // Still usable afterwards
        assert_eq!(transform.transform(&yuv420p_frame(4, 4, 1, 2, 3)).unwrap().len(), 24);
    }

    #[test]
    fn oversized_frames_exhaust_resources() {
        let config = VideoTransformConfig::new();
        let err = VideoTransform::new(config, u32::MAX, u32::MAX, PixelFormat::Gray8).unwrap_err();
        assert!(matches!(err, Error::ResourceExhausted { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_unsupported_targets() {
        let config = VideoTransformConfig {
            target_format: PixelFormat::Rgba,
            ..VideoTransformConfig::default()
        };
        assert!(VideoTransform::new(config, 2, 2, PixelFormat::Yuv420p).is_err());
    }

    #[test]
    fn config_from_json() {
        let config: VideoTransformConfig =
            serde_json::from_str(r#"{"algorithm":"bilinear"}"#).unwrap();
        assert_eq!(config.target_format, PixelFormat::Nv12);
        assert_eq!(config.algorithm, ScalingAlgorithm::Bilinear);
    }
}
