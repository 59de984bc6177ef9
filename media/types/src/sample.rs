/*!
    Sample value conversion between stored formats and `f32`.

    Effects and channel remapping work on `f32` in the range [-1.0, 1.0].
    Integer scaling follows FFmpeg's resampler: divide by 2^(bits-1) when
    reading, multiply and clip when writing.
*/

use crate::{AudioFrame, ChannelLayout, Rational, Result, SampleFormat};

/**
    Read one little-endian sample stored in `format` as `f32`.
*/
#[inline]
pub fn read_sample(bytes: &[u8], format: SampleFormat) -> f32 {
    match format.packed() {
        SampleFormat::U8 => (bytes[0] as f32 - 128.0) / 128.0,
        SampleFormat::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
        SampleFormat::S32 => {
            let value = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (value as f64 / 2_147_483_648.0) as f32
        }
        SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            f64::from_le_bytes(raw) as f32
        }
    }
}

/**
    Write `value` into `out` as one little-endian sample in `format`,
    clipping integer formats to their range.
*/
#[inline]
pub fn write_sample(value: f32, format: SampleFormat, out: &mut [u8]) {
    match format.packed() {
        SampleFormat::U8 => {
            out[0] = (value * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
        }
        SampleFormat::S16 => {
            let v = (value * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            out[..2].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::S32 => {
            let v = (value as f64 * 2_147_483_648.0)
                .round()
                .clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            out[..4].copy_from_slice(&v.to_le_bytes());
        }
        SampleFormat::F32 => out[..4].copy_from_slice(&value.to_le_bytes()),
        _ => out[..8].copy_from_slice(&(value as f64).to_le_bytes()),
    }
}

impl AudioFrame {
    /**
        Read every channel into its own `f32` buffer.
    */
    pub fn to_f32_planes(&self) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::new();
        self.read_f32_planes(&mut out)?;
        Ok(out)
    }

    /**
        Like [`AudioFrame::to_f32_planes`], but refills `out` in place so
        its buffers can be reused from frame to frame.
    */
    pub fn read_f32_planes(&self, out: &mut Vec<Vec<f32>>) -> Result<()> {
        self.validate()?;

        let channels = self.channels as usize;
        let bps = self.format.bytes_per_sample();
        out.resize_with(channels, Vec::new);
        for plane in out.iter_mut() {
            plane.clear();
            plane.reserve(self.samples);
        }

        if self.format.is_planar() {
            for (ch, plane) in self.planes.iter().enumerate() {
                out[ch].extend(
                    plane
                        .chunks_exact(bps)
                        .take(self.samples)
                        .map(|s| read_sample(s, self.format)),
                );
            }
        } else {
            let data = &self.planes[0];
            for frame in data.chunks_exact(bps * channels).take(self.samples) {
                for (ch, sample) in frame.chunks_exact(bps).enumerate() {
                    out[ch].push(read_sample(sample, self.format));
                }
            }
        }

        Ok(())
    }

    /**
        Build a planar `f32` frame from per-channel buffers.

        All buffers must have the same length.
    */
    pub fn from_f32_planes(
        planes: &[Vec<f32>],
        sample_rate: u32,
        channel_layout: Option<ChannelLayout>,
        time_base: Rational,
    ) -> Self {
        let samples = planes.first().map_or(0, Vec::len);
        let bytes = planes
            .iter()
            .map(|plane| plane.iter().flat_map(|v| v.to_le_bytes()).collect())
            .collect();
        AudioFrame::new(
            bytes,
            samples,
            sample_rate,
            channel_layout,
            planes.len() as u16,
            SampleFormat::F32p,
            time_base,
        )
    }
}
