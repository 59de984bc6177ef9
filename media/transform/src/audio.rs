/*!
    Audio channel layout and sample format conversion.
*/

use serde::{Deserialize, Serialize};
use tracing::debug;

use media_types::{
    AudioFrame, AudioStreamInfo, Channel, ChannelLayout, Error, Result, SampleFormat,
    sample::write_sample,
};

/**
    Configuration for audio conversion.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTransformConfig {
    /// Output sample format. Output is always interleaved, so planar
    /// formats are written as their packed variant.
    pub sample_format: SampleFormat,
    /// Output channel layout (None = keep the stream's channels).
    pub channel_layout: Option<ChannelLayout>,
}

impl Default for AudioTransformConfig {
    fn default() -> Self {
        Self {
            sample_format: SampleFormat::S16,
            channel_layout: None,
        }
    }
}

impl AudioTransformConfig {
    /**
        Create a config with default settings (S16, stream layout).
    */
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Create a config for 16-bit stereo output.
    */
    pub fn stereo() -> Self {
        Self {
            channel_layout: Some(ChannelLayout::Stereo),
            ..Self::default()
        }
    }

    pub fn with_sample_format(mut self, sample_format: SampleFormat) -> Self {
        self.sample_format = sample_format;
        self
    }

    pub fn with_channel_layout(mut self, channel_layout: ChannelLayout) -> Self {
        self.channel_layout = Some(channel_layout);
        self
    }
}

/**
    Channel mixing coefficients, one row per output channel.

    Built with FFmpeg's nearest-available rules: a missing centre is split
    across the front pair at -3 dB, a missing front pair folds into the
    centre at -3 dB, surrounds fall back to their counterpart, then to the
    front on their side. LFE is dropped when the target has no LFE. If any
    output row could clip, all rows are scaled down together.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct MixMatrix {
    inputs: usize,
    outputs: usize,
    coefficients: Vec<f32>,
}

impl MixMatrix {
    pub fn identity(channels: usize) -> Self {
        let mut coefficients = vec![0.0; channels * channels];
        for i in 0..channels {
            coefficients[i * channels + i] = 1.0;
        }
        Self {
            inputs: channels,
            outputs: channels,
            coefficients,
        }
    }

    pub fn new(source: ChannelLayout, target: ChannelLayout) -> Self {
        use std::f32::consts::FRAC_1_SQRT_2;
        use Channel::*;

        let inputs = source.channels() as usize;
        let outputs = target.channels() as usize;
        let mut coefficients = vec![0.0f32; inputs * outputs];
        let mut add = |to: Channel, from: usize, gain: f32| match target.index_of(to) {
            Some(row) => {
                coefficients[row * inputs + from] += gain;
                true
            }
            None => false,
        };
        let has = |channel: Channel| target.index_of(channel).is_some();

        for (from, &channel) in source.positions().iter().enumerate() {
            if add(channel, from, 1.0) {
                continue;
            }
            match channel {
                FrontCenter => {
                    if has(FrontLeft) && has(FrontRight) {
                        add(FrontLeft, from, FRAC_1_SQRT_2);
                        add(FrontRight, from, FRAC_1_SQRT_2);
                    }
                }
                FrontLeft | FrontRight => {
                    add(FrontCenter, from, FRAC_1_SQRT_2);
                }
                LowFrequency => {}
                BackLeft | BackRight | SideLeft | SideRight => {
                    let (counterpart, front) = match channel {
                        BackLeft => (SideLeft, FrontLeft),
                        SideLeft => (BackLeft, FrontLeft),
                        BackRight => (SideRight, FrontRight),
                        _ => (BackRight, FrontRight),
                    };
                    let _ = add(counterpart, from, 1.0)
                        || add(front, from, FRAC_1_SQRT_2)
                        || add(FrontCenter, from, 0.5);
                }
            }
        }

        let peak = coefficients
            .chunks_exact(inputs)
            .map(|row| row.iter().map(|c| c.abs()).sum::<f32>())
            .fold(0.0f32, f32::max);
        if peak > 1.0 {
            for c in &mut coefficients {
                *c /= peak;
            }
        }

        Self {
            inputs,
            outputs,
            coefficients,
        }
    }

    #[inline]
    pub fn coefficient(&self, output: usize, input: usize) -> f32 {
        self.coefficients[output * self.inputs + input]
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity(self.inputs)
    }
}

/**
    Converts decoded audio to interleaved samples in a fixed layout.

    The mix matrix is built once for the stream's layout. Frames are
    accepted in any sample format, since effect chains may hand back a
    different representation than the decoder produced, but sample rate
    and channel count must match the stream.
*/
pub struct AudioTransform {
    config: AudioTransformConfig,
    source: AudioStreamInfo,
    target_format: SampleFormat,
    matrix: MixMatrix,
    remap: bool,
    planes: Vec<Vec<f32>>,
    out: Vec<u8>,
}

impl AudioTransform {
    /**
        Build a transform for the given stream.

        Fails with `UnsupportedFormat` when a target layout is requested
        for a stream whose own layout is unknown.
    */
    pub fn new(config: AudioTransformConfig, source: &AudioStreamInfo) -> Result<Self> {
        let matrix = match (source.effective_layout(), config.channel_layout) {
            (_, None) => MixMatrix::identity(source.channels as usize),
            (Some(from), Some(to)) => MixMatrix::new(from, to),
            (None, Some(to)) if to.channels() == source.channels => {
                MixMatrix::identity(source.channels as usize)
            }
            (None, Some(to)) => {
                return Err(Error::unsupported_format(format!(
                    "cannot remap {} unlabelled channels to {to}",
                    source.channels
                )));
            }
        };
        let target_format = config.sample_format.packed();

        debug!(
            sample_rate = source.sample_rate,
            from = %source.sample_format,
            to = %target_format,
            inputs = matrix.inputs(),
            outputs = matrix.outputs(),
            "audio transform allocated"
        );

        Ok(Self {
            config,
            source: *source,
            target_format,
            remap: !matrix.is_identity(),
            matrix,
            planes: Vec::new(),
            out: Vec::new(),
        })
    }

    pub fn config(&self) -> &AudioTransformConfig {
        &self.config
    }

    pub fn matrix(&self) -> &MixMatrix {
        &self.matrix
    }

    /**
        Number of interleaved channels in the output.
    */
    pub fn output_channels(&self) -> usize {
        self.matrix.outputs()
    }

    /**
        Exact output length for a frame of `samples` samples per channel.
    */
    pub fn output_size(&self, samples: usize) -> usize {
        samples * self.output_channels() * self.target_format.bytes_per_sample()
    }

    /**
        Convert one frame, returning the interleaved output.

        The returned slice borrows the transform's output buffer and is
        overwritten by the next call.
    */
    pub fn transform(&mut self, frame: &AudioFrame) -> Result<&[u8]> {
        if frame.sample_rate != self.source.sample_rate || frame.channels != self.source.channels {
            return Err(Error::format_changed(format!(
                "expected {} Hz with {} channels, got {} Hz with {}",
                self.source.sample_rate, self.source.channels, frame.sample_rate, frame.channels
            )));
        }

        let size = self.output_size(frame.samples);
        self.out.clear();
        self.out
            .try_reserve(size)
            .map_err(|e| Error::resource_exhausted(format!("audio output of {size} bytes: {e}")))?;

        if frame.format == self.target_format && !self.remap {
            frame
                .validate()
                .map_err(|e| Error::conversion(e.to_string()))?;
            self.out.extend_from_slice(&frame.planes[0][..size]);
            return Ok(&self.out);
        }

        frame
            .read_f32_planes(&mut self.planes)
            .map_err(|e| Error::conversion(e.to_string()))?;

        let bps = self.target_format.bytes_per_sample();
        let outputs = self.output_channels();
        self.out.resize(size, 0);
        for (index, slot) in self.out.chunks_exact_mut(bps).enumerate() {
            let (sample, output) = (index / outputs, index % outputs);
            let value: f32 = self
                .planes
                .iter()
                .enumerate()
                .map(|(channel, plane)| self.matrix.coefficient(output, channel) * plane[sample])
                .sum();
            write_sample(value, self.target_format, slot);
        }

        Ok(&self.out)
    }
}

impl std::fmt::Debug for AudioTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioTransform")
            .field("sample_rate", &self.source.sample_rate)
            .field("inputs", &self.matrix.inputs())
            .field("outputs", &self.matrix.outputs())
            .field("target_format", &self.target_format)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{Rational, sample::read_sample};

    const TB: Rational = Rational { num: 1, den: 48000 };

    fn s16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn read_s16(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn stereo_to_mono_averages() {
        let matrix = MixMatrix::new(ChannelLayout::Stereo, ChannelLayout::Mono);
        assert!((matrix.coefficient(0, 0) - 0.5).abs() < 1e-6);
        assert!((matrix.coefficient(0, 1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mono_to_stereo_is_minus_three_db() {
        let matrix = MixMatrix::new(ChannelLayout::Mono, ChannelLayout::Stereo);
        assert!((matrix.coefficient(0, 0) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(matrix.coefficient(0, 0), matrix.coefficient(1, 0));
    }

    #[test]
    fn surround_downmix_drops_lfe_and_normalizes() {
        let matrix = MixMatrix::new(ChannelLayout::Surround51, ChannelLayout::Stereo);
        // FL FR FC LFE BL BR
        assert_eq!(matrix.coefficient(0, 3), 0.0);
        assert_eq!(matrix.coefficient(0, 1), 0.0);
        let row_sum: f32 = (0..6).map(|i| matrix.coefficient(0, i)).sum();
        assert!((row_sum - 1.0).abs() < 1e-5);
        assert!(matrix.coefficient(0, 0) > matrix.coefficient(0, 2));
    }

    #[test]
    fn seven_one_to_five_one_folds_sides_into_backs() {
        let matrix = MixMatrix::new(ChannelLayout::Surround71, ChannelLayout::Surround51);
        // SL (input 6) lands on BL (output 4) alongside BL itself
        assert!(matrix.coefficient(4, 6) > 0.0);
        assert_eq!(matrix.coefficient(4, 6), matrix.coefficient(4, 4));
    }

    #[test]
    fn passthrough_copies_bytes() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        let mut transform = AudioTransform::new(AudioTransformConfig::new(), &info).unwrap();
        let data = s16(&[1, -1, 300, -300, i16::MAX, i16::MIN]);
        let layout = Some(ChannelLayout::Stereo);
        let frame = AudioFrame::new(vec![data.clone()], 3, 48000, layout, 2, SampleFormat::S16, TB);
        assert_eq!(transform.transform(&frame).unwrap(), data.as_slice());
    }

    #[test]
    fn planar_float_is_interleaved_to_s16() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::F32p);
        let mut transform = AudioTransform::new(AudioTransformConfig::new(), &info).unwrap();
        let planes = [vec![0.5, -0.5], vec![1.5, 0.0]];
        let frame = AudioFrame::from_f32_planes(&planes, 48000, Some(ChannelLayout::Stereo), TB);
        let expected_len = transform.output_size(2);
        let out = transform.transform(&frame).unwrap();
        assert_eq!(out.len(), expected_len);
        assert_eq!(read_s16(out), vec![16384, i16::MAX, -16384, 0]);
    }

    #[test]
    fn mono_upmix_output_size() {
        let info = AudioStreamInfo::new(44100, ChannelLayout::Mono, SampleFormat::S16);
        let config = AudioTransformConfig::stereo().with_sample_format(SampleFormat::F32);
        let mut transform = AudioTransform::new(config, &info).unwrap();
        let layout = Some(ChannelLayout::Mono);
        let frame =
            AudioFrame::new(vec![s16(&[16384; 10])], 10, 44100, layout, 1, SampleFormat::S16, TB);
        let out = transform.transform(&frame).unwrap();
        assert_eq!(out.len(), 10 * 2 * 4);
        let first = read_sample(&out[..4], SampleFormat::F32);
        assert!((first - 0.5 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn frames_of_varying_length_reuse_buffers() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::F32p);
        let mut transform = AudioTransform::new(AudioTransformConfig::new(), &info).unwrap();
        let layout = Some(ChannelLayout::Stereo);

        let long = AudioFrame::from_f32_planes(&[vec![0.5; 64], vec![0.5; 64]], 48000, layout, TB);
        assert_eq!(transform.transform(&long).unwrap().len(), 64 * 2 * 2);
        let capacity = transform.planes[0].capacity();

        let short = AudioFrame::from_f32_planes(&[vec![-0.5; 2], vec![0.25; 2]], 48000, layout, TB);
        let out = read_s16(transform.transform(&short).unwrap());
        assert_eq!(out, vec![-16384, 8192, -16384, 8192]);
        assert_eq!(transform.planes[0].capacity(), capacity);
        assert_eq!(transform.planes[0].len(), 2);
    }

    #[test]
    fn channel_count_change_is_fatal() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::S16);
        let mut transform = AudioTransform::new(AudioTransformConfig::new(), &info).unwrap();
        let layout = Some(ChannelLayout::Mono);
        let frame = AudioFrame::new(vec![s16(&[0; 4])], 4, 48000, layout, 1, SampleFormat::S16, TB);
        assert!(transform.transform(&frame).unwrap_err().is_fatal());
    }

    #[test]
    fn unlabelled_channels_cannot_be_remapped() {
        let info = AudioStreamInfo::with_channel_count(48000, 5, SampleFormat::S16);
        assert!(AudioTransform::new(AudioTransformConfig::stereo(), &info).is_err());
        assert!(AudioTransform::new(AudioTransformConfig::new(), &info).is_ok());
    }
}
