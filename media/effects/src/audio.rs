/*!
    Built-in audio effects.

    Option names, defaults and ranges follow the FFmpeg filters of the
    same name.
*/

use std::f64::consts::PI;

use media_types::{AudioStreamInfo, Error, Result};

use crate::{AudioEffect, EffectDefinition, EffectOptions};

/**
    `volume`: constant gain, linear or in dB (`-6dB`).
*/
pub struct Volume {
    gain: f32,
}

const VOLUME: &[&[&str]] = &[&["volume"]];

impl Volume {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn build(
        definition: &EffectDefinition,
        _info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, VOLUME)?;
        let gain = match options.get("volume") {
            None => 1.0,
            Some(raw) => match raw.strip_suffix("dB").or_else(|| raw.strip_suffix("db")) {
                Some(db) => {
                    let db = options.parse_number("volume", db)?;
                    10f64.powf(db / 20.0)
                }
                None => options.parse_number("volume", raw)?,
            },
        };
        let gain = options.check_range("volume", gain, 0.0, 65536.0)?;
        Ok(Box::new(Self::new(gain as f32)))
    }
}

impl AudioEffect for Volume {
    fn name(&self) -> &str {
        "volume"
    }

    fn process(&mut self, planes: &mut [Vec<f32>]) -> Result<()> {
        for sample in planes.iter_mut().flatten() {
            *sample *= self.gain;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClipKind {
    Hard,
    Tanh,
}

/**
    `asoftclip`: limit peaks to `threshold`, either with a hard clamp or
    a tanh curve.
*/
pub struct SoftClip {
    kind: ClipKind,
    threshold: f32,
    output: f32,
}

const SOFTCLIP: &[&[&str]] = &[&["type"], &["threshold"], &["output"]];

impl SoftClip {
    pub fn build(
        definition: &EffectDefinition,
        _info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, SOFTCLIP)?;
        let kind = match options.choice("type", "tanh", &["hard", "tanh"])? {
            "hard" => ClipKind::Hard,
            _ => ClipKind::Tanh,
        };
        Ok(Box::new(Self {
            kind,
            threshold: options.number("threshold", 1.0, 1e-6, 1.0)? as f32,
            output: options.number("output", 1.0, 1e-6, 16.0)? as f32,
        }))
    }
}

impl AudioEffect for SoftClip {
    fn name(&self) -> &str {
        "asoftclip"
    }

    fn process(&mut self, planes: &mut [Vec<f32>]) -> Result<()> {
        let t = self.threshold;
        for sample in planes.iter_mut().flatten() {
            let clipped = match self.kind {
                ClipKind::Hard => sample.clamp(-t, t),
                ClipKind::Tanh => t * (*sample / t).tanh(),
            };
            *sample = clipped * self.output;
        }
        Ok(())
    }
}

/**
    `aecho`: mixes delayed copies of the input back in.

    Delays are given in milliseconds and decays as linear gains, one per
    tap, `|`-separated. The delay line persists across frames.
*/
pub struct Echo {
    in_gain: f32,
    out_gain: f32,
    taps: Vec<(usize, f32)>,
    lines: Vec<Vec<f32>>,
    position: usize,
}

const ECHO: &[&[&str]] = &[&["in_gain"], &["out_gain"], &["delays"], &["decays"]];

impl Echo {
    pub fn build(
        definition: &EffectDefinition,
        info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, ECHO)?;
        let in_gain = options.number("in_gain", 0.6, 0.0, 1.0)? as f32;
        let out_gain = options.number("out_gain", 0.3, 0.0, 1.0)? as f32;
        let delays = options.numbers("delays", "1000", f64::MIN_POSITIVE, 90000.0)?;
        let decays = options.numbers("decays", "0.5", f64::MIN_POSITIVE, 1.0)?;
        if delays.len() != decays.len() {
            return Err(Error::invalid_effect(
                &definition.name,
                format!("{} delays but {} decays", delays.len(), decays.len()),
            ));
        }

        let taps: Vec<(usize, f32)> = delays
            .iter()
            .zip(&decays)
            .map(|(&ms, &decay)| {
                let samples = (ms * info.sample_rate as f64 / 1000.0).round().max(1.0) as usize;
                (samples, decay as f32)
            })
            .collect();
        let length = taps.iter().map(|&(delay, _)| delay).max().unwrap_or(1);

        let mut lines = Vec::with_capacity(info.channels as usize);
        for _ in 0..info.channels {
            let mut line = Vec::new();
            line.try_reserve_exact(length).map_err(|e| {
                Error::resource_exhausted(format!("echo delay line of {length} samples: {e}"))
            })?;
            line.resize(length, 0.0);
            lines.push(line);
        }

        Ok(Box::new(Self {
            in_gain,
            out_gain,
            taps,
            lines,
            position: 0,
        }))
    }
}

impl AudioEffect for Echo {
    fn name(&self) -> &str {
        "aecho"
    }

    fn process(&mut self, planes: &mut [Vec<f32>]) -> Result<()> {
        let samples = planes.first().map_or(0, Vec::len);
        for (plane, line) in planes.iter_mut().zip(&mut self.lines) {
            let length = line.len();
            let mut position = self.position;
            for sample in plane.iter_mut() {
                let mut out = *sample * self.in_gain;
                for &(delay, decay) in &self.taps {
                    out += line[(position + length - delay) % length] * decay;
                }
                line[position] = *sample;
                position = (position + 1) % length;
                *sample = out * self.out_gain;
            }
        }
        if let Some(length) = self.lines.first().map(Vec::len) {
            self.position = (self.position + samples) % length;
        }
        Ok(())
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.position = 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BiquadKind {
    LowPass,
    HighPass,
}

/**
    `lowpass` / `highpass`: second order RBJ cookbook filters.

    `width` is the filter's Q.
*/
pub struct Biquad {
    kind: BiquadKind,
    b: [f64; 3],
    a: [f64; 2],
    state: Vec<[f64; 4]>,
}

const BIQUAD: &[&[&str]] = &[&["frequency", "f"], &["width", "w"]];

impl Biquad {
    pub fn build_lowpass(
        definition: &EffectDefinition,
        info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        Self::build(BiquadKind::LowPass, 500.0, definition, info)
    }

    pub fn build_highpass(
        definition: &EffectDefinition,
        info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        Self::build(BiquadKind::HighPass, 3000.0, definition, info)
    }

    fn build(
        kind: BiquadKind,
        default_frequency: f64,
        definition: &EffectDefinition,
        info: &AudioStreamInfo,
    ) -> Result<Box<dyn AudioEffect>> {
        let options = EffectOptions::parse(&definition.name, &definition.params, BIQUAD)?;
        let nyquist = info.sample_rate as f64 / 2.0;
        let default_frequency = default_frequency.min(nyquist * 0.9);
        let frequency = options.number("frequency", default_frequency, 1.0, nyquist - 1.0)?;
        let q = options.number("width", 0.707, 0.01, 100.0)?;

        let w0 = 2.0 * PI * frequency / info.sample_rate as f64;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let b = match kind {
            BiquadKind::LowPass => [(1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0],
            BiquadKind::HighPass => [(1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0],
        };
        let a0 = 1.0 + alpha;

        Ok(Box::new(Self {
            kind,
            b: b.map(|v| v / a0),
            a: [-2.0 * cos / a0, (1.0 - alpha) / a0],
            state: vec![[0.0; 4]; info.channels as usize],
        }))
    }
}

impl AudioEffect for Biquad {
    fn name(&self) -> &str {
        match self.kind {
            BiquadKind::LowPass => "lowpass",
            BiquadKind::HighPass => "highpass",
        }
    }

    fn process(&mut self, planes: &mut [Vec<f32>]) -> Result<()> {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        for (plane, state) in planes.iter_mut().zip(&mut self.state) {
            let [mut x1, mut x2, mut y1, mut y2] = *state;
            for sample in plane.iter_mut() {
                let x = *sample as f64;
                let y = b0 * x + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2;
                (x2, x1) = (x1, x);
                (y2, y1) = (y1, y);
                *sample = y as f32;
            }
            *state = [x1, x2, y1, y2];
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.state.fill([0.0; 4]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{ChannelLayout, SampleFormat};

    fn info(rate: u32) -> AudioStreamInfo {
        AudioStreamInfo::new(rate, ChannelLayout::Stereo, SampleFormat::S16)
    }

    fn build(
        builder: fn(&EffectDefinition, &AudioStreamInfo) -> Result<Box<dyn AudioEffect>>,
        params: &str,
        rate: u32,
    ) -> Box<dyn AudioEffect> {
        builder(&EffectDefinition::new("test", params), &info(rate)).unwrap()
    }

    #[test]
    fn volume_accepts_decibels() {
        let mut effect = build(Volume::build, "-6.0206dB", 48000);
        let mut planes = vec![vec![1.0], vec![-0.5]];
        effect.process(&mut planes).unwrap();
        assert!((planes[0][0] - 0.5).abs() < 1e-4);
        assert!((planes[1][0] + 0.25).abs() < 1e-4);
    }

    #[test]
    fn volume_rejects_negative_gain() {
        assert!(Volume::build(&EffectDefinition::new("volume", "-1"), &info(48000)).is_err());
    }

    #[test]
    fn hard_clip_limits_to_threshold() {
        let mut effect = build(SoftClip::build, "type=hard:threshold=0.5", 48000);
        let mut planes = vec![vec![0.9, -0.9, 0.2]];
        effect.process(&mut planes).unwrap();
        assert_eq!(planes[0], vec![0.5, -0.5, 0.2]);
    }

    #[test]
    fn tanh_clip_stays_below_threshold() {
        let mut effect = build(SoftClip::build, "threshold=0.5", 48000);
        let mut planes = vec![vec![10.0, -10.0]];
        effect.process(&mut planes).unwrap();
        assert!(planes[0][0] <= 0.5 && planes[0][0] > 0.49);
        assert!(planes[0][1] >= -0.5);
    }

    #[test]
    fn unknown_clip_type_is_rejected() {
        let err = SoftClip::build(&EffectDefinition::new("asoftclip", "type=cubic"), &info(48000));
        assert!(matches!(err, Err(Error::InvalidEffect { .. })));
    }

    #[test]
    fn echo_repeats_impulse_across_frames() {
        // 10 ms at 1 kHz is 10 samples
        let mut effect = build(Echo::build, "1:1:10:0.5", 1000);
        let mut first = vec![vec![0.0; 6], vec![0.0; 6]];
        first[0][0] = 1.0;
        effect.process(&mut first).unwrap();
        assert_eq!(first[0][0], 1.0);

        let mut second = vec![vec![0.0; 6], vec![0.0; 6]];
        effect.process(&mut second).unwrap();
        assert_eq!(second[0][4], 0.5);
        assert!(second[1].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn echo_reset_clears_history() {
        let mut effect = build(Echo::build, "1:1:2:0.5", 1000);
        let mut planes = vec![vec![1.0], vec![1.0]];
        effect.process(&mut planes).unwrap();
        effect.reset();
        let mut planes = vec![vec![0.0; 4], vec![0.0; 4]];
        effect.process(&mut planes).unwrap();
        assert!(planes.iter().flatten().all(|&s| s == 0.0));
    }

    #[test]
    fn echo_needs_matching_taps() {
        let def = EffectDefinition::new("aecho", "0.6:0.3:100|200:0.5");
        assert!(Echo::build(&def, &info(48000)).is_err());
    }

    #[test]
    fn lowpass_passes_dc_and_highpass_blocks_it() {
        let mut low = build(Biquad::build_lowpass, "f=1000", 48000);
        let mut high = build(Biquad::build_highpass, "f=1000", 48000);
        let mut a = vec![vec![1.0; 4800]; 2];
        let mut b = a.clone();
        low.process(&mut a).unwrap();
        high.process(&mut b).unwrap();
        assert!((a[0][4799] - 1.0).abs() < 1e-3);
        assert!(b[0][4799].abs() < 1e-3);
    }

    #[test]
    fn filter_frequency_must_be_below_nyquist() {
        let def = EffectDefinition::new("lowpass", "f=30000");
        assert!(Biquad::build_lowpass(&def, &info(48000)).is_err());
    }
}
