/*!
    Effect chain construction.
*/

use std::sync::Arc;

use tracing::debug;

use media_types::{AudioStreamInfo, Error, Result, VideoStreamInfo};

use crate::{AudioChain, EffectChain, EffectDefinition, EffectRegistry, VideoChain};

/**
    Builds effect chains for one stream.

    Construction is all or nothing: if any definition fails, every stage
    built so far is dropped before the error is returned.
*/
pub trait EffectFactory: Send + Sync {
    fn create_effect(&self, definitions: &[EffectDefinition]) -> Result<EffectChain>;
}

/**
    Factory for audio chains, parameterized by the stream's sample rate
    and channel layout.
*/
#[derive(Clone, Debug)]
pub struct AudioEffectFactory {
    info: AudioStreamInfo,
    registry: Arc<EffectRegistry>,
}

impl AudioEffectFactory {
    pub fn new(info: AudioStreamInfo) -> Self {
        Self::with_registry(info, Arc::new(EffectRegistry::with_builtins()))
    }

    pub fn with_registry(info: AudioStreamInfo, registry: Arc<EffectRegistry>) -> Self {
        Self { info, registry }
    }

    pub fn info(&self) -> &AudioStreamInfo {
        &self.info
    }
}

impl EffectFactory for AudioEffectFactory {
    fn create_effect(&self, definitions: &[EffectDefinition]) -> Result<EffectChain> {
        let mut stages = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let constructor = self
                .registry
                .audio(definition.name.trim())
                .ok_or_else(|| Error::invalid_effect(&definition.name, "unknown audio effect"))?;
            stages.push(constructor(definition, &self.info)?);
        }

        let chain = AudioChain::new(self.info, stages);
        debug!(stages = ?chain.names(), "audio effect chain built");
        Ok(EffectChain::Audio(chain))
    }
}

/**
    Factory for video chains, parameterized by the stream's pixel format
    and dimensions.
*/
#[derive(Clone, Debug)]
pub struct VideoEffectFactory {
    info: VideoStreamInfo,
    registry: Arc<EffectRegistry>,
}

impl VideoEffectFactory {
    pub fn new(info: VideoStreamInfo) -> Self {
        Self::with_registry(info, Arc::new(EffectRegistry::with_builtins()))
    }

    pub fn with_registry(info: VideoStreamInfo, registry: Arc<EffectRegistry>) -> Self {
        Self { info, registry }
    }

    pub fn info(&self) -> &VideoStreamInfo {
        &self.info
    }
}

impl EffectFactory for VideoEffectFactory {
    fn create_effect(&self, definitions: &[EffectDefinition]) -> Result<EffectChain> {
        let mut stages = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let constructor = self
                .registry
                .video(definition.name.trim())
                .ok_or_else(|| Error::invalid_effect(&definition.name, "unknown video effect"))?;
            stages.push(constructor(definition, &self.info)?);
        }

        let chain = VideoChain::new(self.info, stages);
        debug!(stages = ?chain.names(), "video effect chain built");
        Ok(EffectChain::Video(chain))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::AudioEffect;
    use media_types::{
        AudioFrame, ChannelLayout, DecodedFrame, MediaKind, PixelFormat, Pts, Rational,
        SampleFormat, VideoFrame,
    };

    const TB: Rational = Rational { num: 1, den: 48000 };

    fn stereo() -> AudioStreamInfo {
        AudioStreamInfo::new(48000, ChannelLayout::Stereo, SampleFormat::F32p)
    }

    fn apply(chain: &mut EffectChain, values: &[f32]) -> Vec<f32> {
        let planes = [values.to_vec(), values.to_vec()];
        let frame = AudioFrame::from_f32_planes(&planes, 48000, Some(ChannelLayout::Stereo), TB)
            .with_pts(Some(Pts(960)));
        let DecodedFrame::Audio(out) = chain.apply(frame.into()).unwrap() else {
            panic!("expected audio");
        };
        assert_eq!(out.pts, Some(Pts(960)));
        out.to_f32_planes().unwrap().swap_remove(0)
    }

    fn defs(list: &[(&str, &str)]) -> Vec<EffectDefinition> {
        list.iter().map(|(n, p)| EffectDefinition::new(*n, *p)).collect()
    }

    #[test]
    fn chain_order_is_preserved() {
        let factory = AudioEffectFactory::new(stereo());
        let mut gain_then_clip = factory
            .create_effect(&defs(&[("volume", "2"), ("asoftclip", "type=hard:threshold=0.5")]))
            .unwrap();
        let mut clip_then_gain = factory
            .create_effect(&defs(&[("asoftclip", "type=hard:threshold=0.5"), ("volume", "2")]))
            .unwrap();

        assert_eq!(gain_then_clip.names(), vec!["volume", "asoftclip"]);
        assert_eq!(apply(&mut gain_then_clip, &[0.4]), vec![0.5]);
        assert_eq!(apply(&mut clip_then_gain, &[0.4]), vec![0.8]);
    }

    #[test]
    fn unknown_name_fails_construction() {
        let factory = AudioEffectFactory::new(stereo());
        let err = factory
            .create_effect(&defs(&[("volume", "0.5"), ("reverb", "")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEffect { ref name, .. } if name == "reverb"));
    }

    #[test]
    fn video_names_are_not_audio_effects() {
        let factory = AudioEffectFactory::new(stereo());
        assert!(factory.create_effect(&defs(&[("negate", "")])).is_err());
    }

    struct Counted(Arc<AtomicUsize>);

    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl AudioEffect for Counted {
        fn name(&self) -> &str {
            "counted"
        }

        fn process(&mut self, _planes: &mut [Vec<f32>]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_construction_releases_built_stages() {
        let live = Arc::new(AtomicUsize::new(0));
        let mut registry = EffectRegistry::with_builtins();
        let counter = Arc::clone(&live);
        registry.register_audio("counted", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Counted(Arc::clone(&counter))))
        });
        let factory = AudioEffectFactory::with_registry(stereo(), Arc::new(registry));

        for _ in 0..10 {
            let result = factory.create_effect(&defs(&[
                ("counted", ""),
                ("counted", ""),
                ("volume", "not-a-number"),
                ("counted", ""),
            ]));
            assert!(result.is_err());
            assert_eq!(live.load(Ordering::SeqCst), 0);
        }

        let chain = factory
            .create_effect(&defs(&[("counted", ""), ("counted", "")]))
            .unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 2);
        drop(chain);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_chain_passes_frames_through() {
        let info = AudioStreamInfo::new(48000, ChannelLayout::Mono, SampleFormat::S16);
        let mut chain = AudioEffectFactory::new(info).create_effect(&[]).unwrap();
        let layout = Some(ChannelLayout::Mono);
        let frame =
            AudioFrame::new(vec![vec![1, 2, 3, 4]], 2, 48000, layout, 1, SampleFormat::S16, TB);
        let DecodedFrame::Audio(out) = chain.apply(frame.into()).unwrap() else {
            panic!("expected audio");
        };
        assert_eq!(out.format, SampleFormat::S16);
        assert_eq!(out.planes, vec![vec![1, 2, 3, 4]]);
    }

    #[test]
    fn video_chain_runs_in_place() {
        let factory = VideoEffectFactory::new(VideoStreamInfo::new(2, 2, PixelFormat::Gray8));
        let mut chain = factory
            .create_effect(&defs(&[("hflip", ""), ("negate", "")]))
            .unwrap();
        assert_eq!(chain.kind(), MediaKind::Video);

        let tb = Rational::new(1, 25);
        let frame =
            VideoFrame::from_packed(&[0, 10, 20, 30], 2, 2, PixelFormat::Gray8, tb).unwrap();
        let DecodedFrame::Video(out) = chain.apply(frame.into()).unwrap() else {
            panic!("expected video");
        };
        assert_eq!(out.to_packed(), vec![245, 255, 225, 235]);
    }

    #[test]
    fn chain_rejects_frames_of_other_kind() {
        let factory = VideoEffectFactory::new(VideoStreamInfo::new(2, 2, PixelFormat::Gray8));
        let mut chain = factory.create_effect(&defs(&[("negate", "")])).unwrap();
        let frame = AudioFrame::from_f32_planes(&[vec![0.0]], 48000, None, TB);
        assert!(matches!(
            chain.apply(frame.into()),
            Err(Error::InvalidState { .. })
        ));
    }
}
