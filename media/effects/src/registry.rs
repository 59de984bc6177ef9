/*!
    Named effect constructors.
*/

use std::collections::HashMap;
use std::sync::Arc;

use media_types::{AudioStreamInfo, Result, VideoStreamInfo};

use crate::audio::{Biquad, Echo, SoftClip, Volume};
use crate::video::{Equalizer, HFlip, Hue, Negate, Unsharp, VFlip};
use crate::{AudioEffect, EffectDefinition, VideoEffect};

/// Builds one audio stage from its definition and the stream parameters.
pub type AudioConstructor =
    dyn Fn(&EffectDefinition, &AudioStreamInfo) -> Result<Box<dyn AudioEffect>> + Send + Sync;

/// Builds one video stage from its definition and the stream parameters.
pub type VideoConstructor =
    dyn Fn(&EffectDefinition, &VideoStreamInfo) -> Result<Box<dyn VideoEffect>> + Send + Sync;

/**
    Registry mapping effect names to constructors.

    Audio and video names live in separate namespaces. Registering a name
    that already exists replaces the previous constructor, so built-ins can
    be overridden.
*/
#[derive(Clone)]
pub struct EffectRegistry {
    audio: HashMap<String, Arc<AudioConstructor>>,
    video: HashMap<String, Arc<VideoConstructor>>,
}

impl EffectRegistry {
    /**
        An empty registry.
    */
    pub fn empty() -> Self {
        Self {
            audio: HashMap::new(),
            video: HashMap::new(),
        }
    }

    /**
        A registry holding every built-in effect.
    */
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin_effects();
        registry
    }

    pub fn register_audio(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn(&EffectDefinition, &AudioStreamInfo) -> Result<Box<dyn AudioEffect>>
            + Send
            + Sync
            + 'static,
    ) {
        self.audio.insert(name.into(), Arc::new(constructor));
    }

    pub fn register_video(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn(&EffectDefinition, &VideoStreamInfo) -> Result<Box<dyn VideoEffect>>
            + Send
            + Sync
            + 'static,
    ) {
        self.video.insert(name.into(), Arc::new(constructor));
    }

    pub fn audio(&self, name: &str) -> Option<&Arc<AudioConstructor>> {
        self.audio.get(name)
    }

    pub fn video(&self, name: &str) -> Option<&Arc<VideoConstructor>> {
        self.video.get(name)
    }

    /**
        Registered audio effect names, sorted.
    */
    pub fn audio_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.audio.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /**
        Registered video effect names, sorted.
    */
    pub fn video_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.video.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn register_builtin_effects(&mut self) {
        self.register_audio("volume", Volume::build);
        self.register_audio("asoftclip", SoftClip::build);
        self.register_audio("aecho", Echo::build);
        self.register_audio("lowpass", Biquad::build_lowpass);
        self.register_audio("highpass", Biquad::build_highpass);

        self.register_video("negate", Negate::build);
        self.register_video("hflip", HFlip::build);
        self.register_video("vflip", VFlip::build);
        self.register_video("eq", Equalizer::build);
        self.register_video("hue", Hue::build);
        self.register_video("unsharp", Unsharp::build);
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("audio", &self.audio_names())
            .field("video", &self.video_names())
            .finish()
    }
}

static_assertions::assert_impl_all!(EffectRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = EffectRegistry::with_builtins();
        assert_eq!(
            registry.audio_names(),
            vec!["aecho", "asoftclip", "highpass", "lowpass", "volume"]
        );
        assert_eq!(
            registry.video_names(),
            vec!["eq", "hflip", "hue", "negate", "unsharp", "vflip"]
        );
        assert!(registry.audio("negate").is_none());
    }

    #[test]
    fn custom_effects_can_replace_builtins() {
        let mut registry = EffectRegistry::with_builtins();
        registry.register_audio("volume", |_, _| Ok(Box::new(Volume::new(0.0))));
        let constructor = registry.audio("volume").unwrap();
        let info = AudioStreamInfo::new(
            48000,
            media_types::ChannelLayout::Mono,
            media_types::SampleFormat::S16,
        );
        let mut effect = constructor(&EffectDefinition::new("volume", "2"), &info).unwrap();
        let mut planes = vec![vec![1.0]];
        effect.process(&mut planes).unwrap();
        assert_eq!(planes[0][0], 0.0);
    }
}
