/*!
    Provider configuration.
*/

use serde::{Deserialize, Serialize};

use media_transform::{AudioTransformConfig, VideoTransformConfig};

/**
    Output format settings for a sample provider.

    Only the section matching the stream's kind is used.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub video: VideoTransformConfig,
    pub audio: AudioTransformConfig,
}

impl ProviderConfig {
    /**
        Create a config producing NV12 video and S16 audio.
    */
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, video: VideoTransformConfig) -> Self {
        self.video = video;
        self
    }

    pub fn with_audio(mut self, audio: AudioTransformConfig) -> Self {
        self.audio = audio;
        self
    }
}
