use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use media_effects::EffectDefinition;
use media_provider::ProviderConfig;

/**
    Contents of a `--config` file.

    ```json
    {
        "video": { "target_format": "yuv420p", "algorithm": "bilinear" },
        "audio": { "sample_format": "f32", "channel_layout": "stereo" },
        "effects": [{ "name": "volume", "params": "-6dB" }]
    }
    ```

    Every section is optional.
*/
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    pub effects: Vec<EffectDefinition>,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_types::{PixelFormat, SampleFormat};

    #[test]
    fn parses_all_sections() {
        let config: JobConfig = serde_json::from_str(
            r#"{
                "video": { "target_format": "yuv420p" },
                "audio": { "sample_format": "f32" },
                "effects": [{ "name": "hflip" }, { "name": "eq", "params": "contrast=1.2" }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.provider.video.target_format, PixelFormat::Yuv420p);
        assert_eq!(config.provider.audio.sample_format, SampleFormat::F32);
        assert_eq!(
            config.effects,
            vec![EffectDefinition::new("hflip", ""), EffectDefinition::new("eq", "contrast=1.2")]
        );
    }

    #[test]
    fn empty_object_is_the_default() {
        let config: JobConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider, ProviderConfig::default());
        assert!(config.effects.is_empty());
    }
}
