/*!
    Audio and video effect chains for the sample production pipeline.

    An effect chain is an ordered list of processing stages built from
    [`EffectDefinition`]s. Each definition names a registered effect and
    carries an option string in FFmpeg filter syntax. Chains are built by
    an [`EffectFactory`] that captured the stream's parameters, so stages
    can size their state up front.

    # Example

    ```ignore
    use media_effects::{AudioEffectFactory, EffectDefinition, EffectFactory};

    let factory = AudioEffectFactory::new(stream_info);
    let mut chain = factory.create_effect(&[
        EffectDefinition::new("volume", "-3dB"),
        EffectDefinition::new("aecho", "0.8:0.9:500:0.3"),
    ])?;

    let processed = chain.apply(decoded_frame)?;
    ```

    # Built-in Effects

    | Audio | Video |
    |-------|-------|
    | `volume` | `negate` |
    | `asoftclip` | `hflip` |
    | `aecho` | `vflip` |
    | `lowpass` | `eq` |
    | `highpass` | `hue` |
    | | `unsharp` |

    Further effects can be added through [`EffectRegistry::register_audio`]
    and [`EffectRegistry::register_video`].
*/

pub use media_types::{Error, Result};

mod audio;
mod chain;
mod definition;
mod factory;
mod registry;
mod stage;
mod video;

pub use chain::{AudioChain, EffectChain, VideoChain};
pub use definition::{EffectDefinition, EffectOptions};
pub use factory::{AudioEffectFactory, EffectFactory, VideoEffectFactory};
pub use registry::{AudioConstructor, EffectRegistry, VideoConstructor};
pub use stage::{AudioEffect, VideoEffect};
