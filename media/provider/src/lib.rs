/*!
    Sample providers: the per-stream pipeline from compressed packets to
    consumer-ready output samples.

    A [`SampleProvider`] owns one stream's decoder and pulls packets from a
    [`PacketSource`]. Each call to [`SampleProvider::get_next_sample`]
    decodes until a frame completes, runs it through the attached effect
    chain, converts it to the configured output layout and returns an
    [`OutputSample`].

    # Example

    ```ignore
    use media_provider::{PacketQueue, ProviderConfig, SampleProvider};

    let decoder = media_decode::open(stream)?;
    let mut provider = SampleProvider::new(decoder, Box::new(packets), ProviderConfig::new());
    provider.allocate()?;
    provider.set_effects(&[EffectDefinition::new("hflip", "")])?;

    while let Some(sample) = provider.get_next_sample()? {
        surface.present(sample.timestamp, &sample.data);
    }
    ```

    # Errors

    Corrupt packets are logged and skipped. `ResourceExhausted` and
    `FormatChanged` move the provider to [`ProviderState::Failed`]; other
    errors only fail the pull that hit them.
*/

pub use media_types::{Error, Result};

mod config;
mod provider;
mod sample;
mod shared;
mod source;

pub use config::ProviderConfig;
pub use provider::{ProviderState, SampleProvider};
pub use sample::OutputSample;
pub use shared::SharedSampleProvider;
pub use source::{FromFn, PacketQueue, PacketSource, from_fn};
