/*!
    The per-stream decode, effect, convert and emit cycle.
*/

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use media_decode::Decoder;
use media_effects::{
    AudioEffectFactory, EffectChain, EffectDefinition, EffectFactory, EffectRegistry,
    VideoEffectFactory,
};
use media_transform::Converter;
use media_types::{DecodedFrame, Error, FieldOrder, Result, StreamDescriptor, StreamParams};

use crate::{OutputSample, PacketSource, ProviderConfig};

/**
    Lifecycle state of a [`SampleProvider`].

    `Decoding`, `Converting` and `Emitting` are only held during a pull; a
    provider seen from outside is `Ready` between pulls.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderState {
    Uninitialized,
    Ready,
    Decoding,
    Converting,
    Emitting,
    /// All packets were decoded and every frame was emitted.
    Drained,
    /// A fatal error occurred; the provider can only be closed.
    Failed,
    Closed,
}

/**
    Keeps emitted timestamps non-decreasing.
*/
#[derive(Clone, Copy, Debug, Default)]
struct TimestampGuard {
    last: Option<Duration>,
    next: Duration,
}

impl TimestampGuard {
    /**
        Stamp a sample. A missing timestamp continues from the end of the
        previous sample; one earlier than the previous sample is clamped.
    */
    fn stamp(&mut self, raw: Option<Duration>, duration: Duration) -> Duration {
        let raw = raw.unwrap_or(self.next);
        let timestamp = match self.last {
            Some(last) if raw < last => {
                debug!(?raw, ?last, "timestamp regression clamped");
                last
            }
            _ => raw,
        };
        self.last = Some(timestamp);
        self.next = timestamp.saturating_add(duration);
        timestamp
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/**
    Drives one elementary stream from compressed packets to output samples.

    A provider owns its decoder, its packet source, the converter built by
    [`SampleProvider::allocate`] and an optional effect chain. Samples are
    pulled one at a time with [`SampleProvider::get_next_sample`]; each
    call blocks until a frame has been decoded, processed and converted,
    or the stream has ended.

    Effect chains can be attached and detached between pulls. Since every
    operation takes `&mut self`, attachment never overlaps a pull; use
    [`SharedSampleProvider`](crate::SharedSampleProvider) to share a
    provider between threads.
*/
pub struct SampleProvider {
    stream: StreamDescriptor,
    config: ProviderConfig,
    decoder: Box<dyn Decoder>,
    source: Box<dyn PacketSource>,
    factory: Box<dyn EffectFactory>,
    converter: Option<Converter>,
    chain: Option<EffectChain>,
    state: ProviderState,
    allocation_failed: bool,
    input_exhausted: bool,
    timestamps: TimestampGuard,
}

impl SampleProvider {
    /**
        Create a provider for the decoder's stream, using the built-in
        effects.

        Nothing is allocated until [`SampleProvider::allocate`] is called.
    */
    pub fn new(
        decoder: Box<dyn Decoder>,
        source: Box<dyn PacketSource>,
        config: ProviderConfig,
    ) -> Self {
        Self::with_registry(decoder, source, config, Arc::new(EffectRegistry::with_builtins()))
    }

    /**
        Create a provider whose effect chains are built from `registry`.
    */
    pub fn with_registry(
        decoder: Box<dyn Decoder>,
        source: Box<dyn PacketSource>,
        config: ProviderConfig,
        registry: Arc<EffectRegistry>,
    ) -> Self {
        let stream = decoder.stream().clone();
        let factory: Box<dyn EffectFactory> = match &stream.params {
            StreamParams::Video(info) => {
                Box::new(VideoEffectFactory::with_registry(*info, registry))
            }
            StreamParams::Audio(info) => {
                Box::new(AudioEffectFactory::with_registry(*info, registry))
            }
        };

        Self {
            stream,
            config,
            decoder,
            source,
            factory,
            converter: None,
            chain: None,
            state: ProviderState::Uninitialized,
            allocation_failed: false,
            input_exhausted: false,
            timestamps: TimestampGuard::default(),
        }
    }

    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    /**
        The attached effect chain, if any.
    */
    pub fn effect_chain(&self) -> Option<&EffectChain> {
        self.chain.as_ref()
    }

    /**
        Build the converter and its scratch buffers.

        Allocation happens once. If it fails the provider stays
        `Uninitialized` and every later call to `allocate` is rejected
        with `InvalidState`.
    */
    pub fn allocate(&mut self) -> Result<()> {
        if self.state != ProviderState::Uninitialized || self.allocation_failed {
            return Err(Error::invalid_state(format!(
                "cannot allocate a provider in state {:?}{}",
                self.state,
                if self.allocation_failed { " after a failed allocation" } else { "" }
            )));
        }

        match Converter::new(&self.stream, self.config.video, self.config.audio) {
            Ok(converter) => {
                debug!(
                    stream = self.stream.index,
                    kind = %self.stream.kind(),
                    "sample provider allocated"
                );
                self.converter = Some(converter);
                self.state = ProviderState::Ready;
                Ok(())
            }
            Err(e) => {
                error!(stream = self.stream.index, error = %e, "sample provider allocation failed");
                self.allocation_failed = true;
                Err(e)
            }
        }
    }

    /**
        Pull the next output sample.

        Returns `Ok(None)` once the stream is drained. Corrupt packets are
        logged and skipped. Any other error is returned for this pull
        only, unless it is fatal, in which case the provider moves to
        `Failed`.
    */
    pub fn get_next_sample(&mut self) -> Result<Option<OutputSample>> {
        match self.state {
            ProviderState::Ready => {}
            ProviderState::Drained => return Ok(None),
            state => {
                return Err(Error::invalid_state(format!("cannot pull samples in state {state:?}")));
            }
        }

        self.state = ProviderState::Decoding;
        let frame = match self.decode_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!(stream = self.stream.index, "stream drained");
                self.state = ProviderState::Drained;
                return Ok(None);
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.state = ProviderState::Converting;
        match self.convert(frame) {
            Ok(sample) => {
                self.state = ProviderState::Emitting;
                trace!(
                    stream = self.stream.index,
                    timestamp = ?sample.timestamp,
                    bytes = sample.len(),
                    "sample emitted"
                );
                self.state = ProviderState::Ready;
                Ok(Some(sample))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /**
        Replace the effect chain, or detach it with `None`.

        The chain must match the stream's kind. The previous chain is
        dropped, releasing its stages.
    */
    pub fn set_effect_chain(&mut self, chain: Option<EffectChain>) -> Result<()> {
        if self.state == ProviderState::Closed {
            return Err(Error::invalid_state("provider is closed"));
        }
        if let Some(chain) = &chain
            && chain.kind() != self.stream.kind()
        {
            return Err(Error::invalid_state(format!(
                "cannot attach a {} effect chain to a {} stream",
                chain.kind(),
                self.stream.kind()
            )));
        }

        match &chain {
            Some(chain) => debug!(
                stream = self.stream.index,
                stages = ?chain.names(),
                "effect chain attached"
            ),
            None if self.chain.is_some() => {
                debug!(stream = self.stream.index, "effect chain detached")
            }
            None => {}
        }
        self.chain = chain;
        Ok(())
    }

    /**
        Build a chain from `definitions` and attach it.

        If any definition is rejected the current chain stays attached.
    */
    pub fn set_effects(&mut self, definitions: &[EffectDefinition]) -> Result<()> {
        if self.state == ProviderState::Closed {
            return Err(Error::invalid_state("provider is closed"));
        }
        let chain = self.factory.create_effect(definitions)?;
        self.set_effect_chain(Some(chain))
    }

    pub fn disable_effects(&mut self) {
        if self.chain.take().is_some() {
            debug!(stream = self.stream.index, "effect chain detached");
        }
    }

    /**
        Drop decoder and effect state after a discontinuity such as a seek.

        The packet source is not touched; the caller repositions it. A
        drained provider becomes `Ready` again.
    */
    pub fn flush(&mut self) {
        if matches!(self.state, ProviderState::Closed | ProviderState::Failed) {
            return;
        }
        self.decoder.reset();
        if let Some(chain) = &mut self.chain {
            chain.reset();
        }
        self.input_exhausted = false;
        self.timestamps.reset();
        if self.state == ProviderState::Drained {
            self.state = ProviderState::Ready;
        }
        debug!(stream = self.stream.index, "sample provider flushed");
    }

    /**
        Release the converter and any attached chain.

        Closing twice is a no-op. Dropping the provider closes it.
    */
    pub fn close(&mut self) {
        if self.state == ProviderState::Closed {
            return;
        }
        self.converter = None;
        self.chain = None;
        self.decoder.reset();
        self.state = ProviderState::Closed;
        debug!(stream = self.stream.index, "sample provider closed");
    }

    fn fail(&mut self, e: Error) -> Error {
        if e.is_fatal() {
            error!(stream = self.stream.index, error = %e, "sample provider failed");
            self.state = ProviderState::Failed;
        } else {
            self.state = ProviderState::Ready;
        }
        e
    }

    fn decode_next(&mut self) -> Result<Option<DecodedFrame>> {
        loop {
            match self.decoder.receive_frame() {
                Ok(Some(frame)) => return Ok(Some(frame)),
                Ok(None) if self.input_exhausted => return Ok(None),
                Ok(None) => {}
                Err(e) if e.is_decode_error() => {
                    warn!(stream = self.stream.index, error = %e, "skipping undecodable frame");
                    continue;
                }
                Err(e) => return Err(e),
            }

            match self.source.next_packet(self.stream.index)? {
                Some(packet) => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        if !e.is_decode_error() {
                            return Err(e);
                        }
                        warn!(
                            stream = self.stream.index,
                            pts = ?packet.pts,
                            error = %e,
                            "skipping corrupt packet"
                        );
                    }
                }
                None => {
                    debug!(stream = self.stream.index, "end of input, draining decoder");
                    self.input_exhausted = true;
                    self.decoder.send_eof()?;
                }
            }
        }
    }

    fn convert(&mut self, frame: DecodedFrame) -> Result<OutputSample> {
        let pts = frame.timestamp();
        let time_base = frame.time_base();
        let (interlace, duration) = match &frame {
            DecodedFrame::Video(video) => {
                let interlace = video.interlaced.then_some(if video.top_field_first {
                    FieldOrder::TopFirst
                } else {
                    FieldOrder::BottomFirst
                });
                let duration = if video.duration.0 > 0 {
                    video.duration.to_duration(time_base)
                } else {
                    self.stream
                        .video_info()
                        .and_then(|info| info.frame_rate)
                        .filter(|rate| rate.num > 0 && rate.den > 0)
                        .map(|rate| {
                            Duration::from_secs_f64(f64::from(rate.den) / f64::from(rate.num))
                        })
                        .unwrap_or_default()
                };
                (interlace, duration)
            }
            DecodedFrame::Audio(audio) => (None, audio.duration()),
        };

        let frame = match &mut self.chain {
            Some(chain) => chain.apply(frame)?,
            None => frame,
        };

        let converter = self
            .converter
            .as_mut()
            .ok_or_else(|| Error::invalid_state("converter is not allocated"))?;
        let data = Bytes::copy_from_slice(converter.convert(&frame)?);
        drop(frame);

        let timestamp = self
            .timestamps
            .stamp(pts.map(|pts| pts.to_duration(time_base)), duration);

        Ok(OutputSample {
            kind: self.stream.kind(),
            data,
            timestamp,
            pts,
            duration,
            interlace,
        })
    }
}

impl Drop for SampleProvider {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SampleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleProvider")
            .field("stream", &self.stream.index)
            .field("kind", &self.stream.kind())
            .field("state", &self.state)
            .field("effects", &self.chain)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(SampleProvider: Send);
