use std::time::Duration;

use media_effects::EffectDefinition;
use media_provider::{OutputSample, PacketQueue, ProviderConfig, SampleProvider};
use media_transform::AudioTransformConfig;
use media_types::{
    AudioStreamInfo, ChannelLayout, CodecId, Packet, Pts, Rational, SampleFormat, StreamDescriptor,
};

const RATE: u32 = 48000;
const TB: Rational = Rational { num: 1, den: 48000 };

fn stream(layout: ChannelLayout) -> StreamDescriptor {
    let info = AudioStreamInfo::new(RATE, layout, SampleFormat::S16);
    StreamDescriptor::audio(0, CodecId::PcmS16Le, TB, info).unwrap()
}

/// Interleaved S16 packets of `samples` frames with a repeating ramp.
fn packets(channels: usize, samples: usize, count: usize) -> Vec<Packet> {
    (0..count)
        .map(|n| {
            let data = (0..samples * channels)
                .flat_map(|i| (((i + n * 7) % 200) as i16 * 100 - 10000).to_le_bytes())
                .collect();
            Packet::new(data, 0, Some(Pts((n * samples) as i64)), TB)
        })
        .collect()
}

fn open(layout: ChannelLayout, packets: Vec<Packet>, config: ProviderConfig) -> SampleProvider {
    let decoder = media_decode::open(stream(layout)).unwrap();
    let source: PacketQueue = packets.into_iter().collect();
    let mut provider = SampleProvider::new(decoder, Box::new(source), config);
    provider.allocate().unwrap();
    provider
}

fn drain(provider: &mut SampleProvider) -> Vec<OutputSample> {
    std::iter::from_fn(|| provider.get_next_sample().unwrap()).collect()
}

#[test]
fn downmix_output_sizes_are_exact() {
    let s16 = ProviderConfig::new().with_audio(AudioTransformConfig::stereo());
    let f32 = ProviderConfig::new()
        .with_audio(AudioTransformConfig::stereo().with_sample_format(SampleFormat::F32));

    let sample = open(ChannelLayout::Surround51, packets(6, 1024, 1), s16)
        .get_next_sample()
        .unwrap()
        .unwrap();
    assert_eq!(sample.len(), 1024 * 2 * 2);

    let sample = open(ChannelLayout::Surround51, packets(6, 1024, 1), f32)
        .get_next_sample()
        .unwrap()
        .unwrap();
    assert_eq!(sample.len(), 1024 * 2 * 4);
}

#[test]
fn sample_timing_follows_the_stream() {
    let mut provider = open(ChannelLayout::Stereo, packets(2, 480, 5), ProviderConfig::new());
    let samples = drain(&mut provider);

    assert_eq!(samples.len(), 5);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.timestamp, Duration::from_millis(10 * i as u64));
        assert_eq!(sample.duration, Duration::from_millis(10));
        assert!(sample.interlace.is_none());
    }
}

#[test]
fn detached_chain_matches_never_attached() {
    let input = packets(2, 256, 6);
    let plain = drain(&mut open(ChannelLayout::Stereo, input.clone(), ProviderConfig::new()));

    let mut provider = open(ChannelLayout::Stereo, input.clone(), ProviderConfig::new());
    provider
        .set_effects(&[EffectDefinition::new("aecho", "0.6:0.3:2:0.5")])
        .unwrap();
    provider.set_effect_chain(None).unwrap();
    assert_eq!(drain(&mut provider), plain);

    let mut provider = open(ChannelLayout::Stereo, input, ProviderConfig::new());
    provider
        .set_effects(&[EffectDefinition::new("aecho", "0.6:0.3:2:0.5")])
        .unwrap();
    let echoed: Vec<_> = (0..2)
        .map(|_| provider.get_next_sample().unwrap().unwrap())
        .collect();
    provider.disable_effects();
    let rest = drain(&mut provider);

    assert_ne!(echoed[0].data, plain[0].data);
    assert_eq!(echoed[1].timestamp, plain[1].timestamp);
    assert_eq!(rest, plain[2..]);
}

#[test]
fn corrupt_audio_packet_is_skipped() {
    let mut input = packets(2, 128, 3);
    input[1].data.pop();
    let mut provider = open(ChannelLayout::Stereo, input, ProviderConfig::new());

    let samples = drain(&mut provider);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].pts, Some(Pts(0)));
    assert_eq!(samples[1].pts, Some(Pts(256)));
}

#[test]
fn muted_chain_silences_output() {
    let mut provider = open(ChannelLayout::Stereo, packets(2, 64, 2), ProviderConfig::new());
    provider
        .set_effects(&[EffectDefinition::new("volume", "0")])
        .unwrap();
    for sample in drain(&mut provider) {
        assert!(sample.data.iter().all(|&b| b == 0));
    }
}
