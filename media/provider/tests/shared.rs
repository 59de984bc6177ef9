use std::thread;
use std::time::Duration;

use media_effects::EffectDefinition;
use media_provider::{
    PacketQueue, ProviderConfig, ProviderState, SampleProvider, SharedSampleProvider,
};
use media_types::{CodecId, Packet, PixelFormat, Pts, Rational, StreamDescriptor, VideoStreamInfo};

const TB: Rational = Rational { num: 1, den: 30 };

fn shared(frames: i64) -> SharedSampleProvider {
    let info = VideoStreamInfo::new(4, 4, PixelFormat::Gray8);
    let stream = StreamDescriptor::video(0, CodecId::RawVideo, TB, info).unwrap();
    let source: PacketQueue = (0..frames)
        .map(|i| Packet::new(vec![i as u8; 16], 0, Some(Pts(i)), TB))
        .collect();
    let decoder = media_decode::open(stream).unwrap();
    let provider = SampleProvider::new(decoder, Box::new(source), ProviderConfig::new());
    let provider = SharedSampleProvider::new(provider);
    provider.allocate().unwrap();
    provider
}

#[tokio::test]
async fn async_pulls_run_to_end_of_stream() {
    let provider = shared(10);
    let mut count = 0;
    while let Some(sample) = provider.next_sample_async().await.unwrap() {
        assert_eq!(sample.data[0], count as u8);
        count += 1;
    }
    assert_eq!(count, 10);
    assert_eq!(provider.state(), ProviderState::Drained);
}

#[tokio::test]
async fn timed_out_async_pull_keeps_its_sample() {
    let provider = shared(5);

    // The pull cannot start while the lock is held, so the timeout fires first
    let guard = provider.lock();
    let pull = tokio::time::timeout(Duration::from_millis(20), provider.next_sample_async()).await;
    assert!(pull.is_err());
    drop(guard);

    let mut values = Vec::new();
    while let Some(sample) = provider.next_sample_async().await.unwrap() {
        values.push(sample.data[0]);
    }
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn chain_swaps_from_another_thread_are_serialized() {
    let provider = shared(200);
    let swapper = provider.clone();
    let handle = thread::spawn(move || {
        for i in 0..50 {
            if i % 2 == 0 {
                swapper.set_effects(&[EffectDefinition::new("negate", "")]).unwrap();
            } else {
                swapper.disable_effects();
            }
        }
    });

    let mut samples = Vec::new();
    while let Some(sample) = provider.next_sample_async().await.unwrap() {
        samples.push(sample);
    }
    handle.join().unwrap();

    assert_eq!(samples.len(), 200);
    for (i, sample) in samples.iter().enumerate() {
        // Each luma plane is either untouched or fully negated, never mixed
        let value = i as u8;
        let luma = &sample.data[..16];
        assert!(luma.iter().all(|&b| b == value) || luma.iter().all(|&b| b == 255 - value));
    }
}

#[test]
fn close_through_any_handle_closes_the_provider() {
    let provider = shared(3);
    let other = provider.clone();
    assert!(provider.get_next_sample().unwrap().is_some());

    other.close();
    assert_eq!(provider.state(), ProviderState::Closed);
    assert!(provider.get_next_sample().is_err());
    provider.close();
}
