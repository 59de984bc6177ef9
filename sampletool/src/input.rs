/*!
    Splitting raw elementary stream files into packets.
*/

use anyhow::{Result, bail};

use media_types::{CodecId, Packet, Pts, SampleFormat, StreamDescriptor, StreamParams};

/**
    The PCM codec that stores samples in `format`.
*/
pub fn pcm_codec(format: SampleFormat) -> Result<CodecId> {
    Ok(match format {
        SampleFormat::U8 => CodecId::PcmU8,
        SampleFormat::S16 => CodecId::PcmS16Le,
        SampleFormat::S32 => CodecId::PcmS32Le,
        SampleFormat::F32 => CodecId::PcmF32Le,
        other => bail!("no PCM codec stores {other} samples"),
    })
}

/**
    Cut `data` into packets for `stream`.

    Video gets one packet per frame with the frame index as timestamp.
    Audio gets packets of `samples_per_packet` sample frames, timestamped
    in samples. A trailing partial packet is kept so the decoder can
    reject it.
*/
pub fn packetize(
    stream: &StreamDescriptor,
    data: &[u8],
    samples_per_packet: usize,
) -> Result<Vec<Packet>> {
    let (chunk, per_packet) = match &stream.params {
        StreamParams::Video(info) => match info.frame_size() {
            Some(size) => (size, 1),
            None => bail!("{}x{} frames do not fit in memory", info.width, info.height),
        },
        StreamParams::Audio(info) => {
            if samples_per_packet == 0 {
                bail!("packets must hold at least one sample");
            }
            let Some(chunk) = info.block_align().checked_mul(samples_per_packet) else {
                bail!("{samples_per_packet} samples per packet do not fit in memory");
            };
            (chunk, samples_per_packet as i64)
        }
    };
    if chunk == 0 {
        bail!("stream parameters give empty packets");
    }

    Ok(data
        .chunks(chunk)
        .enumerate()
        .map(|(i, bytes)| {
            let pts = Pts((i as i64).saturating_mul(per_packet));
            Packet::new(bytes.to_vec(), stream.index, Some(pts), stream.time_base)
        })
        .collect())
}
