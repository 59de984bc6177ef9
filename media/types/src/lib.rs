/*!
    Shared types for the sample production pipeline.

    This crate defines the vocabulary of the media crates: the types that
    cross crate boundaries between the decoders, the format converters, the
    effect chains and the sample provider. It has no native dependencies,
    so consumers can depend on it without pulling in codec bindings.

    # Core Types

    - [`Rational`] - Rational numbers for time bases
    - [`Pts`] and [`MediaDuration`] - Timestamps in time_base units
    - [`VideoFrame`], [`AudioFrame`] and [`DecodedFrame`] - Decoded frame data
    - [`Packet`] - Encoded packet data

    # Format Types

    - [`PixelFormat`] and [`PlaneLayout`] - Video pixel formats and plane geometry
    - [`SampleFormat`] - Audio sample formats
    - [`ChannelLayout`] and [`Channel`] - Audio channel layouts
    - [`CodecId`] and [`MediaKind`] - Codec identifiers

    # Stream Information

    - [`StreamDescriptor`] - Immutable per-stream metadata
    - [`VideoStreamInfo`] and [`AudioStreamInfo`] - Kind-specific parameters

    # Error Handling

    - [`Error`] and [`Result`] - Common error types
*/

mod codec;
mod error;
mod format;
mod frame;
mod packet;
mod rational;
pub mod sample;
mod stream;
mod timestamp;

pub use codec::{CodecId, MediaKind};
pub use error::{Error, Result};
pub use format::{Channel, ChannelLayout, PixelFormat, PlaneLayout, SampleFormat};
pub use frame::{AudioFrame, DecodedFrame, Plane, VideoFrame};
pub use packet::Packet;
pub use rational::Rational;
pub use stream::{AudioStreamInfo, FieldOrder, StreamDescriptor, StreamParams, VideoStreamInfo};
pub use timestamp::{MediaDuration, Pts};
