/*!
    Upstream packet sources.
*/

use std::collections::VecDeque;

use media_types::{Packet, Result};

/**
    Supplies compressed packets to a sample provider.

    This is the seam to the demultiplexer. `Ok(None)` means the stream
    has no more packets; errors are passed to the caller of the pull that
    asked for the packet.
*/
pub trait PacketSource: Send {
    fn next_packet(&mut self, stream_index: usize) -> Result<Option<Packet>>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn next_packet(&mut self, stream_index: usize) -> Result<Option<Packet>> {
        (**self).next_packet(stream_index)
    }
}

/**
    In-memory packet source.

    Packets are handed out in insertion order. A request for one stream
    skips over, but keeps, packets that belong to other streams.
*/
#[derive(Debug, Default)]
pub struct PacketQueue {
    packets: VecDeque<Packet>,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

impl FromIterator<Packet> for PacketQueue {
    fn from_iter<I: IntoIterator<Item = Packet>>(iter: I) -> Self {
        Self {
            packets: iter.into_iter().collect(),
        }
    }
}

impl Extend<Packet> for PacketQueue {
    fn extend<I: IntoIterator<Item = Packet>>(&mut self, iter: I) {
        self.packets.extend(iter);
    }
}

impl PacketSource for PacketQueue {
    fn next_packet(&mut self, stream_index: usize) -> Result<Option<Packet>> {
        let position = self
            .packets
            .iter()
            .position(|packet| packet.stream_index == stream_index);
        Ok(position.and_then(|i| self.packets.remove(i)))
    }
}

/**
    A packet source backed by a closure, see [`from_fn`].
*/
pub struct FromFn<F>(F);

/**
    Create a packet source that calls `f` for every packet request.
*/
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(usize) -> Result<Option<Packet>> + Send,
{
    FromFn(f)
}

impl<F> PacketSource for FromFn<F>
where
    F: FnMut(usize) -> Result<Option<Packet>> + Send,
{
    fn next_packet(&mut self, stream_index: usize) -> Result<Option<Packet>> {
        (self.0)(stream_index)
    }
}

impl<F> std::fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromFn").finish_non_exhaustive()
    }
}
