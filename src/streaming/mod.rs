//! Host-side playback plumbing
//!
//! [`RingBuffer`] is a ready-made [`crate::AudioConsumer`] with natural
//! backpressure. With the `streaming` feature, [`AudioDevice`] plays it on the
//! system output.

pub mod ring_buffer;

#[cfg(feature = "streaming")]
pub mod audio_device;

pub use ring_buffer::RingBuffer;

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;

/// Default ring size in frames (about a quarter second at 32 kHz)
pub const DEFAULT_RING_FRAMES: usize = 8192;
