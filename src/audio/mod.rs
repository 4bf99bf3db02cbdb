//! Converted-sample storage and host delivery
//!
//! [`OutputBuffer`] collects the resampler's output over one tick;
//! [`DeliveryAdapter`] then pushes it to the host's [`AudioConsumer`].

pub mod delivery;
pub mod output_buffer;

pub use delivery::{
    AudioConsumer, DeliveryAdapter, DeliveryReport, DeliveryStats, DEFAULT_MAX_ACCEPTED_FRAMES,
};
pub use output_buffer::OutputBuffer;
