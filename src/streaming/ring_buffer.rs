//! Bounded interleaved sample ring between the emulation thread and playback
//!
//! The emulation thread writes delivered stereo frames, the playback thread
//! reads them. A full ring accepts fewer frames than offered, which is
//! exactly the backpressure the delivery adapter adapts to.

use crate::audio::AudioConsumer;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Largest ring we agree to allocate (256 MB of samples)
const MAX_CAPACITY: usize = 256 * 1024 * 1024 / std::mem::size_of::<i16>();

/// Ring buffer of interleaved `i16` samples
///
/// # Thread Safety
/// - One producer (the pipeline's audio consumer)
/// - One consumer (the playback device)
/// - Storage sits behind a `parking_lot::Mutex`; positions are atomics so
///   fill level can be polled without the lock
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Mutex<Vec<i16>>,
    /// Samples written since creation
    write_pos: AtomicUsize,
    /// Samples read since creation
    read_pos: AtomicUsize,
    /// Capacity in samples (power of two)
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a ring holding at least `frames` stereo frames.
    ///
    /// The sample capacity is rounded up to a power of two.
    pub fn new(frames: usize) -> Result<Self> {
        if frames == 0 {
            return Err(Error::InvalidConfig(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }

        let capacity = frames.saturating_mul(2).next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "Ring buffer capacity {capacity} exceeds maximum safe size {MAX_CAPACITY}"
            )));
        }

        Ok(RingBuffer {
            buffer: Mutex::new(vec![0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be read
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Samples that can be written right now
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read()
    }

    /// Fill level (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity as f32
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Write whole stereo frames; returns the frames accepted
    pub fn write_frames(&self, interleaved: &[i16], frames: usize) -> usize {
        let mut buf = self.buffer.lock();

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let free = self.capacity - write_pos.wrapping_sub(read_pos);

        let frames = frames.min(interleaved.len() / 2).min(free / 2);
        let to_write = frames * 2;
        if to_write == 0 {
            return 0;
        }

        let write_idx = write_pos & self.mask;
        if write_idx + to_write <= self.capacity {
            buf[write_idx..write_idx + to_write].copy_from_slice(&interleaved[..to_write]);
        } else {
            let first_part = self.capacity - write_idx;
            buf[write_idx..].copy_from_slice(&interleaved[..first_part]);
            buf[..to_write - first_part].copy_from_slice(&interleaved[first_part..to_write]);
        }
        drop(buf);

        self.write_pos
            .store(write_pos.wrapping_add(to_write), Ordering::Release);
        frames
    }

    /// Read samples into `dest`; returns the samples read
    pub fn read(&self, dest: &mut [i16]) -> usize {
        let buf = self.buffer.lock();

        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let to_read = dest.len().min(write_pos.wrapping_sub(read_pos));
        if to_read == 0 {
            return 0;
        }

        let read_idx = read_pos & self.mask;
        if read_idx + to_read <= self.capacity {
            dest[..to_read].copy_from_slice(&buf[read_idx..read_idx + to_read]);
        } else {
            let first_part = self.capacity - read_idx;
            dest[..first_part].copy_from_slice(&buf[read_idx..]);
            dest[first_part..to_read].copy_from_slice(&buf[..to_read - first_part]);
        }
        drop(buf);

        self.read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Discard everything waiting
    pub fn flush(&self) {
        let _buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }
}

impl AudioConsumer for RingBuffer {
    fn deliver_audio(&mut self, interleaved: &[i16], frames: usize) -> usize {
        self.write_frames(interleaved, frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let rb = RingBuffer::new(500).unwrap();
        assert_eq!(rb.capacity(), 1024);
        assert!(rb.is_empty());
    }

    #[test]
    fn test_write_and_read_frames() {
        let rb = RingBuffer::new(8).unwrap();
        assert_eq!(rb.write_frames(&[1, -1, 2, -2], 2), 2);
        assert_eq!(rb.available_read(), 4);

        let mut dest = [0i16; 4];
        assert_eq!(rb.read(&mut dest), 4);
        assert_eq!(dest, [1, -1, 2, -2]);
    }

    #[test]
    fn test_full_ring_accepts_partial_then_nothing() {
        let rb = RingBuffer::new(4).unwrap();
        let data = [7i16; 12];
        assert_eq!(rb.write_frames(&data, 6), 4);
        assert_eq!(rb.write_frames(&data, 6), 0);
        assert_eq!(rb.fill_percentage(), 1.0);
    }

    #[test]
    fn test_wrap_around() {
        let rb = RingBuffer::new(4).unwrap();
        rb.write_frames(&[1, 1, 2, 2, 3, 3], 3);
        let mut dest = [0i16; 4];
        rb.read(&mut dest);
        assert_eq!(rb.write_frames(&[4, 4, 5, 5, 6, 6], 3), 3);

        let mut rest = [0i16; 8];
        assert_eq!(rb.read(&mut rest), 8);
        assert_eq!(rest, [3, 3, 4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn test_consumer_backpressure() {
        let mut rb = RingBuffer::new(2).unwrap();
        let offered = [0i16; 10];
        assert_eq!(rb.deliver_audio(&offered, 5), 2);
        rb.flush();
        assert!(rb.is_empty());
        assert_eq!(rb.deliver_audio(&offered, 5), 2);
    }

    #[test]
    fn test_zero_capacity_error() {
        let err = RingBuffer::new(0).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_max_capacity_exceeded() {
        let err = RingBuffer::new(MAX_CAPACITY).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }
}
