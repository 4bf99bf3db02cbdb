//! Live playback of the delivered stream through rodio

use super::RingBuffer;
use crate::{Error, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Samples pulled from the ring per lock
const READ_BATCH: usize = 2048;

/// rodio source reading interleaved stereo from the ring
struct RingBufferSource {
    ring_buffer: Arc<RingBuffer>,
    sample_rate: u32,
    finished: Arc<AtomicBool>,
    /// Batch read from the ring
    buffer: Vec<i16>,
    buffer_pos: usize,
    buffer_len: usize,
}

impl RingBufferSource {
    fn new(ring_buffer: Arc<RingBuffer>, sample_rate: u32, finished: Arc<AtomicBool>) -> Self {
        RingBufferSource {
            ring_buffer,
            sample_rate,
            finished,
            buffer: vec![0; READ_BATCH],
            buffer_pos: 0,
            buffer_len: 0,
        }
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(READ_BATCH)
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.buffer_pos >= self.buffer_len {
            let read = self.ring_buffer.read(&mut self.buffer);
            if read > 0 {
                self.buffer_len = read;
            } else {
                // Underrun: keep the stream alive with silence
                self.buffer.fill(0);
                self.buffer_len = self.buffer.len();
            }
            self.buffer_pos = 0;
        }

        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

/// System audio output fed from a [`RingBuffer`]
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default device and start playing `ring_buffer` at `sample_rate`
    pub fn new(sample_rate: u32, ring_buffer: Arc<RingBuffer>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| Error::AudioDeviceError(format!("Failed to create audio stream: {e}")))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| Error::AudioDeviceError(format!("Failed to create audio sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring_buffer,
            sample_rate,
            Arc::clone(&finished),
        ));
        tracing::info!(sample_rate, "audio device opened");

        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Stop pulling from the ring; the source ends on its next sample
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(frames: usize) -> (RingBufferSource, Arc<RingBuffer>, Arc<AtomicBool>) {
        let ring = Arc::new(RingBuffer::new(frames).unwrap());
        let finished = Arc::new(AtomicBool::new(false));
        let src = RingBufferSource::new(Arc::clone(&ring), 32_000, Arc::clone(&finished));
        (src, ring, finished)
    }

    #[test]
    fn test_source_reports_stereo() {
        let (src, _, _) = source(64);
        assert_eq!(src.channels(), 2);
        assert_eq!(src.sample_rate(), 32_000);
    }

    #[test]
    fn test_source_plays_ring_then_silence() {
        let (mut src, ring, _) = source(64);
        ring.write_frames(&[5, -5], 1);
        assert_eq!(src.next(), Some(5));
        assert_eq!(src.next(), Some(-5));
        assert_eq!(src.next(), Some(0));
    }

    #[test]
    fn test_source_ends_after_finish() {
        let (mut src, _, finished) = source(64);
        assert!(src.next().is_some());
        finished.store(true, Ordering::Relaxed);
        assert_eq!(src.next(), None);
    }

    #[test]
    fn test_device_when_backend_available() {
        let ring = Arc::new(RingBuffer::new(4096).unwrap());
        match AudioDevice::new(32_000, ring) {
            Ok(device) => {
                device.pause();
                device.play();
            }
            Err(err) => eprintln!("Skipping audio device test (backend unavailable): {err}"),
        }
    }
}
