//! WAV recording of the delivered stream

use crate::audio::AudioConsumer;
use crate::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Audio consumer writing everything it accepts to a 16-bit stereo WAV file
///
/// # Examples
///
/// ```no_run
/// use retro_avsync::export::WavRecorder;
/// use retro_avsync::AudioConsumer;
///
/// # fn main() -> retro_avsync::Result<()> {
/// let mut wav = WavRecorder::create("out.wav", 32_000)?;
/// wav.deliver_audio(&[0, 0, 100, -100], 2);
/// wav.finalize()?;
/// # Ok(())
/// # }
/// ```
pub struct WavRecorder {
    writer: Option<WavWriter<BufWriter<File>>>,
    frames_written: u64,
    /// First write error; the recorder refuses further audio after one
    error: Option<String>,
}

impl WavRecorder {
    /// Create the file at `path`
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path.as_ref(), spec)
            .map_err(|e| Error::AudioFileError(format!("Failed to create WAV file: {e}")))?;

        Ok(WavRecorder {
            writer: Some(writer),
            frames_written: 0,
            error: None,
        })
    }

    /// Stereo frames recorded so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush the header and close the file; returns the frames recorded
    pub fn finalize(mut self) -> Result<u64> {
        if let Some(err) = self.error.take() {
            return Err(Error::AudioFileError(err));
        }
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| Error::AudioFileError(format!("Failed to finalize WAV file: {e}")))?;
        }
        Ok(self.frames_written)
    }

    fn write(&mut self, interleaved: &[i16]) -> std::result::Result<(), hound::Error> {
        if let Some(writer) = self.writer.as_mut() {
            for &sample in interleaved {
                writer.write_sample(sample)?;
            }
        }
        Ok(())
    }
}

impl AudioConsumer for WavRecorder {
    fn deliver_audio(&mut self, interleaved: &[i16], frames: usize) -> usize {
        if self.error.is_some() || self.writer.is_none() {
            return 0;
        }
        let frames = frames.min(interleaved.len() / 2);
        match self.write(&interleaved[..frames * 2]) {
            Ok(()) => {
                self.frames_written += frames as u64;
                frames
            }
            Err(e) => {
                tracing::error!(error = %e, "WAV write failed; recording stopped");
                self.error = Some(format!("Failed to write sample: {e}"));
                0
            }
        }
    }
}
