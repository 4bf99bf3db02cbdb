//! Offline capture of the delivered audio

pub mod wav;

pub use wav::WavRecorder;
