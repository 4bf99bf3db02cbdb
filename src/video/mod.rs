//! Video frame store and host video sink

use crate::timing::{VIDEO_HEIGHT, VIDEO_PITCH, VIDEO_WIDTH};

/// One RGB565 pixel
pub type Pixel = u16;

/// Host video sink
pub trait VideoSink {
    /// Present a frame. `None` asks the host to redisplay the previous one.
    ///
    /// `pitch_bytes` is the row stride in bytes.
    fn deliver_video(
        &mut self,
        frame: Option<&[Pixel]>,
        width: usize,
        height: usize,
        pitch_bytes: usize,
    );
}

impl<F> VideoSink for F
where
    F: FnMut(Option<&[Pixel]>, usize, usize, usize),
{
    fn deliver_video(
        &mut self,
        frame: Option<&[Pixel]>,
        width: usize,
        height: usize,
        pitch_bytes: usize,
    ) {
        self(frame, width, height, pitch_bytes)
    }
}

/// Sink that discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVideoSink;

impl VideoSink for NullVideoSink {
    fn deliver_video(
        &mut self,
        _frame: Option<&[Pixel]>,
        _width: usize,
        _height: usize,
        _pitch_bytes: usize,
    ) {
    }
}

/// Frame buffer the core renders into; keeps the last frame for redisplay
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pixels: Vec<Pixel>,
    width: usize,
    height: usize,
    pitch: usize,
}

impl VideoFrame {
    /// Buffer with the native geometry
    pub fn new() -> Self {
        Self::with_geometry(VIDEO_WIDTH, VIDEO_HEIGHT, VIDEO_PITCH)
    }

    /// Buffer with custom geometry (`pitch` in pixels, >= `width`)
    pub fn with_geometry(width: usize, height: usize, pitch: usize) -> Self {
        let pitch = pitch.max(width);
        VideoFrame {
            pixels: vec![0; pitch * height],
            width,
            height,
            pitch,
        }
    }

    /// Visible width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Visible height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row length in pixels
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Row length in bytes
    pub fn pitch_bytes(&self) -> usize {
        self.pitch * std::mem::size_of::<Pixel>()
    }

    /// Pixels
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Mutable pixels for the core
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    /// Present the stored frame
    pub fn present<V: VideoSink + ?Sized>(&self, sink: &mut V) {
        sink.deliver_video(Some(&self.pixels), self.width, self.height, self.pitch_bytes());
    }

    /// Ask the host to redisplay whatever it showed last
    pub fn present_duplicate<V: VideoSink + ?Sized>(&self, sink: &mut V) {
        sink.deliver_video(None, self.width, self.height, self.pitch_bytes());
    }
}

impl Default for VideoFrame {
    fn default() -> Self {
        Self::new()
    }
}
