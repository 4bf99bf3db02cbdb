//! Frontend hooks other than audio and video

/// Frontend option key the effective resampler is written back under
pub const RESAMPLER_OPTION_KEY: &str = "audio_resampler";

/// Timing/geometry the frontend needs to configure its outputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvInfo {
    /// Video frames per second
    pub fps: f64,
    /// Audio sample rate actually delivered
    pub sample_rate: f64,
    /// Visible width
    pub base_width: usize,
    /// Visible height
    pub base_height: usize,
}

/// Notifications from the pipeline to the frontend.
///
/// Every method has a no-op default.
pub trait HostNotifier {
    /// Show a message to the user for roughly `frames` video frames
    fn show_message(&mut self, _text: &str, _frames: u32) {}

    /// Persist an option value for future sessions; returns false if unsupported
    fn set_option(&mut self, _key: &str, _value: &str) -> bool {
        false
    }

    /// Output timing changed (new resampler rate, speed mode)
    fn av_info_changed(&mut self, _info: &AvInfo) {}
}

/// Notifier that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl HostNotifier for NullNotifier {}

/// Notifier that records every call, for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    /// Messages shown
    pub messages: Vec<String>,
    /// Options written back
    pub options: Vec<(String, String)>,
    /// A/V info updates
    pub av_updates: Vec<AvInfo>,
}

impl HostNotifier for RecordingNotifier {
    fn show_message(&mut self, text: &str, _frames: u32) {
        self.messages.push(text.to_string());
    }

    fn set_option(&mut self, key: &str, value: &str) -> bool {
        self.options.push((key.to_string(), value.to_string()));
        true
    }

    fn av_info_changed(&mut self, info: &AvInfo) {
        self.av_updates.push(*info);
    }
}

impl<N: HostNotifier + ?Sized> HostNotifier for &mut N {
    fn show_message(&mut self, text: &str, frames: u32) {
        (**self).show_message(text, frames)
    }

    fn set_option(&mut self, key: &str, value: &str) -> bool {
        (**self).set_option(key, value)
    }

    fn av_info_changed(&mut self, info: &AvInfo) {
        (**self).av_info_changed(info)
    }
}
