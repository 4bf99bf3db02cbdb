//! Delivery into a rate-limited audio consumer
//!
//! The host accepts an unpredictable number of frames per call. The adapter
//! never asks for more than the host has proven it takes, and never waits on
//! a host that takes nothing: the emulation thread's forward progress wins
//! over audio completeness.

use crate::resampler::StereoFrame;

/// Default per-call request cap before the consumer under-delivers
pub const DEFAULT_MAX_ACCEPTED_FRAMES: usize = 1 << 16;

/// Host audio sink
pub trait AudioConsumer {
    /// Offer `frames` interleaved stereo frames; returns how many were taken
    /// (`0..=frames`).
    fn deliver_audio(&mut self, interleaved: &[i16], frames: usize) -> usize;
}

impl<F> AudioConsumer for F
where
    F: FnMut(&[i16], usize) -> usize,
{
    fn deliver_audio(&mut self, interleaved: &[i16], frames: usize) -> usize {
        self(interleaved, frames)
    }
}

/// Outcome of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Frames the consumer accepted
    pub delivered: usize,
    /// Frames discarded after the consumer stalled
    pub dropped: usize,
    /// Consumer calls made
    pub calls: usize,
}

/// Session totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Frames accepted
    pub delivered: u64,
    /// Frames dropped on zero acceptance
    pub dropped: u64,
    /// Drains cut short by a zero acceptance
    pub stalls: u64,
    /// Times the request cap was lowered
    pub ratchets: u64,
}

/// Drains the output buffer into the host consumer
#[derive(Debug)]
pub struct DeliveryAdapter {
    max_accepted_frames: usize,
    stats: DeliveryStats,
}

impl DeliveryAdapter {
    /// New adapter with the generous default cap
    pub fn new() -> Self {
        DeliveryAdapter {
            max_accepted_frames: DEFAULT_MAX_ACCEPTED_FRAMES,
            stats: DeliveryStats::default(),
        }
    }

    /// Current per-call request cap
    pub fn max_accepted_frames(&self) -> usize {
        self.max_accepted_frames
    }

    /// Session totals
    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// Offer every frame of `frames` to `consumer`.
    ///
    /// A partial acceptance lowers the cap for the rest of the session; a zero
    /// acceptance ends the drain and the remainder is dropped.
    pub fn deliver<C>(&mut self, frames: &[StereoFrame], consumer: &mut C) -> DeliveryReport
    where
        C: AudioConsumer + ?Sized,
    {
        let mut report = DeliveryReport::default();
        let mut remaining = frames;

        while !remaining.is_empty() {
            let request = remaining.len().min(self.max_accepted_frames);
            let chunk = &remaining[..request];
            let accepted = consumer
                .deliver_audio(chunk.as_flattened(), request)
                .min(request);
            report.calls += 1;

            if accepted == 0 {
                report.dropped = remaining.len();
                self.stats.stalls += 1;
                tracing::debug!(dropped = report.dropped, "audio consumer stalled");
                break;
            }

            if accepted < request {
                self.max_accepted_frames = accepted;
                self.stats.ratchets += 1;
                tracing::debug!(cap = accepted, "audio request cap lowered");
            }

            report.delivered += accepted;
            remaining = &remaining[accepted..];
        }

        self.stats.delivered += report.delivered as u64;
        self.stats.dropped += report.dropped as u64;
        report
    }
}

impl Default for DeliveryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeliveryAdapter {
    fn drop(&mut self) {
        tracing::debug!(
            delivered = self.stats.delivered,
            dropped = self.stats.dropped,
            stalls = self.stats.stalls,
            "audio delivery finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_acceptance_single_call() {
        let mut adapter = DeliveryAdapter::new();
        let frames = vec![[1i16, 2]; 500];
        let mut seen = Vec::new();
        let mut consumer = |s: &[i16], n: usize| {
            assert_eq!(s.len(), n * 2);
            seen.push(n);
            n
        };
        let report = adapter.deliver(&frames, &mut consumer);
        assert_eq!(report.delivered, 500);
        assert_eq!(report.calls, 1);
        assert_eq!(seen, vec![500]);
    }

    #[test]
    fn test_ratchet_caps_later_requests() {
        let mut adapter = DeliveryAdapter::new();
        let mut requests = Vec::new();
        let mut consumer = |_: &[i16], n: usize| {
            requests.push(n);
            n.min(100)
        };

        let report = adapter.deliver(&vec![[0i16; 2]; 200], &mut consumer);
        assert_eq!(report.delivered, 200);
        assert_eq!(adapter.max_accepted_frames(), 100);

        adapter.deliver(&vec![[0i16; 2]; 350], &mut consumer);
        assert_eq!(requests[0], 200);
        assert!(requests[1..].iter().all(|&n| n <= 100), "{requests:?}");
    }

    #[test]
    fn test_zero_acceptance_drops_remainder() {
        let mut adapter = DeliveryAdapter::new();
        let mut calls = 0;
        let mut consumer = |_: &[i16], n: usize| {
            calls += 1;
            if calls == 1 {
                n.min(30)
            } else {
                0
            }
        };
        let report = adapter.deliver(&vec![[0i16; 2]; 100], &mut consumer);
        assert_eq!(report.delivered, 30);
        assert_eq!(report.dropped, 70);
        assert_eq!(report.calls, 2);
        assert_eq!(adapter.stats().stalls, 1);
    }

    #[test]
    fn test_over_reporting_consumer_is_clamped() {
        let mut adapter = DeliveryAdapter::new();
        let mut consumer = |_: &[i16], n: usize| n + 10;
        let report = adapter.deliver(&vec![[0i16; 2]; 40], &mut consumer);
        assert_eq!(report.delivered, 40);
        assert_eq!(adapter.max_accepted_frames(), DEFAULT_MAX_ACCEPTED_FRAMES);
    }

    #[test]
    fn test_cap_never_rises() {
        let mut adapter = DeliveryAdapter::new();
        let mut limit = 100;
        let mut consumer = |_: &[i16], n: usize| n.min(limit);
        adapter.deliver(&vec![[0i16; 2]; 300], &mut consumer);
        assert_eq!(adapter.max_accepted_frames(), 100);

        limit = 50;
        let mut consumer = |_: &[i16], n: usize| n.min(limit);
        adapter.deliver(&vec![[0i16; 2]; 300], &mut consumer);
        assert_eq!(adapter.max_accepted_frames(), 50);

        let mut generous = |_: &[i16], n: usize| n;
        adapter.deliver(&vec![[0i16; 2]; 300], &mut generous);
        assert_eq!(adapter.max_accepted_frames(), 50);
    }

    #[test]
    fn test_empty_buffer_makes_no_calls() {
        let mut adapter = DeliveryAdapter::new();
        let mut consumer = |_: &[i16], _: usize| -> usize { panic!("no call expected") };
        let report = adapter.deliver(&[], &mut consumer);
        assert_eq!(report, DeliveryReport::default());
    }
}
