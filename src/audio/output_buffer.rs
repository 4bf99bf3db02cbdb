//! Growable holding area for converted samples
//!
//! Capacity is counted in stereo frames. The store only ever grows, a growth
//! copies the written prefix verbatim, and growth is the single reallocation
//! point: nothing outside [`OutputBuffer::push`] and
//! [`OutputBuffer::reserve_tail`] touches the allocation.

use crate::resampler::{Resampler, StereoFrame};
use crate::{Error, Result};

/// Output sample store
#[derive(Debug)]
pub struct OutputBuffer {
    /// Backing store; `store.len()` is the capacity
    store: Vec<StereoFrame>,
    /// Frames written since the last clear
    write_cursor: usize,
    /// Number of reallocations performed
    growth_count: u64,
    /// Largest capacity a growth may reach
    growth_limit: Option<usize>,
}

impl OutputBuffer {
    /// Create a buffer holding `capacity` frames
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(OutputBuffer {
            store: allocate(capacity)?,
            write_cursor: 0,
            growth_count: 0,
            growth_limit: None,
        })
    }

    /// Cap the capacity growth may reach
    pub fn with_growth_limit(mut self, limit: Option<usize>) -> Self {
        self.set_growth_limit(limit);
        self
    }

    /// Change the growth cap; the current store is kept even if larger
    pub fn set_growth_limit(&mut self, limit: Option<usize>) {
        self.growth_limit = limit;
    }

    /// Initial buffer for one video frame of output at `output_rate`.
    ///
    /// Twice the per-frame need: the core produces brief bursts well above
    /// the average.
    pub fn for_output_rate(output_rate: f64, refresh_rate: f64) -> Result<Self> {
        Self::with_capacity(Self::initial_capacity(output_rate, refresh_rate))
    }

    /// Frames [`Self::for_output_rate`] starts with
    pub fn initial_capacity(output_rate: f64, refresh_rate: f64) -> usize {
        let per_frame = (output_rate / refresh_rate) as usize + 1;
        per_frame * 2
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Frames written
    pub fn len(&self) -> usize {
        self.write_cursor
    }

    /// True when nothing is written
    pub fn is_empty(&self) -> bool {
        self.write_cursor == 0
    }

    /// Free frames before a growth is needed
    pub fn free(&self) -> usize {
        self.store.len() - self.write_cursor
    }

    /// Reallocations performed since construction
    pub fn growth_count(&self) -> u64 {
        self.growth_count
    }

    /// Append frames, growing if needed
    pub fn push(&mut self, samples: &[StereoFrame]) -> Result<()> {
        let tail = self.reserve_tail(samples.len())?;
        tail.copy_from_slice(samples);
        self.commit(samples.len());
        Ok(())
    }

    /// Make room for `count` frames and return the writable tail.
    ///
    /// The frames are not counted as written until [`Self::commit`].
    pub fn reserve_tail(&mut self, count: usize) -> Result<&mut [StereoFrame]> {
        if self.free() < count {
            self.grow(count - self.free())?;
        }
        let start = self.write_cursor;
        Ok(&mut self.store[start..start + count])
    }

    /// Grow until at least `frames` fit; never shrinks
    pub fn ensure_capacity(&mut self, frames: usize) -> Result<()> {
        if frames > self.store.len() {
            self.grow(frames - self.store.len())?;
        }
        Ok(())
    }

    /// Mark `count` reserved frames as written
    pub fn commit(&mut self, count: usize) {
        debug_assert!(count <= self.free());
        self.write_cursor = (self.write_cursor + count).min(self.store.len());
    }

    /// Move everything the resampler has finished into the buffer
    pub fn fill_from(&mut self, resampler: &mut Resampler) -> Result<usize> {
        let count = resampler.available();
        if count == 0 {
            return Ok(0);
        }
        let tail = self.reserve_tail(count)?;
        resampler.read(tail);
        self.commit(count);
        Ok(count)
    }

    /// Written frames `[0, write_cursor)`
    pub fn drain(&self) -> &[StereoFrame] {
        &self.store[..self.write_cursor]
    }

    /// Reset the write cursor; capacity is kept
    pub fn clear(&mut self) {
        self.write_cursor = 0;
    }

    fn grow(&mut self, deficit: usize) -> Result<()> {
        let old = self.store.len();
        let base = old.saturating_add(deficit.saturating_mul(2));
        let new_capacity = base.saturating_add(base.div_ceil(2));
        if self.growth_limit.is_some_and(|limit| new_capacity > limit) {
            return Err(Error::BufferGrowth {
                frames: new_capacity,
            });
        }

        let mut store = allocate(new_capacity)?;
        store[..self.write_cursor].copy_from_slice(&self.store[..self.write_cursor]);
        self.store = store;
        self.growth_count += 1;

        tracing::debug!(
            from = old,
            to = new_capacity,
            deficit,
            "output buffer grown"
        );
        Ok(())
    }
}

fn allocate(frames: usize) -> Result<Vec<StereoFrame>> {
    let mut store = Vec::new();
    store
        .try_reserve_exact(frames)
        .map_err(|_| Error::BufferGrowth { frames })?;
    store.resize(frames, [0, 0]);
    Ok(store)
}
