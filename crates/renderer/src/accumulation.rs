//! Progressive accumulation lifecycle
//!
//! Tracks the state of an accumulation target independently of where the
//! sum lives (GL framebuffer or CPU buffer). The target holds the running
//! sum of `sample_count` estimates; display divides by the count.

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationState {
    Uninitialized,
    /// Allocated and zeroed (or pending zeroing), no samples yet
    Ready,
    /// Holds the sum of this many estimates
    Accumulating(u32),
}

/// Result of a clear request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOutcome {
    /// Target dimensions changed and storage must be reallocated
    pub resized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Accumulation {
    width: u32,
    height: u32,
    sample_count: u32,
    pending_clear: bool,
    initialized: bool,
}

impl Accumulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate for the given target size; the first pass zeroes the target
    pub fn initialize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.sample_count = 0;
        self.pending_clear = true;
        self.initialized = true;
    }

    /// Discard accumulated samples, reporting whether the size changed
    ///
    /// On an uninitialized accumulation this is equivalent to `initialize`.
    pub fn clear(&mut self, width: u32, height: u32) -> ClearOutcome {
        let resized = !self.initialized || width != self.width || height != self.height;
        self.initialize(width, height);
        ClearOutcome { resized }
    }

    /// Drop accumulated samples without touching the target size
    pub fn restart(&mut self) {
        if self.initialized {
            self.sample_count = 0;
            self.pending_clear = true;
        }
    }

    /// Texel count of the target, widened before multiplying
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Start a pass; returns true when the target must be zeroed first
    pub fn begin_pass(&mut self) -> bool {
        std::mem::take(&mut self.pending_clear)
    }

    /// Record one more estimate in the target
    pub fn finish_pass(&mut self) {
        self.sample_count = self.sample_count.saturating_add(1);
    }

    pub fn state(&self) -> AccumulationState {
        match (self.initialized, self.sample_count) {
            (false, _) => AccumulationState::Uninitialized,
            (true, 0) => AccumulationState::Ready,
            (true, k) => AccumulationState::Accumulating(k),
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Factor applied to the sum at display time
    pub fn display_scale(&self) -> f32 {
        if self.sample_count == 0 {
            0.0
        } else {
            1.0 / self.sample_count as f32
        }
    }
}

/// Quantize one averaged channel for 8-bit display
pub fn to_display_byte(sum: f32, scale: f32) -> u8 {
    ((sum * scale).clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut acc = Accumulation::new();
        assert_eq!(acc.state(), AccumulationState::Uninitialized);

        acc.initialize(800, 600);
        assert_eq!(acc.state(), AccumulationState::Ready);
        assert!(acc.begin_pass());
        acc.finish_pass();
        assert_eq!(acc.state(), AccumulationState::Accumulating(1));

        assert!(!acc.begin_pass());
        acc.finish_pass();
        assert_eq!(acc.state(), AccumulationState::Accumulating(2));
        assert_eq!(acc.display_scale(), 0.5);
    }

    #[test]
    fn test_clear_resets_and_reports_resize() {
        let mut acc = Accumulation::new();
        acc.initialize(800, 600);
        acc.begin_pass();
        acc.finish_pass();

        let same = acc.clear(800, 600);
        assert!(!same.resized);
        assert_eq!(acc.state(), AccumulationState::Ready);
        assert!(acc.begin_pass());

        let bigger = acc.clear(1024, 768);
        assert!(bigger.resized);
        assert_eq!(acc.size(), (1024, 768));
    }

    #[test]
    fn test_display_byte_clamps() {
        assert_eq!(to_display_byte(3.0, 0.5), 255);
        assert_eq!(to_display_byte(1.0, 0.5), 128);
        assert_eq!(to_display_byte(-1.0, 1.0), 0);
    }

    #[test]
    fn test_restart_keeps_size() {
        let mut acc = Accumulation::new();
        acc.restart();
        assert_eq!(acc.state(), AccumulationState::Uninitialized);

        acc.initialize(320, 200);
        acc.begin_pass();
        acc.finish_pass();
        acc.finish_pass();
        acc.restart();
        assert_eq!(acc.state(), AccumulationState::Ready);
        assert_eq!(acc.size(), (320, 200));
        assert!(acc.begin_pass());
    }

    #[test]
    fn test_pixel_count_does_not_wrap() {
        let mut acc = Accumulation::new();
        acc.initialize(70_000, 70_000);
        assert_eq!(acc.pixel_count(), 4_900_000_000);
        assert_eq!(acc.pixel_count() * 3, 14_700_000_000);
    }

    #[test]
    fn test_clear_before_initialize_allocates() {
        let mut acc = Accumulation::new();
        assert!(acc.clear(4, 4).resized);
        assert!(acc.is_initialized());
        assert_eq!(acc.display_scale(), 0.0);
    }
}
