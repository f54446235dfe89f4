// ============================================================================
// VIEW / PROGRESS — the display collaborators the core calls back into
// ============================================================================

use log::{debug, info};

/// Display surface. Called after mutations; implementations must not call
/// back into the project while handling these.
pub trait View {
    /// `full` asks for a complete repaint instead of an incremental one.
    fn request_redraw(&mut self, full: bool);

    /// Re-centre and reset zoom after the canvas changed size.
    fn reset_view(&mut self) {}

    /// Keep the scroll offset valid for a canvas of `w × h`.
    fn clamp_offset(&mut self, _w: i32, _h: i32) {}

    /// Rectangle of interest in image coordinates, e.g. the knife selection
    /// for a size readout.
    fn show_region(&mut self, _x: i32, _y: i32, _w: i32, _h: i32) {}
}

/// Long-operation reporting with cooperative cancellation.
pub trait Progress {
    fn begin(&mut self, total_steps: usize);

    /// Returns `true` to cancel.
    fn update(&mut self, step: usize) -> bool;

    fn end(&mut self);
}

/// Headless view that only counts what it was asked to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullView {
    pub redraws: usize,
    pub full_redraws: usize,
    pub resets: usize,
    /// Last rectangle passed to `show_region`.
    pub region: Option<(i32, i32, i32, i32)>,
}

impl View for NullView {
    fn request_redraw(&mut self, full: bool) {
        self.redraws += 1;
        if full {
            self.full_redraws += 1;
        }
    }

    fn reset_view(&mut self) {
        self.resets += 1;
    }

    fn show_region(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.region = Some((x, y, w, h));
    }
}

/// Progress sink that logs percentages and never cancels.
#[derive(Debug, Default)]
pub struct LogProgress {
    total: usize,
    last_percent: Option<usize>,
}

impl Progress for LogProgress {
    fn begin(&mut self, total_steps: usize) {
        self.total = total_steps.max(1);
        self.last_percent = None;
        debug!("progress: {} steps", self.total);
    }

    fn update(&mut self, step: usize) -> bool {
        let percent = (step * 100 / self.total).min(100);
        if self.last_percent.is_none_or(|p| percent >= p + 10) {
            info!("progress: {percent}%");
            self.last_percent = Some(percent);
        }
        false
    }

    fn end(&mut self) {
        debug!("progress: done");
    }
}

/// Progress that cancels once `step` reaches a threshold.
#[derive(Clone, Copy, Debug)]
pub struct CancelAt {
    pub step: usize,
    pub updates: usize,
}

impl CancelAt {
    pub fn new(step: usize) -> Self {
        Self { step, updates: 0 }
    }
}

impl Progress for CancelAt {
    fn begin(&mut self, _total_steps: usize) {}

    fn update(&mut self, step: usize) -> bool {
        self.updates += 1;
        step >= self.step
    }

    fn end(&mut self) {}
}
