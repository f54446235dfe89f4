// ============================================================================
// TOOL / BRUSH STATE — what the active tool hands to per-pixel compositing
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;
use crate::canvas::Bitmap;

/// Reflection applied to clone-source reads, about the clone anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MirrorMode {
    #[default]
    None,
    /// Left↔Right (reflect x about the anchor column)
    Horizontal,
    /// Top↔Bottom (reflect y about the anchor row)
    Vertical,
    /// Both axes
    Both,
}

impl MirrorMode {
    /// Cycle to the next mode.
    pub fn next(self) -> Self {
        match self {
            MirrorMode::None => MirrorMode::Horizontal,
            MirrorMode::Horizontal => MirrorMode::Vertical,
            MirrorMode::Vertical => MirrorMode::Both,
            MirrorMode::Both => MirrorMode::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != MirrorMode::None
    }

    /// Reflect `(x, y)` about `anchor` according to the mode.
    #[inline]
    pub fn reflect(self, x: i32, y: i32, anchor: (i32, i32)) -> (i32, i32) {
        match self {
            MirrorMode::None => (x, y),
            MirrorMode::Horizontal => (anchor.0 * 2 - x, y),
            MirrorMode::Vertical => (x, anchor.1 * 2 - y),
            MirrorMode::Both => (anchor.0 * 2 - x, anchor.1 * 2 - y),
        }
    }
}

/// How the destination's existing alpha scales a stroke's transparency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaMask {
    #[default]
    Off,
    /// Paint follows existing opacity.
    Respect,
    /// Paint follows existing transparency.
    Invert,
}

/// Bounding box of the stroke in progress (exclusive on all four sides when
/// tested against clone reads).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StrokeRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl StrokeRect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn contains_strict(&self, x: i32, y: i32) -> bool {
        x > self.x1 && x < self.x2 && y > self.y1 && y < self.y2
    }
}

/// Clone-stamp addressing. Read-only from the canvas' point of view.
#[derive(Clone, Copy, Debug, Default)]
pub struct CloneState<'a> {
    pub active: bool,
    /// Wrap writes (and clone reads) toroidally inside the clip rectangle.
    /// Applies whether or not cloning is active.
    pub wrap: bool,
    /// Anchor the mirror reflects about.
    pub anchor: (i32, i32),
    /// Displacement between the painted point and the sampled point.
    pub dx: i32,
    pub dy: i32,
    pub mirror: MirrorMode,
    /// Extent of the stroke being painted.
    pub stroke: StrokeRect,
    /// Pre-stroke copy of the `stroke` interior. Reads that land strictly
    /// inside `stroke` come from here so the source does not smear while it
    /// is painted over.
    pub snapshot: Option<&'a Bitmap>,
}

/// Everything the brush/tool layer supplies to `Bitmap::setpixel` and
/// `Bitmap::draw_brush`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaintContext<'a> {
    pub blend: BlendMode,
    /// Brush-global transparency, 0 = opaque.
    pub trans: i32,
    pub alpha_mask: AlphaMask,
    pub clone: CloneState<'a>,
}

impl<'a> PaintContext<'a> {
    pub fn new(blend: BlendMode) -> Self {
        Self { blend, ..Default::default() }
    }

    pub fn with_trans(mut self, trans: i32) -> Self {
        self.trans = trans.clamp(0, 255);
        self
    }

    pub fn with_alpha_mask(mut self, mask: AlphaMask) -> Self {
        self.alpha_mask = mask;
        self
    }

    pub fn with_clone(mut self, clone: CloneState<'a>) -> Self {
        self.clone = clone;
        self
    }
}
