// ============================================================================
// TRANSFORM OPERATIONS — whole-image scale, rotate, flip, invert
// ============================================================================
//
// Every operation records an undo snapshot before it changes the project.
// Long operations (scale, rotate) build their result off to the side with
// progress callbacks every `progress_interval` rows; on cancel the partial
// result is dropped and both the canvas and the history stay as they were.

use log::{debug, info};

use crate::canvas::{Bitmap, rotated_size};
use crate::error::{EngineError, Result};
use crate::ops::fill::FillStats;
use crate::project::Project;
use crate::view::{Progress, View};

/// How a long-running transform ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Cancelled,
}

/// Largest angle accepted by `rotate_image`, either direction.
pub const MAX_ROTATE_ANGLE: f64 = 359.99;

/// Per-row hook shared by the long transforms: every `interval` rows the
/// view gets an incremental redraw and the progress sink may cancel.
fn row_tick(y: i32, interval: i32, view: &mut dyn View, progress: &mut dyn Progress) -> bool {
    if y % interval != 0 {
        return false;
    }
    view.request_redraw(false);
    progress.update((y / interval) as usize)
}

fn check_size(project: &Project, width: i32, height: i32) -> Result<()> {
    let limit = project.settings().max_image_size;
    if width > limit || height > limit {
        return Err(EngineError::TooLarge { width, height, limit });
    }
    Ok(())
}

fn finish(project: &mut Project, description: &str, bmp: Bitmap, view: &mut dyn View) {
    project.push_undo(description);
    project.replace_canvas(bmp);
    view.reset_view();
    view.request_redraw(true);
}

// ---------------------------------------------------------------------------
//  Long-running transforms
// ---------------------------------------------------------------------------

/// Resample the image to `width × height` with the gamma bilinear kernel.
/// `wrap` samples across opposite edges (for seamless tiles).
pub fn scale_image(
    project: &mut Project,
    view: &mut dyn View,
    progress: &mut dyn Progress,
    width: i32,
    height: i32,
    wrap: bool,
) -> Result<Outcome> {
    if width < 1 || height < 1 {
        return Err(EngineError::invalid_op(
            format!("scale={width}x{height}"),
            "width and height must be at least 1",
        ));
    }
    check_size(project, width, height)?;

    let settings = project.settings().clone();
    let interval = settings.progress_interval.max(1);
    let mut dest = Bitmap::with_overscroll(width, height, settings.overscroll, &settings.style);

    debug!("transform: scale {:?} -> {}x{} (wrap: {})", project.image_size(), width, height, wrap);
    progress.begin((height / interval) as usize + 1);
    let completed = project
        .bmp()
        .scale_with(&mut dest, wrap, |y| row_tick(y, interval, view, progress));
    progress.end();

    if !completed {
        info!("transform: scale cancelled");
        view.request_redraw(true);
        return Ok(Outcome::Cancelled);
    }

    finish(project, "Scale Image", dest, view);
    Ok(Outcome::Applied)
}

/// Rotate the image by `angle` degrees (clockwise) and scale it uniformly.
/// The new image is sized to bound the result; with `tile` the empty
/// corners are filled by wrapping the source instead of left transparent.
pub fn rotate_image(
    project: &mut Project,
    view: &mut dyn View,
    progress: &mut dyn Progress,
    angle: f64,
    scale: f64,
    tile: bool,
) -> Result<Outcome> {
    let settings = project.settings().clone();
    let angle = angle.clamp(-MAX_ROTATE_ANGLE, MAX_ROTATE_ANGLE);
    let scale = scale.clamp(settings.min_rotate_scale, settings.max_rotate_scale);

    let (cw, ch) = project.image_size();
    let (width, height) = rotated_size(cw, ch, angle, scale);
    check_size(project, width, height)?;

    let interval = settings.progress_interval.max(1);
    debug!("transform: rotate {angle}° at {scale}x -> {width}x{height} (tile: {tile})");
    progress.begin((height / interval) as usize + 1);
    let rotated = project.bmp().rotate_with(
        angle,
        scale,
        settings.overscroll,
        tile,
        &settings.style,
        |y| row_tick(y, interval, view, progress),
    );
    progress.end();

    let Some(dest) = rotated else {
        info!("transform: rotate cancelled");
        view.request_redraw(true);
        return Ok(Outcome::Cancelled);
    };

    finish(project, "Rotate Image", dest, view);
    Ok(Outcome::Applied)
}

// ---------------------------------------------------------------------------
//  Instant transforms
// ---------------------------------------------------------------------------

/// Mirror left↔right.
pub fn mirror_image(project: &mut Project, view: &mut dyn View) {
    project.push_undo("Flip Horizontal");
    project.bmp_mut().flip_horizontal();
    view.request_redraw(true);
}

/// Flip top↔bottom.
pub fn flip_image(project: &mut Project, view: &mut dyn View) {
    project.push_undo("Flip Vertical");
    project.bmp_mut().flip_vertical();
    view.request_redraw(true);
}

/// Rotate 90° (swaps width and height).
pub fn rotate_image_90(project: &mut Project, view: &mut dyn View, clockwise: bool) {
    project.push_undo(if clockwise { "Rotate 90° CW" } else { "Rotate 90° CCW" });
    let rotated = project.bmp().rotated90(clockwise);
    project.replace_canvas(rotated);
    view.reset_view();
    view.request_redraw(true);
}

pub fn rotate_image_180(project: &mut Project, view: &mut dyn View) {
    project.push_undo("Rotate 180°");
    project.bmp_mut().rotate180();
    view.request_redraw(true);
}

/// Invert the colours of the image area.
pub fn invert_image(project: &mut Project, view: &mut dyn View) {
    project.push_undo("Invert Colors");
    project.bmp_mut().invert_clip();
    view.request_redraw(true);
}

/// Flood fill seeded at image coordinates `(x, y)`, comparing against the
/// seed's current colour.
pub fn fill_image(
    project: &mut Project,
    view: &mut dyn View,
    x: i32,
    y: i32,
    color: u32,
    tolerance: i32,
) -> FillStats {
    let os = project.bmp().overscroll;
    let (x, y) = (x + os, y + os);
    if !project.bmp().clip().contains(x, y) {
        return FillStats::default();
    }
    let capacity = project.settings().fill_stack_capacity;
    let old = project.bmp().getpixel(x, y);
    if old == color {
        return FillStats::default();
    }
    project.push_undo("Fill");
    let stats = project.bmp_mut().fill_with_capacity(x, y, color, old, tolerance, capacity);
    view.request_redraw(true);
    stats
}
