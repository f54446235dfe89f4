// ============================================================================
// CANVAS — flat packed-colour bitmap with a clip rectangle
// ============================================================================
//
// `Bitmap<S>` is generic over its pixel store the way `image::ImageBuffer` is
// generic over its container:
//   * `Bitmap`            (= `Bitmap<Vec<u32>>`)   owns its pixels
//   * `BitmapView<'a>`    (= `Bitmap<&'a mut [u32]>`) borrows caller storage
// A view can never free or reallocate what it wraps; reallocating operations
// (`rotate90`) are only implemented for the owned form.
//
// Every public drawing entry point is checked against the clip rectangle.
// Anything outside it is clipped or ignored.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::blend::{BlendMode, get_a, get_rgba, make_rgb, make_rgba, scale_val};
use crate::components::tools::{AlphaMask, PaintContext};
use crate::gamma;

/// Backing storage for a bitmap.
pub trait PixelStore: Deref<Target = [u32]> + DerefMut {}

impl<T: Deref<Target = [u32]> + DerefMut> PixelStore for T {}

/// Owned bitmap.
pub type OwnedBitmap = Bitmap<Vec<u32>>;

/// Bitmap over caller-owned pixels.
pub type BitmapView<'a> = Bitmap<&'a mut [u32]>;

/// XOR checkerboard pattern (for marquee and stroke previews).
#[inline]
fn xor_value(x: i32, y: i32) -> u32 {
    const C: [u32; 2] = [0x00FF_FFFF, 0x0080_8080];
    C[((x & 1) ^ (y & 1)) as usize]
}

/// Inclusive clip rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ClipRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClipRect {
    #[inline]
    pub fn width(&self) -> i32 {
        self.right - self.left + 1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.bottom - self.top + 1
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Colours used when a canvas is created with an overscroll margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasStyle {
    /// Fill of the overscroll margin.
    pub background: u32,
    /// Four-pixel frame drawn just outside the image area.
    pub border: u32,
    /// Initial colour of the image area.
    pub canvas: u32,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background: make_rgb(0x60, 0x60, 0x60),
            border: make_rgb(0x30, 0x30, 0x30),
            canvas: make_rgb(0, 0, 0),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap<S = Vec<u32>> {
    pub w: i32,
    pub h: i32,
    /// Origin offset, used when the bitmap is a floating selection.
    pub x: i32,
    pub y: i32,
    pub overscroll: i32,
    clip: ClipRect,
    blend: BlendMode,
    data: S,
}

impl<S> fmt::Debug for Bitmap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("w", &self.w)
            .field("h", &self.h)
            .field("overscroll", &self.overscroll)
            .field("clip", &self.clip)
            .field("blend", &self.blend)
            .finish()
    }
}

/// Buffer length for a `w × h` bitmap, computed in `usize`.
#[inline]
fn pixel_count(w: i32, h: i32) -> usize {
    w.max(0) as usize * h.max(0) as usize
}

// ---------------------------------------------------------------------------
//  Construction
// ---------------------------------------------------------------------------

impl Bitmap {
    /// Zero-filled bitmap. Non-positive sizes clamp to 1.
    pub fn new(width: i32, height: i32) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        Self::from_store(w, h, vec![0; pixel_count(w, h)])
    }

    /// Bitmap with an `overscroll` margin on every side. The margin is painted
    /// with `style.background`, framed with `style.border`, and excluded from
    /// the clip rectangle.
    pub fn with_overscroll(width: i32, height: i32, overscroll: i32, style: &CanvasStyle) -> Self {
        let overscroll = overscroll.max(0);
        let mut bmp = Self::new(
            width.max(1).saturating_add(overscroll * 2),
            height.max(1).saturating_add(overscroll * 2),
        );
        bmp.overscroll = overscroll;

        let (w, h) = (bmp.w, bmp.h);
        bmp.clear(style.background);
        bmp.set_clip(overscroll, overscroll, w - overscroll - 1, h - overscroll - 1);
        let clip = bmp.clip;
        bmp.rectfill(clip.left, clip.top, clip.right, clip.bottom, style.canvas, 0);

        bmp.set_clip(0, 0, w - 1, h - 1);
        for i in 0..overscroll.min(4) {
            bmp.rect(
                overscroll - 1 - i,
                overscroll - 1 - i,
                w - overscroll + i,
                h - overscroll + i,
                style.border,
                0,
            );
        }

        bmp.set_clip(overscroll, overscroll, w - overscroll - 1, h - overscroll - 1);
        bmp
    }

    /// Take ownership of decoded pixels. `None` if `data` is too small.
    pub fn from_vec(width: i32, height: i32, data: Vec<u32>) -> Option<Self> {
        let w = width.max(1);
        let h = height.max(1);
        if data.len() < pixel_count(w, h) {
            return None;
        }
        Some(Self::from_store(w, h, data))
    }

    /// Rotate 90° clockwise. Rebuilds the bitmap with swapped dimensions.
    pub fn rotate90(&mut self) {
        *self = self.rotated90(true);
    }

    /// Rotate 90° counter-clockwise.
    pub fn rotate90_ccw(&mut self) {
        *self = self.rotated90(false);
    }

    pub fn into_raw(self) -> Vec<u32> {
        self.data
    }
}

impl<'a> Bitmap<&'a mut [u32]> {
    /// Wrap caller-owned pixels without taking ownership. `None` if the
    /// slice is too small for `width * height`.
    pub fn wrap(width: i32, height: i32, data: &'a mut [u32]) -> Option<Self> {
        let w = width.max(1);
        let h = height.max(1);
        if data.len() < pixel_count(w, h) {
            return None;
        }
        Some(Self::from_store(w, h, data))
    }
}

impl<S: PixelStore> Bitmap<S> {
    fn from_store(w: i32, h: i32, data: S) -> Self {
        Self {
            w,
            h,
            x: 0,
            y: 0,
            overscroll: 0,
            clip: ClipRect { left: 0, top: 0, right: w - 1, bottom: h - 1 },
            blend: BlendMode::Normal,
            data,
        }
    }

    // -----------------------------------------------------------------------
    //  Accessors
    // -----------------------------------------------------------------------

    pub fn data(&self) -> &[u32] {
        &self.data[..(self.w * self.h) as usize]
    }

    pub fn data_mut(&mut self) -> &mut [u32] {
        let len = (self.w * self.h) as usize;
        &mut self.data[..len]
    }

    #[inline]
    pub fn clip(&self) -> ClipRect {
        self.clip
    }

    #[inline]
    pub fn cl(&self) -> i32 {
        self.clip.left
    }

    #[inline]
    pub fn ct(&self) -> i32 {
        self.clip.top
    }

    #[inline]
    pub fn cr(&self) -> i32 {
        self.clip.right
    }

    #[inline]
    pub fn cb(&self) -> i32 {
        self.clip.bottom
    }

    #[inline]
    pub fn cw(&self) -> i32 {
        self.clip.width()
    }

    #[inline]
    pub fn ch(&self) -> i32 {
        self.clip.height()
    }

    /// Blend mode used by the shape primitives.
    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.w as usize + x as usize
    }

    /// Sets the writable area. Coordinates are clamped into the buffer.
    pub fn set_clip(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let left = x1.clamp(0, self.w - 1);
        let top = y1.clamp(0, self.h - 1);
        let right = x2.clamp(left, self.w - 1);
        let bottom = y2.clamp(top, self.h - 1);
        self.clip = ClipRect { left, top, right, bottom };
    }

    /// Clips coordinates to the writable image area.
    pub fn clip_coords(&self, x1: &mut i32, y1: &mut i32, x2: &mut i32, y2: &mut i32) {
        *x1 = (*x1).max(self.clip.left);
        *y1 = (*y1).max(self.clip.top);
        *x2 = (*x2).min(self.clip.right);
        *y2 = (*y2).min(self.clip.bottom);
    }

    pub fn clear(&mut self, c: u32) {
        self.data_mut().fill(c);
    }

    /// Non-blending write. Ignored outside the clip rectangle.
    #[inline]
    pub fn setpixel_raw(&mut self, x: i32, y: i32, c: u32) {
        if self.clip.contains(x, y) {
            let i = self.index(x, y);
            self.data[i] = c;
        }
    }

    /// Read a pixel; coordinates are clamped into the clip rectangle.
    #[inline]
    pub fn getpixel(&self, x: i32, y: i32) -> u32 {
        let x = x.clamp(self.clip.left, self.clip.right);
        let y = y.clamp(self.clip.top, self.clip.bottom);
        self.data[self.index(x, y)]
    }

    /// Read anywhere in the buffer (margin included), `None` outside it.
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            None
        } else {
            Some(self.data[self.index(x, y)])
        }
    }

    // -----------------------------------------------------------------------
    //  Shape primitives
    // -----------------------------------------------------------------------

    pub fn hline(&mut self, mut x1: i32, y: i32, mut x2: i32, c: u32, t: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y < self.clip.top || y > self.clip.bottom || x1 > self.clip.right || x2 < self.clip.left {
            return;
        }
        let x1 = x1.max(self.clip.left);
        let x2 = x2.min(self.clip.right);
        let mode = self.blend;
        let row = self.index(0, y);
        for p in &mut self.data[row + x1 as usize..=row + x2 as usize] {
            *p = mode.apply(*p, c, t);
        }
    }

    pub fn vline(&mut self, mut y1: i32, x: i32, mut y2: i32, c: u32, t: i32) {
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x < self.clip.left || x > self.clip.right || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        let mode = self.blend;
        for y in y1.max(self.clip.top)..=y2.min(self.clip.bottom) {
            let i = self.index(x, y);
            self.data[i] = mode.apply(self.data[i], c, t);
        }
    }

    /// Integer Bresenham line; every point goes through `setpixel_solid`.
    pub fn line(&mut self, mut x1: i32, mut y1: i32, x2: i32, y2: i32, c: u32, t: i32) {
        let mut dx = x2 - x1;
        let mut dy = y2 - y1;
        let inx = if dx > 0 { 1 } else { -1 };
        let iny = if dy > 0 { 1 } else { -1 };

        dx = dx.abs();
        dy = dy.abs();

        if dx >= dy {
            dy <<= 1;
            let mut e = dy - dx;
            dx <<= 1;

            while x1 != x2 {
                self.setpixel_solid(x1, y1, c, t);
                if e >= 0 {
                    y1 += iny;
                    e -= dx;
                }
                e += dy;
                x1 += inx;
            }
        } else {
            dx <<= 1;
            let mut e = dx - dy;
            dy <<= 1;

            while y1 != y2 {
                self.setpixel_solid(x1, y1, c, t);
                if e >= 0 {
                    x1 += inx;
                    e -= dy;
                }
                e += dx;
                y1 += iny;
            }
        }

        self.setpixel_solid(x1, y1, c, t);
    }

    /// Rectangle outline of the corners clipped to the clip rectangle.
    pub fn rect(&mut self, mut x1: i32, mut y1: i32, mut x2: i32, mut y2: i32, c: u32, t: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x1 > self.clip.right || x2 < self.clip.left || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        self.clip_coords(&mut x1, &mut y1, &mut x2, &mut y2);

        self.hline(x1, y1, x2, c, t);
        if y2 != y1 {
            self.hline(x1, y2, x2, c, t);
        }
        if y2 - y1 < 2 {
            return;
        }
        self.vline(y1 + 1, x1, y2 - 1, c, t);
        if x2 != x1 {
            self.vline(y1 + 1, x2, y2 - 1, c, t);
        }
    }

    pub fn rectfill(&mut self, mut x1: i32, mut y1: i32, mut x2: i32, mut y2: i32, c: u32, t: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x1 > self.clip.right || x2 < self.clip.left || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        for y in y1.max(self.clip.top)..=y2.min(self.clip.bottom) {
            self.hline(x1, y, x2, c, t);
        }
    }

    // -----------------------------------------------------------------------
    //  XOR primitives (non-destructive previews: applying twice restores)
    // -----------------------------------------------------------------------

    #[inline]
    fn xor_pixel(&mut self, x: i32, y: i32) {
        if self.clip.contains(x, y) {
            let i = self.index(x, y);
            self.data[i] ^= xor_value(x, y);
        }
    }

    pub fn xor_line(&mut self, mut x1: i32, mut y1: i32, x2: i32, y2: i32) {
        let mut dx = x2 - x1;
        let mut dy = y2 - y1;
        let inx = if dx > 0 { 1 } else { -1 };
        let iny = if dy > 0 { 1 } else { -1 };

        dx = dx.abs();
        dy = dy.abs();

        if dx >= dy {
            dy <<= 1;
            let mut e = dy - dx;
            dx <<= 1;

            while x1 != x2 {
                self.xor_pixel(x1, y1);
                if e >= 0 {
                    y1 += iny;
                    e -= dx;
                }
                e += dy;
                x1 += inx;
            }
        } else {
            dx <<= 1;
            let mut e = dx - dy;
            dy <<= 1;

            while y1 != y2 {
                self.xor_pixel(x1, y1);
                if e >= 0 {
                    x1 += inx;
                    e -= dy;
                }
                e += dx;
                y1 += iny;
            }
        }

        self.xor_pixel(x1, y1);
    }

    pub fn xor_hline(&mut self, mut x1: i32, y: i32, mut x2: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y < self.clip.top || y > self.clip.bottom || x1 > self.clip.right || x2 < self.clip.left {
            return;
        }
        for x in x1.max(self.clip.left)..=x2.min(self.clip.right) {
            self.xor_pixel(x, y);
        }
    }

    pub fn xor_vline(&mut self, mut y1: i32, x: i32, mut y2: i32) {
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x < self.clip.left || x > self.clip.right || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        for y in y1.max(self.clip.top)..=y2.min(self.clip.bottom) {
            self.xor_pixel(x, y);
        }
    }

    /// XOR outline, clipped the same way as `rect`.
    pub fn xor_rect(&mut self, mut x1: i32, mut y1: i32, mut x2: i32, mut y2: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x1 > self.clip.right || x2 < self.clip.left || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        self.clip_coords(&mut x1, &mut y1, &mut x2, &mut y2);

        self.xor_hline(x1, y1, x2);
        if y2 != y1 {
            self.xor_hline(x1, y2, x2);
        }
        if y2 - y1 < 2 {
            return;
        }
        self.xor_vline(y1 + 1, x1, y2 - 1);
        if x2 != x1 {
            self.xor_vline(y1 + 1, x2, y2 - 1);
        }
    }

    pub fn xor_rectfill(&mut self, mut x1: i32, mut y1: i32, mut x2: i32, mut y2: i32) {
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        if x1 > self.clip.right || x2 < self.clip.left || y1 > self.clip.bottom || y2 < self.clip.top {
            return;
        }
        for y in y1.max(self.clip.top)..=y2.min(self.clip.bottom) {
            self.xor_hline(x1, y, x2);
        }
    }

    // -----------------------------------------------------------------------
    //  Single-pixel compositing
    // -----------------------------------------------------------------------

    /// Brush entry point: applies the alpha mask, then dispatches on the
    /// wrap and clone flags of `ctx`.
    pub fn setpixel(&mut self, x: i32, y: i32, c: u32, t: i32, ctx: &PaintContext<'_>) {
        let t = match ctx.alpha_mask {
            AlphaMask::Off => t,
            AlphaMask::Respect => scale_val(t, get_a(self.getpixel(x, y)) as i32),
            AlphaMask::Invert => scale_val(t, 255 - get_a(self.getpixel(x, y)) as i32),
        };

        match (ctx.clone.wrap, ctx.clone.active) {
            (false, false) => self.setpixel_blend(x, y, c, t, ctx.blend),
            (true, false) => self.setpixel_wrap(x, y, c, t, ctx),
            (false, true) => self.setpixel_clone(x, y, t, ctx),
            (true, true) => self.setpixel_wrap_clone(x, y, t, ctx),
        }
    }

    /// Bounds-checked blend with the bitmap's own blend mode.
    #[inline]
    pub fn setpixel_solid(&mut self, x: i32, y: i32, c: u32, t: i32) {
        self.setpixel_blend(x, y, c, t, self.blend);
    }

    /// Bounds-checked blend with an explicit mode.
    #[inline]
    pub fn setpixel_blend(&mut self, x: i32, y: i32, c: u32, t: i32, mode: BlendMode) {
        if !self.clip.contains(x, y) {
            return;
        }
        let i = self.index(x, y);
        self.data[i] = mode.apply(self.data[i], c, t);
    }

    #[inline]
    fn wrap_into_clip(&self, x: i32, y: i32) -> (i32, i32) {
        (
            self.clip.left + (x - self.clip.left).rem_euclid(self.clip.width()),
            self.clip.top + (y - self.clip.top).rem_euclid(self.clip.height()),
        )
    }

    /// Coordinates wrap toroidally into the clip rectangle (tiling brushes).
    pub fn setpixel_wrap(&mut self, x: i32, y: i32, c: u32, t: i32, ctx: &PaintContext<'_>) {
        let (x, y) = self.wrap_into_clip(x, y);
        let i = self.index(x, y);
        self.data[i] = ctx.blend.apply(self.data[i], c, t);
    }

    /// Clone-source read for a destination point already resolved.
    fn clone_source(&self, x: i32, y: i32, wrap: bool, ctx: &PaintContext<'_>) -> u32 {
        let clone = &ctx.clone;
        let (x1, y1) = clone.mirror.reflect(x - clone.dx, y - clone.dy, clone.anchor);
        let (x1, y1) = if wrap { self.wrap_into_clip(x1, y1) } else { (x1, y1) };

        match clone.snapshot {
            Some(snap) if clone.stroke.contains_strict(x1, y1) => {
                snap.getpixel(x1 - clone.stroke.x1 - 1, y1 - clone.stroke.y1 - 1)
            }
            _ => self.getpixel(x1, y1),
        }
    }

    /// Paint with colour sampled from a displaced (and optionally mirrored)
    /// location instead of the brush colour.
    pub fn setpixel_clone(&mut self, x: i32, y: i32, t: i32, ctx: &PaintContext<'_>) {
        if !self.clip.contains(x, y) {
            return;
        }
        let c2 = self.clone_source(x, y, false, ctx);
        let i = self.index(x, y);
        self.data[i] = ctx.blend.apply(self.data[i], c2, t);
    }

    /// Wrap, displace and mirror, wrap again, then clone.
    pub fn setpixel_wrap_clone(&mut self, x: i32, y: i32, t: i32, ctx: &PaintContext<'_>) {
        let (x, y) = self.wrap_into_clip(x, y);
        let c2 = self.clone_source(x, y, true, ctx);
        let i = self.index(x, y);
        self.data[i] = ctx.blend.apply(self.data[i], c2, t);
    }

    // -----------------------------------------------------------------------
    //  Blit / composite
    // -----------------------------------------------------------------------

    /// Shared clipping for `blit` and `draw_brush`. Returns the adjusted
    /// `(sx, sy, dx, dy, w, h)` or `None` when nothing is left.
    fn clip_transfer(
        &self,
        dest_clip: ClipRect,
        mut sx: i32,
        mut sy: i32,
        mut dx: i32,
        mut dy: i32,
        mut ww: i32,
        mut hh: i32,
    ) -> Option<(i32, i32, i32, i32, i32, i32)> {
        if sx >= self.w || sy >= self.h || dx > dest_clip.right || dy > dest_clip.bottom {
            return None;
        }

        if sx < 0 {
            ww += sx;
            dx -= sx;
            sx = 0;
        }
        if sy < 0 {
            hh += sy;
            dy -= sy;
            sy = 0;
        }
        if sx + ww > self.w {
            ww = self.w - sx;
        }
        if sy + hh > self.h {
            hh = self.h - sy;
        }

        if dx < dest_clip.left {
            let d = dx - dest_clip.left;
            ww += d;
            sx -= d;
            dx = dest_clip.left;
        }
        if dy < dest_clip.top {
            let d = dy - dest_clip.top;
            hh += d;
            sy -= d;
            dy = dest_clip.top;
        }
        if dx + ww - 1 > dest_clip.right {
            ww = dest_clip.right - dx + 1;
        }
        if dy + hh - 1 > dest_clip.bottom {
            hh = dest_clip.bottom - dy + 1;
        }

        if ww < 1 || hh < 1 {
            None
        } else {
            Some((sx, sy, dx, dy, ww, hh))
        }
    }

    /// Raw copy of a `ww × hh` block into `dest`, clipped on both sides.
    pub fn blit<D: PixelStore>(
        &self,
        dest: &mut Bitmap<D>,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        ww: i32,
        hh: i32,
    ) {
        let Some((sx, sy, dx, dy, ww, hh)) = self.clip_transfer(dest.clip, sx, sy, dx, dy, ww, hh)
        else {
            return;
        };

        for y in 0..hh {
            let s = self.index(sx, sy + y);
            let d = dest.index(dx, dy + y);
            dest.data[d..d + ww as usize].copy_from_slice(&self.data[s..s + ww as usize]);
        }
    }

    /// Like `blit`, but composites with the context's blend mode. Source
    /// alpha (scaled by the brush transparency) becomes the transparency.
    pub fn draw_brush<D: PixelStore>(
        &self,
        dest: &mut Bitmap<D>,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        ww: i32,
        hh: i32,
        ctx: &PaintContext<'_>,
    ) {
        let Some((sx, sy, dx, dy, ww, hh)) = self.clip_transfer(dest.clip, sx, sy, dx, dy, ww, hh)
        else {
            return;
        };

        let opacity = 255 - ctx.trans.clamp(0, 255);
        for y in 0..hh {
            for x in 0..ww {
                let c = self.data[self.index(sx + x, sy + y)];
                let t = 255 - (get_a(c) as i32 * opacity) / 255;
                dest.setpixel_blend(dx + x, dy + y, c | 0xFF00_0000, t, ctx.blend);
            }
        }
    }

    /// Deep copy into owned storage (clip, origin and blend mode kept).
    pub fn to_owned_bitmap(&self) -> Bitmap {
        Bitmap {
            w: self.w,
            h: self.h,
            x: self.x,
            y: self.y,
            overscroll: self.overscroll,
            clip: self.clip,
            blend: self.blend,
            data: self.data().to_vec(),
        }
    }

    /// Copy a region into a new bitmap (no margin). The region is clipped
    /// against the source buffer; what falls outside stays zero.
    pub fn copy_region(&self, x: i32, y: i32, w: i32, h: i32) -> Bitmap {
        let mut out = Bitmap::new(w, h);
        out.x = x;
        out.y = y;
        self.blit(&mut out, x, y, 0, 0, w, h);
        out
    }

    // -----------------------------------------------------------------------
    //  Whole-buffer transforms
    // -----------------------------------------------------------------------

    /// Mirror left↔right in place.
    pub fn flip_horizontal(&mut self) {
        let w = self.w as usize;
        for row in self.data_mut().chunks_exact_mut(w) {
            row.reverse();
        }
    }

    /// Mirror top↔bottom in place.
    pub fn flip_vertical(&mut self) {
        let w = self.w as usize;
        let h = self.h as usize;
        let data = self.data_mut();
        for y in 0..h / 2 {
            let (top, bottom) = data.split_at_mut((h - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    /// Reverse the flat buffer.
    pub fn rotate180(&mut self) {
        self.data_mut().reverse();
    }

    /// Invert colour channels, alpha untouched.
    pub fn invert(&mut self) {
        for p in self.data_mut() {
            *p ^= 0x00FF_FFFF;
        }
    }

    /// New bitmap rotated by 90°. Width and height swap; the clip is
    /// re-derived from the overscroll margin.
    pub fn rotated90(&self, clockwise: bool) -> Bitmap {
        let (tw, th) = (self.w, self.h);
        let mut out = Bitmap::new(th, tw);
        out.overscroll = self.overscroll;
        out.blend = self.blend;

        for yy in 0..tw {
            for xx in 0..th {
                let (sx, sy) = if clockwise { (yy, th - 1 - xx) } else { (tw - 1 - yy, xx) };
                let d = out.index(xx, yy);
                out.data[d] = self.data[self.index(sx, sy)];
            }
        }

        let os = self.overscroll;
        out.set_clip(os, os, out.w - os - 1, out.h - os - 1);
        out
    }

    // -----------------------------------------------------------------------
    //  Gamma-correct bilinear scaling
    // -----------------------------------------------------------------------

    /// Scale the clip region into `dest`'s clip region.
    pub fn scale<D: PixelStore>(&self, dest: &mut Bitmap<D>, wrap: bool) {
        self.scale_with(dest, wrap, |_| false);
    }

    /// Scale with a per-row callback; `on_row` returning `true` cancels.
    /// Returns `false` when cancelled.
    ///
    /// RGB is interpolated in linear light (see [`gamma`]); alpha directly.
    /// A scan row stops at the last buffer row/column rather than read past
    /// it. `wrap` takes the far neighbour from the opposite edge.
    pub fn scale_with<D: PixelStore, F: FnMut(i32) -> bool>(
        &self,
        dest: &mut Bitmap<D>,
        wrap: bool,
        mut on_row: F,
    ) -> bool {
        let (sx, sy, sw, sh) = (self.cl(), self.ct(), self.cw(), self.ch());
        let (dx, dy, dw, dh) = (dest.cl(), dest.ct(), dest.cw(), dest.ch());

        if sw < 1 || sh < 1 || dw < 1 || dh < 1 {
            return true;
        }

        let ax = sw as f32 / dw as f32;
        let ay = sh as f32 / dh as f32;

        for y in 0..dh {
            let vv = y as f32 * ay;
            let v1 = vv as i32;
            let v = vv - v1 as f32;

            if sy + v1 >= self.h - 1 {
                break;
            }

            let v2 = if wrap { (v1 + 1) % sh } else { (v1 + 1).min(sh - 1) };
            let row1 = self.index(sx, sy + v1);
            let row2 = self.index(sx, sy + v2);
            let drow = dest.index(dx, dy + y);

            for x in 0..dw {
                let uu = x as f32 * ax;
                let u1 = uu as i32;
                let u = uu - u1 as f32;

                if sx + u1 >= self.w - 1 {
                    break;
                }

                let u2 = if wrap { (u1 + 1) % sw } else { (u1 + 1).min(sw - 1) };
                let c = [
                    self.data[row1 + u1 as usize],
                    self.data[row1 + u2 as usize],
                    self.data[row2 + u1 as usize],
                    self.data[row2 + u2 as usize],
                ];
                dest.data[drow + x as usize] = bilinear_gamma(c, u, v);
            }

            if on_row(y) {
                return false;
            }
        }

        true
    }

    // -----------------------------------------------------------------------
    //  Arbitrary-angle rotation
    // -----------------------------------------------------------------------

    /// Rotate (clockwise, degrees) and uniformly scale the clip region into a
    /// new canvas sized to bound the result, with an `overscroll` margin.
    ///
    /// Each destination pixel is mapped back into the source and sampled with
    /// the gamma bilinear kernel. Samples outside the source are transparent,
    /// or wrap around when `tile` is set. `on_row` returning `true` cancels
    /// and yields `None`.
    pub fn rotate_with<F: FnMut(i32) -> bool>(
        &self,
        angle: f64,
        scale: f64,
        overscroll: i32,
        tile: bool,
        style: &CanvasStyle,
        mut on_row: F,
    ) -> Option<Bitmap> {
        let (sw, sh) = (self.cw(), self.ch());
        let (dw, dh) = rotated_size(sw, sh, angle, scale);
        let mut dest = Bitmap::with_overscroll(dw, dh, overscroll, style);

        let (sin, cos) = angle.to_radians().sin_cos();
        let inv = 1.0 / scale;
        let (scx, scy) = (sw as f64 / 2.0, sh as f64 / 2.0);
        let (dcx, dcy) = (dw as f64 / 2.0, dh as f64 / 2.0);
        let (sl, st) = (self.cl(), self.ct());

        let sample = |x: i32, y: i32| -> u32 {
            let (x, y) = if tile {
                (x.rem_euclid(sw), y.rem_euclid(sh))
            } else if x < 0 || y < 0 || x >= sw || y >= sh {
                return 0;
            } else {
                (x, y)
            };
            self.data[self.index(sl + x, st + y)]
        };

        for y in 0..dh {
            let v = y as f64 + 0.5 - dcy;
            let row = dest.index(dest.cl(), dest.ct() + y);

            for x in 0..dw {
                let u = x as f64 + 0.5 - dcx;
                let sx = (u * cos + v * sin) * inv + scx - 0.5;
                let sy = (v * cos - u * sin) * inv + scy - 0.5;

                let (fx0, fy0) = (sx.floor(), sy.floor());
                let (x0, y0) = (fx0 as i32, fy0 as i32);

                let c = if !tile && (x0 < -1 || y0 < -1 || x0 >= sw || y0 >= sh) {
                    0
                } else {
                    bilinear_gamma(
                        [sample(x0, y0), sample(x0 + 1, y0), sample(x0, y0 + 1), sample(x0 + 1, y0 + 1)],
                        (sx - fx0) as f32,
                        (sy - fy0) as f32,
                    )
                };
                dest.data[row + x as usize] = c;
            }

            if on_row(y) {
                return None;
            }
        }

        Some(dest)
    }

    /// Invert colour channels inside the clip rectangle, alpha untouched.
    pub fn invert_clip(&mut self) {
        let clip = self.clip;
        for y in clip.top..=clip.bottom {
            let row = self.index(clip.left, y);
            for p in &mut self.data[row..row + clip.width() as usize] {
                *p ^= 0x00FF_FFFF;
            }
        }
    }
}

/// Size of the box bounding a `w × h` region rotated by `angle` degrees and
/// scaled by `scale`. Never smaller than 1×1.
pub fn rotated_size(w: i32, h: i32, angle: f64, scale: f64) -> (i32, i32) {
    let (sin, cos) = angle.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let rw = (w as f64 * cos + h as f64 * sin) * scale;
    let rh = (w as f64 * sin + h as f64 * cos) * scale;
    // absorb float noise such as cos(90°) != 0
    (((rw - 1e-6).ceil() as i32).max(1), ((rh - 1e-6).ceil() as i32).max(1))
}

/// Bilinear blend of four samples `[top-left, top-right, bottom-left,
/// bottom-right]` at fractional offset `(u, v)`, RGB in linear light.
pub(crate) fn bilinear_gamma(c: [u32; 4], u: f32, v: f32) -> u32 {
    let f = [(1.0 - u) * (1.0 - v), u * (1.0 - v), (1.0 - u) * v, u * v];

    let (mut r, mut g, mut b, mut a) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
    for (px, w) in c.iter().zip(f) {
        let p = get_rgba(*px);
        r += gamma::fix(p.r) as f32 * w;
        g += gamma::fix(p.g) as f32 * w;
        b += gamma::fix(p.b) as f32 * w;
        a += p.a as f32 * w;
    }

    make_rgba(
        gamma::unfix((r + 0.5) as i32),
        gamma::unfix((g + 0.5) as i32),
        gamma::unfix((b + 0.5) as i32),
        (a + 0.5).clamp(0.0, 255.0) as u8,
    )
}
