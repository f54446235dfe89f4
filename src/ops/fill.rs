// ============================================================================
// FLOOD FILL — span-based scanline fill with soft tolerance edges
// ============================================================================
//
// Comparisons read a frozen snapshot of the canvas, so writes made during the
// scan never change what counts as "in range". Each accepted pixel records a
// transparency weight in an overlay `Map`; a final sweep over the clip
// rectangle composites the fill colour with those weights.

use log::warn;

use crate::blend::diff32;
use crate::canvas::{Bitmap, PixelStore};
use crate::map::Map;

/// Default depth of the explicit span stack.
pub const FILL_STACK_CAPACITY: usize = 4096;

/// Result of a fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    /// Pixels accepted by the scan (including fully transparent weights).
    pub filled: usize,
    /// The stack overflowed and the scan stopped pushing new spans.
    pub truncated: bool,
}

/// Fixed-capacity coordinate stack. Slot 0 is never used, so a stack of
/// capacity `n` holds at most `n - 1` entries.
pub struct FillStack {
    xs: Vec<i32>,
    ys: Vec<i32>,
    sp: usize,
    overflowed: bool,
}

impl FillStack {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self { xs: vec![0; capacity], ys: vec![0; capacity], sp: 0, overflowed: false }
    }

    /// `false` once the stack is full. After the first overflow every later
    /// push is refused as well.
    pub fn push(&mut self, x: i32, y: i32) -> bool {
        if self.overflowed || self.sp >= self.xs.len() - 1 {
            self.overflowed = true;
            return false;
        }
        self.sp += 1;
        self.xs[self.sp] = x;
        self.ys[self.sp] = y;
        true
    }

    pub fn pop(&mut self) -> Option<(i32, i32)> {
        if self.sp == 0 {
            return None;
        }
        let p = (self.xs[self.sp], self.ys[self.sp]);
        self.sp -= 1;
        Some(p)
    }

    pub fn len(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }
}

/// Tolerance test. Returns the transparency weight when `c1` lies within
/// `range` of `c2`.
///
/// `diff` is half the Euclidean distance over all four channels, truncated;
/// the weight grows with `diff` so the fill fades out toward the tolerance
/// boundary.
#[inline]
pub fn in_range(c1: u32, c2: u32, range: i32) -> Option<u8> {
    let diff = ((diff32(c1, c2) as f64).sqrt() as i32) / 2;
    if diff <= range {
        let weight = (diff as f32 * (256.0 / (range + 1) as f32)) as i32;
        Some(weight.min(255) as u8)
    } else {
        None
    }
}

impl<S: PixelStore> Bitmap<S> {
    /// Flood fill from `(x, y)`, replacing pixels near `old_color` with
    /// `new_color`. `range` is clamped to `0..=255`.
    pub fn fill(&mut self, x: i32, y: i32, new_color: u32, old_color: u32, range: i32) -> FillStats {
        self.fill_with_capacity(x, y, new_color, old_color, range, FILL_STACK_CAPACITY)
    }

    pub fn fill_with_capacity(
        &mut self,
        x: i32,
        y: i32,
        new_color: u32,
        old_color: u32,
        range: i32,
        capacity: usize,
    ) -> FillStats {
        let mut stats = FillStats::default();
        if new_color == old_color || !self.clip().contains(x, y) {
            return stats;
        }

        let range = range.clamp(0, 255);
        let (cl, ct, cr, cb) = (self.cl(), self.ct(), self.cr(), self.cb());

        let snapshot = self.to_owned_bitmap();
        let mut visited = Map::new(self.w, self.h);
        let mut weights = Map::new(self.w, self.h);
        weights.clear(255);

        // in range and not yet accepted
        let open = |visited: &Map, px: i32, py: i32| -> Option<u8> {
            if visited.getpixel(px, py) != 0 {
                None
            } else {
                in_range(snapshot.getpixel(px, py), old_color, range)
            }
        };

        let mut stack = FillStack::new(capacity);
        stack.push(x, y);

        while let Some((x, y)) = stack.pop() {
            let mut x1 = x;
            while x1 >= cl && open(&visited, x1, y).is_some() {
                x1 -= 1;
            }
            x1 += 1;

            let mut span_t = false;
            let mut span_b = false;

            while x1 <= cr {
                let Some(weight) = open(&visited, x1, y) else {
                    break;
                };
                visited.setpixel(x1, y, 1);
                weights.setpixel(x1, y, weight);
                stats.filled += 1;

                if y > ct {
                    let above = open(&visited, x1, y - 1).is_some();
                    if !span_t && above {
                        if stack.push(x1, y - 1) {
                            span_t = true;
                        }
                    } else if span_t && !above {
                        span_t = false;
                    }
                }

                if y < cb {
                    let below = open(&visited, x1, y + 1).is_some();
                    if !span_b && below {
                        if stack.push(x1, y + 1) {
                            span_b = true;
                        }
                    } else if span_b && !below {
                        span_b = false;
                    }
                }

                x1 += 1;
            }
        }

        if stack.overflowed() {
            warn!(
                "flood fill at ({x}, {y}) overflowed its {capacity}-entry stack; region partially filled"
            );
            stats.truncated = true;
        }

        for py in ct..=cb {
            for px in cl..=cr {
                let t = weights.getpixel(px, py);
                if t < 255 {
                    self.setpixel_solid(px, py, new_color, t as i32);
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::make_rgb;

    const WHITE: u32 = make_rgb(255, 255, 255);
    const BLACK: u32 = make_rgb(0, 0, 0);
    const RED: u32 = make_rgb(255, 0, 0);

    #[test]
    fn stack_keeps_slot_zero_free() {
        let mut stack = FillStack::new(4);
        assert!(stack.push(1, 1));
        assert!(stack.push(2, 2));
        assert!(stack.push(3, 3));
        assert!(!stack.push(4, 4));
        assert!(stack.overflowed());
        assert_eq!(stack.pop(), Some((3, 3)));
        // overflow is sticky
        assert!(!stack.push(5, 5));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn exact_match_has_zero_weight() {
        assert_eq!(in_range(RED, RED, 0), Some(0));
        assert_eq!(in_range(RED, BLACK, 0), None);
        // sqrt(255²)/2 = 127
        assert_eq!(in_range(RED, BLACK, 127), Some(254));
        assert_eq!(in_range(RED, BLACK, 126), None);
    }

    #[test]
    fn same_colour_is_noop() {
        let mut bmp = Bitmap::new(4, 4);
        bmp.clear(WHITE);
        let stats = bmp.fill(0, 0, WHITE, WHITE, 0);
        assert_eq!(stats, FillStats::default());
    }

    #[test]
    fn seed_outside_clip_is_noop() {
        let mut bmp = Bitmap::new(8, 8);
        bmp.clear(WHITE);
        bmp.set_clip(2, 2, 5, 5);
        let stats = bmp.fill(0, 0, RED, WHITE, 0);
        assert_eq!(stats.filled, 0);
        assert!(bmp.data().iter().all(|&p| p == WHITE));
    }

    #[test]
    fn fill_stops_at_walls_and_clip() {
        let mut bmp = Bitmap::new(10, 10);
        bmp.clear(WHITE);
        bmp.vline(0, 5, 9, BLACK, 0);
        bmp.set_clip(0, 0, 9, 7);
        let stats = bmp.fill(0, 0, RED, WHITE, 0);
        // columns 0..=4, rows 0..=7
        assert_eq!(stats.filled, 40);
        assert!(!stats.truncated);
        assert_eq!(bmp.getpixel(4, 7), RED);
        assert_eq!(bmp.get(2, 8), Some(WHITE));
        assert_eq!(bmp.getpixel(6, 3), WHITE);
    }

    #[test]
    fn new_colour_within_tolerance_terminates() {
        let mut bmp = Bitmap::new(16, 16);
        bmp.clear(make_rgb(100, 100, 100));
        let stats = bmp.fill(8, 8, make_rgb(101, 100, 100), make_rgb(100, 100, 100), 10);
        assert_eq!(stats.filled, 256);
    }

    #[test]
    fn overflow_truncates_without_panicking() {
        let mut bmp = Bitmap::new(64, 64);
        bmp.clear(WHITE);
        for x in (1..64).step_by(2) {
            bmp.vline(1, x, 62, BLACK, 0);
        }
        let eligible = bmp.data().iter().filter(|&&p| p == WHITE).count();
        let stats = bmp.fill_with_capacity(0, 0, RED, WHITE, 0, 4);
        assert!(stats.truncated);
        assert!(stats.filled > 0 && stats.filled < eligible);
        assert_eq!(bmp.data().iter().filter(|&&p| p == RED).count(), stats.filled);
    }
}
