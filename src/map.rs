// ============================================================================
// OVERLAY MAP — single-channel byte buffer for masks, weights and marquees
// ============================================================================

/// One byte per pixel. No clip rectangle and no colour semantics: values are
/// weights (flood fill), marker bits (visited flags) or marquee intensity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Map {
    pub w: i32,
    pub h: i32,
    data: Vec<u8>,
}

impl Map {
    /// Non-positive sizes clamp to 1.
    pub fn new(width: i32, height: i32) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        Self { w, h, data: vec![0; w as usize * h as usize] }
    }

    pub fn clear(&mut self, value: u8) {
        self.data.fill(value);
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || x >= self.w || y < 0 || y >= self.h {
            None
        } else {
            Some(y as usize * self.w as usize + x as usize)
        }
    }

    /// Ignored outside the map.
    #[inline]
    pub fn setpixel(&mut self, x: i32, y: i32, value: u8) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = value;
        }
    }

    /// Returns 0 outside the map.
    #[inline]
    pub fn getpixel(&self, x: i32, y: i32) -> u8 {
        self.index(x, y).map_or(0, |i| self.data[i])
    }

    pub fn hline(&mut self, x1: i32, y: i32, x2: i32, value: u8) {
        let (x1, x2) = if x1 > x2 { (x2, x1) } else { (x1, x2) };
        if y < 0 || y >= self.h {
            return;
        }
        for x in x1.max(0)..=x2.min(self.w - 1) {
            self.setpixel(x, y, value);
        }
    }

    pub fn vline(&mut self, y1: i32, x: i32, y2: i32, value: u8) {
        let (y1, y2) = if y1 > y2 { (y2, y1) } else { (y1, y2) };
        if x < 0 || x >= self.w {
            return;
        }
        for y in y1.max(0)..=y2.min(self.h - 1) {
            self.setpixel(x, y, value);
        }
    }

    /// Rectangle outline (marquee).
    pub fn rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, value: u8) {
        self.hline(x1, y1, x2, value);
        self.hline(x1, y2, x2, value);
        self.vline(y1, x1, y2, value);
        self.vline(y1, x2, y2, value);
    }

    pub fn rectfill(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, value: u8) {
        let (y1, y2) = if y1 > y2 { (y2, y1) } else { (y1, y2) };
        for y in y1..=y2 {
            self.hline(x1, y, x2, value);
        }
    }

    /// Bresenham line.
    pub fn line(&mut self, mut x1: i32, mut y1: i32, x2: i32, y2: i32, value: u8) {
        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut e = dx + dy;
        loop {
            self.setpixel(x1, y1, value);
            if x1 == x2 && y1 == y2 {
                break;
            }
            let e2 = e * 2;
            if e2 >= dy {
                e += dy;
                x1 += sx;
            }
            if e2 <= dx {
                e += dx;
                y1 += sy;
            }
        }
    }

    /// True when any 4-neighbour of a set (0xFF) pixel is not set.
    fn is_edge(&self, x: i32, y: i32) -> bool {
        !(self.getpixel(x - 1, y) == 0xFF
            && self.getpixel(x + 1, y) == 0xFF
            && self.getpixel(x, y - 1) == 0xFF
            && self.getpixel(x, y + 1) == 0xFF)
    }

    /// Stamp the outline of `shape` (pixels equal to 0xFF) into this map.
    pub fn draw_outline(&mut self, shape: &Map, value: u8) {
        for y in 0..shape.h {
            for x in 0..shape.w {
                if shape.getpixel(x, y) == 0xFF && shape.is_edge(x, y) {
                    self.setpixel(x, y, value);
                }
            }
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels holding `value`.
    pub fn count(&self, value: u8) -> usize {
        self.data.iter().filter(|&&v| v == value).count()
    }
}
