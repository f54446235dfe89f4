// ============================================================================
// BLEND — packed colour helpers and per-pixel compositing modes
// ============================================================================
//
// Colours are packed as `a << 24 | b << 16 | g << 8 | r`, so a `u32` written
// little-endian lands in memory as R,G,B,A (same order as `image::Rgba<u8>`).
//
// Every blend takes a *transparency* amount `t`: 0 replaces the destination
// with the new colour, 255 leaves it untouched.

use serde::{Deserialize, Serialize};

/// Unpacked colour, one byte per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[inline]
pub const fn make_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (a as u32) << 24 | (b as u32) << 16 | (g as u32) << 8 | r as u32
}

/// Opaque colour.
#[inline]
pub const fn make_rgb(r: u8, g: u8, b: u8) -> u32 {
    make_rgba(r, g, b, 255)
}

#[inline]
pub const fn get_r(c: u32) -> u8 {
    (c & 0xFF) as u8
}

#[inline]
pub const fn get_g(c: u32) -> u8 {
    ((c >> 8) & 0xFF) as u8
}

#[inline]
pub const fn get_b(c: u32) -> u8 {
    ((c >> 16) & 0xFF) as u8
}

#[inline]
pub const fn get_a(c: u32) -> u8 {
    (c >> 24) as u8
}

#[inline]
pub const fn get_rgba(c: u32) -> Rgba {
    Rgba { r: get_r(c), g: get_g(c), b: get_b(c), a: get_a(c) }
}

impl Rgba {
    pub const fn pack(self) -> u32 {
        make_rgba(self.r, self.g, self.b, self.a)
    }
}

impl From<u32> for Rgba {
    fn from(c: u32) -> Self {
        get_rgba(c)
    }
}

impl From<Rgba> for u32 {
    fn from(c: Rgba) -> Self {
        c.pack()
    }
}

/// Scale `a` by `b` where `b` is a 0..=255 fraction.
#[inline]
pub const fn scale_val(a: i32, b: i32) -> i32 {
    (a * (1 + b)) >> 8
}

/// Sum of squared channel differences (all four channels).
#[inline]
pub fn diff32(c1: u32, c2: u32) -> i32 {
    let a = get_rgba(c1);
    let b = get_rgba(c2);
    let dr = a.r as i32 - b.r as i32;
    let dg = a.g as i32 - b.g as i32;
    let db = a.b as i32 - b.b as i32;
    let da = a.a as i32 - b.a as i32;
    dr * dr + dg * dg + db * db + da * da
}

/// Linear interpolation of one channel toward `c2` by transparency `t`.
#[inline]
fn mix(c1: u8, c2: u8, t: i32) -> u8 {
    let c1 = c1 as i32;
    let c2 = c2 as i32;
    (c2 + ((c1 - c2) * t) / 255) as u8
}

/// Blend all four channels; `t = 0` returns `c2`, `t = 255` returns `c1`.
#[inline]
pub fn blend_fast(c1: u32, c2: u32, t: i32) -> u32 {
    let t = t.clamp(0, 255);
    let a = get_rgba(c1);
    let b = get_rgba(c2);
    make_rgba(mix(a.r, b.r, t), mix(a.g, b.g, t), mix(a.b, b.b, t), mix(a.a, b.a, t))
}

// ---------------------------------------------------------------------------
//  Blend modes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Darken,
    Lighten,
    Multiply,
    Screen,
    Additive,
    Subtract,
    Difference,
    /// Raises destination alpha toward opaque, colour untouched.
    AlphaAdd,
    /// Lowers destination alpha toward transparent (eraser).
    AlphaSub,
}

impl BlendMode {
    /// Returns all blend modes for UI display
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Additive,
            BlendMode::Subtract,
            BlendMode::Difference,
            BlendMode::AlphaAdd,
            BlendMode::AlphaSub,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Additive => "Additive",
            BlendMode::Subtract => "Subtract",
            BlendMode::Difference => "Difference",
            BlendMode::AlphaAdd => "Alpha Add",
            BlendMode::AlphaSub => "Alpha Subtract",
        }
    }

    /// Composite `c2` over `c1` with transparency `t`.
    pub fn apply(self, c1: u32, c2: u32, t: i32) -> u32 {
        let t = t.clamp(0, 255);
        let channel: fn(i32, i32) -> i32 = match self {
            BlendMode::Normal => return blend_fast(c1, c2, t),
            BlendMode::AlphaAdd => {
                let a = get_a(c1) as i32;
                let a = a + ((255 - a) * (255 - t)) / 255;
                return (c1 & 0x00FF_FFFF) | (a as u32) << 24;
            }
            BlendMode::AlphaSub => {
                let a = get_a(c1) as i32;
                let a = a - (a * (255 - t)) / 255;
                return (c1 & 0x00FF_FFFF) | (a as u32) << 24;
            }
            BlendMode::Darken => |x, y| x.min(y),
            BlendMode::Lighten => |x, y| x.max(y),
            BlendMode::Multiply => |x, y| (x * y) / 255,
            BlendMode::Screen => |x, y| 255 - ((255 - x) * (255 - y)) / 255,
            BlendMode::Additive => |x, y| x + y,
            BlendMode::Subtract => |x, y| x - y,
            BlendMode::Difference => |x, y| (x - y).abs(),
        };

        let p = get_rgba(c1);
        let q = get_rgba(c2);
        let f = |x: u8, y: u8| channel(x as i32, y as i32).clamp(0, 255) as u8;
        let mixed = make_rgba(f(p.r, q.r), f(p.g, q.g), f(p.b, q.b), q.a);
        blend_fast(c1, mixed, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_layout_matches_rgba_bytes() {
        let c = make_rgba(1, 2, 3, 4);
        assert_eq!(c.to_le_bytes(), [1, 2, 3, 4]);
        assert_eq!(get_rgba(c), Rgba { r: 1, g: 2, b: 3, a: 4 });
    }

    #[test]
    fn normal_blend_endpoints() {
        let a = make_rgba(10, 20, 30, 255);
        let b = make_rgba(200, 100, 50, 128);
        assert_eq!(BlendMode::Normal.apply(a, b, 0), b);
        assert_eq!(BlendMode::Normal.apply(a, b, 255), a);
    }

    #[test]
    fn transparency_is_clamped() {
        let a = make_rgb(0, 0, 0);
        let b = make_rgb(255, 255, 255);
        assert_eq!(BlendMode::Normal.apply(a, b, -40), b);
        assert_eq!(BlendMode::Normal.apply(a, b, 999), a);
    }

    #[test]
    fn darken_and_lighten_pick_per_channel() {
        let a = make_rgb(100, 10, 200);
        let b = make_rgb(50, 60, 250);
        assert_eq!(BlendMode::Darken.apply(a, b, 0), make_rgb(50, 10, 200));
        assert_eq!(BlendMode::Lighten.apply(a, b, 0), make_rgb(100, 60, 250));
    }

    #[test]
    fn channel_modes_at_full_strength() {
        let a = make_rgb(100, 200, 40);
        let b = make_rgb(60, 100, 240);
        assert_eq!(BlendMode::Multiply.apply(a, b, 0), make_rgb(23, 78, 37));
        assert_eq!(BlendMode::Screen.apply(a, b, 0), make_rgb(137, 222, 243));
        assert_eq!(BlendMode::Additive.apply(a, b, 0), make_rgb(160, 255, 255));
        assert_eq!(BlendMode::Subtract.apply(a, b, 0), make_rgb(40, 100, 0));
        assert_eq!(BlendMode::Difference.apply(a, b, 0), make_rgb(40, 100, 200));
        // full transparency leaves the destination for every mode
        for &mode in BlendMode::all() {
            assert_eq!(mode.apply(a, b, 255), a, "{}", mode.name());
        }
    }

    #[test]
    fn alpha_sub_erases_without_touching_colour() {
        let a = make_rgba(12, 34, 56, 255);
        let erased = BlendMode::AlphaSub.apply(a, 0, 0);
        assert_eq!(get_a(erased), 0);
        assert_eq!(erased & 0x00FF_FFFF, a & 0x00FF_FFFF);
        assert_eq!(BlendMode::AlphaAdd.apply(make_rgba(1, 2, 3, 0), 0, 0), make_rgba(1, 2, 3, 255));
    }

    #[test]
    fn scale_val_full_range() {
        assert_eq!(scale_val(255, 255), 255);
        assert_eq!(scale_val(255, 0), 0);
        assert_eq!(scale_val(128, 255), 128);
    }

    #[test]
    fn diff32_is_symmetric() {
        let a = make_rgba(0, 0, 0, 0);
        let b = make_rgba(255, 255, 255, 255);
        assert_eq!(diff32(a, b), 4 * 255 * 255);
        assert_eq!(diff32(a, b), diff32(b, a));
    }
}
