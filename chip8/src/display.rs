//! Monochrome display buffer.
use std::fmt;

use crate::constants::*;

/// 64x32 display with one bit per pixel.
///
/// Each row is packed into a `u64` with the most significant bit
/// being the leftmost column, so a sprite row can be positioned
/// with a single rotate, which also takes care of horizontal wrapping.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [u64; DISPLAY_HEIGHT],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            rows: [0; DISPLAY_HEIGHT],
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// Turn every pixel off.
    #[inline]
    pub fn clear(&mut self) {
        self.rows.fill(0);
    }

    /// Packed rows, top to bottom.
    #[inline(always)]
    pub fn rows(&self) -> &[u64; DISPLAY_HEIGHT] {
        &self.rows
    }

    /// State of the pixel at the given coordinate.
    ///
    /// Coordinates outside the display wrap around.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let row = self.rows[y & DISPLAY_HEIGHT_MASK];
        (row >> (DISPLAY_WIDTH_MASK - (x & DISPLAY_WIDTH_MASK))) & 1 == 1
    }

    /// Iterate all pixels in row-major order.
    pub fn iter_pixels(&self) -> impl Iterator<Item = bool> + '_ {
        self.rows.iter().flat_map(|row| {
            (0..DISPLAY_WIDTH).map(move |x| (row >> (DISPLAY_WIDTH_MASK - x)) & 1 == 1)
        })
    }

    /// Check whether no pixel is lit.
    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|row| *row == 0)
    }

    /// XOR one 8 pixel sprite row onto the display, with its leftmost
    /// pixel at `(x, y)`.
    ///
    /// Pixels past the right edge continue on the left edge of the same
    /// row, and rows past the bottom edge continue at the top.
    ///
    /// Returns `true` when a lit pixel was turned off.
    #[inline]
    pub fn draw_row(&mut self, x: usize, y: usize, sprite_row: u8) -> bool {
        let bits = ((sprite_row as u64) << (DISPLAY_WIDTH - 8))
            .rotate_right((x & DISPLAY_WIDTH_MASK) as u32);
        let row = &mut self.rows[y & DISPLAY_HEIGHT_MASK];

        // XOR erases a pixel when both the old and new values are both 1.
        let erased = *row & bits != 0;
        *row ^= bits;

        erased
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter() {
            for x in 0..DISPLAY_WIDTH {
                if (row >> (DISPLAY_WIDTH_MASK - x)) & 1 == 1 {
                    write!(f, "#")?;
                } else {
                    write!(f, ".")?;
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Framebuffer {{")?;
        fmt::Display::fmt(self, f)?;
        write!(f, "}}")
    }
}
