//! Per-pixel collision masks
//!
//! A mask mirrors one visual frame: a pixel is solid when its alpha is above
//! half. The opaque count and tight bounds are cached because the collision
//! passes query them many times per frame.

use image::RgbaImage;

use super::rect::Rect;

/// Alpha above this value counts as solid
pub const ALPHA_THRESHOLD: u8 = 127;

#[derive(Clone, PartialEq, Eq)]
pub struct CollisionMask {
    width: i32,
    height: i32,
    bits: Vec<bool>,
    count: usize,
    bounds: Option<Rect>,
}

impl std::fmt::Debug for CollisionMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionMask")
            .field("size", &(self.width, self.height))
            .field("count", &self.count)
            .field("bounds", &self.bounds)
            .finish()
    }
}

impl CollisionMask {
    /// Fully transparent mask
    pub fn empty(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        Self {
            width: w,
            height: h,
            bits: vec![false; (w * h) as usize],
            count: 0,
            bounds: None,
        }
    }

    /// Fully solid mask
    pub fn solid(width: u32, height: u32) -> Self {
        let mut mask = Self::empty(width, height);
        mask.bits.fill(true);
        mask.refresh();
        mask
    }

    /// Build from a frame's alpha channel, optionally mirrored horizontally
    pub fn from_frame(frame: &RgbaImage, flip_x: bool) -> Self {
        let (w, h) = frame.dimensions();
        let mut mask = Self::empty(w, h);
        for (x, y, pixel) in frame.enumerate_pixels() {
            if pixel.0[3] > ALPHA_THRESHOLD {
                let mx = if flip_x { w - 1 - x } else { x };
                mask.bits[(y * w + mx) as usize] = true;
            }
        }
        mask.refresh();
        mask
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Number of solid pixels
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: i32, y: i32, solid: bool) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.bits[(y * self.width + x) as usize] = solid;
        self.refresh();
    }

    /// Tight bounding rectangle of all solid pixels, in mask-local coordinates
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// True if any solid pixel of `other`, placed at `offset` relative to
    /// this mask's origin, lands on a solid pixel of this mask.
    pub fn overlaps(&self, other: &CollisionMask, offset: (i32, i32)) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let (ox, oy) = offset;
        let x0 = ox.max(0);
        let y0 = oy.max(0);
        let x1 = (ox + other.width).min(self.width);
        let y1 = (oy + other.height).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return false;
        }
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            let other_row = ((y - oy) * other.width) as usize;
            for x in x0..x1 {
                if self.bits[row + x as usize] && other.bits[other_row + (x - ox) as usize] {
                    return true;
                }
            }
        }
        false
    }

    /// Clear the top `rows` rows of the solid region so a decorative top edge
    /// does not snag movers. Rows are counted from the tight bounds.
    pub fn trim_top(&mut self, rows: u32) {
        let Some(bounds) = self.bounds else {
            return;
        };
        if rows == 0 || bounds.h == 0 {
            return;
        }
        let limit = (bounds.top() + rows as i32).min(bounds.bottom());
        for y in bounds.top()..limit {
            for x in bounds.left()..bounds.right() {
                self.bits[(y * self.width + x) as usize] = false;
            }
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        let mut count = 0;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.bits[(y * self.width + x) as usize] {
                    count += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        self.count = count;
        self.bounds = (count > 0).then(|| Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn frame_with_box(w: u32, h: u32, solid: Rect) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            let (x, y) = (x as i32, y as i32);
            let inside = x >= solid.left() && x < solid.right() && y >= solid.top() && y < solid.bottom();
            if inside {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_tight_bounds_from_alpha() {
        let frame = frame_with_box(20, 20, Rect::new(4, 6, 8, 10));
        let mask = CollisionMask::from_frame(&frame, false);
        assert_eq!(mask.count(), 80);
        assert_eq!(mask.bounds(), Some(Rect::new(4, 6, 8, 10)));
    }

    #[test]
    fn test_half_alpha_is_not_solid() {
        let frame = RgbaImage::from_pixel(4, 4, Rgba([10, 10, 10, 127]));
        let mask = CollisionMask::from_frame(&frame, false);
        assert!(mask.is_empty());
        assert_eq!(mask.bounds(), None);
    }

    #[test]
    fn test_flip_mirrors_bounds() {
        let frame = frame_with_box(20, 10, Rect::new(0, 0, 5, 10));
        let mask = CollisionMask::from_frame(&frame, true);
        assert_eq!(mask.bounds(), Some(Rect::new(15, 0, 5, 10)));
    }

    #[test]
    fn test_overlap_at_offset() {
        let a = CollisionMask::solid(10, 10);
        let b = CollisionMask::solid(10, 10);
        assert!(a.overlaps(&b, (9, 9)));
        assert!(!a.overlaps(&b, (10, 0)));
        assert!(!a.overlaps(&b, (0, -10)));
        assert!(a.overlaps(&b, (-9, 0)));
    }

    #[test]
    fn test_overlap_needs_solid_pixels_on_both_sides() {
        let ring = CollisionMask::from_frame(&frame_with_box(10, 10, Rect::new(0, 0, 10, 2)), false);
        let probe = CollisionMask::solid(2, 2);
        assert!(!ring.overlaps(&probe, (4, 5)));
        assert!(ring.overlaps(&probe, (4, 1)));
    }

    #[test]
    fn test_empty_mask_never_overlaps() {
        let empty = CollisionMask::empty(10, 10);
        let solid = CollisionMask::solid(10, 10);
        assert!(!empty.overlaps(&solid, (0, 0)));
        assert!(!solid.overlaps(&empty, (0, 0)));
    }

    #[test]
    fn test_trim_top_from_tight_bounds() {
        let frame = frame_with_box(10, 40, Rect::new(0, 10, 10, 30));
        let mut mask = CollisionMask::from_frame(&frame, false);
        mask.trim_top(16);
        assert_eq!(mask.bounds(), Some(Rect::new(0, 26, 10, 14)));

        let mut thin = CollisionMask::solid(10, 8);
        thin.trim_top(16);
        assert!(thin.is_empty());
    }
}
