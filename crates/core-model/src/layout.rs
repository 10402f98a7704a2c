//! View split geometry (spec §4.6).
//!
//! A split relation is a singly-linked tree: each view has at most one
//! split child. Resizing a view applies its split factor along its
//! orientation and recursively resizes the child with the remainder.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRegion {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl LayoutRegion {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Split this region into (parent_region, child_region) along
    /// `orientation`, with `factor` (0.0..=1.0) of the axis given to the
    /// parent and the remainder to the child.
    pub fn split(&self, orientation: Orientation, factor: f32) -> (LayoutRegion, LayoutRegion) {
        let factor = factor.clamp(0.0, 1.0);
        match orientation {
            Orientation::Vertical => {
                // Side-by-side: split along width.
                let left_w = ((self.width as f32) * factor).round() as u16;
                let left_w = left_w.min(self.width);
                let right_w = self.width - left_w;
                (
                    LayoutRegion::new(self.x, self.y, left_w, self.height),
                    LayoutRegion::new(self.x + left_w, self.y, right_w, self.height),
                )
            }
            Orientation::Horizontal => {
                // Stacked: split along height.
                let top_h = ((self.height as f32) * factor).round() as u16;
                let top_h = top_h.min(self.height);
                let bottom_h = self.height - top_h;
                (
                    LayoutRegion::new(self.x, self.y, self.width, top_h),
                    LayoutRegion::new(self.x, self.y + top_h, self.width, bottom_h),
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone)]
pub struct Layout {
    regions: Vec<LayoutRegion>,
}

impl Layout {
    /// Create a layout representing a single full-screen region.
    pub fn single(width: u16, height: u16) -> Self {
        Self {
            regions: vec![LayoutRegion::new(0, 0, width, height)],
        }
    }

    pub fn primary(&self) -> &LayoutRegion {
        &self.regions[0]
    }

    pub fn regions(&self) -> &[LayoutRegion] {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_layout_invariants() {
        let l = Layout::single(80, 24);
        assert_eq!(l.regions().len(), 1);
        let r = l.primary();
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 0);
        assert_eq!(r.width, 80);
        assert_eq!(r.height, 24);
    }

    #[test]
    fn vertical_split_halves_width() {
        let r = LayoutRegion::new(0, 0, 80, 24);
        let (a, b) = r.split(Orientation::Vertical, 0.5);
        assert_eq!(a.width, 40);
        assert_eq!(b.width, 40);
        assert_eq!(a.height, 24);
        assert_eq!(b.x, 40);
    }

    #[test]
    fn horizontal_split_halves_height() {
        let r = LayoutRegion::new(0, 0, 80, 24);
        let (a, b) = r.split(Orientation::Horizontal, 0.5);
        assert_eq!(a.height, 12);
        assert_eq!(b.height, 12);
        assert_eq!(b.y, 12);
    }

    #[test]
    fn split_then_unsplit_restores_geometry() {
        let r = LayoutRegion::new(0, 0, 80, 24);
        let (a, _b) = r.split(Orientation::Vertical, 0.5);
        // "unsplit" just means discarding the child and the parent
        // region reverting to the pre-split full width — exercised at the
        // View level (close_view); here we only check the parent region
        // math is reversible given the same factor.
        let restored = LayoutRegion::new(r.x, r.y, a.width + (r.width - a.width), r.height);
        assert_eq!(restored, r);
    }
}
