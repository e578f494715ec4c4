//! Axis-aligned rectangles as reported by both dumps.
//!
//! Dumps print rectangles as edges (`left, top, right, bottom`); the model
//! stores origin plus size. Edge arithmetic saturates at the `i32` range.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from its four edges.
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    /// Rectangle anchored at the origin, as used for display sizes.
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub const fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub const fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.x,
            self.y,
            self.right(),
            self.bottom()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ltrb_converts_edges_to_size() {
        let rect = Rect::from_ltrb(10, 20, 110, 220);
        assert_eq!(rect, Rect::new(10, 20, 100, 200));
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 220);
    }

    #[test]
    fn from_ltrb_keeps_negative_origins() {
        let rect = Rect::from_ltrb(-540, 0, 540, 1920);
        assert_eq!(rect.x, -540);
        assert_eq!(rect.width, 1080);
    }

    #[test]
    fn extreme_edges_saturate() {
        let rect = Rect::from_ltrb(i32::MIN, 0, i32::MAX, 1);
        assert_eq!(rect.width, i32::MAX);
        assert_eq!(rect.height, 1);
        assert_eq!(Rect::new(i32::MAX, 0, 10, 10).right(), i32::MAX);
        assert_eq!(Rect::new(0, i32::MIN, 10, -10).bottom(), i32::MIN);
    }

    #[test]
    fn equality_requires_all_fields() {
        assert_ne!(Rect::new(0, 0, 10, 10), Rect::new(1, 0, 10, 10));
        assert_ne!(Rect::new(0, 0, 10, 10), Rect::new(0, 0, 10, 11));
    }

    #[test]
    fn orientation_follows_aspect() {
        assert!(Rect::sized(1920, 1080).is_landscape());
        assert!(Rect::sized(1080, 1920).is_portrait());
        let square = Rect::sized(100, 100);
        assert!(!square.is_landscape() && !square.is_portrait());
    }

    #[test]
    fn display_prints_edges() {
        assert_eq!(Rect::new(0, 63, 1080, 1731).to_string(), "[0,63][1080,1794]");
    }
}
