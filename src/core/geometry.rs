//! Integer and float rectangles plus a 2D affine matrix.
//!
//! Special images store their subset in absolute backing-store coordinates,
//! so nearly every operation in the crate funnels through [`IRect`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IPoint {
    pub x: i32,
    pub y: i32,
}

impl IPoint {
    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer size. Negative values are treated as empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ISize {
    pub width: i32,
    pub height: i32,
}

impl ISize {
    /// Create a new size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero or negative.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered, zero when empty.
    pub fn area(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }
}

/// Integer rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    /// Create a rectangle from its edges.
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::from_ltrb(x, y, x + width, y + height)
    }

    /// Create a rectangle at the origin with the given width and height.
    pub const fn from_wh(width: i32, height: i32) -> Self {
        Self::from_xywh(0, 0, width, height)
    }

    /// Create a rectangle at the origin covering `size`.
    pub const fn from_size(size: ISize) -> Self {
        Self::from_wh(size.width, size.height)
    }

    /// Left edge.
    pub fn x(&self) -> i32 {
        self.left
    }

    /// Top edge.
    pub fn y(&self) -> i32 {
        self.top
    }

    /// Width, which may be negative for malformed rectangles.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height, which may be negative for malformed rectangles.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Width and height as an [`ISize`].
    pub fn size(&self) -> ISize {
        ISize::new(self.width(), self.height())
    }

    /// Top-left corner.
    pub fn top_left(&self) -> IPoint {
        IPoint::new(self.left, self.top)
    }

    /// True if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// True if `other` is non-empty and lies entirely within `self`.
    pub fn contains(&self, other: &IRect) -> bool {
        !other.is_empty()
            && !self.is_empty()
            && self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// True if the pixel at (x, y) is inside the rectangle.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Intersection of two rectangles, or `None` if they do not overlap.
    pub fn intersect(&self, other: &IRect) -> Option<IRect> {
        let r = IRect::from_ltrb(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!r.is_empty()).then_some(r)
    }

    /// Translate the rectangle by (dx, dy).
    pub fn make_offset(&self, dx: i32, dy: i32) -> IRect {
        IRect::from_ltrb(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Translate the rectangle by a point.
    pub fn make_offset_point(&self, offset: IPoint) -> IRect {
        self.make_offset(offset.x, offset.y)
    }

    /// Convert to a float rectangle.
    pub fn to_rect(&self) -> Rect {
        Rect::from_ltrb(
            self.left as f32,
            self.top as f32,
            self.right as f32,
            self.bottom as f32,
        )
    }
}

impl fmt::Display for IRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}x{}]",
            self.left,
            self.top,
            self.width(),
            self.height()
        )
    }
}

/// Float rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Create a rectangle from its edges.
    pub const fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_ltrb(x, y, x + width, y + height)
    }

    /// Width.
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Height.
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    /// Smallest integer rectangle whose pixel centers cover this rectangle.
    ///
    /// A pixel is included when its center lies inside `self`.
    pub fn round(&self) -> IRect {
        IRect::from_ltrb(
            (self.left - 0.5).ceil() as i32,
            (self.top - 0.5).ceil() as i32,
            (self.right - 0.5).ceil() as i32,
            (self.bottom - 0.5).ceil() as i32,
        )
    }
}

/// 2x3 affine transform mapping (x, y) to
/// (sx * x + kx * y + tx, ky * x + sy * y + ty).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub sx: f32,
    pub kx: f32,
    pub tx: f32,
    pub ky: f32,
    pub sy: f32,
    pub ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Matrix = Matrix {
        sx: 1.0,
        kx: 0.0,
        tx: 0.0,
        ky: 0.0,
        sy: 1.0,
        ty: 0.0,
    };

    /// Pure translation.
    pub fn translate(dx: f32, dy: f32) -> Self {
        Self {
            tx: dx,
            ty: dy,
            ..Self::IDENTITY
        }
    }

    /// Pure scale.
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            sx,
            sy,
            ..Self::IDENTITY
        }
    }

    /// Transform mapping `src` onto `dst` (scale then translate).
    pub fn rect_to_rect(src: &Rect, dst: &Rect) -> Option<Self> {
        if src.is_empty() || dst.is_empty() {
            return None;
        }
        let sx = dst.width() / src.width();
        let sy = dst.height() / src.height();
        Some(Self {
            sx,
            sy,
            tx: dst.left - src.left * sx,
            ty: dst.top - src.top * sy,
            ..Self::IDENTITY
        })
    }

    /// True if this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True if the transform is a translation only.
    pub fn is_translate(&self) -> bool {
        self.sx == 1.0 && self.sy == 1.0 && self.kx == 0.0 && self.ky == 0.0
    }

    /// Returns `self * other`: `other` is applied first, then `self`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            sx: self.sx * other.sx + self.kx * other.ky,
            kx: self.sx * other.kx + self.kx * other.sy,
            tx: self.sx * other.tx + self.kx * other.ty + self.tx,
            ky: self.ky * other.sx + self.sy * other.ky,
            sy: self.ky * other.kx + self.sy * other.sy,
            ty: self.ky * other.tx + self.sy * other.ty + self.ty,
        }
    }

    /// Returns `other * self`: `self` is applied first, then `other`.
    pub fn post_concat(&self, other: &Matrix) -> Matrix {
        other.concat(self)
    }

    /// Inverse transform, or `None` if the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.sx * self.sy - self.kx * self.ky;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix {
            sx: self.sy * inv,
            kx: -self.kx * inv,
            tx: (self.kx * self.ty - self.sy * self.tx) * inv,
            ky: -self.ky * inv,
            sy: self.sx * inv,
            ty: (self.ky * self.tx - self.sx * self.ty) * inv,
        })
    }

    /// Map a point through the transform.
    pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.sx * x + self.kx * y + self.tx,
            self.ky * x + self.sy * y + self.ty,
        )
    }

    /// Bounding box of the mapped rectangle.
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.map_point(rect.left, rect.top),
            self.map_point(rect.right, rect.top),
            self.map_point(rect.left, rect.bottom),
            self.map_point(rect.right, rect.bottom),
        ];
        let mut out = Rect::from_ltrb(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            out.left = out.left.min(x);
            out.top = out.top.min(y);
            out.right = out.right.max(x);
            out.bottom = out.bottom.max(y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irect_basics() {
        let r = IRect::from_xywh(2, 3, 10, 5);
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 5);
        assert_eq!(r.top_left(), IPoint::new(2, 3));
        assert!(!r.is_empty());
        assert!(IRect::from_xywh(0, 0, 0, 4).is_empty());
    }

    #[test]
    fn test_irect_contains() {
        let outer = IRect::from_wh(10, 10);
        assert!(outer.contains(&IRect::from_xywh(2, 2, 8, 8)));
        assert!(!outer.contains(&IRect::from_xywh(2, 2, 9, 8)));
        assert!(!outer.contains(&IRect::from_xywh(-1, 0, 2, 2)));
        assert!(!outer.contains(&IRect::from_wh(0, 0)));
    }

    #[test]
    fn test_irect_intersect() {
        let a = IRect::from_wh(10, 10);
        let b = IRect::from_xywh(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(IRect::from_xywh(5, 5, 5, 5)));
        assert_eq!(a.intersect(&IRect::from_xywh(10, 0, 5, 5)), None);
    }

    #[test]
    fn test_rect_round_uses_pixel_centers() {
        let r = Rect::from_ltrb(0.4, 0.6, 2.5, 3.0);
        assert_eq!(r.round(), IRect::from_ltrb(0, 1, 2, 3));
    }

    #[test]
    fn test_matrix_invert_and_concat() {
        let m = Matrix::translate(3.0, -2.0).concat(&Matrix::scale(2.0, 4.0));
        assert_eq!(m.map_point(1.0, 1.0), (5.0, 2.0));

        let inv = m.invert().unwrap();
        let (x, y) = inv.map_point(5.0, 2.0);
        assert!((x - 1.0).abs() < 1e-6 && (y - 1.0).abs() < 1e-6);

        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_rect_to_rect() {
        let src = Rect::from_xywh(10.0, 10.0, 4.0, 4.0);
        let dst = Rect::from_xywh(0.0, 0.0, 8.0, 8.0);
        let m = Matrix::rect_to_rect(&src, &dst).unwrap();
        assert_eq!(m.map_point(10.0, 10.0), (0.0, 0.0));
        assert_eq!(m.map_point(14.0, 14.0), (8.0, 8.0));
    }
}
