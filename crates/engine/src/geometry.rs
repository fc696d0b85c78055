use std::ops::{Add, Sub};

use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    pub const ZERO: IVec2 = IVec2 { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn checked_add(self, rhs: IVec2) -> Option<IVec2> {
        Some(IVec2::new(self.x.checked_add(rhs.x)?, self.y.checked_add(rhs.y)?))
    }

    pub fn checked_sub(self, rhs: IVec2) -> Option<IVec2> {
        Some(IVec2::new(self.x.checked_sub(rhs.x)?, self.y.checked_sub(rhs.y)?))
    }

    pub fn saturating_add(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Add for IVec2 {
    type Output = IVec2;

    fn add(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for IVec2 {
    type Output = IVec2;

    fn sub(self, rhs: IVec2) -> IVec2 {
        IVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Axis-aligned integer rectangle with raster conventions: `right` and
/// `bottom` are exclusive and `center` rounds toward the top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_origin(origin: IVec2, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.w, size.h)
    }

    /// Builds a rect of `size` whose `anchor` point lands exactly on `point`.
    pub fn anchored(anchor: Anchor, point: IVec2, size: Size) -> Self {
        let (fx, fy) = anchor.factors();
        let x = point.x - axis_offset(fx, size.w);
        let y = point.y - axis_offset(fy, size.h);
        Self::new(x, y, size.w, size.h)
    }

    /// Like [`Rect::anchored`], but `None` when the rect would not fit the
    /// `i32` coordinate range.
    pub fn checked_anchored(anchor: Anchor, point: IVec2, size: Size) -> Option<Self> {
        let (fx, fy) = anchor.factors();
        let x = i64::from(point.x) - wide_axis_offset(fx, size.w);
        let y = i64::from(point.y) - wide_axis_offset(fy, size.h);
        let rect = Self::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?, size.w, size.h);
        rect.edges_in_range().then_some(rect)
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    /// Both extents and the exclusive `right`/`bottom` edges fit in `i32`.
    pub fn edges_in_range(&self) -> bool {
        let fits = |start: i32, extent: u32| {
            i32::try_from(extent).is_ok()
                && i32::try_from(i64::from(start) + i64::from(extent)).is_ok()
        };
        fits(self.x, self.w) && fits(self.y, self.h)
    }

    pub fn top_left(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    pub fn center(&self) -> IVec2 {
        IVec2::new(self.x + (self.w / 2) as i32, self.y + (self.h / 2) as i32)
    }

    pub fn set_center(&mut self, center: IVec2) {
        self.x = center.x - (self.w / 2) as i32;
        self.y = center.y - (self.h / 2) as i32;
    }

    pub fn set_top_left(&mut self, top_left: IVec2) {
        self.x = top_left.x;
        self.y = top_left.y;
    }

    pub fn anchor_point(&self, anchor: Anchor) -> IVec2 {
        let (fx, fy) = anchor.factors();
        IVec2::new(
            self.x + axis_offset(fx, self.w),
            self.y + axis_offset(fy, self.h),
        )
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Positive-area overlap; rects that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.has_area()
            && other.has_area()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, point: IVec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }

    pub fn translate(&mut self, delta: IVec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    pub fn translated(mut self, delta: IVec2) -> Rect {
        self.translate(delta);
        self
    }

    pub fn checked_translated(self, delta: IVec2) -> Option<Rect> {
        let top_left = self.top_left().checked_add(delta)?;
        let moved = Rect::from_origin(top_left, self.size());
        moved.edges_in_range().then_some(moved)
    }

    /// Grows the rect by `margin` on every side. Negative margins shrink it,
    /// clamping the size at zero.
    pub fn inflate(&self, margin: IVec2) -> Rect {
        let w = (self.w as i64 + 2 * margin.x as i64).max(0) as u32;
        let h = (self.h as i64 + 2 * margin.y as i64).max(0) as u32;
        Rect::new(self.x - margin.x, self.y - margin.y, w, h)
    }
}

fn axis_offset(factor: AnchorAxis, extent: u32) -> i32 {
    match factor {
        AnchorAxis::Start => 0,
        AnchorAxis::Middle => (extent / 2) as i32,
        AnchorAxis::End => extent as i32,
    }
}

fn wide_axis_offset(factor: AnchorAxis, extent: u32) -> i64 {
    match factor {
        AnchorAxis::Start => 0,
        AnchorAxis::Middle => i64::from(extent / 2),
        AnchorAxis::End => i64::from(extent),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorAxis {
    Start,
    Middle,
    End,
}

/// Reference point of a rect that a persisted position refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    #[default]
    TopLeft,
    MidTop,
    TopRight,
    MidLeft,
    Center,
    MidRight,
    BottomLeft,
    MidBottom,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorParseError {
    #[error("unknown anchor name '{name}'")]
    UnknownName { name: String },
    #[error("anchor digit must be 1-9, got {digit}")]
    InvalidDigit { digit: u8 },
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::MidTop,
        Anchor::TopRight,
        Anchor::MidLeft,
        Anchor::Center,
        Anchor::MidRight,
        Anchor::BottomLeft,
        Anchor::MidBottom,
        Anchor::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Anchor::TopLeft => "topleft",
            Anchor::MidTop => "midtop",
            Anchor::TopRight => "topright",
            Anchor::MidLeft => "midleft",
            Anchor::Center => "center",
            Anchor::MidRight => "midright",
            Anchor::BottomLeft => "bottomleft",
            Anchor::MidBottom => "midbottom",
            Anchor::BottomRight => "bottomright",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, AnchorParseError> {
        Anchor::ALL
            .into_iter()
            .find(|anchor| anchor.name() == name)
            .ok_or_else(|| AnchorParseError::UnknownName {
                name: name.to_string(),
            })
    }

    /// Numeric keypad layout: 7 is top-left, 5 is center, 3 is bottom-right.
    pub fn digit(self) -> u8 {
        match self {
            Anchor::BottomLeft => 1,
            Anchor::MidBottom => 2,
            Anchor::BottomRight => 3,
            Anchor::MidLeft => 4,
            Anchor::Center => 5,
            Anchor::MidRight => 6,
            Anchor::TopLeft => 7,
            Anchor::MidTop => 8,
            Anchor::TopRight => 9,
        }
    }

    pub fn from_digit(digit: u8) -> Result<Self, AnchorParseError> {
        Anchor::ALL
            .into_iter()
            .find(|anchor| anchor.digit() == digit)
            .ok_or(AnchorParseError::InvalidDigit { digit })
    }

    fn factors(self) -> (AnchorAxis, AnchorAxis) {
        use AnchorAxis::{End, Middle, Start};
        match self {
            Anchor::TopLeft => (Start, Start),
            Anchor::MidTop => (Middle, Start),
            Anchor::TopRight => (End, Start),
            Anchor::MidLeft => (Start, Middle),
            Anchor::Center => (Middle, Middle),
            Anchor::MidRight => (End, Middle),
            Anchor::BottomLeft => (Start, End),
            Anchor::MidBottom => (Middle, End),
            Anchor::BottomRight => (End, End),
        }
    }
}

/// Top-left corner of the scrolled unit-grid cell containing `point`.
pub fn snap_to_grid(point: IVec2, scroll: IVec2, unit: Size) -> IVec2 {
    let unit_w = unit.w.max(1) as i32;
    let unit_h = unit.h.max(1) as i32;
    let scroll_rest_x = scroll.x.rem_euclid(unit_w);
    let scroll_rest_y = scroll.y.rem_euclid(unit_h);
    let x_rest = (point.x - scroll_rest_x).rem_euclid(unit_w);
    let y_rest = (point.y - scroll_rest_y).rem_euclid(unit_h);
    IVec2::new(point.x - x_rest, point.y - y_rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9, 9, 10, 10)));
    }

    #[test]
    fn zero_sized_rect_never_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(!a.intersects(&Rect::new(5, 5, 0, 3)));
    }

    #[test]
    fn contains_point_is_half_open() {
        let r = Rect::new(0, 0, 16, 16);
        assert!(r.contains_point(IVec2::new(0, 0)));
        assert!(r.contains_point(IVec2::new(15, 15)));
        assert!(!r.contains_point(IVec2::new(16, 0)));
    }

    #[test]
    fn anchored_round_trips_for_every_anchor() {
        let size = Size::new(17, 9);
        let point = IVec2::new(-13, 40);
        for anchor in Anchor::ALL {
            let rect = Rect::anchored(anchor, point, size);
            assert_eq!(rect.anchor_point(anchor), point, "anchor={}", anchor.name());
            assert_eq!(rect.size(), size);
        }
    }

    #[test]
    fn set_center_round_trips_with_odd_sizes() {
        let mut rect = Rect::new(3, 4, 15, 7);
        rect.set_center(IVec2::new(-100, 55));
        assert_eq!(rect.center(), IVec2::new(-100, 55));
    }

    #[test]
    fn union_and_inflate() {
        let u = Rect::new(0, 0, 16, 16).union(&Rect::new(400, 20, 16, 16));
        assert_eq!(u, Rect::new(0, 0, 416, 36));
        let grown = Rect::new(0, 0, 320, 180).inflate(IVec2::new(10, 5));
        assert_eq!(grown, Rect::new(-10, -5, 340, 190));
    }

    #[test]
    fn anchor_names_and_digits_are_bijective() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::from_name(anchor.name()), Ok(anchor));
            assert_eq!(Anchor::from_digit(anchor.digit()), Ok(anchor));
        }
        assert!(Anchor::from_name("middle").is_err());
        assert_eq!(
            Anchor::from_digit(0),
            Err(AnchorParseError::InvalidDigit { digit: 0 })
        );
    }

    #[test]
    fn snap_follows_scrolled_grid() {
        let unit = Size::new(16, 16);
        assert_eq!(
            snap_to_grid(IVec2::new(20, 33), IVec2::ZERO, unit),
            IVec2::new(16, 32)
        );
        assert_eq!(
            snap_to_grid(IVec2::new(20, 33), IVec2::new(4, -4), unit),
            IVec2::new(20, 28)
        );
    }

    #[test]
    fn checked_geometry_rejects_out_of_range_edges() {
        let rect = Rect::new(i32::MAX - 20, 0, 16, 16);
        assert_eq!(
            rect.checked_translated(IVec2::new(4, 0)),
            Some(Rect::new(i32::MAX - 16, 0, 16, 16))
        );
        assert_eq!(rect.checked_translated(IVec2::new(5, 0)), None);
        assert_eq!(
            rect.checked_translated(IVec2::new(0, i32::MIN)),
            Some(Rect::new(i32::MAX - 20, i32::MIN, 16, 16))
        );

        assert_eq!(
            Rect::checked_anchored(Anchor::MidBottom, IVec2::new(40, 160), Size::new(16, 32)),
            Some(Rect::new(32, 128, 16, 32))
        );
        assert_eq!(
            Rect::checked_anchored(Anchor::TopLeft, IVec2::ZERO, Size::new(u32::MAX, 16)),
            None
        );
        assert_eq!(
            Rect::checked_anchored(Anchor::BottomRight, IVec2::new(i32::MIN, 0), Size::new(1, 1)),
            None
        );
    }
}
