//! Pure coordinate math for the annotation canvas.
//!
//! Everything here operates in image pixel space: the canvas is always
//! backed by the image at its natural size, and the display scaling is
//! undone up front by [`to_image_space`].

use crate::model::Rectangle;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Corner handles of a rectangle, in hit-test scan order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthEast,
    SouthWest,
}

impl Corner {
    /// Fixed scan order: first match wins.
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthEast,
        Corner::SouthWest,
    ];

    /// Position of this corner on a rectangle.
    pub fn of(self, rect: &Rectangle) -> Point {
        match self {
            Corner::NorthWest => Point::new(rect.x, rect.y),
            Corner::NorthEast => Point::new(rect.x + rect.width, rect.y),
            Corner::SouthEast => Point::new(rect.x + rect.width, rect.y + rect.height),
            Corner::SouthWest => Point::new(rect.x, rect.y + rect.height),
        }
    }

    /// The diagonally opposite corner, which stays fixed during a resize.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::NorthWest => Corner::SouthEast,
            Corner::NorthEast => Corner::SouthWest,
            Corner::SouthEast => Corner::NorthWest,
            Corner::SouthWest => Corner::NorthEast,
        }
    }
}

/// Map a pointer position on the displayed canvas back to image pixel
/// coordinates, undoing any display scaling. A zero display size would make
/// the scale factor undefined, so it falls back to a scale of 1.
pub fn to_image_space(canvas_size: (f32, f32), display_size: (f32, f32), pointer: Point) -> Point {
    let scale_x = if display_size.0 > 0.0 {
        canvas_size.0 / display_size.0
    } else {
        1.0
    };
    let scale_y = if display_size.1 > 0.0 {
        canvas_size.1 / display_size.1
    } else {
        1.0
    };
    Point::new(pointer.x * scale_x, pointer.y * scale_y)
}

/// Inclusive bounds test.
pub fn point_in_rect(p: Point, rect: &Rectangle) -> bool {
    p.x >= rect.x && p.x <= rect.x + rect.width && p.y >= rect.y && p.y <= rect.y + rect.height
}

/// Test the four corner handles, each a square region of side `handle_size`
/// centered on the corner. Scanned in [`Corner::ALL`] order; first hit wins.
pub fn hit_test_handles(p: Point, rect: &Rectangle, handle_size: f32) -> Option<Corner> {
    let half = handle_size / 2.0;
    Corner::ALL.into_iter().find(|corner| {
        let c = corner.of(rect);
        (p.x - c.x).abs() <= half && (p.y - c.y).abs() <= half
    })
}

/// Top-left corner and non-negative size of the axis-aligned bounding box of
/// two arbitrary points.
pub fn normalize_drag(anchor: Point, current: Point) -> (f32, f32, f32, f32) {
    let x = anchor.x.min(current.x);
    let y = anchor.y.min(current.y);
    let width = (current.x - anchor.x).abs();
    let height = (current.y - anchor.y).abs();
    (x, y, width, height)
}
