//! Geometric primitives for measuring diagrams and laying out PDF pages.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in SVG user space
//! - [`Size`] - Width and height dimensions
//! - [`Bounds`] - A rectangular bounding box defined by minimum and maximum coordinates
//! - [`PageLayout`] - A page sized to a bounding box plus a uniform margin
//!
//! # Coordinate System
//!
//! Coordinates follow SVG conventions:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```

/// Margin applied on each side of an exported diagram when none is configured.
pub const DEFAULT_PAGE_MARGIN: f32 = 20.0;

/// A 2D point in SVG user space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    x: f32,
    y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate
    pub fn x(self) -> f32 {
        self.x
    }

    /// Returns the y-coordinate
    pub fn y(self) -> f32 {
        self.y
    }
}

/// Width and height dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    /// Creates a new size with the given width and height
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns the width
    pub fn width(self) -> f32 {
        self.width
    }

    /// Returns the height
    pub fn height(self) -> f32 {
        self.height
    }

    /// Returns true if either dimension is zero
    pub fn is_zero(self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Represents a rectangular bounding box with minimum and maximum coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    /// Creates a new bounds from a top-left point and a size
    pub fn new_from_top_left(top_left: Point, size: Size) -> Self {
        Self {
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: top_left.x + size.width,
            max_y: top_left.y + size.height,
        }
    }

    /// Returns the minimum x-coordinate of the bounds
    pub fn min_x(self) -> f32 {
        self.min_x
    }

    /// Returns the minimum y-coordinate of the bounds
    pub fn min_y(self) -> f32 {
        self.min_y
    }

    /// Returns the width of the bounds
    pub fn width(self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds
    pub fn height(self) -> f32 {
        self.max_y - self.min_y
    }

    /// Returns the top-left corner as a Point
    pub fn min_point(self) -> Point {
        Point {
            x: self.min_x,
            y: self.min_y,
        }
    }

    /// Converts bounds to a Size object
    pub fn to_size(self) -> Size {
        Size {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Moves the bounds by the specified offset.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mermaid_pdf_core::geometry::{Bounds, Point, Size};
    /// let bounds = Bounds::new_from_top_left(Point::new(10.0, 20.0), Size::new(50.0, 30.0));
    ///
    /// let moved = bounds.translate(Point::new(-8.0, -8.0));
    /// assert_eq!(moved.min_x(), 2.0);
    /// assert_eq!(moved.min_y(), 12.0);
    /// assert_eq!(moved.width(), 50.0);
    /// ```
    pub fn translate(&self, offset: Point) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }
}

/// Page orientation of an exported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Portrait => write!(f, "portrait"),
            Self::Landscape => write!(f, "landscape"),
        }
    }
}

/// A page that fits a diagram's bounding box plus a uniform margin.
///
/// The diagram content is placed at `(margin, margin)` with the size of its
/// bounding box, so the page measures `bbox + 2 × margin` in each direction.
///
/// # Examples
///
/// ```
/// # use mermaid_pdf_core::geometry::{Bounds, Orientation, PageLayout, Point, Size};
/// let bbox = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(200.0, 100.0));
/// let page = PageLayout::fit(bbox, 20.0);
///
/// assert_eq!(page.size(), Size::new(240.0, 140.0));
/// assert_eq!(page.content_origin(), Point::new(20.0, 20.0));
/// assert_eq!(page.orientation(), Orientation::Landscape);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    content: Bounds,
    margin: f32,
}

impl PageLayout {
    /// Creates a page layout around `content` with `margin` on every side.
    pub fn fit(content: Bounds, margin: f32) -> Self {
        Self {
            content,
            margin: margin.max(0.0),
        }
    }

    /// Returns the diagram bounding box in the diagram's own user space.
    pub fn content(&self) -> Bounds {
        self.content
    }

    /// Returns the margin applied on each side.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Returns the full page size.
    pub fn size(&self) -> Size {
        Size::new(
            self.margin.mul_add(2.0, self.content.width()),
            self.margin.mul_add(2.0, self.content.height()),
        )
    }

    /// Returns where the top-left corner of the content lands on the page.
    pub fn content_origin(&self) -> Point {
        Point::new(self.margin, self.margin)
    }

    /// Landscape when the page is wider than it is tall, portrait otherwise.
    pub fn orientation(&self) -> Orientation {
        let size = self.size();
        if size.width() > size.height() {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}
