use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Axis-aligned longitude/latitude rectangle.
///
/// [`BoundingBox::EMPTY`] (min at `+∞`, max at `−∞`) is the identity of [`extend`](Self::extend),
/// which makes it a convenient starting value when accumulating the extent of many tiles.
///
/// ```
/// # use sfile_tile_utils::BoundingBox;
/// let mut bbox = BoundingBox::EMPTY;
/// bbox.extend(&BoundingBox::new(0.0, 0.0, 1.0, 1.0));
/// bbox.extend(&BoundingBox::new(2.0, -1.0, 3.0, 0.5));
/// assert_eq!(bbox, BoundingBox::new(0.0, -1.0, 3.0, 1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    #[must_use]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Grow this box to the union of itself and `other`.
    pub fn extend(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Midpoint as `(longitude, latitude)`, `None` for an empty box.
    #[must_use]
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            None
        } else {
            Some((
                0.5 * (self.min_x + self.max_x),
                0.5 * (self.min_y + self.max_y),
            ))
        }
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        if let Some(p) = f.precision() {
            write!(
                f,
                "{:.p$},{:.p$},{:.p$},{:.p$}",
                self.min_x, self.min_y, self.max_x, self.max_y
            )
        } else {
            write!(
                f,
                "{},{},{},{}",
                self.min_x, self.min_y, self.max_x, self.max_y
            )
        }
    }
}
