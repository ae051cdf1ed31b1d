use serde::{Deserialize, Serialize};

/// A point on the canvas, in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Axis-aligned box in pixel coordinates: `[x_min, y_min, x_max, y_max]`.
///
/// Degenerate boxes (zero width or height) are allowed. Ordering of the
/// corners is not checked here; annotations are validated when they are
/// ingested by an asset provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x_min + self.width() / 2.0,
            self.y_min + self.height() / 2.0,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x_min, self.y_min),
            Point::new(self.x_max, self.y_min),
            Point::new(self.x_min, self.y_max),
            Point::new(self.x_max, self.y_max),
        ]
    }

    /// Linearly rescale every coordinate (reference resolution -> canvas)
    pub fn scale(&self, factor: f64) -> Self {
        Self::new(
            self.x_min * factor,
            self.y_min * factor,
            self.x_max * factor,
            self.y_max * factor,
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.x_min + dx,
            self.y_min + dy,
            self.x_max + dx,
            self.y_max + dy,
        )
    }

    /// Area with the +1 pixel boundary convention used by `overlap_ratio`
    fn pixel_area(&self) -> f64 {
        (self.x_max - self.x_min + 1.0) * (self.y_max - self.y_min + 1.0)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        BoundingBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

/// Intersection-over-union of two boxes, in `[0, 1]`.
///
/// Every extent is measured as `max - min + 1`, so the union of two finite
/// boxes is at least one pixel and the division is always defined.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x_a = a.x_min.max(b.x_min);
    let y_a = a.y_min.max(b.y_min);
    let x_b = a.x_max.min(b.x_max);
    let y_b = a.y_max.min(b.y_max);

    let inter_area = (x_b - x_a + 1.0).max(0.0) * (y_b - y_a + 1.0).max(0.0);
    let union_area = a.pixel_area() + b.pixel_area() - inter_area;

    inter_area / union_area
}

/// Inclusive point-in-box test; a click on an edge counts as a hit
pub fn contains(bbox: &BoundingBox, x: f64, y: f64) -> bool {
    bbox.x_min <= x && x <= bbox.x_max && bbox.y_min <= y && y <= bbox.y_max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_overlap_ratio_identity() {
        let a = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        assert!(approx(overlap_ratio(&a, &a), 1.0));

        let degenerate = BoundingBox::new(10.0, 10.0, 10.0, 10.0);
        assert!(approx(overlap_ratio(&degenerate, &degenerate), 1.0));
    }

    #[test]
    fn test_overlap_ratio_disjoint_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let right = BoundingBox::new(20.0, 0.0, 30.0, 10.0);
        let below = BoundingBox::new(0.0, 20.0, 10.0, 30.0);

        assert_eq!(overlap_ratio(&a, &right), 0.0);
        assert_eq!(overlap_ratio(&a, &below), 0.0);
    }

    #[test]
    fn test_overlap_ratio_is_symmetric() {
        let a = BoundingBox::new(12.0, 40.0, 80.0, 95.0);
        let b = BoundingBox::new(30.0, 10.0, 140.0, 60.0);
        assert!(approx(overlap_ratio(&a, &b), overlap_ratio(&b, &a)));
    }

    #[test]
    fn test_overlap_ratio_shifted_box() {
        let truth = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        let predicted = BoundingBox::new(110.0, 110.0, 210.0, 210.0);

        // 91*91 / (2*101*101 - 91*91)
        let ratio = overlap_ratio(&truth, &predicted);
        assert!((ratio - 0.6832).abs() < 1e-3, "got {ratio}");
        assert!(ratio > 0.5);
    }

    #[test]
    fn test_overlap_ratio_touching_edges_counts_one_pixel() {
        let a = BoundingBox::new(0.0, 0.0, 9.0, 9.0);
        let b = BoundingBox::new(9.0, 0.0, 18.0, 9.0);
        let ratio = overlap_ratio(&a, &b);
        assert!(ratio > 0.0 && ratio < 0.1);
    }

    #[test]
    fn test_overlap_ratio_bounded() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(25.0, 25.0, 75.0, 75.0);
        let ratio = overlap_ratio(&a, &b);
        assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn test_contains_corners_and_center() {
        let truth = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        for corner in truth.corners() {
            assert!(contains(&truth, corner.x, corner.y));
        }
        assert!(contains(&truth, 150.0, 150.0));
    }

    #[test]
    fn test_contains_outside() {
        let truth = BoundingBox::new(100.0, 100.0, 200.0, 200.0);
        assert!(!contains(&truth, 99.9, 150.0));
        assert!(!contains(&truth, 150.0, 200.1));
        assert!(!contains(&truth, 0.0, 0.0));
    }

    #[test]
    fn test_scale_and_center() {
        let b = BoundingBox::new(100.0, 50.0, 200.0, 150.0).scale(0.5);
        assert_eq!(b, BoundingBox::new(50.0, 25.0, 100.0, 75.0));
        assert_eq!(b.center(), Point::new(75.0, 50.0));
    }

    #[test]
    fn test_serde_as_array() {
        let b: BoundingBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(b, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
