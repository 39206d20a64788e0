use serde::Serialize;

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn tl(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Bottom-right corner (exclusive).
    pub fn br(&self) -> (i32, i32) {
        (
            self.x.saturating_add(self.width as i32),
            self.y.saturating_add(self.height as i32),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangles returned by one detection call, in detector order.
///
/// No ordering guarantee and no overlap suppression beyond what the backend
/// itself applies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Detections {
    pub rects: Vec<Rect>,
}

impl Detections {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

impl From<Vec<Rect>> for Detections {
    fn from(rects: Vec<Rect>) -> Self {
        Self { rects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_size() {
        let rect = Rect::new(10, 20, 30, 40);
        assert_eq!(rect.tl(), (10, 20));
        assert_eq!(rect.br(), (40, 60));
        assert!(!rect.is_empty());
        assert!(Rect::new(0, 0, 0, 5).is_empty());
    }
}
