//! Detection overlays drawn onto the color buffer.
//!
//! Each rectangle gets a thick outline and a text label anchored at its
//! top-left corner. Labels are rendered with a built-in 5x7 bitmap font
//! scaled up, with the baseline on the anchor point.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as PixelRect;
use serde::Serialize;

use crate::detect::{Detections, Rect};

pub const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BOX_THICKNESS: u32 = 3;
pub const LABEL_PREFIX: &str = "banana";

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;

#[derive(Clone, Debug)]
pub struct AnnotationStyle {
    pub box_color: Rgba<u8>,
    pub label_color: Rgba<u8>,
    pub thickness: u32,
    /// Pixel size of one font cell.
    pub glyph_scale: u32,
    pub label_prefix: String,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: BOX_COLOR,
            label_color: LABEL_COLOR,
            thickness: BOX_THICKNESS,
            glyph_scale: 3,
            label_prefix: LABEL_PREFIX.to_string(),
        }
    }
}

/// A text label and the point its baseline starts at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Label {
    pub text: String,
    pub origin: (i32, i32),
}

/// Everything drawn onto one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlay {
    pub boxes: Vec<Rect>,
    pub labels: Vec<Label>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.labels.is_empty()
    }
}

/// Draw every detection onto `image`, labelled by its index.
pub fn annotate(image: &mut RgbaImage, detections: &Detections, style: &AnnotationStyle) -> Overlay {
    let mut overlay = Overlay::default();
    for (i, rect) in detections.rects.iter().enumerate() {
        draw_outline(image, rect, style.box_color, style.thickness);
        overlay.boxes.push(*rect);

        let label = Label {
            text: format!("{}{}", style.label_prefix, i),
            origin: rect.tl(),
        };
        draw_label(image, &label, style.label_color, style.glyph_scale);
        overlay.labels.push(label);
    }
    overlay
}

/// Outline centered on the rectangle edges, `thickness` pixels wide.
pub fn draw_outline(image: &mut RgbaImage, rect: &Rect, color: Rgba<u8>, thickness: u32) {
    if rect.is_empty() {
        return;
    }
    let thickness = thickness.max(1) as i32;
    let inner = thickness / 2;
    for offset in -inner..(thickness - inner) {
        let width = rect.width as i64 + 2 * offset as i64;
        let height = rect.height as i64 + 2 * offset as i64;
        if width <= 0 || height <= 0 {
            continue;
        }
        let ring = PixelRect::at(rect.x - offset, rect.y - offset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, ring, color);
    }
}

/// Render `label.text` with its baseline at `label.origin`.
pub fn draw_label(image: &mut RgbaImage, label: &Label, color: Rgba<u8>, scale: u32) {
    let scale = scale.max(1) as i32;
    let (origin_x, origin_y) = label.origin;
    let top = origin_y - (GLYPH_HEIGHT as i32 * scale);
    let advance = ((GLYPH_WIDTH + GLYPH_SPACING) as i32) * scale;

    for (i, ch) in label.text.chars().enumerate() {
        let pattern = glyph(ch.to_ascii_uppercase());
        let left = origin_x + i as i32 * advance;
        for (row, bits) in pattern.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                    continue;
                }
                let cell_x = left + col as i32 * scale;
                let cell_y = top + row as i32 * scale;
                fill_cell(image, cell_x, cell_y, scale, color);
            }
        }
    }
}

fn fill_cell(image: &mut RgbaImage, x: i32, y: i32, scale: i32, color: Rgba<u8>) {
    for dy in 0..scale {
        for dx in 0..scale {
            let px = x + dx;
            let py = y + dy;
            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ' ' => [0; 7],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        // unknown characters render as a box
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn no_detections_leaves_image_untouched() {
        let original = blank(64, 48);
        let mut image = original.clone();
        let overlay = annotate(&mut image, &Detections::empty(), &AnnotationStyle::default());
        assert!(overlay.is_empty());
        assert_eq!(image, original);
    }

    #[test]
    fn labels_follow_detection_order() {
        let mut image = blank(200, 200);
        let detections = Detections::from(vec![
            Rect::new(100, 100, 50, 50),
            Rect::new(30, 40, 60, 20),
            Rect::new(5, 150, 20, 20),
        ]);
        let overlay = annotate(&mut image, &detections, &AnnotationStyle::default());

        assert_eq!(overlay.boxes, detections.rects);
        let texts: Vec<&str> = overlay.labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["banana0", "banana1", "banana2"]);
        assert_eq!(overlay.labels[1].origin, (30, 40));
    }

    #[test]
    fn outline_is_three_pixels_around_edge() {
        let mut image = blank(40, 40);
        draw_outline(&mut image, &Rect::new(10, 10, 20, 20), BOX_COLOR, 3);

        for x in [9, 10, 11] {
            assert_eq!(*image.get_pixel(x, 20), BOX_COLOR, "left edge x={}", x);
        }
        assert_ne!(*image.get_pixel(8, 20), BOX_COLOR);
        assert_ne!(*image.get_pixel(12, 20), BOX_COLOR);
        assert_ne!(*image.get_pixel(20, 20), BOX_COLOR);
    }

    #[test]
    fn label_sits_above_anchor() {
        let mut image = blank(100, 60);
        let label = Label {
            text: "b".to_string(),
            origin: (10, 30),
        };
        draw_label(&mut image, &label, LABEL_COLOR, 3);

        // Top row of 'B' is 0b11110: first cell lit, starting 21px above anchor.
        assert_eq!(*image.get_pixel(10, 9), LABEL_COLOR);
        // Nothing at or below the baseline.
        for x in 0..100 {
            assert_ne!(*image.get_pixel(x, 30), LABEL_COLOR);
        }
    }

    #[test]
    fn drawing_clips_at_frame_edges() {
        let mut image = blank(16, 16);
        let detections = Detections::from(vec![Rect::new(-5, -5, 40, 40)]);
        let overlay = annotate(&mut image, &detections, &AnnotationStyle::default());
        assert_eq!(overlay.boxes.len(), 1);
        assert_eq!(overlay.labels.len(), 1);
    }
}
