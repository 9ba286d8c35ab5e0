//! Drawing primitives for overlay frames.
//!
//! Effects are computed on the Rust side as plain geometry; a document
//! backend only has to paint these shapes onto its surface.

use serde::{Deserialize, Serialize};

/// A point in CSS pixels relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow the rectangle by `pad` on every side.
    pub fn inflate(&self, pad: f64) -> Rect {
        Rect::new(
            self.x - pad,
            self.y - pad,
            self.width + 2.0 * pad,
            self.height + 2.0 * pad,
        )
    }

    /// Perimeter length.
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width + self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// RGBA color with components in `[0, 255]` and alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb` or `#rrggbb`.
    pub fn parse_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            3 => {
                let mut chars = digits.chars().map(|c| c.to_string().repeat(2));
                Some(Self::rgb(
                    channel(&chars.next()?)?,
                    channel(&chars.next()?)?,
                    channel(&chars.next()?)?,
                ))
            }
            6 => Some(Self::rgb(
                channel(digits.get(0..2)?)?,
                channel(digits.get(2..4)?)?,
                channel(digits.get(4..6)?)?,
            )),
            _ => None,
        }
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn fade(self, factor: f64) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Closed polygon, optionally filled and/or stroked.
    Polygon {
        points: Vec<Point>,
        fill: Option<Rgba>,
        stroke: Option<Rgba>,
        line_width: f64,
    },
    /// Open stroked path.
    Polyline {
        points: Vec<Point>,
        stroke: Rgba,
        line_width: f64,
    },
    /// Circle outline.
    Ring {
        center: Point,
        radius: f64,
        stroke: Rgba,
        line_width: f64,
    },
    /// Fill `area` except for `hole`.
    Shade {
        area: Rect,
        hole: Option<Rect>,
        color: Rgba,
    },
    /// Text anchored at its top-left corner.
    Label {
        at: Point,
        text: String,
        color: Rgba,
        background: Option<Rgba>,
        size_px: f64,
    },
}

/// Everything drawn for one animation tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub shapes: Vec<Shape>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgba::parse_hex("#ff4757"), Some(Rgba::rgb(255, 71, 87)));
        assert_eq!(Rgba::parse_hex("#fff"), Some(Rgba::WHITE));
        assert_eq!(Rgba::parse_hex("ff4757"), None);
        assert_eq!(Rgba::parse_hex("#ff47"), None);
        assert_eq!(Rgba::parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_fade_clamps() {
        assert_eq!(Rgba::WHITE.fade(0.5).a, 0.5);
        assert_eq!(Rgba::WHITE.fade(3.0).a, 1.0);
        assert_eq!(Rgba::WHITE.fade(-1.0).a, 0.0);
    }

    #[test]
    fn test_rect_helpers() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(rect.center(), Point::new(60.0, 40.0));
        assert_eq!(rect.inflate(8.0), Rect::new(2.0, 12.0, 116.0, 56.0));
        assert_eq!(rect.perimeter(), 280.0);
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
    }

    #[test]
    fn test_shape_serialization_is_tagged() {
        let shape = Shape::Ring {
            center: Point::new(1.0, 2.0),
            radius: 3.0,
            stroke: Rgba::BLACK,
            line_width: 2.0,
        };
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["kind"], "ring");
        assert_eq!(json["center"]["x"], 1.0);
    }
}
