//! Highlight effects as pure functions of elapsed time.
//!
//! Each effect maps `(elapsed, duration, target, viewport, options)` to the
//! primitives drawn on one tick. Nothing here touches the document.

use std::f64::consts::PI;

use demoreel_document::{Frame, Point, Rect, Rgba, Shape, Viewport};
use demoreel_script_model::HighlightStyle;

/// Arrow length from tail to tip at scale 1.0 (px).
const ARROW_LENGTH: f64 = 72.0;
const ARROW_HEAD: f64 = 20.0;
const ARROW_GAP: f64 = 8.0;
/// Period of the arrow pulse (ms).
const PULSE_PERIOD_MS: f64 = 800.0;
const PULSE_AMPLITUDE: f64 = 0.15;

const SPOTLIGHT_PADDING: f64 = 8.0;
const SPOTLIGHT_MAX_OPACITY: f64 = 0.6;

const BOX_PADDING: f64 = 6.0;
/// Fraction of the duration after which the border is fully drawn.
const BOX_REVEAL_END: f64 = 0.5;
const LABEL_FADE_START: f64 = 0.3;
const LABEL_FADE_END: f64 = 0.5;
const LABEL_SIZE_PX: f64 = 15.0;

const ZOOM_AMPLITUDE: f64 = 0.3;
const ZOOM_FADE_START: f64 = 0.8;

/// Inputs shared by all effects for one call.
#[derive(Debug, Clone)]
pub struct EffectParams {
    /// Target box in viewport coordinates.
    pub target: Rect,
    pub viewport: Viewport,
    pub color: Rgba,
    pub label: Option<String>,
    pub pulse: bool,
}

/// Produce the frame for `style` at `elapsed_ms` into a `duration_ms` effect.
pub fn render_frame(
    style: HighlightStyle,
    elapsed_ms: u64,
    duration_ms: u64,
    params: &EffectParams,
) -> Frame {
    match style {
        HighlightStyle::Arrow => arrow(elapsed_ms, params),
        HighlightStyle::Spotlight => spotlight(progress(elapsed_ms, duration_ms), params),
        HighlightStyle::Box => bordered_box(progress(elapsed_ms, duration_ms), params),
        HighlightStyle::Zoom => radial(progress(elapsed_ms, duration_ms), params),
        HighlightStyle::None => Frame::new(),
    }
}

/// Linear progress in `[0, 1]`.
pub fn progress(elapsed_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 1.0;
    }
    (elapsed_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}

/// Arrow scale factor at `elapsed_ms`.
pub fn pulse_scale(elapsed_ms: u64, pulse: bool) -> f64 {
    if !pulse {
        return 1.0;
    }
    1.0 + PULSE_AMPLITUDE * (2.0 * PI * elapsed_ms as f64 / PULSE_PERIOD_MS).sin()
}

fn arrow(elapsed_ms: u64, params: &EffectParams) -> Frame {
    let scale = pulse_scale(elapsed_ms, params.pulse);
    let target = params.target;
    let center_y = target.y + target.height / 2.0;

    // Point from the left unless there is no room, then from the right.
    let (tip, direction) = if target.x >= ARROW_LENGTH * scale + ARROW_GAP {
        (Point::new(target.x - ARROW_GAP, center_y), 1.0)
    } else {
        (
            Point::new(target.x + target.width + ARROW_GAP, center_y),
            -1.0,
        )
    };

    // Outline in local coordinates with the tip at the origin pointing +x.
    let outline = [
        (0.0, 0.0),
        (-ARROW_HEAD, -ARROW_HEAD * 0.6),
        (-ARROW_HEAD, -ARROW_HEAD * 0.25),
        (-ARROW_LENGTH, -ARROW_HEAD * 0.25),
        (-ARROW_LENGTH, ARROW_HEAD * 0.25),
        (-ARROW_HEAD, ARROW_HEAD * 0.25),
        (-ARROW_HEAD, ARROW_HEAD * 0.6),
    ];
    let points = outline
        .iter()
        .map(|(x, y)| Point::new(tip.x + x * scale * direction, tip.y + y * scale))
        .collect();

    let mut frame = Frame::new();
    frame.push(Shape::Polygon {
        points,
        fill: Some(params.color),
        stroke: Some(Rgba::WHITE),
        line_width: 2.0,
    });
    frame
}

/// Opacity of the spotlight shade at `progress`.
pub fn spotlight_opacity(progress: f64) -> f64 {
    SPOTLIGHT_MAX_OPACITY * (progress / 0.5).clamp(0.0, 1.0)
}

fn spotlight(progress: f64, params: &EffectParams) -> Frame {
    let opacity = spotlight_opacity(progress);
    let hole = params.target.inflate(SPOTLIGHT_PADDING);

    let mut frame = Frame::new();
    frame.push(Shape::Shade {
        area: params.viewport.rect(),
        hole: Some(hole),
        color: Rgba::BLACK.fade(opacity),
    });
    frame.push(Shape::Polygon {
        points: corners(&hole),
        fill: None,
        stroke: Some(params.color.fade(opacity / SPOTLIGHT_MAX_OPACITY)),
        line_width: 2.0,
    });
    frame
}

/// Fraction of the border drawn at `progress`.
pub fn box_reveal(progress: f64) -> f64 {
    (progress / BOX_REVEAL_END).clamp(0.0, 1.0)
}

/// Label opacity at `progress`.
pub fn label_opacity(progress: f64) -> f64 {
    ((progress - LABEL_FADE_START) / (LABEL_FADE_END - LABEL_FADE_START)).clamp(0.0, 1.0)
}

fn bordered_box(progress: f64, params: &EffectParams) -> Frame {
    let rect = params.target.inflate(BOX_PADDING);
    let reveal = box_reveal(progress);
    let mut frame = Frame::new();

    if reveal >= 1.0 {
        frame.push(Shape::Polygon {
            points: corners(&rect),
            fill: None,
            stroke: Some(params.color),
            line_width: 3.0,
        });
    } else if reveal > 0.0 {
        frame.push(Shape::Polyline {
            points: perimeter_path(&rect, reveal),
            stroke: params.color,
            line_width: 3.0,
        });
    }

    if let Some(label) = params.label.as_deref().filter(|l| !l.is_empty()) {
        let alpha = label_opacity(progress);
        if alpha > 0.0 {
            let above = rect.y - LABEL_SIZE_PX - 12.0;
            let y = if above >= 0.0 {
                above
            } else {
                rect.y + rect.height + 10.0
            };
            frame.push(Shape::Label {
                at: Point::new(rect.x + 6.0, y),
                text: label.to_string(),
                color: Rgba::WHITE.fade(alpha),
                background: Some(params.color.fade(alpha)),
                size_px: LABEL_SIZE_PX,
            });
        }
    }
    frame
}

/// Ring radius at `progress` for a target of the given size.
pub fn ring_radius(target: &Rect, progress: f64) -> f64 {
    let base = target.width.max(target.height) / 2.0 + 12.0;
    base * (1.0 + ZOOM_AMPLITUDE * (2.0 * PI * progress).sin())
}

fn radial(progress: f64, params: &EffectParams) -> Frame {
    let alpha = if progress > ZOOM_FADE_START {
        ((1.0 - progress) / (1.0 - ZOOM_FADE_START)).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let center = params.target.center();
    let radius = ring_radius(&params.target, progress);

    let mut frame = Frame::new();
    frame.push(Shape::Ring {
        center,
        radius,
        stroke: params.color.fade(alpha),
        line_width: 4.0,
    });
    frame.push(Shape::Ring {
        center,
        radius: radius * 0.75,
        stroke: params.color.fade(alpha * 0.4),
        line_width: 2.0,
    });
    frame
}

fn corners(rect: &Rect) -> Vec<Point> {
    vec![
        Point::new(rect.x, rect.y),
        Point::new(rect.x + rect.width, rect.y),
        Point::new(rect.x + rect.width, rect.y + rect.height),
        Point::new(rect.x, rect.y + rect.height),
    ]
}

/// Clockwise border path from the top-left corner covering `fraction` of
/// the perimeter.
fn perimeter_path(rect: &Rect, fraction: f64) -> Vec<Point> {
    let mut remaining = rect.perimeter() * fraction.clamp(0.0, 1.0);
    let mut ring = corners(rect);
    ring.push(ring[0]);

    let mut points = vec![ring[0]];
    for edge in ring.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        if remaining >= length {
            points.push(b);
            remaining -= length;
        } else {
            if remaining > 0.0 && length > 0.0 {
                let t = remaining / length;
                points.push(Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
            }
            break;
        }
    }
    points
}
