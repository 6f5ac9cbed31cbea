//! Placeholder thumbnails for diagram files.
//!
//! The thumbnail process has no script engine, so it cannot lay out the
//! diagram. It draws a fixed glyph instead: a page with a folded corner and,
//! in the `diagram` style, a tiny flowchart (node, decision, two branches).
//! Drawing produces [`DrawCommand`]s in a top-left origin space; they can be
//! serialized to SVG and rasterized to PNG.

use std::fmt::Write as _;
use std::io::Cursor;

use thiserror::Error;

use crate::options::ThumbnailStyle;

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("thumbnail size must be non-zero, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },

    #[error("failed to parse thumbnail svg: {0}")]
    Svg(#[from] resvg::usvg::Error),

    #[error("failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    #[error("failed to encode png: {0}")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

const fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// An sRGB colour with straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BORDER: Self = Self::rgb(191, 191, 191);
    pub const FOLD: Self = Self::rgb(235, 235, 235);
    pub const NODE: Self = Self::rgb(0, 181, 217);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    #[must_use]
    pub const fn with_alpha(self, alpha: f64) -> Self {
        Self { alpha, ..self }
    }

    fn css(self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}

/// One primitive of the glyph.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Closed polygon.
    Polygon {
        points: Vec<Point>,
        fill: Option<Color>,
        stroke: Option<Stroke>,
        /// Soft drop shadow below the shape.
        shadow: bool,
    },
    RoundedRect {
        rect: Rect,
        radius: f64,
        fill: Color,
    },
    /// Open path with round caps and joins.
    Polyline { points: Vec<Point>, stroke: Stroke },
}

/// The full placeholder glyph.
pub fn draw_placeholder(width: f64, height: f64) -> Vec<DrawCommand> {
    draw(width, height, ThumbnailStyle::Diagram)
}

/// The glyph in the given style.
pub fn draw(width: f64, height: f64, style: ThumbnailStyle) -> Vec<DrawCommand> {
    let padding = width.min(height) * 0.08;
    let doc = Rect {
        x: padding,
        y: padding,
        width: width - padding * 2.0,
        height: height - padding * 2.0,
    };
    let mut commands = document(doc);
    if style == ThumbnailStyle::Diagram {
        commands.extend(flowchart(doc));
    }
    commands
}

fn document(doc: Rect) -> Vec<DrawCommand> {
    let fold = doc.width * 0.18;
    let right = doc.x + doc.width;
    let outline = vec![
        pt(doc.x, doc.bottom()),
        pt(doc.x, doc.y),
        pt(right - fold, doc.y),
        pt(right, doc.y + fold),
        pt(right, doc.bottom()),
    ];
    let border = Stroke {
        color: Color::BORDER,
        width: 1.0,
    };
    let corner = vec![
        pt(right - fold, doc.y),
        pt(right - fold, doc.y + fold),
        pt(right, doc.y + fold),
    ];
    vec![
        DrawCommand::Polygon {
            points: outline.clone(),
            fill: Some(Color::WHITE),
            stroke: None,
            shadow: true,
        },
        DrawCommand::Polygon {
            points: outline,
            fill: None,
            stroke: Some(border),
            shadow: false,
        },
        DrawCommand::Polygon {
            points: corner.clone(),
            fill: Some(Color::FOLD),
            stroke: None,
            shadow: false,
        },
        DrawCommand::Polyline {
            points: corner,
            stroke: border,
        },
    ]
}

fn flowchart(doc: Rect) -> Vec<DrawCommand> {
    // Content box, measured from the bottom of the page like the page's own
    // margins: 10% below, 20% above.
    let content = Rect {
        x: doc.x + doc.width * 0.12,
        y: doc.bottom() - doc.height * 0.1 - doc.height * 0.7,
        width: doc.width * 0.76,
        height: doc.height * 0.7,
    };
    let node_w = content.width * 0.35;
    let node_h = content.height * 0.12;
    let radius = node_h * 0.3;

    let top = Rect {
        x: content.x + (content.width - node_w) / 2.0,
        y: content.bottom() - content.height * 0.78 - node_h,
        width: node_w,
        height: node_h,
    };

    let cx = content.mid_x();
    let cy = content.bottom() - content.height * 0.55;
    let d = content.height * 0.14;

    let branch_w = node_w * 0.8;
    let branch_h = node_h * 0.9;
    let branch_y = content.bottom() - content.height * 0.15 - branch_h;
    let left = Rect {
        x: content.x + content.width * 0.05,
        y: branch_y,
        width: branch_w,
        height: branch_h,
    };
    let right = Rect {
        x: content.x + content.width - branch_w - content.width * 0.05,
        ..left
    };

    let line = Stroke {
        color: Color::NODE.with_alpha(0.8),
        width: (content.width * 0.02).max(1.5),
    };
    let connectors = [
        vec![pt(top.mid_x(), top.bottom()), pt(cx, cy - d)],
        vec![pt(cx - d, cy), pt(left.mid_x(), cy), pt(left.mid_x(), left.y)],
        vec![pt(cx + d, cy), pt(right.mid_x(), cy), pt(right.mid_x(), right.y)],
    ];

    let mut commands = vec![
        DrawCommand::RoundedRect {
            rect: top,
            radius,
            fill: Color::NODE,
        },
        DrawCommand::Polygon {
            points: vec![pt(cx, cy - d), pt(cx + d, cy), pt(cx, cy + d), pt(cx - d, cy)],
            fill: Some(Color::NODE.with_alpha(0.9)),
            stroke: None,
            shadow: false,
        },
        DrawCommand::RoundedRect {
            rect: left,
            radius,
            fill: Color::NODE.with_alpha(0.85),
        },
        DrawCommand::RoundedRect {
            rect: right,
            radius,
            fill: Color::NODE.with_alpha(0.85),
        },
    ];
    for points in connectors {
        if let Some(head) = arrowhead(&points, line) {
            commands.push(head);
        }
        commands.push(DrawCommand::Polyline {
            points,
            stroke: line,
        });
    }
    commands
}

// Filled triangle whose tip is the last point, aligned with the last segment.
fn arrowhead(points: &[Point], stroke: Stroke) -> Option<DrawCommand> {
    let [.., from, tip] = points else {
        return None;
    };
    let (dx, dy) = (tip.x - from.x, tip.y - from.y);
    let len = dx.hypot(dy);
    if len <= f64::EPSILON {
        return None;
    }
    let (ux, uy) = (dx / len, dy / len);
    let size = stroke.width * 2.5;
    let half = size * 0.6;
    let base = pt(tip.x - ux * size, tip.y - uy * size);
    Some(DrawCommand::Polygon {
        points: vec![
            *tip,
            pt(base.x - uy * half, base.y + ux * half),
            pt(base.x + uy * half, base.y - ux * half),
        ],
        fill: Some(stroke.color),
        stroke: None,
        shadow: false,
    })
}

fn points_attr(points: &[Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:.2},{:.2}", p.x, p.y);
    }
    out
}

fn fill_attrs(fill: Option<Color>) -> String {
    match fill {
        Some(c) if c.alpha < 1.0 => format!(" fill=\"{}\" fill-opacity=\"{:.2}\"", c.css(), c.alpha),
        Some(c) => format!(" fill=\"{}\"", c.css()),
        None => " fill=\"none\"".to_string(),
    }
}

fn stroke_attrs(stroke: Option<Stroke>) -> String {
    match stroke {
        Some(s) => {
            let mut out = format!(" stroke=\"{}\" stroke-width=\"{:.2}\"", s.color.css(), s.width);
            if s.color.alpha < 1.0 {
                let _ = write!(out, " stroke-opacity=\"{:.2}\"", s.color.alpha);
            }
            out
        }
        None => String::new(),
    }
}

/// Serialize commands to a standalone SVG document.
pub fn to_svg(width: f64, height: f64, commands: &[DrawCommand]) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">\n"
    );
    if commands
        .iter()
        .any(|c| matches!(c, DrawCommand::Polygon { shadow: true, .. }))
    {
        svg.push_str(
            "  <defs><filter id=\"shadow\" x=\"-20%\" y=\"-20%\" width=\"140%\" height=\"140%\">\
             <feDropShadow dx=\"0\" dy=\"2\" stdDeviation=\"4\" flood-color=\"black\" flood-opacity=\"0.3\"/>\
             </filter></defs>\n",
        );
    }
    for command in commands {
        match command {
            DrawCommand::Polygon {
                points,
                fill,
                stroke,
                shadow,
            } => {
                let filter = if *shadow { " filter=\"url(#shadow)\"" } else { "" };
                let _ = writeln!(
                    svg,
                    "  <polygon points=\"{}\"{}{}{filter}/>",
                    points_attr(points),
                    fill_attrs(*fill),
                    stroke_attrs(*stroke),
                );
            }
            DrawCommand::RoundedRect { rect, radius, fill } => {
                let _ = writeln!(
                    svg,
                    "  <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius:.2}\"{}/>",
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    fill_attrs(Some(*fill)),
                );
            }
            DrawCommand::Polyline { points, stroke } => {
                let _ = writeln!(
                    svg,
                    "  <polyline points=\"{}\" fill=\"none\"{} stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                    points_attr(points),
                    stroke_attrs(Some(*stroke)),
                );
            }
        }
    }
    svg.push_str("</svg>\n");
    svg
}

/// Rasterize `svg` to a `width` x `height` PNG, scaling the drawing to fill
/// the width.
///
/// # Errors
/// Invalid SVG, a zero or oversized canvas, or PNG encoding failure.
pub fn rasterize_png(svg: &str, width: u32, height: u32) -> Result<Vec<u8>, ThumbnailError> {
    if width == 0 || height == 0 {
        return Err(ThumbnailError::ZeroSize { width, height });
    }
    let tree = resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default())?;

    #[allow(clippy::cast_precision_loss)]
    let scale = width as f32 / tree.size().width();

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(ThumbnailError::Pixmap { width, height })?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha; PNG wants straight alpha.
    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    let img = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or(ThumbnailError::Pixmap { width, height })?;

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

/// Draw, serialize, and rasterize in one go.
///
/// # Errors
/// See [`rasterize_png`].
pub fn render_png(width: u32, height: u32, style: ThumbnailStyle) -> Result<Vec<u8>, ThumbnailError> {
    let (w, h) = (f64::from(width), f64::from(height));
    let svg = to_svg(w, h, &draw(w, h, style));
    rasterize_png(&svg, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygons(commands: &[DrawCommand]) -> Vec<&Vec<Point>> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polygon { points, .. } => Some(points),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_document_outline_geometry() {
        let commands = draw_placeholder(100.0, 100.0);
        let outline = polygons(&commands)[0];
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        // padding 8, page 84 wide, fold 15.12
        assert!(close(outline[0].x, 8.0) && close(outline[0].y, 92.0));
        assert!(close(outline[1].x, 8.0) && close(outline[1].y, 8.0));
        assert!(close(outline[2].x, 92.0 - 84.0 * 0.18));
        assert!(close(outline[3].y, 8.0 + 84.0 * 0.18));
    }

    #[test]
    fn test_glyph_stays_inside_canvas() {
        for (w, h) in [(64.0, 64.0), (512.0, 256.0), (40.0, 300.0)] {
            for command in draw_placeholder(w, h) {
                let points = match &command {
                    DrawCommand::Polygon { points, .. } | DrawCommand::Polyline { points, .. } => {
                        points.clone()
                    }
                    DrawCommand::RoundedRect { rect, .. } => vec![
                        pt(rect.x, rect.y),
                        pt(rect.x + rect.width, rect.bottom()),
                    ],
                };
                for p in points {
                    assert!(p.x >= 0.0 && p.x <= w && p.y >= 0.0 && p.y <= h, "{p:?} in {w}x{h}");
                }
            }
        }
    }

    #[test]
    fn test_flowchart_reads_top_down() {
        let commands = draw_placeholder(200.0, 200.0);
        let rects: Vec<Rect> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::RoundedRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert_eq!(rects.len(), 3);
        let (top, left, right) = (rects[0], rects[1], rects[2]);
        assert!(top.bottom() < left.y);
        assert!((left.y - right.y).abs() < 1e-9);
        assert!(left.mid_x() < top.mid_x() && top.mid_x() < right.mid_x());
    }

    #[test]
    fn test_connectors_have_arrowheads_and_min_width() {
        let commands = draw_placeholder(32.0, 32.0);
        let lines: Vec<&Stroke> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { stroke, .. } if stroke.color.r == 0 => Some(stroke),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|s| (s.width - 1.5).abs() < 1e-9));
        // page fill, page border, fold, diamond, three arrowheads
        assert_eq!(polygons(&commands).len(), 7);
    }

    #[test]
    fn test_icon_style_is_bare_document() {
        let commands = draw(128.0, 128.0, ThumbnailStyle::Icon);
        assert_eq!(commands.len(), 4);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, DrawCommand::RoundedRect { .. })));
    }

    #[test]
    fn test_svg_serialization() {
        let svg = to_svg(100.0, 80.0, &draw_placeholder(100.0, 80.0));
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"100\" height=\"80\""));
        assert!(svg.contains("<feDropShadow"));
        assert!(svg.contains("filter=\"url(#shadow)\""));
        assert!(svg.contains("fill=\"rgb(0,181,217)\""));
        assert!(svg.contains("stroke-linecap=\"round\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_rasterize_png() {
        let png = render_png(64, 64, ThumbnailStyle::Diagram).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
        // Inside the page is opaque white; the corner only catches shadow.
        let rgba = decoded.to_rgba8();
        assert!(rgba.get_pixel(0, 0)[3] < 32);
        assert_eq!(rgba.get_pixel(20, 50).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_rasterize_rejects_zero_size() {
        assert!(matches!(
            render_png(0, 10, ThumbnailStyle::Icon),
            Err(ThumbnailError::ZeroSize { .. })
        ));
    }
}
