//! Geometry kernel: bounding boxes, point containment, translation.
//!
//! Pure and deterministic. Stroke-rendered kinds pad their box by half the
//! stroke width on every side so alignment and snapping work against visual
//! edges rather than logical coordinates.

use crate::element::{Element, ElementPatch};
use kurbo::{Point, Rect, Vec2};

/// Visual bounding box of an element.
///
/// Returns `None` only for degenerate linear elements with zero points.
/// Boxes for stroke-rendered kinds extend half the stroke width beyond the
/// geometric outline; tiles, frames and embeds use their intrinsic size;
/// text uses its measured content size.
pub fn bounding_box(element: &Element) -> Option<Rect> {
    let half_stroke = element.style().stroke_width / 2.0;
    match element {
        Element::Rectangle(e) => {
            Some(rotated_aabb(e.as_rect(), e.rotation).inflate(half_stroke, half_stroke))
        }
        Element::Diamond(e) => {
            Some(rotated_aabb(e.as_rect(), e.rotation).inflate(half_stroke, half_stroke))
        }
        Element::Ellipse(e) => {
            // Exact AABB of a rotated ellipse: half-extents from the radii
            // projected onto the axes.
            let (sin, cos) = e.rotation.sin_cos();
            let hx = ((e.radius_x * cos).powi(2) + (e.radius_y * sin).powi(2)).sqrt();
            let hy = ((e.radius_x * sin).powi(2) + (e.radius_y * cos).powi(2)).sqrt();
            Some(
                Rect::new(
                    e.center.x - hx,
                    e.center.y - hy,
                    e.center.x + hx,
                    e.center.y + hy,
                )
                .inflate(half_stroke, half_stroke),
            )
        }
        Element::Line(e) => points_aabb(&e.points).map(|r| r.inflate(half_stroke, half_stroke)),
        Element::Arrow(e) => points_aabb(&e.points).map(|r| r.inflate(half_stroke, half_stroke)),
        Element::Pen(e) => points_aabb(&e.points).map(|r| r.inflate(half_stroke, half_stroke)),
        Element::Laser(e) => points_aabb(&e.points).map(|r| r.inflate(half_stroke, half_stroke)),
        Element::Text(e) => {
            let size = e.measured_size();
            let rect = Rect::new(
                e.position.x,
                e.position.y,
                e.position.x + size.width,
                e.position.y + size.height,
            );
            Some(rotated_aabb(rect, e.rotation))
        }
        Element::Tile(e) => Some(e.as_rect()),
        Element::Frame(e) => Some(e.as_rect()),
        Element::WebEmbed(e) => Some(e.as_rect()),
    }
}

/// Translation as a partial patch. `None` only when there is nothing to
/// move (a linear element without points still yields a patch of zero
/// points, so the only `None` is unreachable kinds).
pub fn translate(element: &Element, dx: f64, dy: f64) -> Option<ElementPatch> {
    let delta = Vec2::new(dx, dy);
    match element {
        Element::Rectangle(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::Diamond(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::Text(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::Tile(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::Frame(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::WebEmbed(e) => Some(ElementPatch::Position(e.position + delta)),
        Element::Ellipse(e) => Some(ElementPatch::Center(e.center + delta)),
        Element::Line(e) => Some(translate_points(&e.points, delta)),
        Element::Arrow(e) => Some(translate_points(&e.points, delta)),
        Element::Pen(e) => Some(translate_points(&e.points, delta)),
        Element::Laser(e) => Some(translate_points(&e.points, delta)),
    }
}

fn translate_points(points: &[Point], delta: Vec2) -> ElementPatch {
    ElementPatch::Points(points.iter().map(|p| *p + delta).collect())
}

/// Point containment test against an element's visual shape.
pub fn hit_test(element: &Element, point: Point, tolerance: f64) -> bool {
    let half_stroke = element.style().stroke_width / 2.0;
    match element {
        Element::Rectangle(e) => {
            let local = unrotate(point, e.as_rect().center(), e.rotation);
            hit_box(e.as_rect(), local, e.style.fill_color.is_some(), half_stroke, tolerance)
        }
        Element::Diamond(e) => {
            let local = unrotate(point, e.as_rect().center(), e.rotation);
            if !e
                .as_rect()
                .inflate(tolerance + half_stroke, tolerance + half_stroke)
                .contains(local)
            {
                return false;
            }
            if e.style.fill_color.is_some() {
                inside_diamond(e, local, tolerance + half_stroke)
            } else {
                let verts = e.vertices();
                let mut ring: Vec<Point> = verts.to_vec();
                ring.push(verts[0]);
                point_to_polyline_dist(local, &ring) <= tolerance + half_stroke
            }
        }
        Element::Ellipse(e) => {
            if e.radius_x <= 0.0 || e.radius_y <= 0.0 {
                return false;
            }
            let local = unrotate(point, e.center, e.rotation);
            let nx = (local.x - e.center.x) / (e.radius_x + tolerance + half_stroke);
            let ny = (local.y - e.center.y) / (e.radius_y + tolerance + half_stroke);
            let outer = nx * nx + ny * ny <= 1.0;
            if e.style.fill_color.is_some() {
                outer
            } else {
                let inner_rx = (e.radius_x - tolerance - half_stroke).max(0.0);
                let inner_ry = (e.radius_y - tolerance - half_stroke).max(0.0);
                let inside_inner = if inner_rx > 0.0 && inner_ry > 0.0 {
                    let ix = (local.x - e.center.x) / inner_rx;
                    let iy = (local.y - e.center.y) / inner_ry;
                    ix * ix + iy * iy < 1.0
                } else {
                    false
                };
                outer && !inside_inner
            }
        }
        Element::Line(e) => hit_polyline(&e.points, point, tolerance + half_stroke),
        Element::Arrow(e) => hit_polyline(&e.points, point, tolerance + half_stroke),
        Element::Pen(e) => hit_polyline(&e.points, point, tolerance + half_stroke),
        Element::Laser(e) => hit_polyline(&e.points, point, tolerance + half_stroke),
        Element::Text(_) | Element::Tile(_) | Element::Frame(_) | Element::WebEmbed(_) => {
            match bounding_box(element) {
                Some(rect) => rect.inflate(tolerance, tolerance).contains(point),
                None => false,
            }
        }
    }
}

fn hit_box(rect: Rect, point: Point, filled: bool, half_stroke: f64, tolerance: f64) -> bool {
    if filled {
        rect.inflate(tolerance + half_stroke, tolerance + half_stroke)
            .contains(point)
    } else {
        let outer = rect.inflate(tolerance + half_stroke, tolerance + half_stroke);
        let inner = rect.inflate(-(tolerance + half_stroke), -(tolerance + half_stroke));
        outer.contains(point) && !(inner.width() > 0.0 && inner.height() > 0.0 && inner.contains(point))
    }
}

fn inside_diamond(diamond: &crate::element::Diamond, point: Point, slack: f64) -> bool {
    // |dx|/hw + |dy|/hh <= 1 for the rhombus inscribed in the box.
    let rect = diamond.as_rect();
    let c = rect.center();
    let hw = rect.width() / 2.0 + slack;
    let hh = rect.height() / 2.0 + slack;
    if hw <= 0.0 || hh <= 0.0 {
        return false;
    }
    ((point.x - c.x).abs() / hw) + ((point.y - c.y).abs() / hh) <= 1.0
}

fn hit_polyline(points: &[Point], point: Point, tolerance: f64) -> bool {
    match points.len() {
        0 => false,
        1 => {
            let d = points[0].distance(point);
            d <= tolerance
        }
        _ => point_to_polyline_dist(point, points) <= tolerance,
    }
}

/// Distance from a point to a segment a->b.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    point.distance(proj)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// AABB of a point set; `None` for an empty set.
pub fn points_aabb(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::new(first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        rect.x0 = rect.x0.min(p.x);
        rect.y0 = rect.y0.min(p.y);
        rect.x1 = rect.x1.max(p.x);
        rect.y1 = rect.y1.max(p.y);
    }
    Some(rect)
}

/// AABB of a rect rotated around its center.
fn rotated_aabb(rect: Rect, rotation: f64) -> Rect {
    if rotation == 0.0 {
        return rect;
    }
    let center = rect.center();
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    let (sin, cos) = rotation.sin_cos();
    let rotated = corners.map(|p| {
        let dx = p.x - center.x;
        let dy = p.y - center.y;
        Point::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        )
    });
    points_aabb(&rotated).unwrap_or(rect)
}

/// Rotate a point by `-rotation` around `center`, mapping a world point into
/// the element's unrotated frame.
fn unrotate(point: Point, center: Point, rotation: f64) -> Point {
    if rotation == 0.0 {
        return point;
    }
    let (sin, cos) = (-rotation).sin_cos();
    let dx = point.x - center.x;
    let dy = point.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}
