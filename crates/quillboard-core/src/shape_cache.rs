//! Cached hand-drawn vector geometry.
//!
//! Shapes are generated with the seeded rough generator and memoized per
//! (element id, parameter hash). The hash covers every visual input to the
//! generation, so two renders of an identical element are pixel-stable —
//! remote peers' shapes must not jitter frame to frame. Mutators call
//! [`ShapeCache::invalidate`] before the next read.

use crate::element::{Element, ElementId, FillPattern};
use kurbo::{BezPath, Point};
use palette::Srgba;
use roughr::core::{Drawable, FillStyle, OpSet, OpSetType, OpType, Options, OptionsBuilder};
use roughr::generator::Generator;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Generated geometry for one element, in its unrotated frame. Rotation is
/// applied by the renderer as a transform.
#[derive(Debug, Clone, Default)]
pub struct RoughShape {
    /// Stroke outline path(s).
    pub stroke: BezPath,
    /// Solid fill path, when the element has a fill.
    pub fill: Option<BezPath>,
    /// Sketched fill strokes (hachure and friends), when the element has a
    /// patterned fill.
    pub fill_sketch: Option<BezPath>,
}

#[derive(Debug)]
struct CacheEntry {
    param_hash: u64,
    shape: Arc<RoughShape>,
}

/// Memoizing cache for generated rough geometry.
#[derive(Debug, Default)]
pub struct ShapeCache {
    entries: HashMap<ElementId, CacheEntry>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for an element, generated on miss. Returns `None` for kinds
    /// that are not stroke-generated (text, tiles, frames, embeds) and for
    /// degenerate or malformed geometry; a broken element never breaks the
    /// render pass.
    pub fn shape_for(&mut self, element: &Element) -> Option<Arc<RoughShape>> {
        let hash = param_hash(element);
        if let Some(entry) = self.entries.get(&element.id()) {
            if entry.param_hash == hash {
                return Some(entry.shape.clone());
            }
        }
        let shape = match generate(&Generator::default(), element) {
            Some(shape) => Arc::new(shape),
            None => {
                self.entries.remove(&element.id());
                return None;
            }
        };
        self.entries.insert(
            element.id(),
            CacheEntry {
                param_hash: hash,
                shape: shape.clone(),
            },
        );
        Some(shape)
    }

    /// Drop the cached geometry for one element.
    pub fn invalidate(&mut self, id: ElementId) {
        self.entries.remove(&id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hash of every parameter that feeds the seeded generation.
fn param_hash(element: &Element) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    element.id().hash(&mut hasher);
    let style = element.style();
    style.seed.hash(&mut hasher);
    style.stroke_width.to_bits().hash(&mut hasher);
    (style.roughness as u8).hash(&mut hasher);
    style.roughness.bowing().to_bits().hash(&mut hasher);
    (style.fill_pattern as u8).hash(&mut hasher);
    style.fill_color.is_some().hash(&mut hasher);
    match element {
        Element::Rectangle(e) => {
            hash_f64s(&mut hasher, &[e.position.x, e.position.y, e.width, e.height]);
        }
        Element::Diamond(e) => {
            hash_f64s(&mut hasher, &[e.position.x, e.position.y, e.width, e.height]);
        }
        Element::Ellipse(e) => {
            hash_f64s(&mut hasher, &[e.center.x, e.center.y, e.radius_x, e.radius_y]);
        }
        Element::Line(e) => hash_points(&mut hasher, &e.points),
        Element::Arrow(e) => {
            hash_points(&mut hasher, &e.points);
            e.head_size.to_bits().hash(&mut hasher);
        }
        Element::Pen(e) => hash_points(&mut hasher, &e.points),
        Element::Laser(e) => hash_points(&mut hasher, &e.points),
        Element::Text(_) | Element::Tile(_) | Element::Frame(_) | Element::WebEmbed(_) => {}
    }
    hasher.finish()
}

fn hash_f64s<H: Hasher>(hasher: &mut H, values: &[f64]) {
    for v in values {
        v.to_bits().hash(hasher);
    }
}

fn hash_points<H: Hasher>(hasher: &mut H, points: &[Point]) {
    points.len().hash(hasher);
    for p in points {
        p.x.to_bits().hash(hasher);
        p.y.to_bits().hash(hasher);
    }
}

fn generate(generator: &Generator, element: &Element) -> Option<RoughShape> {
    let options = build_options(element)?;
    match element {
        Element::Rectangle(e) => {
            if !finite_positive(e.width, e.height) {
                log::warn!("degenerate rectangle {}, skipping shape", e.id);
                return None;
            }
            let drawable = generator.rectangle::<f64>(
                e.position.x,
                e.position.y,
                e.width,
                e.height,
                &options,
            );
            Some(collect(&drawable))
        }
        Element::Diamond(e) => {
            if !finite_positive(e.width, e.height) {
                log::warn!("degenerate diamond {}, skipping shape", e.id);
                return None;
            }
            let points: Vec<_> = e
                .vertices()
                .iter()
                .map(|p| euclid::default::Point2D::new(p.x, p.y))
                .collect();
            let drawable = generator.polygon::<f64>(&points, &options);
            Some(collect(&drawable))
        }
        Element::Ellipse(e) => {
            if !finite_positive(e.radius_x, e.radius_y) {
                log::warn!("degenerate ellipse {}, skipping shape", e.id);
                return None;
            }
            let drawable = generator.ellipse::<f64>(
                e.center.x,
                e.center.y,
                e.radius_x * 2.0,
                e.radius_y * 2.0,
                &options,
            );
            Some(collect(&drawable))
        }
        Element::Line(e) => rough_polyline(generator, &e.points, &options),
        Element::Arrow(e) => {
            let mut shape = rough_polyline(generator, &e.points, &options)?;
            if let Some(segments) = e.head_segments() {
                for (from, to) in segments {
                    let wing = generator.line::<f64>(from.x, from.y, to.x, to.y, &options);
                    append_stroke(&mut shape.stroke, &wing);
                }
            }
            Some(shape)
        }
        // Pen and laser strokes are drawn as smoothed polylines, not rough
        // generator output; the cache still memoizes the path construction.
        Element::Pen(e) => smooth_polyline(&e.points).map(|stroke| RoughShape {
            stroke,
            ..Default::default()
        }),
        Element::Laser(e) => smooth_polyline(&e.points).map(|stroke| RoughShape {
            stroke,
            ..Default::default()
        }),
        Element::Text(_) | Element::Tile(_) | Element::Frame(_) | Element::WebEmbed(_) => None,
    }
}

fn build_options(element: &Element) -> Option<Option<Options>> {
    let style = element.style();
    let mut builder = OptionsBuilder::default();
    builder
        .roughness(style.roughness.amount() as f32)
        .bowing(style.roughness.bowing() as f32)
        .seed(style.seed as u64)
        .stroke_width(style.stroke_width as f32);
    if style.fill_color.is_some() {
        // The generator only emits fill op-sets when a fill color is set;
        // the actual color comes from the style at paint time.
        builder
            .fill(Srgba::new(0.0f32, 0.0, 0.0, 1.0))
            .fill_style(fill_style(style.fill_pattern));
    }
    match builder.build() {
        Ok(options) => Some(Some(options)),
        Err(err) => {
            log::warn!("rough options rejected for {}: {err}", element.id());
            None
        }
    }
}

fn fill_style(pattern: FillPattern) -> FillStyle {
    match pattern {
        FillPattern::Solid => FillStyle::Solid,
        FillPattern::Hachure => FillStyle::Hachure,
        FillPattern::CrossHatch => FillStyle::CrossHatch,
        FillPattern::Dots => FillStyle::Dots,
        FillPattern::ZigZag => FillStyle::ZigZag,
    }
}

fn finite_positive(a: f64, b: f64) -> bool {
    a.is_finite() && b.is_finite() && a > 0.0 && b > 0.0
}

fn rough_polyline(
    generator: &Generator,
    points: &[Point],
    options: &Option<Options>,
) -> Option<RoughShape> {
    if points.len() < 2 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    let pts: Vec<_> = points
        .iter()
        .map(|p| euclid::default::Point2D::new(p.x, p.y))
        .collect();
    let drawable = generator.linear_path::<f64>(&pts, false, options);
    Some(collect(&drawable))
}

/// Polyline smoothed through segment midpoints with quadratic curves.
fn smooth_polyline(points: &[Point]) -> Option<BezPath> {
    if points.len() < 2 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    let mut path = BezPath::new();
    path.move_to(points[0]);
    if points.len() == 2 {
        path.line_to(points[1]);
        return Some(path);
    }
    for w in points.windows(2).skip(1) {
        let mid = Point::new((w[0].x + w[1].x) / 2.0, (w[0].y + w[1].y) / 2.0);
        path.quad_to(w[0], mid);
    }
    path.line_to(points[points.len() - 1]);
    Some(path)
}

fn collect(drawable: &Drawable<f64>) -> RoughShape {
    let mut shape = RoughShape::default();
    for set in &drawable.sets {
        match set.op_set_type {
            OpSetType::Path => extend_path(&mut shape.stroke, set),
            OpSetType::FillPath => {
                extend_path(shape.fill.get_or_insert_with(BezPath::new), set);
            }
            OpSetType::FillSketch => {
                extend_path(shape.fill_sketch.get_or_insert_with(BezPath::new), set);
            }
        }
    }
    shape
}

fn append_stroke(target: &mut BezPath, drawable: &Drawable<f64>) {
    for set in &drawable.sets {
        if matches!(set.op_set_type, OpSetType::Path) {
            extend_path(target, set);
        }
    }
}

fn extend_path(path: &mut BezPath, set: &OpSet<f64>) {
    for op in &set.ops {
        match op.op {
            OpType::Move => {
                if let [x, y, ..] = op.data[..] {
                    path.move_to((x, y));
                }
            }
            OpType::LineTo => {
                if let [x, y, ..] = op.data[..] {
                    path.line_to((x, y));
                }
            }
            OpType::BCurveTo => {
                if let [x1, y1, x2, y2, x, y, ..] = op.data[..] {
                    path.curve_to((x1, y1), (x2, y2), (x, y));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Ellipse, Line, Pen, Rectangle, Rgba};

    fn rect_element() -> Element {
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 100.0, 60.0);
        rect.style.seed = 42;
        Element::Rectangle(rect)
    }

    #[test]
    fn test_generation_is_memoized() {
        let mut cache = ShapeCache::new();
        let element = rect_element();
        let first = cache.shape_for(&element).unwrap();
        let second = cache.shape_for(&element).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_same_params_produce_identical_geometry() {
        // Two caches, same element: seeded generation must be stable so
        // remote renders match local ones exactly.
        let element = rect_element();
        let a = ShapeCache::new().shape_for(&element).unwrap();
        let b = ShapeCache::new().shape_for(&element).unwrap();
        assert_eq!(a.stroke.to_svg(), b.stroke.to_svg());
    }

    #[test]
    fn test_mutation_regenerates() {
        let mut cache = ShapeCache::new();
        let mut element = rect_element();
        let first = cache.shape_for(&element).unwrap();
        element.translate_by(50.0, 0.0);
        cache.invalidate(element.id());
        let second = cache.shape_for(&element).unwrap();
        assert_ne!(first.stroke.to_svg(), second.stroke.to_svg());
        // Single entry per element id.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_params_detected_without_invalidate() {
        // The param hash is a backstop for missed invalidations.
        let mut cache = ShapeCache::new();
        let mut element = rect_element();
        let first = cache.shape_for(&element).unwrap();
        element.style_mut().seed = 43;
        let second = cache.shape_for(&element).unwrap();
        assert_ne!(first.stroke.to_svg(), second.stroke.to_svg());
    }

    #[test]
    fn test_degenerate_geometry_degrades_to_none() {
        let mut cache = ShapeCache::new();
        let zero = Element::Rectangle(Rectangle::new(Point::ZERO, 0.0, 10.0));
        assert!(cache.shape_for(&zero).is_none());
        let nan = Element::Ellipse(Ellipse::new(Point::new(f64::NAN, 0.0), 10.0, 10.0));
        assert!(cache.shape_for(&nan).is_none());
        let dot = Element::Line(Line::from_points(vec![Point::ZERO]));
        assert!(cache.shape_for(&dot).is_none());
    }

    #[test]
    fn test_filled_shape_carries_fill_geometry() {
        let mut rect = Rectangle::new(Point::new(0.0, 0.0), 80.0, 40.0);
        rect.style.fill_color = Some(Rgba::new(255, 0, 0, 255));
        rect.style.fill_pattern = FillPattern::Hachure;
        let mut cache = ShapeCache::new();
        let shape = cache.shape_for(&Element::Rectangle(rect)).unwrap();
        assert!(shape.fill.is_some() || shape.fill_sketch.is_some());
    }

    #[test]
    fn test_pen_stroke_is_smoothed_polyline() {
        let pen = Pen::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(20.0, 0.0),
        ]);
        let mut cache = ShapeCache::new();
        let shape = cache.shape_for(&Element::Pen(pen)).unwrap();
        assert!(!shape.stroke.elements().is_empty());
        assert!(shape.fill.is_none());
    }
}
