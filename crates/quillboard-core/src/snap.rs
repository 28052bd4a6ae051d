//! Alignment guides and snapping for dragged selections.
//!
//! Edge alignment compares the three reference edges of the dragged bounds
//! (left/center/right, top/middle/bottom) against the same edges of every
//! eligible candidate; the minimum-distance pair per axis wins. When no edge
//! aligns on an axis, gap matching takes over: equalize the gaps to two
//! flanking neighbors, or reproduce an existing gap when only one neighbor
//! exists. The engine never mutates elements; callers apply the returned
//! deltas to the dragged bounds before commit.

use crate::element::{Element, ElementId, ElementKind};
use kurbo::{Point, Rect};

/// Default snap threshold in pixels.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 5.0;
/// Visual overhang added to both ends of a guide line.
pub const GUIDE_OVERHANG: f64 = 6.0;
/// Positions closer than this are treated as the same guide.
const POSITION_EPS: f64 = 0.5;

/// Guide orientation. Vertical guides constrain x, horizontal constrain y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// A single alignment guide line spanning every aligned box.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideLine {
    pub axis: Axis,
    /// x for vertical guides, y for horizontal ones.
    pub position: f64,
    /// Extent along the guide, overhang included.
    pub start: f64,
    pub end: f64,
}

/// A gap annotation produced by gap matching.
#[derive(Debug, Clone, PartialEq)]
pub struct GapGuide {
    pub axis: Axis,
    /// The gap width being shown or reproduced.
    pub gap: f64,
    pub from: Point,
    pub to: Point,
}

/// Result of a guide search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapOutcome {
    pub guides: Vec<GuideLine>,
    pub distance_guides: Vec<GapGuide>,
    /// Delta to apply to the dragged bounds; `None` means no snap on that
    /// axis.
    pub snap_dx: Option<f64>,
    pub snap_dy: Option<f64>,
}

impl SnapOutcome {
    pub fn is_snapped(&self) -> bool {
        self.snap_dx.is_some() || self.snap_dy.is_some()
    }

    /// Deltas with unsnapped axes collapsed to zero.
    pub fn delta(&self) -> (f64, f64) {
        (self.snap_dx.unwrap_or(0.0), self.snap_dy.unwrap_or(0.0))
    }
}

/// Compute snap deltas and guides for a dragged selection.
///
/// Candidates must be visible board elements; locked elements, excluded ids
/// (the dragged selection itself), pen strokes and ephemeral laser trails
/// never participate.
pub fn find_guides(
    dragging: Rect,
    candidates: &[Element],
    exclude: &[ElementId],
    threshold: f64,
) -> SnapOutcome {
    let boxes: Vec<Rect> = candidates
        .iter()
        .filter(|e| {
            !e.locked()
                && !exclude.contains(&e.id())
                && e.kind() != ElementKind::Pen
                && e.kind() != ElementKind::Laser
        })
        .filter_map(|e| e.bounds())
        .collect();

    let mut outcome = SnapOutcome::default();
    if boxes.is_empty() {
        return outcome;
    }

    outcome.snap_dx = best_edge_delta(&x_refs(dragging), &boxes, threshold, x_refs);
    outcome.snap_dy = best_edge_delta(&y_refs(dragging), &boxes, threshold, y_refs);

    // Gap matching only where edge alignment found nothing on that axis.
    if outcome.snap_dx.is_none() {
        if let Some((delta, gaps)) = match_gaps(dragging, &boxes, threshold, Axis::Vertical) {
            outcome.snap_dx = Some(delta);
            outcome.distance_guides.extend(gaps);
        }
    }
    if outcome.snap_dy.is_none() {
        if let Some((delta, gaps)) = match_gaps(dragging, &boxes, threshold, Axis::Horizontal) {
            outcome.snap_dy = Some(delta);
            outcome.distance_guides.extend(gaps);
        }
    }

    let (dx, dy) = outcome.delta();
    let snapped = dragging + kurbo::Vec2::new(dx, dy);
    if outcome.snap_dx.is_some() {
        collect_guides(&mut outcome.guides, Axis::Vertical, snapped, &boxes);
    }
    if outcome.snap_dy.is_some() {
        collect_guides(&mut outcome.guides, Axis::Horizontal, snapped, &boxes);
    }
    outcome
}

fn x_refs(rect: Rect) -> [f64; 3] {
    [rect.x0, rect.center().x, rect.x1]
}

fn y_refs(rect: Rect) -> [f64; 3] {
    [rect.y0, rect.center().y, rect.y1]
}

/// Minimum-distance edge alignment across all candidates. Strict comparison
/// keeps the first-found winner on ties, so the result is deterministic in
/// candidate order.
fn best_edge_delta(
    drag_refs: &[f64; 3],
    boxes: &[Rect],
    threshold: f64,
    refs: fn(Rect) -> [f64; 3],
) -> Option<f64> {
    let mut best: Option<f64> = None;
    for rect in boxes {
        for cand in refs(*rect) {
            for drag in drag_refs {
                let delta = cand - drag;
                if delta.abs() <= threshold && best.is_none_or(|b| delta.abs() < b.abs()) {
                    best = Some(delta);
                }
            }
        }
    }
    best
}

/// Build one guide per aligned position, spanning the combined extent of the
/// snapped bounds and every candidate box sharing that edge position.
fn collect_guides(guides: &mut Vec<GuideLine>, axis: Axis, snapped: Rect, boxes: &[Rect]) {
    let (drag_positions, drag_span) = match axis {
        Axis::Vertical => (x_refs(snapped), (snapped.y0, snapped.y1)),
        Axis::Horizontal => (y_refs(snapped), (snapped.x0, snapped.x1)),
    };
    for position in drag_positions {
        let mut span: Option<(f64, f64)> = None;
        for rect in boxes {
            let (cand_positions, cand_span) = match axis {
                Axis::Vertical => (x_refs(*rect), (rect.y0, rect.y1)),
                Axis::Horizontal => (y_refs(*rect), (rect.x0, rect.x1)),
            };
            if cand_positions.iter().any(|p| (p - position).abs() < POSITION_EPS) {
                span = Some(match span {
                    Some((a, b)) => (a.min(cand_span.0), b.max(cand_span.1)),
                    None => cand_span,
                });
            }
        }
        if let Some((a, b)) = span {
            let start = a.min(drag_span.0) - GUIDE_OVERHANG;
            let end = b.max(drag_span.1) + GUIDE_OVERHANG;
            if !guides
                .iter()
                .any(|g| g.axis == axis && (g.position - position).abs() < POSITION_EPS)
            {
                guides.push(GuideLine {
                    axis,
                    position,
                    start,
                    end,
                });
            }
        }
    }
}

/// Gap matching along one axis. `Axis::Vertical` matches horizontal spacing
/// (producing an x delta), `Axis::Horizontal` vertical spacing.
fn match_gaps(
    dragging: Rect,
    boxes: &[Rect],
    threshold: f64,
    axis: Axis,
) -> Option<(f64, Vec<GapGuide>)> {
    // Project onto (main, cross) so both axes share one code path.
    let main = |r: Rect| match axis {
        Axis::Vertical => (r.x0, r.x1),
        Axis::Horizontal => (r.y0, r.y1),
    };
    let cross = |r: Rect| match axis {
        Axis::Vertical => (r.y0, r.y1),
        Axis::Horizontal => (r.x0, r.x1),
    };
    let (drag_lo, drag_hi) = main(dragging);
    let size = drag_hi - drag_lo;
    let (drag_c0, drag_c1) = cross(dragging);

    let neighbors: Vec<Rect> = boxes
        .iter()
        .filter(|r| {
            let (c0, c1) = cross(**r);
            c0 < drag_c1 && c1 > drag_c0
        })
        .copied()
        .collect();
    if neighbors.is_empty() {
        return None;
    }

    let before = neighbors
        .iter()
        .filter(|r| main(**r).1 <= drag_lo)
        .max_by(|a, b| main(**a).1.total_cmp(&main(**b).1));
    let after = neighbors
        .iter()
        .filter(|r| main(**r).0 >= drag_hi)
        .min_by(|a, b| main(**a).0.total_cmp(&main(**b).0));

    let mid_cross = (drag_c0 + drag_c1) / 2.0;
    let gap_point = |m: f64| match axis {
        Axis::Vertical => Point::new(m, mid_cross),
        Axis::Horizontal => Point::new(mid_cross, m),
    };

    match (before, after) {
        (Some(b), Some(a)) => {
            // Two flanking neighbors: snap to equalize the gaps.
            let space = main(*a).0 - main(*b).1;
            if space <= size {
                return None;
            }
            let gap = (space - size) / 2.0;
            let target_lo = main(*b).1 + gap;
            let delta = target_lo - drag_lo;
            if delta.abs() > threshold {
                return None;
            }
            let guides = vec![
                GapGuide {
                    axis,
                    gap,
                    from: gap_point(main(*b).1),
                    to: gap_point(target_lo),
                },
                GapGuide {
                    axis,
                    gap,
                    from: gap_point(target_lo + size),
                    to: gap_point(main(*a).0),
                },
            ];
            Some((delta, guides))
        }
        (one, other) => {
            // One neighbor: reproduce the nearest existing gap among the
            // visible candidates.
            let neighbor = one.or(other)?;
            let gaps = existing_gaps(&neighbors, main);
            let mut best: Option<(f64, f64, (f64, f64))> = None; // (delta, gap, source span)
            for (gap, source) in gaps {
                let target_lo = if one.is_some() {
                    main(*neighbor).1 + gap
                } else {
                    main(*neighbor).0 - gap - size
                };
                let delta = target_lo - drag_lo;
                if delta.abs() <= threshold
                    && best.as_ref().is_none_or(|(b, _, _)| delta.abs() < b.abs())
                {
                    best = Some((delta, gap, source));
                }
            }
            let (delta, gap, source) = best?;
            let new_lo = drag_lo + delta;
            let new_gap_span = if one.is_some() {
                (main(*neighbor).1, new_lo)
            } else {
                (new_lo + size, main(*neighbor).0)
            };
            let guides = vec![
                GapGuide {
                    axis,
                    gap,
                    from: gap_point(source.0),
                    to: gap_point(source.1),
                },
                GapGuide {
                    axis,
                    gap,
                    from: gap_point(new_gap_span.0),
                    to: gap_point(new_gap_span.1),
                },
            ];
            Some((delta, guides))
        }
    }
}

/// Positive gaps between consecutive non-overlapping candidate boxes along
/// the main axis, with the span each gap occupies.
fn existing_gaps(boxes: &[Rect], main: impl Fn(Rect) -> (f64, f64)) -> Vec<(f64, (f64, f64))> {
    let mut sorted: Vec<(f64, f64)> = boxes.iter().map(|r| main(*r)).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
    sorted
        .windows(2)
        .filter_map(|w| {
            let gap = w[1].0 - w[0].1;
            (gap > 0.0).then_some((gap, (w[0].1, w[1].0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Laser, Pen, Rectangle};

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Element {
        let mut r = Rectangle::new(Point::new(x, y), w, h);
        r.style.stroke_width = 0.0;
        Element::Rectangle(r)
    }

    #[test]
    fn test_left_edges_snap_to_minimum_distance() {
        // Candidates with left edges at 100 and 102; dragging left edge at
        // 103 snaps to the nearer one... which is 102 (distance 1) — but the
        // group at 100/102 must still produce an exact alignment.
        let candidates = vec![rect(100.0, 0.0, 50.0, 50.0), rect(102.0, 200.0, 50.0, 50.0)];
        let dragging = Rect::new(103.0, 400.0, 153.0, 450.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(-1.0));

        // With only the x=100 candidates present the snap lands exactly on
        // 100.
        let candidates = vec![rect(100.0, 0.0, 50.0, 50.0), rect(100.0, 200.0, 50.0, 50.0)];
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(-3.0));
        assert!((dragging.x0 + outcome.snap_dx.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_guides_span_all_aligned_boxes_with_overhang() {
        let candidates = vec![rect(100.0, 0.0, 50.0, 50.0), rect(100.0, 200.0, 50.0, 50.0)];
        let dragging = Rect::new(103.0, 400.0, 153.0, 450.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        let guide = outcome
            .guides
            .iter()
            .find(|g| g.axis == Axis::Vertical && (g.position - 100.0).abs() < 1e-9)
            .expect("guide at x=100");
        assert!((guide.start - (0.0 - GUIDE_OVERHANG)).abs() < 1e-9);
        assert!((guide.end - (450.0 + GUIDE_OVERHANG)).abs() < 1e-9);
    }

    #[test]
    fn test_beyond_threshold_does_not_snap() {
        let candidates = vec![rect(100.0, 0.0, 50.0, 50.0)];
        let dragging = Rect::new(110.0, 0.0, 160.0, 50.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        // Left edge is 10 away; right/center are further. No x snap.
        assert_eq!(outcome.snap_dx, None);
    }

    #[test]
    fn test_excluded_and_locked_and_pen_are_ignored() {
        let mut locked = rect(100.0, 0.0, 50.0, 50.0);
        locked.set_locked(true);
        let excluded = rect(101.0, 0.0, 50.0, 50.0);
        let excluded_id = excluded.id();
        let pen = Element::Pen(Pen::from_points(vec![
            Point::new(99.0, 0.0),
            Point::new(99.0, 50.0),
        ]));
        let laser = Element::Laser(Laser::new(
            vec![Point::new(98.0, 0.0), Point::new(98.0, 50.0)],
            0,
        ));
        let candidates = vec![locked, excluded, pen, laser];
        let dragging = Rect::new(103.0, 0.0, 153.0, 50.0);
        let outcome = find_guides(dragging, &candidates, &[excluded_id], 5.0);
        assert!(!outcome.is_snapped());
    }

    #[test]
    fn test_center_alignment() {
        let candidates = vec![rect(0.0, 0.0, 100.0, 100.0)]; // center x = 50
        let dragging = Rect::new(28.0, 200.0, 68.0, 240.0); // center x = 48
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(2.0));
    }

    #[test]
    fn test_two_neighbors_equalize_gaps() {
        // Boxes at [0,50] and [150,200]; dragging a 40-wide box between
        // them: equal gaps of 30 put its left edge at 80.
        let candidates = vec![rect(0.0, 0.0, 50.0, 50.0), rect(150.0, 0.0, 50.0, 50.0)];
        let dragging = Rect::new(78.0, 10.0, 118.0, 40.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(2.0));
        assert_eq!(outcome.distance_guides.len(), 2);
        assert!(outcome.distance_guides.iter().all(|g| (g.gap - 30.0).abs() < 1e-9));
    }

    #[test]
    fn test_single_neighbor_reproduces_existing_gap() {
        // Three collinear boxes; the gap between the first two is 20. The
        // dragged box approaches the third from the right with only one
        // neighbor in reach, and snaps to reproduce the 20px gap.
        let candidates = vec![
            rect(0.0, 0.0, 50.0, 50.0),   // [0, 50]
            rect(70.0, 0.0, 50.0, 50.0),  // [70, 120], gap 20 to previous
        ];
        let dragging = Rect::new(143.0, 0.0, 193.0, 50.0); // neighbor left = [70,120]
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(-3.0)); // left edge 143 -> 140 = 120 + 20
        // One guide shows the source gap, one the reproduced gap.
        assert_eq!(outcome.distance_guides.len(), 2);
        assert!(outcome.distance_guides.iter().all(|g| (g.gap - 20.0).abs() < 1e-9));
    }

    #[test]
    fn test_edge_alignment_beats_gap_matching() {
        // A gap-matching position and an edge alignment both within
        // threshold: the edge wins.
        let candidates = vec![
            rect(0.0, 0.0, 50.0, 50.0),
            rect(70.0, 0.0, 50.0, 50.0),
            rect(139.0, 200.0, 40.0, 10.0), // left edge at 139, y-disjoint
        ];
        let dragging = Rect::new(142.0, 0.0, 192.0, 50.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        // The gap target at 140 is closer (delta -2) than the edge at 139
        // (delta -3), but edge alignment still wins the axis.
        assert_eq!(outcome.snap_dx, Some(-3.0));
        assert!(outcome.distance_guides.is_empty());
    }

    #[test]
    fn test_gap_matching_requires_cross_axis_overlap() {
        // Neighbor shares no vertical extent with the dragged box: no gap
        // matching.
        let candidates = vec![rect(0.0, 500.0, 50.0, 50.0)];
        let dragging = Rect::new(70.0, 0.0, 120.0, 50.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, None);
    }

    #[test]
    fn test_empty_candidates_yield_no_snap() {
        let outcome = find_guides(Rect::new(0.0, 0.0, 10.0, 10.0), &[], &[], 5.0);
        assert!(!outcome.is_snapped());
        assert!(outcome.guides.is_empty());
    }

    #[test]
    fn test_both_axes_snap_independently() {
        let candidates = vec![rect(100.0, 100.0, 50.0, 50.0)];
        let dragging = Rect::new(102.0, 97.0, 152.0, 147.0);
        let outcome = find_guides(dragging, &candidates, &[], 5.0);
        assert_eq!(outcome.snap_dx, Some(-2.0));
        assert_eq!(outcome.snap_dy, Some(3.0));
        let (dx, dy) = outcome.delta();
        let snapped = dragging + kurbo::Vec2::new(dx, dy);
        assert_eq!(snapped, Rect::new(100.0, 100.0, 150.0, 150.0));
    }
}
