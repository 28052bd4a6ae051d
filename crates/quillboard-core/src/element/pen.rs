//! Freeform pen strokes.

use super::{ElementId, ElementStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand pen stroke with optional per-point pressure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub(crate) id: ElementId,
    pub points: Vec<Point>,
    /// Pressure per point in [0, 1]; empty means uniform pressure.
    #[serde(default)]
    pub pressures: Vec<f64>,
    #[serde(default)]
    pub locked: bool,
    pub style: ElementStyle,
}

impl Pen {
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            pressures: Vec::new(),
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn from_points_with_pressure(points: Vec<Point>, pressures: Vec<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            pressures,
            locked: false,
            style: ElementStyle::default(),
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Pressure at a point index (1.0 when no pressure data was recorded).
    pub fn pressure_at(&self, index: usize) -> f64 {
        self.pressures.get(index).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_defaults_to_full() {
        let pen = Pen::from_points(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert!((pen.pressure_at(0) - 1.0).abs() < f64::EPSILON);
        assert!((pen.pressure_at(5) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recorded_pressure_wins() {
        let pen = Pen::from_points_with_pressure(
            vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
            vec![0.4, 0.8],
        );
        assert!((pen.pressure_at(1) - 0.8).abs() < f64::EPSILON);
    }
}
