//! Shared style record for all element kinds.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable RGBA color (8 bits per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<Rgba> for Color {
    fn from(color: Rgba) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Hand-drawn roughness level for generated geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Roughness {
    /// Clean, precise outlines (roughness = 0).
    Precise = 0,
    /// Slight hand-drawn wobble (roughness = 1).
    #[default]
    Casual = 1,
    /// Very sketchy strokes (roughness = 2).
    Sketchy = 2,
}

impl Roughness {
    /// Numeric roughness fed to the geometry generator.
    pub fn amount(&self) -> f64 {
        match self {
            Roughness::Precise => 0.0,
            Roughness::Casual => 1.0,
            Roughness::Sketchy => 2.0,
        }
    }

    /// Bowing (curvature of nominally straight segments) for this level.
    pub fn bowing(&self) -> f64 {
        match self {
            Roughness::Precise => 0.0,
            Roughness::Casual => 1.0,
            Roughness::Sketchy => 2.5,
        }
    }
}

/// Fill pattern for closed shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillPattern {
    #[default]
    Solid,
    Hachure,
    CrossHatch,
    Dots,
    ZigZag,
}

/// Stroke line style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeLine {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Style properties common to every element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    pub stroke_color: Rgba,
    pub stroke_width: f64,
    #[serde(default)]
    pub stroke_line: StrokeLine,
    /// Fill color (None = no fill).
    pub fill_color: Option<Rgba>,
    #[serde(default)]
    pub fill_pattern: FillPattern,
    /// Overall opacity (0.0 transparent, 1.0 opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub roughness: Roughness,
    /// Seed for the deterministic hand-drawn generator. Fixed at creation so
    /// the same element renders identically on every peer, every frame.
    #[serde(default = "generate_seed")]
    pub seed: u32,
}

fn default_opacity() -> f64 {
    1.0
}

/// Generate a seed for new elements. Counter + splitmix-style hash, so ids
/// handed out in the same process never collide and no clock is needed.
pub fn generate_seed() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEED_COUNTER: AtomicU32 = AtomicU32::new(1);

    let counter = SEED_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut x = counter.wrapping_mul(0x9E37_79B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2_AE35);
    x ^= x >> 16;
    x
}

impl ElementStyle {
    /// Stroke color as a peniko color with opacity applied.
    pub fn stroke(&self) -> Color {
        let color: Color = self.stroke_color.into();
        let rgba = color.to_rgba8();
        let alpha = (rgba.a as f64 * self.opacity) as u8;
        Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
    }

    /// Fill color as a peniko color with opacity applied.
    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| {
            let color: Color = c.into();
            let rgba = color.to_rgba8();
            let alpha = (rgba.a as f64 * self.opacity) as u8;
            Color::from_rgba8(rgba.r, rgba.g, rgba.b, alpha)
        })
    }
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            stroke_color: Rgba::black(),
            stroke_width: 2.0,
            stroke_line: StrokeLine::default(),
            fill_color: None,
            fill_pattern: FillPattern::default(),
            opacity: 1.0,
            roughness: Roughness::default(),
            seed: generate_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_uniqueness() {
        let a = generate_seed();
        let b = generate_seed();
        assert_ne!(a, b);
    }

    #[test]
    fn test_stroke_opacity_applied() {
        let style = ElementStyle {
            stroke_color: Rgba::new(10, 20, 30, 200),
            opacity: 0.5,
            ..Default::default()
        };
        let rgba = style.stroke().to_rgba8();
        assert_eq!(rgba.a, 100);
    }

    #[test]
    fn test_color_roundtrip() {
        let original = Rgba::new(12, 34, 56, 78);
        let peniko: Color = original.into();
        let back: Rgba = peniko.into();
        assert_eq!(original, back);
    }
}
