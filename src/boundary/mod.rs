//! BoundaryComputer - Safe PTZ Travel Envelope
//!
//! ## Responsibilities
//!
//! - Derive a safe pan/tilt travel rectangle from operator-saved presets
//! - Zoom-dependent buffer around the outermost saved positions
//! - Total fallback: degenerate inputs yield the permissive sentinel box
//!
//! Pure logic, no I/O. Output is independent of preset ordering.

use crate::models::{Preset, PresetKind};
use serde::{Deserialize, Serialize};

/// Sentinel for "unconstrained" in normalized device units.
///
/// Legitimate pan/tilt coordinates lie well inside ±3, so ±3 is effectively
/// no constraint. The same constant seeds the uninitialized extremes and
/// forms the permissive fallback rectangle; both roles are deliberate.
pub const BOUNDARY_SENTINEL: f64 = 3.0;

/// Safe travel envelope in camera-normalized pan/tilt units.
/// Derived, never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRegion {
    pub max_x: f64,
    pub min_x: f64,
    pub max_y: f64,
    pub min_y: f64,
}

impl BoundaryRegion {
    /// The maximally permissive rectangle ("no constraint")
    pub fn unconstrained() -> Self {
        Self {
            max_x: BOUNDARY_SENTINEL,
            min_x: -BOUNDARY_SENTINEL,
            max_y: BOUNDARY_SENTINEL,
            min_y: -BOUNDARY_SENTINEL,
        }
    }

    /// Clamp a pan/tilt target into the envelope. Zoom is unconstrained.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }
}

/// Buffer added around an edge preset, keyed by the zoom level of the
/// preset that set the edge. A wide field of view (low zoom) already sees
/// more of the room, so a larger buffer is safe to add.
pub fn buffer_for_zoom(zoom: f64) -> f64 {
    if zoom <= 0.3 {
        0.5
    } else if zoom <= 0.4 {
        0.25
    } else if zoom <= 0.5 {
        0.125
    } else {
        0.0625
    }
}

/// Compute the safe travel envelope for a bed from its saved presets.
///
/// Boundary presets and presets without a recorded position are ignored.
/// Fewer than two positioned presets cannot span a rectangle, and an
/// inverted box after buffer expansion is worse than no box at all; both
/// cases fall back to [`BoundaryRegion::unconstrained`].
pub fn compute_boundary(presets: &[Preset]) -> BoundaryRegion {
    let positions: Vec<_> = presets
        .iter()
        .filter(|p| p.kind == PresetKind::Normal)
        .filter_map(|p| p.position)
        .collect();

    if positions.len() < 2 {
        tracing::debug!(
            positioned = positions.len(),
            "Too few positioned presets, returning unconstrained boundary"
        );
        return BoundaryRegion::unconstrained();
    }

    let mut region = BoundaryRegion {
        max_x: -BOUNDARY_SENTINEL,
        min_x: BOUNDARY_SENTINEL,
        max_y: -BOUNDARY_SENTINEL,
        min_y: BOUNDARY_SENTINEL,
    };
    // Zoom level of the preset that set each extreme
    let mut edge_zoom = EdgeZoom::default();

    for pos in &positions {
        if pos.x > region.max_x {
            region.max_x = pos.x;
            edge_zoom.max_x = pos.zoom;
        }
        if pos.x < region.min_x {
            region.min_x = pos.x;
            edge_zoom.min_x = pos.zoom;
        }
        if pos.y > region.max_y {
            region.max_y = pos.y;
            edge_zoom.max_y = pos.zoom;
        }
        if pos.y < region.min_y {
            region.min_y = pos.y;
            edge_zoom.min_y = pos.zoom;
        }
    }

    region.max_x += buffer_for_zoom(edge_zoom.max_x);
    region.min_x -= buffer_for_zoom(edge_zoom.min_x);
    region.max_y += buffer_for_zoom(edge_zoom.max_y);
    region.min_y -= buffer_for_zoom(edge_zoom.min_y);

    if region.max_x <= region.min_x || region.max_y <= region.min_y {
        tracing::debug!(?region, "Degenerate boundary after expansion, falling back");
        return BoundaryRegion::unconstrained();
    }

    region
}

#[derive(Debug, Default)]
struct EdgeZoom {
    max_x: f64,
    min_x: f64,
    max_y: f64,
    min_y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PtzPosition;

    fn preset(name: &str, x: f64, y: f64, zoom: f64) -> Preset {
        Preset {
            name: name.to_string(),
            kind: PresetKind::Normal,
            bed_id: "bed-1".to_string(),
            position: Some(PtzPosition { x, y, zoom }),
            boundary: None,
        }
    }

    #[test]
    fn test_empty_input_returns_unconstrained() {
        assert_eq!(compute_boundary(&[]), BoundaryRegion::unconstrained());
    }

    #[test]
    fn test_single_preset_returns_unconstrained() {
        let presets = vec![preset("head", 1.0, 0.0, 0.3)];
        assert_eq!(compute_boundary(&presets), BoundaryRegion::unconstrained());
    }

    #[test]
    fn test_boundary_preset_does_not_count_as_position() {
        let mut boundary_preset = preset("limits", 0.0, 0.0, 0.3);
        boundary_preset.kind = PresetKind::Boundary;
        let presets = vec![preset("head", 1.0, 0.0, 0.3), boundary_preset];
        assert_eq!(compute_boundary(&presets), BoundaryRegion::unconstrained());
    }

    #[test]
    fn test_two_presets_span_buffered_box() {
        // Both at zoom 0.3 -> buffer 0.5 on every edge
        let presets = vec![preset("left", -1.0, -0.5, 0.3), preset("right", 1.0, 0.5, 0.3)];
        let region = compute_boundary(&presets);
        assert_eq!(region.max_x, 1.5);
        assert_eq!(region.min_x, -1.5);
        assert_eq!(region.max_y, 1.0);
        assert_eq!(region.min_y, -1.0);
    }

    #[test]
    fn test_buffer_uses_zoom_of_edge_preset() {
        // max_x edge set at zoom 0.6 (buffer 0.0625), min_x edge at 0.3 (0.5)
        let presets = vec![preset("wide", -1.0, 0.0, 0.3), preset("tight", 1.0, 0.5, 0.6)];
        let region = compute_boundary(&presets);
        assert_eq!(region.max_x, 1.0625);
        assert_eq!(region.min_x, -1.5);
    }

    #[test]
    fn test_zoom_buffer_table_boundaries() {
        assert_eq!(buffer_for_zoom(0.3), 0.5);
        assert_eq!(buffer_for_zoom(0.4), 0.25);
        assert_eq!(buffer_for_zoom(0.5), 0.125);
        assert_eq!(buffer_for_zoom(0.6), 0.0625);
        assert_eq!(buffer_for_zoom(0.0), 0.5);
        assert_eq!(buffer_for_zoom(1.0), 0.0625);
    }

    #[test]
    fn test_order_independence() {
        let a = vec![
            preset("p1", 0.4, -0.2, 0.5),
            preset("p2", -0.7, 0.9, 0.35),
            preset("p3", 1.1, 0.1, 0.6),
        ];
        let mut b = a.clone();
        b.reverse();
        let mut c = a.clone();
        c.swap(0, 1);
        assert_eq!(compute_boundary(&a), compute_boundary(&b));
        assert_eq!(compute_boundary(&a), compute_boundary(&c));
    }

    #[test]
    fn test_monotonic_max_growth() {
        let base = vec![preset("a", -0.5, -0.5, 0.6), preset("b", 0.5, 0.5, 0.6)];
        let before = compute_boundary(&base);

        let mut extended = base.clone();
        extended.push(preset("c", 0.9, 0.5, 0.6));
        let after = compute_boundary(&extended);

        assert!(after.max_x > before.max_x);
        assert_eq!(after.min_x, before.min_x);
    }

    #[test]
    fn test_clamp_inside_region() {
        let region = BoundaryRegion {
            max_x: 1.0,
            min_x: -1.0,
            max_y: 0.5,
            min_y: -0.5,
        };
        assert_eq!(region.clamp(2.0, 0.0), (1.0, 0.0));
        assert_eq!(region.clamp(-3.0, -2.0), (-1.0, -0.5));
        assert_eq!(region.clamp(0.25, 0.25), (0.25, 0.25));
    }
}
