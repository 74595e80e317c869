// ============================================================================
// INTERACTION STATE MACHINE — pointer drags, handle drags, wheel scaling
// ============================================================================
//
// The app feeds pointer events in here; no global listeners.  Deltas are
// always measured against the previous pointer-move, not the drag start, so
// events must arrive in order.

use egui::Pos2;

use crate::geometry;
use crate::layer::{Handle, ImageLayer};

/// Scroll-wheel step, canvas units of scale input per wheel notch.
pub const SCROLL_SPEED: f32 = 50.0;

/// Current drag mode.  The three modes are mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Body drag: pointer deltas translate the layer.
    Move,
    /// Handle drag: pointer deltas go through the geometry engine.
    Handle(Handle),
}

/// Tracks one pointer interaction with the overlay layer.
#[derive(Default)]
pub struct Interaction {
    state: DragState,
    last_pos: Option<Pos2>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// The handle currently being dragged, for highlight rendering.
    pub fn active_handle(&self) -> Handle {
        match self.state {
            DragState::Handle(h) => h,
            _ => Handle::None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.state != DragState::Idle
    }

    /// Pointer-down in layer space.  Handles take precedence over the body;
    /// a miss (or an invisible overlay) leaves the machine idle.  Returns
    /// whether a drag started.
    pub fn pointer_down(&mut self, pos: Pos2, layer: &ImageLayer) -> bool {
        if !layer.visible {
            return false;
        }
        let handle = geometry::handle_at_point(pos.x, pos.y, layer);
        self.state = if handle != Handle::None {
            DragState::Handle(handle)
        } else if geometry::point_in_rotated_box(pos.x, pos.y, layer) {
            DragState::Move
        } else {
            return false;
        };
        self.last_pos = Some(pos);
        true
    }

    /// Pointer-move in layer space.  Applies the delta since the previous
    /// move and returns whether the layer changed.
    pub fn pointer_move(&mut self, pos: Pos2, layer: &mut ImageLayer, lock_aspect: bool) -> bool {
        let Some(last) = self.last_pos else {
            return false;
        };
        let delta = pos - last;
        self.last_pos = Some(pos);
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        match self.state {
            DragState::Idle => false,
            DragState::Move => {
                layer.x += delta.x;
                layer.y += delta.y;
                true
            }
            DragState::Handle(handle) => {
                geometry::update_from_handle_drag(handle, delta.x, delta.y, layer, lock_aspect);
                true
            }
        }
    }

    /// Pointer-up: back to idle, dropping all drag bookkeeping.
    pub fn pointer_up(&mut self) {
        self.state = DragState::Idle;
        self.last_pos = None;
    }
}

/// Scale the overlay from one wheel event.  `delta_y` follows the DOM sign
/// convention (positive = scroll down = shrink).  Aspect-locked scaling
/// applies to both axes; unlocked, `shift` selects height instead of width.
/// Results are clamped to the layer floor.  Returns whether anything moved.
pub fn wheel_scale(delta_y: f32, shift: bool, layer: &mut ImageLayer, lock_aspect: bool) -> bool {
    let delta = if delta_y > 0.0 {
        -SCROLL_SPEED
    } else if delta_y < 0.0 {
        SCROLL_SPEED
    } else {
        return false;
    };
    let scale = 1.0 + delta / 1000.0;

    if lock_aspect {
        layer.width *= scale;
        layer.height *= scale;
    } else if shift {
        layer.height *= scale;
    } else {
        layer.width *= scale;
    }
    layer.clamp_size_floor();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::MIN_LAYER_SIZE;
    use egui::pos2;
    use image::RgbaImage;
    use std::sync::Arc;

    fn overlay() -> ImageLayer {
        ImageLayer::new(Arc::new(RgbaImage::new(100, 100)))
    }

    #[test]
    fn body_press_enters_move_and_deltas_are_incremental() {
        let mut l = overlay();
        let mut ix = Interaction::new();
        assert!(ix.pointer_down(pos2(50.0, 50.0), &l));
        assert_eq!(ix.state(), DragState::Move);
        ix.pointer_move(pos2(70.0, 40.0), &mut l, false);
        assert_eq!((l.x, l.y), (20.0, -10.0));
        // Second move is relative to the previous move, not the press.
        ix.pointer_move(pos2(75.0, 45.0), &mut l, false);
        assert_eq!((l.x, l.y), (25.0, -5.0));
        ix.pointer_up();
        assert_eq!(ix.state(), DragState::Idle);
    }

    #[test]
    fn corner_press_enters_handle_mode() {
        let mut l = overlay();
        let mut ix = Interaction::new();
        assert!(ix.pointer_down(pos2(0.0, 0.0), &l));
        assert_eq!(ix.state(), DragState::Handle(Handle::TopLeft));
        assert_eq!(ix.active_handle(), Handle::TopLeft);
        ix.pointer_move(pos2(10.0, 10.0), &mut l, false);
        assert_eq!((l.width, l.height), (90.0, 90.0));
        assert_eq!((l.x, l.y), (10.0, 10.0));
    }

    #[test]
    fn edge_press_rotates_on_drag() {
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(200, 100)));
        l.width = 100.0;
        l.height = 50.0;
        let mut ix = Interaction::new();
        // Right edge midpoint.
        assert!(ix.pointer_down(pos2(100.0, 25.0), &l));
        assert_eq!(ix.state(), DragState::Handle(Handle::Right));
        ix.pointer_move(pos2(100.0, 35.0), &mut l, false);
        assert_eq!(l.rotation, 90.0);
    }

    #[test]
    fn miss_and_invisible_overlay_stay_idle() {
        let mut l = overlay();
        let mut ix = Interaction::new();
        assert!(!ix.pointer_down(pos2(500.0, 500.0), &l));
        assert_eq!(ix.state(), DragState::Idle);
        // Moves while idle are no-ops.
        assert!(!ix.pointer_move(pos2(501.0, 501.0), &mut l, false));

        l.visible = false;
        assert!(!ix.pointer_down(pos2(50.0, 50.0), &l));
        assert_eq!(ix.state(), DragState::Idle);
    }

    #[test]
    fn wheel_scales_both_axes_when_locked() {
        let mut l = overlay();
        assert!(wheel_scale(-1.0, false, &mut l, true));
        assert!((l.width - 105.0).abs() < 1e-4);
        assert!((l.height - 105.0).abs() < 1e-4);
        assert!(wheel_scale(1.0, false, &mut l, true));
        assert!((l.width - 99.75).abs() < 1e-3);
    }

    #[test]
    fn unlocked_wheel_picks_axis_by_shift() {
        let mut l = overlay();
        assert!(wheel_scale(-1.0, false, &mut l, false));
        assert!((l.width - 105.0).abs() < 1e-4);
        assert_eq!(l.height, 100.0);
        assert!(wheel_scale(-1.0, true, &mut l, false));
        assert!((l.height - 105.0).abs() < 1e-4);
    }

    #[test]
    fn wheel_shrink_clamps_to_floor() {
        let mut l = overlay();
        for _ in 0..500 {
            wheel_scale(1.0, false, &mut l, true);
        }
        assert_eq!(l.width, MIN_LAYER_SIZE);
        assert_eq!(l.height, MIN_LAYER_SIZE);
        // The gesture keeps responding after the clamp.
        assert!(wheel_scale(-1.0, false, &mut l, true));
        assert!(l.width > MIN_LAYER_SIZE);
    }

    #[test]
    fn zero_wheel_delta_is_ignored() {
        let mut l = overlay();
        assert!(!wheel_scale(0.0, false, &mut l, true));
        assert_eq!(l.width, 100.0);
    }
}
