// ============================================================================
// GEOMETRY ENGINE — rotated-box hit-testing and handle-drag transform math
// ============================================================================
//
// All tests work by rotating the *point* by the negative of the layer's
// rotation about the box center, which reduces every check to axis-aligned
// arithmetic against the unrotated bounds.

use crate::layer::{Handle, ImageLayer, MIN_LAYER_SIZE};

/// Euclidean pick radius around each corner handle, canvas units.
pub const HANDLE_RADIUS: f32 = 10.0;
/// Per-axis pick threshold around each edge-midpoint handle.
pub const EDGE_THRESHOLD: f32 = 20.0;
/// Rotation snap increment used when aspect lock is held during an edge drag.
pub const ROTATION_SNAP: f32 = 15.0;

/// `signum` that treats zero as zero (f32::signum(0.0) is 1.0, which would
/// turn a pure-vertical corner drag into a grow).
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Rotate (px, py) by the inverse of the layer's rotation about its center.
/// The result lives in the same coordinate space as the unrotated bounds.
fn to_unrotated(px: f32, py: f32, layer: &ImageLayer) -> (f32, f32) {
    let (cx, cy) = layer.center();
    let dx = px - cx;
    let dy = py - cy;
    let (sin, cos) = (-layer.rotation.to_radians()).sin_cos();
    (dx * cos - dy * sin + cx, dx * sin + dy * cos + cy)
}

/// Whether (px, py) falls inside the layer's rotated bounding box.
pub fn point_in_rotated_box(px: f32, py: f32, layer: &ImageLayer) -> bool {
    let (fx, fy) = to_unrotated(px, py, layer);
    fx >= layer.x
        && fx <= layer.x + layer.width
        && fy >= layer.y
        && fy <= layer.y + layer.height
}

/// Which handle, if any, sits under (px, py).
///
/// Corners are checked before edges: at small layer sizes a corner's pick
/// zone overlaps the adjacent edge zones, and the corner must win.
pub fn handle_at_point(px: f32, py: f32, layer: &ImageLayer) -> Handle {
    let (fx, fy) = to_unrotated(px, py, layer);
    let (x, y, w, h) = (layer.x, layer.y, layer.width, layer.height);

    if near_point(fx, fy, x, y) {
        return Handle::TopLeft;
    }
    if near_point(fx, fy, x + w, y) {
        return Handle::TopRight;
    }
    if near_point(fx, fy, x, y + h) {
        return Handle::BottomLeft;
    }
    if near_point(fx, fy, x + w, y + h) {
        return Handle::BottomRight;
    }

    if near_edge(fx, fy, x + w / 2.0, y) {
        return Handle::Top;
    }
    if near_edge(fx, fy, x + w, y + h / 2.0) {
        return Handle::Right;
    }
    if near_edge(fx, fy, x + w / 2.0, y + h) {
        return Handle::Bottom;
    }
    if near_edge(fx, fy, x, y + h / 2.0) {
        return Handle::Left;
    }

    Handle::None
}

fn near_point(x: f32, y: f32, px: f32, py: f32) -> bool {
    (x - px).hypot(y - py) <= HANDLE_RADIUS
}

fn near_edge(x: f32, y: f32, ex: f32, ey: f32) -> bool {
    (x - ex).abs() <= EDGE_THRESHOLD && (y - ey).abs() <= EDGE_THRESHOLD
}

/// Apply one incremental pointer delta to the layer through the given handle.
///
/// Edge handles rotate: the drag vector's angle is offset per edge so that
/// dragging along the edge's tangent reads as that edge's natural rotation,
/// then normalized to [0, 360) (snapped to 15° steps under aspect lock).
///
/// Corner handles resize.  With aspect lock a single scalar `change` (the
/// dominant axis of the delta, signed by its x component) drives width, with
/// height derived from the intrinsic aspect ratio and the position adjusted
/// so the opposite corner stays fixed.  Without lock, width and height move
/// independently and only the dragged sides shift position.
pub fn update_from_handle_drag(
    handle: Handle,
    move_x: f32,
    move_y: f32,
    layer: &mut ImageLayer,
    lock_aspect: bool,
) {
    if handle.is_edge() {
        let mut angle = move_y.atan2(move_x).to_degrees();
        angle += match handle {
            Handle::Top => 90.0,
            Handle::Right => 0.0,
            Handle::Bottom => -90.0,
            Handle::Left => 180.0,
            _ => unreachable!(),
        };
        let mut rotation = (angle + 360.0) % 360.0;
        if lock_aspect {
            rotation = (rotation / ROTATION_SNAP).round() * ROTATION_SNAP;
        }
        layer.rotation = rotation % 360.0;
        return;
    }

    let aspect = layer.aspect_ratio();
    match handle {
        Handle::TopLeft => {
            if lock_aspect {
                let change = move_x.abs().max(move_y.abs()) * sign(move_x);
                layer.width -= change;
                layer.height = layer.width / aspect;
                layer.x += change;
                layer.y += change / aspect;
            } else {
                layer.width -= move_x;
                layer.height -= move_y;
                layer.x += move_x;
                layer.y += move_y;
            }
        }
        Handle::TopRight => {
            if lock_aspect {
                let change = move_x.abs().max(move_y.abs()) * sign(move_x);
                layer.width += change;
                layer.height = layer.width / aspect;
                layer.y -= change / aspect;
            } else {
                layer.width += move_x;
                layer.height -= move_y;
                layer.y += move_y;
            }
        }
        Handle::BottomLeft => {
            if lock_aspect {
                let change = move_x.abs().max(move_y.abs()) * sign(move_x);
                layer.width -= change;
                layer.height = layer.width / aspect;
                layer.x += change;
            } else {
                layer.width -= move_x;
                layer.height += move_y;
                layer.x += move_x;
            }
        }
        Handle::BottomRight => {
            if lock_aspect {
                let change = move_x.abs().max(move_y.abs()) * sign(move_x);
                layer.width += change;
                layer.height = layer.width / aspect;
            } else {
                layer.width += move_x;
                layer.height += move_y;
            }
        }
        Handle::None | Handle::Top | Handle::Right | Handle::Bottom | Handle::Left => return,
    }

    // Floor clamp.  Under aspect lock the other dimension is recomputed so
    // the ratio survives the clamp.
    if layer.width < MIN_LAYER_SIZE {
        layer.width = MIN_LAYER_SIZE;
        if lock_aspect {
            layer.height = layer.width / aspect;
        }
    }
    if layer.height < MIN_LAYER_SIZE {
        layer.height = MIN_LAYER_SIZE;
        if lock_aspect {
            layer.width = layer.height * aspect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Arc;

    fn layer(x: f32, y: f32, w: f32, h: f32) -> ImageLayer {
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(w as u32, h as u32)));
        l.x = x;
        l.y = y;
        l
    }

    #[test]
    fn containment_is_rotation_invariant() {
        // An interior point, rotated together with the box, stays inside for
        // any rotation.
        let mut l = layer(10.0, 20.0, 100.0, 50.0);
        let (cx, cy) = l.center();
        let (ox, oy) = (cx + 30.0, cy + 15.0); // strictly inside at rotation 0
        for step in 0..24 {
            let r = step as f32 * 15.0;
            l.rotation = r;
            let (sin, cos) = r.to_radians().sin_cos();
            let px = cx + (ox - cx) * cos - (oy - cy) * sin;
            let py = cy + (ox - cx) * sin + (oy - cy) * cos;
            assert!(
                point_in_rotated_box(px, py, &l),
                "interior point left the box at rotation {r}"
            );
        }
    }

    #[test]
    fn containment_rejects_outside_points() {
        let l = layer(0.0, 0.0, 100.0, 100.0);
        assert!(point_in_rotated_box(50.0, 50.0, &l));
        assert!(!point_in_rotated_box(150.0, 50.0, &l));
        assert!(!point_in_rotated_box(-1.0, 50.0, &l));
    }

    #[test]
    fn rotated_box_accepts_point_outside_unrotated_bounds() {
        // At 45° the box's corners swing outside the unrotated AABB; a point
        // above the top edge midpoint is now inside.
        let mut l = layer(0.0, 0.0, 100.0, 100.0);
        l.rotation = 45.0;
        assert!(point_in_rotated_box(50.0, -15.0, &l));
        // ...and the unrotated corner is now outside.
        assert!(!point_in_rotated_box(1.0, 1.0, &l));
    }

    #[test]
    fn handles_found_at_exact_corner_and_edge_positions() {
        let l = layer(0.0, 0.0, 100.0, 100.0);
        assert_eq!(handle_at_point(0.0, 0.0, &l), Handle::TopLeft);
        assert_eq!(handle_at_point(100.0, 0.0, &l), Handle::TopRight);
        assert_eq!(handle_at_point(0.0, 100.0, &l), Handle::BottomLeft);
        assert_eq!(handle_at_point(100.0, 100.0, &l), Handle::BottomRight);
        assert_eq!(handle_at_point(50.0, 0.0, &l), Handle::Top);
        assert_eq!(handle_at_point(100.0, 50.0, &l), Handle::Right);
        assert_eq!(handle_at_point(50.0, 100.0, &l), Handle::Bottom);
        assert_eq!(handle_at_point(0.0, 50.0, &l), Handle::Left);
        assert_eq!(handle_at_point(50.0, 50.0, &l), Handle::None);
    }

    #[test]
    fn corners_take_precedence_over_edge_zones() {
        // On a small box the TopLeft pick circle overlaps the Top/Left edge
        // zones; the corner must win.
        let l = layer(0.0, 0.0, 30.0, 30.0);
        assert_eq!(handle_at_point(3.0, 3.0, &l), Handle::TopLeft);
    }

    #[test]
    fn handle_hit_testing_follows_rotation() {
        let mut l = layer(0.0, 0.0, 100.0, 50.0);
        l.rotation = 90.0;
        // The unrotated top-left corner (0,0) maps to (75, -25) after the
        // 90° rotation about (50, 25).
        assert_eq!(handle_at_point(75.0, -25.0, &l), Handle::TopLeft);
        assert_eq!(handle_at_point(0.0, 0.0, &l), Handle::None);
    }

    #[test]
    fn edge_drag_sets_rotation_from_drag_vector() {
        let mut l = layer(0.0, 0.0, 100.0, 50.0);
        // Straight-down drag on the right edge: atan2(10, 0) = 90°, no offset.
        update_from_handle_drag(Handle::Right, 0.0, 10.0, &mut l, false);
        assert_eq!(l.rotation, 90.0);
        // Same drag on the top edge gets the +90 offset.
        update_from_handle_drag(Handle::Top, 0.0, 10.0, &mut l, false);
        assert_eq!(l.rotation, 180.0);
    }

    #[test]
    fn edge_drag_snaps_to_fifteen_degrees_under_aspect_lock() {
        let mut l = layer(0.0, 0.0, 100.0, 100.0);
        update_from_handle_drag(Handle::Right, 10.0, 1.0, &mut l, true);
        assert_eq!(l.rotation % 15.0, 0.0);
        assert!(l.rotation < 360.0);
    }

    #[test]
    fn free_corner_drag_moves_dragged_sides_only() {
        let mut l = layer(0.0, 0.0, 100.0, 100.0);
        update_from_handle_drag(Handle::TopLeft, 10.0, 10.0, &mut l, false);
        assert_eq!((l.width, l.height), (90.0, 90.0));
        assert_eq!((l.x, l.y), (10.0, 10.0));

        let mut l = layer(0.0, 0.0, 100.0, 100.0);
        update_from_handle_drag(Handle::BottomRight, 10.0, 20.0, &mut l, false);
        assert_eq!((l.width, l.height), (110.0, 120.0));
        assert_eq!((l.x, l.y), (0.0, 0.0));
    }

    #[test]
    fn locked_corner_drag_preserves_intrinsic_aspect() {
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(200, 100)));
        l.width = 100.0;
        l.height = 50.0;
        let ratio = l.aspect_ratio();
        for (handle, mx, my) in [
            (Handle::TopLeft, 7.0, -3.0),
            (Handle::TopRight, -12.0, 5.0),
            (Handle::BottomLeft, 4.0, 9.0),
            (Handle::BottomRight, -6.0, -2.0),
        ] {
            update_from_handle_drag(handle, mx, my, &mut l, true);
            assert!(
                (l.width / l.height - ratio).abs() < 1e-6,
                "aspect drifted after {handle:?} drag: {} vs {ratio}",
                l.width / l.height
            );
        }
    }

    #[test]
    fn locked_bottom_right_keeps_top_left_fixed() {
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(200, 100)));
        l.x = 5.0;
        l.y = 7.0;
        l.width = 100.0;
        l.height = 50.0;
        update_from_handle_drag(Handle::BottomRight, 10.0, 4.0, &mut l, true);
        assert_eq!((l.x, l.y), (5.0, 7.0));
        assert_eq!(l.width, 110.0);
        assert_eq!(l.height, 55.0);
    }

    #[test]
    fn corner_resize_clamps_to_floor_and_keeps_locked_ratio() {
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(200, 100)));
        l.width = 40.0;
        l.height = 20.0;
        // Huge shrink drag; width would go far negative.
        update_from_handle_drag(Handle::BottomRight, -500.0, 0.0, &mut l, true);
        assert!(l.width >= MIN_LAYER_SIZE);
        assert!(l.height >= MIN_LAYER_SIZE);
        assert!((l.width / l.height - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_x_delta_does_not_resize_locked_corner() {
        // sign(0) is zero, so a pure-vertical drag leaves a locked corner
        // resize untouched.
        let mut l = ImageLayer::new(Arc::new(RgbaImage::new(100, 100)));
        update_from_handle_drag(Handle::BottomRight, 0.0, 25.0, &mut l, true);
        assert_eq!((l.width, l.height), (100.0, 100.0));
    }
}
