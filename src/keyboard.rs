// ============================================================================
// KEYBOARD NUDGE CONTROLLER — discrete-step keyboard mutation of the overlay
// ============================================================================

use egui::Key;

use crate::layer::ImageLayer;

pub const MOVE_STEP: f32 = 10.0;
pub const ROTATION_STEP: f32 = 5.0;
pub const OPACITY_STEP: f32 = 0.1;
pub const CONTRAST_STEP: f32 = 0.1;
pub const SIZE_STEP: f32 = 0.1;
/// Step-resizes are rejected outright below this, unlike drag resizes which
/// clamp to the layer floor.
const MIN_NUDGE_SIZE: f32 = 10.0;

/// Apply one key press to the layer.  Returns whether the key was consumed;
/// unrecognized keys return `false` so the caller can fall through to
/// default handling.
///
/// `is_shift` flags the dedicated visibility toggle (a bare Shift press);
/// it is checked first and short-circuits the nudge table.
///
/// Key table: W/S/A/D move, Q/E rotate, Z/X opacity, C/V contrast,
/// F/G shrink/grow.
pub fn handle_key(key: Key, layer: &mut ImageLayer, lock_aspect: bool, is_shift: bool) -> bool {
    if is_shift {
        layer.visible = !layer.visible;
        return true;
    }

    match key {
        Key::W => layer.y -= MOVE_STEP,
        Key::S => layer.y += MOVE_STEP,
        Key::A => layer.x -= MOVE_STEP,
        Key::D => layer.x += MOVE_STEP,
        // CCW adds 360 before the modulo so the result never goes negative.
        Key::Q => layer.rotation = (layer.rotation - ROTATION_STEP + 360.0) % 360.0,
        Key::E => layer.rotation = (layer.rotation + ROTATION_STEP) % 360.0,
        Key::Z => layer.opacity = (layer.opacity - OPACITY_STEP).max(0.0),
        Key::X => layer.opacity = (layer.opacity + OPACITY_STEP).min(1.0),
        Key::C => layer.contrast = (layer.contrast - CONTRAST_STEP).max(0.0),
        Key::V => layer.contrast = (layer.contrast + CONTRAST_STEP).min(2.0),
        Key::F => resize_by_step(layer, 1.0 - SIZE_STEP, lock_aspect),
        Key::G => resize_by_step(layer, 1.0 + SIZE_STEP, lock_aspect),
        _ => return false,
    }
    true
}

/// Scale the layer by `scale`, keeping the intrinsic aspect ratio when
/// locked.  The step is rejected entirely if either dimension would drop
/// below the nudge minimum.
///
/// The position shift uses the post-scale dimensions, so the visual center
/// drifts slightly per step rather than being exactly preserved.  That is
/// the shipped behavior and the tests pin it down.
fn resize_by_step(layer: &mut ImageLayer, scale: f32, lock_aspect: bool) {
    let new_width = layer.width * scale;
    let new_height = if lock_aspect {
        new_width * (layer.original_height / layer.original_width)
    } else {
        layer.height * scale
    };

    if new_width < MIN_NUDGE_SIZE || new_height < MIN_NUDGE_SIZE {
        return;
    }

    layer.width = new_width;
    layer.height = new_height;
    layer.x += layer.width * (1.0 - scale) / 2.0;
    layer.y += layer.height * (1.0 - scale) / 2.0;
}
