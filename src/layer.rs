// ============================================================================
// LAYER MODEL — the two transformable image slots and their invariants
// ============================================================================

use std::sync::Arc;

use image::RgbaImage;
use uuid::Uuid;

/// Minimum displayed width/height of a layer, in canvas units.  Handle and
/// wheel resizes clamp to this floor so a drag keeps working smoothly after
/// hitting it.
pub const MIN_LAYER_SIZE: f32 = 20.0;

/// The two layer slots.  The background is never hit-tested and never gets
/// handle decorations; the overlay is the fully interactive layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerSlot {
    Background,
    Overlay,
}

impl LayerSlot {
    pub fn label(&self) -> &'static str {
        match self {
            LayerSlot::Background => "Background",
            LayerSlot::Overlay => "Overlay",
        }
    }
}

/// A drag affordance on the overlay.  Corners resize, edge midpoints rotate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Handle {
    #[default]
    None,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomLeft | Handle::BottomRight
        )
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Handle::Top | Handle::Right | Handle::Bottom | Handle::Left)
    }
}

/// One placed, transformable raster image.
///
/// Coordinates are canvas units; `(x, y)` is the top-left corner of the
/// *unrotated* bounding box.  The decoded source pixels are loaded once and
/// shared (`Arc`) with the compositor's filter cache, keyed by `source_id`.
#[derive(Clone)]
pub struct ImageLayer {
    pub source: Arc<RgbaImage>,
    pub source_id: Uuid,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Intrinsic pixel dimensions; immutable after load.  Used for size
    /// resets and for the aspect ratio that locked resizes preserve.
    pub original_width: f32,
    pub original_height: f32,
    /// Degrees, kept in [0, 360).
    pub rotation: f32,
    /// [0, 1]
    pub opacity: f32,
    /// [0, 2], 1 = neutral.
    pub contrast: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// RGB channel complement; alpha is untouched.
    pub inverted: bool,
    /// An invisible overlay is excluded from compositing AND from
    /// hit-testing/handle interaction.
    pub visible: bool,
}

impl ImageLayer {
    /// Wrap freshly decoded pixels as a layer at (0, 0) with its intrinsic
    /// size.  Fit-to-viewport scaling is applied by the load path in `io`.
    pub fn new(source: Arc<RgbaImage>) -> Self {
        let (w, h) = (source.width() as f32, source.height() as f32);
        Self {
            source,
            source_id: Uuid::new_v4(),
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
            original_width: w,
            original_height: h,
            rotation: 0.0,
            opacity: 1.0,
            contrast: 1.0,
            flip_horizontal: false,
            flip_vertical: false,
            inverted: false,
            visible: true,
        }
    }

    /// Intrinsic aspect ratio (width over height).
    pub fn aspect_ratio(&self) -> f32 {
        self.original_width / self.original_height
    }

    /// Center of the unrotated bounding box — the rotation/flip pivot.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Unrotated axis-aligned bounds: (min_x, min_y, max_x, max_y).
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn set_opacity(&mut self, value: f32) {
        self.opacity = value.clamp(0.0, 1.0);
    }

    pub fn set_contrast(&mut self, value: f32) {
        self.contrast = value.clamp(0.0, 2.0);
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees.rem_euclid(360.0);
    }

    /// Clamp both dimensions to the layer floor.  Used by wheel scaling,
    /// where a too-small result is clamped rather than rejected.
    pub fn clamp_size_floor(&mut self) {
        self.width = self.width.max(MIN_LAYER_SIZE);
        self.height = self.height.max(MIN_LAYER_SIZE);
    }

    pub fn reset_size(&mut self) {
        self.width = self.original_width;
        self.height = self.original_height;
    }

    pub fn reset_rotation(&mut self) {
        self.rotation = 0.0;
    }

    pub fn toggle_flip_horizontal(&mut self) {
        self.flip_horizontal = !self.flip_horizontal;
    }

    pub fn toggle_flip_vertical(&mut self) {
        self.flip_vertical = !self.flip_vertical;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(w: u32, h: u32) -> ImageLayer {
        ImageLayer::new(Arc::new(RgbaImage::new(w, h)))
    }

    #[test]
    fn new_layer_takes_intrinsic_size_at_origin() {
        let l = layer(640, 480);
        assert_eq!((l.x, l.y), (0.0, 0.0));
        assert_eq!((l.width, l.height), (640.0, 480.0));
        assert_eq!((l.original_width, l.original_height), (640.0, 480.0));
        assert_eq!(l.rotation, 0.0);
        assert_eq!(l.opacity, 1.0);
        assert_eq!(l.contrast, 1.0);
        assert!(l.visible);
        assert!(!l.inverted);
    }

    #[test]
    fn setters_clamp_to_range() {
        let mut l = layer(10, 10);
        l.set_opacity(1.7);
        assert_eq!(l.opacity, 1.0);
        l.set_opacity(-0.3);
        assert_eq!(l.opacity, 0.0);
        l.set_contrast(2.5);
        assert_eq!(l.contrast, 2.0);
        l.set_rotation(-45.0);
        assert_eq!(l.rotation, 315.0);
        l.set_rotation(720.0);
        assert_eq!(l.rotation, 0.0);
    }

    #[test]
    fn size_floor_clamps_both_axes() {
        let mut l = layer(100, 100);
        l.width = 3.0;
        l.height = 500.0;
        l.clamp_size_floor();
        assert_eq!(l.width, MIN_LAYER_SIZE);
        assert_eq!(l.height, 500.0);
    }

    #[test]
    fn resets_restore_original_state() {
        let mut l = layer(300, 200);
        l.width = 80.0;
        l.height = 40.0;
        l.rotation = 123.0;
        l.reset_size();
        l.reset_rotation();
        assert_eq!((l.width, l.height), (300.0, 200.0));
        assert_eq!(l.rotation, 0.0);
    }
}
