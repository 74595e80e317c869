// ============================================================================
// IMAGE LOADING — decode, fit-to-viewport sizing, file dialogs
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rfd::FileDialog;

use crate::layer::ImageLayer;

/// Extensions offered by the open dialogs.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tga", "ico", "tif", "tiff", "gif",
];

/// Decode `path` into a fresh layer at (0, 0).  Layers larger than the
/// viewport start scaled down uniformly to fit; smaller ones keep their
/// intrinsic size.  On decode failure the caller's slot is left untouched
/// and the error is returned as a display string.
pub fn load_layer(path: &Path, viewport_w: f32, viewport_h: f32) -> Result<ImageLayer, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to decode {}: {}", path.display(), e))?
        .into_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(format!("{} decoded to an empty image", path.display()));
    }

    let mut layer = ImageLayer::new(Arc::new(img));
    let (w, h) = fit_to_viewport(
        layer.original_width,
        layer.original_height,
        viewport_w,
        viewport_h,
    );
    layer.width = w;
    layer.height = h;
    Ok(layer)
}

/// Uniform downscale to fit `(viewport_w, viewport_h)`; never upscales.
pub fn fit_to_viewport(width: f32, height: f32, viewport_w: f32, viewport_h: f32) -> (f32, f32) {
    if viewport_w <= 0.0 || viewport_h <= 0.0 {
        return (width, height);
    }
    if width <= viewport_w && height <= viewport_h {
        return (width, height);
    }
    let scale = (viewport_w / width).min(viewport_h / height);
    (width * scale, height * scale)
}

/// Native open dialog filtered to the supported raster formats.
pub fn pick_image_file(title: &str) -> Option<PathBuf> {
    FileDialog::new()
        .set_title(title)
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file()
}
