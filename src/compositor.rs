// ============================================================================
// COMPOSITOR — CPU rendering of background + overlay into one raster
// ============================================================================
//
// Pipeline per layer: resample the decoded source to the displayed size,
// apply contrast then inversion to that buffer, then place it with
// rotation/flip and source-over alpha.  Filter order is fixed: inversion
// operates on the contrast-adjusted buffer.

use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;
use uuid::Uuid;

use crate::layer::{Handle, ImageLayer};

/// Margin added on every side of the output raster so rotated content is
/// never clipped.
pub const CANVAS_PADDING: f32 = 50.0;

const CORNER_HANDLE_RADIUS: f32 = 6.0;
const EDGE_HANDLE_HALF: f32 = 5.0;
const HANDLE_FILL: Rgba<u8> = Rgba([66, 133, 244, 255]);
const HANDLE_ACTIVE_FILL: Rgba<u8> = Rgba([255, 170, 0, 255]);

/// Cache key for a filtered (resampled + contrast + inversion) buffer.
/// Contrast is quantized to 1/1000ths so slider positions hash stably.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct FilterKey {
    source: Uuid,
    width: u32,
    height: u32,
    contrast_milli: u16,
    inverted: bool,
}

impl FilterKey {
    fn for_layer(layer: &ImageLayer) -> Self {
        Self {
            source: layer.source_id,
            width: buffer_dim(layer.width),
            height: buffer_dim(layer.height),
            contrast_milli: (layer.contrast.clamp(0.0, 2.0) * 1000.0).round() as u16,
            inverted: layer.inverted,
        }
    }
}

fn buffer_dim(v: f32) -> u32 {
    v.round().max(1.0) as u32
}

/// One rendered frame: the raster plus the canvas-space coordinate of its
/// top-left pixel, so pointer positions can be mapped back into layer space.
pub struct Composite {
    pub pixels: RgbaImage,
    pub origin: (f32, f32),
}

/// Owns the session-lifetime filter cache and the frame-coalescing flag.
/// Single-threaded by design: all mutation happens on the UI thread.
#[derive(Default)]
pub struct Compositor {
    filter_cache: HashMap<FilterKey, Arc<RgbaImage>>,
    render_requested: bool,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the composite dirty.  Requests arriving before the next frame
    /// collapse into a single render.
    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Consume the pending render request, if any.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.render_requested)
    }

    pub fn cached_buffers(&self) -> usize {
        self.filter_cache.len()
    }

    /// Composite both layers into a fresh raster.  The background is drawn
    /// first and never decorated; the overlay is skipped when invisible,
    /// and otherwise gets its handle affordances stamped on top with
    /// `active_handle` highlighted.
    pub fn render(
        &mut self,
        background: Option<&ImageLayer>,
        overlay: Option<&ImageLayer>,
        active_handle: Handle,
    ) -> Composite {
        let (origin, width, height) = output_bounds(background, overlay);
        let mut out = RgbaImage::new(width, height);

        if let Some(bg) = background {
            self.draw_layer(&mut out, bg, origin);
        }
        if let Some(ov) = overlay
            && ov.visible
        {
            self.draw_layer(&mut out, ov, origin);
            draw_handles(&mut out, ov, origin, active_handle);
        }

        Composite { pixels: out, origin }
    }

    /// Fetch or build the filtered pixel buffer for a layer.  Entries are
    /// never evicted; the cache lives for the session.
    fn filtered_source(&mut self, layer: &ImageLayer) -> Arc<RgbaImage> {
        let key = FilterKey::for_layer(layer);
        if let Some(buf) = self.filter_cache.get(&key) {
            return Arc::clone(buf);
        }
        let resampled = imageops::resize(
            &*layer.source,
            key.width,
            key.height,
            imageops::FilterType::Triangle,
        );
        let filtered = apply_filters(resampled, layer.contrast, layer.inverted);
        let buf = Arc::new(filtered);
        self.filter_cache.insert(key, Arc::clone(&buf));
        buf
    }

    /// Place one layer's filtered buffer onto the output, inverse-mapping
    /// each output pixel through translate → rotate → flip and sampling
    /// bilinearly.  Rows are processed in parallel.
    fn draw_layer(&mut self, out: &mut RgbaImage, layer: &ImageLayer, origin: (f32, f32)) {
        if layer.opacity <= 0.0 || layer.width <= 0.0 || layer.height <= 0.0 {
            return;
        }
        let src = self.filtered_source(layer);
        let (cx, cy) = layer.center();
        let (sin, cos) = layer.rotation.to_radians().sin_cos();
        let half_w = layer.width / 2.0;
        let half_h = layer.height / 2.0;
        let src_w = src.width() as f32;
        let src_h = src.height() as f32;
        let opacity = layer.opacity.clamp(0.0, 1.0);
        let flip_h = layer.flip_horizontal;
        let flip_v = layer.flip_vertical;

        // Bound the pixel loop by the rotated box's AABB in raster space.
        let out_w = out.width() as usize;
        let out_h = out.height() as usize;
        let (x0, y0, x1, y1) = {
            let mut min_x = f32::MAX;
            let mut min_y = f32::MAX;
            let mut max_x = f32::MIN;
            let mut max_y = f32::MIN;
            for (dx, dy) in [
                (-half_w, -half_h),
                (half_w, -half_h),
                (-half_w, half_h),
                (half_w, half_h),
            ] {
                let rx = cx + dx * cos - dy * sin - origin.0;
                let ry = cy + dx * sin + dy * cos - origin.1;
                min_x = min_x.min(rx);
                min_y = min_y.min(ry);
                max_x = max_x.max(rx);
                max_y = max_y.max(ry);
            }
            (
                (min_x.floor() as i64).clamp(0, out_w as i64) as usize,
                (min_y.floor() as i64).clamp(0, out_h as i64) as usize,
                (max_x.ceil() as i64 + 1).clamp(0, out_w as i64) as usize,
                (max_y.ceil() as i64 + 1).clamp(0, out_h as i64) as usize,
            )
        };
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let stride = out_w * 4;
        let raw: &mut [u8] = &mut **out;
        raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
            if y < y0 || y >= y1 {
                return;
            }
            let qy = y as f32 + 0.5 + origin.1;
            for x in x0..x1 {
                let qx = x as f32 + 0.5 + origin.0;
                // Inverse transform: undo rotation, then flip (its own
                // inverse), then shift into the unrotated box frame.
                let dx = qx - cx;
                let dy = qy - cy;
                let mut lx = dx * cos + dy * sin;
                let mut ly = -dx * sin + dy * cos;
                if flip_h {
                    lx = -lx;
                }
                if flip_v {
                    ly = -ly;
                }
                let bx = lx + half_w;
                let by = ly + half_h;
                if bx < 0.0 || by < 0.0 || bx >= layer.width || by >= layer.height {
                    continue;
                }

                // Displayed units → buffer pixels.
                let sx = bx * src_w / layer.width - 0.5;
                let sy = by * src_h / layer.height - 0.5;
                let [r, g, b, a] = sample_bilinear(&src, sx, sy);

                let sa = a / 255.0 * opacity;
                if sa <= 0.0 {
                    continue;
                }
                let pi = x * 4;
                let da = row[pi + 3] as f32 / 255.0;
                let oa = sa + da * (1.0 - sa);
                for (c, src_c) in [r, g, b].into_iter().enumerate() {
                    let dst_c = row[pi + c] as f32;
                    let blended = (src_c * sa + dst_c * da * (1.0 - sa)) / oa;
                    row[pi + c] = blended.round().clamp(0.0, 255.0) as u8;
                }
                row[pi + 3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        });
    }
}

/// Output raster geometry: canvas-space origin of the top-left pixel plus
/// pixel dimensions.  The raster covers the union of the unrotated bounding
/// boxes (invisible overlay excluded) with the fixed padding on every side.
fn output_bounds(
    background: Option<&ImageLayer>,
    overlay: Option<&ImageLayer>,
) -> ((f32, f32), u32, u32) {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    let mut include = |layer: &ImageLayer| {
        let (lx0, ly0, lx1, ly1) = layer.bounds();
        bounds = Some(match bounds {
            None => (lx0, ly0, lx1, ly1),
            Some((bx0, by0, bx1, by1)) => {
                (bx0.min(lx0), by0.min(ly0), bx1.max(lx1), by1.max(ly1))
            }
        });
    };
    if let Some(bg) = background {
        include(bg);
    }
    if let Some(ov) = overlay
        && ov.visible
    {
        include(ov);
    }

    let (min_x, min_y, max_x, max_y) = bounds.unwrap_or((0.0, 0.0, 0.0, 0.0));
    let width = (max_x - min_x + CANVAS_PADDING * 2.0).ceil().max(1.0) as u32;
    let height = (max_y - min_y + CANVAS_PADDING * 2.0).ceil().max(1.0) as u32;
    ((min_x - CANVAS_PADDING, min_y - CANVAS_PADDING), width, height)
}

/// Contrast (multiplicative about the 127.5 midpoint, no-op at 1.0) followed
/// by RGB inversion.  Alpha is untouched by both.
fn apply_filters(buf: RgbaImage, contrast: f32, inverted: bool) -> RgbaImage {
    if contrast == 1.0 && !inverted {
        return buf;
    }
    let (w, h) = (buf.width(), buf.height());
    let mut raw = buf.into_raw();
    let stride = w as usize * 4;
    raw.par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            if contrast != 1.0 {
                for c in &mut px[..3] {
                    *c = ((*c as f32 - 127.5) * contrast + 127.5)
                        .round()
                        .clamp(0.0, 255.0) as u8;
                }
            }
            if inverted {
                px[0] = 255 - px[0];
                px[1] = 255 - px[1];
                px[2] = 255 - px[2];
            }
        }
    });
    RgbaImage::from_raw(w, h, raw).unwrap()
}

/// Bilinear sample with edge clamping; returns straight-alpha f32 channels.
fn sample_bilinear(src: &RgbaImage, sx: f32, sy: f32) -> [f32; 4] {
    let max_x = src.width() as i64 - 1;
    let max_y = src.height() as i64 - 1;
    let fx = sx.floor();
    let fy = sy.floor();
    let tx = sx - fx;
    let ty = sy - fy;
    let x0 = (fx as i64).clamp(0, max_x) as u32;
    let y0 = (fy as i64).clamp(0, max_y) as u32;
    let x1 = (fx as i64 + 1).clamp(0, max_x) as u32;
    let y1 = (fy as i64 + 1).clamp(0, max_y) as u32;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        let top = p00[c] as f32 * (1.0 - tx) + p10[c] as f32 * tx;
        let bottom = p01[c] as f32 * (1.0 - tx) + p11[c] as f32 * tx;
        out[c] = top * (1.0 - ty) + bottom * ty;
    }
    out
}

/// Stamp the 8 handle affordances: discs on the corners, squares on the edge
/// midpoints, all placed by rotating the unrotated positions about the layer
/// center.  The active handle gets the highlight fill.
fn draw_handles(out: &mut RgbaImage, layer: &ImageLayer, origin: (f32, f32), active: Handle) {
    let (cx, cy) = layer.center();
    let (sin, cos) = layer.rotation.to_radians().sin_cos();
    let place = |lx: f32, ly: f32| {
        let dx = lx - cx;
        let dy = ly - cy;
        (
            cx + dx * cos - dy * sin - origin.0,
            cy + dx * sin + dy * cos - origin.1,
        )
    };
    let (x, y, w, h) = (layer.x, layer.y, layer.width, layer.height);
    let fill = |handle: Handle| {
        if handle == active {
            HANDLE_ACTIVE_FILL
        } else {
            HANDLE_FILL
        }
    };

    for (handle, lx, ly) in [
        (Handle::TopLeft, x, y),
        (Handle::TopRight, x + w, y),
        (Handle::BottomLeft, x, y + h),
        (Handle::BottomRight, x + w, y + h),
    ] {
        let (px, py) = place(lx, ly);
        fill_disc(out, px, py, CORNER_HANDLE_RADIUS, fill(handle));
    }
    for (handle, lx, ly) in [
        (Handle::Top, x + w / 2.0, y),
        (Handle::Right, x + w, y + h / 2.0),
        (Handle::Bottom, x + w / 2.0, y + h),
        (Handle::Left, x, y + h / 2.0),
    ] {
        let (px, py) = place(lx, ly);
        fill_square(out, px, py, EDGE_HANDLE_HALF, fill(handle));
    }
}

fn fill_disc(out: &mut RgbaImage, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
    let r2 = radius * radius;
    for_handle_pixels(out, cx, cy, radius, |dx, dy| dx * dx + dy * dy <= r2, color);
}

fn fill_square(out: &mut RgbaImage, cx: f32, cy: f32, half: f32, color: Rgba<u8>) {
    for_handle_pixels(out, cx, cy, half, |dx, dy| dx.abs() <= half && dy.abs() <= half, color);
}

fn for_handle_pixels(
    out: &mut RgbaImage,
    cx: f32,
    cy: f32,
    extent: f32,
    inside: impl Fn(f32, f32) -> bool,
    color: Rgba<u8>,
) {
    let (w, h) = (out.width() as i64, out.height() as i64);
    let x0 = ((cx - extent).floor() as i64).clamp(0, w);
    let x1 = ((cx + extent).ceil() as i64 + 1).clamp(0, w);
    let y0 = ((cy - extent).floor() as i64).clamp(0, h);
    let y1 = ((cy + extent).ceil() as i64 + 1).clamp(0, h);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if inside(dx, dy) {
                out.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
