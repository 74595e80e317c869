// ============================================================================
// APP SHELL — eframe window wiring input, controls, and the compositor
// ============================================================================

use eframe::egui;
use egui::{Color32, CursorIcon, Key, Pos2, Rect, Sense, TextureOptions, Vec2, pos2};

use crate::compositor::Compositor;
use crate::geometry;
use crate::interaction::{self, DragState, Interaction};
use crate::keyboard;
use crate::layer::{Handle, ImageLayer, LayerSlot};
use crate::{io, log_err, log_info};

/// Keys consumed by the nudge controller, checked every frame.
const NUDGE_KEYS: [Key; 12] = [
    Key::W,
    Key::S,
    Key::A,
    Key::D,
    Key::Q,
    Key::E,
    Key::Z,
    Key::X,
    Key::C,
    Key::V,
    Key::F,
    Key::G,
];

pub struct OverlayFEApp {
    background: Option<ImageLayer>,
    overlay: Option<ImageLayer>,
    compositor: Compositor,
    interaction: Interaction,

    maintain_background_aspect: bool,
    maintain_overlay_aspect: bool,

    /// Reused GPU texture holding the latest composite.
    texture: Option<egui::TextureHandle>,
    /// Canvas-space coordinate of the composite's top-left pixel.
    composite_origin: (f32, f32),
    /// Canvas area measured last frame; drives fit-to-viewport on load and
    /// repaints on window/divider resizes.
    canvas_size: Vec2,

    /// Previous-frame shift state, for edge-detecting the visibility toggle.
    shift_was_down: bool,

    status: String,
}

impl OverlayFEApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            background: None,
            overlay: None,
            compositor: Compositor::new(),
            interaction: Interaction::new(),
            maintain_background_aspect: true,
            maintain_overlay_aspect: true,
            texture: None,
            composite_origin: (0.0, 0.0),
            canvas_size: Vec2::new(1280.0, 520.0),
            shift_was_down: false,
            status: "Load a background image to get started".to_string(),
        }
    }

    fn layer_slot(&mut self, slot: LayerSlot) -> &mut Option<ImageLayer> {
        match slot {
            LayerSlot::Background => &mut self.background,
            LayerSlot::Overlay => &mut self.overlay,
        }
    }

    /// Open-dialog → decode → replace the slot wholesale.  A failed decode
    /// leaves the previous layer in place.
    fn load_into_slot(&mut self, slot: LayerSlot) {
        let Some(path) = io::pick_image_file(&format!("Open {} image", slot.label())) else {
            return;
        };
        match io::load_layer(&path, self.canvas_size.x, self.canvas_size.y) {
            Ok(layer) => {
                log_info!(
                    "Loaded {} image {} ({}x{})",
                    slot.label(),
                    path.display(),
                    layer.original_width,
                    layer.original_height
                );
                self.status = format!("{}: {}", slot.label(), path.display());
                *self.layer_slot(slot) = Some(layer);
                self.compositor.request_render();
            }
            Err(e) => {
                log_err!("{}", e);
                self.status = e;
            }
        }
    }

    // ------------------------------------------------------------------
    //  Keyboard
    // ------------------------------------------------------------------

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let (shift, other_mods) = ctx.input(|i| {
            (
                i.modifiers.shift,
                i.modifiers.alt || i.modifiers.ctrl || i.modifiers.command,
            )
        });
        let shift_edge = shift && !other_mods && !self.shift_was_down;
        self.shift_was_down = shift && !other_mods;

        // Sliders and other focused widgets own the keyboard.
        if ctx.wants_keyboard_input() {
            return;
        }
        let lock = self.maintain_overlay_aspect;
        let Some(overlay) = &mut self.overlay else {
            return;
        };

        // A bare Shift press toggles overlay visibility; the key argument is
        // ignored on that path.
        if shift_edge && keyboard::handle_key(Key::Space, overlay, lock, true) {
            self.compositor.request_render();
            return;
        }

        for key in NUDGE_KEYS {
            if ctx.input(|i| i.key_pressed(key))
                && keyboard::handle_key(key, overlay, lock, false)
            {
                self.compositor.request_render();
            }
        }
    }

    // ------------------------------------------------------------------
    //  Canvas
    // ------------------------------------------------------------------

    fn composite_to_texture(&mut self, ctx: &egui::Context) {
        let composite = self.compositor.render(
            self.background.as_ref(),
            self.overlay.as_ref(),
            self.interaction.active_handle(),
        );
        self.composite_origin = composite.origin;
        let size = [
            composite.pixels.width() as usize,
            composite.pixels.height() as usize,
        ];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, composite.pixels.as_raw());
        match &mut self.texture {
            Some(tex) => tex.set(color_image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("composite", color_image, TextureOptions::NEAREST));
            }
        }
    }

    fn canvas_ui(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let avail = ui.available_size();
        if avail != self.canvas_size {
            // Window or divider resize — the layout changed under us.
            self.canvas_size = avail;
            self.compositor.request_render();
        }

        if self.background.is_none() && self.overlay.is_none() {
            ui.centered_and_justified(|ui| {
                ui.label("No images loaded. Use the panel below to open a background and an overlay.");
            });
            return;
        }

        if self.compositor.take_render_request() || self.texture.is_none() {
            self.composite_to_texture(ctx);
        }
        let Some(texture) = &self.texture else {
            return;
        };

        let tex_size = texture.size_vec2();
        let (rect, response) = ui.allocate_exact_size(tex_size, Sense::click_and_drag());
        ui.painter().image(
            texture.id(),
            rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );
        self.canvas_input(ctx, rect, &response);
    }

    fn canvas_input(&mut self, ctx: &egui::Context, rect: Rect, response: &egui::Response) {
        let origin = self.composite_origin;
        let to_canvas =
            |p: Pos2| pos2(p.x - rect.min.x + origin.0, p.y - rect.min.y + origin.1);

        // Per-drag override: holding Ctrl forces aspect lock regardless of
        // the panel toggle.
        let lock_aspect =
            self.maintain_overlay_aspect || ctx.input(|i| i.modifiers.ctrl || i.modifiers.command);

        let Some(overlay) = &mut self.overlay else {
            return;
        };

        if let Some(hover) = response.hover_pos()
            && !self.interaction.is_dragging()
        {
            let p = to_canvas(hover);
            ctx.set_cursor_icon(hover_cursor(p, overlay));
        }

        if response.drag_started()
            && let Some(p) = response.interact_pointer_pos()
            && self.interaction.pointer_down(to_canvas(p), overlay)
        {
            // Redraw immediately so the active handle highlight appears.
            self.compositor.request_render();
        } else if response.dragged()
            && let Some(p) = response.interact_pointer_pos()
            && self.interaction.pointer_move(to_canvas(p), overlay, lock_aspect)
        {
            self.compositor.request_render();
        }
        if response.drag_released() {
            if self.interaction.is_dragging() {
                self.compositor.request_render();
            }
            self.interaction.pointer_up();
        }
        if self.interaction.state() == DragState::Move {
            ctx.set_cursor_icon(CursorIcon::Grabbing);
        }

        if response.hovered() {
            let scroll = ctx.input(|i| i.scroll_delta.y);
            let shift = ctx.input(|i| i.modifiers.shift);
            // egui's wheel sign is inverted relative to the DOM convention
            // wheel_scale expects.
            if scroll != 0.0
                && interaction::wheel_scale(-scroll, shift, overlay, self.maintain_overlay_aspect)
            {
                self.compositor.request_render();
            }
        }
    }

    // ------------------------------------------------------------------
    //  Control panel
    // ------------------------------------------------------------------

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        let mut load_request: Option<LayerSlot> = None;
        let mut changed = false;

        ui.columns(2, |cols| {
            changed |= slot_controls(
                &mut cols[0],
                LayerSlot::Background,
                &mut self.background,
                &mut self.maintain_background_aspect,
                &mut load_request,
            );
            changed |= slot_controls(
                &mut cols[1],
                LayerSlot::Overlay,
                &mut self.overlay,
                &mut self.maintain_overlay_aspect,
                &mut load_request,
            );
        });

        ui.separator();
        ui.horizontal(|ui| {
            ui.label(&self.status);
            if let Some(overlay) = &self.overlay {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "Overlay: {:.0}×{:.0} at ({:.0}, {:.0}), {:.0}°",
                        overlay.width, overlay.height, overlay.x, overlay.y, overlay.rotation
                    ));
                });
            }
        });

        if changed {
            self.compositor.request_render();
        }
        if let Some(slot) = load_request {
            self.load_into_slot(slot);
        }
    }
}

/// Controls for one layer slot.  Returns whether anything changed that needs
/// a recomposite.
fn slot_controls(
    ui: &mut egui::Ui,
    slot: LayerSlot,
    layer: &mut Option<ImageLayer>,
    maintain_aspect: &mut bool,
    load_request: &mut Option<LayerSlot>,
) -> bool {
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.heading(slot.label());
        if ui.button("Load…").clicked() {
            *load_request = Some(slot);
        }
    });

    let Some(layer) = layer else {
        ui.weak("No image loaded");
        return false;
    };

    changed |= ui
        .add(egui::Slider::new(&mut layer.opacity, 0.0..=1.0).text("Opacity"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut layer.contrast, 0.0..=2.0).text("Contrast"))
        .changed();

    let mut rotation = layer.rotation;
    if ui
        .add(egui::Slider::new(&mut rotation, 0.0..=360.0).text("Rotation"))
        .changed()
    {
        layer.set_rotation(rotation);
        changed = true;
    }

    ui.horizontal(|ui| {
        if ui.button("Flip H").clicked() {
            layer.toggle_flip_horizontal();
            changed = true;
        }
        if ui.button("Flip V").clicked() {
            layer.toggle_flip_vertical();
            changed = true;
        }
        changed |= ui.checkbox(&mut layer.inverted, "Invert").changed();
        if slot == LayerSlot::Overlay {
            changed |= ui.checkbox(&mut layer.visible, "Visible").changed();
        }
    });

    ui.horizontal(|ui| {
        if ui.button("Reset size").clicked() {
            layer.reset_size();
            changed = true;
        }
        if ui.button("Reset rotation").clicked() {
            layer.reset_rotation();
            changed = true;
        }
        ui.checkbox(maintain_aspect, "Keep aspect");
    });

    changed
}

/// Cursor feedback for whatever sits under the pointer.
fn hover_cursor(p: Pos2, overlay: &ImageLayer) -> CursorIcon {
    if !overlay.visible {
        return CursorIcon::Default;
    }
    match geometry::handle_at_point(p.x, p.y, overlay) {
        Handle::TopLeft | Handle::BottomRight => CursorIcon::ResizeNwSe,
        Handle::TopRight | Handle::BottomLeft => CursorIcon::ResizeNeSw,
        Handle::Top | Handle::Right | Handle::Bottom | Handle::Left => CursorIcon::Crosshair,
        Handle::None => {
            if geometry::point_in_rotated_box(p.x, p.y, overlay) {
                CursorIcon::Grab
            } else {
                CursorIcon::Default
            }
        }
    }
}

impl eframe::App for OverlayFEApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard(ctx);

        egui::TopBottomPanel::bottom("controls")
            .resizable(true)
            .default_height(200.0)
            .height_range(150.0..=500.0)
            .show(ctx, |ui| {
                self.controls_ui(ui);
            });

        // No scroll container here: wheel input over the canvas belongs to
        // the overlay-scaling gesture.
        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_ui(ctx, ui);
        });
    }
}
