// ============================================================================
// OverlayFE — interactive two-layer image compositing
// ============================================================================
//
// Architecture:
//   layer.rs       — ImageLayer model, Handle enum, layer invariants
//   geometry.rs    — rotated-box hit-testing and handle-drag transform math
//   keyboard.rs    — discrete-step keyboard nudges
//   interaction.rs — pointer drag state machine and wheel scaling
//   compositor.rs  — CPU compositing pipeline, filter cache, render flag
//   io.rs          — image decode, fit-to-viewport sizing, file dialogs
//   app.rs         — eframe shell wiring the above to a window
// ============================================================================

pub mod app;
pub mod compositor;
pub mod geometry;
pub mod interaction;
pub mod io;
pub mod keyboard;
pub mod layer;
pub mod logger;

pub use compositor::{Composite, Compositor};
pub use interaction::{DragState, Interaction};
pub use layer::{Handle, ImageLayer, LayerSlot};
