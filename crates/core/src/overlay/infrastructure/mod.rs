pub mod png_overlay_renderer;
pub mod shared_overlay;
