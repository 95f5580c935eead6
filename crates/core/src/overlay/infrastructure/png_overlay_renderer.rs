use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgb, RgbImage};

use crate::overlay::domain::overlay_renderer::{Drawable, OverlayRenderer};
use crate::overlay::infrastructure::shared_overlay::SharedOverlay;
use crate::shared::face::{BoundingBox, Point};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const POINT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BOX_THICKNESS: i32 = 2;
const POINT_RADIUS: i32 = 2;

/// Writes every redrawn scene to `<dir>/preview_<n>.png`.
pub struct PngOverlayRenderer {
    overlay: SharedOverlay,
    dir: PathBuf,
    written: AtomicUsize,
}

impl PngOverlayRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            overlay: SharedOverlay::new(),
            dir,
            written: AtomicUsize::new(0),
        })
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }
}

impl OverlayRenderer for PngOverlayRenderer {
    fn clear(&self) {
        self.overlay.clear();
    }

    fn add_drawable(&self, drawable: Drawable) {
        self.overlay.add_drawable(drawable);
    }

    fn redraw(&self) {
        self.overlay.redraw();
        let Some(canvas) = compose(&self.overlay.snapshot()) else {
            log::debug!("Nothing to render: scene has no camera image");
            return;
        };
        let n = self.written.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("preview_{n:05}.png"));
        if let Err(e) = canvas.save(&path) {
            log::warn!("Failed to write {}: {e}", path.display());
        }
    }
}

/// Flatten a scene onto its camera image. `None` when there is no image.
pub fn compose(drawables: &[Drawable]) -> Option<RgbImage> {
    let mut canvas = drawables.iter().find_map(|d| match d {
        Drawable::CameraImage(img) => Some(img.clone()),
        Drawable::Face(_) => None,
    })?;
    for drawable in drawables {
        if let Drawable::Face(face) = drawable {
            draw_box(&mut canvas, &face.bounding_box);
            for point in &face.contour {
                draw_point(&mut canvas, point);
            }
        }
    }
    Some(canvas)
}

fn draw_box(canvas: &mut RgbImage, b: &BoundingBox) {
    for t in 0..BOX_THICKNESS {
        for x in b.x..b.right() {
            put(canvas, x, b.y + t, BOX_COLOR);
            put(canvas, x, b.bottom() - 1 - t, BOX_COLOR);
        }
        for y in b.y..b.bottom() {
            put(canvas, b.x + t, y, BOX_COLOR);
            put(canvas, b.right() - 1 - t, y, BOX_COLOR);
        }
    }
}

fn draw_point(canvas: &mut RgbImage, p: &Point) {
    let (cx, cy) = (p.x.round() as i32, p.y.round() as i32);
    for dy in -POINT_RADIUS..=POINT_RADIUS {
        for dx in -POINT_RADIUS..=POINT_RADIUS {
            put(canvas, cx + dx, cy + dy, POINT_COLOR);
        }
    }
}

/// Clipped pixel write.
fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}
