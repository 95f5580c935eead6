use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::overlay::domain::overlay_renderer::{Drawable, OverlayRenderer};

struct OverlayState {
    staged: Vec<Drawable>,
    visible: Arc<Vec<Drawable>>,
}

/// In-memory overlay. Drawables are staged between `clear` and `redraw`,
/// and `snapshot` hands a draw pass the last published list.
pub struct SharedOverlay {
    state: Mutex<OverlayState>,
    redraws: AtomicU64,
}

impl SharedOverlay {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OverlayState {
                staged: Vec::new(),
                visible: Arc::new(Vec::new()),
            }),
            redraws: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Drawable>> {
        Arc::clone(&self.lock().visible)
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, OverlayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRenderer for SharedOverlay {
    fn clear(&self) {
        self.lock().staged.clear();
    }

    fn add_drawable(&self, drawable: Drawable) {
        self.lock().staged.push(drawable);
    }

    fn redraw(&self) {
        let mut state = self.lock();
        state.visible = Arc::new(state.staged.clone());
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}
