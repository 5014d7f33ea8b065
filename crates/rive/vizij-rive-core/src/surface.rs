//! Target surface the player lays content out on.

use std::sync::atomic::{AtomicU32, Ordering};

/// Pixel-sized drawing target. Only its dimensions matter to the control plane.
pub trait Surface: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// In-memory surface with resizable dimensions.
#[derive(Debug, Default)]
pub struct Canvas {
    width: AtomicU32,
    height: AtomicU32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
        }
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
    }
}

impl Surface for Canvas {
    fn width(&self) -> u32 {
        self.width.load(Ordering::Relaxed)
    }

    fn height(&self) -> u32 {
        self.height.load(Ordering::Relaxed)
    }
}
