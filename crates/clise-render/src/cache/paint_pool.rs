//! Reusable paint objects.
//!
//! Paints are handed out as [`PooledPaint`] guards which return themselves
//! to the pool when dropped, so every exit path of a draw routine releases
//! what it acquired.

use crate::surface::{Paint, PaintStyle};
use peniko::Color;
use std::cell::{Cell, RefCell};
use std::ops::{Deref, DerefMut};

/// Largest number of idle paints kept for reuse.
pub const MAX_POOL_SIZE: usize = 50;

/// Free list of [`Paint`]s.
#[derive(Debug)]
pub struct PaintPool {
    free: RefCell<Vec<Paint>>,
    max_size: usize,
    allocations: Cell<usize>,
    disposals: Cell<usize>,
}

impl Default for PaintPool {
    fn default() -> Self {
        Self::new(MAX_POOL_SIZE)
    }
}

impl PaintPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            free: RefCell::new(Vec::with_capacity(max_size)),
            max_size,
            allocations: Cell::new(0),
            disposals: Cell::new(0),
        }
    }

    fn acquire(&self) -> Paint {
        match self.free.borrow_mut().pop() {
            Some(mut paint) => {
                paint.reset();
                paint
            }
            None => {
                self.allocations.set(self.allocations.get() + 1);
                Paint::default()
            }
        }
    }

    fn release(&self, mut paint: Paint) {
        paint.clear_effects();
        let mut free = self.free.borrow_mut();
        if free.len() < self.max_size {
            free.push(paint);
        } else {
            self.disposals.set(self.disposals.get() + 1);
        }
    }

    /// A fill paint of `color` with all other state reset.
    pub fn fill(&self, color: Color) -> PooledPaint<'_> {
        let mut paint = self.acquire();
        paint.color = color;
        paint.style = PaintStyle::Fill;
        PooledPaint {
            pool: self,
            paint,
        }
    }

    /// A stroke paint of `color` and `width` with all other state reset.
    pub fn stroke(&self, color: Color, width: f64) -> PooledPaint<'_> {
        let mut paint = self.acquire();
        paint.color = color;
        paint.style = PaintStyle::Stroke;
        paint.stroke_width = width;
        PooledPaint {
            pool: self,
            paint,
        }
    }

    /// Idle paints ready for reuse.
    pub fn free_count(&self) -> usize {
        self.free.borrow().len()
    }

    /// Paints created because the free list was empty.
    pub fn allocations(&self) -> usize {
        self.allocations.get()
    }

    /// Paints dropped because the free list was full.
    pub fn disposals(&self) -> usize {
        self.disposals.get()
    }

    /// Drop every idle paint.
    pub fn clear(&self) {
        let mut free = self.free.borrow_mut();
        self.disposals.set(self.disposals.get() + free.len());
        free.clear();
    }
}

/// A paint borrowed from a [`PaintPool`].
#[derive(Debug)]
pub struct PooledPaint<'a> {
    pool: &'a PaintPool,
    paint: Paint,
}

impl Deref for PooledPaint<'_> {
    type Target = Paint;

    fn deref(&self) -> &Paint {
        &self.paint
    }
}

impl DerefMut for PooledPaint<'_> {
    fn deref_mut(&mut self) -> &mut Paint {
        &mut self.paint
    }
}

impl Drop for PooledPaint<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.paint));
    }
}
