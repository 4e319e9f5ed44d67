//! Pixel iterators for `SharedImageSurface`.

use crate::rect::IRect;

use super::shared_surface::SharedImageSurface;
use super::{EdgeMode, Pixel};

/// Iterator over every pixel of a surface, in row-major order.
#[derive(Debug, Clone, Copy)]
pub struct Pixels<'a> {
    surface: &'a SharedImageSurface,
    x: u32,
    y: u32,
}

/// Iterator over one kernel-sized neighbourhood of a source pixel.
///
/// The window is anchored at `window.x0/y0` in image coordinates, which the
/// primitives compute by shifting the output position by the effective
/// kernel origin.  Iteration yields each *kernel cell* position `(u, v)`
/// together with the source pixel underneath it, so the per-pixel
/// accumulators can look the cell weight up directly; positions outside the
/// image resolve through the given [`EdgeMode`].
#[derive(Debug, Clone, Copy)]
pub struct KernelWindow<'a> {
    surface: &'a SharedImageSurface,
    window: IRect,
    edge_mode: EdgeMode,
    u: i32,
    v: i32,
}

impl<'a> Pixels<'a> {
    /// Creates an iterator over the image surface pixels.
    #[inline]
    pub fn new(surface: &'a SharedImageSurface) -> Self {
        Self {
            surface,
            x: 0,
            y: 0,
        }
    }
}

impl<'a> KernelWindow<'a> {
    /// Creates an iterator over the `window` rectangle, which may extend
    /// beyond the surface bounds.
    #[inline]
    pub fn new(surface: &'a SharedImageSurface, window: IRect, edge_mode: EdgeMode) -> Self {
        assert!(window.x1 >= window.x0);
        assert!(window.y1 >= window.y0);

        Self {
            surface,
            window,
            edge_mode,
            u: 0,
            v: 0,
        }
    }
}

impl<'a> Iterator for Pixels<'a> {
    type Item = (u32, u32, Pixel);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // Surfaces are never zero-sized, so row exhaustion is the only end.
        if self.y == self.surface.height() as u32 {
            return None;
        }

        let rv = Some((self.x, self.y, self.surface.get_pixel(self.x, self.y)));

        self.x += 1;
        if self.x == self.surface.width() as u32 {
            self.x = 0;
            self.y += 1;
        }

        rv
    }
}

impl<'a> Iterator for KernelWindow<'a> {
    type Item = (u32, u32, Pixel);

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.window.width() == 0 || self.v == self.window.height() {
            return None;
        }

        let (u, v) = (self.u, self.v);
        let x = self.window.x0 + u;
        let y = self.window.y0 + v;

        let pixel = if self.surface.bounds().contains(x, y) {
            self.surface.get_pixel(x as u32, y as u32)
        } else {
            match self.edge_mode {
                EdgeMode::Duplicate => self.surface.get_pixel_clamped(x, y),
                EdgeMode::Transparent => Pixel::default(),
            }
        };

        self.u += 1;
        if self.u == self.window.width() {
            self.u = 0;
            self.v += 1;
        }

        Some((u as u32, v as u32, pixel))
    }
}
