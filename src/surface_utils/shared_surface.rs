//! Shared and exclusive access to image pixel storage.

use std::sync::Arc;

use crate::error::MorphologyError;
use crate::rect::IRect;

use super::{ImageSurfaceDataExt, Pixel};

/// Wrapper for image pixel data that allows shared read-only access.
///
/// The morphology primitives read a source surface while writing a separate
/// destination surface, and the dispatcher swaps whole images between method
/// stages.  Sharing the backing buffer behind an `Arc` makes those swaps and
/// the saved-original captures cheap, while the type system guarantees that
/// nothing can scribble over a surface some other stage still reads.
#[derive(Debug, Clone)]
pub struct SharedImageSurface {
    data: Arc<Vec<u8>>,

    width: i32,
    height: i32,
    stride: usize,
}

/// An image surface with exclusive access to its pixel data.
///
/// This is the only kind of surface that can be modified.  Once a primitive
/// has filled it, `share()` converts it into a `SharedImageSurface` without
/// copying.
#[derive(Debug)]
pub struct ExclusiveImageSurface {
    data: Vec<u8>,

    width: i32,
    height: i32,
    stride: usize,
}

fn checked_layout(width: i32, height: i32) -> Result<usize, MorphologyError> {
    if width <= 0 || height <= 0 {
        return Err(MorphologyError::Allocation(format!(
            "invalid surface size {}x{}",
            width, height
        )));
    }

    (width as usize)
        .checked_mul(4)
        .and_then(|stride| stride.checked_mul(height as usize))
        .ok_or_else(|| {
            MorphologyError::Allocation(format!("surface size {}x{} overflows", width, height))
        })
}

impl SharedImageSurface {
    /// Creates a fully transparent surface of the given size.
    pub fn empty(width: i32, height: i32) -> Result<SharedImageSurface, MorphologyError> {
        let len = checked_layout(width, height)?;

        Ok(SharedImageSurface {
            data: Arc::new(vec![0; len]),
            width,
            height,
            stride: width as usize * 4,
        })
    }

    /// Creates a surface from a row-major pixel vector.
    ///
    /// The vector length must be exactly `width * height`.
    pub fn from_pixels(
        width: i32,
        height: i32,
        pixels: &[Pixel],
    ) -> Result<SharedImageSurface, MorphologyError> {
        let len = checked_layout(width, height)?;

        if pixels.len() * 4 != len {
            return Err(MorphologyError::Allocation(format!(
                "expected {} pixels for a {}x{} surface, got {}",
                len / 4,
                width,
                height,
                pixels.len()
            )));
        }

        let mut surface = ExclusiveImageSurface::new(width, height)?;
        surface.modify(&mut |data, stride| {
            for (i, pixel) in pixels.iter().enumerate() {
                let x = (i % width as usize) as u32;
                let y = (i / width as usize) as u32;
                data.set_pixel(stride, *pixel, x, y);
            }
        });

        surface.share()
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The full-image bounds rectangle.
    #[inline]
    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.width, self.height)
    }

    /// Retrieves the pixel value at the given coordinates.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        assert!(x < self.width as u32);
        assert!(y < self.height as u32);

        let base = y as usize * self.stride + x as usize * 4;
        Pixel {
            r: self.data[base],
            g: self.data[base + 1],
            b: self.data[base + 2],
            a: self.data[base + 3],
        }
    }

    /// Retrieves the pixel at the given coordinates with edge clamping.
    #[inline]
    pub fn get_pixel_clamped(&self, x: i32, y: i32) -> Pixel {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        self.get_pixel(x as u32, y as u32)
    }

    /// Converts this surface back into an exclusive one, copying the pixel
    /// data only if somebody else still holds a reference to it.
    pub fn into_exclusive(self) -> ExclusiveImageSurface {
        let SharedImageSurface {
            data,
            width,
            height,
            stride,
        } = self;

        let data = Arc::try_unwrap(data).unwrap_or_else(|shared| (*shared).clone());

        ExclusiveImageSurface {
            data,
            width,
            height,
            stride,
        }
    }

    /// Counts the pixels that differ between two equally-sized surfaces.
    pub fn diff_count(&self, other: &SharedImageSurface) -> usize {
        assert_eq!((self.width, self.height), (other.width, other.height));

        self.data
            .chunks_exact(4)
            .zip(other.data.chunks_exact(4))
            .filter(|(a, b)| a != b)
            .count()
    }
}

impl PartialEq for SharedImageSurface {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && *self.data == *other.data
    }
}

impl ExclusiveImageSurface {
    /// Creates a new, fully transparent surface.
    pub fn new(width: i32, height: i32) -> Result<ExclusiveImageSurface, MorphologyError> {
        let len = checked_layout(width, height)?;

        Ok(ExclusiveImageSurface {
            data: vec![0; len],
            width,
            height,
            stride: width as usize * 4,
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Calls the closure with the surface data and stride for modification.
    pub fn modify(&mut self, draw_fn: &mut dyn FnMut(&mut [u8], usize)) {
        draw_fn(self.data.as_mut_slice(), self.stride)
    }

    /// Runs `f` over every destination row, in parallel, and sums whatever
    /// the rows return (the primitives return changed-pixel counts).
    ///
    /// Rows are disjoint slices of the backing buffer, so the row closures
    /// never observe each other's writes; ordering across rows is not
    /// observable either, which is what makes this safe to schedule freely.
    pub fn par_modify_rows<F>(&mut self, f: F) -> usize
    where
        F: Fn(u32, &mut [u8]) -> usize + Send + Sync,
    {
        use rayon::prelude::*;

        self.data
            .par_chunks_mut(self.stride)
            .enumerate()
            .map(|(y, row)| f(y as u32, row))
            .sum()
    }

    /// Sets the pixel at the given coordinates.
    #[inline]
    pub fn set_pixel(&mut self, pixel: Pixel, x: u32, y: u32) {
        let stride = self.stride;
        self.data.set_pixel(stride, pixel, x, y);
    }

    /// Converts this surface into a shared one without copying.
    pub fn share(self) -> Result<SharedImageSurface, MorphologyError> {
        Ok(SharedImageSurface {
            data: Arc::new(self.data),
            width: self.width,
            height: self.height,
            stride: self.stride,
        })
    }
}

/// Writes a pixel into a bare row slice, as handed out by `par_modify_rows`.
#[inline]
pub fn set_row_pixel(row: &mut [u8], pixel: Pixel, x: u32) {
    let base = x as usize * 4;
    row[base..base + 4].copy_from_slice(&[pixel.r, pixel.g, pixel.b, pixel.a]);
}

/// Reads a pixel back from a bare row slice.
#[inline]
pub fn get_row_pixel(row: &[u8], x: u32) -> Pixel {
    let base = x as usize * 4;
    Pixel {
        r: row[base],
        g: row[base + 1],
        b: row[base + 2],
        a: row[base + 3],
    }
}
