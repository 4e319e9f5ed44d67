//! Various utilities for working with image pixel data.

pub mod iterators;
pub mod shared_surface;

/// The largest value a channel sample can take.
pub const QUANTUM_RANGE: u8 = u8::MAX;

/// `QUANTUM_RANGE` as the float the accumulators work in.
pub const QUANTUM_MAX: f64 = QUANTUM_RANGE as f64;

/// A pixel consisting of R, G, B and A values.
pub type Pixel = rgb::RGBA8;

/// How neighbourhood positions outside the image resolve.
///
/// A kernel window hangs over the border whenever the output pixel is close
/// to it; these are the two policies the primitives need for that case.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EdgeMode {
    /// The nearest inbounds pixel value is returned, as if the border rows
    /// and columns extended outward forever.
    Duplicate,
    /// Fully transparent black, which contributes nothing to any
    /// accumulator.
    Transparent,
}

/// Extension methods for raw image data slices.
pub trait ImageSurfaceDataExt {
    /// Sets the pixel at the given coordinates.  Assumes RGBA byte layout.
    fn set_pixel(&mut self, stride: usize, pixel: Pixel, x: u32, y: u32);
}

pub trait PixelOps {
    fn diff(&self, other: &Self) -> Self;
    fn luminance(&self) -> f64;
    fn to_u32(&self) -> u32;
    fn from_u32(x: u32) -> Self;
}

impl PixelOps for Pixel {
    #[inline]
    fn diff(&self, other: &Pixel) -> Pixel {
        self.iter()
            .zip(other.iter())
            .map(|(l, r)| (l as i32 - r as i32).unsigned_abs() as u8)
            .collect()
    }

    /// Rec. 709 luma of the color channels, ignoring alpha.
    ///
    /// Y = 0.2126 R + 0.7152 G + 0.0722 B
    #[inline]
    fn luminance(&self) -> f64 {
        0.2126 * f64::from(self.r) + 0.7152 * f64::from(self.g) + 0.0722 * f64::from(self.b)
    }

    /// Returns the pixel value as a `u32` in RGBA order, most significant byte first.
    #[inline]
    fn to_u32(&self) -> u32 {
        (u32::from(self.r) << 24)
            | (u32::from(self.g) << 16)
            | (u32::from(self.b) << 8)
            | u32::from(self.a)
    }

    /// Converts an RGBA-order `u32` into a `Pixel`.
    #[inline]
    fn from_u32(x: u32) -> Self {
        Self {
            r: ((x >> 24) & 0xFF) as u8,
            g: ((x >> 16) & 0xFF) as u8,
            b: ((x >> 8) & 0xFF) as u8,
            a: (x & 0xFF) as u8,
        }
    }
}

impl ImageSurfaceDataExt for [u8] {
    #[inline]
    fn set_pixel(&mut self, stride: usize, pixel: Pixel, x: u32, y: u32) {
        use byteorder::{BigEndian, WriteBytesExt};
        let mut this = &mut self[y as usize * stride + x as usize * 4..];
        this.write_u32::<BigEndian>(pixel.to_u32())
            .expect("out of bounds pixel access on [u8]");
    }
}
