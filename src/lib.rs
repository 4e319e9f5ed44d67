//! Mathematical morphology and convolution for raster images.
//!
//! This crate implements the morphology engine of an image-processing
//! pipeline: user-supplied kernel definitions are parsed or generated from
//! named families (Gaussian, Laplacian, Sobel, disk, diamond, distance,
//! hit-and-miss, skeletonising, ...), and one or more kernels are applied to
//! an image under a morphological method - convolve, erode/dilate,
//! open/close, top-hat, edge, thinning/thickening, hit-and-miss, correlate,
//! distance, intensity erode/dilate, or smooth.
//!
//! The image container itself is out of scope: pixels enter and leave
//! through [`SharedImageSurface`], a read-only RGBA view that the caller
//! fills from whatever storage it has.
//!
//! # Example
//!
//! ```
//! use pixmorph::{apply_default, KernelList, MorphologyMethod, Pixel, SharedImageSurface};
//!
//! // A 5x5 black canvas with a white center pixel.
//! let mut pixels = vec![Pixel::new(0, 0, 0, 255); 25];
//! pixels[12] = Pixel::new(255, 255, 255, 255);
//! let image = SharedImageSurface::from_pixels(5, 5, &pixels).unwrap();
//!
//! // Dilate it once with a 3x3 square structuring element.
//! let kernels = KernelList::parse("Square:1").unwrap();
//! let dilated = apply_default(&image, MorphologyMethod::Dilate, 1, &kernels)
//!     .unwrap()
//!     .expect("one iteration requested");
//!
//! assert_eq!(dilated.get_pixel(1, 1).r, 255);
//! ```
//!
//! Kernel strings follow the `WxH[+X+Y]:v,v,...` convention, with `nan` or
//! `-` for masked cells, `;` to chain several kernels, and named forms such
//! as `"Gaussian:0x2"` or `"LineEnds"`; see [`kernel::parser`].

pub use crate::error::{KernelError, MorphologyError, ValueErrorKind};
pub use crate::geometry::{GeometryFlags, KernelArgs};
pub use crate::kernel::{Kernel, KernelList, KernelType, ScaleFlags};
pub use crate::morphology::{
    apply, apply_default, composite, Channels, CompositeOperator, MorphologyMethod,
};
pub use crate::options::Options;
pub use crate::rect::{IRect, Rect};
pub use crate::surface_utils::{
    shared_surface::{ExclusiveImageSurface, SharedImageSurface},
    EdgeMode, Pixel, PixelOps,
};

#[macro_use]
pub mod log;

#[macro_use]
mod util;

mod error;
mod geometry;
pub mod kernel;
pub mod morphology;
mod options;
mod rect;
pub mod surface_utils;
