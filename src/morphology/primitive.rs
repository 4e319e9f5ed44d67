//! The per-pixel morphology primitives.
//!
//! One call runs one primitive with one kernel over every pixel of a source
//! surface, writing a fresh destination surface and counting the pixels that
//! changed.  Destination rows are processed in parallel; each row reads its
//! own neighbourhoods from the shared source and writes one disjoint
//! destination row, so row order is not observable.

use crate::error::MorphologyError;
use crate::kernel::Kernel;
use crate::rect::IRect;
use crate::surface_utils::{
    iterators::KernelWindow,
    shared_surface::{set_row_pixel, ExclusiveImageSurface, SharedImageSurface},
    EdgeMode, Pixel, PixelOps, QUANTUM_MAX,
};
use crate::util::clamp;

use super::method::Primitive;
use super::Channels;

/// Accumulator sums smaller than this count as zero when normalizing the
/// alpha weighting.
const GAMMA_EPSILON: f64 = 1.0e-10;

/// Hit-and-miss cells above this threshold must match foreground.
const HIT_THRESHOLD: f64 = 0.7;
/// Hit-and-miss cells below this threshold must match background.
const MISS_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
pub(crate) struct PrimitiveOptions {
    pub channels: Channels,
    /// Seed value for the convolution accumulators, in quantum units.
    pub bias: f64,
    pub edge_mode: EdgeMode,
}

impl Default for PrimitiveOptions {
    fn default() -> PrimitiveOptions {
        PrimitiveOptions {
            channels: Channels::ALL,
            bias: 0.0,
            edge_mode: EdgeMode::Duplicate,
        }
    }
}

#[inline]
fn to_quantum(v: f64) -> u8 {
    (clamp(v, 0.0, QUANTUM_MAX) + 0.5) as u8
}

#[inline]
fn channels_of(p: Pixel) -> [u8; 4] {
    [p.r, p.g, p.b, p.a]
}

#[inline]
fn pixel_from(c: [u8; 4]) -> Pixel {
    Pixel {
        r: c[0],
        g: c[1],
        b: c[2],
        a: c[3],
    }
}

/// Applies one primitive with one kernel to the whole source surface.
///
/// Returns the destination surface and the number of pixels whose output
/// differs from the source.  The kernel must not change while this runs;
/// scale and rotate it beforehand.
pub(crate) fn apply_primitive(
    primitive: Primitive,
    source: &SharedImageSurface,
    kernel: &Kernel,
    options: &PrimitiveOptions,
) -> Result<(SharedImageSurface, usize), MorphologyError> {
    let (kw, kh) = (kernel.width() as i32, kernel.height() as i32);
    let (kx, ky) = {
        let (x, y) = kernel.origin();
        (x as i32, y as i32)
    };

    // Dilate-like primitives pair the neighbourhood with the 180°-rotated
    // kernel, which also shifts the window to the reflected origin.
    let reflect = primitive.reflected_pairing();
    let (ox, oy) = if reflect {
        (kw - 1 - kx, kh - 1 - ky)
    } else {
        (kx, ky)
    };

    let width = source.width() as u32;

    let mut surface = ExclusiveImageSurface::new(source.width(), source.height())?;

    let changed = surface.par_modify_rows(|y, row| {
        let mut row_changed = 0;

        for x in 0..width {
            let src_pixel = source.get_pixel(x, y);

            let window = IRect::new(
                x as i32 - ox,
                y as i32 - oy,
                x as i32 - ox + kw,
                y as i32 - oy + kh,
            );

            let cell = |u: u32, v: u32| -> Option<f64> {
                let (mut u, mut v) = (u as usize, v as usize);
                if reflect {
                    u = kw as usize - 1 - u;
                    v = kh as usize - 1 - v;
                }
                kernel.get(u, v)
            };

            let neighbourhood = || KernelWindow::new(source, window, options.edge_mode);

            let output = match primitive {
                Primitive::Convolve => convolve_pixel(neighbourhood(), &cell, options.bias),
                Primitive::Erode => erode_dilate_pixel(neighbourhood(), &cell, false),
                Primitive::Dilate => erode_dilate_pixel(neighbourhood(), &cell, true),
                Primitive::HitAndMiss => hit_miss_pattern(neighbourhood(), &cell),
                Primitive::Thinning => {
                    let pattern = hit_miss_pattern(neighbourhood(), &cell);
                    subtract_pattern(src_pixel, pattern)
                }
                Primitive::Thickening => {
                    let pattern = hit_miss_pattern(neighbourhood(), &cell);
                    overlay_pattern(src_pixel, pattern)
                }
                Primitive::ErodeIntensity => {
                    intensity_pixel(neighbourhood(), &cell, src_pixel, false)
                }
                Primitive::DilateIntensity => {
                    intensity_pixel(neighbourhood(), &cell, src_pixel, true)
                }
                Primitive::Distance => distance_pixel(neighbourhood(), &cell, src_pixel),
            };

            let result = if primitive.ignores_channel_mask() {
                output
            } else {
                options.channels.merge(output, src_pixel)
            };

            set_row_pixel(row, result, x);
            if result != src_pixel {
                row_changed += 1;
            }
        }

        row_changed
    });

    Ok((surface.share()?, changed))
}

/// Alpha-weighted weighted sum.  Color channels are weighted by the
/// neighbour's coverage and renormalized by the accumulated coverage, so
/// transparent neighbours do not darken the result; alpha accumulates with
/// the kernel weight alone.
fn convolve_pixel<'a, F>(neighbourhood: KernelWindow<'a>, cell: &F, bias: f64) -> Pixel
where
    F: Fn(u32, u32) -> Option<f64>,
{
    let mut r = bias;
    let mut g = bias;
    let mut b = bias;
    let mut a = bias;
    let mut gamma = 0.0;

    for (u, v, p) in neighbourhood {
        let Some(k) = cell(u, v) else {
            continue;
        };

        let coverage = f64::from(p.a) / QUANTUM_MAX;
        r += k * coverage * f64::from(p.r);
        g += k * coverage * f64::from(p.g);
        b += k * coverage * f64::from(p.b);
        a += k * f64::from(p.a);
        gamma += k * coverage;
    }

    let gamma = if gamma.abs() < GAMMA_EPSILON {
        1.0
    } else {
        gamma
    };

    Pixel {
        r: to_quantum(r / gamma),
        g: to_quantum(g / gamma),
        b: to_quantum(b / gamma),
        a: to_quantum(a),
    }
}

/// Channel-wise minimum (erode) or maximum (dilate) over the cells that are
/// part of the structuring element.
fn erode_dilate_pixel<'a, F>(neighbourhood: KernelWindow<'a>, cell: &F, dilate: bool) -> Pixel
where
    F: Fn(u32, u32) -> Option<f64>,
{
    let mut acc = if dilate { [u8::MIN; 4] } else { [u8::MAX; 4] };

    for (u, v, p) in neighbourhood {
        match cell(u, v) {
            Some(k) if k >= 0.5 => {
                let p = channels_of(p);
                for (acc, p) in acc.iter_mut().zip(p) {
                    *acc = if dilate { (*acc).max(p) } else { (*acc).min(p) };
                }
            }
            _ => (),
        }
    }

    pixel_from(acc)
}

/// The hit-and-miss response: how far the foreground cells all match while
/// the background cells all miss, clamped at zero.
fn hit_miss_pattern<'a, F>(neighbourhood: KernelWindow<'a>, cell: &F) -> Pixel
where
    F: Fn(u32, u32) -> Option<f64>,
{
    let mut mins = [u8::MAX; 4];
    let mut maxs = [u8::MIN; 4];

    for (u, v, p) in neighbourhood {
        let Some(k) = cell(u, v) else {
            continue;
        };

        let p = channels_of(p);
        if k > HIT_THRESHOLD {
            for (m, p) in mins.iter_mut().zip(p) {
                *m = (*m).min(p);
            }
        } else if k < MISS_THRESHOLD {
            for (m, p) in maxs.iter_mut().zip(p) {
                *m = (*m).max(p);
            }
        }
    }

    let mut pattern = [0u8; 4];
    for i in 0..4 {
        pattern[i] = mins[i].saturating_sub(maxs[i]);
    }

    pixel_from(pattern)
}

fn subtract_pattern(src: Pixel, pattern: Pixel) -> Pixel {
    let (s, p) = (channels_of(src), channels_of(pattern));
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = s[i].saturating_sub(p[i]);
    }
    pixel_from(out)
}

fn overlay_pattern(src: Pixel, pattern: Pixel) -> Pixel {
    let (s, p) = (channels_of(src), channels_of(pattern));
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = s[i].max(p[i]);
    }
    pixel_from(out)
}

/// Copies the whole pixel with the smallest (erode) or largest (dilate)
/// luma among the structuring-element neighbours.
fn intensity_pixel<'a, F>(
    neighbourhood: KernelWindow<'a>,
    cell: &F,
    src_pixel: Pixel,
    brightest: bool,
) -> Pixel
where
    F: Fn(u32, u32) -> Option<f64>,
{
    let mut out = src_pixel;
    let mut found = false;

    for (u, v, p) in neighbourhood {
        match cell(u, v) {
            Some(k) if k >= 0.5 => {
                let replace = !found
                    || if brightest {
                        p.luminance() > out.luminance()
                    } else {
                        p.luminance() < out.luminance()
                    };

                if replace {
                    out = p;
                    found = true;
                }
            }
            _ => (),
        }
    }

    out
}

/// One chamfer propagation step: the channel-wise minimum of the current
/// value and every neighbour increased by its kernel distance.
fn distance_pixel<'a, F>(neighbourhood: KernelWindow<'a>, cell: &F, src_pixel: Pixel) -> Pixel
where
    F: Fn(u32, u32) -> Option<f64>,
{
    let mut acc = channels_of(src_pixel).map(f64::from);

    for (u, v, p) in neighbourhood {
        let Some(k) = cell(u, v) else {
            continue;
        };

        let p = channels_of(p);
        for (acc, p) in acc.iter_mut().zip(p) {
            *acc = acc.min(k + f64::from(p));
        }
    }

    pixel_from(acc.map(to_quantum))
}
