//! Builders for the named kernel families.

use std::f64::consts::{PI, SQRT_2};

use crate::error::ValueErrorKind;
use crate::geometry::KernelArgs;
use crate::surface_utils::QUANTUM_MAX;

use super::{Kernel, KernelList, KernelType, ScaleFlags, KERNEL_EPSILON};

/// Marks a "don't care" cell in the literal tables below.
const NA: f64 = f64::NAN;

/// Sampled values smaller than this (half a quantum level) no longer
/// contribute to the output, which is what bounds the automatic support of
/// the sampled curves.
const CLIP_THRESHOLD: f64 = 1.0 / (2.0 * QUANTUM_MAX);

/// The sampled 1-D curves are generated at this multiple of the final
/// resolution and then binned, to reduce aliasing.
const KERNEL_RANK: usize = 3;

pub(crate) fn build(kind: KernelType, args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    use KernelType::*;

    let mut list = match kind {
        User => {
            return Err(ValueErrorKind::value_error(
                "User kernels come from explicit value lists, not the builder",
            ))
        }

        Unity => unity(),
        Gaussian => gaussian(args),
        DoG => difference_of_gaussians(args),
        LoG => laplacian_of_gaussian(args),
        Blur => blur(args),
        DoB => difference_of_blurs(args),
        Comet => comet(args),

        Laplacian => laplacian(args),
        Sobel => rotated_table(Sobel, &SOBEL, args),
        Roberts => rotated_table(Roberts, &ROBERTS, args),
        Prewitt => rotated_table(Prewitt, &PREWITT, args),
        Compass => rotated_table(Compass, &COMPASS, args),
        Kirsch => rotated_table(Kirsch, &KIRSCH, args),
        FreiChen => frei_chen(args),

        Diamond => diamond(args),
        Square => square(args),
        Rectangle => rectangle(args),
        Disk => disk(args),
        Plus => plus(args),
        Cross => cross(args),
        Ring => ring(args),
        Peaks => peaks(args),

        Edges => templates(Edges, &[(&EDGES, 90.0)]),
        Corners => templates(Corners, &[(&CORNERS, 90.0)]),
        Ridges => ridges(),
        LineEnds => templates(LineEnds, &[(&LINE_END, 90.0), (&LINE_END_DIAGONAL, 90.0)]),
        LineJunctions => templates(
            LineJunctions,
            &[(&LINE_JUNCTION_Y, 45.0), (&LINE_JUNCTION_T, 90.0)],
        ),
        ConvexHull => templates(ConvexHull, &[(&CONVEX_HULL, 90.0), (&CONVEX_HULL_MIRROR, 90.0)]),
        Skeleton => templates(Skeleton, &[(&EDGES, 90.0), (&CORNERS, 90.0)]),

        Chebyshev => distance(Chebyshev, args, |u, v| u.abs().max(v.abs())),
        Manhattan => distance(Manhattan, args, |u, v| u.abs() + v.abs()),
        Euclidean => distance(Euclidean, args, f64::hypot),
    }?;

    if args.flags.expand_90 {
        list.expand_rotations(90.0);
    } else if args.flags.expand_45 {
        list.expand_rotations(45.0);
    }

    Ok(list)
}

fn cells_from(table: &[f64]) -> Vec<Option<f64>> {
    table
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect()
}

fn single(kernel: Kernel) -> Result<KernelList, ValueErrorKind> {
    Ok(KernelList::from_kernel(kernel))
}

fn kernel_3x3(kind: KernelType, table: &[f64; 9]) -> Result<Kernel, ValueErrorKind> {
    Kernel::new(kind, 3, 3, 1, 1, cells_from(table))
}

/// A literal 3×3 table rotated by the angle argument.
fn rotated_table(
    kind: KernelType,
    table: &[f64; 9],
    args: &KernelArgs,
) -> Result<KernelList, ValueErrorKind> {
    let mut kernel = kernel_3x3(kind, table)?;
    if args.flags.rho {
        kernel.rotate(args.rho);
    }
    single(kernel)
}

/// A family of hit-and-miss templates: each base pattern expanded by its
/// rotation delta, the resulting chains concatenated in order.
fn templates(
    kind: KernelType,
    patterns: &[(&[f64; 9], f64)],
) -> Result<KernelList, ValueErrorKind> {
    let mut list = KernelList::new();

    for &(table, delta) in patterns {
        let mut family = KernelList::from_kernel(kernel_3x3(kind, table)?);
        family.expand_rotations(delta);
        list.extend(family);
    }

    Ok(list)
}

fn unity() -> Result<KernelList, ValueErrorKind> {
    single(kernel_3x3(
        KernelType::Unity,
        &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
    )?)
}

/// 2-D Gaussian point, degenerating to a Kronecker delta as sigma goes to 0.
fn gauss_2d(u: f64, v: f64, sigma: f64) -> f64 {
    if sigma < KERNEL_EPSILON {
        if u == 0.0 && v == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        let s2 = 2.0 * sigma * sigma;
        (-(u * u + v * v) / s2).exp() / (PI * s2)
    }
}

fn gauss_1d(u: f64, sigma: f64) -> f64 {
    if sigma < KERNEL_EPSILON {
        if u == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        (-(u * u) / (2.0 * sigma * sigma)).exp() / ((2.0 * PI).sqrt() * sigma)
    }
}

/// Smallest radius at which the sampled 2-D Gaussian falls below the
/// clipping threshold.
fn optimal_radius_2d(sigma: f64) -> usize {
    let mut r = 1;
    while gauss_2d(r as f64, 0.0, sigma) >= CLIP_THRESHOLD && r < 255 {
        r += 1;
    }
    r
}

fn optimal_radius_1d(sigma: f64) -> usize {
    let mut r = 1;
    while gauss_1d(r as f64, sigma) >= CLIP_THRESHOLD && r < 255 {
        r += 1;
    }
    r
}

/// The user radius when one was given (and is at least 1), the automatic
/// support otherwise.
fn radius_or(args: &KernelArgs, auto: usize) -> usize {
    if args.flags.rho && args.rho >= 1.0 {
        args.rho.ceil() as usize
    } else {
        auto
    }
}

fn sigma_or(args: &KernelArgs, default: f64) -> f64 {
    if args.flags.sigma {
        args.sigma.abs()
    } else {
        default
    }
}

fn gaussian(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma = sigma_or(args, 1.0);
    let radius = radius_or(args, if sigma < KERNEL_EPSILON { 0 } else { optimal_radius_2d(sigma) });
    let side = 2 * radius + 1;

    let mut cells = Vec::with_capacity(side * side);
    for v in -(radius as i64)..=radius as i64 {
        for u in -(radius as i64)..=radius as i64 {
            cells.push(Some(gauss_2d(u as f64, v as f64, sigma)));
        }
    }

    let mut kernel = Kernel::new(KernelType::Gaussian, side, side, radius, radius, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);

    single(kernel)
}

fn difference_of_gaussians(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma1 = sigma_or(args, 1.0);
    let sigma2 = if args.flags.xi { args.xi.abs() } else { 0.0 };

    let auto = optimal_radius_2d(sigma1.max(sigma2));
    let radius = radius_or(args, auto);
    let side = 2 * radius + 1;

    let mut cells = Vec::with_capacity(side * side);
    for v in -(radius as i64)..=radius as i64 {
        for u in -(radius as i64)..=radius as i64 {
            let (u, v) = (u as f64, v as f64);
            cells.push(Some(gauss_2d(u, v, sigma1) - gauss_2d(u, v, sigma2)));
        }
    }

    let mut kernel = Kernel::new(KernelType::DoG, side, side, radius, radius, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);

    single(kernel)
}

fn laplacian_of_gaussian(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma = sigma_or(args, 1.0).max(KERNEL_EPSILON.sqrt());

    let log_point = |u: f64, v: f64| {
        let s2 = 2.0 * sigma * sigma;
        let r2 = u * u + v * v;
        (1.0 - r2 / s2) * (-r2 / s2).exp() / (PI * sigma.powi(4))
    };

    let auto = {
        let mut r = 1;
        while log_point(r as f64, 0.0).abs() >= CLIP_THRESHOLD && r < 255 {
            r += 1;
        }
        r
    };
    let radius = radius_or(args, auto);
    let side = 2 * radius + 1;

    let mut cells = Vec::with_capacity(side * side);
    for v in -(radius as i64)..=radius as i64 {
        for u in -(radius as i64)..=radius as i64 {
            cells.push(Some(log_point(u as f64, v as f64)));
        }
    }

    let mut kernel = Kernel::new(KernelType::LoG, side, side, radius, radius, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);

    single(kernel)
}

/// Samples a 1-D Gaussian at `KERNEL_RANK`× the final resolution and bins
/// the samples down to `width` cells.
fn binned_gaussian_row(width: usize, sigma: f64) -> Vec<f64> {
    if sigma < KERNEL_EPSILON {
        let mut cells = vec![0.0; width];
        cells[width / 2] = 1.0;
        return cells;
    }

    let virtual_width = KERNEL_RANK * width;
    let center = (virtual_width - 1) / 2;

    let mut cells = vec![0.0; width];
    for i in 0..virtual_width {
        let u = (i as f64 - center as f64) / KERNEL_RANK as f64;
        cells[i / KERNEL_RANK] += gauss_1d(u, sigma);
    }

    for c in &mut cells {
        *c /= KERNEL_RANK as f64;
    }

    cells
}

fn blur(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma = sigma_or(args, 1.0);
    let radius = radius_or(args, optimal_radius_1d(sigma));
    let width = 2 * radius + 1;

    let cells = binned_gaussian_row(width, sigma)
        .into_iter()
        .map(Some)
        .collect();

    let mut kernel = Kernel::new(KernelType::Blur, width, 1, radius, 0, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);
    if args.flags.xi {
        kernel.rotate(args.xi);
    }

    single(kernel)
}

fn difference_of_blurs(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma1 = sigma_or(args, 1.0);
    let sigma2 = if args.flags.xi { args.xi.abs() } else { 0.0 };

    let radius = radius_or(args, optimal_radius_1d(sigma1.max(sigma2)));
    let width = 2 * radius + 1;

    let narrow = binned_gaussian_row(width, sigma1);
    let wide = binned_gaussian_row(width, sigma2);
    let cells = narrow
        .into_iter()
        .zip(wide)
        .map(|(a, b)| Some(a - b))
        .collect();

    let mut kernel = Kernel::new(KernelType::DoB, width, 1, radius, 0, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);
    if args.flags.psi {
        kernel.rotate(args.psi);
    }

    single(kernel)
}

fn comet(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let sigma = sigma_or(args, 1.0);
    let radius = radius_or(args, optimal_radius_1d(sigma));
    let width = radius + 1;

    let cells = (0..width)
        .map(|u| Some(gauss_1d(u as f64, sigma)))
        .collect();

    let mut kernel = Kernel::new(KernelType::Comet, width, 1, 0, 0, cells)?;
    kernel.scale(1.0, ScaleFlags::CORRELATE_NORMALIZE);
    if args.flags.xi {
        kernel.rotate(args.xi);
    }

    single(kernel)
}

const SOBEL: [f64; 9] = [1.0, 0.0, -1.0, 2.0, 0.0, -2.0, 1.0, 0.0, -1.0];
const ROBERTS: [f64; 9] = [0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
const PREWITT: [f64; 9] = [1.0, 0.0, -1.0, 1.0, 0.0, -1.0, 1.0, 0.0, -1.0];
const COMPASS: [f64; 9] = [-1.0, 1.0, 1.0, -1.0, -2.0, 1.0, -1.0, 1.0, 1.0];
const KIRSCH: [f64; 9] = [5.0, -3.0, -3.0, 5.0, 0.0, -3.0, 5.0, -3.0, -3.0];

/// Discrete Laplacian tables, selected by the rho argument.
fn laplacian(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let variant = if args.flags.rho { args.rho as i64 } else { 0 };

    #[rustfmt::skip]
    let kernel = match variant {
        1 => kernel_3x3(KernelType::Laplacian, &[
                 0.0, -1.0,  0.0,
                -1.0,  4.0, -1.0,
                 0.0, -1.0,  0.0,
            ])?,
        2 => kernel_3x3(KernelType::Laplacian, &[
                -2.0,  1.0, -2.0,
                 1.0,  4.0,  1.0,
                -2.0,  1.0, -2.0,
            ])?,
        3 => kernel_3x3(KernelType::Laplacian, &[
                 1.0, -2.0,  1.0,
                -2.0,  4.0, -2.0,
                 1.0, -2.0,  1.0,
            ])?,
        5 => Kernel::new(KernelType::Laplacian, 5, 5, 2, 2, cells_from(&[
                -4.0, -1.0,  0.0, -1.0, -4.0,
                -1.0,  2.0,  3.0,  2.0, -1.0,
                 0.0,  3.0,  4.0,  3.0,  0.0,
                -1.0,  2.0,  3.0,  2.0, -1.0,
                -4.0, -1.0,  0.0, -1.0, -4.0,
            ]))?,
        7 => Kernel::new(KernelType::Laplacian, 7, 7, 3, 3, cells_from(&[
                -10.0, -5.0, -2.0, -1.0, -2.0, -5.0, -10.0,
                 -5.0,  0.0,  3.0,  4.0,  3.0,  0.0,  -5.0,
                 -2.0,  3.0,  6.0,  7.0,  6.0,  3.0,  -2.0,
                 -1.0,  4.0,  7.0,  8.0,  7.0,  4.0,  -1.0,
                 -2.0,  3.0,  6.0,  7.0,  6.0,  3.0,  -2.0,
                 -5.0,  0.0,  3.0,  4.0,  3.0,  0.0,  -5.0,
                -10.0, -5.0, -2.0, -1.0, -2.0, -5.0, -10.0,
            ]))?,
        15 => Kernel::new(KernelType::Laplacian, 5, 5, 2, 2, cells_from(&[
                 0.0,  0.0, -1.0,  0.0,  0.0,
                 0.0, -1.0, -2.0, -1.0,  0.0,
                -1.0, -2.0, 16.0, -2.0, -1.0,
                 0.0, -1.0, -2.0, -1.0,  0.0,
                 0.0,  0.0, -1.0,  0.0,  0.0,
            ]))?,
        // The 8-neighbour Laplacian, also the fallback for unknown variants.
        _ => kernel_3x3(KernelType::Laplacian, &[
                -1.0, -1.0, -1.0,
                -1.0,  8.0, -1.0,
                -1.0, -1.0, -1.0,
            ])?,
    };

    single(kernel)
}

/// The Frei-Chen gradient and basis kernels, selected by the rho argument.
///
/// Variants 1-9 are the orthogonal basis with its exact √2 cells and the
/// 1/(2√2), 1/2, 1/6 and 1/3 weights; variant 0 is the plain gradient pair
/// without pre-scaling.
fn frei_chen(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let variant = if args.flags.rho { args.rho as i64 } else { 0 };

    let s = SQRT_2;
    let w1 = 1.0 / (2.0 * s);

    #[rustfmt::skip]
    let (table, weight): ([f64; 9], f64) = match variant {
        1 => ([ 1.0,   s,  1.0,   0.0, 0.0,  0.0,  -1.0,  -s, -1.0], w1),
        2 => ([ 1.0, 0.0, -1.0,     s, 0.0,   -s,   1.0, 0.0, -1.0], w1),
        3 => ([ 0.0,-1.0,    s,   1.0, 0.0, -1.0,    -s, 1.0,  0.0], w1),
        4 => ([   s,-1.0,  0.0,  -1.0, 0.0,  1.0,   0.0, 1.0,   -s], w1),
        5 => ([ 0.0, 1.0,  0.0,  -1.0, 0.0, -1.0,   0.0, 1.0,  0.0], 0.5),
        6 => ([-1.0, 0.0,  1.0,   0.0, 0.0,  0.0,   1.0, 0.0, -1.0], 0.5),
        7 => ([ 1.0,-2.0,  1.0,  -2.0, 4.0, -2.0,   1.0,-2.0,  1.0], 1.0 / 6.0),
        8 => ([-2.0, 1.0, -2.0,   1.0, 4.0,  1.0,  -2.0, 1.0, -2.0], 1.0 / 6.0),
        9 => ([ 1.0, 1.0,  1.0,   1.0, 1.0,  1.0,   1.0, 1.0,  1.0], 1.0 / 3.0),
        _ => ([ 1.0, 0.0, -1.0,     s, 0.0,   -s,   1.0, 0.0, -1.0], 1.0),
    };

    let mut kernel = kernel_3x3(KernelType::FreiChen, &table)?;
    if weight != 1.0 {
        kernel.scale(weight, ScaleFlags::NONE);
    }

    single(kernel)
}

/// Rasterises a flat shape: cells inside the predicate get the scale value,
/// cells outside are masked.
fn shape<F>(
    kind: KernelType,
    half: usize,
    value: f64,
    inside: F,
) -> Result<KernelList, ValueErrorKind>
where
    F: Fn(i64, i64) -> bool,
{
    let side = 2 * half + 1;

    let mut cells = Vec::with_capacity(side * side);
    for v in -(half as i64)..=half as i64 {
        for u in -(half as i64)..=half as i64 {
            cells.push(if inside(u, v) { Some(value) } else { None });
        }
    }

    single(Kernel::new(kind, side, side, half, half, cells)?)
}

/// Flat-shape radius: integral part of rho, at least 1.
fn shape_radius(args: &KernelArgs, default: usize) -> usize {
    if args.flags.rho && args.rho >= 1.0 {
        args.rho as usize
    } else {
        default
    }
}

/// Flat-shape cell value, from the sigma argument.
fn shape_value(args: &KernelArgs) -> f64 {
    if args.flags.sigma {
        args.sigma
    } else {
        1.0
    }
}

fn diamond(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let r = shape_radius(args, 1) as i64;
    shape(KernelType::Diamond, r as usize, shape_value(args), |u, v| {
        u.abs() + v.abs() <= r
    })
}

fn square(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let r = shape_radius(args, 1);
    shape(KernelType::Square, r, shape_value(args), |_, _| true)
}

fn rectangle(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let width = if args.flags.rho { args.rho as i64 } else { 3 };
    let height = if args.flags.sigma {
        args.sigma as i64
    } else {
        width
    };

    if width < 1 || height < 1 {
        return Err(ValueErrorKind::value_error(&format!(
            "invalid {}x{} rectangle kernel",
            width, height
        )));
    }

    let (width, height) = (width as usize, height as usize);

    let x = if args.flags.xi {
        args.xi as i64
    } else {
        (width as i64 - 1) / 2
    };
    let y = if args.flags.psi {
        args.psi as i64
    } else {
        (height as i64 - 1) / 2
    };

    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return Err(ValueErrorKind::value_error(&format!(
            "origin +{}+{} lies outside the {}x{} rectangle kernel",
            x, y, width, height
        )));
    }

    let cells = vec![Some(1.0); width * height];
    single(Kernel::new(
        KernelType::Rectangle,
        width,
        height,
        x as usize,
        y as usize,
        cells,
    )?)
}

fn disk(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let r = if args.flags.rho && args.rho >= 0.5 {
        args.rho
    } else {
        2.3
    };

    let half = (2.0 * r) as usize / 2;
    let limit = r * r;
    shape(KernelType::Disk, half, shape_value(args), |u, v| {
        (u * u + v * v) as f64 <= limit
    })
}

fn plus(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let r = shape_radius(args, 2);
    shape(KernelType::Plus, r, shape_value(args), |u, v| {
        u == 0 || v == 0
    })
}

fn cross(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let r = shape_radius(args, 2);
    shape(KernelType::Cross, r, shape_value(args), |u, v| {
        u.abs() == v.abs()
    })
}

/// The two ring radii, sorted, from the rho and sigma arguments.
fn ring_radii(args: &KernelArgs) -> (f64, f64) {
    let r1 = if args.flags.rho { args.rho.abs() } else { 1.0 };
    let r2 = if args.flags.sigma {
        args.sigma.abs()
    } else {
        r1 + 1.0
    };

    (r1.min(r2), r1.max(r2))
}

fn ring(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let (lo, hi) = ring_radii(args);
    let value = if args.flags.xi { args.xi } else { 1.0 };

    let half = (2.0 * hi) as usize / 2;
    let (lo2, hi2) = (lo * lo, hi * hi);
    shape(KernelType::Ring, half, value, |u, v| {
        let d = (u * u + v * v) as f64;
        lo2 <= d && d <= hi2
    })
}

/// A peak detector: foreground origin surrounded by a background ring, with
/// don't-care cells in between.
fn peaks(args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
    let (lo, hi) = ring_radii(args);

    let half = (2.0 * hi) as usize / 2;
    let side = 2 * half + 1;
    let (lo2, hi2) = (lo * lo, hi * hi);

    let mut cells = Vec::with_capacity(side * side);
    for v in -(half as i64)..=half as i64 {
        for u in -(half as i64)..=half as i64 {
            let d = (u * u + v * v) as f64;
            cells.push(if u == 0 && v == 0 {
                Some(1.0)
            } else if lo2 <= d && d <= hi2 {
                Some(0.0)
            } else {
                None
            });
        }
    }

    single(Kernel::new(KernelType::Peaks, side, side, half, half, cells)?)
}

// Hit-and-miss templates: 1 must match foreground, 0 must match background,
// NA is a don't-care cell.

#[rustfmt::skip]
const EDGES: [f64; 9] = [
    0.0, 0.0, 0.0,
     NA, 1.0,  NA,
    1.0, 1.0, 1.0,
];

#[rustfmt::skip]
const CORNERS: [f64; 9] = [
    0.0, 0.0,  NA,
    0.0, 1.0, 1.0,
     NA, 1.0,  NA,
];

#[rustfmt::skip]
const RIDGES: [f64; 3] = [
    0.0, 1.0, 0.0,
];

#[rustfmt::skip]
const LINE_END: [f64; 9] = [
    0.0, 0.0, 0.0,
    0.0, 1.0, 0.0,
     NA, 1.0,  NA,
];

#[rustfmt::skip]
const LINE_END_DIAGONAL: [f64; 9] = [
    0.0, 0.0, 0.0,
    0.0, 1.0, 0.0,
    0.0, 0.0, 1.0,
];

#[rustfmt::skip]
const LINE_JUNCTION_Y: [f64; 9] = [
    1.0,  NA, 1.0,
     NA, 1.0,  NA,
     NA, 1.0,  NA,
];

#[rustfmt::skip]
const LINE_JUNCTION_T: [f64; 9] = [
    1.0, 1.0, 1.0,
     NA, 1.0,  NA,
     NA, 1.0,  NA,
];

#[rustfmt::skip]
const CONVEX_HULL: [f64; 9] = [
    1.0, 1.0,  NA,
    1.0, 0.0,  NA,
    1.0,  NA, 0.0,
];

#[rustfmt::skip]
const CONVEX_HULL_MIRROR: [f64; 9] = [
     NA, 1.0, 1.0,
     NA, 0.0, 1.0,
    0.0,  NA, 1.0,
];

/// A one-pixel-wide line probe, horizontal and vertical.
fn ridges() -> Result<KernelList, ValueErrorKind> {
    let kernel = Kernel::new(KernelType::Ridges, 3, 1, 1, 0, cells_from(&RIDGES))?;

    let mut list = KernelList::from_kernel(kernel);
    list.expand_rotations(90.0);
    Ok(list)
}

/// A distance-measuring kernel: every cell holds the metric distance to the
/// origin, scaled by sigma.
fn distance<F>(kind: KernelType, args: &KernelArgs, metric: F) -> Result<KernelList, ValueErrorKind>
where
    F: Fn(f64, f64) -> f64,
{
    let radius = if args.flags.rho && args.rho >= 1.0 {
        args.rho.ceil() as usize
    } else {
        1
    };
    let scale = sigma_or(args, 1.0);
    let side = 2 * radius + 1;

    let mut cells = Vec::with_capacity(side * side);
    for v in -(radius as i64)..=radius as i64 {
        for u in -(radius as i64)..=radius as i64 {
            cells.push(Some(scale * metric(u as f64, v as f64)));
        }
    }

    single(Kernel::new(kind, side, side, radius, radius, cells)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn build_named(kind: KernelType, geometry: &str) -> KernelList {
        let args = KernelArgs::parse(geometry).unwrap();
        build(kind, &args).unwrap()
    }

    #[test]
    fn unity_kernel_is_a_delta() {
        let list = build_named(KernelType::Unity, "");
        let k = list.first().unwrap();

        assert_eq!((k.width(), k.height()), (3, 3));
        assert_eq!(k.get(1, 1), Some(1.0));
        assert_eq!(k.positive_range(), 1.0);
    }

    #[test]
    fn gaussian_auto_support_and_normalization() {
        let list = build_named(KernelType::Gaussian, "0x1");
        let k = list.first().unwrap();

        assert!(k.width() >= 5);
        assert_eq!(k.width() % 2, 1);
        assert_eq!(k.origin(), ((k.width() - 1) / 2, (k.height() - 1) / 2));

        let sum: f64 = k.cells().flatten().sum();
        assert!(approx_eq!(f64, sum, 1.0, epsilon = 1e-9));
    }

    #[test]
    fn gaussian_zero_sigma_is_kronecker_delta() {
        let list = build_named(KernelType::Gaussian, "1x0");
        let k = list.first().unwrap();

        assert_eq!((k.width(), k.height()), (3, 3));
        assert_eq!(k.get(1, 1), Some(1.0));
        assert_eq!(k.positive_range(), 1.0);
    }

    #[test]
    fn dog_is_zero_summing() {
        let list = build_named(KernelType::DoG, "0x2,1");
        let k = list.first().unwrap();

        assert!(approx_eq!(
            f64,
            k.positive_range() + k.negative_range(),
            0.0,
            epsilon = 1e-9
        ));
    }

    #[test]
    fn log_is_zero_summing() {
        let list = build_named(KernelType::LoG, "0x1");
        let k = list.first().unwrap();

        assert!(k.width() >= 5);
        assert!(approx_eq!(
            f64,
            k.positive_range() + k.negative_range(),
            0.0,
            epsilon = 1e-9
        ));
    }

    #[test]
    fn blur_is_one_dimensional_and_normalized() {
        let list = build_named(KernelType::Blur, "0x1");
        let k = list.first().unwrap();

        assert_eq!(k.height(), 1);
        assert!(k.width() >= 5);

        let sum: f64 = k.cells().flatten().sum();
        assert!(approx_eq!(f64, sum, 1.0, epsilon = 1e-9));
    }

    #[test]
    fn blur_rotated_90_becomes_a_column() {
        let list = build_named(KernelType::Blur, "0x1+90");
        let k = list.first().unwrap();
        assert_eq!(k.width(), 1);
        assert!(k.height() >= 5);
    }

    #[test]
    fn comet_origin_is_at_the_head() {
        let list = build_named(KernelType::Comet, "3x1");
        let k = list.first().unwrap();

        assert_eq!(k.origin(), (0, 0));
        assert_eq!((k.width(), k.height()), (4, 1));
        let head = k.get(0, 0).unwrap();
        let tail = k.get(3, 0).unwrap();
        assert!(head > tail);
    }

    #[test]
    fn sobel_matches_the_classic_table() {
        let list = build_named(KernelType::Sobel, "");
        let k = list.first().unwrap();

        let cells: Vec<f64> = k.cells().flatten().collect();
        assert_eq!(cells, SOBEL.to_vec());
        assert_eq!(k.positive_range(), 4.0);
        assert_eq!(k.negative_range(), -4.0);
    }

    #[test]
    fn sobel_rotates_by_the_angle_argument() {
        let list = build_named(KernelType::Sobel, "90");
        let k = list.first().unwrap();

        let cells: Vec<f64> = k.cells().flatten().collect();
        assert_eq!(
            cells,
            vec![-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0]
        );
    }

    #[test]
    fn frei_chen_injects_sqrt_2() {
        let list = build_named(KernelType::FreiChen, "");
        let k = list.first().unwrap();
        assert_eq!(k.get(0, 1), Some(SQRT_2));

        // Basis kernel 1 carries sqrt(2) scaled by 1/(2 sqrt(2)), i.e. 1/2.
        let list = build_named(KernelType::FreiChen, "1");
        let k = list.first().unwrap();
        assert!(approx_eq!(f64, k.get(1, 0).unwrap(), 0.5, epsilon = 1e-12));
    }

    #[test]
    fn diamond_masks_the_corners() {
        let list = build_named(KernelType::Diamond, "");
        let k = list.first().unwrap();

        assert_eq!((k.width(), k.height()), (3, 3));
        assert_eq!(k.get(0, 0), None);
        assert_eq!(k.get(1, 0), Some(1.0));
        assert_eq!(k.cells().flatten().count(), 5);
    }

    #[test]
    fn square_is_fully_set() {
        let list = build_named(KernelType::Square, "1");
        let k = list.first().unwrap();
        assert_eq!(k.cells().flatten().count(), 9);
    }

    #[test]
    fn rectangle_validates_origin() {
        let args = KernelArgs::parse("3x2+5+0").unwrap();
        assert!(build(KernelType::Rectangle, &args).is_err());

        let list = build_named(KernelType::Rectangle, "4x2");
        let k = list.first().unwrap();
        assert_eq!((k.width(), k.height()), (4, 2));
        assert_eq!(k.origin(), (1, 0));
    }

    #[test]
    fn default_disk_covers_21_cells() {
        let list = build_named(KernelType::Disk, "");
        let k = list.first().unwrap();

        assert_eq!((k.width(), k.height()), (5, 5));
        assert_eq!(k.cells().flatten().count(), 21);
        assert_eq!(k.get(0, 0), None);
    }

    #[test]
    fn plus_and_cross_shapes() {
        let plus = build_named(KernelType::Plus, "1");
        let k = plus.first().unwrap();
        assert_eq!(k.cells().flatten().count(), 5);
        assert_eq!(k.get(0, 0), None);

        let cross = build_named(KernelType::Cross, "1");
        let k = cross.first().unwrap();
        assert_eq!(k.cells().flatten().count(), 5);
        assert_eq!(k.get(1, 0), None);
    }

    #[test]
    fn ring_is_an_annulus() {
        let list = build_named(KernelType::Ring, "1x2");
        let k = list.first().unwrap();

        assert_eq!((k.width(), k.height()), (5, 5));
        assert_eq!(k.get(2, 2), None);
        assert_eq!(k.get(2, 1), Some(1.0));
        assert_eq!(k.get(2, 0), Some(1.0));
        assert_eq!(k.get(0, 0), None);
    }

    #[test]
    fn peaks_sets_origin_against_background_ring() {
        let list = build_named(KernelType::Peaks, "1x2");
        let k = list.first().unwrap();

        assert_eq!(k.get(2, 2), Some(1.0));
        assert_eq!(k.get(2, 1), Some(0.0));
        assert_eq!(k.get(0, 0), None);
    }

    #[test]
    fn edges_expand_to_four_templates() {
        let list = build_named(KernelType::Edges, "");
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn line_ends_expand_to_eight_templates() {
        let list = build_named(KernelType::LineEnds, "");
        assert_eq!(list.len(), 8);
    }

    #[test]
    fn ridges_expand_to_two_templates() {
        let list = build_named(KernelType::Ridges, "");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).unwrap().height(), 3);
    }

    #[test]
    fn skeleton_concatenates_edges_and_corners() {
        let skeleton = build_named(KernelType::Skeleton, "");
        assert_eq!(skeleton.len(), 8);

        let edges = build_named(KernelType::Edges, "");
        assert_eq!(skeleton.get(0).unwrap().cells().collect::<Vec<_>>().len(), 9);
        assert_eq!(
            skeleton.get(0).unwrap().get(1, 1),
            edges.get(0).unwrap().get(1, 1)
        );
    }

    #[test]
    fn chebyshev_and_manhattan_distances() {
        let list = build_named(KernelType::Chebyshev, "1");
        let k = list.first().unwrap();
        assert_eq!(k.get(0, 0), Some(1.0));
        assert_eq!(k.get(1, 1), Some(0.0));

        let list = build_named(KernelType::Manhattan, "1");
        let k = list.first().unwrap();
        assert_eq!(k.get(0, 0), Some(2.0));
        assert_eq!(k.get(1, 0), Some(1.0));
    }

    #[test]
    fn distance_kernels_scale_by_sigma() {
        let list = build_named(KernelType::Euclidean, "1x100");
        let k = list.first().unwrap();
        assert_eq!(k.get(1, 1), Some(0.0));
        assert_eq!(k.get(2, 1), Some(100.0));
    }

    #[test]
    fn expansion_flag_builds_a_compass_family() {
        let list = build_named(KernelType::Sobel, "^");
        assert_eq!(list.len(), 4);

        let list = build_named(KernelType::Sobel, "@");
        assert_eq!(list.len(), 8);
    }
}
