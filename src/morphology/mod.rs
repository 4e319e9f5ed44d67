//! The morphology method dispatcher.
//!
//! [`apply`] decomposes a compound method into primitive stages, walks the
//! kernel list, iterates primitives to their limits, merges multi-kernel
//! results, and differences the outcome against the original image where
//! the method calls for it.

use std::ops::BitOr;

use crate::error::MorphologyError;
use crate::geometry::KernelArgs;
use crate::kernel::{KernelList, ScaleFlags};
use crate::log::trace;
use crate::options::Options;
use crate::surface_utils::{shared_surface::SharedImageSurface, Pixel};

pub mod composite;
pub mod method;
mod primitive;

pub use composite::{composite, CompositeOperator};
pub use method::MorphologyMethod;

use method::{MethodPlan, PostProcess};
use primitive::{apply_primitive, PrimitiveOptions};

/// A mask naming the channels a method is allowed to write.
///
/// Unselected channels keep their source values.  The intensity methods
/// copy whole pixels and ignore the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels(u8);

impl Channels {
    pub const RED: Channels = Channels(1);
    pub const GREEN: Channels = Channels(1 << 1);
    pub const BLUE: Channels = Channels(1 << 2);
    pub const ALPHA: Channels = Channels(1 << 3);

    pub const RGB: Channels = Channels(0b0111);
    pub const ALL: Channels = Channels(0b1111);

    #[inline]
    pub fn contains(self, other: Channels) -> bool {
        self.0 & other.0 == other.0
    }

    /// Takes the selected channels from `new` and the rest from `old`.
    #[inline]
    pub(crate) fn merge(self, new: Pixel, old: Pixel) -> Pixel {
        let pick = |mask: Channels, new: u8, old: u8| if self.contains(mask) { new } else { old };

        Pixel {
            r: pick(Channels::RED, new.r, old.r),
            g: pick(Channels::GREEN, new.g, old.g),
            b: pick(Channels::BLUE, new.b, old.b),
            a: pick(Channels::ALPHA, new.a, old.a),
        }
    }
}

enum_default!(Channels, Channels::ALL);

impl BitOr for Channels {
    type Output = Channels;

    fn bitor(self, rhs: Channels) -> Channels {
        Channels(self.0 | rhs.0)
    }
}

/// Applies a morphology method to an image.
///
/// * `iterations` - how often each primitive runs; `0` is an explicit no-op
///   and yields `Ok(None)`, negative means "iterate until nothing changes",
///   bounded by the larger image dimension.
/// * `compose` - how the results of a multi-kernel list are merged.  `None`
///   picks the method default (Lighten for HitAndMiss, feeding each result
///   into the next kernel otherwise).
/// * `bias` - seed value for the convolution accumulators, quantum units.
///
/// Errors are invalid parameters or allocation failures; everything else
/// returns the transformed image.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    image: &SharedImageSurface,
    channels: Channels,
    method: MorphologyMethod,
    iterations: isize,
    kernels: &KernelList,
    compose: Option<CompositeOperator>,
    bias: f64,
    options: &Options,
) -> Result<Option<SharedImageSurface>, MorphologyError> {
    if iterations == 0 {
        return Ok(None);
    }

    if kernels.is_empty() {
        return Err(MorphologyError::InvalidParameter(
            "empty kernel list".to_string(),
        ));
    }

    let verbose = options.is_set("verbose");

    // All configuration is read here, once; the loops below see plain values.
    let kernels = prepare_kernels(kernels, method, options)?;

    if options.any_set(&["showkernel", "convolve:showkernel", "morphology:showkernel"]) {
        kernels.show();
    }

    let plan = MethodPlan::for_method(method);

    let compose = match options.get("morphology:compose") {
        Some(name) => CompositeOperator::from_name(name)?,
        None => compose.unwrap_or(plan.default_compose),
    };

    // Negative iteration counts run to the fixed point, but never longer
    // than the larger image dimension; that bounds even pathological kernels.
    let limit = if iterations < 0 {
        image.width().max(image.height()) as usize
    } else {
        iterations as usize
    };

    let (method_limit, kernel_limit) = if plan.single_shot {
        (1, 1)
    } else if plan.iterate_method {
        (limit, 1)
    } else {
        (1, limit)
    };

    let reflected = kernels.reflected();

    let primitive_options = PrimitiveOptions {
        channels,
        bias,
        ..Default::default()
    };

    let original = image.clone();
    let mut current = image.clone();

    for pass in 0..method_limit {
        let mut pass_changed = 0usize;
        let pass_input = current.clone();

        // With a real composition operator every kernel starts from this
        // pass's input and the results are merged; without one each kernel
        // works on its predecessor's output.
        let mut merged: Option<SharedImageSurface> = None;

        for (kernel_number, (kernel, reflected_kernel)) in
            kernels.iter().zip(reflected.iter()).enumerate()
        {
            let mut stage_image = if compose == CompositeOperator::NoComposite {
                current.clone()
            } else {
                pass_input.clone()
            };

            let mut first_stage_result: Option<SharedImageSurface> = None;

            for (stage_number, stage) in plan.stages.iter().enumerate() {
                let stage_kernel = if stage.reflect_kernel {
                    reflected_kernel
                } else {
                    kernel
                };

                let mut stage_source = if stage.from_original {
                    pass_input.clone()
                } else {
                    stage_image.clone()
                };

                for _iteration in 0..kernel_limit {
                    let (output, changed) = apply_primitive(
                        stage.primitive,
                        &stage_source,
                        stage_kernel,
                        &primitive_options,
                    )?;

                    trace(
                        verbose,
                        format_args!(
                            "{}:{}.{} #{} => {} changed {}",
                            method,
                            pass + 1,
                            stage_number + 1,
                            kernel_number + 1,
                            stage.primitive.name(),
                            changed,
                        ),
                    );

                    pass_changed += changed;
                    stage_source = output;

                    if changed == 0 {
                        break;
                    }
                }

                if plan.post == PostProcess::DifferenceOfStages && stage_number == 0 {
                    first_stage_result = Some(stage_source.clone());
                }

                stage_image = stage_source;
            }

            let kernel_result = match (plan.post, first_stage_result) {
                (PostProcess::DifferenceOfStages, Some(first)) => composite(
                    &first,
                    &stage_image,
                    CompositeOperator::Difference,
                    channels,
                )?,
                _ => stage_image,
            };

            if compose == CompositeOperator::NoComposite {
                current = kernel_result;
            } else {
                merged = Some(match merged {
                    None => kernel_result,
                    Some(accumulated) => {
                        composite(&accumulated, &kernel_result, compose, channels)?
                    }
                });
            }
        }

        if let Some(merged) = merged {
            current = merged;
        }

        if pass_changed == 0 {
            break;
        }
    }

    let result = match plan.post {
        PostProcess::DifferenceWithOriginal => composite(
            &current,
            &original,
            CompositeOperator::Difference,
            channels,
        )?,
        _ => current,
    };

    Ok(Some(result))
}

/// Applies a morphology method with the default channel set, composition
/// and bias.
pub fn apply_default(
    image: &SharedImageSurface,
    method: MorphologyMethod,
    iterations: isize,
    kernels: &KernelList,
) -> Result<Option<SharedImageSurface>, MorphologyError> {
    apply(
        image,
        Channels::ALL,
        method,
        iterations,
        kernels,
        None,
        0.0,
        &Options::new(),
    )
}

/// Applies the `convolve:scale` artifact to a copy of the kernel list.
fn prepare_kernels(
    kernels: &KernelList,
    method: MorphologyMethod,
    options: &Options,
) -> Result<KernelList, MorphologyError> {
    let mut kernels = kernels.clone();

    let scalable = matches!(
        method,
        MorphologyMethod::Convolve | MorphologyMethod::Correlate
    );

    if scalable {
        if let Some(geometry) = options.get("convolve:scale") {
            let args = KernelArgs::parse(geometry)?;

            let flags = ScaleFlags {
                normalize: args.flags.expand_90,
                correlate_normalize: args.flags.aspect,
                percent: args.flags.percent,
            };
            let factor = if args.flags.rho { args.rho } else { 1.0 };

            kernels.scale(factor, flags);

            if args.flags.sigma {
                kernels.unity_add(args.sigma);
            }
        }
    }

    Ok(kernels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelList;

    fn binary_surface(width: i32, height: i32, foreground: &[(u32, u32)]) -> SharedImageSurface {
        let mut pixels = vec![Pixel::new(0, 0, 0, 255); (width * height) as usize];
        for &(x, y) in foreground {
            pixels[(y * width as u32 + x) as usize] = Pixel::new(255, 255, 255, 255);
        }
        SharedImageSurface::from_pixels(width, height, &pixels).unwrap()
    }

    fn foreground_of(surface: &SharedImageSurface) -> Vec<(u32, u32)> {
        let mut fg = Vec::new();
        for y in 0..surface.height() as u32 {
            for x in 0..surface.width() as u32 {
                if surface.get_pixel(x, y).r > 127 {
                    fg.push((x, y));
                }
            }
        }
        fg
    }

    #[test]
    fn zero_iterations_yields_no_image() {
        let surface = binary_surface(3, 3, &[]);
        let kernels = KernelList::parse("Square:1").unwrap();

        let result =
            apply_default(&surface, MorphologyMethod::Erode, 0, &kernels).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn empty_kernel_list_is_an_error() {
        let surface = binary_surface(3, 3, &[]);
        let kernels = KernelList::new();

        assert!(apply_default(&surface, MorphologyMethod::Erode, 1, &kernels).is_err());
    }

    #[test]
    fn open_of_a_thin_line_is_empty() {
        // A one-pixel-wide horizontal line on a 7x7 canvas.
        let fg: Vec<(u32, u32)> = (0..7).map(|x| (x, 3)).collect();
        let surface = binary_surface(7, 7, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let result = apply_default(&surface, MorphologyMethod::Open, 1, &kernels)
            .unwrap()
            .unwrap();

        assert!(foreground_of(&result).is_empty());
    }

    #[test]
    fn open_and_close_bound_the_identity() {
        let fg: Vec<(u32, u32)> = [(2, 2), (3, 2), (2, 3), (3, 3), (5, 5)].to_vec();
        let surface = binary_surface(8, 8, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let opened = apply_default(&surface, MorphologyMethod::Open, 1, &kernels)
            .unwrap()
            .unwrap();
        let closed = apply_default(&surface, MorphologyMethod::Close, 1, &kernels)
            .unwrap()
            .unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let o = opened.get_pixel(x, y).r;
                let s = surface.get_pixel(x, y).r;
                let c = closed.get_pixel(x, y).r;
                assert!(o <= s && s <= c, "at {},{}: {} {} {}", x, y, o, s, c);
            }
        }
    }

    #[test]
    fn edge_is_dilation_minus_erosion() {
        let fg: Vec<(u32, u32)> = (2..5).flat_map(|y| (2..5).map(move |x| (x, y))).collect();
        let surface = binary_surface(7, 7, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let edge = apply_default(&surface, MorphologyMethod::Edge, 1, &kernels)
            .unwrap()
            .unwrap();
        let dilated = apply_default(&surface, MorphologyMethod::Dilate, 1, &kernels)
            .unwrap()
            .unwrap();
        let eroded = apply_default(&surface, MorphologyMethod::Erode, 1, &kernels)
            .unwrap()
            .unwrap();

        for y in 0..7 {
            for x in 0..7 {
                let expected = dilated.get_pixel(x, y).r - eroded.get_pixel(x, y).r;
                assert_eq!(edge.get_pixel(x, y).r, expected);
            }
        }
    }

    #[test]
    fn edge_out_is_dilation_minus_identity() {
        let surface = binary_surface(5, 5, &[(2, 2)]);
        let kernels = KernelList::parse("Square:1").unwrap();

        let edge_out = apply_default(&surface, MorphologyMethod::EdgeOut, 1, &kernels)
            .unwrap()
            .unwrap();

        // The dilation ring lights up, the original pixel does not.
        let mut expected: Vec<(u32, u32)> =
            (1..4).flat_map(|y| (1..4).map(move |x| (x, y))).collect();
        expected.retain(|&p| p != (2, 2));

        assert_eq!(foreground_of(&edge_out), expected);
    }

    #[test]
    fn edge_in_is_identity_minus_erosion() {
        let fg: Vec<(u32, u32)> = (1..4).flat_map(|y| (1..4).map(move |x| (x, y))).collect();
        let surface = binary_surface(5, 5, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let edge_in = apply_default(&surface, MorphologyMethod::EdgeIn, 1, &kernels)
            .unwrap()
            .unwrap();

        let mut expected = fg.clone();
        expected.retain(|&p| p != (2, 2));
        assert_eq!(foreground_of(&edge_in), expected);
    }

    #[test]
    fn top_hat_extracts_what_opening_removes() {
        // A thin line vanishes under opening, so TopHat returns exactly it.
        let fg: Vec<(u32, u32)> = (0..7).map(|x| (x, 3)).collect();
        let surface = binary_surface(7, 7, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let top_hat = apply_default(&surface, MorphologyMethod::TopHat, 1, &kernels)
            .unwrap()
            .unwrap();

        assert_eq!(foreground_of(&top_hat), fg);
    }

    #[test]
    fn smooth_removes_speckle_both_ways() {
        let mut fg: Vec<(u32, u32)> = (2..6).flat_map(|y| (2..6).map(move |x| (x, y))).collect();
        fg.push((0, 0));
        let surface = binary_surface(9, 9, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        let smoothed = apply_default(&surface, MorphologyMethod::Smooth, 1, &kernels)
            .unwrap()
            .unwrap();

        // The isolated speckle is gone, the solid block survives.
        let result = foreground_of(&smoothed);
        assert!(!result.contains(&(0, 0)));
        assert!(result.contains(&(3, 3)));
    }

    #[test]
    fn distance_iterates_to_the_manhattan_transform() {
        // Foreground is distance 0; the background starts saturated.
        let mut pixels = vec![Pixel::new(255, 255, 255, 255); 25];
        pixels[0] = Pixel::new(0, 0, 0, 255);
        let surface = SharedImageSurface::from_pixels(5, 5, &pixels).unwrap();

        let kernels = KernelList::parse("Manhattan:1").unwrap();
        let result = apply_default(&surface, MorphologyMethod::Distance, -1, &kernels)
            .unwrap()
            .unwrap();

        for y in 0..5u32 {
            for x in 0..5u32 {
                assert_eq!(result.get_pixel(x, y).r, (x + y) as u8, "at {},{}", x, y);
            }
        }
    }

    #[test]
    fn chebyshev_transform_is_the_l_infinity_distance() {
        let mut pixels = vec![Pixel::new(255, 255, 255, 255); 25];
        pixels[12] = Pixel::new(0, 0, 0, 255);
        let surface = SharedImageSurface::from_pixels(5, 5, &pixels).unwrap();

        let kernels = KernelList::parse("Chebyshev:1").unwrap();
        let result = apply_default(&surface, MorphologyMethod::Distance, -1, &kernels)
            .unwrap()
            .unwrap();

        for y in 0..5i32 {
            for x in 0..5i32 {
                let expected = (x - 2).abs().max((y - 2).abs()) as u8;
                assert_eq!(result.get_pixel(x as u32, y as u32).r, expected);
            }
        }
    }

    #[test]
    fn hit_and_miss_line_ends_on_a_cross() {
        // An 11x11 cross; the union over the rotated templates lights the
        // four arm ends and nothing else.
        let mut fg: Vec<(u32, u32)> = (1..10).map(|x| (x, 5)).collect();
        fg.extend((1..10).map(|y| (5, y)));
        let surface = binary_surface(11, 11, &fg);

        let kernels = KernelList::parse("LineEnds").unwrap();
        assert_eq!(kernels.len(), 8);

        let result = apply_default(&surface, MorphologyMethod::HitAndMiss, 1, &kernels)
            .unwrap()
            .unwrap();

        let mut expected = vec![(1, 5), (9, 5), (5, 1), (5, 9)];
        expected.sort();
        let mut found = foreground_of(&result);
        found.sort();

        assert_eq!(found, expected);
    }

    #[test]
    fn thinning_runs_the_method_loop_to_quiescence() {
        // A 2-wide bar thins down; iterating to the fixed point must
        // terminate within the dimension bound.
        let fg: Vec<(u32, u32)> = (1..8).flat_map(|x| [(x, 3), (x, 4)]).collect();
        let surface = binary_surface(9, 8, &fg);

        let kernels = KernelList::parse("Skeleton").unwrap();
        let result = apply_default(&surface, MorphologyMethod::Thinning, -1, &kernels)
            .unwrap()
            .unwrap();

        let remaining = foreground_of(&result);
        assert!(!remaining.is_empty());
        assert!(remaining.len() < fg.len());
    }

    #[test]
    fn convolve_scale_artifact_scales_the_kernel() {
        let pixels = vec![Pixel::new(100, 100, 100, 255); 9];
        let surface = SharedImageSurface::from_pixels(3, 3, &pixels).unwrap();

        let kernels = KernelList::parse("Unity").unwrap();

        let mut options = Options::new();
        options.set("convolve:scale", "2");

        let result = apply(
            &surface,
            Channels::ALL,
            MorphologyMethod::Convolve,
            1,
            &kernels,
            None,
            0.0,
            &options,
        )
        .unwrap()
        .unwrap();

        // Every weight doubled; the doubled coverage normalizes back out of
        // the color channels, but alpha doubles and clamps.
        assert_eq!(result.get_pixel(1, 1).r, 100);
        assert_eq!(result.get_pixel(1, 1).a, 255);
    }

    #[test]
    fn convolve_scale_doubles_the_ranges() {
        let kernels = KernelList::parse("Gaussian:0x1").unwrap();

        let mut options = Options::new();
        options.set("convolve:scale", "2");

        let scaled = prepare_kernels(&kernels, MorphologyMethod::Convolve, &options).unwrap();

        let before = kernels.first().unwrap();
        let after = scaled.first().unwrap();
        assert!((after.positive_range() - 2.0 * before.positive_range()).abs() < 1e-9);
        assert!((after.maximum() - 2.0 * before.maximum()).abs() < 1e-9);
    }

    #[test]
    fn convolve_scale_unity_addition() {
        let kernels = KernelList::parse("Gaussian:0x1").unwrap();

        let mut options = Options::new();
        options.set("convolve:scale", "1x1");

        let scaled = prepare_kernels(&kernels, MorphologyMethod::Convolve, &options).unwrap();

        let before = kernels.first().unwrap();
        let after = scaled.first().unwrap();
        let (x, y) = before.origin();
        assert!((after.get(x, y).unwrap() - before.get(x, y).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn compose_override_by_name() {
        let surface = binary_surface(5, 5, &[(2, 2)]);
        let kernels = KernelList::parse("3x1:1,1,1; 1x3:1,1,1").unwrap();

        let mut options = Options::new();
        options.set("morphology:compose", "Lighten");

        // Dilating with both kernels and a Lighten merge grows a plus shape.
        let result = apply(
            &surface,
            Channels::ALL,
            MorphologyMethod::Dilate,
            1,
            &kernels,
            None,
            0.0,
            &options,
        )
        .unwrap()
        .unwrap();

        let mut found = foreground_of(&result);
        found.sort();
        assert_eq!(
            found,
            vec![(1, 2), (2, 1), (2, 2), (2, 3), (3, 2)]
        );
    }

    #[test]
    fn multi_kernel_without_compose_chains_results() {
        let surface = binary_surface(5, 5, &[(2, 2)]);
        let kernels = KernelList::parse("3x1:1,1,1; 1x3:1,1,1").unwrap();

        // Without composition the horizontal dilation feeds the vertical
        // one, producing a filled 3x3 block.
        let result = apply_default(&surface, MorphologyMethod::Dilate, 1, &kernels)
            .unwrap()
            .unwrap();

        assert_eq!(foreground_of(&result).len(), 9);
    }

    #[test]
    fn negative_iterations_terminate() {
        let fg: Vec<(u32, u32)> = (0..5).map(|x| (x, 2)).collect();
        let surface = binary_surface(5, 5, &fg);
        let kernels = KernelList::parse("Square:1").unwrap();

        // Erosion of a finite image reaches quiescence well within the
        // dimension bound.
        let result = apply_default(&surface, MorphologyMethod::Erode, -1, &kernels)
            .unwrap()
            .unwrap();

        assert!(foreground_of(&result).is_empty());
    }
}
