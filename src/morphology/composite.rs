//! Pixel-blend operators used to merge multi-kernel results.

use crate::error::{MorphologyError, ValueErrorKind};
use crate::surface_utils::{
    iterators::Pixels,
    shared_surface::{ExclusiveImageSurface, SharedImageSurface},
    ImageSurfaceDataExt, Pixel,
};

use super::Channels;

/// The operators the dispatcher knows how to merge kernel results with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOperator {
    /// Do not merge; each kernel result feeds the next kernel directly.
    NoComposite,
    /// Channel-wise absolute difference.
    Difference,
    /// Channel-wise maximum; the union of hit-and-miss matches.
    Lighten,
    /// Channel-wise minimum.
    Darken,
    /// Plain source-over replacement.
    Over,
}

enum_default!(CompositeOperator, CompositeOperator::NoComposite);

impl CompositeOperator {
    /// Looks an operator up by name, as given in the `morphology:compose`
    /// option.
    pub fn from_name(name: &str) -> Result<CompositeOperator, ValueErrorKind> {
        use CompositeOperator::*;

        match name {
            _ if name.eq_ignore_ascii_case("none") => Ok(NoComposite),
            _ if name.eq_ignore_ascii_case("nocomposite") => Ok(NoComposite),
            _ if name.eq_ignore_ascii_case("difference") => Ok(Difference),
            _ if name.eq_ignore_ascii_case("lighten") => Ok(Lighten),
            _ if name.eq_ignore_ascii_case("darken") => Ok(Darken),
            _ if name.eq_ignore_ascii_case("over") => Ok(Over),
            _ => Err(ValueErrorKind::value_error(&format!(
                "unknown composite operator {:?}",
                name
            ))),
        }
    }

    fn blend_channel(self, dst: u8, src: u8) -> u8 {
        match self {
            CompositeOperator::NoComposite => dst,
            CompositeOperator::Difference => (i32::from(dst) - i32::from(src)).unsigned_abs() as u8,
            CompositeOperator::Lighten => dst.max(src),
            CompositeOperator::Darken => dst.min(src),
            CompositeOperator::Over => src,
        }
    }
}

/// Applies `op` over `dst` and `src`, writing the blend of the selected
/// channels over `dst`; unselected channels keep the `dst` value.
pub fn composite(
    dst: &SharedImageSurface,
    src: &SharedImageSurface,
    op: CompositeOperator,
    channels: Channels,
) -> Result<SharedImageSurface, MorphologyError> {
    assert_eq!((dst.width(), dst.height()), (src.width(), src.height()));

    if op == CompositeOperator::NoComposite {
        return Ok(dst.clone());
    }

    let mut output = ExclusiveImageSurface::new(dst.width(), dst.height())?;

    output.modify(&mut |data, stride| {
        for (x, y, dst_pixel) in Pixels::new(dst) {
            let src_pixel = src.get_pixel(x, y);

            let blended = Pixel {
                r: op.blend_channel(dst_pixel.r, src_pixel.r),
                g: op.blend_channel(dst_pixel.g, src_pixel.g),
                b: op.blend_channel(dst_pixel.b, src_pixel.b),
                a: op.blend_channel(dst_pixel.a, src_pixel.a),
            };

            data.set_pixel(stride, channels.merge(blended, dst_pixel), x, y);
        }
    });

    output.share()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: i32, height: i32, value: u8) -> SharedImageSurface {
        let pixel = Pixel::new(value, value, value, 255);
        SharedImageSurface::from_pixels(width, height, &vec![pixel; (width * height) as usize])
            .unwrap()
    }

    #[test]
    fn operator_names() {
        assert_eq!(
            CompositeOperator::from_name("Lighten").unwrap(),
            CompositeOperator::Lighten
        );
        assert_eq!(
            CompositeOperator::from_name("none").unwrap(),
            CompositeOperator::NoComposite
        );
        assert!(CompositeOperator::from_name("plasma").is_err());
    }

    #[test]
    fn difference_is_absolute() {
        let a = gray(2, 2, 100);
        let b = gray(2, 2, 140);

        let d1 = composite(&a, &b, CompositeOperator::Difference, Channels::RGB).unwrap();
        let d2 = composite(&b, &a, CompositeOperator::Difference, Channels::RGB).unwrap();

        assert_eq!(d1.get_pixel(0, 0).r, 40);
        assert_eq!(d1.get_pixel(0, 0), d2.get_pixel(0, 0));
        // Alpha is not selected, so it keeps the destination value.
        assert_eq!(d1.get_pixel(0, 0).a, 255);
    }

    #[test]
    fn lighten_takes_the_maximum() {
        let a = gray(1, 1, 10);
        let b = gray(1, 1, 200);

        let l = composite(&a, &b, CompositeOperator::Lighten, Channels::ALL).unwrap();
        assert_eq!(l.get_pixel(0, 0).g, 200);
    }

    #[test]
    fn channel_mask_limits_the_blend() {
        let a = gray(1, 1, 10);
        let b = gray(1, 1, 200);

        let l = composite(&a, &b, CompositeOperator::Lighten, Channels::RED).unwrap();
        let p = l.get_pixel(0, 0);
        assert_eq!(p.r, 200);
        assert_eq!(p.g, 10);
        assert_eq!(p.b, 10);
    }
}
