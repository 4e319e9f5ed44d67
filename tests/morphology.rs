//! End-to-end tests exercising the public API only.

use pixmorph::{
    apply, apply_default, Channels, KernelList, MorphologyMethod, Options, Pixel,
    SharedImageSurface,
};

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
fn parse_scale_and_apply_round_trip() {
    // The classic workflow: parse a kernel string, apply it, look at pixels.
    let fg: Vec<(u32, u32)> = (1..4).flat_map(|y| (1..4).map(move |x| (x, y))).collect();
    let image = binary_surface(5, 5, &fg);

    let kernels: KernelList = "Square:1".parse().unwrap();
    let eroded = apply_default(&image, MorphologyMethod::Erode, 1, &kernels)
        .unwrap()
        .unwrap();

    assert_eq!(foreground_of(&eroded), vec![(2, 2)]);
}

#[test]
fn open_of_a_thin_line_is_empty() {
    let fg: Vec<(u32, u32)> = (0..7).map(|x| (x, 3)).collect();
    let image = binary_surface(7, 7, &fg);

    let kernels = KernelList::parse("Square:1").unwrap();
    let opened = apply_default(&image, MorphologyMethod::Open, 1, &kernels)
        .unwrap()
        .unwrap();

    assert!(foreground_of(&opened).is_empty());
}

#[test]
fn line_ends_highlight_the_arm_tips_of_a_cross() {
    let mut fg: Vec<(u32, u32)> = (1..10).map(|x| (x, 5)).collect();
    fg.extend((1..10).map(|y| (5, y)));
    let image = binary_surface(11, 11, &fg);

    let kernels = KernelList::parse("LineEnds").unwrap();
    let result = apply_default(&image, MorphologyMethod::HitAndMiss, 1, &kernels)
        .unwrap()
        .unwrap();

    let mut found = foreground_of(&result);
    found.sort();
    assert_eq!(found, vec![(1, 5), (5, 1), (5, 9), (9, 5)]);
}

#[test]
fn distance_transform_on_a_border_seed() {
    // Foreground at the left edge; the L1 transform grows to the right.
    let mut pixels = vec![Pixel::new(255, 255, 255, 255); 12];
    for y in 0..3 {
        pixels[y * 4] = Pixel::new(0, 0, 0, 255);
    }
    let image = SharedImageSurface::from_pixels(4, 3, &pixels).unwrap();

    let kernels = KernelList::parse("Manhattan:1").unwrap();
    let result = apply_default(&image, MorphologyMethod::Distance, -1, &kernels)
        .unwrap()
        .unwrap();

    for y in 0..3 {
        for x in 0..4u32 {
            assert_eq!(result.get_pixel(x, y).r, x as u8);
        }
    }
}

#[test]
fn zero_iterations_is_an_explicit_no_op() {
    let image = binary_surface(3, 3, &[(1, 1)]);
    let kernels = KernelList::parse("Square:1").unwrap();

    assert!(apply_default(&image, MorphologyMethod::Dilate, 0, &kernels)
        .unwrap()
        .is_none());
}

#[test]
fn channel_mask_restricts_writes() {
    let pixels = vec![Pixel::new(200, 50, 50, 255); 9];
    let image = SharedImageSurface::from_pixels(3, 3, &pixels).unwrap();

    // A bias-shifted identity convolve brightens only the selected channel.
    let result = apply(
        &image,
        Channels::RED,
        MorphologyMethod::Convolve,
        1,
        &KernelList::parse("Unity").unwrap(),
        None,
        30.0,
        &Options::new(),
    )
    .unwrap()
    .unwrap();

    let p = result.get_pixel(1, 1);
    assert_eq!(p.r, 230);
    assert_eq!(p.g, 50);
    assert_eq!(p.b, 50);
}

#[test]
fn smooth_is_idempotent_on_its_own_output() {
    let mut fg: Vec<(u32, u32)> = (2..6).flat_map(|y| (2..6).map(move |x| (x, y))).collect();
    fg.push((7, 0));
    let image = binary_surface(9, 9, &fg);

    let kernels = KernelList::parse("Square:1").unwrap();
    let once = apply_default(&image, MorphologyMethod::Smooth, 1, &kernels)
        .unwrap()
        .unwrap();
    let twice = apply_default(&once, MorphologyMethod::Smooth, 1, &kernels)
        .unwrap()
        .unwrap();

    assert_eq!(foreground_of(&once), foreground_of(&twice));
}
