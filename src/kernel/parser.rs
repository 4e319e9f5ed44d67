//! Parser for user-supplied kernel definition strings.
//!
//! Three surface forms are accepted, selected by inspection:
//!
//! 1. **Named**: the first character is alphabetic.  The token before the
//!    optional `:` names a kernel family, the remainder is a geometry
//!    argument string for the builder: `"Gaussian:0x2"`, `"Sobel:90"`.
//! 2. **Sized array**: a `WxH[+X+Y][^|@]:` header followed by `W*H` values:
//!    `"3x3+1+1: 1,0,1 0,1,0 1,0,1"`.  The `^` and `@` modifiers expand the
//!    kernel by 90° resp. 45° rotations.  The value list may continue over
//!    `;` boundaries until the declared count is satisfied.
//! 3. **Old square**: a bare list of values whose count is a perfect
//!    square; the origin is the center cell.
//!
//! Values are separated by whitespace or commas; a lone `-` or the literal
//! `nan` is a masked cell.  Several kernels chain with `;`, empty segments
//! are skipped.  Any malformed kernel fails the whole list, reporting the
//! index of the offending definition.

use std::collections::VecDeque;

use crate::error::{KernelError, ValueErrorKind};
use crate::geometry::KernelArgs;

use super::{Kernel, KernelList, KernelType};

pub fn parse_kernel_list(input: &str) -> Result<KernelList, KernelError> {
    let mut segments: VecDeque<&str> = input
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut list = KernelList::new();
    let mut index = 0;

    while let Some(segment) = segments.pop_front() {
        let kernels =
            parse_segment(segment, &mut segments).map_err(|err| KernelError::new(index, err))?;
        list.extend(kernels);
        index += 1;
    }

    if list.is_empty() {
        return Err(KernelError::new(
            0,
            ValueErrorKind::value_error("empty kernel string"),
        ));
    }

    Ok(list)
}

fn parse_segment(
    segment: &str,
    rest: &mut VecDeque<&str>,
) -> Result<KernelList, ValueErrorKind> {
    let first = segment
        .chars()
        .next()
        .expect("empty segments are filtered out");

    if first.is_ascii_alphabetic() {
        named(segment)
    } else if let Some((head, values)) = segment.split_once(':') {
        sized(head.trim(), values, rest)
    } else {
        old_square(segment)
    }
}

fn named(segment: &str) -> Result<KernelList, ValueErrorKind> {
    let (name, geometry) = match segment.split_once(':') {
        Some((name, geometry)) => (name.trim(), geometry.trim()),
        None => (segment, ""),
    };

    let kind = KernelType::from_name(name)?;
    let args = KernelArgs::parse(geometry)?;

    KernelList::from_builtin(kind, &args)
}

fn sized(
    head: &str,
    values: &str,
    rest: &mut VecDeque<&str>,
) -> Result<KernelList, ValueErrorKind> {
    let args = KernelArgs::parse(head)?;

    if !args.flags.rho || !args.flags.sigma {
        return Err(ValueErrorKind::parse_error(&format!(
            "invalid kernel size header {:?}",
            head
        )));
    }

    let as_extent = |v: f64, what: &str| -> Result<usize, ValueErrorKind> {
        if v >= 1.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(ValueErrorKind::value_error(&format!(
                "invalid kernel {} {}",
                what, v
            )))
        }
    };

    let width = as_extent(args.rho, "width")?;
    let height = as_extent(args.sigma, "height")?;

    let (x, y) = match (args.flags.xi, args.flags.psi) {
        (false, false) => ((width - 1) / 2, (height - 1) / 2),
        (true, true) => {
            if args.xi < 0.0 || args.psi < 0.0 {
                return Err(ValueErrorKind::value_error(&format!(
                    "origin {:+}{:+} lies outside the {}x{} kernel",
                    args.xi, args.psi, width, height
                )));
            }
            (args.xi as usize, args.psi as usize)
        }
        _ => {
            return Err(ValueErrorKind::parse_error(
                "kernel origin needs both +X and +Y offsets",
            ))
        }
    };

    let count = width * height;
    let mut cells = parse_values(values)?;

    // The declared size may draw its values across `;` boundaries.
    while cells.len() < count {
        let Some(next) = rest.pop_front() else {
            break;
        };
        cells.append(&mut parse_values(next)?);
    }

    if cells.len() != count {
        return Err(ValueErrorKind::value_error(&format!(
            "expected {} values for a {}x{} kernel, got {}",
            count,
            width,
            height,
            cells.len()
        )));
    }

    let kernel = Kernel::new(KernelType::User, width, height, x, y, cells)?;
    let mut list = KernelList::from_kernel(kernel);

    if args.flags.expand_90 {
        list.expand_rotations(90.0);
    } else if args.flags.expand_45 {
        list.expand_rotations(45.0);
    }

    Ok(list)
}

fn old_square(segment: &str) -> Result<KernelList, ValueErrorKind> {
    let cells = parse_values(segment)?;

    let side = (cells.len() as f64).sqrt() as usize;
    if side * side != cells.len() || side == 0 {
        return Err(ValueErrorKind::value_error(&format!(
            "{} values do not form a square kernel",
            cells.len()
        )));
    }

    let kernel = Kernel::new(
        KernelType::User,
        side,
        side,
        (side - 1) / 2,
        (side - 1) / 2,
        cells,
    )?;

    Ok(KernelList::from_kernel(kernel))
}

fn parse_values(s: &str) -> Result<Vec<Option<f64>>, ValueErrorKind> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token == "-" || token.eq_ignore_ascii_case("nan") {
                return Ok(None);
            }

            match token.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(ValueErrorKind::parse_error(&format!(
                    "invalid kernel value {:?}",
                    token
                ))),
            }
        })
        .collect()
}
