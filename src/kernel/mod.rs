//! The kernel model: a rectangular grid of weights plus metadata, and the
//! transforms (scaling, rotation, reflection, expansion) that operate on it.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use nalgebra::DMatrix;

use crate::error::{KernelError, ValueErrorKind};
use crate::geometry::KernelArgs;

pub mod builder;
pub mod parser;
pub mod types;

pub use types::KernelType;

use types::Symmetry;

/// Values closer to zero than this are clamped to exact zero when kernel
/// metadata is recomputed, and range sums within it count as zero.
pub const KERNEL_EPSILON: f64 = 1e-12;

/// Flags controlling [`Kernel::scale`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScaleFlags {
    /// Divide by the sum of the values (or by the positive range for a
    /// zero-summing kernel) before applying the factor.
    pub normalize: bool,
    /// Scale positive and negative values separately so the kernel becomes
    /// zero-summing with unit energy on both sides.
    pub correlate_normalize: bool,
    /// Treat the factor as a percentage.
    pub percent: bool,
}

impl ScaleFlags {
    pub const NONE: ScaleFlags = ScaleFlags {
        normalize: false,
        correlate_normalize: false,
        percent: false,
    };

    pub const NORMALIZE: ScaleFlags = ScaleFlags {
        normalize: true,
        correlate_normalize: false,
        percent: false,
    };

    pub const CORRELATE_NORMALIZE: ScaleFlags = ScaleFlags {
        normalize: false,
        correlate_normalize: true,
        percent: false,
    };
}

/// A single convolution/morphology kernel.
///
/// The grid is stored with one `Option<f64>` per cell; `None` is a masked
/// ("don't care") cell which never takes part in sums, extrema or per-pixel
/// accumulation.  The metadata fields are recomputed whenever the values
/// change and before any scaling or application.
#[derive(Debug, Clone)]
pub struct Kernel {
    kind: KernelType,

    /// Cell grid; nalgebra indexes it `(row, column)`.
    values: DMatrix<Option<f64>>,

    /// Origin cell, `x < width`, `y < height`.
    x: usize,
    y: usize,

    /// Cumulative rotation applied since construction, degrees in [0, 360).
    angle: f64,

    minimum: f64,
    maximum: f64,
    positive_range: f64,
    negative_range: f64,
}

/// Kernels compare by shape, origin and cell values.
///
/// The accumulated angle and the derived metadata are ignored: the former is
/// bookkeeping, the latter follows the values.  Masked cells only equal other
/// masked cells.  This is the equality rotation expansion stops on.
impl PartialEq for Kernel {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.x == other.x
            && self.y == other.y
            && self.values == other.values
    }
}

impl Kernel {
    /// Creates a kernel from a row-major cell vector.
    pub fn new(
        kind: KernelType,
        width: usize,
        height: usize,
        x: usize,
        y: usize,
        cells: Vec<Option<f64>>,
    ) -> Result<Kernel, ValueErrorKind> {
        if width == 0 || height == 0 {
            return Err(ValueErrorKind::value_error("kernel extent cannot be zero"));
        }

        if cells.len() != width * height {
            return Err(ValueErrorKind::value_error(&format!(
                "expected {} values for a {}x{} kernel, got {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }

        if x >= width || y >= height {
            return Err(ValueErrorKind::value_error(&format!(
                "origin +{}+{} lies outside the {}x{} kernel",
                x, y, width, height
            )));
        }

        if !cells.iter().any(Option::is_some) {
            return Err(ValueErrorKind::value_error(
                "kernel must have at least one unmasked value",
            ));
        }

        if let Some(v) = cells.iter().flatten().find(|v| !v.is_finite()) {
            return Err(ValueErrorKind::value_error(&format!(
                "kernel value {} is not finite",
                v
            )));
        }

        let mut kernel = Kernel {
            kind,
            values: DMatrix::from_row_iterator(height, width, cells),
            x,
            y,
            angle: 0.0,
            minimum: 0.0,
            maximum: 0.0,
            positive_range: 0.0,
            negative_range: 0.0,
        };
        kernel.recompute_metadata();

        Ok(kernel)
    }

    #[inline]
    pub fn kind(&self) -> KernelType {
        self.kind
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    /// The origin cell `(x, y)`.
    #[inline]
    pub fn origin(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    #[inline]
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    #[inline]
    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Sum of the strictly positive cells.
    #[inline]
    pub fn positive_range(&self) -> f64 {
        self.positive_range
    }

    /// Sum of the strictly negative cells.
    #[inline]
    pub fn negative_range(&self) -> f64 {
        self.negative_range
    }

    /// The cell at column `x`, row `y`; `None` for a masked cell.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        self.values[(y, x)]
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        (0..self.height()).flat_map(move |y| (0..self.width()).map(move |x| self.get(x, y)))
    }

    /// Rescans the grid and refreshes `minimum`, `maximum` and the range
    /// sums.  Near-zero values are clamped to exact zero first; zero cells
    /// count towards the extrema but not the range sums, masked cells count
    /// towards neither.
    pub fn recompute_metadata(&mut self) {
        let mut minimum = f64::INFINITY;
        let mut maximum = f64::NEG_INFINITY;
        let mut positive_range = 0.0;
        let mut negative_range = 0.0;

        for cell in self.values.iter_mut() {
            if let Some(v) = cell {
                if v.abs() < KERNEL_EPSILON {
                    *v = 0.0;
                }

                minimum = minimum.min(*v);
                maximum = maximum.max(*v);
                if *v > 0.0 {
                    positive_range += *v;
                } else {
                    negative_range += *v;
                }
            }
        }

        self.minimum = minimum;
        self.maximum = maximum;
        self.positive_range = positive_range;
        self.negative_range = negative_range;
    }

    /// Normalizes and multiplies the kernel values.
    ///
    /// The normalization selected by `flags` happens first, then every value
    /// is multiplied by `factor`.  A negative factor flips the value signs,
    /// and with them the extrema and ranges.
    pub fn scale(&mut self, factor: f64, flags: ScaleFlags) {
        let mut factor = factor;
        if flags.percent {
            factor *= 0.01;
        }

        let mut pos_div = 1.0;
        let mut neg_div = 1.0;

        if flags.normalize {
            let sum = self.positive_range + self.negative_range;
            // A zero-summing kernel normalizes by its positive side alone.
            let sum = if sum.abs() < KERNEL_EPSILON {
                self.positive_range
            } else {
                sum
            };

            if sum.abs() >= KERNEL_EPSILON {
                pos_div *= sum;
                neg_div *= sum;
            }
        }

        if flags.correlate_normalize {
            if self.positive_range.abs() >= KERNEL_EPSILON {
                pos_div *= self.positive_range;
            }
            if self.negative_range.abs() >= KERNEL_EPSILON {
                neg_div *= -self.negative_range;
            }
        }

        let pos_scale = factor / pos_div;
        let neg_scale = factor / neg_div;

        for cell in self.values.iter_mut() {
            if let Some(v) = cell {
                *v *= if *v >= 0.0 { pos_scale } else { neg_scale };
            }
        }

        self.recompute_metadata();
    }

    /// Adds `scale` to the origin cell, i.e. adds a scaled unity kernel.
    /// A masked origin stays masked.
    pub fn unity_add(&mut self, scale: f64) {
        if let Some(v) = &mut self.values[(self.y, self.x)] {
            *v += scale;
        }

        self.recompute_metadata();
    }

    /// Replaces every masked cell with an explicit zero.
    pub fn zero_nan(&mut self) {
        for cell in self.values.iter_mut() {
            if cell.is_none() {
                *cell = Some(0.0);
            }
        }

        self.recompute_metadata();
    }

    /// Rotates the kernel a half turn: the cell grid is reversed and the
    /// origin moves to the mirrored cell.
    pub fn reflect(&mut self) {
        let (w, h) = (self.width(), self.height());

        self.values = DMatrix::from_fn(h, w, |r, c| self.values[(h - 1 - r, w - 1 - c)]);
        self.x = w - 1 - self.x;
        self.y = h - 1 - self.y;
    }

    /// Returns the 180°-rotated copy used by the reflected method stages.
    pub fn reflected(&self) -> Kernel {
        let mut k = self.clone();
        k.reflect();
        k
    }

    /// Rotates the kernel by `angle` degrees, rounded to the nearest
    /// multiple of 45°.
    ///
    /// Radially and square-symmetric families ignore rotation entirely, and
    /// 1-D curves ignore half turns.  The odd 45° component is only
    /// supported on 3×3 kernels (the grid perimeter shifts by one cell);
    /// anywhere else it is diagnosed and the kernel is left untouched.
    pub fn rotate(&mut self, angle: f64) {
        let mut steps = ((angle.rem_euclid(360.0) / 45.0).round() as i32).rem_euclid(8);
        if steps == 0 {
            return;
        }

        match self.kind.symmetry() {
            Symmetry::Radial | Symmetry::Square => return,
            Symmetry::Linear => {
                // The same line after a half turn.
                steps %= 4;
                if steps == 0 {
                    return;
                }
            }
            Symmetry::None => (),
        }

        if steps % 2 == 1 {
            if self.width() != 3 || self.height() != 3 {
                morph_log!(
                    "pixmorph: cannot rotate a {}x{} kernel by 45 degrees",
                    self.width(),
                    self.height()
                );
                return;
            }

            self.rotate_45();
            steps -= 1;
        }

        for _ in 0..steps / 2 {
            self.rotate_90();
        }

        self.angle = (self.angle + angle).rem_euclid(360.0);
    }

    /// Shifts the 3×3 grid perimeter by one cell.
    fn rotate_45(&mut self) {
        debug_assert_eq!((self.width(), self.height()), (3, 3));

        let at = |x: usize, y: usize| self.values[(y, x)];

        self.values = DMatrix::from_row_slice(
            3,
            3,
            &[
                at(1, 0),
                at(2, 0),
                at(2, 1),
                at(0, 0),
                at(1, 1),
                at(2, 2),
                at(0, 1),
                at(0, 2),
                at(1, 2),
            ],
        );
    }

    /// Rotates the grid a quarter turn, swapping width and height.
    fn rotate_90(&mut self) {
        let (w, h) = (self.width(), self.height());

        self.values = DMatrix::from_fn(w, h, |r, c| self.values[(c, w - 1 - r)]);

        let (x, y) = (self.x, self.y);
        self.x = y;
        self.y = w - 1 - x;
    }

    /// Writes the kernel to the diagnostic stream.  Callers invoke this on
    /// an explicit `showkernel` request, so it does not consult the
    /// environment gate.
    pub fn show(&self, index: usize) {
        crate::log::trace(true, format_args!("Kernel #{}\n{}", index, self));
    }
}

/// Formats a float the way the kernel grids print: short, no trailing zeros.
fn fmt_value(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1.0e6 {
        format!("{}", v as i64)
    } else {
        let mut s = format!("{:.6}", v);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let angle = if self.angle != 0.0 {
            format!("@{}", fmt_value(self.angle))
        } else {
            String::new()
        };

        writeln!(
            f,
            "Kernel \"{}{}\" of size {}x{}+{}+{} with values from {} to {}",
            self.kind,
            angle,
            self.width(),
            self.height(),
            self.x,
            self.y,
            fmt_value(self.minimum),
            fmt_value(self.maximum),
        )?;

        let sum = self.positive_range + self.negative_range;
        let classification = if sum.abs() < KERNEL_EPSILON {
            "Zero-Summing Kernel".to_string()
        } else if (sum - 1.0).abs() < KERNEL_EPSILON {
            "Normalized Kernel".to_string()
        } else {
            format!("Sum {}", fmt_value(sum))
        };

        writeln!(
            f,
            "Forming an output range from {} to {} ({})",
            fmt_value(self.negative_range),
            fmt_value(self.positive_range),
            classification,
        )?;

        for y in 0..self.height() {
            let row = (0..self.width()).map(|x| match self.get(x, y) {
                Some(v) => fmt_value(v),
                None => "nan".to_string(),
            });
            writeln!(f, "{:2}: {}", y, row.format(" "))?;
        }

        Ok(())
    }
}

/// An ordered list of kernels.
///
/// Methods traverse the list in insertion order and may compose the results
/// across kernels.  This owns its kernels outright; cloning the list
/// deep-clones every kernel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelList {
    kernels: Vec<Kernel>,
}

impl KernelList {
    pub fn new() -> KernelList {
        KernelList::default()
    }

    pub fn from_kernel(kernel: Kernel) -> KernelList {
        KernelList {
            kernels: vec![kernel],
        }
    }

    /// Builds a named kernel family from its decoded arguments.
    pub fn from_builtin(kind: KernelType, args: &KernelArgs) -> Result<KernelList, ValueErrorKind> {
        builder::build(kind, args)
    }

    /// Parses a kernel definition string; see [`parser`] for the grammar.
    pub fn parse(s: &str) -> Result<KernelList, KernelError> {
        parser::parse_kernel_list(s)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Kernel> {
        self.kernels.iter()
    }

    #[inline]
    pub fn first(&self) -> Option<&Kernel> {
        self.kernels.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Kernel> {
        self.kernels.last()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Kernel> {
        self.kernels.get(index)
    }

    pub fn push(&mut self, kernel: Kernel) {
        self.kernels.push(kernel);
    }

    pub fn extend(&mut self, other: KernelList) {
        self.kernels.extend(other.kernels);
    }

    /// The 180°-rotated copy of the whole list.
    pub fn reflected(&self) -> KernelList {
        KernelList {
            kernels: self.kernels.iter().map(Kernel::reflected).collect(),
        }
    }

    /// Scales every kernel in the list.
    pub fn scale(&mut self, factor: f64, flags: ScaleFlags) {
        for kernel in &mut self.kernels {
            kernel.scale(factor, flags);
        }
    }

    /// Adds a scaled unity kernel to every kernel in the list.
    pub fn unity_add(&mut self, scale: f64) {
        for kernel in &mut self.kernels {
            kernel.unity_add(scale);
        }
    }

    /// Replaces masked cells with zeros in every kernel of the list.
    pub fn zero_nan(&mut self) {
        for kernel in &mut self.kernels {
            kernel.zero_nan();
        }
    }

    /// Replicates the list under rotation: the last kernel is cloned and
    /// rotated by `delta` degrees until a rotation comes back around to the
    /// first kernel.
    pub fn expand_rotations(&mut self, delta: f64) {
        // 45° steps cycle after at most eight applications.
        for _ in 0..8 {
            let (Some(first), Some(last)) = (self.kernels.first(), self.kernels.last()) else {
                return;
            };

            let mut next = last.clone();
            next.rotate(delta);

            if next == *first {
                return;
            }

            self.kernels.push(next);
        }
    }

    /// Writes every kernel in the list to the diagnostic stream.
    pub fn show(&self) {
        for (i, kernel) in self.kernels.iter().enumerate() {
            kernel.show(i);
        }
    }
}

impl FromStr for KernelList {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KernelList::parse(s)
    }
}

impl<'a> IntoIterator for &'a KernelList {
    type Item = &'a Kernel;
    type IntoIter = std::slice::Iter<'a, Kernel>;

    fn into_iter(self) -> Self::IntoIter {
        self.kernels.iter()
    }
}
