//! Kernel family tags.

use std::fmt;

use crate::error::ValueErrorKind;

/// The conceptual family a kernel belongs to.
///
/// The tag determines how the builder fills the grid, whether rotation is a
/// no-op (radially or square symmetric families), and how the kernel prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelType {
    User,

    // Convolution kernels
    Gaussian,
    DoG,
    LoG,
    Blur,
    DoB,
    Comet,

    // Discrete convolution kernels
    Laplacian,
    Sobel,
    Roberts,
    Prewitt,
    Compass,
    Kirsch,
    FreiChen,

    // Shape kernels
    Diamond,
    Square,
    Rectangle,
    Disk,
    Plus,
    Cross,
    Ring,

    // Hit-and-miss kernels
    Peaks,
    Edges,
    Corners,
    Ridges,
    LineEnds,
    LineJunctions,
    ConvexHull,
    Skeleton,

    // Distance-measuring kernels
    Chebyshev,
    Manhattan,
    Euclidean,

    Unity,
}

enum_default!(KernelType, KernelType::User);

/// How a kernel grid behaves under rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symmetry {
    /// Radially symmetric; any rotation is a no-op.
    Radial,
    /// Symmetric under quarter turns; rotation is a no-op.
    Square,
    /// A 1-D curve; a half turn is a no-op.
    Linear,
    /// No useful symmetry.
    None,
}

impl KernelType {
    /// Looks a family up by its user-facing name, case-insensitively.
    pub fn from_name(name: &str) -> Result<KernelType, ValueErrorKind> {
        use KernelType::*;

        const NAMES: &[(&str, KernelType)] = &[
            ("unity", Unity),
            ("gaussian", Gaussian),
            ("dog", DoG),
            ("log", LoG),
            ("blur", Blur),
            ("dob", DoB),
            ("comet", Comet),
            ("laplacian", Laplacian),
            ("sobel", Sobel),
            ("roberts", Roberts),
            ("prewitt", Prewitt),
            ("compass", Compass),
            ("kirsch", Kirsch),
            ("freichen", FreiChen),
            ("diamond", Diamond),
            ("square", Square),
            ("rectangle", Rectangle),
            ("disk", Disk),
            ("plus", Plus),
            ("cross", Cross),
            ("ring", Ring),
            ("peaks", Peaks),
            ("edges", Edges),
            ("corners", Corners),
            ("ridges", Ridges),
            ("lineends", LineEnds),
            ("linejunctions", LineJunctions),
            ("convexhull", ConvexHull),
            ("skeleton", Skeleton),
            ("chebyshev", Chebyshev),
            ("manhattan", Manhattan),
            ("euclidean", Euclidean),
        ];

        NAMES
            .iter()
            .find(|(n, _)| name.eq_ignore_ascii_case(n))
            .map(|&(_, t)| t)
            .ok_or_else(|| {
                ValueErrorKind::value_error(&format!("unknown kernel type {:?}", name))
            })
    }

    pub(crate) fn symmetry(self) -> Symmetry {
        use KernelType::*;

        match self {
            Gaussian | DoG | LoG | Disk | Peaks | Laplacian | Chebyshev | Manhattan
            | Euclidean => Symmetry::Radial,
            Square | Diamond | Plus | Cross => Symmetry::Square,
            Blur | DoB => Symmetry::Linear,
            _ => Symmetry::None,
        }
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KernelType::*;

        let name = match *self {
            User => "User",
            Gaussian => "Gaussian",
            DoG => "DoG",
            LoG => "LoG",
            Blur => "Blur",
            DoB => "DoB",
            Comet => "Comet",
            Laplacian => "Laplacian",
            Sobel => "Sobel",
            Roberts => "Roberts",
            Prewitt => "Prewitt",
            Compass => "Compass",
            Kirsch => "Kirsch",
            FreiChen => "FreiChen",
            Diamond => "Diamond",
            Square => "Square",
            Rectangle => "Rectangle",
            Disk => "Disk",
            Plus => "Plus",
            Cross => "Cross",
            Ring => "Ring",
            Peaks => "Peaks",
            Edges => "Edges",
            Corners => "Corners",
            Ridges => "Ridges",
            LineEnds => "LineEnds",
            LineJunctions => "LineJunctions",
            ConvexHull => "ConvexHull",
            Skeleton => "Skeleton",
            Chebyshev => "Chebyshev",
            Manhattan => "Manhattan",
            Euclidean => "Euclidean",
            Unity => "Unity",
        };

        f.write_str(name)
    }
}
