//! Morphology methods and their decomposition into primitive stages.

use std::fmt;

use super::composite::CompositeOperator;

/// A user-facing morphology method.
///
/// Simple methods map to a single primitive; compound methods are sequences
/// of primitives with per-stage kernel reflection, and some difference their
/// result against the original image afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologyMethod {
    /// Weighted sum of the neighbourhood under the (reflected) kernel.
    Convolve,
    /// Convolve with the kernel applied unreflected.
    Correlate,

    Erode,
    Dilate,
    ErodeIntensity,
    DilateIntensity,
    /// Chamfer distance propagation; iterate to the fixed point for a full
    /// distance transform.
    Distance,

    Open,
    Close,
    OpenIntensity,
    CloseIntensity,
    Smooth,

    /// Dilation minus erosion.
    Edge,
    /// Erosion differenced against the original.
    EdgeIn,
    /// Dilation differenced against the original.
    EdgeOut,
    /// Original minus opening.
    TopHat,
    /// Closing minus original.
    BottomHat,

    HitAndMiss,
    Thinning,
    Thickening,
}

enum_default!(MorphologyMethod, MorphologyMethod::Convolve);

impl fmt::Display for MorphologyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MorphologyMethod::*;

        let name = match *self {
            Convolve => "Convolve",
            Correlate => "Correlate",
            Erode => "Erode",
            Dilate => "Dilate",
            ErodeIntensity => "ErodeIntensity",
            DilateIntensity => "DilateIntensity",
            Distance => "Distance",
            Open => "Open",
            Close => "Close",
            OpenIntensity => "OpenIntensity",
            CloseIntensity => "CloseIntensity",
            Smooth => "Smooth",
            Edge => "Edge",
            EdgeIn => "EdgeIn",
            EdgeOut => "EdgeOut",
            TopHat => "TopHat",
            BottomHat => "BottomHat",
            HitAndMiss => "HitAndMiss",
            Thinning => "Thinning",
            Thickening => "Thickening",
        };

        f.write_str(name)
    }
}

/// One atomic per-pixel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Primitive {
    Convolve,
    Erode,
    Dilate,
    HitAndMiss,
    Thinning,
    Thickening,
    ErodeIntensity,
    DilateIntensity,
    Distance,
}

impl Primitive {
    /// Whether the primitive pairs kernel cells with the neighbourhood
    /// through the 180°-rotated kernel (and the correspondingly shifted
    /// origin).  This is what makes dilation the true dual of erosion for
    /// asymmetric kernels, and convolution a convolution.
    pub fn reflected_pairing(self) -> bool {
        matches!(
            self,
            Primitive::Convolve
                | Primitive::Dilate
                | Primitive::DilateIntensity
                | Primitive::Distance
        )
    }

    /// Intensity primitives copy whole pixels and ignore the channel mask.
    pub fn ignores_channel_mask(self) -> bool {
        matches!(self, Primitive::ErodeIntensity | Primitive::DilateIntensity)
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Convolve => "Convolve",
            Primitive::Erode => "Erode",
            Primitive::Dilate => "Dilate",
            Primitive::HitAndMiss => "HitAndMiss",
            Primitive::Thinning => "Thinning",
            Primitive::Thickening => "Thickening",
            Primitive::ErodeIntensity => "ErodeIntensity",
            Primitive::DilateIntensity => "DilateIntensity",
            Primitive::Distance => "Distance",
        }
    }
}

/// One step of a compound method.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stage {
    pub primitive: Primitive,
    /// Apply the 180°-rotated copy of the kernel list.
    pub reflect_kernel: bool,
    /// Run on the method's input image instead of the previous stage result.
    pub from_original: bool,
}

impl Stage {
    const fn new(primitive: Primitive) -> Stage {
        Stage {
            primitive,
            reflect_kernel: false,
            from_original: false,
        }
    }

    const fn reflected(primitive: Primitive) -> Stage {
        Stage {
            primitive,
            reflect_kernel: true,
            from_original: false,
        }
    }
}

/// What happens to the accumulated result after the stages have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostProcess {
    None,
    /// Difference the method result against the original image.
    DifferenceWithOriginal,
    /// Difference the results of the two stages against each other.
    DifferenceOfStages,
}

/// The decomposition of a method, computed up-front.
#[derive(Debug, Clone)]
pub(crate) struct MethodPlan {
    pub stages: Vec<Stage>,
    /// Iterate the method loop instead of the primitive loop (thinning and
    /// thickening walk the whole kernel list once per iteration).
    pub iterate_method: bool,
    /// Run every primitive exactly once regardless of the iteration count.
    pub single_shot: bool,
    pub default_compose: CompositeOperator,
    pub post: PostProcess,
}

impl MethodPlan {
    pub fn for_method(method: MorphologyMethod) -> MethodPlan {
        use MorphologyMethod::*;
        use Primitive as P;

        let mut plan = MethodPlan {
            stages: Vec::new(),
            iterate_method: false,
            single_shot: false,
            default_compose: CompositeOperator::NoComposite,
            post: PostProcess::None,
        };

        match method {
            Convolve => plan.stages.push(Stage::new(P::Convolve)),
            // Correlation is convolution by the reflected kernel.
            Correlate => plan.stages.push(Stage::reflected(P::Convolve)),

            Erode => plan.stages.push(Stage::new(P::Erode)),
            Dilate => plan.stages.push(Stage::new(P::Dilate)),
            ErodeIntensity => plan.stages.push(Stage::new(P::ErodeIntensity)),
            DilateIntensity => plan.stages.push(Stage::new(P::DilateIntensity)),
            Distance => plan.stages.push(Stage::new(P::Distance)),

            Open => {
                plan.stages.push(Stage::new(P::Erode));
                plan.stages.push(Stage::new(P::Dilate));
            }
            Close => {
                plan.stages.push(Stage::reflected(P::Dilate));
                plan.stages.push(Stage::reflected(P::Erode));
            }
            OpenIntensity => {
                plan.stages.push(Stage::new(P::ErodeIntensity));
                plan.stages.push(Stage::new(P::DilateIntensity));
            }
            CloseIntensity => {
                plan.stages.push(Stage::reflected(P::DilateIntensity));
                plan.stages.push(Stage::reflected(P::ErodeIntensity));
            }

            // Open, then close, in one pass.
            Smooth => {
                plan.stages.push(Stage::new(P::Erode));
                plan.stages.push(Stage::new(P::Dilate));
                plan.stages.push(Stage::reflected(P::Dilate));
                plan.stages.push(Stage::reflected(P::Erode));
            }

            Edge => {
                plan.stages.push(Stage::new(P::Dilate));
                plan.stages.push(Stage {
                    primitive: P::Erode,
                    reflect_kernel: false,
                    from_original: true,
                });
                plan.post = PostProcess::DifferenceOfStages;
            }
            EdgeIn => {
                plan.stages.push(Stage::new(P::Erode));
                plan.post = PostProcess::DifferenceWithOriginal;
            }
            EdgeOut => {
                plan.stages.push(Stage::new(P::Dilate));
                plan.post = PostProcess::DifferenceWithOriginal;
            }
            TopHat => {
                plan.stages.push(Stage::new(P::Erode));
                plan.stages.push(Stage::new(P::Dilate));
                plan.post = PostProcess::DifferenceWithOriginal;
            }
            BottomHat => {
                plan.stages.push(Stage::reflected(P::Dilate));
                plan.stages.push(Stage::reflected(P::Erode));
                plan.post = PostProcess::DifferenceWithOriginal;
            }

            HitAndMiss => {
                plan.stages.push(Stage::new(P::HitAndMiss));
                plan.single_shot = true;
                plan.default_compose = CompositeOperator::Lighten;
            }
            Thinning => {
                plan.stages.push(Stage::new(P::Thinning));
                plan.iterate_method = true;
            }
            Thickening => {
                plan.stages.push(Stage::new(P::Thickening));
                plan.iterate_method = true;
            }
        }

        plan
    }
}
