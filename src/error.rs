//! Error types.

use std::error;
use std::fmt;

/// A simple error which refers to a kernel argument or string value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueErrorKind {
    /// The value could not be parsed
    Parse(String),

    // The value could be parsed, but is invalid
    Value(String),
}

impl ValueErrorKind {
    pub fn parse_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Parse(s.to_string())
    }

    pub fn value_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Value(s.to_string())
    }
}

impl fmt::Display for ValueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ValueErrorKind::Parse(ref s) => write!(f, "parse error: {}", s),

            ValueErrorKind::Value(ref s) => write!(f, "invalid value: {}", s),
        }
    }
}

impl error::Error for ValueErrorKind {}

/// A complete error for a kernel definition within a kernel list.
///
/// Kernel strings may chain several definitions with `;`; when one of them
/// fails, the whole list fails with the index of the offending definition.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelError {
    pub index: usize,
    pub err: ValueErrorKind,
}

impl KernelError {
    pub fn new(index: usize, err: ValueErrorKind) -> KernelError {
        KernelError { index, err }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel #{}: {}", self.index, self.err)
    }
}

impl error::Error for KernelError {}

impl From<ValueErrorKind> for KernelError {
    #[inline]
    fn from(err: ValueErrorKind) -> Self {
        KernelError { index: 0, err }
    }
}

/// An enumeration of errors that can occur while applying a morphology method.
#[derive(Debug, Clone, PartialEq)]
pub enum MorphologyError {
    /// The method was passed an invalid parameter.
    InvalidParameter(String),

    /// The kernel list was empty or one of its kernels was malformed.
    BadKernel(KernelError),

    /// An intermediate surface could not be allocated.
    Allocation(String),
}

impl fmt::Display for MorphologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MorphologyError::InvalidParameter(ref s) => {
                write!(f, "invalid parameter value: {}", s)
            }
            MorphologyError::BadKernel(ref e) => write!(f, "bad kernel: {}", e),
            MorphologyError::Allocation(ref s) => write!(f, "allocation failed: {}", s),
        }
    }
}

impl error::Error for MorphologyError {}

impl From<KernelError> for MorphologyError {
    #[inline]
    fn from(e: KernelError) -> Self {
        MorphologyError::BadKernel(e)
    }
}

impl From<ValueErrorKind> for MorphologyError {
    #[inline]
    fn from(e: ValueErrorKind) -> Self {
        MorphologyError::BadKernel(KernelError::from(e))
    }
}
