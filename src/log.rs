//! Diagnostics for kernel dumps and per-stage morphology traces.
//!
//! The engine has two diagnostic surfaces: kernel dumps requested through
//! the `showkernel` option family, and per-stage trace lines naming each
//! primitive invocation with the number of pixels it changed.  Every line
//! goes through [`trace`], which prints when the caller opted in through
//! the option map, or process-wide when the `PIXMORPH_LOG` environment
//! variable is set.

use std::fmt;

use once_cell::sync::Lazy;

/// Whether the `PIXMORPH_LOG` environment variable opted this process into
/// diagnostics.  Read once, on first use.
pub fn log_enabled() -> bool {
    static ENABLED: Lazy<bool> = Lazy::new(|| ::std::env::var_os("PIXMORPH_LOG").is_some());

    *ENABLED
}

/// Writes one diagnostic line when `opted_in` is set or the environment
/// gate is open.
///
/// The dispatcher passes the `verbose` option here; kernel dumps pass
/// `true`, since showing a kernel only happens on explicit request and
/// must not additionally depend on the environment.
pub fn trace(opted_in: bool, line: fmt::Arguments<'_>) {
    if opted_in || log_enabled() {
        println!("{}", line);
    }
}

/// An environment-gated diagnostic line, for messages nobody asked for
/// explicitly (such as the unsupported-rotation warning).
#[macro_export]
macro_rules! morph_log {
    (
        $($arg:tt)+
    ) => {
        $crate::log::trace(false, format_args!($($arg)+))
    };
}
