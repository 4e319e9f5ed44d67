//! String-valued options consumed by the morphology entry point.
//!
//! The caller may attach free-form `key=value` options to a morphology run,
//! mirroring the original engine's per-image artifact map.  The recognized
//! keys are:
//!
//! * `convolve:scale` - geometry; post-scale the convolution kernel (rho)
//!   and/or add a scaled unity kernel (sigma); `^` normalizes first.
//! * `showkernel`, `convolve:showkernel`, `morphology:showkernel` - any one
//!   of these set dumps the final kernel list to the diagnostic stream.
//! * `morphology:compose` - name of the operator used to merge the results
//!   of a multi-kernel list.
//! * `verbose` - emit a trace line for every primitive invocation.
//!
//! Options are read once at the top of [`crate::morphology::apply`] and
//! passed down as plain values; nothing in the core consults them again.

use std::collections::HashMap;

/// A string-to-string option map.
#[derive(Debug, Default, Clone)]
pub struct Options {
    map: HashMap<String, String>,
}

impl Options {
    pub fn new() -> Options {
        Options::default()
    }

    /// Sets a key, replacing any previous value.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.map.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Whether the key is present at all, regardless of its value.
    pub fn is_set(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Whether any of the given keys is present.
    pub fn any_set(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.is_set(k))
    }
}
