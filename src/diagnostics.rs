//! Deduplicated, non-fatal diagnostics
//!
//! Every degraded parse, unresolved alias, or ignored config change is
//! reported through here. Each distinct problem key warns at most once per
//! process lifetime, and diagnostics never change compiled output - the
//! same input compiles to the same rules whether or not the warnings fire.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

fn seen_keys() -> &'static Mutex<HashSet<String>> {
    static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    SEEN.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Emit a warning once per distinct `key`. Repeat calls with the same key
/// are silently dropped.
pub fn warn_once(key: &str, message: impl AsRef<str>) {
    let mut seen = match seen_keys().lock() {
        Ok(guard) => guard,
        // A poisoned registry only affects dedup, never output.
        Err(poisoned) => poisoned.into_inner(),
    };
    if seen.insert(key.to_string()) {
        log::warn!("{}", message.as_ref());
    }
}

/// Whether a diagnostic key has already fired. Used by tests and by call
/// sites that want to skip building an expensive message.
pub fn already_reported(key: &str) -> bool {
    match seen_keys().lock() {
        Ok(seen) => seen.contains(key),
        Err(poisoned) => poisoned.into_inner().contains(key),
    }
}
