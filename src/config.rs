//! Process-wide compiler configuration
//!
//! Custom scale units, custom value functions, and the global alias
//! registry are loaded once before any compilation occurs. The library
//! never reads ambient state during a compile: a `StyleConfig` snapshot is
//! threaded explicitly into every `StateParserContext`. The process-wide
//! registry exists only for the convenience entry points and locks after
//! the first compilation; later attempts to change it are ignored with a
//! diagnostic.

use crate::diagnostics;
use crate::error::{Result, StyleError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Global alias definitions, keyed without the leading `@`
    /// (`mobile` -> `@media(w < 768px)`).
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// Custom scale units, keyed by suffix (`x` -> `8px`). A bound value
    /// written as `2x` is rewritten to its resolved calculation before
    /// numeric parsing.
    #[serde(default)]
    pub units: HashMap<String, String>,

    /// Custom value functions, passed through to the external value
    /// formatter collaborator. The condition pipeline itself never
    /// evaluates these.
    #[serde(default)]
    pub funcs: HashMap<String, String>,
}

impl StyleConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| StyleError::config(e.to_string()))
    }
}

fn global_config() -> &'static Mutex<StyleConfig> {
    static GLOBAL: OnceLock<Mutex<StyleConfig>> = OnceLock::new();
    GLOBAL.get_or_init(|| Mutex::new(StyleConfig::default()))
}

static LOCKED: AtomicBool = AtomicBool::new(false);

/// Replace the process-wide configuration. Ignored with a diagnostic once
/// the first compilation has locked it.
pub fn configure(config: StyleConfig) {
    if LOCKED.load(Ordering::SeqCst) {
        diagnostics::warn_once(
            "config:locked",
            "style configuration is locked after the first compilation; change ignored",
        );
        return;
    }
    match global_config().lock() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Snapshot the process-wide configuration for a compilation, locking it
/// against further changes.
pub fn global_snapshot() -> StyleConfig {
    LOCKED.store(true, Ordering::SeqCst);
    match global_config().lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip() {
        let cfg = StyleConfig::from_toml_str(
            r#"
            [aliases]
            mobile = "@media(w < 768px)"

            [units]
            x = "8px"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.aliases["mobile"], "@media(w < 768px)");
        assert_eq!(cfg.units["x"], "8px");
        assert!(cfg.funcs.is_empty());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = StyleConfig::from_toml_str("aliases = 3").unwrap_err();
        assert!(matches!(err, StyleError::Config { .. }));
    }

    #[test]
    fn test_configure_after_lock_is_ignored() {
        let mut cfg = StyleConfig::default();
        cfg.units.insert("q".to_string(), "4px".to_string());
        configure(cfg);

        let snapshot = global_snapshot();

        // Locked now: this change must not take.
        let mut late = StyleConfig::default();
        late.units.insert("z".to_string(), "2px".to_string());
        configure(late);

        let after = global_snapshot();
        assert_eq!(snapshot.units.get("q"), after.units.get("q"));
        assert!(!after.units.contains_key("z"));
    }
}
