//! Output rules and rule merging
//!
//! The pipeline's final data model: one rule per surviving condition
//! variant, ready for an external stylesheet formatter to print. The
//! merger coalesces rules whose declaration text is byte-identical under
//! the same at-rule wrapping, regardless of which style property produced
//! them, so equivalent branches share one output block.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CssRule {
    /// Selector fragments appended to the component's class selector,
    /// e.g. `[data-is-hovered]:not([data-is-pressed])`. After merging this
    /// may hold several comma-joined suffixes.
    pub selector_suffix: String,
    /// Declaration text, e.g. `padding: 16px;`.
    pub declarations: String,
    /// Wrapping at-rules, outermost first.
    pub at_rules: Vec<String>,
    /// Root-scoped selector prefix, e.g. `:root[data-theme="dark"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_prefix: Option<String>,
}

/// Join an ordered declaration list into rule text. Order is the
/// handler's declaration order; output must be byte-stable.
pub fn declarations_text(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}: {};", property, value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge rules that produce identical declaration blocks under identical
/// wrapping, preserving first-seen order.
pub fn merge_rules(rules: Vec<CssRule>) -> Vec<CssRule> {
    let mut merged: Vec<CssRule> = Vec::with_capacity(rules.len());
    for rule in rules {
        match merged.iter_mut().find(|existing| {
            existing.declarations == rule.declarations
                && existing.at_rules == rule.at_rules
                && existing.root_prefix == rule.root_prefix
        }) {
            Some(existing) => {
                let already_listed = existing
                    .selector_suffix
                    .split(", ")
                    .any(|suffix| suffix == rule.selector_suffix);
                if !already_listed {
                    existing.selector_suffix =
                        format!("{}, {}", existing.selector_suffix, rule.selector_suffix);
                }
            }
            None => merged.push(rule),
        }
    }
    merged
}
