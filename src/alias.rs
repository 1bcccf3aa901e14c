//! Named alias resolution
//!
//! Short alias names stand in for full condition expressions. Local
//! declarations (per style map) take priority over the global registry;
//! chained aliases are rejected at registration time and unresolved names
//! degrade to opaque modifier atoms with a once-per-name diagnostic.

use crate::diagnostics;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Built-in prefixes an alias name must not shadow.
const RESERVED: &[&str] = &["media", "root", "own", "starting"];

fn alias_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@[a-zA-Z][a-zA-Z0-9-]*$").unwrap())
}

fn alias_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([a-zA-Z][a-zA-Z0-9-]*)").unwrap())
}

/// Whether `token` (including the leading `@`) has the shape of an alias
/// name: `@`, a letter, then letters/digits/hyphens.
pub fn is_alias_token(token: &str) -> bool {
    alias_name_regex().is_match(token)
}

/// Whether `value` references any alias (a non-reserved `@name` token).
/// Used to reject chained aliases.
pub fn contains_alias_reference(value: &str) -> bool {
    alias_reference_regex()
        .captures_iter(value)
        .any(|caps| !RESERVED.contains(&&caps[1]))
}

/// Validate and normalize a set of raw alias declarations (keys carry the
/// leading `@`). Invalid entries are dropped with a diagnostic; valid
/// ones are returned keyed without the `@`.
pub fn register<'a, I>(declarations: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut registry = HashMap::new();
    for (name, value) in declarations {
        if !is_alias_token(name) {
            diagnostics::warn_once(
                &format!("alias:bad-name:{}", name),
                format!("invalid alias name '{}': expected '@' followed by a letter, then letters/digits/hyphens", name),
            );
            continue;
        }
        let bare = &name[1..];
        if RESERVED.contains(&bare) {
            diagnostics::warn_once(
                &format!("alias:reserved:{}", name),
                format!("alias name '{}' collides with a built-in prefix", name),
            );
            continue;
        }
        if contains_alias_reference(value) {
            diagnostics::warn_once(
                &format!("alias:chained:{}", name),
                format!(
                    "alias '{}' resolves to '{}' which references another alias; chained aliases are not supported",
                    name, value
                ),
            );
            continue;
        }
        registry.insert(bare.to_string(), value.to_string());
    }
    registry
}

/// Resolve a bare alias name (no `@`), local definitions first.
pub fn resolve<'a>(
    name: &str,
    local: &'a HashMap<String, String>,
    global: &'a HashMap<String, String>,
) -> Option<&'a str> {
    local
        .get(name)
        .or_else(|| global.get(name))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_token_shape() {
        assert!(is_alias_token("@mobile"));
        assert!(is_alias_token("@dark-mode"));
        assert!(is_alias_token("@b2"));
        assert!(!is_alias_token("@2col"));
        assert!(!is_alias_token("@"));
        assert!(!is_alias_token("mobile"));
        assert!(!is_alias_token("@media(w<400px)"));
    }

    #[test]
    fn test_reference_detection_skips_builtins() {
        assert!(!contains_alias_reference("@media(w < 400px) & hovered"));
        assert!(!contains_alias_reference("@root(theme=dark) | @starting"));
        assert!(contains_alias_reference("@mobile & hovered"));
        assert!(contains_alias_reference("@media(w < 400px) | @tablet"));
    }

    #[test]
    fn test_register_drops_invalid_entries() {
        let registry = register(vec![
            ("@mobile", "@media(w < 768px)"),
            ("@media", "hovered"),
            ("@chained", "@mobile & pressed"),
            ("bad", "hovered"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry["mobile"], "@media(w < 768px)");
    }

    #[test]
    fn test_local_wins_over_global() {
        let local = register(vec![("@mobile", "@media(w < 480px)")]);
        let global = register(vec![("@mobile", "@media(w < 768px)")]);
        assert_eq!(
            resolve("mobile", &local, &global),
            Some("@media(w < 480px)")
        );
        assert_eq!(resolve("mobile", &HashMap::new(), &global), Some("@media(w < 768px)"));
        assert_eq!(resolve("missing", &local, &global), None);
    }
}
