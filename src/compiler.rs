//! Compilation pipeline
//!
//! Orchestrates the full pass over one style map: condition parsing with
//! alias resolution, exclusivity building, simplification, handler
//! grouping, materialization, and rule merging. The compiler owns the
//! three LRU caches (parse, simplify, materialize); everything else is
//! pure values, so nested compilations are safe as long as each cache
//! borrow stays local to a single lookup.

use crate::alias;
use crate::cache::LruCache;
use crate::condition::Condition;
use crate::config::StyleConfig;
use crate::error::{Result, StyleError};
use crate::exclusivity::{build_exclusive, ExclusiveStyleEntry};
use crate::handlers::{compute_handler_rules, StyleHandler, ValueFormatter};
use crate::materialize::{condition_to_css, RenderedCondition};
use crate::parser::{parse, StateParserContext};
use crate::rules::{declarations_text, merge_rules, CssRule};
use crate::simplify::simplify;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

const PARSE_CACHE_CAPACITY: usize = 512;
const SIMPLIFY_CACHE_CAPACITY: usize = 512;
const MATERIALIZE_CACHE_CAPACITY: usize = 256;

/// A style value: either unconditional, or an ordered list of
/// `(condition expression, value)` pairs in ascending declaration
/// priority (later entries override earlier ones).
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Literal(String),
    Conditional(Vec<(String, String)>),
}

/// Input to one compilation: ordered property entries plus local alias
/// declarations (keys with a leading `@`).
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    entries: Vec<(String, StyleValue)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, property: &str, value: &str) -> Self {
        self.entries
            .push((property.to_string(), StyleValue::Literal(value.to_string())));
        self
    }

    pub fn set_conditional(mut self, property: &str, pairs: &[(&str, &str)]) -> Self {
        self.entries.push((
            property.to_string(),
            StyleValue::Conditional(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        ));
        self
    }

    pub fn entries(&self) -> &[(String, StyleValue)] {
        &self.entries
    }

    /// Parse a JSON document: string/number values are literals, nested
    /// objects are conditional maps, and `@name` keys with string values
    /// declare local aliases. Object order is preserved and carries
    /// priority.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(source)
            .map_err(|e| StyleError::invalid_input(e.to_string()))?;
        let object = document
            .as_object()
            .ok_or_else(|| StyleError::invalid_input("style map must be a JSON object"))?;

        let mut map = StyleMap::new();
        for (key, value) in object {
            match value {
                serde_json::Value::String(s) => {
                    map.entries
                        .push((key.clone(), StyleValue::Literal(s.clone())));
                }
                serde_json::Value::Number(n) => {
                    map.entries
                        .push((key.clone(), StyleValue::Literal(n.to_string())));
                }
                serde_json::Value::Object(nested) => {
                    let mut pairs = Vec::with_capacity(nested.len());
                    for (expr, nested_value) in nested {
                        let text = match nested_value {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Number(n) => n.to_string(),
                            other => {
                                return Err(StyleError::invalid_input(format!(
                                    "unsupported value for '{}' under '{}': {}",
                                    expr, key, other
                                )))
                            }
                        };
                        pairs.push((expr.clone(), text));
                    }
                    map.entries
                        .push((key.clone(), StyleValue::Conditional(pairs)));
                }
                other => {
                    return Err(StyleError::invalid_input(format!(
                        "unsupported value for '{}': {}",
                        key, other
                    )))
                }
            }
        }
        Ok(map)
    }
}

/// Compilation statistics, in the spirit of a compiler's phase report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompilationStats {
    pub property_count: usize,
    pub entry_count: usize,
    /// Entries whose exclusive condition simplified to `false`.
    pub dropped_entry_count: usize,
    pub computed_rule_count: usize,
    /// Final rule count after merging byte-identical declarations.
    pub rule_count: usize,
    pub parse_cache_hits: u64,
    pub simplify_cache_hits: u64,
    pub compile_time_ms: u64,
}

pub struct StyleCompiler {
    config: StyleConfig,
    handlers: Vec<StyleHandler>,
    formatter: ValueFormatter,
    parse_cache: RefCell<LruCache<String, Condition>>,
    simplify_cache: RefCell<LruCache<String, Condition>>,
    materialize_cache: RefCell<LruCache<String, RenderedCondition>>,
}

impl StyleCompiler {
    pub fn new(config: StyleConfig) -> Self {
        Self {
            config,
            handlers: Vec::new(),
            formatter: Rc::new(|_, value: &str| value.to_string()),
            parse_cache: RefCell::new(LruCache::new(PARSE_CACHE_CAPACITY)),
            simplify_cache: RefCell::new(LruCache::new(SIMPLIFY_CACHE_CAPACITY)),
            materialize_cache: RefCell::new(LruCache::new(MATERIALIZE_CACHE_CAPACITY)),
        }
    }

    /// Register a computation handler. Handlers claim the properties in
    /// their lookup set; earlier registrations win on overlap.
    pub fn with_handler(mut self, handler: StyleHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Replace the raw-value formatter collaborator (default: pass the
    /// value text through unchanged).
    pub fn with_value_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str) -> String + 'static,
    {
        self.formatter = Rc::new(formatter);
        self
    }

    pub fn compile(&self, map: &StyleMap) -> Result<Vec<CssRule>> {
        self.compile_scoped(map, false).map(|(rules, _)| rules)
    }

    pub fn compile_with_stats(&self, map: &StyleMap) -> Result<(Vec<CssRule>, CompilationStats)> {
        self.compile_scoped(map, false)
    }

    /// Compile with an explicit scope flag; sub-element scopes accept
    /// `@own(...)` atoms.
    pub fn compile_scoped(
        &self,
        map: &StyleMap,
        sub_element_scope: bool,
    ) -> Result<(Vec<CssRule>, CompilationStats)> {
        let start = Instant::now();
        let mut stats = CompilationStats::default();

        let local_aliases = alias::register(map.entries().iter().filter_map(|(key, value)| {
            match value {
                StyleValue::Literal(text) if key.starts_with('@') => {
                    Some((key.as_str(), text.as_str()))
                }
                _ => None,
            }
        }));

        let mut ctx = StateParserContext::new(self.config.clone()).with_local_aliases(local_aliases);
        if sub_element_scope {
            ctx = ctx.sub_element_scope();
        }

        // Per property: exclusive entries in declaration order.
        let mut entries_by_property: Vec<(String, Vec<ExclusiveStyleEntry>)> = Vec::new();
        for (property, value) in map.entries() {
            if property.starts_with('@') {
                continue;
            }
            let pairs: Vec<(String, String)> = match value {
                StyleValue::Literal(text) => vec![(String::new(), text.clone())],
                StyleValue::Conditional(pairs) => pairs.clone(),
            };
            stats.entry_count += pairs.len();
            let exclusive = build_exclusive(
                &pairs,
                |expr| self.cached_parse(expr, &ctx),
                |condition| self.cached_simplify(condition),
            );
            stats.dropped_entry_count += pairs.len().saturating_sub(exclusive.len());
            stats.property_count += 1;
            if !exclusive.is_empty() {
                entries_by_property.push((property.clone(), exclusive));
            }
        }

        // Route each property to the first registered handler that claims
        // it, or to a default pass-through handler. Emission follows
        // style-map property order.
        let mut rules: Vec<CssRule> = Vec::new();
        let mut claimed: Vec<String> = Vec::new();
        for (property, _) in &entries_by_property {
            if claimed.contains(property) {
                continue;
            }
            let (computed, default_restate_id) =
                match self.handlers.iter().find(|h| h.covers(property)) {
                    Some(handler) => {
                        claimed.extend(handler.lookup.iter().cloned());
                        let computed =
                            compute_handler_rules(handler, &entries_by_property, &mut |condition| {
                                self.cached_simplify(condition)
                            });
                        (computed, None)
                    }
                    None => {
                        let handler = StyleHandler::pass_through(property, self.formatter.clone());
                        let computed =
                            compute_handler_rules(&handler, &entries_by_property, &mut |condition| {
                                self.cached_simplify(condition)
                            });
                        (computed, self.default_restate_id(property, &entries_by_property))
                    }
                };
            stats.computed_rule_count += computed.len();

            for rule in computed {
                let restated_default =
                    default_restate_id.as_deref() == Some(rule.condition.id().as_str());
                let rendered = self.cached_materialize(&rule.condition)?;
                let declarations = declarations_text(&rule.declarations);
                for variant in &rendered.variants {
                    // The base value needs no selector-guarded restatement:
                    // the base declarations carry it and conditional rules
                    // override by cascade. Only at-rule-scoped variants of
                    // the default entry survive.
                    if restated_default && variant.at_rules.is_empty() {
                        continue;
                    }
                    rules.push(CssRule {
                        selector_suffix: variant.selector_suffix.clone(),
                        declarations: declarations.clone(),
                        at_rules: variant.at_rules.clone(),
                        root_prefix: variant.root_prefix.clone(),
                    });
                }
            }
        }

        let merged = merge_rules(rules);
        stats.rule_count = merged.len();
        stats.parse_cache_hits = self.parse_cache.borrow().stats().0;
        stats.simplify_cache_hits = self.simplify_cache.borrow().stats().0;
        stats.compile_time_ms = start.elapsed().as_millis() as u64;
        log::debug!(
            "compiled {} properties into {} rules ({} entries dropped as unreachable)",
            stats.property_count,
            stats.rule_count,
            stats.dropped_entry_count
        );
        Ok((merged, stats))
    }

    /// Structural id of the default (`''`) entry's exclusive condition for
    /// one pass-through property, when that condition merely restates the
    /// base value behind negations of the conditional entries. `None` for
    /// an unconditional default (no overrides to guard against).
    fn default_restate_id(
        &self,
        property: &str,
        entries_by_property: &[(String, Vec<ExclusiveStyleEntry>)],
    ) -> Option<String> {
        entries_by_property
            .iter()
            .find(|(name, _)| name == property)
            .and_then(|(_, entries)| entries.iter().find(|entry| entry.state_key.is_empty()))
            .map(|entry| &entry.exclusive_condition)
            .filter(|condition| !condition.is_true())
            .map(|condition| condition.id())
    }

    fn cached_parse(&self, expression: &str, ctx: &StateParserContext) -> Condition {
        let key = format!("{}\u{1f}{}", ctx.fingerprint(), expression);
        if let Some(hit) = self.parse_cache.borrow_mut().get(&key) {
            return hit.clone();
        }
        let parsed = parse(expression, ctx);
        self.parse_cache.borrow_mut().insert(key, parsed.clone());
        parsed
    }

    fn cached_simplify(&self, condition: &Condition) -> Condition {
        let key = condition.id();
        if let Some(hit) = self.simplify_cache.borrow_mut().get(&key) {
            return hit.clone();
        }
        let simplified = simplify(condition);
        self.simplify_cache
            .borrow_mut()
            .insert(key, simplified.clone());
        simplified
    }

    fn cached_materialize(&self, condition: &Condition) -> Result<RenderedCondition> {
        let key = condition.id();
        if let Some(hit) = self.materialize_cache.borrow_mut().get(&key) {
            return Ok(hit.clone());
        }
        let rendered = condition_to_css(condition)?;
        self.materialize_cache
            .borrow_mut()
            .insert(key, rendered.clone());
        Ok(rendered)
    }
}
