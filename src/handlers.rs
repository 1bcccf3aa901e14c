//! Handler grouping and value computation
//!
//! A computation handler is a pure function that derives declaration text
//! from the current values of one or more related style properties. This
//! stage collects every exclusive entry whose property belongs to a
//! handler's lookup set, enumerates the distinct combinations of
//! conditions and values across those properties, and invokes the handler
//! once per surviving combination. Combinations whose condition
//! simplifies to `false` are unreachable; combinations where every
//! looked-up value is absent skip invocation entirely.

use crate::condition::Condition;
use crate::exclusivity::ExclusiveStyleEntry;
use std::collections::BTreeMap;
use std::rc::Rc;

/// `(values keyed by property) -> ordered declarations`, or `None` to
/// emit nothing for the combination.
pub type ComputeFn = Rc<dyn Fn(&BTreeMap<String, String>) -> Option<Vec<(String, String)>>>;

/// Collaborator seam for the external raw-value parser: turns one style
/// value into final CSS-compatible text.
pub type ValueFormatter = Rc<dyn Fn(&str, &str) -> String>;

pub struct StyleHandler {
    /// Properties this handler reads. Entries for any of them route here
    /// instead of the default pass-through handler.
    pub lookup: Vec<String>,
    compute: ComputeFn,
}

impl StyleHandler {
    pub fn new<F>(lookup: Vec<String>, compute: F) -> Self
    where
        F: Fn(&BTreeMap<String, String>) -> Option<Vec<(String, String)>> + 'static,
    {
        Self {
            lookup,
            compute: Rc::new(compute),
        }
    }

    /// Default handler for a property no custom handler claims: formats
    /// the value through the injected formatter and emits it under the
    /// property's own name.
    pub fn pass_through(property: &str, formatter: ValueFormatter) -> Self {
        let name = property.to_string();
        let emit_name = name.clone();
        Self::new(vec![name.clone()], move |values| {
            let value = values.get(&name)?;
            Some(vec![(emit_name.clone(), formatter(&emit_name, value))])
        })
    }

    pub fn covers(&self, property: &str) -> bool {
        self.lookup.iter().any(|p| p == property)
    }
}

/// One handler invocation's result, still carrying its condition.
#[derive(Debug, Clone)]
pub struct ComputedRule {
    pub condition: Condition,
    pub declarations: Vec<(String, String)>,
}

/// Enumerate condition/value combinations for one handler and invoke it
/// per combination.
pub fn compute_handler_rules(
    handler: &StyleHandler,
    entries_by_property: &[(String, Vec<ExclusiveStyleEntry>)],
    simplify: &mut dyn FnMut(&Condition) -> Condition,
) -> Vec<ComputedRule> {
    // Per lookup property: the alternatives a combination chooses from.
    // Present entries contribute their exclusive condition and value; the
    // "no entry matched" case contributes the negation of every entry
    // condition with no value, so combinations cover the whole state
    // space without overlap.
    let mut alternatives_per_property: Vec<(String, Vec<(Condition, Option<String>)>)> =
        Vec::with_capacity(handler.lookup.len());

    for property in &handler.lookup {
        let entries = entries_by_property
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[]);

        let mut alternatives: Vec<(Condition, Option<String>)> = entries
            .iter()
            .map(|entry| (entry.exclusive_condition.clone(), Some(entry.value.clone())))
            .collect();

        if entries.is_empty() {
            alternatives.push((Condition::True, None));
        } else {
            let unmatched = simplify(&Condition::and(
                entries
                    .iter()
                    .map(|entry| entry.condition.clone().not())
                    .collect(),
            ));
            if !unmatched.is_false() {
                alternatives.push((unmatched, None));
            }
        }
        alternatives_per_property.push((property.clone(), alternatives));
    }

    let mut combinations: Vec<(Condition, BTreeMap<String, String>)> =
        vec![(Condition::True, BTreeMap::new())];

    for (property, alternatives) in &alternatives_per_property {
        let mut next = Vec::with_capacity(combinations.len() * alternatives.len());
        for (condition, values) in &combinations {
            for (alt_condition, alt_value) in alternatives {
                let combined = simplify(&Condition::and(vec![
                    condition.clone(),
                    alt_condition.clone(),
                ]));
                if combined.is_false() {
                    continue;
                }
                let mut values = values.clone();
                if let Some(value) = alt_value {
                    values.insert(property.clone(), value.clone());
                }
                next.push((combined, values));
            }
        }
        combinations = next;
    }

    let mut rules = Vec::new();
    for (condition, values) in combinations {
        if values.is_empty() {
            // Only undefined values for this combination: no invocation.
            continue;
        }
        if let Some(declarations) = (handler.compute)(&values) {
            if !declarations.is_empty() {
                rules.push(ComputedRule {
                    condition,
                    declarations,
                });
            }
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;
    use crate::exclusivity::build_exclusive;
    use crate::parser::{parse, StateParserContext};
    use crate::simplify::simplify;

    fn exclusive(entries: &[(&str, &str)]) -> Vec<ExclusiveStyleEntry> {
        let ctx = StateParserContext::new(StyleConfig::default());
        let owned: Vec<(String, String)> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_exclusive(&owned, |expr| parse(expr, &ctx), simplify)
    }

    fn pass_through(property: &str) -> StyleHandler {
        StyleHandler::pass_through(property, Rc::new(|_, value: &str| value.to_string()))
    }

    #[test]
    fn test_pass_through_emits_one_rule_per_entry() {
        let entries = vec![(
            "padding".to_string(),
            exclusive(&[
                ("", "4x"),
                ("@media(w <= 1400px)", "2x"),
                ("@media(w <= 920px)", "1x"),
            ]),
        )];
        let rules =
            compute_handler_rules(&pass_through("padding"), &entries, &mut |c| simplify(c));
        assert_eq!(rules.len(), 3);
        let values: Vec<&str> = rules
            .iter()
            .map(|r| r.declarations[0].1.as_str())
            .collect();
        assert_eq!(values, vec!["4x", "2x", "1x"]);
    }

    #[test]
    fn test_absent_combination_skips_invocation() {
        // No default entry: the "unmatched" combination carries no value
        // and must not reach the handler.
        let entries = vec![(
            "display".to_string(),
            exclusive(&[("@media:print", "none")]),
        )];
        let rules =
            compute_handler_rules(&pass_through("display"), &entries, &mut |c| simplify(c));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations, vec![("display".to_string(), "none".to_string())]);
    }

    #[test]
    fn test_multi_property_handler_sees_combined_values() {
        let handler = StyleHandler::new(
            vec!["border-width".to_string(), "border-color".to_string()],
            |values| {
                let width = values.get("border-width")?;
                let color = values
                    .get("border-color")
                    .map(String::as_str)
                    .unwrap_or("currentColor");
                Some(vec![(
                    "border".to_string(),
                    format!("{} solid {}", width, color),
                )])
            },
        );
        let entries = vec![
            ("border-width".to_string(), exclusive(&[("", "1px")])),
            (
                "border-color".to_string(),
                exclusive(&[("", "gray"), ("hovered", "blue")]),
            ),
        ];
        let rules = compute_handler_rules(&handler, &entries, &mut |c| simplify(c));
        assert_eq!(rules.len(), 2);
        let declarations: Vec<&str> = rules
            .iter()
            .map(|r| r.declarations[0].1.as_str())
            .collect();
        assert!(declarations.contains(&"1px solid gray"));
        assert!(declarations.contains(&"1px solid blue"));
    }

    #[test]
    fn test_handler_returning_none_emits_nothing() {
        let handler = StyleHandler::new(vec!["hide".to_string()], |_| None);
        let entries = vec![("hide".to_string(), exclusive(&[("", "yes")]))];
        let rules = compute_handler_rules(&handler, &entries, &mut |c| simplify(c));
        assert!(rules.is_empty());
    }

    #[test]
    fn test_unlisted_property_contributes_no_alternative_split() {
        // Handler looks up a property the style map never mentions: the
        // other property still drives the combinations.
        let handler = StyleHandler::new(
            vec!["gap".to_string(), "row-gap".to_string()],
            |values| {
                let gap = values.get("gap")?;
                Some(vec![("gap".to_string(), gap.clone())])
            },
        );
        let entries = vec![("gap".to_string(), exclusive(&[("", "8px")]))];
        let rules = compute_handler_rules(&handler, &entries, &mut |c| simplify(c));
        assert_eq!(rules.len(), 1);
        assert!(rules[0].condition.is_true());
    }
}
