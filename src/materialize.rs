//! Materializer
//!
//! Converts a (possibly compound) condition tree into concrete output
//! form: selector-suffix fragments, ordered wrapping at-rules, and an
//! optional root-level prefix. Because a single output rule cannot
//! express an OR across heterogeneous condition types (a media atom mixed
//! with a root atom, say), the tree is first expanded into disjunctive
//! normal form and each conjunction becomes one variant.
//!
//! `false` or an empty compound reaching this stage indicates a bug in
//! condition construction and fails fast rather than silently producing
//! wrong CSS.

use crate::condition::{
    BoolOp, Condition, ContainerQuery, MediaQuery, StateAtom, StateKind, MEDIA_TYPES,
};
use crate::error::{Result, StyleError};

/// One DNF disjunct, rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVariant {
    pub selector_suffix: String,
    /// Outer to inner: container queries, then media, then
    /// `@starting-style`.
    pub at_rules: Vec<String>,
    pub root_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCondition {
    pub variants: Vec<RenderedVariant>,
}

pub fn condition_to_css(condition: &Condition) -> Result<RenderedCondition> {
    let conjunctions = to_dnf(condition)?;
    let variants = conjunctions
        .iter()
        .map(|atoms| render_conjunction(atoms))
        .collect();
    Ok(RenderedCondition { variants })
}

/// Expand to an OR of ANDs of atoms. Constructor invariants guarantee no
/// nested same-operator compounds and no constant leaves inside
/// compounds.
fn to_dnf(condition: &Condition) -> Result<Vec<Vec<StateAtom>>> {
    match condition {
        Condition::True => Ok(vec![Vec::new()]),
        Condition::False => Err(StyleError::invariant(
            "materialize",
            "unsatisfiable condition reached materialization",
        )),
        Condition::State(atom) => Ok(vec![vec![atom.clone()]]),
        Condition::Compound { op, children } => {
            if children.len() < 2 {
                return Err(StyleError::invariant(
                    "materialize",
                    format!("compound node with {} children", children.len()),
                ));
            }
            match op {
                BoolOp::Or => {
                    let mut disjuncts = Vec::new();
                    for child in children {
                        disjuncts.extend(to_dnf(child)?);
                    }
                    Ok(disjuncts)
                }
                BoolOp::And => {
                    let mut product: Vec<Vec<StateAtom>> = vec![Vec::new()];
                    for child in children {
                        let child_disjuncts = to_dnf(child)?;
                        let mut next = Vec::with_capacity(product.len() * child_disjuncts.len());
                        for base in &product {
                            for extension in &child_disjuncts {
                                let mut conjunction = base.clone();
                                for atom in extension {
                                    let key = atom.canonical_key();
                                    if !conjunction.iter().any(|a| a.canonical_key() == key) {
                                        conjunction.push(atom.clone());
                                    }
                                }
                                next.push(conjunction);
                            }
                        }
                        product = next;
                    }
                    Ok(product)
                }
            }
        }
    }
}

fn render_conjunction(atoms: &[StateAtom]) -> RenderedVariant {
    // (rank, negated, inner text) triples so fragments order
    // deterministically: attribute modifiers, then own-element matchers,
    // then pseudo-classes, with `:not()` forms after their positive
    // peers.
    let mut selector_parts: Vec<(u8, bool, String)> = Vec::new();
    let mut positive_types: Vec<String> = Vec::new();
    let mut negated_types: Vec<String> = Vec::new();
    let mut media_features: Vec<(u8, String)> = Vec::new();
    let mut container_groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut root_parts: Vec<String> = Vec::new();
    let mut starting = false;

    for atom in atoms {
        match &atom.kind {
            StateKind::Modifier { name, value } => {
                selector_parts.push((0, atom.negated, attribute_fragment(name, value)));
            }
            StateKind::Own { name, value } => {
                selector_parts.push((1, atom.negated, attribute_fragment(name, value)));
            }
            StateKind::Pseudo { name } => {
                selector_parts.push((2, atom.negated, format!(":{}", name)));
            }
            StateKind::Media(MediaQuery::Type { name }) => {
                if atom.negated {
                    negated_types.push(name.clone());
                } else {
                    positive_types.push(name.clone());
                }
            }
            StateKind::Media(query) => {
                media_features.push(media_feature_part(query, atom.negated));
            }
            StateKind::Container { name, query } => {
                let scope = name.clone().unwrap_or_default();
                let part = container_part(query, atom.negated);
                match container_groups.iter_mut().find(|(n, _)| *n == scope) {
                    Some((_, parts)) => parts.push(part),
                    None => container_groups.push((scope, vec![part])),
                }
            }
            StateKind::Root { name, value } => {
                root_parts.push(wrap_not(attribute_fragment(name, value), atom.negated));
            }
            // A negated starting atom needs no wrapper: rules outside
            // `@starting-style` already describe the settled state.
            StateKind::Starting => {
                if !atom.negated {
                    starting = true;
                }
            }
        }
    }

    selector_parts.sort();
    positive_types.sort();
    negated_types.sort();
    media_features.sort();
    container_groups.sort_by(|(a, _), (b, _)| a.cmp(b));
    root_parts.sort();

    let mut at_rules = Vec::new();
    for (scope, mut parts) in container_groups {
        parts.sort();
        let prelude = parts.join(" and ");
        at_rules.push(if scope.is_empty() {
            format!("@container {}", prelude)
        } else {
            format!("@container {} {}", scope, prelude)
        });
    }
    let features: Vec<String> = media_features.into_iter().map(|(_, text)| text).collect();
    if let Some(prelude) = media_prelude(&positive_types, &negated_types, &features) {
        at_rules.push(format!("@media {}", prelude));
    }
    if starting {
        // Always innermost, a flag-only wrapper.
        at_rules.push("@starting-style".to_string());
    }

    RenderedVariant {
        selector_suffix: selector_parts
            .into_iter()
            .map(|(_, negated, text)| wrap_not(text, negated))
            .collect::<Vec<_>>()
            .join(""),
        at_rules,
        root_prefix: if root_parts.is_empty() {
            None
        } else {
            Some(format!(":root{}", root_parts.join("")))
        },
    }
}

/// Attribute matcher for modifier-family atoms. `.class`, `[attr]`, and
/// `:pseudo` spellings pass through untouched; a bare name becomes the
/// presence attribute `[data-is-name]` and a valued one becomes
/// `[data-name="value"]`.
fn attribute_fragment(name: &str, value: &Option<String>) -> String {
    if name.starts_with('.') || name.starts_with('[') || name.starts_with(':') {
        return name.to_string();
    }
    match value {
        Some(v) => format!("[data-{}=\"{}\"]", name, v),
        None => format!("[data-is-{}]", name),
    }
}

fn wrap_not(fragment: String, negated: bool) -> String {
    if negated {
        format!(":not({})", fragment)
    } else {
        fragment
    }
}

/// Build the `@media` prelude. A negated media type standing alone keeps
/// CSS's own `not type` form. Combined with anything else it cannot:
/// `not` scopes over the whole query, so the negated type is rewritten
/// into a comma list over the remaining concrete types.
fn media_prelude(
    positive_types: &[String],
    negated_types: &[String],
    features: &[String],
) -> Option<String> {
    let feature_text = features.join(" and ");

    if let Some(media_type) = positive_types.first() {
        // A positive type makes a differently-named negated type redundant.
        return Some(if feature_text.is_empty() {
            media_type.clone()
        } else {
            format!("{} and {}", media_type, feature_text)
        });
    }

    if negated_types.is_empty() {
        if feature_text.is_empty() {
            return None;
        }
        return Some(feature_text);
    }

    if features.is_empty() && negated_types.len() == 1 {
        return Some(format!("not {}", negated_types[0]));
    }

    let complement: Vec<&str> = MEDIA_TYPES
        .iter()
        .copied()
        .filter(|t| *t != "all" && !negated_types.iter().any(|n| n == t))
        .collect();
    if complement.is_empty() {
        // Every concrete type negated: nothing matches.
        return Some("not all".to_string());
    }
    Some(
        complement
            .into_iter()
            .map(|media_type| {
                if feature_text.is_empty() {
                    media_type.to_string()
                } else {
                    format!("{} and {}", media_type, feature_text)
                }
            })
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Non-type media part with its ordering rank: dimensional ranges lead,
/// then other features.
fn media_feature_part(query: &MediaQuery, negated: bool) -> (u8, String) {
    match query {
        // Negated ranges are normalized away at construction.
        MediaQuery::Range(range) => (0, range.to_css_feature()),
        MediaQuery::Feature { name, value } => {
            let feature = match value {
                Some(v) => format!("({}: {})", name, v),
                None => format!("({})", name),
            };
            (
                1,
                if negated {
                    format!("(not {})", feature)
                } else {
                    feature
                },
            )
        }
        MediaQuery::Type { .. } => unreachable!("media types render in the prelude"),
    }
}

fn container_part(query: &ContainerQuery, negated: bool) -> String {
    let part = match query {
        ContainerQuery::Range(range) => range.to_css_feature(),
        ContainerQuery::Style { property, value } => match value {
            Some(v) => format!("style(--{}: {})", property, v),
            None => format!("style(--{})", property),
        },
    };
    if negated {
        format!("not {}", part)
    } else {
        part
    }
}
