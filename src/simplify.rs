//! Boolean-algebra simplifier
//!
//! Rewrites a condition tree to a fixed point (under a bounded budget):
//! constant folding, complementary-pair contradiction and tautology
//! detection, structural deduplication, absorption, numeric-range
//! intersection on same-dimension conditions, and equality-implication
//! reasoning for attribute-like atoms (`p=A & p=B` is false for A != B,
//! and a positive equality drops a contradicting negated equality from
//! the output rather than leaving it to clutter generated selectors).
//!
//! `simplify` is pure and idempotent; the compiler memoizes it by the
//! node's structural id.

use crate::bounds::{Bound, DimensionRange};
use crate::condition::{BoolOp, Condition, ContainerQuery, MediaQuery, StateAtom, StateKind};

/// Rewrite passes stop after this many fixed-point iterations. Real
/// condition trees converge in two or three.
const REWRITE_BUDGET: usize = 8;

pub fn simplify(condition: &Condition) -> Condition {
    let mut current = condition.clone();
    for _ in 0..REWRITE_BUDGET {
        let next = rewrite(&current);
        if next.canonical_key() == current.canonical_key() {
            return next;
        }
        current = next;
    }
    current
}

fn rewrite(condition: &Condition) -> Condition {
    match condition {
        Condition::True | Condition::False => condition.clone(),
        Condition::State(atom) => rewrite_atom(atom),
        Condition::Compound { op, children } => {
            let simplified: Vec<Condition> = children.iter().map(simplify).collect();
            match op {
                BoolOp::And => rewrite_and(simplified),
                BoolOp::Or => rewrite_or(simplified),
            }
        }
    }
}

fn rewrite_atom(atom: &StateAtom) -> Condition {
    if let Some((_, range)) = range_parts(atom) {
        if range.is_impossible() {
            return Condition::False;
        }
    }
    Condition::State(atom.clone())
}

fn rewrite_and(children: Vec<Condition>) -> Condition {
    // Contradiction: some operand implies the negation of another. This
    // covers complementary pairs, conflicting equality values, and
    // `p=v & !p`.
    for (i, x) in children.iter().enumerate() {
        for (j, y) in children.iter().enumerate() {
            if i != j && implies(x, &y.clone().not()) {
                return Condition::False;
            }
        }
    }

    let children = merge_ranges(children);
    if children.iter().any(Condition::is_false) {
        return Condition::False;
    }

    // Redundancy: drop any operand implied by another (absorption,
    // `p=v & p`, subsumed negated equalities, wider ranges).
    let kept = drop_implied(children, |survivor, candidate| implies(survivor, candidate));
    Condition::and(kept)
}

fn rewrite_or(children: Vec<Condition>) -> Condition {
    // Tautology: `!x` implying `y` means `x | y` always holds. Covers
    // complementary pairs and complementary/overlapping ranges.
    for (i, x) in children.iter().enumerate() {
        for (j, y) in children.iter().enumerate() {
            if i != j && implies(&x.clone().not(), y) {
                return Condition::True;
            }
        }
    }

    // Redundancy: drop any operand that implies another (`A | (A & B)`
    // keeps `A`; the tighter of two ranges disappears).
    let kept = drop_implied(children, |survivor, candidate| implies(candidate, survivor));
    Condition::or(kept)
}

/// Keep each operand unless a different surviving operand makes it
/// redundant. The index guard keeps exactly one of a mutually-redundant
/// pair.
fn drop_implied<F>(children: Vec<Condition>, redundant: F) -> Vec<Condition>
where
    F: Fn(&Condition, &Condition) -> bool,
{
    let mut kept = Vec::with_capacity(children.len());
    for (j, candidate) in children.iter().enumerate() {
        let dominated = children.iter().enumerate().any(|(i, survivor)| {
            i != j
                && redundant(survivor, candidate)
                && (!redundant(candidate, survivor) || i < j)
        });
        if !dominated {
            kept.push(candidate.clone());
        }
    }
    kept
}

/// Logical implication `a -> b`, decided structurally. Sound but not
/// complete; the simplifier only needs the cases it can act on.
fn implies(a: &Condition, b: &Condition) -> bool {
    if a.canonical_key() == b.canonical_key() {
        return true;
    }
    match a {
        Condition::False => return true,
        Condition::Compound {
            op: BoolOp::And,
            children,
        } => {
            if children.iter().any(|child| implies(child, b)) {
                return true;
            }
        }
        Condition::Compound {
            op: BoolOp::Or,
            children,
        } => {
            return children.iter().all(|child| implies(child, b));
        }
        _ => {}
    }
    match b {
        Condition::True => true,
        Condition::Compound {
            op: BoolOp::Or,
            children,
        } => children.iter().any(|child| implies(a, child)),
        Condition::Compound {
            op: BoolOp::And,
            children,
        } => children.iter().all(|child| implies(a, child)),
        Condition::State(y) => match a {
            Condition::State(x) => atom_implies(x, y),
            _ => false,
        },
        _ => false,
    }
}

fn atom_implies(a: &StateAtom, b: &StateAtom) -> bool {
    if a.canonical_key() == b.canonical_key() {
        return true;
    }

    if let (Some((scope_a, range_a)), Some((scope_b, range_b))) = (range_parts(a), range_parts(b))
    {
        return scope_a == scope_b && range_subset(range_a, range_b);
    }

    let (Some(x), Some(y)) = (attr_parts(a), attr_parts(b)) else {
        return false;
    };
    if x.family != y.family || x.scope != y.scope || x.name != y.name {
        return false;
    }

    match (a.negated, b.negated) {
        // `p=v` implies bare `p`.
        (false, false) => x.value.is_some() && y.value.is_none(),
        // `p=v` implies `!(p=w)` for any other value.
        (false, true) => match (&x.value, &y.value) {
            (Some(v), Some(w)) => v != w,
            _ => false,
        },
        // `!p` implies `!(p=v)`.
        (true, true) => x.value.is_none() && y.value.is_some(),
        (true, false) => false,
    }
}

/// Attribute-like view shared by modifiers, root flags, own-element
/// modifiers, media features, and container style queries. Their equality
/// values are mutually exclusive by convention (open-world: no declared
/// enumeration is validated).
struct AttrParts<'a> {
    family: &'static str,
    scope: &'a str,
    name: &'a str,
    value: &'a Option<String>,
}

fn attr_parts(atom: &StateAtom) -> Option<AttrParts<'_>> {
    match &atom.kind {
        StateKind::Modifier { name, value } => Some(AttrParts {
            family: "modifier",
            scope: "",
            name,
            value,
        }),
        StateKind::Root { name, value } => Some(AttrParts {
            family: "root",
            scope: "",
            name,
            value,
        }),
        StateKind::Own { name, value } => Some(AttrParts {
            family: "own",
            scope: "",
            name,
            value,
        }),
        StateKind::Media(MediaQuery::Feature { name, value }) => Some(AttrParts {
            family: "media-feature",
            scope: "",
            name,
            value,
        }),
        StateKind::Container {
            name,
            query: ContainerQuery::Style { property, value },
        } => Some(AttrParts {
            family: "container-style",
            scope: name.as_deref().unwrap_or(""),
            name: property,
            value,
        }),
        _ => None,
    }
}

fn range_parts(atom: &StateAtom) -> Option<(String, &DimensionRange)> {
    if atom.negated {
        return None;
    }
    match &atom.kind {
        StateKind::Media(MediaQuery::Range(range)) => Some(("media".to_string(), range)),
        StateKind::Container {
            name,
            query: ContainerQuery::Range(range),
        } => Some((
            format!("container:{}", name.as_deref().unwrap_or("")),
            range,
        )),
        _ => None,
    }
}

/// Whether range `a` admits no value outside range `b`.
fn range_subset(a: &DimensionRange, b: &DimensionRange) -> bool {
    if a.dimension != b.dimension {
        return false;
    }
    let lower_ok = match (&a.lower, &b.lower) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(la), Some(lb)) => {
            la.numeric > lb.numeric
                || (la.numeric == lb.numeric && !(la.inclusive && !lb.inclusive))
        }
    };
    let upper_ok = match (&a.upper, &b.upper) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(ua), Some(ub)) => {
            ua.numeric < ub.numeric
                || (ua.numeric == ub.numeric && !(ua.inclusive && !ub.inclusive))
        }
    };
    lower_ok && upper_ok
}

/// Within one AND, intersect every group of dimension atoms that target
/// the same dimension in the same query scope. A group collapsing to an
/// impossible range turns into `False`; otherwise the group is replaced
/// by its single tightest atom.
fn merge_ranges(children: Vec<Condition>) -> Vec<Condition> {
    let mut result: Vec<Option<Condition>> = children.iter().cloned().map(Some).collect();

    for i in 0..children.len() {
        let Some(lead) = result[i].clone() else { continue };
        let Condition::State(lead_atom) = &lead else { continue };
        let Some((lead_scope, _)) = range_parts(lead_atom) else { continue };

        let mut merged = match range_parts(lead_atom) {
            Some((_, range)) => range.clone(),
            None => continue,
        };
        let mut absorbed_any = false;

        for slot in result.iter_mut().skip(i + 1) {
            let Some(Condition::State(atom)) = slot.as_ref() else { continue };
            let Some((scope, range)) = range_parts(atom) else { continue };
            if scope != lead_scope || range.dimension != merged.dimension {
                continue;
            }
            if let Some(intersection) = merged.intersect(range) {
                merged = intersection;
                absorbed_any = true;
                *slot = None;
            }
        }

        if absorbed_any {
            result[i] = Some(if merged.is_impossible() {
                Condition::False
            } else {
                rebuild_range_atom(lead_atom, merged)
            });
        }
    }

    result.into_iter().flatten().collect()
}

fn rebuild_range_atom(template: &StateAtom, range: DimensionRange) -> Condition {
    match &template.kind {
        StateKind::Media(MediaQuery::Range(_)) => {
            Condition::state(StateKind::Media(MediaQuery::Range(range)))
        }
        StateKind::Container { name, .. } => Condition::state(StateKind::Container {
            name: name.clone(),
            query: ContainerQuery::Range(range),
        }),
        // range_parts only yields the two cases above.
        other => unreachable!("non-range atom in range merge: {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::modifier;
    use crate::config::StyleConfig;
    use crate::parser::{parse, StateParserContext};

    fn ctx() -> StateParserContext {
        StateParserContext::new(StyleConfig::default())
    }

    fn simplify_expr(expression: &str) -> Condition {
        simplify(&parse(expression, &ctx()))
    }

    #[test]
    fn test_contradiction_collapses_to_false() {
        assert!(simplify_expr("hovered & !hovered").is_false());
    }

    #[test]
    fn test_tautology_collapses_to_true() {
        assert!(simplify_expr("hovered | !hovered").is_true());
    }

    #[test]
    fn test_absorption() {
        let a_and_a_or_b = simplify_expr("hovered & (hovered | pressed)");
        assert_eq!(
            a_and_a_or_b.canonical_key(),
            simplify(&modifier("hovered")).canonical_key()
        );

        let a_or_a_and_b = simplify_expr("hovered | (hovered & pressed)");
        assert_eq!(
            a_or_a_and_b.canonical_key(),
            simplify(&modifier("hovered")).canonical_key()
        );
    }

    #[test]
    fn test_impossible_range_is_false() {
        assert!(simplify_expr("@media(w < 400px) & @media(w > 800px)").is_false());
    }

    #[test]
    fn test_touching_bounds() {
        // Strict on one side leaves nothing at the boundary.
        assert!(simplify_expr("@media(w < 400px) & @media(w >= 400px)").is_false());
        // Both inclusive admits exactly the boundary value.
        assert!(!simplify_expr("@media(w <= 400px) & @media(w >= 400px)").is_false());
    }

    #[test]
    fn test_range_merge_produces_single_atom() {
        let merged = simplify_expr("@media(w > 920px) & @media(w <= 1400px)");
        match &merged {
            Condition::State(StateAtom {
                kind: StateKind::Media(MediaQuery::Range(range)),
                ..
            }) => {
                assert_eq!(range.lower.as_ref().unwrap().numeric, 920.0);
                assert_eq!(range.upper.as_ref().unwrap().numeric, 1400.0);
            }
            other => panic!("expected merged range atom, got {:?}", other),
        }
    }

    #[test]
    fn test_range_tautology_in_or() {
        assert!(simplify_expr("@media(w <= 920px) | @media(w > 920px)").is_true());
        // Overlapping coverage of the whole axis is a tautology too.
        assert!(simplify_expr("@media(w <= 920px) | @media(w > 800px)").is_true());
    }

    #[test]
    fn test_wider_range_absorbs_in_or() {
        let merged = simplify_expr("@media(w < 400px) | @media(w < 800px)");
        match &merged {
            Condition::State(StateAtom {
                kind: StateKind::Media(MediaQuery::Range(range)),
                ..
            }) => assert_eq!(range.upper.as_ref().unwrap().numeric, 800.0),
            other => panic!("expected single range atom, got {:?}", other),
        }
    }

    #[test]
    fn test_container_and_media_ranges_do_not_merge() {
        let c = simplify_expr("@media(w < 400px) & @(w < 400px)");
        match &c {
            Condition::Compound { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected compound, got {:?}", other),
        }
    }

    #[test]
    fn test_equality_conflict_is_false() {
        assert!(simplify_expr("theme=danger & theme=success").is_false());
    }

    #[test]
    fn test_equality_implies_bare_presence() {
        // `theme=danger` implies `theme`, so requiring `!theme` as well is
        // a contradiction.
        assert!(simplify_expr("theme=danger & !theme").is_false());
        // The redundant bare atom is dropped, not duplicated.
        let c = simplify_expr("theme=danger & theme");
        match &c {
            Condition::State(StateAtom {
                kind: StateKind::Modifier { name, value },
                ..
            }) => {
                assert_eq!(name, "theme");
                assert_eq!(value.as_deref(), Some("danger"));
            }
            other => panic!("expected single modifier, got {:?}", other),
        }
    }

    #[test]
    fn test_positive_equality_drops_negated_equality() {
        // `!theme=success` is provably true given `theme=danger`; it must
        // not survive into generated selectors.
        let c = simplify_expr("theme=danger & !theme=success");
        match &c {
            Condition::State(StateAtom {
                kind: StateKind::Modifier { name, value },
                negated,
            }) => {
                assert!(!negated);
                assert_eq!(name, "theme");
                assert_eq!(value.as_deref(), Some("danger"));
            }
            other => panic!("expected single modifier, got {:?}", other),
        }
    }

    #[test]
    fn test_media_feature_equality_conflict() {
        assert!(
            simplify_expr("@media(orientation: landscape) & @media(orientation: portrait)")
                .is_false()
        );
    }

    #[test]
    fn test_container_style_equality_conflict() {
        assert!(simplify_expr("@($variant=primary) & @($variant=ghost)").is_false());
    }

    #[test]
    fn test_constants_fold() {
        assert!(simplify(&Condition::and(vec![])).is_true());
        assert!(simplify(&Condition::or(vec![])).is_false());
    }

    #[test]
    fn test_idempotence() {
        let expressions = [
            "hovered & !hovered",
            "hovered | !hovered",
            "hovered & (hovered | pressed)",
            "@media(w > 920px) & @media(w <= 1400px)",
            "theme=danger & !theme=success",
            "(a | b) & (c | d) & !a",
            "@media(w <= 920px)",
        ];
        for expr in expressions {
            let once = simplify(&parse(expr, &ctx()));
            let twice = simplify(&once);
            assert_eq!(
                once.canonical_key(),
                twice.canonical_key(),
                "simplify not idempotent for '{}'",
                expr
            );
        }
    }

    #[test]
    fn test_nested_contradiction_through_de_morgan() {
        // !(hovered | pressed) & hovered  ->  !hovered & !pressed & hovered  ->  false
        assert!(simplify_expr("!(hovered | pressed) & hovered").is_false());
    }
}
