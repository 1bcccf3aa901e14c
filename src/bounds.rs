//! Numeric bounds for dimensional conditions
//!
//! Media and container queries compare a dimension (width, height,
//! inline-size, block-size) against numeric values. This module parses
//! those comparisons, expands custom scale units to their resolved
//! numeric calculation before the value is read, and implements the
//! range algebra the simplifier relies on: intersecting same-direction
//! bounds to the tightest one and detecting impossible ranges.

use crate::config::StyleConfig;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Width,
    Height,
    InlineSize,
    BlockSize,
}

impl Dimension {
    /// Accepts the full feature name or its shorthand letter form.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "w" | "width" => Some(Self::Width),
            "h" | "height" => Some(Self::Height),
            "is" | "inline-size" => Some(Self::InlineSize),
            "bs" | "block-size" => Some(Self::BlockSize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::InlineSize => "inline-size",
            Self::BlockSize => "block-size",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge of a dimensional range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// CSS-ready value text, e.g. `400px`.
    pub text: String,
    /// Parsed magnitude used for range reasoning.
    pub numeric: f64,
    /// Whether equality satisfies the bound.
    pub inclusive: bool,
}

/// A dimension condition carries at most one lower and one upper bound;
/// simplification merges multiple same-direction bounds into the tightest.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRange {
    pub dimension: Dimension,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl DimensionRange {
    pub fn below(dimension: Dimension, upper: Bound) -> Self {
        Self {
            dimension,
            lower: None,
            upper: Some(upper),
        }
    }

    pub fn above(dimension: Dimension, lower: Bound) -> Self {
        Self {
            dimension,
            lower: Some(lower),
            upper: None,
        }
    }

    /// `lower > upper`, or equal without both sides inclusive, admits no
    /// value at all.
    pub fn is_impossible(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => {
                lo.numeric > hi.numeric
                    || (lo.numeric == hi.numeric && !(lo.inclusive && hi.inclusive))
            }
            _ => false,
        }
    }

    /// Intersect two ranges on the same dimension, keeping the tighter
    /// bound in each direction. The result may be impossible; callers
    /// check `is_impossible`.
    pub fn intersect(&self, other: &DimensionRange) -> Option<DimensionRange> {
        if self.dimension != other.dimension {
            return None;
        }
        Some(DimensionRange {
            dimension: self.dimension,
            lower: tighter_lower(self.lower.as_ref(), other.lower.as_ref()),
            upper: tighter_upper(self.upper.as_ref(), other.upper.as_ref()),
        })
    }

    /// The ranges whose union is the complement of this one. A
    /// single-bounded range has a single-complement; a double-bounded
    /// range complements to two disjoint rays.
    pub fn complement(&self) -> Vec<DimensionRange> {
        let mut parts = Vec::new();
        if let Some(lo) = &self.lower {
            parts.push(DimensionRange::below(self.dimension, flip(lo)));
        }
        if let Some(hi) = &self.upper {
            parts.push(DimensionRange::above(self.dimension, flip(hi)));
        }
        parts
    }

    /// True when `self ∪ other` covers the whole axis with no overlap,
    /// i.e. the two are exact complements (used for OR-tautology
    /// detection).
    pub fn is_complement_of(&self, other: &DimensionRange) -> bool {
        if self.dimension != other.dimension {
            return false;
        }
        match (&self.lower, &self.upper, &other.lower, &other.upper) {
            (None, Some(hi), Some(lo), None) | (Some(lo), None, None, Some(hi)) => {
                hi.numeric == lo.numeric && (hi.inclusive != lo.inclusive)
            }
            _ => false,
        }
    }

    /// Stable textual form used in canonical condition keys.
    pub fn canonical_key(&self) -> String {
        let edge = |bound: &Option<Bound>| match bound {
            Some(b) => format!(
                "{}{}",
                b.text,
                if b.inclusive { "=" } else { "" }
            ),
            None => "*".to_string(),
        };
        format!(
            "{}[{}..{}]",
            self.dimension,
            edge(&self.lower),
            edge(&self.upper)
        )
    }

    /// CSS range-syntax feature text, e.g. `(920px < width <= 1400px)`.
    pub fn to_css_feature(&self) -> String {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => format!(
                "({} {} {} {} {})",
                lo.text,
                if lo.inclusive { "<=" } else { "<" },
                self.dimension,
                if hi.inclusive { "<=" } else { "<" },
                hi.text
            ),
            (Some(lo), None) => format!(
                "({} {} {})",
                self.dimension,
                if lo.inclusive { ">=" } else { ">" },
                lo.text
            ),
            (None, Some(hi)) => format!(
                "({} {} {})",
                self.dimension,
                if hi.inclusive { "<=" } else { "<" },
                hi.text
            ),
            // Constructors never produce an unbounded range.
            (None, None) => format!("({} >= 0)", self.dimension),
        }
    }
}

fn flip(bound: &Bound) -> Bound {
    Bound {
        text: bound.text.clone(),
        numeric: bound.numeric,
        inclusive: !bound.inclusive,
    }
}

fn tighter_lower(a: Option<&Bound>, b: Option<&Bound>) -> Option<Bound> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if x.numeric > y.numeric || (x.numeric == y.numeric && !x.inclusive) {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (None, None) => None,
    }
}

fn tighter_upper(a: Option<&Bound>, b: Option<&Bound>) -> Option<Bound> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if x.numeric < y.numeric || (x.numeric == y.numeric && !x.inclusive) {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (None, None) => None,
    }
}

fn single_comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(w|h|is|bs|width|height|inline-size|block-size)\s*(<=|>=|<|>)\s*(\S.*)$")
            .unwrap()
    })
}

fn double_comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\S+)\s*(<=|<)\s*(w|h|is|bs|width|height|inline-size|block-size)\s*(<=|<)\s*(\S+)$",
        )
        .unwrap()
    })
}

/// Parse the body of a media/container query as a dimension comparison.
/// Returns `None` when the body is not dimensional (callers fall back to
/// treating it as a raw feature string).
pub fn parse_comparison(body: &str, config: &StyleConfig) -> Option<DimensionRange> {
    let body = body.trim();

    if let Some(caps) = double_comparison_regex().captures(body) {
        let dimension = Dimension::from_token(&caps[3])?;
        let lower = parse_bound(&caps[1], &caps[2] == "<=", config)?;
        let upper = parse_bound(&caps[5], &caps[4] == "<=", config)?;
        return Some(DimensionRange {
            dimension,
            lower: Some(lower),
            upper: Some(upper),
        });
    }

    if let Some(caps) = single_comparison_regex().captures(body) {
        let dimension = Dimension::from_token(&caps[1])?;
        let op = caps[2].to_string();
        let bound = parse_bound(&caps[3], op.ends_with('='), config)?;
        return Some(match op.as_str() {
            "<" | "<=" => DimensionRange::below(dimension, bound),
            _ => DimensionRange::above(dimension, bound),
        });
    }

    None
}

fn value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]*\.?[0-9]+)\s*([a-zA-Z%]*)$").unwrap())
}

/// Parse a bound value, expanding a custom scale unit (e.g. `2x` with
/// `x = 8px`) into its resolved numeric calculation first.
pub fn parse_bound(value: &str, inclusive: bool, config: &StyleConfig) -> Option<Bound> {
    let caps = value_regex().captures(value.trim())?;
    let magnitude: f64 = caps[1].parse().ok()?;
    let unit = caps[2].to_string();

    if let Some(unit_def) = config.units.get(&unit) {
        let def_caps = value_regex().captures(unit_def.trim())?;
        let base_unit = def_caps[2].to_string();
        let resolved = meval::eval_str(format!("{} * {}", &caps[1], &def_caps[1])).ok()?;
        return Some(Bound {
            text: format!("{}{}", format_number(resolved), base_unit),
            numeric: resolved,
            inclusive,
        });
    }

    Some(Bound {
        text: format!("{}{}", format_number(magnitude), unit),
        numeric: magnitude,
        inclusive,
    })
}

/// Print a magnitude without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StyleConfig {
        let mut cfg = StyleConfig::default();
        cfg.units.insert("x".to_string(), "8px".to_string());
        cfg
    }

    #[test]
    fn test_single_comparison_shorthand() {
        let range = parse_comparison("w <= 1400px", &config()).unwrap();
        assert_eq!(range.dimension, Dimension::Width);
        assert!(range.lower.is_none());
        let hi = range.upper.unwrap();
        assert_eq!(hi.text, "1400px");
        assert_eq!(hi.numeric, 1400.0);
        assert!(hi.inclusive);
    }

    #[test]
    fn test_double_bounded_range() {
        let range = parse_comparison("400px <= h < 800px", &config()).unwrap();
        assert_eq!(range.dimension, Dimension::Height);
        assert!(range.lower.unwrap().inclusive);
        assert!(!range.upper.unwrap().inclusive);
    }

    #[test]
    fn test_custom_unit_expansion() {
        let range = parse_comparison("w < 100x", &config()).unwrap();
        let hi = range.upper.unwrap();
        assert_eq!(hi.numeric, 800.0);
        assert_eq!(hi.text, "800px");
    }

    #[test]
    fn test_non_dimensional_body_rejected() {
        assert!(parse_comparison("orientation: landscape", &config()).is_none());
        assert!(parse_comparison("hover", &config()).is_none());
    }

    #[test]
    fn test_intersect_keeps_tighter_bounds() {
        let a = parse_comparison("w <= 1400px", &config()).unwrap();
        let b = parse_comparison("w <= 920px", &config()).unwrap();
        let merged = a.intersect(&b).unwrap();
        assert_eq!(merged.upper.unwrap().numeric, 920.0);
    }

    #[test]
    fn test_impossible_range() {
        let a = parse_comparison("w < 400px", &config()).unwrap();
        let b = parse_comparison("w > 800px", &config()).unwrap();
        let merged = a.intersect(&b).unwrap();
        assert!(merged.is_impossible());
    }

    #[test]
    fn test_touching_exclusive_bounds_impossible() {
        let a = parse_comparison("w < 400px", &config()).unwrap();
        let b = parse_comparison("w >= 400px", &config()).unwrap();
        assert!(a.intersect(&b).unwrap().is_impossible());
        // Both inclusive at the same value admits exactly that value.
        let c = parse_comparison("w <= 400px", &config()).unwrap();
        let d = parse_comparison("w >= 400px", &config()).unwrap();
        assert!(!c.intersect(&d).unwrap().is_impossible());
    }

    #[test]
    fn test_complement_pair() {
        let a = parse_comparison("w <= 920px", &config()).unwrap();
        let complement = a.complement();
        assert_eq!(complement.len(), 1);
        assert!(a.is_complement_of(&complement[0]));
        assert!(complement[0].is_complement_of(&a));
    }

    #[test]
    fn test_css_feature_text() {
        let range = parse_comparison("920px < w <= 1400px", &config()).unwrap();
        assert_eq!(range.to_css_feature(), "(920px < width <= 1400px)");
        let below = parse_comparison("w <= 920px", &config()).unwrap();
        assert_eq!(below.to_css_feature(), "(width <= 920px)");
    }
}
