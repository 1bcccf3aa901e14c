//! Condition AST
//!
//! The intermediate representation of the compiler: a boolean expression
//! over runtime state atoms (modifiers, pseudo-classes, media/container
//! queries, root flags). Nodes are pure values; the smart constructors
//! perform local simplification at construction time so a `Compound`
//! never directly contains a same-operator compound, a `True`/`False`
//! leaf, or a structural duplicate. Negation applies De Morgan's law and
//! flips dimension bounds immediately, so dimension atoms are never
//! stored negated.

use crate::bounds::DimensionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    And,
    Or,
}

/// The media types the condition language accepts. `all` never renders
/// into a complement set; it matches every medium.
pub const MEDIA_TYPES: &[&str] = &["all", "screen", "print", "speech"];

#[derive(Debug, Clone, PartialEq)]
pub enum MediaQuery {
    /// `@media:print` - media-type-only query.
    Type { name: String },
    /// `@media(w <= 920px)` - dimensional comparison.
    Range(DimensionRange),
    /// `@media(orientation: landscape)` or a raw feature string.
    Feature { name: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerQuery {
    /// `@(w < 400px)` - dimensional comparison against the container.
    Range(DimensionRange),
    /// `@($variant=primary)` - container style query.
    Style { property: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateKind {
    /// Plain modifier attribute: `hovered`, `theme=danger`, `.class`,
    /// `[attr]`.
    Modifier { name: String, value: Option<String> },
    /// `:hover` and friends, stored without the leading colon.
    Pseudo { name: String },
    Media(MediaQuery),
    Container {
        name: Option<String>,
        query: ContainerQuery,
    },
    /// Root-scoped flag or attribute.
    Root { name: String, value: Option<String> },
    /// Modifier on the sub-element itself rather than the host.
    Own { name: String, value: Option<String> },
    /// `@starting` - starting-style block.
    Starting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateAtom {
    pub kind: StateKind,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    State(StateAtom),
    Compound {
        op: BoolOp,
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn state(kind: StateKind) -> Self {
        Self::State(StateAtom {
            kind,
            negated: false,
        })
    }

    /// Conjunction with local simplification: flattens nested ANDs, drops
    /// `true` operands, short-circuits on `false`, deduplicates
    /// structurally identical operands, and unwraps singletons.
    pub fn and(children: Vec<Condition>) -> Self {
        Self::compound(BoolOp::And, children)
    }

    /// Disjunction, dual of [`Condition::and`].
    pub fn or(children: Vec<Condition>) -> Self {
        Self::compound(BoolOp::Or, children)
    }

    fn compound(op: BoolOp, children: Vec<Condition>) -> Self {
        let (unit, absorbing) = match op {
            BoolOp::And => (Condition::True, Condition::False),
            BoolOp::Or => (Condition::False, Condition::True),
        };

        let mut flat: Vec<Condition> = Vec::with_capacity(children.len());
        let mut seen_keys: Vec<String> = Vec::with_capacity(children.len());
        let mut queue: std::collections::VecDeque<Condition> = children.into();

        while let Some(child) = queue.pop_front() {
            if child == unit {
                continue;
            }
            if child == absorbing {
                return absorbing;
            }
            match child {
                Condition::Compound {
                    op: child_op,
                    children: inner,
                } if child_op == op => {
                    for (i, grandchild) in inner.into_iter().enumerate() {
                        queue.insert(i, grandchild);
                    }
                }
                other => {
                    let key = other.canonical_key();
                    if !seen_keys.contains(&key) {
                        seen_keys.push(key);
                        flat.push(other);
                    }
                }
            }
        }

        match flat.len() {
            0 => unit,
            1 => flat.into_iter().next().unwrap(),
            _ => Condition::Compound { op, children: flat },
        }
    }

    /// Negation. De Morgan's law is applied here, at construction, not as
    /// a separate simplifier pass. Negating a dimension atom flips its
    /// bounds instead of storing a negated flag; a double-bounded range
    /// negates to the OR of the two flipped rays.
    pub fn not(self) -> Self {
        match self {
            Condition::True => Condition::False,
            Condition::False => Condition::True,
            Condition::State(atom) => Self::negate_atom(atom),
            Condition::Compound { op, children } => {
                let negated = children.into_iter().map(Condition::not).collect();
                match op {
                    BoolOp::And => Condition::or(negated),
                    BoolOp::Or => Condition::and(negated),
                }
            }
        }
    }

    fn negate_atom(atom: StateAtom) -> Condition {
        match &atom.kind {
            StateKind::Media(MediaQuery::Range(range)) if !atom.negated => {
                Self::negated_range(range, |r| {
                    Condition::state(StateKind::Media(MediaQuery::Range(r)))
                })
            }
            StateKind::Container { name, query } => match query {
                ContainerQuery::Range(range) if !atom.negated => {
                    let container = name.clone();
                    Self::negated_range(range, move |r| {
                        Condition::state(StateKind::Container {
                            name: container.clone(),
                            query: ContainerQuery::Range(r),
                        })
                    })
                }
                _ => Condition::State(StateAtom {
                    kind: atom.kind.clone(),
                    negated: !atom.negated,
                }),
            },
            _ => Condition::State(StateAtom {
                kind: atom.kind,
                negated: !atom.negated,
            }),
        }
    }

    fn negated_range<F>(range: &DimensionRange, rebuild: F) -> Condition
    where
        F: Fn(DimensionRange) -> Condition,
    {
        let parts: Vec<Condition> = range.complement().into_iter().map(rebuild).collect();
        match parts.len() {
            // An unbounded range cannot come out of the parser.
            0 => Condition::False,
            1 => parts.into_iter().next().unwrap(),
            _ => Condition::or(parts),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Condition::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Condition::False)
    }

    /// Deterministic textual form. Two structurally equal trees (up to
    /// operand order inside a compound) produce the same key.
    pub fn canonical_key(&self) -> String {
        match self {
            Condition::True => "1".to_string(),
            Condition::False => "0".to_string(),
            Condition::State(atom) => atom.canonical_key(),
            Condition::Compound { op, children } => {
                let mut keys: Vec<String> =
                    children.iter().map(|c| c.canonical_key()).collect();
                keys.sort();
                let symbol = match op {
                    BoolOp::And => "&",
                    BoolOp::Or => "|",
                };
                format!("{}({})", symbol, keys.join(","))
            }
        }
    }

    /// Unique structural id: md5 of the canonical key. Used for
    /// deduplication and cache keying.
    pub fn id(&self) -> String {
        hex::encode(md5::compute(self.canonical_key()).0)
    }

    /// Whether `other` is the exact negation of `self`. Covers flipped
    /// dimension bounds and De Morgan'd compounds, since both sides
    /// normalize through the constructors.
    pub fn complements(&self, other: &Condition) -> bool {
        self.clone().not().canonical_key() == other.canonical_key()
    }
}

impl StateAtom {
    pub fn canonical_key(&self) -> String {
        let body = match &self.kind {
            StateKind::Modifier { name, value } => match value {
                Some(v) => format!("mod:{}={}", name, v),
                None => format!("mod:{}", name),
            },
            StateKind::Pseudo { name } => format!("pseudo:{}", name),
            StateKind::Media(MediaQuery::Type { name }) => format!("media-type:{}", name),
            StateKind::Media(MediaQuery::Range(range)) => {
                format!("media:{}", range.canonical_key())
            }
            StateKind::Media(MediaQuery::Feature { name, value }) => match value {
                Some(v) => format!("media-feat:{}={}", name, v),
                None => format!("media-feat:{}", name),
            },
            StateKind::Container { name, query } => {
                let scope = name.as_deref().unwrap_or("");
                match query {
                    ContainerQuery::Range(range) => {
                        format!("container({}):{}", scope, range.canonical_key())
                    }
                    ContainerQuery::Style { property, value } => match value {
                        Some(v) => format!("container({}):${}={}", scope, property, v),
                        None => format!("container({}):${}", scope, property),
                    },
                }
            }
            StateKind::Root { name, value } => match value {
                Some(v) => format!("root:{}={}", name, v),
                None => format!("root:{}", name),
            },
            StateKind::Own { name, value } => match value {
                Some(v) => format!("own:{}={}", name, v),
                None => format!("own:{}", name),
            },
            StateKind::Starting => "starting".to_string(),
        };
        if self.negated {
            format!("!{}", body)
        } else {
            body
        }
    }
}

/// Shorthand for a plain positive modifier atom, used widely in tests.
pub fn modifier(name: &str) -> Condition {
    Condition::state(StateKind::Modifier {
        name: name.to_string(),
        value: None,
    })
}
