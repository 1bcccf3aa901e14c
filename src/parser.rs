//! Condition-key parser
//!
//! Parses a condition expression string into a [`Condition`] tree.
//! Operator precedence: `!` binds tightest, then `&`, then `|`;
//! parentheses group. Atoms cover the special prefixes (`@starting`,
//! `@media:`, `@media(...)`, `@root(...)`, `@own(...)`, `@(...)` container
//! queries), bare `@name` aliases, and plain modifier/pseudo tokens.
//!
//! Malformed input never returns an error: the offending token (or the
//! whole expression, for unbalanced parentheses) degrades to an opaque
//! modifier atom and a deduplicated diagnostic is emitted, so downstream
//! stages always receive a valid tree.

use crate::alias;
use crate::bounds;
use crate::condition::{Condition, ContainerQuery, MediaQuery, StateKind, MEDIA_TYPES};
use crate::config::StyleConfig;
use crate::diagnostics;
use std::collections::HashMap;

/// Parsing context for one style-map compilation. Immutable during the
/// compilation; threaded explicitly so nested compilations never share
/// ambient state.
#[derive(Debug, Clone)]
pub struct StateParserContext {
    pub local_aliases: HashMap<String, String>,
    pub config: StyleConfig,
    pub is_sub_element_scope: bool,
}

impl StateParserContext {
    pub fn new(mut config: StyleConfig) -> Self {
        // Global aliases arrive from user config; chained definitions are
        // rejected here, once, rather than on every lookup.
        config.aliases.retain(|name, value| {
            if alias::contains_alias_reference(value) {
                diagnostics::warn_once(
                    &format!("alias:chained:@{}", name),
                    format!(
                        "global alias '@{}' references another alias in '{}'; definition ignored",
                        name, value
                    ),
                );
                false
            } else {
                true
            }
        });
        Self {
            local_aliases: HashMap::new(),
            config,
            is_sub_element_scope: false,
        }
    }

    pub fn with_local_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.local_aliases = aliases;
        self
    }

    pub fn sub_element_scope(mut self) -> Self {
        self.is_sub_element_scope = true;
        self
    }

    /// Cache fingerprint: the same expression can resolve differently per
    /// call site when local aliases or the scope flag differ.
    pub fn fingerprint(&self) -> String {
        let mut pairs: Vec<String> = self
            .local_aliases
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        pairs.sort();
        format!(
            "{}|{}",
            if self.is_sub_element_scope { "sub" } else { "top" },
            pairs.join(";")
        )
    }
}

/// Parse a condition expression. The empty (or blank) expression is the
/// unconditional `true` condition.
pub fn parse(expression: &str, ctx: &StateParserContext) -> Condition {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Condition::True;
    }

    let tokens = match tokenize(trimmed) {
        Ok(tokens) => tokens,
        Err(reason) => return degrade(trimmed, &reason),
    };

    let mut stream = TokenStream { tokens, pos: 0 };
    match stream.parse_or(ctx) {
        Ok(condition) if stream.at_end() => condition,
        Ok(_) => degrade(trimmed, "trailing tokens after expression"),
        Err(reason) => degrade(trimmed, &reason),
    }
}

/// Fallback for malformed input: warn once and treat the whole text as an
/// opaque modifier atom.
fn degrade(text: &str, reason: &str) -> Condition {
    diagnostics::warn_once(
        &format!("parse:{}", text),
        format!("cannot parse condition '{}': {}; treating it as a plain modifier", text, reason),
    );
    opaque_modifier(text)
}

fn opaque_modifier(text: &str) -> Condition {
    Condition::state(StateKind::Modifier {
        name: text.to_string(),
        value: None,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Amp,
    Pipe,
    Bang,
    LParen,
    RParen,
    Atom(String),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        match ch {
            c if c.is_whitespace() => pos += 1,
            '&' => {
                tokens.push(Token::Amp);
                pos += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                pos += 1;
            }
            '!' => {
                tokens.push(Token::Bang);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '@' => {
                let atom = scan_at_atom(&chars, &mut pos)?;
                tokens.push(Token::Atom(atom));
            }
            _ => {
                let atom = scan_plain_atom(&chars, &mut pos)?;
                tokens.push(Token::Atom(atom));
            }
        }
    }

    Ok(tokens)
}

/// Scan an `@`-prefixed atom. The prefixed forms carry their own
/// parenthesized body (`@media(w < 400px)`), which must be consumed here
/// so `(` inside the body is not mistaken for grouping.
fn scan_at_atom(chars: &[char], pos: &mut usize) -> Result<String, String> {
    let start = *pos;
    *pos += 1; // '@'

    if *pos < chars.len() && chars[*pos] == '(' {
        consume_balanced_parens(chars, pos)?;
        return Ok(chars[start..*pos].iter().collect());
    }

    while *pos < chars.len()
        && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '-' || chars[*pos] == '_')
    {
        *pos += 1;
    }

    let name: String = chars[start..*pos].iter().collect();

    if *pos < chars.len() && chars[*pos] == ':' && name == "@media" {
        *pos += 1;
        while *pos < chars.len() && chars[*pos].is_ascii_alphanumeric() {
            *pos += 1;
        }
        return Ok(chars[start..*pos].iter().collect());
    }

    if *pos < chars.len() && chars[*pos] == '(' {
        consume_balanced_parens(chars, pos)?;
        return Ok(chars[start..*pos].iter().collect());
    }

    Ok(name)
}

fn consume_balanced_parens(chars: &[char], pos: &mut usize) -> Result<(), String> {
    let mut depth = 0;
    while *pos < chars.len() {
        match chars[*pos] {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    *pos += 1;
                    return Ok(());
                }
            }
            _ => {}
        }
        *pos += 1;
    }
    Err("unbalanced parentheses".to_string())
}

fn scan_plain_atom(chars: &[char], pos: &mut usize) -> Result<String, String> {
    let start = *pos;
    while *pos < chars.len() {
        match chars[*pos] {
            c if c.is_whitespace() => break,
            '&' | '|' | '!' | '(' | ')' => break,
            '[' => {
                // Attribute matchers keep their bracketed body intact.
                while *pos < chars.len() && chars[*pos] != ']' {
                    *pos += 1;
                }
                if *pos >= chars.len() {
                    return Err("unbalanced '['".to_string());
                }
                *pos += 1;
            }
            _ => *pos += 1,
        }
    }
    Ok(chars[start..*pos].iter().collect())
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self, ctx: &StateParserContext) -> Result<Condition, String> {
        let mut operands = vec![self.parse_and(ctx)?];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            operands.push(self.parse_and(ctx)?);
        }
        Ok(Condition::or(operands))
    }

    fn parse_and(&mut self, ctx: &StateParserContext) -> Result<Condition, String> {
        let mut operands = vec![self.parse_unary(ctx)?];
        while self.peek() == Some(&Token::Amp) {
            self.advance();
            operands.push(self.parse_unary(ctx)?);
        }
        Ok(Condition::and(operands))
    }

    fn parse_unary(&mut self, ctx: &StateParserContext) -> Result<Condition, String> {
        match self.advance() {
            Some(Token::Bang) => Ok(self.parse_unary(ctx)?.not()),
            Some(Token::LParen) => {
                let inner = self.parse_or(ctx)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(Token::Atom(text)) => Ok(parse_atom(&text, ctx)),
            Some(other) => Err(format!("unexpected token {:?}", other)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Recognize a single atom. Checked in declaration order; the first
/// matching form wins.
fn parse_atom(text: &str, ctx: &StateParserContext) -> Condition {
    if text == "@starting" {
        return Condition::state(StateKind::Starting);
    }

    if let Some(media_type) = text.strip_prefix("@media:") {
        if MEDIA_TYPES.contains(&media_type) {
            return Condition::state(StateKind::Media(MediaQuery::Type {
                name: media_type.to_string(),
            }));
        }
        return degrade(text, &format!("unknown media type '{}'", media_type));
    }

    if let Some(body) = strip_call(text, "@media") {
        return parse_media_body(text, body, ctx);
    }

    if let Some(body) = strip_call(text, "@root") {
        return parse_attribute_body(text, body, |name, value| {
            Condition::state(StateKind::Root { name, value })
        });
    }

    if let Some(body) = strip_call(text, "@own") {
        if !ctx.is_sub_element_scope {
            diagnostics::warn_once(
                &format!("parse:own:{}", text),
                format!("'{}' used outside a sub-element scope; treating it as a plain modifier", text),
            );
            return parse_attribute_body(text, body, |name, value| {
                Condition::state(StateKind::Modifier { name, value })
            });
        }
        return parse_attribute_body(text, body, |name, value| {
            Condition::state(StateKind::Own { name, value })
        });
    }

    if let Some(body) = strip_call(text, "@") {
        return parse_container_body(text, body, ctx);
    }

    if alias::is_alias_token(text) {
        return expand_alias(text, ctx);
    }

    parse_plain_atom(text)
}

/// `@media(body)` -> `body`, if `text` has exactly that call shape.
fn strip_call<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_media_body(full: &str, body: &str, ctx: &StateParserContext) -> Condition {
    let body = body.trim();
    if body.is_empty() {
        return degrade(full, "empty media condition");
    }

    if let Some(range) = bounds::parse_comparison(body, &ctx.config) {
        return Condition::state(StateKind::Media(MediaQuery::Range(range)));
    }

    // `feature: value` pair, or an opaque feature string.
    if let Some((name, value)) = body.split_once(':') {
        let name = name.trim();
        let value = value.trim();
        if !name.is_empty() && !value.is_empty() && !name.contains(char::is_whitespace) {
            return Condition::state(StateKind::Media(MediaQuery::Feature {
                name: name.to_string(),
                value: Some(value.to_string()),
            }));
        }
    }
    Condition::state(StateKind::Media(MediaQuery::Feature {
        name: body.to_string(),
        value: None,
    }))
}

fn parse_attribute_body<F>(full: &str, body: &str, build: F) -> Condition
where
    F: FnOnce(String, Option<String>) -> Condition,
{
    let body = body.trim();
    if body.is_empty() {
        return degrade(full, "empty condition body");
    }
    match body.split_once('=') {
        Some((name, value)) => build(
            name.trim().to_string(),
            Some(value.trim().trim_matches('"').to_string()),
        ),
        None => build(body.to_string(), None),
    }
}

fn parse_container_body(full: &str, body: &str, ctx: &StateParserContext) -> Condition {
    let body = body.trim();
    if body.is_empty() {
        return degrade(full, "empty container condition");
    }

    // `@(name, condition)` names the container; `@(condition)` targets the
    // nearest one.
    let (name, condition) = match body.split_once(',') {
        Some((name, rest)) => (Some(name.trim().to_string()), rest.trim()),
        None => (None, body),
    };

    if let Some(style) = condition.strip_prefix('$') {
        // `$prop[=value]` is a container *style* query.
        let (property, value) = match style.split_once('=') {
            Some((p, v)) => (
                p.trim().to_string(),
                Some(v.trim().trim_matches('"').to_string()),
            ),
            None => (style.trim().to_string(), None),
        };
        if property.is_empty() {
            return degrade(full, "empty container style property");
        }
        return Condition::state(StateKind::Container {
            name,
            query: ContainerQuery::Style { property, value },
        });
    }

    match bounds::parse_comparison(condition, &ctx.config) {
        Some(range) => Condition::state(StateKind::Container {
            name,
            query: ContainerQuery::Range(range),
        }),
        None => degrade(
            full,
            "container condition is neither a dimension comparison nor a '$' style query",
        ),
    }
}

fn expand_alias(token: &str, ctx: &StateParserContext) -> Condition {
    let bare = &token[1..];
    match alias::resolve(bare, &ctx.local_aliases, &ctx.config.aliases) {
        Some(definition) => {
            if alias::contains_alias_reference(definition) {
                return degrade(
                    token,
                    &format!("alias resolves to '{}' which references another alias", definition),
                );
            }
            // Depth-1 expansion: the definition is re-parsed, and the
            // chain check above guarantees it contains no further alias.
            parse(definition, ctx)
        }
        None => {
            diagnostics::warn_once(
                &format!("alias:unresolved:{}", token),
                format!("unknown alias '{}'; treating it as a plain modifier", token),
            );
            opaque_modifier(token)
        }
    }
}

fn parse_plain_atom(text: &str) -> Condition {
    if let Some(pseudo) = text.strip_prefix(':') {
        if !pseudo.is_empty() {
            return Condition::state(StateKind::Pseudo {
                name: pseudo.to_string(),
            });
        }
    }
    // `.class` and `[attr]` matchers pass through as modifier names; the
    // materializer recognizes their leading character.
    match text.split_once('=') {
        Some((name, value)) if !name.starts_with('[') => Condition::state(StateKind::Modifier {
            name: name.trim().to_string(),
            value: Some(value.trim().trim_matches('"').to_string()),
        }),
        _ => Condition::state(StateKind::Modifier {
            name: text.to_string(),
            value: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Dimension;
    use crate::condition::{BoolOp, StateAtom};

    fn ctx() -> StateParserContext {
        let mut config = StyleConfig::default();
        config.units.insert("x".to_string(), "8px".to_string());
        config
            .aliases
            .insert("mobile".to_string(), "@media(w < 768px)".to_string());
        StateParserContext::new(config)
    }

    fn atom(condition: &Condition) -> &StateAtom {
        match condition {
            Condition::State(atom) => atom,
            other => panic!("expected state atom, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_expression_is_true() {
        assert!(parse("", &ctx()).is_true());
        assert!(parse("   ", &ctx()).is_true());
    }

    #[test]
    fn test_plain_modifier_forms() {
        let c = parse("hovered", &ctx());
        match &atom(&c).kind {
            StateKind::Modifier { name, value } => {
                assert_eq!(name, "hovered");
                assert!(value.is_none());
            }
            other => panic!("unexpected atom {:?}", other),
        }

        let c = parse("theme=danger", &ctx());
        match &atom(&c).kind {
            StateKind::Modifier { name, value } => {
                assert_eq!(name, "theme");
                assert_eq!(value.as_deref(), Some("danger"));
            }
            other => panic!("unexpected atom {:?}", other),
        }

        let c = parse(":focus-visible", &ctx());
        match &atom(&c).kind {
            StateKind::Pseudo { name } => assert_eq!(name, "focus-visible"),
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        // a | b & c parses as a | (b & c)
        let c = parse("a | b & c", &ctx());
        match &c {
            Condition::Compound { op, children } => {
                assert_eq!(*op, BoolOp::Or);
                assert_eq!(children.len(), 2);
                assert!(matches!(
                    children[1],
                    Condition::Compound {
                        op: BoolOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected OR, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let c = parse("(a | b) & c", &ctx());
        match &c {
            Condition::Compound { op, children } => {
                assert_eq!(*op, BoolOp::And);
                assert!(matches!(
                    children[0],
                    Condition::Compound { op: BoolOp::Or, .. }
                ));
            }
            other => panic!("expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_negation_binds_tightest() {
        let c = parse("!hovered & pressed", &ctx());
        match &c {
            Condition::Compound { op, children } => {
                assert_eq!(*op, BoolOp::And);
                assert!(atom(&children[0]).negated);
                assert!(!atom(&children[1]).negated);
            }
            other => panic!("expected AND, got {:?}", other),
        }
    }

    #[test]
    fn test_media_type_atom() {
        let c = parse("@media:print", &ctx());
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Type { name }) => assert_eq!(name, "print"),
            other => panic!("unexpected atom {:?}", other),
        }
        // Unknown media type degrades to an opaque modifier.
        let c = parse("@media:holodeck", &ctx());
        assert!(matches!(&atom(&c).kind, StateKind::Modifier { name, .. } if name == "@media:holodeck"));
    }

    #[test]
    fn test_media_dimension_and_feature() {
        let c = parse("@media(w <= 1400px)", &ctx());
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Range(range)) => {
                assert_eq!(range.dimension, Dimension::Width);
                assert_eq!(range.upper.as_ref().unwrap().numeric, 1400.0);
            }
            other => panic!("unexpected atom {:?}", other),
        }

        let c = parse("@media(orientation: landscape)", &ctx());
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Feature { name, value }) => {
                assert_eq!(name, "orientation");
                assert_eq!(value.as_deref(), Some("landscape"));
            }
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_media_custom_unit() {
        let c = parse("@media(w < 100x)", &ctx());
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Range(range)) => {
                assert_eq!(range.upper.as_ref().unwrap().text, "800px");
            }
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_root_atom() {
        let c = parse("@root(theme=dark)", &ctx());
        match &atom(&c).kind {
            StateKind::Root { name, value } => {
                assert_eq!(name, "theme");
                assert_eq!(value.as_deref(), Some("dark"));
            }
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_own_requires_sub_element_scope() {
        let c = parse("@own(hovered)", &ctx().sub_element_scope());
        assert!(matches!(&atom(&c).kind, StateKind::Own { name, .. } if name == "hovered"));

        let c = parse("@own(hovered)", &ctx());
        assert!(matches!(&atom(&c).kind, StateKind::Modifier { name, .. } if name == "hovered"));
    }

    #[test]
    fn test_container_atoms() {
        let c = parse("@(w < 400px)", &ctx());
        match &atom(&c).kind {
            StateKind::Container { name, query } => {
                assert!(name.is_none());
                assert!(matches!(query, ContainerQuery::Range(_)));
            }
            other => panic!("unexpected atom {:?}", other),
        }

        let c = parse("@(sidebar, w >= 320px)", &ctx());
        match &atom(&c).kind {
            StateKind::Container { name, .. } => assert_eq!(name.as_deref(), Some("sidebar")),
            other => panic!("unexpected atom {:?}", other),
        }

        let c = parse("@($variant=primary)", &ctx());
        match &atom(&c).kind {
            StateKind::Container {
                query: ContainerQuery::Style { property, value },
                ..
            } => {
                assert_eq!(property, "variant");
                assert_eq!(value.as_deref(), Some("primary"));
            }
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_starting_atom() {
        let c = parse("@starting", &ctx());
        assert!(matches!(atom(&c).kind, StateKind::Starting));
    }

    #[test]
    fn test_alias_expansion_prefers_local() {
        let mut local = HashMap::new();
        local.insert("mobile".to_string(), "@media(w < 480px)".to_string());
        let scoped = ctx().with_local_aliases(local);

        let c = parse("@mobile", &scoped);
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Range(range)) => {
                assert_eq!(range.upper.as_ref().unwrap().numeric, 480.0);
            }
            other => panic!("unexpected atom {:?}", other),
        }

        // Without the local definition, the global 768px one applies.
        let c = parse("@mobile", &ctx());
        match &atom(&c).kind {
            StateKind::Media(MediaQuery::Range(range)) => {
                assert_eq!(range.upper.as_ref().unwrap().numeric, 768.0);
            }
            other => panic!("unexpected atom {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_alias_degrades() {
        let c = parse("@nope", &ctx());
        assert!(matches!(&atom(&c).kind, StateKind::Modifier { name, .. } if name == "@nope"));
    }

    #[test]
    fn test_unbalanced_parens_degrade_whole_expression() {
        let c = parse("hovered & (pressed", &ctx());
        assert!(
            matches!(&atom(&c).kind, StateKind::Modifier { name, .. } if name == "hovered & (pressed")
        );
    }

    #[test]
    fn test_fingerprint_changes_with_local_aliases() {
        let base = ctx();
        let mut local = HashMap::new();
        local.insert("mobile".to_string(), "@media(w < 480px)".to_string());
        let scoped = base.clone().with_local_aliases(local);
        assert_ne!(base.fingerprint(), scoped.fingerprint());
        assert_ne!(base.fingerprint(), base.clone().sub_element_scope().fingerprint());
    }
}
