//! # stylec - Conditional Style Resolution Compiler
//!
//! Compiles declarative style maps, where property values vary by
//! interaction state, viewport, container, and theme conditions, into
//! flat CSS rules whose conditions are mutually exclusive.
//!
//! ## Pipeline
//!
//! 1. **Parsing**: condition expressions (`hovered & !disabled`,
//!    `@media(w <= 920px)`, `@(card: w < 400px)`) become a boolean
//!    condition tree ([`parser`], [`condition`]).
//! 2. **Exclusivity**: priority-ordered entries for one property are
//!    rewritten so at most one can match at a time ([`exclusivity`]).
//! 3. **Simplification**: boolean algebra plus numeric range reasoning
//!    shrinks each condition and proves unreachable entries false
//!    ([`simplify`], [`bounds`]).
//! 4. **Handler computation**: handlers derive declarations from the
//!    value combinations of the properties they read ([`handlers`]).
//! 5. **Materialization**: each surviving condition is rendered into
//!    selector fragments and at-rules, and identical declaration blocks
//!    are merged ([`materialize`], [`rules`]).
//!
//! ## Example
//!
//! ```
//! use stylec::compiler::{StyleCompiler, StyleMap};
//! use stylec::config::StyleConfig;
//!
//! let map = StyleMap::from_json_str(
//!     r#"{ "color": { "": "gray", "hovered": "blue" } }"#,
//! ).unwrap();
//! let rules = StyleCompiler::new(StyleConfig::default()).compile(&map).unwrap();
//! assert_eq!(rules.len(), 1);
//! assert_eq!(rules[0].selector_suffix, "[data-is-hovered]");
//! ```

pub mod alias;
pub mod bounds;
pub mod cache;
pub mod cli;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exclusivity;
pub mod handlers;
pub mod materialize;
pub mod parser;
pub mod rules;
pub mod simplify;

pub use compiler::{CompilationStats, StyleCompiler, StyleMap, StyleValue};
pub use condition::Condition;
pub use config::StyleConfig;
pub use error::{Result, StyleError};
pub use handlers::StyleHandler;
pub use rules::CssRule;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compile a style map with the process-global configuration. The first
/// call locks the global config against further changes.
pub fn compile_style_map(map: &StyleMap) -> Result<Vec<CssRule>> {
    StyleCompiler::new(config::global_snapshot()).compile(map)
}

/// Compile a JSON style map source with the process-global configuration.
pub fn compile_json(source: &str) -> Result<Vec<CssRule>> {
    compile_style_map(&StyleMap::from_json_str(source)?)
}
