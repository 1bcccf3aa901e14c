//! Command-line interface for the stylec compiler
//!
//! Reads a JSON style map, compiles it, and prints the resulting rules
//! either as formatted CSS text or as JSON. The CSS printing here plays
//! the role of the external stylesheet formatter; the library itself only
//! produces format-ready rule structures.

use crate::compiler::{StyleCompiler, StyleMap};
use crate::config::StyleConfig;
use crate::error::{Result, StyleError};
use crate::rules::CssRule;
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Css,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = crate::NAME, version = crate::VERSION, about = crate::DESCRIPTION)]
pub struct Cli {
    /// Input style map (JSON object; nested objects are condition maps).
    pub input: PathBuf,

    /// Output file (stdout when omitted).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML configuration with global aliases and custom units.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base selector the rule suffixes attach to.
    #[arg(long, default_value = ".style")]
    pub selector: String,

    /// Output format.
    #[arg(long, value_enum, default_value = "css")]
    pub format: OutputFormat,

    /// Print compilation statistics to stderr.
    #[arg(long)]
    pub stats: bool,

    /// Compile as a sub-element scope (enables `@own(...)` atoms).
    #[arg(long)]
    pub sub_element: bool,
}

pub fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path)?;
            StyleConfig::from_toml_str(&source)?
        }
        None => StyleConfig::default(),
    };

    let source = fs::read_to_string(&cli.input)?;
    let map = StyleMap::from_json_str(&source)?;

    let compiler = StyleCompiler::new(config);
    let (rules, stats) = compiler.compile_scoped(&map, cli.sub_element)?;

    let output = match cli.format {
        OutputFormat::Css => format_rules(&rules, &cli.selector),
        OutputFormat::Json => serde_json::to_string_pretty(&rules)
            .map_err(|e| StyleError::invalid_format(e.to_string()))?,
    };

    match &cli.output {
        Some(path) => fs::write(path, output)?,
        None => println!("{}", output),
    }

    if cli.stats {
        eprintln!(
            "{} properties, {} entries ({} dropped), {} rules in {}ms",
            stats.property_count,
            stats.entry_count,
            stats.dropped_entry_count,
            stats.rule_count,
            stats.compile_time_ms
        );
    }
    Ok(())
}

/// Print rules as CSS text, nesting at-rules outermost-first.
pub fn format_rules(rules: &[CssRule], base_selector: &str) -> String {
    let mut out = String::new();
    for rule in rules {
        let depth = rule.at_rules.len();
        for (level, at_rule) in rule.at_rules.iter().enumerate() {
            out.push_str(&indent(level));
            out.push_str(at_rule);
            out.push_str(" {\n");
        }

        let selector = rule
            .selector_suffix
            .split(", ")
            .map(|suffix| {
                let full = format!("{}{}", base_selector, suffix);
                match &rule.root_prefix {
                    Some(prefix) => format!("{} {}", prefix, full),
                    None => full,
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        out.push_str(&indent(depth));
        out.push_str(&selector);
        out.push_str(" { ");
        out.push_str(&rule.declarations);
        out.push_str(" }\n");

        for level in (0..depth).rev() {
            out.push_str(&indent(level));
            out.push_str("}\n");
        }
    }
    out
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}
