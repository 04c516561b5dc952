//! Compile Fortran FORMAT descriptors into positional column templates.
//!
//! Character datablocks in formatted O files are laid out in fixed columns
//! described by a FORMAT descriptor such as `(5(1x,a6))`. The first step in
//! decoding one is to expand the descriptor into a [`FormatTemplate`] with
//! its `parse` method:
//!
//! ```
//! # use odbparse::format::FormatTemplate;
//! let tmpl = FormatTemplate::parse("(1x,5a)").unwrap();
//! assert_eq!(tmpl.to_string(), "_123456123456123456123456123456");
//! ```
//!
//! Each template cell is one input column: a filler column is consumed and
//! discarded, and data columns `1` through `6` belong to one six-character
//! field, with column `6` completing it. The template describes one physical
//! line; the character reader replays it across as many lines as the
//! datablock needs.
use std::fmt::Display;

use pest::iterators::Pair;
use pest::Parser;

use crate::error::{OdbError, Result};

#[derive(Parser)]
#[grammar = "odb.pest"]
struct DescriptorParser;

/// One column of a compiled descriptor template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateCell {
    /// Consume and discard one input column.
    Filler,
    /// Column `1..=6` of a six-character field; `Data(6)` completes the
    /// field.
    Data(u8),
}

/// A flat, positional expansion of a FORMAT descriptor.
///
/// Compiled once per character datablock and discarded when that
/// datablock's elements are fully decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    cells: Vec<TemplateCell>,
}

impl FormatTemplate {
    /// Parse a FORMAT descriptor and return its expanded template.
    ///
    /// The descriptor must include the outer parentheses, which is how it
    /// appears on a formatted header line. That is, `"(2a)"` is valid but
    /// `"2a"` is not. Repeat counts multiply the element that follows them
    /// (`5a`, `2(1x,a)`); commas separate elements; an explicit field width
    /// (`a6`) is accepted and ignored, since character fields are always
    /// six columns wide.
    ///
    /// Returns [`OdbError::MalformedFormat`] for unbalanced parentheses or
    /// characters outside the descriptor grammar.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let tree = DescriptorParser::parse(Rule::format, descriptor)
            .map_err(|e| OdbError::MalformedFormat {
                descriptor: descriptor.to_owned(),
                reason: e.to_string(),
            })?
            .next()
            .unwrap();

        let mut cells = Vec::new();
        for pair in tree.into_inner() {
            match pair.as_rule() {
                Rule::group => expand_group(pair, descriptor, &mut cells)?,
                // End of string, nothing further to expand
                Rule::EOI => break,
                _ => unreachable!(),
            }
        }
        Ok(Self { cells })
    }

    /// The expanded template, one cell per input column.
    pub fn cells(&self) -> &[TemplateCell] {
        &self.cells
    }

    /// Number of complete fields one full pass over the template decodes,
    /// i.e. the number of character fields per physical line.
    pub fn fields_per_pass(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, TemplateCell::Data(6)))
            .count()
    }

    /// Number of input columns one full pass over the template consumes.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Display for FormatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for cell in &self.cells {
            match cell {
                TemplateCell::Filler => write!(f, "_")?,
                TemplateCell::Data(p) => write!(f, "{p}")?,
            }
        }
        Ok(())
    }
}

fn expand_group(pair: Pair<Rule>, descriptor: &str, out: &mut Vec<TemplateCell>) -> Result<()> {
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::body {
            for element in inner.into_inner() {
                expand_element(element, descriptor, out)?;
            }
        }
    }
    Ok(())
}

fn expand_element(pair: Pair<Rule>, descriptor: &str, out: &mut Vec<TemplateCell>) -> Result<()> {
    let mut repeat: usize = 1;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::repeat => {
                // the rule matches digits only, so this can fail only on overflow
                repeat = inner.as_str().parse().map_err(|_| OdbError::MalformedFormat {
                    descriptor: descriptor.to_owned(),
                    reason: format!("repeat count '{}' out of range", inner.as_str()),
                })?;
            }
            Rule::skip => {
                for _ in 0..repeat {
                    out.push(TemplateCell::Filler);
                }
            }
            Rule::field => {
                for _ in 0..repeat {
                    for p in 1..=6 {
                        out.push(TemplateCell::Data(p));
                    }
                }
            }
            Rule::group => {
                let mut sub = Vec::new();
                expand_group(inner, descriptor, &mut sub)?;
                for _ in 0..repeat {
                    out.extend_from_slice(&sub);
                }
            }
            _ => unreachable!(),
        }
    }
    Ok(())
}
