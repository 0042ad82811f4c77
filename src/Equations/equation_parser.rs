//! # Equation Parser
//!
//! Splits a reaction string like `C3H8 + O2 -> CO2 + H2O` on the reaction arrow, splits
//! both sides on a whitespace-padded `+` and parses every term with the formula parser.
//! A bare `+` is never a separator, so ions like `Fe3+` or `Ag+ + Cl-` stay intact.
use crate::Equations::errors::{ChemError, Side};
use crate::Equations::formula_parser::{ParsedFormula, ParserOptions, parse_formula_with};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static TERM_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\+\s+").expect("term separator pattern is valid"));

/// Reaction arrow variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrowType {
    /// `->`
    Single,
    /// `<->`
    DoubleAscii,
    /// `<=>`
    Double,
}

/// longer arrows first: "<->" contains "->" and must not be cut short
const ARROW_PRIORITY: [ArrowType; 3] = [ArrowType::Double, ArrowType::DoubleAscii, ArrowType::Single];

impl ArrowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrowType::Single => "->",
            ArrowType::DoubleAscii => "<->",
            ArrowType::Double => "<=>",
        }
    }

    /// typographic arrow
    pub fn symbol(&self) -> &'static str {
        match self {
            ArrowType::Single => "\u{2192}",
            ArrowType::DoubleAscii => "\u{2194}",
            ArrowType::Double => "\u{21CC}",
        }
    }

    pub fn is_reversible(&self) -> bool {
        !matches!(self, ArrowType::Single)
    }
}

/// result of parsing a reaction equation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEquation {
    pub reactants: Vec<ParsedFormula>,
    pub products: Vec<ParsedFormula>,
    pub arrow_type: ArrowType,
    /// trimmed input text
    pub original: String,
}

impl ParsedEquation {
    /// reactants followed by products, the column order of the composition matrix
    pub fn compounds(&self) -> impl Iterator<Item = &ParsedFormula> {
        self.reactants.iter().chain(self.products.iter())
    }

    pub fn compound_count(&self) -> usize {
        self.reactants.len() + self.products.len()
    }

    pub fn is_reactant_column(&self, column: usize) -> bool {
        column < self.reactants.len()
    }
}

impl fmt::Display for ParsedEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |side: &[ParsedFormula]| {
            side.iter()
                .map(|c| c.original.as_str())
                .collect::<Vec<_>>()
                .join(" + ")
        };
        write!(
            f,
            "{} {} {}",
            join(&self.reactants),
            self.arrow_type.as_str(),
            join(&self.products)
        )
    }
}

impl FromStr for ParsedEquation {
    type Err = ChemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_equation(s)
    }
}

/// first occurrence of the highest priority arrow
fn find_arrow(text: &str) -> Option<(ArrowType, usize)> {
    ARROW_PRIORITY
        .iter()
        .find_map(|arrow| text.find(arrow.as_str()).map(|index| (*arrow, index)))
}

fn parse_side(
    text: &str,
    side: Side,
    equation: &str,
    options: &ParserOptions,
) -> Result<Vec<ParsedFormula>, ChemError> {
    let terms: Vec<&str> = TERM_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect();
    if terms.is_empty() {
        return Err(ChemError::EmptySide {
            side,
            equation: equation.to_string(),
        });
    }
    terms
        .into_iter()
        .map(|term| parse_formula_with(term, options))
        .collect()
}

/// parses an equation with the lenient default formula options
pub fn parse_equation(input: &str) -> Result<ParsedEquation, ChemError> {
    parse_equation_with(input, &ParserOptions::default())
}

pub fn parse_equation_with(
    input: &str,
    options: &ParserOptions,
) -> Result<ParsedEquation, ChemError> {
    let original = input.trim();
    let (arrow_type, index) = find_arrow(original).ok_or_else(|| ChemError::NoArrowFound {
        equation: original.to_string(),
    })?;
    let lhs = &original[..index];
    let rhs = &original[index + arrow_type.as_str().len()..];

    let reactants = parse_side(lhs, Side::Reactants, original, options)?;
    let products = parse_side(rhs, Side::Products, original, options)?;
    debug!(
        "parsed equation '{}': {} reactants, {} products, arrow {}",
        original,
        reactants.len(),
        products.len(),
        arrow_type.as_str()
    );
    Ok(ParsedEquation {
        reactants,
        products,
        arrow_type,
        original: original.to_string(),
    })
}
