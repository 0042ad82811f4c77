//! # Formula Parser
//!
//! Turns a single formula token like `Ca(OH)2`, `CuSO4·5H2O`, `2H2O(g)` or `Fe3+`
//! into a [`ParsedFormula`]: element counts, leading coefficient, optional charge and
//! optional physical state.
//!
//! ## Grammar
//! ```text
//! formula   := [coefficient] body [charge] [state]
//! body      := ( element | group | hydrate )*
//! element   := Upper [lower] [digits]
//! group     := "(" body ")" [digits]
//! hydrate   := ("·" | "*") [digits] body
//! charge    := ["^"] [digits] ("+" | "-")
//! state     := "(s)" | "(l)" | "(g)" | "(aq)"
//! ```
//! A digit run directly followed by the final sign is read as the charge magnitude:
//! `Fe3+` is iron with charge +3. To keep the digits as a subscript put a caret before
//! the sign: `NH4^+` is ammonium with charge +1, while `NH4+` reads as `NH` with charge +4.
//! Strict mode rejects such a bare digit charge on an ion with more than one element.
//!
//! ## Parsing policy
//! In lenient mode (the default) scanning stops at the first character the grammar does
//! not know and the remainder is ignored unless it is a charge suffix. In strict mode
//! such a remainder is reported as [`ChemError::MalformedFormula`]. In both modes a
//! formula without any element symbol, a zero coefficient, an unclosed `(`, an empty
//! group or a hydrate separator without a body is malformed.
use crate::Equations::errors::ChemError;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static STATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*\((s|l|g|aq)\)\s*$").expect("state suffix pattern is valid")
});
static CHARGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)([+-])$").expect("charge suffix pattern is valid"));

/// Physical state annotation: (s), (l), (g), (aq)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalState {
    Solid,
    Liquid,
    Gas,
    Aqueous,
}

impl PhysicalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicalState::Solid => "s",
            PhysicalState::Liquid => "l",
            PhysicalState::Gas => "g",
            PhysicalState::Aqueous => "aq",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "s" => Some(PhysicalState::Solid),
            "l" => Some(PhysicalState::Liquid),
            "g" => Some(PhysicalState::Gas),
            "aq" => Some(PhysicalState::Aqueous),
            _ => None,
        }
    }
}

/// Element symbol -> number of atoms. Keeps the order in which the symbols were first met,
/// so matrix rows and printed breakdowns are deterministic. Equality ignores the order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementCount(Vec<(String, u32)>);

impl ElementCount {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// adds `count` atoms of `symbol`, returns the new total or None on overflow
    pub fn add(&mut self, symbol: &str, count: u32) -> Option<u32> {
        if let Some(entry) = self.0.iter_mut().find(|(s, _)| s == symbol) {
            entry.1 = entry.1.checked_add(count)?;
            return Some(entry.1);
        }
        self.0.push((symbol.to_string(), count));
        Some(count)
    }

    /// adds every count of `other` multiplied by `factor`
    pub fn merge_scaled(&mut self, other: &ElementCount, factor: u32) -> Option<()> {
        for (symbol, count) in other.iter() {
            self.add(symbol, count.checked_mul(factor)?)?;
        }
        Some(())
    }

    pub fn get(&self, symbol: &str) -> Option<u32> {
        self.0.iter().find(|(s, _)| s == symbol).map(|(_, c)| *c)
    }

    /// count of `symbol`, 0 if the element is absent
    pub fn count(&self, symbol: &str) -> u32 {
        self.get(symbol).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(s, c)| (s.as_str(), *c))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_atoms(&self) -> u64 {
        self.0.iter().map(|(_, c)| *c as u64).sum()
    }

    /// rebuilds a flat formula like "H2O": symbol followed by its count, count omitted when it is 1
    pub fn to_formula_string(&self) -> String {
        self.0
            .iter()
            .map(|(symbol, count)| match *count {
                1 => symbol.clone(),
                n => format!("{}{}", symbol, n),
            })
            .collect()
    }
}

impl PartialEq for ElementCount {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(s, c)| other.get(s) == Some(c))
    }
}

impl Eq for ElementCount {}

impl<const N: usize> From<[(&str, u32); N]> for ElementCount {
    fn from(pairs: [(&str, u32); N]) -> Self {
        let mut counts = ElementCount::new();
        for (symbol, count) in pairs {
            counts.add(symbol, count);
        }
        counts
    }
}

impl fmt::Display for ElementCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(s, c)| format!("{}: {}", s, c)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Options of the formula grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// reject unconsumed characters instead of ignoring them
    pub strict: bool,
}

impl ParserOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// result of parsing one formula token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFormula {
    pub elements: ElementCount,
    pub coefficient: u32,
    pub charge: Option<i32>,
    pub state: Option<PhysicalState>,
    /// trimmed input text
    pub original: String,
}

impl ParsedFormula {
    /// original token without a leading coefficient: "2H2O(g)" -> "H2O(g)"
    pub fn formula_body(&self) -> &str {
        let digits = self
            .original
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.original.len());
        let rest = &self.original[digits..];
        if digits > 0 && rest.starts_with(|c: char| c.is_ascii_uppercase() || c == '(') {
            rest
        } else {
            &self.original
        }
    }

    pub fn is_ion(&self) -> bool {
        matches!(self.charge, Some(c) if c != 0)
    }

    /// same element map, coefficient, charge and state are not compared
    pub fn same_composition(&self, other: &ParsedFormula) -> bool {
        self.elements == other.elements
    }
}

impl fmt::Display for ParsedFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for ParsedFormula {
    type Err = ChemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_formula(s)
    }
}

/// Recursive descent parser over the characters of one formula body.
/// The cursor is owned by the parser instance, each call of [`parse_formula`] creates its own.
pub struct FormulaParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    options: ParserOptions,
}

impl<'a> FormulaParser<'a> {
    pub fn new(source: &'a str, options: ParserOptions) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn error(&self, position: usize, reason: impl Into<String>) -> ChemError {
        ChemError::malformed(self.source, position, reason)
    }

    fn scan_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.pos += 1;
        }
        digits
    }

    fn to_number(&self, digits: &str, start: usize) -> Result<u32, ChemError> {
        digits
            .parse::<u32>()
            .map_err(|_| self.error(start, format!("number {} is too large", digits)))
    }

    /// leading multiplier, only when digits are followed by an element or '('
    pub fn parse_coefficient(&mut self) -> Result<u32, ChemError> {
        let start = self.pos;
        let digits = self.scan_digits();
        if digits.is_empty() {
            return Ok(1);
        }
        match self.peek() {
            Some(c) if c.is_ascii_uppercase() || c == '(' => {
                let coefficient = self.to_number(&digits, start)?;
                if coefficient == 0 {
                    return Err(self.error(start, "coefficient must be positive"));
                }
                Ok(coefficient)
            }
            _ => {
                // the digits belong to something else, e.g. a charge magnitude
                self.pos = start;
                Ok(1)
            }
        }
    }

    /// subscript or multiplier, 1 when absent. Digits that only precede the final sign are left for the charge.
    fn parse_count(&mut self) -> Result<u32, ChemError> {
        let rest = self.rest();
        if rest.starts_with(|c: char| c.is_ascii_digit()) && CHARGE_SUFFIX.is_match(&rest) {
            return Ok(1);
        }
        let start = self.pos;
        let digits = self.scan_digits();
        if digits.is_empty() {
            Ok(1)
        } else {
            self.to_number(&digits, start)
        }
    }

    fn merge(
        &self,
        into: &mut ElementCount,
        from: &ElementCount,
        factor: u32,
        position: usize,
    ) -> Result<(), ChemError> {
        into.merge_scaled(from, factor)
            .ok_or_else(|| self.error(position, "atom count overflow"))
    }

    /// body of a formula or of a parenthesized group; stops at ')' or at an unknown character
    pub fn parse_group(&mut self) -> Result<ElementCount, ChemError> {
        let mut counts = ElementCount::new();
        while let Some(c) = self.peek() {
            if c == '(' {
                let open = self.pos;
                self.pos += 1;
                let inner = self.parse_group()?;
                if self.peek() != Some(')') {
                    return Err(self.error(open, "unclosed '('"));
                }
                if inner.is_empty() {
                    return Err(self.error(open, "empty group"));
                }
                self.pos += 1;
                let multiplier = self.parse_count()?;
                self.merge(&mut counts, &inner, multiplier, open)?;
            } else if c.is_ascii_uppercase() {
                let start = self.pos;
                let mut symbol = c.to_string();
                self.pos += 1;
                if let Some(lower) = self.peek() {
                    if lower.is_ascii_lowercase() {
                        symbol.push(lower);
                        self.pos += 1;
                    }
                }
                let count = self.parse_count()?;
                counts
                    .add(&symbol, count)
                    .ok_or_else(|| self.error(start, "atom count overflow"))?;
            } else if c == '·' || c == '*' {
                let separator = self.pos;
                self.pos += 1;
                let multiplier = self.parse_count()?;
                let hydrate = self.parse_group()?;
                if hydrate.is_empty() {
                    return Err(self.error(separator, "hydrate separator without a formula"));
                }
                self.merge(&mut counts, &hydrate, multiplier, separator)?;
            } else {
                break;
            }
        }
        Ok(counts)
    }

    /// trailing charge: "^2+", "3-", "+", "-"
    pub fn parse_charge(&mut self) -> Result<Option<i32>, ChemError> {
        let start = self.pos;
        if self.peek() == Some('^') {
            self.pos += 1;
        }
        let rest = self.rest();
        if rest.is_empty() {
            if self.pos > start && self.options.strict {
                return Err(self.error(start, "'^' without a charge"));
            }
            return Ok(None);
        }
        let Some(caps) = CHARGE_SUFFIX.captures(&rest) else {
            if self.options.strict {
                return Err(self.error(start, format!("unexpected '{}'", &self.rest_from(start))));
            }
            debug!(
                "ignoring trailing '{}' of formula '{}'",
                self.rest_from(start),
                self.source
            );
            return Ok(None);
        };
        let magnitude = match &caps[1] {
            "" => 1,
            digits => digits
                .parse::<i32>()
                .map_err(|_| self.error(self.pos, format!("charge {} is too large", digits)))?,
        };
        self.pos = self.chars.len();
        Ok(Some(if &caps[2] == "+" { magnitude } else { -magnitude }))
    }

    fn rest_from(&self, start: usize) -> String {
        self.chars[start..].iter().collect()
    }
}

/// splits "H2O(g)" into ("H2O", Some(Gas)); the annotation must end the string
fn split_state(text: &str) -> (&str, Option<PhysicalState>) {
    if let Some(caps) = STATE_SUFFIX.captures(text) {
        if let (Some(body), Some(state)) = (caps.get(1), caps.get(2)) {
            return (
                body.as_str().trim(),
                PhysicalState::from_symbol(state.as_str()),
            );
        }
    }
    (text, None)
}

/// parses a formula with the lenient default options
pub fn parse_formula(input: &str) -> Result<ParsedFormula, ChemError> {
    parse_formula_with(input, &ParserOptions::default())
}

pub fn parse_formula_with(
    input: &str,
    options: &ParserOptions,
) -> Result<ParsedFormula, ChemError> {
    let original = input.trim();
    let (body, state) = split_state(original);
    let mut parser = FormulaParser::new(body, *options);

    let coefficient = parser.parse_coefficient()?;
    let elements = parser.parse_group()?;
    let after_elements = parser.position();
    let charge = parser.parse_charge()?;
    if elements.is_empty() {
        return Err(ChemError::malformed(
            original,
            after_elements,
            "no element symbol found",
        ));
    }
    if options.strict && charge.is_some() && elements.len() > 1 {
        let suffix: String = body.chars().skip(after_elements).collect();
        if suffix.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ChemError::malformed(
                original,
                after_elements,
                "digits before the charge sign could be a subscript, write '^' before the charge",
            ));
        }
    }
    debug!(
        "parsed formula '{}': elements {}, coefficient {}, charge {:?}, state {:?}",
        original, elements, coefficient, charge, state
    );
    Ok(ParsedFormula {
        elements,
        coefficient,
        charge,
        state,
        original: original.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formula() {
        let parsed = parse_formula("H2O").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("H", 2), ("O", 1)]));
        assert_eq!(parsed.coefficient, 1);
        assert_eq!(parsed.charge, None);
        assert_eq!(parsed.state, None);

        let parsed = parse_formula("C6H8O6").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("C", 6), ("H", 8), ("O", 6)])
        );

        let parsed = parse_formula("C5H6OOH").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("C", 5), ("H", 7), ("O", 2)])
        );
    }

    #[test]
    fn test_groups() {
        let parsed = parse_formula("Ca(OH)2").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Ca", 1), ("O", 2), ("H", 2)])
        );

        let parsed = parse_formula("Na(NO3)2").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Na", 1), ("N", 2), ("O", 6)])
        );

        let parsed = parse_formula("Ca3(PO4)2").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Ca", 3), ("P", 2), ("O", 8)])
        );
        // nested groups multiply through
        let parsed = parse_formula("Fe2(C2(O2)2)3").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Fe", 2), ("C", 6), ("O", 12)])
        );
        let parsed = parse_formula("(CH3)3COH").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("C", 4), ("H", 10), ("O", 1)])
        );
    }

    #[test]
    fn test_element_order_is_first_seen() {
        let parsed = parse_formula("Ca(OH)2").unwrap();
        let symbols: Vec<&str> = parsed.elements.symbols().collect();
        assert_eq!(symbols, vec!["Ca", "O", "H"]);
    }

    #[test]
    fn test_hydrates() {
        let parsed = parse_formula("CuSO4·5H2O").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Cu", 1), ("S", 1), ("O", 9), ("H", 10)])
        );
        let parsed = parse_formula("CaSO4*2H2O").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Ca", 1), ("S", 1), ("O", 6), ("H", 4)])
        );
        let parsed = parse_formula("Na2CO3*H2O").unwrap();
        assert_eq!(
            parsed.elements,
            ElementCount::from([("Na", 2), ("C", 1), ("O", 4), ("H", 2)])
        );
    }

    #[test]
    fn test_charges() {
        let parsed = parse_formula("Fe3+").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("Fe", 1)]));
        assert_eq!(parsed.charge, Some(3));
        assert!(parsed.is_ion());

        let parsed = parse_formula("SO4^2-").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("S", 1), ("O", 4)]));
        assert_eq!(parsed.charge, Some(-2));

        let parsed = parse_formula("Cl-").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("Cl", 1)]));
        assert_eq!(parsed.charge, Some(-1));

        let parsed = parse_formula("NH4^+").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("N", 1), ("H", 4)]));
        assert_eq!(parsed.charge, Some(1));

        // digits right before the final sign are the charge magnitude
        let parsed = parse_formula("Cu2+").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("Cu", 1)]));
        assert_eq!(parsed.charge, Some(2));
    }

    #[test]
    fn test_coefficient_and_state() {
        let parsed = parse_formula("2H2O(g)").unwrap();
        assert_eq!(parsed.coefficient, 2);
        assert_eq!(parsed.state, Some(PhysicalState::Gas));
        assert_eq!(parsed.elements, ElementCount::from([("H", 2), ("O", 1)]));
        assert_eq!(parsed.original, "2H2O(g)");
        assert_eq!(parsed.formula_body(), "H2O(g)");

        let parsed = parse_formula("  NaCl (aq) ").unwrap();
        assert_eq!(parsed.state, Some(PhysicalState::Aqueous));
        assert_eq!(parsed.original, "NaCl (aq)");

        let parsed = parse_formula("12(NH4)2SO4(s)").unwrap();
        assert_eq!(parsed.coefficient, 12);
        assert_eq!(parsed.state, Some(PhysicalState::Solid));
        assert_eq!(
            parsed.elements,
            ElementCount::from([("N", 2), ("H", 8), ("S", 1), ("O", 4)])
        );

        let parsed = parse_formula("Fe3+(aq)").unwrap();
        assert_eq!(parsed.charge, Some(3));
        assert_eq!(parsed.state, Some(PhysicalState::Aqueous));
    }

    #[test]
    fn test_state_must_end_the_formula() {
        // "(l)" in the middle is not a state annotation but an unclosed group
        let result = parse_formula("Hg(l)x");
        assert!(matches!(result, Err(ChemError::MalformedFormula { .. })));
        let parsed = parse_formula("Hg(l)").unwrap();
        assert_eq!(parsed.state, Some(PhysicalState::Liquid));
        assert_eq!(parsed.elements, ElementCount::from([("Hg", 1)]));
    }

    #[test]
    fn test_lenient_and_strict_policies() {
        let parsed = parse_formula("H2O$junk").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("H", 2), ("O", 1)]));
        assert_eq!(parsed.charge, None);

        let err = parse_formula_with("H2O$junk", &ParserOptions::strict()).unwrap_err();
        match err {
            ChemError::MalformedFormula { position, .. } => assert_eq!(position, 3),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse_formula_with("Fe3+", &ParserOptions::strict()).is_ok());
        assert!(parse_formula_with("H2O)", &ParserOptions::strict()).is_err());
    }

    #[test]
    fn test_bare_digit_charge_on_polyatomic_ion() {
        // lenient: the digits are the charge, the subscript is lost
        let parsed = parse_formula("NH4+").unwrap();
        assert_eq!(parsed.elements, ElementCount::from([("N", 1), ("H", 1)]));
        assert_eq!(parsed.charge, Some(4));

        let strict = ParserOptions::strict();
        let err = parse_formula_with("NH4+", &strict).unwrap_err();
        match err {
            ChemError::MalformedFormula { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse_formula_with("Ca(OH)2-", &strict).is_err());
        assert_eq!(parse_formula_with("NH4^+", &strict).unwrap().charge, Some(1));
        assert_eq!(parse_formula_with("SO4^2-", &strict).unwrap().charge, Some(-2));
        assert_eq!(parse_formula_with("OH-", &strict).unwrap().charge, Some(-1));
        assert_eq!(parse_formula_with("Cu2+", &strict).unwrap().charge, Some(2));
    }

    #[test]
    fn test_malformed_formulas() {
        for bad in ["", "2+", "0H2", "h2o", "Ca(OH2", "H2()", "CuSO4·", "99999999999H"] {
            let result = parse_formula(bad);
            assert!(
                matches!(result, Err(ChemError::MalformedFormula { .. })),
                "{} should be malformed, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_round_trip_of_flat_formulas() {
        for formula in ["H2O", "C3H8", "NaCl", "C6H12O6", "KMnO4", "CH3COOH"] {
            let parsed = parse_formula(formula).unwrap();
            let rebuilt = parsed.elements.to_formula_string();
            let reparsed = parse_formula(&rebuilt).unwrap();
            assert_eq!(parsed.elements, reparsed.elements, "{}", formula);
        }
    }

    #[test]
    fn test_reparsing_original_is_idempotent() {
        for formula in ["Ca(OH)2", " CuSO4·5H2O ", "2H2O(l)", "SO4^2-", "Fe3+(aq)"] {
            let first = parse_formula(formula).unwrap();
            let second = parse_formula(&first.original).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_from_str() {
        let parsed: ParsedFormula = "Al2(SO4)3".parse().unwrap();
        assert_eq!(parsed.elements.count("O"), 12);
        assert_eq!(parsed.elements.count("Xe"), 0);
        assert_eq!(parsed.elements.total_atoms(), 17);
    }
}
