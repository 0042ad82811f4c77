use crate::Equations::equation_parser::ParsedEquation;
use crate::Equations::errors::ChemError;
use crate::Equations::formula_parser::{ParsedFormula, parse_formula};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CONCENTRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\s*=\s*([\d.eE+-]+)").expect("concentration pattern is valid")
});

/// K above this value strongly favors products, below its inverse strongly favors reactants
pub const STRONG_FAVOR_LIMIT: f64 = 1e4;

/// equilibrium concentration of one species, e.g. `[N2]=0.5`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concentration {
    pub formula: String,
    /// mol/L
    pub value: f64,
}

/// parses space separated concentrations `[N2]=0.5 [H2]=0.3 [NH3]=0.2`
pub fn parse_concentrations(input: &str) -> Result<Vec<Concentration>, ChemError> {
    let mut concentrations = Vec::new();
    for caps in CONCENTRATION.captures_iter(input) {
        let formula = caps[1].trim().to_string();
        let value: f64 = caps[2].parse().map_err(|_| {
            ChemError::invalid_problem(&caps[0], format!("'{}' is not a number", &caps[2]))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(ChemError::invalid_problem(
                &caps[0],
                "concentration must be a non-negative number",
            ));
        }
        concentrations.push(Concentration { formula, value });
    }
    if concentrations.is_empty() {
        return Err(ChemError::invalid_problem(
            input,
            "no concentrations found, expected e.g. [N2]=0.5 [H2]=0.3",
        ));
    }
    Ok(concentrations)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquilibriumPosition {
    StronglyFavorsProducts,
    FavorsProducts,
    FavorsReactants,
    StronglyFavorsReactants,
}

impl EquilibriumPosition {
    pub fn from_constant(k: f64) -> Self {
        if k > STRONG_FAVOR_LIMIT {
            EquilibriumPosition::StronglyFavorsProducts
        } else if k > 1.0 {
            EquilibriumPosition::FavorsProducts
        } else if k > 1.0 / STRONG_FAVOR_LIMIT {
            EquilibriumPosition::FavorsReactants
        } else {
            EquilibriumPosition::StronglyFavorsReactants
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EquilibriumPosition::StronglyFavorsProducts => "Strongly favors products",
            EquilibriumPosition::FavorsProducts => "Favors products",
            EquilibriumPosition::FavorsReactants => "Favors reactants",
            EquilibriumPosition::StronglyFavorsReactants => "Strongly favors reactants",
        }
    }
}

impl fmt::Display for EquilibriumPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// one factor of the mass-action expression: `[formula]^coefficient`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumTerm {
    pub formula: String,
    pub concentration: f64,
    pub coefficient: u32,
}

impl EquilibriumTerm {
    fn value(&self) -> f64 {
        self.concentration.powi(self.coefficient as i32)
    }

    fn symbol(&self) -> String {
        with_power(format!("[{}]", self.formula), self.coefficient)
    }

    fn substituted(&self) -> String {
        with_power(self.concentration.to_string(), self.coefficient)
    }
}

fn with_power(base: String, coefficient: u32) -> String {
    if coefficient == 1 {
        base
    } else {
        format!("{}^{}", base, coefficient)
    }
}

fn join_terms(terms: &[String]) -> String {
    terms.join(" × ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumReport {
    pub reactants: Vec<EquilibriumTerm>,
    pub products: Vec<EquilibriumTerm>,
    /// product of the product terms
    pub numerator: f64,
    /// product of the reactant terms
    pub denominator: f64,
    pub k: f64,
    pub position: EquilibriumPosition,
    /// false for a one-way arrow `->`
    pub reversible: bool,
}

impl EquilibriumReport {
    /// `K = [NH3]^2 / ([N2] × [H2]^3)`
    pub fn expression(&self) -> String {
        let products: Vec<String> = self.products.iter().map(EquilibriumTerm::symbol).collect();
        let reactants: Vec<String> = self.reactants.iter().map(EquilibriumTerm::symbol).collect();
        let denominator = if reactants.len() > 1 {
            format!("({})", join_terms(&reactants))
        } else {
            join_terms(&reactants)
        };
        format!("K = {} / {}", join_terms(&products), denominator)
    }

    /// `K = (0.2^2) / (0.5 × 0.3^3)`
    pub fn substitution(&self) -> String {
        let products: Vec<String> = self.products.iter().map(EquilibriumTerm::substituted).collect();
        let reactants: Vec<String> = self
            .reactants
            .iter()
            .map(EquilibriumTerm::substituted)
            .collect();
        format!("K = ({}) / ({})", join_terms(&products), join_terms(&reactants))
    }

    /// exponential notation outside [0.001, 10000], fixed point inside
    pub fn format_k(&self, decimal_places: usize) -> String {
        format_constant(self.k, decimal_places)
    }
}

pub fn format_constant(value: f64, decimal_places: usize) -> String {
    let dp = decimal_places;
    if value != 0.0 && (value.abs() < 1e-3 || value.abs() > 1e4) {
        format!("{:.dp$e}", value)
    } else {
        format!("{:.dp$}", value)
    }
}

/// formula of a compound without its coefficient and state: "2NH3(g)" -> "NH3"
fn species_label(compound: &ParsedFormula) -> String {
    let body = compound.formula_body().trim_end();
    let label = match compound.state {
        Some(state) => body
            .strip_suffix(&format!("({})", state.as_str()))
            .unwrap_or(body),
        None => body,
    };
    label.trim_end().to_string()
}

fn collect_terms(
    compounds: &[ParsedFormula],
    known: &[(ParsedFormula, f64)],
) -> Result<Vec<EquilibriumTerm>, ChemError> {
    compounds
        .iter()
        .map(|compound| -> Result<EquilibriumTerm, ChemError> {
            let label = species_label(compound);
            // the last value given for a species wins
            let concentration = known
                .iter()
                .rev()
                .find(|(species, _)| species.same_composition(compound))
                .map(|(_, value)| *value)
                .ok_or_else(|| ChemError::CompoundNotFound {
                    formula: label.clone(),
                })?;
            Ok(EquilibriumTerm {
                formula: label,
                concentration,
                coefficient: compound.coefficient,
            })
        })
        .collect()
}

/// K = Π[products]^coefficient / Π[reactants]^coefficient with the coefficients written in the
/// equation. Physical states are ignored when concentrations are matched to compounds.
pub fn calculate_equilibrium_constant(
    equation: &ParsedEquation,
    concentrations: &[Concentration],
) -> Result<EquilibriumReport, ChemError> {
    if concentrations.is_empty() {
        return Err(ChemError::invalid_problem(
            &equation.original,
            "no concentrations given",
        ));
    }
    let known = concentrations
        .iter()
        .map(|c| -> Result<(ParsedFormula, f64), ChemError> {
            Ok((parse_formula(&c.formula)?, c.value))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let products = collect_terms(&equation.products, &known)?;
    let reactants = collect_terms(&equation.reactants, &known)?;
    let numerator: f64 = products.iter().map(EquilibriumTerm::value).product();
    let denominator: f64 = reactants.iter().map(EquilibriumTerm::value).product();
    if denominator == 0.0 {
        return Err(ChemError::invalid_problem(
            &equation.original,
            "a reactant concentration of zero makes K undefined",
        ));
    }
    let k = numerator / denominator;
    debug!(
        "equilibrium of '{}': numerator {}, denominator {}",
        equation.original, numerator, denominator
    );
    let position = EquilibriumPosition::from_constant(k);
    info!("K = {} ({})", k, position);
    Ok(EquilibriumReport {
        reactants,
        products,
        numerator,
        denominator,
        k,
        position,
        reversible: equation.arrow_type.is_reversible(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Equations::equation_parser::parse_equation;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_concentrations() {
        let concentrations = parse_concentrations("[N2]=0.5 [H2] = 0.3 [NH3]=2e-1").unwrap();
        assert_eq!(concentrations.len(), 3);
        assert_eq!(concentrations[0].formula, "N2");
        assert_eq!(concentrations[0].value, 0.5);
        assert_eq!(concentrations[1].formula, "H2");
        assert_eq!(concentrations[1].value, 0.3);
        assert_eq!(concentrations[2].formula, "NH3");
        assert_relative_eq!(concentrations[2].value, 0.2, epsilon = 1e-15);
    }

    #[test]
    fn test_parse_concentrations_errors() {
        assert!(matches!(
            parse_concentrations("N2 = 0.5"),
            Err(ChemError::InvalidProblem { .. })
        ));
        assert!(matches!(
            parse_concentrations("[N2]=0.5.1"),
            Err(ChemError::InvalidProblem { .. })
        ));
        assert!(matches!(
            parse_concentrations("[N2]=-0.5"),
            Err(ChemError::InvalidProblem { .. })
        ));
    }

    #[test]
    fn test_ammonia_synthesis() {
        let eq = parse_equation("N2 + 3H2 <-> 2NH3").unwrap();
        let concentrations = parse_concentrations("[N2]=0.5 [H2]=0.3 [NH3]=0.2").unwrap();
        let report = calculate_equilibrium_constant(&eq, &concentrations).unwrap();

        assert_relative_eq!(report.numerator, 0.04, epsilon = 1e-12);
        assert_relative_eq!(report.denominator, 0.5 * 0.027, epsilon = 1e-12);
        assert_relative_eq!(report.k, 0.04 / 0.0135, epsilon = 1e-9);
        assert_eq!(report.position, EquilibriumPosition::FavorsProducts);
        assert!(report.reversible);

        assert_eq!(report.expression(), "K = [NH3]^2 / ([N2] × [H2]^3)");
        assert_eq!(report.substitution(), "K = (0.2^2) / (0.5 × 0.3^3)");
        assert_eq!(report.format_k(3), "2.963");
    }

    #[test]
    fn test_states_are_ignored_when_matching() {
        let eq = parse_equation("H2(g) + I2(g) <=> 2HI(g)").unwrap();
        let concentrations = parse_concentrations("[HI]=1.0 [H2]=0.1 [I2(g)]=0.1").unwrap();
        let report = calculate_equilibrium_constant(&eq, &concentrations).unwrap();
        assert_relative_eq!(report.k, 100.0, epsilon = 1e-9);
        assert_eq!(report.expression(), "K = [HI]^2 / ([H2] × [I2])");
        assert_eq!(report.products[0].formula, "HI");
    }

    #[test]
    fn test_missing_concentration() {
        let eq = parse_equation("N2 + 3H2 <-> 2NH3").unwrap();
        let concentrations = parse_concentrations("[N2]=0.5 [H2]=0.3").unwrap();
        assert_eq!(
            calculate_equilibrium_constant(&eq, &concentrations),
            Err(ChemError::CompoundNotFound {
                formula: "NH3".to_string()
            })
        );
        assert!(matches!(
            calculate_equilibrium_constant(&eq, &[]),
            Err(ChemError::InvalidProblem { .. })
        ));
    }

    #[test]
    fn test_zero_reactant_concentration() {
        let eq = parse_equation("N2 + 3H2 <-> 2NH3").unwrap();
        let concentrations = parse_concentrations("[N2]=0 [H2]=0.3 [NH3]=0.2").unwrap();
        assert!(matches!(
            calculate_equilibrium_constant(&eq, &concentrations),
            Err(ChemError::InvalidProblem { .. })
        ));
    }

    #[test]
    fn test_position_thresholds() {
        assert_eq!(
            EquilibriumPosition::from_constant(2e4),
            EquilibriumPosition::StronglyFavorsProducts
        );
        assert_eq!(
            EquilibriumPosition::from_constant(1e4),
            EquilibriumPosition::FavorsProducts
        );
        assert_eq!(
            EquilibriumPosition::from_constant(1.0),
            EquilibriumPosition::FavorsReactants
        );
        assert_eq!(
            EquilibriumPosition::from_constant(1e-4),
            EquilibriumPosition::StronglyFavorsReactants
        );
        assert_eq!(
            EquilibriumPosition::from_constant(0.0).as_str(),
            "Strongly favors reactants"
        );
    }

    #[test]
    fn test_format_constant() {
        assert_eq!(format_constant(2.5, 2), "2.50");
        assert_eq!(format_constant(0.0, 2), "0.00");
        assert_eq!(format_constant(12345.0, 2), "1.23e4");
        assert_eq!(format_constant(0.0005, 1), "5.0e-4");
    }
}
