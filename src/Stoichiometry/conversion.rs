//! # Mass / mole conversion through a reaction
//!
//! A problem `5g H2 -> ? g H2O` names a known amount of one compound of an equation and asks
//! for the amount of another one. The known amount is converted to moles, multiplied by the
//! ratio of the coefficients written in the equation and converted to the requested unit.
//!
//! Coefficients are taken from the equation as written, so an unbalanced equation should be
//! balanced first, see
//! [`BalancedEquation::balanced_equation`](crate::Equations::balancer::BalancedEquation::balanced_equation).
use crate::Equations::equation_parser::ParsedEquation;
use crate::Equations::errors::ChemError;
use crate::Equations::formula_parser::{ParsedFormula, parse_formula};
use crate::Stoichiometry::molmass::molar_mass;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static PROBLEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\d.]+)\s*(?i:(g|mol))\s+(\S+)\s*->\s*\?\s*(?i:(g|mol))\s+(\S+)$")
        .expect("problem pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmountUnit {
    Grams,
    Moles,
}

impl AmountUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountUnit::Grams => "g",
            AmountUnit::Moles => "mol",
        }
    }

    /// `g` or `mol`, case-insensitive
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_lowercase().as_str() {
            "g" => Some(AmountUnit::Grams),
            "mol" => Some(AmountUnit::Moles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: AmountUnit,
}

impl Quantity {
    pub fn grams(value: f64) -> Self {
        Self {
            value,
            unit: AmountUnit::Grams,
        }
    }

    pub fn moles(value: f64) -> Self {
        Self {
            value,
            unit: AmountUnit::Moles,
        }
    }

    pub fn to_moles(&self, molar_mass: f64) -> f64 {
        match self.unit {
            AmountUnit::Grams => self.value / molar_mass,
            AmountUnit::Moles => self.value,
        }
    }

    pub fn from_moles(moles: f64, molar_mass: f64, unit: AmountUnit) -> Self {
        let value = match unit {
            AmountUnit::Grams => moles * molar_mass,
            AmountUnit::Moles => moles,
        };
        Self { value, unit }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.as_str())
    }
}

/// non-negative decimal number as written in a problem
pub(crate) fn parse_amount_value(text: &str, input: &str) -> Result<f64, ChemError> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ChemError::invalid_problem(
            input,
            format!("'{}' is not a number", text),
        )),
    }
}

/// First compound whose element map equals the one of `formula`.
/// Coefficients, charges and states are not compared.
pub fn find_compound<'a, I>(compounds: I, formula: &str) -> Result<&'a ParsedFormula, ChemError>
where
    I: IntoIterator<Item = &'a ParsedFormula>,
{
    let target = parse_formula(formula)?;
    compounds
        .into_iter()
        .find(|compound| compound.same_composition(&target))
        .ok_or_else(|| ChemError::CompoundNotFound {
            formula: formula.to_string(),
        })
}

/// `<value> <g|mol> <formula> -> ? <g|mol> <formula>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoichiometryProblem {
    pub known: Quantity,
    pub known_formula: String,
    pub target_unit: AmountUnit,
    pub target_formula: String,
}

impl StoichiometryProblem {
    pub fn parse(input: &str) -> Result<Self, ChemError> {
        let input = input.trim();
        let caps = PROBLEM.captures(input).ok_or_else(|| {
            ChemError::invalid_problem(input, "expected a problem like '5g H2 -> ? g H2O'")
        })?;
        let value = parse_amount_value(&caps[1], input)?;
        let unit = |i: usize| {
            AmountUnit::from_symbol(&caps[i])
                .ok_or_else(|| ChemError::invalid_problem(input, format!("unknown unit {}", &caps[i])))
        };
        Ok(Self {
            known: Quantity {
                value,
                unit: unit(2)?,
            },
            known_formula: caps[3].to_string(),
            target_unit: unit(4)?,
            target_formula: caps[5].to_string(),
        })
    }
}

impl FromStr for StoichiometryProblem {
    type Err = ChemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// every intermediate value of a solved problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoichiometryResult {
    pub problem: StoichiometryProblem,
    pub known_molar_mass: f64,
    pub target_molar_mass: f64,
    pub known_coefficient: u32,
    pub target_coefficient: u32,
    pub known_moles: f64,
    /// target coefficient / known coefficient
    pub ratio: f64,
    pub target_moles: f64,
    pub target: Quantity,
}

impl StoichiometryResult {
    /// human readable calculation steps rounded to `decimal_places`
    pub fn steps(&self, decimal_places: usize) -> Vec<String> {
        let dp = decimal_places;
        let p = &self.problem;
        let mut steps = Vec::new();
        match p.known.unit {
            AmountUnit::Grams => steps.push(format!(
                "Step 1: {}g {} / {:.dp$} g/mol = {:.dp$} mol",
                p.known.value, p.known_formula, self.known_molar_mass, self.known_moles
            )),
            AmountUnit::Moles => steps.push(format!(
                "Step 1: {} mol {} (given)",
                p.known.value, p.known_formula
            )),
        }
        steps.push(format!(
            "Step 2: Molar ratio {}:{} = {}:{}",
            p.known_formula, p.target_formula, self.known_coefficient, self.target_coefficient
        ));
        steps.push(format!(
            "Step 3: {:.dp$} mol x ({}/{}) = {:.dp$} mol {}",
            self.known_moles,
            self.target_coefficient,
            self.known_coefficient,
            self.target_moles,
            p.target_formula
        ));
        if p.target_unit == AmountUnit::Grams {
            steps.push(format!(
                "Step 4: {:.dp$} mol x {:.dp$} g/mol = {:.dp$}g",
                self.target_moles, self.target_molar_mass, self.target.value
            ));
        }
        steps
    }

    pub fn answer(&self, decimal_places: usize) -> String {
        format!(
            "{:.dp$} {} {}",
            self.target.value,
            self.target.unit.as_str(),
            self.problem.target_formula,
            dp = decimal_places
        )
    }
}

pub fn solve_stoichiometry(
    equation: &ParsedEquation,
    problem: &StoichiometryProblem,
) -> Result<StoichiometryResult, ChemError> {
    let known = find_compound(equation.compounds(), &problem.known_formula)?;
    let target = find_compound(equation.compounds(), &problem.target_formula)?;
    let known_molar_mass = molar_mass(&known.elements)?;
    let target_molar_mass = molar_mass(&target.elements)?;

    let known_moles = problem.known.to_moles(known_molar_mass);
    let ratio = target.coefficient as f64 / known.coefficient as f64;
    let target_moles = known_moles * ratio;
    let target_quantity = Quantity::from_moles(target_moles, target_molar_mass, problem.target_unit);
    debug!(
        "{} -> {} mol {}, ratio {}",
        problem.known, known_moles, problem.known_formula, ratio
    );
    info!(
        "{} {} gives {} {}",
        problem.known, problem.known_formula, target_quantity, problem.target_formula
    );
    Ok(StoichiometryResult {
        problem: problem.clone(),
        known_molar_mass,
        target_molar_mass,
        known_coefficient: known.coefficient,
        target_coefficient: target.coefficient,
        known_moles,
        ratio,
        target_moles,
        target: target_quantity,
    })
}
